//! Static definitions shared by every world: item types and recipes.
//!
//! Definitions are assembled through [`RegistryBuilder`] in three phases:
//! register names, mutate the registered entries (transforms, colors, recipe
//! inputs and outputs), then [`RegistryBuilder::build`] validates every
//! cross-reference and freezes the result into an immutable [`Registry`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fixed::Ticks;
use crate::id::{ItemTypeId, RecipeId};

/// Most inputs or outputs a single recipe may declare. Also bounds the
/// number of reservations an agent holds at once.
pub const RECIPE_IO_CAP: usize = 8;

/// An item type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemTypeDef {
    pub name: String,
    /// What an item of this type turns into when its lifetime elapses.
    /// `None` with a lifetime set means the item expires outright.
    pub successor: Option<ItemTypeId>,
    /// How long an item of this type lasts, in ticks. `None` means forever.
    pub lifetime: Option<Ticks>,
    /// Display color, if the data file declared one.
    pub color: Option<[u8; 3]>,
}

/// A recipe definition. Inputs are ordered: agents reserve them one slot at
/// a time, in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeDef {
    pub name: String,
    /// Crafting time in ticks, measured from the last input deposit.
    pub duration: Ticks,
    pub inputs: Vec<ItemTypeId>,
    pub outputs: Vec<ItemTypeId>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown item type {0:?}")]
    UnknownItem(ItemTypeId),
    #[error("unknown recipe {0:?}")]
    UnknownRecipe(RecipeId),
    #[error("recipe \"{0}\" has no inputs")]
    NoInputs(String),
    #[error("recipe \"{recipe}\" exceeds {cap} {slot} slots")]
    IoOverflow {
        recipe: String,
        slot: &'static str,
        cap: usize,
    },
}

/// Mutable staging area for definitions. See the module docs for the
/// three-phase protocol.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    items: Vec<ItemTypeDef>,
    recipes: Vec<RecipeDef>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // --- phase 1: registration ---

    /// Register an item type with no transform and no color.
    pub fn register_item(&mut self, name: &str) -> ItemTypeId {
        let id = ItemTypeId(self.items.len() as u32);
        self.items.push(ItemTypeDef {
            name: name.to_string(),
            successor: None,
            lifetime: None,
            color: None,
        });
        id
    }

    /// Register an empty recipe. Inputs, outputs, and duration are added in
    /// the mutation phase.
    pub fn register_recipe(&mut self, name: &str) -> RecipeId {
        let id = RecipeId(self.recipes.len() as u32);
        self.recipes.push(RecipeDef {
            name: name.to_string(),
            duration: 0,
            inputs: Vec::new(),
            outputs: Vec::new(),
        });
        id
    }

    // --- phase 2: mutation ---

    /// Declare that `from` turns into `into` (or expires, when `None`) after
    /// `lifetime` ticks.
    pub fn set_transform(
        &mut self,
        from: ItemTypeId,
        into: Option<ItemTypeId>,
        lifetime: Ticks,
    ) -> Result<(), RegistryError> {
        let def = self.item_mut(from)?;
        def.successor = into;
        def.lifetime = Some(lifetime);
        Ok(())
    }

    pub fn set_color(&mut self, item: ItemTypeId, color: [u8; 3]) -> Result<(), RegistryError> {
        self.item_mut(item)?.color = Some(color);
        Ok(())
    }

    pub fn set_duration(&mut self, recipe: RecipeId, duration: Ticks) -> Result<(), RegistryError> {
        self.recipe_mut(recipe)?.duration = duration;
        Ok(())
    }

    pub fn add_input(&mut self, recipe: RecipeId, item: ItemTypeId) -> Result<(), RegistryError> {
        let name = self.recipe_ref(recipe)?.name.clone();
        let def = self.recipe_mut(recipe)?;
        if def.inputs.len() == RECIPE_IO_CAP {
            return Err(RegistryError::IoOverflow {
                recipe: name,
                slot: "input",
                cap: RECIPE_IO_CAP,
            });
        }
        def.inputs.push(item);
        Ok(())
    }

    pub fn add_output(&mut self, recipe: RecipeId, item: ItemTypeId) -> Result<(), RegistryError> {
        let name = self.recipe_ref(recipe)?.name.clone();
        let def = self.recipe_mut(recipe)?;
        if def.outputs.len() == RECIPE_IO_CAP {
            return Err(RegistryError::IoOverflow {
                recipe: name,
                slot: "output",
                cap: RECIPE_IO_CAP,
            });
        }
        def.outputs.push(item);
        Ok(())
    }

    // --- lookups usable mid-build (data loaders resolve names as they parse) ---

    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.items
            .iter()
            .position(|d| d.name == name)
            .map(|i| ItemTypeId(i as u32))
    }

    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.recipes
            .iter()
            .position(|d| d.name == name)
            .map(|i| RecipeId(i as u32))
    }

    fn item_mut(&mut self, id: ItemTypeId) -> Result<&mut ItemTypeDef, RegistryError> {
        self.items
            .get_mut(id.0 as usize)
            .ok_or(RegistryError::UnknownItem(id))
    }

    fn recipe_ref(&self, id: RecipeId) -> Result<&RecipeDef, RegistryError> {
        self.recipes
            .get(id.0 as usize)
            .ok_or(RegistryError::UnknownRecipe(id))
    }

    fn recipe_mut(&mut self, id: RecipeId) -> Result<&mut RecipeDef, RegistryError> {
        self.recipes
            .get_mut(id.0 as usize)
            .ok_or(RegistryError::UnknownRecipe(id))
    }

    // --- phase 3: build ---

    /// Validate every cross-reference and freeze the registry. A recipe with
    /// zero inputs is rejected here: an agent pursuing one would never leave
    /// its first search.
    pub fn build(self) -> Result<Registry, RegistryError> {
        let item_count = self.items.len() as u32;
        let check = |id: ItemTypeId| {
            if id.0 < item_count {
                Ok(())
            } else {
                Err(RegistryError::UnknownItem(id))
            }
        };
        for def in &self.items {
            if let Some(succ) = def.successor {
                check(succ)?;
            }
        }
        for def in &self.recipes {
            if def.inputs.is_empty() {
                return Err(RegistryError::NoInputs(def.name.clone()));
            }
            for &item in def.inputs.iter().chain(def.outputs.iter()) {
                check(item)?;
            }
        }
        Ok(Registry {
            items: self.items,
            recipes: self.recipes,
        })
    }
}

/// Immutable, validated definitions. Shared read-only by the whole sim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    items: Vec<ItemTypeDef>,
    recipes: Vec<RecipeDef>,
}

impl Registry {
    pub fn item_type(&self, id: ItemTypeId) -> Option<&ItemTypeDef> {
        self.items.get(id.0 as usize)
    }

    pub fn recipe(&self, id: RecipeId) -> Option<&RecipeDef> {
        self.recipes.get(id.0 as usize)
    }

    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.items
            .iter()
            .position(|d| d.name == name)
            .map(|i| ItemTypeId(i as u32))
    }

    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.recipes
            .iter()
            .position(|d| d.name == name)
            .map(|i| RecipeId(i as u32))
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    pub fn items(&self) -> impl Iterator<Item = (ItemTypeId, &ItemTypeDef)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, d)| (ItemTypeId(i as u32), d))
    }

    pub fn recipes(&self) -> impl Iterator<Item = (RecipeId, &RecipeDef)> {
        self.recipes
            .iter()
            .enumerate()
            .map(|(i, d)| (RecipeId(i as u32), d))
    }
}
