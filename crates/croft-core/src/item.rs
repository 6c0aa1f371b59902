//! Item instances and fixture inventories.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fixed::Ticks;
use crate::id::ItemTypeId;
use crate::registry::Registry;

/// A concrete item: a type plus the tick at which it stops being that type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub item_type: ItemTypeId,
    /// Absolute tick of decay. `None` for items that last forever.
    pub expires_at: Option<Ticks>,
}

impl Item {
    pub fn new(item_type: ItemTypeId, expires_at: Option<Ticks>) -> Self {
        Item {
            item_type,
            expires_at,
        }
    }

    /// A fresh item created at `now`, with its expiry taken from the type's
    /// registered lifetime.
    pub fn spawn(item_type: ItemTypeId, now: Ticks, registry: &Registry) -> Self {
        let expires_at = registry
            .item_type(item_type)
            .and_then(|def| def.lifetime)
            .map(|lifetime| now + lifetime);
        Item {
            item_type,
            expires_at,
        }
    }

    /// Apply decay at `now`. Returns the (possibly transformed) item, or
    /// `None` when it expired outright.
    ///
    /// A transformed item inherits its deadline from the moment the old one
    /// ran out, not from `now`, so chained transforms do not drift even when
    /// a deadline lands mid-carry and is observed a few ticks late.
    pub fn decay(self, now: Ticks, registry: &Registry) -> Option<Item> {
        let deadline = self.expires_at?;
        if now < deadline {
            return Some(self);
        }
        let successor = registry.item_type(self.item_type)?.successor?;
        let expires_at = registry
            .item_type(successor)?
            .lifetime
            .map(|lifetime| deadline + lifetime);
        Some(Item {
            item_type: successor,
            expires_at,
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("inventory full (capacity {capacity})")]
pub struct InventoryFull {
    pub capacity: usize,
}

/// Fixed-capacity item storage for fixtures. Slot order is not meaningful;
/// removal swaps the last slot into the hole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    slots: Vec<Item>,
    capacity: usize,
}

impl Inventory {
    pub fn new(capacity: usize) -> Self {
        Inventory {
            slots: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn with_item(capacity: usize, item: Item) -> Self {
        let mut inv = Inventory::new(capacity);
        inv.slots.push(item);
        inv
    }

    pub fn add(&mut self, item: Item) -> Result<(), InventoryFull> {
        if self.slots.len() == self.capacity {
            return Err(InventoryFull {
                capacity: self.capacity,
            });
        }
        self.slots.push(item);
        Ok(())
    }

    /// Remove and return one item of type `wanted`, if present.
    pub fn take_matching(&mut self, wanted: ItemTypeId) -> Option<Item> {
        let at = self.slots.iter().position(|it| it.item_type == wanted)?;
        Some(self.slots.swap_remove(at))
    }

    pub fn contains(&self, wanted: ItemTypeId) -> bool {
        self.slots.iter().any(|it| it.item_type == wanted)
    }

    pub fn items(&self) -> &[Item] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Decay every slot in place, dropping items that expired outright.
    pub fn decay(&mut self, now: Ticks, registry: &Registry) {
        let mut i = 0;
        while i < self.slots.len() {
            match self.slots[i].decay(now, registry) {
                Some(item) => {
                    self.slots[i] = item;
                    i += 1;
                }
                None => {
                    self.slots.swap_remove(i);
                }
            }
        }
    }
}
