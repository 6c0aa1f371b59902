//! The line-oriented definition format.
//!
//! One declaration per line, whitespace-separated. `item` and `recipe`
//! lines open a block; the lines after them refine whichever block is open.
//! Items must be declared before anything refers to them.
//!
//! ```text
//! item berry
//! color 220 40 60
//! item mush
//! transform from berry after 45
//! item meal
//!
//! recipe cook
//! duration 8.5
//! input berry
//! output meal
//! ```
//!
//! Durations and lifetimes are given in seconds and converted to ticks at
//! the configured rate. `transform into` and `transform from` are the same
//! declaration written from either end; both set the source item's
//! successor and lifetime.

use std::path::Path;
use std::str::SplitWhitespace;

use croft_core::fixed::Ticks;
use croft_core::id::{ItemTypeId, RecipeId};
use croft_core::registry::{Registry, RegistryBuilder, RegistryError};

/// Tick rate assumed when the caller has no opinion.
pub const DEFAULT_TICKS_PER_SECOND: u32 = 60;

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("line {line}: unknown keyword \"{keyword}\"")]
    UnknownKeyword { line: usize, keyword: String },

    #[error("line {line}: unknown item \"{name}\"")]
    UnknownItem { line: usize, name: String },

    #[error("line {line}: expected {expected}")]
    Expected { line: usize, expected: &'static str },

    #[error("line {line}: \"{keyword}\" outside {scope} block")]
    Misplaced {
        line: usize,
        keyword: &'static str,
        scope: &'static str,
    },

    #[error("line {line}: trailing input \"{rest}\"")]
    Trailing { line: usize, rest: String },

    #[error("line {line}: bad number \"{token}\"")]
    BadNumber { line: usize, token: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Which block the most recent `item`/`recipe` line opened.
#[derive(Clone, Copy)]
enum Focus {
    None,
    Item(ItemTypeId),
    Recipe(RecipeId),
}

/// Parse definitions into a builder, leaving it open for programmatic
/// additions before the final build.
pub fn parse_definitions(src: &str, ticks_per_second: u32) -> Result<RegistryBuilder, DataError> {
    let mut builder = RegistryBuilder::new();
    let mut focus = Focus::None;

    for (idx, raw) in src.lines().enumerate() {
        let line = idx + 1;
        let mut tokens = raw.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        match keyword {
            "item" => {
                let name = expect_token(&mut tokens, line, "item name")?;
                focus = Focus::Item(builder.register_item(name));
            }
            "transform" => {
                let Focus::Item(item) = focus else {
                    return Err(misplaced(line, "transform", "item"));
                };
                let direction = expect_token(&mut tokens, line, "\"into\" or \"from\"")?;
                let other_name = expect_token(&mut tokens, line, "item name")?;
                let other = builder
                    .item_id(other_name)
                    .ok_or_else(|| DataError::UnknownItem {
                        line,
                        name: other_name.to_string(),
                    })?;
                let after = expect_token(&mut tokens, line, "\"after\"")?;
                if after != "after" {
                    return Err(DataError::Expected {
                        line,
                        expected: "\"after\"",
                    });
                }
                let lifetime = parse_seconds(&mut tokens, line, ticks_per_second)?;
                match direction {
                    "into" => builder.set_transform(item, Some(other), lifetime)?,
                    "from" => builder.set_transform(other, Some(item), lifetime)?,
                    _ => {
                        return Err(DataError::Expected {
                            line,
                            expected: "\"into\" or \"from\"",
                        });
                    }
                }
            }
            "color" => {
                let Focus::Item(item) = focus else {
                    return Err(misplaced(line, "color", "item"));
                };
                let mut rgb = [0u8; 3];
                for channel in &mut rgb {
                    let token = expect_token(&mut tokens, line, "color channel 0-255")?;
                    *channel = token.parse().map_err(|_| DataError::BadNumber {
                        line,
                        token: token.to_string(),
                    })?;
                }
                builder.set_color(item, rgb)?;
            }
            "recipe" => {
                let name = expect_token(&mut tokens, line, "recipe name")?;
                focus = Focus::Recipe(builder.register_recipe(name));
            }
            "duration" => {
                let Focus::Recipe(recipe) = focus else {
                    return Err(misplaced(line, "duration", "recipe"));
                };
                let ticks = parse_seconds(&mut tokens, line, ticks_per_second)?;
                builder.set_duration(recipe, ticks)?;
            }
            "input" => {
                let Focus::Recipe(recipe) = focus else {
                    return Err(misplaced(line, "input", "recipe"));
                };
                let item = item_token(&builder, &mut tokens, line)?;
                builder.add_input(recipe, item)?;
            }
            "output" => {
                let Focus::Recipe(recipe) = focus else {
                    return Err(misplaced(line, "output", "recipe"));
                };
                let item = item_token(&builder, &mut tokens, line)?;
                builder.add_output(recipe, item)?;
            }
            other => {
                return Err(DataError::UnknownKeyword {
                    line,
                    keyword: other.to_string(),
                });
            }
        }
        if let Some(rest) = tokens.next() {
            return Err(DataError::Trailing {
                line,
                rest: rest.to_string(),
            });
        }
    }
    Ok(builder)
}

/// Parse and validate a registry from definition text.
pub fn load_registry(src: &str, ticks_per_second: u32) -> Result<Registry, DataError> {
    let registry = parse_definitions(src, ticks_per_second)?.build()?;
    log::info!(
        "loaded {} item types, {} recipes",
        registry.item_count(),
        registry.recipe_count()
    );
    Ok(registry)
}

/// Parse and validate a registry from a definition file on disk.
pub fn load_registry_file(
    path: impl AsRef<Path>,
    ticks_per_second: u32,
) -> Result<Registry, DataError> {
    let src = std::fs::read_to_string(path)?;
    load_registry(&src, ticks_per_second)
}

fn misplaced(line: usize, keyword: &'static str, scope: &'static str) -> DataError {
    DataError::Misplaced {
        line,
        keyword,
        scope,
    }
}

fn expect_token<'a>(
    tokens: &mut SplitWhitespace<'a>,
    line: usize,
    expected: &'static str,
) -> Result<&'a str, DataError> {
    tokens.next().ok_or(DataError::Expected { line, expected })
}

fn item_token(
    builder: &RegistryBuilder,
    tokens: &mut SplitWhitespace<'_>,
    line: usize,
) -> Result<ItemTypeId, DataError> {
    let name = expect_token(tokens, line, "item name")?;
    builder.item_id(name).ok_or_else(|| DataError::UnknownItem {
        line,
        name: name.to_string(),
    })
}

/// Seconds (fractions allowed) to ticks, rounded to nearest. Float math is
/// confined to loading; the sim itself never sees one.
fn parse_seconds(
    tokens: &mut SplitWhitespace<'_>,
    line: usize,
    ticks_per_second: u32,
) -> Result<Ticks, DataError> {
    let token = expect_token(tokens, line, "a duration in seconds")?;
    let seconds: f64 = token.parse().map_err(|_| DataError::BadNumber {
        line,
        token: token.to_string(),
    })?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(DataError::BadNumber {
            line,
            token: token.to_string(),
        });
    }
    Ok((seconds * f64::from(ticks_per_second)).round() as Ticks)
}
