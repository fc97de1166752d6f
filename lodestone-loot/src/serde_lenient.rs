//! Tolerant list deserializers. A malformed element degrades on its own
//! instead of failing the whole table: pools, entries and functions are
//! dropped with a warning, conditions turn into the unrecognized kind
//! (which never passes).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::condition::LootCondition;
use crate::entry::LootEntry;
use crate::function::LootFunction;
use crate::table::LootPool;

fn elements<'de, D>(deserializer: D, what: &str) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(elements) => Ok(elements),
        Value::Null => Ok(Vec::new()),
        other => {
            log::warn!("expected a list of {what}s, got {other}; ignoring");
            Ok(Vec::new())
        }
    }
}

fn dropping<'de, D, T>(deserializer: D, what: &str) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(elements(deserializer, what)?
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(error) => {
                log::warn!("skipping malformed {what}: {error}");
                None
            }
        })
        .collect())
}

pub(crate) fn pools<'de, D>(deserializer: D) -> Result<Vec<LootPool>, D::Error>
where
    D: Deserializer<'de>,
{
    dropping(deserializer, "loot pool")
}

pub(crate) fn entries<'de, D>(deserializer: D) -> Result<Vec<LootEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    dropping(deserializer, "loot entry")
}

pub(crate) fn functions<'de, D>(deserializer: D) -> Result<Vec<LootFunction>, D::Error>
where
    D: Deserializer<'de>,
{
    dropping(deserializer, "loot function")
}

pub(crate) fn conditions<'de, D>(deserializer: D) -> Result<Vec<LootCondition>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(elements(deserializer, "loot condition")?
        .into_iter()
        .map(|value| {
            serde_json::from_value(value).unwrap_or_else(|error| {
                log::warn!("malformed loot condition treated as unrecognized: {error}");
                LootCondition::Unknown
            })
        })
        .collect())
}
