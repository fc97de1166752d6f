use std::sync::LazyLock;

use indexmap::IndexMap;
use lodestone_util::identifier::Identifier;
use lodestone_util::random::{RandomGenerator, legacy_rand::LegacyRand};
use serde::Deserialize;

use crate::condition::LootCondition;
use crate::enchantment::Enchantment;
use crate::item::ItemFormat;
use crate::table::LootTable;

/// Sky state seen by `weather_check`.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    #[default]
    Clear,
    Rain,
    Thunder,
}

impl Weather {
    pub fn raining(self) -> bool {
        matches!(self, Weather::Rain | Weather::Thunder)
    }

    pub fn thundering(self) -> bool {
        self == Weather::Thunder
    }
}

/// How produced stacks are distributed over container slots after
/// resolution.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StackMixer {
    /// Encounter order, one stack per slot.
    #[default]
    Default,
    /// The chest-filling mix: shuffled slots and random stack splitting.
    Container,
}

/// A named predicate as stored in a data pack: a single condition or a list
/// that must hold as a whole.
#[derive(Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum Predicate {
    Single(Box<LootCondition>),
    All(Vec<LootCondition>),
}

/// Registry lookups the engine resolves names through. Everything is
/// returned by value; the engine re-queries instead of caching.
pub trait LootResolver {
    /// Expands an item tag to its member ids, in registry order.
    fn item_tag(&self, tag: &Identifier) -> Vec<Identifier>;

    /// Looks up a named loot table for `loot_table` entries.
    fn loot_table(&self, id: &Identifier) -> Option<LootTable>;

    /// Looks up a named predicate for `reference` conditions.
    fn predicate(&self, id: &Identifier) -> Option<Predicate>;

    /// The enchantment registry, in definition order. Iteration order is
    /// part of the reproducibility contract.
    fn enchantments(&self) -> &IndexMap<Identifier, Enchantment>;

    /// Expands an enchantment tag to its member ids.
    fn enchantment_tag(&self, tag: &Identifier) -> Vec<Identifier>;
}

static NO_ENCHANTMENTS: LazyLock<IndexMap<Identifier, Enchantment>> = LazyLock::new(IndexMap::new);

/// Resolver with nothing behind it; every lookup comes back empty.
pub struct EmptyResolver;

impl LootResolver for EmptyResolver {
    fn item_tag(&self, _tag: &Identifier) -> Vec<Identifier> {
        Vec::new()
    }

    fn loot_table(&self, _id: &Identifier) -> Option<LootTable> {
        None
    }

    fn predicate(&self, _id: &Identifier) -> Option<Predicate> {
        None
    }

    fn enchantments(&self) -> &IndexMap<Identifier, Enchantment> {
        &NO_ENCHANTMENTS
    }

    fn enchantment_tag(&self, _tag: &Identifier) -> Vec<Identifier> {
        Vec::new()
    }
}

/// Everything one `generate` call needs besides the table itself.
pub struct LootOptions<'a> {
    pub seed: u64,
    pub luck: f32,
    /// World time of day in ticks, for `time_check`.
    pub daytime: i32,
    pub weather: Weather,
    pub format: ItemFormat,
    pub mixer: StackMixer,
    pub resolver: &'a dyn LootResolver,
}

impl<'a> LootOptions<'a> {
    pub fn new(seed: u64, resolver: &'a dyn LootResolver) -> Self {
        Self {
            seed,
            luck: 0.0,
            daytime: 0,
            weather: Weather::Clear,
            format: ItemFormat::Component,
            mixer: StackMixer::Default,
            resolver,
        }
    }
}

pub(crate) const MAX_RECURSION_DEPTH: u32 = 64;

/// Mutable state of one resolution run. The single random stream lives
/// here; every draw anywhere in the engine goes through it.
pub struct LootContext<'a> {
    pub random: RandomGenerator,
    pub luck: f32,
    pub daytime: i32,
    pub weather: Weather,
    pub format: ItemFormat,
    pub(crate) resolver: &'a dyn LootResolver,
    depth: u32,
}

impl<'a> LootContext<'a> {
    pub fn new(options: &LootOptions<'a>) -> Self {
        Self {
            random: RandomGenerator::Legacy(LegacyRand::from_seed(options.seed)),
            luck: options.luck,
            daytime: options.daytime,
            weather: options.weather,
            format: options.format,
            resolver: options.resolver,
            depth: 0,
        }
    }

    /// Runs `scope` one nesting level deeper. At the depth limit the nested
    /// resolution is skipped and `default` returned, so cyclic table or
    /// predicate references terminate.
    pub(crate) fn descend<T>(&mut self, default: T, scope: impl FnOnce(&mut Self) -> T) -> T {
        if self.depth >= MAX_RECURSION_DEPTH {
            log::warn!("loot nesting deeper than {MAX_RECURSION_DEPTH} levels, skipping");
            return default;
        }
        self.depth += 1;
        let result = scope(self);
        self.depth -= 1;
        result
    }
}
