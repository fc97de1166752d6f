//! In-memory registries for tests.

use std::collections::HashMap;

use indexmap::IndexMap;
use lodestone_util::identifier::Identifier;

use crate::context::{LootContext, LootOptions, LootResolver, Predicate};
use crate::enchantment::Enchantment;
use crate::table::LootTable;

pub(crate) struct TestResolver {
    pub item_tags: HashMap<Identifier, Vec<Identifier>>,
    pub tables: HashMap<Identifier, LootTable>,
    pub predicates: HashMap<Identifier, Predicate>,
    pub enchantments: IndexMap<Identifier, Enchantment>,
    pub enchantment_tags: HashMap<Identifier, Vec<Identifier>>,
}

impl TestResolver {
    pub fn new() -> Self {
        Self {
            item_tags: HashMap::new(),
            tables: HashMap::new(),
            predicates: HashMap::new(),
            enchantments: IndexMap::new(),
            enchantment_tags: HashMap::new(),
        }
    }
}

impl LootResolver for TestResolver {
    fn item_tag(&self, tag: &Identifier) -> Vec<Identifier> {
        self.item_tags.get(tag).cloned().unwrap_or_default()
    }

    fn loot_table(&self, id: &Identifier) -> Option<LootTable> {
        self.tables.get(id).cloned()
    }

    fn predicate(&self, id: &Identifier) -> Option<Predicate> {
        self.predicates.get(id).cloned()
    }

    fn enchantments(&self) -> &IndexMap<Identifier, Enchantment> {
        &self.enchantments
    }

    fn enchantment_tag(&self, tag: &Identifier) -> Vec<Identifier> {
        self.enchantment_tags.get(tag).cloned().unwrap_or_default()
    }
}

/// Fresh context over `resolver` with everything else defaulted.
pub(crate) fn context(seed: u64, resolver: &dyn LootResolver) -> LootContext<'_> {
    LootContext::new(&LootOptions::new(seed, resolver))
}
