use lodestone_util::identifier::Identifier;
use serde::Deserialize;

use crate::condition::{self, LootCondition};
use crate::context::LootContext;
use crate::function::{self, LootFunction};
use crate::item::ItemStack;
use crate::serde_lenient;
use crate::table::{self, TableRef};

fn default_weight() -> i32 {
    1
}

/// One node in a pool's entry tree: a weighted leaf, or a composite
/// steering which children run.
#[derive(Deserialize, Clone, Debug)]
pub struct LootEntry {
    #[serde(flatten)]
    pub content: EntryContent,
    #[serde(default = "default_weight")]
    pub weight: i32,
    #[serde(default)]
    pub quality: i32,
    #[serde(default, deserialize_with = "serde_lenient::conditions")]
    pub conditions: Vec<LootCondition>,
    #[serde(default, deserialize_with = "serde_lenient::functions")]
    pub functions: Vec<LootFunction>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(tag = "type")]
pub enum EntryContent {
    #[serde(rename = "minecraft:empty", alias = "empty")]
    Empty {},
    #[serde(rename = "minecraft:item", alias = "item")]
    Item { name: Identifier },
    #[serde(rename = "minecraft:tag", alias = "tag")]
    Tag {
        name: Identifier,
        #[serde(default)]
        expand: bool,
    },
    #[serde(rename = "minecraft:loot_table", alias = "loot_table")]
    LootTable {
        #[serde(alias = "name")]
        value: TableRef,
    },
    #[serde(rename = "minecraft:dynamic", alias = "dynamic")]
    Dynamic {
        #[serde(default)]
        name: Option<Identifier>,
    },
    #[serde(rename = "minecraft:group", alias = "group")]
    Group {
        #[serde(default, deserialize_with = "serde_lenient::entries")]
        children: Vec<LootEntry>,
    },
    #[serde(rename = "minecraft:alternatives", alias = "alternatives")]
    Alternatives {
        #[serde(default, deserialize_with = "serde_lenient::entries")]
        children: Vec<LootEntry>,
    },
    #[serde(rename = "minecraft:sequence", alias = "sequence")]
    Sequence {
        #[serde(default, deserialize_with = "serde_lenient::entries")]
        children: Vec<LootEntry>,
    },
    #[serde(other)]
    Unknown,
}

/// A selectable leaf produced by one round of expansion: the source entry,
/// plus the member id when the leaf was synthesized from an expanded tag.
#[derive(Clone, Debug)]
pub struct LeafEntry<'a> {
    pub entry: &'a LootEntry,
    pub item: Option<Identifier>,
}

impl LeafEntry<'_> {
    /// `max(floor(weight + quality * luck), 0)`
    pub fn effective_weight(&self, luck: f32) -> i32 {
        let raw = self.entry.weight as f32 + self.entry.quality as f32 * luck;
        (raw.floor() as i32).max(0)
    }
}

impl LootEntry {
    /// Expands this entry for one roll, feeding selectable leaves to
    /// `sink`. Returns whether the entry ran, which is what composite
    /// parents branch on. Conditions draw here, so expansion itself
    /// advances the stream.
    pub fn expand<'a>(
        &'a self,
        ctx: &mut LootContext<'_>,
        sink: &mut dyn FnMut(LeafEntry<'a>),
    ) -> bool {
        if !condition::test_all(&self.conditions, ctx) {
            return false;
        }
        match &self.content {
            EntryContent::Group { children } => {
                for child in children {
                    child.expand(ctx, sink);
                }
                true
            }
            EntryContent::Alternatives { children } => {
                for child in children {
                    if child.expand(ctx, sink) {
                        return true;
                    }
                }
                false
            }
            EntryContent::Sequence { children } => {
                for child in children {
                    if !child.expand(ctx, sink) {
                        return false;
                    }
                }
                true
            }
            EntryContent::Tag { name, expand } if *expand => {
                // one synthetic single-item leaf per tag member, sharing
                // this entry's weight and functions
                for member in ctx.resolver.item_tag(name) {
                    sink(LeafEntry {
                        entry: self,
                        item: Some(member),
                    });
                }
                true
            }
            EntryContent::Empty {}
            | EntryContent::Item { .. }
            | EntryContent::Tag { .. }
            | EntryContent::LootTable { .. }
            | EntryContent::Dynamic { .. } => {
                sink(LeafEntry { entry: self, item: None });
                true
            }
            EntryContent::Unknown => false,
        }
    }
}

impl LeafEntry<'_> {
    /// Creates the stacks of a selected leaf, running each through the
    /// entry's own functions before handing it to `consumer`.
    pub(crate) fn create_item<'w>(
        &self,
        ctx: &mut LootContext<'w>,
        consumer: &mut dyn FnMut(&mut LootContext<'w>, ItemStack),
    ) {
        let functions = &self.entry.functions;
        let mut decorated = |ctx: &mut LootContext<'w>, mut item: ItemStack| {
            function::apply_all(functions, &mut item, ctx);
            consumer(ctx, item);
        };

        if let Some(member) = &self.item {
            decorated(ctx, ItemStack::new(member.clone(), 1));
            return;
        }
        match &self.entry.content {
            EntryContent::Item { name } => decorated(ctx, ItemStack::new(name.clone(), 1)),
            EntryContent::Tag { name, .. } => {
                // unexpanded tags produce every member at once
                for member in ctx.resolver.item_tag(name) {
                    decorated(ctx, ItemStack::new(member, 1));
                }
            }
            EntryContent::LootTable { value } => match value {
                TableRef::Named(name) => match ctx.resolver.loot_table(name) {
                    Some(nested) => {
                        ctx.descend((), |ctx| table::generate_into(&nested, ctx, &mut decorated));
                    }
                    None => log::warn!("loot table {name} is not defined, dropping entry"),
                },
                TableRef::Inline(nested) => {
                    ctx.descend((), |ctx| table::generate_into(nested, ctx, &mut decorated));
                }
            },
            // no block entity is in scope to supply dynamic drops
            EntryContent::Dynamic { .. } | EntryContent::Empty {} => {}
            EntryContent::Group { .. }
            | EntryContent::Alternatives { .. }
            | EntryContent::Sequence { .. }
            | EntryContent::Unknown => {}
        }
    }
}
