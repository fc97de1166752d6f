use indexmap::IndexMap;
use lodestone_util::identifier::Identifier;
use lodestone_util::random::RandomImpl;
use serde::Deserialize;

use crate::context::{LootContext, LootResolver};
use crate::item::ItemStack;
use crate::provider::NumberProvider;

fn default_max_level() -> i32 {
    1
}

fn default_enchant_weight() -> i32 {
    10
}

/// A data-driven enchantment definition, the registry JSON shape.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Enchantment {
    #[serde(default = "default_max_level")]
    pub max_level: i32,
    #[serde(default = "default_enchant_weight")]
    pub weight: i32,
    #[serde(default)]
    pub min_cost: EnchantmentCost,
    #[serde(default)]
    pub max_cost: EnchantmentCost,
    #[serde(default)]
    pub supported_items: Option<IdSet>,
    #[serde(default)]
    pub primary_items: Option<IdSet>,
    #[serde(default)]
    pub exclusive_set: Option<IdSet>,
}

/// Cost line: `base` at level one, growing per level above it.
#[derive(Deserialize, Clone, Copy, Debug, Default)]
pub struct EnchantmentCost {
    #[serde(default)]
    pub base: i32,
    #[serde(default)]
    pub per_level_above_first: i32,
}

impl EnchantmentCost {
    pub fn at_level(self, level: i32) -> i32 {
        self.base + self.per_level_above_first * (level - 1)
    }
}

/// A set of registry ids as data packs write them: a single id, a `#tag`,
/// or a list mixing both.
#[derive(Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum IdSet {
    Single(String),
    Multiple(Vec<String>),
}

impl IdSet {
    /// Flattens to concrete ids, expanding `#tag` members through
    /// `expand_tag`. Unparsable members are skipped.
    pub fn resolve(&self, mut expand_tag: impl FnMut(&Identifier) -> Vec<Identifier>) -> Vec<Identifier> {
        let entries = match self {
            IdSet::Single(entry) => std::slice::from_ref(entry),
            IdSet::Multiple(entries) => entries.as_slice(),
        };
        let mut ids = Vec::new();
        for entry in entries {
            match entry.strip_prefix('#') {
                Some(tag) => {
                    if let Ok(tag) = Identifier::try_parse(tag) {
                        ids.extend(expand_tag(&tag));
                    }
                }
                None => {
                    if let Ok(id) = Identifier::try_parse(entry) {
                        ids.push(id);
                    }
                }
            }
        }
        ids
    }
}

impl Enchantment {
    /// Whether `item` is in the primary set, falling back to the supported
    /// set. A definition carrying neither matches everything.
    pub fn primary_item_match(&self, item: &ItemStack, resolver: &dyn LootResolver) -> bool {
        match self.primary_items.as_ref().or(self.supported_items.as_ref()) {
            Some(set) => set.resolve(|tag| resolver.item_tag(tag)).contains(&item.id),
            None => true,
        }
    }

    pub fn supported_item_match(&self, item: &ItemStack, resolver: &dyn LootResolver) -> bool {
        match &self.supported_items {
            Some(set) => set.resolve(|tag| resolver.item_tag(tag)).contains(&item.id),
            None => true,
        }
    }
}

/// One selected enchantment instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enchant {
    pub id: Identifier,
    pub level: i32,
}

/// Anvil-style selection: a jittered cost derived from the item's
/// enchantability, then rarity-weighted picks filtered for mutual
/// compatibility, the cost halving after each extra pick.
pub fn select_enchantments(
    item: &ItemStack,
    base_levels: i32,
    allowed: Option<&IdSet>,
    ctx: &mut LootContext<'_>,
) -> Vec<Enchant> {
    let enchantability = item.enchantability();
    if enchantability <= 0 {
        return Vec::new();
    }

    let jitter_bound = enchantability / 4 + 1;
    let mut cost = base_levels
        + 1
        + ctx.random.next_bounded_i32(jitter_bound)
        + ctx.random.next_bounded_i32(jitter_bound);
    let spread = (ctx.random.next_f32() as f64 + ctx.random.next_f32() as f64 - 1.0) * 0.15;
    cost = ((cost as f64 + cost as f64 * spread).round() as i32).max(1);

    let mut available = available_enchantments(item, cost, allowed, ctx);
    if available.is_empty() {
        return Vec::new();
    }

    let mut selected = Vec::new();
    if let Some(first) = weighted_pick(&available, ctx) {
        selected.push(first);
    }
    while ctx.random.next_bounded_i32(50) <= cost {
        let Some(last) = selected.last().cloned() else {
            break;
        };
        let resolver = ctx.resolver;
        available.retain(|candidate| are_compatible(resolver, candidate, &last));
        if available.is_empty() {
            break;
        }
        if let Some(next) = weighted_pick(&available, ctx) {
            selected.push(next);
        }
        cost /= 2;
    }
    selected
}

/// Every enchantment whose cost window at some level admits `cost`, taken
/// at the highest such level. Registry order is preserved.
fn available_enchantments(
    item: &ItemStack,
    cost: i32,
    allowed: Option<&IdSet>,
    ctx: &mut LootContext<'_>,
) -> Vec<Enchant> {
    let resolver = ctx.resolver;
    let registry = resolver.enchantments();
    let candidates: Vec<Identifier> = match allowed {
        Some(set) => set.resolve(|tag| resolver.enchantment_tag(tag)),
        None => registry.keys().cloned().collect(),
    };

    let is_book = item.is("book");
    let mut available = Vec::new();
    for id in candidates {
        let Some(enchantment) = registry.get(&id) else {
            continue;
        };
        if !is_book && !enchantment.primary_item_match(item, resolver) {
            continue;
        }
        let mut level = enchantment.max_level;
        while level > 0 {
            if cost >= enchantment.min_cost.at_level(level) && cost <= enchantment.max_cost.at_level(level) {
                available.push(Enchant { id: id.clone(), level });
                break;
            }
            level -= 1;
        }
    }
    available
}

/// Weighted draw over the candidate list. The pick is returned by clone;
/// the pool itself only ever shrinks through compatibility filtering.
fn weighted_pick(available: &[Enchant], ctx: &mut LootContext<'_>) -> Option<Enchant> {
    let resolver = ctx.resolver;
    let weight_of = |enchant: &Enchant| {
        resolver
            .enchantments()
            .get(&enchant.id)
            .map_or(default_enchant_weight(), |definition| definition.weight)
    };

    let total: i32 = available.iter().map(weight_of).sum();
    if total <= 0 {
        return None;
    }
    let mut remaining = ctx.random.next_bounded_i32(total);
    for enchant in available {
        remaining -= weight_of(enchant);
        if remaining < 0 {
            return Some(enchant.clone());
        }
    }
    None
}

/// Symmetric exclusivity test. An enchantment is never compatible with
/// itself.
fn are_compatible(resolver: &dyn LootResolver, first: &Enchant, second: &Enchant) -> bool {
    if first.id == second.id {
        return false;
    }
    !excludes(resolver, &first.id, &second.id) && !excludes(resolver, &second.id, &first.id)
}

fn excludes(resolver: &dyn LootResolver, from: &Identifier, other: &Identifier) -> bool {
    resolver
        .enchantments()
        .get(from)
        .and_then(|enchantment| enchantment.exclusive_set.as_ref())
        .map_or(false, |set| {
            set.resolve(|tag| resolver.enchantment_tag(tag)).contains(other)
        })
}

/// Writes one enchantment onto the item, converting a plain book into an
/// enchanted book first. Levels clamp to `[0, 255]` and level zero deletes.
pub(crate) fn apply(item: &mut ItemStack, enchant: &Enchant, ctx: &mut LootContext<'_>) {
    if item.is("book") {
        item.id = Identifier::vanilla("enchanted_book");
    }
    let stored = item.is("enchanted_book");
    let mut levels = ctx.format.enchantment_levels(item, stored);
    let level = enchant.level.clamp(0, 255);
    if level == 0 {
        levels.shift_remove(&enchant.id);
    } else {
        levels.insert(enchant.id.clone(), level);
    }
    ctx.format.write_enchantment_levels(item, stored, &levels);
}

/// `set_enchantments`: read-modify-write of the level map in declaration
/// order.
pub(crate) fn set_levels(
    item: &mut ItemStack,
    enchantments: &IndexMap<Identifier, NumberProvider>,
    add: bool,
    ctx: &mut LootContext<'_>,
) {
    if item.is("book") {
        item.id = Identifier::vanilla("enchanted_book");
    }
    let stored = item.is("enchanted_book");
    let mut levels = ctx.format.enchantment_levels(item, stored);
    for (id, provider) in enchantments {
        let mut level = provider.resolve_i32(ctx);
        if add {
            level += levels.get(id).copied().unwrap_or(0);
        }
        let level = level.clamp(0, 255);
        if level == 0 {
            levels.shift_remove(id);
        } else {
            levels.insert(id.clone(), level);
        }
    }
    ctx.format.write_enchantment_levels(item, stored, &levels);
}

/// `enchant_randomly`: one uniform pick from the candidate pool, then a
/// uniform level in `[1, max_level]`.
pub(crate) fn enchant_randomly(
    item: &mut ItemStack,
    options: Option<&IdSet>,
    only_compatible: bool,
    ctx: &mut LootContext<'_>,
) {
    let resolver = ctx.resolver;
    let registry = resolver.enchantments();
    let mut ids: Vec<Identifier> = match options {
        Some(set) => set.resolve(|tag| resolver.enchantment_tag(tag)),
        None => registry.keys().cloned().collect(),
    };
    if only_compatible && !item.is("book") {
        ids.retain(|id| {
            registry
                .get(id)
                .map_or(false, |enchantment| enchantment.supported_item_match(item, resolver))
        });
    }
    if ids.is_empty() {
        log::warn!("no enchantments applicable to {}", item.id);
        return;
    }

    let index = ctx.random.next_bounded_i32(ids.len() as i32) as usize;
    let id = ids.swap_remove(index);
    let max_level = registry.get(&id).map_or(1, |enchantment| enchantment.max_level);
    let level = ctx.random.next_inbetween_i32(1, max_level.max(1));
    apply(item, &Enchant { id, level }, ctx);
}

/// `enchant_with_levels`: the full anvil-style selection, every pick
/// applied.
pub(crate) fn enchant_with_levels(
    item: &mut ItemStack,
    levels: i32,
    options: Option<&IdSet>,
    ctx: &mut LootContext<'_>,
) {
    for enchant in select_enchantments(item, levels, options, ctx) {
        apply(item, &enchant, ctx);
    }
}
