use lodestone_util::identifier::Identifier;
use lodestone_util::random::RandomImpl;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::condition::{self, LootCondition};
use crate::context::LootContext;
use crate::enchantment::{self, IdSet};
use crate::entry::LootEntry;
use crate::item::ItemStack;
use crate::provider::{IntRange, NumberProvider};
use crate::serde_lenient;
use crate::table::{self, LootPool, LootTable};

fn default_true() -> bool {
    true
}

/// An item mutator gated by its own conditions.
///
/// Functions run in declaration order. A kind the engine does not recognize
/// deserializes to `Unknown` and passes the item through untouched, so a
/// table written for a newer game still yields its base items.
#[derive(Deserialize, Clone, Debug)]
pub struct LootFunction {
    #[serde(flatten)]
    pub content: FunctionContent,
    #[serde(default, deserialize_with = "serde_lenient::conditions")]
    pub conditions: Vec<LootCondition>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(tag = "function")]
pub enum FunctionContent {
    #[serde(rename = "minecraft:sequence", alias = "sequence")]
    Sequence {
        #[serde(default, deserialize_with = "serde_lenient::functions")]
        functions: Vec<LootFunction>,
    },
    #[serde(rename = "minecraft:set_count", alias = "set_count")]
    SetCount {
        #[serde(default)]
        count: NumberProvider,
        #[serde(default)]
        add: bool,
    },
    #[serde(rename = "minecraft:limit_count", alias = "limit_count")]
    LimitCount { limit: IntRange },
    #[serde(rename = "minecraft:set_damage", alias = "set_damage")]
    SetDamage {
        #[serde(default)]
        damage: NumberProvider,
        #[serde(default)]
        add: bool,
    },
    #[serde(rename = "minecraft:set_enchantments", alias = "set_enchantments")]
    SetEnchantments {
        #[serde(default)]
        enchantments: indexmap::IndexMap<Identifier, NumberProvider>,
        #[serde(default)]
        add: bool,
    },
    #[serde(rename = "minecraft:enchant_randomly", alias = "enchant_randomly")]
    EnchantRandomly {
        #[serde(default, alias = "enchantments")]
        options: Option<IdSet>,
        #[serde(default = "default_true")]
        only_compatible: bool,
    },
    #[serde(rename = "minecraft:enchant_with_levels", alias = "enchant_with_levels")]
    EnchantWithLevels {
        #[serde(default)]
        levels: NumberProvider,
        #[serde(default)]
        options: Option<IdSet>,
    },
    #[serde(rename = "minecraft:set_attributes", alias = "set_attributes")]
    SetAttributes {
        #[serde(default)]
        modifiers: Vec<AttributeModifier>,
        #[serde(default = "default_true")]
        replace: bool,
    },
    #[serde(rename = "minecraft:set_name", alias = "set_name")]
    SetName {
        name: Value,
        #[serde(default)]
        target: NameTarget,
    },
    #[serde(rename = "minecraft:set_lore", alias = "set_lore")]
    SetLore {
        #[serde(default)]
        lore: Vec<Value>,
        #[serde(default)]
        replace: bool,
    },
    #[serde(rename = "minecraft:set_book_cover", alias = "set_book_cover")]
    SetBookCover {
        #[serde(default)]
        title: Option<Value>,
        #[serde(default)]
        author: Option<String>,
        #[serde(default)]
        generation: Option<i32>,
    },
    #[serde(rename = "minecraft:set_components", alias = "set_components")]
    SetComponents {
        #[serde(default)]
        components: Map<String, Value>,
    },
    #[serde(
        rename = "minecraft:set_custom_data",
        alias = "set_custom_data",
        alias = "minecraft:set_nbt",
        alias = "set_nbt"
    )]
    SetCustomData { tag: Value },
    #[serde(rename = "minecraft:set_custom_model_data", alias = "set_custom_model_data")]
    SetCustomModelData {
        #[serde(default)]
        value: NumberProvider,
    },
    #[serde(rename = "minecraft:set_potion", alias = "set_potion")]
    SetPotion { id: Identifier },
    #[serde(rename = "minecraft:set_item", alias = "set_item")]
    SetItem { item: Identifier },
    #[serde(rename = "minecraft:set_contents", alias = "set_contents")]
    SetContents {
        #[serde(default)]
        component: Option<Identifier>,
        #[serde(default, deserialize_with = "serde_lenient::entries")]
        entries: Vec<LootEntry>,
    },
    #[serde(other)]
    Unknown,
}

/// Where `set_name` writes.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NameTarget {
    #[default]
    CustomName,
    ItemName,
}

/// One modifier written by `set_attributes`. The engine resolves `amount`
/// and picks a slot when a list is given; everything else passes through to
/// the item data as written.
#[derive(Deserialize, Clone, Debug)]
pub struct AttributeModifier {
    pub attribute: Identifier,
    #[serde(default)]
    pub id: Option<Identifier>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub amount: NumberProvider,
    pub operation: String,
    #[serde(default)]
    pub slot: Option<SlotChoice>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum SlotChoice {
    One(String),
    Many(Vec<String>),
}

/// Applies `functions` to `item` in order, each gated by its own
/// conditions.
pub(crate) fn apply_all(functions: &[LootFunction], item: &mut ItemStack, ctx: &mut LootContext<'_>) {
    for function in functions {
        function.apply(item, ctx);
    }
}

impl LootFunction {
    pub fn apply(&self, item: &mut ItemStack, ctx: &mut LootContext<'_>) {
        if !condition::test_all(&self.conditions, ctx) {
            return;
        }
        self.content.run(item, ctx);
    }
}

impl FunctionContent {
    fn run(&self, item: &mut ItemStack, ctx: &mut LootContext<'_>) {
        match self {
            FunctionContent::Sequence { functions } => apply_all(functions, item, ctx),
            FunctionContent::SetCount { count, add } => {
                let base = if *add { item.count } else { 0 };
                item.count = (base + count.resolve_i32(ctx)).max(0);
            }
            FunctionContent::LimitCount { limit } => {
                item.count = limit.clamp(item.count, ctx).max(0);
            }
            FunctionContent::SetDamage { damage, add } => {
                let max_damage = item.max_damage();
                if max_damage <= 0 {
                    log::warn!("cannot set damage on non-damageable item {}", item.id);
                    return;
                }
                let base = if *add {
                    1.0 - ctx.format.damage(item) as f32 / max_damage as f32
                } else {
                    0.0
                };
                let durability = (damage.resolve_f32(ctx) + base).clamp(0.0, 1.0);
                let value = ((1.0 - durability) * max_damage as f32).floor() as i32;
                ctx.format.set_damage_value(item, value);
            }
            FunctionContent::SetEnchantments { enchantments, add } => {
                enchantment::set_levels(item, enchantments, *add, ctx);
            }
            FunctionContent::EnchantRandomly {
                options,
                only_compatible,
            } => {
                enchantment::enchant_randomly(item, options.as_ref(), *only_compatible, ctx);
            }
            FunctionContent::EnchantWithLevels { levels, options } => {
                let levels = levels.resolve_i32(ctx);
                enchantment::enchant_with_levels(item, levels, options.as_ref(), ctx);
            }
            FunctionContent::SetAttributes { modifiers, replace } => {
                let resolved = modifiers
                    .iter()
                    .map(|modifier| resolve_modifier(modifier, ctx))
                    .collect();
                ctx.format.set_attribute_modifiers(item, resolved, *replace);
            }
            FunctionContent::SetName { name, target } => {
                ctx.format.set_name(item, name, *target == NameTarget::ItemName);
            }
            FunctionContent::SetLore { lore, replace } => {
                ctx.format.set_lore(item, lore, *replace);
            }
            FunctionContent::SetBookCover {
                title,
                author,
                generation,
            } => {
                let title = title.as_ref().and_then(filterable_text);
                ctx.format
                    .set_book_cover(item, title.as_deref(), author.as_deref(), *generation);
            }
            FunctionContent::SetComponents { components } => {
                for (key, value) in components {
                    match key.strip_prefix('!') {
                        Some(removed) => item.remove(removed),
                        None => item.set(key, value.clone()),
                    }
                }
            }
            FunctionContent::SetCustomData { tag } => {
                let data = match tag {
                    Value::Object(map) => Some(map.clone()),
                    Value::String(raw) => match serde_json::from_str::<Value>(raw) {
                        Ok(Value::Object(map)) => Some(map),
                        _ => None,
                    },
                    _ => None,
                };
                match data {
                    Some(map) => ctx.format.merge_custom_data(item, &map),
                    None => log::warn!("unparsable custom data payload, skipping"),
                }
            }
            FunctionContent::SetCustomModelData { value } => {
                let value = value.resolve_i32(ctx);
                ctx.format.set_custom_model_data(item, value);
            }
            FunctionContent::SetPotion { id } => ctx.format.set_potion(item, id),
            FunctionContent::SetItem { item: id } => item.id = id.clone(),
            FunctionContent::SetContents { component, entries } => {
                set_contents(item, component.as_ref(), entries, ctx);
            }
            FunctionContent::Unknown => {}
        }
    }
}

/// A filterable text payload: either a bare string or `{ "raw": ... }`.
fn filterable_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Object(object) => object.get("raw").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn resolve_modifier(modifier: &AttributeModifier, ctx: &mut LootContext<'_>) -> Value {
    let amount = modifier.amount.resolve_f32(ctx);
    let slot = match &modifier.slot {
        Some(SlotChoice::One(slot)) => Some(slot.clone()),
        Some(SlotChoice::Many(slots)) if slots.is_empty() => None,
        Some(SlotChoice::Many(slots)) => {
            let index = ctx.random.next_bounded_i32(slots.len() as i32) as usize;
            Some(slots[index].clone())
        }
        None => None,
    };

    let mut object = Map::new();
    object.insert("type".to_string(), json!(modifier.attribute.to_string()));
    if let Some(id) = &modifier.id {
        object.insert("id".to_string(), json!(id.to_string()));
    }
    if let Some(name) = &modifier.name {
        object.insert("name".to_string(), json!(name));
    }
    object.insert("amount".to_string(), json!(amount));
    object.insert("operation".to_string(), json!(modifier.operation));
    if let Some(slot) = slot {
        object.insert("slot".to_string(), json!(slot));
    }
    Value::Object(object)
}

/// Populates a nested container by running a synthetic single-roll table
/// over the same context, so the draws stay on the caller's stream.
fn set_contents(
    item: &mut ItemStack,
    component: Option<&Identifier>,
    entries: &[LootEntry],
    ctx: &mut LootContext<'_>,
) {
    let nested = LootTable {
        pools: vec![LootPool {
            rolls: NumberProvider::Constant(1.0),
            bonus_rolls: NumberProvider::default(),
            conditions: Vec::new(),
            functions: Vec::new(),
            entries: entries.to_vec(),
        }],
        functions: Vec::new(),
    };
    let mut produced = Vec::new();
    ctx.descend((), |ctx| {
        table::generate_into(&nested, ctx, &mut |_, stack| produced.push(stack));
    });
    ctx.format.set_contents(item, component, produced);
}

#[cfg(test)]
mod function_test {
    use super::LootFunction;
    use crate::context::EmptyResolver;
    use crate::item::{ItemFormat, ItemStack};
    use crate::test_support::context;
    use lodestone_util::identifier::Identifier;
    use lodestone_util::random::{RandomImpl, legacy_rand::LegacyRand};
    use serde_json::json;

    fn function(value: serde_json::Value) -> LootFunction {
        serde_json::from_value(value).unwrap()
    }

    fn stone(count: i32) -> ItemStack {
        ItemStack::new(Identifier::vanilla("stone"), count)
    }

    #[test]
    fn set_count_replaces_and_adds() {
        let resolver = EmptyResolver;
        let mut ctx = context(0, &resolver);
        let mut item = stone(1);

        function(json!({ "function": "minecraft:set_count", "count": 5 })).apply(&mut item, &mut ctx);
        assert_eq!(item.count, 5);

        function(json!({ "function": "minecraft:set_count", "count": 2, "add": true })).apply(&mut item, &mut ctx);
        assert_eq!(item.count, 7);

        // counts never go negative
        function(json!({ "function": "minecraft:set_count", "count": -64 })).apply(&mut item, &mut ctx);
        assert_eq!(item.count, 0);
    }

    #[test]
    fn limit_count_clamps() {
        let resolver = EmptyResolver;
        let mut ctx = context(0, &resolver);
        let mut item = stone(40);

        function(json!({ "function": "minecraft:limit_count", "limit": { "max": 24 } })).apply(&mut item, &mut ctx);
        assert_eq!(item.count, 24);

        function(json!({ "function": "minecraft:limit_count", "limit": { "min": 30 } })).apply(&mut item, &mut ctx);
        assert_eq!(item.count, 30);
    }

    #[test]
    fn conditions_gate_and_still_draw() {
        let resolver = EmptyResolver;
        let mut ctx = context(13, &resolver);
        let mut item = stone(1);

        let gated = function(json!({
            "function": "minecraft:set_count",
            "count": 9,
            "conditions": [{ "condition": "minecraft:random_chance", "chance": 0.0 }]
        }));
        gated.apply(&mut item, &mut ctx);
        assert_eq!(item.count, 1);

        // the gate's chance draw still happened
        let mut control = LegacyRand::from_seed(13);
        control.next_f32();
        assert_eq!(ctx.random.next_i32(), control.next_i32());
    }

    #[test]
    fn unknown_function_is_a_no_op() {
        let resolver = EmptyResolver;
        let mut ctx = context(0, &resolver);
        let mut item = stone(3);
        let before = item.clone();

        function(json!({ "function": "minecraft:furnace_smelt" })).apply(&mut item, &mut ctx);
        assert_eq!(item, before);
    }

    #[test]
    fn set_damage_math() {
        let resolver = EmptyResolver;
        let mut item = stone(1);
        item.set("minecraft:max_damage", json!(100));

        let mut ctx = context(0, &resolver);
        function(json!({ "function": "minecraft:set_damage", "damage": 0.25 })).apply(&mut item, &mut ctx);
        // durability 0.25 leaves 75 damage on a 100-point item
        assert_eq!(ItemFormat::Component.damage(&item), 75);

        // additive: current durability 0.25 + 0.5 = 0.75
        function(json!({ "function": "minecraft:set_damage", "damage": 0.5, "add": true })).apply(&mut item, &mut ctx);
        assert_eq!(ItemFormat::Component.damage(&item), 25);

        // non-damageable items are left alone
        let mut plain = stone(1);
        function(json!({ "function": "minecraft:set_damage", "damage": 0.5 })).apply(&mut plain, &mut ctx);
        assert!(plain.components.is_empty());
    }

    #[test]
    fn set_name_targets() {
        let resolver = EmptyResolver;
        let mut ctx = context(0, &resolver);
        let mut item = stone(1);

        function(json!({
            "function": "minecraft:set_name",
            "name": { "text": "Renamed" }
        }))
        .apply(&mut item, &mut ctx);
        assert_eq!(item.get("minecraft:custom_name"), Some(&json!({ "text": "Renamed" })));

        function(json!({
            "function": "minecraft:set_name",
            "name": "Plain",
            "target": "item_name"
        }))
        .apply(&mut item, &mut ctx);
        assert_eq!(item.get("minecraft:item_name"), Some(&json!("Plain")));
    }

    #[test]
    fn set_components_writes_and_removes() {
        let resolver = EmptyResolver;
        let mut ctx = context(0, &resolver);
        let mut item = stone(1);

        function(json!({
            "function": "minecraft:set_components",
            "components": { "minecraft:glider": {}, "minecraft:max_stack_size": 16 }
        }))
        .apply(&mut item, &mut ctx);
        assert!(item.has("minecraft:glider"));
        assert_eq!(item.get("minecraft:max_stack_size"), Some(&json!(16)));

        function(json!({
            "function": "minecraft:set_components",
            "components": { "!minecraft:glider": {} }
        }))
        .apply(&mut item, &mut ctx);
        assert!(!item.has("minecraft:glider"));
    }

    #[test]
    fn set_custom_data_both_payloads() {
        let _ = env_logger::try_init();
        let resolver = EmptyResolver;
        let mut ctx = context(0, &resolver);

        let mut item = stone(1);
        function(json!({
            "function": "minecraft:set_custom_data",
            "tag": { "quest": "intro" }
        }))
        .apply(&mut item, &mut ctx);
        assert_eq!(item.get("minecraft:custom_data"), Some(&json!({ "quest": "intro" })));

        // stringified payloads parse; broken ones are skipped
        let mut item = stone(1);
        function(json!({
            "function": "minecraft:set_nbt",
            "tag": "{\"from_string\": 1}"
        }))
        .apply(&mut item, &mut ctx);
        assert_eq!(item.get("minecraft:custom_data"), Some(&json!({ "from_string": 1 })));

        let mut item = stone(1);
        function(json!({
            "function": "minecraft:set_custom_data",
            "tag": "{not json"
        }))
        .apply(&mut item, &mut ctx);
        assert!(item.components.is_empty());
    }

    #[test]
    fn set_item_swaps_identity_only() {
        let resolver = EmptyResolver;
        let mut ctx = context(0, &resolver);
        let mut item = stone(17);
        item.set("minecraft:custom_data", json!({ "keep": true }));

        function(json!({ "function": "minecraft:set_item", "item": "minecraft:diamond" })).apply(&mut item, &mut ctx);
        assert_eq!(item.id, Identifier::vanilla("diamond"));
        assert_eq!(item.count, 17);
        assert!(item.has("minecraft:custom_data"));
    }

    #[test]
    fn set_lore_and_book_cover() {
        let resolver = EmptyResolver;
        let mut ctx = context(0, &resolver);
        let mut book = ItemStack::new(Identifier::vanilla("written_book"), 1);

        function(json!({
            "function": "minecraft:set_lore",
            "lore": [{ "text": "line one" }]
        }))
        .apply(&mut book, &mut ctx);
        assert_eq!(book.get("minecraft:lore"), Some(&json!([{ "text": "line one" }])));

        function(json!({
            "function": "minecraft:set_book_cover",
            "title": { "raw": "Journal" },
            "author": "Nobody",
            "generation": 2
        }))
        .apply(&mut book, &mut ctx);
        assert_eq!(
            book.get("minecraft:written_book_content"),
            Some(&json!({
                "title": { "raw": "Journal" },
                "author": "Nobody",
                "generation": 2
            }))
        );
    }

    #[test]
    fn set_attributes_draws_amount_then_slot() {
        let resolver = EmptyResolver;
        let mut ctx = context(21, &resolver);
        let mut item = stone(1);

        function(json!({
            "function": "minecraft:set_attributes",
            "modifiers": [{
                "attribute": "minecraft:attack_damage",
                "id": "minecraft:bonus",
                "amount": { "min": 1.0, "max": 3.0 },
                "operation": "add_value",
                "slot": ["mainhand", "offhand"]
            }]
        }))
        .apply(&mut item, &mut ctx);

        let mut control = LegacyRand::from_seed(21);
        let amount = 1.0 + control.next_f32() * 2.0;
        let slot = if control.next_bounded_i32(2) == 0 { "mainhand" } else { "offhand" };

        let written = item.get("minecraft:attribute_modifiers").unwrap();
        assert_eq!(
            written,
            &json!([{
                "type": "minecraft:attack_damage",
                "id": "minecraft:bonus",
                "amount": amount,
                "operation": "add_value",
                "slot": slot
            }])
        );
    }

    #[test]
    fn enchant_with_levels_skips_unenchantable_items() {
        let resolver = EmptyResolver;
        let mut ctx = context(5, &resolver);
        let mut item = stone(1);
        let before = item.clone();

        function(json!({ "function": "minecraft:enchant_with_levels", "levels": 30 })).apply(&mut item, &mut ctx);
        assert_eq!(item, before);

        // nothing was drawn either
        let mut control = LegacyRand::from_seed(5);
        assert_eq!(ctx.random.next_i32(), control.next_i32());
    }

    #[test]
    fn sequence_applies_in_order() {
        let resolver = EmptyResolver;
        let mut ctx = context(0, &resolver);
        let mut item = stone(1);

        function(json!({
            "function": "minecraft:sequence",
            "functions": [
                { "function": "minecraft:set_count", "count": 40 },
                { "function": "minecraft:limit_count", "limit": { "max": 10 } }
            ]
        }))
        .apply(&mut item, &mut ctx);
        assert_eq!(item.count, 10);
    }

    #[test]
    fn set_contents_fills_the_container_component() {
        let resolver = EmptyResolver;
        let mut ctx = context(0, &resolver);
        let mut chest = ItemStack::new(Identifier::vanilla("chest"), 1);

        function(json!({
            "function": "minecraft:set_contents",
            "component": "minecraft:container",
            "entries": [
                { "type": "minecraft:item", "name": "minecraft:emerald" }
            ]
        }))
        .apply(&mut chest, &mut ctx);

        assert_eq!(
            chest.get("minecraft:container"),
            Some(&json!([{ "slot": 0, "item": { "id": "minecraft:emerald", "count": 1 } }]))
        );
    }
}
