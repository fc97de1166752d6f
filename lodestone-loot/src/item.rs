use indexmap::IndexMap;
use lodestone_util::identifier::Identifier;
use serde::Serialize;
use serde_json::{Map, Value, json};

/// Item data era of the target game version.
///
/// The resolution algorithms are identical in both eras; what differs is
/// where keyed item data lives and how text is encoded, so the split stays
/// inside this adapter and never leaks into the engine.
#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemFormat {
    /// Pre-1.20.5 data: one `tag` compound, text as JSON-encoded strings.
    Nbt,
    /// Component data: flat namespaced keys, structured text payloads.
    #[default]
    Component,
}

/// A produced item: identity, count and keyed extra data. Functions mutate
/// stacks in place as they move down the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemStack {
    pub id: Identifier,
    pub count: i32,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub components: IndexMap<String, Value>,
}

/// Final output unit: a produced stack assigned to a container slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlottedItem {
    pub slot: i32,
    pub item: ItemStack,
}

impl ItemStack {
    pub fn new(id: Identifier, count: i32) -> Self {
        Self {
            id,
            count,
            components: IndexMap::new(),
        }
    }

    /// Compares against a vanilla item id.
    pub fn is(&self, path: &str) -> bool {
        self.id.namespace == "minecraft" && self.id.path == path
    }

    pub fn is_empty(&self) -> bool {
        self.count <= 0 || self.is("air")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.components.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.components.insert(key.to_string(), value);
    }

    pub fn has(&self, key: &str) -> bool {
        self.components.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) {
        self.components.shift_remove(key);
    }

    /// Splits off up to `amount` items into a new stack. The counts of the
    /// two stacks always sum to the original count.
    pub fn split_off(&mut self, amount: i32) -> ItemStack {
        let taken = amount.clamp(0, self.count);
        self.count -= taken;
        ItemStack {
            id: self.id.clone(),
            count: taken,
            components: self.components.clone(),
        }
    }

    /// Intrinsic enchantability. Plain books enchant with an implicit value
    /// of 1; anything else needs an `enchantable` component.
    pub fn enchantability(&self) -> i32 {
        if self.is("book") {
            return 1;
        }
        self.get("minecraft:enchantable")
            .and_then(|component| component.get("value"))
            .and_then(Value::as_i64)
            .unwrap_or(0) as i32
    }

    pub fn max_damage(&self) -> i32 {
        self.get("minecraft:max_damage")
            .and_then(Value::as_i64)
            .unwrap_or(0) as i32
    }
}

fn encode_text(text: &Value) -> String {
    serde_json::to_string(text).unwrap_or_default()
}

/// Returns the object stored under a component key, replacing whatever else
/// was there.
pub(crate) fn component_object<'a>(item: &'a mut ItemStack, key: &str) -> &'a mut Map<String, Value> {
    let value = item
        .components
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

pub(crate) fn nested_object<'a>(object: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let value = object
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

impl ItemFormat {
    fn enchantment_key(self, stored: bool) -> &'static str {
        match (self, stored) {
            (ItemFormat::Nbt, false) => "Enchantments",
            (ItemFormat::Nbt, true) => "StoredEnchantments",
            (ItemFormat::Component, false) => "minecraft:enchantments",
            (ItemFormat::Component, true) => "minecraft:stored_enchantments",
        }
    }

    /// Merges `data` into the custom data home of this era, key by key.
    pub fn merge_custom_data(self, item: &mut ItemStack, data: &Map<String, Value>) {
        let target = match self {
            ItemFormat::Nbt => component_object(item, "tag"),
            ItemFormat::Component => component_object(item, "minecraft:custom_data"),
        };
        for (key, value) in data {
            target.insert(key.clone(), value.clone());
        }
    }

    pub fn set_name(self, item: &mut ItemStack, name: &Value, item_name: bool) {
        match self {
            ItemFormat::Nbt => {
                let tag = component_object(item, "tag");
                let display = nested_object(tag, "display");
                display.insert("Name".to_string(), Value::String(encode_text(name)));
            }
            ItemFormat::Component => {
                let key = if item_name {
                    "minecraft:item_name"
                } else {
                    "minecraft:custom_name"
                };
                item.set(key, name.clone());
            }
        }
    }

    pub fn set_lore(self, item: &mut ItemStack, lines: &[Value], replace: bool) {
        let (lore, mut lines) = match self {
            ItemFormat::Nbt => {
                let tag = component_object(item, "tag");
                let display = nested_object(tag, "display");
                let lines: Vec<Value> = lines
                    .iter()
                    .map(|line| Value::String(encode_text(line)))
                    .collect();
                let lore = display
                    .entry("Lore".to_string())
                    .or_insert_with(|| Value::Array(Vec::new()));
                (lore, lines)
            }
            ItemFormat::Component => {
                let lore = item
                    .components
                    .entry("minecraft:lore".to_string())
                    .or_insert_with(|| Value::Array(Vec::new()));
                (lore, lines.to_vec())
            }
        };
        match (replace, lore.as_array_mut()) {
            (false, Some(existing)) => existing.append(&mut lines),
            _ => *lore = Value::Array(lines),
        }
    }

    /// Reads the enchantment level map of the era, skipping entries it
    /// cannot make sense of.
    pub fn enchantment_levels(self, item: &ItemStack, stored: bool) -> IndexMap<Identifier, i32> {
        let mut levels = IndexMap::new();
        match self {
            ItemFormat::Nbt => {
                let list = item
                    .get("tag")
                    .and_then(|tag| tag.get(self.enchantment_key(stored)))
                    .and_then(Value::as_array);
                for entry in list.into_iter().flatten() {
                    let id = entry.get("id").and_then(Value::as_str);
                    let level = entry.get("lvl").and_then(Value::as_i64);
                    if let (Some(id), Some(level)) = (id, level) {
                        if let Ok(id) = Identifier::try_parse(id) {
                            levels.insert(id, level as i32);
                        }
                    }
                }
            }
            ItemFormat::Component => {
                let map = item
                    .get(self.enchantment_key(stored))
                    .and_then(Value::as_object);
                for (id, level) in map.into_iter().flatten() {
                    if let (Ok(id), Some(level)) = (Identifier::try_parse(id), level.as_i64()) {
                        levels.insert(id, level as i32);
                    }
                }
            }
        }
        levels
    }

    /// Writes the enchantment level map back; an empty map removes the
    /// storage key entirely.
    pub fn write_enchantment_levels(
        self,
        item: &mut ItemStack,
        stored: bool,
        levels: &IndexMap<Identifier, i32>,
    ) {
        let key = self.enchantment_key(stored);
        match self {
            ItemFormat::Nbt => {
                let list: Vec<Value> = levels
                    .iter()
                    .map(|(id, level)| json!({ "id": id.to_string(), "lvl": level }))
                    .collect();
                let tag = component_object(item, "tag");
                if list.is_empty() {
                    tag.remove(key);
                } else {
                    tag.insert(key.to_string(), Value::Array(list));
                }
            }
            ItemFormat::Component => {
                if levels.is_empty() {
                    item.remove(key);
                } else {
                    let map: Map<String, Value> = levels
                        .iter()
                        .map(|(id, level)| (id.to_string(), json!(level)))
                        .collect();
                    item.set(key, Value::Object(map));
                }
            }
        }
    }

    pub fn damage(self, item: &ItemStack) -> i32 {
        let value = match self {
            ItemFormat::Nbt => item.get("tag").and_then(|tag| tag.get("Damage")),
            ItemFormat::Component => item.get("minecraft:damage"),
        };
        value.and_then(Value::as_i64).unwrap_or(0) as i32
    }

    pub fn set_damage_value(self, item: &mut ItemStack, damage: i32) {
        match self {
            ItemFormat::Nbt => {
                let tag = component_object(item, "tag");
                tag.insert("Damage".to_string(), json!(damage));
            }
            ItemFormat::Component => item.set("minecraft:damage", json!(damage)),
        }
    }

    pub fn set_custom_model_data(self, item: &mut ItemStack, value: i32) {
        match self {
            ItemFormat::Nbt => {
                let tag = component_object(item, "tag");
                tag.insert("CustomModelData".to_string(), json!(value));
            }
            ItemFormat::Component => item.set("minecraft:custom_model_data", json!(value)),
        }
    }

    pub fn set_potion(self, item: &mut ItemStack, id: &Identifier) {
        match self {
            ItemFormat::Nbt => {
                let tag = component_object(item, "tag");
                tag.insert("Potion".to_string(), json!(id.to_string()));
            }
            ItemFormat::Component => {
                let contents = component_object(item, "minecraft:potion_contents");
                contents.insert("potion".to_string(), json!(id.to_string()));
            }
        }
    }

    pub fn set_book_cover(
        self,
        item: &mut ItemStack,
        title: Option<&str>,
        author: Option<&str>,
        generation: Option<i32>,
    ) {
        match self {
            ItemFormat::Nbt => {
                let tag = component_object(item, "tag");
                if let Some(title) = title {
                    tag.insert("title".to_string(), json!(title));
                }
                if let Some(author) = author {
                    tag.insert("author".to_string(), json!(author));
                }
                if let Some(generation) = generation {
                    tag.insert("generation".to_string(), json!(generation));
                }
            }
            ItemFormat::Component => {
                let content = component_object(item, "minecraft:written_book_content");
                if let Some(title) = title {
                    content.insert("title".to_string(), json!({ "raw": title }));
                }
                if let Some(author) = author {
                    content.insert("author".to_string(), json!(author));
                }
                if let Some(generation) = generation {
                    content.insert("generation".to_string(), json!(generation));
                }
            }
        }
    }

    pub fn set_attribute_modifiers(self, item: &mut ItemStack, mut modifiers: Vec<Value>, replace: bool) {
        let target = match self {
            ItemFormat::Nbt => {
                let tag = component_object(item, "tag");
                tag.entry("AttributeModifiers".to_string())
                    .or_insert_with(|| Value::Array(Vec::new()))
            }
            ItemFormat::Component => item
                .components
                .entry("minecraft:attribute_modifiers".to_string())
                .or_insert_with(|| Value::Array(Vec::new())),
        };
        match (replace, target.as_array_mut()) {
            (false, Some(existing)) => existing.append(&mut modifiers),
            _ => *target = Value::Array(modifiers),
        }
    }

    /// Writes generated container contents. Empty stacks are dropped first;
    /// the remainder keeps its generation order, slotted from zero.
    pub fn set_contents(self, item: &mut ItemStack, component: Option<&Identifier>, stacks: Vec<ItemStack>) {
        let stacks: Vec<ItemStack> = stacks.into_iter().filter(|stack| !stack.is_empty()).collect();
        match self {
            ItemFormat::Nbt => {
                let items: Vec<Value> = stacks
                    .iter()
                    .enumerate()
                    .map(|(slot, stack)| {
                        let mut object = Map::new();
                        object.insert("Slot".to_string(), json!(slot));
                        object.insert("id".to_string(), json!(stack.id.to_string()));
                        object.insert("Count".to_string(), json!(stack.count));
                        for (key, value) in &stack.components {
                            object.insert(key.clone(), value.clone());
                        }
                        Value::Object(object)
                    })
                    .collect();
                let tag = component_object(item, "tag");
                let block_entity = nested_object(tag, "BlockEntityTag");
                block_entity.insert("Items".to_string(), Value::Array(items));
            }
            ItemFormat::Component => {
                let key = component
                    .map(|component| component.to_string())
                    .unwrap_or_else(|| "minecraft:container".to_string());
                let payload = if key == "minecraft:container" {
                    Value::Array(
                        stacks
                            .iter()
                            .enumerate()
                            .map(|(slot, stack)| json!({ "slot": slot, "item": stack }))
                            .collect(),
                    )
                } else {
                    Value::Array(
                        stacks
                            .iter()
                            .map(|stack| serde_json::to_value(stack).unwrap_or(Value::Null))
                            .collect(),
                    )
                };
                item.set(&key, payload);
            }
        }
    }
}
