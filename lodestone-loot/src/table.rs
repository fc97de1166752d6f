use serde::Deserialize;

use lodestone_util::identifier::Identifier;
use lodestone_util::random::RandomImpl;

use crate::condition::{self, LootCondition};
use crate::context::{LootContext, LootOptions, StackMixer};
use crate::entry::{LeafEntry, LootEntry};
use crate::function::{self, LootFunction};
use crate::item::{ItemStack, SlottedItem};
use crate::mixer;
use crate::provider::NumberProvider;
use crate::serde_lenient;

fn default_rolls() -> NumberProvider {
    NumberProvider::Constant(1.0)
}

/// A parsed loot table: pools rolled in order, then table-wide functions
/// applied to everything they produce.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct LootTable {
    #[serde(default, deserialize_with = "serde_lenient::pools")]
    pub pools: Vec<LootPool>,
    #[serde(default, deserialize_with = "serde_lenient::functions")]
    pub functions: Vec<LootFunction>,
}

/// Reference to another table, either by id or written out inline.
#[derive(Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum TableRef {
    Named(Identifier),
    Inline(Box<LootTable>),
}

#[derive(Deserialize, Clone, Debug)]
pub struct LootPool {
    #[serde(default = "default_rolls")]
    pub rolls: NumberProvider,
    #[serde(default)]
    pub bonus_rolls: NumberProvider,
    #[serde(default, deserialize_with = "serde_lenient::conditions")]
    pub conditions: Vec<LootCondition>,
    #[serde(default, deserialize_with = "serde_lenient::functions")]
    pub functions: Vec<LootFunction>,
    #[serde(default, deserialize_with = "serde_lenient::entries")]
    pub entries: Vec<LootEntry>,
}

impl LootTable {
    /// Rolls the table once and lays the drops out according to the
    /// configured mixer. The same options always produce the same output.
    pub fn generate(&self, options: &LootOptions<'_>) -> Vec<SlottedItem> {
        let mut ctx = LootContext::new(options);
        let mut produced = Vec::new();
        generate_into(self, &mut ctx, &mut |_, item| produced.push(item));
        match options.mixer {
            StackMixer::Container => mixer::fill_container(produced, &mut ctx),
            StackMixer::Default => mixer::assign_slots(produced),
        }
    }
}

/// Rolls `table` into `consumer`, wrapping it so the table's own
/// functions run after the per-pool ones.
pub(crate) fn generate_into<'w>(
    table: &LootTable,
    ctx: &mut LootContext<'w>,
    consumer: &mut dyn FnMut(&mut LootContext<'w>, ItemStack),
) {
    let functions = &table.functions;
    let mut decorated = |ctx: &mut LootContext<'w>, mut item: ItemStack| {
        function::apply_all(functions, &mut item, ctx);
        consumer(ctx, item);
    };
    for pool in &table.pools {
        roll_pool(pool, ctx, &mut decorated);
    }
}

fn roll_pool<'w>(
    pool: &LootPool,
    ctx: &mut LootContext<'w>,
    consumer: &mut dyn FnMut(&mut LootContext<'w>, ItemStack),
) {
    if !condition::test_all(&pool.conditions, ctx) {
        return;
    }
    let functions = &pool.functions;
    let mut decorated = |ctx: &mut LootContext<'w>, mut item: ItemStack| {
        function::apply_all(functions, &mut item, ctx);
        consumer(ctx, item);
    };
    // base rolls resolve before the bonus, and luck only scales the bonus
    let rolls = pool.rolls.resolve_i32(ctx)
        + (pool.bonus_rolls.resolve_f32(ctx) * ctx.luck).floor() as i32;
    for _ in 0..rolls.max(0) {
        roll_once(pool, ctx, &mut decorated);
    }
}

/// One weighted selection. Entries re-expand every roll, since their
/// conditions may flip between rolls.
fn roll_once<'w>(
    pool: &LootPool,
    ctx: &mut LootContext<'w>,
    consumer: &mut dyn FnMut(&mut LootContext<'w>, ItemStack),
) {
    let luck = ctx.luck;
    let mut candidates: Vec<(LeafEntry<'_>, i32)> = Vec::new();
    let mut total_weight = 0i32;
    for entry in &pool.entries {
        entry.expand(ctx, &mut |leaf| {
            let weight = leaf.effective_weight(luck);
            if weight > 0 {
                candidates.push((leaf, weight));
                // saturate so absurd weights cannot wrap into a negative bound
                total_weight = total_weight.saturating_add(weight);
            }
        });
    }
    match candidates.as_slice() {
        [] => {}
        // a forced outcome costs no draw
        [(leaf, _)] => leaf.create_item(ctx, consumer),
        _ => {
            let mut remaining = ctx.random.next_bounded_i32(total_weight);
            for (leaf, weight) in &candidates {
                remaining -= weight;
                if remaining < 0 {
                    leaf.create_item(ctx, consumer);
                    return;
                }
            }
        }
    }
}
