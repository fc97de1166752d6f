//! Strategies for laying generated stacks out into container slots.

use lodestone_util::random::RandomImpl;

use crate::context::LootContext;
use crate::item::{ItemStack, SlottedItem};

pub const CONTAINER_SIZE: usize = 27;

/// Slots in encounter order: the first non-empty stack lands in slot 0.
pub fn assign_slots(items: Vec<ItemStack>) -> Vec<SlottedItem> {
    items
        .into_iter()
        .filter(|item| !item.is_empty())
        .take(CONTAINER_SIZE)
        .enumerate()
        .map(|(slot, item)| SlottedItem {
            slot: slot as i32,
            item,
        })
        .collect()
}

/// Chest-filling heuristic: stacks are randomly split into fragments while
/// free slots remain, then scattered over a shuffled slot order. Total
/// counts are conserved, only the grouping changes.
pub fn fill_container(items: Vec<ItemStack>, ctx: &mut LootContext<'_>) -> Vec<SlottedItem> {
    let mut slots: Vec<i32> = (0..CONTAINER_SIZE as i32).collect();
    shuffle(&mut slots, ctx);

    let mut splittable = Vec::new();
    let mut finals = Vec::new();
    for item in items {
        if item.is_empty() {
            continue;
        }
        if item.count > 1 {
            splittable.push(item);
        } else {
            finals.push(item);
        }
    }

    while CONTAINER_SIZE as i32 - finals.len() as i32 - splittable.len() as i32 > 0
        && !splittable.is_empty()
    {
        let index = ctx.random.next_bounded_i32(splittable.len() as i32) as usize;
        let mut original = splittable.remove(index);
        let half = ctx.random.next_inbetween_i32(1, original.count / 2);
        let split = original.split_off(half);
        for part in [original, split] {
            if part.count > 1 && ctx.random.next_f32() < 0.5 {
                splittable.push(part);
            } else {
                finals.push(part);
            }
        }
    }

    finals.append(&mut splittable);
    shuffle(&mut finals, ctx);

    let mut placed = Vec::new();
    for item in finals {
        let Some(slot) = slots.pop() else {
            log::warn!("more stacks than container slots, dropping the rest");
            break;
        };
        if !item.is_empty() {
            placed.push(SlottedItem { slot, item });
        }
    }
    placed
}

fn shuffle<T>(values: &mut [T], ctx: &mut LootContext<'_>) {
    let mut index = values.len();
    while index > 1 {
        index -= 1;
        let swap = ctx.random.next_bounded_i32(index as i32 + 1) as usize;
        values.swap(index, swap);
    }
}
