pub mod condition;
pub mod context;
pub mod enchantment;
pub mod entry;
pub mod function;
pub mod item;
pub mod mixer;
pub mod provider;
mod serde_lenient;
pub mod table;
#[cfg(test)]
mod test_support;

pub use context::{EmptyResolver, LootOptions, LootResolver, Predicate, StackMixer, Weather};
pub use item::{ItemFormat, ItemStack, SlottedItem};
pub use table::{LootPool, LootTable, TableRef};
