pub mod identifier;
pub mod random;

pub use identifier::Identifier;
