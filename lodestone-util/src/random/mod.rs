use enum_dispatch::enum_dispatch;
use legacy_rand::{LegacyRand, LegacySplitter};

pub mod legacy_rand;

#[enum_dispatch(RandomImpl)]
pub enum RandomGenerator {
    Legacy(LegacyRand),
}

#[derive(Clone)]
#[enum_dispatch(RandomDeriverImpl)]
pub enum RandomDeriver {
    Legacy(LegacySplitter),
}

#[enum_dispatch]
pub trait RandomImpl {
    fn split(&mut self) -> Self;

    fn next_splitter(&mut self) -> RandomDeriver;

    fn next_i32(&mut self) -> i32;

    fn next_bounded_i32(&mut self, bound: i32) -> i32;

    fn next_inbetween_i32(&mut self, min: i32, max: i32) -> i32 {
        self.next_bounded_i32(max - min + 1) + min
    }

    fn next_i64(&mut self) -> i64;

    fn next_bool(&mut self) -> bool;

    fn next_f32(&mut self) -> f32;

    fn next_f64(&mut self) -> f64;
}

#[enum_dispatch]
pub trait RandomDeriverImpl {
    fn split_string(&self, seed: &str) -> RandomGenerator;

    fn split_u64(&self, seed: u64) -> RandomGenerator;
}

/// Hash used to derive per-name random streams, matching the JVM `String`
/// hash so derived streams line up with the legacy game.
pub fn java_string_hash(string: &str) -> i32 {
    let mut hash = 0i32;
    for c in string.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(c as i32);
    }
    hash
}
