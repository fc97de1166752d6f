use super::{RandomDeriver, RandomDeriverImpl, RandomGenerator, RandomImpl, java_string_hash};

const MULTIPLIER: u64 = 0x5DEECE66D;
const INCREMENT: u64 = 0xB;
const SEED_MASK: u64 = (1 << 48) - 1;

/// The 48-bit linear congruential generator of `java.util.Random`.
///
/// Every draw matches the JVM implementation bit for bit, which is what
/// keeps loot replay identical to the legacy game for a given seed.
pub struct LegacyRand {
    seed: u64,
}

impl LegacyRand {
    pub fn from_seed(seed: u64) -> Self {
        LegacyRand {
            seed: (seed ^ MULTIPLIER) & SEED_MASK,
        }
    }

    fn next_random(&mut self) -> u64 {
        let seed = self
            .seed
            .wrapping_mul(MULTIPLIER)
            .wrapping_add(INCREMENT)
            & SEED_MASK;
        self.seed = seed;
        seed
    }

    fn next(&mut self, bits: u64) -> i32 {
        (self.next_random() >> (48 - bits)) as i32
    }
}

impl RandomImpl for LegacyRand {
    fn split(&mut self) -> Self {
        LegacyRand::from_seed(self.next_i64() as u64)
    }

    fn next_splitter(&mut self) -> RandomDeriver {
        LegacySplitter::new(self.next_i64() as u64).into()
    }

    fn next_i32(&mut self) -> i32 {
        self.next(32)
    }

    fn next_bounded_i32(&mut self, bound: i32) -> i32 {
        // power of two shortcut, same as the JVM
        if (bound & bound.wrapping_neg()) == bound {
            ((bound as i64).wrapping_mul(self.next(31) as i64) >> 31) as i32
        } else {
            loop {
                let bits = self.next(31);
                let value = bits % bound;
                if bits.wrapping_sub(value).wrapping_add(bound - 1) >= 0 {
                    return value;
                }
            }
        }
    }

    fn next_i64(&mut self) -> i64 {
        let high = (self.next(32) as i64) << 32;
        high.wrapping_add(self.next(32) as i64)
    }

    fn next_bool(&mut self) -> bool {
        self.next(1) != 0
    }

    fn next_f32(&mut self) -> f32 {
        self.next(24) as f32 / (1 << 24) as f32
    }

    fn next_f64(&mut self) -> f64 {
        let high = (self.next(26) as i64) << 27;
        let value = high.wrapping_add(self.next(27) as i64);
        value as f64 / (1u64 << 53) as f64
    }
}

#[derive(Clone)]
pub struct LegacySplitter {
    seed: u64,
}

impl LegacySplitter {
    pub fn new(seed: u64) -> Self {
        LegacySplitter { seed }
    }
}

impl RandomDeriverImpl for LegacySplitter {
    fn split_string(&self, seed: &str) -> RandomGenerator {
        let string_hash = java_string_hash(seed) as i64;
        LegacyRand::from_seed((string_hash as u64) ^ self.seed).into()
    }

    fn split_u64(&self, seed: u64) -> RandomGenerator {
        LegacyRand::from_seed(seed).into()
    }
}
