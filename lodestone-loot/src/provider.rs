use lodestone_util::random::RandomImpl;
use serde::Deserialize;

use crate::context::LootContext;

/// A number that is either fixed or drawn from the context random stream.
///
/// Loot JSON writes these as a bare number, a tagged object, or the typeless
/// `{min, max}` / `{value}` shorthands; all four shapes mean the same thing
/// in play.
#[derive(Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum NumberProvider {
    Object(NormalNumberProvider),
    Constant(f32),
    UniformShorthand {
        min: Box<NumberProvider>,
        max: Box<NumberProvider>,
    },
    ConstantShorthand {
        value: f32,
    },
}

#[derive(Deserialize, Clone, Debug)]
#[serde(tag = "type")]
pub enum NormalNumberProvider {
    #[serde(rename = "minecraft:constant", alias = "constant")]
    Constant { value: f32 },
    #[serde(rename = "minecraft:uniform", alias = "uniform")]
    Uniform {
        #[serde(default)]
        min: Box<NumberProvider>,
        #[serde(default)]
        max: Box<NumberProvider>,
    },
    #[serde(rename = "minecraft:binomial", alias = "binomial")]
    Binomial {
        n: Box<NumberProvider>,
        p: Box<NumberProvider>,
    },
    #[serde(other)]
    Unknown,
}

impl Default for NumberProvider {
    fn default() -> Self {
        NumberProvider::Constant(0.0)
    }
}

impl NumberProvider {
    /// Resolves the provider. Constants and unrecognized kinds leave the
    /// random stream untouched; uniform draws one float, binomial draws one
    /// float per trial.
    pub fn resolve_f32(&self, ctx: &mut LootContext<'_>) -> f32 {
        match self {
            NumberProvider::Constant(value) | NumberProvider::ConstantShorthand { value } => *value,
            NumberProvider::UniformShorthand { min, max } => Self::uniform(min, max, ctx),
            NumberProvider::Object(provider) => match provider {
                NormalNumberProvider::Constant { value } => *value,
                NormalNumberProvider::Uniform { min, max } => Self::uniform(min, max, ctx),
                NormalNumberProvider::Binomial { n, p } => {
                    let n = n.resolve_i32(ctx);
                    let p = p.resolve_f32(ctx);
                    let mut successes = 0;
                    for _ in 0..n.max(0) {
                        if ctx.random.next_f32() < p {
                            successes += 1;
                        }
                    }
                    successes as f32
                }
                NormalNumberProvider::Unknown => 0.0,
            },
        }
    }

    /// Rounds half up, like `Math.round` on the float result.
    pub fn resolve_i32(&self, ctx: &mut LootContext<'_>) -> i32 {
        (self.resolve_f32(ctx) + 0.5).floor() as i32
    }

    fn uniform(min: &NumberProvider, max: &NumberProvider, ctx: &mut LootContext<'_>) -> f32 {
        let min = min.resolve_f32(ctx);
        let max = max.resolve_f32(ctx);
        if max < min {
            // inverted bounds collapse to `min` without a draw
            return min;
        }
        min + ctx.random.next_f32() * (max - min)
    }
}

/// An integer range with optional provider-valued bounds; a bare number is
/// an exact match.
#[derive(Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum IntRange {
    Exact(i32),
    Bounds {
        #[serde(default)]
        min: Option<Box<NumberProvider>>,
        #[serde(default)]
        max: Option<Box<NumberProvider>>,
    },
}

impl IntRange {
    /// Tests `value` against the range. Both bounds resolve before the
    /// comparison, in min, max order, so the draw count does not depend on
    /// the outcome.
    pub fn test(&self, value: i32, ctx: &mut LootContext<'_>) -> bool {
        match self {
            IntRange::Exact(exact) => value == *exact,
            IntRange::Bounds { min, max } => {
                let min = min.as_ref().map(|provider| provider.resolve_i32(ctx));
                let max = max.as_ref().map(|provider| provider.resolve_i32(ctx));
                min.map_or(true, |min| value >= min) && max.map_or(true, |max| value <= max)
            }
        }
    }

    /// Clamps `value` into the range, resolving bounds in min, max order.
    pub fn clamp(&self, value: i32, ctx: &mut LootContext<'_>) -> i32 {
        match self {
            IntRange::Exact(exact) => *exact,
            IntRange::Bounds { min, max } => {
                let mut value = value;
                if let Some(min) = min {
                    value = value.max(min.resolve_i32(ctx));
                }
                if let Some(max) = max {
                    value = value.min(max.resolve_i32(ctx));
                }
                value
            }
        }
    }
}
