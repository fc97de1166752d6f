use lodestone_util::identifier::Identifier;
use lodestone_util::random::RandomImpl;
use serde::Deserialize;

use crate::context::{LootContext, Predicate};
use crate::provider::{IntRange, NumberProvider};
use crate::serde_lenient;

/// A predicate over the loot context.
///
/// The vocabulary is closed. Kinds that would need an entity, block or tool
/// in scope evaluate to `false` here, and so does anything unrecognized;
/// data written for a richer context then simply never passes.
#[derive(Deserialize, Clone, Debug)]
#[serde(tag = "condition")]
pub enum LootCondition {
    #[serde(rename = "minecraft:inverted", alias = "inverted")]
    Inverted { term: Box<LootCondition> },
    #[serde(
        rename = "minecraft:any_of",
        alias = "any_of",
        alias = "minecraft:alternative",
        alias = "alternative"
    )]
    AnyOf {
        #[serde(default, deserialize_with = "serde_lenient::conditions")]
        terms: Vec<LootCondition>,
    },
    #[serde(rename = "minecraft:all_of", alias = "all_of")]
    AllOf {
        #[serde(default, deserialize_with = "serde_lenient::conditions")]
        terms: Vec<LootCondition>,
    },
    #[serde(rename = "minecraft:reference", alias = "reference")]
    Reference { name: Identifier },
    #[serde(rename = "minecraft:random_chance", alias = "random_chance")]
    RandomChance {
        #[serde(default)]
        chance: NumberProvider,
    },
    #[serde(
        rename = "minecraft:random_chance_with_looting",
        alias = "random_chance_with_looting"
    )]
    RandomChanceWithLooting {
        #[serde(default)]
        chance: f32,
        #[serde(default)]
        looting_multiplier: f32,
    },
    #[serde(
        rename = "minecraft:random_chance_with_enchanted_bonus",
        alias = "random_chance_with_enchanted_bonus"
    )]
    RandomChanceWithEnchantedBonus {
        #[serde(default)]
        unenchanted_chance: f32,
    },
    #[serde(rename = "minecraft:table_bonus", alias = "table_bonus")]
    TableBonus {
        #[serde(default)]
        chances: Vec<f32>,
    },
    #[serde(rename = "minecraft:time_check", alias = "time_check")]
    TimeCheck {
        value: IntRange,
        #[serde(default)]
        period: Option<i32>,
    },
    #[serde(rename = "minecraft:weather_check", alias = "weather_check")]
    WeatherCheck {
        #[serde(default)]
        raining: Option<bool>,
        #[serde(default)]
        thundering: Option<bool>,
    },
    #[serde(rename = "minecraft:value_check", alias = "value_check")]
    ValueCheck {
        #[serde(default)]
        value: NumberProvider,
        range: IntRange,
    },
    #[serde(rename = "minecraft:survives_explosion", alias = "survives_explosion")]
    SurvivesExplosion,
    #[serde(rename = "minecraft:killed_by_player", alias = "killed_by_player")]
    KilledByPlayer,
    #[serde(rename = "minecraft:entity_properties", alias = "entity_properties")]
    EntityProperties,
    #[serde(rename = "minecraft:entity_scores", alias = "entity_scores")]
    EntityScores,
    #[serde(rename = "minecraft:block_state_property", alias = "block_state_property")]
    BlockStateProperty,
    #[serde(rename = "minecraft:match_tool", alias = "match_tool")]
    MatchTool,
    #[serde(
        rename = "minecraft:damage_source_properties",
        alias = "damage_source_properties"
    )]
    DamageSourceProperties,
    #[serde(rename = "minecraft:location_check", alias = "location_check")]
    LocationCheck,
    #[serde(
        rename = "minecraft:enchantment_active_check",
        alias = "enchantment_active_check"
    )]
    EnchantmentActiveCheck,
    #[serde(other)]
    Unknown,
}

impl LootCondition {
    pub fn test(&self, ctx: &mut LootContext<'_>) -> bool {
        match self {
            LootCondition::Inverted { term } => !term.test(ctx),
            LootCondition::AnyOf { terms } => terms.is_empty() || terms.iter().any(|term| term.test(ctx)),
            LootCondition::AllOf { terms } => test_all(terms, ctx),
            LootCondition::Reference { name } => match ctx.resolver.predicate(name) {
                Some(predicate) => ctx.descend(true, |ctx| match &predicate {
                    Predicate::Single(condition) => condition.test(ctx),
                    Predicate::All(terms) => test_all(terms, ctx),
                }),
                // an unresolvable reference does not gate anything
                None => true,
            },
            LootCondition::RandomChance { chance } => {
                let chance = chance.resolve_f32(ctx);
                ctx.random.next_f32() < chance
            }
            // no killer in scope, so the looting level stays zero
            LootCondition::RandomChanceWithLooting { chance, .. } => ctx.random.next_f32() < *chance,
            LootCondition::RandomChanceWithEnchantedBonus { unenchanted_chance } => {
                ctx.random.next_f32() < *unenchanted_chance
            }
            LootCondition::TableBonus { chances } => {
                // no tool in scope, so the level-0 chance applies; the draw
                // happens even when the list cannot pass
                let chance = chances.first().copied().unwrap_or(0.0);
                ctx.random.next_f32() < chance
            }
            LootCondition::TimeCheck { value, period } => {
                let time = match period {
                    Some(period) if *period != 0 => ctx.daytime % period,
                    _ => ctx.daytime,
                };
                value.test(time, ctx)
            }
            LootCondition::WeatherCheck { raining, thundering } => {
                raining.map_or(true, |expected| expected == ctx.weather.raining())
                    && thundering.map_or(true, |expected| expected == ctx.weather.thundering())
            }
            LootCondition::ValueCheck { value, range } => {
                let value = value.resolve_i32(ctx);
                range.test(value, ctx)
            }
            LootCondition::SurvivesExplosion => true,
            LootCondition::KilledByPlayer
            | LootCondition::EntityProperties
            | LootCondition::EntityScores
            | LootCondition::BlockStateProperty
            | LootCondition::MatchTool
            | LootCondition::DamageSourceProperties
            | LootCondition::LocationCheck
            | LootCondition::EnchantmentActiveCheck
            | LootCondition::Unknown => false,
        }
    }
}

/// Logical AND over a condition list. An empty list passes; absent
/// condition blocks everywhere rely on that.
pub fn test_all(conditions: &[LootCondition], ctx: &mut LootContext<'_>) -> bool {
    conditions.iter().all(|condition| condition.test(ctx))
}

#[cfg(test)]
mod condition_test {
    use super::{LootCondition, test_all};
    use crate::context::{EmptyResolver, Predicate, Weather};
    use crate::test_support::{TestResolver, context};
    use lodestone_util::identifier::Identifier;
    use lodestone_util::random::{RandomImpl, legacy_rand::LegacyRand};
    use serde_json::json;

    fn condition(value: serde_json::Value) -> LootCondition {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_composites_pass() {
        let resolver = EmptyResolver;
        let mut ctx = context(0, &resolver);

        assert!(condition(json!({ "condition": "minecraft:all_of", "terms": [] })).test(&mut ctx));
        assert!(condition(json!({ "condition": "minecraft:any_of", "terms": [] })).test(&mut ctx));
        assert!(test_all(&[], &mut ctx));
    }

    #[test]
    fn inverted_flips() {
        let resolver = EmptyResolver;
        let mut ctx = context(0, &resolver);
        let inverted = condition(json!({
            "condition": "minecraft:inverted",
            "term": { "condition": "minecraft:survives_explosion" }
        }));
        assert!(!inverted.test(&mut ctx));
    }

    #[test]
    fn unrecognized_kind_fails() {
        let resolver = EmptyResolver;
        let mut ctx = context(0, &resolver);
        let unknown = condition(json!({ "condition": "minecraft:raid_omen", "level": 3 }));
        assert!(matches!(unknown, LootCondition::Unknown));
        assert!(!unknown.test(&mut ctx));
    }

    #[test]
    fn context_free_kinds() {
        let resolver = EmptyResolver;
        let mut ctx = context(0, &resolver);

        assert!(condition(json!({ "condition": "minecraft:survives_explosion" })).test(&mut ctx));
        for name in [
            "minecraft:killed_by_player",
            "minecraft:entity_properties",
            "minecraft:match_tool",
            "minecraft:block_state_property",
            "minecraft:enchantment_active_check",
        ] {
            assert!(!condition(json!({ "condition": name })).test(&mut ctx), "{name}");
        }
    }

    #[test]
    fn random_chance_draws_once() {
        let resolver = EmptyResolver;

        let mut ctx = context(4, &resolver);
        assert!(condition(json!({ "condition": "minecraft:random_chance", "chance": 1.0 })).test(&mut ctx));

        // exactly one float was drawn even for a certain pass
        let mut control = LegacyRand::from_seed(4);
        control.next_f32();
        assert_eq!(ctx.random.next_i32(), control.next_i32());

        let mut ctx = context(4, &resolver);
        assert!(!condition(json!({ "condition": "minecraft:random_chance", "chance": 0.0 })).test(&mut ctx));
    }

    #[test]
    fn table_bonus_draws_even_when_empty() {
        let resolver = EmptyResolver;
        let mut ctx = context(6, &resolver);

        let empty = condition(json!({
            "condition": "minecraft:table_bonus",
            "enchantment": "minecraft:fortune",
            "chances": []
        }));
        assert!(!empty.test(&mut ctx));

        let mut control = LegacyRand::from_seed(6);
        control.next_f32();
        assert_eq!(ctx.random.next_i32(), control.next_i32());

        let mut ctx = context(6, &resolver);
        let certain = condition(json!({
            "condition": "minecraft:table_bonus",
            "enchantment": "minecraft:fortune",
            "chances": [1.0, 1.0]
        }));
        assert!(certain.test(&mut ctx));
    }

    #[test]
    fn weather_check_matrix() {
        let resolver = EmptyResolver;
        let raining = condition(json!({ "condition": "minecraft:weather_check", "raining": true }));
        let dry = condition(json!({ "condition": "minecraft:weather_check", "raining": false }));
        let storm = condition(json!({ "condition": "minecraft:weather_check", "thundering": true }));
        let vacuous = condition(json!({ "condition": "minecraft:weather_check" }));

        let mut ctx = context(0, &resolver);
        ctx.weather = Weather::Clear;
        assert!(!raining.test(&mut ctx));
        assert!(dry.test(&mut ctx));
        assert!(vacuous.test(&mut ctx));

        ctx.weather = Weather::Rain;
        assert!(raining.test(&mut ctx));
        assert!(!storm.test(&mut ctx));

        // thunder counts as rain too
        ctx.weather = Weather::Thunder;
        assert!(raining.test(&mut ctx));
        assert!(storm.test(&mut ctx));
    }

    #[test]
    fn time_check_wraps_with_period() {
        let resolver = EmptyResolver;
        let night = condition(json!({
            "condition": "minecraft:time_check",
            "period": 24000,
            "value": { "min": 13000, "max": 23000 }
        }));

        let mut ctx = context(0, &resolver);
        ctx.daytime = 14000;
        assert!(night.test(&mut ctx));

        // second day, same time of day
        ctx.daytime = 24000 + 14000;
        assert!(night.test(&mut ctx));

        ctx.daytime = 6000;
        assert!(!night.test(&mut ctx));
    }

    #[test]
    fn value_check_resolves_then_compares() {
        let resolver = EmptyResolver;
        let mut ctx = context(0, &resolver);
        let check = condition(json!({
            "condition": "minecraft:value_check",
            "value": 7,
            "range": { "min": 5, "max": 10 }
        }));
        assert!(check.test(&mut ctx));
    }

    #[test]
    fn reference_resolution() {
        let unresolved = EmptyResolver;
        let mut ctx = context(0, &unresolved);
        let reference = condition(json!({ "condition": "minecraft:reference", "name": "minecraft:in_water" }));
        // a predicate nobody defines never gates
        assert!(reference.test(&mut ctx));

        let mut resolver = TestResolver::new();
        resolver.predicates.insert(
            Identifier::vanilla("in_water"),
            Predicate::Single(Box::new(condition(json!({ "condition": "minecraft:killed_by_player" })))),
        );
        let mut ctx = context(0, &resolver);
        assert!(!reference.test(&mut ctx));

        let mut resolver = TestResolver::new();
        resolver.predicates.insert(
            Identifier::vanilla("in_water"),
            Predicate::All(vec![
                condition(json!({ "condition": "minecraft:survives_explosion" })),
                condition(json!({ "condition": "minecraft:survives_explosion" })),
            ]),
        );
        let mut ctx = context(0, &resolver);
        assert!(reference.test(&mut ctx));
    }

    #[test]
    fn cyclic_reference_terminates() {
        let mut resolver = TestResolver::new();
        resolver.predicates.insert(
            Identifier::vanilla("loop"),
            Predicate::Single(Box::new(condition(json!({
                "condition": "minecraft:reference",
                "name": "minecraft:loop"
            })))),
        );
        let mut ctx = context(0, &resolver);
        let reference = condition(json!({ "condition": "minecraft:reference", "name": "minecraft:loop" }));
        // bottoms out at the depth limit instead of overflowing
        assert!(reference.test(&mut ctx));
    }
}
