//! Merits, variations and scars.
//!
//! Every advantage goes through the same steps: the player's record is
//! layered over its rule data, the purchase level is computed, selected
//! deviations are applied, and the effect template for that level is picked.
//! Kind-specific processors add their own computed fields before the effect
//! is rendered with the record in scope as `this`.

pub mod deviation;
mod merit;
mod scar;
mod variation;

use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::context::ProcessingContext;
use crate::errors::{NotationError, Result};
use crate::handlers::{citation_parts, format_citation};
use crate::merge::merge_advantage;
use crate::notation::NotationProcessor;
use crate::system_data::SystemDataLoader;
use crate::value::{extract_number, field_str, number};

use deviation::{apply_all, apply_selected, RegexpReplace};

pub use merit::{MeritProcessor, MeritTree};
pub use scar::{Activation, ScarProcessor};
pub use variation::VariationProcessor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdvantageKind {
    Merit,
    Variation,
    Scar,
}

impl AdvantageKind {
    /// Rule-data alias holding definitions of this kind.
    pub fn alias(self) -> &'static str {
        match self {
            AdvantageKind::Merit => "merits",
            AdvantageKind::Variation => "variations",
            AdvantageKind::Scar => "scars",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AdvantageKind::Merit => "merit",
            AdvantageKind::Variation => "variation",
            AdvantageKind::Scar => "scar",
        }
    }
}

impl fmt::Display for AdvantageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A merged advantage record. The named fields are the ones the pipeline
/// reads; everything else rule data or the player defines rides along in
/// `fields`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvantageRecord {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub deviations: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected_deviations: Vec<Value>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl AdvantageRecord {
    pub fn from_json(kind: AdvantageKind, v: Value) -> Result<Self> {
        let key = field_str(&v, "key").unwrap_or("?").to_string();
        serde_json::from_value(v)
            .map_err(|e| NotationError::RuleData(format!("{kind} '{key}' is malformed: {e}")))
    }

    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Field overrides applied on top of the record.
    fn overridden(&self, kind: AdvantageKind, overrides: &Map<String, Value>) -> Result<Self> {
        if overrides.is_empty() {
            return Ok(self.clone());
        }
        let mut map = self.to_map();
        map.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self::from_json(kind, Value::Object(map))
    }
}

/// What every advantage exposes regardless of kind.
pub trait AdvantageFields {
    /// `display` → `name` → `key`.
    fn display(&self) -> String;
    /// The numeric value this kind buys its level with, if any.
    fn resolve_numeric_value(&self) -> Option<f64>;
    /// Rule-defined deviations by name.
    fn deviations(&self) -> &Map<String, Value>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Advantage {
    Merit(AdvantageRecord),
    Variation(AdvantageRecord),
    Scar(AdvantageRecord),
}

impl Advantage {
    pub fn new(kind: AdvantageKind, record: AdvantageRecord) -> Self {
        match kind {
            AdvantageKind::Merit => Advantage::Merit(record),
            AdvantageKind::Variation => Advantage::Variation(record),
            AdvantageKind::Scar => Advantage::Scar(record),
        }
    }

    pub fn kind(&self) -> AdvantageKind {
        match self {
            Advantage::Merit(_) => AdvantageKind::Merit,
            Advantage::Variation(_) => AdvantageKind::Variation,
            Advantage::Scar(_) => AdvantageKind::Scar,
        }
    }

    pub fn record(&self) -> &AdvantageRecord {
        match self {
            Advantage::Merit(r) | Advantage::Variation(r) | Advantage::Scar(r) => r,
        }
    }

    pub fn key(&self) -> &str {
        &self.record().key
    }

    /// Level the effect text is chosen by; 1 when nothing numeric is set.
    pub fn purchase_level(&self) -> i64 {
        self.resolve_numeric_value()
            .map(|n| n.round() as i64)
            .unwrap_or(1)
    }
}

impl AdvantageFields for Advantage {
    fn display(&self) -> String {
        let r = self.record();
        r.display
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| r.name.clone().filter(|s| !s.is_empty()))
            .unwrap_or_else(|| r.key.clone())
    }

    fn resolve_numeric_value(&self) -> Option<f64> {
        let value = self.record().value.as_ref()?;
        match self {
            Advantage::Merit(_) => extract_number(value, false),
            Advantage::Variation(_) | Advantage::Scar(_) => match value {
                Value::Object(_) => {
                    let inner = value.get("value").filter(|v| v.is_object()).unwrap_or(value);
                    ["total", "base", "min"]
                        .iter()
                        .find_map(|f| inner.get(*f).and_then(Value::as_f64))
                }
                other => extract_number(other, false),
            },
        }
    }

    fn deviations(&self) -> &Map<String, Value> {
        &self.record().deviations
    }
}

/// An advantage ready to render.
#[derive(Debug, Clone)]
pub struct PreparedAdvantage {
    pub advantage: Advantage,
    pub purchase_level: i64,
    pub adjusted_value: f64,
    pub effect_template: String,
    pub regexp_replacements: Vec<RegexpReplace>,
    pub applied_deviations: Vec<String>,
}

/// Merge the player's record over rule data, apply selected deviations and
/// pick the effect template for the purchase level.
pub fn prepare_advantage(
    kind: AdvantageKind,
    player: &Value,
    loader: &SystemDataLoader,
) -> Result<PreparedAdvantage> {
    let key = field_str(player, "key")
        .ok_or_else(|| NotationError::RuleData(format!("{kind} record without a key: {player}")))?;
    let rule = loader.get_system_data(kind.alias(), key).unwrap_or_else(|| {
        debug!(kind = %kind, key = %key, "no rule data; using the player record alone");
        json!({})
    });
    let record = AdvantageRecord::from_json(kind, merge_advantage(&rule, player))?;

    let purchase_level = Advantage::new(kind, record.clone()).purchase_level();
    let outcome = apply_selected(key, &record.deviations, &record.selected_deviations)?;
    let record = record.overridden(kind, &outcome.replacements)?;
    let effect_template = select_effect(kind, &record, purchase_level)?;

    Ok(PreparedAdvantage {
        advantage: Advantage::new(kind, record),
        purchase_level,
        adjusted_value: purchase_level as f64 + outcome.mag_mod,
        effect_template,
        regexp_replacements: outcome.regexp_replacements,
        applied_deviations: outcome.applied,
    })
}

fn select_effect(kind: AdvantageKind, record: &AdvantageRecord, level: i64) -> Result<String> {
    let key = &record.key;
    match &record.effect {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Object(levels)) => levels
            .get(&level.to_string())
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                NotationError::RuleData(format!(
                    "{kind} '{key}' has no effect for level {level}; available levels: {}",
                    levels.keys().join(", ")
                ))
            }),
        Some(other) => Err(NotationError::RuleData(format!(
            "{kind} '{key}' effect must be text or a per-level map, found {other}"
        ))),
        None => Err(NotationError::RuleData(format!("{kind} '{key}' has no effect text"))),
    }
}

/// Where advantages are rendered: the processor and the character scope.
pub struct AdvantageEnv<'a> {
    pub processor: &'a NotationProcessor,
    pub ctx: &'a ProcessingContext,
}

impl<'a> AdvantageEnv<'a> {
    pub fn new(processor: &'a NotationProcessor, ctx: &'a ProcessingContext) -> Self {
        Self { processor, ctx }
    }

    pub fn loader(&self) -> &SystemDataLoader {
        self.processor.resolver().loader()
    }
}

/// Per-kind strategy over the shared pipeline.
pub trait AdvantageProcessor {
    fn kind(&self) -> AdvantageKind;

    /// Computed fields added before the effect is rendered, so effect text
    /// can refer to them through `this`.
    fn annotate(
        &self,
        _prepared: &PreparedAdvantage,
        _entity: &mut Map<String, Value>,
        _env: &AdvantageEnv<'_>,
    ) -> Result<()> {
        Ok(())
    }

    fn prepare(&self, player: &Value, env: &AdvantageEnv<'_>) -> Result<PreparedAdvantage> {
        prepare_advantage(self.kind(), player, env.loader())
    }

    /// Prepare and render one advantage into its processed record.
    fn process(&self, player: &Value, env: &AdvantageEnv<'_>) -> Result<Map<String, Value>> {
        let prepared = self.prepare(player, env)?;
        let mut entity = prepared.advantage.record().to_map();
        entity.insert("purchaseLevel".into(), Value::from(prepared.purchase_level));
        entity.insert("adjustedValue".into(), number(prepared.adjusted_value));
        entity.insert("display".into(), Value::String(prepared.advantage.display()));
        if !prepared.applied_deviations.is_empty() {
            entity.insert("appliedDeviations".into(), json!(prepared.applied_deviations));
        }
        self.annotate(&prepared, &mut entity, env)?;
        render_texts(&prepared, entity, env)
    }
}

/// Effect, narrative and citation, rendered with the entity as `this`.
fn render_texts(
    prepared: &PreparedAdvantage,
    mut entity: Map<String, Value>,
    env: &AdvantageEnv<'_>,
) -> Result<Map<String, Value>> {
    let scope = env.ctx.with_entity(Value::Object(entity.clone()));
    let template = apply_all(&prepared.regexp_replacements, &prepared.effect_template);
    let effect = env.processor.process(&template, &scope)?;
    entity.insert("effect".into(), Value::String(effect));

    if let Some(narrative) = entity.get("narrative").and_then(Value::as_str).map(str::to_string) {
        let rendered = env.processor.process(&narrative, &scope)?;
        entity.insert("narrative".into(), Value::String(rendered));
    }

    if let Some((book, page)) = entity.get("source").and_then(citation_parts) {
        match format_citation(&book, &page) {
            Ok(citation) => {
                entity.insert("citation".into(), Value::String(citation));
            }
            Err(e) => debug!(key = prepared.advantage.key(), error = %e, "source not cited"),
        }
    }
    debug!(
        kind = %prepared.advantage.kind(),
        key = prepared.advantage.key(),
        level = prepared.purchase_level,
        "processed advantage"
    );
    Ok(entity)
}

/// Player records listed under `field`: an array, or an object keyed by
/// advantage key. Bare strings are taken as keys.
pub fn player_records(character: &Value, field: &str) -> Vec<Value> {
    let normalize = |v: &Value| match v {
        Value::String(key) => json!({ "key": key }),
        other => other.clone(),
    };
    match character.get(field) {
        Some(Value::Array(items)) => items.iter().map(normalize).collect(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(key, v)| match v {
                Value::Object(obj) if !obj.contains_key("key") => {
                    let mut obj = obj.clone();
                    obj.insert("key".into(), Value::String(key.clone()));
                    Value::Object(obj)
                }
                Value::Object(_) => v.clone(),
                _ => json!({ "key": key, "value": v }),
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn loader() -> SystemDataLoader {
        SystemDataLoader::from_definitions([(
            "merits",
            json!({
                "allies": {
                    "name": "Allies",
                    "effect": {"1": "One ally.", "2": "Two allies.", "3": "Three allies."},
                    "tags": ["social"],
                    "deviations": {
                        "Loyal": {"magMod": 1},
                        "Devoted": {"magMod": 2},
                        "Sworn": {"replace": {"effect": "Sworn allies."}}
                    }
                },
                "giant": {"name": "Giant", "value": 3, "effect": "Size +1."}
            }),
        )])
    }

    #[test]
    fn player_record_overrides_rule_data() {
        let prepared = prepare_advantage(
            AdvantageKind::Merit,
            &json!({"key": "allies", "value": 2, "tags": ["police", "police"]}),
            &loader(),
        )
        .unwrap();
        assert_eq!(prepared.purchase_level, 2);
        assert_eq!(prepared.effect_template, "Two allies.");
        let record = prepared.advantage.record();
        assert_eq!(record.fields.get("tags"), Some(&json!(["police"])));
        assert_eq!(prepared.advantage.display(), "Allies");
        assert_eq!(prepared.advantage.deviations().len(), 3);
    }

    #[test]
    fn mag_mods_add_to_the_level() {
        let prepared = prepare_advantage(
            AdvantageKind::Merit,
            &json!({"key": "allies", "value": 3, "deviations": ["Loyal", "Devoted"]}),
            &loader(),
        )
        .unwrap();
        assert_eq!(prepared.adjusted_value, 6.0);
        assert_eq!(prepared.applied_deviations, vec!["Loyal", "Devoted"]);
        assert_eq!(prepared.advantage.deviations().len(), 3);
    }

    #[test]
    fn replace_deviations_change_the_effect() {
        let prepared = prepare_advantage(
            AdvantageKind::Merit,
            &json!({"key": "allies", "value": 1, "deviations": ["Sworn"]}),
            &loader(),
        )
        .unwrap();
        assert_eq!(prepared.effect_template, "Sworn allies.");
    }

    #[test]
    fn purchase_level_defaults_to_one() {
        let loader = SystemDataLoader::from_definitions([(
            "merits",
            json!({"plain": {"effect": {"1": "Level one."}}}),
        )]);
        let prepared =
            prepare_advantage(AdvantageKind::Merit, &json!({"key": "plain"}), &loader).unwrap();
        assert_eq!(prepared.purchase_level, 1);
        assert_eq!(prepared.effect_template, "Level one.");
    }

    #[test]
    fn rule_value_is_used_when_player_has_none() {
        let prepared =
            prepare_advantage(AdvantageKind::Merit, &json!({"key": "giant"}), &loader()).unwrap();
        assert_eq!(prepared.purchase_level, 3);
        assert_eq!(prepared.effect_template, "Size +1.");
    }

    #[test]
    fn missing_level_lists_available_levels() {
        let err = prepare_advantage(
            AdvantageKind::Merit,
            &json!({"key": "allies", "value": 5}),
            &loader(),
        )
        .unwrap_err();
        assert!(matches!(err, NotationError::RuleData(_)));
        assert!(err.to_string().contains("available levels: 1, 2, 3"));
    }

    #[test]
    fn missing_effect_and_key_are_rule_data_errors() {
        let err = prepare_advantage(AdvantageKind::Scar, &json!({"key": "unknown"}), &loader())
            .unwrap_err();
        assert!(err.to_string().contains("has no effect text"));
        let err = prepare_advantage(AdvantageKind::Merit, &json!({"value": 1}), &loader())
            .unwrap_err();
        assert!(err.to_string().contains("without a key"));
    }

    #[test]
    fn variation_level_prefers_total_then_base() {
        let record = AdvantageRecord {
            key: "v".into(),
            value: Some(json!({"base": 2, "min": 1})),
            ..Default::default()
        };
        assert_eq!(Advantage::Variation(record.clone()).purchase_level(), 2);
        let record = AdvantageRecord {
            value: Some(json!({"min": 1, "total": 4})),
            ..record
        };
        assert_eq!(Advantage::Scar(record).purchase_level(), 4);
    }

    #[test]
    fn player_records_accept_maps_and_keys() {
        let character = json!({
            "merits": {"allies": {"value": 2}, "giant": 1},
            "scars": ["odd"]
        });
        let merits = player_records(&character, "merits");
        assert_eq!(merits.len(), 2);
        assert!(merits.contains(&json!({"key": "allies", "value": 2})));
        assert!(merits.contains(&json!({"key": "giant", "value": 1})));
        assert_eq!(player_records(&character, "scars"), vec![json!({"key": "odd"})]);
        assert!(player_records(&character, "variations").is_empty());
    }
}
