//! Scar types and the base-attribute stats derived from them.

use std::fmt;

use serde_json::{json, Value};

use crate::merge::merge_beneath;
use crate::path::find_by_key;
use crate::shorthand::attribute_display;
use crate::system_data::SystemDataLoader;
use crate::value::{extract_number, field_str};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScarType {
    Physical,
    Mental,
    Social,
}

impl ScarType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "physical" => Some(ScarType::Physical),
            "mental" => Some(ScarType::Mental),
            "social" => Some(ScarType::Social),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScarType::Physical => "physical",
            ScarType::Mental => "mental",
            ScarType::Social => "social",
        }
    }
}

impl fmt::Display for ScarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScarStat {
    Power,
    Finesse,
    Resistance,
}

impl ScarStat {
    pub const ALL: [ScarStat; 3] = [ScarStat::Power, ScarStat::Finesse, ScarStat::Resistance];

    /// `scarPower` → Power, and so on.
    pub fn from_reference(expr: &str) -> Option<Self> {
        match expr {
            "scarPower" => Some(ScarStat::Power),
            "scarFinesse" => Some(ScarStat::Finesse),
            "scarResistance" => Some(ScarStat::Resistance),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            ScarStat::Power => "scarPower",
            ScarStat::Finesse => "scarFinesse",
            ScarStat::Resistance => "scarResistance",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScarStat::Power => "Power",
            ScarStat::Finesse => "Finesse",
            ScarStat::Resistance => "Resistance",
        }
    }

    /// The base attribute this stat reads for a scar of `kind`.
    pub fn attribute(self, kind: ScarType) -> &'static str {
        match (kind, self) {
            (ScarType::Mental, ScarStat::Power) => "intelligence",
            (ScarType::Mental, ScarStat::Finesse) => "wits",
            (ScarType::Mental, ScarStat::Resistance) => "resolve",
            (ScarType::Physical, ScarStat::Power) => "strength",
            (ScarType::Physical, ScarStat::Finesse) => "dexterity",
            (ScarType::Physical, ScarStat::Resistance) => "stamina",
            (ScarType::Social, ScarStat::Power) => "presence",
            (ScarType::Social, ScarStat::Finesse) => "manipulation",
            (ScarType::Social, ScarStat::Resistance) => "composure",
        }
    }
}

/// Base (unmodified) rating of an attribute on the character.
pub fn attribute_base(context: &Value, attribute: &str) -> Option<f64> {
    let attr = context.get("attributes")?.get(attribute)?;
    extract_number(attr, true)
}

/// Entity-shaped wrapper around a bare attribute rating.
pub fn synthetic_attribute(key: &str, name: &str, attribute: &str, base: f64) -> Value {
    json!({
        "key": key,
        "name": name,
        "attribute": attribute,
        "display": attribute_display(attribute).unwrap_or(attribute),
        "value": {"base": base, "total": base},
    })
}

/// A scar record from the character, layered over its rule data.
pub fn find_scar(context: &Value, loader: &SystemDataLoader, key: &str) -> Option<Value> {
    let from_sheet = match context.get("scars") {
        Some(Value::Array(items)) => find_by_key(items, key).cloned(),
        Some(Value::Object(map)) => map.get(key).cloned(),
        _ => None,
    };
    let from_rules = loader.get_system_data("scars", key);
    match (from_rules, from_sheet) {
        (Some(rule), Some(sheet)) => Some(merge_beneath(&rule, &sheet)),
        (rule, sheet) => sheet.or(rule),
    }
}

/// Physical/mental/social type of an entity, read directly or through its
/// `entangledScar`. The error string explains which link is missing.
pub fn resolve_scar_type(
    entity: &Value,
    context: &Value,
    loader: &SystemDataLoader,
) -> std::result::Result<ScarType, String> {
    if let Some(kind) = field_str(entity, "type").and_then(ScarType::parse) {
        return Ok(kind);
    }
    let Some(scar_key) = field_str(entity, "entangledScar") else {
        return Err("no physical/mental/social type and no entangledScar".to_string());
    };
    let scar = find_scar(context, loader, scar_key)
        .ok_or_else(|| format!("entangled scar '{scar_key}' not found"))?;
    field_str(&scar, "type")
        .and_then(ScarType::parse)
        .ok_or_else(|| format!("entangled scar '{scar_key}' has no valid type"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character() -> Value {
        json!({
            "attributes": {
                "intelligence": {"value": {"base": 3, "bonus": 1, "total": 4}},
                "presence": 2
            },
            "scars": [{"key": "mirror-skin", "type": "social"}, {"key": "odd"}]
        })
    }

    #[test]
    fn stat_attribute_table() {
        assert_eq!(ScarStat::Power.attribute(ScarType::Mental), "intelligence");
        assert_eq!(ScarStat::Resistance.attribute(ScarType::Physical), "stamina");
        assert_eq!(ScarStat::Finesse.attribute(ScarType::Social), "manipulation");
    }

    #[test]
    fn attribute_base_ignores_bonus() {
        let c = character();
        assert_eq!(attribute_base(&c, "intelligence"), Some(3.0));
        assert_eq!(attribute_base(&c, "presence"), Some(2.0));
        assert_eq!(attribute_base(&c, "wits"), None);
    }

    #[test]
    fn type_through_entangled_scar() {
        let c = character();
        let loader = SystemDataLoader::empty();
        let direct = json!({"type": "Mental"});
        assert_eq!(resolve_scar_type(&direct, &c, &loader), Ok(ScarType::Mental));
        let linked = json!({"entangledScar": "mirror-skin"});
        assert_eq!(resolve_scar_type(&linked, &c, &loader), Ok(ScarType::Social));
        let untyped = json!({"entangledScar": "odd"});
        assert!(resolve_scar_type(&untyped, &c, &loader).is_err());
        let missing = json!({"entangledScar": "nope"});
        assert!(resolve_scar_type(&missing, &c, &loader)
            .unwrap_err()
            .contains("not found"));
        assert!(resolve_scar_type(&json!({}), &c, &loader).is_err());
    }

    #[test]
    fn scar_type_from_rule_data() {
        let loader = SystemDataLoader::from_definitions([(
            "scars",
            json!({"odd": {"type": "physical", "name": "Odd"}}),
        )]);
        let linked = json!({"entangledScar": "odd"});
        assert_eq!(
            resolve_scar_type(&linked, &character(), &loader),
            Ok(ScarType::Physical)
        );
    }
}
