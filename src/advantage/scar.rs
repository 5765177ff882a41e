use std::fmt;

use serde_json::{json, Map, Value};
use tracing::debug;

use super::{AdvantageEnv, AdvantageKind, AdvantageProcessor, PreparedAdvantage};
use crate::comparison::truthy;
use crate::dotline::{render, scar_dots};
use crate::errors::{NotationError, Result};
use crate::shorthand::attribute_display;
use crate::stats::{attribute_base, ScarStat, ScarType};
use crate::value::field_str;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Controlled,
    Involuntary,
    Persistent,
}

impl Activation {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "controlled" => Some(Activation::Controlled),
            "involuntary" => Some(Activation::Involuntary),
            "persistent" => Some(Activation::Persistent),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Activation::Controlled => "controlled",
            Activation::Involuntary => "involuntary",
            Activation::Persistent => "persistent",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Activation::Controlled => "Controlled",
            Activation::Involuntary => "Involuntary",
            Activation::Persistent => "Persistent",
        }
    }

    pub fn badge(self) -> String {
        format!(
            "<span class='badge badge-{}'>{}</span>",
            self.as_str(),
            self.label()
        )
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `activation` as a single value or a list.
fn activations(key: &str, v: Option<&Value>) -> Result<Vec<Activation>> {
    let raw: Vec<&Value> = match v {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
    };
    raw.into_iter()
        .map(|item| {
            item.as_str().and_then(Activation::parse).ok_or_else(|| {
                NotationError::RuleData(format!(
                    "scar '{key}' has unknown activation {item}; expected controlled, involuntary or persistent"
                ))
            })
        })
        .collect()
}

/// Scars get their Power/Finesse/Resistance stats, activation badges and a
/// magnitude dotline.
pub struct ScarProcessor;

impl AdvantageProcessor for ScarProcessor {
    fn kind(&self) -> AdvantageKind {
        AdvantageKind::Scar
    }

    fn annotate(
        &self,
        prepared: &PreparedAdvantage,
        entity: &mut Map<String, Value>,
        env: &AdvantageEnv<'_>,
    ) -> Result<()> {
        let key = prepared.advantage.key();
        let as_value = Value::Object(entity.clone());

        match field_str(&as_value, "type").and_then(ScarType::parse) {
            Some(kind) => {
                let mut stats = Map::new();
                for stat in ScarStat::ALL {
                    let attribute = stat.attribute(kind);
                    let Some(base) = attribute_base(&env.ctx.context, attribute) else {
                        debug!(scar = %key, attribute = %attribute, "character lacks attribute for scar stat");
                        continue;
                    };
                    stats.insert(
                        stat.key().to_string(),
                        json!({
                            "name": stat.label(),
                            "attribute": attribute,
                            "display": attribute_display(attribute).unwrap_or(attribute),
                            "value": base,
                        }),
                    );
                }
                entity.insert("type".into(), Value::String(kind.as_str().to_string()));
                entity.insert("stats".into(), Value::Object(stats));
            }
            None => debug!(scar = %key, "scar has no type; stats skipped"),
        }

        let activation = activations(key, entity.get("activation"))?;
        if !activation.is_empty() {
            let badges: Vec<String> = activation.iter().map(|a| a.badge()).collect();
            entity.insert(
                "activation".into(),
                json!(activation.iter().map(|a| a.as_str()).collect::<Vec<_>>()),
            );
            entity.insert("badges".into(), Value::String(badges.join(" ")));
        }

        let deviation = (prepared.adjusted_value - prepared.purchase_level as f64).round() as i64;
        let free = entity.get("free").is_some_and(truthy)
            || as_value
                .get("value")
                .and_then(|v| v.get("free"))
                .is_some_and(truthy);
        let dots = scar_dots(
            prepared.purchase_level,
            deviation,
            free,
            env.processor.config().max_dots,
        );
        entity.insert("dotline".into(), Value::String(render(&dots)));
        Ok(())
    }
}
