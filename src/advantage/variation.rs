use serde_json::{Map, Value};

use super::{AdvantageEnv, AdvantageKind, AdvantageProcessor, PreparedAdvantage};
use crate::errors::{NotationError, Result};
use crate::stats::resolve_scar_type;

/// Variations carry a physical/mental/social type, set directly or taken
/// from the scar they are entangled with.
pub struct VariationProcessor;

impl AdvantageProcessor for VariationProcessor {
    fn kind(&self) -> AdvantageKind {
        AdvantageKind::Variation
    }

    fn annotate(
        &self,
        prepared: &PreparedAdvantage,
        entity: &mut Map<String, Value>,
        env: &AdvantageEnv<'_>,
    ) -> Result<()> {
        let as_value = Value::Object(entity.clone());
        let kind = resolve_scar_type(&as_value, &env.ctx.context, env.loader()).map_err(|reason| {
            NotationError::RuleData(format!(
                "variation '{}': {reason}",
                prepared.advantage.key()
            ))
        })?;
        entity.insert("type".into(), Value::String(kind.as_str().to_string()));
        Ok(())
    }
}
