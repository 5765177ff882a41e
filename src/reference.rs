//! Resolution of reference expressions against a processing context.
//!
//! Order, first match wins:
//! 1. `scarPower` / `scarFinesse` / `scarResistance` (needs an entity)
//! 2. `baseInt`, `baseStr`, ... base-attribute shorthands
//! 3. `json.<alias>.<path>` into rule data
//! 4. `this.` / `context.` / `vars.` scoped paths
//! 5. bare `this`
//! 6. shorthand alias, else a dot-path into the context
//!
//! Plain context paths are layered over matching rule data afterwards.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::trace;

use crate::context::ProcessingContext;
use crate::errors::{NotationError, Result};
use crate::merge::{merge_beneath, merge_numeric};
use crate::path::{split_path, traverse};
use crate::shorthand::{attribute_display, base_attribute, resolve_shorthand};
use crate::stats::{attribute_base, resolve_scar_type, synthetic_attribute, ScarStat};
use crate::system_data::{is_known_alias, SystemDataLoader};

#[derive(Debug, Clone)]
pub struct ReferenceResolver {
    loader: Arc<SystemDataLoader>,
}

impl ReferenceResolver {
    pub fn new(loader: Arc<SystemDataLoader>) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &SystemDataLoader {
        &self.loader
    }

    pub fn resolve(&self, expression: &str, ctx: &ProcessingContext) -> Result<Value> {
        let expr = expression.trim();
        if expr.is_empty() {
            return Err(NotationError::reference(expr, "empty reference"));
        }

        if let Some(stat) = ScarStat::from_reference(expr) {
            return self.scar_stat(expr, stat, ctx);
        }

        if let Some(attribute) = base_attribute(expr) {
            let base = attribute_base(&ctx.context, attribute).ok_or_else(|| {
                NotationError::reference(expr, format!("character has no attribute '{attribute}'"))
            })?;
            let name = attribute_display(attribute).unwrap_or(attribute);
            return Ok(synthetic_attribute(attribute, name, attribute, base));
        }

        if let Some(rest) = expr.strip_prefix("json.") {
            return self.json_reference(expr, rest);
        }

        if let Some(rest) = expr.strip_prefix("this.") {
            let entity = ctx
                .entity()
                .ok_or_else(|| NotationError::reference(expr, "no entity in scope"))?;
            let segments = split_path(expr, rest)?;
            return traverse(entity, &segments, expr).cloned();
        }

        if let Some(rest) = expr.strip_prefix("vars.") {
            let vars = ctx
                .vars
                .as_deref()
                .ok_or_else(|| NotationError::reference(expr, "no vars in scope"))?;
            let segments = split_path(expr, rest)?;
            return traverse(vars, &segments, expr).cloned();
        }

        if let Some(rest) = expr.strip_prefix("context.") {
            return self.context_path(expr, rest, ctx);
        }

        if expr == "this" {
            return ctx
                .entity()
                .cloned()
                .ok_or_else(|| NotationError::reference(expr, "no entity in scope"));
        }

        if let Some(canonical) = resolve_shorthand(expr) {
            return self.resolve(&canonical, ctx);
        }

        self.context_path(expr, expr, ctx)
    }

    fn scar_stat(&self, expr: &str, stat: ScarStat, ctx: &ProcessingContext) -> Result<Value> {
        let entity = ctx
            .entity()
            .ok_or_else(|| NotationError::reference(expr, "scar stats need an entity in scope"))?;
        let kind = resolve_scar_type(entity, &ctx.context, &self.loader)
            .map_err(|reason| NotationError::reference(expr, reason))?;
        let attribute = stat.attribute(kind);
        let base = attribute_base(&ctx.context, attribute).ok_or_else(|| {
            NotationError::reference(expr, format!("character has no attribute '{attribute}'"))
        })?;
        Ok(synthetic_attribute(stat.key(), stat.label(), attribute, base))
    }

    fn json_reference(&self, expr: &str, rest: &str) -> Result<Value> {
        let (alias, path) = match rest.split_once('.') {
            Some((alias, path)) => (alias, split_path(expr, path)?),
            None => (rest, Vec::new()),
        };
        let found = if path.is_empty() {
            self.loader.get_data(alias).map(|data| (*data).clone())
        } else {
            self.loader.get_json_reference(alias, &path)
        };
        found.ok_or_else(|| NotationError::reference(expr, format!("no system data at '{rest}'")))
    }

    fn context_path(&self, expr: &str, path: &str, ctx: &ProcessingContext) -> Result<Value> {
        let segments = split_path(expr, path)?;
        let resolved = traverse(&ctx.context, &segments, expr)?;
        Ok(self.merge_system_data(&segments, resolved))
    }

    /// Layer rule data for `<category>.<...>.<key>` beneath the resolved value.
    fn merge_system_data(&self, segments: &[&str], resolved: &Value) -> Value {
        let (Some(category), Some(key)) = (segments.first(), segments.last()) else {
            return resolved.clone();
        };
        if segments.len() < 2 || resolved.is_null() {
            return resolved.clone();
        }
        let rule = if is_known_alias(category) {
            self.loader.get_system_data(category, key)
        } else {
            None
        };
        let merged = match (rule, resolved) {
            (Some(rule), Value::Number(_)) => merge_numeric(&rule, resolved),
            (Some(rule), Value::Object(_)) => merge_beneath(&rule, resolved),
            _ => resolved.clone(),
        };
        trace!(category = *category, key = *key, "resolved context path");
        with_key(merged, key)
    }
}

fn with_key(v: Value, key: &str) -> Value {
    match v {
        Value::Object(map) if !map.contains_key("key") => {
            let mut out = Map::with_capacity(map.len() + 1);
            out.insert("key".to_string(), Value::String(key.to_string()));
            out.extend(map);
            Value::Object(out)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn resolver() -> ReferenceResolver {
        ReferenceResolver::new(Arc::new(SystemDataLoader::from_definitions([
            (
                "skills",
                json!({"athletics": {"name": "Athletics", "tags": ["physical"], "value": {"max": 5}}}),
            ),
            ("attributes", json!({"dexterity": {"name": "Dexterity", "value": 0}})),
            ("scars", json!({"claws": {"type": "physical"}})),
        ])))
    }

    fn ctx() -> ProcessingContext {
        ProcessingContext::new(json!({
            "name": "Ada",
            "attributes": {"strength": 4, "dexterity": 3, "intelligence": {"value": {"base": 2}}},
            "skills": {"athletics": {"value": {"base": 2}, "tags": ["trained"]}},
            "merits": [{"key": "allies", "value": 2}],
            "scars": [{"key": "claws"}]
        }))
    }

    #[test]
    fn plain_paths_merge_rule_data() {
        let v = resolver().resolve("skills.athletics", &ctx()).unwrap();
        assert_eq!(v["name"], json!("Athletics"));
        assert_eq!(v["value"], json!({"max": 5, "base": 2}));
        assert_eq!(v["tags"], json!(["physical", "trained"]));
        assert_eq!(v["key"], json!("athletics"));
    }

    #[test]
    fn numeric_values_replace_rule_value() {
        let v = resolver().resolve("dex", &ctx()).unwrap();
        assert_eq!(v["name"], json!("Dexterity"));
        assert_eq!(v["value"], json!(3));
    }

    #[test]
    fn keyed_arrays_and_scopes() {
        let r = resolver();
        let c = ctx().with_entity(json!({"key": "allies", "value": {"base": 1}}));
        assert_eq!(r.resolve("merits.allies.value", &c).unwrap(), json!(2));
        assert_eq!(r.resolve("this.value.base", &c).unwrap(), json!(1));
        assert_eq!(r.resolve("this", &c).unwrap()["key"], json!("allies"));
        assert_eq!(r.resolve("context.name", &c).unwrap(), json!("Ada"));
        assert!(r.resolve("vars.x", &c).is_err());
        assert_eq!(
            r.resolve("vars.x", &c.with_vars(json!({"x": 5}))).unwrap(),
            json!(5)
        );
    }

    #[test]
    fn missing_scopes_are_errors() {
        let r = resolver();
        assert!(r.resolve("this.name", &ctx()).is_err());
        assert!(r.resolve("this", &ctx()).is_err());
        assert!(r.resolve("scarPower", &ctx()).is_err());
        assert!(r.resolve("skills.brawl", &ctx()).is_err());
    }

    #[test]
    fn scar_stats_follow_entangled_scar() {
        let r = resolver();
        let c = ctx().with_entity(json!({"key": "v", "entangledScar": "claws"}));
        let power = r.resolve("scarPower", &c).unwrap();
        assert_eq!(power["attribute"], json!("strength"));
        assert_eq!(power["value"]["base"], json!(4.0));
        let base = r.resolve("baseInt", &c).unwrap();
        assert_eq!(base["value"]["total"], json!(2.0));
    }

    #[test]
    fn json_references() {
        let r = resolver();
        assert_eq!(r.resolve("json.skills.athletics.name", &ctx()).unwrap(), json!("Athletics"));
        assert_eq!(r.resolve("json.skills.athletics.tags.0", &ctx()).unwrap(), json!("physical"));
        assert!(r.resolve("json.skills.brawl", &ctx()).is_err());
        assert!(r.resolve("json.weapons.x", &ctx()).is_err());
    }
}
