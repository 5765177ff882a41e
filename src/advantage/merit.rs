use std::collections::VecDeque;

use serde_json::{json, Map, Value};
use tracing::debug;

use super::{AdvantageEnv, AdvantageKind, AdvantageProcessor, VariationProcessor};
use crate::errors::{NotationError, Result};
use crate::value::field_str;

pub struct MeritProcessor;

impl AdvantageProcessor for MeritProcessor {
    fn kind(&self) -> AdvantageKind {
        AdvantageKind::Merit
    }
}

/// Processed merits and the variations they granted, in breadth-first order.
#[derive(Debug, Default)]
pub struct MeritTree {
    pub merits: Vec<Value>,
    pub variations: Vec<Value>,
}

struct Node {
    kind: AdvantageKind,
    key: String,
    input: Value,
    parent: Option<usize>,
}

/// Secondary entries may be bare keys or records.
fn child_input(entry: &Value, parent_key: &str) -> Option<Value> {
    let mut record = match entry {
        Value::String(key) => json!({ "key": key }),
        Value::Object(_) => entry.clone(),
        _ => return None,
    };
    if let Some(map) = record.as_object_mut() {
        map.insert("parentKey".into(), Value::String(parent_key.to_string()));
    }
    Some(record)
}

impl MeritProcessor {
    /// Process `merits` and, breadth-first, every secondary merit or
    /// variation they declare. Children carry `parentKey`, parents list
    /// their children in `secondaryKeys`.
    pub fn process_tree(&self, merits: &[Value], env: &AdvantageEnv<'_>) -> Result<MeritTree> {
        let mut arena: Vec<Node> = Vec::with_capacity(merits.len());
        for merit in merits {
            let key = field_str(merit, "key")
                .ok_or_else(|| NotationError::RuleData(format!("merit record without a key: {merit}")))?;
            arena.push(Node {
                kind: AdvantageKind::Merit,
                key: key.to_string(),
                input: merit.clone(),
                parent: None,
            });
        }
        let mut queue: VecDeque<usize> = (0..arena.len()).collect();
        let mut processed: Vec<(AdvantageKind, Map<String, Value>)> = Vec::new();

        while let Some(idx) = queue.pop_front() {
            self.check_ancestry(&arena, idx)?;
            let node = &arena[idx];
            let mut out = match node.kind {
                AdvantageKind::Variation => VariationProcessor.process(&node.input, env)?,
                _ => self.process(&node.input, env)?,
            };
            let parent_key = node.key.clone();

            let mut children = Vec::new();
            for (field, kind) in [
                ("secondaryMerits", AdvantageKind::Merit),
                ("secondaryVariations", AdvantageKind::Variation),
            ] {
                let Some(Value::Array(entries)) = out.get(field) else {
                    continue;
                };
                for entry in entries {
                    let Some(input) = child_input(entry, &parent_key) else {
                        return Err(NotationError::RuleData(format!(
                            "{field} of '{parent_key}' holds {entry}, expected a key or a record"
                        )));
                    };
                    let key = field_str(&input, "key").ok_or_else(|| {
                        NotationError::RuleData(format!("{field} of '{parent_key}' has an entry without a key"))
                    })?;
                    children.push(Node {
                        kind,
                        key: key.to_string(),
                        input: input.clone(),
                        parent: Some(idx),
                    });
                }
            }

            if !children.is_empty() {
                let keys: Vec<&str> = children.iter().map(|c| c.key.as_str()).collect();
                out.insert("secondaryKeys".into(), json!(keys));
                debug!(merit = %parent_key, children = children.len(), "queued secondary advantages");
            }
            for child in children {
                queue.push_back(arena.len());
                arena.push(child);
            }
            processed.push((arena[idx].kind, out));
        }

        let mut tree = MeritTree::default();
        for (kind, out) in processed {
            match kind {
                AdvantageKind::Variation => tree.variations.push(Value::Object(out)),
                _ => tree.merits.push(Value::Object(out)),
            }
        }
        Ok(tree)
    }

    /// A secondary advantage may not repeat one of its own ancestors.
    fn check_ancestry(&self, arena: &[Node], idx: usize) -> Result<()> {
        let node = &arena[idx];
        let mut cursor = node.parent;
        while let Some(p) = cursor {
            let ancestor = &arena[p];
            if ancestor.kind == node.kind && ancestor.key == node.key {
                return Err(NotationError::RuleData(format!(
                    "{} '{}' is its own secondary advantage",
                    node.kind, node.key
                )));
            }
            cursor = ancestor.parent;
        }
        Ok(())
    }
}
