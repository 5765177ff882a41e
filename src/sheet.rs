//! Character sheet orchestration: builds the rendering context from a
//! player character and renders page templates against it.

use std::cell::OnceCell;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info_span};

use crate::advantage::{
    player_records, AdvantageEnv, AdvantageProcessor, MeritProcessor, ScarProcessor,
    VariationProcessor,
};
use crate::config::ProcessorConfig;
use crate::context::{ProcessingContext, SourceLocation};
use crate::dotline::{dotline, render, DotValue};
use crate::errors::Result;
use crate::notation::NotationProcessor;
use crate::system_data::SystemDataLoader;

const RATED_TRAITS: [&str; 2] = ["attributes", "skills"];

pub struct PcSheet {
    character: Value,
    processor: NotationProcessor,
    built: OnceCell<Arc<Value>>,
}

impl PcSheet {
    pub fn new(character: Value, loader: Arc<SystemDataLoader>) -> Self {
        Self::with_config(character, loader, ProcessorConfig::default())
    }

    pub fn with_config(character: Value, loader: Arc<SystemDataLoader>, config: ProcessorConfig) -> Self {
        Self::with_processor(character, NotationProcessor::with_config(loader, config))
    }

    pub fn with_processor(character: Value, processor: NotationProcessor) -> Self {
        Self {
            character,
            processor,
            built: OnceCell::new(),
        }
    }

    pub fn processor(&self) -> &NotationProcessor {
        &self.processor
    }

    pub fn character(&self) -> &Value {
        &self.character
    }

    fn scope(&self, context: Value) -> ProcessingContext {
        ProcessingContext::new(context).with_strict(self.processor.config().strict)
    }

    /// A copy of the character with dotlines on rated traits and every
    /// advantage processed: scars first, then the merit tree, then
    /// top-level variations.
    pub fn build_context(&self) -> Result<Value> {
        let name = self.character.get("name").and_then(Value::as_str).unwrap_or("?");
        let span = info_span!("build_context", character = %name);
        let _enter = span.enter();

        let mut context = self.character.clone();
        attach_dotlines(&mut context, self.processor.config().max_dots);

        let scar_inputs = player_records(&context, "scars");
        let scars = {
            let scope = self.scope(context.clone());
            let env = AdvantageEnv::new(&self.processor, &scope);
            scar_inputs
                .iter()
                .map(|record| ScarProcessor.process(record, &env).map(Value::Object))
                .collect::<Result<Vec<_>>>()?
        };
        debug!(count = scars.len(), "processed scars");
        set_field(&mut context, "scars", Value::Array(scars));

        let scope = self.scope(context.clone());
        let env = AdvantageEnv::new(&self.processor, &scope);
        let tree = MeritProcessor.process_tree(&player_records(&context, "merits"), &env)?;
        debug!(
            merits = tree.merits.len(),
            secondary_variations = tree.variations.len(),
            "processed merit tree"
        );

        let mut variations = tree.variations;
        for record in player_records(&context, "variations") {
            variations.push(Value::Object(VariationProcessor.process(&record, &env)?));
        }
        debug!(count = variations.len(), "processed variations");

        set_field(&mut context, "merits", Value::Array(tree.merits));
        set_field(&mut context, "variations", Value::Array(variations));
        Ok(context)
    }

    fn built(&self) -> Result<Arc<Value>> {
        if let Some(built) = self.built.get() {
            return Ok(Arc::clone(built));
        }
        let built = Arc::new(self.build_context()?);
        Ok(Arc::clone(self.built.get_or_init(|| built)))
    }

    /// Expand a page template against the built context. The context is
    /// built on first use and reused afterwards.
    pub fn render(&self, template: &str, location: Option<SourceLocation>) -> Result<String> {
        let mut scope = ProcessingContext::from_shared(self.built()?)
            .with_strict(self.processor.config().strict);
        if let Some(location) = location {
            scope = scope.with_location(location);
        }
        self.processor.process(template, &scope)
    }
}

fn set_field(context: &mut Value, field: &str, value: Value) {
    if let Value::Object(map) = context {
        map.insert(field.to_string(), value);
    }
}

/// Attach a `dotline` to every attribute and skill object.
fn attach_dotlines(context: &mut Value, limit: usize) {
    for group in RATED_TRAITS {
        let Some(Value::Object(traits)) = context.get_mut(group) else {
            continue;
        };
        for (_, rated) in traits.iter_mut() {
            let line = render(&dotline(DotValue::from_json(rated, None).capped(limit)));
            if let Some(map) = rated.as_object_mut() {
                map.insert("dotline".into(), Value::String(line));
            }
        }
    }
}
