pub mod errors;
pub mod context;
pub mod config;
pub mod diagnostics;
pub mod system_data;
pub mod reference;
pub mod notation;
pub mod handlers;   // plugin model
pub mod advantage;
pub mod sheet;
pub mod dotline;
pub mod format;
pub mod html;
pub mod merge;
pub mod value;
mod comparison;
mod expression;
mod parser;
mod path;
mod shorthand;
mod stats;

use std::sync::Arc;

use serde_json::Value;

pub use advantage::{
    Advantage, AdvantageKind, AdvantageProcessor, MeritProcessor, ScarProcessor, VariationProcessor,
};
pub use config::ProcessorConfig;
pub use context::{ProcessingContext, SourceLocation};
pub use errors::{NotationError, Result};
pub use notation::NotationProcessor;
pub use reference::ReferenceResolver;
pub use sheet::PcSheet;
pub use system_data::SystemDataLoader;

/// Convenience: render one template against a character with rule data
/// read from `data_dir`.
pub fn render(
    character: Value,
    template: &str,
    data_dir: impl Into<std::path::PathBuf>,
    config: ProcessorConfig,
) -> Result<String> {
    let loader = Arc::new(SystemDataLoader::new(data_dir));
    PcSheet::with_config(character, loader, config).render(template, None)
}
