use serde::Deserialize;

/// Knobs for a `NotationProcessor`, fixed at construction.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProcessorConfig {
    /// Default error policy for contexts the sheet builds.
    pub strict: bool,
    /// Leave tooltip placeholders in the output instead of substituting them.
    pub preserve_placeholders: bool,
    /// Report every registered tooltip to the diagnostics sink.
    pub debug_tooltips: bool,
    /// Seed for placeholder and anchor IDs; `None` draws a random seed.
    pub placeholder_seed: Option<u64>,
    /// Maximum number of spans one outermost `process` call may expand.
    pub max_expansions: usize,
    /// Longest marker row a dotline may render.
    pub max_dots: usize,
    /// Apply em-dash and minus-sign normalization during finalization.
    pub typography: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            strict: true,
            preserve_placeholders: false,
            debug_tooltips: false,
            placeholder_seed: None,
            max_expansions: 10_000,
            max_dots: 20,
            typography: true,
        }
    }
}

impl ProcessorConfig {
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.placeholder_seed = Some(seed);
        self
    }

    pub fn with_preserved_placeholders(mut self, preserve: bool) -> Self {
        self.preserve_placeholders = preserve;
        self
    }

    pub fn with_tooltip_debug(mut self, debug: bool) -> Self {
        self.debug_tooltips = debug;
        self
    }

    pub fn with_typography(mut self, typography: bool) -> Self {
        self.typography = typography;
        self
    }

    /// Clamped to at least one expansion.
    pub fn with_max_expansions(mut self, max: usize) -> Self {
        self.max_expansions = max.max(1);
        self
    }

    /// Clamped to at least one marker.
    pub fn with_max_dots(mut self, max: usize) -> Self {
        self.max_dots = max.max(1);
        self
    }
}
