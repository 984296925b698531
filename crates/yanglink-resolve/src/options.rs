//! Engine options.

/// What the scheduler does when a module unit fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureMode {
    /// Stop at the first error.
    #[default]
    FailFast,
    /// Discard the failing unit, skip units depending on it and keep
    /// linking the rest, reporting every diagnostic at the end.
    Batch,
}

/// Options for one [`link`](crate::link) call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOptions {
    pub failure_mode: FailureMode,
    /// Upper bound on inter-file fixpoint passes.
    pub max_passes: usize,
    /// Run list-key and element-count validation after resolution.
    pub validate_list_keys: bool,
    /// Cap on errors collected in batch mode.
    pub max_diagnostics: usize,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            failure_mode: FailureMode::FailFast,
            max_passes: 64,
            validate_list_keys: true,
            max_diagnostics: 100,
        }
    }
}
