use serde::{Deserialize, Serialize};

/// Tuning knobs for method reference resolution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodRefConfig {
    /// Poll the cancellation token every N visited declarations (`1` = every declaration).
    pub cancellation_checkpoint_interval: u32,
    /// Cache resolutions per site and version. Disabling recomputes on every request.
    pub cache_enabled: bool,
    /// Emit a `warn` event whenever inference falls back to the degenerate strategy.
    pub log_degenerate_inference: bool,
}

impl Default for MethodRefConfig {
    fn default() -> Self {
        Self {
            cancellation_checkpoint_interval: 1,
            cache_enabled: true,
            log_degenerate_inference: true,
        }
    }
}

impl MethodRefConfig {
    /// Checkpoint interval with `0` treated as "every declaration".
    pub(crate) fn checkpoint_interval(&self) -> u32 {
        self.cancellation_checkpoint_interval.max(1)
    }
}
