//! Merge rules: defaults first, every later source overrides.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Create a Config builder with merge policy defaults applied.
///
/// Filters have no builder default: an absent `filters` key falls back to
/// the serde default so a file can replace the list wholesale.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("bridge.batch_duration_ms", 100)?
        .set_default("registry.untrack_delay_ms", 1000)?
        .set_default("errors.aggregation_delay_ms", 1000)
}
