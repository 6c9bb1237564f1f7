//! Bridge configuration

use serde::Deserialize;

use otter_bridge_core::{
    CodecOptions, DEFAULT_LOCAL_REF_CAPACITY, EngineLimits, LongProjection,
};

use crate::error::BridgeResult;

/// Configuration for a [`Realm`](crate::Realm)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Engine allocation limits for strings and arrays
    pub limits: EngineLimits,

    /// Host local references available to one conversion
    pub local_ref_capacity: usize,

    /// Projection of host `Long` into script numbers
    pub long_projection: LongProjection,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            limits: EngineLimits::default(),
            local_ref_capacity: DEFAULT_LOCAL_REF_CAPACITY,
            long_projection: LongProjection::default(),
        }
    }
}

impl BridgeConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from JSON, defaulting every missing field
    pub fn from_json(json: &str) -> BridgeResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set engine allocation limits
    pub fn with_limits(mut self, limits: EngineLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the maximum engine string length
    pub fn with_max_string_length(mut self, max: usize) -> Self {
        self.limits.max_string_length = max;
        self
    }

    /// Set the maximum engine array length
    pub fn with_max_array_length(mut self, max: usize) -> Self {
        self.limits.max_array_length = max;
        self
    }

    /// Set the host local reference table size
    pub fn with_local_ref_capacity(mut self, capacity: usize) -> Self {
        self.local_ref_capacity = capacity;
        self
    }

    /// Set how host `Long` values project into the engine
    pub fn with_long_projection(mut self, projection: LongProjection) -> Self {
        self.long_projection = projection;
        self
    }

    pub(crate) fn codec_options(&self) -> CodecOptions {
        CodecOptions {
            long_projection: self.long_projection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.local_ref_capacity, 512);
        assert_eq!(config.long_projection, LongProjection::Widen);
        assert_eq!(config.limits, EngineLimits::default());
    }

    #[test]
    fn test_from_json_partial() {
        let config = BridgeConfig::from_json(
            r#"{"local_ref_capacity": 16, "long_projection": "int_value", "limits": {"max_array_length": 10}}"#,
        )
        .unwrap();
        assert_eq!(config.local_ref_capacity, 16);
        assert_eq!(config.long_projection, LongProjection::IntValue);
        assert_eq!(config.limits.max_array_length, 10);
        assert_eq!(
            config.limits.max_string_length,
            EngineLimits::default().max_string_length
        );
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = BridgeConfig::from_json("{not json").unwrap_err();
        assert!(err.to_string().starts_with("Invalid bridge configuration"));
    }

    #[test]
    fn test_builder_setters() {
        let config = BridgeConfig::new()
            .with_max_string_length(8)
            .with_max_array_length(4)
            .with_local_ref_capacity(2)
            .with_long_projection(LongProjection::IntValue);
        assert_eq!(config.limits.max_string_length, 8);
        assert_eq!(config.limits.max_array_length, 4);
        assert_eq!(config.local_ref_capacity, 2);
        assert_eq!(config.codec_options().long_projection, LongProjection::IntValue);
    }
}
