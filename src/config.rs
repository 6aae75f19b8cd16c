//! # Configuration Management
//!
//! Centralized configuration for the message object model.
//!
//! This module provides structured configuration for message factories,
//! including type registry limits, block attachment limits, and buffer pool
//! sizing for pooled allocators.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-specific overrides via `from_env()`
//!
//! ## Sizing Considerations
//! - Default max block size (1 MB) keeps reassembly memory bounded per message
//! - Default max message types (256) matches an 8-bit type field on the wire
//! - Pool sizing defaults favor small control messages over large blocks

use crate::error::{MessageError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Max block size allowed by default (1 MB)
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 1024 * 1024;

/// Max number of registrable message types by default
pub const DEFAULT_MAX_MESSAGE_TYPES: u16 = 256;

/// Default number of buffers a pooled allocator pre-allocates
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Default capacity of each pooled buffer
pub const DEFAULT_POOL_BUFFER_CAPACITY: usize = 1024;

/// Configuration for a message factory and its allocators.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageConfig {
    /// Maximum number of message types a registry may declare
    pub max_message_types: u16,

    /// Maximum size (bytes) of a block attached to a block-shape message
    pub max_block_size: usize,

    /// Number of buffers a pooled allocator pre-allocates
    pub pool_size: usize,

    /// Capacity (bytes) of each pooled buffer
    pub pool_buffer_capacity: usize,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            max_message_types: DEFAULT_MAX_MESSAGE_TYPES,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            pool_size: DEFAULT_POOL_SIZE,
            pool_buffer_capacity: DEFAULT_POOL_BUFFER_CAPACITY,
        }
    }
}

impl MessageConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| MessageError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| MessageError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| MessageError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Start with defaults
        let mut config = Self::default();

        // Override with environment variables
        if let Ok(types) = std::env::var("MESSAGE_CORE_MAX_MESSAGE_TYPES") {
            if let Ok(val) = types.parse::<u16>() {
                config.max_message_types = val;
            }
        }

        if let Ok(block) = std::env::var("MESSAGE_CORE_MAX_BLOCK_SIZE") {
            if let Ok(val) = block.parse::<usize>() {
                config.max_block_size = val;
            }
        }

        if let Ok(pool) = std::env::var("MESSAGE_CORE_POOL_SIZE") {
            if let Ok(val) = pool.parse::<usize>() {
                config.pool_size = val;
            }
        }

        if let Ok(cap) = std::env::var("MESSAGE_CORE_POOL_BUFFER_CAPACITY") {
            if let Ok(val) = cap.parse::<usize>() {
                config.pool_buffer_capacity = val;
            }
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MessageError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| MessageError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        // Validate type registry limits
        if self.max_message_types == 0 {
            errors.push("Max message types must be greater than 0".to_string());
        }

        // Validate block size limits
        if self.max_block_size == 0 {
            errors.push("Max block size cannot be 0".to_string());
        } else if self.max_block_size > 256 * 1024 * 1024 {
            errors.push(format!(
                "Max block size too large: {} bytes (maximum recommended: 256 MB)",
                self.max_block_size
            ));
        }

        // Validate pool sizing
        if self.pool_size == 0 {
            errors.push("Pool size must be greater than 0".to_string());
        } else if self.pool_size > 1_000_000 {
            errors.push(format!(
                "Pool size too large: {} (max recommended: 1,000,000)",
                self.pool_size
            ));
        }

        if self.pool_buffer_capacity == 0 {
            errors.push("Pool buffer capacity must be greater than 0".to_string());
        } else if self.pool_buffer_capacity > self.max_block_size {
            errors.push(
                "Pool buffer capacity cannot be larger than max block size".to_string(),
            );
        }

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(MessageError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = MessageConfig::default();
        assert!(config.validate().is_empty());
        assert!(config.validate_strict().is_ok());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = MessageConfig::default_with_overrides(|c| {
            c.max_block_size = 4096;
            c.pool_size = 8;
        });

        let toml = toml::to_string_pretty(&config).expect("serialize");
        let parsed = MessageConfig::from_toml(&toml).expect("parse");

        assert_eq!(parsed.max_block_size, 4096);
        assert_eq!(parsed.pool_size, 8);
        assert_eq!(parsed.max_message_types, DEFAULT_MAX_MESSAGE_TYPES);
    }

    #[test]
    fn test_zero_limits_rejected() {
        let config = MessageConfig::default_with_overrides(|c| {
            c.max_message_types = 0;
            c.max_block_size = 0;
        });

        let errors = config.validate();
        assert_eq!(errors.len(), 2);
        assert!(config.validate_strict().is_err());
    }

    #[test]
    fn test_pool_capacity_bounded_by_block_size() {
        let config = MessageConfig::default_with_overrides(|c| {
            c.max_block_size = 512;
            c.pool_buffer_capacity = 1024;
        });

        let errors = config.validate();
        assert!(errors
            .iter()
            .any(|e| e.contains("Pool buffer capacity cannot be larger")));
    }

    #[test]
    fn test_invalid_toml_reported() {
        let result = MessageConfig::from_toml("max_block_size = \"not a number\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_example_config_parses() {
        let example = MessageConfig::example_config();
        let parsed = MessageConfig::from_toml(&example).expect("example config must parse");
        assert!(parsed.validate().is_empty());
    }
}
