//! Bridge configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a bridge and the instances it creates.
///
/// Controls memory limits, instruction fuel, guest log capture and the
/// initial size of the handle table. Missing fields take their defaults
/// when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Maximum linear memory pages (1 page = 64 KiB).
    /// Default: 256 pages = 16 MiB.
    pub max_memory_pages: u32,

    /// Wasmtime fuel granted to each top-level call into the guest.
    /// `None` disables fuel metering.
    pub fuel_per_call: Option<u64>,

    /// Whether to keep guest log lines in the instance.
    pub enable_guest_logs: bool,

    /// Maximum number of kept log lines.
    pub max_log_lines: u32,

    /// Lines longer than this (in bytes) are dropped.
    pub max_log_line_len: usize,

    /// Slots reserved up front in the handle table.
    pub initial_handle_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_memory_pages: 256, // 16 MiB
            fuel_per_call: Some(100_000_000),
            enable_guest_logs: false,
            max_log_lines: 256,
            max_log_line_len: 1024,
            initial_handle_capacity: 128,
        }
    }
}

impl BridgeConfig {
    /// Maximum linear memory size in bytes.
    pub fn max_memory_bytes(&self) -> usize {
        self.max_memory_pages as usize * hostbridge_primitives::types::WASM_PAGE_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.max_memory_pages, 256);
        assert_eq!(config.fuel_per_call, Some(100_000_000));
        assert!(!config.enable_guest_logs);
        assert_eq!(config.max_memory_bytes(), 16 * 1024 * 1024);
    }

    #[test]
    fn test_partial_json() {
        let config: BridgeConfig =
            serde_json::from_str(r#"{"fuel_per_call": null, "max_log_lines": 4}"#).unwrap();
        assert_eq!(config.fuel_per_call, None);
        assert_eq!(config.max_log_lines, 4);
        assert_eq!(config.initial_handle_capacity, 128);
    }
}
