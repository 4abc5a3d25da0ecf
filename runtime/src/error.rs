//! Runtime error types.

use hostbridge_hostapi::HostError;
use hostbridge_primitives::{ClosureError, StaleView};

/// Top-level error type for the runtime crate.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Wasmtime engine, compilation, or instantiation error.
    #[error("wasmtime error: {0:#}")]
    Wasmtime(#[from] anyhow::Error),

    /// Module validation failed (missing exports, bad imports, etc.).
    #[error("validation error: {0}")]
    Validation(String),

    /// Bridge fault raised while marshalling a call (bad handle, bad
    /// pointer, invalid UTF-8, wrong object type).
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// Memory operation failed outside a binding.
    #[error("memory error: {0}")]
    Memory(String),

    /// A memory view was used after the guest's memory grew.
    #[error(transparent)]
    StaleView(#[from] StaleView),

    /// A closure could not be entered.
    #[error("closure error: {0}")]
    Closure(#[from] ClosureError),

    /// The guest does not export a function this operation needs.
    #[error("missing guest export '{0}'")]
    MissingExport(&'static str),

    /// Fuel exhausted during a call into the guest.
    #[error("fuel exhausted (instruction limit)")]
    FuelExhausted,

    /// WASM guest trapped.
    #[error("guest trapped: {0}")]
    GuestTrapped(String),

    /// The guest raised an error through the `throw` binding.
    #[error("guest threw: {0}")]
    GuestThrew(String),
}
