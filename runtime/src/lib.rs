//! `hostbridge-runtime` — Wasmtime embedding for hostbridge guests.
//!
//! This crate loads a guest module, validates its ABI, and links the
//! `hostbridge` imports that let it drive a browser-shaped host:
//!
//! - **Handles:** the guest refers to host values by `i32` slot index
//! - **Strings:** strict UTF-8 in, guest-allocated UTF-8 out
//! - **Two-tier errors:** host exceptions become a status plus a pending
//!   slot; bridge faults trap
//! - **Closures:** guest callbacks invoked for events and animation frames,
//!   destroyed only after the last reference goes
//! - **Resource limits:** per-call fuel and bounded linear memory
//!
//! The entry point is [`Bridge::instantiate`].

pub mod error;
pub mod config;
pub mod memory;
pub mod host_impl;
pub mod codec;
pub mod closure;
pub mod validation;
pub mod linker;
pub mod runtime;

pub use error::BridgeError;
pub use config::BridgeConfig;
pub use host_impl::{HostState, LogLine};
pub use runtime::{Bridge, BridgeInstance};
