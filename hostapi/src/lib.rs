//! `hostbridge-hostapi` — host object model and host API traits for the hostbridge.
//!
//! This crate defines what sits on the host side of a handle:
//!
//! - `HostValue` / `HostObject`: values the guest refers to by handle
//! - `DomApi`, `GraphicsApi`, `HostApi`: the browser operations bindings forward to
//! - `HostError` / `HostException`: bridge faults vs. errors thrown by the host
//! - `InputEvent`, `EventTarget`, `DomRect`: event loop and layout types
//! - `gl`: WebGL 2 enum values and call descriptors
//! - `MemHost`: in-memory `HostApi` for tests and headless runs
//!
//! This crate depends on `hostbridge-primitives` for handle, closure and
//! status-code types.

pub mod error;
pub mod types;
pub mod value;
pub mod event;
pub mod gl;
pub mod traits;
pub mod mem_gl;
pub mod mem_host;

// Re-export commonly used types at the crate root.
pub use error::{HostError, HostException};
pub use types::SurfaceConfig;
pub use value::{
    debug_string, ActiveInfo, ContextId, ElementId, GlObject, GlObjectKind, HostObject, HostValue,
    Interface, UniformLocation,
};
pub use event::{DomRect, EventKind, EventTarget, InputEvent};
pub use traits::{DomApi, GraphicsApi, HostApi};
pub use mem_gl::GlContext;
pub use mem_host::MemHost;
