//! `hostbridge-primitives` — foundational types for the hostbridge guest/host boundary.
//!
//! This crate provides the pieces of the bridge that do not depend on a
//! particular WebAssembly engine:
//!
//! - [`HandleTable`]: slot table mapping small integer handles to host values
//! - [`codec`]: strict UTF-8 decoding and the two-phase string encoder
//! - [`ClosureTable`]: reference counting for guest-owned callbacks
//! - [`view`]: staleness tracking for typed views over guest memory
//! - [`ErrorCode`]: `i32` status codes returned by fallible bindings
//!
//! Supports `#![no_std]` for guest-side use (`default-features = false`).

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod types;
pub mod error;
pub mod handle;
pub mod codec;
pub mod closure;
pub mod view;

// Re-export commonly used types at the crate root for convenience.
pub use types::{
    ABI_VERSION, IMPORT_MODULE, HANDLE_NONE, HANDLE_UNDEFINED, HANDLE_NULL, HANDLE_TRUE,
    HANDLE_FALSE, RESERVED_HANDLES,
};
pub use error::{ErrorCode, HandleError, CodecError, ClosureError};
pub use handle::{Handle, HandleTable};
pub use codec::{GuestAllocator, decode_utf8, encode_string};
pub use closure::{ClosureId, ClosureTable, GuestClosure, Invocation, Destroy};
pub use view::{BufferIdentity, MemoryView, StaleView, ViewCache, ViewKind};
