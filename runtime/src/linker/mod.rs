//! Host function registration via Wasmtime linker.
//!
//! Registers every `hostbridge` import with the Wasmtime `Linker`. Each
//! function:
//! 1. Resolves handle arguments through the instance's handle table
//! 2. Reads pointer/length arguments from linear memory (bounds-checked)
//! 3. Forwards to the host
//! 4. Hands results back as handles, scalars or `[ptr, len]` string slots
//!
//! Infallible bindings trap on a bridge fault. Fallible bindings return an
//! `i32` status instead: `0` on success, `ERR_THREW` with the exception
//! parked in the pending slot, or the fault's code. Their results go
//! through out-pointers, written only on success.

mod dom;
mod event;
mod gl;
mod object;

use wasmtime::{Caller, Linker, Memory};

use hostbridge_hostapi::{HostApi, HostError};
use hostbridge_primitives::types::{NUMBER_SLOT_SIZE, STRING_SLOT_SIZE};
use hostbridge_primitives::{decode_utf8, ErrorCode, ViewKind};

use crate::codec;
use crate::error::BridgeError;
use crate::host_impl::HostState;
use crate::memory;

/// Register all `hostbridge` functions with the linker.
pub fn register_host_functions<H: HostApi + 'static>(
    linker: &mut Linker<HostState<H>>,
) -> Result<(), BridgeError> {
    object::register(linker)?;
    dom::register(linker)?;
    event::register(linker)?;
    gl::register(linker)?;
    Ok(())
}

/// Collapse a fallible binding's outcome into its `i32` status.
pub(crate) fn status(result: Result<i32, HostError>) -> i32 {
    result.unwrap_or_else(|e| e.to_error_code())
}

pub(crate) const OK: i32 = ErrorCode::Ok as i32;

fn guest_memory<H: HostApi>(caller: &Caller<'_, HostState<H>>) -> Result<Memory, HostError> {
    Ok(caller.data().guest_exports()?.memory)
}

/// Revalidate the cached `kind` view before touching memory.
fn touch<H: HostApi>(caller: &mut Caller<'_, HostState<H>>, kind: ViewKind) -> Result<Memory, HostError> {
    let mem = guest_memory(caller)?;
    let identity = memory::identity_of(&mem, &*caller);
    caller.data_mut().observe_memory(kind, identity);
    Ok(mem)
}

pub(crate) fn read_bytes<H: HostApi>(
    caller: &mut Caller<'_, HostState<H>>,
    ptr: i32,
    len: i32,
) -> Result<Vec<u8>, HostError> {
    let mem = touch(caller, ViewKind::U8)?;
    memory::read_bytes(mem.data(&*caller), ptr, len)
}

/// Read and strictly decode a UTF-8 string.
pub(crate) fn read_string<H: HostApi>(
    caller: &mut Caller<'_, HostState<H>>,
    ptr: i32,
    len: i32,
) -> Result<String, HostError> {
    let bytes = read_bytes(caller, ptr, len)?;
    Ok(decode_utf8(&bytes)?)
}

pub(crate) fn read_f32s<H: HostApi>(
    caller: &mut Caller<'_, HostState<H>>,
    ptr: i32,
    count: i32,
) -> Result<Vec<f32>, HostError> {
    let mem = touch(caller, ViewKind::U8)?;
    memory::read_f32s(mem.data(&*caller), ptr, count)
}

/// Fail with `BadPointer` unless `[ptr, ptr+len)` is writable.
pub(crate) fn check_out<H: HostApi>(
    caller: &mut Caller<'_, HostState<H>>,
    ptr: i32,
    len: i32,
) -> Result<(), HostError> {
    let mem = guest_memory(caller)?;
    memory::validate_range(mem.data_size(&*caller), ptr, len)
}

pub(crate) fn write_i32<H: HostApi>(
    caller: &mut Caller<'_, HostState<H>>,
    ptr: i32,
    value: i32,
) -> Result<(), HostError> {
    let mem = touch(caller, ViewKind::I32)?;
    memory::write_i32(mem.data_mut(&mut *caller), ptr, value)
}

pub(crate) fn write_bytes<H: HostApi>(
    caller: &mut Caller<'_, HostState<H>>,
    ptr: i32,
    data: &[u8],
) -> Result<(), HostError> {
    let mem = touch(caller, ViewKind::U8)?;
    memory::write_bytes(mem.data_mut(&mut *caller), ptr, data)
}

/// Write `[is_some: i32][pad: i32][value: f64]` at `out`.
pub(crate) fn write_number_slot<H: HostApi>(
    caller: &mut Caller<'_, HostState<H>>,
    out: i32,
    value: Option<f64>,
) -> Result<(), HostError> {
    check_out(caller, out, NUMBER_SLOT_SIZE)?;
    let mem = touch(caller, ViewKind::F64)?;
    let data = mem.data_mut(&mut *caller);
    memory::write_i32(data, out, value.is_some() as i32)?;
    memory::write_i32(data, out + 4, 0)?;
    memory::write_f64(data, out + 8, value.unwrap_or(0.0))
}

/// Encode `text` into a guest allocation and write `[ptr, len]` at `out`.
/// An absent string writes `[0, 0]`.
///
/// Runs the guest's allocator, so memory may grow in the middle.
pub(crate) fn write_string_slot<H: HostApi>(
    caller: &mut Caller<'_, HostState<H>>,
    out: i32,
    text: Option<&str>,
) -> Result<(), BridgeError> {
    check_out(caller, out, STRING_SLOT_SIZE)?;
    let (ptr, len) = match text {
        Some(text) => {
            let exports = caller.data().guest_exports()?.clone();
            codec::pass_string(&mut *caller, &exports, text)?
        }
        None => (0, 0),
    };
    write_i32(caller, out, ptr as i32)?;
    write_i32(caller, out + 4, len as i32)?;
    Ok(())
}
