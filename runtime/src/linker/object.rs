//! Generic object bindings: handle lifetime, primitives, type checks,
//! exceptions, guest logging and closure registration.

use anyhow::Result;
use wasmtime::{Caller, Linker, WasmBacktrace};

use hostbridge_hostapi::{debug_string, HostApi, HostError, HostException, HostObject, HostValue, Interface};
use hostbridge_primitives::types::BOOLEAN_ABSENT;
use hostbridge_primitives::{GuestClosure, Handle, IMPORT_MODULE};

use crate::error::BridgeError;
use crate::host_impl::HostState;

use super::{read_string, write_bytes, write_number_slot, write_string_slot};

pub(super) fn register<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    register_refs(linker)?;
    register_primitives(linker)?;
    register_type_checks(linker)?;
    register_exceptions(linker)?;
    register_log(linker)?;
    register_closures(linker)?;
    Ok(())
}

// ── Handle lifetime ──

fn register_refs<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "object_clone_ref",
        |mut caller: Caller<'_, HostState<H>>, handle: i32| -> Result<i32> {
            Ok(caller.data_mut().clone_ref(handle)?)
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "object_drop_ref",
        |mut caller: Caller<'_, HostState<H>>, handle: i32| -> Result<()> {
            caller.data_mut().drop_ref(handle)?;
            Ok(())
        },
    )?;
    Ok(())
}

// ── Strings, numbers, booleans ──

fn register_primitives<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "string_new",
        |mut caller: Caller<'_, HostState<H>>, ptr: i32, len: i32| -> Result<i32> {
            let text = read_string(&mut caller, ptr, len)?;
            Ok(caller.data_mut().alloc(HostValue::String(text)))
        },
    )?;

    // Returns 1 and writes the string if the value is one, else writes [0, 0].
    linker.func_wrap(
        IMPORT_MODULE,
        "string_get",
        |mut caller: Caller<'_, HostState<H>>, handle: i32, out: i32| -> Result<i32> {
            let text = caller.data().resolve(handle)?.as_str().map(str::to_owned);
            write_string_slot(&mut caller, out, text.as_deref())?;
            Ok(text.is_some() as i32)
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "number_new",
        |mut caller: Caller<'_, HostState<H>>, value: f64| -> Result<i32> {
            Ok(caller.data_mut().alloc(HostValue::Number(value)))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "number_get",
        |mut caller: Caller<'_, HostState<H>>, handle: i32, out: i32| -> Result<()> {
            let value = caller.data().resolve(handle)?.as_number();
            write_number_slot(&mut caller, out, value)?;
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "boolean_get",
        |caller: Caller<'_, HostState<H>>, handle: i32| -> Result<i32> {
            let value = caller.data().resolve(handle)?.as_bool();
            Ok(value.map_or(BOOLEAN_ABSENT, i32::from))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "is_undefined",
        |caller: Caller<'_, HostState<H>>, handle: i32| -> Result<i32> {
            let value = caller.data().resolve(handle)?;
            Ok(matches!(value, HostValue::Undefined) as i32)
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "is_null",
        |caller: Caller<'_, HostState<H>>, handle: i32| -> Result<i32> {
            let value = caller.data().resolve(handle)?;
            Ok(matches!(value, HostValue::Null) as i32)
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "debug_string",
        |mut caller: Caller<'_, HostState<H>>, handle: i32, out: i32| -> Result<()> {
            let text = debug_string(caller.data().resolve(handle)?);
            write_string_slot(&mut caller, out, Some(&text))?;
            Ok(())
        },
    )?;
    Ok(())
}

// ── Type checks and typed arrays ──

fn register_type_checks<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    // 1 if the value implements `kind`, else 0. Unknown kinds have no instances.
    linker.func_wrap(
        IMPORT_MODULE,
        "object_instance_of",
        |caller: Caller<'_, HostState<H>>, handle: i32, kind: i32| -> Result<i32> {
            let state = caller.data();
            let value = state.resolve(handle)?;
            let Some(iface) = Interface::from_abi(kind) else {
                return Ok(0);
            };
            Ok(value.is_instance_of(iface, |el| state.host.is_canvas(el)) as i32)
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "int32_array_length",
        |caller: Caller<'_, HostState<H>>, handle: i32| -> Result<i32> {
            let values = caller.data().resolve(handle)?.expect_int32_array()?;
            Ok(values.len() as i32)
        },
    )?;

    // Copies up to `count` elements to `ptr` and returns how many were written.
    linker.func_wrap(
        IMPORT_MODULE,
        "int32_array_copy",
        |mut caller: Caller<'_, HostState<H>>, handle: i32, ptr: i32, count: i32| -> Result<i32> {
            if count < 0 {
                return Err(HostError::bad_pointer().into());
            }
            let values = caller.data().resolve(handle)?.expect_int32_array()?;
            let n = values.len().min(count as usize);
            let bytes: Vec<u8> = values[..n].iter().flat_map(|v| v.to_le_bytes()).collect();
            write_bytes(&mut caller, ptr, &bytes)?;
            Ok(n as i32)
        },
    )?;
    Ok(())
}

// ── Exceptions ──

fn register_exceptions<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    // Clears the pending slot. `undefined` when nothing was thrown.
    linker.func_wrap(
        IMPORT_MODULE,
        "take_exception",
        |mut caller: Caller<'_, HostState<H>>| -> i32 {
            let state = caller.data_mut();
            match state.take_exception() {
                Some(exception) => state.alloc(HostValue::Error(exception)),
                None => Handle::UNDEFINED.to_abi(),
            }
        },
    )?;

    // `new Error(message)`, with the guest's current call frames as its stack.
    linker.func_wrap(
        IMPORT_MODULE,
        "error_new",
        |mut caller: Caller<'_, HostState<H>>, ptr: i32, len: i32| -> Result<i32> {
            let message = read_string(&mut caller, ptr, len)?;
            let frames = WasmBacktrace::capture(&caller)
                .frames()
                .iter()
                .map(|frame| match frame.func_name() {
                    Some(name) => name.to_string(),
                    None => format!("wasm-function[{}]", frame.func_index()),
                })
                .collect();
            let error = HostException::new("Error", message).with_frames(frames);
            Ok(caller.data_mut().alloc(HostValue::Error(error)))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "error_stack",
        |mut caller: Caller<'_, HostState<H>>, handle: i32, out: i32| -> Result<()> {
            let stack = caller.data().resolve(handle)?.expect_error()?.stack();
            write_string_slot(&mut caller, out, Some(&stack))?;
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "throw",
        |mut caller: Caller<'_, HostState<H>>, ptr: i32, len: i32| -> Result<()> {
            let message = read_string(&mut caller, ptr, len)?;
            Err(BridgeError::GuestThrew(message).into())
        },
    )?;
    Ok(())
}

// ── Logging ──

fn register_log<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "log",
        |mut caller: Caller<'_, HostState<H>>, level: i32, ptr: i32, len: i32| -> Result<()> {
            let message = read_string(&mut caller, ptr, len)?;
            let level = level as u32;
            match level {
                0 => tracing::error!(target: "guest", "{}", message),
                1 => tracing::warn!(target: "guest", "{}", message),
                2 => tracing::info!(target: "guest", "{}", message),
                3 => tracing::debug!(target: "guest", "{}", message),
                _ => tracing::trace!(target: "guest", "{}", message),
            }
            caller.data_mut().add_log(level, message);
            Ok(())
        },
    )?;
    Ok(())
}

// ── Closures ──

fn register_closures<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "closure_new",
        |mut caller: Caller<'_, HostState<H>>, data: i32, vtable: i32, dtor: i32| -> Result<i32> {
            if data == 0 {
                return Err(HostError::bad_pointer().into());
            }
            let state = caller.data_mut();
            let id = state.closures.register(GuestClosure {
                data: data as u32,
                vtable: vtable as u32,
                dtor: dtor as u32,
            });
            tracing::trace!(closure = id.as_raw(), "closure registered");
            Ok(state.alloc_object(HostObject::Closure(id)))
        },
    )?;

    // Releases the handle and the guest's reference. Returns 1 when the
    // guest must free the closure now, 0 when an invocation in flight
    // will run its destructor instead.
    linker.func_wrap(
        IMPORT_MODULE,
        "closure_drop",
        |mut caller: Caller<'_, HostState<H>>, handle: i32| -> Result<i32> {
            let state = caller.data_mut();
            let id = state.closure(handle)?;
            state.drop_ref(handle)?;
            let free_now = state.closures.release(id).map_err(HostError::from)?;
            Ok(free_now as i32)
        },
    )?;
    Ok(())
}
