//! Event accessors. Calling a mouse, wheel or keyboard accessor on an event
//! of another interface is a type mismatch and traps.

use anyhow::Result;
use wasmtime::{Caller, Linker};

use hostbridge_hostapi::{HostApi, HostError, InputEvent};
use hostbridge_primitives::IMPORT_MODULE;

use crate::error::BridgeError;
use crate::host_impl::HostState;

use super::write_string_slot;

fn interface<T>(event: &InputEvent, value: Option<T>, expected: &'static str) -> Result<T, HostError> {
    value.ok_or_else(|| HostError::type_mismatch(expected, event.class_name()))
}

pub(super) fn register<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "event_type",
        |mut caller: Caller<'_, HostState<H>>, event: i32, out: i32| -> Result<()> {
            let event = caller.data().event(event)?;
            write_string_slot(&mut caller, out, Some(event.event_type()))?;
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "event_prevent_default",
        |caller: Caller<'_, HostState<H>>, event: i32| -> Result<()> {
            caller.data().event(event)?.prevent_default();
            Ok(())
        },
    )?;

    // ── MouseEvent ──

    linker.func_wrap(
        IMPORT_MODULE,
        "mouse_client_x",
        |caller: Caller<'_, HostState<H>>, event: i32| -> Result<i32> {
            let event = caller.data().event(event)?;
            Ok(interface(&event, event.client_position(), "MouseEvent")?.0)
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "mouse_client_y",
        |caller: Caller<'_, HostState<H>>, event: i32| -> Result<i32> {
            let event = caller.data().event(event)?;
            Ok(interface(&event, event.client_position(), "MouseEvent")?.1)
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "mouse_button",
        |caller: Caller<'_, HostState<H>>, event: i32| -> Result<i32> {
            let event = caller.data().event(event)?;
            Ok(i32::from(interface(&event, event.button(), "MouseEvent")?))
        },
    )?;

    // ── WheelEvent ──

    linker.func_wrap(
        IMPORT_MODULE,
        "wheel_delta_x",
        |caller: Caller<'_, HostState<H>>, event: i32| -> Result<f64> {
            let event = caller.data().event(event)?;
            Ok(interface(&event, event.wheel_delta(), "WheelEvent")?.0)
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "wheel_delta_y",
        |caller: Caller<'_, HostState<H>>, event: i32| -> Result<f64> {
            let event = caller.data().event(event)?;
            Ok(interface(&event, event.wheel_delta(), "WheelEvent")?.1)
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "wheel_delta_mode",
        |caller: Caller<'_, HostState<H>>, event: i32| -> Result<i32> {
            let event = caller.data().event(event)?;
            Ok(interface(&event, event.wheel_delta(), "WheelEvent")?.2 as i32)
        },
    )?;

    // ── KeyboardEvent ──

    linker.func_wrap(
        IMPORT_MODULE,
        "keyboard_key",
        |mut caller: Caller<'_, HostState<H>>, event: i32, out: i32| -> Result<()> {
            let event = caller.data().event(event)?;
            let key = interface(&event, event.key(), "KeyboardEvent")?;
            write_string_slot(&mut caller, out, Some(key))?;
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "keyboard_code",
        |mut caller: Caller<'_, HostState<H>>, event: i32, out: i32| -> Result<()> {
            let event = caller.data().event(event)?;
            let code = interface(&event, event.code(), "KeyboardEvent")?;
            write_string_slot(&mut caller, out, Some(code))?;
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "keyboard_repeat",
        |caller: Caller<'_, HostState<H>>, event: i32| -> Result<i32> {
            let event = caller.data().event(event)?;
            Ok(interface(&event, event.repeat(), "KeyboardEvent")? as i32)
        },
    )?;
    Ok(())
}
