//! Calling guest closures from the host.
//!
//! An invocation holds a reference on the closure for its whole duration.
//! Cleanup runs whether or not the guest trapped: the argument handle is
//! released and, if the guest dropped the closure while it was running, its
//! destructor is called through `bridge_drop_closure`.

use tracing::{debug, trace};
use wasmtime::Store;

use hostbridge_hostapi::{HostApi, HostValue};
use hostbridge_primitives::types::EXPORT_INVOKE_CLOSURE;
use hostbridge_primitives::{ClosureId, Destroy};

use crate::error::BridgeError;
use crate::host_impl::HostState;
use crate::runtime::{handle_trap, refuel};

/// Call closure `id` with `arg`.
///
/// The argument is borrowed for the call: its handle is released when the
/// guest returns, so a guest that wants to keep it must `object_clone_ref`.
pub fn invoke_closure<H: HostApi>(
    store: &mut Store<HostState<H>>,
    id: ClosureId,
    arg: HostValue,
) -> Result<(), BridgeError> {
    let exports = store.data().guest_exports()?.clone();
    let invoke = exports
        .invoke_closure
        .ok_or(BridgeError::MissingExport(EXPORT_INVOKE_CLOSURE))?;

    let state = store.data_mut();
    let invocation = state.closures.begin_invoke(id)?;
    let arg = state.alloc(arg);
    trace!(closure = id.as_raw(), arg, "invoking closure");

    let result = refuel(store).and_then(|()| {
        handle_trap(invoke.call(
            &mut *store,
            (invocation.data as i32, invocation.vtable as i32, arg),
        ))
    });

    // Cleanup runs even when the call failed.
    let state = store.data_mut();
    if let Err(e) = state.drop_ref(arg) {
        debug!(arg, error = %e, "closure argument already released");
    }
    let destroy = state.closures.end_invoke(invocation)?;
    if let Some(destroy) = destroy {
        let destroyed = run_destructor(store, id, destroy);
        result?;
        return destroyed;
    }
    result
}

fn run_destructor<H: HostApi>(
    store: &mut Store<HostState<H>>,
    id: ClosureId,
    destroy: Destroy,
) -> Result<(), BridgeError> {
    let Some(drop_closure) = store.data().guest_exports()?.drop_closure.clone() else {
        debug!(closure = id.as_raw(), "no bridge_drop_closure export, leaking closure state");
        return Ok(());
    };
    debug!(closure = id.as_raw(), dtor = destroy.dtor, "destroying closure");
    refuel(store)?;
    handle_trap(drop_closure.call(
        &mut *store,
        (destroy.dtor as i32, destroy.data as i32, destroy.vtable as i32),
    ))
}
