//! Window, document, element, canvas and event-loop bindings.

use anyhow::Result;
use wasmtime::{Caller, Linker};

use hostbridge_hostapi::{HostApi, HostError, HostObject};
use hostbridge_primitives::IMPORT_MODULE;

use crate::error::BridgeError;
use crate::host_impl::HostState;

use super::{check_out, read_string, status, write_i32, write_string_slot, OK};

pub(super) fn register<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    register_globals(linker)?;
    register_document(linker)?;
    register_element(linker)?;
    register_layout(linker)?;
    register_canvas(linker)?;
    register_fullscreen(linker)?;
    register_event_loop(linker)?;
    Ok(())
}

// ── Window and document ──

fn register_globals<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    linker.func_wrap(IMPORT_MODULE, "window", |mut caller: Caller<'_, HostState<H>>| -> i32 {
        caller.data_mut().alloc_object(HostObject::Window)
    })?;

    linker.func_wrap(
        IMPORT_MODULE,
        "window_document",
        |mut caller: Caller<'_, HostState<H>>, window: i32| -> Result<i32> {
            let state = caller.data_mut();
            state.expect_window(window)?;
            Ok(state.alloc_object(HostObject::Document))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "window_device_pixel_ratio",
        |caller: Caller<'_, HostState<H>>, window: i32| -> Result<f64> {
            let state = caller.data();
            state.expect_window(window)?;
            Ok(state.host.device_pixel_ratio())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "window_performance_now",
        |caller: Caller<'_, HostState<H>>, window: i32| -> Result<f64> {
            let state = caller.data();
            state.expect_window(window)?;
            Ok(state.host.now())
        },
    )?;
    Ok(())
}

fn register_document<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "document_body",
        |mut caller: Caller<'_, HostState<H>>, document: i32| -> Result<i32> {
            let state = caller.data_mut();
            state.expect_document(document)?;
            let body = state.host.document_body().map(HostObject::Element);
            Ok(state.alloc_optional(body))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "document_get_element_by_id",
        |mut caller: Caller<'_, HostState<H>>, document: i32, ptr: i32, len: i32| -> Result<i32> {
            caller.data().expect_document(document)?;
            let id = read_string(&mut caller, ptr, len)?;
            let state = caller.data_mut();
            let found = state.host.get_element_by_id(&id).map(HostObject::Element);
            Ok(state.alloc_optional(found))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "document_create_element",
        |mut caller: Caller<'_, HostState<H>>, document: i32, ptr: i32, len: i32, out: i32| -> i32 {
            status(create_element(&mut caller, document, ptr, len, out))
        },
    )?;
    Ok(())
}

fn create_element<H: HostApi>(
    caller: &mut Caller<'_, HostState<H>>,
    document: i32,
    ptr: i32,
    len: i32,
    out: i32,
) -> Result<i32, HostError> {
    caller.data().expect_document(document)?;
    let tag = read_string(caller, ptr, len)?;
    check_out(caller, out, 4)?;
    let state = caller.data_mut();
    let element = match state.host.create_element(&tag) {
        Ok(element) => element,
        Err(exception) => return Ok(state.throw(exception)),
    };
    let handle = state.alloc_object(HostObject::Element(element));
    write_i32(caller, out, handle)?;
    Ok(OK)
}

// ── Elements ──

fn register_element<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "node_append_child",
        |mut caller: Caller<'_, HostState<H>>, parent: i32, child: i32| -> i32 {
            status(append_child(&mut caller, parent, child))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "element_parent",
        |mut caller: Caller<'_, HostState<H>>, element: i32| -> Result<i32> {
            let state = caller.data_mut();
            let element = state.element(element)?;
            let parent = state.host.parent_element(element).map(HostObject::Element);
            Ok(state.alloc_optional(parent))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "element_set_attribute",
        |mut caller: Caller<'_, HostState<H>>,
         element: i32,
         name_ptr: i32,
         name_len: i32,
         value_ptr: i32,
         value_len: i32|
         -> i32 {
            status(set_attribute(&mut caller, element, (name_ptr, name_len), (value_ptr, value_len)))
        },
    )?;

    // Returns 1 and writes the value if the attribute is present.
    linker.func_wrap(
        IMPORT_MODULE,
        "element_get_attribute",
        |mut caller: Caller<'_, HostState<H>>, element: i32, ptr: i32, len: i32, out: i32| -> Result<i32> {
            let element = caller.data().element(element)?;
            let name = read_string(&mut caller, ptr, len)?;
            let value = caller.data().host.get_attribute(element, &name);
            write_string_slot(&mut caller, out, value.as_deref())?;
            Ok(value.is_some() as i32)
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "element_set_id",
        |mut caller: Caller<'_, HostState<H>>, element: i32, ptr: i32, len: i32| -> Result<()> {
            let element = caller.data().element(element)?;
            let id = read_string(&mut caller, ptr, len)?;
            caller.data_mut().host.set_element_id(element, &id);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "element_style",
        |mut caller: Caller<'_, HostState<H>>, element: i32| -> Result<i32> {
            let state = caller.data_mut();
            let element = state.element(element)?;
            Ok(state.alloc_object(HostObject::Style(element)))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "style_set_property",
        |mut caller: Caller<'_, HostState<H>>,
         style: i32,
         name_ptr: i32,
         name_len: i32,
         value_ptr: i32,
         value_len: i32|
         -> i32 {
            status(set_style_property(&mut caller, style, (name_ptr, name_len), (value_ptr, value_len)))
        },
    )?;
    Ok(())
}

fn append_child<H: HostApi>(caller: &mut Caller<'_, HostState<H>>, parent: i32, child: i32) -> Result<i32, HostError> {
    let state = caller.data_mut();
    let parent = state.element(parent)?;
    let child = state.element(child)?;
    match state.host.append_child(parent, child) {
        Ok(()) => Ok(OK),
        Err(exception) => Ok(state.throw(exception)),
    }
}

fn set_attribute<H: HostApi>(
    caller: &mut Caller<'_, HostState<H>>,
    element: i32,
    (name_ptr, name_len): (i32, i32),
    (value_ptr, value_len): (i32, i32),
) -> Result<i32, HostError> {
    let element = caller.data().element(element)?;
    let name = read_string(caller, name_ptr, name_len)?;
    let value = read_string(caller, value_ptr, value_len)?;
    let state = caller.data_mut();
    match state.host.set_attribute(element, &name, &value) {
        Ok(()) => Ok(OK),
        Err(exception) => Ok(state.throw(exception)),
    }
}

fn set_style_property<H: HostApi>(
    caller: &mut Caller<'_, HostState<H>>,
    style: i32,
    (name_ptr, name_len): (i32, i32),
    (value_ptr, value_len): (i32, i32),
) -> Result<i32, HostError> {
    let element = caller.data().style_owner(style)?;
    let name = read_string(caller, name_ptr, name_len)?;
    let value = read_string(caller, value_ptr, value_len)?;
    let state = caller.data_mut();
    match state.host.set_style_property(element, &name, &value) {
        Ok(()) => Ok(OK),
        Err(exception) => Ok(state.throw(exception)),
    }
}

// ── Layout ──

fn register_layout<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "element_client_width",
        |caller: Caller<'_, HostState<H>>, element: i32| -> Result<i32> {
            let state = caller.data();
            Ok(state.host.client_width(state.element(element)?))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "element_client_height",
        |caller: Caller<'_, HostState<H>>, element: i32| -> Result<i32> {
            let state = caller.data();
            Ok(state.host.client_height(state.element(element)?))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "element_bounding_client_rect",
        |mut caller: Caller<'_, HostState<H>>, element: i32| -> Result<i32> {
            let state = caller.data_mut();
            let rect = state.host.bounding_client_rect(state.element(element)?);
            Ok(state.alloc_object(HostObject::Rect(rect)))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "rect_left",
        |caller: Caller<'_, HostState<H>>, rect: i32| -> Result<f64> {
            Ok(caller.data().resolve(rect)?.expect_rect()?.left)
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "rect_top",
        |caller: Caller<'_, HostState<H>>, rect: i32| -> Result<f64> {
            Ok(caller.data().resolve(rect)?.expect_rect()?.top)
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "rect_width",
        |caller: Caller<'_, HostState<H>>, rect: i32| -> Result<f64> {
            Ok(caller.data().resolve(rect)?.expect_rect()?.width)
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "rect_height",
        |caller: Caller<'_, HostState<H>>, rect: i32| -> Result<f64> {
            Ok(caller.data().resolve(rect)?.expect_rect()?.height)
        },
    )?;
    Ok(())
}

// ── Canvas ──

fn register_canvas<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "canvas_width",
        |caller: Caller<'_, HostState<H>>, canvas: i32| -> Result<i32> {
            let state = caller.data();
            Ok(state.host.canvas_width(state.element(canvas)?) as i32)
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "canvas_height",
        |caller: Caller<'_, HostState<H>>, canvas: i32| -> Result<i32> {
            let state = caller.data();
            Ok(state.host.canvas_height(state.element(canvas)?) as i32)
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "canvas_set_width",
        |mut caller: Caller<'_, HostState<H>>, canvas: i32, width: i32| -> Result<()> {
            let state = caller.data_mut();
            let canvas = state.element(canvas)?;
            state.host.set_canvas_width(canvas, width as u32);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "canvas_set_height",
        |mut caller: Caller<'_, HostState<H>>, canvas: i32, height: i32| -> Result<()> {
            let state = caller.data_mut();
            let canvas = state.element(canvas)?;
            state.host.set_canvas_height(canvas, height as u32);
            Ok(())
        },
    )?;

    // Writes HANDLE_NONE when the context kind is unavailable.
    linker.func_wrap(
        IMPORT_MODULE,
        "canvas_get_context",
        |mut caller: Caller<'_, HostState<H>>, canvas: i32, ptr: i32, len: i32, out: i32| -> i32 {
            status(get_context(&mut caller, canvas, ptr, len, out))
        },
    )?;
    Ok(())
}

fn get_context<H: HostApi>(
    caller: &mut Caller<'_, HostState<H>>,
    canvas: i32,
    ptr: i32,
    len: i32,
    out: i32,
) -> Result<i32, HostError> {
    let canvas = caller.data().element(canvas)?;
    let kind = read_string(caller, ptr, len)?;
    check_out(caller, out, 4)?;
    let state = caller.data_mut();
    let context = match state.host.get_context(canvas, &kind) {
        Ok(context) => context,
        Err(exception) => return Ok(state.throw(exception)),
    };
    let handle = state.alloc_optional(context.map(HostObject::Context));
    write_i32(caller, out, handle)?;
    Ok(OK)
}

// ── Fullscreen ──

fn register_fullscreen<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "element_request_fullscreen",
        |mut caller: Caller<'_, HostState<H>>, element: i32| -> i32 {
            let state = caller.data_mut();
            status(state.element(element).map(|element| {
                match state.host.request_fullscreen(element) {
                    Ok(()) => OK,
                    Err(exception) => state.throw(exception),
                }
            }))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "document_fullscreen",
        |mut caller: Caller<'_, HostState<H>>, document: i32| -> Result<i32> {
            let state = caller.data_mut();
            state.expect_document(document)?;
            let element = state.host.fullscreen_element().map(HostObject::Element);
            Ok(state.alloc_optional(element))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "document_exit_fullscreen",
        |mut caller: Caller<'_, HostState<H>>, document: i32| -> Result<()> {
            let state = caller.data_mut();
            state.expect_document(document)?;
            state.host.exit_fullscreen();
            Ok(())
        },
    )?;
    Ok(())
}

// ── Event loop ──

fn register_event_loop<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "event_target_add_listener",
        |mut caller: Caller<'_, HostState<H>>, target: i32, ptr: i32, len: i32, callback: i32| -> i32 {
            status(add_listener(&mut caller, target, ptr, len, callback))
        },
    )?;

    // Writes the request id to `out`.
    linker.func_wrap(
        IMPORT_MODULE,
        "window_request_animation_frame",
        |mut caller: Caller<'_, HostState<H>>, window: i32, callback: i32, out: i32| -> i32 {
            status(request_animation_frame(&mut caller, window, callback, out))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "window_cancel_animation_frame",
        |mut caller: Caller<'_, HostState<H>>, window: i32, request: i32| -> i32 {
            let state = caller.data_mut();
            status(state.expect_window(window).map(|()| {
                match state.host.cancel_animation_frame(request) {
                    Ok(()) => OK,
                    Err(exception) => state.throw(exception),
                }
            }))
        },
    )?;
    Ok(())
}

fn add_listener<H: HostApi>(
    caller: &mut Caller<'_, HostState<H>>,
    target: i32,
    ptr: i32,
    len: i32,
    callback: i32,
) -> Result<i32, HostError> {
    let target = caller.data().event_target(target)?;
    let callback = caller.data().closure(callback)?;
    let kind = read_string(caller, ptr, len)?;
    let state = caller.data_mut();
    match state.host.add_event_listener(target, &kind, callback) {
        Ok(()) => Ok(OK),
        Err(exception) => Ok(state.throw(exception)),
    }
}

fn request_animation_frame<H: HostApi>(
    caller: &mut Caller<'_, HostState<H>>,
    window: i32,
    callback: i32,
    out: i32,
) -> Result<i32, HostError> {
    caller.data().expect_window(window)?;
    let callback = caller.data().closure(callback)?;
    check_out(caller, out, 4)?;
    let request = match caller.data_mut().host.request_animation_frame(callback) {
        Ok(request) => request,
        Err(exception) => return Ok(caller.data_mut().throw(exception)),
    };
    write_i32(caller, out, request)?;
    Ok(OK)
}
