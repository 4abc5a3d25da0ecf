//! Object bindings: handle lifetime, strings, numbers, booleans, type
//! checks, errors, logging.

mod common;

use std::rc::Rc;

use hostbridge_hostapi::{DomApi, HostError, HostObject, HostValue, InputEvent, Interface, MemHost};
use hostbridge_primitives::{ErrorCode, Handle, HANDLE_FALSE, HANDLE_NULL, HANDLE_TRUE, HANDLE_UNDEFINED};
use hostbridge_runtime::{BridgeConfig, BridgeError};

use common::*;

const IMPORTS: &str = r#"
    (import "hostbridge" "string_new" (func $string_new (param i32 i32) (result i32)))
    (import "hostbridge" "string_get" (func $string_get (param i32 i32) (result i32)))
    (import "hostbridge" "number_new" (func $number_new (param f64) (result i32)))
    (import "hostbridge" "number_get" (func $number_get (param i32 i32)))
    (import "hostbridge" "boolean_get" (func $boolean_get (param i32) (result i32)))
    (import "hostbridge" "is_undefined" (func $is_undefined (param i32) (result i32)))
    (import "hostbridge" "is_null" (func $is_null (param i32) (result i32)))
    (import "hostbridge" "debug_string" (func $debug_string (param i32 i32)))
    (import "hostbridge" "object_clone_ref" (func $clone_ref (param i32) (result i32)))
    (import "hostbridge" "object_drop_ref" (func $drop_ref (param i32)))
    (import "hostbridge" "log" (func $log (param i32 i32 i32)))
    (import "hostbridge" "object_instance_of" (func $instance_of (param i32 i32) (result i32)))
    (import "hostbridge" "error_new" (func $error_new (param i32 i32) (result i32)))
    (import "hostbridge" "error_stack" (func $error_stack (param i32 i32)))
    (import "hostbridge" "int32_array_length" (func $int32_array_length (param i32) (result i32)))
    (import "hostbridge" "int32_array_copy" (func $int32_array_copy (param i32 i32 i32) (result i32)))
"#;

const BODY: &str = r#"
    (func (export "string_new") (param i32 i32) (result i32)
        local.get 0 local.get 1 call $string_new)
    (func (export "string_get") (param i32 i32) (result i32)
        local.get 0 local.get 1 call $string_get)
    (func (export "number_new") (param f64) (result i32)
        local.get 0 call $number_new)
    (func (export "number_get") (param i32 i32)
        local.get 0 local.get 1 call $number_get)
    (func (export "boolean_get") (param i32) (result i32)
        local.get 0 call $boolean_get)
    (func (export "is_undefined") (param i32) (result i32)
        local.get 0 call $is_undefined)
    (func (export "is_null") (param i32) (result i32)
        local.get 0 call $is_null)
    (func (export "debug_string") (param i32 i32)
        local.get 0 local.get 1 call $debug_string)
    (func (export "clone_ref") (param i32) (result i32)
        local.get 0 call $clone_ref)
    (func (export "drop_ref") (param i32)
        local.get 0 call $drop_ref)
    (func (export "log") (param i32 i32 i32)
        local.get 0 local.get 1 local.get 2 call $log)
    (func (export "instance_of") (param i32 i32) (result i32)
        local.get 0 local.get 1 call $instance_of)
    (func $make_error (export "error_new") (param i32 i32) (result i32)
        local.get 0 local.get 1 call $error_new)
    (func (export "error_stack") (param i32 i32)
        local.get 0 local.get 1 call $error_stack)
    (func (export "int32_array_length") (param i32) (result i32)
        local.get 0 call $int32_array_length)
    (func (export "int32_array_copy") (param i32 i32 i32) (result i32)
        local.get 0 local.get 1 local.get 2 call $int32_array_copy)
"#;

fn guest() -> hostbridge_runtime::BridgeInstance<MemHost> {
    instance(IMPORTS, BODY)
}

// ── Strings ──

#[test]
fn test_string_round_trip_through_host() {
    let mut g = guest();
    for text in ["plain ascii", "h\u{e9}llo w\u{f6}rld", "\u{1F600} emoji first", ""] {
        let (ptr, len) = pass(&mut g, text);
        let h: i32 = g.call("string_new", (ptr, len)).unwrap();
        assert_eq!(value(&g, h), HostValue::String(text.to_string()));

        let present: i32 = g.call("string_get", (h, SLOT)).unwrap();
        assert_eq!(present, 1);
        let back = read_slot(&mut g, SLOT).unwrap_or_default();
        assert_eq!(back, text);
    }
}

#[test]
fn test_string_get_on_non_string_writes_empty_slot() {
    let mut g = guest();
    let h: i32 = g.call("number_new", 4.0f64).unwrap();
    store_i32(&mut g, SLOT, 0x5555);
    let present: i32 = g.call("string_get", (h, SLOT)).unwrap();
    assert_eq!(present, 0);
    assert_eq!(read_slot(&mut g, SLOT), None);
}

#[test]
fn test_invalid_utf8_traps() {
    let mut g = guest();
    store_bytes(&mut g, 600, &[b'o', b'k', 0xff, 0xfe]);
    let err = g.call::<(i32, i32), i32>("string_new", (600, 4)).unwrap_err();
    assert!(
        matches!(&err, BridgeError::Host(e) if *e == HostError::invalid_utf8()),
        "got {:?}",
        err
    );
    assert_eq!(g.handles().live(), 0);
}

#[test]
fn test_out_of_bounds_pointer_traps() {
    let mut g = guest();
    let err = g.call::<(i32, i32), i32>("string_new", (65530, 100)).unwrap_err();
    assert!(matches!(err, BridgeError::Host(e) if e == HostError::bad_pointer()));

    let h: i32 = g.call("number_new", 1.0f64).unwrap();
    let err = g.call::<(i32, i32), i32>("string_get", (h, -4)).unwrap_err();
    assert!(matches!(err, BridgeError::Host(e) if e.to_error_code() == ErrorCode::BadPointer as i32));
}

// ── Numbers and booleans ──

#[test]
fn test_number_slot() {
    let mut g = guest();
    let h: i32 = g.call("number_new", 2.5f64).unwrap();
    g.call::<(i32, i32), ()>("number_get", (h, SLOT)).unwrap();
    assert_eq!(load_i32(&mut g, SLOT), 1);
    assert_eq!(load_f64(&mut g, SLOT + 8), 2.5);

    g.call::<(i32, i32), ()>("number_get", (HANDLE_TRUE as i32, SLOT)).unwrap();
    assert_eq!(load_i32(&mut g, SLOT), 0);
}

#[test]
fn test_boolean_get_tristate() {
    let mut g = guest();
    assert_eq!(g.call::<i32, i32>("boolean_get", HANDLE_TRUE as i32).unwrap(), 1);
    assert_eq!(g.call::<i32, i32>("boolean_get", HANDLE_FALSE as i32).unwrap(), 0);
    let h: i32 = g.call("number_new", 1.0f64).unwrap();
    assert_eq!(g.call::<i32, i32>("boolean_get", h).unwrap(), 2);
}

#[test]
fn test_sentinels() {
    let mut g = guest();
    assert_eq!(g.call::<i32, i32>("is_undefined", 0).unwrap(), 1);
    assert_eq!(g.call::<i32, i32>("is_undefined", HANDLE_UNDEFINED as i32).unwrap(), 1);
    assert_eq!(g.call::<i32, i32>("is_null", Handle::NULL.to_abi()).unwrap(), 1);
    assert_eq!(g.call::<i32, i32>("is_null", HANDLE_UNDEFINED as i32).unwrap(), 0);
}

#[test]
fn test_debug_string() {
    let mut g = guest();
    let cases = [
        (HostValue::Number(2.0), "2"),
        (HostValue::Number(0.5), "0.5"),
        (HostValue::Null, "null"),
        (HostValue::String("hi".into()), "\"hi\""),
        (HostValue::Object(HostObject::Window), "[object Window]"),
    ];
    for (v, expected) in cases {
        let h = g.alloc_value(v).to_abi();
        g.call::<(i32, i32), ()>("debug_string", (h, SLOT)).unwrap();
        assert_eq!(read_slot(&mut g, SLOT).as_deref(), Some(expected));
    }
}

// ── Type checks ──

#[test]
fn test_instance_of() {
    let mut g = guest();
    let canvas = g.host_mut().create_element("canvas").unwrap();
    let div = g.host_mut().create_element("div").unwrap();
    let canvas = g.alloc_value(HostObject::Element(canvas).into()).to_abi();
    let div = g.alloc_value(HostObject::Element(div).into()).to_abi();
    let window = g.alloc_value(HostObject::Window.into()).to_abi();
    let wheel = g
        .alloc_value(HostObject::Event(Rc::new(InputEvent::wheel(0, 0, 0.0, 1.0, 0))).into())
        .to_abi();

    let mut check = |h: i32, iface: Interface| g.call::<(i32, i32), i32>("instance_of", (h, iface as i32)).unwrap();
    assert_eq!(check(canvas, Interface::Element), 1);
    assert_eq!(check(canvas, Interface::CanvasElement), 1);
    assert_eq!(check(div, Interface::Element), 1);
    assert_eq!(check(div, Interface::CanvasElement), 0);
    assert_eq!(check(window, Interface::Window), 1);
    assert_eq!(check(window, Interface::Document), 0);
    assert_eq!(check(wheel, Interface::MouseEvent), 1);
    assert_eq!(check(wheel, Interface::WheelEvent), 1);
    assert_eq!(check(wheel, Interface::KeyboardEvent), 0);
    assert_eq!(check(HANDLE_NULL as i32, Interface::Window), 0);

    // Unknown interface codes answer 0 instead of trapping.
    assert_eq!(g.call::<(i32, i32), i32>("instance_of", (window, 0)).unwrap(), 0);
    assert_eq!(g.call::<(i32, i32), i32>("instance_of", (window, 99)).unwrap(), 0);
    assert!(g.take_exception().is_none());
}

#[test]
fn test_instance_of_stale_handle_traps() {
    let mut g = guest();
    let h: i32 = g.call("number_new", 1.0f64).unwrap();
    g.call::<i32, ()>("drop_ref", h).unwrap();
    let err = g
        .call::<(i32, i32), i32>("instance_of", (h, Interface::Window as i32))
        .unwrap_err();
    assert!(matches!(err, BridgeError::Host(e) if e == HostError::bad_handle()));
}

#[test]
fn test_int32_array_access() {
    let mut g = guest();
    let h = g.alloc_value(HostObject::Int32Array(vec![3, -1, 70_000]).into()).to_abi();
    assert_eq!(g.call::<(i32, i32), i32>("instance_of", (h, Interface::Int32Array as i32)).unwrap(), 1);
    assert_eq!(g.call::<i32, i32>("int32_array_length", h).unwrap(), 3);

    assert_eq!(g.call::<(i32, i32, i32), i32>("int32_array_copy", (h, 600, 8)).unwrap(), 3);
    assert_eq!([load_i32(&mut g, 600), load_i32(&mut g, 604), load_i32(&mut g, 608)], [3, -1, 70_000]);

    // A short buffer takes a prefix.
    store_i32(&mut g, 700, 0);
    store_i32(&mut g, 704, 0);
    assert_eq!(g.call::<(i32, i32, i32), i32>("int32_array_copy", (h, 700, 1)).unwrap(), 1);
    assert_eq!([load_i32(&mut g, 700), load_i32(&mut g, 704)], [3, 0]);

    let err = g.call::<(i32, i32, i32), i32>("int32_array_copy", (h, 700, -1)).unwrap_err();
    assert!(matches!(err, BridgeError::Host(e) if e == HostError::bad_pointer()));

    let n: i32 = g.call("number_new", 1.0f64).unwrap();
    let err = g.call::<i32, i32>("int32_array_length", n).unwrap_err();
    assert!(matches!(err, BridgeError::Host(e) if e == HostError::type_mismatch("Int32Array", "number")));
}

// ── Errors ──

#[test]
fn test_error_new_captures_stack() {
    let mut g = guest();
    let (ptr, len) = pass(&mut g, "boom");
    let h: i32 = g.call("error_new", (ptr, len)).unwrap();
    assert_eq!(g.call::<(i32, i32), i32>("instance_of", (h, Interface::Error as i32)).unwrap(), 1);

    match value(&g, h) {
        HostValue::Error(e) => {
            assert_eq!((e.name.as_str(), e.message.as_str()), ("Error", "boom"));
            assert!(e.frames.iter().any(|f| f == "make_error"), "frames {:?}", e.frames);
        }
        other => panic!("expected an error, got {:?}", other),
    }

    g.call::<(i32, i32), ()>("error_stack", (h, SLOT)).unwrap();
    let stack = read_slot(&mut g, SLOT).unwrap();
    assert!(stack.starts_with("Error: boom\n    at "), "stack {:?}", stack);
    assert!(stack.contains("at make_error"), "stack {:?}", stack);

    g.call::<(i32, i32), ()>("debug_string", (h, SLOT)).unwrap();
    assert_eq!(read_slot(&mut g, SLOT).as_deref(), Some("Error: boom"));
}

#[test]
fn test_error_stack_of_host_exception_has_no_frames() {
    let mut g = guest();
    let h = g
        .alloc_value(hostbridge_hostapi::HostException::type_error("not a function").into())
        .to_abi();
    g.call::<(i32, i32), ()>("error_stack", (h, SLOT)).unwrap();
    assert_eq!(read_slot(&mut g, SLOT).as_deref(), Some("TypeError: not a function"));
}

#[test]
fn test_error_stack_on_non_error_traps() {
    let mut g = guest();
    let h: i32 = g.call("number_new", 3.0f64).unwrap();
    let err = g.call::<(i32, i32), ()>("error_stack", (h, SLOT)).unwrap_err();
    assert!(
        matches!(&err, BridgeError::Host(e) if *e == HostError::type_mismatch("Error", "number")),
        "got {:?}",
        err
    );
}

// ── Handle lifetime ──

#[test]
fn test_clone_and_drop() {
    let mut g = guest();
    let h: i32 = g.call("number_new", 7.0f64).unwrap();
    let c: i32 = g.call("clone_ref", h).unwrap();
    assert_ne!(h, c);
    assert_eq!(g.handles().live(), 2);

    g.call::<i32, ()>("drop_ref", h).unwrap();
    assert_eq!(value(&g, c), HostValue::Number(7.0));
    g.call::<i32, ()>("drop_ref", c).unwrap();
    assert_eq!(g.handles().live(), 0);

    // Freed slots are reused, most recent first.
    let again: i32 = g.call("number_new", 8.0f64).unwrap();
    assert_eq!(again, c);
}

#[test]
fn test_double_drop_traps() {
    let mut g = guest();
    let h: i32 = g.call("number_new", 7.0f64).unwrap();
    g.call::<i32, ()>("drop_ref", h).unwrap();
    let err = g.call::<i32, ()>("drop_ref", h).unwrap_err();
    assert!(matches!(err, BridgeError::Host(e) if e == HostError::bad_handle()));
}

#[test]
fn test_sentinel_clone_and_drop_are_noops() {
    let mut g = guest();
    let t = HANDLE_TRUE as i32;
    assert_eq!(g.call::<i32, i32>("clone_ref", t).unwrap(), t);
    g.call::<i32, ()>("drop_ref", t).unwrap();
    assert_eq!(g.call::<i32, i32>("boolean_get", t).unwrap(), 1);
}

// ── Logging ──

#[test]
fn test_guest_log_capture() {
    let config = BridgeConfig {
        enable_guest_logs: true,
        max_log_lines: 2,
        ..BridgeConfig::default()
    };
    let mut g = instance_with(MemHost::default(), config, IMPORTS, BODY);
    for (level, text) in [(2, "first"), (0, "second"), (1, "third")] {
        let (ptr, len) = pass(&mut g, text);
        g.call::<(i32, i32, i32), ()>("log", (level, ptr, len)).unwrap();
    }
    let logs = g.logs();
    assert_eq!(logs.len(), 2);
    assert_eq!((logs[0].level, logs[0].message.as_str()), (2, "first"));
    assert_eq!((logs[1].level, logs[1].message.as_str()), (0, "second"));
}

#[test]
fn test_guest_logs_off_by_default() {
    let mut g = guest();
    let (ptr, len) = pass(&mut g, "dropped");
    g.call::<(i32, i32, i32), ()>("log", (2, ptr, len)).unwrap();
    assert!(g.logs().is_empty());
}
