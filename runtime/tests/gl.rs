//! WebGL2 bindings against the in-memory context.

mod common;

use hostbridge_hostapi::gl;
use hostbridge_hostapi::{
    ContextId, GlContext, GlObject, GlObjectKind, HostError, HostObject, HostValue, MemHost,
    UniformLocation,
};
use hostbridge_primitives::{ErrorCode, HANDLE_FALSE, HANDLE_NONE, HANDLE_NULL, HANDLE_TRUE};
use hostbridge_runtime::{BridgeError, BridgeInstance};

use common::*;

const IMPORTS: &str = r#"
    (import "hostbridge" "window" (func $window (result i32)))
    (import "hostbridge" "window_document" (func $window_document (param i32) (result i32)))
    (import "hostbridge" "document_create_element" (func $create_element (param i32 i32 i32 i32) (result i32)))
    (import "hostbridge" "canvas_get_context" (func $get_context (param i32 i32 i32 i32) (result i32)))
    (import "hostbridge" "gl_create_buffer" (func $create_buffer (param i32) (result i32)))
    (import "hostbridge" "gl_create_texture" (func $create_texture (param i32) (result i32)))
    (import "hostbridge" "gl_create_program" (func $create_program (param i32) (result i32)))
    (import "hostbridge" "gl_create_shader" (func $create_shader (param i32 i32) (result i32)))
    (import "hostbridge" "gl_bind_buffer" (func $bind_buffer (param i32 i32 i32)))
    (import "hostbridge" "gl_buffer_data" (func $buffer_data (param i32 i32 i32 i32 i32)))
    (import "hostbridge" "gl_clear_color" (func $clear_color (param i32 f32 f32 f32 f32)))
    (import "hostbridge" "gl_clear" (func $clear (param i32 i32)))
    (import "hostbridge" "gl_read_pixels" (func $read_pixels (param i32 i32 i32 i32 i32 i32 i32 i32 i32) (result i32)))
    (import "hostbridge" "gl_enable" (func $enable (param i32 i32)))
    (import "hostbridge" "gl_get_error" (func $get_error (param i32) (result i32)))
    (import "hostbridge" "gl_get_extension" (func $get_extension (param i32 i32 i32 i32) (result i32)))
    (import "hostbridge" "gl_get_parameter" (func $get_parameter (param i32 i32 i32) (result i32)))
    (import "hostbridge" "gl_shader_source" (func $shader_source (param i32 i32 i32 i32)))
    (import "hostbridge" "gl_compile_shader" (func $compile_shader (param i32 i32)))
    (import "hostbridge" "gl_get_shader_parameter" (func $shader_parameter (param i32 i32 i32) (result i32)))
    (import "hostbridge" "gl_get_shader_info_log" (func $shader_info_log (param i32 i32 i32) (result i32)))
    (import "hostbridge" "gl_attach_shader" (func $attach_shader (param i32 i32 i32)))
    (import "hostbridge" "gl_link_program" (func $link_program (param i32 i32)))
    (import "hostbridge" "gl_get_program_parameter" (func $program_parameter (param i32 i32 i32) (result i32)))
    (import "hostbridge" "gl_use_program" (func $use_program (param i32 i32)))
    (import "hostbridge" "gl_get_uniform_location" (func $uniform_location (param i32 i32 i32 i32) (result i32)))
    (import "hostbridge" "gl_uniform4f" (func $uniform4f (param i32 i32 f32 f32 f32 f32)))
    (import "hostbridge" "gl_draw_arrays" (func $draw_arrays (param i32 i32 i32 i32)))
"#;

// bridge_start builds a canvas and its webgl2 context; `$gl` holds the
// context handle and every export below forwards to it.
const BODY: &str = r#"
    (data (i32.const 128) "canvas")
    (data (i32.const 136) "webgl2")
    (global $gl (mut i32) (i32.const 0))

    (func (export "bridge_start")
        (drop (call $create_element
            (call $window_document (call $window))
            (i32.const 128) (i32.const 6) (i32.const 200)))
        (drop (call $get_context (i32.load (i32.const 200)) (i32.const 136) (i32.const 6) (i32.const 204)))
        (global.set $gl (i32.load (i32.const 204))))

    (func (export "gl") (result i32) global.get $gl)
    (func (export "create_buffer") (result i32) (call $create_buffer (global.get $gl)))
    (func (export "create_texture") (result i32) (call $create_texture (global.get $gl)))
    (func (export "create_program") (result i32) (call $create_program (global.get $gl)))
    (func (export "create_shader") (param i32) (result i32)
        (call $create_shader (global.get $gl) (local.get 0)))
    (func (export "bind_buffer") (param i32 i32)
        (call $bind_buffer (global.get $gl) (local.get 0) (local.get 1)))
    (func (export "buffer_data") (param i32 i32 i32 i32)
        (call $buffer_data (global.get $gl) (local.get 0) (local.get 1) (local.get 2) (local.get 3)))
    (func (export "clear_color") (param f32 f32 f32 f32)
        (call $clear_color (global.get $gl) (local.get 0) (local.get 1) (local.get 2) (local.get 3)))
    (func (export "clear") (param i32)
        (call $clear (global.get $gl) (local.get 0)))
    (func (export "read_pixels") (param i32 i32 i32 i32 i32 i32 i32 i32) (result i32)
        (call $read_pixels (global.get $gl)
            (local.get 0) (local.get 1) (local.get 2) (local.get 3)
            (local.get 4) (local.get 5) (local.get 6) (local.get 7)))
    (func (export "enable") (param i32)
        (call $enable (global.get $gl) (local.get 0)))
    (func (export "get_error") (result i32)
        (call $get_error (global.get $gl)))
    (func (export "get_extension") (param i32 i32 i32) (result i32)
        (call $get_extension (global.get $gl) (local.get 0) (local.get 1) (local.get 2)))
    (func (export "get_parameter") (param i32 i32) (result i32)
        (call $get_parameter (global.get $gl) (local.get 0) (local.get 1)))
    (func (export "shader_source") (param i32 i32 i32)
        (call $shader_source (global.get $gl) (local.get 0) (local.get 1) (local.get 2)))
    (func (export "compile_shader") (param i32)
        (call $compile_shader (global.get $gl) (local.get 0)))
    (func (export "shader_parameter") (param i32 i32) (result i32)
        (call $shader_parameter (global.get $gl) (local.get 0) (local.get 1)))
    (func (export "shader_info_log") (param i32 i32) (result i32)
        (call $shader_info_log (global.get $gl) (local.get 0) (local.get 1)))
    (func (export "attach_shader") (param i32 i32)
        (call $attach_shader (global.get $gl) (local.get 0) (local.get 1)))
    (func (export "link_program") (param i32)
        (call $link_program (global.get $gl) (local.get 0)))
    (func (export "program_parameter") (param i32 i32) (result i32)
        (call $program_parameter (global.get $gl) (local.get 0) (local.get 1)))
    (func (export "use_program") (param i32)
        (call $use_program (global.get $gl) (local.get 0)))
    (func (export "uniform_location") (param i32 i32 i32) (result i32)
        (call $uniform_location (global.get $gl) (local.get 0) (local.get 1) (local.get 2)))
    (func (export "uniform4f") (param i32 f32 f32 f32 f32)
        (call $uniform4f (global.get $gl) (local.get 0) (local.get 1) (local.get 2) (local.get 3) (local.get 4)))
    (func (export "draw_arrays") (param i32 i32 i32)
        (call $draw_arrays (global.get $gl) (local.get 0) (local.get 1) (local.get 2)))
"#;

const VERTEX_SOURCE: &str = "void main() {\n  gl_Position = vec4(0.0);\n}\n";
const FRAGMENT_SOURCE: &str = "precision highp float;\nuniform vec4 color;\nvoid main() {\n}\n";

type Guest = BridgeInstance<MemHost>;

fn guest() -> Guest {
    instance(IMPORTS, BODY)
}

fn context_id(g: &mut Guest) -> ContextId {
    let handle: i32 = g.call("gl", ()).unwrap();
    match value(g, handle) {
        HostValue::Object(HostObject::Context(ctx)) => ctx,
        other => panic!("expected a context, got {:?}", other),
    }
}

fn context(g: &mut Guest) -> &GlContext {
    let ctx = context_id(g);
    g.host().context(ctx).expect("context should exist")
}

fn gl_object(g: &Guest, handle: i32) -> GlObject {
    match value(g, handle) {
        HostValue::Object(HostObject::Gl(obj)) => obj,
        other => panic!("expected a WebGL object, got {:?}", other),
    }
}

fn get_error(g: &mut Guest) -> u32 {
    g.call::<(), i32>("get_error", ()).unwrap() as u32
}

fn e(v: u32) -> i32 {
    v as i32
}

fn shader(g: &mut Guest, ty: u32, source: &str) -> i32 {
    let s: i32 = g.call("create_shader", e(ty)).unwrap();
    let (ptr, len) = pass(g, source);
    g.call::<(i32, i32, i32), ()>("shader_source", (s, ptr, len)).unwrap();
    g.call::<i32, ()>("compile_shader", s).unwrap();
    s
}

// ── Buffers ──

#[test]
fn test_buffer_upload() {
    let mut g = guest();
    let buf: i32 = g.call("create_buffer", ()).unwrap();
    let id = gl_object(&g, buf).id;

    g.call::<(i32, i32), ()>("bind_buffer", (e(gl::ARRAY_BUFFER), buf)).unwrap();
    store_bytes(&mut g, 600, &[1, 2, 3, 4, 5]);
    g.call::<(i32, i32, i32, i32), ()>("buffer_data", (e(gl::ARRAY_BUFFER), 600, 5, e(gl::STATIC_DRAW)))
        .unwrap();

    assert_eq!(context(&mut g).buffer_contents(id), Some(&[1u8, 2, 3, 4, 5][..]));
    assert_eq!(get_error(&mut g), gl::NO_ERROR);
}

#[test]
fn test_gl_errors_are_reported_not_trapped() {
    let mut g = guest();
    // Nothing bound.
    g.call::<(i32, i32, i32, i32), ()>("buffer_data", (e(gl::ARRAY_BUFFER), 600, 4, e(gl::STATIC_DRAW)))
        .unwrap();
    assert_eq!(get_error(&mut g), gl::INVALID_OPERATION);

    g.call::<i32, ()>("enable", 0x1234).unwrap();
    assert_eq!(get_error(&mut g), gl::INVALID_ENUM);
    assert_eq!(get_error(&mut g), gl::NO_ERROR);

    g.call::<i32, ()>("enable", e(gl::BLEND)).unwrap();
    assert!(context(&mut g).is_enabled(gl::BLEND));
}

#[test]
fn test_wrong_object_kind_traps() {
    let mut g = guest();
    let tex: i32 = g.call("create_texture", ()).unwrap();
    let err = g
        .call::<(i32, i32), ()>("bind_buffer", (e(gl::ARRAY_BUFFER), tex))
        .unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Host(HostError::TypeMismatch { expected: "WebGLBuffer", found: "WebGLTexture" })
    ));
    assert_eq!(gl_object(&g, tex).kind, GlObjectKind::Texture);

    // null unbinds.
    g.call::<(i32, i32), ()>("bind_buffer", (e(gl::ARRAY_BUFFER), HANDLE_NULL as i32))
        .unwrap();
    assert_eq!(context(&mut g).bound_buffer(gl::ARRAY_BUFFER), None);
}

// ── Clear and read back ──

#[test]
fn test_clear_then_read_pixels() {
    let mut g = guest();
    g.call::<(f32, f32, f32, f32), ()>("clear_color", (1.0, 0.0, 0.5, 1.0)).unwrap();
    g.call::<i32, ()>("clear", e(gl::COLOR_BUFFER_BIT)).unwrap();
    assert_eq!(context(&mut g).clears(), &[gl::COLOR_BUFFER_BIT]);

    let status: i32 = g
        .call("read_pixels", (0, 0, 2, 1, e(gl::RGBA), e(gl::UNSIGNED_BYTE), 600, 8))
        .unwrap();
    assert_eq!(status, 0);
    let pixel = i32::from_le_bytes([255, 0, 128, 255]);
    assert_eq!(load_i32(&mut g, 600), pixel);
    assert_eq!(load_i32(&mut g, 604), pixel);
}

#[test]
fn test_read_pixels_short_buffer_throws() {
    let mut g = guest();
    store_i32(&mut g, 600, 0x1234);
    let status: i32 = g
        .call("read_pixels", (0, 0, 2, 2, e(gl::RGBA), e(gl::UNSIGNED_BYTE), 600, 8))
        .unwrap();
    assert_eq!(status, ErrorCode::Threw as i32);
    assert_eq!(g.take_exception().unwrap().name, "TypeError");
    assert_eq!(load_i32(&mut g, 600), 0x1234);

    let status: i32 = g
        .call("read_pixels", (0, 0, 1, 1, e(gl::RGBA), e(gl::UNSIGNED_BYTE), 65534, 4))
        .unwrap();
    assert_eq!(status, ErrorCode::BadPointer as i32);
}

// ── Queries ──

#[test]
fn test_get_extension() {
    let mut g = guest();
    let ctx = context_id(&mut g);
    let (ptr, len) = pass(&mut g, "ext_COLOR_buffer_FLOAT");
    assert_eq!(g.call::<(i32, i32, i32), i32>("get_extension", (ptr, len, SLOT)).unwrap(), 0);
    let ext = load_i32(&mut g, SLOT);
    assert_eq!(
        value(&g, ext),
        HostValue::Object(HostObject::Extension {
            context: ctx,
            name: "EXT_color_buffer_float".to_string(),
        })
    );
    assert!(context(&mut g).extension_enabled("EXT_color_buffer_float"));

    let (ptr, len) = pass(&mut g, "WEBGL_draw_buffers");
    assert_eq!(g.call::<(i32, i32, i32), i32>("get_extension", (ptr, len, SLOT)).unwrap(), 0);
    assert_eq!(load_i32(&mut g, SLOT), HANDLE_NONE as i32);
}

#[test]
fn test_get_parameter() {
    let mut g = guest();
    let param = |g: &mut Guest, pname: u32| -> HostValue {
        assert_eq!(g.call::<(i32, i32), i32>("get_parameter", (e(pname), SLOT)).unwrap(), 0);
        let h = load_i32(g, SLOT);
        value(g, h)
    };
    assert_eq!(param(&mut g, gl::VERSION), HostValue::String("WebGL 2.0".into()));
    assert_eq!(param(&mut g, gl::MAX_TEXTURE_SIZE), HostValue::Number(4096.0));
    assert_eq!(param(&mut g, gl::BLEND), HostValue::Bool(false));
    assert_eq!(
        param(&mut g, gl::VIEWPORT),
        HostValue::Object(HostObject::Int32Array(vec![0, 0, 300, 150]))
    );

    assert_eq!(param(&mut g, 0x1234), HostValue::Null);
    assert_eq!(load_i32(&mut g, SLOT), HANDLE_NULL as i32);
    assert_eq!(get_error(&mut g), gl::INVALID_ENUM);
}

#[test]
fn test_lost_context() {
    let mut g = guest();
    let ctx = context_id(&mut g);
    g.host_mut().lose_context(ctx);

    let status: i32 = g.call("get_parameter", (e(gl::VERSION), SLOT)).unwrap();
    assert_eq!(status, ErrorCode::Threw as i32);
    assert_eq!(g.take_exception().unwrap().name, "InvalidStateError");

    // Infallible calls are ignored.
    g.call::<i32, ()>("clear", e(gl::COLOR_BUFFER_BIT)).unwrap();
    assert!(context(&mut g).clears().is_empty());

    assert_eq!(get_error(&mut g), gl::CONTEXT_LOST_WEBGL);
    assert_eq!(get_error(&mut g), gl::NO_ERROR);
}

// ── Shaders and programs ──

#[test]
fn test_shader_compile_status_and_log() {
    let mut g = guest();
    let good = shader(&mut g, gl::VERTEX_SHADER, VERTEX_SOURCE);
    let status: i32 = g.call("shader_parameter", (good, e(gl::COMPILE_STATUS))).unwrap();
    assert_eq!(status, HANDLE_TRUE as i32);
    assert_eq!(g.call::<(i32, i32), i32>("shader_info_log", (good, SLOT)).unwrap(), 1);
    assert_eq!(read_slot(&mut g, SLOT), None);

    let bad = shader(&mut g, gl::FRAGMENT_SHADER, "precision highp float;");
    let status: i32 = g.call("shader_parameter", (bad, e(gl::COMPILE_STATUS))).unwrap();
    assert_eq!(status, HANDLE_FALSE as i32);
    assert_eq!(g.call::<(i32, i32), i32>("shader_info_log", (bad, SLOT)).unwrap(), 1);
    assert!(read_slot(&mut g, SLOT).unwrap().contains("main"));

    let invalid: i32 = g.call("create_shader", 0x1234).unwrap();
    assert_eq!(invalid, HANDLE_NONE as i32);
    assert_eq!(get_error(&mut g), gl::INVALID_ENUM);
}

#[test]
fn test_link_set_uniform_and_draw() {
    let mut g = guest();
    let vs = shader(&mut g, gl::VERTEX_SHADER, VERTEX_SOURCE);
    let fs = shader(&mut g, gl::FRAGMENT_SHADER, FRAGMENT_SOURCE);
    let program: i32 = g.call("create_program", ()).unwrap();
    g.call::<(i32, i32), ()>("attach_shader", (program, vs)).unwrap();
    g.call::<(i32, i32), ()>("attach_shader", (program, fs)).unwrap();
    g.call::<i32, ()>("link_program", program).unwrap();
    let linked: i32 = g.call("program_parameter", (program, e(gl::LINK_STATUS))).unwrap();
    assert_eq!(linked, HANDLE_TRUE as i32);

    g.call::<i32, ()>("use_program", program).unwrap();
    let (ptr, len) = pass(&mut g, "color");
    let loc: i32 = g.call("uniform_location", (program, ptr, len)).unwrap();
    let location = match value(&g, loc) {
        HostValue::Object(HostObject::UniformLocation(loc)) => loc,
        other => panic!("expected a uniform location, got {:?}", other),
    };
    assert_eq!(
        location,
        UniformLocation {
            program: gl_object(&g, program),
            location: 0
        }
    );

    g.call::<(i32, f32, f32, f32, f32), ()>("uniform4f", (loc, 0.25, 0.5, 0.75, 1.0))
        .unwrap();
    assert_eq!(
        context(&mut g).uniform_value(location),
        Some(&[0.25f32, 0.5, 0.75, 1.0][..])
    );

    let (ptr, len) = pass(&mut g, "missing");
    let none: i32 = g.call("uniform_location", (program, ptr, len)).unwrap();
    assert_eq!(none, HANDLE_NONE as i32);

    g.call::<(i32, i32, i32), ()>("draw_arrays", (e(gl::TRIANGLES), 0, 3)).unwrap();
    assert_eq!(context(&mut g).draw_calls().len(), 1);
    assert_eq!(get_error(&mut g), gl::NO_ERROR);
}

#[test]
fn test_link_failure() {
    let mut g = guest();
    let vs = shader(&mut g, gl::VERTEX_SHADER, VERTEX_SOURCE);
    let program: i32 = g.call("create_program", ()).unwrap();
    g.call::<(i32, i32), ()>("attach_shader", (program, vs)).unwrap();
    g.call::<i32, ()>("link_program", program).unwrap();
    let linked: i32 = g.call("program_parameter", (program, e(gl::LINK_STATUS))).unwrap();
    assert_eq!(linked, HANDLE_FALSE as i32);

    g.call::<i32, ()>("use_program", program).unwrap();
    assert_eq!(get_error(&mut g), gl::INVALID_OPERATION);
    g.call::<(i32, i32, i32), ()>("draw_arrays", (e(gl::TRIANGLES), 0, 3)).unwrap();
    assert_eq!(get_error(&mut g), gl::INVALID_OPERATION);
}
