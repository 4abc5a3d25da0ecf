//! WebGL 2 bindings. Every call takes the context handle first.
//!
//! GL reports misuse through `getError`, not exceptions, so almost all of
//! these are infallible forwards. Texture uploads, `readPixels` and the two
//! queries that can throw return a status.

use anyhow::Result;
use wasmtime::{Caller, Linker};

use hostbridge_hostapi::gl::{PixelRect, TexImage, TexSubImage, VertexAttrib};
use hostbridge_hostapi::{GlObjectKind, HostApi, HostError, HostObject};
use hostbridge_primitives::IMPORT_MODULE;

use crate::error::BridgeError;
use crate::host_impl::HostState;

use super::{check_out, read_bytes, read_f32s, read_string, status, write_bytes, write_i32, write_string_slot, OK};

pub(super) fn register<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    register_objects(linker)?;
    register_binding(linker)?;
    register_data(linker)?;
    register_shaders(linker)?;
    register_uniforms(linker)?;
    register_state(linker)?;
    register_drawing(linker)?;
    register_queries(linker)?;
    Ok(())
}

/// Raw GL enums cross as `i32`.
fn e(value: i32) -> u32 {
    value as u32
}

// ── Object lifecycle ──

const CREATABLE: [(&str, &str, GlObjectKind); 5] = [
    ("gl_create_buffer", "gl_delete_buffer", GlObjectKind::Buffer),
    ("gl_create_texture", "gl_delete_texture", GlObjectKind::Texture),
    ("gl_create_framebuffer", "gl_delete_framebuffer", GlObjectKind::Framebuffer),
    ("gl_create_program", "gl_delete_program", GlObjectKind::Program),
    ("gl_create_vertex_array", "gl_delete_vertex_array", GlObjectKind::VertexArray),
];

fn register_objects<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    for (create, _, kind) in CREATABLE {
        linker.func_wrap(
            IMPORT_MODULE,
            create,
            move |mut caller: Caller<'_, HostState<H>>, ctx: i32| -> Result<i32> {
                let state = caller.data_mut();
                let ctx = state.context(ctx)?;
                let object = state.host.create_object(ctx, kind).map(HostObject::Gl);
                Ok(state.alloc_optional(object))
            },
        )?;
    }

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_create_shader",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, shader_type: i32| -> Result<i32> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            let shader = state.host.create_shader(ctx, e(shader_type)).map(HostObject::Gl);
            Ok(state.alloc_optional(shader))
        },
    )?;

    let deletable = CREATABLE
        .iter()
        .map(|&(_, delete, kind)| (delete, kind))
        .chain([("gl_delete_shader", GlObjectKind::Shader)]);
    for (delete, kind) in deletable {
        linker.func_wrap(
            IMPORT_MODULE,
            delete,
            move |mut caller: Caller<'_, HostState<H>>, ctx: i32, object: i32| -> Result<()> {
                let state = caller.data_mut();
                let ctx = state.context(ctx)?;
                let object = state.gl_object_or_null(object, kind)?;
                state.host.delete_object(ctx, object);
                Ok(())
            },
        )?;
    }
    Ok(())
}

// ── Binding ──

fn register_binding<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "gl_bind_buffer",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, target: i32, buffer: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            let buffer = state.gl_object_or_null(buffer, GlObjectKind::Buffer)?;
            state.host.bind_buffer(ctx, e(target), buffer);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_bind_buffer_base",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, target: i32, index: i32, buffer: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            let buffer = state.gl_object_or_null(buffer, GlObjectKind::Buffer)?;
            state.host.bind_buffer_base(ctx, e(target), index as u32, buffer);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_bind_texture",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, target: i32, texture: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            let texture = state.gl_object_or_null(texture, GlObjectKind::Texture)?;
            state.host.bind_texture(ctx, e(target), texture);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_bind_framebuffer",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, target: i32, framebuffer: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            let framebuffer = state.gl_object_or_null(framebuffer, GlObjectKind::Framebuffer)?;
            state.host.bind_framebuffer(ctx, e(target), framebuffer);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_bind_vertex_array",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, vao: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            let vao = state.gl_object_or_null(vao, GlObjectKind::VertexArray)?;
            state.host.bind_vertex_array(ctx, vao);
            Ok(())
        },
    )?;
    Ok(())
}

// ── Buffer and texture data ──

fn register_data<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "gl_buffer_data",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, target: i32, ptr: i32, len: i32, usage: i32| -> Result<()> {
            let ctx = caller.data().context(ctx)?;
            let data = read_bytes(&mut caller, ptr, len)?;
            caller.data_mut().host.buffer_data(ctx, e(target), &data, e(usage));
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_buffer_sub_data",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, target: i32, offset: i32, ptr: i32, len: i32| -> Result<()> {
            let ctx = caller.data().context(ctx)?;
            let data = read_bytes(&mut caller, ptr, len)?;
            caller.data_mut().host.buffer_sub_data(ctx, e(target), offset, &data);
            Ok(())
        },
    )?;

    // `ptr == 0 && len == 0` allocates storage without pixels.
    linker.func_wrap(
        IMPORT_MODULE,
        "gl_tex_image_2d",
        |mut caller: Caller<'_, HostState<H>>,
         ctx: i32,
         target: i32,
         level: i32,
         internal_format: i32,
         width: i32,
         height: i32,
         border: i32,
         format: i32,
         ty: i32,
         ptr: i32,
         len: i32|
         -> i32 {
            let desc = TexImage {
                target: e(target),
                level,
                internal_format,
                width,
                height,
                border,
                format: e(format),
                ty: e(ty),
            };
            status(tex_image_2d(&mut caller, ctx, desc, ptr, len))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_tex_sub_image_2d",
        |mut caller: Caller<'_, HostState<H>>,
         ctx: i32,
         target: i32,
         level: i32,
         x_offset: i32,
         y_offset: i32,
         width: i32,
         height: i32,
         format: i32,
         ty: i32,
         ptr: i32,
         len: i32|
         -> i32 {
            let desc = TexSubImage {
                target: e(target),
                level,
                x_offset,
                y_offset,
                width,
                height,
                format: e(format),
                ty: e(ty),
            };
            status(tex_sub_image_2d(&mut caller, ctx, desc, ptr, len))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_read_pixels",
        |mut caller: Caller<'_, HostState<H>>,
         ctx: i32,
         x: i32,
         y: i32,
         width: i32,
         height: i32,
         format: i32,
         ty: i32,
         ptr: i32,
         len: i32|
         -> i32 {
            let area = PixelRect::new(x, y, width, height);
            status(read_pixels(&mut caller, ctx, area, (e(format), e(ty)), ptr, len))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_tex_parameteri",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, target: i32, pname: i32, param: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state.host.tex_parameteri(ctx, e(target), e(pname), param);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_pixel_storei",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, pname: i32, param: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state.host.pixel_storei(ctx, e(pname), param);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_active_texture",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, unit: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state.host.active_texture(ctx, e(unit));
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_generate_mipmap",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, target: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state.host.generate_mipmap(ctx, e(target));
            Ok(())
        },
    )?;
    Ok(())
}

fn pixels<H: HostApi>(caller: &mut Caller<'_, HostState<H>>, ptr: i32, len: i32) -> Result<Option<Vec<u8>>, HostError> {
    if ptr == 0 && len == 0 {
        return Ok(None);
    }
    read_bytes(caller, ptr, len).map(Some)
}

fn tex_image_2d<H: HostApi>(
    caller: &mut Caller<'_, HostState<H>>,
    ctx: i32,
    desc: TexImage,
    ptr: i32,
    len: i32,
) -> Result<i32, HostError> {
    let ctx = caller.data().context(ctx)?;
    let pixels = pixels(caller, ptr, len)?;
    let state = caller.data_mut();
    match state.host.tex_image_2d(ctx, desc, pixels.as_deref()) {
        Ok(()) => Ok(OK),
        Err(exception) => Ok(state.throw(exception)),
    }
}

fn tex_sub_image_2d<H: HostApi>(
    caller: &mut Caller<'_, HostState<H>>,
    ctx: i32,
    desc: TexSubImage,
    ptr: i32,
    len: i32,
) -> Result<i32, HostError> {
    let ctx = caller.data().context(ctx)?;
    let pixels = pixels(caller, ptr, len)?;
    let state = caller.data_mut();
    match state.host.tex_sub_image_2d(ctx, desc, pixels.as_deref()) {
        Ok(()) => Ok(OK),
        Err(exception) => Ok(state.throw(exception)),
    }
}

/// Copies back into `[ptr, ptr+len)` only when the host succeeded.
fn read_pixels<H: HostApi>(
    caller: &mut Caller<'_, HostState<H>>,
    ctx: i32,
    area: PixelRect,
    (format, ty): (u32, u32),
    ptr: i32,
    len: i32,
) -> Result<i32, HostError> {
    let ctx = caller.data().context(ctx)?;
    check_out(caller, ptr, len)?;
    let mut out = vec![0u8; len as usize];
    let state = caller.data_mut();
    if let Err(exception) = state.host.read_pixels(ctx, area, format, ty, &mut out) {
        return Ok(state.throw(exception));
    }
    write_bytes(caller, ptr, &out)?;
    Ok(OK)
}

// ── Shaders and programs ──

fn register_shaders<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "gl_shader_source",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, shader: i32, ptr: i32, len: i32| -> Result<()> {
            let ctx = caller.data().context(ctx)?;
            let shader = caller.data().gl_object(shader, GlObjectKind::Shader)?;
            let source = read_string(&mut caller, ptr, len)?;
            caller.data_mut().host.shader_source(ctx, shader, &source);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_compile_shader",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, shader: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            let shader = state.gl_object(shader, GlObjectKind::Shader)?;
            state.host.compile_shader(ctx, shader);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_get_shader_parameter",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, shader: i32, pname: i32| -> Result<i32> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            let shader = state.gl_object(shader, GlObjectKind::Shader)?;
            let value = state.host.shader_parameter(ctx, shader, e(pname));
            Ok(state.alloc(value))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_get_shader_info_log",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, shader: i32, out: i32| -> Result<i32> {
            let state = caller.data();
            let ctx = state.context(ctx)?;
            let shader = state.gl_object(shader, GlObjectKind::Shader)?;
            let log = state.host.shader_info_log(ctx, shader);
            write_string_slot(&mut caller, out, log.as_deref())?;
            Ok(log.is_some() as i32)
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_attach_shader",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, program: i32, shader: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            let program = state.gl_object(program, GlObjectKind::Program)?;
            let shader = state.gl_object(shader, GlObjectKind::Shader)?;
            state.host.attach_shader(ctx, program, shader);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_link_program",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, program: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            let program = state.gl_object(program, GlObjectKind::Program)?;
            state.host.link_program(ctx, program);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_get_program_parameter",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, program: i32, pname: i32| -> Result<i32> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            let program = state.gl_object(program, GlObjectKind::Program)?;
            let value = state.host.program_parameter(ctx, program, e(pname));
            Ok(state.alloc(value))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_get_program_info_log",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, program: i32, out: i32| -> Result<i32> {
            let state = caller.data();
            let ctx = state.context(ctx)?;
            let program = state.gl_object(program, GlObjectKind::Program)?;
            let log = state.host.program_info_log(ctx, program);
            write_string_slot(&mut caller, out, log.as_deref())?;
            Ok(log.is_some() as i32)
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_use_program",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, program: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            let program = state.gl_object_or_null(program, GlObjectKind::Program)?;
            state.host.use_program(ctx, program);
            Ok(())
        },
    )?;
    Ok(())
}

// ── Uniforms and vertex input ──

fn register_uniforms<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "gl_get_uniform_location",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, program: i32, ptr: i32, len: i32| -> Result<i32> {
            let ctx = caller.data().context(ctx)?;
            let program = caller.data().gl_object(program, GlObjectKind::Program)?;
            let name = read_string(&mut caller, ptr, len)?;
            let state = caller.data_mut();
            let location = state
                .host
                .uniform_location(ctx, program, &name)
                .map(HostObject::UniformLocation);
            Ok(state.alloc_optional(location))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_get_active_uniform",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, program: i32, index: i32| -> Result<i32> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            let program = state.gl_object(program, GlObjectKind::Program)?;
            let info = state
                .host
                .active_uniform(ctx, program, index as u32)
                .map(HostObject::ActiveInfo);
            Ok(state.alloc_optional(info))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "active_info_name",
        |mut caller: Caller<'_, HostState<H>>, info: i32, out: i32| -> Result<()> {
            let name = caller.data().resolve(info)?.expect_active_info()?.name.clone();
            write_string_slot(&mut caller, out, Some(&name))?;
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "active_info_size",
        |caller: Caller<'_, HostState<H>>, info: i32| -> Result<i32> {
            Ok(caller.data().resolve(info)?.expect_active_info()?.size)
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "active_info_type",
        |caller: Caller<'_, HostState<H>>, info: i32| -> Result<i32> {
            Ok(caller.data().resolve(info)?.expect_active_info()?.ty as i32)
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_get_uniform_block_index",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, program: i32, ptr: i32, len: i32| -> Result<i32> {
            let ctx = caller.data().context(ctx)?;
            let program = caller.data().gl_object(program, GlObjectKind::Program)?;
            let name = read_string(&mut caller, ptr, len)?;
            Ok(caller.data_mut().host.uniform_block_index(ctx, program, &name) as i32)
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_uniform_block_binding",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, program: i32, index: i32, binding: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            let program = state.gl_object(program, GlObjectKind::Program)?;
            state.host.uniform_block_binding(ctx, program, index as u32, binding as u32);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_uniform1i",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, location: i32, value: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            let location = state.uniform_location(location)?;
            state.host.uniform_i32(ctx, location, value);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_uniform1f",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, location: i32, x: f32| -> Result<()> {
            uniform_f32(&mut caller, ctx, location, &[x])
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_uniform2f",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, location: i32, x: f32, y: f32| -> Result<()> {
            uniform_f32(&mut caller, ctx, location, &[x, y])
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_uniform4f",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, location: i32, x: f32, y: f32, z: f32, w: f32| -> Result<()> {
            uniform_f32(&mut caller, ctx, location, &[x, y, z, w])
        },
    )?;

    // `count` is in floats, not matrices.
    linker.func_wrap(
        IMPORT_MODULE,
        "gl_uniform_matrix4fv",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, location: i32, transpose: i32, ptr: i32, count: i32| -> Result<()> {
            let ctx = caller.data().context(ctx)?;
            let location = caller.data().uniform_location(location)?;
            let values = read_f32s(&mut caller, ptr, count)?;
            caller
                .data_mut()
                .host
                .uniform_matrix4fv(ctx, location, transpose != 0, &values);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_enable_vertex_attrib_array",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, index: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state.host.enable_vertex_attrib_array(ctx, index as u32);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_vertex_attrib_pointer",
        |mut caller: Caller<'_, HostState<H>>,
         ctx: i32,
         index: i32,
         size: i32,
         ty: i32,
         normalized: i32,
         stride: i32,
         offset: i32|
         -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            let attrib = VertexAttrib {
                index: index as u32,
                size,
                ty: e(ty),
                normalized: normalized != 0,
                stride,
                offset,
            };
            state.host.vertex_attrib_pointer(ctx, attrib);
            Ok(())
        },
    )?;
    Ok(())
}

fn uniform_f32<H: HostApi>(caller: &mut Caller<'_, HostState<H>>, ctx: i32, location: i32, values: &[f32]) -> Result<()> {
    let state = caller.data_mut();
    let ctx = state.context(ctx)?;
    let location = state.uniform_location(location)?;
    state.host.uniform_f32(ctx, location, values);
    Ok(())
}

// ── Fixed-function state ──

fn register_state<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    for (name, enabled) in [("gl_enable", true), ("gl_disable", false)] {
        linker.func_wrap(
            IMPORT_MODULE,
            name,
            move |mut caller: Caller<'_, HostState<H>>, ctx: i32, cap: i32| -> Result<()> {
                let state = caller.data_mut();
                let ctx = state.context(ctx)?;
                state.host.set_capability(ctx, e(cap), enabled);
                Ok(())
            },
        )?;
    }

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_blend_func",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, src: i32, dst: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state.host.blend_func_separate(ctx, e(src), e(dst), e(src), e(dst));
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_blend_func_separate",
        |mut caller: Caller<'_, HostState<H>>,
         ctx: i32,
         src_rgb: i32,
         dst_rgb: i32,
         src_alpha: i32,
         dst_alpha: i32|
         -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state
                .host
                .blend_func_separate(ctx, e(src_rgb), e(dst_rgb), e(src_alpha), e(dst_alpha));
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_blend_equation",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, mode: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state.host.blend_equation_separate(ctx, e(mode), e(mode));
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_blend_equation_separate",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, mode_rgb: i32, mode_alpha: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state.host.blend_equation_separate(ctx, e(mode_rgb), e(mode_alpha));
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_depth_func",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, func: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state.host.depth_func(ctx, e(func));
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_depth_mask",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, flag: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state.host.depth_mask(ctx, flag != 0);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_color_mask",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, r: i32, g: i32, b: i32, a: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state.host.color_mask(ctx, [r != 0, g != 0, b != 0, a != 0]);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_stencil_func",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, func: i32, reference: i32, mask: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state.host.stencil_func(ctx, e(func), reference, e(mask));
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_stencil_op",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, fail: i32, zfail: i32, zpass: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state.host.stencil_op(ctx, e(fail), e(zfail), e(zpass));
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_stencil_mask",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, mask: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state.host.stencil_mask(ctx, e(mask));
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_cull_face",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, mode: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state.host.cull_face(ctx, e(mode));
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_viewport",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, x: i32, y: i32, width: i32, height: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state.host.viewport(ctx, PixelRect::new(x, y, width, height));
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_scissor",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, x: i32, y: i32, width: i32, height: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state.host.scissor(ctx, PixelRect::new(x, y, width, height));
            Ok(())
        },
    )?;
    Ok(())
}

// ── Clears, draws, framebuffers ──

fn register_drawing<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "gl_clear",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, mask: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state.host.clear(ctx, e(mask));
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_clear_color",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, r: f32, g: f32, b: f32, a: f32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state.host.clear_color(ctx, [r, g, b, a]);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_clear_depth",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, depth: f32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state.host.clear_depth(ctx, depth);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_clear_stencil",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, stencil: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state.host.clear_stencil(ctx, stencil);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_draw_arrays",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, mode: i32, first: i32, count: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state.host.draw_arrays(ctx, e(mode), first, count);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_draw_elements",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, mode: i32, count: i32, ty: i32, offset: i32| -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            state.host.draw_elements(ctx, e(mode), count, e(ty), offset);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_framebuffer_texture_2d",
        |mut caller: Caller<'_, HostState<H>>,
         ctx: i32,
         target: i32,
         attachment: i32,
         textarget: i32,
         texture: i32,
         level: i32|
         -> Result<()> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            let texture = state.gl_object_or_null(texture, GlObjectKind::Texture)?;
            state
                .host
                .framebuffer_texture_2d(ctx, e(target), e(attachment), e(textarget), texture, level);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_check_framebuffer_status",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, target: i32| -> Result<i32> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            Ok(state.host.check_framebuffer_status(ctx, e(target)) as i32)
        },
    )?;
    Ok(())
}

// ── Queries ──

fn register_queries<H: HostApi + 'static>(linker: &mut Linker<HostState<H>>) -> Result<(), BridgeError> {
    // Writes HANDLE_NONE when the extension is unsupported.
    linker.func_wrap(
        IMPORT_MODULE,
        "gl_get_extension",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, ptr: i32, len: i32, out: i32| -> i32 {
            status(get_extension(&mut caller, ctx, ptr, len, out))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_get_parameter",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32, pname: i32, out: i32| -> i32 {
            status(get_parameter(&mut caller, ctx, e(pname), out))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "gl_get_error",
        |mut caller: Caller<'_, HostState<H>>, ctx: i32| -> Result<i32> {
            let state = caller.data_mut();
            let ctx = state.context(ctx)?;
            Ok(state.host.get_error(ctx) as i32)
        },
    )?;
    Ok(())
}

fn get_extension<H: HostApi>(
    caller: &mut Caller<'_, HostState<H>>,
    ctx: i32,
    ptr: i32,
    len: i32,
    out: i32,
) -> Result<i32, HostError> {
    let context = caller.data().context(ctx)?;
    let name = read_string(caller, ptr, len)?;
    check_out(caller, out, 4)?;
    let state = caller.data_mut();
    let extension = match state.host.get_extension(context, &name) {
        Ok(extension) => extension,
        Err(exception) => return Ok(state.throw(exception)),
    };
    let handle = state.alloc_optional(extension.map(|name| HostObject::Extension { context, name }));
    write_i32(caller, out, handle)?;
    Ok(OK)
}

fn get_parameter<H: HostApi>(
    caller: &mut Caller<'_, HostState<H>>,
    ctx: i32,
    pname: u32,
    out: i32,
) -> Result<i32, HostError> {
    let ctx = caller.data().context(ctx)?;
    check_out(caller, out, 4)?;
    let state = caller.data_mut();
    let value = match state.host.get_parameter(ctx, pname) {
        Ok(value) => value,
        Err(exception) => return Ok(state.throw(exception)),
    };
    let handle = state.alloc(value);
    write_i32(caller, out, handle)?;
    Ok(OK)
}
