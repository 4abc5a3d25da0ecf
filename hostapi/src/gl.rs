//! WebGL 2 enum values and call descriptors.
//!
//! Only the subset the bindings forward is listed. Values match the
//! `WebGL2RenderingContext` constants.

// ── Clear bits ──

pub const DEPTH_BUFFER_BIT: u32 = 0x0100;
pub const STENCIL_BUFFER_BIT: u32 = 0x0400;
pub const COLOR_BUFFER_BIT: u32 = 0x4000;

// ── Primitives ──

pub const POINTS: u32 = 0x0000;
pub const LINES: u32 = 0x0001;
pub const LINE_LOOP: u32 = 0x0002;
pub const LINE_STRIP: u32 = 0x0003;
pub const TRIANGLES: u32 = 0x0004;
pub const TRIANGLE_STRIP: u32 = 0x0005;
pub const TRIANGLE_FAN: u32 = 0x0006;

// ── Blending ──

pub const ZERO: u32 = 0;
pub const ONE: u32 = 1;
pub const SRC_COLOR: u32 = 0x0300;
pub const ONE_MINUS_SRC_COLOR: u32 = 0x0301;
pub const SRC_ALPHA: u32 = 0x0302;
pub const ONE_MINUS_SRC_ALPHA: u32 = 0x0303;
pub const DST_ALPHA: u32 = 0x0304;
pub const ONE_MINUS_DST_ALPHA: u32 = 0x0305;
pub const DST_COLOR: u32 = 0x0306;
pub const ONE_MINUS_DST_COLOR: u32 = 0x0307;
pub const SRC_ALPHA_SATURATE: u32 = 0x0308;
pub const CONSTANT_COLOR: u32 = 0x8001;
pub const ONE_MINUS_CONSTANT_COLOR: u32 = 0x8002;
pub const CONSTANT_ALPHA: u32 = 0x8003;
pub const ONE_MINUS_CONSTANT_ALPHA: u32 = 0x8004;

pub const FUNC_ADD: u32 = 0x8006;
pub const MIN: u32 = 0x8007;
pub const MAX: u32 = 0x8008;
pub const FUNC_SUBTRACT: u32 = 0x800A;
pub const FUNC_REVERSE_SUBTRACT: u32 = 0x800B;

// ── Buffers ──

pub const ARRAY_BUFFER: u32 = 0x8892;
pub const ELEMENT_ARRAY_BUFFER: u32 = 0x8893;
pub const UNIFORM_BUFFER: u32 = 0x8A11;
pub const STREAM_DRAW: u32 = 0x88E0;
pub const STATIC_DRAW: u32 = 0x88E4;
pub const DYNAMIC_DRAW: u32 = 0x88E8;

// ── Capabilities ──

pub const CULL_FACE: u32 = 0x0B44;
pub const DEPTH_TEST: u32 = 0x0B71;
pub const STENCIL_TEST: u32 = 0x0B90;
pub const DITHER: u32 = 0x0BD0;
pub const BLEND: u32 = 0x0BE2;
pub const SCISSOR_TEST: u32 = 0x0C11;

// ── Errors ──

pub const NO_ERROR: u32 = 0;
pub const INVALID_ENUM: u32 = 0x0500;
pub const INVALID_VALUE: u32 = 0x0501;
pub const INVALID_OPERATION: u32 = 0x0502;
pub const OUT_OF_MEMORY: u32 = 0x0505;
pub const INVALID_FRAMEBUFFER_OPERATION: u32 = 0x0506;
pub const CONTEXT_LOST_WEBGL: u32 = 0x9242;

// ── Faces ──

pub const FRONT: u32 = 0x0404;
pub const BACK: u32 = 0x0405;
pub const FRONT_AND_BACK: u32 = 0x0408;

// ── Depth and stencil ──

pub const NEVER: u32 = 0x0200;
pub const LESS: u32 = 0x0201;
pub const EQUAL: u32 = 0x0202;
pub const LEQUAL: u32 = 0x0203;
pub const GREATER: u32 = 0x0204;
pub const NOTEQUAL: u32 = 0x0205;
pub const GEQUAL: u32 = 0x0206;
pub const ALWAYS: u32 = 0x0207;

pub const KEEP: u32 = 0x1E00;
pub const REPLACE: u32 = 0x1E01;
pub const INCR: u32 = 0x1E02;
pub const DECR: u32 = 0x1E03;
pub const INVERT: u32 = 0x150A;
pub const INCR_WRAP: u32 = 0x8507;
pub const DECR_WRAP: u32 = 0x8508;

// ── Data types ──

pub const BYTE: u32 = 0x1400;
pub const UNSIGNED_BYTE: u32 = 0x1401;
pub const SHORT: u32 = 0x1402;
pub const UNSIGNED_SHORT: u32 = 0x1403;
pub const INT: u32 = 0x1404;
pub const UNSIGNED_INT: u32 = 0x1405;
pub const FLOAT: u32 = 0x1406;
pub const HALF_FLOAT: u32 = 0x140B;

// ── Pixel formats ──

pub const DEPTH_COMPONENT: u32 = 0x1902;
pub const RED: u32 = 0x1903;
pub const ALPHA: u32 = 0x1906;
pub const RGB: u32 = 0x1907;
pub const RGBA: u32 = 0x1908;
pub const LUMINANCE: u32 = 0x1909;
pub const LUMINANCE_ALPHA: u32 = 0x190A;
pub const RG: u32 = 0x8227;
pub const R8: u32 = 0x8229;
pub const RGBA8: u32 = 0x8058;
pub const RGBA32F: u32 = 0x8814;

// ── Textures ──

pub const TEXTURE_2D: u32 = 0x0DE1;
pub const TEXTURE_CUBE_MAP: u32 = 0x8513;
pub const TEXTURE0: u32 = 0x84C0;
pub const TEXTURE_MAG_FILTER: u32 = 0x2800;
pub const TEXTURE_MIN_FILTER: u32 = 0x2801;
pub const TEXTURE_WRAP_S: u32 = 0x2802;
pub const TEXTURE_WRAP_T: u32 = 0x2803;
pub const NEAREST: u32 = 0x2600;
pub const LINEAR: u32 = 0x2601;
pub const LINEAR_MIPMAP_LINEAR: u32 = 0x2703;
pub const REPEAT: u32 = 0x2901;
pub const CLAMP_TO_EDGE: u32 = 0x812F;
pub const MIRRORED_REPEAT: u32 = 0x8370;

pub const UNPACK_ALIGNMENT: u32 = 0x0CF5;
pub const PACK_ALIGNMENT: u32 = 0x0D05;
pub const UNPACK_FLIP_Y_WEBGL: u32 = 0x9240;
pub const UNPACK_PREMULTIPLY_ALPHA_WEBGL: u32 = 0x9241;

// ── Shaders and programs ──

pub const FRAGMENT_SHADER: u32 = 0x8B30;
pub const VERTEX_SHADER: u32 = 0x8B31;
pub const DELETE_STATUS: u32 = 0x8B80;
pub const COMPILE_STATUS: u32 = 0x8B81;
pub const LINK_STATUS: u32 = 0x8B82;
pub const SHADER_TYPE: u32 = 0x8B4F;
pub const ATTACHED_SHADERS: u32 = 0x8B85;
pub const ACTIVE_UNIFORMS: u32 = 0x8B86;
pub const ACTIVE_UNIFORM_BLOCKS: u32 = 0x8A36;

pub const FLOAT_VEC2: u32 = 0x8B50;
pub const FLOAT_VEC3: u32 = 0x8B51;
pub const FLOAT_VEC4: u32 = 0x8B52;
pub const INT_VEC2: u32 = 0x8B53;
pub const INT_VEC3: u32 = 0x8B54;
pub const INT_VEC4: u32 = 0x8B55;
pub const BOOL: u32 = 0x8B56;
pub const FLOAT_MAT2: u32 = 0x8B5A;
pub const FLOAT_MAT3: u32 = 0x8B5B;
pub const FLOAT_MAT4: u32 = 0x8B5C;
pub const SAMPLER_2D: u32 = 0x8B5E;
pub const SAMPLER_CUBE: u32 = 0x8B60;

pub const INVALID_INDEX: u32 = 0xFFFF_FFFF;

// ── Framebuffers ──

pub const FRAMEBUFFER: u32 = 0x8D40;
pub const READ_FRAMEBUFFER: u32 = 0x8CA8;
pub const DRAW_FRAMEBUFFER: u32 = 0x8CA9;
pub const COLOR_ATTACHMENT0: u32 = 0x8CE0;
pub const DEPTH_ATTACHMENT: u32 = 0x8D00;
pub const STENCIL_ATTACHMENT: u32 = 0x8D20;
pub const FRAMEBUFFER_COMPLETE: u32 = 0x8CD5;
pub const FRAMEBUFFER_INCOMPLETE_ATTACHMENT: u32 = 0x8CD6;
pub const FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT: u32 = 0x8CD7;

// ── getParameter ──

pub const VENDOR: u32 = 0x1F00;
pub const RENDERER: u32 = 0x1F01;
pub const VERSION: u32 = 0x1F02;
pub const SHADING_LANGUAGE_VERSION: u32 = 0x8B8C;
pub const DEPTH_FUNC: u32 = 0x0B74;
pub const DEPTH_WRITEMASK: u32 = 0x0B72;
pub const CULL_FACE_MODE: u32 = 0x0B45;
pub const ACTIVE_TEXTURE: u32 = 0x84E0;
pub const MAX_TEXTURE_SIZE: u32 = 0x0D33;
pub const MAX_VERTEX_ATTRIBS: u32 = 0x8869;
pub const MAX_TEXTURE_IMAGE_UNITS: u32 = 0x8872;
pub const MAX_UNIFORM_BUFFER_BINDINGS: u32 = 0x8A2F;
pub const VIEWPORT: u32 = 0x0BA2;
pub const SCISSOR_BOX: u32 = 0x0C10;

/// Integer rectangle: viewports, scissor boxes and `readPixels` areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// `texImage2D` arguments other than the pixel source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TexImage {
    pub target: u32,
    pub level: i32,
    pub internal_format: i32,
    pub width: i32,
    pub height: i32,
    pub border: i32,
    pub format: u32,
    pub ty: u32,
}

/// `texSubImage2D` arguments other than the pixel source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TexSubImage {
    pub target: u32,
    pub level: i32,
    pub x_offset: i32,
    pub y_offset: i32,
    pub width: i32,
    pub height: i32,
    pub format: u32,
    pub ty: u32,
}

/// `vertexAttribPointer` arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttrib {
    pub index: u32,
    pub size: i32,
    pub ty: u32,
    pub normalized: bool,
    pub stride: i32,
    pub offset: i32,
}

pub fn is_buffer_target(target: u32) -> bool {
    matches!(target, ARRAY_BUFFER | ELEMENT_ARRAY_BUFFER | UNIFORM_BUFFER)
}

pub fn is_framebuffer_target(target: u32) -> bool {
    matches!(target, FRAMEBUFFER | READ_FRAMEBUFFER | DRAW_FRAMEBUFFER)
}

pub fn is_texture_target(target: u32) -> bool {
    matches!(target, TEXTURE_2D | TEXTURE_CUBE_MAP)
}

pub fn is_capability(cap: u32) -> bool {
    matches!(
        cap,
        CULL_FACE | DEPTH_TEST | STENCIL_TEST | DITHER | BLEND | SCISSOR_TEST
    )
}

pub fn is_draw_mode(mode: u32) -> bool {
    mode <= TRIANGLE_FAN
}

pub fn is_blend_factor(factor: u32) -> bool {
    matches!(
        factor,
        ZERO | ONE
            | SRC_COLOR
            | ONE_MINUS_SRC_COLOR
            | SRC_ALPHA
            | ONE_MINUS_SRC_ALPHA
            | DST_ALPHA
            | ONE_MINUS_DST_ALPHA
            | DST_COLOR
            | ONE_MINUS_DST_COLOR
            | SRC_ALPHA_SATURATE
            | CONSTANT_COLOR
            | ONE_MINUS_CONSTANT_COLOR
            | CONSTANT_ALPHA
            | ONE_MINUS_CONSTANT_ALPHA
    )
}

pub fn is_blend_equation(mode: u32) -> bool {
    matches!(
        mode,
        FUNC_ADD | FUNC_SUBTRACT | FUNC_REVERSE_SUBTRACT | MIN | MAX
    )
}

pub fn is_compare_func(func: u32) -> bool {
    (NEVER..=ALWAYS).contains(&func)
}

pub fn is_stencil_op(op: u32) -> bool {
    matches!(
        op,
        ZERO | KEEP | REPLACE | INCR | DECR | INVERT | INCR_WRAP | DECR_WRAP
    )
}

pub fn is_face(mode: u32) -> bool {
    matches!(mode, FRONT | BACK | FRONT_AND_BACK)
}

pub fn is_index_type(ty: u32) -> bool {
    matches!(ty, UNSIGNED_BYTE | UNSIGNED_SHORT | UNSIGNED_INT)
}

/// Bytes per pixel for an unpacked `format`/`type` pair.
pub fn bytes_per_pixel(format: u32, ty: u32) -> Option<usize> {
    let channels = match format {
        RED | ALPHA | LUMINANCE | DEPTH_COMPONENT => 1,
        RG | LUMINANCE_ALPHA => 2,
        RGB => 3,
        RGBA => 4,
        _ => return None,
    };
    let size = match ty {
        UNSIGNED_BYTE | BYTE => 1,
        UNSIGNED_SHORT | SHORT | HALF_FLOAT => 2,
        UNSIGNED_INT | INT | FLOAT => 4,
        _ => return None,
    };
    Some(channels * size)
}

/// Byte length of a `width` x `height` image, or `None` on bad input.
pub fn image_size(width: i32, height: i32, format: u32, ty: u32) -> Option<usize> {
    if width < 0 || height < 0 {
        return None;
    }
    let bpp = bytes_per_pixel(format, ty)?;
    (width as usize).checked_mul(height as usize)?.checked_mul(bpp)
}

/// Uniform type and component count for a GLSL type name.
pub fn uniform_type(glsl: &str) -> Option<(u32, usize)> {
    Some(match glsl {
        "float" => (FLOAT, 1),
        "vec2" => (FLOAT_VEC2, 2),
        "vec3" => (FLOAT_VEC3, 3),
        "vec4" => (FLOAT_VEC4, 4),
        "int" => (INT, 1),
        "ivec2" => (INT_VEC2, 2),
        "ivec3" => (INT_VEC3, 3),
        "ivec4" => (INT_VEC4, 4),
        "bool" => (BOOL, 1),
        "mat2" => (FLOAT_MAT2, 4),
        "mat3" => (FLOAT_MAT3, 9),
        "mat4" => (FLOAT_MAT4, 16),
        "sampler2D" => (SAMPLER_2D, 1),
        "samplerCube" => (SAMPLER_CUBE, 1),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_per_pixel() {
        assert_eq!(bytes_per_pixel(RGBA, UNSIGNED_BYTE), Some(4));
        assert_eq!(bytes_per_pixel(RGB, UNSIGNED_BYTE), Some(3));
        assert_eq!(bytes_per_pixel(RGBA, FLOAT), Some(16));
        assert_eq!(bytes_per_pixel(0x1234, UNSIGNED_BYTE), None);
    }

    #[test]
    fn test_image_size() {
        assert_eq!(image_size(2, 3, RGBA, UNSIGNED_BYTE), Some(24));
        assert_eq!(image_size(-1, 3, RGBA, UNSIGNED_BYTE), None);
        assert_eq!(image_size(0, 0, RGBA, UNSIGNED_BYTE), Some(0));
    }

    #[test]
    fn test_validators() {
        assert!(is_blend_factor(ONE_MINUS_SRC_ALPHA));
        assert!(!is_blend_factor(BLEND));
        assert!(is_compare_func(LEQUAL));
        assert!(!is_compare_func(KEEP));
        assert!(is_draw_mode(TRIANGLES));
        assert!(!is_draw_mode(7));
        assert!(is_capability(SCISSOR_TEST));
        assert!(!is_capability(TEXTURE_2D));
    }

    #[test]
    fn test_uniform_type() {
        assert_eq!(uniform_type("mat4"), Some((FLOAT_MAT4, 16)));
        assert_eq!(uniform_type("sampler2D"), Some((SAMPLER_2D, 1)));
        assert_eq!(uniform_type("dvec2"), None);
    }
}
