//! Host API traits: the browser-side operations the bindings forward to.
//!
//! The runtime resolves handles, decodes strings and checks pointers before
//! calling in, so these traits work with host types and slices, never raw
//! guest pointers.
//!
//! Operations that can throw in a browser return
//! `Result<_, HostException>`; the runtime parks the exception for the
//! guest to collect. Everything else is infallible by signature. WebGL
//! reports misuse of those through [`GraphicsApi::get_error`] instead.

use hostbridge_primitives::ClosureId;

use crate::error::HostException;
use crate::event::{DomRect, EventTarget};
use crate::gl::{PixelRect, TexImage, TexSubImage, VertexAttrib};
use crate::value::{ActiveInfo, ContextId, ElementId, GlObject, GlObjectKind, HostValue, UniformLocation};

/// Document, window and event-loop operations.
pub trait DomApi {
    // ── Document ──

    fn document_body(&self) -> Option<ElementId>;

    fn get_element_by_id(&self, id: &str) -> Option<ElementId>;

    /// Create a detached element. Throws `InvalidCharacterError` for an
    /// invalid tag name.
    fn create_element(&mut self, tag: &str) -> Result<ElementId, HostException>;

    /// Move `child` under `parent`. Throws `HierarchyRequestError` if that
    /// would create a cycle.
    fn append_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), HostException>;

    fn parent_element(&self, element: ElementId) -> Option<ElementId>;

    fn set_attribute(&mut self, element: ElementId, name: &str, value: &str) -> Result<(), HostException>;

    fn get_attribute(&self, element: ElementId, name: &str) -> Option<String>;

    fn set_element_id(&mut self, element: ElementId, id: &str);

    fn set_style_property(&mut self, element: ElementId, name: &str, value: &str) -> Result<(), HostException>;

    // ── Layout ──

    fn client_width(&self, element: ElementId) -> i32;

    fn client_height(&self, element: ElementId) -> i32;

    fn bounding_client_rect(&self, element: ElementId) -> DomRect;

    // ── Canvas ──

    /// `element instanceof HTMLCanvasElement`.
    fn is_canvas(&self, element: ElementId) -> bool;

    fn canvas_width(&self, canvas: ElementId) -> u32;

    fn canvas_height(&self, canvas: ElementId) -> u32;

    fn set_canvas_width(&mut self, canvas: ElementId, width: u32);

    fn set_canvas_height(&mut self, canvas: ElementId, height: u32);

    /// `canvas.getContext(kind)`. `Ok(None)` when the kind is unsupported or
    /// the canvas already has a context of another kind.
    fn get_context(&mut self, canvas: ElementId, kind: &str) -> Result<Option<ContextId>, HostException>;

    // ── Fullscreen ──

    fn fullscreen_element(&self) -> Option<ElementId>;

    fn request_fullscreen(&mut self, element: ElementId) -> Result<(), HostException>;

    fn exit_fullscreen(&mut self);

    // ── Window ──

    fn device_pixel_ratio(&self) -> f64;

    /// `performance.now()` in milliseconds.
    fn now(&self) -> f64;

    // ── Event loop ──

    /// Attach `callback` to `kind` events on `target`. Adding the same
    /// triple twice has no effect.
    fn add_event_listener(
        &mut self,
        target: EventTarget,
        kind: &str,
        callback: ClosureId,
    ) -> Result<(), HostException>;

    /// Listeners for `kind` on `target`, in registration order.
    fn event_listeners(&self, target: EventTarget, kind: &str) -> Vec<ClosureId>;

    /// Queue `callback` for the next animation frame and return its request id.
    fn request_animation_frame(&mut self, callback: ClosureId) -> Result<i32, HostException>;

    fn cancel_animation_frame(&mut self, request: i32) -> Result<(), HostException>;

    /// Drain callbacks queued for the current frame.
    fn take_animation_frames(&mut self) -> Vec<ClosureId>;
}

/// WebGL 2 operations, addressed by context.
///
/// Queries take `&mut self` because an invalid query records a GL error.
pub trait GraphicsApi {
    // ── Objects ──

    /// Create a buffer, texture, framebuffer, program or vertex array.
    /// Shaders go through [`create_shader`](GraphicsApi::create_shader).
    fn create_object(&mut self, ctx: ContextId, kind: GlObjectKind) -> Option<GlObject>;

    fn create_shader(&mut self, ctx: ContextId, shader_type: u32) -> Option<GlObject>;

    fn delete_object(&mut self, ctx: ContextId, object: Option<GlObject>);

    // ── Binding ──

    fn bind_buffer(&mut self, ctx: ContextId, target: u32, buffer: Option<GlObject>);

    fn bind_buffer_base(&mut self, ctx: ContextId, target: u32, index: u32, buffer: Option<GlObject>);

    fn bind_texture(&mut self, ctx: ContextId, target: u32, texture: Option<GlObject>);

    fn bind_framebuffer(&mut self, ctx: ContextId, target: u32, framebuffer: Option<GlObject>);

    fn bind_vertex_array(&mut self, ctx: ContextId, vao: Option<GlObject>);

    // ── Buffer and texture data ──

    fn buffer_data(&mut self, ctx: ContextId, target: u32, data: &[u8], usage: u32);

    fn buffer_sub_data(&mut self, ctx: ContextId, target: u32, offset: i32, data: &[u8]);

    /// Throws `TypeError` if `pixels` is shorter than the image.
    fn tex_image_2d(&mut self, ctx: ContextId, desc: TexImage, pixels: Option<&[u8]>) -> Result<(), HostException>;

    /// Throws `TypeError` if `pixels` is missing or too short.
    fn tex_sub_image_2d(
        &mut self,
        ctx: ContextId,
        desc: TexSubImage,
        pixels: Option<&[u8]>,
    ) -> Result<(), HostException>;

    /// Throws `TypeError` if `out` is too short for the area.
    fn read_pixels(
        &mut self,
        ctx: ContextId,
        area: PixelRect,
        format: u32,
        ty: u32,
        out: &mut [u8],
    ) -> Result<(), HostException>;

    fn tex_parameteri(&mut self, ctx: ContextId, target: u32, pname: u32, param: i32);

    fn pixel_storei(&mut self, ctx: ContextId, pname: u32, param: i32);

    fn active_texture(&mut self, ctx: ContextId, unit: u32);

    fn generate_mipmap(&mut self, ctx: ContextId, target: u32);

    // ── Shaders and programs ──

    fn shader_source(&mut self, ctx: ContextId, shader: GlObject, source: &str);

    fn compile_shader(&mut self, ctx: ContextId, shader: GlObject);

    fn shader_parameter(&mut self, ctx: ContextId, shader: GlObject, pname: u32) -> HostValue;

    fn shader_info_log(&self, ctx: ContextId, shader: GlObject) -> Option<String>;

    fn attach_shader(&mut self, ctx: ContextId, program: GlObject, shader: GlObject);

    fn link_program(&mut self, ctx: ContextId, program: GlObject);

    fn program_parameter(&mut self, ctx: ContextId, program: GlObject, pname: u32) -> HostValue;

    fn program_info_log(&self, ctx: ContextId, program: GlObject) -> Option<String>;

    fn use_program(&mut self, ctx: ContextId, program: Option<GlObject>);

    // ── Uniforms and attributes ──

    fn uniform_location(&mut self, ctx: ContextId, program: GlObject, name: &str) -> Option<UniformLocation>;

    fn active_uniform(&mut self, ctx: ContextId, program: GlObject, index: u32) -> Option<ActiveInfo>;

    fn uniform_block_index(&mut self, ctx: ContextId, program: GlObject, name: &str) -> u32;

    fn uniform_block_binding(&mut self, ctx: ContextId, program: GlObject, index: u32, binding: u32);

    /// `uniform1f` .. `uniform4f`, by slice length.
    fn uniform_f32(&mut self, ctx: ContextId, location: Option<UniformLocation>, values: &[f32]);

    fn uniform_i32(&mut self, ctx: ContextId, location: Option<UniformLocation>, value: i32);

    fn uniform_matrix4fv(
        &mut self,
        ctx: ContextId,
        location: Option<UniformLocation>,
        transpose: bool,
        values: &[f32],
    );

    fn enable_vertex_attrib_array(&mut self, ctx: ContextId, index: u32);

    fn vertex_attrib_pointer(&mut self, ctx: ContextId, attrib: VertexAttrib);

    // ── Fixed-function state ──

    /// `enable` / `disable`.
    fn set_capability(&mut self, ctx: ContextId, cap: u32, enabled: bool);

    fn blend_func_separate(&mut self, ctx: ContextId, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32);

    fn blend_equation_separate(&mut self, ctx: ContextId, mode_rgb: u32, mode_alpha: u32);

    fn depth_func(&mut self, ctx: ContextId, func: u32);

    fn depth_mask(&mut self, ctx: ContextId, flag: bool);

    fn color_mask(&mut self, ctx: ContextId, mask: [bool; 4]);

    fn stencil_func(&mut self, ctx: ContextId, func: u32, reference: i32, mask: u32);

    fn stencil_op(&mut self, ctx: ContextId, fail: u32, zfail: u32, zpass: u32);

    fn stencil_mask(&mut self, ctx: ContextId, mask: u32);

    fn cull_face(&mut self, ctx: ContextId, mode: u32);

    fn viewport(&mut self, ctx: ContextId, rect: PixelRect);

    fn scissor(&mut self, ctx: ContextId, rect: PixelRect);

    // ── Drawing ──

    fn clear(&mut self, ctx: ContextId, mask: u32);

    fn clear_color(&mut self, ctx: ContextId, rgba: [f32; 4]);

    fn clear_depth(&mut self, ctx: ContextId, depth: f32);

    fn clear_stencil(&mut self, ctx: ContextId, stencil: i32);

    fn draw_arrays(&mut self, ctx: ContextId, mode: u32, first: i32, count: i32);

    fn draw_elements(&mut self, ctx: ContextId, mode: u32, count: i32, ty: u32, offset: i32);

    // ── Framebuffers ──

    fn framebuffer_texture_2d(
        &mut self,
        ctx: ContextId,
        target: u32,
        attachment: u32,
        textarget: u32,
        texture: Option<GlObject>,
        level: i32,
    );

    fn check_framebuffer_status(&mut self, ctx: ContextId, target: u32) -> u32;

    // ── Queries ──

    /// Enable an extension. `Ok(None)` if it is not supported.
    fn get_extension(&mut self, ctx: ContextId, name: &str) -> Result<Option<String>, HostException>;

    fn get_parameter(&mut self, ctx: ContextId, pname: u32) -> Result<HostValue, HostException>;

    /// Return and clear the oldest recorded error.
    fn get_error(&mut self, ctx: ContextId) -> u32;
}

/// Everything a bridge instance needs from its host.
pub trait HostApi: DomApi + GraphicsApi {}

impl<T: DomApi + GraphicsApi> HostApi for T {}
