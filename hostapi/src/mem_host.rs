//! In-memory browser host for testing.
//!
//! `MemHost` implements [`DomApi`] and [`GraphicsApi`] over a small element
//! tree and one [`GlContext`] per canvas. Throws are limited to the cases a
//! browser throws for: bad names, tree cycles, fullscreen without
//! permission, short pixel buffers and calls on a lost context.

use std::collections::BTreeMap;

use hostbridge_primitives::ClosureId;

use crate::error::HostException;
use crate::event::{DomRect, EventTarget};
use crate::gl::{PixelRect, TexImage, TexSubImage, VertexAttrib};
use crate::mem_gl::GlContext;
use crate::traits::{DomApi, GraphicsApi};
use crate::types::SurfaceConfig;
use crate::value::{ActiveInfo, ContextId, ElementId, GlObject, GlObjectKind, HostValue, UniformLocation};

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    attributes: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    canvas: Option<Canvas>,
    origin: (f64, f64),
}

#[derive(Debug, Clone)]
struct Canvas {
    width: u32,
    height: u32,
    context: Option<(String, ContextId)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Listener {
    target: EventTarget,
    kind: String,
    callback: ClosureId,
}

/// In-memory host backed by plain collections.
#[derive(Debug, Clone)]
pub struct MemHost {
    config: SurfaceConfig,
    elements: Vec<Element>,
    body: ElementId,
    fullscreen: Option<ElementId>,
    clock: f64,
    listeners: Vec<Listener>,
    frames: Vec<(i32, ClosureId)>,
    next_frame: i32,
    contexts: Vec<GlContext>,
}

impl Default for MemHost {
    fn default() -> Self {
        Self::new(SurfaceConfig::default())
    }
}

impl MemHost {
    /// Create a host whose document holds an empty `<body>`.
    pub fn new(config: SurfaceConfig) -> Self {
        let body = Element {
            tag: "body".to_string(),
            attributes: BTreeMap::new(),
            style: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
            canvas: None,
            origin: (0.0, 0.0),
        };
        Self {
            config,
            elements: vec![body],
            body: ElementId(0),
            fullscreen: None,
            clock: 0.0,
            listeners: Vec::new(),
            frames: Vec::new(),
            next_frame: 1,
            contexts: Vec::new(),
        }
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn body(&self) -> ElementId {
        self.body
    }

    /// Lower-case tag name.
    pub fn tag(&self, element: ElementId) -> Option<&str> {
        self.element(element).map(|e| e.tag.as_str())
    }

    pub fn children(&self, element: ElementId) -> &[ElementId] {
        self.element(element).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    pub fn style_property(&self, element: ElementId, name: &str) -> Option<&str> {
        self.element(element)?.style.get(name).map(String::as_str)
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Place `element` at a viewport position for `getBoundingClientRect`.
    pub fn set_layout_origin(&mut self, element: ElementId, left: f64, top: f64) {
        if let Some(e) = self.element_mut(element) {
            e.origin = (left, top);
        }
    }

    /// Advance `performance.now()`.
    pub fn advance_clock(&mut self, ms: f64) {
        self.clock += ms;
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn context(&self, ctx: ContextId) -> Option<&GlContext> {
        self.contexts.get(ctx.0 as usize)
    }

    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    /// Simulate `WEBGL_lose_context.loseContext()`.
    pub fn lose_context(&mut self, ctx: ContextId) {
        if let Some(c) = self.contexts.get_mut(ctx.0 as usize) {
            tracing::debug!(context = ctx.0, "context lost");
            c.lose();
        }
    }

    fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0 as usize)
    }

    fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id.0 as usize)
    }

    fn is_ancestor(&self, ancestor: ElementId, mut node: ElementId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.element(node).and_then(|e| e.parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    fn style_px(&self, element: ElementId, name: &str) -> Option<i32> {
        let value = self.style_property(element, name)?;
        let px = value.trim().strip_suffix("px")?.trim().parse::<f64>().ok()?;
        Some(px.round() as i32)
    }

    /// Live context for an infallible call. A lost context ignores calls.
    fn live(&mut self, ctx: ContextId) -> Option<&mut GlContext> {
        self.contexts.get_mut(ctx.0 as usize).filter(|c| !c.is_lost())
    }

    /// Live context for a throwing call.
    fn live_or_throw(&mut self, ctx: ContextId) -> Result<&mut GlContext, HostException> {
        match self.contexts.get_mut(ctx.0 as usize) {
            Some(c) if !c.is_lost() => Ok(c),
            Some(_) => Err(HostException::invalid_state("WebGL context is lost")),
            None => Err(HostException::invalid_state("unknown WebGL context")),
        }
    }
}

fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':')
}

impl DomApi for MemHost {
    fn document_body(&self) -> Option<ElementId> {
        Some(self.body)
    }

    fn get_element_by_id(&self, id: &str) -> Option<ElementId> {
        self.elements
            .iter()
            .position(|e| e.attributes.get("id").is_some_and(|v| v == id))
            .map(|i| ElementId(i as u32))
    }

    fn create_element(&mut self, tag: &str) -> Result<ElementId, HostException> {
        if !valid_name(tag) {
            return Err(HostException::invalid_character(format!(
                "'{}' is not a valid tag name",
                tag
            )));
        }
        let tag = tag.to_ascii_lowercase();
        let canvas = (tag == "canvas").then(|| Canvas {
            width: self.config.canvas_width,
            height: self.config.canvas_height,
            context: None,
        });
        let id = ElementId(self.elements.len() as u32);
        self.elements.push(Element {
            tag,
            attributes: BTreeMap::new(),
            style: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
            canvas,
            origin: (0.0, 0.0),
        });
        Ok(id)
    }

    fn append_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), HostException> {
        if self.element(parent).is_none() || self.element(child).is_none() {
            return Err(HostException::hierarchy_request("node is not in this document"));
        }
        if self.is_ancestor(child, parent) {
            return Err(HostException::hierarchy_request(
                "the new child is an ancestor of the parent",
            ));
        }
        if let Some(old) = self.element(child).and_then(|e| e.parent) {
            if let Some(p) = self.element_mut(old) {
                p.children.retain(|c| *c != child);
            }
        }
        if let Some(p) = self.element_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.element_mut(child) {
            c.parent = Some(parent);
        }
        Ok(())
    }

    fn parent_element(&self, element: ElementId) -> Option<ElementId> {
        self.element(element)?.parent
    }

    /// `width` and `height` on a canvas are reflected into its drawing
    /// buffer size.
    fn set_attribute(&mut self, element: ElementId, name: &str, value: &str) -> Result<(), HostException> {
        if !valid_name(name) {
            return Err(HostException::invalid_character(format!(
                "'{}' is not a valid attribute name",
                name
            )));
        }
        let name = name.to_ascii_lowercase();
        let Some(e) = self.element_mut(element) else { return Ok(()) };
        if let Some(canvas) = e.canvas.as_mut() {
            match (name.as_str(), value.trim().parse::<u32>()) {
                ("width", Ok(w)) => canvas.width = w,
                ("height", Ok(h)) => canvas.height = h,
                _ => {}
            }
        }
        e.attributes.insert(name, value.to_string());
        Ok(())
    }

    fn get_attribute(&self, element: ElementId, name: &str) -> Option<String> {
        self.element(element)?
            .attributes
            .get(&name.to_ascii_lowercase())
            .cloned()
    }

    fn set_element_id(&mut self, element: ElementId, id: &str) {
        if let Some(e) = self.element_mut(element) {
            e.attributes.insert("id".to_string(), id.to_string());
        }
    }

    /// An empty value removes the property.
    fn set_style_property(&mut self, element: ElementId, name: &str, value: &str) -> Result<(), HostException> {
        if let Some(e) = self.element_mut(element) {
            if value.is_empty() {
                e.style.remove(name);
            } else {
                e.style.insert(name.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    fn client_width(&self, element: ElementId) -> i32 {
        if let Some(px) = self.style_px(element, "width") {
            return px;
        }
        match self.element(element) {
            Some(_) if element == self.body => self.config.viewport_width as i32,
            Some(Element {
                canvas: Some(c), ..
            }) => c.width as i32,
            _ => 0,
        }
    }

    fn client_height(&self, element: ElementId) -> i32 {
        if let Some(px) = self.style_px(element, "height") {
            return px;
        }
        match self.element(element) {
            Some(_) if element == self.body => self.config.viewport_height as i32,
            Some(Element {
                canvas: Some(c), ..
            }) => c.height as i32,
            _ => 0,
        }
    }

    fn bounding_client_rect(&self, element: ElementId) -> DomRect {
        let (left, top) = self.element(element).map_or((0.0, 0.0), |e| e.origin);
        DomRect {
            left,
            top,
            width: self.client_width(element) as f64,
            height: self.client_height(element) as f64,
        }
    }

    fn is_canvas(&self, element: ElementId) -> bool {
        self.element(element).is_some_and(|e| e.canvas.is_some())
    }

    fn canvas_width(&self, canvas: ElementId) -> u32 {
        self.element(canvas)
            .and_then(|e| e.canvas.as_ref())
            .map_or(0, |c| c.width)
    }

    fn canvas_height(&self, canvas: ElementId) -> u32 {
        self.element(canvas)
            .and_then(|e| e.canvas.as_ref())
            .map_or(0, |c| c.height)
    }

    fn set_canvas_width(&mut self, canvas: ElementId, width: u32) {
        if let Some(c) = self.element_mut(canvas).and_then(|e| e.canvas.as_mut()) {
            c.width = width;
        }
    }

    fn set_canvas_height(&mut self, canvas: ElementId, height: u32) {
        if let Some(c) = self.element_mut(canvas).and_then(|e| e.canvas.as_mut()) {
            c.height = height;
        }
    }

    /// Supports `webgl2`. Asking again for the same kind returns the same
    /// context.
    fn get_context(&mut self, canvas: ElementId, kind: &str) -> Result<Option<ContextId>, HostException> {
        let next = ContextId(self.contexts.len() as u32);
        let Some(c) = self.element_mut(canvas).and_then(|e| e.canvas.as_mut()) else {
            return Err(HostException::type_error("getContext is not a function"));
        };
        match &c.context {
            Some((existing, ctx)) if existing == kind => return Ok(Some(*ctx)),
            Some(_) => return Ok(None),
            None => {}
        }
        if kind != "webgl2" {
            return Ok(None);
        }
        c.context = Some((kind.to_string(), next));
        let (width, height) = (c.width, c.height);
        self.contexts.push(GlContext::new(next, canvas, width, height));
        tracing::debug!(context = next.0, canvas = canvas.0, "webgl2 context created");
        Ok(Some(next))
    }

    fn fullscreen_element(&self) -> Option<ElementId> {
        self.fullscreen
    }

    fn request_fullscreen(&mut self, element: ElementId) -> Result<(), HostException> {
        if !self.config.allow_fullscreen {
            return Err(HostException::not_allowed("fullscreen is not allowed"));
        }
        self.fullscreen = Some(element);
        Ok(())
    }

    fn exit_fullscreen(&mut self) {
        self.fullscreen = None;
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.config.device_pixel_ratio
    }

    fn now(&self) -> f64 {
        self.clock
    }

    fn add_event_listener(
        &mut self,
        target: EventTarget,
        kind: &str,
        callback: ClosureId,
    ) -> Result<(), HostException> {
        let listener = Listener {
            target,
            kind: kind.to_string(),
            callback,
        };
        if !self.listeners.contains(&listener) {
            self.listeners.push(listener);
        }
        Ok(())
    }

    fn event_listeners(&self, target: EventTarget, kind: &str) -> Vec<ClosureId> {
        self.listeners
            .iter()
            .filter(|l| l.target == target && l.kind == kind)
            .map(|l| l.callback)
            .collect()
    }

    fn request_animation_frame(&mut self, callback: ClosureId) -> Result<i32, HostException> {
        let request = self.next_frame;
        self.next_frame += 1;
        self.frames.push((request, callback));
        Ok(request)
    }

    fn cancel_animation_frame(&mut self, request: i32) -> Result<(), HostException> {
        self.frames.retain(|(id, _)| *id != request);
        Ok(())
    }

    fn take_animation_frames(&mut self) -> Vec<ClosureId> {
        self.frames.drain(..).map(|(_, cb)| cb).collect()
    }
}

impl GraphicsApi for MemHost {
    fn create_object(&mut self, ctx: ContextId, kind: GlObjectKind) -> Option<GlObject> {
        self.live(ctx)?.create_object(kind)
    }

    fn create_shader(&mut self, ctx: ContextId, shader_type: u32) -> Option<GlObject> {
        self.live(ctx)?.create_shader(shader_type)
    }

    fn delete_object(&mut self, ctx: ContextId, object: Option<GlObject>) {
        if let Some(c) = self.live(ctx) {
            c.delete_object(object);
        }
    }

    fn bind_buffer(&mut self, ctx: ContextId, target: u32, buffer: Option<GlObject>) {
        if let Some(c) = self.live(ctx) {
            c.bind_buffer(target, buffer);
        }
    }

    fn bind_buffer_base(&mut self, ctx: ContextId, target: u32, index: u32, buffer: Option<GlObject>) {
        if let Some(c) = self.live(ctx) {
            c.bind_buffer_base(target, index, buffer);
        }
    }

    fn bind_texture(&mut self, ctx: ContextId, target: u32, texture: Option<GlObject>) {
        if let Some(c) = self.live(ctx) {
            c.bind_texture(target, texture);
        }
    }

    fn bind_framebuffer(&mut self, ctx: ContextId, target: u32, framebuffer: Option<GlObject>) {
        if let Some(c) = self.live(ctx) {
            c.bind_framebuffer(target, framebuffer);
        }
    }

    fn bind_vertex_array(&mut self, ctx: ContextId, vao: Option<GlObject>) {
        if let Some(c) = self.live(ctx) {
            c.bind_vertex_array(vao);
        }
    }

    fn buffer_data(&mut self, ctx: ContextId, target: u32, data: &[u8], usage: u32) {
        if let Some(c) = self.live(ctx) {
            c.buffer_data(target, data, usage);
        }
    }

    fn buffer_sub_data(&mut self, ctx: ContextId, target: u32, offset: i32, data: &[u8]) {
        if let Some(c) = self.live(ctx) {
            c.buffer_sub_data(target, offset, data);
        }
    }

    fn tex_image_2d(&mut self, ctx: ContextId, desc: TexImage, pixels: Option<&[u8]>) -> Result<(), HostException> {
        let max_texture_size = self.config.max_texture_size;
        self.live_or_throw(ctx)?.tex_image_2d(desc, pixels, max_texture_size)
    }

    fn tex_sub_image_2d(
        &mut self,
        ctx: ContextId,
        desc: TexSubImage,
        pixels: Option<&[u8]>,
    ) -> Result<(), HostException> {
        self.live_or_throw(ctx)?.tex_sub_image_2d(desc, pixels)
    }

    fn read_pixels(
        &mut self,
        ctx: ContextId,
        area: PixelRect,
        format: u32,
        ty: u32,
        out: &mut [u8],
    ) -> Result<(), HostException> {
        self.live_or_throw(ctx)?.read_pixels(area, format, ty, out)
    }

    fn tex_parameteri(&mut self, ctx: ContextId, target: u32, pname: u32, param: i32) {
        if let Some(c) = self.live(ctx) {
            c.tex_parameteri(target, pname, param);
        }
    }

    fn pixel_storei(&mut self, ctx: ContextId, pname: u32, param: i32) {
        if let Some(c) = self.live(ctx) {
            c.pixel_storei(pname, param);
        }
    }

    fn active_texture(&mut self, ctx: ContextId, unit: u32) {
        if let Some(c) = self.live(ctx) {
            c.active_texture(unit);
        }
    }

    fn generate_mipmap(&mut self, ctx: ContextId, target: u32) {
        if let Some(c) = self.live(ctx) {
            c.generate_mipmap(target);
        }
    }

    fn shader_source(&mut self, ctx: ContextId, shader: GlObject, source: &str) {
        if let Some(c) = self.live(ctx) {
            c.shader_source(shader, source);
        }
    }

    fn compile_shader(&mut self, ctx: ContextId, shader: GlObject) {
        if let Some(c) = self.live(ctx) {
            c.compile_shader(shader);
        }
    }

    fn shader_parameter(&mut self, ctx: ContextId, shader: GlObject, pname: u32) -> HostValue {
        self.live(ctx)
            .map_or(HostValue::Null, |c| c.shader_parameter(shader, pname))
    }

    fn shader_info_log(&self, ctx: ContextId, shader: GlObject) -> Option<String> {
        self.context(ctx)?.shader_info_log(shader)
    }

    fn attach_shader(&mut self, ctx: ContextId, program: GlObject, shader: GlObject) {
        if let Some(c) = self.live(ctx) {
            c.attach_shader(program, shader);
        }
    }

    fn link_program(&mut self, ctx: ContextId, program: GlObject) {
        if let Some(c) = self.live(ctx) {
            c.link_program(program);
        }
    }

    fn program_parameter(&mut self, ctx: ContextId, program: GlObject, pname: u32) -> HostValue {
        self.live(ctx)
            .map_or(HostValue::Null, |c| c.program_parameter(program, pname))
    }

    fn program_info_log(&self, ctx: ContextId, program: GlObject) -> Option<String> {
        self.context(ctx)?.program_info_log(program)
    }

    fn use_program(&mut self, ctx: ContextId, program: Option<GlObject>) {
        if let Some(c) = self.live(ctx) {
            c.use_program(program);
        }
    }

    fn uniform_location(&mut self, ctx: ContextId, program: GlObject, name: &str) -> Option<UniformLocation> {
        self.live(ctx)?.uniform_location(program, name)
    }

    fn active_uniform(&mut self, ctx: ContextId, program: GlObject, index: u32) -> Option<ActiveInfo> {
        self.live(ctx)?.active_uniform(program, index)
    }

    fn uniform_block_index(&mut self, ctx: ContextId, program: GlObject, name: &str) -> u32 {
        self.live(ctx)
            .map_or(crate::gl::INVALID_INDEX, |c| c.uniform_block_index(program, name))
    }

    fn uniform_block_binding(&mut self, ctx: ContextId, program: GlObject, index: u32, binding: u32) {
        if let Some(c) = self.live(ctx) {
            c.uniform_block_binding(program, index, binding);
        }
    }

    fn uniform_f32(&mut self, ctx: ContextId, location: Option<UniformLocation>, values: &[f32]) {
        if let Some(c) = self.live(ctx) {
            c.uniform_f32(location, values);
        }
    }

    fn uniform_i32(&mut self, ctx: ContextId, location: Option<UniformLocation>, value: i32) {
        if let Some(c) = self.live(ctx) {
            c.uniform_i32(location, value);
        }
    }

    fn uniform_matrix4fv(
        &mut self,
        ctx: ContextId,
        location: Option<UniformLocation>,
        transpose: bool,
        values: &[f32],
    ) {
        if let Some(c) = self.live(ctx) {
            c.uniform_matrix4fv(location, transpose, values);
        }
    }

    fn enable_vertex_attrib_array(&mut self, ctx: ContextId, index: u32) {
        if let Some(c) = self.live(ctx) {
            c.enable_vertex_attrib_array(index);
        }
    }

    fn vertex_attrib_pointer(&mut self, ctx: ContextId, attrib: VertexAttrib) {
        if let Some(c) = self.live(ctx) {
            c.vertex_attrib_pointer(attrib);
        }
    }

    fn set_capability(&mut self, ctx: ContextId, cap: u32, enabled: bool) {
        if let Some(c) = self.live(ctx) {
            c.set_capability(cap, enabled);
        }
    }

    fn blend_func_separate(&mut self, ctx: ContextId, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        if let Some(c) = self.live(ctx) {
            c.blend_func_separate(src_rgb, dst_rgb, src_alpha, dst_alpha);
        }
    }

    fn blend_equation_separate(&mut self, ctx: ContextId, mode_rgb: u32, mode_alpha: u32) {
        if let Some(c) = self.live(ctx) {
            c.blend_equation_separate(mode_rgb, mode_alpha);
        }
    }

    fn depth_func(&mut self, ctx: ContextId, func: u32) {
        if let Some(c) = self.live(ctx) {
            c.depth_func(func);
        }
    }

    fn depth_mask(&mut self, ctx: ContextId, flag: bool) {
        if let Some(c) = self.live(ctx) {
            c.depth_mask(flag);
        }
    }

    fn color_mask(&mut self, ctx: ContextId, mask: [bool; 4]) {
        if let Some(c) = self.live(ctx) {
            c.set_color_mask(mask);
        }
    }

    fn stencil_func(&mut self, ctx: ContextId, func: u32, reference: i32, mask: u32) {
        if let Some(c) = self.live(ctx) {
            c.stencil_func(func, reference, mask);
        }
    }

    fn stencil_op(&mut self, ctx: ContextId, fail: u32, zfail: u32, zpass: u32) {
        if let Some(c) = self.live(ctx) {
            c.stencil_op(fail, zfail, zpass);
        }
    }

    fn stencil_mask(&mut self, ctx: ContextId, mask: u32) {
        if let Some(c) = self.live(ctx) {
            c.stencil_mask(mask);
        }
    }

    fn cull_face(&mut self, ctx: ContextId, mode: u32) {
        if let Some(c) = self.live(ctx) {
            c.set_cull_face(mode);
        }
    }

    fn viewport(&mut self, ctx: ContextId, rect: PixelRect) {
        if let Some(c) = self.live(ctx) {
            c.set_viewport(rect);
        }
    }

    fn scissor(&mut self, ctx: ContextId, rect: PixelRect) {
        if let Some(c) = self.live(ctx) {
            c.set_scissor(rect);
        }
    }

    fn clear(&mut self, ctx: ContextId, mask: u32) {
        if let Some(c) = self.live(ctx) {
            c.clear(mask);
        }
    }

    fn clear_color(&mut self, ctx: ContextId, rgba: [f32; 4]) {
        if let Some(c) = self.live(ctx) {
            c.set_clear_color(rgba);
        }
    }

    fn clear_depth(&mut self, ctx: ContextId, depth: f32) {
        if let Some(c) = self.live(ctx) {
            c.set_clear_depth(depth);
        }
    }

    fn clear_stencil(&mut self, ctx: ContextId, stencil: i32) {
        if let Some(c) = self.live(ctx) {
            c.set_clear_stencil(stencil);
        }
    }

    fn draw_arrays(&mut self, ctx: ContextId, mode: u32, first: i32, count: i32) {
        if let Some(c) = self.live(ctx) {
            c.draw_arrays(mode, first, count);
        }
    }

    fn draw_elements(&mut self, ctx: ContextId, mode: u32, count: i32, ty: u32, offset: i32) {
        if let Some(c) = self.live(ctx) {
            c.draw_elements(mode, count, ty, offset);
        }
    }

    fn framebuffer_texture_2d(
        &mut self,
        ctx: ContextId,
        target: u32,
        attachment: u32,
        textarget: u32,
        texture: Option<GlObject>,
        level: i32,
    ) {
        if let Some(c) = self.live(ctx) {
            c.framebuffer_texture_2d(target, attachment, textarget, texture, level);
        }
    }

    fn check_framebuffer_status(&mut self, ctx: ContextId, target: u32) -> u32 {
        self.live(ctx)
            .map_or(0, |c| c.check_framebuffer_status(target))
    }

    /// Names match case-insensitively; the configured spelling is returned.
    fn get_extension(&mut self, ctx: ContextId, name: &str) -> Result<Option<String>, HostException> {
        let found = self
            .config
            .extensions
            .iter()
            .find(|e| e.eq_ignore_ascii_case(name))
            .cloned();
        let c = self.live_or_throw(ctx)?;
        if let Some(ext) = &found {
            c.enable_extension(ext);
        }
        Ok(found)
    }

    fn get_parameter(&mut self, ctx: ContextId, pname: u32) -> Result<HostValue, HostException> {
        let max_texture_size = self.config.max_texture_size;
        Ok(self.live_or_throw(ctx)?.get_parameter(pname, max_texture_size))
    }

    fn get_error(&mut self, ctx: ContextId) -> u32 {
        self.contexts
            .get_mut(ctx.0 as usize)
            .map_or(crate::gl::NO_ERROR, GlContext::get_error)
    }
}
