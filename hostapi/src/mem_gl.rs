//! In-memory WebGL 2 context used by [`MemHost`](crate::MemHost).
//!
//! Tracks objects, bindings and fixed-function state, and records draw
//! calls instead of rasterizing. Misuse is reported through the error
//! queue the way a real context does: the call is ignored and the next
//! `getError` returns the code.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::HostException;
use crate::gl::{self, PixelRect, TexImage, TexSubImage, VertexAttrib};
use crate::value::{ActiveInfo, ContextId, ElementId, GlObject, GlObjectKind, HostObject, HostValue, UniformLocation};

const MAX_VERTEX_ATTRIBS: u32 = 16;
const MAX_TEXTURE_UNITS: u32 = 16;

/// One mip level of a 2D texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureLevel {
    pub width: i32,
    pub height: i32,
    pub internal_format: i32,
    pub format: u32,
    pub ty: u32,
    pub data: Vec<u8>,
}

/// A recorded `drawArrays` / `drawElements`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub mode: u32,
    /// First vertex, or byte offset into the element buffer.
    pub first: i32,
    pub count: i32,
    /// Index type for `drawElements`.
    pub index_type: Option<u32>,
    pub program: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendState {
    pub src_rgb: u32,
    pub dst_rgb: u32,
    pub src_alpha: u32,
    pub dst_alpha: u32,
    pub equation_rgb: u32,
    pub equation_alpha: u32,
}

impl Default for BlendState {
    fn default() -> Self {
        Self {
            src_rgb: gl::ONE,
            dst_rgb: gl::ZERO,
            src_alpha: gl::ONE,
            dst_alpha: gl::ZERO,
            equation_rgb: gl::FUNC_ADD,
            equation_alpha: gl::FUNC_ADD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilState {
    pub func: u32,
    pub reference: i32,
    pub value_mask: u32,
    pub fail: u32,
    pub zfail: u32,
    pub zpass: u32,
    pub write_mask: u32,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            func: gl::ALWAYS,
            reference: 0,
            value_mask: u32::MAX,
            fail: gl::KEEP,
            zfail: gl::KEEP,
            zpass: gl::KEEP,
            write_mask: u32::MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttribState {
    pub enabled: bool,
    pub pointer: Option<VertexAttrib>,
}

#[derive(Debug, Clone)]
struct Uniform {
    info: ActiveInfo,
    components: usize,
}

#[derive(Debug, Clone, Default)]
struct ProgramState {
    shaders: Vec<u32>,
    linked: bool,
    log: String,
    uniforms: Vec<Uniform>,
    values: BTreeMap<u32, Vec<f32>>,
    blocks: Vec<String>,
    block_bindings: BTreeMap<u32, u32>,
}

#[derive(Debug, Clone)]
struct ShaderState {
    ty: u32,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Debug, Clone, Default)]
struct TextureState {
    levels: BTreeMap<i32, TextureLevel>,
    params: BTreeMap<u32, i32>,
    mipmapped: bool,
}

#[derive(Debug, Clone)]
enum Resource {
    Buffer { data: Vec<u8>, usage: u32 },
    Texture(TextureState),
    Framebuffer { attachments: BTreeMap<u32, (u32, i32)> },
    Program(ProgramState),
    Shader(ShaderState),
    VertexArray,
}

impl Resource {
    fn kind(&self) -> GlObjectKind {
        match self {
            Self::Buffer { .. } => GlObjectKind::Buffer,
            Self::Texture(_) => GlObjectKind::Texture,
            Self::Framebuffer { .. } => GlObjectKind::Framebuffer,
            Self::Program(_) => GlObjectKind::Program,
            Self::Shader(_) => GlObjectKind::Shader,
            Self::VertexArray => GlObjectKind::VertexArray,
        }
    }
}

/// State of one WebGL 2 context.
#[derive(Debug, Clone)]
pub struct GlContext {
    id: ContextId,
    canvas: ElementId,
    lost: bool,
    lost_reported: bool,
    next_object: u32,
    objects: BTreeMap<u32, Resource>,
    extensions: BTreeSet<String>,

    buffers: BTreeMap<u32, u32>,
    uniform_buffers: BTreeMap<u32, u32>,
    textures: BTreeMap<(u32, u32), u32>,
    active_unit: u32,
    framebuffer: Option<u32>,
    vertex_array: Option<u32>,
    program: Option<u32>,
    pixel_store: BTreeMap<u32, i32>,
    attribs: BTreeMap<u32, AttribState>,

    capabilities: BTreeSet<u32>,
    blend: BlendState,
    depth_func: u32,
    depth_mask: bool,
    color_mask: [bool; 4],
    stencil: StencilState,
    cull_face: u32,
    viewport: PixelRect,
    scissor: PixelRect,

    clear_color: [f32; 4],
    clear_depth: f32,
    clear_stencil: i32,
    /// Colour of the default framebuffer after the last clear.
    backbuffer: [u8; 4],

    errors: Vec<u32>,
    clears: Vec<u32>,
    draws: Vec<DrawCall>,
}

impl GlContext {
    pub(crate) fn new(id: ContextId, canvas: ElementId, width: u32, height: u32) -> Self {
        let full = PixelRect::new(0, 0, width as i32, height as i32);
        let mut capabilities = BTreeSet::new();
        capabilities.insert(gl::DITHER);
        Self {
            id,
            canvas,
            lost: false,
            lost_reported: false,
            next_object: 1,
            objects: BTreeMap::new(),
            extensions: BTreeSet::new(),
            buffers: BTreeMap::new(),
            uniform_buffers: BTreeMap::new(),
            textures: BTreeMap::new(),
            active_unit: 0,
            framebuffer: None,
            vertex_array: None,
            program: None,
            pixel_store: BTreeMap::new(),
            attribs: BTreeMap::new(),
            capabilities,
            blend: BlendState::default(),
            depth_func: gl::LESS,
            depth_mask: true,
            color_mask: [true; 4],
            stencil: StencilState::default(),
            cull_face: gl::BACK,
            viewport: full,
            scissor: full,
            clear_color: [0.0; 4],
            clear_depth: 1.0,
            clear_stencil: 0,
            backbuffer: [0; 4],
            errors: Vec::new(),
            clears: Vec::new(),
            draws: Vec::new(),
        }
    }

    // ── Inspection ──

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn canvas(&self) -> ElementId {
        self.canvas
    }

    pub fn is_lost(&self) -> bool {
        self.lost
    }

    pub fn is_enabled(&self, cap: u32) -> bool {
        self.capabilities.contains(&cap)
    }

    pub fn blend_state(&self) -> BlendState {
        self.blend
    }

    pub fn stencil_state(&self) -> StencilState {
        self.stencil
    }

    pub fn depth_state(&self) -> (u32, bool) {
        (self.depth_func, self.depth_mask)
    }

    pub fn color_mask(&self) -> [bool; 4] {
        self.color_mask
    }

    pub fn cull_face_mode(&self) -> u32 {
        self.cull_face
    }

    pub fn viewport(&self) -> PixelRect {
        self.viewport
    }

    pub fn scissor_box(&self) -> PixelRect {
        self.scissor
    }

    pub fn clear_values(&self) -> ([f32; 4], f32, i32) {
        (self.clear_color, self.clear_depth, self.clear_stencil)
    }

    /// Masks passed to `clear`, oldest first.
    pub fn clears(&self) -> &[u32] {
        &self.clears
    }

    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.draws
    }

    /// Live objects of `kind`.
    pub fn object_count(&self, kind: GlObjectKind) -> usize {
        self.objects.values().filter(|r| r.kind() == kind).count()
    }

    pub fn bound_buffer(&self, target: u32) -> Option<u32> {
        self.buffers.get(&target).copied()
    }

    pub fn uniform_buffer_binding(&self, index: u32) -> Option<u32> {
        self.uniform_buffers.get(&index).copied()
    }

    pub fn buffer_contents(&self, buffer: u32) -> Option<&[u8]> {
        match self.objects.get(&buffer) {
            Some(Resource::Buffer { data, .. }) => Some(data),
            _ => None,
        }
    }

    /// Texture bound to `TEXTURE_2D` on the active unit.
    pub fn bound_texture(&self) -> Option<u32> {
        self.textures.get(&(self.active_unit, gl::TEXTURE_2D)).copied()
    }

    pub fn active_unit(&self) -> u32 {
        self.active_unit
    }

    pub fn texture_level(&self, texture: u32, level: i32) -> Option<&TextureLevel> {
        match self.objects.get(&texture) {
            Some(Resource::Texture(t)) => t.levels.get(&level),
            _ => None,
        }
    }

    pub fn texture_parameter(&self, texture: u32, pname: u32) -> Option<i32> {
        match self.objects.get(&texture) {
            Some(Resource::Texture(t)) => t.params.get(&pname).copied(),
            _ => None,
        }
    }

    pub fn is_mipmapped(&self, texture: u32) -> bool {
        matches!(self.objects.get(&texture), Some(Resource::Texture(t)) if t.mipmapped)
    }

    pub fn bound_framebuffer(&self) -> Option<u32> {
        self.framebuffer
    }

    pub fn bound_vertex_array(&self) -> Option<u32> {
        self.vertex_array
    }

    pub fn current_program(&self) -> Option<u32> {
        self.program
    }

    pub fn pixel_store(&self, pname: u32) -> Option<i32> {
        self.pixel_store.get(&pname).copied()
    }

    pub fn attrib(&self, index: u32) -> Option<AttribState> {
        self.attribs.get(&index).copied()
    }

    /// Last value uploaded to `location`.
    pub fn uniform_value(&self, location: UniformLocation) -> Option<&[f32]> {
        match self.objects.get(&location.program.id) {
            Some(Resource::Program(p)) => p.values.get(&location.location).map(Vec::as_slice),
            _ => None,
        }
    }

    pub fn uniform_block_binding_of(&self, program: u32, index: u32) -> Option<u32> {
        match self.objects.get(&program) {
            Some(Resource::Program(p)) => p.block_bindings.get(&index).copied(),
            _ => None,
        }
    }

    pub fn extension_enabled(&self, name: &str) -> bool {
        self.extensions.contains(name)
    }

    /// Errors recorded and not yet read.
    pub fn pending_errors(&self) -> &[u32] {
        &self.errors
    }

    // ── Internals ──

    pub(crate) fn lose(&mut self) {
        self.lost = true;
        self.lost_reported = false;
    }

    fn record(&mut self, error: u32) {
        if !self.errors.contains(&error) {
            tracing::debug!(context = self.id.0, error, "gl error recorded");
            self.errors.push(error);
        }
    }

    /// Object id if `obj` is a live object of `kind` from this context.
    fn resolve(&mut self, obj: GlObject, kind: GlObjectKind) -> Option<u32> {
        let live = obj.context == self.id
            && obj.kind == kind
            && self.objects.get(&obj.id).map(Resource::kind) == Some(kind);
        if live {
            Some(obj.id)
        } else {
            self.record(gl::INVALID_OPERATION);
            None
        }
    }

    /// `Ok(None)` for a null object, `Err(())` after recording an error.
    fn resolve_nullable(&mut self, obj: Option<GlObject>, kind: GlObjectKind) -> Result<Option<u32>, ()> {
        match obj {
            None => Ok(None),
            Some(obj) => self.resolve(obj, kind).map(Some).ok_or(()),
        }
    }

    fn insert(&mut self, resource: Resource) -> GlObject {
        let id = self.next_object;
        self.next_object += 1;
        let kind = resource.kind();
        self.objects.insert(id, resource);
        GlObject {
            context: self.id,
            kind,
            id,
        }
    }

    fn program_mut(&mut self, id: u32) -> Option<&mut ProgramState> {
        match self.objects.get_mut(&id) {
            Some(Resource::Program(p)) => Some(p),
            _ => None,
        }
    }

    fn program(&self, id: u32) -> Option<&ProgramState> {
        match self.objects.get(&id) {
            Some(Resource::Program(p)) => Some(p),
            _ => None,
        }
    }

    fn shader(&self, id: u32) -> Option<&ShaderState> {
        match self.objects.get(&id) {
            Some(Resource::Shader(s)) => Some(s),
            _ => None,
        }
    }

    fn shader_mut(&mut self, id: u32) -> Option<&mut ShaderState> {
        match self.objects.get_mut(&id) {
            Some(Resource::Shader(s)) => Some(s),
            _ => None,
        }
    }

    fn texture_mut(&mut self, id: u32) -> Option<&mut TextureState> {
        match self.objects.get_mut(&id) {
            Some(Resource::Texture(t)) => Some(t),
            _ => None,
        }
    }

    fn bound_texture_for(&mut self, target: u32) -> Option<u32> {
        if target != gl::TEXTURE_2D {
            self.record(gl::INVALID_ENUM);
            return None;
        }
        let bound = self.textures.get(&(self.active_unit, target)).copied();
        if bound.is_none() {
            self.record(gl::INVALID_OPERATION);
        }
        bound
    }

    fn bound_buffer_for(&mut self, target: u32) -> Option<u32> {
        if !gl::is_buffer_target(target) {
            self.record(gl::INVALID_ENUM);
            return None;
        }
        let bound = self.buffers.get(&target).copied();
        if bound.is_none() {
            self.record(gl::INVALID_OPERATION);
        }
        bound
    }

    // ── Objects ──

    pub(crate) fn create_object(&mut self, kind: GlObjectKind) -> Option<GlObject> {
        let resource = match kind {
            GlObjectKind::Buffer => Resource::Buffer {
                data: Vec::new(),
                usage: gl::STATIC_DRAW,
            },
            GlObjectKind::Texture => Resource::Texture(TextureState::default()),
            GlObjectKind::Framebuffer => Resource::Framebuffer {
                attachments: BTreeMap::new(),
            },
            GlObjectKind::Program => Resource::Program(ProgramState::default()),
            GlObjectKind::VertexArray => Resource::VertexArray,
            GlObjectKind::Shader => {
                self.record(gl::INVALID_ENUM);
                return None;
            }
        };
        Some(self.insert(resource))
    }

    pub(crate) fn create_shader(&mut self, shader_type: u32) -> Option<GlObject> {
        if shader_type != gl::VERTEX_SHADER && shader_type != gl::FRAGMENT_SHADER {
            self.record(gl::INVALID_ENUM);
            return None;
        }
        Some(self.insert(Resource::Shader(ShaderState {
            ty: shader_type,
            source: String::new(),
            compiled: false,
            log: String::new(),
        })))
    }

    /// Deleting an already deleted object is silently ignored.
    pub(crate) fn delete_object(&mut self, obj: Option<GlObject>) {
        let Some(obj) = obj else { return };
        if obj.context != self.id {
            self.record(gl::INVALID_OPERATION);
            return;
        }
        if self.objects.remove(&obj.id).is_none() {
            return;
        }
        let id = obj.id;
        self.buffers.retain(|_, b| *b != id);
        self.uniform_buffers.retain(|_, b| *b != id);
        self.textures.retain(|_, t| *t != id);
        if self.framebuffer == Some(id) {
            self.framebuffer = None;
        }
        if self.vertex_array == Some(id) {
            self.vertex_array = None;
        }
        if self.program == Some(id) {
            self.program = None;
        }
    }

    // ── Binding ──

    pub(crate) fn bind_buffer(&mut self, target: u32, buffer: Option<GlObject>) {
        if !gl::is_buffer_target(target) {
            return self.record(gl::INVALID_ENUM);
        }
        let Ok(id) = self.resolve_nullable(buffer, GlObjectKind::Buffer) else { return };
        match id {
            Some(id) => self.buffers.insert(target, id),
            None => self.buffers.remove(&target),
        };
    }

    pub(crate) fn bind_buffer_base(&mut self, target: u32, index: u32, buffer: Option<GlObject>) {
        if target != gl::UNIFORM_BUFFER {
            return self.record(gl::INVALID_ENUM);
        }
        let Ok(id) = self.resolve_nullable(buffer, GlObjectKind::Buffer) else { return };
        match id {
            Some(id) => {
                self.uniform_buffers.insert(index, id);
                self.buffers.insert(target, id);
            }
            None => {
                self.uniform_buffers.remove(&index);
            }
        }
    }

    pub(crate) fn bind_texture(&mut self, target: u32, texture: Option<GlObject>) {
        if !gl::is_texture_target(target) {
            return self.record(gl::INVALID_ENUM);
        }
        let Ok(id) = self.resolve_nullable(texture, GlObjectKind::Texture) else { return };
        let key = (self.active_unit, target);
        match id {
            Some(id) => self.textures.insert(key, id),
            None => self.textures.remove(&key),
        };
    }

    pub(crate) fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<GlObject>) {
        if !gl::is_framebuffer_target(target) {
            return self.record(gl::INVALID_ENUM);
        }
        if let Ok(id) = self.resolve_nullable(framebuffer, GlObjectKind::Framebuffer) {
            self.framebuffer = id;
        }
    }

    pub(crate) fn bind_vertex_array(&mut self, vao: Option<GlObject>) {
        if let Ok(id) = self.resolve_nullable(vao, GlObjectKind::VertexArray) {
            self.vertex_array = id;
        }
    }

    // ── Buffer and texture data ──

    pub(crate) fn buffer_data(&mut self, target: u32, bytes: &[u8], new_usage: u32) {
        if !matches!(new_usage, gl::STATIC_DRAW | gl::DYNAMIC_DRAW | gl::STREAM_DRAW) {
            return self.record(gl::INVALID_ENUM);
        }
        let Some(id) = self.bound_buffer_for(target) else { return };
        if let Some(Resource::Buffer { data, usage }) = self.objects.get_mut(&id) {
            *data = bytes.to_vec();
            *usage = new_usage;
        }
    }

    pub(crate) fn buffer_sub_data(&mut self, target: u32, offset: i32, bytes: &[u8]) {
        let Some(id) = self.bound_buffer_for(target) else { return };
        let Some(Resource::Buffer { data, .. }) = self.objects.get_mut(&id) else { return };
        let fits = offset >= 0 && (offset as usize).checked_add(bytes.len()).is_some_and(|end| end <= data.len());
        if !fits {
            return self.record(gl::INVALID_VALUE);
        }
        let start = offset as usize;
        data[start..start + bytes.len()].copy_from_slice(bytes);
    }

    /// Images wider or taller than `max_size` record `INVALID_VALUE`.
    pub(crate) fn tex_image_2d(
        &mut self,
        desc: TexImage,
        pixels: Option<&[u8]>,
        max_size: u32,
    ) -> Result<(), HostException> {
        let Some(id) = self.bound_texture_for(desc.target) else { return Ok(()) };
        let max_size = i32::try_from(max_size).unwrap_or(i32::MAX);
        if desc.level < 0 || desc.border != 0 || desc.width > max_size || desc.height > max_size {
            self.record(gl::INVALID_VALUE);
            return Ok(());
        }
        let Some(size) = gl::image_size(desc.width, desc.height, desc.format, desc.ty) else {
            self.record(if desc.width < 0 || desc.height < 0 {
                gl::INVALID_VALUE
            } else {
                gl::INVALID_ENUM
            });
            return Ok(());
        };
        let data = match pixels {
            Some(p) if p.len() < size => {
                return Err(HostException::type_error(format!(
                    "texImage2D: pixel data is {} bytes, image needs {}",
                    p.len(),
                    size
                )));
            }
            Some(p) => p[..size].to_vec(),
            None => vec![0; size],
        };
        if let Some(tex) = self.texture_mut(id) {
            tex.levels.insert(
                desc.level,
                TextureLevel {
                    width: desc.width,
                    height: desc.height,
                    internal_format: desc.internal_format,
                    format: desc.format,
                    ty: desc.ty,
                    data,
                },
            );
        }
        Ok(())
    }

    pub(crate) fn tex_sub_image_2d(&mut self, desc: TexSubImage, pixels: Option<&[u8]>) -> Result<(), HostException> {
        let Some(pixels) = pixels else {
            return Err(HostException::type_error("texSubImage2D: pixels is null"));
        };
        let Some(id) = self.bound_texture_for(desc.target) else { return Ok(()) };
        let Some(level) = self.texture_level(id, desc.level).cloned() else {
            self.record(gl::INVALID_OPERATION);
            return Ok(());
        };
        let fits = |offset: i32, extent: i32, limit: i32| {
            offset >= 0 && extent >= 0 && offset.checked_add(extent).is_some_and(|end| end <= limit)
        };
        let inside = fits(desc.x_offset, desc.width, level.width) && fits(desc.y_offset, desc.height, level.height);
        if !inside {
            self.record(gl::INVALID_VALUE);
            return Ok(());
        }
        let (Some(bpp), Some(level_bpp)) = (
            gl::bytes_per_pixel(desc.format, desc.ty),
            gl::bytes_per_pixel(level.format, level.ty),
        ) else {
            self.record(gl::INVALID_ENUM);
            return Ok(());
        };
        if bpp != level_bpp {
            self.record(gl::INVALID_OPERATION);
            return Ok(());
        }
        let size = desc.width as usize * desc.height as usize * bpp;
        if pixels.len() < size {
            return Err(HostException::type_error(format!(
                "texSubImage2D: pixel data is {} bytes, region needs {}",
                pixels.len(),
                size
            )));
        }
        let row = desc.width as usize * bpp;
        let stride = level.width as usize * bpp;
        if let Some(tex) = self.texture_mut(id) {
            if let Some(dst) = tex.levels.get_mut(&desc.level) {
                for y in 0..desc.height as usize {
                    let src = y * row;
                    let at = (desc.y_offset as usize + y) * stride + desc.x_offset as usize * bpp;
                    dst.data[at..at + row].copy_from_slice(&pixels[src..src + row]);
                }
            }
        }
        Ok(())
    }

    /// Reads back the colour attachment of the bound framebuffer, or the
    /// last clear colour of the default one.
    pub(crate) fn read_pixels(&mut self, area: PixelRect, format: u32, ty: u32, out: &mut [u8]) -> Result<(), HostException> {
        if area.width < 0 || area.height < 0 {
            self.record(gl::INVALID_VALUE);
            return Ok(());
        }
        let Some(size) = gl::image_size(area.width, area.height, format, ty) else {
            self.record(gl::INVALID_ENUM);
            return Ok(());
        };
        if out.len() < size {
            return Err(HostException::type_error(format!(
                "readPixels: destination is {} bytes, area needs {}",
                out.len(),
                size
            )));
        }
        let rgba8 = format == gl::RGBA && ty == gl::UNSIGNED_BYTE;
        let attachment = self.framebuffer.and_then(|fb| match self.objects.get(&fb) {
            Some(Resource::Framebuffer { attachments }) => attachments.get(&gl::COLOR_ATTACHMENT0).copied(),
            _ => None,
        });
        if size == 0 {
            return Ok(());
        }
        let out = &mut out[..size];
        match attachment {
            Some((tex, level)) => {
                out.fill(0);
                let Some(src) = self.texture_level(tex, level) else { return Ok(()) };
                let Some(bpp) = gl::bytes_per_pixel(src.format, src.ty) else { return Ok(()) };
                if gl::bytes_per_pixel(format, ty) != Some(bpp) {
                    return Ok(());
                }
                for y in 0..area.height {
                    for x in 0..area.width {
                        let (Some(sx), Some(sy)) = (area.x.checked_add(x), area.y.checked_add(y)) else {
                            continue;
                        };
                        if sx < 0 || sy < 0 || sx >= src.width || sy >= src.height {
                            continue;
                        }
                        let from = (sy as usize * src.width as usize + sx as usize) * bpp;
                        let to = (y as usize * area.width as usize + x as usize) * bpp;
                        out[to..to + bpp].copy_from_slice(&src.data[from..from + bpp]);
                    }
                }
            }
            None if rgba8 => {
                for px in out.chunks_exact_mut(4) {
                    px.copy_from_slice(&self.backbuffer);
                }
            }
            None => out.fill(0),
        }
        Ok(())
    }

    pub(crate) fn tex_parameteri(&mut self, target: u32, pname: u32, param: i32) {
        let Some(id) = self.bound_texture_for(target) else { return };
        if !matches!(
            pname,
            gl::TEXTURE_MAG_FILTER | gl::TEXTURE_MIN_FILTER | gl::TEXTURE_WRAP_S | gl::TEXTURE_WRAP_T
        ) {
            return self.record(gl::INVALID_ENUM);
        }
        if let Some(tex) = self.texture_mut(id) {
            tex.params.insert(pname, param);
        }
    }

    pub(crate) fn pixel_storei(&mut self, pname: u32, param: i32) {
        match pname {
            gl::UNPACK_ALIGNMENT | gl::PACK_ALIGNMENT => {
                if !matches!(param, 1 | 2 | 4 | 8) {
                    return self.record(gl::INVALID_VALUE);
                }
            }
            gl::UNPACK_FLIP_Y_WEBGL | gl::UNPACK_PREMULTIPLY_ALPHA_WEBGL => {}
            _ => return self.record(gl::INVALID_ENUM),
        }
        self.pixel_store.insert(pname, param);
    }

    pub(crate) fn active_texture(&mut self, unit: u32) {
        if !(gl::TEXTURE0..gl::TEXTURE0 + MAX_TEXTURE_UNITS).contains(&unit) {
            return self.record(gl::INVALID_ENUM);
        }
        self.active_unit = unit - gl::TEXTURE0;
    }

    pub(crate) fn generate_mipmap(&mut self, target: u32) {
        let Some(id) = self.bound_texture_for(target) else { return };
        let has_base = self.texture_mut(id).is_some_and(|tex| {
            tex.mipmapped |= tex.levels.contains_key(&0);
            tex.mipmapped
        });
        if !has_base {
            self.record(gl::INVALID_OPERATION);
        }
    }

    // ── Shaders and programs ──

    pub(crate) fn shader_source(&mut self, shader: GlObject, source: &str) {
        let Some(id) = self.resolve(shader, GlObjectKind::Shader) else { return };
        if let Some(s) = self.shader_mut(id) {
            s.source = source.to_string();
        }
    }

    /// A shader compiles if it defines `void main`.
    pub(crate) fn compile_shader(&mut self, shader: GlObject) {
        let Some(id) = self.resolve(shader, GlObjectKind::Shader) else { return };
        if let Some(s) = self.shader_mut(id) {
            s.compiled = s.source.contains("void main");
            s.log = if s.compiled {
                String::new()
            } else {
                "ERROR: 0:1: 'main' : function not defined\n".to_string()
            };
        }
    }

    pub(crate) fn shader_parameter(&mut self, shader: GlObject, pname: u32) -> HostValue {
        let Some(id) = self.resolve(shader, GlObjectKind::Shader) else { return HostValue::Null };
        let Some(s) = self.shader(id) else { return HostValue::Null };
        match pname {
            gl::COMPILE_STATUS => HostValue::Bool(s.compiled),
            gl::SHADER_TYPE => HostValue::Number(s.ty as f64),
            gl::DELETE_STATUS => HostValue::Bool(false),
            _ => {
                self.record(gl::INVALID_ENUM);
                HostValue::Null
            }
        }
    }

    pub(crate) fn shader_info_log(&self, shader: GlObject) -> Option<String> {
        if shader.context != self.id {
            return None;
        }
        self.shader(shader.id).map(|s| s.log.clone())
    }

    pub(crate) fn attach_shader(&mut self, program: GlObject, shader: GlObject) {
        let Some(pid) = self.resolve(program, GlObjectKind::Program) else { return };
        let Some(sid) = self.resolve(shader, GlObjectKind::Shader) else { return };
        let Some(p) = self.program_mut(pid) else { return };
        if p.shaders.contains(&sid) {
            return self.record(gl::INVALID_OPERATION);
        }
        p.shaders.push(sid);
    }

    /// Links if exactly one compiled vertex and one compiled fragment shader
    /// are attached. Uniforms are collected from both sources.
    pub(crate) fn link_program(&mut self, program: GlObject) {
        let Some(pid) = self.resolve(program, GlObjectKind::Program) else { return };
        let Some(p) = self.program(pid) else { return };
        let shaders: Vec<ShaderState> = p.shaders.iter().filter_map(|id| self.shader(*id).cloned()).collect();

        let stage = |ty: u32| -> Vec<&ShaderState> { shaders.iter().filter(|s| s.ty == ty).collect() };
        let (vertex, fragment) = (stage(gl::VERTEX_SHADER), stage(gl::FRAGMENT_SHADER));
        let failure = if vertex.len() != 1 || fragment.len() != 1 {
            Some("program needs exactly one vertex and one fragment shader")
        } else if !vertex[0].compiled || !fragment[0].compiled {
            Some("attached shader is not compiled")
        } else {
            None
        };

        let (uniforms, blocks) = match failure {
            None => parse_uniforms(shaders.iter().map(|s| s.source.as_str())),
            Some(_) => (Vec::new(), Vec::new()),
        };
        let Some(p) = self.program_mut(pid) else { return };
        p.linked = failure.is_none();
        p.log = failure.map(|f| format!("ERROR: {}\n", f)).unwrap_or_default();
        p.uniforms = uniforms;
        p.blocks = blocks;
        p.values.clear();
        p.block_bindings.clear();
    }

    pub(crate) fn program_parameter(&mut self, program: GlObject, pname: u32) -> HostValue {
        let Some(pid) = self.resolve(program, GlObjectKind::Program) else { return HostValue::Null };
        let Some(p) = self.program(pid) else { return HostValue::Null };
        match pname {
            gl::LINK_STATUS => HostValue::Bool(p.linked),
            gl::DELETE_STATUS => HostValue::Bool(false),
            gl::ATTACHED_SHADERS => HostValue::Number(p.shaders.len() as f64),
            gl::ACTIVE_UNIFORMS => HostValue::Number(p.uniforms.len() as f64),
            gl::ACTIVE_UNIFORM_BLOCKS => HostValue::Number(p.blocks.len() as f64),
            _ => {
                self.record(gl::INVALID_ENUM);
                HostValue::Null
            }
        }
    }

    pub(crate) fn program_info_log(&self, program: GlObject) -> Option<String> {
        if program.context != self.id {
            return None;
        }
        self.program(program.id).map(|p| p.log.clone())
    }

    pub(crate) fn use_program(&mut self, program: Option<GlObject>) {
        let Ok(id) = self.resolve_nullable(program, GlObjectKind::Program) else { return };
        if let Some(id) = id {
            if !self.program(id).is_some_and(|p| p.linked) {
                return self.record(gl::INVALID_OPERATION);
            }
        }
        self.program = id;
    }

    // ── Uniforms and attributes ──

    fn linked_program(&mut self, program: GlObject) -> Option<u32> {
        let pid = self.resolve(program, GlObjectKind::Program)?;
        if self.program(pid).is_some_and(|p| p.linked) {
            Some(pid)
        } else {
            self.record(gl::INVALID_OPERATION);
            None
        }
    }

    /// Array uniforms answer to both `name` and `name[0]`.
    pub(crate) fn uniform_location(&mut self, program: GlObject, name: &str) -> Option<UniformLocation> {
        let pid = self.linked_program(program)?;
        let p = self.program(pid)?;
        let index = p.uniforms.iter().position(|u| {
            u.info.name == name || u.info.name.strip_suffix("[0]") == Some(name)
        })?;
        Some(UniformLocation {
            program,
            location: index as u32,
        })
    }

    pub(crate) fn active_uniform(&mut self, program: GlObject, index: u32) -> Option<ActiveInfo> {
        let pid = self.linked_program(program)?;
        let info = self.program(pid)?.uniforms.get(index as usize).map(|u| u.info.clone());
        if info.is_none() {
            self.record(gl::INVALID_VALUE);
        }
        info
    }

    pub(crate) fn uniform_block_index(&mut self, program: GlObject, name: &str) -> u32 {
        let Some(pid) = self.linked_program(program) else { return gl::INVALID_INDEX };
        self.program(pid)
            .and_then(|p| p.blocks.iter().position(|b| b == name))
            .map_or(gl::INVALID_INDEX, |i| i as u32)
    }

    pub(crate) fn uniform_block_binding(&mut self, program: GlObject, index: u32, binding: u32) {
        let Some(pid) = self.linked_program(program) else { return };
        let Some(p) = self.program_mut(pid) else { return };
        if index as usize >= p.blocks.len() {
            return self.record(gl::INVALID_VALUE);
        }
        p.block_bindings.insert(index, binding);
    }

    /// Store `values` at `location` if it belongs to the current program
    /// and `accepts` the uniform's type.
    fn set_uniform(
        &mut self,
        location: Option<UniformLocation>,
        values: Vec<f32>,
        accepts: impl Fn(&Uniform, usize) -> bool,
    ) {
        // A null location is silently ignored.
        let Some(loc) = location else { return };
        if loc.program.context != self.id || self.program != Some(loc.program.id) {
            return self.record(gl::INVALID_OPERATION);
        }
        let Some(p) = self.program_mut(loc.program.id) else { return };
        let ok = p
            .uniforms
            .get(loc.location as usize)
            .is_some_and(|u| accepts(u, values.len()));
        if !ok {
            return self.record(gl::INVALID_OPERATION);
        }
        p.values.insert(loc.location, values);
    }

    pub(crate) fn uniform_f32(&mut self, location: Option<UniformLocation>, values: &[f32]) {
        self.set_uniform(location, values.to_vec(), |u, n| {
            matches!(u.info.ty, gl::FLOAT | gl::FLOAT_VEC2 | gl::FLOAT_VEC3 | gl::FLOAT_VEC4) && u.components == n
        });
    }

    pub(crate) fn uniform_i32(&mut self, location: Option<UniformLocation>, value: i32) {
        self.set_uniform(location, vec![value as f32], |u, _| {
            matches!(u.info.ty, gl::INT | gl::BOOL | gl::SAMPLER_2D | gl::SAMPLER_CUBE)
        });
    }

    pub(crate) fn uniform_matrix4fv(&mut self, location: Option<UniformLocation>, transpose: bool, values: &[f32]) {
        let mut values = values.to_vec();
        if transpose {
            for m in values.chunks_exact_mut(16) {
                for r in 0..4 {
                    for c in (r + 1)..4 {
                        m.swap(r * 4 + c, c * 4 + r);
                    }
                }
            }
        }
        self.set_uniform(location, values, |u, n| {
            u.info.ty == gl::FLOAT_MAT4 && n > 0 && n % 16 == 0 && n / 16 <= u.info.size as usize
        });
    }

    pub(crate) fn enable_vertex_attrib_array(&mut self, index: u32) {
        if index >= MAX_VERTEX_ATTRIBS {
            return self.record(gl::INVALID_VALUE);
        }
        self.attribs.entry(index).or_default().enabled = true;
    }

    pub(crate) fn vertex_attrib_pointer(&mut self, attrib: VertexAttrib) {
        if attrib.index >= MAX_VERTEX_ATTRIBS
            || !(1..=4).contains(&attrib.size)
            || attrib.stride < 0
            || attrib.offset < 0
        {
            return self.record(gl::INVALID_VALUE);
        }
        if !self.buffers.contains_key(&gl::ARRAY_BUFFER) && attrib.offset != 0 {
            return self.record(gl::INVALID_OPERATION);
        }
        self.attribs.entry(attrib.index).or_default().pointer = Some(attrib);
    }

    // ── Fixed-function state ──

    pub(crate) fn set_capability(&mut self, cap: u32, enabled: bool) {
        if !gl::is_capability(cap) {
            return self.record(gl::INVALID_ENUM);
        }
        if enabled {
            self.capabilities.insert(cap);
        } else {
            self.capabilities.remove(&cap);
        }
    }

    pub(crate) fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        if ![src_rgb, dst_rgb, src_alpha, dst_alpha].into_iter().all(gl::is_blend_factor) {
            return self.record(gl::INVALID_ENUM);
        }
        self.blend.src_rgb = src_rgb;
        self.blend.dst_rgb = dst_rgb;
        self.blend.src_alpha = src_alpha;
        self.blend.dst_alpha = dst_alpha;
    }

    pub(crate) fn blend_equation_separate(&mut self, mode_rgb: u32, mode_alpha: u32) {
        if !gl::is_blend_equation(mode_rgb) || !gl::is_blend_equation(mode_alpha) {
            return self.record(gl::INVALID_ENUM);
        }
        self.blend.equation_rgb = mode_rgb;
        self.blend.equation_alpha = mode_alpha;
    }

    pub(crate) fn depth_func(&mut self, func: u32) {
        if !gl::is_compare_func(func) {
            return self.record(gl::INVALID_ENUM);
        }
        self.depth_func = func;
    }

    pub(crate) fn depth_mask(&mut self, flag: bool) {
        self.depth_mask = flag;
    }

    pub(crate) fn set_color_mask(&mut self, mask: [bool; 4]) {
        self.color_mask = mask;
    }

    pub(crate) fn stencil_func(&mut self, func: u32, reference: i32, mask: u32) {
        if !gl::is_compare_func(func) {
            return self.record(gl::INVALID_ENUM);
        }
        self.stencil.func = func;
        self.stencil.reference = reference;
        self.stencil.value_mask = mask;
    }

    pub(crate) fn stencil_op(&mut self, fail: u32, zfail: u32, zpass: u32) {
        if ![fail, zfail, zpass].into_iter().all(gl::is_stencil_op) {
            return self.record(gl::INVALID_ENUM);
        }
        self.stencil.fail = fail;
        self.stencil.zfail = zfail;
        self.stencil.zpass = zpass;
    }

    pub(crate) fn stencil_mask(&mut self, mask: u32) {
        self.stencil.write_mask = mask;
    }

    pub(crate) fn set_cull_face(&mut self, mode: u32) {
        if !gl::is_face(mode) {
            return self.record(gl::INVALID_ENUM);
        }
        self.cull_face = mode;
    }

    pub(crate) fn set_viewport(&mut self, rect: PixelRect) {
        if rect.width < 0 || rect.height < 0 {
            return self.record(gl::INVALID_VALUE);
        }
        self.viewport = rect;
    }

    pub(crate) fn set_scissor(&mut self, rect: PixelRect) {
        if rect.width < 0 || rect.height < 0 {
            return self.record(gl::INVALID_VALUE);
        }
        self.scissor = rect;
    }

    // ── Drawing ──

    pub(crate) fn clear(&mut self, mask: u32) {
        let all = gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT | gl::STENCIL_BUFFER_BIT;
        if mask & !all != 0 {
            return self.record(gl::INVALID_VALUE);
        }
        self.clears.push(mask);
        if mask & gl::COLOR_BUFFER_BIT == 0 {
            return;
        }
        let rgba = self.clear_color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        let attachment = self.framebuffer.and_then(|fb| match self.objects.get(&fb) {
            Some(Resource::Framebuffer { attachments }) => attachments.get(&gl::COLOR_ATTACHMENT0).copied(),
            _ => None,
        });
        match attachment {
            Some((tex, level)) => {
                let Some(t) = self.texture_mut(tex) else { return };
                if let Some(lvl) = t.levels.get_mut(&level) {
                    if lvl.format == gl::RGBA && lvl.ty == gl::UNSIGNED_BYTE {
                        for px in lvl.data.chunks_exact_mut(4) {
                            px.copy_from_slice(&rgba);
                        }
                    }
                }
            }
            None => self.backbuffer = rgba,
        }
    }

    pub(crate) fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.clear_color = rgba;
    }

    pub(crate) fn set_clear_depth(&mut self, depth: f32) {
        self.clear_depth = depth.clamp(0.0, 1.0);
    }

    pub(crate) fn set_clear_stencil(&mut self, stencil: i32) {
        self.clear_stencil = stencil;
    }

    fn draw_program(&mut self) -> Option<u32> {
        let program = self.program;
        if program.is_none() {
            self.record(gl::INVALID_OPERATION);
        }
        program
    }

    pub(crate) fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        if !gl::is_draw_mode(mode) {
            return self.record(gl::INVALID_ENUM);
        }
        if first < 0 || count < 0 {
            return self.record(gl::INVALID_VALUE);
        }
        let Some(program) = self.draw_program() else { return };
        self.draws.push(DrawCall {
            mode,
            first,
            count,
            index_type: None,
            program,
        });
    }

    pub(crate) fn draw_elements(&mut self, mode: u32, count: i32, ty: u32, offset: i32) {
        if !gl::is_draw_mode(mode) || !gl::is_index_type(ty) {
            return self.record(gl::INVALID_ENUM);
        }
        if count < 0 || offset < 0 {
            return self.record(gl::INVALID_VALUE);
        }
        if !self.buffers.contains_key(&gl::ELEMENT_ARRAY_BUFFER) {
            return self.record(gl::INVALID_OPERATION);
        }
        let Some(program) = self.draw_program() else { return };
        self.draws.push(DrawCall {
            mode,
            first: offset,
            count,
            index_type: Some(ty),
            program,
        });
    }

    // ── Framebuffers ──

    pub(crate) fn framebuffer_texture_2d(
        &mut self,
        target: u32,
        attachment: u32,
        textarget: u32,
        texture: Option<GlObject>,
        level: i32,
    ) {
        if !gl::is_framebuffer_target(target) || textarget != gl::TEXTURE_2D {
            return self.record(gl::INVALID_ENUM);
        }
        let Some(fb) = self.framebuffer else {
            return self.record(gl::INVALID_OPERATION);
        };
        let Ok(tex) = self.resolve_nullable(texture, GlObjectKind::Texture) else { return };
        if let Some(Resource::Framebuffer { attachments }) = self.objects.get_mut(&fb) {
            match tex {
                Some(tex) => attachments.insert(attachment, (tex, level)),
                None => attachments.remove(&attachment),
            };
        }
    }

    pub(crate) fn check_framebuffer_status(&mut self, target: u32) -> u32 {
        if !gl::is_framebuffer_target(target) {
            self.record(gl::INVALID_ENUM);
            return 0;
        }
        let Some(fb) = self.framebuffer else {
            return gl::FRAMEBUFFER_COMPLETE;
        };
        let Some(Resource::Framebuffer { attachments }) = self.objects.get(&fb) else {
            return gl::FRAMEBUFFER_COMPLETE;
        };
        if attachments.is_empty() {
            return gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT;
        }
        let complete = attachments
            .values()
            .all(|(tex, level)| self.texture_level(*tex, *level).is_some_and(|l| l.width > 0 && l.height > 0));
        if complete {
            gl::FRAMEBUFFER_COMPLETE
        } else {
            gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT
        }
    }

    // ── Queries ──

    pub(crate) fn enable_extension(&mut self, name: &str) {
        self.extensions.insert(name.to_string());
    }

    pub(crate) fn get_parameter(&mut self, pname: u32, max_texture_size: u32) -> HostValue {
        let rect = |r: PixelRect| HostValue::Object(HostObject::Int32Array(vec![r.x, r.y, r.width, r.height]));
        match pname {
            gl::VENDOR => "hostbridge".into(),
            gl::RENDERER => "hostbridge in-memory WebGL".into(),
            gl::VERSION => "WebGL 2.0".into(),
            gl::SHADING_LANGUAGE_VERSION => "WebGL GLSL ES 3.00".into(),
            gl::MAX_TEXTURE_SIZE => HostValue::Number(max_texture_size as f64),
            gl::MAX_VERTEX_ATTRIBS => HostValue::Number(MAX_VERTEX_ATTRIBS as f64),
            gl::MAX_TEXTURE_IMAGE_UNITS => HostValue::Number(MAX_TEXTURE_UNITS as f64),
            gl::MAX_UNIFORM_BUFFER_BINDINGS => HostValue::Number(24.0),
            gl::ACTIVE_TEXTURE => HostValue::Number((gl::TEXTURE0 + self.active_unit) as f64),
            gl::DEPTH_FUNC => HostValue::Number(self.depth_func as f64),
            gl::DEPTH_WRITEMASK => HostValue::Bool(self.depth_mask),
            gl::CULL_FACE_MODE => HostValue::Number(self.cull_face as f64),
            gl::VIEWPORT => rect(self.viewport),
            gl::SCISSOR_BOX => rect(self.scissor),
            cap if gl::is_capability(cap) => HostValue::Bool(self.is_enabled(cap)),
            _ => {
                self.record(gl::INVALID_ENUM);
                HostValue::Null
            }
        }
    }

    /// A lost context reports `CONTEXT_LOST_WEBGL` once, then `NO_ERROR`.
    pub(crate) fn get_error(&mut self) -> u32 {
        if self.lost {
            if self.lost_reported {
                return gl::NO_ERROR;
            }
            self.lost_reported = true;
            return gl::CONTEXT_LOST_WEBGL;
        }
        if self.errors.is_empty() {
            gl::NO_ERROR
        } else {
            self.errors.remove(0)
        }
    }
}

/// Collect `uniform <type> <name>;` declarations and `uniform <Block> {`
/// blocks. Uniforms declared in more than one stage are listed once.
fn parse_uniforms<'a>(sources: impl Iterator<Item = &'a str>) -> (Vec<Uniform>, Vec<String>) {
    let mut uniforms: Vec<Uniform> = Vec::new();
    let mut blocks: Vec<String> = Vec::new();
    for source in sources {
        let mut depth = 0usize;
        for line in source.lines() {
            let line = line.trim();
            let opens = line.matches('{').count();
            let closes = line.matches('}').count();
            if depth == 0 {
                if let Some(rest) = line.strip_prefix("uniform ") {
                    parse_declaration(rest, &mut uniforms, &mut blocks);
                }
            }
            depth = (depth + opens).saturating_sub(closes);
        }
    }
    (uniforms, blocks)
}

fn parse_declaration(rest: &str, uniforms: &mut Vec<Uniform>, blocks: &mut Vec<String>) {
    let not_precision = |t: &&str| !matches!(*t, "lowp" | "mediump" | "highp");
    let tokens: Vec<&str> = rest
        .split(|c: char| c.is_whitespace() || c == ';')
        .filter(|t| !t.is_empty())
        .filter(not_precision)
        .collect();

    if rest.contains('{') {
        let name = tokens.first().map(|t| t.trim_end_matches('{'));
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            if !blocks.iter().any(|b| b == name) {
                blocks.push(name.to_string());
            }
        }
        return;
    }

    let [ty, decl, ..] = tokens.as_slice() else { return };
    let Some((gl_type, components)) = gl::uniform_type(ty) else { return };
    let (base, size) = match decl.split_once('[') {
        Some((base, len)) => (base, len.trim_end_matches(']').parse::<i32>().unwrap_or(1)),
        None => (*decl, 1),
    };
    let name = if decl.contains('[') {
        format!("{}[0]", base)
    } else {
        base.to_string()
    };
    if uniforms.iter().any(|u| u.info.name == name) {
        return;
    }
    uniforms.push(Uniform {
        info: ActiveInfo {
            name,
            size,
            ty: gl_type,
        },
        components,
    });
}
