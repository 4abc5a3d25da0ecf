//! Host values referenced by guest handles.

use std::fmt;
use std::rc::Rc;

use hostbridge_primitives::ClosureId;

use crate::error::{HostError, HostException};
use crate::event::{DomRect, EventKind, InputEvent};

/// A DOM element owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u32);

/// A rendering context created from a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u32);

/// WebGL object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GlObjectKind {
    Buffer,
    Texture,
    Framebuffer,
    Program,
    Shader,
    VertexArray,
}

impl GlObjectKind {
    pub fn class_name(self) -> &'static str {
        match self {
            Self::Buffer => "WebGLBuffer",
            Self::Texture => "WebGLTexture",
            Self::Framebuffer => "WebGLFramebuffer",
            Self::Program => "WebGLProgram",
            Self::Shader => "WebGLShader",
            Self::VertexArray => "WebGLVertexArrayObject",
        }
    }
}

/// A WebGL object, scoped to the context that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlObject {
    pub context: ContextId,
    pub kind: GlObjectKind,
    pub id: u32,
}

/// `WebGLUniformLocation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation {
    pub program: GlObject,
    pub location: u32,
}

/// `WebGLActiveInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveInfo {
    pub name: String,
    pub size: i32,
    pub ty: u32,
}

/// Reference-typed host objects.
#[derive(Debug, Clone, PartialEq)]
pub enum HostObject {
    Window,
    Document,
    Element(ElementId),
    /// `element.style`
    Style(ElementId),
    Context(ContextId),
    Gl(GlObject),
    UniformLocation(UniformLocation),
    ActiveInfo(ActiveInfo),
    Extension { context: ContextId, name: String },
    Rect(DomRect),
    Event(Rc<InputEvent>),
    /// A guest closure wrapped as a host function.
    Closure(ClosureId),
    Int32Array(Vec<i32>),
}

impl HostObject {
    /// Interface name as a script would see it.
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Window => "Window",
            Self::Document => "HTMLDocument",
            Self::Element(_) => "HTMLElement",
            Self::Style(_) => "CSSStyleDeclaration",
            Self::Context(_) => "WebGL2RenderingContext",
            Self::Gl(obj) => obj.kind.class_name(),
            Self::UniformLocation(_) => "WebGLUniformLocation",
            Self::ActiveInfo(_) => "WebGLActiveInfo",
            Self::Extension { .. } => "Object",
            Self::Rect(_) => "DOMRect",
            Self::Event(ev) => ev.class_name(),
            Self::Closure(_) => "Function",
            Self::Int32Array(_) => "Int32Array",
        }
    }
}

/// Interfaces a guest can test a value against without trapping.
///
/// The discriminant is the `kind` argument of `object_instance_of`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Interface {
    Window = 1,
    Document = 2,
    Element = 3,
    CanvasElement = 4,
    WebGl2RenderingContext = 5,
    Event = 6,
    MouseEvent = 7,
    WheelEvent = 8,
    KeyboardEvent = 9,
    Error = 10,
    Function = 11,
    Int32Array = 12,
}

impl Interface {
    pub fn from_abi(raw: i32) -> Option<Self> {
        Some(match raw {
            1 => Self::Window,
            2 => Self::Document,
            3 => Self::Element,
            4 => Self::CanvasElement,
            5 => Self::WebGl2RenderingContext,
            6 => Self::Event,
            7 => Self::MouseEvent,
            8 => Self::WheelEvent,
            9 => Self::KeyboardEvent,
            10 => Self::Error,
            11 => Self::Function,
            12 => Self::Int32Array,
            _ => return None,
        })
    }
}

/// Any value a handle can refer to.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Error(HostException),
    Object(HostObject),
}

impl HostValue {
    /// Values for the reserved handles, in handle order. `HANDLE_NONE`
    /// resolves to `undefined`.
    pub fn sentinels() -> [HostValue; 5] {
        [
            HostValue::Undefined,
            HostValue::Undefined,
            HostValue::Null,
            HostValue::Bool(true),
            HostValue::Bool(false),
        ]
    }

    /// `undefined` or `null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&HostObject> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Type name used in mismatch reports.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Error(_) => "Error",
            Self::Object(obj) => obj.class_name(),
        }
    }

    pub fn expect_element(&self) -> Result<ElementId, HostError> {
        match self {
            Self::Object(HostObject::Element(el)) => Ok(*el),
            other => Err(HostError::type_mismatch("HTMLElement", other.type_name())),
        }
    }

    pub fn expect_context(&self) -> Result<ContextId, HostError> {
        match self {
            Self::Object(HostObject::Context(ctx)) => Ok(*ctx),
            other => Err(HostError::type_mismatch("WebGL2RenderingContext", other.type_name())),
        }
    }

    pub fn expect_event(&self) -> Result<Rc<InputEvent>, HostError> {
        match self {
            Self::Object(HostObject::Event(ev)) => Ok(Rc::clone(ev)),
            other => Err(HostError::type_mismatch("Event", other.type_name())),
        }
    }

    pub fn expect_closure(&self) -> Result<ClosureId, HostError> {
        match self {
            Self::Object(HostObject::Closure(id)) => Ok(*id),
            other => Err(HostError::type_mismatch("Function", other.type_name())),
        }
    }

    pub fn expect_rect(&self) -> Result<DomRect, HostError> {
        match self {
            Self::Object(HostObject::Rect(rect)) => Ok(*rect),
            other => Err(HostError::type_mismatch("DOMRect", other.type_name())),
        }
    }

    /// A WebGL object of `kind`.
    pub fn expect_gl(&self, kind: GlObjectKind) -> Result<GlObject, HostError> {
        match self {
            Self::Object(HostObject::Gl(obj)) if obj.kind == kind => Ok(*obj),
            other => Err(HostError::type_mismatch(kind.class_name(), other.type_name())),
        }
    }

    /// A WebGL object of `kind`, or `null`/`undefined`.
    pub fn expect_gl_or_null(&self, kind: GlObjectKind) -> Result<Option<GlObject>, HostError> {
        if self.is_nullish() {
            return Ok(None);
        }
        self.expect_gl(kind).map(Some)
    }

    pub fn expect_uniform_location(&self) -> Result<Option<UniformLocation>, HostError> {
        match self {
            Self::Object(HostObject::UniformLocation(loc)) => Ok(Some(*loc)),
            v if v.is_nullish() => Ok(None),
            other => Err(HostError::type_mismatch("WebGLUniformLocation", other.type_name())),
        }
    }

    pub fn expect_int32_array(&self) -> Result<&[i32], HostError> {
        match self {
            Self::Object(HostObject::Int32Array(values)) => Ok(values),
            other => Err(HostError::type_mismatch("Int32Array", other.type_name())),
        }
    }

    pub fn expect_error(&self) -> Result<&HostException, HostError> {
        match self {
            Self::Error(exception) => Ok(exception),
            other => Err(HostError::type_mismatch("Error", other.type_name())),
        }
    }

    /// `value instanceof iface`. Only the host knows which elements are
    /// canvases, so it answers that through `is_canvas`.
    pub fn is_instance_of(&self, iface: Interface, is_canvas: impl FnOnce(ElementId) -> bool) -> bool {
        let Self::Object(obj) = self else {
            return matches!((iface, self), (Interface::Error, Self::Error(_)));
        };
        match (iface, obj) {
            (Interface::Window, HostObject::Window) => true,
            (Interface::Document, HostObject::Document) => true,
            (Interface::Element, HostObject::Element(_)) => true,
            (Interface::CanvasElement, HostObject::Element(el)) => is_canvas(*el),
            (Interface::WebGl2RenderingContext, HostObject::Context(_)) => true,
            (Interface::Event, HostObject::Event(_)) => true,
            (Interface::MouseEvent, HostObject::Event(ev)) => {
                matches!(ev.kind(), EventKind::Mouse { .. } | EventKind::Wheel { .. })
            }
            (Interface::WheelEvent, HostObject::Event(ev)) => matches!(ev.kind(), EventKind::Wheel { .. }),
            (Interface::KeyboardEvent, HostObject::Event(ev)) => matches!(ev.kind(), EventKind::Keyboard { .. }),
            (Interface::Function, HostObject::Closure(_)) => true,
            (Interface::Int32Array, HostObject::Int32Array(_)) => true,
            _ => false,
        }
    }

    pub fn expect_active_info(&self) -> Result<&ActiveInfo, HostError> {
        match self {
            Self::Object(HostObject::ActiveInfo(info)) => Ok(info),
            other => Err(HostError::type_mismatch("WebGLActiveInfo", other.type_name())),
        }
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for HostValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<HostObject> for HostValue {
    fn from(obj: HostObject) -> Self {
        Self::Object(obj)
    }
}

impl From<HostException> for HostValue {
    fn from(err: HostException) -> Self {
        Self::Error(err)
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Render a value for debugging.
///
/// Primitives print the way a script console would; strings are quoted,
/// functions and errors get their own forms, other objects print their
/// interface name.
pub fn debug_string(value: &HostValue) -> String {
    value.to_string()
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => fmt_number(*n, f),
            Self::String(s) => write!(f, "{:?}", s),
            Self::Error(err) => write!(f, "{}: {}", err.name, err.message),
            Self::Object(HostObject::Closure(id)) => write!(f, "Function(closure#{})", id.as_raw()),
            Self::Object(HostObject::ActiveInfo(info)) => {
                write!(f, "WebGLActiveInfo({:?}, size={}, type={:#06x})", info.name, info.size, info.ty)
            }
            Self::Object(HostObject::Rect(r)) => {
                write!(f, "DOMRect({}, {}, {}, {})", r.left, r.top, r.width, r.height)
            }
            Self::Object(HostObject::Event(ev)) => write!(f, "{}({:?})", ev.class_name(), ev.event_type()),
            Self::Object(HostObject::Extension { name, .. }) => write!(f, "Object({})", name),
            Self::Object(HostObject::Int32Array(values)) => {
                write!(f, "Int32Array({}) [", values.len())?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Self::Object(obj) => write!(f, "[object {}]", obj.class_name()),
        }
    }
}

fn fmt_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        write!(f, "NaN")
    } else if n.is_infinite() {
        write!(f, "{}Infinity", if n < 0.0 { "-" } else { "" })
    } else if n == n.trunc() && n.abs() < 1e21 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{}", n)
    }
}
