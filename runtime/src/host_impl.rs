//! Per-instance mutable state held in the Wasmtime Store.
//!
//! `HostState` combines the handle table, the pending-exception slot, the
//! closure table, the memory view cache and the host itself into a single
//! struct that lives inside `Store<HostState<H>>` for the lifetime of one
//! bridge instance. Nothing here is global: two instances never share a
//! handle, an exception or a closure.

use std::rc::Rc;

use tracing::trace;
use wasmtime::{Instance, Memory, Store, StoreLimits, StoreLimitsBuilder, TypedFunc};

use hostbridge_hostapi::{
    ContextId, ElementId, EventTarget, GlObject, GlObjectKind, HostApi, HostError, HostException,
    HostObject, HostValue, InputEvent, UniformLocation,
};
use hostbridge_primitives::types::{
    EXPORT_DROP_CLOSURE, EXPORT_INVOKE_CLOSURE, EXPORT_MALLOC, EXPORT_MEMORY, EXPORT_REALLOC,
    EXPORT_START,
};
use hostbridge_primitives::{
    BufferIdentity, ClosureId, ClosureTable, ErrorCode, Handle, HandleTable, ViewCache, ViewKind,
};

use crate::config::BridgeConfig;
use crate::error::BridgeError;

/// A log line emitted by the guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// 0 = error, 1 = warn, 2 = info, 3 = debug, anything else = trace.
    pub level: u32,
    pub message: String,
}

/// Functions and memory the guest exports to the bridge.
#[derive(Clone)]
pub struct GuestExports {
    pub memory: Memory,
    pub malloc: TypedFunc<i32, i32>,
    pub realloc: TypedFunc<(i32, i32, i32), i32>,
    pub start: Option<TypedFunc<(), ()>>,
    pub invoke_closure: Option<TypedFunc<(i32, i32, i32), ()>>,
    pub drop_closure: Option<TypedFunc<(i32, i32, i32), ()>>,
}

impl GuestExports {
    /// Look up the bridge exports of a fresh instance.
    pub fn resolve<T>(instance: &Instance, store: &mut Store<T>) -> Result<Self, BridgeError> {
        let memory = instance
            .get_memory(&mut *store, EXPORT_MEMORY)
            .ok_or(BridgeError::MissingExport(EXPORT_MEMORY))?;
        let malloc = instance
            .get_typed_func::<i32, i32>(&mut *store, EXPORT_MALLOC)
            .map_err(|_| BridgeError::MissingExport(EXPORT_MALLOC))?;
        let realloc = instance
            .get_typed_func::<(i32, i32, i32), i32>(&mut *store, EXPORT_REALLOC)
            .map_err(|_| BridgeError::MissingExport(EXPORT_REALLOC))?;
        let start = optional(instance, store, EXPORT_START)?;
        let invoke_closure = optional(instance, store, EXPORT_INVOKE_CLOSURE)?;
        let drop_closure = optional(instance, store, EXPORT_DROP_CLOSURE)?;
        Ok(Self {
            memory,
            malloc,
            realloc,
            start,
            invoke_closure,
            drop_closure,
        })
    }
}

fn optional<T, P, R>(
    instance: &Instance,
    store: &mut Store<T>,
    name: &str,
) -> Result<Option<TypedFunc<P, R>>, BridgeError>
where
    P: wasmtime::WasmParams,
    R: wasmtime::WasmResults,
{
    match instance.get_func(&mut *store, name) {
        Some(func) => Ok(Some(func.typed::<P, R>(&*store)?)),
        None => Ok(None),
    }
}

/// Per-instance mutable state held in the Wasmtime `Store`.
pub struct HostState<H> {
    /// The host the bindings forward to.
    pub host: H,
    /// Handles the guest holds to host values.
    pub handles: HandleTable<HostValue>,
    /// Exception thrown by the last failing fallible binding.
    pub pending_exception: Option<HostException>,
    /// Guest closures wrapped as host functions.
    pub closures: ClosureTable,
    /// Cached views over guest memory.
    pub views: ViewCache,
    /// Guest log lines, if enabled.
    pub logs: Vec<LogLine>,
    /// Memory limits enforced by the store.
    pub limits: StoreLimits,
    /// Bound after instantiation.
    pub exports: Option<GuestExports>,
    config: BridgeConfig,
}

impl<H: HostApi> HostState<H> {
    pub fn new(host: H, config: BridgeConfig) -> Self {
        let limits = StoreLimitsBuilder::new()
            .memory_size(config.max_memory_bytes())
            .build();
        Self {
            host,
            handles: HandleTable::with_capacity(
                HostValue::sentinels(),
                config.initial_handle_capacity,
            ),
            pending_exception: None,
            closures: ClosureTable::new(),
            views: ViewCache::new(),
            logs: Vec::new(),
            limits,
            exports: None,
            config,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn guest_exports(&self) -> Result<&GuestExports, HostError> {
        self.exports
            .as_ref()
            .ok_or_else(|| HostError::Internal("guest exports are not bound yet".into()))
    }

    // ── Handles ──

    /// Resolve a handle received from the guest.
    pub fn resolve(&self, raw: i32) -> Result<&HostValue, HostError> {
        self.handles
            .get(Handle::from_abi(raw))
            .ok_or_else(HostError::bad_handle)
    }

    /// Hand a value to the guest. `undefined`, `null` and booleans map to
    /// their sentinels; everything else takes a fresh slot.
    pub fn alloc(&mut self, value: HostValue) -> i32 {
        let handle = match value {
            HostValue::Undefined => Handle::UNDEFINED,
            HostValue::Null => Handle::NULL,
            HostValue::Bool(b) => Handle::from_bool(b),
            value => {
                let handle = self.handles.allocate(value);
                trace!(handle = handle.as_raw(), live = self.handles.live(), "handle allocated");
                handle
            }
        };
        handle.to_abi()
    }

    pub fn alloc_object(&mut self, object: HostObject) -> i32 {
        self.alloc(HostValue::Object(object))
    }

    /// `HANDLE_NONE` for an absent object.
    pub fn alloc_optional(&mut self, object: Option<HostObject>) -> i32 {
        match object {
            Some(object) => self.alloc_object(object),
            None => Handle::NONE.to_abi(),
        }
    }

    /// Second handle to the same value. Sentinels are returned as is.
    pub fn clone_ref(&mut self, raw: i32) -> Result<i32, HostError> {
        let handle = Handle::from_abi(raw);
        if handle.is_sentinel() {
            return Ok(raw);
        }
        Ok(self.handles.duplicate(handle)?.to_abi())
    }

    pub fn drop_ref(&mut self, raw: i32) -> Result<(), HostError> {
        self.handles.release(Handle::from_abi(raw))?;
        trace!(handle = raw, live = self.handles.live(), "handle released");
        Ok(())
    }

    // ── Typed resolution ──

    pub fn element(&self, raw: i32) -> Result<ElementId, HostError> {
        self.resolve(raw)?.expect_element()
    }

    pub fn context(&self, raw: i32) -> Result<ContextId, HostError> {
        self.resolve(raw)?.expect_context()
    }

    pub fn event(&self, raw: i32) -> Result<Rc<InputEvent>, HostError> {
        self.resolve(raw)?.expect_event()
    }

    pub fn closure(&self, raw: i32) -> Result<ClosureId, HostError> {
        self.resolve(raw)?.expect_closure()
    }

    pub fn gl_object(&self, raw: i32, kind: GlObjectKind) -> Result<GlObject, HostError> {
        self.resolve(raw)?.expect_gl(kind)
    }

    /// `NONE`, `null` and `undefined` are all "no object".
    pub fn gl_object_or_null(&self, raw: i32, kind: GlObjectKind) -> Result<Option<GlObject>, HostError> {
        self.resolve(raw)?.expect_gl_or_null(kind)
    }

    pub fn uniform_location(&self, raw: i32) -> Result<Option<UniformLocation>, HostError> {
        self.resolve(raw)?.expect_uniform_location()
    }

    pub fn style_owner(&self, raw: i32) -> Result<ElementId, HostError> {
        match self.resolve(raw)? {
            HostValue::Object(HostObject::Style(el)) => Ok(*el),
            other => Err(HostError::type_mismatch("CSSStyleDeclaration", other.type_name())),
        }
    }

    pub fn expect_window(&self, raw: i32) -> Result<(), HostError> {
        match self.resolve(raw)? {
            HostValue::Object(HostObject::Window) => Ok(()),
            other => Err(HostError::type_mismatch("Window", other.type_name())),
        }
    }

    pub fn expect_document(&self, raw: i32) -> Result<(), HostError> {
        match self.resolve(raw)? {
            HostValue::Object(HostObject::Document) => Ok(()),
            other => Err(HostError::type_mismatch("HTMLDocument", other.type_name())),
        }
    }

    pub fn event_target(&self, raw: i32) -> Result<EventTarget, HostError> {
        match self.resolve(raw)? {
            HostValue::Object(HostObject::Window) => Ok(EventTarget::Window),
            HostValue::Object(HostObject::Document) => Ok(EventTarget::Document),
            HostValue::Object(HostObject::Element(el)) => Ok(EventTarget::Element(*el)),
            other => Err(HostError::type_mismatch("EventTarget", other.type_name())),
        }
    }

    // ── Exceptions ──

    /// Park a thrown exception and return the `THREW` status.
    pub fn throw(&mut self, exception: HostException) -> i32 {
        trace!(name = %exception.name, message = %exception.message, "host operation threw");
        self.pending_exception = Some(exception);
        ErrorCode::Threw.as_i32()
    }

    pub fn take_exception(&mut self) -> Option<HostException> {
        self.pending_exception.take()
    }

    // ── Memory views ──

    /// Re-validate the cached view of `kind` against the current buffer.
    pub fn observe_memory(&mut self, kind: ViewKind, identity: BufferIdentity) {
        let (_, refreshed) = self.views.acquire(kind, identity);
        if refreshed {
            trace!(%kind, len = identity.len, "memory view refreshed");
        }
    }

    // ── Logs ──

    /// Record a guest log line. Oversized lines and lines past the limit
    /// are dropped.
    pub fn add_log(&mut self, level: u32, message: String) {
        if !self.config.enable_guest_logs {
            return;
        }
        if message.len() > self.config.max_log_line_len {
            return;
        }
        if self.logs.len() >= self.config.max_log_lines as usize {
            return;
        }
        self.logs.push(LogLine { level, message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostbridge_hostapi::MemHost;
    use hostbridge_primitives::HANDLE_UNDEFINED;

    fn state() -> HostState<MemHost> {
        HostState::new(MemHost::default(), BridgeConfig::default())
    }

    #[test]
    fn test_alloc_maps_primitives_to_sentinels() {
        let mut s = state();
        assert_eq!(s.alloc(HostValue::Undefined), HANDLE_UNDEFINED as i32);
        assert_eq!(s.alloc(HostValue::Bool(true)), Handle::TRUE.to_abi());
        assert_eq!(s.alloc(HostValue::Null), Handle::NULL.to_abi());
        assert_eq!(s.handles.live(), 0);
        let h = s.alloc(HostValue::Number(1.5));
        assert!(h >= 5);
        assert_eq!(s.resolve(h).unwrap(), &HostValue::Number(1.5));
    }

    #[test]
    fn test_none_resolves_to_undefined() {
        let mut s = state();
        assert_eq!(s.resolve(0).unwrap(), &HostValue::Undefined);
        assert_eq!(s.alloc_optional(None), 0);
    }

    #[test]
    fn test_clone_and_drop_ref() {
        let mut s = state();
        let h = s.alloc_object(HostObject::Window);
        let c = s.clone_ref(h).unwrap();
        assert_ne!(h, c);
        s.drop_ref(h).unwrap();
        s.expect_window(c).unwrap();
        assert_eq!(s.drop_ref(h).unwrap_err(), HostError::bad_handle());
        assert_eq!(s.clone_ref(Handle::NULL.to_abi()).unwrap(), Handle::NULL.to_abi());
    }

    #[test]
    fn test_typed_resolution_mismatch() {
        let mut s = state();
        let h = s.alloc_object(HostObject::Document);
        assert!(matches!(s.element(h), Err(HostError::TypeMismatch { .. })));
        assert_eq!(s.event_target(h).unwrap(), EventTarget::Document);
        assert_eq!(s.gl_object_or_null(Handle::NULL.to_abi(), GlObjectKind::Buffer).unwrap(), None);
        assert_eq!(s.resolve(9999).unwrap_err(), HostError::bad_handle());
    }

    #[test]
    fn test_throw_parks_exception() {
        let mut s = state();
        let status = s.throw(HostException::type_error("bad"));
        assert_eq!(status, ErrorCode::Threw.as_i32());
        assert_eq!(s.take_exception().unwrap().name, "TypeError");
        assert!(s.take_exception().is_none());
    }

    #[test]
    fn test_log_limit_silently_drops() {
        let config = BridgeConfig {
            enable_guest_logs: true,
            max_log_lines: 2,
            max_log_line_len: 8,
            ..BridgeConfig::default()
        };
        let mut s = HostState::new(MemHost::default(), config);
        s.add_log(2, "msg1".into());
        s.add_log(2, "far too long".into());
        s.add_log(2, "msg2".into());
        s.add_log(2, "msg3".into());
        assert_eq!(s.logs.len(), 2);
        assert_eq!(s.logs[1].message, "msg2");
    }

    #[test]
    fn test_logs_disabled_by_default() {
        let mut s = state();
        s.add_log(0, "dropped".into());
        assert!(s.logs.is_empty());
    }

    #[test]
    fn test_observe_memory_counts_refreshes() {
        let mut s = state();
        let one = BufferIdentity { base: 0x10, len: 65536 };
        let two = BufferIdentity { base: 0x10, len: 131072 };
        s.observe_memory(ViewKind::U8, one);
        s.observe_memory(ViewKind::U8, one);
        assert_eq!(s.views.refreshes(), 0);
        s.observe_memory(ViewKind::U8, two);
        assert_eq!(s.views.refreshes(), 1);
    }
}
