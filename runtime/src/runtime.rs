//! Bridge runtime: Wasmtime engine, module loading and instance lifecycle.
//!
//! A [`Bridge`] compiles and validates a guest module once. Each call to
//! [`Bridge::instantiate`] creates an isolated [`BridgeInstance`] with its
//! own store, handle table, closure table and pending-exception slot.

use std::path::Path;
use std::rc::Rc;

use tracing::{debug, warn};
use wasmtime::{Config, Engine, Instance, Linker, Module, Store, Trap, WasmParams, WasmResults};

use hostbridge_hostapi::{EventTarget, HostApi, HostError, HostException, HostObject, HostValue, InputEvent};
use hostbridge_primitives::{
    decode_utf8, ClosureError, ClosureId, ClosureTable, Handle, HandleTable, MemoryView, ViewKind,
};

use crate::closure;
use crate::codec;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::host_impl::{GuestExports, HostState, LogLine};
use crate::linker::register_host_functions;
use crate::memory;
use crate::validation::validate_module;

/// A compiled, validated guest module.
pub struct Bridge {
    engine: Engine,
    module: Module,
    config: BridgeConfig,
}

impl Bridge {
    /// Compile a guest from wasm bytes or WAT text.
    ///
    /// Validates the module's exports and imports before accepting.
    pub fn new(wasm: impl AsRef<[u8]>, config: BridgeConfig) -> Result<Self, BridgeError> {
        let engine = create_engine(&config)?;
        let module = Module::new(&engine, wasm.as_ref())?;
        validate_module(&module)?;
        debug!(imports = module.imports().len(), "guest module compiled");
        Ok(Self {
            engine,
            module,
            config,
        })
    }

    /// Load from a `.wasm` file path.
    pub fn from_file(path: &Path, config: BridgeConfig) -> Result<Self, BridgeError> {
        let engine = create_engine(&config)?;
        let module = Module::from_file(&engine, path)?;
        validate_module(&module)?;
        debug!(path = %path.display(), "guest module loaded");
        Ok(Self {
            engine,
            module,
            config,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Create a fresh instance talking to `host`.
    pub fn instantiate<H: HostApi + 'static>(&self, host: H) -> Result<BridgeInstance<H>, BridgeError> {
        let state = HostState::new(host, self.config.clone());
        let mut store = Store::new(&self.engine, state);
        store.limiter(|state| &mut state.limits);
        refuel(&mut store)?;

        let mut linker = Linker::new(&self.engine);
        register_host_functions(&mut linker)?;

        let instance = linker.instantiate(&mut store, &self.module)?;
        let exports = GuestExports::resolve(&instance, &mut store)?;
        store.data_mut().exports = Some(exports);
        debug!("guest instantiated");

        Ok(BridgeInstance { store, instance })
    }
}

/// One running guest and the host state it talks to.
pub struct BridgeInstance<H: HostApi> {
    store: Store<HostState<H>>,
    instance: Instance,
}

impl<H: HostApi> BridgeInstance<H> {
    /// Run `bridge_start` if the guest exports it.
    pub fn start(&mut self) -> Result<(), BridgeError> {
        let Some(start) = self.store.data().guest_exports()?.start.clone() else {
            return Ok(());
        };
        refuel(&mut self.store)?;
        handle_trap(start.call(&mut self.store, ()))
    }

    /// Call a guest export by name.
    pub fn call<P, R>(&mut self, name: &str, params: P) -> Result<R, BridgeError>
    where
        P: WasmParams,
        R: WasmResults,
    {
        let func = self.instance.get_typed_func::<P, R>(&mut self.store, name)?;
        refuel(&mut self.store)?;
        handle_trap(func.call(&mut self.store, params))
    }

    /// Deliver `event` to every listener registered for its type on
    /// `target`. Returns whether a listener called `preventDefault`.
    ///
    /// Listeners whose closure was dropped or is already running are skipped.
    pub fn dispatch_event(&mut self, target: EventTarget, event: InputEvent) -> Result<bool, BridgeError> {
        let event = Rc::new(event);
        let listeners = self.store.data().host.event_listeners(target, event.event_type());
        for id in listeners {
            let arg = HostValue::Object(HostObject::Event(Rc::clone(&event)));
            self.invoke_listener(id, arg, event.event_type())?;
        }
        Ok(event.default_prevented())
    }

    /// Run the callbacks queued with `requestAnimationFrame`, passing
    /// `timestamp`. Returns how many ran.
    pub fn run_animation_frame(&mut self, timestamp: f64) -> Result<usize, BridgeError> {
        let callbacks = self.store.data_mut().host.take_animation_frames();
        let mut ran = 0;
        for id in callbacks {
            if self.invoke_listener(id, HostValue::Number(timestamp), "animationframe")? {
                ran += 1;
            }
        }
        Ok(ran)
    }

    fn invoke_listener(&mut self, id: ClosureId, arg: HostValue, kind: &str) -> Result<bool, BridgeError> {
        match closure::invoke_closure(&mut self.store, id, arg) {
            Ok(()) => Ok(true),
            Err(BridgeError::Closure(ClosureError::Unknown(_) | ClosureError::Unavailable(_))) => {
                warn!(closure = id.as_raw(), kind, "listener closure no longer available, skipping");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Call closure `id` directly.
    pub fn invoke_closure(&mut self, id: ClosureId, arg: HostValue) -> Result<(), BridgeError> {
        closure::invoke_closure(&mut self.store, id, arg)
    }

    /// Take the pending exception, clearing the slot.
    pub fn take_exception(&mut self) -> Option<HostException> {
        self.store.data_mut().take_exception()
    }

    pub fn host(&self) -> &H {
        &self.store.data().host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.store.data_mut().host
    }

    pub fn handles(&self) -> &HandleTable<HostValue> {
        &self.store.data().handles
    }

    pub fn closures(&self) -> &ClosureTable {
        &self.store.data().closures
    }

    pub fn logs(&self) -> &[LogLine] {
        &self.store.data().logs
    }

    /// Hand a host value to the guest side of the table.
    pub fn alloc_value(&mut self, value: HostValue) -> Handle {
        Handle::from_abi(self.store.data_mut().alloc(value))
    }

    /// Copy `text` into a fresh guest allocation.
    pub fn pass_string(&mut self, text: &str) -> Result<(u32, u32), BridgeError> {
        let exports = self.store.data().guest_exports()?.clone();
        refuel(&mut self.store)?;
        codec::pass_string(&mut self.store, &exports, text).map_err(reclassify)
    }

    /// Decode a UTF-8 string from guest memory.
    pub fn read_string(&self, ptr: u32, len: u32) -> Result<String, BridgeError> {
        let mem = self.store.data().guest_exports()?.memory;
        let bytes = memory::read_bytes(mem.data(&self.store), ptr as i32, len as i32)?;
        Ok(decode_utf8(&bytes).map_err(HostError::from)?)
    }

    /// A typed view over the guest's current memory buffer.
    pub fn memory_view(&mut self, kind: ViewKind) -> Result<MemoryView, BridgeError> {
        let mem = self.store.data().guest_exports()?.memory;
        let identity = memory::identity_of(&mem, &self.store);
        Ok(self.store.data_mut().views.acquire(kind, identity).0)
    }

    /// Copy `count` elements starting at element `index` out of `view`.
    ///
    /// Fails with `StaleView` if memory grew since the view was taken.
    pub fn read_view(&self, view: &MemoryView, index: usize, count: usize) -> Result<Vec<u8>, BridgeError> {
        let mem = self.store.data().guest_exports()?.memory;
        view.check(memory::identity_of(&mem, &self.store))?;
        let range = view
            .byte_range(index, count)
            .ok_or_else(|| BridgeError::Memory(format!("view range {}+{} out of bounds", index, count)))?;
        Ok(mem.data(&self.store)[range].to_vec())
    }

    /// How many cached views were replaced after memory growth.
    pub fn memory_refreshes(&self) -> u64 {
        self.store.data().views.refreshes()
    }
}

/// Create a Wasmtime engine for bridge guests.
fn create_engine(config: &BridgeConfig) -> Result<Engine, BridgeError> {
    let mut wasm_config = Config::new();

    wasm_config.consume_fuel(config.fuel_per_call.is_some());

    wasm_config.wasm_threads(false);
    wasm_config.wasm_simd(false);
    wasm_config.wasm_relaxed_simd(false);
    wasm_config.wasm_multi_memory(false);
    wasm_config.cranelift_nan_canonicalization(true);

    let max_bytes = (config.max_memory_pages as u64) * 65536;
    wasm_config.memory_guaranteed_dense_image_size(max_bytes.min(16 * 1024 * 1024));

    Ok(Engine::new(&wasm_config)?)
}

/// Reset the fuel budget before a top-level call into the guest.
pub(crate) fn refuel<H: HostApi>(store: &mut Store<HostState<H>>) -> Result<(), BridgeError> {
    if let Some(fuel) = store.data().config().fuel_per_call {
        store.set_fuel(fuel)?;
    }
    Ok(())
}

/// Convert a guest call result into a `BridgeError`.
pub(crate) fn handle_trap<R>(result: Result<R, anyhow::Error>) -> Result<R, BridgeError> {
    result.map_err(classify_trap)
}

/// Recover the cause of a failed guest call.
///
/// Fuel exhaustion → `FuelExhausted`; a bridge fault raised by a host
/// function comes back as itself; anything else → `GuestTrapped`.
fn classify_trap(error: anyhow::Error) -> BridgeError {
    if matches!(error.downcast_ref::<Trap>(), Some(Trap::OutOfFuel)) {
        return BridgeError::FuelExhausted;
    }
    let error = match error.downcast::<BridgeError>() {
        Ok(BridgeError::Wasmtime(inner)) => return classify_trap(inner),
        Ok(bridge) => return bridge,
        Err(error) => error,
    };
    match error.downcast::<HostError>() {
        Ok(host) => BridgeError::Host(host),
        Err(error) => BridgeError::GuestTrapped(format!("{:#}", error)),
    }
}

fn reclassify(error: BridgeError) -> BridgeError {
    match error {
        BridgeError::Wasmtime(inner) => classify_trap(inner),
        other => other,
    }
}
