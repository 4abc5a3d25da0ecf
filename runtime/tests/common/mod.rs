//! Shared test helpers for integration tests.
//!
//! Builds WAT guests around a bump allocator and exposes a few raw memory
//! accessors so tests can inspect what the host wrote.

#![allow(dead_code)]

use hostbridge_hostapi::{HostValue, MemHost, SurfaceConfig};
use hostbridge_primitives::Handle;
use hostbridge_runtime::{Bridge, BridgeConfig, BridgeInstance};

/// Scratch area below the allocator's heap for out-pointers.
pub const SLOT: i32 = 256;
pub const SLOT2: i32 = 320;

/// First address handed out by the guest allocator.
pub const HEAP_BASE: i32 = 1024;

/// Wrap `imports` and `body` into a guest module.
///
/// The guest gets a bump `bridge_malloc` that grows memory on demand, a
/// copying `bridge_realloc`, and `load_*`/`store_*`/`grow` exports for tests.
pub fn guest_module(imports: &str, body: &str) -> String {
    format!(
        r#"(module
    {imports}
    (memory (export "memory") 1)
    (global $bump (mut i32) (i32.const {HEAP_BASE}))

    (func $malloc (export "bridge_malloc") (param $size i32) (result i32)
        (local $ptr i32) (local $end i32) (local $have i32)
        global.get $bump
        local.set $ptr
        local.get $ptr
        local.get $size
        i32.add
        i32.const 7
        i32.add
        i32.const -8
        i32.and
        local.set $end
        memory.size
        i32.const 16
        i32.shl
        local.set $have
        (if (i32.gt_u (local.get $end) (local.get $have))
            (then
                (if (i32.eq
                        (memory.grow
                            (i32.shr_u
                                (i32.add (i32.sub (local.get $end) (local.get $have)) (i32.const 65535))
                                (i32.const 16)))
                        (i32.const -1))
                    (then unreachable))))
        local.get $end
        global.set $bump
        local.get $ptr)

    (func (export "bridge_realloc") (param $ptr i32) (param $old i32) (param $new i32) (result i32)
        (local $dst i32)
        local.get $new
        call $malloc
        local.set $dst
        local.get $dst
        local.get $ptr
        local.get $old
        local.get $new
        local.get $old
        local.get $new
        i32.lt_u
        select
        memory.copy
        local.get $dst)

    (func (export "grow") (param i32) (result i32)
        local.get 0
        memory.grow)
    (func (export "load_i32") (param i32) (result i32)
        local.get 0
        i32.load)
    (func (export "load_f64") (param i32) (result f64)
        local.get 0
        f64.load)
    (func (export "store_i32") (param i32 i32)
        local.get 0
        local.get 1
        i32.store)
    (func (export "store_u8") (param i32 i32)
        local.get 0
        local.get 1
        i32.store8)

    {body}
)"#
    )
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn instance(imports: &str, body: &str) -> BridgeInstance<MemHost> {
    instance_with(MemHost::default(), BridgeConfig::default(), imports, body)
}

pub fn instance_on(surface: SurfaceConfig, imports: &str, body: &str) -> BridgeInstance<MemHost> {
    instance_with(MemHost::new(surface), BridgeConfig::default(), imports, body)
}

pub fn instance_with(host: MemHost, config: BridgeConfig, imports: &str, body: &str) -> BridgeInstance<MemHost> {
    init_tracing();
    let bridge = Bridge::new(guest_module(imports, body), config).expect("guest should compile");
    let mut instance = bridge.instantiate(host).expect("guest should instantiate");
    instance.start().expect("bridge_start should succeed");
    instance
}

// ── Raw memory access through the guest ──

pub fn load_i32(instance: &mut BridgeInstance<MemHost>, addr: i32) -> i32 {
    instance.call::<i32, i32>("load_i32", addr).unwrap()
}

pub fn load_f64(instance: &mut BridgeInstance<MemHost>, addr: i32) -> f64 {
    instance.call::<i32, f64>("load_f64", addr).unwrap()
}

pub fn store_i32(instance: &mut BridgeInstance<MemHost>, addr: i32, value: i32) {
    instance.call::<(i32, i32), ()>("store_i32", (addr, value)).unwrap()
}

pub fn store_bytes(instance: &mut BridgeInstance<MemHost>, addr: i32, bytes: &[u8]) {
    for (i, b) in bytes.iter().enumerate() {
        instance
            .call::<(i32, i32), ()>("store_u8", (addr + i as i32, *b as i32))
            .unwrap();
    }
}

/// Copy `text` into guest memory, returning `(ptr, len)` as ABI values.
pub fn pass(instance: &mut BridgeInstance<MemHost>, text: &str) -> (i32, i32) {
    let (ptr, len) = instance.pass_string(text).unwrap();
    (ptr as i32, len as i32)
}

/// Decode the `[ptr, len]` string slot at `addr`. `None` for `[0, 0]`.
pub fn read_slot(instance: &mut BridgeInstance<MemHost>, addr: i32) -> Option<String> {
    let ptr = load_i32(instance, addr);
    let len = load_i32(instance, addr + 4);
    if ptr == 0 && len == 0 {
        return None;
    }
    Some(instance.read_string(ptr as u32, len as u32).unwrap())
}

/// Clone of the value behind a guest handle.
pub fn value(instance: &BridgeInstance<MemHost>, handle: i32) -> HostValue {
    instance
        .handles()
        .get(Handle::from_abi(handle))
        .cloned()
        .expect("handle should be live")
}
