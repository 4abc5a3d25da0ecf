//! ABI constants shared by the host runtime and guests.

/// Version of the import/export surface. Bumped on any signature change.
pub const ABI_VERSION: u32 = 1;

/// WASM import module under which every host binding is registered.
pub const IMPORT_MODULE: &str = "hostbridge";

/// Name of the guest's exported linear memory.
pub const EXPORT_MEMORY: &str = "memory";

/// `bridge_malloc(size) -> ptr`
pub const EXPORT_MALLOC: &str = "bridge_malloc";

/// `bridge_realloc(ptr, old_size, new_size) -> ptr`
pub const EXPORT_REALLOC: &str = "bridge_realloc";

/// Optional `bridge_start()` entry point, run once after instantiation.
pub const EXPORT_START: &str = "bridge_start";

/// Optional `bridge_invoke_closure(data, vtable, arg_handle)`.
pub const EXPORT_INVOKE_CLOSURE: &str = "bridge_invoke_closure";

/// Optional `bridge_drop_closure(dtor, data, vtable)`.
pub const EXPORT_DROP_CLOSURE: &str = "bridge_drop_closure";

// ── Sentinel handles ──
//
// The low handles are reserved and never recycled. `HANDLE_NONE` is what a
// binding returns for an absent object; it resolves to `undefined`.

pub const HANDLE_NONE: u32 = 0;
pub const HANDLE_UNDEFINED: u32 = 1;
pub const HANDLE_NULL: u32 = 2;
pub const HANDLE_TRUE: u32 = 3;
pub const HANDLE_FALSE: u32 = 4;

/// Number of reserved sentinel slots at the bottom of every handle table.
pub const RESERVED_HANDLES: u32 = 5;

/// `boolean_get` result for a value that is not a boolean.
pub const BOOLEAN_ABSENT: i32 = 2;

/// Size in bytes of a `[ptr: i32, len: i32]` string out-slot.
pub const STRING_SLOT_SIZE: i32 = 8;

/// Size in bytes of a `[is_some: i32, pad: i32, value: f64]` number out-slot.
pub const NUMBER_SLOT_SIZE: i32 = 16;

/// WebAssembly page size.
pub const WASM_PAGE_SIZE: usize = 65536;
