//! Guest allocation backed by the instance's own `bridge_malloc` and
//! `bridge_realloc` exports.

use wasmtime::AsContextMut;

use hostbridge_hostapi::HostError;
use hostbridge_primitives::{encode_string, GuestAllocator};

use crate::error::BridgeError;
use crate::host_impl::GuestExports;

/// [`GuestAllocator`] over a store or caller.
///
/// Every `write` goes through [`wasmtime::Memory::write`], which looks up
/// the current buffer, so a `malloc` that grew memory is never observed
/// through an old slice.
pub struct StoreAllocator<'a, S> {
    store: S,
    exports: &'a GuestExports,
}

impl<'a, S: AsContextMut> StoreAllocator<'a, S> {
    pub fn new(store: S, exports: &'a GuestExports) -> Self {
        Self { store, exports }
    }
}

impl<S: AsContextMut> GuestAllocator for StoreAllocator<'_, S> {
    type Error = BridgeError;

    fn malloc(&mut self, size: u32) -> Result<u32, BridgeError> {
        let ptr = self.exports.malloc.call(&mut self.store, size as i32)?;
        Ok(ptr as u32)
    }

    fn realloc(&mut self, ptr: u32, old_size: u32, new_size: u32) -> Result<u32, BridgeError> {
        let ptr = self
            .exports
            .realloc
            .call(&mut self.store, (ptr as i32, old_size as i32, new_size as i32))?;
        Ok(ptr as u32)
    }

    fn write(&mut self, ptr: u32, bytes: &[u8]) -> Result<(), BridgeError> {
        self.exports
            .memory
            .write(&mut self.store, ptr as usize, bytes)
            .map_err(|_| HostError::bad_pointer())?;
        Ok(())
    }
}

/// Copy `text` into a fresh guest allocation and return `(ptr, len)`.
pub fn pass_string<S: AsContextMut>(
    store: S,
    exports: &GuestExports,
    text: &str,
) -> Result<(u32, u32), BridgeError> {
    let mut alloc = StoreAllocator::new(store, exports);
    encode_string(&mut alloc, text)
}
