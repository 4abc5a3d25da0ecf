//! String codec across the linear-memory boundary.
//!
//! Decoding is strict: a byte range that is not valid UTF-8 fails as a whole,
//! there is no lossy substitution.
//!
//! Encoding writes into a guest-allocated buffer in two phases. The buffer
//! is first sized to the string's UTF-16 length and ASCII bytes are copied
//! straight in. At the first non-ASCII byte the buffer is reallocated to
//! `prefix + 3 * utf16_len(rest)` bytes (the worst-case UTF-8 expansion of a
//! UTF-16 code unit) and the remainder is written after the untouched prefix.

use alloc::borrow::ToOwned;
use alloc::string::String;

use crate::error::CodecError;

/// Allocation and write access to guest memory.
///
/// `write` must re-acquire the guest's memory on every call: `malloc` and
/// `realloc` run guest code that may grow (and so move) linear memory.
pub trait GuestAllocator {
    type Error;

    /// Allocate `size` bytes in guest memory.
    fn malloc(&mut self, size: u32) -> Result<u32, Self::Error>;

    /// Resize an allocation, preserving the first `min(old_size, new_size)` bytes.
    fn realloc(&mut self, ptr: u32, old_size: u32, new_size: u32) -> Result<u32, Self::Error>;

    /// Copy `bytes` into guest memory at `ptr`.
    fn write(&mut self, ptr: u32, bytes: &[u8]) -> Result<(), Self::Error>;
}

/// Borrow `bytes` as a UTF-8 string.
pub fn decode_str(bytes: &[u8]) -> Result<&str, CodecError> {
    core::str::from_utf8(bytes).map_err(|e| CodecError::InvalidUtf8 {
        valid_up_to: e.valid_up_to(),
    })
}

/// Decode `bytes` read from guest memory into an owned string.
pub fn decode_utf8(bytes: &[u8]) -> Result<String, CodecError> {
    decode_str(bytes).map(ToOwned::to_owned)
}

/// Number of UTF-16 code units in `text`.
pub fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// Encode `text` into a fresh guest buffer and return `(ptr, len)`.
///
/// The returned allocation is exactly `len` bytes long, so the guest can free
/// it with the pair it receives. Empty strings yield `(0, 0)` without
/// allocating.
pub fn encode_string<A: GuestAllocator>(alloc: &mut A, text: &str) -> Result<(u32, u32), A::Error> {
    if text.is_empty() {
        return Ok((0, 0));
    }

    let bytes = text.as_bytes();
    let mut capacity = utf16_len(text) as u32;
    let mut ptr = alloc.malloc(capacity)?;

    let ascii_len = bytes.iter().position(|b| !b.is_ascii()).unwrap_or(bytes.len());
    alloc.write(ptr, &bytes[..ascii_len])?;

    if ascii_len == bytes.len() {
        return Ok((ptr, ascii_len as u32));
    }

    // Everything before `ascii_len` is ASCII, so it is a char boundary.
    let rest = &text[ascii_len..];
    let grown = (ascii_len + utf16_len(rest) * 3) as u32;
    ptr = alloc.realloc(ptr, capacity, grown)?;
    capacity = grown;
    alloc.write(ptr + ascii_len as u32, rest.as_bytes())?;

    let written = bytes.len() as u32;
    if written < capacity {
        ptr = alloc.realloc(ptr, capacity, written)?;
    }
    Ok((ptr, written))
}
