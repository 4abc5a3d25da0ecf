//! Property tests for the string codec against a Vec-backed guest heap.

use hostbridge_primitives::codec::{decode_utf8, encode_string, utf16_len, GuestAllocator};
use proptest::prelude::*;

/// Bump heap whose `realloc` always moves and poisons the old region.
struct Heap {
    mem: Vec<u8>,
    bump: u32,
}

impl Heap {
    fn new() -> Self {
        Self { mem: vec![0; 64], bump: 8 }
    }

    fn reserve(&mut self, size: u32) -> u32 {
        let ptr = self.bump;
        self.bump += size.max(1);
        if self.mem.len() < self.bump as usize {
            self.mem.resize(self.bump as usize, 0);
        }
        ptr
    }
}

impl GuestAllocator for Heap {
    type Error = std::convert::Infallible;

    fn malloc(&mut self, size: u32) -> Result<u32, Self::Error> {
        Ok(self.reserve(size))
    }

    fn realloc(&mut self, ptr: u32, old: u32, new: u32) -> Result<u32, Self::Error> {
        let dst = self.reserve(new);
        let keep = old.min(new) as usize;
        let src = ptr as usize;
        self.mem.copy_within(src..src + keep, dst as usize);
        self.mem[src..src + old as usize].fill(0xAA);
        Ok(dst)
    }

    fn write(&mut self, ptr: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let start = ptr as usize;
        self.mem[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

fn round_trip(text: &str) -> String {
    let mut heap = Heap::new();
    let (ptr, len) = encode_string(&mut heap, text).unwrap();
    decode_utf8(&heap.mem[ptr as usize..(ptr + len) as usize]).unwrap()
}

proptest! {
    #[test]
    fn round_trips_any_text(text in any::<String>()) {
        prop_assert_eq!(round_trip(&text), text);
    }

    #[test]
    fn round_trips_ascii(text in "[ -~]{0,300}") {
        prop_assert_eq!(round_trip(&text), text);
    }

    #[test]
    fn ascii_prefix_then_one_multibyte(prefix in "[a-zA-Z0-9_]{0,1024}", tail in any::<char>()) {
        let text = format!("{prefix}{tail}");
        let mut heap = Heap::new();
        let (ptr, len) = encode_string(&mut heap, &text).unwrap();
        let bytes = &heap.mem[ptr as usize..(ptr + len) as usize];
        prop_assert_eq!(&bytes[..prefix.len()], prefix.as_bytes());
        prop_assert_eq!(len as usize, text.len());
        prop_assert!(text.len() <= prefix.len() + 3 * utf16_len(&tail.to_string()));
    }

    #[test]
    fn decode_rejects_what_std_rejects(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        prop_assert_eq!(decode_utf8(&bytes).is_ok(), std::str::from_utf8(&bytes).is_ok());
    }
}
