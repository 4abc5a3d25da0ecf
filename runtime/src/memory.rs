//! Safe WASM linear memory read/write helpers with bounds checking.
//!
//! All functions validate pointer and length arguments against the guest's
//! linear memory size before accessing. Out-of-bounds access returns
//! `ERR_BAD_POINTER`.

use wasmtime::{AsContext, Memory};

use hostbridge_hostapi::HostError;
use hostbridge_primitives::BufferIdentity;

/// Read `len` bytes from guest memory at `ptr`.
///
/// Returns `Err(BadPointer)` if the range `[ptr, ptr+len)` is out of bounds.
pub fn read_bytes(mem: &[u8], ptr: i32, len: i32) -> Result<Vec<u8>, HostError> {
    validate_range(mem.len(), ptr, len)?;
    let start = ptr as usize;
    Ok(mem[start..start + len as usize].to_vec())
}

/// Write `data` bytes to guest memory at `ptr`.
///
/// Returns `Err(BadPointer)` if the range `[ptr, ptr+data.len())` is out of bounds.
pub fn write_bytes(mem: &mut [u8], ptr: i32, data: &[u8]) -> Result<(), HostError> {
    let len = i32::try_from(data.len()).map_err(|_| HostError::bad_pointer())?;
    validate_range(mem.len(), ptr, len)?;
    let start = ptr as usize;
    mem[start..start + data.len()].copy_from_slice(data);
    Ok(())
}

/// Read an i32 value (little-endian) from guest memory at `ptr`.
pub fn read_i32(mem: &[u8], ptr: i32) -> Result<i32, HostError> {
    let bytes = read_bytes(mem, ptr, 4)?;
    Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Write an i32 value (little-endian) to guest memory at `ptr`.
pub fn write_i32(mem: &mut [u8], ptr: i32, value: i32) -> Result<(), HostError> {
    write_bytes(mem, ptr, &value.to_le_bytes())
}

/// Read an f64 value (little-endian) from guest memory at `ptr`.
pub fn read_f64(mem: &[u8], ptr: i32) -> Result<f64, HostError> {
    let bytes = read_bytes(mem, ptr, 8)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes);
    Ok(f64::from_le_bytes(raw))
}

/// Write an f64 value (little-endian) to guest memory at `ptr`.
pub fn write_f64(mem: &mut [u8], ptr: i32, value: f64) -> Result<(), HostError> {
    write_bytes(mem, ptr, &value.to_le_bytes())
}

/// Read `count` consecutive f32 values starting at `ptr`.
pub fn read_f32s(mem: &[u8], ptr: i32, count: i32) -> Result<Vec<f32>, HostError> {
    let len = count.checked_mul(4).ok_or_else(HostError::bad_pointer)?;
    let bytes = read_bytes(mem, ptr, len)?;
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Validate that a pointer range `[ptr, ptr+len)` is within memory bounds.
pub fn validate_range(mem_size: usize, ptr: i32, len: i32) -> Result<(), HostError> {
    if ptr < 0 || len < 0 {
        return Err(HostError::bad_pointer());
    }
    let end = (ptr as usize)
        .checked_add(len as usize)
        .ok_or_else(HostError::bad_pointer)?;
    if end > mem_size {
        return Err(HostError::bad_pointer());
    }
    Ok(())
}

/// Identity of the buffer currently backing `memory`.
pub fn identity_of(memory: &Memory, store: impl AsContext) -> BufferIdentity {
    let store = store.as_context();
    BufferIdentity {
        base: memory.data_ptr(&store) as usize,
        len: memory.data_size(&store),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bytes_basic() {
        let mem = vec![10, 20, 30, 40, 50];
        let result = read_bytes(&mem, 1, 3).unwrap();
        assert_eq!(result, vec![20, 30, 40]);
    }

    #[test]
    fn test_read_bytes_out_of_bounds() {
        let mem = vec![10, 20, 30];
        assert!(read_bytes(&mem, 1, 3).is_err());
        assert!(read_bytes(&mem, -1, 1).is_err());
        assert!(read_bytes(&mem, 0, -1).is_err());
    }

    #[test]
    fn test_write_bytes_out_of_bounds() {
        let mut mem = vec![0; 4];
        assert_eq!(
            write_bytes(&mut mem, 2, &[1, 2, 3]).unwrap_err(),
            HostError::bad_pointer()
        );
        assert_eq!(mem, vec![0; 4]);
    }

    #[test]
    fn test_read_write_i32() {
        let mut mem = vec![0; 16];
        write_i32(&mut mem, 4, 0x12345678).unwrap();
        assert_eq!(read_i32(&mem, 4).unwrap(), 0x12345678);
        assert_eq!(mem[4], 0x78);
    }

    #[test]
    fn test_read_write_f64() {
        let mut mem = vec![0; 16];
        write_f64(&mut mem, 8, -2.5).unwrap();
        assert_eq!(read_f64(&mem, 8).unwrap(), -2.5);
        assert!(write_f64(&mut mem, 9, 1.0).is_err());
    }

    #[test]
    fn test_read_f32s() {
        let mut mem = vec![0; 12];
        mem[0..4].copy_from_slice(&1.0f32.to_le_bytes());
        mem[4..8].copy_from_slice(&0.5f32.to_le_bytes());
        assert_eq!(read_f32s(&mem, 0, 2).unwrap(), vec![1.0, 0.5]);
        assert!(read_f32s(&mem, 0, 4).is_err());
        assert!(read_f32s(&mem, 0, i32::MAX).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range(100, 0, 100).is_ok());
        assert!(validate_range(100, 0, 101).is_err());
        assert!(validate_range(100, -1, 1).is_err());
        assert!(validate_range(100, 50, -1).is_err());
    }
}
