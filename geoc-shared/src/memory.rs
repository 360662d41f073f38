//! Views over the guest's linear memory.
//!
//! Linear memory can grow at any guest call, which invalidates every view
//! taken before the growth. Nothing here caches a view: each helper asks the
//! [`LinearMemory`] for the current buffer on every access.

use std::collections::BTreeMap;

use crate::error::{GeocError, Result};

/// Byte-addressed access to a guest module's memory.
pub trait LinearMemory {
    /// Current size in bytes.
    fn byte_len(&self) -> usize;

    /// Copy `[ptr, ptr + len)` out of memory.
    fn read(&self, ptr: u32, len: u32) -> Result<Vec<u8>>;

    /// Copy `bytes` into memory starting at `offset`.
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<()>;
}

/// Validate `[ptr, ptr + len)` against a memory of `size` bytes.
pub fn check_range(ptr: u32, len: u32, size: usize) -> Result<std::ops::Range<usize>> {
    let start = ptr as usize;
    let end = start
        .checked_add(len as usize)
        .filter(|end| *end <= size)
        .ok_or(GeocError::OutOfBounds { ptr, len, size })?;
    Ok(start..end)
}

pub fn read_bytes<M: LinearMemory + ?Sized>(memory: &M, ptr: u32, len: u32) -> Result<Vec<u8>> {
    memory.read(ptr, len)
}

/// Decode a UTF-8 string (log lines, shader sources, attribute names).
pub fn read_utf8<M: LinearMemory + ?Sized>(memory: &M, ptr: u32, len: u32) -> Result<String> {
    let bytes = memory.read(ptr, len)?;
    String::from_utf8(bytes).map_err(|_| GeocError::InvalidUtf8 { ptr, len })
}

/// Read `count` little-endian f32 values.
pub fn read_f32s<M: LinearMemory + ?Sized>(memory: &M, ptr: u32, count: u32) -> Result<Vec<f32>> {
    let bytes = memory.read(ptr, count.saturating_mul(4))?;
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Read `count` little-endian u32 values.
pub fn read_u32s<M: LinearMemory + ?Sized>(memory: &M, ptr: u32, count: u32) -> Result<Vec<u32>> {
    let bytes = memory.read(ptr, count.saturating_mul(4))?;
    Ok(bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Write an index array at `offset` and return the byte offset for use as a
/// pointer argument.
pub fn write_indices<M: LinearMemory + ?Sized>(memory: &mut M, offset: u32, indices: &[u32]) -> Result<u32> {
    let le: Vec<u32> = indices.iter().map(|i| i.to_le()).collect();
    memory.write(offset, bytemuck::cast_slice(&le))?;
    Ok(offset)
}

/// Plain byte vector standing in for linear memory on the native target.
#[derive(Debug, Clone, Default)]
pub struct VecMemory {
    bytes: Vec<u8>,
    writes: usize,
}

impl VecMemory {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
            writes: 0,
        }
    }

    /// Append zeroed bytes, as `memory.grow` would.
    pub fn grow(&mut self, additional: usize) {
        self.bytes.resize(self.bytes.len() + additional, 0);
    }

    /// Place bytes at `offset`, bypassing the write counter.
    pub fn load(&mut self, offset: usize, bytes: &[u8]) {
        self.bytes[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Number of `write` calls performed so far.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl LinearMemory for VecMemory {
    fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    fn read(&self, ptr: u32, len: u32) -> Result<Vec<u8>> {
        let range = check_range(ptr, len, self.bytes.len())?;
        Ok(self.bytes[range].to_vec())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<()> {
        let range = check_range(offset, bytes.len() as u32, self.bytes.len())?;
        self.bytes[range].copy_from_slice(bytes);
        self.writes += 1;
        Ok(())
    }
}

/// A region of linear memory reserved for one in-flight operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchLease {
    pub offset: u32,
    pub len: u32,
}

impl ScratchLease {
    /// Number of u32 slots in the lease.
    pub fn words(&self) -> u32 {
        self.len / 4
    }
}

/// Hands out disjoint regions from the trailing end of linear memory, so two
/// animation runs in flight never share index storage.
#[derive(Debug)]
pub struct ScratchArena {
    leases: BTreeMap<u32, u32>,
    limit: usize,
}

impl ScratchArena {
    pub fn new(limit_bytes: usize) -> Self {
        Self {
            leases: BTreeMap::new(),
            limit: limit_bytes,
        }
    }

    pub fn leased_bytes(&self) -> usize {
        self.leases.values().map(|len| *len as usize).sum()
    }

    pub fn active(&self) -> usize {
        self.leases.len()
    }

    /// Reserve room for `words` u32 values below the top of a memory of
    /// `memory_len` bytes, skipping regions already leased.
    pub fn lease(&mut self, memory_len: usize, words: usize) -> Result<ScratchLease> {
        let bytes = words * 4;
        let leased = self.leased_bytes();
        if bytes == 0 || leased + bytes > self.limit {
            return Err(GeocError::ScratchExhausted {
                requested: bytes,
                available: self.limit.saturating_sub(leased),
            });
        }

        let mut top = memory_len.min(u32::MAX as usize) & !3;
        for (&offset, &len) in self.leases.iter().rev() {
            let end = (offset + len) as usize;
            if top >= bytes && end <= top - bytes {
                break;
            }
            top = top.min(offset as usize);
        }
        if top < bytes {
            return Err(GeocError::ScratchExhausted {
                requested: bytes,
                available: top,
            });
        }

        let lease = ScratchLease {
            offset: (top - bytes) as u32,
            len: bytes as u32,
        };
        self.leases.insert(lease.offset, lease.len);
        Ok(lease)
    }

    pub fn release(&mut self, lease: ScratchLease) {
        self.leases.remove(&lease.offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── marshaling ──

    #[test]
    fn test_read_utf8_round_trip() {
        let mut mem = VecMemory::new(64);
        mem.load(8, "hello from zig".as_bytes());
        assert_eq!(read_utf8(&mem, 8, 14).unwrap(), "hello from zig");
    }

    #[test]
    fn test_read_utf8_rejects_invalid_bytes() {
        let mut mem = VecMemory::new(16);
        mem.load(0, &[0xff, 0xfe]);
        assert_eq!(
            read_utf8(&mem, 0, 2),
            Err(GeocError::InvalidUtf8 { ptr: 0, len: 2 })
        );
    }

    #[test]
    fn test_out_of_bounds_read() {
        let mem = VecMemory::new(16);
        assert!(matches!(
            read_bytes(&mem, 12, 8),
            Err(GeocError::OutOfBounds { ptr: 12, len: 8, size: 16 })
        ));
        assert!(read_bytes(&mem, u32::MAX, 2).is_err());
    }

    #[test]
    fn test_reads_see_growth() {
        let mut mem = VecMemory::new(8);
        assert!(read_bytes(&mem, 8, 4).is_err());
        mem.grow(8);
        assert_eq!(read_bytes(&mem, 8, 4).unwrap(), vec![0; 4]);
    }

    #[test]
    fn test_write_indices_little_endian() {
        let mut mem = VecMemory::new(32);
        let ptr = write_indices(&mut mem, 16, &[1, 0x0102_0304]).unwrap();
        assert_eq!(ptr, 16);
        assert_eq!(&mem.as_slice()[16..24], &[1, 0, 0, 0, 4, 3, 2, 1]);
        assert_eq!(read_u32s(&mem, 16, 2).unwrap(), vec![1, 0x0102_0304]);
    }

    #[test]
    fn test_read_f32s() {
        let mut mem = VecMemory::new(16);
        let floats = [1.5f32, -2.0];
        mem.load(4, bytemuck::cast_slice(&floats));
        assert_eq!(read_f32s(&mem, 4, 2).unwrap(), vec![1.5, -2.0]);
    }

    // ── scratch arena ──

    #[test]
    fn test_lease_takes_trailing_region() {
        let mut arena = ScratchArena::new(1024);
        let lease = arena.lease(4096, 3).unwrap();
        assert_eq!(lease, ScratchLease { offset: 4084, len: 12 });
        assert_eq!(lease.words(), 3);
    }

    #[test]
    fn test_concurrent_leases_are_disjoint() {
        let mut arena = ScratchArena::new(1024);
        let a = arena.lease(4096, 2).unwrap();
        let b = arena.lease(4096, 4).unwrap();
        assert_eq!(a.offset, 4088);
        assert_eq!(b.offset, 4072);
        assert!(b.offset + b.len <= a.offset);
        assert_eq!(arena.active(), 2);
    }

    #[test]
    fn test_released_gap_is_reused() {
        let mut arena = ScratchArena::new(1024);
        let a = arena.lease(4096, 2).unwrap();
        let _b = arena.lease(4096, 2).unwrap();
        arena.release(a);
        let c = arena.lease(4096, 2).unwrap();
        assert_eq!(c.offset, a.offset);
    }

    #[test]
    fn test_lease_after_growth_uses_new_top() {
        let mut arena = ScratchArena::new(1024);
        let a = arena.lease(4096, 2).unwrap();
        let b = arena.lease(8192, 2).unwrap();
        assert_eq!(b.offset, 8184);
        assert!(b.offset >= a.offset + a.len);
    }

    #[test]
    fn test_lease_limit() {
        let mut arena = ScratchArena::new(16);
        arena.lease(4096, 3).unwrap();
        assert!(matches!(
            arena.lease(4096, 2),
            Err(GeocError::ScratchExhausted { requested: 8, available: 4 })
        ));
        assert!(arena.lease(4096, 0).is_err());
    }
}
