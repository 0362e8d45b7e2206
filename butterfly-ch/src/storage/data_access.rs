//! Flat u32 segment backing the node and edge tables
//!
//! Segment file format (little-endian):
//!
//! Header (16 bytes):
//!   magic:     u32 = 0x42465347  // "BFSG"
//!   version:   u16 = 1
//!   reserved:  u16 = 0
//!   count:     u64 = number of u32 slots in the body
//!
//! Body:
//!   slots[count]  u32
//!
//! Footer (8 bytes):
//!   body_xxh3: u64

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use butterfly_common::{Error, Result};
use xxhash_rust::xxh3::Xxh3;

const MAGIC: u32 = 0x42465347; // "BFSG"
const VERSION: u16 = 1;
const HEADER_SIZE: usize = 16;
const MIN_SLOTS: usize = 64;

/// Growable array of u32 slots addressed by index
#[derive(Debug, Clone)]
pub struct DataAccess {
    name: String,
    fill: u32,
    slots: Vec<u32>,
}

impl DataAccess {
    /// Create an empty segment; slots added by growth are set to `fill`
    pub fn new(name: impl Into<String>, fill: u32) -> Self {
        Self {
            name: name.into(),
            fill,
            slots: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of addressable slots
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Allocated bytes
    pub fn capacity_bytes(&self) -> u64 {
        (self.slots.capacity() * std::mem::size_of::<u32>()) as u64
    }

    /// Make at least `slots` slots addressable, doubling the current size at minimum.
    /// Existing content is preserved.
    pub fn ensure_capacity(&mut self, slots: usize) -> Result<()> {
        if slots <= self.slots.len() {
            return Ok(());
        }

        let target = slots.max(self.slots.len() * 2).max(MIN_SLOTS);
        let additional = target - self.slots.len();
        self.slots
            .try_reserve_exact(additional)
            .map_err(|_| Error::AllocationFailed {
                segment: self.name.clone(),
                bytes: (target * std::mem::size_of::<u32>()) as u64,
            })?;
        self.slots.resize(target, self.fill);
        Ok(())
    }

    #[inline]
    pub fn get(&self, index: usize) -> u32 {
        self.slots[index]
    }

    #[inline]
    pub fn set(&mut self, index: usize, value: u32) {
        self.slots[index] = value;
    }

    /// Release all memory
    pub fn clear(&mut self) {
        self.slots = Vec::new();
    }

    /// Write the first `used` slots to `path`
    pub fn write_to(&self, path: &Path, used: usize) -> Result<()> {
        let used = used.min(self.slots.len());
        let mut writer = BufWriter::new(File::create(path)?);

        let mut header = Vec::with_capacity(HEADER_SIZE);
        header.extend_from_slice(&MAGIC.to_le_bytes());
        header.extend_from_slice(&VERSION.to_le_bytes());
        header.extend_from_slice(&0u16.to_le_bytes());
        header.extend_from_slice(&(used as u64).to_le_bytes());
        writer.write_all(&header)?;

        let mut digest = Xxh3::new();
        for &slot in &self.slots[..used] {
            let bytes = slot.to_le_bytes();
            writer.write_all(&bytes)?;
            digest.update(&bytes);
        }

        writer.write_all(&digest.digest().to_le_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Replace the content with the segment stored at `path`
    pub fn read_from(&mut self, path: &Path) -> Result<()> {
        let mut reader = BufReader::new(File::open(path)?);

        let mut header = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header)?;

        let magic = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        if magic != MAGIC {
            return Err(self.corrupt(format!(
                "invalid magic: expected 0x{MAGIC:08x}, got 0x{magic:08x}"
            )));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(self.corrupt(format!("unsupported version {version}")));
        }

        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&header[8..16]);
        let count = u64::from_le_bytes(count_bytes);
        let count = usize::try_from(count).map_err(|_| Error::CapacityExceeded {
            segment: self.name.clone(),
            requested: count,
        })?;

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(count)
            .map_err(|_| Error::AllocationFailed {
                segment: self.name.clone(),
                bytes: (count * std::mem::size_of::<u32>()) as u64,
            })?;

        let mut digest = Xxh3::new();
        let mut buf = [0u8; 4];
        for _ in 0..count {
            reader.read_exact(&mut buf)?;
            digest.update(&buf);
            slots.push(u32::from_le_bytes(buf));
        }

        let mut footer = [0u8; 8];
        reader.read_exact(&mut footer)?;
        let stored = u64::from_le_bytes(footer);
        let computed = digest.digest();
        if stored != computed {
            return Err(self.corrupt(format!(
                "checksum mismatch: stored 0x{stored:016x}, computed 0x{computed:016x}"
            )));
        }

        self.slots = slots;
        Ok(())
    }

    fn corrupt(&self, reason: String) -> Error {
        Error::CorruptSegment {
            segment: self.name.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_growth_preserves_content_and_fills() {
        let mut da = DataAccess::new("test", u32::MAX);
        da.ensure_capacity(10).unwrap();
        assert!(da.len() >= 10);
        da.set(3, 42);

        let old_len = da.len();
        da.ensure_capacity(old_len + 1).unwrap();
        assert!(da.len() >= old_len * 2);
        assert_eq!(da.get(3), 42);
        assert_eq!(da.get(old_len), u32::MAX);
        assert_eq!(da.get(0), u32::MAX);
    }

    #[test]
    fn test_ensure_capacity_is_noop_when_large_enough() {
        let mut da = DataAccess::new("test", 0);
        da.ensure_capacity(100).unwrap();
        let len = da.len();
        da.ensure_capacity(50).unwrap();
        assert_eq!(da.len(), len);
    }

    #[test]
    fn test_write_read_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("segment");

        let mut da = DataAccess::new("edges", 7);
        da.ensure_capacity(5).unwrap();
        for i in 0..5 {
            da.set(i, (i * 10) as u32);
        }
        da.write_to(&path, 5).unwrap();

        let mut loaded = DataAccess::new("edges", 7);
        loaded.read_from(&path).unwrap();
        assert_eq!(loaded.len(), 5);
        assert_eq!(loaded.get(4), 40);
    }

    #[test]
    fn test_read_detects_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("segment");

        let mut da = DataAccess::new("nodes", 0);
        da.ensure_capacity(4).unwrap();
        da.set(1, 99);
        da.write_to(&path, 4).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[HEADER_SIZE + 4] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        let mut loaded = DataAccess::new("nodes", 0);
        let err = loaded.read_from(&path).unwrap_err();
        assert!(matches!(err, Error::CorruptSegment { .. }));
    }

    #[test]
    fn test_read_rejects_bad_magic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("segment");
        std::fs::write(&path, [0u8; 32]).unwrap();

        let mut loaded = DataAccess::new("nodes", 0);
        let err = loaded.read_from(&path).unwrap_err();
        assert!(err.to_string().contains("invalid magic"));
    }
}
