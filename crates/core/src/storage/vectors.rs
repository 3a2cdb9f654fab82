//! Append-only memory-mapped vector store.
//!
//! File layout (all integers little-endian):
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ Header (24 bytes)                        │
//! │   magic: b"VOXVEC01"          (8 bytes)  │
//! │   dimension: u64              (8 bytes)  │
//! │   count: u64                  (8 bytes)  │
//! ├──────────────────────────────────────────┤
//! │ Vectors                                  │
//! │   count × dimension × 4 bytes of f32     │
//! └──────────────────────────────────────────┘
//! ```
//!
//! The file may be longer than the valid region; the header count is
//! authoritative and trailing reserved bytes are ignored on reopen.
//! Appends grow the file by 50% (or to the required size) and remap.
//! The returned id equals the pre-increment count, so ids are dense,
//! strictly increasing, and double as the chunk ids in the metadata
//! store.

use crate::config;
use crate::error::{Error, Result};
use crate::types::Vector;
use memmap2::MmapMut;
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Bytes 0–7 of every vector file.
const MAGIC: &[u8; 8] = b"VOXVEC01";

/// Fixed header size in bytes.
pub const HEADER_SIZE: u64 = 24;

const F32_BYTES: u64 = 4;

struct Inner {
    file: File,
    /// `None` only transiently during a resize; the mapping must be
    /// dropped before the file is truncated (Windows cannot grow a file
    /// with a live view, and a stale POSIX view would not cover the new
    /// bytes).
    map: Option<MmapMut>,
    count: u64,
}

/// Ordered, append-only persistence of equi-dimensional f32 vectors with
/// O(1) random access by id.
///
/// A single `RwLock` guards the mapping: `get` takes it shared and copies
/// the floats out, `append` takes it exclusive and performs any
/// resize+remap inside the critical section. No reference into the
/// mapped region outlives a lock guard.
pub struct VectorStore {
    path: PathBuf,
    dim: usize,
    inner: RwLock<Inner>,
}

impl VectorStore {
    /// Opens (or initializes) the vector file at `path` with the given
    /// dimension.
    ///
    /// An empty file gets a fresh header and is pre-grown to hold
    /// [`config::INITIAL_VECTOR_CAPACITY`] vectors. A non-empty file is
    /// validated: bad magic or a mismatched dimension is a fatal
    /// configuration error instructing the operator to delete the file.
    pub fn open(path: impl AsRef<Path>, dim: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if dim == 0 || dim > config::MAX_DIMENSION {
            return Err(Error::InvalidHeader(format!(
                "requested dimension {dim} out of range 1..={}",
                config::MAX_DIMENSION
            )));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        let len = file.metadata()?.len();

        let mut inner = Inner {
            file,
            map: None,
            count: 0,
        };

        if len == 0 {
            let initial =
                HEADER_SIZE + config::INITIAL_VECTOR_CAPACITY * dim as u64 * F32_BYTES;
            inner.file.set_len(initial)?;
            let mut map = unsafe { MmapMut::map_mut(&inner.file)? };
            write_header(&mut map, dim as u64, 0);
            inner.map = Some(map);
        } else {
            if len < HEADER_SIZE {
                return Err(Error::InvalidHeader(format!(
                    "file too small for header: {len} < {HEADER_SIZE} (delete {} to reset)",
                    path.display()
                )));
            }
            let map = unsafe { MmapMut::map_mut(&inner.file)? };
            let (disk_dim, disk_count) = read_header(&map, &path)?;
            if disk_dim != dim as u64 {
                return Err(Error::InvalidHeader(format!(
                    "dimension mismatch: file dim={disk_dim}, requested dim={dim} (delete {} to reset)",
                    path.display()
                )));
            }
            let valid_end = HEADER_SIZE + disk_count * dim as u64 * F32_BYTES;
            if valid_end > len {
                return Err(Error::InvalidHeader(format!(
                    "header count {disk_count} extends past end of file (delete {} to reset)",
                    path.display()
                )));
            }
            inner.count = disk_count;
            inner.map = Some(map);
        }

        tracing::info!(
            path = %path.display(),
            dim,
            count = inner.count,
            "vector store opened"
        );

        Ok(Self {
            path,
            dim,
            inner: RwLock::new(inner),
        })
    }

    /// The store's fixed vector dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of vectors currently stored.
    pub fn count(&self) -> u64 {
        self.inner.read().count
    }

    /// Appends a vector and returns its id (the pre-increment count).
    ///
    /// Grows the file to `max(1.5 × current, required)` bytes when the
    /// next slot does not fit in the current mapping.
    pub fn append(&self, vector: &[f32]) -> Result<u64> {
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                got: vector.len(),
            });
        }

        let mut inner = self.inner.write();
        let count = inner.count;
        let row_bytes = self.dim as u64 * F32_BYTES;
        let required = HEADER_SIZE + (count + 1) * row_bytes;

        let mapped_len = inner
            .map
            .as_ref()
            .map(|m| m.len() as u64)
            .expect("mapping is live outside resize");
        if required > mapped_len {
            let new_size = (mapped_len + mapped_len / 2).max(required);
            // Unmap before truncating, then remap the full new length.
            inner.map = None;
            inner.file.set_len(new_size)?;
            let mut map = unsafe { MmapMut::map_mut(&inner.file)? };
            write_header(&mut map, self.dim as u64, count);
            inner.map = Some(map);
            tracing::debug!(new_size, "vector file grown");
        }

        let offset = (HEADER_SIZE + count * row_bytes) as usize;
        let map = inner
            .map
            .as_mut()
            .expect("mapping is live outside resize");
        for (i, v) in vector.iter().enumerate() {
            let dst = offset + i * F32_BYTES as usize;
            map[dst..dst + 4].copy_from_slice(&v.to_le_bytes());
        }
        map[16..24].copy_from_slice(&(count + 1).to_le_bytes());
        inner.count = count + 1;

        Ok(count)
    }

    /// Reads the vector stored at `id`, copying it out of the mapping.
    pub fn get(&self, id: u64) -> Result<Vector> {
        let inner = self.inner.read();
        if id >= inner.count {
            return Err(Error::VectorOutOfRange {
                id,
                count: inner.count,
            });
        }
        let map = inner
            .map
            .as_ref()
            .expect("mapping is live outside resize");
        let offset = (HEADER_SIZE + id * self.dim as u64 * F32_BYTES) as usize;
        let mut out = Vec::with_capacity(self.dim);
        let mut buf = [0u8; 4];
        for i in 0..self.dim {
            let src = offset + i * F32_BYTES as usize;
            buf.copy_from_slice(&map[src..src + 4]);
            out.push(f32::from_le_bytes(buf));
        }
        Ok(out)
    }

    /// Flushes dirty pages of the mapping to disk.
    pub fn flush(&self) -> Result<()> {
        if let Some(map) = self.inner.read().map.as_ref() {
            map.flush()?;
        }
        Ok(())
    }
}

impl Drop for VectorStore {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

fn write_header(map: &mut MmapMut, dim: u64, count: u64) {
    map[0..8].copy_from_slice(MAGIC);
    map[8..16].copy_from_slice(&dim.to_le_bytes());
    map[16..24].copy_from_slice(&count.to_le_bytes());
}

fn read_header(map: &[u8], path: &Path) -> Result<(u64, u64)> {
    if &map[0..8] != MAGIC {
        return Err(Error::InvalidHeader(format!(
            "magic mismatch (delete {} to reset)",
            path.display()
        )));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&map[8..16]);
    let dim = u64::from_le_bytes(buf);
    buf.copy_from_slice(&map[16..24]);
    let count = u64::from_le_bytes(buf);
    if dim == 0 {
        return Err(Error::InvalidHeader(format!(
            "dim=0 (delete {} to reset)",
            path.display()
        )));
    }
    Ok((dim, count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_path(dir: &TempDir) -> PathBuf {
        dir.path().join("vectors.bin")
    }

    #[test]
    fn append_assigns_sequential_ids() {
        let dir = TempDir::new().unwrap();
        let store = VectorStore::open(store_path(&dir), 2).unwrap();

        assert_eq!(store.append(&[1.0, 2.0]).unwrap(), 0);
        assert_eq!(store.append(&[3.0, 4.0]).unwrap(), 1);
        assert_eq!(store.count(), 2);

        assert_eq!(store.get(0).unwrap(), vec![1.0, 2.0]);
        assert_eq!(store.get(1).unwrap(), vec![3.0, 4.0]);
    }

    #[test]
    fn get_out_of_range_fails() {
        let dir = TempDir::new().unwrap();
        let store = VectorStore::open(store_path(&dir), 2).unwrap();
        store.append(&[1.0, 2.0]).unwrap();

        assert!(matches!(
            store.get(1),
            Err(Error::VectorOutOfRange { id: 1, count: 1 })
        ));
    }

    #[test]
    fn append_rejects_wrong_length() {
        let dir = TempDir::new().unwrap();
        let store = VectorStore::open(store_path(&dir), 3).unwrap();

        assert!(matches!(
            store.append(&[1.0, 2.0]),
            Err(Error::DimensionMismatch {
                expected: 3,
                got: 2
            })
        ));
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn reopen_preserves_count_and_values() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);

        {
            let store = VectorStore::open(&path, 2).unwrap();
            store.append(&[1.0, 2.0]).unwrap();
            store.append(&[3.0, 4.0]).unwrap();
        }

        let store = VectorStore::open(&path, 2).unwrap();
        assert_eq!(store.count(), 2);
        assert_eq!(store.get(1).unwrap(), vec![3.0, 4.0]);
    }

    #[test]
    fn reopen_with_different_dim_fails_and_leaves_file_intact() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);

        {
            let store = VectorStore::open(&path, 2).unwrap();
            store.append(&[1.0, 2.0]).unwrap();
        }
        let before = std::fs::read(&path).unwrap();

        assert!(matches!(
            VectorStore::open(&path, 3),
            Err(Error::InvalidHeader(_))
        ));
        assert_eq!(std::fs::read(&path).unwrap(), before);

        // Original dimension still opens.
        let store = VectorStore::open(&path, 2).unwrap();
        assert_eq!(store.get(0).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn bad_magic_fails() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        std::fs::write(&path, b"NOTAVECFILE_____________").unwrap();

        assert!(matches!(
            VectorStore::open(&path, 2),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn header_is_little_endian_on_disk() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);

        let store = VectorStore::open(&path, 2).unwrap();
        store.append(&[0.5, -1.5]).unwrap();
        store.flush().unwrap();

        let raw = std::fs::read(&path).unwrap();
        assert_eq!(&raw[0..8], b"VOXVEC01");
        assert_eq!(u64::from_le_bytes(raw[8..16].try_into().unwrap()), 2);
        assert_eq!(u64::from_le_bytes(raw[16..24].try_into().unwrap()), 1);
        assert_eq!(
            f32::from_le_bytes(raw[24..28].try_into().unwrap()),
            0.5
        );
    }

    #[test]
    fn grows_past_initial_capacity() {
        let dir = TempDir::new().unwrap();
        let store = VectorStore::open(store_path(&dir), 2).unwrap();

        // Initial file holds 1024 vectors; appending past it forces at
        // least one unmap + truncate + remap cycle.
        for i in 0..1500u64 {
            let v = [i as f32, (i * 2) as f32];
            assert_eq!(store.append(&v).unwrap(), i);
        }
        assert_eq!(store.count(), 1500);
        assert_eq!(store.get(0).unwrap(), vec![0.0, 0.0]);
        assert_eq!(store.get(1024).unwrap(), vec![1024.0, 2048.0]);
        assert_eq!(store.get(1499).unwrap(), vec![1499.0, 2998.0]);
    }

    #[test]
    fn values_round_trip_bit_exactly() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        let v = vec![f32::MIN_POSITIVE, -0.0, 1.0e-38, 3.4e38];

        {
            let store = VectorStore::open(&path, 4).unwrap();
            store.append(&v).unwrap();
        }
        let store = VectorStore::open(&path, 4).unwrap();
        let got = store.get(0).unwrap();
        for (a, b) in v.iter().zip(got.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }
}
