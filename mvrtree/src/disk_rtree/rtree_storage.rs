//! Disk storage layer for the multi-version R-Tree.
//!
//! The file is an array of `PAGE_SIZE` pages. Page 0 holds the
//! [`FileHeader`], every other page holds one node. A page is laid out as
//!
//! ```text
//! | bincode body, zero padded (PAGE_SIZE - 4) | CRC32 of the body (4, LE) |
//! ```
//!
//! Each read or write touches exactly one page; nothing is preloaded.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::rtree_constants::PAGE_SIZE;
use super::rtree_types::{FileHeader, IndexError, IndexResult, Node, PageId};

const HEADER_PAGE: PageId = 0;

const CHECKSUM_SIZE: usize = 4;

/// Bytes of a page available to the serialized body
const PAGE_BODY_SIZE: usize = PAGE_SIZE - CHECKSUM_SIZE;

/// Serialize `value` into a full page image with its trailing checksum.
fn encode_page<T: Serialize>(page_id: PageId, value: &T) -> IndexResult<Vec<u8>> {
    let mut bytes = bincode::serde::encode_to_vec(value, bincode::config::legacy())
        .map_err(|e| IndexError::Serialization(e.to_string()))?;

    if bytes.len() > PAGE_BODY_SIZE {
        return Err(IndexError::PageOverflow {
            page_id,
            size: bytes.len(),
            max: PAGE_BODY_SIZE,
        });
    }

    bytes.resize(PAGE_BODY_SIZE, 0);
    let crc = crc32fast::hash(&bytes);
    bytes.extend_from_slice(&crc.to_le_bytes());
    Ok(bytes)
}

/// Verify the checksum of a page image, then deserialize its body.
fn decode_page<T: DeserializeOwned>(page_id: PageId, page: &[u8]) -> IndexResult<T> {
    let (body, stored) = page.split_at(PAGE_BODY_SIZE);
    let mut crc = [0u8; CHECKSUM_SIZE];
    crc.copy_from_slice(stored);

    let expected = u32::from_le_bytes(crc);
    let actual = crc32fast::hash(body);
    if expected != actual {
        return Err(IndexError::Corrupted {
            page_id,
            expected,
            actual,
        });
    }

    bincode::serde::decode_from_slice(body, bincode::config::legacy())
        .map(|(value, _)| value)
        .map_err(|e| IndexError::Serialization(e.to_string()))
}

fn node_page(page_id: PageId) -> IndexResult<PageId> {
    if page_id == HEADER_PAGE {
        Err(IndexError::InvalidOperation(
            "Page 0 is reserved for the header".into(),
        ))
    } else {
        Ok(page_id)
    }
}

/// Handles reading/writing individual pages to disk.
///
/// The storage owns the file handle and closes it when dropped, after the
/// buffer and the tree layered on top of it are gone.
pub struct DiskStorage {
    file: RwLock<File>,
    path: PathBuf,
}

impl DiskStorage {
    /// Create a new storage file, truncating any existing one
    pub fn create(path: impl AsRef<Path>) -> IndexResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        log::debug!("Created index storage at {:?}", path);
        Ok(Self::with_file(file, path))
    }

    /// Open an existing storage file
    pub fn open(path: impl AsRef<Path>) -> IndexResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        log::debug!("Opened index storage at {:?}", path);
        Ok(Self::with_file(file, path))
    }

    fn with_file(file: File, path: &Path) -> Self {
        Self {
            file: RwLock::new(file),
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_raw(&self, page_id: PageId) -> IndexResult<Vec<u8>> {
        let mut page = vec![0u8; PAGE_SIZE];
        let mut file = self.file.write();
        file.seek(SeekFrom::Start(page_id * PAGE_SIZE as u64))?;
        file.read_exact(&mut page)?;
        Ok(page)
    }

    fn write_raw(&self, page_id: PageId, page: &[u8]) -> IndexResult<()> {
        let mut file = self.file.write();
        file.seek(SeekFrom::Start(page_id * PAGE_SIZE as u64))?;
        file.write_all(page)?;
        Ok(())
    }

    pub fn read_header(&self) -> IndexResult<FileHeader> {
        decode_page(HEADER_PAGE, &self.read_raw(HEADER_PAGE)?)
    }

    pub fn write_header(&self, header: &FileHeader) -> IndexResult<()> {
        self.write_raw(HEADER_PAGE, &encode_page(HEADER_PAGE, header)?)
    }

    /// Read a single node, verifying its checksum.
    pub fn read_page(&self, page_id: PageId) -> IndexResult<Node> {
        let page_id = node_page(page_id)?;
        decode_page(page_id, &self.read_raw(page_id)?)
    }

    /// Write a single node. Nodes that do not fit a page are rejected
    /// before the file is touched.
    pub fn write_page(&self, page_id: PageId, node: &Node) -> IndexResult<()> {
        let page_id = node_page(page_id)?;
        self.write_raw(page_id, &encode_page(page_id, node)?)
    }

    /// Sync file to disk
    pub fn sync(&self) -> IndexResult<()> {
        self.file.write().sync_all()?;
        Ok(())
    }
}

impl Drop for DiskStorage {
    fn drop(&mut self) {
        log::debug!("Releasing index storage at {:?}", self.path);
    }
}
