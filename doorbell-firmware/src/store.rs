//! Flash-backed asset store
//!
//! Uses sequential-storage for a wear-leveled key-value map in the last
//! 512KB of flash. A file is split into chunks keyed by a hash of its
//! path and the chunk index; a header item records the length and CRC of
//! the whole file and is written last.

use alloc::vec::Vec;

use embassy_rp::flash::{Async, Flash};
use embassy_rp::peripherals::FLASH;
use sequential_storage::cache::NoCache;
use sequential_storage::map::{self, Key, SerializationError};

use doorbell_core::traits::{Storage, StorageError};

/// Flash storage configuration
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;
pub const STORE_PARTITION_SIZE: usize = 512 * 1024;
pub const STORE_PARTITION_START: usize = FLASH_SIZE - STORE_PARTITION_SIZE;

/// Flash range for the asset store
pub const STORE_RANGE: core::ops::Range<u32> = (STORE_PARTITION_START as u32)..(FLASH_SIZE as u32);

/// Bytes per stored chunk
const CHUNK_SIZE: usize = 1024;

/// Largest file the store accepts
pub const MAX_FILE_SIZE: usize = 128 * 1024;

/// Chunk index of the header item
const HEADER: u16 = u16::MAX;

/// Header item: length and CRC-32, little endian
const HEADER_LEN: usize = 8;

/// Scratch space for one item plus its key and framing
const ITEM_BUFFER: usize = CHUNK_SIZE + 32;

/// Map key: path hash and chunk index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChunkKey {
    path: u32,
    index: u16,
}

impl ChunkKey {
    fn new(path: &str, index: u16) -> Self {
        Self {
            path: crc32fast::hash(path.as_bytes()),
            index,
        }
    }
}

impl Key for ChunkKey {
    fn serialize_into(&self, buffer: &mut [u8]) -> Result<usize, SerializationError> {
        if buffer.len() < 6 {
            return Err(SerializationError::BufferTooSmall);
        }
        buffer[..4].copy_from_slice(&self.path.to_le_bytes());
        buffer[4..6].copy_from_slice(&self.index.to_le_bytes());
        Ok(6)
    }

    fn deserialize_from(buffer: &[u8]) -> Result<(Self, usize), SerializationError> {
        if buffer.len() < 6 {
            return Err(SerializationError::BufferTooSmall);
        }
        let path = u32::from_le_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]);
        let index = u16::from_le_bytes([buffer[4], buffer[5]]);
        Ok((Self { path, index }, 6))
    }
}

fn storage_error<E>(error: sequential_storage::Error<E>) -> StorageError {
    match error {
        sequential_storage::Error::FullStorage => StorageError::Full,
        sequential_storage::Error::Corrupted { .. } => StorageError::Corrupted,
        _ => StorageError::Io,
    }
}

/// Whole-file store on the flash partition
pub struct FlashStore<'d> {
    flash: Flash<'d, FLASH, Async, FLASH_SIZE>,
}

impl<'d> FlashStore<'d> {
    pub fn new(flash: Flash<'d, FLASH, Async, FLASH_SIZE>) -> Self {
        Self { flash }
    }

    async fn fetch(&mut self, key: ChunkKey, out: &mut Vec<u8>) -> Result<(), StorageError> {
        let mut data_buffer = [0u8; ITEM_BUFFER];

        let item = map::fetch_item::<ChunkKey, &[u8], _>(
            &mut self.flash,
            STORE_RANGE,
            &mut NoCache::new(),
            &mut data_buffer,
            &key,
        )
        .await
        .map_err(storage_error)?;

        match item {
            Some(data) => {
                out.extend_from_slice(data);
                Ok(())
            }
            None => Err(StorageError::NotFound),
        }
    }

    async fn store(&mut self, key: ChunkKey, data: &[u8]) -> Result<(), StorageError> {
        let mut data_buffer = [0u8; ITEM_BUFFER];

        map::store_item(
            &mut self.flash,
            STORE_RANGE,
            &mut NoCache::new(),
            &mut data_buffer,
            &key,
            &data,
        )
        .await
        .map_err(storage_error)
    }
}

impl Storage for FlashStore<'_> {
    async fn read(&mut self, path: &str) -> Result<Vec<u8>, StorageError> {
        let mut header = Vec::with_capacity(HEADER_LEN);
        self.fetch(ChunkKey::new(path, HEADER), &mut header).await?;
        if header.len() != HEADER_LEN {
            return Err(StorageError::Corrupted);
        }
        let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if len > MAX_FILE_SIZE {
            return Err(StorageError::Corrupted);
        }

        let mut data = Vec::with_capacity(len);
        for index in 0..len.div_ceil(CHUNK_SIZE) {
            match self.fetch(ChunkKey::new(path, index as u16), &mut data).await {
                Err(StorageError::NotFound) => return Err(StorageError::Corrupted),
                other => other?,
            }
        }

        if data.len() != len || crc32fast::hash(&data) != crc {
            return Err(StorageError::Corrupted);
        }
        Ok(data)
    }

    async fn write(&mut self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        if data.len() > MAX_FILE_SIZE {
            return Err(StorageError::TooLarge);
        }

        for (index, chunk) in data.chunks(CHUNK_SIZE).enumerate() {
            self.store(ChunkKey::new(path, index as u16), chunk).await?;
        }

        let mut header = [0u8; HEADER_LEN];
        header[..4].copy_from_slice(&(data.len() as u32).to_le_bytes());
        header[4..].copy_from_slice(&crc32fast::hash(data).to_le_bytes());
        self.store(ChunkKey::new(path, HEADER), &header).await
    }
}
