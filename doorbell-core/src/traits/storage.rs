//! Local persistent storage for cached assets

use alloc::vec::Vec;

/// Errors from local storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Nothing stored under this path
    NotFound,
    /// Underlying medium failed
    Io,
    /// No room left
    Full,
    /// Data larger than the store accepts
    TooLarge,
    /// Stored data failed its integrity check
    Corrupted,
}

/// Whole-file asset store
///
/// Files are always written and read in full; there are no partial updates.
pub trait Storage {
    /// Read the complete file at `path`
    fn read(&mut self, path: &str) -> impl core::future::Future<Output = Result<Vec<u8>, StorageError>>;

    /// Replace the file at `path` with `data`
    fn write(
        &mut self,
        path: &str,
        data: &[u8],
    ) -> impl core::future::Future<Output = Result<(), StorageError>>;
}
