//! In-memory storage implementation for tests and dry runs.

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::storage::{Storage, StorageError, StorageInput, StorageOutput};

type FileMap = Arc<Mutex<HashMap<String, Box<[u8]>>>>;

/// Configuration for [`MemoryStorage`].
#[derive(Debug, Clone)]
pub struct MemoryStorageConfig {
    /// Initial capacity of the file table.
    pub initial_capacity: usize,
}

impl Default for MemoryStorageConfig {
    fn default() -> Self {
        MemoryStorageConfig {
            // A corpus holds two files.
            initial_capacity: 4,
        }
    }
}

/// An in-memory storage implementation.
///
/// Files become visible to readers once their output is closed.
#[derive(Debug)]
pub struct MemoryStorage {
    files: FileMap,
    closed: bool,
}

impl MemoryStorage {
    /// Create a new memory storage.
    pub fn new(config: MemoryStorageConfig) -> Self {
        MemoryStorage {
            files: Arc::new(Mutex::new(HashMap::with_capacity(config.initial_capacity))),
            closed: false,
        }
    }

    /// Create a new memory storage with default configuration.
    pub fn new_default() -> Self {
        Self::new(MemoryStorageConfig::default())
    }

    /// Replace the contents of a file directly.
    pub fn put_file(&self, name: &str, data: &[u8]) -> Result<()> {
        self.check_closed()?;
        self.files
            .lock()
            .insert(name.to_string(), data.to_vec().into_boxed_slice());
        Ok(())
    }

    /// Get the number of files stored.
    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }

    fn check_closed(&self) -> Result<()> {
        if self.closed {
            Err(StorageError::StorageClosed.into())
        } else {
            Ok(())
        }
    }
}

impl Storage for MemoryStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        self.check_closed()?;

        let files = self.files.lock();
        let data = files
            .get(name)
            .ok_or_else(|| StorageError::FileNotFound(name.to_string()))?;

        Ok(Box::new(MemoryInput::new(data.clone())))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        self.check_closed()?;

        Ok(Box::new(MemoryOutput::new(
            name.to_string(),
            Arc::clone(&self.files),
        )))
    }

    fn file_exists(&self, name: &str) -> bool {
        !self.closed && self.files.lock().contains_key(name)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.check_closed()?;
        self.files.lock().remove(name);
        Ok(())
    }

    fn list_files(&self) -> Result<Vec<String>> {
        self.check_closed()?;

        let mut file_names: Vec<String> = self.files.lock().keys().cloned().collect();
        file_names.sort();
        Ok(file_names)
    }

    fn file_size(&self, name: &str) -> Result<u64> {
        self.check_closed()?;

        let files = self.files.lock();
        let data = files
            .get(name)
            .ok_or_else(|| StorageError::FileNotFound(name.to_string()))?;

        Ok(data.len() as u64)
    }

    fn sync(&self) -> Result<()> {
        self.check_closed()
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// A memory-based input implementation.
#[derive(Debug)]
pub struct MemoryInput {
    cursor: Cursor<Vec<u8>>,
    size: u64,
}

impl MemoryInput {
    fn new(data: Box<[u8]>) -> Self {
        let data_vec = data.into_vec();
        let size = data_vec.len() as u64;
        MemoryInput {
            cursor: Cursor::new(data_vec),
            size,
        }
    }
}

impl Read for MemoryInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Seek for MemoryInput {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl StorageInput for MemoryInput {
    fn size(&self) -> Result<u64> {
        Ok(self.size)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A memory-based output implementation.
#[derive(Debug)]
pub struct MemoryOutput {
    name: String,
    cursor: Cursor<Vec<u8>>,
    files: FileMap,
    closed: bool,
}

impl MemoryOutput {
    fn new(name: String, files: FileMap) -> Self {
        MemoryOutput {
            name,
            cursor: Cursor::new(Vec::new()),
            files,
            closed: false,
        }
    }
}

impl Write for MemoryOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.closed {
            return Err(std::io::Error::other("Output is closed"));
        }
        self.cursor.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryOutput {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        if self.closed {
            return Err(std::io::Error::other("Output is closed"));
        }
        self.cursor.seek(pos)
    }
}

impl StorageOutput for MemoryOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        Ok(())
    }

    fn position(&self) -> Result<u64> {
        Ok(self.cursor.position())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.files.lock().insert(
                self.name.clone(),
                self.cursor.get_ref().clone().into_boxed_slice(),
            );
            self.closed = true;
        }
        Ok(())
    }
}

impl Drop for MemoryOutput {
    fn drop(&mut self) {
        // Ensure the file is stored when the output is dropped
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let storage = MemoryStorage::new_default();

        let mut output = storage.create_output("values.json").unwrap();
        output.write_all(b"{\"bitflags\":7}").unwrap();
        assert_eq!(output.position().unwrap(), 14);

        // Not visible until closed.
        assert!(!storage.file_exists("values.json"));
        output.close().unwrap();
        assert!(storage.file_exists("values.json"));

        let mut input = storage.open_input("values.json").unwrap();
        assert_eq!(input.size().unwrap(), 14);
        assert_eq!(input.read_all().unwrap(), b"{\"bitflags\":7}");
    }

    #[test]
    fn test_create_output_truncates() {
        let storage = MemoryStorage::new_default();
        storage.put_file("index_state.bin", b"old contents").unwrap();

        let mut output = storage.create_output("index_state.bin").unwrap();
        output.write_all(b"new").unwrap();
        output.close().unwrap();

        assert_eq!(storage.file_size("index_state.bin").unwrap(), 3);
    }

    #[test]
    fn test_list_and_delete() {
        let storage = MemoryStorage::new_default();
        storage.put_file("b", b"2").unwrap();
        storage.put_file("a", b"1").unwrap();

        assert_eq!(storage.list_files().unwrap(), vec!["a", "b"]);
        storage.delete_file("a").unwrap();
        storage.delete_file("missing").unwrap();
        assert_eq!(storage.file_count(), 1);
    }

    #[test]
    fn test_missing_file_and_closed_storage() {
        let mut storage = MemoryStorage::new_default();
        assert!(storage.open_input("nope").is_err());

        storage.close().unwrap();
        assert!(storage.create_output("x").is_err());
        assert!(!storage.file_exists("x"));
    }
}
