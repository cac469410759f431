use std::{
    collections::HashMap,
    io,
    path::PathBuf,
    str::FromStr,
    sync::RwLock,
};

/// Flat key-value store. Keys are plain names without path separators.
///
/// The store may be shared with data that does not belong to the video
/// cache, so callers must scope their keys.
pub trait StorageManager: Send + Sync {
    fn write(&self, ident: &str, data: &[u8]) -> io::Result<()>;
    fn read(&self, ident: &str) -> io::Result<Vec<u8>>;
    fn exists(&self, ident: &str) -> bool;
    fn delete(&self, ident: &str) -> io::Result<()>;
    fn list(&self) -> Vec<String>;
}

/// One file per key under `base_dir`.
#[derive(Clone)]
pub struct BackendLocal {
    pub base_dir: PathBuf,
}

impl BackendLocal {
    pub fn new(storage_dir: &str) -> io::Result<Self> {
        let path = PathBuf::from_str(storage_dir)
            .expect("infallible PathBuf::from_str for &str");
        std::fs::create_dir_all(&path)?;
        Ok(BackendLocal { base_dir: path })
    }

    fn path_for(&self, ident: &str) -> io::Result<PathBuf> {
        if ident.is_empty() || ident.contains(&['/', '\\'][..]) || ident.starts_with('.') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid storage key {ident:?}"),
            ));
        }
        Ok(self.base_dir.join(ident))
    }
}

impl StorageManager for BackendLocal {
    fn exists(&self, ident: &str) -> bool {
        self.path_for(ident)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    fn read(&self, ident: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.path_for(ident)?)
    }

    // write to a temp file first so readers never see a partial entry
    fn write(&self, ident: &str, data: &[u8]) -> io::Result<()> {
        let path = self.path_for(ident)?;
        let temp_path = self
            .base_dir
            .join(format!(".{}-{ident}", rusty_ulid::generate_ulid_string()));

        std::fs::write(&temp_path, data)?;

        std::fs::rename(&temp_path, &path)
    }

    fn delete(&self, ident: &str) -> io::Result<()> {
        std::fs::remove_file(self.path_for(ident)?)
    }

    fn list(&self) -> Vec<String> {
        std::fs::read_dir(&self.base_dir)
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .filter_map(|entry| {
                        let path = entry.path();
                        if path.is_file() {
                            path.file_name()
                                .and_then(|name| name.to_str())
                                .filter(|name| !name.starts_with('.'))
                                .map(|s| s.to_string())
                        } else {
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Process-local store, lost on restart.
#[derive(Default)]
pub struct BackendMemory {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl BackendMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "memory storage lock poisoned")
}

impl StorageManager for BackendMemory {
    fn write(&self, ident: &str, data: &[u8]) -> io::Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(ident.to_string(), data.to_vec());
        Ok(())
    }

    fn read(&self, ident: &str) -> io::Result<Vec<u8>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        entries
            .get(ident)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, ident.to_string()))
    }

    fn exists(&self, ident: &str) -> bool {
        self.entries
            .read()
            .map(|entries| entries.contains_key(ident))
            .unwrap_or(false)
    }

    fn delete(&self, ident: &str) -> io::Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries
            .remove(ident)
            .map(|_| ())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, ident.to_string()))
    }

    fn list(&self) -> Vec<String> {
        self.entries
            .read()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}
