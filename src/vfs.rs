//! Virtual filesystem the open-file handshake materializes into.
//!
//! Dropped files land at `"/" + file_name`. [`MemoryFs`] keeps them in a map;
//! [`DirFs`] maps the virtual root onto a host directory.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::VfsError;

/// Virtual path for a file delivered by the open-file handshake.
pub fn virtual_path(file_name: &str) -> PathBuf {
    PathBuf::from(format!("/{file_name}"))
}

/// Storage for files the legacy program can open by virtual path.
pub trait VirtualFs {
    fn write_file(&mut self, path: &Path, bytes: &[u8]) -> Result<(), VfsError>;

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, VfsError>;
}

// =============================================================================
// IN-MEMORY
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryFs {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl VirtualFs for MemoryFs {
    fn write_file(&mut self, path: &Path, bytes: &[u8]) -> Result<(), VfsError> {
        self.files.insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, VfsError> {
        self.get(path).map(<[u8]>::to_vec).ok_or_else(|| VfsError::Io {
            path: path.to_path_buf(),
            source: io::Error::from(io::ErrorKind::NotFound),
        })
    }
}

// =============================================================================
// DIRECTORY-BACKED
// =============================================================================

/// Virtual root mapped onto a host directory. Paths may not climb out of it.
#[derive(Debug, Clone)]
pub struct DirFs {
    root: PathBuf,
}

impl DirFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Host path for a virtual path.
    pub fn resolve(&self, path: &Path) -> Result<PathBuf, VfsError> {
        let mut host = self.root.clone();
        for component in path.components() {
            match component {
                Component::RootDir | Component::CurDir => {}
                Component::Normal(part) => host.push(part),
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(VfsError::EscapesRoot(path.to_path_buf()));
                }
            }
        }
        if host == self.root {
            return Err(VfsError::EscapesRoot(path.to_path_buf()));
        }
        Ok(host)
    }
}

impl VirtualFs for DirFs {
    fn write_file(&mut self, path: &Path, bytes: &[u8]) -> Result<(), VfsError> {
        let host = self.resolve(path)?;
        let io_err = |source| VfsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = host.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&host, bytes).map_err(io_err)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, VfsError> {
        let host = self.resolve(path)?;
        fs::read(&host).map_err(|source| VfsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
