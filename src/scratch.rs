//! Per-request temporary storage for chart rasters and uploaded logos.
//!
//! A [`ScratchStore`] persists transient binary content and hands out [`AssetHandle`]s.  Stores
//! are owned by exactly one report request; [`ScratchScope`] wraps a store for the duration of
//! that request and releases every handle it acquired exactly once, whether the request returns
//! normally, returns an error, or unwinds.
//!
//! Two stores are provided: [`DiskStore`] writes uniquely named files into a directory, and
//! [`MemoryStore`] keeps bytes in memory for hosts (and tests) that never need a path.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::ReportError;
use crate::model::ImageSource;

const SCRATCH_FILE_PREFIX: &str = "report-lab-";

/// Ownership token for one piece of stored content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetHandle {
    id: u64,
    path: Option<PathBuf>,
}

impl AssetHandle {
    /// Store-local identifier of the content.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Location on disk for file-backed handles.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Storage backend for transient binary content.
pub trait ScratchStore {
    /// Persists `content` and returns a handle to it. `suffix` is a file extension hint such as
    /// `".png"`.
    fn acquire(&mut self, content: &[u8], suffix: &str) -> Result<AssetHandle, ReportError>;

    /// Reads the content behind `handle`, or `None` when it no longer exists.
    fn retrieve(&self, handle: &AssetHandle) -> Result<Option<Vec<u8>>, ReportError>;

    /// Deletes the content behind `handle`. Releasing content that is already gone succeeds.
    fn release(&mut self, handle: &AssetHandle) -> Result<(), ReportError>;
}

/// Stores content as uniquely named files inside a directory.
#[derive(Debug)]
pub struct DiskStore {
    directory: PathBuf,
    next_id: u64,
}

impl DiskStore {
    /// Creates a store in the system temporary directory.
    pub fn new() -> Self {
        Self::in_dir(std::env::temp_dir())
    }

    /// Creates a store writing into `directory`, which must already exist.
    pub fn in_dir(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            next_id: 0,
        }
    }

    /// Directory the store writes into.
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl Default for DiskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ScratchStore for DiskStore {
    fn acquire(&mut self, content: &[u8], suffix: &str) -> Result<AssetHandle, ReportError> {
        let mut file = tempfile::Builder::new()
            .prefix(SCRATCH_FILE_PREFIX)
            .suffix(suffix)
            .tempfile_in(&self.directory)
            .map_err(|err| {
                ReportError::scratch(
                    format!("creating a file in {}", self.directory.display()),
                    err,
                )
            })?;
        file.write_all(content)
            .and_then(|()| file.flush())
            .map_err(|err| ReportError::scratch("writing scratch content", err))?;
        let path = file
            .into_temp_path()
            .keep()
            .map_err(|err| ReportError::scratch("persisting a scratch file", err.error))?;

        self.next_id += 1;
        debug!("Stored {} bytes at {}", content.len(), path.display());
        Ok(AssetHandle {
            id: self.next_id,
            path: Some(path),
        })
    }

    fn retrieve(&self, handle: &AssetHandle) -> Result<Option<Vec<u8>>, ReportError> {
        let Some(path) = handle.path() else {
            return Ok(None);
        };
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ReportError::scratch(
                format!("reading {}", path.display()),
                err,
            )),
        }
    }

    fn release(&mut self, handle: &AssetHandle) -> Result<(), ReportError> {
        let Some(path) = handle.path() else {
            return Ok(());
        };
        match fs::remove_file(path) {
            Ok(()) => {
                debug!("Removed scratch file {}", path.display());
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("Scratch file {} was already removed", path.display());
                Ok(())
            }
            Err(err) => Err(ReportError::scratch(
                format!("removing {}", path.display()),
                err,
            )),
        }
    }
}

/// Keeps content in memory; handles carry no path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<u64, Vec<u8>>,
    next_id: u64,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries that have not been released.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether every entry has been released.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ScratchStore for MemoryStore {
    fn acquire(&mut self, content: &[u8], _suffix: &str) -> Result<AssetHandle, ReportError> {
        self.next_id += 1;
        self.entries.insert(self.next_id, content.to_vec());
        Ok(AssetHandle {
            id: self.next_id,
            path: None,
        })
    }

    fn retrieve(&self, handle: &AssetHandle) -> Result<Option<Vec<u8>>, ReportError> {
        Ok(self.entries.get(&handle.id).cloned())
    }

    fn release(&mut self, handle: &AssetHandle) -> Result<(), ReportError> {
        if self.entries.remove(&handle.id).is_none() {
            debug!("Scratch entry {} was already released", handle.id);
        }
        Ok(())
    }
}

/// Scoped acquisition over a [`ScratchStore`].
///
/// Every handle acquired through the scope is released when [`ScratchScope::finish`] is called
/// or, failing that, when the scope is dropped.
pub struct ScratchScope<'s, S: ScratchStore + ?Sized> {
    store: &'s mut S,
    handles: Vec<AssetHandle>,
    released: bool,
}

impl<'s, S: ScratchStore + ?Sized> ScratchScope<'s, S> {
    /// Opens a scope over `store`.
    pub fn new(store: &'s mut S) -> Self {
        Self {
            store,
            handles: Vec::new(),
            released: false,
        }
    }

    /// Persists `content` through the store and tracks the resulting handle.
    pub fn acquire(&mut self, content: &[u8], suffix: &str) -> Result<AssetHandle, ReportError> {
        let handle = self.store.acquire(content, suffix)?;
        self.handles.push(handle.clone());
        Ok(handle)
    }

    /// Reads tracked content back from the store.
    pub fn retrieve(&self, handle: &AssetHandle) -> Result<Option<Vec<u8>>, ReportError> {
        self.store.retrieve(handle)
    }

    /// Handles acquired so far and not yet released.
    pub fn handles(&self) -> &[AssetHandle] {
        &self.handles
    }

    /// Releases every tracked handle, returning the first failure.
    pub fn finish(mut self) -> Result<(), ReportError> {
        self.release_all()
    }

    fn release_all(&mut self) -> Result<(), ReportError> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let mut first_error = None;
        for handle in self.handles.drain(..) {
            if let Err(err) = self.store.release(&handle) {
                warn!("Failed to release scratch content {}: {}", handle.id, err);
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl<S: ScratchStore + ?Sized> Drop for ScratchScope<'_, S> {
    fn drop(&mut self) {
        if !self.released {
            debug!(
                "Releasing {} scratch handle(s) on scope exit",
                self.handles.len()
            );
            // Failures were already logged by `release_all`.
            let _ = self.release_all();
        }
    }
}

/// Read access to image content during composition.
pub trait ContentSource {
    /// Returns the bytes behind `source`, or `None` when the content no longer exists.
    fn fetch(&self, source: &ImageSource) -> Result<Option<Vec<u8>>, ReportError>;
}

/// Resolves in-memory and file-path sources; stored handles are unknown to it.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileSystemSource;

impl ContentSource for FileSystemSource {
    fn fetch(&self, source: &ImageSource) -> Result<Option<Vec<u8>>, ReportError> {
        match source {
            ImageSource::Bytes(bytes) => Ok(Some(bytes.clone())),
            ImageSource::Path(path) => read_optional(path),
            ImageSource::Stored(handle) => match handle.path() {
                Some(path) => read_optional(path),
                None => Ok(None),
            },
        }
    }
}

impl<S: ScratchStore + ?Sized> ContentSource for ScratchScope<'_, S> {
    fn fetch(&self, source: &ImageSource) -> Result<Option<Vec<u8>>, ReportError> {
        match source {
            ImageSource::Stored(handle) => self.retrieve(handle),
            other => FileSystemSource.fetch(other),
        }
    }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, ReportError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(ReportError::Composition(genpdf::error::Error::new(
            format!("Failed to read {}", path.display()),
            err,
        ))),
    }
}
