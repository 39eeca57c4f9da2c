use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{PipeError, Result};

/// Shared in-memory filesystem used for FIFOs unless configured otherwise.
pub const DEFAULT_PIPE_DIR: &str = "/dev/shm";

/// Owner and group read/write/execute.
pub const DEFAULT_FIFO_MODE: u32 = 0o770;

/// Deterministic FIFO path for the receiving end `(process, port)`.
///
/// Both ends of an edge compute the same path from the receiver's names,
/// so no registry is needed to pair them.
pub fn fifo_path(dir: &Path, process: &str, port: &str) -> PathBuf {
    dir.join(format!("{process}.{port}"))
}

/// A FIFO on the filesystem.
///
/// The FIFO is not removed on drop. It stays in place after the run and is
/// replaced the next time the same port is prepared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedPipe {
    path: PathBuf,
}

impl NamedPipe {
    /// Create a FIFO at `path` with `mode`, replacing a stale FIFO.
    ///
    /// An existing file that is not a FIFO is never removed.
    pub fn create(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.file_name().is_none() {
            return Err(PipeError::InvalidPath { path });
        }
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| PipeError::InvalidPath { path: path.clone() })?;

        match std::fs::symlink_metadata(&path) {
            Ok(metadata) if metadata.file_type().is_fifo() => {
                debug!(?path, "removing stale fifo");
                std::fs::remove_file(&path).map_err(|e| PipeError::RemoveStale {
                    path: path.clone(),
                    source: e,
                })?;
            }
            Ok(_) => return Err(PipeError::NotAFifo { path }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(PipeError::Create { path, source: e }),
        }

        // SAFETY: `c_path` is a valid NUL-terminated string that outlives the call.
        let rc = unsafe { libc::mkfifo(c_path.as_ptr(), mode as libc::mode_t) };
        if rc != 0 {
            return Err(PipeError::Create {
                path,
                source: std::io::Error::last_os_error(),
            });
        }

        // mkfifo applies the umask; set the requested mode explicitly.
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).map_err(|e| {
            PipeError::Create {
                path: path.clone(),
                source: e,
            }
        })?;

        debug!(?path, mode = %format!("{mode:o}"), "created fifo");
        Ok(Self { path })
    }

    /// Wrap an existing path without touching the filesystem.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `path` currently names a FIFO.
    pub fn is_fifo(path: impl AsRef<Path>) -> bool {
        std::fs::symlink_metadata(path)
            .map(|m| m.file_type().is_fifo())
            .unwrap_or(false)
    }

    /// Open the read end. Blocks until a writer opens the same FIFO.
    pub fn open_reader(&self) -> Result<File> {
        debug!(path = ?self.path, "opening fifo for reading");
        OpenOptions::new()
            .read(true)
            .open(&self.path)
            .map_err(|e| PipeError::Open {
                path: self.path.clone(),
                source: e,
            })
    }

    /// Open the write end. Blocks until a reader opens the same FIFO.
    pub fn open_writer(&self) -> Result<File> {
        debug!(path = ?self.path, "opening fifo for writing");
        OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|e| PipeError::Open {
                path: self.path.clone(),
                source: e,
            })
    }
}
