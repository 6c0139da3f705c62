//! Exclusive ownership of the radio hardware.
//!
//! Ownership is an `fs2` advisory lock on `<lock_dir>/<name>.lock`. The lock
//! file carries the owner's identity so a rejected caller can report who holds
//! the device. The lock disappears with the file handle, so a crashed owner
//! never leaves the hardware claimed.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ResourceConfig;
use crate::error::{Result, SweepError};

#[derive(Debug)]
pub struct HardwareResource {
    name: String,
    path: PathBuf,
    owner: String,
    file: Option<File>,
}

impl HardwareResource {
    pub fn new(config: &ResourceConfig) -> Self {
        let instance = Uuid::new_v4().simple().to_string();
        Self {
            name: config.name.clone(),
            path: config.lock_dir.join(format!("{}.lock", config.name)),
            owner: format!("sweepd[{}]#{}", std::process::id(), &instance[..8]),
            file: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identity written into the lock file while held
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Take the hardware. Acquiring a resource this instance already holds is a no-op.
    pub fn acquire(&mut self) -> Result<()> {
        if self.file.is_some() {
            return Ok(());
        }

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;

        if let Err(e) = file.try_lock_exclusive() {
            if e.kind() == fs2::lock_contended_error().kind() {
                let owner = read_owner(&mut file).unwrap_or_else(|| "unknown owner".to_string());
                debug!(resource = %self.name, %owner, "hardware resource busy");
                return Err(SweepError::ResourceBusy {
                    resource: self.name.clone(),
                    owner,
                });
            }
            return Err(e.into());
        }

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(self.owner.as_bytes())?;
        file.flush()?;

        info!(resource = %self.name, owner = %self.owner, "acquired hardware resource");
        self.file = Some(file);
        Ok(())
    }

    /// Give the hardware back. Returns false if it was not held.
    pub fn release(&mut self) -> bool {
        let Some(file) = self.file.take() else {
            return false;
        };
        if let Err(e) = file.set_len(0) {
            debug!(error = %e, "failed to clear lock owner");
        }
        if let Err(e) = FileExt::unlock(&file) {
            warn!(resource = %self.name, error = %e, "failed to unlock hardware resource");
        }
        info!(resource = %self.name, "released hardware resource");
        true
    }

    /// Owner recorded in the lock file, if any
    pub fn current_owner(&self) -> Option<String> {
        let mut file = File::open(&self.path).ok()?;
        read_owner(&mut file)
    }
}

impl Drop for HardwareResource {
    fn drop(&mut self) {
        self.release();
    }
}

fn read_owner(file: &mut File) -> Option<String> {
    let mut owner = String::new();
    file.seek(SeekFrom::Start(0)).ok()?;
    file.read_to_string(&mut owner).ok()?;
    let owner = owner.trim();
    (!owner.is_empty()).then(|| owner.to_string())
}
