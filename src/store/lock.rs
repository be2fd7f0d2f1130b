use std::fs::File;
use std::io;

/// Advisory lock on the store file, released on drop.
#[derive(Debug)]
pub(crate) struct FileLock<'a> {
    file: &'a File,
}

impl<'a> FileLock<'a> {
    /// Blocks until no other process holds an exclusive lock.
    pub(crate) fn shared(file: &'a File) -> io::Result<Self> {
        file.lock_shared()?;
        log::trace!("acquired shared store lock");
        Ok(Self { file })
    }

    /// Blocks until no other process holds any lock.
    pub(crate) fn exclusive(file: &'a File) -> io::Result<Self> {
        file.lock()?;
        log::trace!("acquired exclusive store lock");
        Ok(Self { file })
    }
}

impl Drop for FileLock<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            log::warn!("failed to release store lock: {e}");
        }
    }
}
