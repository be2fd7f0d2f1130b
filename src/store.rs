//! Trust-on-first-use pinning of peer certificates.
//!
//! The store maps `(host, port)` to the fingerprint of the certificate first
//! seen there. A later connection presenting a different certificate is
//! reported as a [`Mismatch`] and the pinned record is left alone until the
//! caller explicitly calls [`CertificateStore::update`].
//!
//! The backing file may be shared by several processes. Reads happen under a
//! shared lock; every write takes an exclusive lock and re-reads the file
//! first, so concurrent inserts are merged rather than lost.

mod lock;
mod record;

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead as _, BufReader, Seek as _, SeekFrom, Write as _};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::{Certificate, Error, Result};

use lock::FileLock;
use record::normalize_host;

pub use record::TrustRecord;

/// File name of the store inside the configuration directory.
pub const STORE_FILE_NAME: &str = "known_hosts2";

/// Default location of the store, inside the per-user configuration
/// directory.
pub fn default_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", env!("CARGO_PKG_NAME")).ok_or_else(|| {
        log::error!("could not determine the configuration directory");
        Error::NotFound
    })?;

    Ok(dirs.config_dir().join(STORE_FILE_NAME))
}

/// How a presented certificate relates to the pinned one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Trusted(Trust),
    /// The pinned record was not modified.
    Mismatch(Mismatch),
}

impl Decision {
    /// Returns `true` if the decision is [`Trusted`].
    ///
    /// [`Trusted`]: Decision::Trusted
    #[must_use]
    pub fn is_trusted(&self) -> bool {
        matches!(self, Self::Trusted(..))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trust {
    /// First contact; the record has been persisted.
    New(TrustRecord),
    /// The presented certificate is the pinned one.
    Match(TrustRecord),
}

impl Trust {
    pub fn record(&self) -> &TrustRecord {
        match self {
            Trust::New(record) | Trust::Match(record) => record,
        }
    }
}

/// The presented certificate differs from the pinned one.
///
/// `Display` renders the warning shown to the user before asking whether to
/// re-trust the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Record currently in the store.
    pub stored: TrustRecord,
    /// Record that [`CertificateStore::update`] would write.
    pub presented: TrustRecord,
    pub store_path: PathBuf,
}

impl Mismatch {
    pub fn old_subject(&self) -> &str {
        &self.stored.subject
    }

    pub fn new_subject(&self) -> &str {
        &self.presented.subject
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const BANNER: &str = "@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@";

        writeln!(f, "{BANNER}")?;
        writeln!(f, "@    WARNING: REMOTE HOST IDENTIFICATION HAS CHANGED!     @")?;
        writeln!(f, "{BANNER}")?;
        writeln!(f, "IT IS POSSIBLE THAT SOMEONE IS DOING SOMETHING NASTY!")?;
        writeln!(
            f,
            "Someone could be eavesdropping on you right now (man-in-the-middle attack)!"
        )?;
        writeln!(
            f,
            "It is also possible that the certificate has just been changed."
        )?;
        writeln!(f, "Host: {}:{}", self.presented.host, self.presented.port)?;
        writeln!(f, "Pinned subject:    {}", self.stored.subject)?;
        writeln!(f, "Pinned issuer:     {}", self.stored.issuer)?;
        writeln!(f, "Pinned fingerprint:\n{}", self.stored.fingerprint)?;
        writeln!(f, "Presented subject: {}", self.presented.subject)?;
        writeln!(f, "Presented issuer:  {}", self.presented.issuer)?;
        writeln!(f, "Presented fingerprint:\n{}", self.presented.fingerprint)?;
        write!(
            f,
            "Remove the entry for {} in {} to get rid of this message.",
            self.presented.host,
            self.store_path.display()
        )
    }
}

#[derive(Debug, Clone)]
pub struct CertificateStoreBuilder {
    path: Option<PathBuf>,
    create: bool,
}

impl Default for CertificateStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CertificateStoreBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: None,
            create: true,
        }
    }

    /// Use `path` instead of [`default_path`].
    #[must_use]
    pub fn set_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Create the file and its parent directories if missing. Defaults to
    /// `true`.
    #[must_use]
    pub fn set_create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    pub fn open(self) -> Result<CertificateStore> {
        let path: PathBuf = match self.path {
            Some(path) => path,
            None => default_path()?,
        };

        if self.create
            && let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let file: File = OpenOptions::new()
            .read(true)
            .write(true)
            .create(self.create)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    log::error!("trust store {} does not exist", path.display());
                    Error::NotFound
                } else {
                    log::error!("failed to open trust store {}: {e}", path.display());
                    Error::Io(e)
                }
            })?;

        let records: Vec<TrustRecord> = {
            let _lock = FileLock::shared(&file)?;
            read_records(&file)?
        };

        log::debug!(
            "opened trust store {} with {} records",
            path.display(),
            records.len()
        );

        Ok(CertificateStore {
            path,
            file,
            records,
        })
    }
}

fn find<'a>(records: &'a [TrustRecord], host: &str, port: u16) -> Option<&'a TrustRecord> {
    records.iter().find(|record| record.is_for(host, port))
}

fn read_records(mut file: &File) -> Result<Vec<TrustRecord>> {
    file.seek(SeekFrom::Start(0))?;

    let mut records: Vec<TrustRecord> = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line: String = line.map_err(|e| {
            if e.kind() == io::ErrorKind::InvalidData {
                log::error!("trust store line {} is not UTF-8", idx + 1);
                Error::StoreFormat { line: idx + 1 }
            } else {
                Error::Io(e)
            }
        })?;

        if let Some(record) = TrustRecord::parse_line(&line, idx + 1)? {
            records.push(record);
        }
    }

    Ok(records)
}

fn serialize_records(records: &[TrustRecord]) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::new();
    for record in records {
        out.extend_from_slice(record.to_line().as_bytes());
        out.push(b'\n');
    }
    out
}

fn write_records(mut file: &File, records: &[TrustRecord]) -> Result<()> {
    let contents: Vec<u8> = serialize_records(records);

    // overwrite before shrinking, a failed write must never leave the file empty
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&contents)?;
    file.set_len(contents.len() as u64)?;

    file.sync_data()?;
    Ok(())
}

fn decide(stored: &TrustRecord, presented: TrustRecord, store_path: &Path) -> Decision {
    if stored.fingerprint == presented.fingerprint {
        log::debug!("{}:{} matches the pinned certificate", stored.host, stored.port);
        Decision::Trusted(Trust::Match(stored.clone()))
    } else {
        log::warn!(
            "{}:{} presented {} but {} is pinned",
            stored.host,
            stored.port,
            presented.fingerprint,
            stored.fingerprint
        );
        Decision::Mismatch(Mismatch {
            stored: stored.clone(),
            presented,
            store_path: store_path.to_path_buf(),
        })
    }
}

/// Handle on the persisted trust store.
///
/// Opened once per session manager and passed to every negotiation that
/// needs a trust decision. Dropping the handle closes the file.
#[derive(Debug)]
pub struct CertificateStore {
    path: PathBuf,
    file: File,
    records: Vec<TrustRecord>,
}

impl CertificateStore {
    #[must_use]
    pub fn builder() -> CertificateStoreBuilder {
        CertificateStoreBuilder::new()
    }

    /// Opens the store at [`default_path`], creating it if needed.
    pub fn open() -> Result<Self> {
        Self::builder().open()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records as of the last read or write by this handle.
    pub fn records(&self) -> &[TrustRecord] {
        &self.records
    }

    /// Re-reads the file under a shared lock.
    pub fn reload(&mut self) -> Result<()> {
        let _lock = FileLock::shared(&self.file)?;
        self.records = read_records(&self.file)?;
        Ok(())
    }

    pub fn lookup(&mut self, host: &str, port: u16) -> Result<Option<TrustRecord>> {
        let host: String = normalize_host(host)?;
        self.reload()?;
        Ok(find(&self.records, &host, port).cloned())
    }

    /// Decides whether `certificate` is trusted for `host:port`.
    ///
    /// An unknown host is pinned to `certificate` and persisted. A known host
    /// is never modified here.
    pub fn r#match(
        &mut self,
        host: &str,
        port: u16,
        certificate: &Certificate,
    ) -> Result<Decision> {
        let presented: TrustRecord = TrustRecord::new(host, port, certificate)?;

        self.reload()?;
        if let Some(stored) = find(&self.records, &presented.host, port) {
            return Ok(decide(stored, presented, &self.path));
        }

        let _lock = FileLock::exclusive(&self.file)?;
        let mut records: Vec<TrustRecord> = read_records(&self.file)?;

        // another process may have pinned it since the shared read
        if let Some(stored) = find(&records, &presented.host, port) {
            let decision: Decision = decide(stored, presented, &self.path);
            self.records = records;
            return Ok(decision);
        }

        records.push(presented.clone());
        write_records(&self.file, &records)?;
        self.records = records;

        log::info!(
            "pinned {}:{} to {} ({})",
            presented.host,
            presented.port,
            presented.fingerprint,
            presented.subject
        );

        Ok(Decision::Trusted(Trust::New(presented)))
    }

    /// Replaces the pinned record for `host:port` with `certificate`.
    ///
    /// Fails with [`Error::NotFound`] if the host has no record.
    pub fn update(
        &mut self,
        host: &str,
        port: u16,
        certificate: &Certificate,
    ) -> Result<TrustRecord> {
        let replacement: TrustRecord = TrustRecord::new(host, port, certificate)?;

        let _lock = FileLock::exclusive(&self.file)?;
        let mut records: Vec<TrustRecord> = read_records(&self.file)?;

        let Some(idx) = records
            .iter()
            .position(|record| record.is_for(&replacement.host, port))
        else {
            log::error!("no record for {}:{} to update", replacement.host, port);
            self.records = records;
            return Err(Error::NotFound);
        };

        records[idx] = replacement.clone();
        write_records(&self.file, &records)?;
        self.records = records;

        log::info!(
            "re-pinned {}:{} to {}",
            replacement.host,
            replacement.port,
            replacement.fingerprint
        );

        Ok(replacement)
    }

    /// Forgets `host:port`. Returns `false` if there was no record.
    pub fn remove(&mut self, host: &str, port: u16) -> Result<bool> {
        let host: String = normalize_host(host)?;

        let _lock = FileLock::exclusive(&self.file)?;
        let mut records: Vec<TrustRecord> = read_records(&self.file)?;

        let before: usize = records.len();
        records.retain(|record| !record.is_for(&host, port));
        let removed: bool = records.len() != before;

        if removed {
            write_records(&self.file, &records)?;
            log::info!("removed {host}:{port} from the trust store");
        }
        self.records = records;

        Ok(removed)
    }

    /// Flushes and closes the backing file.
    pub fn close(self) -> Result<()> {
        self.file.sync_all()?;
        log::debug!("closed trust store {}", self.path.display());
        Ok(())
    }
}
