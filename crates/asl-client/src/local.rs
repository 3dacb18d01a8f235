//! In-process log facility.
//!
//! [`LocalFacility`] implements the facility traits on top of a
//! [`LocalStore`]. Every connection stamps the usual sender attributes onto
//! the records it accepts, applies its level filter, stores the record, and
//! copies it to any descriptors the caller attached.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;

use chrono::{Local, TimeZone, Utc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::attributes::{validate_text, AttributeMap};
use crate::aux_file::AuxiliaryFile;
use crate::constants::keys;
use crate::error::{AslError, Result};
use crate::facility::{Capabilities, Connection, Facility, MatchHandle};
use crate::query::{CompiledQuery, QueryTerm};
use crate::store::{LocalStore, LocalStoreConfig};
use crate::sys;
use crate::types::{DescriptorDirection, Direction, FilterMask, Level, OpenOptions};

/// Content type recorded for auxiliary files when none is given.
pub const DEFAULT_AUX_UTI: &str = "public.data";

static HOSTNAME: Lazy<String> = Lazy::new(|| {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
});

static PROCESS_NAME: Lazy<String> = Lazy::new(|| {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "unknown".to_string())
});

/// Configuration for [`LocalFacility`].
#[derive(Debug, Clone)]
pub struct LocalFacilityConfig {
    /// Record store settings.
    pub store: LocalStoreConfig,
    /// Directory for auxiliary files. Defaults to the system temp directory.
    pub aux_dir: Option<PathBuf>,
    /// Optional operations advertised to clients.
    pub capabilities: Capabilities,
}

impl Default for LocalFacilityConfig {
    fn default() -> Self {
        Self {
            store: LocalStoreConfig::default(),
            aux_dir: None,
            capabilities: Capabilities::ALL,
        }
    }
}

impl LocalFacilityConfig {
    /// Sets the store settings.
    #[must_use]
    pub fn with_store(mut self, store: LocalStoreConfig) -> Self {
        self.store = store;
        self
    }

    /// Sets the auxiliary file directory.
    #[must_use]
    pub fn with_aux_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.aux_dir = Some(dir.into());
        self
    }

    /// Sets the advertised capabilities.
    #[must_use]
    pub const fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// A log facility living inside the current process.
pub struct LocalFacility {
    config: LocalFacilityConfig,
    store: Arc<LocalStore>,
}

impl LocalFacility {
    /// Creates a facility, opening its store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store journal cannot be opened.
    pub fn new(config: LocalFacilityConfig) -> Result<Self> {
        let store = Arc::new(LocalStore::open(config.store.clone())?);
        Ok(Self { config, store })
    }

    /// Creates a facility with an in-memory store and every capability.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            config: LocalFacilityConfig::default(),
            store: Arc::new(LocalStore::in_memory()),
        }
    }

    /// Returns the shared record store.
    #[must_use]
    pub const fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    fn connect(&self, emitter: Emitter) -> Box<dyn Connection> {
        debug!(
            sender = %emitter.sender,
            facility = %emitter.facility,
            descriptor = emitter.primary.is_some(),
            "opened local connection"
        );
        Box::new(LocalConnection {
            emitter: Arc::new(emitter),
            capabilities: self.config.capabilities,
            aux_dir: self.config.aux_dir.clone().unwrap_or_else(std::env::temp_dir),
        })
    }
}

impl Default for LocalFacility {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl Facility for LocalFacility {
    fn capabilities(&self) -> Capabilities {
        self.config.capabilities
    }

    fn open(
        &self,
        ident: Option<&str>,
        facility: &str,
        options: OpenOptions,
    ) -> Result<Box<dyn Connection>> {
        let emitter = Emitter::new(Arc::clone(&self.store), ident, facility, options, None)?;
        Ok(self.connect(emitter))
    }

    fn open_from_descriptor(
        &self,
        fd: BorrowedFd<'_>,
        ident: Option<&str>,
        facility: &str,
    ) -> Result<Box<dyn Connection>> {
        if !sys::is_writable(fd)? {
            return Err(io::Error::from_raw_os_error(libc::EBADF).into());
        }
        let sink = File::from(fd.try_clone_to_owned()?);
        let store = Arc::new(LocalStore::in_memory());
        let emitter = Emitter::new(store, ident, facility, OpenOptions::empty(), Some(sink))?;
        Ok(self.connect(emitter))
    }
}

/// Shared state of one connection, also held by redirect threads and
/// pending auxiliary files.
struct Emitter {
    store: Arc<LocalStore>,
    sender: String,
    facility: String,
    host: String,
    options: OpenOptions,
    filter: AtomicU32,
    primary: Option<Mutex<File>>,
    sinks: Mutex<HashMap<RawFd, File>>,
    redirected: Mutex<Vec<SavedDescriptor>>,
    closed: AtomicBool,
}

/// A descriptor replaced by a pipe, with a duplicate of what it referred to.
struct SavedDescriptor {
    target: RawFd,
    original: OwnedFd,
}

impl Emitter {
    fn new(
        store: Arc<LocalStore>,
        ident: Option<&str>,
        facility: &str,
        options: OpenOptions,
        primary: Option<File>,
    ) -> Result<Self> {
        let sender = match ident {
            Some(ident) => {
                validate_text("ident", ident)?;
                ident.to_string()
            }
            None => PROCESS_NAME.clone(),
        };
        validate_text("facility", facility)?;

        Ok(Self {
            store,
            sender,
            facility: facility.to_string(),
            host: HOSTNAME.clone(),
            options,
            filter: AtomicU32::new(FilterMask::default().bits()),
            primary: primary.map(Mutex::new),
            sinks: Mutex::new(HashMap::new()),
            redirected: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    fn emit(&self, record: AttributeMap) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(AslError::ClientClosed);
        }
        self.deliver(record)
    }

    /// Filters, stamps, stores and fans out `record` regardless of close.
    fn deliver(&self, mut record: AttributeMap) -> Result<()> {
        let level = record
            .find(keys::LEVEL)
            .and_then(Level::from_attribute)
            .unwrap_or(Level::Notice);
        let mask = FilterMask(self.filter.load(Ordering::Relaxed));
        if !mask.contains(level) {
            trace!(%level, mask = mask.bits(), "record filtered");
            return Ok(());
        }

        self.stamp(&mut record, level);
        let id = self.store.append(record.clone())?;
        record.set(keys::MSG_ID, id.to_string())?;

        if let Some(primary) = &self.primary {
            let mut line = serde_json::to_vec(&record)?;
            line.push(b'\n');
            primary.lock().write_all(&line)?;
        }

        let sinks = self.sinks.lock();
        if !sinks.is_empty() || self.options.contains(OpenOptions::STDERR) {
            let line = format_std(&record);
            for (fd, mut file) in sinks.iter() {
                if let Err(error) = writeln!(file, "{line}") {
                    warn!(fd, %error, "failed to write record to descriptor");
                }
            }
            if self.options.contains(OpenOptions::STDERR) {
                let _ = writeln!(io::stderr().lock(), "{line}");
            }
        }

        Ok(())
    }

    fn stamp(&self, record: &mut AttributeMap, level: Level) {
        let now = Utc::now();
        record.set_default(keys::TIME, || now.timestamp().to_string());
        record.set_default(keys::TIME_NSEC, || now.timestamp_subsec_nanos().to_string());
        record.set_default(keys::HOST, || self.host.clone());
        record.set_default(keys::SENDER, || self.sender.clone());
        record.set_default(keys::FACILITY, || self.facility.clone());
        record.set_default(keys::PID, || std::process::id().to_string());
        record.set_default(keys::UID, || sys::current_uid().to_string());
        record.set_default(keys::GID, || sys::current_gid().to_string());
        record.set_default(keys::LEVEL, || level.code().to_string());
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        for saved in self.redirected.lock().drain(..) {
            if let Err(error) = sys::dup_onto(saved.original.as_fd(), saved.target) {
                warn!(fd = saved.target, %error, "failed to restore redirected descriptor");
            }
        }
        self.sinks.lock().clear();
        if let Some(primary) = &self.primary {
            primary.lock().flush()?;
        }
        debug!(sender = %self.sender, facility = %self.facility, "closed local connection");
        Ok(())
    }
}

/// Formats a record as a single `std` line:
/// `Mmm dd HH:MM:SS host sender[pid] <Level>: message`.
pub(crate) fn format_std(record: &AttributeMap) -> String {
    let time = record
        .find(keys::TIME)
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(|secs| Local.timestamp_opt(secs, 0).single())
        .map(|t| t.format("%b %e %H:%M:%S").to_string())
        .unwrap_or_default();
    let level = record
        .find(keys::LEVEL)
        .and_then(Level::from_attribute)
        .unwrap_or(Level::Notice);

    format!(
        "{time} {host} {sender}[{pid}] <{level}>: {message}",
        host = record.find(keys::HOST).unwrap_or_default(),
        sender = record.find(keys::SENDER).unwrap_or_default(),
        pid = record.find(keys::PID).unwrap_or_default(),
        message = record.find(keys::MSG).unwrap_or_default(),
    )
}

/// Connection handed out by [`LocalFacility`].
struct LocalConnection {
    emitter: Arc<Emitter>,
    capabilities: Capabilities,
    aux_dir: PathBuf,
}

impl LocalConnection {
    fn spawn_line_reader(
        &self,
        source: OwnedFd,
        template: AttributeMap,
        level: Level,
        drain: bool,
    ) -> Result<()> {
        let emitter = Arc::clone(&self.emitter);
        let fd = source.as_raw_fd();
        thread::Builder::new()
            .name(format!("asl-redirect-{fd}"))
            .spawn(move || log_lines(&emitter, File::from(source), &template, level, drain))?;
        Ok(())
    }
}

/// Logs each line read from `source` until end of file.
///
/// Without `drain` the reader also stops once the connection closes. With
/// it, lines still buffered in a pipe at close are logged before end of file.
fn log_lines(emitter: &Emitter, source: File, template: &AttributeMap, level: Level, drain: bool) {
    let mut reader = BufReader::new(source);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => {
                warn!(%error, "redirected descriptor read failed");
                break;
            }
        }

        let text = String::from_utf8_lossy(&buf);
        let text = text.trim_end_matches(['\n', '\r']).replace('\0', "");
        if text.is_empty() {
            continue;
        }

        match log_line(emitter, template, level, text, drain) {
            Ok(()) => {}
            Err(AslError::ClientClosed) => break,
            Err(error) => warn!(%error, "failed to log redirected line"),
        }
    }
    trace!("redirect reader finished");
}

fn log_line(
    emitter: &Emitter,
    template: &AttributeMap,
    level: Level,
    text: String,
    drain: bool,
) -> Result<()> {
    let mut record = template.clone();
    record.set(keys::LEVEL, level.code().to_string())?;
    record.set(keys::MSG, text)?;
    if drain {
        emitter.deliver(record)
    } else {
        emitter.emit(record)
    }
}

impl Connection for LocalConnection {
    fn set_filter(&self, mask: FilterMask) -> Result<FilterMask> {
        Ok(FilterMask(self.emitter.filter.swap(mask.bits(), Ordering::Relaxed)))
    }

    fn send(&self, record: AttributeMap) -> Result<()> {
        self.emitter.emit(record)
    }

    fn search(&self, query: &[QueryTerm], direction: Direction) -> Result<Box<dyn MatchHandle + '_>> {
        let query = CompiledQuery::new(query)?;
        trace!(terms = query.len(), ?direction, "search started");
        Ok(Box::new(LocalMatches {
            store: &self.emitter.store,
            query,
            direction,
            after: None,
        }))
    }

    fn add_descriptor(&self, fd: BorrowedFd<'_>) -> Result<()> {
        let file = File::from(fd.try_clone_to_owned()?);
        self.emitter.sinks.lock().insert(fd.as_raw_fd(), file);
        Ok(())
    }

    fn remove_descriptor(&self, fd: RawFd) -> Result<()> {
        self.emitter.sinks.lock().remove(&fd);
        Ok(())
    }

    fn redirect_descriptor(
        &self,
        template: AttributeMap,
        level: Level,
        fd: BorrowedFd<'_>,
        direction: DescriptorDirection,
    ) -> Result<()> {
        if !self.capabilities.descriptor_redirection {
            return Err(AslError::Unsupported("descriptor redirection"));
        }
        match direction {
            DescriptorDirection::Read => {
                self.spawn_line_reader(fd.try_clone_to_owned()?, template, level, false)
            }
            DescriptorDirection::Write => {
                let original = fd.try_clone_to_owned()?;
                let (read, write) = sys::pipe()?;
                sys::dup_onto(write.as_fd(), fd.as_raw_fd())?;
                drop(write);
                self.emitter.redirected.lock().push(SavedDescriptor {
                    target: fd.as_raw_fd(),
                    original,
                });
                self.spawn_line_reader(read, template, level, true)
            }
        }
    }

    fn create_auxiliary(
        &self,
        record: AttributeMap,
        title: &str,
        uti: Option<&str>,
    ) -> Result<AuxiliaryFile> {
        if !self.capabilities.auxiliary_files {
            return Err(AslError::Unsupported("auxiliary files"));
        }
        let (file, path) = tempfile::Builder::new()
            .prefix("asl-aux-")
            .tempfile_in(&self.aux_dir)?
            .keep()
            .map_err(|e| e.error)?;

        let emitter = Arc::clone(&self.emitter);
        let title = title.to_string();
        let uti = uti.filter(|u| !u.is_empty()).unwrap_or(DEFAULT_AUX_UTI).to_string();
        let mut record = record;
        Ok(AuxiliaryFile::new(
            file,
            path,
            Box::new(move |path: &Path| {
                record.set(keys::AUX_TITLE, title)?;
                record.set(keys::AUX_UTI, uti)?;
                record.set(keys::AUX_URL, format!("file://{}", path.display()))?;
                emitter.emit(record)
            }),
        ))
    }

    fn log_auxiliary_location(
        &self,
        mut record: AttributeMap,
        title: &str,
        uti: Option<&str>,
        url: &str,
    ) -> Result<()> {
        if !self.capabilities.auxiliary_files {
            return Err(AslError::Unsupported("auxiliary files"));
        }
        record.set(keys::AUX_TITLE, title)?;
        if let Some(uti) = uti.filter(|u| !u.is_empty()) {
            record.set(keys::AUX_UTI, uti)?;
        }
        if !url.is_empty() {
            record.set(keys::AUX_URL, url)?;
        }
        self.emitter.emit(record)
    }

    fn close(&self) -> Result<()> {
        self.emitter.close()
    }
}

/// Lazy search over a [`LocalStore`].
struct LocalMatches<'a> {
    store: &'a LocalStore,
    query: CompiledQuery,
    direction: Direction,
    after: Option<u64>,
}

impl MatchHandle for LocalMatches<'_> {
    fn next_match(&mut self) -> Result<Option<AttributeMap>> {
        let Some((id, record)) = self.store.next_match(self.after, self.direction, &self.query) else {
            return Ok(None);
        };
        self.after = Some(id);
        Ok(Some(record))
    }
}
