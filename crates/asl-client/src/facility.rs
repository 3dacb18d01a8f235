//! The boundary between the client and the system log facility.
//!
//! A [`Facility`] hands out [`Connection`]s; a connection accepts records and
//! answers searches through [`MatchHandle`]s. The client never talks to a log
//! service directly, so any backend implementing these traits can sit behind
//! a [`Client`](crate::Client). [`LocalFacility`](crate::LocalFacility) is the
//! in-process backend shipped with this crate.

use std::os::fd::{BorrowedFd, RawFd};

use crate::attributes::AttributeMap;
use crate::aux_file::AuxiliaryFile;
use crate::error::{AslError, Result};
use crate::query::QueryTerm;
use crate::types::{DescriptorDirection, Direction, FilterMask, Level, OpenOptions};

/// Optional operations a facility supports.
///
/// A client reads these once when it is opened and exposes the matching
/// surfaces only when they are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Descriptors can be redirected into the log.
    pub descriptor_redirection: bool,
    /// Auxiliary files and locations can be attached to records.
    pub auxiliary_files: bool,
}

impl Capabilities {
    /// Every optional operation.
    pub const ALL: Self = Self {
        descriptor_redirection: true,
        auxiliary_files: true,
    };

    /// No optional operations.
    pub const NONE: Self = Self {
        descriptor_redirection: false,
        auxiliary_files: false,
    };
}

/// A log facility clients connect to.
pub trait Facility: Send + Sync {
    /// Returns the optional operations this facility provides.
    fn capabilities(&self) -> Capabilities;

    /// Opens a connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the facility cannot create the connection.
    fn open(
        &self,
        ident: Option<&str>,
        facility: &str,
        options: OpenOptions,
    ) -> Result<Box<dyn Connection>>;

    /// Opens a connection whose records are written to `fd`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if `fd` is not open for writing.
    fn open_from_descriptor(
        &self,
        fd: BorrowedFd<'_>,
        ident: Option<&str>,
        facility: &str,
    ) -> Result<Box<dyn Connection>>;
}

/// An open connection to a facility.
///
/// Implementations stamp facility-side attributes (time, host, sender and
/// so on) onto records they accept.
pub trait Connection: Send + Sync {
    /// Replaces the level filter and returns the previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the facility rejects the change.
    fn set_filter(&self, mask: FilterMask) -> Result<FilterMask>;

    /// Submits a record. Records whose level is outside the filter are
    /// dropped without error.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be stored.
    fn send(&self, record: AttributeMap) -> Result<()>;

    /// Starts a search over stored records.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::InvalidRegex`] if a term does not compile.
    fn search(&self, query: &[QueryTerm], direction: Direction) -> Result<Box<dyn MatchHandle + '_>>;

    /// Adds a descriptor that receives every accepted record as a line.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the descriptor cannot be duplicated.
    fn add_descriptor(&self, fd: BorrowedFd<'_>) -> Result<()>;

    /// Removes a descriptor added with [`add_descriptor`](Self::add_descriptor).
    /// Unknown descriptors are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the facility fails to release the descriptor.
    fn remove_descriptor(&self, fd: RawFd) -> Result<()>;

    /// Logs lines flowing through `fd` using `template` and `level`.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::Unsupported`] unless the facility advertises
    /// descriptor redirection.
    fn redirect_descriptor(
        &self,
        template: AttributeMap,
        level: Level,
        fd: BorrowedFd<'_>,
        direction: DescriptorDirection,
    ) -> Result<()> {
        let _ = (template, level, fd, direction);
        Err(AslError::Unsupported("descriptor redirection"))
    }

    /// Creates a writable file that is logged with `record` once closed.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::Unsupported`] unless the facility advertises
    /// auxiliary files.
    fn create_auxiliary(
        &self,
        record: AttributeMap,
        title: &str,
        uti: Option<&str>,
    ) -> Result<AuxiliaryFile> {
        let _ = (record, title, uti);
        Err(AslError::Unsupported("auxiliary files"))
    }

    /// Logs `record` with a reference to existing content at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::Unsupported`] unless the facility advertises
    /// auxiliary files.
    fn log_auxiliary_location(
        &self,
        record: AttributeMap,
        title: &str,
        uti: Option<&str>,
        url: &str,
    ) -> Result<()> {
        let _ = (record, title, uti, url);
        Err(AslError::Unsupported("auxiliary files"))
    }

    /// Releases the connection. Later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns an error if buffered records cannot be flushed.
    fn close(&self) -> Result<()>;
}

/// An in-progress search.
pub trait MatchHandle: Send {
    /// Returns the next matching record, or `None` once the search is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the facility fails while reading records.
    fn next_match(&mut self) -> Result<Option<AttributeMap>>;
}
