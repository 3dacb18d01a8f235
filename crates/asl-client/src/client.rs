//! Client connections to a log facility.

use std::fmt;
use std::os::fd::{AsFd, AsRawFd, RawFd};

use tracing::{debug, warn};

use crate::attributes::{validate_text, AttributeMap};
use crate::aux_file::AuxiliaryFile;
use crate::constants::keys;
use crate::cursor::SearchCursor;
use crate::error::{AslError, Result};
use crate::facility::{Capabilities, Connection, Facility};
use crate::message::Message;
use crate::types::{DescriptorDirection, Direction, FilterMask, Level, MessageKind, OpenOptions};

/// A connection to a log facility.
///
/// The connection is released by [`close`](Self::close) or when the client
/// is dropped. After close every operation fails with
/// [`AslError::ClientClosed`].
///
/// ```
/// use asl_client::{Client, Level, LocalFacility, Message, OpenOptions};
///
/// let facility = LocalFacility::in_memory();
/// let client = Client::open(&facility, Some("example"), "user", OpenOptions::empty())?;
/// client.log(None, Level::Error, "disk almost full")?;
///
/// let mut query = Message::new_query();
/// query.set_query("Sender", "example", "eq".parse()?)?;
/// assert_eq!(client.search(&query)?.count(), 1);
/// # Ok::<(), asl_client::AslError>(())
/// ```
pub struct Client {
    connection: Option<Box<dyn Connection>>,
    capabilities: Capabilities,
    ident: Option<String>,
    facility: String,
    options: OpenOptions,
}

impl Client {
    /// Opens a connection.
    ///
    /// `ident` names the sender; when omitted the facility uses the process
    /// name.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::InvalidArgument`] if a name contains NUL, or any
    /// error the facility reports.
    pub fn open<F: Facility + ?Sized>(
        facility: &F,
        ident: Option<&str>,
        facility_name: &str,
        options: OpenOptions,
    ) -> Result<Self> {
        Self::validate_names(ident, facility_name)?;
        let connection = facility.open(ident, facility_name, options)?;
        Ok(Self::wrap(facility, connection, ident, facility_name, options))
    }

    /// Opens a connection that writes its records to `fd`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if `fd` is not open for writing, or
    /// [`AslError::InvalidArgument`] if a name contains NUL.
    pub fn open_from_descriptor<F: Facility + ?Sized>(
        facility: &F,
        fd: impl AsFd,
        ident: Option<&str>,
        facility_name: &str,
    ) -> Result<Self> {
        Self::validate_names(ident, facility_name)?;
        let connection = facility.open_from_descriptor(fd.as_fd(), ident, facility_name)?;
        Ok(Self::wrap(
            facility,
            connection,
            ident,
            facility_name,
            OpenOptions::empty(),
        ))
    }

    fn validate_names(ident: Option<&str>, facility_name: &str) -> Result<()> {
        if let Some(ident) = ident {
            validate_text("ident", ident)?;
        }
        validate_text("facility", facility_name)
    }

    fn wrap<F: Facility + ?Sized>(
        facility: &F,
        connection: Box<dyn Connection>,
        ident: Option<&str>,
        facility_name: &str,
        options: OpenOptions,
    ) -> Self {
        let capabilities = facility.capabilities();
        debug!(?ident, facility = facility_name, ?capabilities, "client opened");
        Self {
            connection: Some(connection),
            capabilities,
            ident: ident.map(str::to_string),
            facility: facility_name.to_string(),
            options,
        }
    }

    /// Returns the sender name given at open.
    #[must_use]
    pub fn ident(&self) -> Option<&str> {
        self.ident.as_deref()
    }

    /// Returns the facility name given at open.
    #[must_use]
    pub fn facility_name(&self) -> &str {
        &self.facility
    }

    /// Returns the options given at open.
    #[must_use]
    pub const fn options(&self) -> OpenOptions {
        self.options
    }

    /// Returns the optional operations resolved at open.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Returns true once the client has been closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.connection.is_none()
    }

    /// Releases the connection. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the facility fails to release the connection.
    pub fn close(&mut self) -> Result<()> {
        match self.connection.take() {
            Some(connection) => {
                debug!(facility = %self.facility, "client closed");
                connection.close()
            }
            None => Ok(()),
        }
    }

    fn connection(&self) -> Result<&dyn Connection> {
        self.connection.as_deref().ok_or(AslError::ClientClosed)
    }

    /// Replaces the level filter and returns the previous mask.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::ClientClosed`] after close.
    pub fn set_filter(&self, mask: impl Into<FilterMask>) -> Result<FilterMask> {
        self.connection()?.set_filter(mask.into())
    }

    /// Logs `text` at `level`, copying the attributes of `template` if given.
    ///
    /// Records outside the filter are dropped without error.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::WrongKind`] for a query template,
    /// [`AslError::InvalidArgument`] if `text` contains NUL, or
    /// [`AslError::ClientClosed`] after close.
    pub fn log(&self, template: Option<&Message>, level: Level, text: &str) -> Result<()> {
        let connection = self.connection()?;
        validate_text("message", text)?;
        let mut record = record_from(template)?;
        record.set(keys::LEVEL, level.code().to_string())?;
        record.set(keys::MSG, text)?;
        connection.send(record)
    }

    /// Sends a record as-is. The filter applies to its `Level` attribute.
    ///
    /// Caller attributes are kept, except the facility-reserved
    /// [`ASLMessageID`](keys::MSG_ID), which the store always assigns.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::WrongKind`] for a query, or
    /// [`AslError::ClientClosed`] after close.
    pub fn send(&self, message: &Message) -> Result<()> {
        let connection = self.connection()?;
        message.require(MessageKind::Record)?;
        connection.send(message.attributes().clone())
    }

    /// Searches oldest-first for records matching `query`.
    ///
    /// # Errors
    ///
    /// See [`search_with_direction`](Self::search_with_direction).
    pub fn search(&self, query: &Message) -> Result<SearchCursor<'_>> {
        self.search_with_direction(query, Direction::Forward)
    }

    /// Searches for records matching `query` in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::WrongKind`] if `query` is a record,
    /// [`AslError::InvalidRegex`] if a regex term does not compile, or
    /// [`AslError::ClientClosed`] after close.
    pub fn search_with_direction(&self, query: &Message, direction: Direction) -> Result<SearchCursor<'_>> {
        let connection = self.connection()?;
        query.require(MessageKind::Query)?;
        let handle = connection.search(&query.query_terms(), direction)?;
        Ok(SearchCursor::new(handle))
    }

    /// Copies every accepted record to `fd` as a formatted line.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the descriptor cannot be duplicated, or
    /// [`AslError::ClientClosed`] after close.
    pub fn add_log_file(&self, fd: impl AsFd) -> Result<()> {
        self.connection()?.add_descriptor(fd.as_fd())
    }

    /// Stops copying records to `fd`. Unknown descriptors are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::ClientClosed`] after close.
    pub fn remove_log_file(&self, fd: RawFd) -> Result<()> {
        self.connection()?.remove_descriptor(fd)
    }

    /// Returns descriptor redirection, if the facility supports it.
    #[must_use]
    pub const fn redirection(&self) -> Option<Redirection<'_>> {
        if self.capabilities.descriptor_redirection {
            Some(Redirection { client: self })
        } else {
            None
        }
    }

    /// Returns auxiliary file support, if the facility supports it.
    #[must_use]
    pub const fn auxiliary(&self) -> Option<Auxiliary<'_>> {
        if self.capabilities.auxiliary_files {
            Some(Auxiliary { client: self })
        } else {
            None
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            warn!(%error, "failed to close client");
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("ident", &self.ident)
            .field("facility", &self.facility)
            .field("options", &self.options)
            .field("capabilities", &self.capabilities)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn record_from(template: Option<&Message>) -> Result<AttributeMap> {
    match template {
        Some(message) => {
            message.require(MessageKind::Record)?;
            Ok(message.attributes().clone())
        }
        None => Ok(AttributeMap::new()),
    }
}

/// Redirection of descriptors into the log.
#[derive(Debug, Clone, Copy)]
pub struct Redirection<'a> {
    client: &'a Client,
}

impl Redirection<'_> {
    /// Logs every line flowing through `fd` at `level`.
    ///
    /// With [`DescriptorDirection::Read`], lines read from `fd` are logged.
    /// With [`DescriptorDirection::Write`], `fd` is replaced by a pipe and
    /// lines written to it are logged instead of reaching the original file.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::WrongKind`] for a query template, an I/O error if
    /// the descriptor cannot be redirected, or [`AslError::ClientClosed`]
    /// after close.
    pub fn log_descriptor(
        &self,
        template: Option<&Message>,
        level: Level,
        fd: impl AsFd,
        direction: DescriptorDirection,
    ) -> Result<()> {
        let connection = self.client.connection()?;
        let record = record_from(template)?;
        let fd = fd.as_fd();
        debug!(fd = fd.as_raw_fd(), ?direction, %level, "redirecting descriptor");
        connection.redirect_descriptor(record, level, fd, direction)
    }
}

/// Attachment of auxiliary content to records.
#[derive(Debug, Clone, Copy)]
pub struct Auxiliary<'a> {
    client: &'a Client,
}

impl Auxiliary<'_> {
    /// Creates a file whose content is attached to `message` once closed.
    ///
    /// `uti` names the content type and defaults to `public.data`.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::InvalidArgument`] for an empty title,
    /// [`AslError::WrongKind`] for a query, or [`AslError::ClientClosed`]
    /// after close.
    pub fn create_auxiliary_file(
        &self,
        message: Option<&Message>,
        title: &str,
        uti: Option<&str>,
    ) -> Result<AuxiliaryFile> {
        let connection = self.client.connection()?;
        validate_title(title)?;
        if let Some(uti) = uti {
            validate_text("content type", uti)?;
        }
        let record = record_from(message)?;
        connection.create_auxiliary(record, title, uti)
    }

    /// Closes `file` and logs the record that references it.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be flushed or the record
    /// cannot be logged, or [`AslError::ClientClosed`] after close.
    pub fn close_auxiliary_file(&self, mut file: AuxiliaryFile) -> Result<()> {
        self.client.connection()?;
        file.close()
    }

    /// Logs `message` with a reference to content at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::InvalidArgument`] for an empty title or when
    /// neither `uti` nor `url` is given, [`AslError::WrongKind`] for a
    /// query, or [`AslError::ClientClosed`] after close.
    pub fn log_auxiliary_location(
        &self,
        message: Option<&Message>,
        title: &str,
        uti: Option<&str>,
        url: &str,
    ) -> Result<()> {
        let connection = self.client.connection()?;
        validate_title(title)?;
        validate_text("url", url)?;
        let uti = uti.filter(|u| !u.is_empty());
        if let Some(uti) = uti {
            validate_text("content type", uti)?;
        } else if url.is_empty() {
            return Err(AslError::invalid_argument(
                "auxiliary location needs a content type or a url",
            ));
        }
        let record = record_from(message)?;
        connection.log_auxiliary_location(record, title, uti, url)
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.is_empty() {
        return Err(AslError::invalid_argument("auxiliary title must not be empty"));
    }
    validate_text("title", title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::local::LocalFacility;

    fn client(facility: &LocalFacility) -> Client {
        Client::open(facility, Some("unit"), "user", OpenOptions::empty()).expect("open")
    }

    #[test]
    fn open_rejects_nul_names() {
        let facility = LocalFacility::in_memory();
        let err = Client::open(&facility, Some("a\0"), "user", OpenOptions::empty()).err();
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::Type));
    }

    #[test]
    fn close_is_idempotent_and_blocks_operations() {
        let facility = LocalFacility::in_memory();
        let mut client = client(&facility);
        client.close().expect("close");
        client.close().expect("close again");
        assert!(client.is_closed());

        assert!(matches!(client.log(None, Level::Error, "x"), Err(AslError::ClientClosed)));
        assert!(matches!(client.set_filter(FilterMask::ALL), Err(AslError::ClientClosed)));
        assert!(matches!(client.send(&Message::new_record()), Err(AslError::ClientClosed)));
        assert!(matches!(client.search(&Message::new_query()), Err(AslError::ClientClosed)));
        assert!(matches!(client.remove_log_file(3), Err(AslError::ClientClosed)));
    }

    #[test]
    fn set_filter_returns_previous() {
        let facility = LocalFacility::in_memory();
        let client = client(&facility);
        let first = client.set_filter(FilterMask::upto(Level::Error)).expect("filter");
        assert_eq!(first.bits(), 0x3f);
        let second = client.set_filter(0xffu32).expect("filter");
        assert_eq!(second, FilterMask::upto(Level::Error));
    }

    #[test]
    fn log_rejects_query_template_and_nul() {
        let facility = LocalFacility::in_memory();
        let client = client(&facility);
        let query = Message::new_query();
        assert_eq!(
            client.log(Some(&query), Level::Error, "x").err().map(|e| e.kind()),
            Some(ErrorKind::Type)
        );
        assert_eq!(
            client.log(None, Level::Error, "a\0b").err().map(|e| e.kind()),
            Some(ErrorKind::Type)
        );
    }

    #[test]
    fn search_and_send_check_kinds() {
        let facility = LocalFacility::in_memory();
        let client = client(&facility);
        assert!(matches!(client.search(&Message::new_record()), Err(AslError::WrongKind { .. })));
        assert!(matches!(client.send(&Message::new_query()), Err(AslError::WrongKind { .. })));
    }

    #[test]
    fn auxiliary_location_validation() {
        let facility = LocalFacility::in_memory();
        let client = client(&facility);
        let aux = client.auxiliary().expect("auxiliary");

        let kind = |r: Result<()>| r.err().map(|e| e.kind());
        assert_eq!(kind(aux.log_auxiliary_location(None, "", Some("public.text"), "")), Some(ErrorKind::Type));
        assert_eq!(kind(aux.log_auxiliary_location(None, "t", None, "")), Some(ErrorKind::Type));
        assert_eq!(kind(aux.log_auxiliary_location(None, "t", Some(""), "")), Some(ErrorKind::Type));
        assert!(aux.log_auxiliary_location(None, "t", Some("public.text"), "").is_ok());
        assert!(aux.log_auxiliary_location(None, "t", None, "https://example.com/x").is_ok());
    }

    #[test]
    fn drop_closes_connection() {
        let facility = LocalFacility::in_memory();
        {
            let client = client(&facility);
            client.log(None, Level::Error, "before drop").expect("log");
        }
        assert_eq!(facility.store().len(), 1);
    }
}
