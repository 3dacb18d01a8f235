//! # asl-client
//!
//! Client library for the system log facility.
//!
//! This crate provides:
//!
//! - [`AttributeMap`]: string-keyed record attributes
//! - [`QueryOperator`]: comparison plus modifiers for query terms
//! - [`Message`]: a record or a query
//! - [`Client`]: a connection that logs, sends, filters and searches
//! - [`SearchCursor`]: lazy iteration over search results
//! - [`Facility`] / [`Connection`] / [`MatchHandle`]: the backend boundary
//! - [`LocalFacility`]: an in-process backend with an optional journal
//!
//! ## Example
//!
//! ```rust
//! use asl_client::{Client, Direction, Level, LocalFacility, Message, OpenOptions};
//!
//! let facility = LocalFacility::in_memory();
//! let client = Client::open(&facility, Some("demo"), "user", OpenOptions::empty())?;
//!
//! let mut record = Message::new_record();
//! record.set_attribute("Session", "42")?;
//! client.log(Some(&record), Level::Warning, "low on space")?;
//! client.log(None, Level::Error, "out of space")?;
//!
//! let mut query = Message::new_query();
//! query.set_query("Level", "4", "<=".parse()?)?;
//! let texts: Vec<String> = client
//!     .search_with_direction(&query, Direction::Reverse)?
//!     .map(|m| m.and_then(|m| m.get_attribute("Message").map(str::to_string)))
//!     .collect::<Result<_, _>>()?;
//! assert_eq!(texts, ["out of space", "low on space"]);
//! # Ok::<(), asl_client::AslError>(())
//! ```

#![warn(missing_docs)]

#[cfg(not(unix))]
compile_error!("asl-client requires a Unix platform");

pub mod attributes;
pub mod aux_file;
pub mod client;
pub mod constants;
pub mod cursor;
pub mod error;
pub mod facility;
pub mod local;
pub mod message;
pub mod operator;
pub mod query;
pub mod store;
mod sys;
pub mod types;

pub use attributes::AttributeMap;
pub use aux_file::AuxiliaryFile;
pub use client::{Auxiliary, Client, Redirection};
pub use cursor::{CursorState, SearchCursor};
pub use error::{AslError, ErrorKind, Result};
pub use facility::{Capabilities, Connection, Facility, MatchHandle};
pub use local::{LocalFacility, LocalFacilityConfig, DEFAULT_AUX_UTI};
pub use message::Message;
pub use operator::{Comparison, Modifiers, QueryOperator};
pub use query::{CompiledQuery, QueryTerm};
pub use store::{LocalStore, LocalStoreConfig};
pub use sys::{current_gid, current_uid};
pub use types::{DescriptorDirection, Direction, FilterMask, Level, MessageKind, OpenOptions};
