//! Core value types shared by messages, clients and facilities.
//!
//! This module provides:
//! - [`Level`] - Severity levels 0 (most severe) to 7 (most verbose)
//! - [`FilterMask`] - Set of levels a client accepts
//! - [`OpenOptions`] - Client open flags
//! - [`MessageKind`] - Record or query
//! - [`Direction`] - Search order
//! - [`DescriptorDirection`] - Redirection direction

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::AslError;

/// Record severity, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Level {
    /// System is unusable
    Emergency = 0,
    /// Action must be taken immediately
    Alert = 1,
    /// Critical condition
    Critical = 2,
    /// Error condition
    Error = 3,
    /// Warning condition
    Warning = 4,
    /// Normal but significant condition
    Notice = 5,
    /// Informational
    Info = 6,
    /// Debugging detail
    Debug = 7,
}

impl Level {
    /// All levels, most severe first.
    pub const ALL: [Self; 8] = [
        Self::Emergency,
        Self::Alert,
        Self::Critical,
        Self::Error,
        Self::Warning,
        Self::Notice,
        Self::Info,
        Self::Debug,
    ];

    /// Returns the numeric code of this level.
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Returns the level for a numeric code.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::InvalidLevel`] for codes outside 0..=7.
    pub fn from_code(code: i64) -> Result<Self, AslError> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
            .ok_or(AslError::InvalidLevel(code))
    }

    /// Returns the display name of this level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Emergency => "Emergency",
            Self::Alert => "Alert",
            Self::Critical => "Critical",
            Self::Error => "Error",
            Self::Warning => "Warning",
            Self::Notice => "Notice",
            Self::Info => "Info",
            Self::Debug => "Debug",
        }
    }

    /// Interprets the value stored under the `Level` key.
    ///
    /// Accepts numeric codes and level names; anything else yields `None`.
    #[must_use]
    pub fn from_attribute(value: &str) -> Option<Self> {
        value.trim().parse().ok()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = AslError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.parse::<i64>() {
            return Self::from_code(code);
        }
        match s.to_ascii_lowercase().as_str() {
            "emergency" | "emerg" | "panic" => Ok(Self::Emergency),
            "alert" => Ok(Self::Alert),
            "critical" | "crit" => Ok(Self::Critical),
            "error" | "err" => Ok(Self::Error),
            "warning" | "warn" => Ok(Self::Warning),
            "notice" => Ok(Self::Notice),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            _ => Err(AslError::invalid_argument(format!("unknown level name: {s}"))),
        }
    }
}

impl From<Level> for u32 {
    fn from(level: Level) -> Self {
        level.code()
    }
}

/// Bit set of severity levels accepted by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterMask(pub u32);

impl FilterMask {
    /// Mask accepting nothing.
    pub const NONE: Self = Self(0);

    /// Mask accepting every level.
    pub const ALL: Self = Self(constants::filter_mask_upto(constants::level::DEBUG));

    /// Mask with only `level` set.
    #[must_use]
    pub const fn of(level: Level) -> Self {
        Self(constants::filter_mask(level.code()))
    }

    /// Mask with `level` and every more severe level set.
    #[must_use]
    pub const fn upto(level: Level) -> Self {
        Self(constants::filter_mask_upto(level.code()))
    }

    /// Returns true if records at `level` pass this mask.
    #[must_use]
    pub const fn contains(self, level: Level) -> bool {
        self.0 & constants::filter_mask(level.code()) != 0
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl Default for FilterMask {
    fn default() -> Self {
        Self::upto(Level::Notice)
    }
}

impl From<u32> for FilterMask {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl From<FilterMask> for u32 {
    fn from(mask: FilterMask) -> Self {
        mask.0
    }
}

impl std::ops::BitOr for FilterMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

bitflags! {
    /// Options accepted when opening a client.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct OpenOptions: u32 {
        /// Mirror every accepted record to standard error.
        const STDERR = constants::open_option::STDERR;
        /// Connect to the facility immediately.
        const NO_DELAY = constants::open_option::NO_DELAY;
        /// Ignore filter changes requested by the facility.
        const NO_REMOTE = constants::open_option::NO_REMOTE;
    }
}

impl TryFrom<u32> for OpenOptions {
    type Error = AslError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        Self::from_bits(bits)
            .ok_or_else(|| AslError::invalid_argument(format!("unknown open options: {bits:#x}")))
    }
}

/// Kind of a [`Message`](crate::Message), fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// A log record
    Record,
    /// A search predicate
    Query,
}

impl MessageKind {
    /// Returns the numeric code of this kind.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Record => constants::message_type::MSG,
            Self::Query => constants::message_type::QUERY,
        }
    }

    /// Returns the lowercase name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Record => "record",
            Self::Query => "query",
        }
    }
}

impl TryFrom<u32> for MessageKind {
    type Error = AslError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            constants::message_type::MSG => Ok(Self::Record),
            constants::message_type::QUERY => Ok(Self::Query),
            other => Err(AslError::InvalidKind(other)),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order in which a search yields matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Oldest match first
    #[default]
    Forward,
    /// Newest match first
    Reverse,
}

impl Direction {
    /// Returns the numeric code of this direction.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Forward => constants::match_direction::FORWARD,
            Self::Reverse => constants::match_direction::REVERSE,
        }
    }
}

impl TryFrom<i32> for Direction {
    type Error = AslError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            constants::match_direction::FORWARD => Ok(Self::Forward),
            constants::match_direction::REVERSE => Ok(Self::Reverse),
            other => Err(AslError::InvalidDirection(other)),
        }
    }
}

/// Direction of a descriptor redirected into the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorDirection {
    /// Lines read from the descriptor are logged
    Read,
    /// Lines written to the descriptor are logged
    Write,
}

impl DescriptorDirection {
    /// Returns the numeric code of this direction.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Read => constants::descriptor::READ,
            Self::Write => constants::descriptor::WRITE,
        }
    }
}

impl TryFrom<i32> for DescriptorDirection {
    type Error = AslError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            constants::descriptor::READ => Ok(Self::Read),
            constants::descriptor::WRITE => Ok(Self::Write),
            other => Err(AslError::InvalidDirection(other)),
        }
    }
}
