//! Stable names and numeric codes shared with the log facility.
//!
//! These values are part of the public contract and are never renumbered.
//! The well-known keys are conventions only: an [`AttributeMap`] accepts any
//! key, and nothing in this crate validates records against this table.
//!
//! [`AttributeMap`]: crate::AttributeMap

/// API revision of the facility interface these constants describe.
pub const API_VERSION: u32 = 20_150_225;

/// Well-known attribute keys.
pub mod keys {
    /// Seconds since the epoch when the record was created.
    pub const TIME: &str = "Time";
    /// Nanosecond part of [`TIME`].
    pub const TIME_NSEC: &str = "TimeNanoSec";
    /// Host that generated the record.
    pub const HOST: &str = "Host";
    /// Sender identifier (process name unless set at open).
    pub const SENDER: &str = "Sender";
    /// Facility (category) of the record.
    pub const FACILITY: &str = "Facility";
    /// Sending process id.
    pub const PID: &str = "PID";
    /// Sending user id.
    pub const UID: &str = "UID";
    /// Sending group id.
    pub const GID: &str = "GID";
    /// Severity level.
    pub const LEVEL: &str = "Level";
    /// Message text.
    pub const MSG: &str = "Message";
    /// User allowed to read the record.
    pub const READ_UID: &str = "ReadUID";
    /// Group allowed to read the record.
    pub const READ_GID: &str = "ReadGID";
    /// Seconds since the epoch after which the record may be discarded.
    pub const EXPIRE_TIME: &str = "ASLExpireTime";
    /// Store-assigned record id. Reserved to the facility: every accepted
    /// record gets a fresh id, replacing any value the caller set.
    pub const MSG_ID: &str = "ASLMessageID";
    /// Session identifier.
    pub const SESSION: &str = "Session";
    /// Referenced process id.
    pub const REF_PID: &str = "RefPID";
    /// Referenced process name.
    pub const REF_PROC: &str = "RefProc";
    /// Title of an auxiliary attachment.
    pub const AUX_TITLE: &str = "ASLAuxTitle";
    /// Content type of an auxiliary attachment.
    pub const AUX_UTI: &str = "ASLAuxUTI";
    /// Location of an auxiliary attachment.
    pub const AUX_URL: &str = "ASLAuxURL";
    /// Inline data of an auxiliary attachment.
    pub const AUX_DATA: &str = "ASLAuxData";
    /// Facility option string.
    pub const OPTION: &str = "ASLOption";
    /// Module that handled the record.
    pub const MODULE: &str = "ASLModule";
    /// Sender instance id.
    pub const SENDER_INSTANCE: &str = "SenderInstance";
    /// Sender Mach-O UUID.
    pub const SENDER_MACH_UUID: &str = "SenderMachUUID";
    /// Final notification marker.
    pub const FINAL_NOTIFICATION: &str = "ASLFinalNotification";
    /// Activity id.
    pub const OS_ACTIVITY_ID: &str = "OSActivityID";

    /// All well-known keys, for documentation and completion.
    pub const ALL: &[&str] = &[
        TIME,
        TIME_NSEC,
        HOST,
        SENDER,
        FACILITY,
        PID,
        UID,
        GID,
        LEVEL,
        MSG,
        READ_UID,
        READ_GID,
        EXPIRE_TIME,
        MSG_ID,
        SESSION,
        REF_PID,
        REF_PROC,
        AUX_TITLE,
        AUX_UTI,
        AUX_URL,
        AUX_DATA,
        OPTION,
        MODULE,
        SENDER_INSTANCE,
        SENDER_MACH_UUID,
        FINAL_NOTIFICATION,
        OS_ACTIVITY_ID,
    ];
}

/// Severity level codes, 0 is the most severe.
pub mod level {
    /// System is unusable.
    pub const EMERG: u32 = 0;
    /// Action must be taken immediately.
    pub const ALERT: u32 = 1;
    /// Critical condition.
    pub const CRIT: u32 = 2;
    /// Error condition.
    pub const ERR: u32 = 3;
    /// Warning condition.
    pub const WARNING: u32 = 4;
    /// Normal but significant condition.
    pub const NOTICE: u32 = 5;
    /// Informational.
    pub const INFO: u32 = 6;
    /// Debugging detail.
    pub const DEBUG: u32 = 7;
}

/// Query operator codes: a base comparison OR-ed with modifier bits.
pub mod query_op {
    /// Compare case-insensitively.
    pub const CASEFOLD: u32 = 0x0010;
    /// Match a prefix.
    pub const PREFIX: u32 = 0x0020;
    /// Match a suffix.
    pub const SUFFIX: u32 = 0x0040;
    /// Match a substring (prefix and suffix).
    pub const SUBSTRING: u32 = 0x0060;
    /// Compare as integers.
    pub const NUMERIC: u32 = 0x0080;
    /// Match a regular expression.
    pub const REGEX: u32 = 0x0100;

    /// Equal.
    pub const EQUAL: u32 = 0x0001;
    /// Greater than.
    pub const GREATER: u32 = 0x0002;
    /// Greater than or equal.
    pub const GREATER_EQUAL: u32 = 0x0003;
    /// Less than.
    pub const LESS: u32 = 0x0004;
    /// Less than or equal.
    pub const LESS_EQUAL: u32 = 0x0005;
    /// Not equal.
    pub const NOT_EQUAL: u32 = 0x0006;
    /// Always true when the key is present.
    pub const TRUE: u32 = 0x0007;

    /// Bits holding the base comparison.
    pub const BASE_MASK: u32 = 0x000f;
}

/// Message kind codes.
pub mod message_type {
    /// Undefined kind.
    pub const UNDEF: u32 = 0xffff_ffff;
    /// A log record.
    pub const MSG: u32 = 0;
    /// A search predicate.
    pub const QUERY: u32 = 1;
    /// A list of messages.
    pub const LIST: u32 = 2;
    /// A store file.
    pub const FILE: u32 = 3;
    /// A store.
    pub const STORE: u32 = 4;
    /// A client connection.
    pub const CLIENT: u32 = 5;
}

/// Search direction codes.
pub mod match_direction {
    /// Oldest record first.
    pub const FORWARD: i32 = 1;
    /// Newest record first.
    pub const REVERSE: i32 = -1;
}

/// Filter mask bits, one per level.
pub mod filter_mask {
    /// [`EMERG`](super::level::EMERG) bit.
    pub const EMERG: u32 = 0x01;
    /// [`ALERT`](super::level::ALERT) bit.
    pub const ALERT: u32 = 0x02;
    /// [`CRIT`](super::level::CRIT) bit.
    pub const CRIT: u32 = 0x04;
    /// [`ERR`](super::level::ERR) bit.
    pub const ERR: u32 = 0x08;
    /// [`WARNING`](super::level::WARNING) bit.
    pub const WARNING: u32 = 0x10;
    /// [`NOTICE`](super::level::NOTICE) bit.
    pub const NOTICE: u32 = 0x20;
    /// [`INFO`](super::level::INFO) bit.
    pub const INFO: u32 = 0x40;
    /// [`DEBUG`](super::level::DEBUG) bit.
    pub const DEBUG: u32 = 0x80;
}

/// Client open option bits.
pub mod open_option {
    /// Mirror records to standard error.
    pub const STDERR: u32 = 0x01;
    /// Connect immediately.
    pub const NO_DELAY: u32 = 0x02;
    /// Ignore remote filter changes.
    pub const NO_REMOTE: u32 = 0x04;
}

/// Store open option bits.
pub mod store_option {
    /// Open for writing.
    pub const OPEN_WRITE: u32 = 0x01;
    /// Create the store if missing.
    pub const CREATE_STORE: u32 = 0x02;
}

/// Descriptor redirection direction codes.
pub mod descriptor {
    /// Read lines from the descriptor.
    pub const READ: i32 = 1;
    /// Capture lines written to the descriptor.
    pub const WRITE: i32 = 2;
}

/// Names of record display formats.
pub mod msg_fmt {
    /// All keys, raw.
    pub const RAW: &str = "raw";
    /// Standard one-line format.
    pub const STD: &str = "std";
    /// BSD syslog format.
    pub const BSD: &str = "bsd";
    /// XML property list.
    pub const XML: &str = "xml";
    /// Message text only.
    pub const MSG: &str = "msg";
}

/// Names of time display formats.
pub mod time_fmt {
    /// Seconds since the epoch.
    pub const SEC: &str = "sec";
    /// UTC.
    pub const UTC: &str = "utc";
    /// Local time.
    pub const LCL: &str = "lcl";
}

/// Text encoding styles for display.
pub mod encode {
    /// No encoding.
    pub const NONE: u32 = 0;
    /// Escape control characters.
    pub const SAFE: u32 = 1;
    /// Facility escaping.
    pub const ASL: u32 = 2;
    /// XML escaping.
    pub const XML: u32 = 3;
}

/// Facility name used for records shown in the system console.
pub const CONSOLE_FACILITY: &str = "com.apple.console";

/// Facility name used when none is given.
pub const DEFAULT_FACILITY: &str = "user";

/// Returns the filter mask bit for a single level: `1 << level`.
///
/// Levels past the width of the mask yield an empty mask.
#[must_use]
pub const fn filter_mask(level: u32) -> u32 {
    match 1u32.checked_shl(level) {
        Some(bit) => bit,
        None => 0,
    }
}

/// Returns the mask of all levels up to and including `level`:
/// `(1 << (level + 1)) - 1`.
#[must_use]
pub const fn filter_mask_upto(level: u32) -> u32 {
    if level >= 31 {
        u32::MAX
    } else {
        (1u32 << (level + 1)) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_is_single_bit() {
        for level in 0..=7 {
            assert_eq!(filter_mask(level), 1 << level);
        }
        assert_eq!(filter_mask(8), 1 << 8);
        assert_eq!(filter_mask(40), 0);
    }

    #[test]
    fn mask_upto_covers_lower_levels() {
        for level in 0..=7 {
            assert_eq!(filter_mask_upto(level), (1 << (level + 1)) - 1);
        }
        assert_eq!(filter_mask_upto(0), 1);
        assert_eq!(filter_mask_upto(1), 3);
        assert_eq!(filter_mask_upto(8), 511);
        assert_eq!(filter_mask_upto(31), u32::MAX);
    }

    #[test]
    fn named_masks_match_levels() {
        assert_eq!(filter_mask::EMERG, filter_mask(level::EMERG));
        assert_eq!(filter_mask::NOTICE, filter_mask(level::NOTICE));
        assert_eq!(filter_mask::DEBUG, filter_mask(level::DEBUG));
    }

    #[test]
    fn substring_is_prefix_and_suffix() {
        assert_eq!(query_op::SUBSTRING, query_op::PREFIX | query_op::SUFFIX);
    }

    #[test]
    fn well_known_keys_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for key in keys::ALL {
            assert!(seen.insert(*key), "duplicate key {key}");
        }
        assert_eq!(keys::ALL.len(), 27);
    }
}
