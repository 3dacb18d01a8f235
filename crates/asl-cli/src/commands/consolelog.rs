//! Consolelog command implementation.

use asl_client::constants::keys;
use asl_client::{Client, Facility, Message, OpenOptions, current_uid};
use tracing::debug;

use crate::cli::ConsolelogArgs;
use crate::error::CliError;

/// Facility name console messages are filed under.
pub const CONSOLE_FACILITY: &str = "com.apple.console";

/// Handler for the consolelog command.
pub struct ConsolelogCommand<'a, F: Facility + ?Sized> {
    facility: &'a F,
}

impl<'a, F: Facility + ?Sized> ConsolelogCommand<'a, F> {
    /// Creates a new consolelog command handler.
    #[must_use]
    pub const fn new(facility: &'a F) -> Self {
        Self { facility }
    }

    /// Logs the message, readable by the calling user.
    ///
    /// # Errors
    ///
    /// Returns error if the client cannot be opened or the message logged.
    pub fn execute(&self, args: &ConsolelogArgs) -> Result<(), CliError> {
        let client = Client::open(
            self.facility,
            args.ident.as_deref(),
            CONSOLE_FACILITY,
            OpenOptions::empty(),
        )?;

        let mut record = Message::new_record();
        record.set_attribute(keys::FACILITY, CONSOLE_FACILITY)?;
        record.set_attribute(keys::READ_UID, &current_uid().to_string())?;

        let text = args.text();
        debug!(level = %args.level, "logging to console");
        client.log(Some(&record), args.level, &text)?;
        Ok(())
    }
}
