//! Sendlog command implementation.

use asl_client::{Client, Facility, Message, OpenOptions};

use crate::cli::SendlogArgs;
use crate::error::CliError;

/// Facility name sent records are filed under when they carry none.
pub const USER_FACILITY: &str = "user";

/// Handler for the sendlog command.
pub struct SendlogCommand<'a, F: Facility + ?Sized> {
    facility: &'a F,
}

impl<'a, F: Facility + ?Sized> SendlogCommand<'a, F> {
    /// Creates a new sendlog command handler.
    #[must_use]
    pub const fn new(facility: &'a F) -> Self {
        Self { facility }
    }

    /// Sends one record holding every pair.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::InvalidArgument`] when no pairs were given, or
    /// the client error if sending fails.
    pub fn execute(&self, args: &SendlogArgs) -> Result<(), CliError> {
        let mut record = Message::new_record();
        let mut any = false;
        for (key, value) in args.pairs() {
            record.set_attribute(key, value)?;
            any = true;
        }
        if !any {
            return Err(CliError::InvalidArgument("No message arguments specified".into()));
        }

        let client = Client::open(self.facility, None, USER_FACILITY, OpenOptions::empty())?;
        client.send(&record)?;
        Ok(())
    }
}
