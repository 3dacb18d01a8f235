//! Query command implementation.
//!
//! Builds a query message from `-k`/`-e`/`-C` terms, runs it, and prints
//! each matching record.

use std::io::Write;

use asl_client::constants::keys;
use asl_client::{Client, Direction, Facility, Message, OpenOptions, QueryOperator};
use tracing::debug;

use super::consolelog::CONSOLE_FACILITY;
use crate::cli::QueryArgs;
use crate::error::CliError;
use crate::output::{OutputFormat, RecordList, render_template};

/// Handler for the query command.
pub struct QueryCommand<'a, F: Facility + ?Sized> {
    facility: &'a F,
}

impl<'a, F: Facility + ?Sized> QueryCommand<'a, F> {
    /// Creates a new query command handler.
    #[must_use]
    pub const fn new(facility: &'a F) -> Self {
        Self { facility }
    }

    /// Executes the query command.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::InvalidArgument`] for an unknown operator, or the
    /// client, formatting or write error.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &QueryArgs,
    ) -> Result<(), CliError> {
        let query = build_query(args)?;
        let direction = if args.reverse { Direction::Reverse } else { Direction::Forward };

        let client = Client::open(self.facility, None, "user", OpenOptions::empty())?;
        let records = client
            .search_with_direction(&query, direction)?
            .map(|found| found.map(|m| m.as_mapping()))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = records.len(), "query complete");

        match args.fmt.as_deref() {
            Some(template) if !format.is_json() => {
                for record in &records {
                    writeln!(out, "{}", render_template(template, record)?)?;
                }
            }
            _ => format.write(out, &RecordList { records })?,
        }
        Ok(())
    }
}

/// Translates command-line terms into a query message.
///
/// # Errors
///
/// Returns [`CliError::InvalidArgument`] naming the first unknown operator.
pub fn build_query(args: &QueryArgs) -> Result<Message, CliError> {
    let mut query = Message::new_query();
    if args.console {
        query.set_query(keys::FACILITY, CONSOLE_FACILITY, QueryOperator::equal())?;
    }
    for (key, op, value) in args.terms() {
        let operator: QueryOperator = op
            .parse()
            .map_err(|_| CliError::InvalidArgument(format!("Invalid query operation: {op}")))?;
        query.set_query(key, value, operator)?;
    }
    for key in &args.exists {
        query.set_query(key, "", QueryOperator::exists())?;
    }
    Ok(query)
}
