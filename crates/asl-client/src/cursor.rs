//! Lazy iteration over search results.

use std::fmt;
use std::iter::FusedIterator;

use tracing::trace;

use crate::error::Result;
use crate::facility::MatchHandle;
use crate::message::Message;

/// Whether a cursor can still yield records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// More records may follow.
    Active,
    /// The search is finished; the cursor yields nothing further.
    Exhausted,
}

/// Iterator over the records matching a query.
///
/// Each call to [`next`](Iterator::next) pulls one record from the facility.
/// Once the facility reports the end, the underlying search handle is
/// released and the cursor stays exhausted. A failed pull is yielded as an
/// `Err` and leaves the cursor active.
///
/// The cursor borrows the [`Client`](crate::Client) that created it, so the
/// client cannot be closed while the cursor is alive.
pub struct SearchCursor<'a> {
    handle: Option<Box<dyn MatchHandle + 'a>>,
}

impl<'a> SearchCursor<'a> {
    pub(crate) fn new(handle: Box<dyn MatchHandle + 'a>) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> CursorState {
        if self.handle.is_some() {
            CursorState::Active
        } else {
            CursorState::Exhausted
        }
    }

    /// Returns true once the search has finished.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.handle.is_none()
    }
}

impl Iterator for SearchCursor<'_> {
    type Item = Result<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.handle.as_mut()?;
        match handle.next_match() {
            Ok(Some(attributes)) => Some(Ok(Message::from_attributes(attributes))),
            Ok(None) => {
                trace!("search exhausted");
                self.handle = None;
                None
            }
            Err(error) => Some(Err(error)),
        }
    }
}

impl FusedIterator for SearchCursor<'_> {}

impl fmt::Debug for SearchCursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchCursor")
            .field("state", &self.state())
            .finish()
    }
}
