//! Calendar collaborator interface.
//!
//! Task operations push due dates to a calendar when one is configured.
//! Calendar failures are logged and never affect task state.

use chrono::NaiveDate;

use crate::error::Result;

/// An event on an external calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    /// Event title.
    pub summary: String,
    /// Day the event falls on.
    pub date: NaiveDate,
}

/// An external calendar that tasks with due dates can be mirrored to.
pub trait CalendarSync {
    /// Create an event for a task due on `due`.
    ///
    /// # Errors
    ///
    /// Returns an error if the calendar rejects or cannot receive the event.
    fn create_event(&self, description: &str, due: NaiveDate) -> Result<()>;

    /// Events between `from` and `to`, inclusive.
    ///
    /// # Errors
    ///
    /// Returns an error if the calendar cannot be queried.
    fn upcoming(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<CalendarEvent>>;
}

/// The default calendar: accepts everything and stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCalendar;

impl CalendarSync for NoCalendar {
    fn create_event(&self, _description: &str, _due: NaiveDate) -> Result<()> {
        Ok(())
    }

    fn upcoming(&self, _from: NaiveDate, _to: NaiveDate) -> Result<Vec<CalendarEvent>> {
        Ok(Vec::new())
    }
}
