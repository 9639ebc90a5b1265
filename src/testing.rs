//! Testing utilities and mock implementations.
//!
//! These types are provided for use in tests. They may appear unused in
//! the library itself but are consumed by unit tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use chrono::NaiveDate;

use crate::calendar::{CalendarEvent, CalendarSync};
use crate::error::{Error, Result};

/// A mock calendar that records created events.
///
/// Clones share the same record, so a test can keep one handle and give
/// another to a [`Session`](crate::tasks::Session).
#[derive(Debug, Default, Clone)]
pub struct MockCalendar {
    events: Rc<RefCell<Vec<CalendarEvent>>>,
    fail: bool,
}

impl MockCalendar {
    /// Create a mock calendar that accepts every event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock calendar whose every call fails.
    #[must_use]
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    /// Events created so far, as `(summary, date)` pairs.
    #[must_use]
    pub fn created(&self) -> Vec<(String, NaiveDate)> {
        self.events.borrow().iter().map(|e| (e.summary.clone(), e.date)).collect()
    }
}

impl CalendarSync for MockCalendar {
    fn create_event(&self, description: &str, due: NaiveDate) -> Result<()> {
        if self.fail {
            return Err(Error::Calendar("mock calendar unavailable".to_string()));
        }
        self.events
            .borrow_mut()
            .push(CalendarEvent { summary: description.to_string(), date: due });
        Ok(())
    }

    fn upcoming(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<CalendarEvent>> {
        if self.fail {
            return Err(Error::Calendar("mock calendar unavailable".to_string()));
        }
        Ok(self
            .events
            .borrow()
            .iter()
            .filter(|e| e.date >= from && e.date <= to)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn test_mock_calendar_records_and_filters() {
        let calendar = MockCalendar::new();
        let handle = calendar.clone();
        calendar.create_event("early", day(1)).unwrap();
        calendar.create_event("late", day(20)).unwrap();

        assert_eq!(handle.created().len(), 2);
        let events = handle.upcoming(day(10), day(25)).unwrap();
        assert_eq!(events, vec![CalendarEvent { summary: "late".to_string(), date: day(20) }]);
    }

    #[test]
    fn test_failing_calendar() {
        let calendar = MockCalendar::failing();
        assert!(calendar.create_event("x", day(1)).is_err());
        assert!(calendar.upcoming(day(1), day(2)).is_err());
        assert!(calendar.created().is_empty());
    }
}
