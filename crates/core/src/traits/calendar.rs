//! Calendar booking service trait.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::Result;
use crate::types::{CalendarEvent, NewCalendarEvent};

/// External scheduling service.
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Events overlapping `[from, to)`.
    async fn list_events(
        &self,
        calendar_id: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<CalendarEvent>>;

    /// Create an event and return it with its assigned id.
    async fn create_event(&self, calendar_id: &str, event: NewCalendarEvent) -> Result<CalendarEvent>;

    /// Share the calendar with an email address.
    async fn share(&self, calendar_id: &str, email: &str) -> Result<()>;
}
