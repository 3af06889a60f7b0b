use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Kind of calendar entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A window during which a service can be booked.
    Availability,
    Booking,
    #[default]
    #[serde(other)]
    Other,
}

/// Event as returned by the calendar service. Times are naive local times of
/// the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(default)]
    pub kind: EventKind,
    /// Service the event belongs to. `None` on an availability window means
    /// any service may be booked in it.
    #[serde(default)]
    pub service_id: Option<String>,
}

impl CalendarEvent {
    /// Whether `[start, end)` lies inside this event.
    pub fn contains(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.start <= start && end <= self.end
    }

    /// Whether the event applies to the given service.
    pub fn serves(&self, service_id: &str) -> bool {
        self.service_id.as_deref().map_or(true, |id| id == service_id)
    }
}

/// Event to be created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCalendarEvent {
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub kind: EventKind,
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub attendee_email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_window_contains_span() {
        let window = CalendarEvent {
            id: "w1".into(),
            summary: "Open studio".into(),
            description: None,
            start: at(9, 0),
            end: at(17, 0),
            kind: EventKind::Availability,
            service_id: None,
        };
        assert!(window.contains(at(14, 0), at(15, 0)));
        assert!(window.contains(at(16, 0), at(17, 0)));
        assert!(!window.contains(at(16, 30), at(17, 30)));
        assert!(window.serves("anything"));
    }

    #[test]
    fn test_unknown_kind_is_other() {
        let kind: EventKind = serde_json::from_str("\"holiday\"").unwrap();
        assert_eq!(kind, EventKind::Other);
    }
}
