//! Availability, booking and slot tools backed by the calendar service.
//!
//! A bookable session is an `availability` event (for one service, or for
//! any service when it has no service id). Bookings are `booking` events
//! tagged with the service id; bookings starting within a minute of each
//! other count against the same session's capacity.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde_json::{json, Map, Value};

use concierge_core::{
    CalendarEvent, ComponentSpec, EventKind, FunctionResult, NewCalendarEvent, Result, ToolName,
    ERR_FULLY_BOOKED, ERR_NO_CLASS_SCHEDULED,
};

use super::{arg_date, arg_str, arg_time};
use crate::context::ToolContext;
use crate::records::{find_service, ServiceRecord};
use crate::tool::BusinessTool;
use crate::validation::{FieldKind, FieldSpec};

/// Two bookings within this distance start the same session.
const SAME_SESSION_TOLERANCE_MINUTES: i64 = 1;
/// Slots returned by one slot listing.
const MAX_SLOTS: usize = 50;

fn is_booking_for(event: &CalendarEvent, service_id: &str, start: NaiveDateTime) -> bool {
    event.kind == EventKind::Booking
        && event.service_id.as_deref() == Some(service_id)
        && (event.start - start).num_minutes().abs() <= SAME_SESSION_TOLERANCE_MINUTES
}

/// Bookings already taken for the session of `service_id` starting at `start`.
fn bookings_at(events: &[CalendarEvent], service_id: &str, start: NaiveDateTime) -> usize {
    events.iter().filter(|e| is_booking_for(e, service_id, start)).count()
}

fn windows_for<'a>(events: &'a [CalendarEvent], service_id: Option<&'a str>) -> impl Iterator<Item = &'a CalendarEvent> {
    events
        .iter()
        .filter(move |e| e.kind == EventKind::Availability && service_id.map_or(true, |id| e.serves(id)))
}

fn day_start(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap_or_default()
}

/// Resolve the requested service, or a user-facing failure.
async fn resolve_service(ctx: &ToolContext, reference: &str) -> std::result::Result<ServiceRecord, FunctionResult> {
    let Some(services) = ctx.services().await else {
        return Err(services_unavailable());
    };
    find_service(&services, reference)
        .cloned()
        .ok_or_else(|| unknown_service(reference))
}

fn services_unavailable() -> FunctionResult {
    FunctionResult::unavailable("I couldn't load the list of services right now.")
}

fn unknown_service(reference: &str) -> FunctionResult {
    FunctionResult::unavailable(format!("I couldn't find a service called \"{}\".", reference))
}

// =============================================================================
// check_availability
// =============================================================================

/// Availability windows on a date, with remaining spots.
pub struct CheckAvailabilityTool;

#[async_trait]
impl BusinessTool for CheckAvailabilityTool {
    fn name(&self) -> ToolName {
        ToolName::CheckAvailability
    }

    fn description(&self) -> &'static str {
        "Check whether the store has availability on a specific date, optionally for one service."
    }

    fn specs(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::required("date", FieldKind::Date, "Date to check (YYYY-MM-DD)"),
            FieldSpec::optional("service", FieldKind::String, "Service name or id"),
        ]
    }

    async fn execute(&self, ctx: &ToolContext, args: Map<String, Value>) -> Result<FunctionResult> {
        let Some(date) = arg_date(&args, "date") else {
            return Ok(FunctionResult::invalid(vec!["date is required".into()]));
        };
        let services = ctx.services().await;
        let service = match arg_str(&args, "service") {
            Some(reference) => match services.as_deref().map(|all| find_service(all, reference)) {
                Some(Some(service)) => Some(service.clone()),
                Some(None) => return Ok(unknown_service(reference)),
                None => return Ok(services_unavailable()),
            },
            None => None,
        };
        let services = services.unwrap_or_default();

        let from = day_start(date);
        let to = from + Duration::days(1);
        let events = ctx.calendar.list_events(&ctx.calendar_id, from, to).await?;

        // Windows spanning several days are reported for this day only.
        let mut windows: Vec<(&CalendarEvent, NaiveDateTime, NaiveDateTime)> =
            windows_for(&events, service.as_ref().map(|s| s.id.as_str()))
                .filter(|w| w.start < to && w.end > from)
                .map(|w| (w, w.start.max(from), w.end.min(to)))
                .collect();
        windows.sort_by_key(|(_, start, _)| *start);

        let windows: Vec<Value> = windows
            .into_iter()
            .map(|(w, start, end)| {
                let session_service = service
                    .as_ref()
                    .or_else(|| w.service_id.as_deref().and_then(|id| find_service(&services, id)));
                let capacity = session_service.map(|s| s.capacity).unwrap_or(ctx.default_capacity.max(1));
                let booked = match session_service {
                    Some(s) => bookings_at(&events, &s.id, start),
                    None => 0,
                };
                let end = if end == to {
                    "24:00".to_string()
                } else {
                    end.format("%H:%M").to_string()
                };
                json!({
                    "id": w.id,
                    "summary": w.summary,
                    "service_id": session_service.map(|s| s.id.clone()),
                    "date": date.format("%Y-%m-%d").to_string(),
                    "start": start.format("%H:%M").to_string(),
                    "end": end,
                    "capacity": capacity,
                    "spots_remaining": (capacity as usize).saturating_sub(booked),
                })
            })
            .collect();

        let available = windows.iter().any(|w| w["spots_remaining"].as_u64().unwrap_or(0) > 0);
        Ok(FunctionResult::ok(json!({
            "date": date.format("%Y-%m-%d").to_string(),
            "service": service.as_ref().map(|s| s.name.clone()),
            "available": available,
            "windows": windows,
        })))
    }
}

// =============================================================================
// create_booking
// =============================================================================

/// Books a session after checking the schedule and remaining capacity.
pub struct CreateBookingTool;

#[async_trait]
impl BusinessTool for CreateBookingTool {
    fn name(&self) -> ToolName {
        ToolName::CreateBooking
    }

    fn description(&self) -> &'static str {
        "Book a service at a specific date and time once the customer has chosen a slot."
    }

    fn specs(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::required("service", FieldKind::String, "Service name or id"),
            FieldSpec::required("date", FieldKind::Date, "Session date (YYYY-MM-DD)"),
            FieldSpec::required("time", FieldKind::Time, "Session start time (HH:MM, 24h)"),
            FieldSpec::required("customer_name", FieldKind::String, "Customer's full name"),
            FieldSpec::required("customer_email", FieldKind::Email, "Customer's email address"),
            FieldSpec::optional("customer_phone", FieldKind::Phone, "Customer's phone number"),
            FieldSpec::optional("notes", FieldKind::String, "Anything the studio should know"),
        ]
    }

    async fn execute(&self, ctx: &ToolContext, args: Map<String, Value>) -> Result<FunctionResult> {
        let (Some(date), Some(time)) = (arg_date(&args, "date"), arg_time(&args, "time")) else {
            return Ok(FunctionResult::invalid(vec!["date and time are required".into()]));
        };
        let reference = arg_str(&args, "service").unwrap_or_default();
        let service = match resolve_service(ctx, reference).await {
            Ok(service) => service,
            Err(failure) => return Ok(failure),
        };

        let start = date.and_time(time);
        let end = start + Duration::minutes(service.duration_minutes as i64);
        let tolerance = Duration::minutes(SAME_SESSION_TOLERANCE_MINUTES);
        let events = ctx
            .calendar
            .list_events(&ctx.calendar_id, start - tolerance, end.max(start + tolerance + tolerance))
            .await?;

        let date_text = date.format("%Y-%m-%d").to_string();
        let time_text = time.format("%H:%M").to_string();
        let details = json!({
            "service": service.name,
            "service_id": service.id,
            "date": date_text,
            "time": time_text,
            "capacity": service.capacity,
        });

        // Step 1: the session must exist.
        let scheduled = windows_for(&events, Some(service.id.as_str())).any(|w| w.contains(start, end));
        if !scheduled {
            tracing::info!(store_id = %ctx.store_id, service = %service.id, %start, "No session scheduled");
            let mut result = FunctionResult::failure(
                ERR_NO_CLASS_SCHEDULED,
                format!("There's no {} session scheduled at {} on {}.", service.name, time_text, date_text),
            );
            result.data = Some(details);
            return Ok(result);
        }

        // Step 2: it must have room.
        let existing = bookings_at(&events, &service.id, start);
        if existing >= service.capacity as usize {
            tracing::info!(store_id = %ctx.store_id, service = %service.id, %start, existing, "Session fully booked");
            let mut result = FunctionResult::failure(
                ERR_FULLY_BOOKED,
                format!("The {} session at {} on {} is fully booked.", service.name, time_text, date_text),
            );
            result.data = Some(details);
            return Ok(result);
        }

        let customer_name = arg_str(&args, "customer_name").unwrap_or_default();
        let customer_email = arg_str(&args, "customer_email").unwrap_or_default();
        let mut description = format!("Customer: {}\nEmail: {}", customer_name, customer_email);
        if let Some(phone) = arg_str(&args, "customer_phone") {
            description.push_str(&format!("\nPhone: {}", phone));
        }
        if let Some(notes) = arg_str(&args, "notes") {
            description.push_str(&format!("\nNotes: {}", notes));
        }

        let created = ctx
            .calendar
            .create_event(
                &ctx.calendar_id,
                NewCalendarEvent {
                    summary: format!("{}: {}", service.name, customer_name),
                    description: Some(description),
                    start,
                    end,
                    kind: EventKind::Booking,
                    service_id: Some(service.id.clone()),
                    attendee_email: Some(customer_email.to_string()),
                },
            )
            .await?;

        let remaining = (service.capacity as usize).saturating_sub(existing + 1);
        tracing::info!(
            store_id = %ctx.store_id,
            service = %service.id,
            booking_id = %created.id,
            remaining,
            "Booking created"
        );

        Ok(FunctionResult::ok(json!({
            "booking_id": created.id,
            "service": service.name,
            "service_id": service.id,
            "date": date_text,
            "time": time_text,
            "end_time": end.format("%H:%M").to_string(),
            "customer_name": customer_name,
            "customer_email": customer_email,
            "available_spots_remaining": remaining,
        })))
    }
}

// =============================================================================
// get_booking_slots
// =============================================================================

/// Bookable start times for a service over the next few days.
pub struct GetBookingSlotsTool;

const DEFAULT_DAYS: i64 = 7;

#[async_trait]
impl BusinessTool for GetBookingSlotsTool {
    fn name(&self) -> ToolName {
        ToolName::GetBookingSlots
    }

    fn description(&self) -> &'static str {
        "List open booking slots for a service. Use this whenever the customer wants to book."
    }

    fn specs(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::required("service", FieldKind::String, "Service name or id"),
            FieldSpec::optional("date", FieldKind::Date, "First day to list (YYYY-MM-DD); defaults to today"),
            FieldSpec::optional(
                "days",
                FieldKind::Integer { min: Some(1), max: Some(14) },
                "Number of days to cover, 1-14 (default 7)",
            ),
        ]
    }

    async fn execute(&self, ctx: &ToolContext, args: Map<String, Value>) -> Result<FunctionResult> {
        let reference = arg_str(&args, "service").unwrap_or_default();
        let service = match resolve_service(ctx, reference).await {
            Ok(service) => service,
            Err(failure) => return Ok(failure),
        };
        let first_day = arg_date(&args, "date").unwrap_or_else(|| ctx.now.date());
        let days = args.get("days").and_then(Value::as_i64).unwrap_or(DEFAULT_DAYS);

        let from = day_start(first_day);
        let to = from + Duration::days(days);
        let events = ctx.calendar.list_events(&ctx.calendar_id, from, to).await?;

        let step = Duration::minutes(service.duration_minutes.max(1) as i64);
        let mut windows: Vec<&CalendarEvent> = windows_for(&events, Some(service.id.as_str())).collect();
        windows.sort_by_key(|w| w.start);

        let mut slots = Vec::new();
        'windows: for window in windows {
            let mut start = window.start.max(from);
            while start + step <= window.end && start < to {
                if start >= ctx.now && bookings_at(&events, &service.id, start) < service.capacity as usize {
                    slots.push(start.format("%Y-%m-%d %H:%M").to_string());
                    if slots.len() >= MAX_SLOTS {
                        break 'windows;
                    }
                }
                start += step;
            }
        }

        Ok(FunctionResult::ok(json!({
            "service": service.name,
            "service_id": service.id,
            "from": first_day.format("%Y-%m-%d").to_string(),
            "days": days,
            "count": slots.len(),
            "slots": slots,
        }))
        .with_component(ComponentSpec::SlotPicker {
            service_id: service.id.clone(),
            slots,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, availability, booking, context_with_calendar};
    use concierge_core::mocks::MockCalendar;
    use std::sync::Arc;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn booking_args() -> Map<String, Value> {
        args(json!({
            "service": "Pottery Basics",
            "date": "2025-03-10",
            "time": "14:00",
            "customer_name": "Ana Lima",
            "customer_email": "ana@example.com"
        }))
    }

    #[tokio::test]
    async fn test_booking_inside_window_succeeds() {
        let calendar = Arc::new(MockCalendar::with_events(vec![availability("w1", at(10, 9, 0), at(10, 17, 0), None)]));
        let ctx = context_with_calendar(calendar.clone());

        let result = CreateBookingTool.execute(&ctx, booking_args()).await.unwrap();

        assert!(result.success, "{:?}", result);
        let data = result.data.unwrap();
        assert_eq!(data["available_spots_remaining"], 4);
        assert_eq!(data["booking_id"], "evt-2");
        assert_eq!(data["time"], "14:00");
        let created = calendar.events().pop().unwrap();
        assert_eq!(created.kind, EventKind::Booking);
        assert_eq!(created.service_id.as_deref(), Some("svc-pottery"));
        assert_eq!(created.end, at(10, 15, 0));
    }

    #[tokio::test]
    async fn test_booking_outside_window_is_rejected() {
        let calendar = Arc::new(MockCalendar::with_events(vec![availability("w1", at(10, 9, 0), at(10, 14, 30), None)]));
        let ctx = context_with_calendar(calendar.clone());

        let result = CreateBookingTool.execute(&ctx, booking_args()).await.unwrap();

        assert!(!result.success);
        assert!(result.has_error(ERR_NO_CLASS_SCHEDULED));
        assert_eq!(calendar.events().len(), 1);
    }

    #[tokio::test]
    async fn test_window_for_other_service_does_not_count() {
        let calendar = Arc::new(MockCalendar::with_events(vec![availability(
            "w1",
            at(10, 9, 0),
            at(10, 17, 0),
            Some("svc-wheel"),
        )]));
        let ctx = context_with_calendar(calendar);

        let result = CreateBookingTool.execute(&ctx, booking_args()).await.unwrap();
        assert!(result.has_error(ERR_NO_CLASS_SCHEDULED));
    }

    #[tokio::test]
    async fn test_full_session_is_rejected() {
        let mut events = vec![availability("w1", at(10, 9, 0), at(10, 17, 0), Some("svc-pottery"))];
        for i in 0..5 {
            // One booking a minute early still belongs to the same session.
            let start = if i == 0 { at(10, 13, 59) } else { at(10, 14, 0) };
            events.push(booking(&format!("b{}", i), start, "svc-pottery"));
        }
        let calendar = Arc::new(MockCalendar::with_events(events));
        let ctx = context_with_calendar(calendar.clone());

        let result = CreateBookingTool.execute(&ctx, booking_args()).await.unwrap();

        assert!(result.has_error(ERR_FULLY_BOOKED));
        assert_eq!(calendar.events().len(), 6);
    }

    #[tokio::test]
    async fn test_unknown_service_is_unavailable() {
        let ctx = context_with_calendar(Arc::new(MockCalendar::new()));
        let mut args = booking_args();
        args.insert("service".into(), json!("Glass Blowing"));

        let result = CreateBookingTool.execute(&ctx, args).await.unwrap();
        assert!(result.has_error(concierge_core::ERR_RESOURCE_UNAVAILABLE));
    }

    #[tokio::test]
    async fn test_availability_reports_spots() {
        let calendar = Arc::new(MockCalendar::with_events(vec![
            availability("w1", at(10, 9, 0), at(10, 12, 0), Some("svc-pottery")),
            availability("w2", at(11, 9, 0), at(11, 12, 0), Some("svc-pottery")),
            booking("b1", at(10, 9, 0), "svc-pottery"),
            booking("b2", at(10, 9, 0), "svc-pottery"),
        ]));
        let ctx = context_with_calendar(calendar);

        let result = CheckAvailabilityTool
            .execute(&ctx, args(json!({"date": "2025-03-10", "service": "pottery basics"})))
            .await
            .unwrap();

        let data = result.data.unwrap();
        assert_eq!(data["available"], true);
        assert_eq!(data["windows"].as_array().unwrap().len(), 1);
        assert_eq!(data["windows"][0]["start"], "09:00");
        assert_eq!(data["windows"][0]["spots_remaining"], 3);
    }

    #[tokio::test]
    async fn test_multi_day_window_agrees_with_booking() {
        let calendar = Arc::new(MockCalendar::with_events(vec![availability(
            "w1",
            at(9, 9, 0),
            at(15, 17, 0),
            Some("svc-pottery"),
        )]));
        let ctx = context_with_calendar(calendar);

        let result = CheckAvailabilityTool
            .execute(&ctx, args(json!({"date": "2025-03-10"})))
            .await
            .unwrap();

        let data = result.data.unwrap();
        assert_eq!(data["available"], true);
        let windows = data["windows"].as_array().unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0]["date"], "2025-03-10");
        assert_eq!(windows[0]["start"], "00:00");
        assert_eq!(windows[0]["end"], "24:00");

        let booked = CreateBookingTool.execute(&ctx, booking_args()).await.unwrap();
        assert!(booked.success, "{:?}", booked);
    }

    #[tokio::test]
    async fn test_slots_step_by_duration_and_skip_full() {
        let mut events = vec![availability("w1", at(10, 9, 0), at(10, 12, 30), Some("svc-pottery"))];
        for i in 0..5 {
            events.push(booking(&format!("b{}", i), at(10, 10, 0), "svc-pottery"));
        }
        let ctx = context_with_calendar(Arc::new(MockCalendar::with_events(events)));

        let result = GetBookingSlotsTool
            .execute(&ctx, args(json!({"service": "Pottery Basics", "date": "2025-03-10", "days": 1})))
            .await
            .unwrap();

        let data = result.data.unwrap();
        assert_eq!(data["slots"], json!(["2025-03-10 09:00", "2025-03-10 11:00"]));
        assert_eq!(data["count"], 2);
        assert!(matches!(
            &result.ui_components[0],
            ComponentSpec::SlotPicker { service_id, slots } if service_id == "svc-pottery" && slots.len() == 2
        ));
    }
}
