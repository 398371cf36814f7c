//! Google Calendar adapter.
//!
//! Wraps the Google Calendar REST API (`https://www.googleapis.com/calendar/v3`)
//! behind the [`Adapter`] trait: event listing over named time ranges, event
//! creation (timed or all-day, with attendees and optional Meet links),
//! patch-style updates, deletion, keyword search, and freebusy availability
//! checks. Credentials come from `GOOGLE_CALENDAR_ACCESS_TOKEN` as an OAuth2
//! bearer token.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use concierge_core::error::{AdapterError, Result};
use concierge_core::format::{self, ResponseFormat};
use concierge_core::http::{Envelope, RestClient};
use concierge_core::params::ParamReader;
use concierge_core::traits::{
    Adapter, AdapterType, AuthRequirement, HealthStatus, ToolDefinition,
};

const API_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
const TOKEN_ENV: &str = "GOOGLE_CALENDAR_ACCESS_TOKEN";

const TIME_RANGES: &[&str] = &[
    "today",
    "tomorrow",
    "this_week",
    "next_week",
    "this_month",
    "custom",
];

pub struct CalendarAdapter {
    id: String,
    client: RestClient,
}

impl CalendarAdapter {
    pub fn new() -> Self {
        Self {
            id: "google_calendar".to_string(),
            client: RestClient::new(API_BASE_URL, Some(TOKEN_ENV), Envelope::Raw),
        }
    }

    // -----------------------------------------------------------------------
    // Listing and search
    // -----------------------------------------------------------------------

    async fn tool_list_events(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let calendar_id = reader.str_or("calendar_id", "primary");
        let time_range = reader.choice("time_range", TIME_RANGES, "this_week");
        let start_date = reader.optional_str("start_date");
        let end_date = reader.optional_str("end_date");
        let max_results = reader.int_in_range("max_results", 50, 1, 250);
        let response_format = reader.response_format();
        reader.finish("gcal_list_events")?;

        let (time_min, time_max) = resolve_time_range(
            &time_range,
            start_date.as_deref(),
            end_date.as_deref(),
            Utc::now(),
        )?;

        let query = vec![
            ("timeMin", time_min),
            ("timeMax", time_max),
            ("maxResults", max_results.to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];
        let data = self
            .client
            .get(&format!("calendars/{calendar_id}/events"), &query)
            .await?;

        let events = items(&data);
        if events.is_empty() {
            return Ok(format!(
                "No events found in the specified time range ({time_range})."
            ));
        }
        Ok(render_event_listing(&events, response_format, ""))
    }

    async fn tool_search_events(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let calendar_id = reader.str_or("calendar_id", "primary");
        let query_text = reader.required_str_bounded("query", 1, 200);
        let max_results = reader.int_in_range("max_results", 50, 1, 250);
        let response_format = reader.response_format();
        reader.finish("gcal_search_events")?;
        let query_text = query_text.unwrap_or_default();

        let query = vec![
            ("q", query_text.clone()),
            ("maxResults", max_results.to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];
        let data = self
            .client
            .get(&format!("calendars/{calendar_id}/events"), &query)
            .await?;

        let events = items(&data);
        if events.is_empty() {
            return Ok(format!("No events found matching '{query_text}'"));
        }
        Ok(render_event_listing(
            &events,
            response_format,
            " Refine your search query for better results.",
        ))
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    async fn tool_create_event(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let calendar_id = reader.str_or("calendar_id", "primary");
        let summary = reader.required_str_bounded("summary", 1, 500);
        let description = reader.optional_str_bounded("description", 8000);
        let location = reader.optional_str_bounded("location", 500);
        let start_datetime = reader.required_str("start_datetime");
        let end_datetime = reader.required_str("end_datetime");
        let timezone = reader.str_or("timezone", "UTC");
        let attendees = parse_attendees(&params, &mut reader);
        let add_meet_link = reader.bool_or("add_meet_link", false);
        let send_notifications = reader.bool_or("send_notifications", true);
        let all_day = reader.bool_or("all_day", false);
        reader.finish("gcal_create_event")?;
        let start_datetime = start_datetime.unwrap_or_default();
        let end_datetime = end_datetime.unwrap_or_default();

        let mut event = json!({"summary": summary});
        if let Some(description) = description {
            event["description"] = json!(description);
        }
        if let Some(location) = location {
            event["location"] = json!(location);
        }
        if all_day {
            event["start"] = json!({"date": date_part(&start_datetime)});
            event["end"] = json!({"date": date_part(&end_datetime)});
        } else {
            event["start"] = json!({"dateTime": start_datetime, "timeZone": timezone});
            event["end"] = json!({"dateTime": end_datetime, "timeZone": timezone});
        }
        let attendee_count = attendees.len();
        if !attendees.is_empty() {
            event["attendees"] = Value::Array(attendees);
        }
        if add_meet_link {
            event["conferenceData"] = json!({
                "createRequest": {
                    "requestId": format!("meet-{}", Uuid::new_v4()),
                    "conferenceSolutionKey": {"type": "hangoutsMeet"}
                }
            });
        }

        let query = vec![
            (
                "conferenceDataVersion",
                if add_meet_link { "1" } else { "0" }.to_string(),
            ),
            (
                "sendUpdates",
                if send_notifications { "all" } else { "none" }.to_string(),
            ),
        ];
        let builder = self
            .client
            .request(reqwest::Method::POST, &format!("calendars/{calendar_id}/events"))?
            .query(&query)
            .json(&event);
        let created = self.client.send(builder).await?;

        let mut lines = vec![
            "# Event Created Successfully".to_string(),
            String::new(),
            format!("**Event ID**: `{}`", str_field(&created, "id")),
            format!("**Title**: {}", str_field(&created, "summary")),
        ];
        if let Some(start) = created.get("start") {
            lines.push(format_start_line(start));
        }
        if let Some(link) = created.get("htmlLink").and_then(Value::as_str) {
            lines.push(format!("**Calendar Link**: {link}"));
        }
        if let Some(link) = created.get("hangoutLink").and_then(Value::as_str) {
            lines.push(format!("**Google Meet**: {link}"));
        }
        if attendee_count > 0 && send_notifications {
            lines.push(format!(
                "\n✉️ Notifications sent to {attendee_count} attendee(s)"
            ));
        }
        Ok(lines.join("\n"))
    }

    async fn tool_update_event(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let calendar_id = reader.str_or("calendar_id", "primary");
        let event_id = reader.required_str("event_id");
        let summary = reader.optional_str_bounded("summary", 500);
        let description = reader.optional_str_bounded("description", 8000);
        let location = reader.optional_str_bounded("location", 500);
        let start_datetime = reader.optional_str("start_datetime");
        let end_datetime = reader.optional_str("end_datetime");
        let timezone = reader.optional_str("timezone");
        let status = reader.optional_str("status");
        if let Some(status) = &status {
            if !["confirmed", "tentative", "cancelled"].contains(&status.as_str()) {
                reader.violation("status", "must be one of: confirmed, tentative, cancelled");
            }
        }
        let send_notifications = reader.bool_or("send_notifications", true);

        let touches_time =
            start_datetime.is_some() || end_datetime.is_some() || timezone.is_some();
        let has_field_changes = summary.is_some()
            || description.is_some()
            || location.is_some()
            || status.is_some()
            || start_datetime.is_some()
            || end_datetime.is_some();
        if !has_field_changes {
            reader.violation("fields", "at least one field to update must be provided");
        }
        reader.finish("gcal_update_event")?;
        let event_id = event_id.unwrap_or_default();

        let mut patch = serde_json::Map::new();
        if let Some(summary) = summary {
            patch.insert("summary".to_string(), json!(summary));
        }
        if let Some(description) = description {
            patch.insert("description".to_string(), json!(description));
        }
        if let Some(location) = location {
            patch.insert("location".to_string(), json!(location));
        }
        if let Some(status) = status {
            patch.insert("status".to_string(), json!(status));
        }

        // Start and end carry either a date or a dateTime object; the
        // existing event decides which shape the patch must use.
        if touches_time {
            let existing = self
                .client
                .get(&format!("calendars/{calendar_id}/events/{event_id}"), &[])
                .await?;
            extend_with_time_patch(
                &mut patch,
                &existing,
                start_datetime.as_deref(),
                end_datetime.as_deref(),
                timezone.as_deref(),
            );
        }

        let query = vec![(
            "sendUpdates",
            if send_notifications { "all" } else { "none" }.to_string(),
        )];
        let builder = self
            .client
            .request(
                reqwest::Method::PATCH,
                &format!("calendars/{calendar_id}/events/{event_id}"),
            )?
            .query(&query)
            .json(&Value::Object(patch));
        let updated = self.client.send(builder).await?;

        let mut lines = vec![
            "# Event Updated Successfully".to_string(),
            String::new(),
            format!("**Event ID**: `{}`", str_field(&updated, "id")),
            format!("**Title**: {}", str_field(&updated, "summary")),
            format!(
                "**Status**: {}",
                updated.get("status").and_then(Value::as_str).unwrap_or("confirmed")
            ),
        ];
        if let Some(start) = updated.get("start") {
            lines.push(format_start_line(start));
        }
        if let Some(location) = updated.get("location").and_then(Value::as_str) {
            lines.push(format!("**Location**: {location}"));
        }
        if let Some(link) = updated.get("htmlLink").and_then(Value::as_str) {
            lines.push(format!("**Calendar Link**: {link}"));
        }
        if send_notifications {
            lines.push("\n✉️ Update notifications sent to attendees".to_string());
        }
        Ok(lines.join("\n"))
    }

    async fn tool_delete_event(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let calendar_id = reader.str_or("calendar_id", "primary");
        let event_id = reader.required_str("event_id");
        let send_notifications = reader.bool_or("send_notifications", true);
        reader.finish("gcal_delete_event")?;
        let event_id = event_id.unwrap_or_default();

        let query = vec![(
            "sendUpdates",
            if send_notifications { "all" } else { "none" }.to_string(),
        )];
        let builder = self
            .client
            .request(
                reqwest::Method::DELETE,
                &format!("calendars/{calendar_id}/events/{event_id}"),
            )?
            .query(&query);
        self.client.send(builder).await?;

        let mut lines = vec![
            "# Event Deleted Successfully".to_string(),
            String::new(),
            format!("**Event ID**: `{event_id}` has been permanently removed."),
        ];
        if send_notifications {
            lines.push("\n✉️ Cancellation notifications sent to attendees".to_string());
        }
        Ok(lines.join("\n"))
    }

    // -----------------------------------------------------------------------
    // Availability
    // -----------------------------------------------------------------------

    async fn tool_check_availability(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let calendar_ids = reader
            .optional_str_list("calendar_ids", 50)
            .unwrap_or_else(|| vec!["primary".to_string()]);
        let start_datetime = reader.required_str("start_datetime");
        let end_datetime = reader.required_str("end_datetime");
        let response_format = reader.response_format();
        reader.finish("gcal_check_availability")?;
        let start_datetime = start_datetime.unwrap_or_default();
        let end_datetime = end_datetime.unwrap_or_default();

        let body = json!({
            "timeMin": start_datetime,
            "timeMax": end_datetime,
            "items": calendar_ids.iter().map(|id| json!({"id": id})).collect::<Vec<_>>(),
        });
        let data = self.client.post("freeBusy", &body).await?;
        let calendars = data.get("calendars").cloned().unwrap_or_else(|| json!({}));

        if response_format.is_json() {
            return Ok(serde_json::to_string_pretty(&json!({
                "timeMin": start_datetime,
                "timeMax": end_datetime,
                "calendars": calendars,
            }))?);
        }

        let mut lines = vec![
            "# Calendar Availability Check".to_string(),
            String::new(),
            format!("**Time Range**: {start_datetime} to {end_datetime}"),
            String::new(),
        ];
        for cal_id in &calendar_ids {
            let cal_data = calendars.get(cal_id).cloned().unwrap_or_else(|| json!({}));
            let busy = cal_data
                .get("busy")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            lines.push(format!("## Calendar: {cal_id}"));
            if busy.is_empty() {
                lines.push("✅ **Completely free** during this time range".to_string());
            } else {
                lines.push(format!("**Busy Periods**: {}", busy.len()));
                for period in &busy {
                    let start = period.get("start").and_then(Value::as_str).unwrap_or("");
                    let end = period.get("end").and_then(Value::as_str).unwrap_or("");
                    lines.push(format!(
                        "  - 🔴 {} to {}",
                        format_busy_time(start, "%Y-%m-%d %H:%M"),
                        format_busy_time(end, "%H:%M")
                    ));
                }
            }
            if let Some(errors) = cal_data.get("errors").and_then(Value::as_array) {
                if !errors.is_empty() {
                    lines.push(format!("⚠️ **Errors**: {}", errors.len()));
                    for error in errors {
                        lines.push(format!(
                            "  - {}: {}",
                            str_field(error, "reason"),
                            str_field(error, "domain")
                        ));
                    }
                }
            }
            lines.push(String::new());
        }
        Ok(lines.join("\n"))
    }
}

impl Default for CalendarAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Time range resolution
// ---------------------------------------------------------------------------

/// Resolve a named time range to `[start, end)` RFC 3339 bounds.
///
/// Ranges are anchored on `now` in UTC. `this_week` is a rolling window of
/// seven days starting today, not a calendar week. `custom` requires both
/// explicit bounds.
fn resolve_time_range(
    range: &str,
    start_date: Option<&str>,
    end_date: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(String, String)> {
    let midnight = midnight_of(now);
    let (start, end) = match range {
        "today" => (midnight, midnight + Duration::days(1)),
        "tomorrow" => {
            let start = midnight + Duration::days(1);
            (start, start + Duration::days(1))
        }
        "this_week" => (midnight, midnight + Duration::days(7)),
        "next_week" => {
            let start = midnight + Duration::days(7);
            (start, start + Duration::days(7))
        }
        "this_month" => {
            let start = first_of_month(now);
            let end = if now.month() == 12 {
                first_of_month(
                    Utc.with_ymd_and_hms(now.year() + 1, 1, 1, 0, 0, 0)
                        .single()
                        .unwrap_or(now),
                )
            } else {
                Utc.with_ymd_and_hms(now.year(), now.month() + 1, 1, 0, 0, 0)
                    .single()
                    .unwrap_or(now)
            };
            (start, end)
        }
        "custom" => {
            let (Some(start_date), Some(end_date)) = (start_date, end_date) else {
                return Err(AdapterError::Config(
                    "For custom time range, both start_date and end_date must be provided"
                        .to_string(),
                ));
            };
            let start = parse_iso(start_date)?;
            let end = parse_iso(end_date)?;
            return Ok((start.to_rfc3339(), end.to_rfc3339()));
        }
        other => {
            return Err(AdapterError::Config(format!("Invalid time range: {other}")));
        }
    };
    Ok((start.to_rfc3339(), end.to_rfc3339()))
}

fn midnight_of(now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_hour(0)
        .and_then(|d| d.with_minute(0))
        .and_then(|d| d.with_second(0))
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(now)
}

fn first_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    midnight_of(now).with_day(1).unwrap_or(now)
}

fn parse_iso(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AdapterError::Config(format!("Invalid ISO 8601 datetime '{raw}': {e}")))
}

// ---------------------------------------------------------------------------
// Rendering helpers
// ---------------------------------------------------------------------------

fn items(data: &Value) -> Vec<Value> {
    data.get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn str_field<'a>(value: &'a Value, field: &str) -> &'a str {
    value.get(field).and_then(Value::as_str).unwrap_or("Unknown")
}

fn date_part(datetime: &str) -> &str {
    datetime.split('T').next().unwrap_or(datetime)
}

fn format_busy_time(raw: &str, pattern: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.format(pattern).to_string(),
        Err(_) => raw.to_string(),
    }
}

fn format_start_line(start: &Value) -> String {
    match start.get("dateTime").and_then(Value::as_str) {
        Some(datetime) => format!("**Start**: {datetime}"),
        None => format!(
            "**Start**: {} (All-day)",
            start.get("date").and_then(Value::as_str).unwrap_or("Unknown")
        ),
    }
}

fn parse_attendees(params: &Value, reader: &mut ParamReader<'_>) -> Vec<Value> {
    let Some(raw) = params.get("attendees").and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut attendees = Vec::with_capacity(raw.len());
    for entry in raw {
        let Some(email) = entry.get("email").and_then(Value::as_str).filter(|e| !e.is_empty())
        else {
            reader.violation("attendees", "each attendee must have an email");
            continue;
        };
        let mut attendee = json!({
            "email": email,
            "optional": entry.get("optional").and_then(Value::as_bool).unwrap_or(false),
        });
        if let Some(name) = entry.get("display_name").and_then(Value::as_str) {
            attendee["displayName"] = json!(name);
        }
        attendees.push(attendee);
    }
    attendees
}

fn format_event_markdown(event: &Value) -> String {
    let mut lines = Vec::new();
    let summary = event.get("summary").and_then(Value::as_str).unwrap_or("(No title)");
    lines.push(format!("## {summary}"));

    let start = event.get("start").cloned().unwrap_or_else(|| json!({}));
    let end = event.get("end").cloned().unwrap_or_else(|| json!({}));
    if let Some(start_raw) = start.get("dateTime").and_then(Value::as_str) {
        let end_raw = end.get("dateTime").and_then(Value::as_str).unwrap_or("");
        let tz = start.get("timeZone").and_then(Value::as_str).unwrap_or("UTC");
        lines.push(format!(
            "**Time**: {} - {} ({tz})",
            format_busy_time(start_raw, "%Y-%m-%d %H:%M"),
            format_busy_time(end_raw, "%H:%M")
        ));
    } else if let Some(date) = start.get("date").and_then(Value::as_str) {
        lines.push(format!("**Date**: {date} (All-day)"));
    }

    lines.push(format!("**ID**: `{}`", str_field(event, "id")));
    lines.push(format!(
        "**Status**: {}",
        event.get("status").and_then(Value::as_str).unwrap_or("confirmed")
    ));

    if let Some(description) = event.get("description").and_then(Value::as_str) {
        lines.push(format!("**Description**: {}", format::preview(description, 200)));
    }
    if let Some(location) = event.get("location").and_then(Value::as_str) {
        lines.push(format!("**Location**: {location}"));
    }

    if let Some(attendees) = event.get("attendees").and_then(Value::as_array) {
        if !attendees.is_empty() {
            lines.push(format!("**Attendees** ({}):", attendees.len()));
            for attendee in attendees.iter().take(5) {
                let name = attendee
                    .get("displayName")
                    .or_else(|| attendee.get("email"))
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown");
                let response = attendee
                    .get("responseStatus")
                    .and_then(Value::as_str)
                    .unwrap_or("needsAction");
                lines.push(format!("  - {name} ({response})"));
            }
            if attendees.len() > 5 {
                lines.push(format!("  - ... and {} more", attendees.len() - 5));
            }
        }
    }

    if let Some(link) = event.get("hangoutLink").and_then(Value::as_str) {
        lines.push(format!("**Meet Link**: {link}"));
    }
    lines.push(String::new());
    lines.join("\n")
}

fn render_events(
    events: &[Value],
    response_format: ResponseFormat,
    total: usize,
    has_more: bool,
) -> String {
    if response_format.is_json() {
        let mut response = json!({"count": events.len(), "events": events, "total": total});
        if has_more {
            response["has_more"] = json!(true);
        }
        return serde_json::to_string_pretty(&response).unwrap_or_default();
    }
    let mut lines = vec!["# Google Calendar Events".to_string(), String::new()];
    lines.push(format!("Found {total} events (showing {})", events.len()));
    if has_more {
        lines.push("**Note**: More events available. Use pagination to see more.".to_string());
    }
    lines.push(String::new());
    if events.is_empty() {
        lines.push("No events found.".to_string());
    } else {
        for event in events {
            lines.push(format_event_markdown(event));
        }
    }
    lines.join("\n")
}

fn render_event_listing(
    events: &[Value],
    response_format: ResponseFormat,
    truncation_hint: &str,
) -> String {
    let total = events.len();
    format::shrink_listing(
        events,
        |slice, truncated| render_events(slice, response_format, total, truncated),
        |kept, total| {
            format!(
                "\n\n**Note**: Response truncated. Showing {kept} of {total} events.{truncation_hint}"
            )
        },
    )
}

fn extend_with_time_patch(
    patch: &mut serde_json::Map<String, Value>,
    existing: &Value,
    start_datetime: Option<&str>,
    end_datetime: Option<&str>,
    timezone: Option<&str>,
) {
    if let Some(start) = start_datetime {
        let current = existing.get("start").cloned().unwrap_or_else(|| json!({}));
        if current.get("dateTime").is_some() {
            let tz = timezone
                .map(str::to_string)
                .or_else(|| current.get("timeZone").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| "UTC".to_string());
            patch.insert("start".to_string(), json!({"dateTime": start, "timeZone": tz}));
        } else {
            patch.insert("start".to_string(), json!({"date": date_part(start)}));
        }
    }
    if let Some(end) = end_datetime {
        let current = existing.get("end").cloned().unwrap_or_else(|| json!({}));
        if current.get("dateTime").is_some() {
            let tz = timezone
                .map(str::to_string)
                .or_else(|| current.get("timeZone").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| "UTC".to_string());
            patch.insert("end".to_string(), json!({"dateTime": end, "timeZone": tz}));
        } else {
            patch.insert("end".to_string(), json!({"date": date_part(end)}));
        }
    }
}

// ---------------------------------------------------------------------------
// Adapter impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Adapter for CalendarAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Productivity
    }

    fn health_check(&self) -> HealthStatus {
        if self.client.bearer_token().is_ok() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        let response_format = json!({
            "type": "string",
            "enum": ["markdown", "json"],
            "description": "Output format: 'markdown' or 'json'",
            "default": "markdown"
        });
        vec![
            ToolDefinition {
                name: "gcal_list_events".to_string(),
                description: "List calendar events in a named or custom time range".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "calendar_id": {"type": "string", "description": "Calendar identifier, 'primary' for the user's main calendar", "default": "primary"},
                        "time_range": {"type": "string", "enum": TIME_RANGES, "description": "Predefined time range", "default": "this_week"},
                        "start_date": {"type": "string", "description": "Custom range start (ISO 8601), required when time_range='custom'"},
                        "end_date": {"type": "string", "description": "Custom range end (ISO 8601), required when time_range='custom'"},
                        "max_results": {"type": "integer", "minimum": 1, "maximum": 250, "default": 50},
                        "response_format": response_format
                    }
                }),
            },
            ToolDefinition {
                name: "gcal_create_event".to_string(),
                description: "Create a calendar event with optional attendees, location, and Google Meet link".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "calendar_id": {"type": "string", "default": "primary"},
                        "summary": {"type": "string", "description": "Event title", "minLength": 1, "maxLength": 500},
                        "description": {"type": "string", "maxLength": 8000},
                        "location": {"type": "string", "maxLength": 500},
                        "start_datetime": {"type": "string", "description": "Start in ISO 8601 format"},
                        "end_datetime": {"type": "string", "description": "End in ISO 8601 format"},
                        "timezone": {"type": "string", "description": "IANA timezone name", "default": "UTC"},
                        "attendees": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "email": {"type": "string"},
                                    "display_name": {"type": "string"},
                                    "optional": {"type": "boolean", "default": false}
                                },
                                "required": ["email"]
                            }
                        },
                        "add_meet_link": {"type": "boolean", "default": false},
                        "send_notifications": {"type": "boolean", "default": true},
                        "all_day": {"type": "boolean", "default": false}
                    },
                    "required": ["summary", "start_datetime", "end_datetime"]
                }),
            },
            ToolDefinition {
                name: "gcal_update_event".to_string(),
                description: "Update an event with patch semantics; only supplied fields change".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "calendar_id": {"type": "string", "default": "primary"},
                        "event_id": {"type": "string", "description": "Event ID to update"},
                        "summary": {"type": "string", "maxLength": 500},
                        "description": {"type": "string", "maxLength": 8000},
                        "location": {"type": "string", "maxLength": 500},
                        "start_datetime": {"type": "string", "description": "New start (ISO 8601)"},
                        "end_datetime": {"type": "string", "description": "New end (ISO 8601)"},
                        "timezone": {"type": "string"},
                        "status": {"type": "string", "enum": ["confirmed", "tentative", "cancelled"]},
                        "send_notifications": {"type": "boolean", "default": true}
                    },
                    "required": ["event_id"]
                }),
            },
            ToolDefinition {
                name: "gcal_delete_event".to_string(),
                description: "Permanently delete an event, optionally notifying attendees".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "calendar_id": {"type": "string", "default": "primary"},
                        "event_id": {"type": "string", "description": "Event ID to delete"},
                        "send_notifications": {"type": "boolean", "default": true}
                    },
                    "required": ["event_id"]
                }),
            },
            ToolDefinition {
                name: "gcal_search_events".to_string(),
                description: "Search events by keyword across titles, descriptions, locations, and attendees".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "calendar_id": {"type": "string", "default": "primary"},
                        "query": {"type": "string", "minLength": 1, "maxLength": 200},
                        "max_results": {"type": "integer", "minimum": 1, "maximum": 250, "default": 50},
                        "response_format": response_format
                    },
                    "required": ["query"]
                }),
            },
            ToolDefinition {
                name: "gcal_check_availability".to_string(),
                description: "Check freebusy status across one or more calendars".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "calendar_ids": {"type": "array", "items": {"type": "string"}, "maxItems": 50, "default": ["primary"]},
                        "start_datetime": {"type": "string", "description": "Range start (ISO 8601)"},
                        "end_datetime": {"type": "string", "description": "Range end (ISO 8601)"},
                        "response_format": response_format
                    },
                    "required": ["start_datetime", "end_datetime"]
                }),
            },
        ]
    }

    async fn execute_tool(&self, name: &str, params: Value) -> Result<String> {
        match name {
            "gcal_list_events" => self.tool_list_events(params).await,
            "gcal_create_event" => self.tool_create_event(params).await,
            "gcal_update_event" => self.tool_update_event(params).await,
            "gcal_delete_event" => self.tool_delete_event(params).await,
            "gcal_search_events" => self.tool_search_events(params).await,
            "gcal_check_availability" => self.tool_check_availability(params).await,
            _ => Err(AdapterError::ToolNotFound {
                adapter_id: self.id.clone(),
                tool_name: name.to_string(),
            }),
        }
    }

    fn required_auth(&self) -> Option<AuthRequirement> {
        Some(AuthRequirement {
            provider: "google".to_string(),
            env_var: TOKEN_ENV.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noon(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 30, 45).single().unwrap()
    }

    #[test]
    fn today_spans_one_day_from_midnight() {
        let (start, end) =
            resolve_time_range("today", None, None, noon(2025, 6, 10)).unwrap();
        assert!(start.starts_with("2025-06-10T00:00:00"));
        assert!(end.starts_with("2025-06-11T00:00:00"));
    }

    #[test]
    fn tomorrow_starts_at_next_midnight() {
        let (start, end) =
            resolve_time_range("tomorrow", None, None, noon(2025, 6, 10)).unwrap();
        assert!(start.starts_with("2025-06-11T00:00:00"));
        assert!(end.starts_with("2025-06-12T00:00:00"));
    }

    #[test]
    fn this_week_is_a_rolling_seven_day_window() {
        // Anchored on today regardless of weekday, not on Monday.
        let (start, end) =
            resolve_time_range("this_week", None, None, noon(2025, 6, 12)).unwrap();
        assert!(start.starts_with("2025-06-12T00:00:00"));
        assert!(end.starts_with("2025-06-19T00:00:00"));
    }

    #[test]
    fn next_week_follows_the_rolling_window() {
        let (start, end) =
            resolve_time_range("next_week", None, None, noon(2025, 6, 12)).unwrap();
        assert!(start.starts_with("2025-06-19T00:00:00"));
        assert!(end.starts_with("2025-06-26T00:00:00"));
    }

    #[test]
    fn this_month_ends_at_next_month_start() {
        let (start, end) =
            resolve_time_range("this_month", None, None, noon(2025, 6, 12)).unwrap();
        assert!(start.starts_with("2025-06-01T00:00:00"));
        assert!(end.starts_with("2025-07-01T00:00:00"));
    }

    #[test]
    fn december_rolls_over_to_january() {
        let (start, end) =
            resolve_time_range("this_month", None, None, noon(2025, 12, 15)).unwrap();
        assert!(start.starts_with("2025-12-01T00:00:00"));
        assert!(end.starts_with("2026-01-01T00:00:00"));
    }

    #[test]
    fn custom_requires_both_bounds() {
        let err = resolve_time_range("custom", Some("2025-01-01T00:00:00Z"), None, Utc::now())
            .unwrap_err();
        assert_eq!(
            err.user_message(),
            "Configuration Error: For custom time range, both start_date and end_date must be provided"
        );
    }

    #[test]
    fn custom_passes_explicit_bounds_through() {
        let (start, end) = resolve_time_range(
            "custom",
            Some("2025-01-15T10:00:00Z"),
            Some("2025-01-20T18:00:00Z"),
            Utc::now(),
        )
        .unwrap();
        assert!(start.starts_with("2025-01-15T10:00:00"));
        assert!(end.starts_with("2025-01-20T18:00:00"));
    }

    #[test]
    fn timed_event_markdown_shows_time_and_zone() {
        let event = json!({
            "id": "ev1",
            "summary": "Team Meeting",
            "status": "confirmed",
            "start": {"dateTime": "2025-06-10T14:00:00Z", "timeZone": "UTC"},
            "end": {"dateTime": "2025-06-10T15:00:00Z", "timeZone": "UTC"},
            "location": "Conference Room A"
        });
        let md = format_event_markdown(&event);
        assert!(md.starts_with("## Team Meeting"));
        assert!(md.contains("**Time**: 2025-06-10 14:00 - 15:00 (UTC)"));
        assert!(md.contains("**Location**: Conference Room A"));
    }

    #[test]
    fn all_day_event_markdown_shows_date() {
        let event = json!({
            "id": "ev2",
            "summary": "Conference",
            "start": {"date": "2025-06-10"},
            "end": {"date": "2025-06-11"}
        });
        let md = format_event_markdown(&event);
        assert!(md.contains("**Date**: 2025-06-10 (All-day)"));
    }

    #[test]
    fn attendees_are_capped_at_five() {
        let attendees: Vec<Value> = (0..8)
            .map(|i| json!({"email": format!("a{i}@example.com"), "responseStatus": "accepted"}))
            .collect();
        let event = json!({"id": "ev3", "summary": "Big Meeting", "attendees": attendees});
        let md = format_event_markdown(&event);
        assert!(md.contains("**Attendees** (8):"));
        assert!(md.contains("a4@example.com (accepted)"));
        assert!(!md.contains("a5@example.com"));
        assert!(md.contains("... and 3 more"));
    }

    #[test]
    fn time_patch_preserves_event_shape() {
        let existing = json!({
            "start": {"dateTime": "2025-06-10T14:00:00Z", "timeZone": "Europe/Berlin"},
            "end": {"dateTime": "2025-06-10T15:00:00Z", "timeZone": "Europe/Berlin"}
        });
        let mut patch = serde_json::Map::new();
        extend_with_time_patch(
            &mut patch,
            &existing,
            Some("2025-06-10T16:00:00Z"),
            None,
            None,
        );
        assert_eq!(
            patch["start"],
            json!({"dateTime": "2025-06-10T16:00:00Z", "timeZone": "Europe/Berlin"})
        );
        assert!(!patch.contains_key("end"));
    }

    #[test]
    fn time_patch_uses_dates_for_all_day_events() {
        let existing = json!({
            "start": {"date": "2025-06-10"},
            "end": {"date": "2025-06-11"}
        });
        let mut patch = serde_json::Map::new();
        extend_with_time_patch(
            &mut patch,
            &existing,
            Some("2025-06-12T00:00:00Z"),
            Some("2025-06-13T00:00:00Z"),
            None,
        );
        assert_eq!(patch["start"], json!({"date": "2025-06-12"}));
        assert_eq!(patch["end"], json!({"date": "2025-06-13"}));
    }

    #[test]
    fn json_listing_reports_totals_and_truncation() {
        let events: Vec<Value> = (0..4)
            .map(|i| json!({"id": i.to_string(), "summary": "s".repeat(13_000)}))
            .collect();
        let out = render_event_listing(&events, ResponseFormat::Json, "");
        assert!(out.ends_with("**Note**: Response truncated. Showing 2 of 4 events."));
    }

    #[tokio::test]
    async fn update_with_no_fields_is_rejected_before_network() {
        let adapter = CalendarAdapter::new();
        let err = adapter
            .execute_tool("gcal_update_event", json!({"event_id": "abc"}))
            .await
            .unwrap_err();
        assert!(err.user_message().contains("at least one field to update"));
    }

    #[test]
    fn tool_definitions_are_complete() {
        let adapter = CalendarAdapter::new();
        assert_eq!(adapter.tools().len(), 6);
    }
}
