//! Calendar listing, range views, and search.

use std::process::ExitCode;

use chrono::{Duration, Utc};
use clap::Subcommand;
use serde::Serialize;

use crate::auth::AuthHandler;
use crate::dates;
use crate::error::AppError;
use crate::graph::calendar::{Event, EventDateTime};
use crate::graph::Recipient;

use super::{auth_required, print_json, CommandContext, OutputFormat, CALENDAR_SCOPE};

/// Listing window for `calendar list`.
const UPCOMING_DAYS: i64 = 30;

#[derive(Subcommand, Debug)]
pub enum CalendarAction {
    /// Upcoming events over the next 30 days.
    List {
        /// Maximum number of events.
        #[arg(long, default_value_t = 20)]
        top: u32,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Events in a date range, or a single event by id.
    View {
        /// Range start: today, tomorrow, +Nd/+Nm/+Ny, YYYY-MM-DD, or RFC 3339.
        #[arg(long, default_value = "today")]
        start: String,
        /// Range end, resolved against the start.
        #[arg(long, default_value = "+7d")]
        end: String,
        /// Show one event by id instead of a range.
        #[arg(long)]
        id: Option<String>,
        /// Maximum number of events.
        #[arg(long, default_value_t = 20)]
        top: u32,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Search events by subject.
    Search {
        /// Text the subject must contain.
        #[arg(long)]
        query: String,
        /// Maximum number of events.
        #[arg(long, default_value_t = 20)]
        top: u32,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Today's events.
    Today {
        /// Maximum number of events.
        #[arg(long, default_value_t = 20)]
        top: u32,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Events in the next seven days.
    Week {
        /// Maximum number of events.
        #[arg(long, default_value_t = 20)]
        top: u32,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Display record for one event.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventRow {
    id: String,
    start: String,
    end: String,
    subject: String,
    organizer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    is_all_day: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    web_link: Option<String>,
}

impl From<Event> for EventRow {
    fn from(event: Event) -> Self {
        Self {
            start: display_time(event.start.as_ref()),
            end: display_time(event.end.as_ref()),
            subject: event.subject.unwrap_or_else(|| "(no subject)".into()),
            organizer: event
                .organizer
                .as_ref()
                .and_then(Recipient::label)
                .unwrap_or("unknown")
                .to_string(),
            location: event.location.and_then(|l| l.display_name),
            is_all_day: event.is_all_day.unwrap_or(false),
            preview: event.body_preview,
            web_link: event.web_link,
            id: event.id,
        }
    }
}

pub async fn run(ctx: &CommandContext, action: CalendarAction) -> Result<ExitCode, AppError> {
    let handler = AuthHandler::new(&ctx.config, &ctx.store, &ctx.identity);
    let ready = match handler
        .ensure(&ctx.profile, &[CALENDAR_SCOPE.to_string()])
        .await?
        .ready()
    {
        Ok(ready) => ready,
        Err(reason) => return Ok(auth_required(&reason)),
    };
    let token = ready.access_token.as_str();
    let now = Utc::now();

    match action {
        CalendarAction::List { top, format } => {
            let events = ctx
                .graph
                .calendar_view(token, now, now + Duration::days(UPCOMING_DAYS), top)
                .await?;
            output(events, format)?;
        }
        CalendarAction::View {
            id: Some(id),
            format,
            ..
        } => {
            let row = EventRow::from(ctx.graph.get_event(token, &id).await?);
            match format {
                OutputFormat::Json => print_json(&row)?,
                OutputFormat::Text => print_event(&row),
            }
        }
        CalendarAction::View {
            start,
            end,
            id: None,
            top,
            format,
        } => {
            let start = dates::resolve_date(&start, now)?;
            let end = dates::resolve_date(&end, start)?;
            let events = ctx.graph.calendar_view(token, start, end, top).await?;
            output(events, format)?;
        }
        CalendarAction::Search { query, top, format } => {
            let events = ctx.graph.search_events(token, &query, top).await?;
            output(events, format)?;
        }
        CalendarAction::Today { top, format } => {
            let start = dates::resolve_date("today", now)?;
            let end = dates::resolve_date("tomorrow", now)?;
            let events = ctx.graph.calendar_view(token, start, end, top).await?;
            output(events, format)?;
        }
        CalendarAction::Week { top, format } => {
            let start = dates::resolve_date("today", now)?;
            let end = dates::resolve_date("+7d", start)?;
            let events = ctx.graph.calendar_view(token, start, end, top).await?;
            output(events, format)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn output(events: Vec<Event>, format: OutputFormat) -> Result<(), AppError> {
    let rows: Vec<EventRow> = events.into_iter().map(EventRow::from).collect();
    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Text => print_rows(&rows),
    }
    Ok(())
}

fn print_rows(rows: &[EventRow]) {
    if rows.is_empty() {
        println!("No events found.");
        return;
    }
    for row in rows {
        let when = if row.is_all_day {
            format!("{} (all day)", row.start.get(..10).unwrap_or(&row.start))
        } else {
            format!("{} to {}", row.start, row.end)
        };
        match &row.location {
            Some(location) => println!("{}  {} [{}]", when, row.subject, location),
            None => println!("{}  {}", when, row.subject),
        }
    }
}

fn print_event(row: &EventRow) {
    println!("Subject:    {}", row.subject);
    println!("Organizer:  {}", row.organizer);
    println!("Start:      {}", row.start);
    println!("End:        {}", row.end);
    if let Some(location) = &row.location {
        println!("Location:   {location}");
    }
    if let Some(link) = &row.web_link {
        println!("Link:       {link}");
    }
    if let Some(preview) = &row.preview {
        println!();
        println!("{preview}");
    }
}

fn display_time(value: Option<&EventDateTime>) -> String {
    value
        .and_then(|v| v.date_time.as_deref())
        .map(format_event_time)
        .unwrap_or_else(|| "-".into())
}

/// Graph event times arrive as `2026-08-25T09:00:00.0000000`; trim to
/// minutes for display.
fn format_event_time(raw: &str) -> String {
    match raw.get(..16) {
        Some(prefix) => prefix.replace('T', " "),
        None => raw.to_string(),
    }
}
