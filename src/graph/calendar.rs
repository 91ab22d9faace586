//! Calendar queries against Microsoft Graph.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

use crate::error::ApiError;
use crate::graph::{GraphClient, ListResponse, Recipient};

/// Fields requested for event listings.
const EVENT_FIELDS: &str = "id,subject,organizer,start,end,location,isAllDay,webLink";
/// Fields requested for a single event.
const EVENT_DETAIL_FIELDS: &str =
    "id,subject,organizer,start,end,location,isAllDay,bodyPreview,webLink";

/// `Prefer` header pinning returned event times to UTC.
const PREFER_UTC: &str = "outlook.timezone=\"UTC\"";

/// A calendar event, as much of it as the listing queries select.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub subject: Option<String>,
    pub organizer: Option<Recipient>,
    pub start: Option<EventDateTime>,
    pub end: Option<EventDateTime>,
    pub location: Option<Location>,
    pub is_all_day: Option<bool>,
    #[serde(default)]
    pub body_preview: Option<String>,
    pub web_link: Option<String>,
}

/// Graph's dateTimeTimeZone pair.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: Option<String>,
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub display_name: Option<String>,
}

impl GraphClient {
    /// Events between two instants, soonest first.
    ///
    /// Uses `calendarView` so recurring events come back expanded into
    /// their occurrences.
    pub async fn calendar_view(
        &self,
        access_token: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        top: u32,
    ) -> Result<Vec<Event>, ApiError> {
        let query = [
            (
                "startDateTime",
                start.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            ("endDateTime", end.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("$select", EVENT_FIELDS.to_string()),
            ("$orderby", "start/dateTime asc".to_string()),
            ("$top", top.to_string()),
        ];
        let headers = [("Prefer", PREFER_UTC.to_string())];
        let response: ListResponse<Event> = self
            .get(access_token, "/me/calendarView", &query, &headers)
            .await?;
        Ok(response.value)
    }

    /// Search events by subject text, soonest first.
    pub async fn search_events(
        &self,
        access_token: &str,
        subject: &str,
        top: u32,
    ) -> Result<Vec<Event>, ApiError> {
        let filter = format!("contains(subject,'{}')", escape_single_quotes(subject));
        let query = [
            ("$select", EVENT_FIELDS.to_string()),
            ("$filter", filter),
            ("$orderby", "start/dateTime asc".to_string()),
            ("$top", top.to_string()),
        ];
        let headers = [("Prefer", PREFER_UTC.to_string())];
        let response: ListResponse<Event> = self
            .get(access_token, "/me/events", &query, &headers)
            .await?;
        Ok(response.value)
    }

    /// Fetch a single event including its body preview.
    pub async fn get_event(&self, access_token: &str, id: &str) -> Result<Event, ApiError> {
        let query = [("$select", EVENT_DETAIL_FIELDS.to_string())];
        let headers = [("Prefer", PREFER_UTC.to_string())];
        self.get(access_token, &format!("/me/events/{id}"), &query, &headers)
            .await
    }
}

/// Escape a string for use inside an OData single-quoted literal.
fn escape_single_quotes(s: &str) -> String {
    s.replace('\'', "''")
}
