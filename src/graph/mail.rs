//! Mail queries against Microsoft Graph.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ApiError;
use crate::graph::{GraphClient, ListResponse, Recipient};

/// Fields requested for message listings.
const MESSAGE_FIELDS: &str = "id,subject,from,receivedDateTime,isRead,webLink";
/// Fields requested for a single message.
const MESSAGE_DETAIL_FIELDS: &str = "id,subject,from,receivedDateTime,isRead,bodyPreview,webLink";

/// Folder names Graph resolves directly, without an id lookup.
const WELL_KNOWN_FOLDERS: [&str; 6] = [
    "inbox",
    "drafts",
    "sentitems",
    "deleteditems",
    "archive",
    "junkemail",
];

/// A mail message, as much of it as the listing queries select.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub subject: Option<String>,
    pub from: Option<Recipient>,
    pub received_date_time: Option<DateTime<Utc>>,
    pub is_read: Option<bool>,
    #[serde(default)]
    pub body_preview: Option<String>,
    pub web_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailFolder {
    pub id: String,
    pub display_name: Option<String>,
    pub unread_item_count: Option<i64>,
    pub total_item_count: Option<i64>,
}

impl GraphClient {
    /// List messages in a folder, newest first.
    pub async fn list_messages(
        &self,
        access_token: &str,
        folder: &str,
        top: u32,
    ) -> Result<Vec<Message>, ApiError> {
        let folder_id = self.resolve_folder(access_token, folder).await?;
        let query = [
            ("$select", MESSAGE_FIELDS.to_string()),
            ("$orderby", "receivedDateTime desc".to_string()),
            ("$top", top.to_string()),
        ];
        let response: ListResponse<Message> = self
            .get(
                access_token,
                &format!("/me/mailFolders/{folder_id}/messages"),
                &query,
                &[],
            )
            .await?;
        Ok(response.value)
    }

    /// Fetch a single message including its body preview.
    pub async fn get_message(&self, access_token: &str, id: &str) -> Result<Message, ApiError> {
        let query = [("$select", MESSAGE_DETAIL_FIELDS.to_string())];
        self.get(access_token, &format!("/me/messages/{id}"), &query, &[])
            .await
    }

    /// Full-text search across the mailbox, newest first.
    ///
    /// Graph rejects `$orderby` together with `$search`, so results are
    /// sorted client-side after the fetch.
    pub async fn search_messages(
        &self,
        access_token: &str,
        search: &str,
        top: u32,
    ) -> Result<Vec<Message>, ApiError> {
        let query = [
            ("$select", MESSAGE_FIELDS.to_string()),
            ("$search", format!("\"{search}\"")),
            ("$count", "true".to_string()),
            ("$top", top.to_string()),
        ];
        let headers = [("ConsistencyLevel", "eventual".to_string())];
        let response: ListResponse<Message> = self
            .get(access_token, "/me/messages", &query, &headers)
            .await?;

        let mut messages = response.value;
        messages.sort_by(|a, b| b.received_date_time.cmp(&a.received_date_time));
        messages.truncate(top as usize);
        Ok(messages)
    }

    /// List top-level mail folders.
    pub async fn list_folders(
        &self,
        access_token: &str,
        top: u32,
    ) -> Result<Vec<MailFolder>, ApiError> {
        let query = [
            (
                "$select",
                "id,displayName,unreadItemCount,totalItemCount".to_string(),
            ),
            ("$top", top.to_string()),
        ];
        let response: ListResponse<MailFolder> =
            self.get(access_token, "/me/mailFolders", &query, &[]).await?;
        Ok(response.value)
    }

    /// Resolve a folder name to a path segment usable in message queries.
    ///
    /// Well-known names ("inbox", "Sent Items", ...) map straight to their
    /// Graph identifiers; anything else is matched case-insensitively
    /// against top-level folder display names.
    pub async fn resolve_folder(
        &self,
        access_token: &str,
        name: &str,
    ) -> Result<String, ApiError> {
        let normalized = name.to_lowercase().replace(' ', "");
        if WELL_KNOWN_FOLDERS.contains(&normalized.as_str()) {
            return Ok(normalized);
        }

        let folders = self.list_folders(access_token, 100).await?;
        folders
            .into_iter()
            .find(|folder| {
                folder
                    .display_name
                    .as_deref()
                    .is_some_and(|display| display.eq_ignore_ascii_case(name))
            })
            .map(|folder| folder.id)
            .ok_or_else(|| ApiError::NotFound(format!("folder '{name}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::client::tests::client_for;

    const MESSAGE_PAGE: &str = r#"{
        "value": [
            {
                "id": "m1",
                "subject": "Quarterly report",
                "from": {"emailAddress": {"name": "Alice", "address": "alice@example.com"}},
                "receivedDateTime": "2026-08-25T10:00:00Z",
                "isRead": false
            },
            {
                "id": "m2",
                "subject": "Lunch?",
                "from": {"emailAddress": {"address": "bob@example.com"}},
                "receivedDateTime": "2026-08-24T09:00:00Z",
                "isRead": true
            }
        ]
    }"#;

    #[tokio::test]
    async fn test_list_messages_in_well_known_folder() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/me/mailFolders/inbox/messages")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("$orderby".into(), "receivedDateTime desc".into()),
                mockito::Matcher::UrlEncoded("$top".into(), "10".into()),
            ]))
            .with_status(200)
            .with_body(MESSAGE_PAGE)
            .create_async()
            .await;

        let client = client_for(&server);
        let messages = client.list_messages("token", "Inbox", 10).await.unwrap();

        mock.assert_async().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].subject.as_deref(), Some("Quarterly report"));
        assert_eq!(messages[0].is_read, Some(false));
    }

    #[tokio::test]
    async fn test_search_sorts_newest_first() {
        let mut server = mockito::Server::new_async().await;
        // Server returns oldest first; the client must reorder.
        let mock = server
            .mock("GET", "/me/messages")
            .match_header("ConsistencyLevel", "eventual")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("$search".into(), "\"invoice\"".into()),
                mockito::Matcher::UrlEncoded("$count".into(), "true".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{
                    "value": [
                        {"id": "old", "receivedDateTime": "2026-08-01T00:00:00Z"},
                        {"id": "new", "receivedDateTime": "2026-08-20T00:00:00Z"}
                    ]
                }"#,
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let messages = client.search_messages("token", "invoice", 10).await.unwrap();

        mock.assert_async().await;
        assert_eq!(messages[0].id, "new");
        assert_eq!(messages[1].id, "old");
    }

    #[tokio::test]
    async fn test_search_truncates_to_top() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/me/messages")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{
                    "value": [
                        {"id": "a", "receivedDateTime": "2026-08-01T00:00:00Z"},
                        {"id": "b", "receivedDateTime": "2026-08-02T00:00:00Z"},
                        {"id": "c", "receivedDateTime": "2026-08-03T00:00:00Z"}
                    ]
                }"#,
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let messages = client.search_messages("token", "x", 2).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, "c");
    }

    #[tokio::test]
    async fn test_get_message_selects_body_preview() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/me/messages/m1")
            .match_query(mockito::Matcher::UrlEncoded(
                "$select".into(),
                MESSAGE_DETAIL_FIELDS.into(),
            ))
            .with_status(200)
            .with_body(
                r#"{"id": "m1", "subject": "Hi", "bodyPreview": "First lines of the body"}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let message = client.get_message("token", "m1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            message.body_preview.as_deref(),
            Some("First lines of the body")
        );
    }

    #[tokio::test]
    async fn test_resolve_folder_well_known_skips_lookup() {
        // No mocks registered: a request would fail the test.
        let server = mockito::Server::new_async().await;
        let client = client_for(&server);

        assert_eq!(
            client.resolve_folder("token", "Sent Items").await.unwrap(),
            "sentitems"
        );
        assert_eq!(
            client.resolve_folder("token", "INBOX").await.unwrap(),
            "inbox"
        );
    }

    #[tokio::test]
    async fn test_resolve_folder_by_display_name() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/me/mailFolders")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{
                    "value": [
                        {"id": "f-inbox", "displayName": "Inbox"},
                        {"id": "f-projects", "displayName": "Projects"}
                    ]
                }"#,
            )
            .create_async()
            .await;

        let client = client_for(&server);
        assert_eq!(
            client.resolve_folder("token", "projects").await.unwrap(),
            "f-projects"
        );

        let err = client.resolve_folder("token", "missing").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
