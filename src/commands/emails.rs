//! Mail listing, reading, and search.

use std::process::ExitCode;

use clap::Subcommand;
use serde::Serialize;

use crate::auth::AuthHandler;
use crate::error::AppError;
use crate::graph::mail::{MailFolder, Message};
use crate::graph::Recipient;

use super::{auth_required, print_json, CommandContext, OutputFormat, MAIL_SCOPE};

#[derive(Subcommand, Debug)]
pub enum EmailsAction {
    /// List messages in a folder, newest first.
    List {
        /// Folder name: well-known (inbox, drafts, sentitems, ...) or a
        /// display name.
        #[arg(long, default_value = "inbox")]
        folder: String,
        /// Maximum number of messages.
        #[arg(long, default_value_t = 10)]
        top: u32,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show a single message.
    Read {
        /// Message id.
        #[arg(long)]
        id: String,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Full-text search across the mailbox.
    Search {
        /// Search phrase.
        #[arg(long)]
        query: String,
        /// Maximum number of messages.
        #[arg(long, default_value_t = 10)]
        top: u32,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// List mail folders with message counts.
    Folders {
        /// Maximum number of folders.
        #[arg(long, default_value_t = 20)]
        top: u32,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Display record for one message.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageRow {
    id: String,
    received: String,
    from: String,
    subject: String,
    is_read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    web_link: Option<String>,
}

impl From<Message> for MessageRow {
    fn from(message: Message) -> Self {
        Self {
            received: message
                .received_date_time
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".into()),
            from: message
                .from
                .as_ref()
                .and_then(Recipient::label)
                .unwrap_or("unknown sender")
                .to_string(),
            subject: message.subject.unwrap_or_else(|| "(no subject)".into()),
            is_read: message.is_read.unwrap_or(true),
            preview: message.body_preview,
            web_link: message.web_link,
            id: message.id,
        }
    }
}

/// Display record for one folder.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FolderRow {
    id: String,
    name: String,
    unread: i64,
    total: i64,
}

impl From<MailFolder> for FolderRow {
    fn from(folder: MailFolder) -> Self {
        Self {
            name: folder.display_name.unwrap_or_else(|| "(unnamed)".into()),
            unread: folder.unread_item_count.unwrap_or(0),
            total: folder.total_item_count.unwrap_or(0),
            id: folder.id,
        }
    }
}

pub async fn run(ctx: &CommandContext, action: EmailsAction) -> Result<ExitCode, AppError> {
    let handler = AuthHandler::new(&ctx.config, &ctx.store, &ctx.identity);
    let ready = match handler
        .ensure(&ctx.profile, &[MAIL_SCOPE.to_string()])
        .await?
        .ready()
    {
        Ok(ready) => ready,
        Err(reason) => return Ok(auth_required(&reason)),
    };
    let token = ready.access_token.as_str();

    match action {
        EmailsAction::List {
            folder,
            top,
            format,
        } => {
            let rows: Vec<MessageRow> = ctx
                .graph
                .list_messages(token, &folder, top)
                .await?
                .into_iter()
                .map(MessageRow::from)
                .collect();
            match format {
                OutputFormat::Json => print_json(&rows)?,
                OutputFormat::Text => print_rows(&rows),
            }
        }
        EmailsAction::Read { id, format } => {
            let row = MessageRow::from(ctx.graph.get_message(token, &id).await?);
            match format {
                OutputFormat::Json => print_json(&row)?,
                OutputFormat::Text => print_message(&row),
            }
        }
        EmailsAction::Search { query, top, format } => {
            let rows: Vec<MessageRow> = ctx
                .graph
                .search_messages(token, &query, top)
                .await?
                .into_iter()
                .map(MessageRow::from)
                .collect();
            match format {
                OutputFormat::Json => print_json(&rows)?,
                OutputFormat::Text => print_rows(&rows),
            }
        }
        EmailsAction::Folders { top, format } => {
            let rows: Vec<FolderRow> = ctx
                .graph
                .list_folders(token, top)
                .await?
                .into_iter()
                .map(FolderRow::from)
                .collect();
            match format {
                OutputFormat::Json => print_json(&rows)?,
                OutputFormat::Text => print_folders(&rows),
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_rows(rows: &[MessageRow]) {
    if rows.is_empty() {
        println!("No messages found.");
        return;
    }
    for row in rows {
        let marker = if row.is_read { ' ' } else { '*' };
        println!("{} {} {:<24} {}", row.received, marker, row.from, row.subject);
    }
}

fn print_message(row: &MessageRow) {
    println!("From:     {}", row.from);
    println!("Date:     {}", row.received);
    println!("Subject:  {}", row.subject);
    if let Some(link) = &row.web_link {
        println!("Link:     {link}");
    }
    if let Some(preview) = &row.preview {
        println!();
        println!("{preview}");
    }
}

fn print_folders(rows: &[FolderRow]) {
    if rows.is_empty() {
        println!("No folders found.");
        return;
    }
    for row in rows {
        println!("{:<20} {:>5} unread / {:>5} total", row.name, row.unread, row.total);
    }
}
