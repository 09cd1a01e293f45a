//! SQLite-backed [`EmailRepository`]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, instrument};

use super::schema;
use super::{EmailRepository, StoreError, MAX_SUGGESTIONS};
use crate::types::{Email, EmailSummary, NewEmail, Page, PageRequest};

const EMAIL_COLUMNS: &str = "id, sender, recipient, subject, body_html, body_text, headers, \
     received_at, sender_ip, spam_score, attachments_info, dkim, content_ids, envelope, \
     attachments, spam_report, attachment_info, charsets, spf, created_at, updated_at";

const SUMMARY_COLUMNS: &str = "id, sender, recipient, subject, received_at";

/// Thread-safe SQLite store.
/// Uses parking_lot::Mutex for synchronous access to the single connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Database(format!("create dir: {e}")))?;
            }
        }

        let conn = Connection::open(path)?;
        Self::prepare(&conn)?;
        info!(path = %path.display(), "database opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_owned(),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::prepare(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn prepare(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(schema::PRAGMAS)
            .map_err(|e| StoreError::Database(format!("pragmas: {e}")))?;
        conn.execute_batch(schema::CREATE_TABLES)
            .map_err(|e| StoreError::Database(format!("schema: {e}")))?;
        // Built-in LIKE and lower() only fold ASCII
        conn.create_scalar_function(
            "casefold",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let value: Option<String> = ctx.get(0)?;
                Ok(value.map(|v| v.to_lowercase()))
            },
        )
        .map_err(|e| StoreError::Database(format!("casefold: {e}")))?;
        Ok(())
    }
}

impl EmailRepository for SqliteStore {
    #[instrument(skip(self, email), fields(recipient = %email.recipient))]
    fn insert(&self, email: NewEmail) -> Result<Email, StoreError> {
        let now = Utc::now();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO emails (
                sender, recipient, subject, body_html, body_text, headers, received_at,
                sender_ip, spam_score, attachments_info, dkim, content_ids, envelope,
                attachments, spam_report, attachment_info, charsets, spf, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?19)",
            params![
                email.sender,
                email.recipient,
                email.subject,
                email.body_html,
                email.body_text,
                email.headers,
                format_timestamp(&email.received_at),
                email.sender_ip,
                email.spam_score,
                email.attachments_info,
                email.dkim,
                email.content_ids,
                email.envelope,
                email.attachments,
                email.spam_report,
                email.attachment_info,
                email.charsets,
                email.spf,
                format_timestamp(&now),
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(email_id = id, "email inserted");

        // Round-trip through the formatted timestamps so the returned record
        // matches what a later `get` yields.
        let stored_at = parse_timestamp("created_at", &format_timestamp(&now))?;
        let received_at = parse_timestamp("received_at", &format_timestamp(&email.received_at))?;

        Ok(Email {
            id,
            sender: email.sender,
            recipient: email.recipient,
            subject: email.subject,
            body_html: email.body_html,
            body_text: email.body_text,
            headers: email.headers,
            received_at,
            sender_ip: email.sender_ip,
            spam_score: email.spam_score,
            attachments_info: email.attachments_info,
            dkim: email.dkim,
            content_ids: email.content_ids,
            envelope: email.envelope,
            attachments: email.attachments,
            spam_report: email.spam_report,
            attachment_info: email.attachment_info,
            charsets: email.charsets,
            spf: email.spf,
            created_at: stored_at,
            updated_at: stored_at,
        })
    }

    fn get(&self, id: i64) -> Result<Email, StoreError> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {EMAIL_COLUMNS} FROM emails WHERE id = ?1");
        let row = conn
            .query_row(&sql, [id], |row| Ok(RawEmail::from_row(row)))
            .optional()?;

        match row {
            Some(raw) => raw?.into_email(),
            None => Err(StoreError::NotFound(format!("email {id}"))),
        }
    }

    #[instrument(skip(self))]
    fn list(
        &self,
        page: PageRequest,
        recipient: Option<&str>,
    ) -> Result<Page<EmailSummary>, StoreError> {
        let conn = self.conn.lock();
        let limit = i64::from(page.limit);
        let offset = i64::try_from(page.offset).unwrap_or(i64::MAX);

        let (rows, total) = match recipient.filter(|r| !r.is_empty()) {
            Some(recipient) => {
                let sql = format!(
                    "SELECT {SUMMARY_COLUMNS} FROM emails WHERE recipient = ?3
                     ORDER BY received_at DESC, id DESC LIMIT ?1 OFFSET ?2"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![limit, offset, recipient], |row| {
                        Ok(RawSummary::from_row(row))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                let total: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM emails WHERE recipient = ?1",
                    [recipient],
                    |row| row.get(0),
                )?;
                (rows, total)
            }
            None => {
                let sql = format!(
                    "SELECT {SUMMARY_COLUMNS} FROM emails
                     ORDER BY received_at DESC, id DESC LIMIT ?1 OFFSET ?2"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![limit, offset], |row| Ok(RawSummary::from_row(row)))?
                    .collect::<Result<Vec<_>, _>>()?;
                let total: i64 =
                    conn.query_row("SELECT COUNT(*) FROM emails", [], |row| row.get(0))?;
                (rows, total)
            }
        };

        let items = rows
            .into_iter()
            .map(|raw| raw?.into_summary())
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = items.len(), total, "emails fetched");

        Ok(Page {
            items,
            total: total.max(0) as u64,
        })
    }

    fn count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(1) FROM emails", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn suggest_recipients(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();
        let pattern = format!("{}%", escape_like(&prefix.to_lowercase()));
        let mut stmt = conn.prepare(
            "SELECT DISTINCT recipient FROM emails
             WHERE casefold(recipient) LIKE ?1 ESCAPE '\\'
             ORDER BY recipient LIMIT ?2",
        )?;
        let suggestions = stmt
            .query_map(params![pattern, MAX_SUGGESTIONS as i64], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(suggestions)
    }
}

/// Fixed-width RFC 3339 so lexical order in SQL matches time order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(column: &'static str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRow {
            column,
            detail: format!("invalid timestamp {raw:?}: {e}"),
        })
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Row as read from SQLite, timestamps still in text form.
struct RawEmail {
    email: Email,
    received_at: String,
    created_at: String,
    updated_at: String,
}

impl RawEmail {
    fn from_row(row: &Row<'_>) -> Result<Self, StoreError> {
        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        Ok(Self {
            email: Email {
                id: row.get(0)?,
                sender: row.get(1)?,
                recipient: row.get(2)?,
                subject: row.get(3)?,
                body_html: row.get(4)?,
                body_text: row.get(5)?,
                headers: row.get(6)?,
                received_at: epoch,
                sender_ip: row.get(8)?,
                spam_score: row.get(9)?,
                attachments_info: row.get(10)?,
                dkim: row.get(11)?,
                content_ids: row.get(12)?,
                envelope: row.get(13)?,
                attachments: row.get(14)?,
                spam_report: row.get(15)?,
                attachment_info: row.get(16)?,
                charsets: row.get(17)?,
                spf: row.get(18)?,
                created_at: epoch,
                updated_at: epoch,
            },
            received_at: row.get(7)?,
            created_at: row.get(19)?,
            updated_at: row.get(20)?,
        })
    }

    fn into_email(self) -> Result<Email, StoreError> {
        let mut email = self.email;
        email.received_at = parse_timestamp("received_at", &self.received_at)?;
        email.created_at = parse_timestamp("created_at", &self.created_at)?;
        email.updated_at = parse_timestamp("updated_at", &self.updated_at)?;
        Ok(email)
    }
}

struct RawSummary {
    id: i64,
    sender: String,
    recipient: String,
    subject: String,
    received_at: String,
}

impl RawSummary {
    fn from_row(row: &Row<'_>) -> Result<Self, StoreError> {
        Ok(Self {
            id: row.get(0)?,
            sender: row.get(1)?,
            recipient: row.get(2)?,
            subject: row.get(3)?,
            received_at: row.get(4)?,
        })
    }

    fn into_summary(self) -> Result<EmailSummary, StoreError> {
        Ok(EmailSummary {
            id: self.id,
            sender: self.sender,
            recipient: self.recipient,
            subject: self.subject,
            received_at: parse_timestamp("received_at", &self.received_at)?,
        })
    }
}
