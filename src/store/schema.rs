/// SQL DDL for the inbox database.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
";

pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS emails (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sender TEXT NOT NULL DEFAULT '',
    recipient TEXT NOT NULL DEFAULT '',
    subject TEXT NOT NULL DEFAULT '',
    body_html TEXT NOT NULL DEFAULT '',
    body_text TEXT NOT NULL DEFAULT '',
    headers TEXT NOT NULL DEFAULT '',
    received_at TEXT NOT NULL,
    sender_ip TEXT NOT NULL DEFAULT '',
    spam_score REAL NOT NULL DEFAULT 0.0,
    attachments_info TEXT NOT NULL DEFAULT '',
    dkim TEXT NOT NULL DEFAULT '',
    content_ids TEXT NOT NULL DEFAULT '',
    envelope TEXT NOT NULL DEFAULT '',
    attachments INTEGER NOT NULL DEFAULT 0,
    spam_report TEXT NOT NULL DEFAULT '',
    attachment_info TEXT NOT NULL DEFAULT '',
    charsets TEXT NOT NULL DEFAULT '',
    spf TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_emails_recipient ON emails(recipient);
CREATE INDEX IF NOT EXISTS idx_emails_received_at ON emails(received_at);
"#;
