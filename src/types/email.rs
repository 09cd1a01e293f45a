//! Email record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inbound message as parsed from the webhook, before it is stored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewEmail {
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body_html: String,
    pub body_text: String,
    pub headers: String,
    pub received_at: DateTime<Utc>,
    pub sender_ip: String,
    pub spam_score: f64,
    pub attachments_info: String,
    pub dkim: String,
    pub content_ids: String,
    pub envelope: String,
    pub attachments: i64,
    pub spam_report: String,
    pub attachment_info: String,
    pub charsets: String,
    pub spf: String,
}

impl NewEmail {
    /// Create an empty message received now
    pub fn received_now() -> Self {
        Self {
            received_at: Utc::now(),
            ..Self::default()
        }
    }
}

/// Stored email record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email {
    pub id: i64,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body_html: String,
    pub body_text: String,
    pub headers: String,
    pub received_at: DateTime<Utc>,
    pub sender_ip: String,
    pub spam_score: f64,
    pub attachments_info: String,
    pub dkim: String,
    pub content_ids: String,
    pub envelope: String,
    pub attachments: i64,
    pub spam_report: String,
    pub attachment_info: String,
    pub charsets: String,
    pub spf: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Email {
    /// Which body the message carries, preferring HTML
    pub fn content_type(&self) -> ContentType {
        if !self.body_html.is_empty() {
            ContentType::Html
        } else if !self.body_text.is_empty() {
            ContentType::Text
        } else {
            ContentType::None
        }
    }
}

/// Columns shown in inbox listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailSummary {
    pub id: i64,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub received_at: DateTime<Utc>,
}

/// Body kind of a stored message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Html,
    Text,
    None,
}

impl ContentType {
    pub fn label(&self) -> &'static str {
        match self {
            ContentType::Html => "HTML",
            ContentType::Text => "Text",
            ContentType::None => "None",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email_with_bodies(html: &str, text: &str) -> Email {
        let now = Utc::now();
        Email {
            id: 1,
            sender: "a@example.com".to_string(),
            recipient: "b@example.com".to_string(),
            subject: "Hi".to_string(),
            body_html: html.to_string(),
            body_text: text.to_string(),
            headers: String::new(),
            received_at: now,
            sender_ip: String::new(),
            spam_score: 0.0,
            attachments_info: String::new(),
            dkim: String::new(),
            content_ids: String::new(),
            envelope: String::new(),
            attachments: 0,
            spam_report: String::new(),
            attachment_info: String::new(),
            charsets: String::new(),
            spf: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_content_type_prefers_html() {
        assert_eq!(email_with_bodies("<p>x</p>", "x").content_type(), ContentType::Html);
        assert_eq!(email_with_bodies("", "x").content_type(), ContentType::Text);
        assert_eq!(email_with_bodies("", "").content_type().label(), "None");
    }

    #[test]
    fn test_email_serializes_snake_case() {
        let json = serde_json::to_string(&email_with_bodies("", "x")).unwrap();
        assert!(json.contains("\"received_at\""));
        assert!(json.contains("\"body_text\":\"x\""));
    }
}
