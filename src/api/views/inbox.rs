//! Inbox pages

use std::fmt::Write;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, error, warn};

use super::{email_table, error_page, layout};
use crate::api::state::AppState;
use crate::config::{HOME_PAGE_SIZE, INBOX_PAGE_SIZE};
use crate::store::StoreError;
use crate::types::{ContentType, Email, PageRequest};
use crate::utils::escape_html;

/// GET / - Latest messages and the total count
pub async fn home(State(state): State<Arc<AppState>>) -> Response {
    let page = match state.store.list(PageRequest::for_page(1, HOME_PAGE_SIZE), None) {
        Ok(page) => page,
        Err(e) => {
            error!(error = %e, "failed to fetch emails for homepage");
            return error_page(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch emails");
        }
    };
    debug!(total_emails = page.total, "emails fetched for homepage");

    let body = format!(
        r#"<h1 class="text-2xl font-bold mb-4">Test Inbox</h1>
<p class="mb-4 text-gray-700">{total} messages received. <a class="text-blue-600" href="/inbox">Open inbox</a></p>
{table}"#,
        total = page.total,
        table = email_table(&page.items),
    );
    layout("Home", &body).into_response()
}

/// Query parameters for the inbox listing
#[derive(Debug, Deserialize)]
pub struct InboxParams {
    /// 1-based page number; kept as text so junk falls back to page 1
    pub page: Option<String>,
    pub recipient: Option<String>,
}

impl InboxParams {
    fn page_number(&self) -> u32 {
        match self.page.as_deref().map(str::parse::<u32>) {
            Some(Ok(page)) if page >= 1 => page,
            None => 1,
            other => {
                warn!(page = ?self.page, parsed = ?other, "invalid page number, defaulting to page 1");
                1
            }
        }
    }

    fn recipient(&self) -> Option<&str> {
        self.recipient.as_deref().filter(|r| !r.is_empty())
    }
}

/// GET /inbox - Paginated listing, optionally filtered by recipient
pub async fn list(State(state): State<Arc<AppState>>, Query(params): Query<InboxParams>) -> Response {
    let page_number = params.page_number();
    let recipient = params.recipient();
    let request = PageRequest::for_page(page_number, INBOX_PAGE_SIZE);
    debug!(page = page_number, limit = request.limit, offset = request.offset, recipient, "fetching emails");

    let page = match state.store.list(request, recipient) {
        Ok(page) => page,
        Err(e) => {
            error!(error = %e, "failed to fetch emails");
            return error_page(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch emails");
        }
    };

    let total_pages = page.total_pages(INBOX_PAGE_SIZE);
    let body = format!(
        r#"<h1 class="text-2xl font-bold mb-4">Inbox</h1>
<form method="get" action="/inbox" class="relative mb-4" autocomplete="off">
<input id="searchRecipient" name="recipient" value="{recipient}" placeholder="Filter by recipient" class="border rounded p-2 w-80">
<div id="suggestionsBox" class="absolute bg-white border w-80" style="display:none"></div>
<button type="submit" class="ml-2 px-4 py-2 bg-blue-600 text-white rounded">Filter</button>
</form>
{table}
{pagination}"#,
        recipient = escape_html(recipient.unwrap_or_default()),
        table = email_table(&page.items),
        pagination = pagination(page_number, total_pages, recipient),
    );
    layout("Inbox", &body).into_response()
}

/// Page links 1..=total_pages, keeping the recipient filter
pub(crate) fn pagination(current: u32, total_pages: u32, recipient: Option<&str>) -> String {
    if total_pages == 0 {
        return String::new();
    }

    let filter = recipient
        .map(|r| format!("&recipient={}", urlencoding::encode(r)))
        .unwrap_or_default();

    let mut links = String::from(r#"<nav class="mt-4 flex gap-2">"#);
    for page in 1..=total_pages {
        if page == current {
            let _ = write!(links, r#"<span class="px-3 py-1 bg-blue-600 text-white rounded">{page}</span>"#);
        } else {
            let _ = write!(
                links,
                r#"<a class="px-3 py-1 bg-white rounded" href="/inbox?page={page}{filter}">{page}</a>"#,
                filter = escape_html(&filter),
            );
        }
    }
    links.push_str("</nav>");
    links
}

/// GET /inbox/:id - Single message
pub async fn detail(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let Ok(id) = id.parse::<i64>() else {
        return error_page(StatusCode::BAD_REQUEST, "Invalid email id");
    };

    match state.store.get(id) {
        Ok(email) => layout(&email.subject, &render_detail(&email)).into_response(),
        Err(StoreError::NotFound(_)) => error_page(StatusCode::NOT_FOUND, "Email not found"),
        Err(e) => {
            error!(email_id = id, error = %e, "failed to fetch email");
            error_page(StatusCode::INTERNAL_SERVER_ERROR, "Could not fetch email")
        }
    }
}

fn render_detail(email: &Email) -> String {
    let content_type = email.content_type();
    let body = match content_type {
        // srcdoc keeps the message markup out of the page's own DOM
        ContentType::Html => format!(
            r#"<iframe sandbox class="w-full h-96 bg-white border" srcdoc="{}"></iframe>"#,
            escape_html(&email.body_html)
        ),
        ContentType::Text => format!(
            r#"<pre class="whitespace-pre-wrap bg-white p-4 border">{}</pre>"#,
            escape_html(&email.body_text)
        ),
        ContentType::None => r#"<p class="text-gray-500">No content</p>"#.to_string(),
    };

    format!(
        r#"<button onclick="goBack()" class="mb-4 text-blue-600">&larr; Back</button>
<h1 class="text-2xl font-bold mb-2">{subject}</h1>
<dl class="grid grid-cols-2 gap-2 mb-4 text-sm">
<dt>From</dt><dd>{sender}</dd>
<dt>To</dt><dd>{recipient}</dd>
<dt>Received</dt><dd>{received_at}</dd>
<dt>Sender IP</dt><dd>{sender_ip}</dd>
<dt>Spam score</dt><dd>{spam_score}</dd>
<dt>SPF</dt><dd>{spf}</dd>
<dt>DKIM</dt><dd>{dkim}</dd>
<dt>Attachments</dt><dd>{attachments}</dd>
<dt>Content type</dt><dd>{content_type}</dd>
</dl>
{body}
<details class="mt-4"><summary>Headers</summary><pre class="whitespace-pre-wrap text-xs">{headers}</pre></details>
<details class="mt-2"><summary>Envelope</summary><pre class="text-xs">{envelope}</pre></details>"#,
        subject = escape_html(&email.subject),
        sender = escape_html(&email.sender),
        recipient = escape_html(&email.recipient),
        received_at = email.received_at.format("%Y-%m-%d %H:%M:%S UTC"),
        sender_ip = escape_html(&email.sender_ip),
        spam_score = email.spam_score,
        spf = escape_html(&email.spf),
        dkim = escape_html(&email.dkim),
        attachments = email.attachments,
        content_type = content_type.label(),
        body = body,
        headers = escape_html(&email.headers),
        envelope = escape_html(&email.envelope),
    )
}
