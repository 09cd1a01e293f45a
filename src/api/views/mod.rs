//! HTML views for the inbox UI
//!
//! - `GET /` - Latest messages
//! - `GET /inbox` - Paginated listing with recipient filter
//! - `GET /inbox/:id` - Single message

pub mod inbox;

use std::fmt::Write;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::types::EmailSummary;
use crate::utils::{escape_html, truncate_email};

/// Wrap a page body in the shared document shell
pub(crate) fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} - Test Inbox</title>
<script src="https://cdn.tailwindcss.com"></script>
<script src="/public/websocket.js"></script>
<script src="/public/goback.js"></script>
<script src="/public/suggestion.js"></script>
</head>
<body class="bg-gray-100">
<main class="container mx-auto p-6">
{body}
</main>
</body>
</html>"#,
        title = escape_html(title),
        body = body,
    ))
}

/// Plain failure page used by every HTML route
pub(crate) fn error_page(status: StatusCode, message: &str) -> Response {
    (status, layout("Error", &format!(r#"<p class="text-red-600">{}</p>"#, escape_html(message))))
        .into_response()
}

/// Table of messages, newest first. Rows link to the detail view.
pub(crate) fn email_table(emails: &[EmailSummary]) -> String {
    let mut rows = String::new();
    for (index, email) in emails.iter().enumerate() {
        let stripe = if index % 2 == 1 { "bg-gray-50" } else { "bg-white" };
        let _ = write!(
            rows,
            r#"<tr class="{stripe} cursor-pointer" onclick="window.location='/inbox/{id}'">
<td class="px-6 py-4 whitespace-nowrap"><div class="text-sm text-gray-900" title="{recipient}">{recipient_short}</div></td>
<td class="px-6 py-4 whitespace-nowrap"><div class="text-sm text-gray-900">{sender}</div></td>
<td class="px-6 py-4 whitespace-nowrap"><div class="text-sm text-gray-900">{subject}</div></td>
<td class="px-6 py-4 whitespace-nowrap"><div class="text-sm text-gray-500">{received_at}</div></td>
</tr>
"#,
            stripe = stripe,
            id = email.id,
            recipient = escape_html(&email.recipient),
            recipient_short = escape_html(truncate_email(&email.recipient)),
            sender = escape_html(&email.sender),
            subject = escape_html(&email.subject),
            received_at = email.received_at.format("%Y-%m-%d %H:%M:%S UTC"),
        );
    }

    format!(
        r#"<table id="emailList" class="min-w-full divide-y divide-gray-200">
<thead class="bg-gray-50"><tr>
<th class="px-6 py-3 text-left text-xs text-gray-500 uppercase">Recipient</th>
<th class="px-6 py-3 text-left text-xs text-gray-500 uppercase">Sender</th>
<th class="px-6 py-3 text-left text-xs text-gray-500 uppercase">Subject</th>
<th class="px-6 py-3 text-left text-xs text-gray-500 uppercase">Received</th>
</tr></thead>
<tbody>
{rows}</tbody>
</table>"#
    )
}
