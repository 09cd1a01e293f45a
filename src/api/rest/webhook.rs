//! Inbound parse webhook

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::{debug, error};

use super::ApiError;
use crate::api::state::AppState;
use crate::types::NewEmail;
use crate::utils::format::{parse_lenient_f64, parse_lenient_i64};

/// Successful ingestion response
#[derive(Debug, Serialize)]
pub struct ReceiveResponse {
    pub status: String,
    pub id: String,
}

/// POST /webhook/sendgrid/receive - Store an inbound message and notify clients
pub async fn receive(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    let email = match multipart {
        Ok(multipart) => read_form(multipart).await,
        Err(e) => Err(e.body_text()),
    };
    let email = match email {
        Ok(email) => email,
        Err(reason) => {
            error!(error = %reason, "error parsing multipart form");
            let error = ApiError::bad_request("invalid request, could not parse form");
            return error.into_response();
        }
    };

    let stored = match state.store.insert(email) {
        Ok(stored) => stored,
        Err(e) => {
            error!(error = %e, "error inserting email into database");
            return ApiError::internal(format!("could not insert email: {e}")).into_response();
        }
    };

    debug!(email_id = stored.id, recipient = %stored.recipient, "email saved, broadcasting");
    state.broadcaster.notify_new(&stored);

    let response = ReceiveResponse {
        status: "message saved".to_string(),
        id: stored.id.to_string(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

async fn read_form(mut multipart: Multipart) -> Result<NewEmail, String> {
    let mut email = NewEmail::received_now();

    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        // Attachment uploads carry a filename; only their metadata fields are kept
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        let value = field.text().await.map_err(|e| e.to_string())?;
        apply_field(&mut email, &name, value);
    }

    Ok(email)
}

/// Map one SendGrid form field onto the message
pub fn apply_field(email: &mut NewEmail, name: &str, value: String) {
    match name {
        "from" => email.sender = value,
        "to" => email.recipient = value,
        "subject" => email.subject = value,
        "html" => email.body_html = value,
        "text" => email.body_text = value,
        "headers" => email.headers = value,
        "sender_ip" => email.sender_ip = value,
        "spam_score" => email.spam_score = parse_lenient_f64(name, &value),
        "attachment-info" => {
            email.attachments_info = value.clone();
            email.attachment_info = value;
        }
        "dkim" => email.dkim = value,
        "content-ids" => email.content_ids = value,
        "envelope" => email.envelope = value,
        "attachments" => email.attachments = parse_lenient_i64(name, &value),
        "spam_report" => email.spam_report = value,
        "charsets" => email.charsets = value,
        "SPF" => email.spf = value,
        other => debug!(field = other, "ignoring unknown form field"),
    }
}
