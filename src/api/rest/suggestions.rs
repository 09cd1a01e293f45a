//! Recipient autocomplete endpoint

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::error;

use super::ApiError;
use crate::api::state::AppState;

/// Shortest term that triggers a lookup
pub const MIN_TERM_LEN: usize = 2;

/// Query parameters for suggestions
#[derive(Debug, Deserialize)]
pub struct SuggestionParams {
    #[serde(default)]
    pub term: String,
}

/// GET /api/suggestions/recipients - Recipients starting with `term`
pub async fn recipient_suggestions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SuggestionParams>,
) -> impl IntoResponse {
    if params.term.chars().count() < MIN_TERM_LEN {
        return Json(Vec::<String>::new()).into_response();
    }

    match state.store.suggest_recipients(&params.term) {
        Ok(suggestions) => Json(suggestions).into_response(),
        Err(e) => {
            error!(error = %e, "failed to fetch recipient suggestions");
            ApiError::internal("Failed to fetch suggestions").into_response()
        }
    }
}
