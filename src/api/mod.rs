//! API module for HTTP and WebSocket endpoints
//!
//! This module provides the webhook, the inbox views and the live update
//! channel for the browser UI.

pub mod http;
pub mod rest;
pub mod state;
pub mod views;
pub mod websocket;

pub use http::create_router;
pub use state::AppState;
