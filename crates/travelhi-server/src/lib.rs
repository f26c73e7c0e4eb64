//! HTTP and `WebSocket` API server for Travel Hi.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **Incident endpoints** (`/api/v1/incidents`) for creating, listing,
//!   searching by proximity, and reacting to traffic reports
//! - **`WebSocket` endpoint** (`/api/v1/ws`) that pushes every new report
//!   to all connected clients through the [`ConnectionRegistry`]
//! - **Event endpoints** (`/api/v1/events`) for scheduled disruptions
//! - **Prediction endpoint** (`/api/v1/disruptions/predict`) backed by
//!   `travelhi-ai`
//! - **Static files** (`/files/{name}`) serving uploaded photos
//!
//! # Architecture
//!
//! Handlers share one [`AppState`] holding trait-object stores, the
//! connection registry, the image store, and the optional LLM services.
//! Creating a report returns as soon as the store commits; the broadcast
//! runs in a spawned task and never affects the response.

pub mod config;
pub mod error;
pub mod handlers;
pub mod images;
pub mod registry;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use config::{AppConfig, ConfigError};
pub use error::ApiError;
pub use registry::{BroadcastOutcome, ConnectionRegistry, Session, SessionId};
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
