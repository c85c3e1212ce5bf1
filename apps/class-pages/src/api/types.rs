//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API, and the
//! mapping from `ClassPagesError` to HTTP status codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use class_pages_core::{
    ClassPagesError, ImportMode, NavAction, NavigationState, RecordType, SpellListAssignment,
    Stimulus,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// VIEW & NAVIGATION
// =============================================================================

/// Query string of `GET /view`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewQuery {
    pub class: Option<String>,
    pub subtab: Option<String>,
    /// Spell filter query applied to the displayed buckets.
    pub filter: Option<String>,
}

/// Body of `POST /navigate`.
///
/// `action` wins over `stimulus` when both are given. With neither, the
/// view is rebuilt with `state` carried over.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigateRequest {
    #[serde(default)]
    pub state: Option<NavigationState>,
    #[serde(default)]
    pub action: Option<NavAction>,
    #[serde(default)]
    pub stimulus: Option<Stimulus>,
}

impl NavigateRequest {
    /// The action to apply, resolving a raw stimulus if needed.
    #[must_use]
    pub fn resolved_action(&self) -> Option<NavAction> {
        self.action
            .clone()
            .or_else(|| self.stimulus.clone().and_then(Stimulus::resolve))
    }
}

// =============================================================================
// SPELL LISTS
// =============================================================================

/// Query string of `GET /lists`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListsQuery {
    /// Filter query, e.g. `level:3 school:evo fire`.
    #[serde(default)]
    pub filter: Option<String>,
}

/// Body of `PUT /lists/{class}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetListRequest {
    pub uuids: Vec<String>,
}

/// Body of `POST /lists/{class}/toggle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleRequest {
    pub uuid: String,
    pub member: bool,
}

/// One class's list after an edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub class_identifier: String,
    pub uuids: Vec<String>,
}

impl ListResponse {
    #[must_use]
    pub fn from_assignment(class_identifier: &str, lists: &SpellListAssignment) -> Self {
        Self {
            class_identifier: class_identifier.to_string(),
            uuids: lists.list(class_identifier).to_vec(),
        }
    }
}

// =============================================================================
// IMPORT
// =============================================================================

/// Query string of `POST /import`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportQuery {
    /// `override` (default) or `merge`.
    #[serde(default)]
    pub mode: Option<String>,
}

impl ImportQuery {
    pub fn mode(&self) -> Result<ImportMode, ClassPagesError> {
        match self.mode.as_deref() {
            None => Ok(ImportMode::Override),
            Some(mode) => mode.parse(),
        }
    }
}

/// Result of an import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResponse {
    pub mode: ImportMode,
    pub classes: usize,
    pub lists: SpellListAssignment,
}

// =============================================================================
// SOURCES
// =============================================================================

/// Body of `PUT /sources/{record_type}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetSourcesRequest {
    pub sources: Vec<String>,
}

/// Configured sources per record family, plus what the catalog offers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesResponse {
    pub sources: BTreeMap<RecordType, Vec<String>>,
    pub available: Vec<String>,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error body of every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A `ClassPagesError` on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub ClassPagesError);

impl From<ClassPagesError> for ApiError {
    fn from(error: ClassPagesError) -> Self {
        Self(error)
    }
}

/// HTTP status for an error: validation 400, privilege 403, anything
/// storage- or catalog-related 500.
#[must_use]
pub fn status_for(error: &ClassPagesError) -> StatusCode {
    match error {
        ClassPagesError::InvalidImport(_)
        | ClassPagesError::UnknownRecordType(_)
        | ClassPagesError::UnknownImportMode(_)
        | ClassPagesError::UnknownScope(_)
        | ClassPagesError::UnknownMember { .. } => StatusCode::BAD_REQUEST,
        ClassPagesError::Forbidden => StatusCode::FORBIDDEN,
        ClassPagesError::CatalogError(_)
        | ClassPagesError::RenderError(_)
        | ClassPagesError::SerializationError(_)
        | ClassPagesError::DeserializationError(_)
        | ClassPagesError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
