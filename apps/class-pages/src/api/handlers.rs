//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers. Every handler
//! except `/health` receives the request's `Caller` from the auth
//! middleware; privilege checks happen in the settings gateway.

use super::{
    AppState,
    types::{
        ApiError, HealthResponse, ImportQuery, ImportResponse, ListResponse, ListsQuery,
        NavigateRequest, SetListRequest, SetSourcesRequest, SourcesResponse, ToggleRequest,
        ViewQuery,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use class_pages_core::{
    Caller, OverrideEdit, OverrideRow, Overrides, RecordType, SpellFilter, SpellListMatrix,
    ViewModel,
};

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// VIEW HANDLERS
// =============================================================================

/// Build the page for `?class=&subtab=&filter=`.
pub async fn view_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<ViewModel>, ApiError> {
    let mut view = state
        .service
        .build_view(caller, query.class.as_deref(), query.subtab.as_deref())
        .await?;
    let filter = SpellFilter::parse(query.filter.as_deref().unwrap_or_default());
    if !filter.is_empty() {
        view.filter_spells(&filter);
    }
    Ok(Json(view))
}

/// Apply one navigation action (or raw stimulus) to a carried-over state.
pub async fn navigate_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(request): Json<NavigateRequest>,
) -> Result<Json<ViewModel>, ApiError> {
    let action = request.resolved_action();
    let view = state
        .service
        .navigate(caller, request.state.as_ref(), action.as_ref())
        .await?;
    Ok(Json(view))
}

// =============================================================================
// SPELL LIST HANDLERS
// =============================================================================

/// The list editor matrix, optionally filtered.
pub async fn lists_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ListsQuery>,
) -> Result<Json<SpellListMatrix>, ApiError> {
    let filter = SpellFilter::parse(query.filter.as_deref().unwrap_or_default());
    Ok(Json(state.service.lists(caller, &filter).await?))
}

/// Replace one class's list.
pub async fn set_list_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(class): Path<String>,
    Json(request): Json<SetListRequest>,
) -> Result<Json<ListResponse>, ApiError> {
    let lists = state
        .service
        .set_spell_list(caller, &class, request.uuids)
        .await?;
    Ok(Json(ListResponse::from_assignment(&class, &lists)))
}

/// Add or remove one spell.
pub async fn toggle_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(class): Path<String>,
    Json(request): Json<ToggleRequest>,
) -> Result<Json<ListResponse>, ApiError> {
    let lists = state
        .service
        .toggle_spell(caller, &class, &request.uuid, request.member)
        .await?;
    Ok(Json(ListResponse::from_assignment(&class, &lists)))
}

// =============================================================================
// IMPORT / EXPORT HANDLERS
// =============================================================================

/// Import a spell list document. The body is the raw JSON document.
pub async fn import_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ImportQuery>,
    body: String,
) -> Result<Json<ImportResponse>, ApiError> {
    let mode = query.mode()?;
    let lists = state.service.import(caller, &body, mode).await?;
    Ok(Json(ImportResponse {
        mode,
        classes: lists.len(),
        lists,
    }))
}

/// Download the persisted assignment as `spell-list-backup-<millis>.json`.
pub async fn export_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state.service.export(caller).await?;
    let disposition = format!("attachment; filename=\"{}.json\"", document.name);
    Ok((
        [
            (header::CONTENT_TYPE, document.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.body,
    ))
}

// =============================================================================
// OVERRIDE HANDLERS
// =============================================================================

pub async fn overrides_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<OverrideRow>>, ApiError> {
    Ok(Json(state.service.overrides_table(caller).await?))
}

/// Edit one class's label and backdrop. Omitted fields stay as they are;
/// blank fields revert to the default.
pub async fn set_override_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(class): Path<String>,
    Json(edit): Json<OverrideEdit>,
) -> Result<Json<Overrides>, ApiError> {
    Ok(Json(state.service.set_override(caller, &class, edit).await?))
}

// =============================================================================
// SOURCE HANDLERS
// =============================================================================

pub async fn sources_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<SourcesResponse>, ApiError> {
    Ok(Json(SourcesResponse {
        sources: state.service.sources(caller).await?,
        available: state.service.available_sources(caller).await?,
    }))
}

/// Replace the source keys of one record family.
pub async fn set_sources_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(record_type): Path<String>,
    Json(request): Json<SetSourcesRequest>,
) -> Result<Json<Vec<String>>, ApiError> {
    let record_type: RecordType = record_type.parse()?;
    let stored = state
        .service
        .set_sources(caller, record_type, request.sources)
        .await?;
    Ok(Json(stored))
}
