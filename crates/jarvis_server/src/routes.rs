//! Note routes.
//!
//! # Responsibility
//! - Decode requests, run the note service on the blocking pool and encode
//!   the result as JSON.
//!
//! # Invariants
//! - Malformed bodies, query strings and paths answer with the same
//!   `{"error": ...}` shape as service errors.

use crate::error::ApiError;
use crate::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use jarvis_core::{
    NoteDraft, NoteFilterParams, NoteId, NotePatch, NoteService, RepoResult, SqliteNoteRepository,
};
use serde::Deserialize;
use serde_json::json;

/// Registers every route plus extractor error handlers.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req: &HttpRequest| ApiError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req: &HttpRequest| ApiError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req: &HttpRequest| ApiError::NotFound(err.to_string()).into()),
    )
    .route("/", web::get().to(index))
    .route("/ping", web::get().to(ping))
    .service(
        web::resource("/notes")
            .route(web::post().to(create_note))
            .route(web::get().to(list_notes))
            .route(web::delete().to(delete_all_notes)),
    )
    .route("/notes/filter", web::get().to(filter_notes))
    .route("/notes/{id}", web::put().to(update_note))
    .service(
        web::resource("/notes/{type}/{id}")
            .route(web::get().to(get_note))
            .route(web::delete().to(delete_note)),
    );
}

#[derive(Debug, Deserialize)]
struct FilterQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(flatten)]
    params: NoteFilterParams,
}

#[derive(Debug, Deserialize)]
struct DeleteAllQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
}

async fn run<T, F>(state: web::Data<AppState>, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut NoteService<SqliteNoteRepository<'_>>) -> RepoResult<T> + Send + 'static,
{
    Ok(web::block(move || state.with_service(op)).await??)
}

async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "Jarvis notes server is running",
        "version": jarvis_core::core_version(),
    }))
}

async fn ping() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": jarvis_core::ping() }))
}

async fn create_note(
    state: web::Data<AppState>,
    body: web::Json<NoteDraft>,
) -> Result<HttpResponse, ApiError> {
    let draft = body.into_inner();
    let note = run(state, move |service| service.create_note(&draft)).await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Note created successfully",
        "id": note.id,
    })))
}

async fn get_note(
    state: web::Data<AppState>,
    path: web::Path<(String, NoteId)>,
) -> Result<HttpResponse, ApiError> {
    let (kind, id) = path.into_inner();
    let note = run(state, move |service| service.get_note(&kind, id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Note not found".to_string()))?;
    Ok(HttpResponse::Ok().json(note))
}

async fn list_notes(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let notes = run(state, |service| service.list_all()).await?;
    Ok(HttpResponse::Ok().json(notes))
}

async fn filter_notes(
    state: web::Data<AppState>,
    query: web::Query<FilterQuery>,
) -> Result<HttpResponse, ApiError> {
    let FilterQuery { kind, params } = query.into_inner();
    let kind = kind
        .filter(|kind| !kind.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Note type is required".to_string()))?;
    let notes = run(state, move |service| service.filter_notes(&kind, &params)).await?;
    Ok(HttpResponse::Ok().json(notes))
}

async fn update_note(
    state: web::Data<AppState>,
    path: web::Path<NoteId>,
    body: web::Json<NotePatch>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let patch = body.into_inner();
    let note = run(state, move |service| service.update_note(id, &patch)).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Note updated successfully",
        "note": note,
    })))
}

async fn delete_note(
    state: web::Data<AppState>,
    path: web::Path<(String, NoteId)>,
) -> Result<HttpResponse, ApiError> {
    let (kind, id) = path.into_inner();
    run(state, move |service| service.delete_note(&kind, id)).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Note deleted successfully" })))
}

async fn delete_all_notes(
    state: web::Data<AppState>,
    query: web::Query<DeleteAllQuery>,
) -> Result<HttpResponse, ApiError> {
    let kind = query.into_inner().kind;
    run(state, move |service| service.delete_all(kind.as_deref())).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Notes deleted successfully" })))
}
