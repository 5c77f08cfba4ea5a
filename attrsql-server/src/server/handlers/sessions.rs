use std::sync::Arc;

use attrsql::{
    export_table, generate_sql, GenerationReport, RequirementRow, RequirementTable,
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::server::session::Session;

/// Grid view of a table: column names plus one cell vector per row, aligned
/// with `columns`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl From<&RequirementTable> for TableView {
    fn from(table: &RequirementTable) -> Self {
        let columns = table.columns().to_vec();
        let rows = table
            .rows()
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| row.get(column).unwrap_or_default().to_string())
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub table: TableView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EditCellRequest {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RowOutcomeView {
    pub index: usize,
    pub attribute: String,
    pub status: String,
    pub sql: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub table: TableView,
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<RowOutcomeView>,
    pub download_url: String,
}

impl GenerateResponse {
    fn new(session_id: Uuid, table: &RequirementTable, report: &GenerationReport) -> Self {
        let outcomes = report
            .outcomes
            .iter()
            .map(|row| match &row.outcome {
                Ok(sql) => RowOutcomeView {
                    index: row.index,
                    attribute: row.attribute.clone(),
                    status: "ok".to_string(),
                    sql: Some(sql.clone()),
                    error: None,
                },
                Err(err) => RowOutcomeView {
                    index: row.index,
                    attribute: row.attribute.clone(),
                    status: "error".to_string(),
                    sql: None,
                    error: Some(err.to_string()),
                },
            })
            .collect();

        Self {
            table: TableView::from(table),
            succeeded: report.succeeded(),
            failed: report.failed(),
            outcomes,
            download_url: format!("/api/sessions/{}/export", session_id),
        }
    }
}

fn lookup(state: &AppState, id: &Uuid) -> Result<Arc<Session>, ApiError> {
    state
        .sessions
        .get(id)
        .ok_or_else(ApiError::session_not_found)
}

pub async fn create_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let (session_id, session) = state.sessions.create_session();
    let table = session.table.lock().await;
    Json(SessionResponse {
        session_id,
        table: TableView::from(&*table),
    })
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = lookup(&state, &id)?;
    let table = session.table.lock().await;
    Ok(Json(SessionResponse {
        session_id: id,
        table: TableView::from(&*table),
    }))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::session_not_found())
    }
}

/// Replace the session table with an uploaded CSV document.
pub async fn upload_csv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<TableView>, ApiError> {
    let session = lookup(&state, &id)?;
    let parsed = RequirementTable::from_csv_bytes(&body)?;
    tracing::info!(session_id = %id, rows = parsed.len(), "CSV uploaded");

    let mut table = session.table.lock().await;
    *table = parsed;
    Ok(Json(TableView::from(&*table)))
}

pub async fn add_row(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TableView>, ApiError> {
    let session = lookup(&state, &id)?;
    let mut table = session.table.lock().await;
    table.push_row(RequirementRow::default());
    Ok(Json(TableView::from(&*table)))
}

pub async fn edit_cell(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
    Json(payload): Json<EditCellRequest>,
) -> Result<Json<TableView>, ApiError> {
    let session = lookup(&state, &id)?;
    let mut table = session.table.lock().await;
    table.edit(index, &payload.field, payload.value)?;
    Ok(Json(TableView::from(&*table)))
}

pub async fn delete_row(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<TableView>, ApiError> {
    let session = lookup(&state, &id)?;
    let mut table = session.table.lock().await;
    table.remove_row(index)?;
    Ok(Json(TableView::from(&*table)))
}

/// Run generation over the session table. The table stays locked for the
/// whole run.
pub async fn generate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let session = lookup(&state, &id)?;
    let mut table = session.table.lock().await;

    tracing::info!(session_id = %id, rows = table.len(), "Generation triggered");
    let report = generate_sql(&mut table, &state.translator, state.options).await?;
    session.touch();

    Ok(Json(GenerateResponse::new(id, &table, &report)))
}

pub async fn export_csv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let session = lookup(&state, &id)?;
    let table = session.table.lock().await;
    let export = export_table(&table)?;

    Ok((
        [
            (header::CONTENT_TYPE, export.mime_type.clone()),
            (header::CONTENT_DISPOSITION, export.content_disposition()),
        ],
        export.content,
    )
        .into_response())
}

pub async fn download_template() -> Response {
    let export = attrsql::export_template();
    (
        [
            (header::CONTENT_TYPE, export.mime_type.clone()),
            (header::CONTENT_DISPOSITION, export.content_disposition()),
        ],
        export.content,
    )
        .into_response()
}
