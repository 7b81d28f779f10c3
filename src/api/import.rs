//! CSV import endpoint

use axum::{
    Router,
    extract::{Multipart, State},
    response::Json,
    routing::post,
};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;
use crate::auth::CurrentSession;
use crate::error::AppError;
use crate::import::{self, Collection, RowResult};

/// Largest accepted CSV upload
const MAX_CSV_BYTES: usize = 5 * 1024 * 1024;

/// Create import router
///
/// Routes:
/// - POST /import
/// - POST /api/import
pub fn import_router() -> Router<AppState> {
    Router::new()
        .route("/import", post(import_csv))
        .route("/api/import", post(import_csv))
}

/// Import response
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub results: Vec<RowResult>,
}

/// POST /import
///
/// Multipart form with `file` (CSV) and `collection`.
///
/// # Steps
/// 1. Check GitHub configuration
/// 2. Read the form
/// 3. Parse CSV
/// 4. Write one file per row, sequentially
async fn import_csv(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    mut multipart: Multipart,
) -> Result<Json<ImportResponse>, AppError> {
    state.config.github.token()?;
    state.config.github.repository()?;

    let mut csv_text: Option<String> = None;
    let mut collection: Option<String> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Could not read form data: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let mut bytes = Vec::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {}", e)))?
                {
                    if bytes.len() + chunk.len() > MAX_CSV_BYTES {
                        return Err(AppError::Validation(format!(
                            "File too large: exceeds {} bytes",
                            MAX_CSV_BYTES
                        )));
                    }
                    bytes.extend_from_slice(&chunk);
                }

                let text = String::from_utf8(bytes)
                    .map_err(|_| AppError::Validation("CSV file must be UTF-8".to_string()))?;
                csv_text = Some(text);
            }
            "collection" => {
                collection = Some(field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read collection: {}", e))
                })?);
            }
            _ => {}
        }
    }

    let (Some(csv_text), Some(collection)) = (csv_text, collection.filter(|c| !c.trim().is_empty()))
    else {
        return Err(AppError::Validation(
            "A file and a collection are required".to_string(),
        ));
    };
    let collection: Collection = collection.parse()?;

    let rows = import::parse_csv(&csv_text)?;
    if rows.is_empty() {
        return Err(AppError::Validation(
            "CSV file is empty or unreadable".to_string(),
        ));
    }

    tracing::info!(
        %collection,
        rows = rows.len(),
        email = %session.email,
        "Starting CSV import"
    );

    let results = import::import_rows(&state.github, collection, &rows, Utc::now().date_naive()).await;

    let failed = results.iter().filter(|r| !r.ok).count();
    tracing::info!(%collection, total = results.len(), failed, "CSV import finished");

    Ok(Json(ImportResponse { results }))
}
