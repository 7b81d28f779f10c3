//! Bulk CSV import into the content repository
//!
//! Rows are rendered and committed one at a time; a failing row is
//! recorded and the rest of the batch carries on.

mod collection;
mod reader;
mod slug;

use chrono::NaiveDate;
use serde::Serialize;

pub use collection::{Collection, Document, row_label};
pub use reader::{Row, parse_csv};
pub use slug::slugify;

use crate::error::AppError;
use crate::github::GitHubClient;
use crate::metrics::IMPORT_ROWS_TOTAL;

/// Per-row outcome reported back to the uploader
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowResult {
    /// Row label (title-like field)
    pub row: String,
    pub ok: bool,
    /// "Created", "Updated" or a short failure message
    pub status: String,
}

/// Import every row into `collection`, sequentially
pub async fn import_rows(
    client: &GitHubClient,
    collection: Collection,
    rows: &[Row],
    today: NaiveDate,
) -> Vec<RowResult> {
    let mut results = Vec::with_capacity(rows.len());

    for row in rows {
        let label = row_label(row);
        let result = match import_row(client, collection, row, &label, today).await {
            Ok(status) => RowResult {
                row: label,
                ok: true,
                status: status.to_string(),
            },
            Err(error) => {
                tracing::warn!(%collection, row = %label, %error, "Row import failed");
                RowResult {
                    row: label,
                    ok: false,
                    status: failure_status(&error),
                }
            }
        };

        let outcome = if result.ok { "ok" } else { "failed" };
        IMPORT_ROWS_TOTAL
            .with_label_values(&[collection.name(), outcome])
            .inc();
        results.push(result);
    }

    results
}

async fn import_row(
    client: &GitHubClient,
    collection: Collection,
    row: &Row,
    label: &str,
    today: NaiveDate,
) -> Result<&'static str, AppError> {
    let document = collection.render(row, today)?;
    let path = entry_path(collection, &document.filename)?;
    let message = format!("Import content: {label}");

    let write = client.upsert_file(&path, &document.content, &message).await?;
    Ok(write.label())
}

/// Repository path of an entry, which must sit directly in the collection
/// directory
fn entry_path(collection: Collection, filename: &str) -> Result<String, AppError> {
    if filename.is_empty() || filename.starts_with('.') || filename.contains(['/', '\\']) {
        return Err(AppError::Validation(format!("Invalid file name: {filename}")));
    }
    Ok(format!("{}/{}", collection.base_path(), filename))
}

/// Short, user-facing message for a failed row
fn failure_status(error: &AppError) -> String {
    match error {
        AppError::Validation(message) | AppError::Upstream(message) => message.clone(),
        AppError::Config(_) => "Server is not configured".to_string(),
        _ => "GitHub request failed".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_paths_stay_in_the_collection() {
        assert_eq!(
            entry_path(Collection::Blog, "hello.mdoc").unwrap(),
            "src/content/blog/hello.mdoc"
        );
        for filename in ["", "../evil.mdoc", "a/b.mdoc", "..\\evil.mdoc", ".github"] {
            assert!(
                matches!(
                    entry_path(Collection::Blog, filename),
                    Err(AppError::Validation(_))
                ),
                "accepted {filename:?}"
            );
        }
    }

    #[test]
    fn failure_status_hides_internal_detail() {
        assert_eq!(
            failure_status(&AppError::Validation("title is required".to_string())),
            "title is required"
        );
        assert_eq!(
            failure_status(&AppError::Config("github.token is not set".to_string())),
            "Server is not configured"
        );
    }
}
