//! Repository contents API: create-or-update a single file

use base64::{Engine as _, engine::general_purpose};
use http::Method;
use serde::{Deserialize, Serialize};

use super::GitHubClient;
use crate::error::AppError;

/// How a file write landed in the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileWrite {
    Created,
    Updated,
}

impl FileWrite {
    pub fn label(self) -> &'static str {
        match self {
            FileWrite::Created => "Created",
            FileWrite::Updated => "Updated",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    sha: String,
}

#[derive(Debug, Serialize)]
struct PutContentRequest<'a> {
    message: &'a str,
    /// Base64 of the file bytes
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct GitHubErrorBody {
    message: Option<String>,
}

impl GitHubClient {
    fn contents_path(&self, path: &str) -> Result<String, AppError> {
        let (owner, repo) = self.config().repository()?;
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.iter().any(|segment| matches!(*segment, "." | "..")) {
            return Err(AppError::Validation(format!("Invalid repository path: {path}")));
        }
        let encoded: Vec<String> = segments
            .into_iter()
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();

        Ok(format!(
            "repos/{}/{}/contents/{}",
            urlencoding::encode(owner),
            urlencoding::encode(repo),
            encoded.join("/")
        ))
    }

    /// Look up the blob SHA of an existing file
    ///
    /// Any non-success status counts as "no such file"; only transport
    /// failures are errors.
    pub async fn get_file_sha(&self, path: &str) -> Result<Option<String>, AppError> {
        let api_path = self.contents_path(path)?;
        let query = self
            .config()
            .branch
            .as_deref()
            .map(|branch| format!("ref={}", urlencoding::encode(branch)));
        let url = self.resolve(&api_path, query.as_deref())?;

        let response = self.request(Method::GET, url)?.send().await?;
        if !response.status().is_success() {
            tracing::debug!(path, status = %response.status(), "No existing file");
            return Ok(None);
        }

        let entry: ContentEntry = response.json().await?;
        Ok(Some(entry.sha))
    }

    /// Create or replace a file at `path`
    ///
    /// `sha` must be the current blob SHA when the file exists, or `None`
    /// to create it. A non-success response becomes `AppError::Upstream`
    /// carrying GitHub's message.
    pub async fn put_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
        sha: Option<&str>,
    ) -> Result<(), AppError> {
        let url = self.resolve(&self.contents_path(path)?, None)?;
        let body = PutContentRequest {
            message,
            content: general_purpose::STANDARD.encode(content.as_bytes()),
            sha,
            branch: self.config().branch.as_deref(),
        };

        let response = self.request(Method::PUT, url)?.json(&body).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response
            .json::<GitHubErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        tracing::warn!(path, %status, %message, "GitHub rejected file write");
        Err(AppError::Upstream(message))
    }

    /// Write a file, updating it in place when it already exists
    ///
    /// # Steps
    /// 1. GET the file to discover its SHA
    /// 2. PUT the new content, with the SHA when one was found
    pub async fn upsert_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<FileWrite, AppError> {
        let sha = self.get_file_sha(path).await?;
        self.put_file(path, content, message, sha.as_deref()).await?;

        let outcome = if sha.is_some() {
            FileWrite::Updated
        } else {
            FileWrite::Created
        };
        tracing::info!(path, outcome = outcome.label(), "File written");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::valid_config;

    #[test]
    fn contents_path_encodes_segments() {
        let client = GitHubClient::new(valid_config().github).unwrap();
        assert_eq!(
            client.contents_path("src/content/blog/my post.mdoc").unwrap(),
            "repos/acme/site/contents/src/content/blog/my%20post.mdoc"
        );
    }

    #[test]
    fn contents_path_rejects_dot_segments() {
        let client = GitHubClient::new(valid_config().github).unwrap();
        for path in [
            "src/content/blog/../../../../other/repo/contents/x.mdoc",
            "src/content/./blog/x.mdoc",
            "../x",
        ] {
            assert!(
                matches!(client.contents_path(path), Err(AppError::Validation(_))),
                "accepted {path:?}"
            );
        }
    }

    #[test]
    fn put_body_omits_sha_for_new_files() {
        let body = PutContentRequest {
            message: "Import content: A",
            content: general_purpose::STANDARD.encode("hello"),
            sha: None,
            branch: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["content"], "aGVsbG8=");
        assert!(json.get("sha").is_none());
        assert!(json.get("branch").is_none());

        let body = PutContentRequest {
            sha: Some("abc123"),
            ..body
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["sha"], "abc123");
    }
}
