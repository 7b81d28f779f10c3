//! Importable collections and their document templates
//!
//! Text collections become Markdoc files with a YAML front-matter block;
//! the team collection becomes one JSON file per member.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use super::reader::Row;
use super::slug::slugify;
use crate::error::AppError;

/// Collections the importer can write to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Services,
    Projects,
    Blog,
    Team,
}

/// A rendered file ready to commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub filename: String,
    pub content: String,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Services,
        Collection::Projects,
        Collection::Blog,
        Collection::Team,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Services => "services",
            Collection::Projects => "projects",
            Collection::Blog => "blog",
            Collection::Team => "team",
        }
    }

    /// Repository directory holding the collection's entries
    pub fn base_path(self) -> String {
        format!("src/content/{}", self.name())
    }

    /// Column the slug is derived from
    pub fn title_field(self) -> &'static str {
        match self {
            Collection::Services | Collection::Blog => "title",
            Collection::Projects => "projectName",
            Collection::Team => "name",
        }
    }

    /// Render one CSV row into a document
    ///
    /// An explicit `slug` column wins over the derived one, but is
    /// normalised the same way, so the file always lands directly inside
    /// the collection directory. `today` fills empty `date` columns.
    ///
    /// # Errors
    /// Returns `AppError::Validation` when no slug can be derived
    pub fn render(self, row: &Row, today: NaiveDate) -> Result<Document, AppError> {
        let slug = slugify(row.non_empty("slug").unwrap_or(row.get(self.title_field())));
        if slug.is_empty() {
            return Err(AppError::Validation(format!(
                "{} is required",
                self.title_field()
            )));
        }

        let date = || {
            row.non_empty("date")
                .map(str::to_string)
                .unwrap_or_else(|| today.format("%Y-%m-%d").to_string())
        };

        let document = match self {
            Collection::Services => Document {
                filename: format!("{slug}.mdoc"),
                content: front_matter(
                    &[
                        ("title", yaml_scalar(row.get("title"))),
                        ("icon", yaml_scalar(row.get("icon"))),
                        ("shortDescription", yaml_scalar(row.get("shortDescription"))),
                    ],
                    row.get("content"),
                ),
            },
            Collection::Projects => Document {
                filename: format!("{slug}.mdoc"),
                content: front_matter(
                    &[
                        ("projectName", yaml_scalar(row.get("projectName"))),
                        ("client", yaml_scalar(row.get("client"))),
                        ("date", yaml_scalar(&date())),
                        ("category", yaml_scalar(row.get("category"))),
                        ("gallery", "[]".to_string()),
                    ],
                    row.get("description"),
                ),
            },
            Collection::Blog => Document {
                filename: format!("{slug}.mdoc"),
                content: front_matter(
                    &[
                        ("title", yaml_scalar(row.get("title"))),
                        ("date", yaml_scalar(&date())),
                        ("author", yaml_scalar(row.get("author"))),
                        ("category", yaml_scalar(row.get("category"))),
                        ("tags", yaml_list(row.get("tags").split('|'))),
                    ],
                    row.get("body"),
                ),
            },
            Collection::Team => Document {
                filename: format!("{slug}.json"),
                content: team_member_json(row)?,
            },
        };

        Ok(document)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Collection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|collection| collection.name() == s.trim())
            .ok_or_else(|| AppError::Validation(format!("Unknown collection: {}", s.trim())))
    }
}

/// Human label for a row in import results
pub fn row_label(row: &Row) -> String {
    ["title", "projectName", "name"]
        .into_iter()
        .find_map(|column| row.non_empty(column))
        .unwrap_or("(untitled)")
        .to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TeamMember<'a> {
    name: &'a str,
    role: &'a str,
    order: i64,
    social_linkedin: &'a str,
    social_twitter: &'a str,
    social_instagram: &'a str,
    social_email: &'a str,
}

fn team_member_json(row: &Row) -> Result<String, AppError> {
    let member = TeamMember {
        name: row.get("name"),
        role: row.get("role"),
        order: leading_integer(row.get("order")).unwrap_or(0),
        social_linkedin: row.get("socialLinkedin"),
        social_twitter: row.get("socialTwitter"),
        social_instagram: row.get("socialInstagram"),
        social_email: row.get("socialEmail"),
    };
    serde_json::to_string_pretty(&member).map_err(|e| AppError::Internal(e.into()))
}

/// Integer at the start of `text`, e.g. `3` for `"3rd"` or `"3.0"`
fn leading_integer(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let digits_from = usize::from(text.starts_with(['-', '+']));
    let end = text[digits_from..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(text.len(), |i| i + digits_from);
    text[..end].parse().ok()
}

fn front_matter(fields: &[(&str, String)], body: &str) -> String {
    let mut out = String::from("---\n");
    for (key, value) in fields {
        out.push_str(key);
        out.push(':');
        if !value.starts_with('\n') {
            out.push(' ');
        }
        out.push_str(value);
        out.push('\n');
    }
    out.push_str("---\n");
    out.push_str(body);
    out
}

/// Block list, or `[]` when there are no items
fn yaml_list<'a>(items: impl Iterator<Item = &'a str>) -> String {
    let items: Vec<String> = items
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| format!("  - {}", yaml_scalar(item)))
        .collect();

    if items.is_empty() {
        "[]".to_string()
    } else {
        format!("\n{}", items.join("\n"))
    }
}

/// Render a string as a YAML scalar that reads back as the same string
fn yaml_scalar(value: &str) -> String {
    if value.is_empty() {
        return "\"\"".to_string();
    }

    let value = value.replace("\r\n", "\n");
    // A block scalar takes its indentation from the first line
    if value.contains('\n') && !value.starts_with(char::is_whitespace) {
        let lines: Vec<String> = value.lines().map(|line| format!("  {line}")).collect();
        return format!("|-\n{}", lines.join("\n"));
    }

    if needs_quoting(&value) {
        let escaped = value
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\t', "\\t")
            .replace('\n', "\\n");
        return format!("\"{escaped}\"");
    }

    value
}

fn needs_quoting(value: &str) -> bool {
    const INDICATORS: &[char] = &[
        ':', '#', '[', ']', '{', '}', ',', '|', '>', '&', '*', '!', '?', '`', '@', '%', '\'',
        '"', '\\', '\t', '\n',
    ];

    let lowered = value.to_ascii_lowercase();
    value.contains(INDICATORS)
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace)
        || value.starts_with('-')
        || matches!(
            lowered.as_str(),
            "true" | "false" | "yes" | "no" | "on" | "off" | "null" | "~"
        )
        || resolves_to_number(&lowered)
}

/// Whether a plain scalar would read back as a number (`42`, `1_000`,
/// `0x10`, `0o17`, `.inf`, `-.nan`, ...)
fn resolves_to_number(lowered: &str) -> bool {
    let unsigned = lowered.trim_start_matches(['-', '+']);
    unsigned.starts_with('.')
        || ["0x", "0o", "0b"]
            .into_iter()
            .any(|prefix| unsigned.starts_with(prefix))
        || unsigned.replace('_', "").parse::<f64>().is_ok()
}
