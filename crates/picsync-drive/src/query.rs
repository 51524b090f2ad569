//! Drive query language rendering
//!
//! Turns a container id plus a provider-neutral [`ListQuery`] into the `q`
//! parameter of `GET /files`, e.g.
//!
//! ```text
//! 'root' in parents and (mimeType = 'image/jpeg' or mimeType = 'image/png')
//!     and trashed = false and modifiedTime >= '2026-10-01T00:00:00Z'
//! ```
//!
//! String literals are single-quoted; `\` and `'` inside them are escaped
//! with a backslash.

use chrono::SecondsFormat;
use picsync_core::domain::{ListQuery, RemoteId};

/// Escapes a value for use inside a single-quoted query literal
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Renders the `q` parameter listing direct children of `container`
pub fn render(container: &RemoteId, query: &ListQuery) -> String {
    let mut clauses = vec![format!(
        "'{}' in parents",
        escape_literal(container.as_str())
    )];

    match query.mime_types.as_slice() {
        [] => {}
        [single] => clauses.push(format!("mimeType = '{}'", escape_literal(single))),
        many => {
            let alternatives: Vec<String> = many
                .iter()
                .map(|m| format!("mimeType = '{}'", escape_literal(m)))
                .collect();
            clauses.push(format!("({})", alternatives.join(" or ")));
        }
    }

    if !query.include_trashed {
        clauses.push("trashed = false".to_string());
    }

    if let Some(since) = query.modified_since {
        clauses.push(format!(
            "modifiedTime >= '{}'",
            since.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
    }

    if let Some(name) = &query.name {
        clauses.push(format!("name = '{}'", escape_literal(name)));
    }

    clauses.join(" and ")
}
