//! Storage filename generation.
//!
//! Uploaded files never keep their client-supplied name on disk or in the
//! bucket. Each gets `{unix_millis}-{random6}-{sanitized_base}{ext}`, all
//! lowercase, which is collision-resistant across concurrent batches and safe
//! to embed in object keys and URLs.

use chrono::Utc;
use rand::distr::Alphanumeric;
use rand::Rng;
use std::path::Path;

const MAX_BASE_LEN: usize = 80;
const RANDOM_SUFFIX_LEN: usize = 6;

/// Extensions kept as-is; anything else falls back to `.jpg`.
const KNOWN_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "heic", "heif"];

/// Reduce a client-supplied file stem to lowercase ASCII alphanumerics,
/// `-` and `_`. Runs of other characters collapse to a single `_`.
pub fn sanitize_base(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len().min(MAX_BASE_LEN));
    let mut last_was_filler = true;

    for c in stem.chars() {
        if out.len() >= MAX_BASE_LEN {
            break;
        }
        if c.is_ascii_alphanumeric() || c == '-' {
            out.extend(c.to_lowercase());
            last_was_filler = false;
        } else if !last_was_filler {
            out.push('_');
            last_was_filler = true;
        }
    }

    let out = out.trim_matches(|c| c == '_' || c == '-').to_string();
    if out.is_empty() {
        "image".to_string()
    } else {
        out
    }
}

/// Normalized lowercase extension with leading dot, `.jpg` when the original
/// name has none or an unrecognized one.
fn normalized_extension(original: &str) -> String {
    Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .filter(|e| KNOWN_EXTENSIONS.contains(&e.as_str()))
        .map(|e| format!(".{}", e))
        .unwrap_or_else(|| ".jpg".to_string())
}

/// Build the storage filename for an upload.
pub fn build_upload_filename(original_filename: &str) -> String {
    let stem = Path::new(original_filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");

    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(RANDOM_SUFFIX_LEN)
        .map(char::from)
        .collect();

    format!(
        "{}-{}-{}{}",
        Utc::now().timestamp_millis(),
        suffix.to_lowercase(),
        sanitize_base(stem),
        normalized_extension(original_filename)
    )
}
