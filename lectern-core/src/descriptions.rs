// lectern-core/src/descriptions.rs
// Description resolution for update candidates. Priority: the user's local
// override file, then the source's companion-manifest text, then whatever
// the leading comment lines of the patch content say.
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::warn;

const COMMENT_PREFIX: &str = "--";
const MAX_COMMENT_LINES: usize = 10;

/// Loads the user's description overrides. Absent or malformed files are an
/// empty map.
pub fn load_overrides(path: &Path) -> HashMap<String, String> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return HashMap::new(),
    };
    match serde_json::from_str::<HashMap<String, String>>(&raw) {
        Ok(map) => map,
        Err(e) => {
            warn!(
                "Ignoring malformed description overrides at {}: {}",
                path.display(),
                e
            );
            HashMap::new()
        }
    }
}

/// Extracts a description from the leading comment block of patch content.
pub fn from_content(content: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(content);
    let mut lines = Vec::new();
    for line in text.lines().take(MAX_COMMENT_LINES) {
        let trimmed = line.trim();
        let Some(comment) = trimmed.strip_prefix(COMMENT_PREFIX) else {
            break;
        };
        let comment = comment.trim_start_matches('-').trim();
        if !comment.is_empty() {
            lines.push(comment.to_string());
        }
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join(" "))
    }
}

pub fn resolve(
    name: &str,
    overrides: &HashMap<String, String>,
    manifest_notes: Option<&str>,
    content: Option<&[u8]>,
) -> Option<String> {
    if let Some(text) = overrides.get(name) {
        return Some(text.clone());
    }
    if let Some(notes) = manifest_notes {
        if !notes.trim().is_empty() {
            return Some(notes.trim().to_string());
        }
    }
    content.and_then(from_content)
}
