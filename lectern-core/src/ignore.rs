// lectern-core/src/ignore.rs
// The ignore list: one artifact name per line, `#` comments and blank lines
// skipped, a trailing patch extension stripped. Names on it never surface as
// update candidates.
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use lectern_common::config::PATCH_EXTENSION;
use tracing::debug;

pub fn load_ignore_list(path: &Path) -> HashSet<String> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return HashSet::new(),
    };
    let names: HashSet<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            line.strip_suffix(&format!(".{PATCH_EXTENSION}"))
                .unwrap_or(line)
                .to_string()
        })
        .collect();
    if !names.is_empty() {
        debug!("Ignore list holds {} names", names.len());
    }
    names
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn parses_names_skipping_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("update_ignore.txt");
        fs::write(
            &path,
            "# local experiments\n\n2-fix-margins.lua\nnight-mode\n  spaced  \n",
        )
        .unwrap();

        let names = load_ignore_list(&path);
        assert_eq!(names.len(), 3);
        assert!(names.contains("2-fix-margins"));
        assert!(names.contains("night-mode"));
        assert!(names.contains("spaced"));
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_ignore_list(&dir.path().join("absent.txt")).is_empty());
    }
}
