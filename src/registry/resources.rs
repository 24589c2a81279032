/*!
 * Resource Lookup
 * Resolves resource file names against an ordered list of search directories
 */

use std::path::{Path, PathBuf};

/// Normalise a search directory (`a/./b/../c` -> `a/c`)
pub(crate) fn normalize(dir: impl AsRef<Path>) -> PathBuf {
    PathBuf::from(path_clean::clean(dir.as_ref()))
}

/// First existing candidate: `name` itself, then `dir/name` for each dir in order
pub(crate) fn find(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }

    let direct = Path::new(name);
    if direct.exists() {
        return Some(direct.to_path_buf());
    }

    dirs.iter()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("a/./b/../c"), PathBuf::from("a/c"));
    }

    #[test]
    fn test_find_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join("model.json"), "{}").unwrap();

        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        assert_eq!(find("model.json", &dirs), Some(second.path().join("model.json")));

        std::fs::write(first.path().join("model.json"), "{}").unwrap();
        assert_eq!(find("model.json", &dirs), Some(first.path().join("model.json")));

        assert_eq!(find("missing.json", &dirs), None);
        assert_eq!(find("", &dirs), None);
    }
}
