use std::path::Path;

use chrono::{DateTime, Utc};

use crate::domain::Document;
use crate::error::{RagError, Result};

/// Reads every regular file directly under `dir` whose extension is in
/// `extensions` (case-insensitive). Results are sorted by path.
pub fn load_documents(dir: &Path, extensions: &[String]) -> Result<Vec<Document>> {
    if !dir.is_dir() {
        return Err(RagError::DocumentsDirMissing(dir.to_path_buf()));
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path.extension().is_some_and(|ext| {
            let ext = ext.to_string_lossy();
            extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
        });
        if matches {
            paths.push(path);
        }
    }
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let content = std::fs::read_to_string(&path).map_err(|source| RagError::DocumentUnreadable {
            path: path.clone(),
            source,
        })?;
        let modified = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        let mut document = Document::new(path, content);
        if let Some(modified) = modified {
            document = document.with_modified_at(modified);
        }
        documents.push(document);
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs::File;
    use std::io::Write;

    fn exts() -> Vec<String> {
        vec!["txt".to_string(), "md".to_string()]
    }

    #[test]
    fn test_loads_matching_files_sorted() -> Result<()> {
        let dir = tempfile::tempdir()?;
        for (name, body) in [("b.md", "# B"), ("a.txt", "A"), ("c.pdf", "nope"), ("D.MD", "upper")] {
            let mut file = File::create(dir.path().join(name))?;
            write!(file, "{body}")?;
        }
        std::fs::create_dir(dir.path().join("nested.md"))?;

        let docs = load_documents(dir.path(), &exts())?;
        let names: Vec<_> = docs.iter().map(Document::name).collect();
        assert_eq!(names, vec!["D.MD", "a.txt", "b.md"]);
        assert_eq!(docs[1].content, "A");
        assert!(docs[1].modified_at.is_some());
        Ok(())
    }

    #[test]
    fn test_missing_dir_is_input_error() {
        let err = load_documents(Path::new("/definitely/not/here"), &exts()).unwrap_err();
        assert!(matches!(err, RagError::DocumentsDirMissing(_)));
        assert!(err.is_input_error());
    }

    #[test]
    fn test_non_utf8_file_is_unreadable() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("bin.txt"), [0xff, 0xfe, 0x00])?;
        let err = load_documents(dir.path(), &exts()).unwrap_err();
        assert!(matches!(err, RagError::DocumentUnreadable { .. }));
        Ok(())
    }

    #[test]
    fn test_hash_tracks_content() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("a.md");
        std::fs::write(&path, "one")?;
        let first = load_documents(dir.path(), &exts())?[0].content_hash.clone();
        std::fs::write(&path, "two")?;
        let second = load_documents(dir.path(), &exts())?[0].content_hash.clone();
        assert_ne!(first, second);
        Ok(())
    }
}
