//! Layer 0: file ingestion (§1). Boundary I/O, specified only by its
//! output contract — a validated UTF-8 source string with normalised line
//! endings, grounded on
//! `original_source/compiler/src/layer0/input_processor.cpp`.

use std::path::Path;

use crate::error::PipelineError;

/// Accepted source file extensions (§6).
pub const SOURCE_EXTENSIONS: &[&str] = &["cp", "cprime"];

pub fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SOURCE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Read `path` as UTF-8, normalising `\r\n` and bare `\r` to `\n`.
pub fn read_source(path: &Path) -> Result<String, PipelineError> {
    let bytes = std::fs::read(path).map_err(|e| PipelineError::Io {
        path: path.display().to_string(),
        source: e.to_string(),
    })?;
    let text = String::from_utf8(bytes).map_err(|e| PipelineError::InvalidUtf8 {
        path: path.display().to_string(),
        source: e.to_string(),
    })?;
    Ok(normalize_line_endings(&text))
}

fn normalize_line_endings(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            normalized.push('\n');
        } else {
            normalized.push(c);
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_crlf_and_bare_cr() {
        assert_eq!(normalize_line_endings("a\r\nb\rc\n"), "a\nb\nc\n");
    }

    #[test]
    fn recognizes_source_extensions() {
        assert!(has_source_extension(Path::new("main.cp")));
        assert!(has_source_extension(Path::new("main.cprime")));
        assert!(!has_source_extension(Path::new("main.txt")));
    }

    #[test]
    fn read_source_normalizes_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("main.cp");
        std::fs::write(&file, b"main;\r\n").unwrap();
        let source = read_source(&file).unwrap();
        assert_eq!(source, "main;\n");
    }

    #[test]
    fn read_source_reports_missing_file() {
        let err = read_source(Path::new("/no/such/file.cp")).unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }
}
