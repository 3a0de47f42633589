//! Textual import expansion, performed on raw source before lexing.
//!
//! `import <name>` resolves against a fixed headers directory; `import
//! "path.lox"` resolves against the current working directory. Scanning
//! happens once over the original source text, matching the reference
//! implementation's single pass — text pulled in by one import is not
//! itself scanned for further imports.

use std::collections::HashSet;
use std::path::PathBuf;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

static HEADERS_DIR: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var_os("LOX_HEADERS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("headers"))
});

static IMPORT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^import\s+(<\w+>|"\w+\.lox")"#).expect("valid import regex"));

/// Expands every `import` directive found in `source`, returning the
/// rewritten text. Missing files are skipped silently; a resolved path seen
/// more than once is only inlined on its first occurrence.
pub fn expand(source: &str) -> String {
    let mut expanded = source.to_string();
    let mut seen = HashSet::new();

    for line in source.lines() {
        let Some(captures) = IMPORT_PATTERN.captures(line.trim()) else {
            continue;
        };
        let module = captures.get(1).unwrap().as_str();
        let path = resolve_path(module);

        if !seen.insert(path.clone()) {
            continue;
        }
        if !path.exists() {
            debug!("import '{module}' not found at {}; skipping", path.display());
            continue;
        }

        let Ok(mut text) = std::fs::read_to_string(&path) else {
            warn!("could not read import '{module}' at {}", path.display());
            continue;
        };
        if let Some(name) = module.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
            if !text.contains("init") && text.contains(&format!("class {name}")) {
                text.push_str(&format!("\nvar {name} = {name}();"));
            }
        }

        let directive = format!("import {module}");
        expanded = expanded.replacen(&directive, &text, 1);
    }

    expanded
}

fn resolve_path(module: &str) -> PathBuf {
    match module.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
        Some(name) => HEADERS_DIR.join(format!("{name}.lox")),
        None => PathBuf::from(module.trim_matches('"')),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Quoted imports resolve relative to the working directory, so these
    /// tests write their fixture alongside wherever `cargo test` runs from
    /// and clean it up afterward.
    struct TempFixture(PathBuf);

    impl TempFixture {
        fn new(name: &str, contents: &str) -> Self {
            std::fs::write(name, contents).unwrap();
            Self(PathBuf::from(name))
        }
    }

    impl Drop for TempFixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    #[test]
    fn quoted_import_inlines_file_contents() {
        let _fixture = TempFixture::new("quoted_import.lox", "var greeting = \"hi\";");
        let source = "import \"quoted_import.lox\";\nprint greeting;";
        let result = expand(source);
        assert!(result.contains("var greeting = \"hi\";"));
    }

    #[test]
    fn missing_import_is_skipped_silently() {
        let source = "import \"does_not_exist_anywhere.lox\";\nprint 1;";
        assert_eq!(expand(source), source);
    }

    #[test]
    fn duplicate_import_is_only_inlined_once() {
        let _fixture = TempFixture::new("dup_import.lox", "var x = 1;");
        let directive = "import \"dup_import.lox\";";
        let source = format!("{directive}\n{directive}\n");
        let result = expand(&source);
        assert_eq!(result.matches("var x = 1;").count(), 1);
    }
}
