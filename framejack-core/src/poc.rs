// Proof-of-concept harness generation and naming

use crate::error::Result;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

const MAX_STEM_LEN: usize = 150;

/// Build the embedding harness for `url`. Same input, same bytes.
pub fn render_poc(url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body>
<h3>Clickjacking PoC</h3>
<iframe src="{}" width="800" height="600" style="border:2px solid red;"></iframe>
</body>
</html>
"#,
        escape_attribute(url)
    )
}

/// Only the characters that could end or corrupt a double-quoted attribute.
fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

/// `<host>[_<port>]_<path or index>[_<query>]` with everything outside
/// `[A-Za-z0-9_-]` folded to `_`, capped at 150 characters.
pub fn poc_file_name(url: &str) -> String {
    let stem = match Url::parse(url) {
        Ok(parsed) => {
            let mut netloc = parsed.host_str().unwrap_or("unknown").to_string();
            if let Some(port) = parsed.port() {
                netloc.push_str(&format!("_{}", port));
            }

            let path = parsed.path().trim_matches('/');
            let path = if path.is_empty() { "index" } else { path };

            match parsed.query() {
                Some(query) if !query.is_empty() => format!("{}_{}_{}", netloc, path, query),
                _ => format!("{}_{}", netloc, path),
            }
        }
        Err(_) => url.to_string(),
    };

    let sanitized: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_STEM_LEN)
        .collect();

    format!("{}.html", sanitized)
}

/// Hands out file names that are unique within one scan directory.
#[derive(Debug, Default)]
pub struct PocNamer {
    taken: HashSet<String>,
}

impl PocNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name_for(&mut self, url: &str) -> String {
        let base = poc_file_name(url);
        let stem = base.trim_end_matches(".html").to_string();

        let mut candidate = base;
        let mut suffix = 1;
        while self.taken.contains(&candidate) {
            suffix += 1;
            candidate = format!("{}_{}.html", stem, suffix);
        }

        self.taken.insert(candidate.clone());
        candidate
    }
}

/// A harness written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PocArtifact {
    pub url: String,
    pub html: String,
    pub path: PathBuf,
    /// Path relative to the scan directory, e.g. `poc/example_test_index.html`
    pub relative_path: String,
}

pub fn write_poc(url: &str, file_name: &str, poc_dir: &Path) -> Result<PocArtifact> {
    let html = render_poc(url);
    let path = poc_dir.join(file_name);
    fs::write(&path, &html)?;

    Ok(PocArtifact {
        url: url.to_string(),
        html,
        path,
        relative_path: format!("poc/{}", file_name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_poc_embeds_url_in_iframe() {
        let html = render_poc("https://example.test/login");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"<iframe src="https://example.test/login""#));
        assert_eq!(html.matches("<iframe").count(), 1);
    }

    #[test]
    fn test_render_poc_is_idempotent() {
        let url = "https://example.test/a?b=c&d=e";
        assert_eq!(render_poc(url), render_poc(url));
    }

    #[test]
    fn test_render_poc_escapes_attribute_breakers() {
        let html = render_poc(r#"https://example.test/?a=1&b="x""#);
        assert!(html.contains(r#"src="https://example.test/?a=1&amp;b=&quot;x&quot;""#));
    }

    #[test]
    fn test_file_name_for_root() {
        assert_eq!(poc_file_name("https://example.test/"), "example_test_index.html");
        assert_eq!(poc_file_name("https://example.test"), "example_test_index.html");
    }

    #[test]
    fn test_file_name_for_path_and_port() {
        assert_eq!(
            poc_file_name("http://127.0.0.1:8080/account/settings/"),
            "127_0_0_1_8080_account_settings.html"
        );
    }

    #[test]
    fn test_file_name_keeps_query_apart() {
        assert_ne!(
            poc_file_name("https://example.test/item?id=1"),
            poc_file_name("https://example.test/item?id=2")
        );
    }

    #[test]
    fn test_file_name_is_capped() {
        let long = format!("https://example.test/{}", "a".repeat(400));
        let name = poc_file_name(&long);
        assert_eq!(name.len(), 150 + ".html".len());
    }

    #[test]
    fn test_file_name_replaces_unicode() {
        let name = poc_file_name("https://example.test/caf%C3%A9/ü");
        assert!(name.chars().all(|c| c.is_ascii()));
    }

    #[test]
    fn test_namer_suffixes_collisions() {
        let mut namer = PocNamer::new();
        assert_eq!(namer.name_for("https://example.test/a-b"), "example_test_a-b.html");
        assert_eq!(namer.name_for("https://example.test/a_b"), "example_test_a_b.html");
        assert_eq!(namer.name_for("https://example.test/a.b"), "example_test_a_b_2.html");
        assert_eq!(namer.name_for("https://example.test/a,b"), "example_test_a_b_3.html");
        assert_eq!(namer.name_for("https://example.test/a%20b"), "example_test_a_20b.html");
    }

    #[test]
    fn test_write_poc_persists_rendered_html() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = write_poc("https://example.test/", "example_test_index.html", dir.path()).unwrap();

        assert_eq!(artifact.relative_path, "poc/example_test_index.html");
        let on_disk = fs::read_to_string(&artifact.path).unwrap();
        assert_eq!(on_disk, render_poc("https://example.test/"));
    }
}
