// Scan directory layout, results export and console summaries

use crate::error::Result;
use crate::scan::ScanResult;
use crate::verify::Verdict;
use chrono::{DateTime, Local};
use colored::Colorize;
use framejack_scanner::Target;
use std::fs;
use std::path::{Path, PathBuf};

pub const RESULTS_FILE: &str = "results.json";
pub const POC_DIR: &str = "poc";

/// Where one target's artifacts live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanDirectory {
    pub root: PathBuf,
    pub poc: PathBuf,
}

impl ScanDirectory {
    pub fn results_path(&self) -> PathBuf {
        self.root.join(RESULTS_FILE)
    }
}

/// `scan_<host>[_<port>]_<YYYY-MM-DD_HH-MM-SS>`
pub fn scan_dir_name(target: &Target, started: DateTime<Local>) -> String {
    format!(
        "scan_{}_{}",
        target.authority().replace(':', "_"),
        started.format("%Y-%m-%d_%H-%M-%S")
    )
}

/// Create a fresh directory for `target` under `base`, with its `poc/` child.
///
/// Two scans of the same host inside one second would share a name, so a
/// numeric suffix is added until the directory is new.
pub fn create_scan_dir(base: &Path, target: &Target, started: DateTime<Local>) -> Result<ScanDirectory> {
    fs::create_dir_all(base)?;

    let name = scan_dir_name(target, started);
    let mut root = base.join(&name);
    let mut attempt = 1;
    loop {
        match fs::create_dir(&root) {
            Ok(()) => break,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                attempt += 1;
                root = base.join(format!("{}_{}", name, attempt));
            }
            Err(e) => return Err(e.into()),
        }
    }

    let poc = root.join(POC_DIR);
    fs::create_dir_all(&poc)?;

    Ok(ScanDirectory { root, poc })
}

/// Write `results.json`, an array of verdicts in discovery order.
pub fn export_results(result: &ScanResult, dir: &ScanDirectory) -> Result<PathBuf> {
    let path = dir.results_path();
    let json = serde_json::to_string_pretty(&result.verdicts)?;
    fs::write(&path, json)?;
    Ok(path)
}

/// Coloured one-target summary for the console.
pub fn generate_scan_summary(target: &Target, result: &ScanResult, dir: &ScanDirectory) -> String {
    let mut report = String::new();
    report.push_str(&format!("{}\n", "━".repeat(60).bright_blue()));
    report.push_str(&format!("{} {}\n", "Target:".bold(), target));
    report.push_str(&format!("  Pages scanned: {}\n", result.len()));
    report.push_str(&format!(
        "  Vulnerable:    {}\n",
        result.count(Verdict::Vulnerable).to_string().red().bold()
    ));
    report.push_str(&format!(
        "  Safe:          {}\n",
        result.count(Verdict::Safe).to_string().green()
    ));

    let indeterminate = result.count(Verdict::Indeterminate);
    if indeterminate > 0 {
        report.push_str(&format!(
            "  Indeterminate: {}\n",
            indeterminate.to_string().yellow()
        ));
    }

    let vulnerable: Vec<_> = result.vulnerable().collect();
    if !vulnerable.is_empty() {
        report.push_str("\n  Frameable pages:\n");
        for verdict in vulnerable {
            report.push_str(&format!(
                "    {} {}  {}\n",
                "✗".red(),
                verdict.url,
                verdict.poc_file.bright_black()
            ));
        }
    }

    report.push_str(&format!("\n  Results: {}\n", dir.results_path().display()));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::ScanVerdict;
    use chrono::TimeZone;

    fn started() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap()
    }

    #[test]
    fn test_scan_dir_name() {
        let target = Target::parse("https://example.test/app").unwrap();
        assert_eq!(
            scan_dir_name(&target, started()),
            "scan_example.test_2025-03-14_09-26-53"
        );

        let target = Target::parse("http://127.0.0.1:8080").unwrap();
        assert_eq!(
            scan_dir_name(&target, started()),
            "scan_127.0.0.1_8080_2025-03-14_09-26-53"
        );
    }

    #[test]
    fn test_create_scan_dir_never_reuses_a_directory() {
        let base = tempfile::tempdir().unwrap();
        let target = Target::parse("example.test").unwrap();

        let first = create_scan_dir(base.path(), &target, started()).unwrap();
        let second = create_scan_dir(base.path(), &target, started()).unwrap();

        assert_ne!(first.root, second.root);
        assert!(first.poc.is_dir());
        assert!(second.poc.is_dir());
        assert_eq!(first.poc, first.root.join("poc"));
    }

    #[test]
    fn test_export_results_shape() {
        let base = tempfile::tempdir().unwrap();
        let target = Target::parse("example.test").unwrap();
        let dir = create_scan_dir(base.path(), &target, started()).unwrap();

        let result = ScanResult {
            verdicts: vec![
                ScanVerdict::new(
                    "https://example.test/".to_string(),
                    "poc/example_test_index.html".to_string(),
                    Verdict::Vulnerable,
                ),
                ScanVerdict::new(
                    "https://example.test/login".to_string(),
                    "poc/example_test_login.html".to_string(),
                    Verdict::Indeterminate,
                ),
            ],
        };

        let path = export_results(&result, &dir).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();

        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["url"], "https://example.test/");
        assert_eq!(rows[0]["vulnerable"], true);
        assert_eq!(rows[0]["poc_file"], "poc/example_test_index.html");
        assert_eq!(rows[1]["vulnerable"], false);
        assert_eq!(rows[1]["verdict"], "indeterminate");
    }

    #[test]
    fn test_summary_lists_frameable_pages() {
        colored::control::set_override(false);
        let base = tempfile::tempdir().unwrap();
        let target = Target::parse("example.test").unwrap();
        let dir = create_scan_dir(base.path(), &target, started()).unwrap();

        let result = ScanResult {
            verdicts: vec![
                ScanVerdict::new(
                    "https://example.test/".to_string(),
                    "poc/example_test_index.html".to_string(),
                    Verdict::Vulnerable,
                ),
                ScanVerdict::new(
                    "https://example.test/admin".to_string(),
                    "poc/example_test_admin.html".to_string(),
                    Verdict::Safe,
                ),
            ],
        };

        let summary = generate_scan_summary(&target, &result, &dir);
        assert!(summary.contains("Pages scanned: 2"));
        assert!(summary.contains("poc/example_test_index.html"));
        assert!(!summary.contains("/admin"));
        assert!(!summary.contains("Indeterminate"));
    }
}
