use chrono::Local;
use clap::ArgMatches;
use colored::Colorize;
use framejack_core::report::{ScanDirectory, create_scan_dir, export_results, generate_scan_summary};
use framejack_core::scan::DEFAULT_WORKERS;
use framejack_core::verify::{DEFAULT_DEADLINE_SECS, DEFAULT_SETTLE_MS};
use framejack_core::{
    CoreError, ScanEvent, ScanProgressCallback, ScanResult, Verdict, Verifier, VerifierConfig,
    scan_all,
};
use framejack_scanner::fetcher::DEFAULT_TIMEOUT_SECS;
use framejack_scanner::{Crawler, ProgressCallback, Target};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const EXIT_OK: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;

/// Everything one run needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub targets: Vec<Target>,
    pub max_pages: Option<usize>,
    pub max_depth: Option<usize>,
    pub skip_crawl: bool,
    pub workers: usize,
    pub timeout_secs: u64,
    pub verifier: VerifierConfig,
    pub output_dir: PathBuf,
    pub quiet: bool,
}

impl ScanOptions {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, String> {
        let url = matches.get_one::<String>("url").map(String::as_str);
        let file = matches.get_one::<PathBuf>("file");
        let targets = load_targets(url, file.map(PathBuf::as_path))?;

        let output_dir = matches
            .get_one::<String>("output-dir")
            .map(|dir| PathBuf::from(shellexpand::tilde(dir).as_ref()))
            .unwrap_or_else(|| PathBuf::from("results"));

        let settle_ms = matches
            .get_one::<u64>("settle-ms")
            .copied()
            .unwrap_or(DEFAULT_SETTLE_MS);

        Ok(Self {
            targets,
            max_pages: matches.get_one::<usize>("max-pages").copied(),
            max_depth: matches.get_one::<usize>("max-depth").copied(),
            skip_crawl: matches.get_flag("no-crawl"),
            workers: matches
                .get_one::<usize>("workers")
                .copied()
                .unwrap_or(DEFAULT_WORKERS)
                .max(1),
            timeout_secs: matches
                .get_one::<u64>("timeout")
                .copied()
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            verifier: VerifierConfig {
                settle: Duration::from_millis(settle_ms),
                deadline: Duration::from_millis(settle_ms) + Duration::from_secs(DEFAULT_DEADLINE_SECS),
                chrome_sandbox: !matches.get_flag("no-chrome-sandbox"),
                ..VerifierConfig::default()
            },
            output_dir,
            quiet: matches.get_flag("quiet"),
        })
    }
}

/// Parse one line of user input as a target, warning on garbage.
pub fn parse_target_line(line: &str) -> Option<Target> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match Target::parse(line) {
        Ok(target) => Some(target),
        Err(e) => {
            eprintln!("{} Skipping invalid target '{}': {}", "⚠".yellow(), line, e);
            None
        }
    }
}

/// Collect targets from `--url` then `--file`, dropping duplicates while
/// keeping first-seen order.
pub fn load_targets(url: Option<&str>, file: Option<&Path>) -> Result<Vec<Target>, String> {
    if url.is_none() && file.is_none() {
        return Err("Either --url or --file must be provided".to_string());
    }

    let mut candidates = Vec::new();
    if let Some(url) = url {
        candidates.extend(parse_target_line(url));
    }

    if let Some(path) = file {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read target file {}: {}", path.display(), e))?;
        candidates.extend(content.lines().filter_map(parse_target_line));
    }

    let mut seen = HashSet::new();
    let targets: Vec<Target> = candidates
        .into_iter()
        .filter(|t| seen.insert(t.as_str().to_string()))
        .collect();

    if targets.is_empty() {
        return Err("No valid targets found".to_string());
    }

    Ok(targets)
}

/// Crawl (unless disabled) and list the URLs to verify for `target`.
pub async fn discover_urls(target: &Target, options: &ScanOptions) -> Vec<String> {
    if options.skip_crawl {
        return vec![target.as_str().to_string()];
    }

    if !options.quiet {
        println!("{} {}\n", "[CRAWLING STARTED]".blue().bold(), target);
    }

    let quiet = options.quiet;
    let progress_callback: ProgressCallback = Arc::new(move |_depth: usize, url: String| {
        if !quiet {
            println!("{} {}", "[CRAWL]".blue(), url);
        }
    });

    let crawler = Crawler::with_timeout(options.timeout_secs)
        .with_max_pages(options.max_pages)
        .with_max_depth(options.max_depth)
        .with_progress_callback(progress_callback);

    let urls = match crawler.crawl(target).await {
        Ok(pages) => pages.into_iter().map(|p| p.url).collect(),
        Err(e) => {
            eprintln!("{} Crawl of {} failed: {}", "✗".red(), target, e);
            vec![target.as_str().to_string()]
        }
    };

    if !options.quiet {
        println!(
            "\n{} Pages discovered: {}\n",
            "[CRAWL COMPLETE]".green(),
            urls.len()
        );
    }

    urls
}

fn scan_progress(total: usize, quiet: bool) -> (ProgressBar, ScanProgressCallback) {
    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(total as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.yellow} [{bar:30.yellow/white}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    let pb_clone = pb.clone();
    let callback: ScanProgressCallback = Arc::new(move |event: ScanEvent| match event {
        ScanEvent::Started { total } => {
            pb_clone.println(format!(
                "{} Total pages: {}\n",
                "[SCANNING STARTED]".yellow().bold(),
                total
            ));
        }
        ScanEvent::Checking { url, .. } => {
            pb_clone.set_message(url);
        }
        ScanEvent::Finished {
            index,
            total,
            url,
            verdict,
        } => {
            let label = match verdict {
                Verdict::Vulnerable => format!("[{}]", verdict.label()).red().bold(),
                Verdict::Safe => format!("[{}]", verdict.label()).normal(),
                Verdict::Indeterminate => format!("[{}]", verdict.label()).yellow(),
            };
            pb_clone.println(format!(
                "{} {}\n  {}\n",
                format!("[SCAN {}/{}]", index, total).yellow(),
                url,
                label
            ));
            pb_clone.inc(1);
        }
    });

    (pb, callback)
}

/// Run the whole pipeline for one target into a fresh scan directory.
pub async fn run_target(
    target: &Target,
    options: &ScanOptions,
    verifier: &Verifier,
) -> Result<(ScanDirectory, ScanResult), CoreError> {
    let dir = create_scan_dir(&options.output_dir, target, Local::now())?;
    let urls = discover_urls(target, options).await;

    let (pb, callback) = scan_progress(urls.len(), options.quiet);
    let result = scan_all(&urls, &dir.poc, verifier, options.workers, Some(callback)).await;
    pb.finish_and_clear();

    let result = result?;
    export_results(&result, &dir)?;
    Ok((dir, result))
}

/// Entry point for a parsed command line. Returns the process exit code.
pub async fn handle_scan(matches: &ArgMatches) -> u8 {
    let options = match ScanOptions::from_matches(matches) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            return EXIT_FAILURE;
        }
    };

    let verifier = Verifier::chrome(options.verifier.clone());
    let mut failed = 0;

    for target in &options.targets {
        match run_target(target, &options, &verifier).await {
            Ok((dir, result)) => {
                if !options.quiet {
                    println!(
                        "{} Results saved in {}\n",
                        "[DONE]".green().bold(),
                        dir.root.display()
                    );
                }
                print!("{}", generate_scan_summary(target, &result, &dir));
                println!();
            }
            Err(e) => {
                eprintln!("{} Scan of {} failed: {}", "✗".red().bold(), target, e);
                failed += 1;
            }
        }
    }

    if failed > 0 { EXIT_FAILURE } else { EXIT_OK }
}
