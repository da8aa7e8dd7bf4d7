use crate::CLAP_STYLING;
use clap::arg;

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("framejack")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("framejack")
        .about("Crawl a site and check every page it finds for clickjacking")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and per-page narration").required(false))
        .arg(arg!(-v --"verbose" "Enable debug logging").required(false))
        .arg(
            arg!(-u --"url" <URL>)
                .required(false)
                .help("Target URL (https:// is assumed when no scheme is given)"),
        )
        .arg(
            arg!(-f --"file" <PATH>)
                .required(false)
                .help("Path to a newline-delimited file of target URLs")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .group(
            clap::ArgGroup::new("targets")
                .args(["url", "file"])
                .required(true)
                .multiple(true),
        )
        .arg(
            arg!(--"max-pages" <N>)
                .required(false)
                .help("Stop crawling once this many pages have been visited")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            arg!(--"max-depth" <N>)
                .required(false)
                .help("Do not follow links found on pages at this depth")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            arg!(--"no-crawl")
                .required(false)
                .help("Only check the target URL itself")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(-w --"workers" <NUM_WORKERS>)
                .required(false)
                .help("How many browser sandboxes may run at once")
                .value_parser(clap::value_parser!(usize))
                .default_value("4"),
        )
        .arg(
            arg!(--"timeout" <SECONDS>)
                .required(false)
                .help("Crawl request timeout in seconds")
                .value_parser(clap::value_parser!(u64).range(1..))
                .default_value("10"),
        )
        .arg(
            arg!(--"settle-ms" <MILLISECONDS>)
                .required(false)
                .help("How long to let the frame settle before inspecting it")
                .value_parser(clap::value_parser!(u64))
                .default_value("2000"),
        )
        .arg(
            arg!(--"no-chrome-sandbox")
                .required(false)
                .help("Launch Chrome without its OS sandbox (needed when running as root in containers)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(-o --"output-dir" <PATH>)
                .required(false)
                .help("Directory that receives one scan_* folder per target")
                .default_value("results"),
        )
}
