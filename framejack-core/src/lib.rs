pub mod error;
pub mod poc;
pub mod report;
pub mod scan;
pub mod verify;

use colored::Colorize;

pub use error::{CoreError, VerifyError};
pub use scan::{ScanEvent, ScanProgressCallback, ScanResult, ScanVerdict, scan_all};
pub use verify::{Verdict, Verifier, VerifierConfig};

const BANNER: &str = r#"
   __                          _            _
  / _|_ __ __ _ _ __ ___   ___(_) __ _  ___| | __
 | |_| '__/ _` | '_ ` _ \ / _ \ |/ _` |/ __| |/ /
 |  _| | | (_| | | | | | |  __/ | (_| | (__|   <
 |_| |_|  \__,_|_| |_| |_|\___/ |\__,_|\___|_|\_\
                             |__/
"#;

pub fn print_banner() {
    println!("{}", BANNER.red());
    println!(
        "  {} {}\n",
        "clickjacking scanner".bright_white().bold(),
        env!("CARGO_PKG_VERSION").bright_black()
    );
}
