pub mod crawler;
pub mod error;
pub mod fetcher;
pub mod frontier;
pub mod result;
pub mod target;

pub use crawler::{Crawler, ProgressCallback};
pub use error::ScanError;
pub use fetcher::{FetchOutcome, Fetcher};
pub use frontier::Frontier;
pub use result::DiscoveredPage;
pub use target::Target;
