use serde::{Deserialize, Serialize};

/// A same-origin page the crawler dequeued, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredPage {
    pub url: String,
    pub depth: usize,
    /// `None` when the page sat at the depth cutoff and was never fetched
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub links_found: usize,
    pub expanded: bool,
    pub error: Option<String>,
}

impl DiscoveredPage {
    pub fn new(url: String, depth: usize) -> Self {
        Self {
            url,
            depth,
            status_code: None,
            content_type: None,
            links_found: 0,
            expanded: false,
            error: None,
        }
    }
}
