use crate::error::Result;
use crate::target::Target;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// What a single GET told us about a page.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub status_code: u16,
    pub content_type: Option<String>,
    pub is_html: bool,
    /// Same-origin, fragment-free links in document order, deduplicated
    pub links: Vec<String>,
}

pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }

    /// Issue one GET and extract links that stay on `target`'s origin.
    ///
    /// Links resolve against the URL that was requested, not the one a
    /// redirect ended on.
    pub async fn fetch(&self, url: &str, target: &Target) -> Result<FetchOutcome> {
        debug!("Fetching {}", url);

        let response = self.client.get(url).send().await?;

        let status_code = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let is_html = content_type
            .as_deref()
            .map(is_html_content_type)
            .unwrap_or(false);

        let mut outcome = FetchOutcome {
            status_code,
            content_type,
            is_html,
            links: Vec::new(),
        };

        if is_html {
            let body = response.text().await?;
            outcome.links = extract_links(&body, url, target);
        }

        Ok(outcome)
    }
}

pub fn is_html_content_type(content_type: &str) -> bool {
    content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("text/html")
}

/// Collect every `a[href]` in `html`, resolved against `page_url`, keeping
/// only links on the target's origin.
pub fn extract_links(html: &str, page_url: &str, target: &Target) -> Vec<String> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(resolved) = resolve_href(&base, href) else {
            continue;
        };

        if !target.is_same_origin(&resolved) {
            debug!("  -> Off-origin, skipping {}", resolved);
            continue;
        }

        let link = resolved.to_string();
        if seen.insert(link.clone()) {
            links.push(link);
        }
    }

    links
}

fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    let lowered = href.to_ascii_lowercase();
    if href.is_empty()
        || href.starts_with('#')
        || lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
    {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    resolved.set_fragment(None);
    Some(resolved)
}
