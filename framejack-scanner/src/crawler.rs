use crate::error::Result;
use crate::fetcher::{DEFAULT_TIMEOUT_SECS, Fetcher};
use crate::frontier::Frontier;
use crate::result::DiscoveredPage;
use crate::target::Target;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Called once per dequeued page with its depth and URL.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// Breadth-first, origin-scoped crawler.
///
/// The traversal is sequential: each page's links have to land in the
/// visited set before the next entry is judged, and FIFO order keeps the
/// discovered sequence reproducible.
pub struct Crawler {
    max_depth: Option<usize>,
    max_pages: Option<usize>,
    timeout_secs: u64,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(timeout_secs: u64) -> Self {
        Self {
            max_depth: None,
            max_pages: None,
            timeout_secs,
            progress_callback: None,
        }
    }

    /// Pages at `depth` are still recorded, only their links are not followed.
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_pages(mut self, pages: Option<usize>) -> Self {
        self.max_pages = pages;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub async fn crawl(&self, target: &Target) -> Result<Vec<DiscoveredPage>> {
        info!(
            "Starting crawl of {} (max pages: {:?}, max depth: {:?})",
            target, self.max_pages, self.max_depth
        );

        let fetcher = Fetcher::new(self.timeout_secs)?;
        let mut frontier = Frontier::new(target.as_str());
        let mut discovered = Vec::new();

        while let Some((url, depth)) = frontier.next_unvisited() {
            if let Some(max_pages) = self.max_pages
                && frontier.visited_count() >= max_pages
            {
                debug!("Page budget of {} reached, stopping", max_pages);
                break;
            }

            frontier.mark_visited(&url);

            if let Some(ref callback) = self.progress_callback {
                callback(depth, url.clone());
            }

            let mut page = DiscoveredPage::new(url, depth);

            if let Some(max_depth) = self.max_depth
                && depth >= max_depth
            {
                debug!("Depth {} reached for {}, not expanding", depth, page.url);
                discovered.push(page);
                continue;
            }

            page.expanded = true;
            match fetcher.fetch(&page.url, target).await {
                Ok(outcome) => {
                    page.status_code = Some(outcome.status_code);
                    page.content_type = outcome.content_type;
                    page.links_found = outcome.links.len();

                    let mut queued = 0;
                    for link in outcome.links {
                        if frontier.push(link, depth + 1) {
                            queued += 1;
                        }
                    }
                    debug!("{}: {} links, {} queued", page.url, page.links_found, queued);
                }
                Err(e) => {
                    warn!("Crawl error for {} ({}): {}", page.url, e.kind(), e);
                    page.error = Some(e.to_string());
                }
            }

            discovered.push(page);
        }

        info!(
            "Crawl complete. Discovered {} pages, {} left in queue",
            discovered.len(),
            frontier.pending()
        );
        Ok(discovered)
    }
}

impl Default for Crawler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use url::Url;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    async fn mount_html(server: &MockServer, route: &str, links: &[&str]) {
        let body: String = links
            .iter()
            .map(|l| format!(r#"<a href="{}">{}</a>"#, l, l))
            .collect();

        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(format!("<html><body>{}</body></html>", body), "text/html; charset=utf-8"),
            )
            .mount(server)
            .await;
    }

    /// `/ -> /a, /b` and `/a -> /c`
    async fn small_graph() -> MockServer {
        let server = MockServer::start().await;
        mount_html(&server, "/", &["/a", "/b"]).await;
        mount_html(&server, "/a", &["/c"]).await;
        mount_html(&server, "/b", &[]).await;
        mount_html(&server, "/c", &[]).await;
        server
    }

    fn paths(pages: &[DiscoveredPage]) -> Vec<String> {
        pages
            .iter()
            .map(|p| Url::parse(&p.url).unwrap().path().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_full_crawl_is_bfs_order() {
        let server = small_graph().await;
        let target = Target::parse(&server.uri()).unwrap();

        let pages = Crawler::new().crawl(&target).await.unwrap();

        assert_eq!(paths(&pages), vec!["/", "/a", "/b", "/c"]);
        let depths: Vec<_> = pages.iter().map(|p| p.depth).collect();
        assert_eq!(depths, vec![0, 1, 1, 2]);
    }

    #[tokio::test]
    async fn test_max_depth_stops_expansion_not_inclusion() {
        let server = small_graph().await;
        let target = Target::parse(&server.uri()).unwrap();

        let pages = Crawler::new()
            .with_max_depth(Some(1))
            .crawl(&target)
            .await
            .unwrap();

        assert_eq!(paths(&pages), vec!["/", "/a", "/b"]);
        assert!(pages[0].expanded);
        assert!(!pages[1].expanded);
        assert_eq!(pages[1].status_code, None);
    }

    #[tokio::test]
    async fn test_max_depth_zero_keeps_only_target() {
        let server = small_graph().await;
        let target = Target::parse(&server.uri()).unwrap();

        let pages = Crawler::new()
            .with_max_depth(Some(0))
            .crawl(&target)
            .await
            .unwrap();

        assert_eq!(paths(&pages), vec!["/"]);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_max_pages_halts_traversal() {
        let server = small_graph().await;
        let target = Target::parse(&server.uri()).unwrap();

        let pages = Crawler::new()
            .with_max_pages(Some(2))
            .crawl(&target)
            .await
            .unwrap();

        assert_eq!(paths(&pages), vec!["/", "/a"]);

        let requested: Vec<String> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| r.url.path().to_string())
            .collect();
        assert!(!requested.contains(&"/b".to_string()));
    }

    #[tokio::test]
    async fn test_cycles_and_duplicates_are_visited_once() {
        let server = MockServer::start().await;
        mount_html(&server, "/", &["/a", "/a#frag", "/b", "/"]).await;
        mount_html(&server, "/a", &["/", "/b", "/a"]).await;
        mount_html(&server, "/b", &["/a", "/#top"]).await;
        let target = Target::parse(&server.uri()).unwrap();

        let pages = Crawler::new().crawl(&target).await.unwrap();

        assert_eq!(paths(&pages), vec!["/", "/a", "/b"]);
    }

    #[tokio::test]
    async fn test_off_origin_links_are_never_discovered() {
        let server = MockServer::start().await;
        let other = MockServer::start().await;
        mount_html(&other, "/", &[]).await;

        let off_origin = format!("{}/elsewhere", other.uri());
        mount_html(&server, "/", &["/in", off_origin.as_str(), "https://example.test/"]).await;
        mount_html(&server, "/in", &[]).await;
        let target = Target::parse(&server.uri()).unwrap();

        let pages = Crawler::new().crawl(&target).await.unwrap();

        assert_eq!(pages.len(), 2);
        for page in &pages {
            assert!(target.is_same_origin(&Url::parse(&page.url).unwrap()));
        }
        assert!(other.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_html_pages_are_included_but_not_expanded() {
        let server = MockServer::start().await;
        mount_html(&server, "/", &["/feed.json", "/page"]).await;
        mount_html(&server, "/page", &[]).await;

        Mock::given(method("GET"))
            .and(path("/feed.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"{"next": "<a href='/hidden'>"}"#, "application/json"),
            )
            .mount(&server)
            .await;

        let target = Target::parse(&server.uri()).unwrap();
        let pages = Crawler::new().crawl(&target).await.unwrap();

        assert_eq!(paths(&pages), vec!["/", "/feed.json", "/page"]);
        assert_eq!(pages[1].content_type.as_deref(), Some("application/json"));
        assert_eq!(pages[1].links_found, 0);
    }

    #[tokio::test]
    async fn test_fetch_failures_do_not_abort_the_crawl() {
        let server = MockServer::start().await;
        mount_html(&server, "/", &["/slow", "/ok"]).await;
        mount_html(&server, "/ok", &[]).await;

        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_delay(std::time::Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let target = Target::parse(&server.uri()).unwrap();
        let pages = Crawler::with_timeout(1).crawl(&target).await.unwrap();

        assert_eq!(paths(&pages), vec!["/", "/slow", "/ok"]);
        assert!(pages[1].error.is_some());
        assert!(pages[2].error.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_target_is_still_discovered() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let target = Target::parse(&format!("http://127.0.0.1:{}", port)).unwrap();

        let pages = Crawler::with_timeout(2).crawl(&target).await.unwrap();

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].url, target.as_str());
        assert!(pages[0].error.is_some());
    }

    #[tokio::test]
    async fn test_progress_callback_sees_every_page() {
        let server = small_graph().await;
        let target = Target::parse(&server.uri()).unwrap();

        let seen: Arc<Mutex<Vec<(usize, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let crawler = Crawler::new().with_progress_callback(Arc::new(move |depth: usize, url: String| {
            seen_clone.lock().unwrap().push((depth, url));
        }));

        let pages = crawler.crawl(&target).await.unwrap();
        let seen = seen.lock().unwrap();

        assert_eq!(seen.len(), pages.len());
        for ((depth, url), page) in seen.iter().zip(&pages) {
            assert_eq!(*depth, page.depth);
            assert_eq!(url, &page.url);
        }
    }
}
