//! Frame embedding verification
//!
//! Each check launches its own headless Chrome, writes the PoC harness into
//! a blank page, lets the frame settle and then asks the browser what the
//! child frame actually committed. The browser is owned by a [`Sandbox`]
//! guard and goes away with it on every exit path.

use crate::error::VerifyError;
use headless_chrome::protocol::cdp::{Page, Target};
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OwnedSemaphorePermit;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_SETTLE_MS: u64 = 2000;
pub const DEFAULT_LOAD_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_DEADLINE_SECS: u64 = 30;

const IFRAME_STATE_JS: &str = r#"(function() {
    const frame = document.querySelector('iframe');
    return JSON.stringify({
        present: frame !== null,
        src: frame ? frame.getAttribute('src') : null,
    });
})()"#;

/// Keeps cross-site frames in the harness renderer so the page's own frame
/// tree reports what they committed. Chrome keeps one value per switch, so
/// the default `--disable-features` list is swapped for an extended one.
static DEFAULT_FEATURES_ARG: &str = "--disable-features=TranslateUI,BlinkGenPropertyTrees";
static SAME_PROCESS_FRAME_ARGS: [&str; 2] = [
    "--disable-features=TranslateUI,BlinkGenPropertyTrees,IsolateOrigins,site-per-process",
    "--disable-site-isolation-trials",
];

#[derive(Debug, Deserialize)]
struct IframeState {
    present: bool,
    src: Option<String>,
}

type ProbeResult<T> = std::result::Result<T, VerifyError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The frame committed the target URL
    Vulnerable,
    /// The frame was blocked, replaced or sent somewhere else
    Safe,
    /// The check itself failed; nothing was learned about the page
    Indeterminate,
}

impl Verdict {
    pub fn is_vulnerable(self) -> bool {
        matches!(self, Verdict::Vulnerable)
    }

    pub fn label(self) -> &'static str {
        match self {
            Verdict::Vulnerable => "VULNERABLE",
            Verdict::Safe => "SAFE",
            Verdict::Indeterminate => "INDETERMINATE",
        }
    }
}

/// What the browser reported about the harness after the settle delay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameObservation {
    pub iframe_present: bool,
    pub src_attribute: Option<String>,
    /// URL the child frame committed, if a child frame exists
    pub frame_url: Option<String>,
    /// Set by Chrome when the frame shows an error page instead
    pub unreachable_url: Option<String>,
}

/// Turn a raw observation into a verdict for `target_url`.
pub fn classify(observation: &FrameObservation, target_url: &str) -> Verdict {
    if !observation.iframe_present {
        return Verdict::Safe;
    }

    match observation.src_attribute.as_deref() {
        Some(src) if same_url(src, target_url) => {}
        _ => return Verdict::Safe,
    }

    if observation.unreachable_url.is_some() {
        return Verdict::Safe;
    }

    match observation.frame_url.as_deref() {
        None => Verdict::Indeterminate,
        Some(url) if url.is_empty() || url == "about:blank" => Verdict::Indeterminate,
        Some(url) if url.starts_with("chrome-error:") => Verdict::Safe,
        Some(url) if same_url(url, target_url) => Verdict::Vulnerable,
        Some(_) => Verdict::Safe,
    }
}

fn same_url(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[derive(Debug, Clone)]
pub struct VerifierConfig {
    pub settle: Duration,
    pub load_timeout: Duration,
    /// Upper bound on one whole check, launch to teardown
    pub deadline: Duration,
    pub chrome_sandbox: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(DEFAULT_SETTLE_MS),
            load_timeout: Duration::from_secs(DEFAULT_LOAD_TIMEOUT_SECS),
            deadline: Duration::from_secs(DEFAULT_DEADLINE_SECS),
            chrome_sandbox: true,
        }
    }
}

/// Something that can load a harness and report on its iframe.
///
/// Implementations run on a blocking thread and must not share browser
/// state between calls.
pub trait EmbedProbe: Send + Sync {
    fn observe(&self, poc_html: &str, target_url: &str) -> ProbeResult<FrameObservation>;
}

/// A disposable Chrome instance with its own temporary profile.
pub struct Sandbox {
    browser: Browser,
}

impl Sandbox {
    pub fn launch(config: &VerifierConfig) -> ProbeResult<Self> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(config.chrome_sandbox)
            .idle_browser_timeout(config.deadline)
            .ignore_default_args(vec![OsStr::new(DEFAULT_FEATURES_ARG)])
            .args(SAME_PROCESS_FRAME_ARGS.iter().map(|arg| OsStr::new(*arg)).collect())
            .build()
            .map_err(|e| VerifyError::Launch(e.to_string()))?;

        let browser = Browser::new(options).map_err(|e| VerifyError::Launch(e.to_string()))?;
        debug!("Browser sandbox launched");
        Ok(Self { browser })
    }

    pub fn new_tab(&self) -> ProbeResult<Arc<Tab>> {
        Ok(self.browser.new_tab()?)
    }

    pub fn process_id(&self) -> Option<u32> {
        self.browser.get_process_id()
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        // Dropping `Browser` kills the Chrome process and removes its profile.
        debug!("Tearing down browser sandbox");
    }
}

/// Drives one [`Sandbox`] per check. Every browser call is bounded by the
/// tab timeout, and the whole check gives up once `deadline` has passed.
pub struct ChromeProbe {
    config: VerifierConfig,
}

impl ChromeProbe {
    pub fn new(config: VerifierConfig) -> Self {
        Self { config }
    }

    fn load_harness(&self, tab: &Tab, poc_html: &str) -> ProbeResult<()> {
        tab.set_default_timeout(self.config.load_timeout);
        tab.navigate_to("about:blank")?.wait_until_navigated()?;

        let script = format!(
            "document.open(); document.write({}); document.close();",
            serde_json::to_string(poc_html)?
        );
        tab.evaluate(&script, false)?;
        Ok(())
    }

    fn iframe_state(&self, tab: &Tab) -> ProbeResult<IframeState> {
        let raw = tab
            .evaluate(IFRAME_STATE_JS, false)?
            .value
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();

        if raw.is_empty() {
            return Ok(IframeState {
                present: false,
                src: None,
            });
        }
        Ok(serde_json::from_str(&raw)?)
    }

    /// URL and error state of the harness's child frame.
    ///
    /// Falls back to the browser's `iframe` targets when the frame was put
    /// in its own process and is missing from the page's frame tree.
    fn child_frame(&self, tab: &Tab) -> ProbeResult<(Option<String>, Option<String>)> {
        let tree = tab.call_method(Page::GetFrameTree(None))?.frame_tree;
        if let Some(frame) = tree
            .child_frames
            .and_then(|children| children.into_iter().next())
            .map(|child| child.frame)
        {
            return Ok((Some(frame.url), frame.unreachable_url));
        }

        let targets = tab
            .call_method(Target::GetTargets { filter: None })?
            .target_infos;
        Ok((
            targets
                .into_iter()
                .find(|info| info.Type == "iframe")
                .map(|info| info.url),
            None,
        ))
    }

    fn check_deadline(&self, started: Instant) -> ProbeResult<()> {
        if started.elapsed() > self.config.deadline {
            return Err(VerifyError::Deadline(self.config.deadline));
        }
        Ok(())
    }
}

impl EmbedProbe for ChromeProbe {
    fn observe(&self, poc_html: &str, target_url: &str) -> ProbeResult<FrameObservation> {
        let started = Instant::now();
        let sandbox = Sandbox::launch(&self.config)?;
        let tab = sandbox.new_tab()?;

        self.load_harness(&tab, poc_html)?;
        self.check_deadline(started)?;
        std::thread::sleep(self.config.settle);

        let iframe = self.iframe_state(&tab)?;
        let (frame_url, unreachable_url) = self.child_frame(&tab)?;
        self.check_deadline(started)?;

        debug!(
            "Frame for {}: present={} src={:?} committed={:?}",
            target_url, iframe.present, iframe.src, frame_url
        );

        Ok(FrameObservation {
            iframe_present: iframe.present,
            src_attribute: iframe.src,
            frame_url,
            unreachable_url,
        })
    }
}

/// Runs probes off the async runtime and collapses every failure into
/// [`Verdict::Indeterminate`].
#[derive(Clone)]
pub struct Verifier {
    probe: Arc<dyn EmbedProbe>,
    deadline: Duration,
}

impl Verifier {
    pub fn new(probe: Arc<dyn EmbedProbe>, deadline: Duration) -> Self {
        Self { probe, deadline }
    }

    pub fn chrome(config: VerifierConfig) -> Self {
        let deadline = config.deadline;
        Self::new(Arc::new(ChromeProbe::new(config)), deadline)
    }

    pub async fn verify(&self, url: &str, poc_html: &str) -> Verdict {
        self.verify_holding(None, url, poc_html).await
    }

    /// Like [`Verifier::verify`], but `permit` stays held until the probe
    /// has actually returned, even when the deadline gave up on it first.
    pub async fn verify_holding(
        &self,
        permit: Option<OwnedSemaphorePermit>,
        url: &str,
        poc_html: &str,
    ) -> Verdict {
        match self.observe(permit, url, poc_html).await {
            Ok(observation) => classify(&observation, url),
            Err(e) => {
                warn!("Verification of {} failed: {}", url, e);
                Verdict::Indeterminate
            }
        }
    }

    async fn observe(
        &self,
        permit: Option<OwnedSemaphorePermit>,
        url: &str,
        poc_html: &str,
    ) -> ProbeResult<FrameObservation> {
        let probe = self.probe.clone();
        let url_owned = url.to_string();
        let html_owned = poc_html.to_string();

        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            probe.observe(&html_owned, &url_owned)
        });

        match tokio::time::timeout(self.deadline, task).await {
            Ok(joined) => joined?,
            Err(_) => Err(VerifyError::Deadline(self.deadline)),
        }
    }
}
