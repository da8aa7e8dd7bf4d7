use crate::error::{Result, ScanError};
use std::fmt;
use url::{Origin, Url};

/// The starting point of a scan. Always absolute, always has a tuple origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    url: Url,
}

impl Target {
    /// Normalize user input into a target, defaulting the scheme to `https://`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ScanError::InvalidUrl("empty target".to_string()));
        }

        let lowered = trimmed.to_ascii_lowercase();
        let candidate = if lowered.starts_with("http://") || lowered.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        let mut url = Url::parse(&candidate)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", trimmed, e)))?;
        url.set_fragment(None);

        if !url.origin().is_tuple() {
            return Err(ScanError::OpaqueOrigin(url.to_string()));
        }

        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn origin(&self) -> Origin {
        self.url.origin()
    }

    /// Host with an explicit port appended, e.g. `example.test:8080`
    pub fn authority(&self) -> String {
        let host = self.url.host_str().unwrap_or("unknown");
        match self.url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    /// True when `url` shares scheme, host and port with this target.
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.url.origin()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}
