//! License pages and paper PDFs fetched from arbitrary URLs.

use std::time::Duration;

use lncd_config::HttpConfig;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use reqwest::Client;
use tracing::info;

use crate::error::SourceError;

/// Lower bound on the request timeout.
const MIN_TIMEOUT: Duration = Duration::from_secs(20);

#[allow(clippy::expect_used)]
static COMMENTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
#[allow(clippy::expect_used)]
static HIDDEN_BLOCKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<noscript\b.*?</noscript\s*>")
        .expect("valid regex")
});
#[allow(clippy::expect_used)]
static LINE_BREAKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*br\s*/?>|</(?:p|div|section|article|tr|td|th|li|ul|ol|h\d)\s*>")
        .expect("valid regex")
});
#[allow(clippy::expect_used)]
static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
#[allow(clippy::expect_used)]
static ENTITIES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").expect("valid regex")
});

/// Convert an HTML page to plain text, one trimmed non-empty line per block.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let text = COMMENTS.replace_all(html, "");
    let text = HIDDEN_BLOCKS.replace_all(&text, "");
    let text = LINE_BREAKS.replace_all(&text, "\n");
    let text = TAGS.replace_all(&text, "");
    let text = ENTITIES.replace_all(&text, |caps: &Captures<'_>| {
        unescape_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    });

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn unescape_entity(entity: &str) -> Option<String> {
    if let Some(numeric) = entity.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    let c = match entity {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "ndash" => '–',
        "mdash" => '—',
        "hellip" => '…',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "sect" => '§',
        _ => return None,
    };
    Some(c.to_string())
}

/// Fetches pages and documents outside the crawled platforms.
#[derive(Debug, Clone)]
pub struct WebFetcher {
    client: Client,
}

impl WebFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(MIN_TIMEOUT.max(Duration::from_secs(config.timeout)))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client })
    }

    async fn fetch(&self, url: &str) -> Result<reqwest::Response, SourceError> {
        let parsed = url::Url::parse(url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SourceError::UnsupportedScheme(parsed.scheme().to_string()));
        }

        let response = self.client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }
        Ok(response)
    }

    /// Fetch a license page as plain text.
    pub async fn fetch_text(&self, url: &str) -> Result<String, SourceError> {
        let response = self.fetch(url).await?;
        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_none_or(|ct| ct.contains("html"));
        let body = response.text().await?;

        let text = if is_html { html_to_text(&body) } else { body };
        info!("Fetched {} chars of text from {url}", text.len());
        Ok(text)
    }

    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        let response = self.fetch(url).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_drops_hidden_content() {
        let html = r#"<html><head><style>p { color: red; }</style>
<script type="text/javascript">var x = 1;</script></head>
<body><!-- nav --><h1>License</h1><noscript>enable js</noscript>
<p>Use is limited to <b>non-commercial</b> research.</p></body></html>"#;
        let text = html_to_text(html);
        assert!(!text.contains("var x"));
        assert!(!text.contains("color"));
        assert!(!text.contains("nav"));
        assert!(!text.contains("enable js"));
        assert_eq!(text, "License\nUse is limited to non-commercial research.");
    }

    #[test]
    fn test_html_to_text_breaks_blocks() {
        let text = html_to_text("<div>one<br/>two</div><ul><li>three</li><li>four</li></ul>");
        assert_eq!(text, "one\ntwo\nthree\nfour");
    }

    #[test]
    fn test_html_to_text_unescapes_entities() {
        let text = html_to_text("<p>Tom &amp; Jerry &lt;3 &#169; &#x41; &bogus;</p>");
        assert_eq!(text, "Tom & Jerry <3 © A &bogus;");
    }

    #[test]
    fn test_web_fetcher_new() {
        assert!(WebFetcher::new(&HttpConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_rejects_non_http_scheme() {
        let Ok(fetcher) = WebFetcher::new(&HttpConfig::default()) else {
            panic!("fetcher should build");
        };
        assert!(matches!(
            fetcher.fetch_text("ftp://example.org/license").await,
            Err(SourceError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            fetcher.fetch_text("not a url").await,
            Err(SourceError::InvalidUrl(_))
        ));
    }
}
