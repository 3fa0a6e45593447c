//! Neural Browser
//!
//! Fetches a page, reduces it to plain text and asks the model for a short
//! summary suitable for the text log.

use crate::decoder::extract_payload;
use crate::inference::{InferenceClient, InferenceError};
use crate::types::ShellConfig;
use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use thiserror::Error;

const SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str = "Mozilla/5.0 (jaxOS/1.0; NeuralKernel)";

const SUMMARY_SYSTEM_PROMPT: &str = "You are the browser engine for jaxOS. \
Read the website content you are given and summarize its main headlines or content \
for a text-only retro display. Output JSON: {\"response\": \"YOUR_SUMMARY_HERE\"}";

#[derive(Debug, Error)]
pub enum NavigateError {
    #[error("connection error: {0}")]
    Fetch(String),

    #[error("server returned HTTP {0}")]
    Status(u16),

    #[error("page has no readable text")]
    EmptyPage,

    #[error("cortex failed to render page: {0}")]
    Summarize(#[from] InferenceError),

    #[error("cortex failed to render page")]
    Unrenderable,
}

impl From<reqwest::Error> for NavigateError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => NavigateError::Status(status.as_u16()),
            None => NavigateError::Fetch(e.to_string()),
        }
    }
}

/// Navigation collaborator used by the `browse` action.
#[async_trait]
pub trait Navigator: Send + Sync {
    /// Fetch `target` (a URL or a search query) and return a summary.
    async fn browse(&self, target: &str) -> Result<String, NavigateError>;
}

pub struct WebNavigator {
    http: reqwest::Client,
    inference: Arc<dyn InferenceClient>,
    char_budget: usize,
}

impl WebNavigator {
    pub fn new(config: &ShellConfig, inference: Arc<dyn InferenceClient>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build browser HTTP client")?;

        Ok(Self {
            http,
            inference,
            char_budget: config.browse_char_budget,
        })
    }

    async fn fetch_text(&self, url: &str) -> Result<String, NavigateError> {
        let resp = self.http.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(NavigateError::Status(resp.status().as_u16()));
        }

        let html = resp.text().await?;
        let text = truncate_chars(strip_html(&html), self.char_budget);
        if text.is_empty() {
            return Err(NavigateError::EmptyPage);
        }
        Ok(text)
    }
}

#[async_trait]
impl Navigator for WebNavigator {
    async fn browse(&self, target: &str) -> Result<String, NavigateError> {
        let url = resolve_target(target);
        log::info!("Browsing {url}");

        let text = self.fetch_text(&url).await?;
        let prompt = format!("Website Content:\n{text}");
        let reply = self.inference.infer(&prompt, SUMMARY_SYSTEM_PROMPT).await?;

        parse_summary(&reply)
    }
}

/// Turn user input into a fetchable URL.
///
/// Anything with a space or without a dot is a search query.
pub fn resolve_target(target: &str) -> String {
    let target = target.trim();

    if target.contains(' ') || !target.contains('.') {
        return match reqwest::Url::parse_with_params(SEARCH_ENDPOINT, &[("q", target)]) {
            Ok(url) => url.to_string(),
            Err(_) => SEARCH_ENDPOINT.to_string(),
        };
    }

    if target.starts_with("http://") || target.starts_with("https://") {
        target.to_string()
    } else {
        format!("https://{target}")
    }
}

fn block_pattern() -> &'static Regex {
    static BLOCKS: OnceLock<Regex> = OnceLock::new();
    BLOCKS.get_or_init(|| {
        Regex::new(r"(?is)<(script|style|noscript)\b.*?</(script|style|noscript)\s*>")
            .expect("block pattern compiles")
    })
}

fn tag_pattern() -> &'static Regex {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    TAGS.get_or_init(|| Regex::new(r"<[^<]+?>").expect("tag pattern compiles"))
}

/// Strip markup and collapse whitespace.
pub fn strip_html(html: &str) -> String {
    let text = block_pattern().replace_all(html, " ");
    let text = tag_pattern().replace_all(&text, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn truncate_chars(s: String, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s;
    }
    s.chars().take(max_chars).collect()
}

/// Accept `{"response": ...}` or a plain-text summary.
fn parse_summary(reply: &str) -> Result<String, NavigateError> {
    let reply = reply.trim();

    if let Some(candidate) = extract_payload(reply) {
        if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(candidate) {
            return match object.get("response") {
                Some(Value::String(summary)) if !summary.trim().is_empty() => {
                    Ok(summary.trim().to_string())
                }
                Some(Value::Array(items)) if !items.is_empty() => Ok(items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => format!("- {s}"),
                        other => format!("- {other}"),
                    })
                    .collect::<Vec<_>>()
                    .join("\n")),
                _ => Err(NavigateError::Unrenderable),
            };
        }
    }

    if reply.is_empty() {
        Err(NavigateError::Unrenderable)
    } else {
        Ok(reply.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct CannedSummary {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl InferenceClient for CannedSummary {
        async fn infer(&self, prompt: &str, _system: &str) -> Result<String, InferenceError> {
            self.prompts.lock().push(prompt.to_string());
            Ok(self.reply.clone())
        }

        async fn list_models(&self) -> Result<Vec<String>, InferenceError> {
            Ok(vec![])
        }

        fn model(&self) -> &str {
            "canned"
        }
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("example.com"), "https://example.com");
        assert_eq!(resolve_target("  http://example.com/a "), "http://example.com/a");
        assert_eq!(
            resolve_target("rust async book"),
            "https://html.duckduckgo.com/html/?q=rust+async+book"
        );
        assert_eq!(resolve_target("weather"), "https://html.duckduckgo.com/html/?q=weather");
    }

    #[test]
    fn test_strip_html() {
        let html = "<html><head><style>body { color: red; }</style>\
                    <script>var x = '<b>';</script></head>\
                    <body><h1>Top   story</h1>\n<p>Rust &amp; friends</p></body></html>";
        assert_eq!(strip_html(html), "Top story Rust & friends");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo".to_string(), 2), "hé");
        assert_eq!(truncate_chars("abc".to_string(), 10), "abc");
    }

    #[test]
    fn test_parse_summary() {
        assert_eq!(parse_summary(r#"{"response": "Headlines"}"#).unwrap(), "Headlines");
        assert_eq!(
            parse_summary(r#"{"response": ["one", "two"]}"#).unwrap(),
            "- one\n- two"
        );
        assert_eq!(parse_summary("Just prose.").unwrap(), "Just prose.");
        assert!(matches!(
            parse_summary(r#"{"summary": "wrong key"}"#),
            Err(NavigateError::Unrenderable)
        ));
        assert!(matches!(parse_summary("  "), Err(NavigateError::Unrenderable)));
    }

    #[tokio::test]
    async fn test_browse_summarizes_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/news"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "<html><body><h1>Breaking</h1><p>Something happened.</p></body></html>",
                "text/html",
            ))
            .expect(1)
            .mount(&server)
            .await;
        let inference = Arc::new(CannedSummary {
            reply: r#"{"response": "- Breaking: something happened"}"#.to_string(),
            prompts: Mutex::new(Vec::new()),
        });

        let config = ShellConfig {
            browse_char_budget: 12,
            ..ShellConfig::default()
        };
        let navigator = WebNavigator::new(&config, inference.clone()).unwrap();

        let summary = navigator.browse(&format!("{}/news", server.uri())).await.unwrap();
        assert_eq!(summary, "- Breaking: something happened");

        let prompts = inference.prompts.lock();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].ends_with("Breaking Som"));
    }

    #[tokio::test]
    async fn test_browse_http_error_skips_summary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let inference = Arc::new(CannedSummary {
            reply: String::new(),
            prompts: Mutex::new(Vec::new()),
        });
        let navigator = WebNavigator::new(&ShellConfig::default(), inference.clone()).unwrap();

        let err = navigator
            .browse(&format!("{}/gone", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, NavigateError::Status(404)), "got {err:?}");
        assert!(inference.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_browse_unreachable_is_an_error() {
        let inference = Arc::new(CannedSummary {
            reply: String::new(),
            prompts: Mutex::new(Vec::new()),
        });
        let navigator = WebNavigator::new(&ShellConfig::default(), inference.clone()).unwrap();

        let err = navigator
            .browse("http://127.0.0.1:1/")
            .await
            .unwrap_err();
        assert!(matches!(err, NavigateError::Fetch(_)), "got {err:?}");
        assert!(inference.prompts.lock().is_empty());
    }
}
