//! Web search through the DuckDuckGo HTML endpoint.

use std::time::Duration;

use async_trait::async_trait;
use runtime::tools::{ParamSpec, Tool, ToolArgs, ToolError, ToolSpec};
use tracing::debug;

use crate::http;

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";
const MAX_RESULTS: i64 = 10;

/// The `web_search` tool. No API key needed.
pub struct WebSearch {
    spec: ToolSpec,
    client: reqwest::Client,
}

impl WebSearch {
    pub const NAME: &str = "web_search";

    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let spec = ToolSpec::new(
            Self::NAME,
            "Search the web for current information such as prices, schedules or news. \
             Returns result titles, snippets and URLs.",
        )
        .param(ParamSpec::string("query", "The search query").required())
        .param(ParamSpec::integer("max_results", "Maximum number of results").with_default(5));

        Ok(Self {
            spec,
            client: http::client(timeout)?,
        })
    }
}

#[async_trait]
impl Tool for WebSearch {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn invoke(&self, args: ToolArgs) -> Result<String, ToolError> {
        let query = args.string("query")?.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidInput("query must not be empty".into()));
        }
        let limit = args.integer("max_results")?.clamp(1, MAX_RESULTS) as usize;

        let url = format!("{SEARCH_URL}?q={}", urlencoding::encode(query));
        let html = http::get_text(&self.client, &url).await?;

        let results = extract_results(&html, limit);
        debug!(query, results = results.len(), "web search");

        if results.is_empty() {
            Ok(format!("No results found for: {query}"))
        } else {
            Ok(results.join("\n\n"))
        }
    }
}

/// Pull title, snippet and URL out of DuckDuckGo's result markup.
fn extract_results(html: &str, limit: usize) -> Vec<String> {
    html.split("class=\"result__body\"")
        .skip(1)
        .filter_map(|chunk| {
            let title = field(chunk, "result__a")?;
            let snippet = field(chunk, "result__snippet").unwrap_or_default();
            let url = field(chunk, "result__url").unwrap_or_default();
            Some(format!("**{title}**\n{snippet}\nURL: {url}"))
        })
        .take(limit)
        .collect()
}

/// Text of the element carrying `class`, with inline tags stripped.
fn field(chunk: &str, class: &str) -> Option<String> {
    let pos = chunk.find(&format!("class=\"{class}\""))?;
    let open = chunk[..pos].rfind('<')?;
    let tag = chunk[open + 1..pos].split_whitespace().next()?;

    let body = &chunk[pos + chunk[pos..].find('>')? + 1..];
    let inner = body
        .find(&format!("</{tag}>"))
        .map_or(body, |end| &body[..end]);

    // Highlighted terms arrive as <b>..</b>; drop any tag left inside.
    let mut text = String::with_capacity(inner.len());
    let mut in_tag = false;
    for c in inner.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }

    let text = html_decode(text.split_whitespace().collect::<Vec<_>>().join(" ").as_str());
    (!text.is_empty()).then_some(text)
}

/// Basic HTML entity decoding.
fn html_decode(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<div class="result results_links"><div class="result__body">
  <h2 class="result__title"><a rel="nofollow" class="result__a" href="/l/?u=crtm">Abono Transporte &amp; tarifas</a></h2>
  <a class="result__url" href="/l/?u=crtm"> www.crtm.es/tarifas </a>
  <a class="result__snippet" href="/l/?u=crtm">The <b>monthly pass</b> costs 8€ in 2026.</a>
</div></div>
<div class="result results_links"><div class="result__body">
  <h2 class="result__title"><a class="result__a" href="/l/?u=x">Second hit</a></h2>
</div></div>
<div class="result results_links"><div class="result__body">
  <div class="no-title">ad</div>
</div></div>
"#;

    #[test]
    fn extracts_title_snippet_and_url() {
        let results = extract_results(PAGE, 5);
        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0],
            "**Abono Transporte & tarifas**\nThe monthly pass costs 8€ in 2026.\nURL: www.crtm.es/tarifas"
        );
        assert_eq!(results[1], "**Second hit**\n\nURL: ");
    }

    #[test]
    fn respects_the_limit() {
        assert_eq!(extract_results(PAGE, 1).len(), 1);
    }

    #[test]
    fn no_markup_no_results() {
        assert!(extract_results("<html>captcha</html>", 5).is_empty());
    }

    #[test]
    fn spec_has_defaults() {
        let tool = WebSearch::new(Duration::from_secs(1)).unwrap();
        let schema = tool.spec().input_schema();
        assert_eq!(schema["required"], serde_json::json!(["query"]));
        assert_eq!(tool.spec().name, "web_search");
    }
}
