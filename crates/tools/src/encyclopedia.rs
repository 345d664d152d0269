//! Encyclopedia lookup through the Wikipedia API.

use std::time::Duration;

use async_trait::async_trait;
use runtime::tools::{ParamSpec, Tool, ToolArgs, ToolError, ToolSpec};
use serde::Deserialize;
use tracing::debug;

use crate::http;

const API_HOST: &str = "wikipedia.org";
const MAX_EXTRACT_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    query: Option<ApiQuery>,
}

#[derive(Debug, Deserialize)]
struct ApiQuery {
    #[serde(default)]
    pages: Vec<ApiPage>,
}

#[derive(Debug, Deserialize)]
struct ApiPage {
    title: String,
    #[serde(default)]
    index: u32,
    #[serde(default)]
    extract: String,
}

/// The `encyclopedia` tool: intro of the best-matching Wikipedia article.
pub struct Encyclopedia {
    spec: ToolSpec,
    client: reqwest::Client,
}

impl Encyclopedia {
    pub const NAME: &str = "encyclopedia";

    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let spec = ToolSpec::new(
            Self::NAME,
            "Look up a topic in Wikipedia and return the introduction of the best matching \
             article. Good for background facts; not for current prices.",
        )
        .param(ParamSpec::string("query", "Topic to look up").required())
        .param(ParamSpec::string("language", "Wikipedia language code").with_default("en"));

        Ok(Self {
            spec,
            client: http::client(timeout)?,
        })
    }

    fn url(&self, language: &str, query: &str) -> String {
        format!(
            "https://{language}.{API_HOST}/w/api.php?action=query&format=json&formatversion=2&redirects=1\
             &generator=search&gsrlimit=1&gsrsearch={}\
             &prop=extracts&exintro=1&explaintext=1",
            urlencoding::encode(query)
        )
    }
}

#[async_trait]
impl Tool for Encyclopedia {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn invoke(&self, args: ToolArgs) -> Result<String, ToolError> {
        let query = args.string("query")?.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidInput("query must not be empty".into()));
        }
        let language = args.string("language")?.trim().to_ascii_lowercase();
        if !is_language_code(&language) {
            return Err(ToolError::InvalidInput(format!(
                "`{language}` is not a Wikipedia language code"
            )));
        }

        let body = http::get_text(&self.client, &self.url(&language, query)).await?;
        let response: ApiResponse = serde_json::from_str(&body)
            .map_err(|e| ToolError::Execution(format!("unexpected Wikipedia response: {e}")))?;

        debug!(query, %language, "encyclopedia lookup");
        Ok(render(query, response))
    }
}

fn is_language_code(code: &str) -> bool {
    (2..=12).contains(&code.len()) && code.chars().all(|c| c.is_ascii_lowercase() || c == '-')
}

fn render(query: &str, response: ApiResponse) -> String {
    let best = response
        .query
        .into_iter()
        .flat_map(|q| q.pages)
        .min_by_key(|p| p.index);

    match best {
        Some(page) if !page.extract.trim().is_empty() => {
            format!("{}\n{}", page.title, truncate(page.extract.trim(), MAX_EXTRACT_CHARS))
        }
        Some(page) => format!("{}\n(no summary available)", page.title),
        None => format!("No results found for: {query}"),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}…", &text[..end]),
        None => text.to_string(),
    }
}
