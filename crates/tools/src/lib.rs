//! Built-in tools for the clerk agent.
//!
//! - `tax_calculator`: deterministic VAT arithmetic.
//! - `web_search`: DuckDuckGo HTML search.
//! - `encyclopedia`: Wikipedia article intros.
//!
//! [`ToolsConfig`] assembles a [`ToolRegistry`] from the names a deployment
//! enables.

mod encyclopedia;
mod http;
mod search;
mod tax;

pub use encyclopedia::Encyclopedia;
pub use search::WebSearch;
pub use tax::{DEFAULT_RATE, TaxBreakdown, TaxCalculator, compute};

use std::time::Duration;

use runtime::tools::{RegistryError, ToolRegistry};
use thiserror::Error;

/// Every tool this crate provides, in the order they are offered to the model.
pub const ALL: [&str; 3] = [WebSearch::NAME, Encyclopedia::NAME, TaxCalculator::NAME];

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown tool `{name}` (available: {})", ALL.join(", "))]
    Unknown { name: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("could not set up HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Which tools to register, and how.
#[derive(Debug, Clone)]
pub struct ToolsConfig {
    enabled: Vec<String>,
    default_tax_rate: f64,
    http_timeout: Duration,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: ALL.iter().map(|s| s.to_string()).collect(),
            default_tax_rate: DEFAULT_RATE,
            http_timeout: Duration::from_secs(20),
        }
    }
}

impl ToolsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_tax_rate(mut self, rate: f64) -> Self {
        self.default_tax_rate = rate;
        self
    }

    /// Per-request timeout of the HTTP tools.
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Build the registry. Names are registered in the order given.
    pub fn build(&self) -> Result<ToolRegistry, Error> {
        let mut registry = ToolRegistry::new();
        for name in &self.enabled {
            match name.as_str() {
                WebSearch::NAME => registry.register(WebSearch::new(self.http_timeout)?)?,
                Encyclopedia::NAME => registry.register(Encyclopedia::new(self.http_timeout)?)?,
                TaxCalculator::NAME => {
                    registry.register(TaxCalculator::new(self.default_tax_rate))?
                }
                other => {
                    return Err(Error::Unknown {
                        name: other.to_string(),
                    });
                }
            }
        }
        Ok(registry)
    }
}
