//! VAT calculator.

use async_trait::async_trait;
use runtime::tools::{ParamSpec, Tool, ToolArgs, ToolError, ToolSpec};

/// Spanish general VAT rate, in percent.
pub const DEFAULT_RATE: f64 = 21.0;

/// Result of a tax computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxBreakdown {
    pub net_price: f64,
    pub rate: f64,
    pub tax: f64,
    pub total: f64,
}

impl std::fmt::Display for TaxBreakdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Net price: {:.2}€, VAT ({}%): {:.2}€, Total: {:.2}€",
            self.net_price, self.rate, self.tax, self.total
        )
    }
}

/// Add `rate` percent of tax to `net_price`.
pub fn compute(net_price: f64, rate: f64) -> Result<TaxBreakdown, ToolError> {
    if !net_price.is_finite() || net_price < 0.0 {
        return Err(ToolError::InvalidInput(format!(
            "net_price must be a non-negative number, got {net_price}"
        )));
    }
    if !rate.is_finite() || rate < 0.0 {
        return Err(ToolError::InvalidInput(format!(
            "rate must be a non-negative percentage, got {rate}"
        )));
    }

    let tax = net_price * rate / 100.0;
    Ok(TaxBreakdown {
        net_price,
        rate,
        tax,
        total: net_price + tax,
    })
}

/// The `tax_calculator` tool.
pub struct TaxCalculator {
    spec: ToolSpec,
}

impl TaxCalculator {
    pub const NAME: &str = "tax_calculator";

    pub fn new(default_rate: f64) -> Self {
        let spec = ToolSpec::new(
            Self::NAME,
            "Calculate the final price including VAT and the tax amount, given a net price.",
        )
        .param(ParamSpec::number("net_price", "Price before tax").required())
        .param(ParamSpec::number("rate", "VAT rate in percent").with_default(default_rate));

        Self { spec }
    }
}

impl Default for TaxCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_RATE)
    }
}

#[async_trait]
impl Tool for TaxCalculator {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn invoke(&self, args: ToolArgs) -> Result<String, ToolError> {
        let breakdown = compute(args.number("net_price")?, args.number("rate")?)?;
        Ok(breakdown.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{Map, Value, json};

    fn bind(tool: &TaxCalculator, raw: Value) -> Result<ToolArgs, ToolError> {
        let raw: Map<String, Value> = raw.as_object().cloned().unwrap_or_default();
        ToolArgs::bind(tool.spec(), &raw)
    }

    #[test]
    fn general_rate() {
        let b = compute(100.0, 21.0).unwrap();
        assert_eq!(b.tax, 21.0);
        assert_eq!(b.total, 121.0);
        assert_eq!(b.to_string(), "Net price: 100.00€, VAT (21%): 21.00€, Total: 121.00€");
    }

    #[test]
    fn fractional_rate_is_shown_as_is() {
        let b = compute(20.0, 10.5).unwrap();
        assert_eq!(b.to_string(), "Net price: 20.00€, VAT (10.5%): 2.10€, Total: 22.10€");
    }

    #[test]
    fn rejects_negative_and_non_finite() {
        assert!(matches!(compute(-5.0, 21.0), Err(ToolError::InvalidInput(_))));
        assert!(matches!(compute(f64::NAN, 21.0), Err(ToolError::InvalidInput(_))));
        assert!(matches!(compute(f64::INFINITY, 21.0), Err(ToolError::InvalidInput(_))));
        assert!(matches!(compute(10.0, -1.0), Err(ToolError::InvalidInput(_))));
    }

    #[test]
    fn zero_is_fine() {
        let b = compute(0.0, 0.0).unwrap();
        assert_eq!(b.total, 0.0);
    }

    #[tokio::test]
    async fn string_arguments_are_parsed() {
        let tool = TaxCalculator::default();
        let args = bind(&tool, json!({"net_price": "50€", "rate": "10%"})).unwrap();
        let out = tool.invoke(args).await.unwrap();
        assert_eq!(out, "Net price: 50.00€, VAT (10%): 5.00€, Total: 55.00€");
    }

    #[tokio::test]
    async fn missing_rate_uses_configured_default() {
        let tool = TaxCalculator::new(4.0);
        let args = bind(&tool, json!({"net_price": 10})).unwrap();
        let out = tool.invoke(args).await.unwrap();
        assert!(out.ends_with("Total: 10.40€"), "{out}");
    }

    #[test]
    fn schema_shows_the_default() {
        let schema = TaxCalculator::default().spec().input_schema();
        assert_eq!(schema["required"], json!(["net_price"]));
        assert!(
            schema["properties"]["rate"]["description"]
                .as_str()
                .unwrap()
                .contains("(default: 21")
        );
    }

    proptest! {
        #[test]
        fn total_is_net_plus_tax(net in 0.0f64..1e9, rate in 0.0f64..100.0) {
            let b = compute(net, rate).unwrap();
            prop_assert_eq!(b.tax, net * rate / 100.0);
            prop_assert_eq!(b.total, net + b.tax);
            prop_assert!(b.total >= net);
        }

        #[test]
        fn negative_prices_always_fail(net in -1e9f64..-1e-9, rate in 0.0f64..100.0) {
            prop_assert!(compute(net, rate).is_err());
        }
    }
}
