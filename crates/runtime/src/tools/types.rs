//! Tool-related types.

use super::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value, json};

/// Value type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Number,
    Integer,
    Boolean,
}

impl ParamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }
}

/// One named, typed input of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub required: bool,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            default: None,
            required: false,
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamKind::String, description)
    }

    pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Number, description)
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Integer, description)
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Boolean, description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Description as shown to the model, with the default spelled out.
    fn schema_description(&self) -> String {
        match &self.default {
            Some(default) => format!("{} (default: {default})", self.description),
            None => self.description.clone(),
        }
    }
}

/// A tool definition exposed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// JSON Schema for the input object.
    ///
    /// Defaults are folded into the descriptions rather than emitted as
    /// `default` keys, which not every provider accepts.
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    json!({ "type": p.kind.as_str(), "description": p.schema_description() }),
                )
            })
            .collect();

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    fn find(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// Arguments checked and coerced against a [`ToolSpec`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    /// Validate raw model arguments against `spec`.
    ///
    /// Unknown keys and missing required parameters are rejected, missing
    /// optional parameters take their default, and values are coerced to
    /// the declared kind.
    pub fn bind(spec: &ToolSpec, raw: &Map<String, Value>) -> Result<Self, ToolError> {
        if let Some(unknown) = raw.keys().find(|key| spec.find(key).is_none()) {
            return Err(ToolError::InvalidInput(format!(
                "unknown parameter `{unknown}` for {}",
                spec.name
            )));
        }

        let mut bound = Map::new();
        for param in &spec.params {
            match raw.get(&param.name).filter(|v| !v.is_null()) {
                Some(value) => {
                    let coerced = coerce(param.kind, value).ok_or_else(|| {
                        ToolError::InvalidInput(format!(
                            "`{}` must be a {}, got {value}",
                            param.name,
                            param.kind.as_str()
                        ))
                    })?;
                    bound.insert(param.name.clone(), coerced);
                }
                None if param.required => {
                    return Err(ToolError::InvalidInput(format!(
                        "missing required parameter `{}`",
                        param.name
                    )));
                }
                None => {
                    if let Some(default) = &param.default {
                        bound.insert(param.name.clone(), default.clone());
                    }
                }
            }
        }

        Ok(Self(bound))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn number(&self, name: &str) -> Result<f64, ToolError> {
        self.get(name)
            .and_then(Value::as_f64)
            .ok_or_else(|| missing(name))
    }

    pub fn integer(&self, name: &str) -> Result<i64, ToolError> {
        self.get(name)
            .and_then(Value::as_i64)
            .ok_or_else(|| missing(name))
    }

    pub fn string(&self, name: &str) -> Result<&str, ToolError> {
        self.get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| missing(name))
    }

    pub fn boolean(&self, name: &str) -> Result<bool, ToolError> {
        self.get(name)
            .and_then(Value::as_bool)
            .ok_or_else(|| missing(name))
    }
}

fn missing(name: &str) -> ToolError {
    ToolError::InvalidInput(format!("missing parameter `{name}`"))
}

fn coerce(kind: ParamKind, value: &Value) -> Option<Value> {
    match (kind, value) {
        (ParamKind::String, Value::String(_)) => Some(value.clone()),
        (ParamKind::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        (ParamKind::String, Value::Bool(b)) => Some(Value::String(b.to_string())),

        (ParamKind::Number, Value::Number(_)) => Some(value.clone()),
        (ParamKind::Number, Value::String(s)) => {
            parse_number(s).and_then(Number::from_f64).map(Value::Number)
        }

        (ParamKind::Integer, Value::Number(n)) => integral(n.as_f64()?),
        (ParamKind::Integer, Value::String(s)) => integral(parse_number(s)?),

        (ParamKind::Boolean, Value::Bool(_)) => Some(value.clone()),
        (ParamKind::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(Value::Bool(true)),
            "false" | "no" | "0" => Some(Value::Bool(false)),
            _ => None,
        },

        _ => None,
    }
}

fn integral(n: f64) -> Option<Value> {
    (n.is_finite() && n.fract() == 0.0).then(|| Value::from(n as i64))
}

/// Parse a number the way a model tends to write one: `"19.99"`, `" 21% "`,
/// `"12,5"`, `"100€"`, `"$1,200.50"`, `"1.200,50 €"`.
///
/// When both `.` and `,` appear, the last one is the decimal mark. A lone
/// separator followed by exactly three digits (and a non-zero integer part)
/// groups thousands. Malformed grouping is rejected rather than guessed.
pub(crate) fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text
        .trim()
        .trim_start_matches(['€', '$', '£'])
        .trim_end_matches(['%', '€', '$', '£'])
        .trim();
    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();

    let decimal = decimal_mark(&compact);
    let integer = &compact[..decimal.unwrap_or(compact.len())];
    if !well_grouped(integer) {
        return None;
    }

    let normalized: String = compact
        .char_indices()
        .filter_map(|(i, c)| match c {
            '.' | ',' if Some(i) == decimal => Some('.'),
            '.' | ',' => None,
            _ => Some(c),
        })
        .collect();

    normalized.parse::<f64>().ok()
}

/// Byte index of the decimal separator, if there is one.
fn decimal_mark(s: &str) -> Option<usize> {
    match (s.rfind('.'), s.rfind(',')) {
        (None, None) => None,
        (Some(dot), Some(comma)) => Some(dot.max(comma)),
        (Some(i), None) | (None, Some(i)) => {
            let mark = s.as_bytes()[i];
            let repeated = s.bytes().filter(|&b| b == mark).count() > 1;
            let lead = s[..i].trim_start_matches(['-', '+']);
            let thousands = s.len() - i - 1 == 3 && !matches!(lead, "" | "0");
            (!repeated && !thousands).then_some(i)
        }
    }
}

/// Thousands groups: 1 to 3 leading digits, then groups of exactly 3.
fn well_grouped(integer: &str) -> bool {
    let mut groups = integer.trim_start_matches(['-', '+']).split(['.', ',']);
    let Some(first) = groups.next() else {
        return true;
    };
    let mut rest = groups.peekable();
    if rest.peek().is_none() {
        return true;
    }
    let digits = |g: &str| g.bytes().all(|b| b.is_ascii_digit());
    (1..=3).contains(&first.len())
        && digits(first)
        && rest.all(|g| g.len() == 3 && digits(g))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tax_spec() -> ToolSpec {
        ToolSpec::new("tax_calculator", "Compute VAT")
            .param(ParamSpec::number("net_price", "Price before tax").required())
            .param(ParamSpec::number("rate", "VAT rate in percent").with_default(21.0))
    }

    fn raw(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn schema_lists_required_and_defaults() {
        let schema = tax_spec().input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["net_price"]));
        assert_eq!(schema["properties"]["rate"]["type"], "number");
        assert!(
            schema["properties"]["rate"]["description"]
                .as_str()
                .unwrap()
                .contains("default: 21")
        );
    }

    #[test]
    fn bind_applies_defaults() {
        let args = ToolArgs::bind(&tax_spec(), &raw(json!({"net_price": 100}))).unwrap();
        assert_eq!(args.number("net_price").unwrap(), 100.0);
        assert_eq!(args.number("rate").unwrap(), 21.0);
    }

    #[test]
    fn bind_coerces_model_strings() {
        let args = ToolArgs::bind(
            &tax_spec(),
            &raw(json!({"net_price": " 19,99€ ", "rate": "10%"})),
        )
        .unwrap();
        assert!((args.number("net_price").unwrap() - 19.99).abs() < 1e-9);
        assert_eq!(args.number("rate").unwrap(), 10.0);
    }

    #[test]
    fn null_optional_uses_default() {
        let args = ToolArgs::bind(&tax_spec(), &raw(json!({"net_price": 5, "rate": null}))).unwrap();
        assert_eq!(args.number("rate").unwrap(), 21.0);
    }

    #[test]
    fn bind_rejects_missing_required() {
        let err = ToolArgs::bind(&tax_spec(), &raw(json!({"rate": 4}))).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(msg) if msg.contains("net_price")));
    }

    #[test]
    fn bind_rejects_unknown_parameter() {
        let err = ToolArgs::bind(&tax_spec(), &raw(json!({"net_price": 1, "currency": "EUR"})))
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(msg) if msg.contains("currency")));
    }

    #[test]
    fn bind_rejects_garbage_numbers() {
        let err =
            ToolArgs::bind(&tax_spec(), &raw(json!({"net_price": "about ten"}))).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[test]
    fn integer_and_boolean_coercion() {
        let spec = ToolSpec::new("search", "Search")
            .param(ParamSpec::integer("max_results", "How many").with_default(5))
            .param(ParamSpec::boolean("safe", "Safe search"))
            .param(ParamSpec::string("query", "Query").required());

        let args = ToolArgs::bind(
            &spec,
            &raw(json!({"max_results": "3", "safe": "yes", "query": 2026})),
        )
        .unwrap();
        assert_eq!(args.integer("max_results").unwrap(), 3);
        assert!(args.boolean("safe").unwrap());
        assert_eq!(args.string("query").unwrap(), "2026");

        let err = ToolArgs::bind(&spec, &raw(json!({"max_results": 2.5, "query": "x"})))
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[test]
    fn parse_number_variants() {
        assert_eq!(parse_number("100"), Some(100.0));
        assert_eq!(parse_number("$1,200.50"), Some(1200.5));
        assert_eq!(parse_number("12,5"), Some(12.5));
        assert_eq!(parse_number("ten"), None);
    }

    #[test]
    fn parse_number_reads_european_grouping() {
        assert_eq!(parse_number("1.200,50"), Some(1200.5));
        assert_eq!(parse_number("1,200"), Some(1200.0));
        assert_eq!(parse_number("1.200 €"), Some(1200.0));
        assert_eq!(parse_number("1.234.567,89"), Some(1234567.89));
        assert_eq!(parse_number("1 200,50€"), Some(1200.5));
        assert_eq!(parse_number("19.99"), Some(19.99));
        assert_eq!(parse_number("0.125"), Some(0.125));
        assert_eq!(parse_number("-2,5"), Some(-2.5));
    }

    #[test]
    fn parse_number_rejects_malformed_grouping() {
        assert_eq!(parse_number("1.200.50"), None);
        assert_eq!(parse_number("1,2,3"), None);
        assert_eq!(parse_number("12.34,5"), None);
    }
}
