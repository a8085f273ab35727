//! Feature extraction
//!
//! Builds the fixed-schema record the pipeline expects, either from a
//! partial JSON transaction or from free text produced by OCR. Missing
//! numeric fields default to 0.0 and a missing transaction type to "".

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Numeric columns the pipeline was trained on, in training order.
pub const NUMERIC_FIELDS: [&str; 7] = [
    "amount",
    "oldbalanceOrg",
    "newbalanceOrig",
    "oldbalanceDest",
    "newbalanceDest",
    "balanceDiffOrig",
    "balanceDiffDest",
];

/// The single categorical column.
pub const CATEGORICAL_FIELD: &str = "type";

/// A complete model input: one value per numeric column plus the
/// transaction type. Always fully populated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureRecord {
    pub numeric: [f64; NUMERIC_FIELDS.len()],
    pub tx_type: String,
}

impl FeatureRecord {
    /// Value of a numeric column by name.
    pub fn numeric_value(&self, field: &str) -> Option<f64> {
        NUMERIC_FIELDS
            .iter()
            .position(|f| *f == field)
            .map(|i| self.numeric[i])
    }

    /// Build a record from a partial JSON object. Values may be JSON
    /// numbers or numeric strings; anything else counts as absent.
    pub fn from_json(data: &Value) -> Self {
        let mut record = Self::default();
        let Some(map) = data.as_object() else {
            return record;
        };

        for (i, field) in NUMERIC_FIELDS.iter().enumerate() {
            record.numeric[i] = map.get(*field).and_then(coerce_f64).unwrap_or(0.0);
        }
        record.tx_type = map
            .get(CATEGORICAL_FIELD)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        record
    }

    /// Build a record from unstructured text (OCR output) using a
    /// field extractor.
    pub fn from_text(text: &str, extractor: &dyn FieldExtractor) -> Self {
        let mut record = Self::default();
        for (i, field) in NUMERIC_FIELDS.iter().enumerate() {
            record.numeric[i] = extractor.numeric_field(text, field).unwrap_or(0.0);
        }
        record.tx_type = extractor
            .word_field(text, CATEGORICAL_FIELD)
            .unwrap_or_default();
        record
    }
}

fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Named-field lookup in unstructured document text.
///
/// Kept as a trait so the regex matcher below can be replaced by a
/// structured OCR template matcher without touching callers.
pub trait FieldExtractor: Send + Sync {
    /// First numeric value labelled with `field`, if any.
    fn numeric_field(&self, text: &str, field: &str) -> Option<f64>;

    /// First single word labelled with `field`, if any.
    fn word_field(&self, text: &str, field: &str) -> Option<String>;
}

/// Regex-based field extractor.
///
/// Matches `<field><optional colon><whitespace><value>` anywhere in the
/// text, case-sensitive. Decimal comma is normalized to a period.
/// A field label occurring out of context is still accepted as data;
/// that precision risk is inherent to the approach.
pub struct RegexFieldExtractor {
    numeric: HashMap<&'static str, Regex>,
}

const NUMERIC_VALUE: &str = r"\s*:?\s*(\d+[\.,]?\d*)";
const WORD_VALUE: &str = r"\s*:?\s*(\w+)";

static TYPE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("{CATEGORICAL_FIELD}{WORD_VALUE}")).expect("invalid type pattern")
});

impl RegexFieldExtractor {
    /// Compile patterns for every known field up front.
    pub fn new() -> Self {
        let numeric = NUMERIC_FIELDS
            .iter()
            .map(|field| {
                let pattern = format!("{}{}", regex::escape(field), NUMERIC_VALUE);
                let re = Regex::new(&pattern).expect("invalid numeric field pattern");
                (*field, re)
            })
            .collect();

        Self { numeric }
    }
}

impl Default for RegexFieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for RegexFieldExtractor {
    fn numeric_field(&self, text: &str, field: &str) -> Option<f64> {
        let re = self.numeric.get(field)?;
        let captures = re.captures(text)?;
        captures.get(1)?.as_str().replace(',', ".").parse().ok()
    }

    fn word_field(&self, text: &str, field: &str) -> Option<String> {
        if field != CATEGORICAL_FIELD {
            return None;
        }
        let captures = TYPE_PATTERN.captures(text)?;
        Some(captures.get(1)?.as_str().to_string())
    }
}
