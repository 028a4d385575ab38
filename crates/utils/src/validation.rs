//! Field-level validation shared by the server and the client stores.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static CURRENCY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3}$").expect("valid currency regex"));

/// Field name -> first error message for that field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Records an error; the first message for a field wins.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, message) in other.0 {
            self.add(field, message);
        }
    }

    /// Merges errors of a nested record under `prefix.index.field`.
    pub fn merge_nested(&mut self, prefix: &str, index: usize, other: FieldErrors) {
        for (field, message) in other.0 {
            self.add(format!("{prefix}.{index}.{field}"), message);
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    pub fn required(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "is required");
        }
    }

    pub fn max_len(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(field, format!("must be at most {max} characters"));
        }
    }

    pub fn email(&mut self, field: &str, value: Option<&str>) {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return;
        };
        if !EMAIL_RE.is_match(value) {
            self.add(field, "must be a valid email address");
        }
    }

    pub fn non_negative(&mut self, field: &str, value: f64) {
        if !value.is_finite() || value < 0.0 {
            self.add(field, "must be zero or greater");
        }
    }

    pub fn positive(&mut self, field: &str, value: f64) {
        if !value.is_finite() || value <= 0.0 {
            self.add(field, "must be greater than zero");
        }
    }

    pub fn percent(&mut self, field: &str, value: f64) {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            self.add(field, "must be between 0 and 100");
        }
    }

    pub fn currency(&mut self, field: &str, value: &str) {
        if !CURRENCY_RE.is_match(value) {
            self.add(field, "must be a three-letter currency code");
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k} {v}")).collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Schema check for an incoming payload.
pub trait Validate {
    fn validate(&self) -> Result<(), FieldErrors>;
}

/// Canonical form of a payload: trimmed, blanks dropped, codes uppercased.
/// Validation runs on the normalized value.
pub trait Normalize {
    fn normalized(self) -> Self;
}

/// Treats blank strings as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_message_wins() {
        let mut errors = FieldErrors::new();
        errors.add("name", "is required");
        errors.add("name", "is too long");
        assert_eq!(errors.get("name"), Some("is required"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn email_rule_ignores_blank() {
        let mut errors = FieldErrors::new();
        errors.email("email", None);
        errors.email("email", Some("  "));
        assert!(errors.is_empty());
        errors.email("email", Some("not-an-email"));
        assert_eq!(errors.get("email"), Some("must be a valid email address"));
    }

    #[test]
    fn numeric_rules() {
        let mut errors = FieldErrors::new();
        errors.percent("vat_rate", 120.0);
        errors.positive("quantity", 0.0);
        errors.non_negative("price", -1.0);
        errors.non_negative("stock", f64::NAN);
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn nested_errors_are_prefixed() {
        let mut errors = FieldErrors::new();
        errors.merge_nested("items", 2, FieldErrors::single("description", "is required"));
        assert_eq!(errors.get("items.2.description"), Some("is required"));
    }

    #[test]
    fn serializes_as_plain_map() {
        let errors = FieldErrors::single("sku", "already exists");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({ "sku": "already exists" }));
    }

    #[test]
    fn currency_codes() {
        let mut errors = FieldErrors::new();
        errors.currency("currency", "EUR");
        assert!(errors.is_empty());
        errors.currency("currency", "eu");
        assert!(!errors.is_empty());
    }
}
