//! Caller-parameter validation over a raw JSON argument object.
//!
//! Each tool receives an untyped `serde_json::Value` from the host runtime.
//! [`ParamReader`] extracts fields, applies constraints (required, length
//! bounds, numeric ranges, enum membership), resolves defaults (caller value,
//! then an env-var fallback where declared, then the hard-coded default), and
//! collects every violation. [`ParamReader::finish`] converts the collected
//! violations into a single [`AdapterError::Validation`], so a caller sees
//! all of their mistakes at once. Validation never performs I/O beyond
//! reading environment variables for declared defaults.

use serde_json::Value;

use crate::error::{AdapterError, Result, Violation};
use crate::format::ResponseFormat;

/// Reads and validates fields out of one tool invocation's parameter bag.
pub struct ParamReader<'a> {
    params: &'a Value,
    violations: Vec<Violation>,
}

impl<'a> ParamReader<'a> {
    pub fn new(params: &'a Value) -> Self {
        Self {
            params,
            violations: Vec::new(),
        }
    }

    fn push(&mut self, field: &str, constraint: impl Into<String>) {
        let received = match self.params.get(field) {
            None | Some(Value::Null) => "missing".to_string(),
            Some(v) => v.to_string(),
        };
        self.violations.push(Violation {
            field: field.to_string(),
            constraint: constraint.into(),
            received,
        });
    }

    /// Raw string lookup; trims surrounding whitespace, treats empty as absent.
    fn raw_str(&self, field: &str) -> Option<String> {
        self.params
            .get(field)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    // -----------------------------------------------------------------------
    // Strings
    // -----------------------------------------------------------------------

    /// A required string field.
    pub fn required_str(&mut self, field: &str) -> Option<String> {
        let value = self.raw_str(field);
        if value.is_none() {
            self.push(field, "required");
        }
        value
    }

    /// A required string field with inclusive length bounds.
    pub fn required_str_bounded(
        &mut self,
        field: &str,
        min_len: usize,
        max_len: usize,
    ) -> Option<String> {
        let value = self.required_str(field)?;
        self.check_len(field, &value, min_len, max_len).then_some(value)
    }

    /// An optional string field; absent, null, or empty all count as unset.
    pub fn optional_str(&mut self, field: &str) -> Option<String> {
        self.raw_str(field)
    }

    /// An optional string field with an inclusive maximum length.
    pub fn optional_str_bounded(&mut self, field: &str, max_len: usize) -> Option<String> {
        let value = self.raw_str(field)?;
        self.check_len(field, &value, 0, max_len).then_some(value)
    }

    /// A string field with a hard-coded default.
    pub fn str_or(&mut self, field: &str, default: &str) -> String {
        self.raw_str(field).unwrap_or_else(|| default.to_string())
    }

    /// A string resolved from the caller value, then a named env var.
    pub fn str_or_env(&mut self, field: &str, env_var: &str) -> Option<String> {
        self.raw_str(field)
            .or_else(|| std::env::var(env_var).ok().filter(|s| !s.is_empty()))
    }

    fn check_len(&mut self, field: &str, value: &str, min_len: usize, max_len: usize) -> bool {
        let len = value.chars().count();
        if len < min_len {
            self.push(field, format!("length must be >= {min_len}"));
            false
        } else if len > max_len {
            self.push(field, format!("length must be <= {max_len}"));
            false
        } else {
            true
        }
    }

    // -----------------------------------------------------------------------
    // Numbers and booleans
    // -----------------------------------------------------------------------

    /// An integer with a default and an inclusive range.
    pub fn int_in_range(&mut self, field: &str, default: i64, min: i64, max: i64) -> i64 {
        match self.params.get(field) {
            None | Some(Value::Null) => default,
            Some(v) => match v.as_i64() {
                Some(n) if (min..=max).contains(&n) => n,
                Some(_) => {
                    self.push(field, format!("must be between {min} and {max}"));
                    default
                }
                None => {
                    self.push(field, "must be an integer");
                    default
                }
            },
        }
    }

    /// A float with a default and an inclusive range.
    pub fn float_in_range(&mut self, field: &str, default: f64, min: f64, max: f64) -> f64 {
        match self.params.get(field) {
            None | Some(Value::Null) => default,
            Some(v) => match v.as_f64() {
                Some(n) if n >= min && n <= max => n,
                Some(_) => {
                    self.push(field, format!("must be between {min} and {max}"));
                    default
                }
                None => {
                    self.push(field, "must be a number");
                    default
                }
            },
        }
    }

    /// An optional boolean field.
    pub fn optional_bool(&mut self, field: &str) -> Option<bool> {
        match self.params.get(field) {
            None | Some(Value::Null) => None,
            Some(v) => match v.as_bool() {
                Some(b) => Some(b),
                None => {
                    self.push(field, "must be a boolean");
                    None
                }
            },
        }
    }

    /// A boolean field with a default.
    pub fn bool_or(&mut self, field: &str, default: bool) -> bool {
        self.optional_bool(field).unwrap_or(default)
    }

    // -----------------------------------------------------------------------
    // Arrays and enumerations
    // -----------------------------------------------------------------------

    /// A required array of strings with inclusive size bounds.
    pub fn required_str_list(
        &mut self,
        field: &str,
        min_items: usize,
        max_items: usize,
    ) -> Option<Vec<String>> {
        match self.params.get(field) {
            None | Some(Value::Null) => {
                self.push(field, "required");
                None
            }
            Some(Value::Array(items)) => {
                if items.len() < min_items {
                    self.push(field, format!("must contain at least {min_items} item(s)"));
                    return None;
                }
                if items.len() > max_items {
                    self.push(field, format!("must contain at most {max_items} item(s)"));
                    return None;
                }
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item.as_str() {
                        Some(s) if !s.trim().is_empty() => out.push(s.trim().to_string()),
                        _ => {
                            self.push(field, "items must be non-empty strings");
                            return None;
                        }
                    }
                }
                Some(out)
            }
            Some(_) => {
                self.push(field, "must be an array of strings");
                None
            }
        }
    }

    /// An optional array of strings with an inclusive maximum size.
    pub fn optional_str_list(&mut self, field: &str, max_items: usize) -> Option<Vec<String>> {
        match self.params.get(field) {
            None | Some(Value::Null) => None,
            _ => self.required_str_list(field, 0, max_items),
        }
    }

    /// A closed string choice with a default; invalid values are violations.
    pub fn choice(&mut self, field: &str, allowed: &[&str], default: &str) -> String {
        match self.raw_str(field) {
            None => default.to_string(),
            Some(v) if allowed.contains(&v.as_str()) => v,
            Some(_) => {
                self.push(field, format!("must be one of: {}", allowed.join(", ")));
                default.to_string()
            }
        }
    }

    /// The shared `response_format` selector (default: markdown).
    pub fn response_format(&mut self) -> ResponseFormat {
        let value = self.choice("response_format", &["markdown", "json"], "markdown");
        ResponseFormat::parse(&value).unwrap_or(ResponseFormat::Markdown)
    }

    // -----------------------------------------------------------------------
    // Finalization
    // -----------------------------------------------------------------------

    /// Record an ad-hoc violation discovered outside the typed accessors.
    pub fn violation(&mut self, field: &str, constraint: impl Into<String>) {
        self.push(field, constraint);
    }

    /// Succeed if no constraint was violated, otherwise fail with every
    /// collected violation.
    pub fn finish(self, tool_name: &str) -> Result<()> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(AdapterError::Validation {
                tool_name: tool_name.to_string(),
                violations: self.violations,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_str_present() {
        let params = json!({"name": "  Review Q4 Budget  "});
        let mut reader = ParamReader::new(&params);
        assert_eq!(reader.required_str("name").as_deref(), Some("Review Q4 Budget"));
        assert!(reader.finish("t").is_ok());
    }

    #[test]
    fn required_str_missing_is_violation() {
        let params = json!({});
        let mut reader = ParamReader::new(&params);
        assert!(reader.required_str("name").is_none());
        let err = reader.finish("t").unwrap_err();
        assert!(err.user_message().contains("`name`: required"));
    }

    #[test]
    fn empty_string_counts_as_missing() {
        let params = json!({"name": "   "});
        let mut reader = ParamReader::new(&params);
        assert!(reader.required_str("name").is_none());
        assert!(reader.finish("t").is_err());
    }

    #[test]
    fn length_bounds_enforced() {
        let params = json!({"name": "abcdef"});
        let mut reader = ParamReader::new(&params);
        assert!(reader.required_str_bounded("name", 1, 3).is_none());
        let err = reader.finish("t").unwrap_err();
        assert!(err.user_message().contains("length must be <= 3"));
    }

    #[test]
    fn int_default_and_range() {
        let params = json!({"limit": 500});
        let mut reader = ParamReader::new(&params);
        assert_eq!(reader.int_in_range("limit", 50, 1, 100), 50);
        assert_eq!(reader.int_in_range("absent", 50, 1, 100), 50);
        assert!(reader.finish("t").is_err());
    }

    #[test]
    fn float_range_enforced() {
        let params = json!({"radius_miles": 120.0});
        let mut reader = ParamReader::new(&params);
        assert_eq!(reader.float_in_range("radius_miles", 10.0, 0.1, 50.0), 10.0);
        assert!(reader.finish("t").is_err());
    }

    #[test]
    fn choice_rejects_unknown_value() {
        let params = json!({"response_format": "yaml"});
        let mut reader = ParamReader::new(&params);
        assert_eq!(reader.response_format(), ResponseFormat::Markdown);
        let err = reader.finish("t").unwrap_err();
        assert!(err.user_message().contains("must be one of: markdown, json"));
    }

    #[test]
    fn choice_accepts_allowed_value() {
        let params = json!({"response_format": "json"});
        let mut reader = ParamReader::new(&params);
        assert_eq!(reader.response_format(), ResponseFormat::Json);
        assert!(reader.finish("t").is_ok());
    }

    #[test]
    fn str_list_bounds() {
        let params = json!({"place_types": ["hospital", "park"]});
        let mut reader = ParamReader::new(&params);
        let types = reader.required_str_list("place_types", 1, 10).unwrap();
        assert_eq!(types, vec!["hospital", "park"]);
        assert!(reader.finish("t").is_ok());

        let params = json!({"place_types": []});
        let mut reader = ParamReader::new(&params);
        assert!(reader.required_str_list("place_types", 1, 10).is_none());
        assert!(reader.finish("t").is_err());
    }

    #[test]
    fn all_violations_are_collected() {
        let params = json!({"limit": 0, "text": 7});
        let mut reader = ParamReader::new(&params);
        reader.required_str("workspace_gid");
        reader.int_in_range("limit", 50, 1, 100);
        reader.optional_str("text");
        let err = reader.finish("t").unwrap_err();
        let msg = err.user_message();
        assert!(msg.contains("`workspace_gid`"));
        assert!(msg.contains("`limit`"));
    }

    #[test]
    fn str_or_env_prefers_caller_value() {
        let params = json!({"workspace_gid": "123"});
        let mut reader = ParamReader::new(&params);
        assert_eq!(
            reader.str_or_env("workspace_gid", "CONCIERGE_TEST_UNSET_VAR"),
            Some("123".to_string())
        );
    }
}
