//! Declarative per-property validation rules.

use crate::driver::Record;
use crate::model::ValidationErrors;
use regex::Regex;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Format {
    Email,
    Uuid,
}

#[derive(Clone, Debug, Default)]
pub struct Rule {
    pub required: bool,
    pub format: Option<Format>,
    pub max_length: Option<u32>,
    pub min_length: Option<u32>,
    pub pattern: Option<String>,
    pub allowed: Option<Vec<Value>>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

impl Rule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn length(mut self, min: u32, max: u32) -> Self {
        self.min_length = Some(min);
        self.max_length = Some(max);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn allowed(mut self, values: Vec<Value>) -> Self {
        self.allowed = Some(values);
        self
    }

    pub fn range(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }
}

/// Check a rendered model against its rules; every failing property adds one error.
pub fn check(record: &Record, rules: &[(&str, Rule)], errors: &mut ValidationErrors) {
    for (field, rule) in rules {
        let value = record.get(*field).filter(|v| !v.is_null());
        match value {
            None if rule.required => errors.add_for(*field, format!("{} is required", field)),
            None => {}
            Some(v) => {
                if let Err(message) = check_value(field, v, rule) {
                    errors.add_for(*field, message);
                }
            }
        }
    }
}

fn check_value(field: &str, v: &Value, rule: &Rule) -> Result<(), String> {
    if let Some(format) = &rule.format {
        check_format(field, v, format)?;
    }
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = rule.max_length {
            if len > max as usize {
                return Err(format!("{} must be at most {} characters", field, max));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min as usize {
                return Err(format!("{} must be at least {} characters", field, min));
            }
        }
        if let Some(pattern) = &rule.pattern {
            let re = Regex::new(pattern).map_err(|_| format!("invalid pattern for {}", field))?;
            if !re.is_match(s) {
                return Err(format!("{} does not match required pattern", field));
            }
        }
    }
    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            return Err(format!(
                "{} must be one of: {:?}",
                field,
                allowed.iter().take(5).collect::<Vec<_>>()
            ));
        }
    }
    if let Some(n) = v.as_f64() {
        if let Some(min) = rule.minimum {
            if n < min {
                return Err(format!("{} must be at least {}", field, min));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Err(format!("{} must be at most {}", field, max));
            }
        }
    }
    Ok(())
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn check_format(field: &str, v: &Value, format: &Format) -> Result<(), String> {
    let Some(s) = v.as_str() else { return Ok(()) };
    match format {
        Format::Email => {
            if !s.contains('@') || s.len() < 3 {
                return Err(format!("{} must be a valid email", field));
            }
        }
        Format::Uuid => {
            if uuid::Uuid::parse_str(s).is_err() {
                return Err(format!("{} must be a valid UUID", field));
            }
        }
    }
    Ok(())
}
