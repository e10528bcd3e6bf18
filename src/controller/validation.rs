//! Request validation from per-field rules.

use crate::error::AppError;
use crate::model::ValidationRule;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a create body: required fields must be present and non-null.
    pub fn validate(
        body: &Map<String, Value>,
        rules: &HashMap<String, ValidationRule>,
    ) -> Result<(), AppError> {
        for (field, rule) in rules {
            let val = body.get(field);
            if rule.required == Some(true) && matches!(val, None | Some(Value::Null)) {
                return Err(AppError::Validation(format!("{} is required", field)));
            }
            if let Some(v) = val {
                validate_field(field, v, rule)?;
            }
        }
        Ok(())
    }

    /// Validate a merge patch: only the fields present are checked,
    /// required is not enforced for absent fields.
    pub fn validate_partial(
        body: &Map<String, Value>,
        rules: &HashMap<String, ValidationRule>,
    ) -> Result<(), AppError> {
        for (field, v) in body {
            if let Some(rule) = rules.get(field) {
                if rule.required == Some(true) && v.is_null() {
                    return Err(AppError::Validation(format!("{} is required", field)));
                }
                validate_field(field, v, rule)?;
            }
        }
        Ok(())
    }
}

fn validate_field(field: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    if let Some(format) = &rule.format {
        validate_format(field, v, format)?;
    }
    if let Some(max) = rule.max_length {
        if let Some(s) = v.as_str() {
            if s.len() > max as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at most {} characters",
                    field, max
                )));
            }
        }
    }
    if let Some(min) = rule.min_length {
        if let Some(s) = v.as_str() {
            if s.len() < min as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at least {} characters",
                    field, min
                )));
            }
        }
    }
    if let Some(pattern) = &rule.pattern {
        let re = Regex::new(pattern)
            .map_err(|_| AppError::Validation(format!("invalid pattern for {}", field)))?;
        if let Some(s) = v.as_str() {
            if !re.is_match(s) {
                return Err(AppError::Validation(format!(
                    "{} does not match required pattern",
                    field
                )));
            }
        }
    }
    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            return Err(AppError::Validation(format!(
                "{} must be one of: {:?}",
                field,
                allowed.iter().take(5).collect::<Vec<_>>()
            )));
        }
    }
    if let Some(min) = rule.minimum {
        if let Some(n) = v.as_f64() {
            if n < min {
                return Err(AppError::Validation(format!(
                    "{} must be at least {}",
                    field, min
                )));
            }
        }
    }
    if let Some(max) = rule.maximum {
        if let Some(n) = v.as_f64() {
            if n > max {
                return Err(AppError::Validation(format!(
                    "{} must be at most {}",
                    field, max
                )));
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

fn validate_format(field: &str, v: &Value, format: &str) -> Result<(), AppError> {
    match format.to_lowercase().as_str() {
        "email" => {
            if let Some(s) = v.as_str() {
                if !s.contains('@') || s.len() < 3 {
                    return Err(AppError::Validation(format!(
                        "{} must be a valid email",
                        field
                    )));
                }
            }
        }
        "uuid" => {
            if let Some(s) = v.as_str() {
                if uuid::Uuid::parse_str(s).is_err() {
                    return Err(AppError::Validation(format!(
                        "{} must be a valid UUID",
                        field
                    )));
                }
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules() -> HashMap<String, ValidationRule> {
        let mut m = HashMap::new();
        m.insert("title".to_string(), ValidationRule::required());
        m.insert(
            "email".to_string(),
            ValidationRule::required().with_format("email"),
        );
        m
    }

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn missing_required_field_fails() {
        let err = RequestValidator::validate(&body(json!({"email": "a@x.com"})), &rules())
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn malformed_email_fails() {
        let err = RequestValidator::validate(
            &body(json!({"title": "t", "email": "not-an-email"})),
            &rules(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("valid email"));
    }

    #[test]
    fn partial_skips_absent_required_fields() {
        RequestValidator::validate_partial(&body(json!({"title": "t"})), &rules()).unwrap();
    }

    #[test]
    fn partial_rejects_nulling_a_required_field() {
        let err =
            RequestValidator::validate_partial(&body(json!({"title": null})), &rules()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
