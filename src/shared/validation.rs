//! Validation Utilities

use validator::{Validate, ValidationError, ValidationErrors};

use super::error::{AppError, FieldError};
use super::snowflake;

/// Convert validation errors to AppError
pub fn validation_error(errors: ValidationErrors) -> AppError {
    let mut field_errors: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| FieldError {
                field: field.to_string(),
                message: e
                    .message
                    .clone()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            })
        })
        .collect();
    field_errors.sort_by(|a, b| a.field.cmp(&b.field));

    let message = field_errors
        .first()
        .map(|e| format!("{}: {}", e.field, e.message))
        .unwrap_or_else(|| "Validation failed".into());

    AppError::Validation(message)
}

/// Validate a request body, mapping failures to a 400.
pub fn validate_body<T: Validate>(body: &T) -> Result<(), AppError> {
    body.validate().map_err(validation_error)
}

/// Parse a snowflake id taken from a path segment or a body field.
pub fn parse_id(value: &str, field: &str) -> Result<i64, AppError> {
    snowflake::from_string(value)
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid {}", field)))
}

/// Parse a list of snowflake ids.
pub fn parse_ids(values: &[String], field: &str) -> Result<Vec<i64>, AppError> {
    values.iter().map(|v| parse_id(v, field)).collect()
}

/// `validator` custom check: every element is a positive integer string.
pub fn validate_id_list(values: &[String]) -> Result<(), ValidationError> {
    if values.iter().all(|v| snowflake::from_string(v).map(|id| id > 0).unwrap_or(false)) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_id").with_message("must contain numeric ids".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct SampleBody {
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
        #[validate(custom(function = "validate_id_list"))]
        room_ids: Vec<String>,
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("123", "id").unwrap(), 123);
        assert!(matches!(parse_id("x", "room id"), Err(AppError::BadRequest(m)) if m == "Invalid room id"));
        assert!(parse_id("-5", "id").is_err());
    }

    #[test]
    fn test_validation_error_names_first_field() {
        let body = SampleBody {
            name: String::new(),
            room_ids: vec!["abc".into()],
        };
        let err = validate_body(&body).unwrap_err();
        match err {
            AppError::Validation(msg) => assert_eq!(msg, "name: Name is required"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_id_list_validation() {
        tokio_test::assert_ok!(validate_id_list(&["1".to_string(), "2".to_string()]));
        tokio_test::assert_err!(validate_id_list(&["1".to_string(), "two".to_string()]));
    }
}
