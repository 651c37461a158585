//! Validation helpers for DTOs.

use serde_json::Value;
use validator::ValidationError;

/// Rejects strings made only of whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Parse a play-time increment given either as a JSON number or a numeric string.
///
/// ```ignore
/// parse_hours(&json!(0.5))    // Ok(0.5)
/// parse_hours(&json!("0.25")) // Ok(0.25)
/// parse_hours(&json!(0))      // Err - not positive
/// ```
pub fn parse_hours(value: &Value) -> Result<f64, ValidationError> {
    let hours = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    match hours {
        Some(hours) if hours.is_finite() && hours > 0.0 => Ok(hours),
        Some(_) => {
            let mut err = ValidationError::new("hours_range");
            err.message = Some("hours must be a positive finite number".into());
            Err(err)
        }
        None => {
            let mut err = ValidationError::new("hours_type");
            err.message = Some("hours must be a number".into());
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn blank_strings_are_rejected() {
        assert!(validate_not_blank("great game").is_ok());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank("  \n\t").is_err());
    }

    #[test]
    fn hours_accept_numbers_and_numeric_strings() {
        assert_eq!(parse_hours(&json!(0.5)).unwrap(), 0.5);
        assert_eq!(parse_hours(&json!(2)).unwrap(), 2.0);
        assert_eq!(parse_hours(&json!(" 0.25 ")).unwrap(), 0.25);
    }

    #[test]
    fn hours_reject_non_positive_and_garbage() {
        assert!(parse_hours(&json!(0)).is_err());
        assert!(parse_hours(&json!(-1.5)).is_err());
        assert!(parse_hours(&json!("abc")).is_err());
        assert!(parse_hours(&json!("NaN")).is_err());
        assert!(parse_hours(&json!("inf")).is_err());
        assert!(parse_hours(&json!(null)).is_err());
        assert!(parse_hours(&json!([1])).is_err());
    }
}
