//! Typed coercion of user input against a declared parameter.
//!
//! Values outside the declared range are rejected, never clamped.
//!
//! ```rust
//! use kcatalog::{ParamType, Parameter};
//!
//! let steps = Parameter::new("steps", ParamType::Integer).with_range(Some(1.0), Some(50.0));
//!
//! assert_eq!(steps.coerce_text(" 28 ").expect("in range"), serde_json::json!(28));
//! assert!(steps.coerce_text("51").is_err());
//! assert!(steps.coerce_text("twenty").is_err());
//! ```

use serde_json::{Number, Value};

use crate::error::ParameterError;
use crate::model::{ParamType, Parameter};

impl Parameter {
    /// Coerces raw text typed by a user.
    pub fn coerce_text(&self, raw: &str) -> Result<Value, ParameterError> {
        let raw = raw.trim();
        match self.param_type {
            ParamType::Integer => {
                let value = raw.parse::<i64>().map_err(|_| {
                    ParameterError::wrong_type(&self.name, format!("'{raw}' is not a whole number"))
                })?;
                self.check_range(value as f64)?;
                self.check_option(&value.to_string())?;
                Ok(Value::from(value))
            }
            ParamType::Number => {
                let value = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite())
                    .ok_or_else(|| {
                        ParameterError::wrong_type(&self.name, format!("'{raw}' is not a number"))
                    })?;
                self.check_range(value)?;
                self.check_option(raw)?;
                number_value(&self.name, value)
            }
            ParamType::String => {
                self.check_option(raw)?;
                Ok(Value::String(raw.to_string()))
            }
        }
    }

    /// Coerces a stored, untyped value. Text is parsed the same way as typed input.
    pub fn coerce_value(&self, value: &Value) -> Result<Value, ParameterError> {
        match (self.param_type, value) {
            (_, Value::String(text)) => self.coerce_text(text),
            (ParamType::Integer, Value::Number(number)) => {
                let integer = number
                    .as_i64()
                    .or_else(|| {
                        number
                            .as_f64()
                            .filter(|float| float.fract() == 0.0 && float.abs() < i64::MAX as f64)
                            .map(|float| float as i64)
                    })
                    .ok_or_else(|| {
                        ParameterError::wrong_type(
                            &self.name,
                            format!("{number} is not a whole number"),
                        )
                    })?;
                self.check_range(integer as f64)?;
                self.check_option(&integer.to_string())?;
                Ok(Value::from(integer))
            }
            (ParamType::Number, Value::Number(number)) => {
                let float = number.as_f64().ok_or_else(|| {
                    ParameterError::wrong_type(&self.name, format!("{number} is not a number"))
                })?;
                self.check_range(float)?;
                Ok(Value::Number(number.clone()))
            }
            (ParamType::String, Value::Number(number)) => self.coerce_text(&number.to_string()),
            (ParamType::String, Value::Bool(flag)) => self.coerce_text(&flag.to_string()),
            (_, other) => Err(ParameterError::wrong_type(
                &self.name,
                format!("unsupported value {other}"),
            )),
        }
    }

    fn check_range(&self, value: f64) -> Result<(), ParameterError> {
        let below = self.min.is_some_and(|min| value < min);
        let above = self.max.is_some_and(|max| value > max);
        if below || above {
            return Err(ParameterError::out_of_range(
                &self.name,
                format!(
                    "{value} is outside {}..={}",
                    bound(self.min),
                    bound(self.max)
                ),
            ));
        }
        Ok(())
    }

    fn check_option(&self, raw: &str) -> Result<(), ParameterError> {
        if self.options.is_empty() || self.options.iter().any(|option| option == raw) {
            return Ok(());
        }
        Err(ParameterError::not_an_option(
            &self.name,
            format!("'{raw}' is not one of {}", self.options.join(", ")),
        ))
    }
}

fn number_value(name: &str, value: f64) -> Result<Value, ParameterError> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| ParameterError::wrong_type(name, format!("{value} is not representable")))
}

fn bound(limit: Option<f64>) -> String {
    limit.map(|value| value.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ParameterErrorKind;

    fn guidance() -> Parameter {
        Parameter::new("guidance", ParamType::Number).with_range(Some(0.0), Some(10.0))
    }

    #[test]
    fn integer_input_rejects_fractions_and_out_of_range_values() {
        let seed = Parameter::new("seed", ParamType::Integer).with_range(Some(0.0), Some(100.0));

        assert_eq!(seed.coerce_text("42").expect("valid integer"), json!(42));
        let err = seed.coerce_text("4.2").expect_err("fraction must fail");
        assert_eq!(err.kind, ParameterErrorKind::WrongType);
        let err = seed.coerce_text("-1").expect_err("below min must fail");
        assert_eq!(err.kind, ParameterErrorKind::OutOfRange);
        assert_eq!(err.parameter, "seed");
    }

    #[test]
    fn number_input_accepts_decimals_and_rejects_non_finite() {
        assert_eq!(guidance().coerce_text("3.5").expect("valid number"), json!(3.5));
        let err = guidance().coerce_text("NaN").expect_err("NaN must fail");
        assert_eq!(err.kind, ParameterErrorKind::WrongType);
        let err = guidance().coerce_text("10.01").expect_err("above max must fail");
        assert_eq!(err.kind, ParameterErrorKind::OutOfRange);
    }

    #[test]
    fn string_input_must_match_declared_options() {
        let format = Parameter::new("output_format", ParamType::String).with_options(["png", "webp"]);
        let free = Parameter::new("negative_prompt", ParamType::String);

        assert_eq!(format.coerce_text("webp").expect("known option"), json!("webp"));
        let err = format.coerce_text("gif").expect_err("unknown option must fail");
        assert_eq!(err.kind, ParameterErrorKind::NotAnOption);
        assert_eq!(free.coerce_text(" blurry ").expect("free text"), json!("blurry"));
    }

    #[test]
    fn integer_options_are_matched_after_parsing() {
        let steps = Parameter::new("steps", ParamType::Integer).with_options(["4", "8"]);
        assert_eq!(steps.coerce_text("8").expect("listed option"), json!(8));
        assert!(steps.coerce_text("6").is_err());
    }

    #[test]
    fn stored_values_are_coerced_by_declared_type() {
        let seed = Parameter::new("seed", ParamType::Integer);

        assert_eq!(seed.coerce_value(&json!(7.0)).expect("whole float"), json!(7));
        assert_eq!(seed.coerce_value(&json!("7")).expect("numeric text"), json!(7));
        assert!(seed.coerce_value(&json!(7.5)).is_err());
        assert!(seed.coerce_value(&json!([7])).is_err());

        let label = Parameter::new("label", ParamType::String);
        assert_eq!(label.coerce_value(&json!(3)).expect("number as text"), json!("3"));
        assert_eq!(guidance().coerce_value(&json!(2)).expect("integer as number"), json!(2));
    }
}
