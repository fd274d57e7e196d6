//! Request validation.
//!
//! Request forms derive [`validator::Validate`]. Their fields are read
//! leniently (see [`input`]), trimmed where the form says so, and checked as a
//! whole: every failing field is reported, in the form's declared field
//! order, so clients get the complete list in one response.

pub mod checks;
pub mod extract;
pub mod input;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{ApiError, FieldError};

pub use extract::{ValidatedJson, ValidatedQuery};

/// A validated request body or query
pub trait RequestForm: DeserializeOwned + Validate {
    /// Wire names in declaration order; errors are reported in this order
    const FIELDS: &'static [&'static str];
}

/// Deserialize then validate. Non-object input is treated as an empty object.
pub fn parse_validated<T: RequestForm>(raw: Value) -> Result<T, ApiError> {
    let raw = if raw.is_object() { raw } else { Value::Object(Map::new()) };
    let form: T =
        serde_json::from_value(raw).map_err(|e| ApiError::bad_request(format!("Invalid request payload: {}", e)))?;
    form.validate()
        .map_err(|errors| ApiError::ValidationFailed(collect_errors(&errors, T::FIELDS)))?;
    Ok(form)
}

/// Flatten `validator`'s per-field map into wire-named errors ordered by `order`
pub fn collect_errors(errors: &ValidationErrors, order: &[&str]) -> Vec<FieldError> {
    let mut fields: Vec<(usize, String, Vec<String>)> = errors
        .field_errors()
        .into_iter()
        .map(|(field, failures)| {
            let name = camel_case(field);
            let rank = order.iter().position(|f| *f == name).unwrap_or(order.len());
            (rank, name, failures.iter().map(message_of).collect())
        })
        .collect();
    fields.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));

    fields
        .into_iter()
        .flat_map(|(_, name, messages)| {
            messages
                .into_iter()
                .map(move |message| FieldError::new(name.clone(), message))
        })
        .collect()
}

fn message_of(error: &ValidationError) -> String {
    error
        .message
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| error.code.to_string())
}

/// `workers_count` -> `workersCount`
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    struct Shift {
        #[serde(default, deserialize_with = "input::trimmed")]
        #[validate(length(min = 1, message = "Crew name is required"))]
        crew_name: String,
        #[serde(default, deserialize_with = "input::text")]
        #[validate(
            length(min = 8, message = "too short"),
            custom(function = "checks::password_complexity", message = "too simple")
        )]
        passcode: String,
        #[serde(default, deserialize_with = "input::optional_int")]
        #[validate(range(min = 1, message = "Workers count must be at least 1"))]
        workers_count: Option<i64>,
    }

    impl RequestForm for Shift {
        const FIELDS: &'static [&'static str] = &["crewName", "passcode", "workersCount"];
    }

    fn fields(result: Result<Shift, ApiError>) -> Vec<FieldError> {
        match result {
            Err(ApiError::ValidationFailed(errors)) => errors,
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn camel_cases_field_names() {
        assert_eq!(camel_case("workers_count"), "workersCount");
        assert_eq!(camel_case("email"), "email");
        assert_eq!(camel_case("recorded_by"), "recordedBy");
    }

    #[test]
    fn reports_every_failure_in_declared_order() {
        let errors = fields(parse_validated(json!({ "passcode": "abc", "crewName": "   ", "workersCount": 0 })));
        let names: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(names, ["crewName", "passcode", "passcode", "workersCount"]);
        assert!(errors.contains(&FieldError::new("passcode", "too simple")));
        assert!(errors.contains(&FieldError::new("workersCount", "Workers count must be at least 1")));
    }

    #[test]
    fn non_integers_fail_the_range_check() {
        let errors = fields(parse_validated(json!({ "crewName": "A", "passcode": "Str0ngPass", "workersCount": "four" })));
        assert_eq!(errors, vec![FieldError::new("workersCount", "Workers count must be at least 1")]);
    }

    #[test]
    fn non_objects_validate_as_empty() {
        let errors = fields(parse_validated(Value::Null));
        assert_eq!(errors[0], FieldError::new("crewName", "Crew name is required"));
    }

    #[test]
    fn accepted_forms_keep_sanitized_values() {
        let shift: Shift = parse_validated(json!({ "crewName": " Night ", "passcode": "Str0ngPass", "workersCount": "4" })).unwrap();
        assert_eq!(shift.crew_name, "Night");
        assert_eq!(shift.workers_count, Some(4));
    }
}
