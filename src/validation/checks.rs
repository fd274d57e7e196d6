//! `custom` checks referenced from `#[validate(...)]` attributes. The
//! attribute supplies the message; the code here is only the error code.

use uuid::Uuid;
use validator::ValidationError;

use crate::types::{parse_iso8601, DocumentType, OperationStatus, SiteStatus};

fn check(ok: bool, code: &'static str) -> Result<(), ValidationError> {
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new(code))
    }
}

pub fn iso8601(value: &str) -> Result<(), ValidationError> {
    check(parse_iso8601(value).is_some(), "iso8601")
}

pub fn uuid(value: &str) -> Result<(), ValidationError> {
    check(Uuid::parse_str(value).is_ok(), "uuid")
}

/// At least one lowercase letter, one uppercase letter and one digit
pub fn password_complexity(value: &str) -> Result<(), ValidationError> {
    let ok = value.chars().any(|c| c.is_ascii_lowercase())
        && value.chars().any(|c| c.is_ascii_uppercase())
        && value.chars().any(|c| c.is_ascii_digit());
    check(ok, "password_complexity")
}

pub fn site_status(value: &str) -> Result<(), ValidationError> {
    check(SiteStatus::NAMES.contains(&value), "site_status")
}

pub fn operation_status(value: &str) -> Result<(), ValidationError> {
    check(OperationStatus::NAMES.contains(&value), "operation_status")
}

pub fn document_type(value: &str) -> Result<(), ValidationError> {
    check(DocumentType::NAMES.contains(&value), "document_type")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_needs_mixed_case_and_a_digit() {
        assert!(password_complexity("Str0ngPass").is_ok());
        assert!(password_complexity("alllowercase1").is_err());
        assert!(password_complexity("NoDigitsHere").is_err());
    }

    #[test]
    fn enum_names_are_case_sensitive() {
        assert!(site_status("ACTIVE").is_ok());
        assert!(site_status("active").is_err());
        assert!(operation_status("IN_PROGRESS").is_ok());
        assert!(document_type("SAFETY_PLAN").is_ok());
        assert!(document_type("").is_err());
    }

    #[test]
    fn formats() {
        assert!(iso8601("2024-03-01T08:00:00Z").is_ok());
        assert!(iso8601("yesterday").is_err());
        assert!(uuid("7d3f0d56-7f8e-4d8a-9a55-0d6b0e1d2c3a").is_ok());
        assert_eq!(uuid("42").unwrap_err().code, "uuid");
    }
}
