/// Shared types used across the codebase

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse-grained permission tag carried by every identity and token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    Worker,
    OfficeAdmin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Manager, Role::Worker, Role::OfficeAdmin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Worker => "WORKER",
            Role::OfficeAdmin => "OFFICE_ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown role '{0}' (expected one of ADMIN, MANAGER, WORKER, OFFICE_ADMIN)")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "site_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SiteStatus {
    #[default]
    Planning,
    Active,
    Paused,
    Completed,
    Archived,
}

impl SiteStatus {
    pub const NAMES: &'static [&'static str] = &["PLANNING", "ACTIVE", "PAUSED", "COMPLETED", "ARCHIVED"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "operation_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
    OnHold,
    Cancelled,
}

impl OperationStatus {
    pub const NAMES: &'static [&'static str] = &["PLANNED", "IN_PROGRESS", "COMPLETED", "ON_HOLD", "CANCELLED"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "document_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    Form,
    Photo,
    Report,
    Certificate,
    SafetyPlan,
    Other,
}

impl DocumentType {
    pub const NAMES: &'static [&'static str] = &["FORM", "PHOTO", "REPORT", "CERTIFICATE", "SAFETY_PLAN", "OTHER"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "checklist_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChecklistStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

/// Parse the ISO-8601 shapes clients send: full RFC 3339, a naive
/// date-time (read as UTC) or a bare calendar date (midnight UTC).
pub fn parse_iso8601(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_round_trip_through_their_wire_names() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
            let json = serde_json::to_value(role).unwrap();
            assert_eq!(json, serde_json::Value::String(role.as_str().to_string()));
        }
        assert_eq!("office_admin".parse::<Role>().unwrap(), Role::OfficeAdmin);
        assert!("ROOT".parse::<Role>().is_err());
    }

    #[test]
    fn parses_iso8601_variants() {
        let full = parse_iso8601("2026-02-10T08:00:00Z").unwrap();
        assert_eq!(full.to_rfc3339(), "2026-02-10T08:00:00+00:00");

        let offset = parse_iso8601("2026-02-10T09:00:00+01:00").unwrap();
        assert_eq!(offset, full);

        let naive = parse_iso8601("2026-02-10T08:00:00").unwrap();
        assert_eq!(naive, full);

        let date = parse_iso8601("2026-02-10").unwrap();
        assert_eq!(date.to_rfc3339(), "2026-02-10T00:00:00+00:00");

        assert!(parse_iso8601("10/02/2026").is_none());
        assert!(parse_iso8601("").is_none());
    }
}
