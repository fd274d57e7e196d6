// handlers/mod.rs - Request handlers by access tier
//
// Public (no token) -> Protected (bearer token, optional role allow-list).
// Gates are attached per route in `app::router`; handlers assume they passed.

pub mod protected;
pub mod public;

use uuid::Uuid;

use crate::error::ApiError;

/// Path ids that are not UUIDs cannot name a stored record, so they are
/// reported the same way as unknown ids.
pub(crate) fn parse_id(raw: &str, entity: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(format!("{} not found", entity)))
}
