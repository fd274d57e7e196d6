use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::AuthUser;
use crate::error::ApiError;
use crate::types::Role;

/// Allow-list of roles for a route. Applied after [`super::authenticate`].
#[derive(Debug, Clone, Copy)]
pub struct RoleGate {
    allowed: &'static [Role],
}

impl RoleGate {
    pub const fn new(allowed: &'static [Role]) -> Self {
        Self { allowed }
    }

    pub fn permits(&self, identity: Option<&AuthUser>) -> bool {
        identity.is_some_and(|user| self.allowed.contains(&user.role))
    }
}

pub async fn authorize(State(gate): State<RoleGate>, request: Request, next: Next) -> Result<Response, ApiError> {
    let identity = request.extensions().get::<AuthUser>();
    if !gate.permits(identity) {
        tracing::warn!(
            path = %request.uri().path(),
            role = identity.map(|user| user.role.as_str()).unwrap_or("none"),
            "Rejected request for role outside allow-list"
        );
        return Err(ApiError::forbidden("Unauthorized role"));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "someone@asm.local".to_string(),
            role,
        }
    }

    #[test]
    fn permits_listed_roles_only() {
        let gate = RoleGate::new(&[Role::Admin, Role::Manager]);
        assert!(gate.permits(Some(&user(Role::Admin))));
        assert!(gate.permits(Some(&user(Role::Manager))));
        assert!(!gate.permits(Some(&user(Role::Worker))));
        assert!(!gate.permits(Some(&user(Role::OfficeAdmin))));
    }

    #[test]
    fn missing_identity_is_refused() {
        let gate = RoleGate::new(&Role::ALL);
        assert!(!gate.permits(None));
    }
}
