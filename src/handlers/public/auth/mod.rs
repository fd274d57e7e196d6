// handlers/public/auth/mod.rs - Token acquisition
//
// POST /api/auth/register  create a WORKER account and return a token
// POST /api/auth/login     exchange email + password for a token

pub mod login;
pub mod register;

pub use login::login_post;
pub use register::register_post;

use serde::Serialize;

use crate::database::models::User;

/// Body returned by both register and login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}
