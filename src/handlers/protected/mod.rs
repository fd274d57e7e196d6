// handlers/protected/mod.rs - Handlers behind the bearer token gate
//
// Every route here runs after `authenticate`, so an `AuthUser` is always in
// the request extensions. Role allow-lists are applied per route in `app`.

pub mod auth;
pub mod checklists;
pub mod dashboard;
pub mod documents;
pub mod operations;
pub mod sites;
