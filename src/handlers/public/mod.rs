// handlers/public/mod.rs - Handlers reachable without a bearer token
//
// Only token acquisition lives here. Both routes sit in the strict rate
// class to slow down credential guessing.

pub mod auth;
