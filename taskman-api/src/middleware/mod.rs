/// Middleware modules for the API server
///
/// Authentication lives in `taskman_shared::auth::middleware` and is wired
/// up in `app`; this module holds the response-side layers.

pub mod security;
