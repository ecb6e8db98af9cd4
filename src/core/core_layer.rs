// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "articles/mod.rs"]
pub mod articles;

#[path = "auth/mod.rs"]
pub mod auth;

#[path = "config/app_config.rs"]
pub mod config;
