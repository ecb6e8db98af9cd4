pub mod ai_service;
pub mod models;
pub mod prompt;

pub use ai_service::{AiProvider, ArticleGenerator};
pub use models::{AiConfig, AiMessage};
