// Token store implementations.

#[cfg(test)]
pub mod in_memory;
pub mod json_token_store;

#[cfg(test)]
pub use in_memory::InMemoryTokenStore;
pub use json_token_store::JsonTokenStore;
