pub mod client;
pub mod key_pool;
pub mod retry;

pub use client::{CompletionBackend, GenerationClient, GenerationError};
pub use key_pool::{ApiKey, KeyPool, KeyPoolError};
