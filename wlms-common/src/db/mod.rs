//! Database models, schema and shared write helpers

pub mod init;
pub mod models;
pub mod retry;
pub mod seed;

pub use init::*;
pub use models::*;
pub use retry::retry_on_lock;
pub use seed::*;
