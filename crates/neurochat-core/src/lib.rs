pub mod classifier;
pub mod config;
pub mod context;
pub mod conversation;
pub mod explanation;
pub mod session;

pub use classifier::*;
pub use config::*;
pub use context::*;
pub use conversation::*;
pub use explanation::*;
pub use session::*;
