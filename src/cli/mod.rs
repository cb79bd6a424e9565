//! CLI command implementations

mod context;
pub mod group;
pub mod init;
pub mod material;
pub mod progress;
pub mod session;
pub mod stats;
pub mod subject;
pub mod theme;

pub use context::AppContext;
