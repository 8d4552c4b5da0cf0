//! Command handlers for the Prism CLI.

pub mod ask;
pub mod serve;
pub mod stats;
pub mod train;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use serve::ServeCommand;
pub use stats::StatsCommand;
pub use train::TrainCommand;
