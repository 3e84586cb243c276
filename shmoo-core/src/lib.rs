pub mod chain;
pub mod display;
pub mod events;
pub mod generator;
pub mod repository;
pub mod retention;
pub mod stats;

// Re-export main components
pub use chain::*;
pub use display::*;
pub use events::*;
pub use generator::*;
pub use repository::*;
pub use retention::*;
pub use stats::*;
