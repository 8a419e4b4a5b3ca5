// Declare the modules to re-export
pub mod core;

// Re-export everything
pub use self::core::*;
