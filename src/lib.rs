//! zhelezo - Personal strength training log
//!
//! железо - "iron", what gets lifted

pub mod bot;
pub mod db;
pub mod ml;

pub use db::Database;
