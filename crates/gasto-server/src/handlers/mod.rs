//! Request handlers, one submodule per API area

pub mod categories;
pub mod expenses;
pub mod health;
pub mod reports;

// Flat re-export so the router reads as handlers::<name>
pub use categories::*;
pub use expenses::*;
pub use health::*;
pub use reports::*;
