//! Repository layer: entity-scoped database operations.
//!
//! One sub-module per table. All public functions are re-exported here.

mod appointment;
mod doctor;
mod medical_history;
mod user;

pub use appointment::*;
pub use doctor::*;
pub use medical_history::*;
pub use user::*;
