pub mod appointment;
pub mod doctor;
pub mod enums;
pub mod medical_history;
pub mod user;

pub use appointment::*;
pub use doctor::*;
pub use enums::*;
pub use medical_history::*;
pub use user::*;
