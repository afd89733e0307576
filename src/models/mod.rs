pub mod dose;
pub mod enums;
pub mod medication;
pub mod patient;

pub use dose::*;
pub use enums::*;
pub use medication::*;
pub use patient::*;
