pub mod exam;
pub mod health;
pub mod quiz;
