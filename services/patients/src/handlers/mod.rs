pub mod health;
pub mod patient;
