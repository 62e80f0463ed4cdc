pub mod outbox;
pub mod patients;
