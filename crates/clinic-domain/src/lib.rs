//! Domain types shared by Clinic services.
//!
//! Pure types only, no framework dependencies. Import from `usecase/` and
//! `domain/` layers; `infra/` maps these to and from storage rows.

pub mod id;
pub mod outbox;
pub mod patient;
