//! Newtype wrappers for domain identifiers.

use std::fmt;

use uuid::Uuid;

/// Identifies a registered patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatientId(pub Uuid);

impl PatientId {
    /// Fresh time-ordered id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for PatientId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Identifies one outbox entry (a single message awaiting delivery).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutboxEntryId(pub Uuid);

impl OutboxEntryId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for OutboxEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for OutboxEntryId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}
