//! Outbox vocabulary: delivery channels and entry status.
//!
//! Storage format for both enums is the upper-case name (`"EMAIL"`,
//! `"PENDING"`, ...).

use std::fmt;
use std::str::FromStr;

/// Value found in storage that does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// How an outbox message is delivered.
///
/// Only `Email` has a delivery handler today. `Sms` can be stored but the
/// worker leaves such entries pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutboxChannel {
    Email,
    Sms,
}

impl OutboxChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
            Self::Sms => "SMS",
        }
    }
}

impl fmt::Display for OutboxChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutboxChannel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EMAIL" => Ok(Self::Email),
            "SMS" => Ok(Self::Sms),
            other => Err(UnknownVariant {
                kind: "outbox channel",
                value: other.to_owned(),
            }),
        }
    }
}

/// Delivery state of an outbox entry.
///
/// `Pending` is the only non-terminal state. An entry moves to `Sent` or
/// `Failed` once and is never picked up again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutboxStatus {
    Pending,
    Sent,
    Failed,
}

impl OutboxStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Sent => "SENT",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutboxStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "SENT" => Ok(Self::Sent),
            "FAILED" => Ok(Self::Failed),
            other => Err(UnknownVariant {
                kind: "outbox status",
                value: other.to_owned(),
            }),
        }
    }
}
