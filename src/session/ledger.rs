// ABOUTME: Outbound acknowledgement ledger mapping request sequence numbers to caller message ids
// ABOUTME: Also tracks inbound submissions awaiting their response to catch duplicate responses

use crate::datatypes::CommandStatus;
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

/// Opaque, caller assigned identifier of a logical message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Concatenation reference tag: the leading digits of the last two
    /// characters of the id, 0 when there are none.
    ///
    /// `"msg-1042"` tags as 42, `"7"` as 7, `"ab"` as 0.
    pub fn reference_tag(&self) -> u8 {
        let chars: Vec<char> = self.0.chars().collect();
        let tail = &chars[chars.len().saturating_sub(2)..];
        tail.iter()
            .map_while(|c| c.to_digit(10))
            .fold(0u8, |tag, digit| tag * 10 + digit as u8)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for MessageId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// An acknowledgement arrived for a sequence number with no ledger entry.
///
/// Non-fatal: reported, and the session carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Acknowledgement for sequence number {sequence_number} has no outstanding message")]
pub struct OrphanAcknowledgement {
    pub sequence_number: u32,
}

/// How the peer answered one outstanding request.
#[derive(Debug, Clone, PartialEq)]
pub enum Acknowledgement {
    Accepted {
        sequence_number: u32,
        message_id: MessageId,
        /// Identifier the peer assigned, empty when it sent none
        remote_message_id: String,
    },
    Rejected {
        sequence_number: u32,
        message_id: MessageId,
        status: CommandStatus,
    },
}

impl Acknowledgement {
    pub fn message_id(&self) -> &MessageId {
        match self {
            Acknowledgement::Accepted { message_id, .. }
            | Acknowledgement::Rejected { message_id, .. } => message_id,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Acknowledgement::Accepted { .. })
    }
}

/// Messages written to the peer and still awaiting acknowledgement.
///
/// Several sequence numbers may map to the same message id (one per part of
/// a concatenated message); each is resolved independently. Nothing expires
/// on its own, see [`OutboundLedger::drain_unresolved`].
#[derive(Debug, Default)]
pub struct OutboundLedger {
    entries: HashMap<u32, MessageId>,
}

impl OutboundLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a written request; an existing entry for the same sequence number is replaced
    pub fn record(&mut self, sequence_number: u32, message_id: MessageId) {
        if let Some(previous) = self.entries.insert(sequence_number, message_id) {
            tracing::warn!(
                "sequence number {} reused while message {} was outstanding",
                sequence_number,
                previous
            );
        }
    }

    /// Remove and return the entry for `sequence_number`
    pub fn acknowledge(&mut self, sequence_number: u32) -> Result<MessageId, OrphanAcknowledgement> {
        self.entries
            .remove(&sequence_number)
            .ok_or(OrphanAcknowledgement { sequence_number })
    }

    /// Resolve the entry for a response carrying `status`.
    ///
    /// The entry is removed whether the peer accepted or rejected it.
    pub fn resolve(
        &mut self,
        sequence_number: u32,
        status: CommandStatus,
        remote_message_id: &str,
    ) -> Result<Acknowledgement, OrphanAcknowledgement> {
        let message_id = self.acknowledge(sequence_number)?;
        Ok(if status.is_ok() {
            Acknowledgement::Accepted {
                sequence_number,
                message_id,
                remote_message_id: remote_message_id.to_string(),
            }
        } else {
            Acknowledgement::Rejected {
                sequence_number,
                message_id,
                status,
            }
        })
    }

    pub fn contains(&self, sequence_number: u32) -> bool {
        self.entries.contains_key(&sequence_number)
    }

    /// Message id awaiting the acknowledgement of `sequence_number`
    pub fn get(&self, sequence_number: u32) -> Option<&MessageId> {
        self.entries.get(&sequence_number)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take every unresolved entry, ordered by sequence number.
    ///
    /// Unbind leaves entries in place; an external sweep reclaims them here.
    pub fn drain_unresolved(&mut self) -> Vec<(u32, MessageId)> {
        let mut drained: Vec<_> = self.entries.drain().collect();
        drained.sort_by_key(|(sequence_number, _)| *sequence_number);
        drained
    }
}

/// Sequence numbers of inbound requests whose response is not yet written
#[derive(Debug, Default)]
pub struct PendingSet {
    sequence_numbers: HashSet<u32>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `sequence_number` as awaiting our response. A duplicate is
    /// logged and leaves a single entry.
    pub fn begin(&mut self, sequence_number: u32) {
        if !self.sequence_numbers.insert(sequence_number) {
            tracing::warn!(
                "inbound sequence number {} is already awaiting a response",
                sequence_number
            );
        }
    }

    /// Returns false when nothing was pending for the sequence number
    pub fn complete(&mut self, sequence_number: u32) -> bool {
        self.sequence_numbers.remove(&sequence_number)
    }

    pub fn contains(&self, sequence_number: u32) -> bool {
        self.sequence_numbers.contains(&sequence_number)
    }

    pub fn len(&self) -> usize {
        self.sequence_numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence_numbers.is_empty()
    }
}
