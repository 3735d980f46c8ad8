/// Largest sequence number handed out before wrapping back to 1
pub const MAX_SEQUENCE_NUMBER: u32 = 0x7FFF_FFFF;

/// Allocates sequence numbers for requests this side originates.
///
/// Produces 1..=0x7FFFFFFF and wraps; 0 is never issued.
#[derive(Debug, Default)]
pub struct SequenceGenerator {
    last: u32,
}

impl SequenceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start after `last`, mainly for tests around the wrap point
    pub fn starting_after(last: u32) -> Self {
        Self {
            last: last.min(MAX_SEQUENCE_NUMBER),
        }
    }

    pub fn next_sequence_number(&mut self) -> u32 {
        self.last = if self.last >= MAX_SEQUENCE_NUMBER {
            1
        } else {
            self.last + 1
        };
        self.last
    }
}
