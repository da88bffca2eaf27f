//! Transfer lifecycle states
//!
//! A transfer is `Pending` while the engine works on it and ends in exactly
//! one of `Completed` or `Rejected`. Nothing is persisted for the state
//! itself; it drives the structured log line of each transition.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferState {
    /// Request accepted, accounts being resolved or mutated
    Pending,

    /// Terminal: debit applied and transaction appended
    Completed,

    /// Terminal: validation failed, or a later failure was compensated
    Rejected,
}

impl TransferState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Pending => "PENDING",
            TransferState::Completed => "COMPLETED",
            TransferState::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(TransferState::Pending.to_string(), "PENDING");
        assert_eq!(format!("{}", TransferState::Rejected), "REJECTED");
    }
}
