// crates/concord-budget/src/program.rs
//
// Budget programs and governance votes.
//
// A program starts as a Candidate and sits in the expiry queue until its
// voting window closes. If enough net stake supports it by then it becomes
// Active and competes for budget rewards every vote period; otherwise it is
// deleted. An Active program that loses support is deleted as well, so a
// stored program is only ever Candidate or Active.

use std::fmt;

use serde::{Deserialize, Serialize};

use concord_core::error::ConcordError;
use concord_core::identity::AccountId;

/// Maximum program title length in bytes.
pub const MAX_TITLE_LEN: usize = 140;

/// Maximum program description length in bytes.
pub const MAX_DESCRIPTION_LEN: usize = 5000;

/// Lifecycle state of a stored program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramStatus {
    /// Still inside its voting window.
    Candidate,
    /// Passed its initial tally; eligible for budget claims.
    Active,
}

impl fmt::Display for ProgramStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramStatus::Candidate => write!(f, "candidate"),
            ProgramStatus::Active => write!(f, "active"),
        }
    }
}

/// A budget program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: u64,
    pub title: String,
    pub description: String,
    /// Account that submitted the program; the only one allowed to withdraw it.
    pub submitter: AccountId,
    /// Account that receives the program's budget rewards.
    pub executor: AccountId,
    pub submit_block: u64,
    /// Height at whose end the candidate is tallied.
    pub voting_end_block: u64,
    pub status: ProgramStatus,
}

impl Program {
    pub fn is_active(&self) -> bool {
        self.status == ProgramStatus::Active
    }
}

/// Check title and description lengths.
pub fn validate_program_text(title: &str, description: &str) -> Result<(), ConcordError> {
    if title.is_empty() || title.len() > MAX_TITLE_LEN {
        return Err(ConcordError::InvalidInput(format!(
            "title must be 1..={} bytes, got {}",
            MAX_TITLE_LEN,
            title.len()
        )));
    }
    if description.is_empty() || description.len() > MAX_DESCRIPTION_LEN {
        return Err(ConcordError::InvalidInput(format!(
            "description must be 1..={} bytes, got {}",
            MAX_DESCRIPTION_LEN,
            description.len()
        )));
    }
    Ok(())
}

/// A governance vote option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteOption {
    Yes,
    No,
}

/// A stored governance vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceVote {
    pub program_id: u64,
    pub voter: AccountId,
    pub option: VoteOption,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_bounds() {
        assert!(validate_program_text("t", "d").is_ok());
        assert!(validate_program_text(&"t".repeat(140), &"d".repeat(5000)).is_ok());
        assert!(validate_program_text("", "d").is_err());
        assert!(validate_program_text(&"t".repeat(141), "d").is_err());
        assert!(validate_program_text("t", "").is_err());
        assert!(validate_program_text("t", &"d".repeat(5001)).is_err());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ProgramStatus::Candidate.to_string(), "candidate");
        assert_eq!(ProgramStatus::Active.to_string(), "active");
    }
}
