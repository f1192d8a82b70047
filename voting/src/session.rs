//! The voting session record and its linear state machine.

use std::fmt;

use crate::error::VotingError;
use qvote_types::Address;
use serde::{Deserialize, Serialize};

/// Session lifecycle: `Initial → Open → Closed → Finished`, no back-edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created, not yet accepting proposals.
    Initial,
    /// Proposals may be added and staked into.
    Open,
    /// Proposals are classified; refunds are available.
    Closed,
    /// Approved funding proposals have been paid out.
    Finished,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Finished => "finished",
        }
    }

    /// The only state reachable from this one.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Initial => Some(Self::Open),
            Self::Open => Some(Self::Closed),
            Self::Closed => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    /// Closed or Finished: settlement has classified every proposal.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Closed | Self::Finished)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session-wide state owned by the controller.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VotingSession {
    /// Fixed at creation; the only address allowed to open, close or finish.
    pub owner: Address,
    pub state: SessionState,
    /// Value available to fund approved proposals.
    pub pool: u128,
    /// Value received from token purchases, backing redemptions.
    pub reserve: u128,
    /// Value of one whole token. Constant for the session's lifetime.
    pub token_price: u128,
}

impl VotingSession {
    pub fn new(owner: Address, token_price: u128) -> Self {
        Self {
            owner,
            state: SessionState::Initial,
            pool: 0,
            reserve: 0,
            token_price,
        }
    }

    /// Fail with `VotingNotOpen` unless the session is open.
    pub fn ensure_open(&self) -> Result<(), VotingError> {
        if self.state == SessionState::Open {
            Ok(())
        } else {
            Err(VotingError::VotingNotOpen(self.state))
        }
    }

    /// Fail unless the session is in `expected`.
    pub fn ensure_state(&self, expected: SessionState) -> Result<(), VotingError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(VotingError::InvalidSessionState {
                expected: expected.as_str(),
                actual: self.state,
            })
        }
    }

    /// Fail unless the session is Closed or Finished.
    pub fn ensure_settled(&self) -> Result<(), VotingError> {
        if self.state.is_settled() {
            Ok(())
        } else {
            Err(VotingError::InvalidSessionState {
                expected: "closed or finished",
                actual: self.state,
            })
        }
    }

    /// Move to the next state. Only the single forward edge is allowed.
    pub fn advance(&mut self, to: SessionState) -> Result<(), VotingError> {
        if self.state.next() != Some(to) {
            return Err(VotingError::InvalidSessionState {
                expected: to.as_str(),
                actual: self.state,
            });
        }
        self.state = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_session() -> VotingSession {
        VotingSession::new(Address::from_index(1), 300_000)
    }

    #[test]
    fn advances_linearly() {
        let mut session = make_session();
        session.advance(SessionState::Open).unwrap();
        session.advance(SessionState::Closed).unwrap();
        session.advance(SessionState::Finished).unwrap();
        assert_eq!(session.state, SessionState::Finished);
    }

    #[test]
    fn rejects_skips_and_back_edges() {
        let mut session = make_session();
        assert!(session.advance(SessionState::Closed).is_err());
        session.advance(SessionState::Open).unwrap();
        assert!(session.advance(SessionState::Initial).is_err());
        assert!(session.advance(SessionState::Open).is_err());
        assert_eq!(session.state, SessionState::Open);
    }

    #[test]
    fn ensure_open_reports_current_state() {
        let session = make_session();
        assert_eq!(
            session.ensure_open(),
            Err(VotingError::VotingNotOpen(SessionState::Initial))
        );
    }

    #[test]
    fn settled_means_closed_or_finished() {
        assert!(!SessionState::Open.is_settled());
        assert!(SessionState::Closed.is_settled());
        assert!(SessionState::Finished.is_settled());
    }
}
