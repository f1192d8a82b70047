use crate::proposal::{ProposalId, ProposalState};
use crate::session::SessionState;
use qvote_token::TokenError;
use qvote_types::Address;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VotingError {
    #[error("{0} is not the session owner")]
    NotOwner(Address),

    #[error("{0} is not an active participant")]
    NotAParticipant(Address),

    #[error("{caller} did not create proposal {proposal}")]
    NotCreator { proposal: ProposalId, caller: Address },

    #[error("voting is not open (session is {0})")]
    VotingNotOpen(SessionState),

    #[error("session is {actual}, operation requires {expected}")]
    InvalidSessionState {
        expected: &'static str,
        actual: SessionState,
    },

    #[error("proposal {id} is {state}")]
    InvalidProposalState { id: ProposalId, state: ProposalState },

    #[error("proposal {0} not found")]
    UnknownProposal(ProposalId),

    #[error("payment of {paid} does not buy a token at price {price}")]
    InsufficientPayment { paid: u128, price: u128 },

    #[error("insufficient allowance: need {needed}, approved {approved}")]
    InsufficientAllowance { needed: u128, approved: u128 },

    #[error("insufficient token balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error("insufficient votes: withdrawing {requested}, staked {staked}")]
    InsufficientVotes { requested: u64, staked: u64 },

    #[error("insufficient pool: need {needed}, pool holds {available}")]
    InsufficientPool { needed: u128, available: u128 },

    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    #[error("vote amount must be non-zero")]
    InvalidVoteAmount,

    #[error("payout for proposal {id} failed: {reason}")]
    PayoutFailed { id: ProposalId, reason: String },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("token ledger error: {0}")]
    Token(TokenError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<TokenError> for VotingError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InsufficientBalance { needed, available } => {
                Self::InsufficientBalance { needed, available }
            }
            TokenError::InsufficientAllowance { needed, approved } => {
                Self::InsufficientAllowance { needed, approved }
            }
            TokenError::Overflow => Self::ArithmeticOverflow("token supply"),
            other => Self::Token(other),
        }
    }
}
