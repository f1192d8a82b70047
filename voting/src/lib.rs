//! Quadratic voting over a session of proposals.
//!
//! Lifecycle: Initial → Open → Closed → Finished, no back-edges.
//! Participants buy governance tokens at a fixed price and stake them on
//! proposals; holding `v` votes on a proposal costs `v²` tokens.
//!
//! Signaling proposals (budget 0) only record opinion. Funding proposals ask
//! the session pool for value and are paid through a [`ProposalExecutor`]
//! when the session finishes. Stakes in proposals that did not end approved
//! are refundable; approved stakes stay committed in custody.

pub mod config;
pub mod cost;
pub mod engine;
pub mod error;
pub mod executor;
pub mod participants;
pub mod policy;
pub mod proposal;
pub mod registry;
pub mod role;
pub mod session;

pub use config::EngineConfig;
pub use cost::{QuadraticCost, Quote};
pub use engine::{
    FailedPayout, ProposalOutcome, Purchase, QuadraticVoting, SettlementReport, StakeReceipt,
};
pub use error::VotingError;
pub use executor::{ExecutorError, Payout, PayoutBook, ProposalExecutor};
pub use participants::{Participant, ParticipantRegistry};
pub use policy::{
    CoveragePolicy, ParticipationPolicy, PolicyConfig, SettlementContext, SettlementPolicy, Verdict,
};
pub use proposal::{Proposal, ProposalId, ProposalKind, ProposalState};
pub use registry::ProposalRegistry;
pub use role::Role;
pub use session::{SessionState, VotingSession};
