//! Settlement policies: how `close_voting` classifies pending proposals.
//!
//! The approval rule for funding proposals is a policy of the session, not
//! of the engine. Two rules ship:
//!
//! - [`CoveragePolicy`]: staked value must cover a share of the requested
//!   budget, and the budget must fit in what is left of the pool.
//! - [`ParticipationPolicy`]: total votes must exceed
//!   `(base + budget / pool) × participants + pending_funding`.
//!
//! Both approve signaling proposals on a minimum vote count.

use std::fmt;

use crate::error::VotingError;
use crate::proposal::{Proposal, ProposalKind};
use serde::{Deserialize, Serialize};

const BPS_DENOMINATOR: u128 = 10_000;

/// Session figures a policy may consult. Built once per close.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettlementContext {
    /// Pool value at close.
    pub pool: u128,
    /// Budget already promised to proposals approved earlier in this close.
    pub committed: u128,
    /// Active participants at close.
    pub participants: usize,
    /// Pending funding proposals at close.
    pub pending_funding: usize,
}

impl SettlementContext {
    /// Pool value not yet promised to an earlier approval.
    pub fn available_pool(&self) -> u128 {
        self.pool.saturating_sub(self.committed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approve,
    Reject,
}

impl Verdict {
    fn from_bool(approve: bool) -> Self {
        if approve {
            Self::Approve
        } else {
            Self::Reject
        }
    }
}

/// Classifies one pending proposal at close.
pub trait SettlementPolicy: fmt::Debug {
    fn name(&self) -> &'static str;

    fn classify(
        &self,
        proposal: &Proposal,
        ctx: &SettlementContext,
    ) -> Result<Verdict, VotingError>;
}

/// Approve funding when staked value covers `funding_threshold_bps` of the
/// budget and the pool can still pay it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoveragePolicy {
    pub funding_threshold_bps: u32,
    pub signaling_min_votes: u128,
}

impl Default for CoveragePolicy {
    fn default() -> Self {
        Self {
            funding_threshold_bps: 10_000,
            signaling_min_votes: 1,
        }
    }
}

impl SettlementPolicy for CoveragePolicy {
    fn name(&self) -> &'static str {
        "coverage"
    }

    fn classify(
        &self,
        proposal: &Proposal,
        ctx: &SettlementContext,
    ) -> Result<Verdict, VotingError> {
        if proposal.kind == ProposalKind::Signaling {
            return Ok(Verdict::from_bool(
                proposal.total_votes() >= self.signaling_min_votes,
            ));
        }
        let overflow = || VotingError::ArithmeticOverflow("coverage threshold");
        let staked = proposal
            .current_budget()
            .checked_mul(BPS_DENOMINATOR)
            .ok_or_else(overflow)?;
        let required = proposal
            .budget
            .checked_mul(self.funding_threshold_bps as u128)
            .ok_or_else(overflow)?;
        Ok(Verdict::from_bool(
            staked >= required && proposal.budget <= ctx.available_pool(),
        ))
    }
}

/// Approve funding when total votes exceed a threshold that grows with the
/// number of participants and with the budget's share of the pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParticipationPolicy {
    pub base_bps: u32,
    pub signaling_min_votes: u128,
}

impl Default for ParticipationPolicy {
    fn default() -> Self {
        Self {
            base_bps: 2_000,
            signaling_min_votes: 1,
        }
    }
}

impl ParticipationPolicy {
    /// `votes > (base_bps/10⁴ + budget/pool) × participants + pending`,
    /// multiplied through by `10⁴ × pool` to stay in integers.
    fn clears_threshold(
        &self,
        votes: u128,
        budget: u128,
        ctx: &SettlementContext,
    ) -> Option<bool> {
        let participants = ctx.participants as u128;
        let pending = ctx.pending_funding as u128;
        let base = (self.base_bps as u128)
            .checked_mul(participants)?
            .checked_mul(ctx.pool)?;
        let share = BPS_DENOMINATOR
            .checked_mul(budget)?
            .checked_mul(participants)?;
        let queue = BPS_DENOMINATOR.checked_mul(pending)?.checked_mul(ctx.pool)?;
        let threshold = base.checked_add(share)?.checked_add(queue)?;
        let scaled_votes = votes.checked_mul(BPS_DENOMINATOR)?.checked_mul(ctx.pool)?;
        Some(scaled_votes > threshold)
    }
}

impl SettlementPolicy for ParticipationPolicy {
    fn name(&self) -> &'static str {
        "participation"
    }

    fn classify(
        &self,
        proposal: &Proposal,
        ctx: &SettlementContext,
    ) -> Result<Verdict, VotingError> {
        if proposal.kind == ProposalKind::Signaling {
            return Ok(Verdict::from_bool(
                proposal.total_votes() >= self.signaling_min_votes,
            ));
        }
        if ctx.pool == 0 || proposal.budget > ctx.available_pool() {
            return Ok(Verdict::Reject);
        }
        let clears = self
            .clears_threshold(proposal.total_votes(), proposal.budget, ctx)
            .ok_or(VotingError::ArithmeticOverflow("participation threshold"))?;
        Ok(Verdict::from_bool(clears))
    }
}

/// Serializable policy selection, as found in the engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyConfig {
    Coverage {
        #[serde(default = "default_funding_threshold_bps")]
        funding_threshold_bps: u32,
        #[serde(default = "default_signaling_min_votes")]
        signaling_min_votes: u64,
    },
    Participation {
        #[serde(default = "default_base_bps")]
        base_bps: u32,
        #[serde(default = "default_signaling_min_votes")]
        signaling_min_votes: u64,
    },
}

fn default_funding_threshold_bps() -> u32 {
    10_000
}

fn default_base_bps() -> u32 {
    2_000
}

fn default_signaling_min_votes() -> u64 {
    1
}

impl PolicyConfig {
    pub fn build(&self) -> Box<dyn SettlementPolicy> {
        match *self {
            Self::Coverage {
                funding_threshold_bps,
                signaling_min_votes,
            } => Box::new(CoveragePolicy {
                funding_threshold_bps,
                signaling_min_votes: signaling_min_votes as u128,
            }),
            Self::Participation {
                base_bps,
                signaling_min_votes,
            } => Box::new(ParticipationPolicy {
                base_bps,
                signaling_min_votes: signaling_min_votes as u128,
            }),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::Coverage {
            funding_threshold_bps: default_funding_threshold_bps(),
            signaling_min_votes: default_signaling_min_votes(),
        }
    }
}
