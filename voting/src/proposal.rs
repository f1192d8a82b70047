//! Proposals and their per-voter tallies.

use std::collections::BTreeMap;
use std::fmt;

use crate::cost::QuadraticCost;
use crate::error::VotingError;
use qvote_types::Address;
use serde::{Deserialize, Serialize};

/// Sequential proposal identifier. The first proposal is 1; 0 means "none".
pub type ProposalId = u64;

/// Derived from the requested budget at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalKind {
    /// `budget == 0`: opinion only, nothing is paid out.
    Signaling,
    /// `budget > 0`: asks for value from the session pool.
    Funding,
}

impl ProposalKind {
    pub fn from_budget(budget: u128) -> Self {
        if budget == 0 {
            Self::Signaling
        } else {
            Self::Funding
        }
    }
}

/// Lifecycle state of a proposal.
///
/// `Pending` is the only state that accepts stakes. Everything else is
/// terminal, except that an `Approved` funding proposal whose payout fails at
/// settlement falls back to `Rejected`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalState {
    Pending,
    /// Withdrawn by its creator.
    Cancelled,
    Approved,
    Rejected,
    /// Excluded from settlement by the session owner.
    Disabled,
}

impl ProposalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Cancelled => "cancelled",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Disabled => "disabled",
        }
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A proposal subject to quadratic voting.
#[derive(Clone, Debug, Serialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub title: String,
    pub description: String,
    pub kind: ProposalKind,
    /// Requested value. Zero for signaling proposals.
    pub budget: u128,
    /// Payee invoked when an approved funding proposal is paid out.
    pub executor: Address,
    /// The participant who created it; the only address allowed to cancel.
    pub creator: Address,
    pub state: ProposalState,
    /// Cumulative votes per voter. Voters with zero votes are not stored.
    votes_by_voter: BTreeMap<Address, u64>,
    /// Sum of `votes_by_voter`.
    total_votes: u128,
    /// Sum of `cost(votes)` over voters, in value units.
    current_budget: u128,
    /// Set once the payout reached the executor.
    pub executed: bool,
}

/// A checked, not-yet-applied change to one voter's tally.
///
/// Built by [`Proposal::prepare_votes`] so every arithmetic failure surfaces
/// before any state (token or tally) has been touched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TallyUpdate {
    voter: Address,
    votes: u64,
    total_votes: u128,
    current_budget: u128,
}

impl Proposal {
    pub fn new(
        id: ProposalId,
        title: impl Into<String>,
        description: impl Into<String>,
        budget: u128,
        executor: Address,
        creator: Address,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            kind: ProposalKind::from_budget(budget),
            budget,
            executor,
            creator,
            state: ProposalState::Pending,
            votes_by_voter: BTreeMap::new(),
            total_votes: 0,
            current_budget: 0,
            executed: false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == ProposalState::Pending
    }

    pub fn is_funding(&self) -> bool {
        self.kind == ProposalKind::Funding
    }

    pub fn total_votes(&self) -> u128 {
        self.total_votes
    }

    pub fn current_budget(&self) -> u128 {
        self.current_budget
    }

    pub fn votes_of(&self, voter: &Address) -> u64 {
        self.votes_by_voter.get(voter).copied().unwrap_or(0)
    }

    /// Voters with a non-zero stake, in address order.
    pub fn voters(&self) -> impl Iterator<Item = (&Address, u64)> + '_ {
        self.votes_by_voter.iter().map(|(addr, votes)| (addr, *votes))
    }

    /// Human-readable summary: `"title: <title>\ndescription: <description>"`.
    pub fn info(&self) -> String {
        format!("title: {}\ndescription: {}", self.title, self.description)
    }

    /// Price `voter`'s tally moving to `votes` and derive the new totals.
    pub fn prepare_votes(
        &self,
        voter: &Address,
        votes: u64,
        cost: &QuadraticCost,
    ) -> Result<TallyUpdate, VotingError> {
        let before = self.votes_of(voter);
        let total_votes = (self.total_votes - before as u128)
            .checked_add(votes as u128)
            .ok_or(VotingError::ArithmeticOverflow("proposal vote total"))?;
        let current_budget = (self.current_budget - cost.cost(before)?)
            .checked_add(cost.cost(votes)?)
            .ok_or(VotingError::ArithmeticOverflow("proposal budget"))?;
        Ok(TallyUpdate {
            voter: voter.clone(),
            votes,
            total_votes,
            current_budget,
        })
    }

    /// Apply an update built by [`Proposal::prepare_votes`]. Infallible.
    pub fn apply(&mut self, update: TallyUpdate) {
        if update.votes == 0 {
            self.votes_by_voter.remove(&update.voter);
        } else {
            self.votes_by_voter.insert(update.voter, update.votes);
        }
        self.total_votes = update.total_votes;
        self.current_budget = update.current_budget;
    }

    /// Drop every stake. Returns what was removed, voter by voter.
    pub fn clear_votes(&mut self) -> BTreeMap<Address, u64> {
        self.total_votes = 0;
        self.current_budget = 0;
        std::mem::take(&mut self.votes_by_voter)
    }

    /// Recompute `(total_votes, current_budget)` from the per-voter tallies.
    pub fn recompute(&self, cost: &QuadraticCost) -> Result<(u128, u128), VotingError> {
        let mut votes = 0u128;
        let mut budget = 0u128;
        for (_, v) in self.voters() {
            votes = votes
                .checked_add(v as u128)
                .ok_or(VotingError::ArithmeticOverflow("proposal vote total"))?;
            budget = budget
                .checked_add(cost.cost(v)?)
                .ok_or(VotingError::ArithmeticOverflow("proposal budget"))?;
        }
        Ok((votes, budget))
    }

    /// Token base units locked in this proposal (`Σ v² × TOKEN_UNIT`).
    pub fn locked_tokens(&self, cost: &QuadraticCost) -> Result<u128, VotingError> {
        self.voters().try_fold(0u128, |acc, (_, v)| {
            acc.checked_add(cost.token_cost(v)?)
                .ok_or(VotingError::ArithmeticOverflow("locked tokens"))
        })
    }
}
