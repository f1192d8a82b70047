//! The proposal registry: sequential ids, lookups and listings.

use crate::error::VotingError;
use crate::proposal::{Proposal, ProposalId, ProposalKind, ProposalState};
use qvote_types::Address;

/// All proposals of a session, indexed by `id - 1`.
///
/// Proposals are never removed, so the id → index mapping is stable.
#[derive(Clone, Debug, Default)]
pub struct ProposalRegistry {
    proposals: Vec<Proposal>,
}

impl ProposalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending proposal and return its id.
    pub fn add(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
        budget: u128,
        executor: Address,
        creator: Address,
    ) -> ProposalId {
        let id = self.proposals.len() as ProposalId + 1;
        self.proposals
            .push(Proposal::new(id, title, description, budget, executor, creator));
        id
    }

    pub fn get(&self, id: ProposalId) -> Result<&Proposal, VotingError> {
        Self::index(id)
            .and_then(|i| self.proposals.get(i))
            .ok_or(VotingError::UnknownProposal(id))
    }

    pub fn get_mut(&mut self, id: ProposalId) -> Result<&mut Proposal, VotingError> {
        Self::index(id)
            .and_then(|i| self.proposals.get_mut(i))
            .ok_or(VotingError::UnknownProposal(id))
    }

    /// Like [`get`](Self::get), additionally requiring the proposal to be pending.
    pub fn get_pending(&self, id: ProposalId) -> Result<&Proposal, VotingError> {
        let proposal = self.get(id)?;
        if !proposal.is_pending() {
            return Err(VotingError::InvalidProposalState {
                id,
                state: proposal.state,
            });
        }
        Ok(proposal)
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Proposal> + '_ {
        self.proposals.iter()
    }

    /// Ids matching a kind and state, in id order.
    pub fn ids_where(&self, kind: Option<ProposalKind>, state: ProposalState) -> Vec<ProposalId> {
        self.proposals
            .iter()
            .filter(|p| p.state == state && kind.map_or(true, |k| p.kind == k))
            .map(|p| p.id)
            .collect()
    }

    /// Pending signaling proposals.
    pub fn signaling(&self) -> Vec<ProposalId> {
        self.ids_where(Some(ProposalKind::Signaling), ProposalState::Pending)
    }

    /// Pending funding proposals.
    pub fn pending_funding(&self) -> Vec<ProposalId> {
        self.ids_where(Some(ProposalKind::Funding), ProposalState::Pending)
    }

    /// Approved proposals of either kind.
    pub fn approved(&self) -> Vec<ProposalId> {
        self.ids_where(None, ProposalState::Approved)
    }

    fn index(id: ProposalId) -> Option<usize> {
        id.checked_sub(1).map(|i| i as usize)
    }
}
