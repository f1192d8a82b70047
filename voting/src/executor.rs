//! Payout capability for approved funding proposals.

use std::collections::BTreeMap;

use crate::proposal::ProposalId;
use qvote_types::Address;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("executor {executor} refused proposal {proposal}: {reason}")]
    Refused {
        proposal: ProposalId,
        executor: Address,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Receives the budget of an approved funding proposal at settlement.
///
/// An error leaves the session pool untouched; the engine marks the proposal
/// rejected and carries on with the next one.
pub trait ProposalExecutor {
    fn execute(
        &mut self,
        proposal: ProposalId,
        executor: &Address,
        amount: u128,
    ) -> Result<(), ExecutorError>;
}

/// One successful payout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Payout {
    pub proposal: ProposalId,
    pub executor: Address,
    pub amount: u128,
}

/// Executor that credits payouts to an in-memory value book.
///
/// Used when the host settles value itself after the session finishes.
#[derive(Clone, Debug, Default)]
pub struct PayoutBook {
    payouts: Vec<Payout>,
    credited: BTreeMap<Address, u128>,
}

impl PayoutBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payouts(&self) -> &[Payout] {
        &self.payouts
    }

    /// Total value credited to `executor` so far.
    pub fn credited(&self, executor: &Address) -> u128 {
        self.credited.get(executor).copied().unwrap_or(0)
    }
}

impl ProposalExecutor for PayoutBook {
    fn execute(
        &mut self,
        proposal: ProposalId,
        executor: &Address,
        amount: u128,
    ) -> Result<(), ExecutorError> {
        let credited = self.credited(executor).checked_add(amount).ok_or_else(|| {
            ExecutorError::Other(format!("credit overflow for {executor}"))
        })?;
        self.credited.insert(executor.clone(), credited);
        self.payouts.push(Payout {
            proposal,
            executor: executor.clone(),
            amount,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payout_book_accumulates_per_executor() {
        let mut book = PayoutBook::new();
        let exec = Address::from_index(50);
        book.execute(1, &exec, 10).unwrap();
        book.execute(2, &exec, 5).unwrap();
        assert_eq!(book.credited(&exec), 15);
        assert_eq!(book.payouts().len(), 2);
        assert_eq!(book.credited(&Address::from_index(51)), 0);
    }
}
