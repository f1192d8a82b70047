//! Nullable executor: records payouts, refuses chosen payees.

use std::collections::BTreeSet;

use qvote_types::Address;
use qvote_voting::{ExecutorError, Payout, ProposalExecutor, ProposalId};

/// A deterministic proposal executor for testing.
///
/// Accepts every payout except those addressed to a refused executor.
#[derive(Clone, Debug, Default)]
pub struct NullExecutor {
    refused: BTreeSet<Address>,
    executed: Vec<Payout>,
    attempts: usize,
}

impl NullExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every payout addressed to `executor`.
    pub fn refusing(mut self, executor: Address) -> Self {
        self.refused.insert(executor);
        self
    }

    /// Payouts that were accepted, in call order.
    pub fn executed(&self) -> &[Payout] {
        &self.executed
    }

    /// Number of `execute` calls, accepted or not.
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

impl ProposalExecutor for NullExecutor {
    fn execute(
        &mut self,
        proposal: ProposalId,
        executor: &Address,
        amount: u128,
    ) -> Result<(), ExecutorError> {
        self.attempts += 1;
        if self.refused.contains(executor) {
            return Err(ExecutorError::Refused {
                proposal,
                executor: executor.clone(),
                reason: "refused by null executor".into(),
            });
        }
        self.executed.push(Payout {
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
    fn records_accepted_and_counts_refused() {
        let good = Address::from_index(50);
        let bad = Address::from_index(51);
        let mut exec = NullExecutor::new().refusing(bad.clone());

        exec.execute(1, &good, 10).unwrap();
        assert!(matches!(
            exec.execute(2, &bad, 10),
            Err(ExecutorError::Refused { proposal: 2, .. })
        ));
        assert_eq!(exec.attempts(), 2);
        assert_eq!(exec.executed().len(), 1);
        assert_eq!(exec.executed()[0].executor, good);
    }
}
