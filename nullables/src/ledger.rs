//! Nullable ledger: a real ledger that fails one chosen call.

use qvote_token::{TokenError, TokenLedger, TokenMetadata};
use qvote_types::Address;

/// Wraps a ledger and injects a single failure.
///
/// Moving calls (`transfer` and `transfer_from`) are counted from 1. The call
/// numbered `fail_at` returns an error without reaching the inner ledger;
/// every other call is passed through.
#[derive(Clone, Debug)]
pub struct FlakyLedger<L> {
    inner: L,
    fail_at: Option<usize>,
    fail_next_mint: bool,
    moves: usize,
}

impl<L: TokenLedger> FlakyLedger<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            fail_at: None,
            fail_next_mint: false,
            moves: 0,
        }
    }

    /// Fail the `n`-th moving call from now (1 = the very next one).
    pub fn fail_move(&mut self, n: usize) {
        self.fail_at = Some(self.moves + n);
    }

    /// Fail the next `mint`.
    pub fn fail_next_mint(&mut self) {
        self.fail_next_mint = true;
    }

    /// Moving calls seen so far, including the failed one.
    pub fn moves(&self) -> usize {
        self.moves
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    fn check_move(&mut self) -> Result<(), TokenError> {
        self.moves += 1;
        if self.fail_at == Some(self.moves) {
            self.fail_at = None;
            return Err(TokenError::Other(format!("injected failure at move {}", self.moves)));
        }
        Ok(())
    }
}

impl<L: TokenLedger> TokenLedger for FlakyLedger<L> {
    fn metadata(&self) -> &TokenMetadata {
        self.inner.metadata()
    }

    fn total_supply(&self) -> u128 {
        self.inner.total_supply()
    }

    fn balance_of(&self, account: &Address) -> u128 {
        self.inner.balance_of(account)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.inner.allowance(owner, spender)
    }

    fn mint(&mut self, to: &Address, amount: u128) -> Result<(), TokenError> {
        if std::mem::take(&mut self.fail_next_mint) {
            return Err(TokenError::Other("injected mint failure".into()));
        }
        self.inner.mint(to, amount)
    }

    fn burn(&mut self, from: &Address, amount: u128) -> Result<(), TokenError> {
        self.inner.burn(from, amount)
    }

    fn approve(
        &mut self,
        owner: &Address,
        spender: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        self.inner.approve(owner, spender, amount)
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        self.check_move()?;
        self.inner.transfer(from, to, amount)
    }

    fn transfer_from(
        &mut self,
        owner: &Address,
        spender: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        self.check_move()?;
        self.inner.transfer_from(owner, spender, to, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qvote_token::TokenEngine;

    #[test]
    fn fails_exactly_the_chosen_move() {
        let a = Address::from_index(1);
        let b = Address::from_index(2);
        let mut ledger = FlakyLedger::new(TokenEngine::default());
        ledger.mint(&a, 10).unwrap();
        ledger.fail_move(2);

        ledger.transfer(&a, &b, 1).unwrap();
        assert!(matches!(ledger.transfer(&a, &b, 1), Err(TokenError::Other(_))));
        ledger.transfer(&a, &b, 1).unwrap();

        assert_eq!(ledger.moves(), 3);
        assert_eq!(ledger.balance_of(&b), 2);
        assert_eq!(ledger.balance_of(&a), 8);
    }

    #[test]
    fn mint_failure_is_one_shot() {
        let a = Address::from_index(1);
        let mut ledger = FlakyLedger::new(TokenEngine::default());
        ledger.fail_next_mint();
        assert!(ledger.mint(&a, 5).is_err());
        ledger.mint(&a, 5).unwrap();
        assert_eq!(ledger.inner().total_supply(), 5);
    }
}
