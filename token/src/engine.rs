//! In-memory token ledger.

use std::collections::HashMap;

use crate::error::TokenError;
use crate::ledger::TokenLedger;
use crate::token::TokenMetadata;
use qvote_types::Address;

/// The in-memory reference token.
///
/// Balances of zero are removed from the map so `holders()` only reports
/// accounts that actually hold tokens. `total_supply` is updated on every
/// mint/burn and always equals the sum of balances.
#[derive(Clone, Debug, Default)]
pub struct TokenEngine {
    metadata: TokenMetadata,
    balances: HashMap<Address, u128>,
    allowances: HashMap<(Address, Address), u128>,
    total_supply: u128,
}

impl TokenEngine {
    pub fn new(metadata: TokenMetadata) -> Self {
        Self {
            metadata,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            total_supply: 0,
        }
    }

    /// Accounts with a non-zero balance, sorted by address.
    pub fn holders(&self) -> Vec<(Address, u128)> {
        let mut holders: Vec<_> = self
            .balances
            .iter()
            .map(|(addr, bal)| (addr.clone(), *bal))
            .collect();
        holders.sort();
        holders
    }

    /// Recompute the supply from balances. Useful for consistency checks.
    pub fn recompute_supply(&self) -> Option<u128> {
        self.balances
            .values()
            .try_fold(0u128, |acc, bal| acc.checked_add(*bal))
    }

    fn debit(&mut self, from: &Address, amount: u128) -> Result<(), TokenError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        let remaining = available - amount;
        if remaining == 0 {
            self.balances.remove(from);
        } else {
            self.balances.insert(from.clone(), remaining);
        }
        Ok(())
    }

    fn credit(&mut self, to: &Address, amount: u128) -> Result<(), TokenError> {
        if amount == 0 {
            return Ok(());
        }
        let balance = self.balances.entry(to.clone()).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(TokenError::Overflow)?;
        Ok(())
    }
}

impl TokenLedger for TokenEngine {
    fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    fn total_supply(&self) -> u128 {
        self.total_supply
    }

    fn balance_of(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }

    fn mint(&mut self, to: &Address, amount: u128) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        // Supply bounds every balance, so the credit cannot overflow now.
        self.credit(to, amount)?;
        self.total_supply = supply;
        tracing::trace!(to = %to, amount, supply, "mint");
        Ok(())
    }

    fn burn(&mut self, from: &Address, amount: u128) -> Result<(), TokenError> {
        self.debit(from, amount)?;
        self.total_supply -= amount;
        tracing::trace!(from = %from, amount, supply = self.total_supply, "burn");
        Ok(())
    }

    fn approve(
        &mut self,
        owner: &Address,
        spender: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        if spender.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let key = (owner.clone(), spender.clone());
        if amount == 0 {
            self.allowances.remove(&key);
        } else {
            self.allowances.insert(key, amount);
        }
        Ok(())
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        if from == to {
            // Self-transfer moves nothing but must still be covered.
            let available = self.balance_of(from);
            if available < amount {
                return Err(TokenError::InsufficientBalance {
                    needed: amount,
                    available,
                });
            }
            return Ok(());
        }
        self.debit(from, amount)?;
        self.credit(to, amount)?;
        Ok(())
    }

    fn transfer_from(
        &mut self,
        owner: &Address,
        spender: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let approved = self.allowance(owner, spender);
        if approved < amount {
            return Err(TokenError::InsufficientAllowance {
                needed: amount,
                approved,
            });
        }
        self.transfer(owner, to, amount)?;
        self.approve(owner, spender, approved - amount)?;
        Ok(())
    }
}
