//! The token-ledger capability consumed by the voting engine.

use crate::error::TokenError;
use crate::token::TokenMetadata;
use qvote_types::Address;

/// A fungible balance store with allowance-gated transfers.
///
/// All amounts are in base units. Every mutating call either applies fully or
/// returns an error with no state change.
pub trait TokenLedger {
    fn metadata(&self) -> &TokenMetadata;

    /// Sum of all balances.
    fn total_supply(&self) -> u128;

    fn balance_of(&self, account: &Address) -> u128;

    /// How much `spender` may still move out of `owner`'s balance.
    fn allowance(&self, owner: &Address, spender: &Address) -> u128;

    /// Create `amount` new tokens in `to`'s balance.
    fn mint(&mut self, to: &Address, amount: u128) -> Result<(), TokenError>;

    /// Destroy `amount` tokens from `from`'s balance.
    fn burn(&mut self, from: &Address, amount: u128) -> Result<(), TokenError>;

    /// Set (not add to) the allowance `owner` grants `spender`.
    fn approve(&mut self, owner: &Address, spender: &Address, amount: u128)
        -> Result<(), TokenError>;

    /// Move tokens on `from`'s own authority.
    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), TokenError>;

    /// Move tokens out of `owner`'s balance on `spender`'s authority,
    /// consuming allowance.
    fn transfer_from(
        &mut self,
        owner: &Address,
        spender: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError>;
}
