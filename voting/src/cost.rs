//! Quadratic cost engine.
//!
//! `cost(v) = v² × unit`. The same `v²` is priced twice: in value units
//! (`unit = token_price`, this is what a proposal's `current_budget`
//! accumulates) and in token base units (`unit = TOKEN_UNIT`, this is what
//! a voter locks). One vote therefore locks one whole token worth
//! `token_price`.
//!
//! Every operation is checked; an overflow is an error, never a wrap.

use crate::error::VotingError;
use qvote_types::TOKEN_UNIT;
use serde::{Deserialize, Serialize};

/// Price of a stake change in both denominations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Token base units locked or released.
    pub tokens: u128,
    /// Value units added to or removed from `current_budget`.
    pub value: u128,
}

/// Pure quadratic pricing for one session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuadraticCost {
    token_price: u128,
}

impl QuadraticCost {
    pub fn new(token_price: u128) -> Self {
        Self { token_price }
    }

    pub fn token_price(&self) -> u128 {
        self.token_price
    }

    /// `v²` as u128. Cannot overflow for any u64.
    pub fn votes_squared(votes: u64) -> u128 {
        let v = votes as u128;
        v * v
    }

    /// Value cost of holding `votes` votes: `v² × token_price`.
    pub fn cost(&self, votes: u64) -> Result<u128, VotingError> {
        Self::votes_squared(votes)
            .checked_mul(self.token_price)
            .ok_or(VotingError::ArithmeticOverflow("vote cost"))
    }

    /// Token cost of holding `votes` votes: `v² × TOKEN_UNIT`.
    pub fn token_cost(&self, votes: u64) -> Result<u128, VotingError> {
        Self::votes_squared(votes)
            .checked_mul(TOKEN_UNIT)
            .ok_or(VotingError::ArithmeticOverflow("vote token cost"))
    }

    /// `cost(v + Δ) − cost(v)`.
    pub fn incremental_cost(&self, votes: u64, delta: u64) -> Result<u128, VotingError> {
        Ok(self.quote_stake(votes, delta)?.value)
    }

    /// `cost(v) − cost(v − Δ)`.
    pub fn refund(&self, votes: u64, delta: u64) -> Result<u128, VotingError> {
        Ok(self.quote_withdraw(votes, delta)?.value)
    }

    /// Price of going from `votes` to `votes + delta`.
    pub fn quote_stake(&self, votes: u64, delta: u64) -> Result<Quote, VotingError> {
        let after = votes
            .checked_add(delta)
            .ok_or(VotingError::ArithmeticOverflow("vote count"))?;
        self.quote_between(votes, after)
    }

    /// Amount released by going from `votes` to `votes - delta`.
    pub fn quote_withdraw(&self, votes: u64, delta: u64) -> Result<Quote, VotingError> {
        let after = votes
            .checked_sub(delta)
            .ok_or(VotingError::InsufficientVotes {
                requested: delta,
                staked: votes,
            })?;
        self.quote_between(after, votes)
    }

    fn quote_between(&self, low: u64, high: u64) -> Result<Quote, VotingError> {
        // cost is monotonic, so high >= low makes both subtractions safe.
        Ok(Quote {
            tokens: self.token_cost(high)? - self.token_cost(low)?,
            value: self.cost(high)? - self.cost(low)?,
        })
    }

    /// Value of `tokens` base units at this price, floored.
    pub fn token_value(&self, tokens: u128) -> Result<u128, VotingError> {
        let overflow = || VotingError::ArithmeticOverflow("token value");
        let whole = (tokens / TOKEN_UNIT)
            .checked_mul(self.token_price)
            .ok_or_else(overflow)?;
        // (tokens % UNIT) < 10^18, so this overflows only for prices near 2^68.
        let fraction = (tokens % TOKEN_UNIT)
            .checked_mul(self.token_price)
            .ok_or_else(overflow)?
            / TOKEN_UNIT;
        whole.checked_add(fraction).ok_or_else(overflow)
    }
}
