//! The voting session controller.
//!
//! Every public operation takes the caller's address first, checks its gates
//! (session state, role, proposal state) and prices the change before it
//! touches anything. The one fallible ledger call of an operation runs before
//! engine state changes, so a call is either fully applied or has no effect.

use std::fmt::Display;

use crate::config::EngineConfig;
use crate::cost::{QuadraticCost, Quote};
use crate::error::VotingError;
use crate::executor::{Payout, ProposalExecutor};
use crate::participants::{Participant, ParticipantRegistry};
use crate::policy::{CoveragePolicy, SettlementContext, SettlementPolicy, Verdict};
use crate::proposal::{Proposal, ProposalId, ProposalKind, ProposalState};
use crate::registry::ProposalRegistry;
use crate::role::Role;
use crate::session::{SessionState, VotingSession};
use qvote_token::TokenLedger;
use qvote_types::{Address, TOKEN_UNIT};
use serde::{Serialize, Serializer};

/// Result of a token purchase (`add_participant` or `buy_tokens`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Purchase {
    /// Token base units minted to the buyer.
    pub tokens: u128,
    /// Value kept in the reserve.
    pub spent: u128,
    /// Value handed back because it did not buy a whole token.
    pub change: u128,
}

/// Result of a stake or a withdrawal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StakeReceipt {
    pub proposal: ProposalId,
    /// The caller's cumulative votes after the call.
    pub votes: u64,
    /// Token base units locked (stake) or released (withdraw).
    pub tokens: u128,
    /// Value added to or removed from the proposal's budget.
    pub value: u128,
}

/// How one proposal left `close_voting`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProposalOutcome {
    pub proposal: ProposalId,
    pub kind: ProposalKind,
    pub state: ProposalState,
    pub total_votes: u128,
    pub current_budget: u128,
}

/// A payout that did not happen; the proposal was moved to `Rejected`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailedPayout {
    pub proposal: ProposalId,
    #[serde(serialize_with = "serialize_display")]
    pub error: VotingError,
}

/// Result of `finish_voting_session`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SettlementReport {
    pub paid: Vec<Payout>,
    pub failed: Vec<FailedPayout>,
    pub pool_remaining: u128,
}

fn serialize_display<S: Serializer, T: Display>(value: &T, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}

/// Quadratic voting over one session.
///
/// Generic over the token ledger it prices stakes against and the executor
/// that receives approved budgets.
pub struct QuadraticVoting<L, X> {
    session: VotingSession,
    engine_address: Address,
    cost: QuadraticCost,
    participants: ParticipantRegistry,
    proposals: ProposalRegistry,
    policy: Box<dyn SettlementPolicy>,
    ledger: L,
    executor: X,
}

impl<L: TokenLedger, X: ProposalExecutor> QuadraticVoting<L, X> {
    /// Create a session in `Initial` state with the default coverage policy.
    pub fn new(
        owner: Address,
        engine_address: Address,
        token_price: u128,
        ledger: L,
        executor: X,
    ) -> Result<Self, VotingError> {
        if token_price == 0 {
            return Err(VotingError::Config("token_price must be non-zero".into()));
        }
        if engine_address.is_zero() || engine_address == owner {
            return Err(VotingError::Config(
                "engine_address must be non-zero and differ from owner".into(),
            ));
        }
        Ok(Self {
            session: VotingSession::new(owner, token_price),
            participants: ParticipantRegistry::reserving(engine_address.clone()),
            engine_address,
            cost: QuadraticCost::new(token_price),
            proposals: ProposalRegistry::new(),
            policy: Box::new(CoveragePolicy::default()),
            ledger,
            executor,
        })
    }

    /// Create a session from configuration.
    pub fn from_config(config: &EngineConfig, ledger: L, executor: X) -> Result<Self, VotingError> {
        config.validate()?;
        let engine = Self::new(
            config.owner.clone(),
            config.engine_address.clone(),
            config.token_price as u128,
            ledger,
            executor,
        )?;
        Ok(engine.with_policy(config.policy.build()))
    }

    /// Replace the settlement policy.
    pub fn with_policy(mut self, policy: Box<dyn SettlementPolicy>) -> Self {
        self.policy = policy;
        self
    }

    // ── Participation ──────────────────────────────────────────────────

    /// Buy at least one token and become an active participant.
    /// The custody address is refused before anything is minted.
    pub fn add_participant(
        &mut self,
        caller: &Address,
        payment: u128,
    ) -> Result<Purchase, VotingError> {
        self.participants.ensure_admissible(caller)?;
        let purchase = self.mint_purchase(caller, payment)?;
        let newly_active = self.participants.admit(caller)?;
        tracing::info!(
            participant = %caller,
            tokens = purchase.tokens,
            newly_active,
            "participant admitted"
        );
        Ok(purchase)
    }

    /// Give up participant capabilities. Tokens stay with the caller.
    pub fn remove_participant(&mut self, caller: &Address) -> Result<(), VotingError> {
        self.participants.remove(caller)?;
        tracing::info!(participant = %caller, "participant removed");
        Ok(())
    }

    pub fn is_participant(&self, address: &Address) -> bool {
        self.participants.is_active(address)
    }

    pub fn participant_count(&self) -> usize {
        self.participants.active_count()
    }

    pub fn participants(&self) -> impl Iterator<Item = &Participant> + '_ {
        self.participants.iter()
    }

    /// Buy more tokens at the session price.
    pub fn buy_tokens(&mut self, caller: &Address, payment: u128) -> Result<Purchase, VotingError> {
        Role::Participant(&self.participants).check(caller)?;
        let purchase = self.mint_purchase(caller, payment)?;
        tracing::info!(participant = %caller, tokens = purchase.tokens, "tokens bought");
        Ok(purchase)
    }

    /// Burn `amount` base units and return their value from the reserve.
    pub fn sell_tokens(&mut self, caller: &Address, amount: u128) -> Result<u128, VotingError> {
        Role::Participant(&self.participants).check(caller)?;
        let available = self.ledger.balance_of(caller);
        if available < amount {
            return Err(VotingError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        let value = self.cost.token_value(amount)?;
        let reserve = self.session.reserve.checked_sub(value).ok_or_else(|| {
            VotingError::InvariantViolation(format!(
                "reserve {} cannot redeem {value}",
                self.session.reserve
            ))
        })?;
        self.ledger.burn(caller, amount)?;
        self.session.reserve = reserve;
        tracing::info!(participant = %caller, tokens = amount, value, "tokens sold");
        Ok(value)
    }

    /// Set the allowance `caller` grants the engine for staking.
    pub fn approve_stake(&mut self, caller: &Address, amount: u128) -> Result<(), VotingError> {
        self.ledger.approve(caller, &self.engine_address, amount)?;
        Ok(())
    }

    fn mint_purchase(&mut self, buyer: &Address, payment: u128) -> Result<Purchase, VotingError> {
        let price = self.session.token_price;
        let whole = payment / price;
        if whole == 0 {
            return Err(VotingError::InsufficientPayment {
                paid: payment,
                price,
            });
        }
        let tokens = whole
            .checked_mul(TOKEN_UNIT)
            .ok_or(VotingError::ArithmeticOverflow("token purchase"))?;
        let spent = whole * price;
        let reserve = self
            .session
            .reserve
            .checked_add(spent)
            .ok_or(VotingError::ArithmeticOverflow("reserve"))?;
        self.ledger.mint(buyer, tokens)?;
        self.session.reserve = reserve;
        Ok(Purchase {
            tokens,
            spent,
            change: payment - spent,
        })
    }

    // ── Session lifecycle ──────────────────────────────────────────────

    /// Seed the pool and start accepting proposals.
    pub fn open_voting(&mut self, caller: &Address, seed: u128) -> Result<(), VotingError> {
        Role::Owner(&self.session.owner).check(caller)?;
        self.session.ensure_state(SessionState::Initial)?;
        let pool = self
            .session
            .pool
            .checked_add(seed)
            .ok_or(VotingError::ArithmeticOverflow("pool"))?;
        self.session.advance(SessionState::Open)?;
        self.session.pool = pool;
        tracing::info!(pool, "voting opened");
        Ok(())
    }

    /// Stop voting and classify every pending proposal with the policy.
    pub fn close_voting(&mut self, caller: &Address) -> Result<Vec<ProposalOutcome>, VotingError> {
        Role::Owner(&self.session.owner).check(caller)?;
        self.session.ensure_open()?;

        let mut ctx = SettlementContext {
            pool: self.session.pool,
            committed: 0,
            participants: self.participants.active_count(),
            pending_funding: self.proposals.pending_funding().len(),
        };
        let mut verdicts = Vec::new();
        for proposal in self.proposals.iter().filter(|p| p.is_pending()) {
            let verdict = self.policy.classify(proposal, &ctx)?;
            if verdict == Verdict::Approve && proposal.is_funding() {
                ctx.committed = ctx
                    .committed
                    .checked_add(proposal.budget)
                    .ok_or(VotingError::ArithmeticOverflow("committed budget"))?;
            }
            verdicts.push((proposal.id, verdict));
        }

        self.session.advance(SessionState::Closed)?;
        let mut outcomes = Vec::with_capacity(verdicts.len());
        for (id, verdict) in verdicts {
            let Ok(proposal) = self.proposals.get_mut(id) else {
                continue;
            };
            proposal.state = match verdict {
                Verdict::Approve => ProposalState::Approved,
                Verdict::Reject => ProposalState::Rejected,
            };
            tracing::info!(
                proposal = id,
                kind = ?proposal.kind,
                state = %proposal.state,
                votes = proposal.total_votes(),
                current_budget = proposal.current_budget(),
                "proposal settled"
            );
            outcomes.push(ProposalOutcome {
                proposal: id,
                kind: proposal.kind,
                state: proposal.state,
                total_votes: proposal.total_votes(),
                current_budget: proposal.current_budget(),
            });
        }
        tracing::info!(
            policy = self.policy.name(),
            settled = outcomes.len(),
            committed = ctx.committed,
            "voting closed"
        );
        Ok(outcomes)
    }

    /// Pay out approved funding proposals from the pool.
    ///
    /// A proposal the pool cannot cover, or whose executor refuses the
    /// payout, is moved to `Rejected` and reported; the remaining proposals
    /// are still processed.
    pub fn finish_voting_session(
        &mut self,
        caller: &Address,
    ) -> Result<SettlementReport, VotingError> {
        Role::Owner(&self.session.owner).check(caller)?;
        self.session.ensure_state(SessionState::Closed)?;

        let mut report = SettlementReport::default();
        let approved: Vec<ProposalId> = self
            .proposals
            .iter()
            .filter(|p| p.state == ProposalState::Approved && p.is_funding())
            .map(|p| p.id)
            .collect();

        for id in approved {
            let Ok(proposal) = self.proposals.get_mut(id) else {
                continue;
            };
            let budget = proposal.budget;
            let pool = self.session.pool;
            if pool < budget {
                let error = VotingError::InsufficientPool {
                    needed: budget,
                    available: pool,
                };
                tracing::warn!(proposal = id, %error, "payout skipped");
                proposal.state = ProposalState::Rejected;
                report.failed.push(FailedPayout { proposal: id, error });
                continue;
            }
            match self.executor.execute(id, &proposal.executor, budget) {
                Ok(()) => {
                    self.session.pool = pool - budget;
                    proposal.executed = true;
                    tracing::info!(
                        proposal = id,
                        executor = %proposal.executor,
                        amount = budget,
                        "proposal paid out"
                    );
                    report.paid.push(Payout {
                        proposal: id,
                        executor: proposal.executor.clone(),
                        amount: budget,
                    });
                }
                Err(e) => {
                    let error = VotingError::PayoutFailed {
                        id,
                        reason: e.to_string(),
                    };
                    tracing::warn!(proposal = id, %error, "payout failed");
                    proposal.state = ProposalState::Rejected;
                    report.failed.push(FailedPayout { proposal: id, error });
                }
            }
        }

        self.session.advance(SessionState::Finished)?;
        report.pool_remaining = self.session.pool;
        tracing::info!(
            paid = report.paid.len(),
            failed = report.failed.len(),
            pool = report.pool_remaining,
            "voting session finished"
        );
        Ok(report)
    }

    // ── Proposals ──────────────────────────────────────────────────────

    /// Create a pending proposal. `budget == 0` makes it a signaling proposal.
    pub fn add_proposal(
        &mut self,
        caller: &Address,
        title: impl Into<String>,
        description: impl Into<String>,
        budget: u128,
        executor: Address,
    ) -> Result<ProposalId, VotingError> {
        self.session.ensure_open()?;
        Role::Participant(&self.participants).check(caller)?;
        let id = self
            .proposals
            .add(title, description, budget, executor, caller.clone());
        tracing::info!(proposal = id, creator = %caller, budget, "proposal added");
        Ok(id)
    }

    /// Withdraw a pending proposal. Every stake in it is refunded.
    pub fn cancel_proposal(&mut self, caller: &Address, id: ProposalId) -> Result<u128, VotingError> {
        let proposal = self.proposals.get(id)?;
        Role::Creator(proposal).check(caller)?;
        self.exclude(id, ProposalState::Cancelled)
    }

    /// Administratively exclude a pending proposal from settlement.
    /// Every stake in it is refunded.
    pub fn disable_proposal(&mut self, caller: &Address, id: ProposalId) -> Result<u128, VotingError> {
        Role::Owner(&self.session.owner).check(caller)?;
        self.exclude(id, ProposalState::Disabled)
    }

    fn exclude(&mut self, id: ProposalId, to: ProposalState) -> Result<u128, VotingError> {
        let cost = self.cost;
        let proposal = self.proposals.get_pending(id)?;
        let refunds = proposal
            .voters()
            .map(|(voter, votes)| -> Result<(Address, u128), VotingError> {
                Ok((voter.clone(), cost.token_cost(votes)?))
            })
            .collect::<Result<Vec<_>, VotingError>>()?;

        let refunded = Self::release_batch(&mut self.ledger, &self.engine_address, &refunds)?;
        let proposal = self.proposals.get_mut(id)?;
        proposal.clear_votes();
        proposal.state = to;
        tracing::info!(
            proposal = id,
            state = %to,
            voters = refunds.len(),
            refunded,
            "proposal excluded"
        );
        Ok(refunded)
    }

    /// Add `delta` votes to the caller's tally on a pending proposal.
    ///
    /// Costs `cost(v + Δ) − cost(v)`, pulled from the caller through the
    /// allowance they granted the engine.
    pub fn stake(
        &mut self,
        caller: &Address,
        id: ProposalId,
        delta: u64,
    ) -> Result<StakeReceipt, VotingError> {
        self.session.ensure_open()?;
        Role::Participant(&self.participants).check(caller)?;
        if delta == 0 {
            return Err(VotingError::InvalidVoteAmount);
        }
        let proposal = self.proposals.get_mut(id)?;
        if !proposal.is_pending() {
            return Err(VotingError::InvalidProposalState {
                id,
                state: proposal.state,
            });
        }
        let current = proposal.votes_of(caller);
        let quote = self.cost.quote_stake(current, delta)?;
        let votes = current + delta;
        let update = proposal.prepare_votes(caller, votes, &self.cost)?;

        let approved = self.ledger.allowance(caller, &self.engine_address);
        if approved < quote.tokens {
            return Err(VotingError::InsufficientAllowance {
                needed: quote.tokens,
                approved,
            });
        }
        let available = self.ledger.balance_of(caller);
        if available < quote.tokens {
            return Err(VotingError::InsufficientBalance {
                needed: quote.tokens,
                available,
            });
        }
        self.ledger.transfer_from(
            caller,
            &self.engine_address,
            &self.engine_address,
            quote.tokens,
        )?;
        proposal.apply(update);

        tracing::debug!(
            proposal = id,
            voter = %caller,
            delta,
            votes,
            tokens = quote.tokens,
            current_budget = proposal.current_budget(),
            "stake"
        );
        Ok(Self::receipt(id, votes, quote))
    }

    /// Remove `delta` votes from the caller's tally and refund the exact
    /// quadratic difference `cost(v) − cost(v − Δ)`.
    ///
    /// While voting is open only pending proposals qualify. Once closed,
    /// any proposal that did not end approved does.
    pub fn withdraw_from_proposal(
        &mut self,
        caller: &Address,
        id: ProposalId,
        delta: u64,
    ) -> Result<StakeReceipt, VotingError> {
        Role::Participant(&self.participants).check(caller)?;
        let session_state = self.session.state;
        if !matches!(session_state, SessionState::Open | SessionState::Closed) {
            return Err(VotingError::InvalidSessionState {
                expected: "open or closed",
                actual: session_state,
            });
        }
        if delta == 0 {
            return Err(VotingError::InvalidVoteAmount);
        }
        let proposal = self.proposals.get_mut(id)?;
        let withdrawable = match session_state {
            SessionState::Open => proposal.is_pending(),
            _ => proposal.state != ProposalState::Approved,
        };
        if !withdrawable {
            return Err(VotingError::InvalidProposalState {
                id,
                state: proposal.state,
            });
        }
        let current = proposal.votes_of(caller);
        let quote = self.cost.quote_withdraw(current, delta)?;
        let votes = current - delta;
        let update = proposal.prepare_votes(caller, votes, &self.cost)?;

        self.ledger
            .transfer(&self.engine_address, caller, quote.tokens)?;
        proposal.apply(update);

        tracing::debug!(
            proposal = id,
            voter = %caller,
            delta,
            votes,
            tokens = quote.tokens,
            current_budget = proposal.current_budget(),
            "withdraw"
        );
        Ok(Self::receipt(id, votes, quote))
    }

    /// Refund every stake the caller holds in proposals that did not end
    /// approved. Returns the token base units refunded.
    pub fn request_funds_return(&mut self, caller: &Address) -> Result<u128, VotingError> {
        Role::Participant(&self.participants).check(caller)?;
        self.session.ensure_settled()?;

        let cost = self.cost;
        let mut updates = Vec::new();
        let mut total = 0u128;
        for proposal in self
            .proposals
            .iter()
            .filter(|p| p.state != ProposalState::Approved)
        {
            let votes = proposal.votes_of(caller);
            if votes == 0 {
                continue;
            }
            total = total
                .checked_add(cost.token_cost(votes)?)
                .ok_or(VotingError::ArithmeticOverflow("refund total"))?;
            updates.push((proposal.id, proposal.prepare_votes(caller, 0, &cost)?));
        }
        if updates.is_empty() {
            return Ok(0);
        }

        Self::release_batch(
            &mut self.ledger,
            &self.engine_address,
            &[(caller.clone(), total)],
        )?;
        let proposals = updates.len();
        for (id, update) in updates {
            if let Ok(proposal) = self.proposals.get_mut(id) {
                proposal.apply(update);
            }
        }
        tracing::info!(voter = %caller, proposals, tokens = total, "funds returned");
        Ok(total)
    }

    fn receipt(proposal: ProposalId, votes: u64, quote: Quote) -> StakeReceipt {
        StakeReceipt {
            proposal,
            votes,
            tokens: quote.tokens,
            value: quote.value,
        }
    }

    /// Transfer tokens out of custody to several recipients as one unit.
    ///
    /// If a transfer fails, the ones already made are reversed before the
    /// error is returned.
    fn release_batch(
        ledger: &mut L,
        custody: &Address,
        payouts: &[(Address, u128)],
    ) -> Result<u128, VotingError> {
        let total = payouts
            .iter()
            .try_fold(0u128, |acc, (_, tokens)| acc.checked_add(*tokens))
            .ok_or(VotingError::ArithmeticOverflow("refund total"))?;
        let held = ledger.balance_of(custody);
        if held < total {
            return Err(VotingError::InvariantViolation(format!(
                "custody holds {held} but owes {total}"
            )));
        }
        for (i, (to, tokens)) in payouts.iter().enumerate() {
            if let Err(e) = ledger.transfer(custody, to, *tokens) {
                for (back, back_tokens) in payouts[..i].iter().rev() {
                    if let Err(undo) = ledger.transfer(back, custody, *back_tokens) {
                        tracing::error!(
                            to = %back,
                            tokens = back_tokens,
                            error = %undo,
                            "failed to reverse partial refund"
                        );
                    }
                }
                return Err(e.into());
            }
        }
        Ok(total)
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn session(&self) -> &VotingSession {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    pub fn owner(&self) -> &Address {
        &self.session.owner
    }

    pub fn pool(&self) -> u128 {
        self.session.pool
    }

    pub fn reserve(&self) -> u128 {
        self.session.reserve
    }

    pub fn token_price(&self) -> u128 {
        self.session.token_price
    }

    /// The custody account holding staked tokens.
    pub fn engine_address(&self) -> &Address {
        &self.engine_address
    }

    pub fn cost(&self) -> &QuadraticCost {
        &self.cost
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// The governance token ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn executor(&self) -> &X {
        &self.executor
    }

    pub fn proposal(&self, id: ProposalId) -> Result<&Proposal, VotingError> {
        self.proposals.get(id)
    }

    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> + '_ {
        self.proposals.iter()
    }

    /// `"title: <title>\ndescription: <description>"`.
    pub fn proposal_info(&self, id: ProposalId) -> Result<String, VotingError> {
        Ok(self.proposals.get(id)?.info())
    }

    pub fn proposal_budget(&self, id: ProposalId) -> Result<u128, VotingError> {
        Ok(self.proposals.get(id)?.budget)
    }

    pub fn proposal_total_votes(&self, id: ProposalId) -> Result<u128, VotingError> {
        Ok(self.proposals.get(id)?.total_votes())
    }

    pub fn proposal_current_budget(&self, id: ProposalId) -> Result<u128, VotingError> {
        Ok(self.proposals.get(id)?.current_budget())
    }

    pub fn votes_of(&self, id: ProposalId, voter: &Address) -> Result<u64, VotingError> {
        Ok(self.proposals.get(id)?.votes_of(voter))
    }

    /// Pending signaling proposals.
    pub fn signaling_proposals(&self) -> Vec<ProposalId> {
        self.proposals.signaling()
    }

    /// Pending funding proposals.
    pub fn pending_proposals(&self) -> Vec<ProposalId> {
        self.proposals.pending_funding()
    }

    pub fn approved_proposals(&self) -> Vec<ProposalId> {
        self.proposals.approved()
    }

    /// Recheck every bookkeeping invariant against the ledger.
    pub fn check_invariants(&self) -> Result<(), VotingError> {
        let mut locked = 0u128;
        for proposal in self.proposals.iter() {
            let (votes, budget) = proposal.recompute(&self.cost)?;
            if votes != proposal.total_votes() || budget != proposal.current_budget() {
                return Err(VotingError::InvariantViolation(format!(
                    "proposal {} tallies {}/{} but voters sum to {votes}/{budget}",
                    proposal.id,
                    proposal.total_votes(),
                    proposal.current_budget()
                )));
            }
            if self.session.state.is_settled() && proposal.is_pending() {
                return Err(VotingError::InvariantViolation(format!(
                    "proposal {} still pending after close",
                    proposal.id
                )));
            }
            locked = locked
                .checked_add(proposal.locked_tokens(&self.cost)?)
                .ok_or(VotingError::ArithmeticOverflow("locked tokens"))?;
        }
        let custody = self.ledger.balance_of(&self.engine_address);
        if custody < locked {
            return Err(VotingError::InvariantViolation(format!(
                "custody holds {custody} but {locked} is staked"
            )));
        }
        let backing = self.cost.token_value(self.ledger.total_supply())?;
        if self.session.reserve < backing {
            return Err(VotingError::InvariantViolation(format!(
                "reserve {} does not back supply worth {backing}",
                self.session.reserve
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::PayoutBook;
    use qvote_token::{TokenEngine, TokenMetadata};

    const PRICE: u128 = 300_000;

    type Engine = QuadraticVoting<TokenEngine, PayoutBook>;

    fn test_address(n: u64) -> Address {
        Address::from_index(n)
    }

    fn owner() -> Address {
        test_address(1)
    }

    fn engine_address() -> Address {
        test_address(0xc0de)
    }

    fn make_engine() -> Engine {
        QuadraticVoting::new(
            owner(),
            engine_address(),
            PRICE,
            TokenEngine::new(TokenMetadata::default()),
            PayoutBook::new(),
        )
        .unwrap()
    }

    /// Open engine with one participant holding `tokens` whole tokens, all approved.
    fn open_with_voter(tokens: u128) -> (Engine, Address) {
        let mut engine = make_engine();
        let voter = test_address(2);
        engine.open_voting(&owner(), 10 * PRICE).unwrap();
        engine.add_participant(&voter, tokens * PRICE).unwrap();
        engine.approve_stake(&voter, tokens * TOKEN_UNIT).unwrap();
        (engine, voter)
    }

    #[test]
    fn rejects_zero_price_and_bad_custody() {
        let ledger = TokenEngine::default();
        assert!(QuadraticVoting::new(owner(), engine_address(), 0, ledger.clone(), PayoutBook::new()).is_err());
        assert!(QuadraticVoting::new(owner(), owner(), PRICE, ledger, PayoutBook::new()).is_err());
    }

    #[test]
    fn add_participant_mints_floor_and_returns_change() {
        let mut engine = make_engine();
        let voter = test_address(2);
        let purchase = engine.add_participant(&voter, 2 * PRICE + 7).unwrap();
        assert_eq!(purchase.tokens, 2 * TOKEN_UNIT);
        assert_eq!(purchase.spent, 2 * PRICE);
        assert_eq!(purchase.change, 7);
        assert_eq!(engine.reserve(), 2 * PRICE);
        assert!(engine.is_participant(&voter));
    }

    #[test]
    fn add_participant_below_price_fails() {
        let mut engine = make_engine();
        let voter = test_address(2);
        assert_eq!(
            engine.add_participant(&voter, PRICE - 1),
            Err(VotingError::InsufficientPayment {
                paid: PRICE - 1,
                price: PRICE
            })
        );
        assert!(!engine.is_participant(&voter));
        assert_eq!(engine.ledger().balance_of(&voter), 0);
    }

    #[test]
    fn sell_returns_value_from_reserve() {
        let mut engine = make_engine();
        let voter = test_address(2);
        engine.add_participant(&voter, 3 * PRICE).unwrap();
        assert_eq!(engine.sell_tokens(&voter, TOKEN_UNIT).unwrap(), PRICE);
        assert_eq!(engine.reserve(), 2 * PRICE);
        assert_eq!(engine.ledger().balance_of(&voter), 2 * TOKEN_UNIT);
        engine.check_invariants().unwrap();
    }

    #[test]
    fn buy_and_sell_require_participation() {
        let mut engine = make_engine();
        let stranger = test_address(9);
        assert_eq!(
            engine.buy_tokens(&stranger, PRICE),
            Err(VotingError::NotAParticipant(stranger.clone()))
        );
        assert_eq!(
            engine.sell_tokens(&stranger, 0),
            Err(VotingError::NotAParticipant(stranger.clone()))
        );
    }

    #[test]
    fn open_voting_is_owner_only_and_seeds_pool() {
        let mut engine = make_engine();
        assert_eq!(
            engine.open_voting(&test_address(2), PRICE),
            Err(VotingError::NotOwner(test_address(2)))
        );
        engine.open_voting(&owner(), 1_000).unwrap();
        assert_eq!(engine.pool(), 1_000);
        assert_eq!(engine.state(), SessionState::Open);
        assert!(matches!(
            engine.open_voting(&owner(), 1),
            Err(VotingError::InvalidSessionState { .. })
        ));
    }

    #[test]
    fn stake_then_withdraw_prices_quadratically() {
        let (mut engine, voter) = open_with_voter(4);
        let id = engine
            .add_proposal(&voter, "title", "description", 0, test_address(50))
            .unwrap();

        let r = engine.stake(&voter, id, 1).unwrap();
        assert_eq!(r.tokens, TOKEN_UNIT);
        assert_eq!(engine.proposal_current_budget(id).unwrap(), PRICE);

        let r = engine.stake(&voter, id, 1).unwrap();
        assert_eq!(r.tokens, 3 * TOKEN_UNIT);
        assert_eq!(engine.proposal_current_budget(id).unwrap(), 4 * PRICE);
        assert_eq!(engine.proposal_total_votes(id).unwrap(), 2);
        assert_eq!(engine.ledger().balance_of(&voter), 0);

        let r = engine.withdraw_from_proposal(&voter, id, 1).unwrap();
        assert_eq!(r.tokens, 3 * TOKEN_UNIT);
        assert_eq!(engine.proposal_current_budget(id).unwrap(), PRICE);
        assert_eq!(engine.ledger().balance_of(&voter), 3 * TOKEN_UNIT);
        engine.check_invariants().unwrap();
    }

    #[test]
    fn stake_without_allowance_fails_cleanly() {
        let mut engine = make_engine();
        let voter = test_address(2);
        engine.open_voting(&owner(), 0).unwrap();
        engine.add_participant(&voter, PRICE).unwrap();
        let id = engine
            .add_proposal(&voter, "title", "description", 0, test_address(50))
            .unwrap();

        assert_eq!(
            engine.stake(&voter, id, 1),
            Err(VotingError::InsufficientAllowance {
                needed: TOKEN_UNIT,
                approved: 0
            })
        );
        assert_eq!(engine.proposal_total_votes(id).unwrap(), 0);
        assert_eq!(engine.ledger().balance_of(&voter), TOKEN_UNIT);
    }

    #[test]
    fn stake_zero_votes_is_invalid() {
        let (mut engine, voter) = open_with_voter(1);
        let id = engine
            .add_proposal(&voter, "t", "d", 0, test_address(50))
            .unwrap();
        assert_eq!(engine.stake(&voter, id, 0), Err(VotingError::InvalidVoteAmount));
    }

    #[test]
    fn stake_unknown_proposal_fails() {
        let (mut engine, voter) = open_with_voter(1);
        assert_eq!(engine.stake(&voter, 1, 1), Err(VotingError::UnknownProposal(1)));
        assert_eq!(engine.proposal_budget(0), Err(VotingError::UnknownProposal(0)));
    }

    #[test]
    fn withdraw_more_than_staked_fails() {
        let (mut engine, voter) = open_with_voter(1);
        let id = engine
            .add_proposal(&voter, "t", "d", 0, test_address(50))
            .unwrap();
        engine.stake(&voter, id, 1).unwrap();
        assert_eq!(
            engine.withdraw_from_proposal(&voter, id, 2),
            Err(VotingError::InsufficientVotes {
                requested: 2,
                staked: 1
            })
        );
    }

    #[test]
    fn cancel_refunds_every_voter() {
        let (mut engine, alice) = open_with_voter(4);
        let bob = test_address(3);
        engine.add_participant(&bob, PRICE).unwrap();
        engine.approve_stake(&bob, TOKEN_UNIT).unwrap();

        let id = engine
            .add_proposal(&alice, "t", "d", 0, test_address(50))
            .unwrap();
        engine.stake(&alice, id, 2).unwrap();
        engine.stake(&bob, id, 1).unwrap();

        assert!(matches!(
            engine.cancel_proposal(&bob, id),
            Err(VotingError::NotCreator { .. })
        ));
        let refunded = engine.cancel_proposal(&alice, id).unwrap();
        assert_eq!(refunded, 5 * TOKEN_UNIT);
        assert_eq!(engine.ledger().balance_of(&alice), 4 * TOKEN_UNIT);
        assert_eq!(engine.ledger().balance_of(&bob), TOKEN_UNIT);
        let p = engine.proposal(id).unwrap();
        assert_eq!(p.state, ProposalState::Cancelled);
        assert_eq!(p.total_votes(), 0);
        assert_eq!(p.current_budget(), 0);

        assert_eq!(
            engine.cancel_proposal(&alice, id),
            Err(VotingError::InvalidProposalState {
                id,
                state: ProposalState::Cancelled
            })
        );
        engine.check_invariants().unwrap();
    }

    #[test]
    fn disable_is_owner_only() {
        let (mut engine, voter) = open_with_voter(1);
        let id = engine
            .add_proposal(&voter, "t", "d", 0, test_address(50))
            .unwrap();
        engine.stake(&voter, id, 1).unwrap();
        assert_eq!(
            engine.disable_proposal(&voter, id),
            Err(VotingError::NotOwner(voter.clone()))
        );
        assert_eq!(engine.disable_proposal(&owner(), id).unwrap(), TOKEN_UNIT);
        assert_eq!(engine.proposal(id).unwrap().state, ProposalState::Disabled);
        assert!(engine.signaling_proposals().is_empty());
    }

    #[test]
    fn close_approves_covered_funding_and_finish_pays_it() {
        let (mut engine, voter) = open_with_voter(4);
        let executor = test_address(50);
        let covered = engine
            .add_proposal(&voter, "t", "d", 4 * PRICE, executor.clone())
            .unwrap();
        let uncovered = engine
            .add_proposal(&voter, "t", "d", 9 * PRICE, executor.clone())
            .unwrap();
        engine.stake(&voter, covered, 2).unwrap();

        let outcomes = engine.close_voting(&owner()).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(engine.proposal(covered).unwrap().state, ProposalState::Approved);
        assert_eq!(engine.proposal(uncovered).unwrap().state, ProposalState::Rejected);
        assert_eq!(engine.approved_proposals(), vec![covered]);

        let report = engine.finish_voting_session(&owner()).unwrap();
        assert_eq!(report.paid.len(), 1);
        assert_eq!(report.pool_remaining, 6 * PRICE);
        assert_eq!(engine.executor().credited(&executor), 4 * PRICE);
        assert!(engine.proposal(covered).unwrap().executed);
        assert_eq!(engine.state(), SessionState::Finished);
        engine.check_invariants().unwrap();
    }

    #[test]
    fn approved_stakes_are_not_refundable() {
        let (mut engine, voter) = open_with_voter(4);
        let id = engine
            .add_proposal(&voter, "t", "d", 0, test_address(50))
            .unwrap();
        engine.stake(&voter, id, 1).unwrap();
        engine.close_voting(&owner()).unwrap();
        assert_eq!(engine.proposal(id).unwrap().state, ProposalState::Approved);

        assert_eq!(engine.request_funds_return(&voter).unwrap(), 0);
        assert!(matches!(
            engine.withdraw_from_proposal(&voter, id, 1),
            Err(VotingError::InvalidProposalState { .. })
        ));
    }

    #[test]
    fn request_funds_return_requires_settlement() {
        let (mut engine, voter) = open_with_voter(1);
        assert!(matches!(
            engine.request_funds_return(&voter),
            Err(VotingError::InvalidSessionState { .. })
        ));
    }

    #[test]
    fn finish_requires_closed() {
        let mut engine = make_engine();
        engine.open_voting(&owner(), 0).unwrap();
        assert!(matches!(
            engine.finish_voting_session(&owner()),
            Err(VotingError::InvalidSessionState { .. })
        ));
        assert_eq!(
            engine.close_voting(&test_address(2)),
            Err(VotingError::NotOwner(test_address(2)))
        );
    }
}
