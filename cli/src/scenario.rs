//! Scenario replay: a JSON list of caller-stamped actions run against one
//! voting session, and the report produced from it.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use qvote_token::{TokenEngine, TokenLedger, TokenMetadata};
use qvote_types::{Address, TokenAmount};
use qvote_voting::{
    EngineConfig, PayoutBook, ProposalId, ProposalKind, ProposalOutcome, ProposalState, Purchase,
    QuadraticVoting, SessionState, SettlementReport, StakeReceipt, VotingError,
};
use serde::{Deserialize, Serialize};

pub type Engine = QuadraticVoting<TokenEngine, PayoutBook>;

/// A scenario file.
#[derive(Clone, Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub description: String,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_json_str(&content).with_context(|| format!("parsing scenario {}", path.display()))
    }

    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Step {
    pub caller: Address,
    #[serde(flatten)]
    pub action: Action,
}

/// One engine operation. Values are plain integers; token amounts are
/// decimal strings in whole tokens (`"1.5"`).
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    AddParticipant {
        payment: u64,
    },
    RemoveParticipant,
    BuyTokens {
        payment: u64,
    },
    SellTokens {
        amount: String,
    },
    /// Set the caller's staking allowance for the engine.
    Approve {
        amount: String,
    },
    OpenVoting {
        #[serde(default)]
        seed: u64,
    },
    CloseVoting,
    FinishVotingSession,
    AddProposal {
        title: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        budget: u64,
        executor: Address,
    },
    CancelProposal {
        proposal: ProposalId,
    },
    DisableProposal {
        proposal: ProposalId,
    },
    Stake {
        proposal: ProposalId,
        votes: u64,
    },
    Withdraw {
        proposal: ProposalId,
        votes: u64,
    },
    RequestFundsReturn,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddParticipant { .. } => "add_participant",
            Self::RemoveParticipant => "remove_participant",
            Self::BuyTokens { .. } => "buy_tokens",
            Self::SellTokens { .. } => "sell_tokens",
            Self::Approve { .. } => "approve",
            Self::OpenVoting { .. } => "open_voting",
            Self::CloseVoting => "close_voting",
            Self::FinishVotingSession => "finish_voting_session",
            Self::AddProposal { .. } => "add_proposal",
            Self::CancelProposal { .. } => "cancel_proposal",
            Self::DisableProposal { .. } => "disable_proposal",
            Self::Stake { .. } => "stake",
            Self::Withdraw { .. } => "withdraw",
            Self::RequestFundsReturn => "request_funds_return",
        }
    }
}

/// What a successful step returned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StepOutput {
    Done,
    Purchase(Purchase),
    Receipt(StakeReceipt),
    Proposal { proposal: ProposalId },
    Tokens { tokens: String },
    Value { value: u128 },
    Outcomes(Vec<ProposalOutcome>),
    Settlement(SettlementReport),
}

#[derive(Clone, Debug, Serialize)]
pub struct StepResult {
    pub step: usize,
    pub caller: Address,
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<StepOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ProposalSummary {
    pub id: ProposalId,
    pub title: String,
    pub kind: ProposalKind,
    pub state: ProposalState,
    pub budget: u128,
    pub total_votes: u128,
    pub current_budget: u128,
    pub executed: bool,
}

/// Final session snapshot plus the per-step log.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub state: SessionState,
    pub policy: &'static str,
    pub token_price: u128,
    pub pool: u128,
    pub reserve: u128,
    pub total_supply: String,
    pub custody: String,
    pub participants: Vec<Address>,
    pub proposals: Vec<ProposalSummary>,
    pub balances: BTreeMap<Address, String>,
    pub steps: Vec<StepResult>,
}

/// Build the engine described by `config` over a fresh in-memory ledger.
pub fn build_engine(config: &EngineConfig) -> anyhow::Result<Engine> {
    let ledger = TokenEngine::new(TokenMetadata::new(
        config.token_name.clone(),
        config.token_symbol.clone(),
    ));
    Ok(QuadraticVoting::from_config(config, ledger, PayoutBook::new())?)
}

fn parse_tokens(amount: &str) -> Result<u128, VotingError> {
    TokenAmount::parse_decimal(amount)
        .map(|a| a.raw())
        .map_err(|e| VotingError::Config(e.to_string()))
}

fn tokens_output(raw: u128) -> StepOutput {
    StepOutput::Tokens {
        tokens: TokenAmount::new(raw).to_string(),
    }
}

/// Apply one action on behalf of `caller`.
pub fn apply(engine: &mut Engine, caller: &Address, action: &Action) -> Result<StepOutput, VotingError> {
    let output = match action {
        Action::AddParticipant { payment } => {
            StepOutput::Purchase(engine.add_participant(caller, *payment as u128)?)
        }
        Action::RemoveParticipant => {
            engine.remove_participant(caller)?;
            StepOutput::Done
        }
        Action::BuyTokens { payment } => {
            StepOutput::Purchase(engine.buy_tokens(caller, *payment as u128)?)
        }
        Action::SellTokens { amount } => StepOutput::Value {
            value: engine.sell_tokens(caller, parse_tokens(amount)?)?,
        },
        Action::Approve { amount } => {
            engine.approve_stake(caller, parse_tokens(amount)?)?;
            StepOutput::Done
        }
        Action::OpenVoting { seed } => {
            engine.open_voting(caller, *seed as u128)?;
            StepOutput::Done
        }
        Action::CloseVoting => StepOutput::Outcomes(engine.close_voting(caller)?),
        Action::FinishVotingSession => StepOutput::Settlement(engine.finish_voting_session(caller)?),
        Action::AddProposal {
            title,
            description,
            budget,
            executor,
        } => StepOutput::Proposal {
            proposal: engine.add_proposal(
                caller,
                title.as_str(),
                description.as_str(),
                *budget as u128,
                executor.clone(),
            )?,
        },
        Action::CancelProposal { proposal } => tokens_output(engine.cancel_proposal(caller, *proposal)?),
        Action::DisableProposal { proposal } => {
            tokens_output(engine.disable_proposal(caller, *proposal)?)
        }
        Action::Stake { proposal, votes } => {
            StepOutput::Receipt(engine.stake(caller, *proposal, *votes)?)
        }
        Action::Withdraw { proposal, votes } => {
            StepOutput::Receipt(engine.withdraw_from_proposal(caller, *proposal, *votes)?)
        }
        Action::RequestFundsReturn => tokens_output(engine.request_funds_return(caller)?),
    };
    Ok(output)
}

/// Replay every step. A failing step is recorded and, unless `fail_fast`
/// is set, the replay continues with the next one.
pub fn run(engine: &mut Engine, scenario: &Scenario, fail_fast: bool) -> Vec<StepResult> {
    let mut results = Vec::with_capacity(scenario.steps.len());
    for (i, step) in scenario.steps.iter().enumerate() {
        let action = step.action.name();
        let result = match apply(engine, &step.caller, &step.action) {
            Ok(output) => {
                tracing::info!(step = i, caller = %step.caller, action, "step ok");
                StepResult {
                    step: i,
                    caller: step.caller.clone(),
                    action,
                    output: Some(output),
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(step = i, caller = %step.caller, action, error = %e, "step failed");
                StepResult {
                    step: i,
                    caller: step.caller.clone(),
                    action,
                    output: None,
                    error: Some(e.to_string()),
                }
            }
        };
        let failed = !result.is_ok();
        results.push(result);
        if failed && fail_fast {
            break;
        }
    }
    results
}

/// Snapshot the engine after a replay.
pub fn report(engine: &Engine, steps: Vec<StepResult>) -> Report {
    let ledger = engine.ledger();
    let mut balances = BTreeMap::new();
    for (holder, balance) in ledger.holders() {
        if &holder != engine.engine_address() {
            balances.insert(holder, TokenAmount::new(balance).to_string());
        }
    }
    Report {
        state: engine.state(),
        policy: engine.policy_name(),
        token_price: engine.token_price(),
        pool: engine.pool(),
        reserve: engine.reserve(),
        total_supply: TokenAmount::new(ledger.total_supply()).to_string(),
        custody: TokenAmount::new(ledger.balance_of(engine.engine_address())).to_string(),
        participants: engine
            .participants()
            .filter(|p| p.active)
            .map(|p| p.address.clone())
            .collect(),
        proposals: engine
            .proposals()
            .map(|p| ProposalSummary {
                id: p.id,
                title: p.title.clone(),
                kind: p.kind,
                state: p.state,
                budget: p.budget,
                total_votes: p.total_votes(),
                current_budget: p.current_budget(),
                executed: p.executed,
            })
            .collect(),
        balances,
        steps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = include_str!("../scenarios/basic.json");

    fn engine() -> Engine {
        build_engine(&EngineConfig::default()).unwrap()
    }

    #[test]
    fn parses_tagged_steps() {
        let scenario = Scenario::from_json_str(
            r#"{"steps": [
                {"caller": "0x1", "action": "open_voting", "seed": 5},
                {"caller": "0x2", "action": "close_voting"},
                {"caller": "0x2", "action": "stake", "proposal": 1, "votes": 3}
            ]}"#,
        )
        .unwrap();
        assert_eq!(scenario.steps.len(), 3);
        assert!(matches!(scenario.steps[0].action, Action::OpenVoting { seed: 5 }));
        assert!(matches!(scenario.steps[1].action, Action::CloseVoting));
        assert_eq!(scenario.steps[2].action.name(), "stake");
        assert_eq!(scenario.steps[2].caller, Address::new("0x2"));
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(Scenario::from_json_str(
            r#"{"steps": [{"caller": "0x1", "action": "mint_everything"}]}"#
        )
        .is_err());
    }

    #[test]
    fn basic_scenario_settles() {
        let scenario = Scenario::from_json_str(BASIC).unwrap();
        let mut engine = engine();
        let steps = run(&mut engine, &scenario, true);
        assert!(steps.iter().all(StepResult::is_ok), "{steps:?}");
        assert_eq!(steps.len(), scenario.steps.len());

        let report = report(&engine, steps);
        assert_eq!(report.state, SessionState::Finished);
        assert_eq!(report.pool, 1_800_000);
        assert_eq!(report.reserve, 2_100_000 - 450_000);
        assert_eq!(report.proposals[0].state, ProposalState::Approved);
        assert!(report.proposals[0].executed);
        assert_eq!(report.proposals[1].state, ProposalState::Rejected);
        assert_eq!(report.custody, "4");
        assert_eq!(report.balances[&Address::new("0xb0b")], "0.5");
        assert_eq!(report.balances[&Address::new("0xa11ce")], "1");
        engine.check_invariants().unwrap();
    }

    #[test]
    fn failed_steps_are_recorded_and_replay_continues() {
        let scenario = Scenario::from_json_str(
            r#"{"steps": [
                {"caller": "0x2", "action": "open_voting"},
                {"caller": "0x1", "action": "open_voting"}
            ]}"#,
        )
        .unwrap();
        let mut engine = engine();
        let steps = run(&mut engine, &scenario, false);
        assert_eq!(steps.len(), 2);
        assert!(!steps[0].is_ok());
        assert!(steps[0].error.as_deref().unwrap().contains("owner"));
        assert!(steps[1].is_ok());
        assert_eq!(engine.state(), SessionState::Open);
    }

    #[test]
    fn fail_fast_stops_at_first_error() {
        let scenario = Scenario::from_json_str(
            r#"{"steps": [
                {"caller": "0x2", "action": "close_voting"},
                {"caller": "0x1", "action": "open_voting"}
            ]}"#,
        )
        .unwrap();
        let mut engine = engine();
        assert_eq!(run(&mut engine, &scenario, true).len(), 1);
        assert_eq!(engine.state(), SessionState::Initial);
    }

    #[test]
    fn bad_token_amount_fails_the_step() {
        let mut engine = engine();
        let err = apply(
            &mut engine,
            &Address::new("0x2"),
            &Action::Approve {
                amount: "1.2.3".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, VotingError::Config(_)));
    }

    #[test]
    fn report_serializes_to_json() {
        let mut engine = engine();
        let scenario = Scenario::from_json_str(BASIC).unwrap();
        let steps = run(&mut engine, &scenario, false);
        let json = serde_json::to_string_pretty(&report(&engine, steps)).unwrap();
        assert!(json.contains("\"state\": \"finished\""));
        assert!(json.contains("\"policy\": \"coverage\""));
    }
}
