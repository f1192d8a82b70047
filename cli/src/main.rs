//! qvote: command line front-end for the quadratic voting engine.

mod scenario;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use qvote_types::{Address, TOKEN_UNIT};
use qvote_utils::{format_tokens, group_digits, LogFormat};
use qvote_voting::{EngineConfig, QuadraticCost};

#[derive(Parser, Debug)]
#[command(name = "qvote", about = "Quadratic voting engine")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "QVOTE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "QVOTE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "QVOTE_LOG_FORMAT")]
    log_format: Option<String>,

    /// Value of one whole token.
    #[arg(long, env = "QVOTE_TOKEN_PRICE")]
    token_price: Option<u64>,

    /// Session owner address.
    #[arg(long, env = "QVOTE_OWNER")]
    owner: Option<Address>,

    /// Custody address holding staked tokens.
    #[arg(long, env = "QVOTE_ENGINE_ADDRESS")]
    engine_address: Option<Address>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Replay a JSON scenario against a fresh session and print a JSON report.
    Simulate {
        /// Scenario file.
        #[arg(long)]
        script: PathBuf,

        /// Stop at the first failing step.
        #[arg(long)]
        fail_fast: bool,
    },
    /// Print the quadratic cost table.
    Cost {
        /// Highest vote count to price.
        #[arg(long)]
        votes: u64,

        /// Lowest vote count to price.
        #[arg(long, default_value_t = 1)]
        from: u64,
    },
    /// Print the effective configuration as TOML.
    Config,
}

/// File configuration overridden by flags and env vars.
fn effective_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    if let Some(price) = cli.token_price {
        config.token_price = price;
    }
    if let Some(owner) = &cli.owner {
        config.owner = owner.clone();
    }
    if let Some(engine_address) = &cli.engine_address {
        config.engine_address = engine_address.clone();
    }
    config.validate()?;
    Ok(config)
}

fn cost_table(price: u128, from: u64, to: u64, symbol: &str) -> anyhow::Result<Vec<String>> {
    let cost = QuadraticCost::new(price);
    let mut rows = vec![format!(
        "{:>8}  {:>24}  {:>24}  {:>20}",
        "votes", "cost", "marginal", "tokens locked"
    )];
    for votes in from..=to {
        let marginal = cost.incremental_cost(votes - 1, 1)?;
        rows.push(format!(
            "{:>8}  {:>24}  {:>24}  {:>20}",
            votes,
            group_digits(cost.cost(votes)?),
            group_digits(marginal),
            format_tokens(cost.token_cost(votes)?, symbol),
        ));
    }
    Ok(rows)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = effective_config(&cli)?;

    let format: LogFormat = config.log_format.parse()?;
    qvote_utils::init_logging(format, &config.log_level)?;
    if let Some(path) = &cli.config {
        tracing::info!(path = %path.display(), "loaded config");
    }

    match cli.command {
        Command::Simulate { script, fail_fast } => {
            let scenario = scenario::Scenario::from_json_file(&script)?;
            tracing::info!(
                script = %script.display(),
                steps = scenario.steps.len(),
                description = %scenario.description,
                "replaying scenario"
            );
            let mut engine = scenario::build_engine(&config)?;
            let steps = scenario::run(&mut engine, &scenario, fail_fast);
            let failed = steps.iter().filter(|s| !s.is_ok()).count();
            engine.check_invariants()?;
            let report = scenario::report(&engine, steps);
            println!("{}", serde_json::to_string_pretty(&report)?);
            if fail_fast && failed > 0 {
                anyhow::bail!("scenario stopped after a failing step");
            }
        }
        Command::Cost { votes, from } => {
            anyhow::ensure!(from >= 1 && from <= votes, "need 1 <= --from <= --votes");
            let price = config.token_price as u128;
            println!(
                "token price {} ({} per token)",
                group_digits(price),
                format_tokens(TOKEN_UNIT, &config.token_symbol)
            );
            for row in cost_table(price, from, votes, &config.token_symbol)? {
                println!("{row}");
            }
        }
        Command::Config => {
            print!("{}", config.to_toml_string()?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("qvote").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_defaults() {
        let cli = parse(&["--token-price", "1000", "--owner", "0xa11ce", "config"]);
        let config = effective_config(&cli).unwrap();
        assert_eq!(config.token_price, 1000);
        assert_eq!(config.owner, Address::new("0xa11ce"));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qvote.toml");
        std::fs::write(&path, "token_price = 42\nlog_level = \"debug\"\n").unwrap();
        let path_arg = path.to_str().unwrap();

        let cli = parse(&["--config", path_arg, "config"]);
        let config = effective_config(&cli).unwrap();
        assert_eq!(config.token_price, 42);
        assert_eq!(config.log_level, "debug");

        let cli = parse(&["--config", path_arg, "--token-price", "7", "config"]);
        assert_eq!(effective_config(&cli).unwrap().token_price, 7);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let cli = parse(&["--token-price", "0", "config"]);
        assert!(effective_config(&cli).is_err());
        assert!(Cli::try_parse_from(["qvote", "--owner", "alice", "config"]).is_err());
    }

    #[test]
    fn simulate_requires_script() {
        assert!(Cli::try_parse_from(["qvote", "simulate"]).is_err());
        let cli = parse(&["simulate", "--script", "s.json", "--fail-fast"]);
        assert!(matches!(
            cli.command,
            Command::Simulate { fail_fast: true, .. }
        ));
    }

    #[test]
    fn cost_table_lists_each_vote_count() {
        let rows = cost_table(300_000, 1, 3, "STK").unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows[1].contains("300_000"));
        assert!(rows[2].contains("1_200_000"));
        assert!(rows[2].contains("900_000"));
        assert!(rows[3].contains("9 STK"));
    }
}
