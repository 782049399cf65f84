//! vote-gate: walk one vote page session through the access gate.
//!
//! Reads config from `--config` or `VOTE_GATE_CONFIG` (defaults otherwise).
//! Pools, sealed plaintexts and wallet accounts come from a YAML fixture;
//! when the config names a `query_base_url`, pools are fetched over HTTP
//! instead. Each step prints the projected view as one JSON line.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;

use vote_gate_core::{
    Address, Fixture, GateConfig, GateController, GateServices, GateView, HttpVotePoolQuery,
    LocalWallet, MemoryBallotCaster, MemorySealService, MemoryVotePoolQuery, PoolId,
    SystemClock, VotePoolQuery, WalletSessionSigner,
};

#[derive(Parser, Debug)]
#[command(name = "vote-gate", about = "Drive a vote page through the access gate")]
struct Args {
    /// Vote pool id to open
    #[arg(long)]
    pool: String,

    /// Connected wallet account
    #[arg(long)]
    account: Option<String>,

    /// Fixture with pools, sealed contents and wallet accounts
    #[arg(long)]
    fixture: PathBuf,

    /// Gate config file (overrides VOTE_GATE_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Press the sign button once the pool is loaded
    #[arg(long)]
    sign: bool,

    /// Cast a vote for this option index
    #[arg(long)]
    cast: Option<usize>,

    /// Switch to this account at the end of the session
    #[arg(long)]
    switch_account: Option<String>,
}

#[derive(Serialize)]
struct Step<'a> {
    step: &'a str,
    view: GateView,
}

fn print_step(step: &str, view: GateView) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(&Step { step, view })?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,vote_gate_core=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = GateConfig::load(args.config.as_deref()).context("loading gate config")?;
    let fixture = Fixture::from_file(&args.fixture)
        .with_context(|| format!("loading fixture {}", args.fixture.display()))?;

    tracing::info!(
        package_id = %config.package_id,
        ttl_minutes = config.session_ttl_minutes,
        pools = fixture.pools.len(),
        "configuration loaded"
    );

    let clock = Arc::new(SystemClock);
    let query: Arc<dyn VotePoolQuery> = match &config.query_base_url {
        Some(base_url) => {
            tracing::info!(%base_url, "querying vote pools over HTTP");
            Arc::new(HttpVotePoolQuery::new(base_url))
        }
        None => Arc::new(MemoryVotePoolQuery::from_fixture(&fixture)),
    };
    let signer = Arc::new(WalletSessionSigner::new(LocalWallet::new(
        fixture.accounts.iter().cloned(),
    )));
    let seal = Arc::new(MemorySealService::from_fixture(&fixture, clock.clone()));

    let mut controller = GateController::new(
        PoolId::new(args.pool),
        args.account.map(Address::new),
        config.settings(),
        GateServices::new(query, signer, seal),
        clock,
    );

    controller.mount();
    controller.run_until_idle().await;
    print_step("loaded", controller.view())?;

    if args.sign {
        let outcome = controller.request_signing();
        if let Some(reason) = outcome.dropped_reason() {
            tracing::warn!(%reason, "sign request not accepted");
        }
        controller.run_until_idle().await;
        print_step("signed", controller.view())?;
    }

    if let Some(choice) = args.cast {
        let caster = MemoryBallotCaster::new();
        match controller.cast(&caster, choice).await {
            Ok(receipt) => tracing::info!(digest = %receipt.digest, choice, "vote cast"),
            Err(e) => tracing::warn!(error = %e, choice, "vote not cast"),
        }
    }

    if let Some(account) = args.switch_account {
        controller.on_account_change(Some(Address::new(account)));
        controller.run_until_idle().await;
        print_step("account_switched", controller.view())?;
    }

    Ok(())
}
