//! Sortie - battle session launcher and post-battle reconciliation
//!
//! `rehearse` launches a scenario against the in-process engine and prints
//! what happened; `resolve` applies an engine outcome file to a campaign.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use sortie::campaign::Campaign;
use sortie::core::error::{Result, SortieError};
use sortie::core::SessionConfig;
use sortie::engine::LoopbackServer;
use sortie::outcome::{
    OutcomeReport, PreBattleRoster, ReconciliationEngine, ReconciliationPlan, SalvageLedger,
    ScenarioOutcomeTracker,
};
use sortie::session::{
    ImmediateClock, LaunchReport, SessionContext, SessionEvent, SessionOrchestrator,
};

#[derive(Parser, Debug)]
#[command(name = "sortie")]
#[command(about = "Launch battle sessions and reconcile their outcomes")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Launch a scenario against the in-process engine
    Rehearse {
        /// Campaign file (JSON)
        #[arg(long)]
        campaign: PathBuf,

        /// Scenario name
        #[arg(long)]
        scenario: String,

        /// Session config (TOML); defaults apply when absent
        #[arg(long)]
        config: Option<PathBuf>,

        /// Join instead of hosting
        #[arg(long)]
        join: bool,

        /// Push rule options as for a campaign already under way
        #[arg(long)]
        started: bool,

        /// Skip pacing delays
        #[arg(long)]
        fast: bool,
    },

    /// Apply a post-battle outcome file to a campaign
    Resolve {
        /// Campaign file (JSON)
        #[arg(long)]
        campaign: PathBuf,

        /// Scenario name
        #[arg(long)]
        scenario: String,

        /// Outcome file (JSON)
        #[arg(long)]
        outcome: PathBuf,

        /// Where to write the updated campaign; nothing is written when absent
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sortie=info")),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Rehearse {
            campaign,
            scenario,
            config,
            join,
            started,
            fast,
        } => {
            let config = match config {
                Some(path) => SessionConfig::load(&path)?,
                None => SessionConfig::default(),
            };
            let rt = Runtime::new()?;
            let report = rt.block_on(rehearse(&campaign, &scenario, config, join, started, fast))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Resolve {
            campaign,
            scenario,
            outcome,
            out,
        } => resolve(&campaign, &scenario, &outcome, out.as_deref())?,
    }

    Ok(())
}

async fn rehearse(
    campaign_path: &Path,
    scenario_name: &str,
    config: SessionConfig,
    join: bool,
    started: bool,
    fast: bool,
) -> Result<LaunchReport> {
    let campaign = Campaign::load(campaign_path)?;
    let scenario_id = campaign
        .scenario_by_name(scenario_name)
        .map(|s| s.id)
        .ok_or_else(|| SortieError::UnknownScenario(scenario_name.to_string()))?;

    let server = LoopbackServer::new();
    let mut ctx = SessionContext::new(config, Arc::new(server.connector()));
    if fast {
        ctx = ctx.with_clock(Arc::new(ImmediateClock::new()));
    }

    let (orchestrator, request, mut events) =
        SessionOrchestrator::for_scenario(&campaign, scenario_id, ctx)?;
    let request = if join { request.joining() } else { request };
    let handle = orchestrator.spawn(request.started(started));

    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Idle => handle.request_stop(),
            SessionEvent::Issue(issue) => println!("! {:?}: {}", issue.step, issue.message),
            SessionEvent::Stopped => break,
            _ => {}
        }
    }

    handle.join().await
}

fn resolve(
    campaign_path: &Path,
    scenario_name: &str,
    outcome_path: &Path,
    out: Option<&Path>,
) -> Result<()> {
    let mut campaign = Campaign::load(campaign_path)?;
    let scenario = campaign
        .scenario_by_name(scenario_name)
        .ok_or_else(|| SortieError::UnknownScenario(scenario_name.to_string()))?;
    let (scenario_id, contract_id) = (scenario.id, scenario.contract);
    let outcome = OutcomeReport::load(outcome_path)?;

    let ledger = contract_id
        .and_then(|id| campaign.contracts.get(&id))
        .map(SalvageLedger::for_contract)
        .unwrap_or_else(SalvageLedger::unlimited);
    let roster = PreBattleRoster::from_scenario(&campaign, scenario_id)?;
    let mut tracker = ScenarioOutcomeTracker::new(roster, ledger);
    tracker.ingest_report(&outcome);

    for unit in tracker.compute_missing_units() {
        println!("missing unit: {} ({})", unit.name, unit.external_id);
    }
    for pilot in tracker.compute_missing_pilots() {
        println!("missing pilot: {} ({})", pilot.name, pilot.external_id);
    }
    for pilot in tracker.compute_casualties() {
        println!("casualty: {}", pilot.name);
    }

    let plan = ReconciliationPlan::from_tracker(&tracker, outcome.status, outcome.report.clone());
    let already_logged = campaign.report.len();
    let summary = ReconciliationEngine::new(&mut campaign)
        .with_contract(contract_id)
        .commit(&plan)?;

    for line in &campaign.report[already_logged..] {
        println!("{line}");
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(path) = out {
        campaign.save(path)?;
        tracing::info!(path = %path.display(), "campaign written");
    }
    Ok(())
}
