use crate::Command;
use chrono::Utc;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use pizza_party::{
    config::AppConfig,
    contract::GameContract,
    controller::GameController,
    entry::EntryCommit,
    referral::{
        GateDecision,
        ReferralCode,
    },
    session::{
        self,
        Session,
    },
    view::GameView,
};
use std::{
    io::{
        self,
        Write,
    },
    time::Duration,
};
use tokio::time::{
    self,
    Instant,
    MissedTickBehavior,
};
use tracing::{
    info,
    warn,
};

const INITIAL_SYNC_LIMIT: Duration = Duration::from_secs(20);
const TICK_INTERVAL: Duration = Duration::from_secs(1);

pub async fn run(command: Command, config: AppConfig) -> Result<()> {
    if let Command::RegisterDeployment { game, token } = command {
        return register_deployment(&config, game.to_string(), token.to_string());
    }

    let mut session = session::connect(&config).await?;
    session.wait_for_initial_sync(INITIAL_SYNC_LIMIT).await?;
    let result = match command {
        Command::Status => {
            print_view(session.controller());
            Ok(())
        }
        Command::Watch => watch(&mut session).await,
        Command::Approve => approve(&mut session, &config).await,
        Command::Enter { referral_code } => enter(&mut session, &config, referral_code).await,
        Command::CreateReferral => create_referral(&mut session, &config).await,
        Command::RegisterDeployment { .. } => Ok(()),
    };
    session.shutdown().await?;
    result
}

fn register_deployment(config: &AppConfig, game: String, token: String) -> Result<()> {
    let env = config.network.deployment_env();
    deployments::record_deployment(
        env,
        &game,
        &token,
        config.network.chain_id(),
        config.network.url(),
    )
    .map_err(|e| eyre!(e))
    .wrap_err_with(|| format!("Failed to record deployment for {env}"))?;
    info!(%env, %game, %token, "deployment recorded");
    println!("Recorded {env} deployment: game {game}, token {token}");
    Ok(())
}

fn print_view<C: GameContract>(controller: &GameController<C>) {
    println!("{}", GameView::capture(controller, Utc::now()));
}

async fn watch<C: GameContract>(session: &mut Session<C>) -> Result<()> {
    let mut ticker = time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    print_view(session.controller());
    loop {
        tokio::select! {
            changed = session.next_event() => {
                match changed {
                    Some(true) => print_view(session.controller()),
                    Some(false) => {}
                    None => return Err(eyre!("Sync worker stopped")),
                }
            }
            _ = ticker.tick() => {
                if let Some(crossed) = session.controller_mut().tick(Utc::now()) {
                    println!("New game day started; next reset at {}", crossed.next);
                    print_view(session.controller());
                }
            }
            _ = handle_interrupt() => {
                info!("interrupted; stopping");
                return Ok(());
            }
        }
    }
}

async fn handle_interrupt() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(?err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

/// Applies worker events until `done` holds or `limit` passes.
async fn pump_until<C, F>(session: &mut Session<C>, limit: Duration, mut done: F) -> bool
where
    C: GameContract,
    F: FnMut(&GameController<C>) -> bool,
{
    let deadline = Instant::now() + limit;
    while !done(session.controller()) {
        match time::timeout_at(deadline, session.next_event()).await {
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => return false,
        }
    }
    true
}

async fn approve<C: GameContract>(session: &mut Session<C>, config: &AppConfig) -> Result<()> {
    let tx = session.controller_mut().approve().await?;
    println!("Approval submitted: {tx}");
    let limit = config.sync.approval_settle_delay + config.sync.fallback_interval;
    let approved = pump_until(session, limit, |c| !c.flags().needs_approval).await;
    if !approved {
        println!("Approval not visible yet; check again with `status`");
    }
    print_view(session.controller());
    Ok(())
}

fn prompt_referral_code() -> Result<Option<ReferralCode>> {
    print!("First entry! Referral code (leave empty to skip): ");
    io::stdout().flush().wrap_err("Failed to flush stdout")?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .wrap_err("Failed to read referral code")?;
    Ok(ReferralCode::normalize(&line))
}

async fn enter<C: GameContract>(
    session: &mut Session<C>,
    config: &AppConfig,
    referral_code: Option<String>,
) -> Result<()> {
    let supplied = referral_code.as_deref().and_then(ReferralCode::normalize);
    let code = match session.controller().referral_decision(supplied) {
        GateDecision::Prompt => tokio::task::spawn_blocking(prompt_referral_code)
            .await
            .wrap_err("Referral prompt panicked")??,
        GateDecision::Proceed(code) => code,
    };

    let tx = session.controller_mut().enter(code).await?;
    println!("Entry submitted: {tx}");

    let settings = &config.sync;
    let limit = settings.entry_settle_delay
        + settings.receipt_poll_interval * settings.receipt_poll_attempts
        + settings.fallback_interval;
    let settled = pump_until(session, limit, |c| {
        !matches!(c.entry().commit(), EntryCommit::Optimistic(_))
    })
    .await;
    match session.controller().entry().commit() {
        EntryCommit::Confirmed(_) => println!("Entry confirmed. Good luck!"),
        EntryCommit::Reverted(_) => println!("Entry reverted on chain"),
        _ if !settled => println!("Entry not confirmed yet; check again with `status`"),
        _ => println!("Entry outcome unknown; check again with `status`"),
    }
    print_view(session.controller());
    Ok(())
}

async fn create_referral<C: GameContract>(
    session: &mut Session<C>,
    config: &AppConfig,
) -> Result<()> {
    let tx = session.controller_mut().create_referral_code().await?;
    println!("Referral code requested: {tx}");
    let has_code = |c: &GameController<C>| {
        c.state()
            .referral()
            .is_some_and(|referral| referral.code.is_some())
    };
    if !pump_until(session, config.sync.fallback_interval * 2, has_code).await {
        println!("Referral code not visible yet; check again with `status`");
    }
    print_view(session.controller());
    Ok(())
}
