//! Background refresh of the cached game state. The worker owns no state of
//! its own: it decides when to read and forwards every result as an event.

use crate::{
    config::SyncSettings,
    contract::GameContract,
    errors::ContractError,
    state::{
        EntryReading,
        Fetched,
        PriceReading,
        Update,
    },
};
use alloy::primitives::{
    Address,
    TxHash,
};
use futures::{
    FutureExt,
    StreamExt,
    future::BoxFuture,
    stream::FuturesUnordered,
};
use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{
            AtomicU64,
            Ordering,
        },
    },
    time::Duration,
};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{
        self,
        Instant,
        MissedTickBehavior,
    },
};
use tracing::{
    debug,
    info,
    warn,
};


#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncCommand {
    RefreshNow,
    RefreshAfter(Duration),
    SetAccount(Option<Address>),
    /// Wait `delay`, then follow the receipt of an entry transaction.
    SettleEntry { tx: TxHash, delay: Duration },
    Shutdown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettleOutcome {
    Confirmed,
    Failed,
    /// No receipt within the polling budget.
    Unknown,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SyncEvent {
    Fetched(Update),
    BlockObserved(u64),
    EntrySettled { tx: TxHash, outcome: SettleOutcome },
}

/// Sending half of the worker, shared with whoever needs to trigger reads.
#[derive(Clone, Debug)]
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<SyncCommand>,
    generation: Arc<AtomicU64>,
}

impl SyncHandle {
    pub fn new(
        commands: mpsc::UnboundedSender<SyncCommand>,
        generation: Arc<AtomicU64>,
    ) -> Self {
        Self {
            commands,
            generation,
        }
    }

    fn send(&self, command: SyncCommand) {
        if self.commands.send(command).is_err() {
            debug!("sync worker has stopped; command dropped");
        }
    }

    pub fn refresh_now(&self) {
        self.send(SyncCommand::RefreshNow);
    }

    pub fn refresh_after(&self, delay: Duration) {
        self.send(SyncCommand::RefreshAfter(delay));
    }

    pub fn set_account(&self, account: Option<Address>) {
        self.send(SyncCommand::SetAccount(account));
    }

    pub fn settle_entry(&self, tx: TxHash, delay: Duration) {
        self.send(SyncCommand::SettleEntry { tx, delay });
    }

    pub fn shutdown(&self) {
        self.send(SyncCommand::Shutdown);
    }

    /// Generation of the most recently started refresh.
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

pub trait BlockSource: Send + 'static {
    /// Resolves with the next block height above any returned before.
    fn next_block(&mut self) -> impl Future<Output = u64> + Send;
}

/// Polls `eth_blockNumber` on a fixed interval.
pub struct PollingBlockSource<C> {
    contract: C,
    ticker: time::Interval,
    last: Option<u64>,
}

impl<C: GameContract> PollingBlockSource<C> {
    pub fn new(contract: C, poll_interval: Duration) -> Self {
        let mut ticker = time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            contract,
            ticker,
            last: None,
        }
    }
}

impl<C: GameContract> BlockSource for PollingBlockSource<C> {
    async fn next_block(&mut self) -> u64 {
        loop {
            self.ticker.tick().await;
            match self.contract.block_number().await {
                Ok(height) if self.last.is_none_or(|last| height > last) => {
                    self.last = Some(height);
                    return height;
                }
                Ok(_) => {}
                Err(err) => warn!(?err, "block number poll failed"),
            }
        }
    }
}

#[derive(Clone)]
struct Fetcher<C> {
    contract: C,
    generation: Arc<AtomicU64>,
    events: mpsc::UnboundedSender<SyncEvent>,
}

impl<C: GameContract> Fetcher<C> {
    fn start_round(&self, account: Option<Address>) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::spawn(fetch_round(
            self.contract.clone(),
            generation,
            account,
            self.events.clone(),
        ));
        generation
    }
}

async fn read_price<C: GameContract>(contract: &C) -> PriceReading {
    let (entry_fee, token_price) = tokio::join!(contract.entry_fee(), contract.token_price());
    PriceReading {
        entry_fee,
        token_price,
    }
}

async fn read_entry_status<C: GameContract>(
    contract: &C,
    player: Address,
) -> Result<EntryReading, ContractError> {
    let (allowance, has_entered_today) = tokio::try_join!(
        contract.allowance(player),
        contract.has_entered_today(player)
    )?;
    Ok(EntryReading {
        allowance,
        has_entered_today,
    })
}

async fn read_player<C: GameContract>(contract: &C, player: Address) -> Fetched {
    let result = tokio::try_join!(contract.player_info(player), contract.referral_info(player));
    Fetched::Player(result)
}

async fn read_daily<C: GameContract>(contract: &C) -> Fetched {
    let result = tokio::try_join!(contract.current_daily_game(), contract.current_jackpot())
        .map(|(mut snapshot, jackpot)| {
            snapshot.jackpot = jackpot;
            snapshot
        });
    Fetched::DailyGame(result)
}

/// One refresh: every read runs concurrently and reports on its own, so a
/// failing read never holds back the others.
async fn fetch_round<C: GameContract>(
    contract: C,
    generation: u64,
    account: Option<Address>,
    events: mpsc::UnboundedSender<SyncEvent>,
) {
    debug!(generation, ?account, "refresh started");
    let emit = |payload: Fetched| {
        // the receiver is gone once the session shuts down
        let _ = events.send(SyncEvent::Fetched(Update {
            generation,
            account,
            payload,
        }));
    };

    let price = async { emit(Fetched::Price(read_price(&contract).await)) };
    let daily = async { emit(read_daily(&contract).await) };

    match account {
        Some(player) => {
            let balance = async {
                emit(Fetched::Balance(contract.token_balance(player).await));
            };
            let entry = async {
                emit(Fetched::EntryStatus(
                    read_entry_status(&contract, player).await,
                ));
            };
            let info = async { emit(read_player(&contract, player).await) };
            tokio::join!(price, balance, entry, info, daily);
        }
        None => {
            tokio::join!(price, daily);
        }
    }
}

async fn settle_entry<C: GameContract>(
    contract: C,
    tx: TxHash,
    delay: Duration,
    poll_interval: Duration,
    attempts: u32,
) -> (TxHash, SettleOutcome) {
    time::sleep(delay).await;
    for attempt in 1..=attempts.max(1) {
        match contract.receipt_status(tx).await {
            Ok(Some(true)) => return (tx, SettleOutcome::Confirmed),
            Ok(Some(false)) => return (tx, SettleOutcome::Failed),
            Ok(None) => debug!(%tx, attempt, "receipt not available yet"),
            Err(err) => warn!(%tx, ?err, "receipt lookup failed"),
        }
        time::sleep(poll_interval).await;
    }
    (tx, SettleOutcome::Unknown)
}

pub async fn sync_worker<C, B>(
    contract: C,
    mut blocks: B,
    settings: SyncSettings,
    mut account: Option<Address>,
    generation: Arc<AtomicU64>,
    mut cmd_rx: mpsc::UnboundedReceiver<SyncCommand>,
    event_tx: mpsc::UnboundedSender<SyncEvent>,
) where
    C: GameContract,
    B: BlockSource,
{
    let fetcher = Fetcher {
        contract: contract.clone(),
        generation,
        events: event_tx.clone(),
    };
    let mut fallback = time::interval_at(
        Instant::now() + settings.fallback_interval,
        settings.fallback_interval,
    );
    fallback.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut delayed: FuturesUnordered<time::Sleep> = FuturesUnordered::new();
    let mut settling: FuturesUnordered<BoxFuture<'static, (TxHash, SettleOutcome)>> =
        FuturesUnordered::new();

    fetcher.start_round(account);

    loop {
        tokio::select! {
            height = blocks.next_block() => {
                fallback.reset();
                let _ = event_tx.send(SyncEvent::BlockObserved(height));
                fetcher.start_round(account);
            }
            _ = fallback.tick() => {
                debug!("no new block within fallback interval");
                fetcher.start_round(account);
            }
            Some(()) = delayed.next(), if !delayed.is_empty() => {
                fetcher.start_round(account);
            }
            Some((tx, outcome)) = settling.next(), if !settling.is_empty() => {
                info!(%tx, ?outcome, "entry settled");
                let _ = event_tx.send(SyncEvent::EntrySettled { tx, outcome });
                fetcher.start_round(account);
            }
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    break;
                };
                match cmd {
                    SyncCommand::RefreshNow => {
                        fetcher.start_round(account);
                    }
                    SyncCommand::RefreshAfter(delay) => {
                        delayed.push(time::sleep(delay));
                    }
                    SyncCommand::SetAccount(next) => {
                        account = next;
                        fetcher.start_round(account);
                    }
                    SyncCommand::SettleEntry { tx, delay } => {
                        settling.push(
                            settle_entry(
                                contract.clone(),
                                tx,
                                delay,
                                settings.receipt_poll_interval,
                                settings.receipt_poll_attempts,
                            )
                            .boxed(),
                        );
                    }
                    SyncCommand::Shutdown => break,
                }
            }
        }
    }
    debug!("sync worker stopped");
}

pub fn spawn_sync_worker<C, B>(
    contract: C,
    blocks: B,
    settings: SyncSettings,
    account: Option<Address>,
) -> (SyncHandle, mpsc::UnboundedReceiver<SyncEvent>, JoinHandle<()>)
where
    C: GameContract,
    B: BlockSource,
{
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let generation = Arc::new(AtomicU64::new(0));
    let handle = SyncHandle::new(cmd_tx, generation.clone());
    let worker = tokio::spawn(sync_worker(
        contract, blocks, settings, account, generation, cmd_rx, event_tx,
    ));
    (handle, event_rx, worker)
}
