//! Scheduler loop
//!
//! Drives a [`Reconciler`] on a fixed interval until a shutdown signal is
//! observed.
//!
//! ## State Machine
//!
//! ```text
//!  ┌──────┐  run_until()  ┌─────────┐  shutdown at tick boundary  ┌─────────┐
//!  │ Idle │ ────────────▶ │ Running │ ──────────────────────────▶ │ Stopped │
//!  └──────┘               └─────────┘                             └─────────┘
//! ```
//!
//! ## Serial Passes
//!
//! A pass runs inline in the loop task, so two passes can never overlap.
//! Shutdown is only checked between passes: a pass that has started always
//! completes (or fails) first. A failed pass is reported and the loop keeps
//! ticking; nothing a pass does can stop the scheduler.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::{Error, ErrorKind, Result};
use crate::reconciler::{ReconciliationOutcome, Reconciler};

/// Lifecycle state of a [`Scheduler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Created, not started yet
    Idle,
    /// Ticking
    Running,
    /// Terminal; no further ticks
    Stopped,
}

/// Events emitted by the Scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// Scheduler started
    Started {
        target_record: String,
        sources_count: usize,
    },

    /// One reconciliation pass finished
    PassCompleted {
        /// 1-based pass number
        pass: u64,
        outcome: ReconciliationOutcome,
    },

    /// Scheduler stopped
    Stopped { reason: String, passes: u64 },
}

/// Source of ticks for the scheduler
///
/// Injected so tests can drive passes deterministically instead of waiting
/// on real timers.
#[async_trait]
pub trait Ticker: Send {
    /// Wait for the next tick
    ///
    /// Must be cancellation-safe: the scheduler drops a pending tick when
    /// shutdown wins the race.
    async fn tick(&mut self);
}

/// Ticker backed by `tokio::time::Interval`
///
/// The first tick fires one full period after creation. When a pass
/// overruns the period, the next tick is delayed rather than fired in a
/// burst.
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    /// Create a ticker with the given period
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(Error::config("Poll interval must be > 0"));
        }

        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Ok(Self { interval })
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// Fixed-interval driver for a [`Reconciler`]
///
/// ## Lifecycle
///
/// 1. Create with [`Scheduler::new()`]
/// 2. Start with [`Scheduler::run()`] or [`Scheduler::run_until()`]
/// 3. The loop runs until the shutdown signal is observed
/// 4. The scheduler is then `Stopped` and cannot be restarted
pub struct Scheduler {
    /// Pass executor
    reconciler: Reconciler,

    /// Tick source
    ticker: Box<dyn Ticker>,

    /// Current lifecycle state
    state_tx: watch::Sender<SchedulerState>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SchedulerEvent>,

    /// Passes run so far
    passes: u64,
}

impl Scheduler {
    /// Create a new scheduler
    ///
    /// # Returns
    ///
    /// A tuple of (scheduler, event_receiver) where event_receiver yields scheduler events
    pub fn new(
        reconciler: Reconciler,
        ticker: Box<dyn Ticker>,
        event_channel_capacity: usize,
    ) -> (Self, mpsc::Receiver<SchedulerEvent>) {
        let (event_tx, event_rx) = mpsc::channel(event_channel_capacity.max(1));
        let (state_tx, _) = watch::channel(SchedulerState::Idle);

        let scheduler = Self {
            reconciler,
            ticker,
            state_tx,
            event_tx,
            passes: 0,
        };

        (scheduler, event_rx)
    }

    pub fn state(&self) -> SchedulerState {
        *self.state_tx.borrow()
    }

    /// Watch lifecycle transitions from another task
    pub fn subscribe_state(&self) -> watch::Receiver<SchedulerState> {
        self.state_tx.subscribe()
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Run until Ctrl-C
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C, running until killed: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run until `shutdown` completes
    ///
    /// `shutdown` is only polled at tick boundaries. If it completes while a
    /// pass is in flight, that pass finishes and the loop then exits without
    /// waiting for another tick.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: The scheduler was already stopped
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        if self.state() == SchedulerState::Stopped {
            return Err(Error::invalid_input("Scheduler already stopped"));
        }

        self.state_tx.send_replace(SchedulerState::Running);
        info!(
            "Reconciling {} from {} source(s): {}",
            self.reconciler.target_record(),
            self.reconciler.source_records().len(),
            self.reconciler.source_records().join(", ")
        );
        self.emit_event(SchedulerEvent::Started {
            target_record: self.reconciler.target_record().to_string(),
            sources_count: self.reconciler.source_records().len(),
        });

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Shutdown wins over a tick that is already due
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }

                _ = self.ticker.tick() => {}
            }

            self.passes += 1;
            let outcome = self.reconciler.run_once().await;
            self.report(self.passes, &outcome);
            self.emit_event(SchedulerEvent::PassCompleted {
                pass: self.passes,
                outcome,
            });
        }

        self.state_tx.send_replace(SchedulerState::Stopped);
        info!("Scheduler stopped after {} pass(es)", self.passes);
        self.emit_event(SchedulerEvent::Stopped {
            reason: "Shutdown signal".to_string(),
            passes: self.passes,
        });

        Ok(())
    }

    /// Emit the status line for one pass
    fn report(&self, pass: u64, outcome: &ReconciliationOutcome) {
        let target = self.reconciler.target_record();
        match outcome {
            ReconciliationOutcome::UpToDate | ReconciliationOutcome::Updated { .. } => {
                info!("[pass {}] {}: {}", pass, target, outcome);
            }
            ReconciliationOutcome::Failed(reason) if reason.kind.is_transient() => {
                warn!("[pass {}] {}: {} (will retry next tick)", pass, target, outcome);
            }
            ReconciliationOutcome::Failed(reason) => match failure_hint(reason.kind) {
                Some(hint) => error!("[pass {}] {}: {} ({})", pass, target, outcome, hint),
                None => error!("[pass {}] {}: {} ({} error)", pass, target, outcome, reason.kind),
            },
        }
    }

    /// Emit a scheduler event
    fn emit_event(&self, event: SchedulerEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Event receiver dropped, event discarded");
            }
        }
    }
}

/// Operator hint for failures that need a fix outside the daemon
fn failure_hint(kind: ErrorKind) -> Option<&'static str> {
    match kind {
        ErrorKind::NotFound => {
            Some("the target record set must exist in the hosted zone before it can be synced")
        }
        _ => None,
    }
}
