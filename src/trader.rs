//! The decision loop: snapshot, advice, parse, dispatch, sleep

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::agent::{Advisor, PromptBuilder};
use crate::collector::{SnapshotCollector, StateSnapshot};
use crate::command::{parse_advice, ParseError};
use crate::dispatcher::{DispatchOutcome, OrderDispatcher};
use crate::domain::CyclePhase;
use crate::error::{PrinterError, Result};
use crate::ledger::TradeLedger;

/// How a cycle ended
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    SnapshotFailed(String),
    AdviceFailed(String),
    ParseFailed(ParseError),
    Dispatched(DispatchOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub cycle: u64,
    pub outcome: CycleOutcome,
}

/// Drives one cycle at a time, forever
pub struct Trader {
    collector: SnapshotCollector,
    advisor: Arc<dyn Advisor>,
    prompts: PromptBuilder,
    dispatcher: OrderDispatcher,
    ledger: TradeLedger,
    interval: Duration,
    phase: CyclePhase,
    cycles: u64,
}

impl Trader {
    pub fn new(
        collector: SnapshotCollector,
        advisor: Arc<dyn Advisor>,
        dispatcher: OrderDispatcher,
        interval: Duration,
    ) -> Self {
        Self {
            collector,
            advisor,
            prompts: PromptBuilder::new(),
            dispatcher,
            ledger: TradeLedger::new(),
            interval,
            phase: CyclePhase::Idle,
            cycles: 0,
        }
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    fn transition(&mut self, to: CyclePhase) -> Result<()> {
        if !self.phase.can_transition_to(to) {
            warn!(
                allowed = ?self.phase.valid_transitions(),
                "Refusing {} -> {}",
                self.phase,
                to
            );
            return Err(PrinterError::InvalidTransition {
                from: self.phase.to_string(),
                to: to.to_string(),
            });
        }
        debug!("{} -> {}", self.phase, to);
        self.phase = to;
        Ok(())
    }

    /// Run until the task is dropped. Only a broken phase sequence ends it.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "Decision loop started, one cycle every {}s",
            self.interval.as_secs()
        );

        loop {
            let report = self.run_cycle().await?;
            debug!("Cycle {} finished: {:?}", report.cycle, report.outcome);
            self.rest().await?;
        }
    }

    /// One full cycle from `Idle`, ending in `Sleeping`.
    ///
    /// Failures inside the cycle are logged and reported in the outcome;
    /// an `Err` means the loop was driven out of order.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.transition(CyclePhase::Snapshotting)?;
        self.cycles += 1;
        let cycle = self.cycles;
        info!(cycle, "Cycle started");

        let snapshot = match self.collector.collect(&self.ledger).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(cycle, "Snapshot failed, skipping cycle: {}", e);
                return self.finish(cycle, CycleOutcome::SnapshotFailed(e.to_string()));
            }
        };

        self.transition(CyclePhase::AwaitingAdvice)?;
        let advice = match self.request_advice(&snapshot).await {
            Ok(advice) => advice,
            Err(e) => {
                error!(cycle, "Advice request failed: {}", e);
                return self.finish(cycle, CycleOutcome::AdviceFailed(e.to_string()));
            }
        };
        info!(cycle, "Advice: {}", advice.trim());

        self.transition(CyclePhase::Parsing)?;
        let directive = match parse_advice(&advice) {
            Ok(directive) => directive,
            Err(e) => {
                warn!(cycle, raw = %e.text(), "Unparseable advice: {}", e);
                return self.finish(cycle, CycleOutcome::ParseFailed(e));
            }
        };

        self.transition(CyclePhase::Dispatching)?;
        let outcome = self.dispatcher.dispatch(&directive, &mut self.ledger).await;

        self.finish(cycle, CycleOutcome::Dispatched(outcome))
    }

    async fn request_advice(&self, snapshot: &StateSnapshot) -> Result<String> {
        let prompt = self.prompts.build(snapshot)?;
        debug!("Prompt:\n{}\n\n{}", prompt.system, prompt.user);
        self.advisor.advise(&prompt).await
    }

    fn finish(&mut self, cycle: u64, outcome: CycleOutcome) -> Result<CycleReport> {
        self.transition(CyclePhase::Sleeping)?;
        Ok(CycleReport { cycle, outcome })
    }

    /// Wait out the interval, then become `Idle`
    pub async fn rest(&mut self) -> Result<()> {
        if self.phase != CyclePhase::Sleeping {
            return Err(PrinterError::InvalidTransition {
                from: self.phase.to_string(),
                to: CyclePhase::Idle.to_string(),
            });
        }
        tokio::time::sleep(self.interval).await;
        self.transition(CyclePhase::Idle)
    }
}
