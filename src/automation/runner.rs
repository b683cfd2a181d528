//! Bot runner - the control loop.
//!
//! Owns the capabilities, the seeded RNG and the pacer, and drives one
//! iteration at a time through [`LoopState`]. The outer loop contains every
//! failure except an operator stop.

use anyhow::Result;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use std::time::Duration;

use crate::automation::config::{BotConfig, TimingConfig};
use crate::automation::detection::StateDetector;
use crate::automation::input::{ClickDriver, Pointer};
use crate::automation::state::{IterationOutcome, LoopState, Resolution};
use crate::automation::timing::{DelayRange, Pacer};
use crate::capture::ScreenCapture;
use crate::error::{BotError, is_cancelled};
use crate::geometry::Rect;
use crate::ocr::TextRecognizer;

const SELECT_TARGETS: [&str; 5] = ["select_1", "select_2", "select_3", "select_4", "select_5"];
const PLACE_TARGETS: [&str; 8] = [
    "place_1", "place_2", "place_3", "place_4", "place_5", "place_6", "place_7", "place_8",
];

/// A first reading below this cancels immediately.
const LOW_PERCENT: u32 = 20;
/// A monitored reading above this ends monitoring.
const HIGH_PERCENT: u32 = 60;

/// Fixed steps of the cancel-recovery procedure.
const RECOVERY_LEAD_IN: Duration = Duration::from_secs(1);
const RECOVERY_STEP: Duration = Duration::from_millis(500);
const RECOVERY_SETTLE: Duration = Duration::from_secs(3);
/// Pause between collect clicks.
const COLLECT_STEP: Duration = Duration::from_millis(500);

/// How the outer loop treats a failed iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Operator stop: end the run
    Cancelled,
    /// An external utility failed: log, pause, continue
    Tool,
    /// Anything else: log, pause, continue
    Unexpected,
}

pub fn classify(err: &anyhow::Error) -> FailureKind {
    if is_cancelled(err) {
        return FailureKind::Cancelled;
    }
    match err.downcast_ref::<BotError>() {
        Some(BotError::Tool { .. }) => FailureKind::Tool,
        _ => FailureKind::Unexpected,
    }
}

/// Type and message of an unexpected failure, e.g.
/// `RecoveryExhausted(20): Home screen not reached after 20 recovery attempts`.
pub fn describe_failure(err: &anyhow::Error) -> String {
    format!("{:?}: {:#}", err.root_cause(), err)
}

/// True on loops `every`, `2 * every`, ... (1-based).
pub fn is_collect_iteration(loop_index: u32, every: u32) -> bool {
    every > 0 && loop_index > 0 && loop_index % every == 0
}

pub struct Bot {
    timing: TimingConfig,
    percent_region: Rect,
    recovery_max_attempts: u32,
    max_loops: Option<u32>,
    rng: StdRng,
    pacer: Pacer,
    detector: StateDetector,
    clicker: ClickDriver,
    state: LoopState,
}

impl Bot {
    pub fn new(
        config: &BotConfig,
        pacer: Pacer,
        capture: Box<dyn ScreenCapture>,
        ocr: Box<dyn TextRecognizer>,
        pointer: Box<dyn Pointer>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            timing: config.timing.clone(),
            percent_region: config.percent_region(),
            recovery_max_attempts: config.timing.recovery_max_attempts,
            max_loops: config.max_loops,
            rng,
            pacer,
            detector: StateDetector::new(config, capture, ocr),
            clicker: ClickDriver::new(config, pointer),
            state: LoopState::IdleHome,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> LoopState {
        self.state
    }

    fn set_state(&mut self, state: LoopState) {
        if self.state != state {
            crate::log(&format!("[state] {} -> {}", self.state, state));
            self.state = state;
        }
    }

    fn click(&mut self, name: &str) -> Result<()> {
        self.clicker.perform_click(name, &mut self.rng, &self.pacer)?;
        Ok(())
    }

    fn jitter(&mut self, range: DelayRange) -> Result<()> {
        let d = range.sample(&mut self.rng);
        self.pacer.sleep(d)
    }

    /// Runs one iteration from the home screen back to the home screen.
    pub fn run_one_loop(&mut self) -> Result<IterationOutcome> {
        self.set_state(LoopState::IdleHome);
        if self.detector.is_home()? {
            self.click("start")?;
            self.jitter(self.timing.home_start_fight_gap_range)?;
            self.click("fight")?;
        }

        self.set_state(LoopState::AwaitingBattle);
        while !self.detector.is_battle()? {
            if self.detector.is_home()? {
                crate::log("[rule] back at home before battle -> fight did not start");
                self.set_state(LoopState::IdleHome);
                return Ok(IterationOutcome::FightNotStarted);
            }
            self.pacer.check()?;
            self.jitter(self.timing.poll_interval_range)?;
        }

        self.set_state(LoopState::Selecting);
        let pick = SELECT_TARGETS
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(SELECT_TARGETS[0]);
        self.click(pick)?;

        self.set_state(LoopState::Placing);
        let mut places = PLACE_TARGETS;
        places.shuffle(&mut self.rng);
        for place in places {
            self.click(place)?;
        }
        self.pacer.sleep(self.timing.after_places_wait)?;

        self.set_state(LoopState::Confirming);
        for select in SELECT_TARGETS {
            self.click(select)?;
        }

        let resolution = self.watch_percent()?;
        self.set_state(LoopState::Resolving(resolution));
        self.cancel_flow()?;
        self.set_state(LoopState::IdleHome);
        Ok(IterationOutcome::Resolved(resolution))
    }

    /// Reads the percentage, then polls it until it goes high or the
    /// deadline passes. A low first reading short-circuits.
    fn watch_percent(&mut self) -> Result<Resolution> {
        let percent = self.detector.read_percent(self.percent_region);
        crate::log(&format!("[detect] percent={:?}", percent));
        if let Some(p) = percent {
            if p < LOW_PERCENT {
                crate::log("[rule] percent < 20 -> cancel now");
                return Ok(Resolution::LowPercent);
            }
        }

        self.set_state(LoopState::Monitoring);
        let timeout = self.timing.percent_wait_timeout;
        let started = self.pacer.now();
        loop {
            self.pacer.check()?;
            if self.pacer.now().saturating_sub(started) > timeout {
                crate::log("[rule] timeout -> cancel");
                return Ok(Resolution::Timeout);
            }

            self.jitter(self.timing.poll_interval_range)?;
            let percent = self.detector.read_percent(self.percent_region);
            crate::log(&format!("[detect] percent={:?}", percent));
            if let Some(p) = percent {
                if p > HIGH_PERCENT {
                    crate::log("[rule] percent > 60 -> cancel");
                    return Ok(Resolution::HighPercent);
                }
            }
        }
    }

    /// Clicks through cancel, confirm and back until home is visible.
    ///
    /// Gives up with [`BotError::RecoveryExhausted`] after the configured
    /// number of rounds.
    pub fn cancel_flow(&mut self) -> Result<()> {
        for _ in 0..self.recovery_max_attempts {
            if self.detector.is_home()? {
                return Ok(());
            }
            self.pacer.sleep(RECOVERY_LEAD_IN)?;
            self.click("cancel")?;
            self.pacer.sleep(RECOVERY_STEP)?;
            self.click("confirm")?;
            self.pacer.sleep(RECOVERY_STEP)?;
            self.click("back")?;
            self.pacer.sleep(RECOVERY_SETTLE)?;
        }
        if self.detector.is_home()? {
            return Ok(());
        }
        Err(BotError::RecoveryExhausted(self.recovery_max_attempts).into())
    }

    /// Claims the periodic reward.
    pub fn collect_flow(&mut self) -> Result<()> {
        let previous = self.state;
        self.set_state(LoopState::Collecting);
        self.click("collect")?;
        self.pacer.sleep(COLLECT_STEP)?;
        self.click("collect_confirm")?;
        self.pacer.sleep(COLLECT_STEP)?;
        self.click("collect_cancel")?;
        self.set_state(previous);
        Ok(())
    }

    fn run_iteration(&mut self, loop_index: u32) -> Result<IterationOutcome> {
        if is_collect_iteration(loop_index, self.timing.collect_every) {
            self.collect_flow()?;
            crate::log(&format!("Collected in loop {}", loop_index));
        }
        self.run_one_loop()
    }

    /// Runs iterations until stopped (or `run.max_loops` is reached).
    ///
    /// Returns the number of loops started. Only an operator stop ends the
    /// run early; every other failure is logged and followed by a pause.
    pub fn run_forever(&mut self) -> u32 {
        let mut i = 0;
        while !self.pacer.token().is_cancelled() {
            if self.max_loops.is_some_and(|max| i >= max) {
                crate::log(&format!("Reached max_loops ({})", i));
                break;
            }
            i += 1;
            crate::log(&format!("===== LOOP {} =====", i));

            let pause = match self.run_iteration(i) {
                Ok(outcome) => {
                    crate::log(&format!("Loop {} finished: {:?}", i, outcome));
                    self.timing.loop_pause
                }
                Err(e) => match classify(&e) {
                    FailureKind::Cancelled => {
                        crate::log(&format!("[STOP] {}", e));
                        break;
                    }
                    FailureKind::Tool => {
                        crate::log(&format!("[error] {}", e));
                        self.timing.error_pause
                    }
                    FailureKind::Unexpected => {
                        crate::log(&format!("[error] unexpected {}", describe_failure(&e)));
                        self.timing.error_pause
                    }
                },
            };

            if let Err(e) = self.pacer.sleep(pause) {
                crate::log(&format!("[STOP] {}", e));
                break;
            }
        }
        i
    }
}
