//! Mouse input simulation.
//!
//! Clicks go through the `cliclick` utility as a press and release at one
//! point. [`ClickDriver`] turns a click region name into a randomized click
//! followed by a jittered pause.

use anyhow::{Result, anyhow};
use rand::Rng;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;

use crate::automation::config::BotConfig;
use crate::automation::timing::{DelayRange, Pacer};
use crate::geometry::{Point, Rect};
use crate::tool::run_checked;

/// Issues one left click at a logical point.
pub trait Pointer {
    fn click(&mut self, point: Point) -> Result<()>;
}

/// `cliclick`-backed pointer. A non-zero exit is a tool failure.
pub struct Cliclick {
    executable: PathBuf,
}

impl Cliclick {
    pub fn new() -> Self {
        Self {
            executable: PathBuf::from("cliclick"),
        }
    }

    fn command(&self, point: Point) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg(format!("dd:{},{}", point.x, point.y))
            .arg(format!("du:{},{}", point.x, point.y));
        cmd
    }
}

impl Pointer for Cliclick {
    fn click(&mut self, point: Point) -> Result<()> {
        run_checked(&mut self.command(point))?;
        Ok(())
    }
}

/// Clicks named regions at random interior points.
pub struct ClickDriver {
    pointer: Box<dyn Pointer>,
    regions: HashMap<String, Rect>,
    margin: i32,
    gap: DelayRange,
}

impl ClickDriver {
    pub fn new(config: &BotConfig, pointer: Box<dyn Pointer>) -> Self {
        Self {
            pointer,
            regions: config.click_regions.clone(),
            margin: config.margin,
            gap: config.timing.click_gap_range,
        }
    }

    /// Checks for a stop, clicks a random point of region `name`, then waits
    /// a gap drawn from the click gap range.
    pub fn perform_click<R: Rng + ?Sized>(
        &mut self,
        name: &str,
        rng: &mut R,
        pacer: &Pacer,
    ) -> Result<Point> {
        pacer.check()?;
        let rect = self
            .regions
            .get(name)
            .ok_or_else(|| anyhow!("Unknown click region: {}", name))?;
        let point = rect.random_point(self.margin, rng);
        crate::log(&format!("[click] {} at {}", name, point));
        self.pointer.click(point)?;
        pacer.sleep(self.gap.sample(rng))?;
        Ok(point)
    }
}
