//! Screenshot capture using the macOS `screencapture` utility.

use anyhow::{Context, Result};
use image::{Rgb, RgbaImage};
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

use super::ScreenCapture;
use crate::geometry::{Point, Rect};
use crate::ocr::preprocess::crop_region;
use crate::tool::run_checked;

const SCREENCAPTURE: &str = "screencapture";

/// Captures through `screencapture`, writing into a scratch directory that is
/// removed on every exit path.
pub struct ScreencaptureCli {
    /// Physical pixels per logical point (2.0 on Retina displays).
    capture_scale: f64,
}

impl ScreencaptureCli {
    pub fn new(capture_scale: f64) -> Self {
        Self { capture_scale }
    }
}

impl ScreenCapture for ScreencaptureCli {
    fn capture_pixel(&mut self, point: Point) -> Result<Rgb<u8>> {
        let dir = TempDir::new()?;
        let out_path = dir.path().join("px.png");
        let rect = Rect::new(point.x, point.y, point.x + 1, point.y + 1);

        run_checked(&mut screencapture_command(Some(rect), &out_path))?;

        // A Retina capture of one point is 2x2; the top-left pixel is the sample.
        let img = image::open(&out_path)
            .with_context(|| format!("Failed to decode pixel capture at {}", point))?
            .to_rgb8();
        Ok(*img.get_pixel(0, 0))
    }

    fn capture_region(&mut self, rect: Rect) -> Result<RgbaImage> {
        let dir = TempDir::new()?;
        let out_path = dir.path().join("full.png");

        run_checked(&mut screencapture_command(None, &out_path))?;

        let full = image::open(&out_path)
            .context("Failed to decode full-screen capture")?
            .to_rgba8();
        Ok(crop_region(&full, rect.scaled(self.capture_scale)))
    }
}

/// Builds `screencapture -x [-R x,y,w,h] <out_path>`.
fn screencapture_command(rect: Option<Rect>, out_path: &Path) -> Command {
    let mut cmd = Command::new(SCREENCAPTURE);
    cmd.arg("-x");
    if let Some(rect) = rect {
        cmd.arg("-R").arg(region_arg(rect));
    }
    cmd.arg(out_path);
    cmd
}

/// Formats a rectangle the way `screencapture -R` expects it.
fn region_arg(rect: Rect) -> String {
    format!(
        "{},{},{},{}",
        rect.left,
        rect.top,
        rect.width(),
        rect.height()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::describe;

    #[test]
    fn test_region_arg_uses_clamped_size() {
        assert_eq!(region_arg(Rect::new(10, 20, 110, 70)), "10,20,100,50");
        assert_eq!(region_arg(Rect::new(5, 5, 5, 5)), "5,5,1,1");
    }

    #[test]
    fn test_pixel_command_line() {
        let cmd = screencapture_command(Some(Rect::new(7, 9, 8, 10)), Path::new("/tmp/px.png"));
        assert_eq!(describe(&cmd), "screencapture -x -R 7,9,1,1 /tmp/px.png");
    }

    #[test]
    fn test_full_screen_command_line() {
        let cmd = screencapture_command(None, Path::new("/tmp/full.png"));
        assert_eq!(describe(&cmd), "screencapture -x /tmp/full.png");
    }
}
