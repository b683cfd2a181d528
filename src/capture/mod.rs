//! Screen capture.
//!
//! This module provides:
//! - The [`ScreenCapture`] capability the detector samples through
//! - A `screencapture`-backed implementation (`ScreencaptureCli`)

pub mod screenshot;

pub use screenshot::ScreencaptureCli;

use anyhow::Result;
use image::{Rgb, RgbaImage};

use crate::geometry::{Point, Rect};

/// Pixel and region capture from the display.
pub trait ScreenCapture {
    /// Color of the pixel at a logical point.
    fn capture_pixel(&mut self, point: Point) -> Result<Rgb<u8>>;

    /// Image of a logical rectangle, at physical display resolution.
    fn capture_region(&mut self, rect: Rect) -> Result<RgbaImage>;
}
