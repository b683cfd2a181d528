//! Screen state detection.
//!
//! Home and battle are recognized from one calibration pixel each. The
//! percentage is read by OCR from a detect region. Single samples only:
//! misreads are absorbed by the control loop's retry structure.

use anyhow::Result;
use image::{Rgb, RgbaImage};

use crate::automation::config::{BotConfig, DetectPoint};
use crate::capture::ScreenCapture;
use crate::geometry::Rect;
use crate::ocr::{NumberParse, OcrReading, PreprocessParams, TextRecognizer, ocr_number};

/// True if every channel of `actual` is within `tolerance` of `expected`.
pub fn color_close(actual: Rgb<u8>, expected: Rgb<u8>, tolerance: u8) -> bool {
    actual
        .0
        .iter()
        .zip(expected.0.iter())
        .all(|(a, e)| a.abs_diff(*e) <= tolerance)
}

pub struct StateDetector {
    capture: Box<dyn ScreenCapture>,
    ocr: Box<dyn TextRecognizer>,
    home: DetectPoint,
    battle: DetectPoint,
    tolerance: u8,
    preprocess: PreprocessParams,
    parse: NumberParse,
    save_debug_images: bool,
}

impl StateDetector {
    pub fn new(
        config: &BotConfig,
        capture: Box<dyn ScreenCapture>,
        ocr: Box<dyn TextRecognizer>,
    ) -> Self {
        Self {
            capture,
            ocr,
            home: config.home,
            battle: config.battle,
            tolerance: config.color_tolerance,
            preprocess: config.ocr.preprocess.clone(),
            parse: config.ocr.number_parse(),
            save_debug_images: config.ocr.save_debug_images,
        }
    }

    /// Home screen visible. Capture failures propagate as tool failures.
    pub fn is_home(&mut self) -> Result<bool> {
        self.matches(self.home)
    }

    /// Battle screen visible.
    pub fn is_battle(&mut self) -> Result<bool> {
        self.matches(self.battle)
    }

    fn matches(&mut self, target: DetectPoint) -> Result<bool> {
        let rgb = self.capture.capture_pixel(target.point)?;
        Ok(color_close(rgb, target.expected, self.tolerance))
    }

    /// Reads the number shown in `rect`.
    ///
    /// Returns `None` when no digits were recognized or the capture failed.
    pub fn read_percent(&mut self, rect: Rect) -> Option<u32> {
        let roi = match self.capture.capture_region(rect) {
            Ok(img) => img,
            Err(e) => {
                crate::log(&format!("[detect] percent capture failed: {:#}", e));
                return None;
            }
        };
        let reading = ocr_number(&roi, &self.preprocess, self.ocr.as_mut(), self.parse);
        if self.save_debug_images {
            save_debug_images(&roi, &reading);
        }
        if reading.value.is_none() {
            crate::log(&format!("[detect] no number in OCR text {:?}", reading.text));
        }
        reading.value
    }
}

/// Writes the raw and preprocessed percent region for calibration.
fn save_debug_images(roi: &RgbaImage, reading: &OcrReading) {
    let dir = crate::paths::get_debug_dir();
    if let Err(e) = std::fs::create_dir_all(&dir) {
        crate::log(&format!("[detect] cannot create {}: {}", dir.display(), e));
        return;
    }
    if let Err(e) = roi.save(dir.join("percent_roi_raw.png")) {
        crate::log(&format!("[detect] failed to save raw ROI: {}", e));
    }
    if reading.processed.width() > 0 && reading.processed.height() > 0 {
        if let Err(e) = reading.processed.save(dir.join("percent_roi_proc.png")) {
            crate::log(&format!("[detect] failed to save processed ROI: {}", e));
        }
    }
}
