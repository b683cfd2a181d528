pub mod engine;
pub mod extract;
pub mod preprocess;
pub mod setup;

pub use engine::{TesseractOcr, TextRecognizer};
pub use extract::{extract_first_integer, normalize_ocr_text, parse_percent_text};
pub use preprocess::{PreprocessParams, preprocess_for_ocr};
pub use setup::ensure_tesseract;

use image::{GrayImage, RgbaImage};

/// How a number is pulled out of normalized OCR text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumberParse {
    /// First run of digits, unbounded
    FirstInteger,
    /// Percentage in 0-100, anything else rejected
    ClampedPercent,
}

/// Result of reading one number from a captured region.
#[derive(Debug, Clone)]
pub struct OcrReading {
    /// Normalized OCR text
    pub text: String,
    pub value: Option<u32>,
    /// The image handed to the recognizer
    pub processed: GrayImage,
}

/// High-level function: region image → number.
///
/// Preprocesses, recognizes, normalizes glyph confusions, then parses.
pub fn ocr_number(
    roi: &RgbaImage,
    params: &PreprocessParams,
    recognizer: &mut dyn TextRecognizer,
    parse: NumberParse,
) -> OcrReading {
    let processed = preprocess_for_ocr(roi, params);
    let raw = recognizer.recognize_text(&processed);
    let text = normalize_ocr_text(&raw);
    let value = match parse {
        NumberParse::FirstInteger => extract_first_integer(&text),
        NumberParse::ClampedPercent => parse_percent_text(&text),
    };
    OcrReading {
        text,
        value,
        processed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    impl TextRecognizer for Fixed {
        fn recognize_text(&mut self, _img: &GrayImage) -> String {
            self.0.to_string()
        }
    }

    fn roi() -> RgbaImage {
        RgbaImage::from_pixel(3, 2, image::Rgba([20, 20, 20, 255]))
    }

    #[test]
    fn test_ocr_number_normalizes_before_parsing() {
        let params = PreprocessParams::default();
        let reading = ocr_number(&roi(), &params, &mut Fixed("l5O"), NumberParse::FirstInteger);
        assert_eq!(reading.text, "150");
        assert_eq!(reading.value, Some(150));
        assert_eq!(reading.processed.dimensions(), (30, 20));
    }

    #[test]
    fn test_ocr_number_clamped_rejects_over_100() {
        let params = PreprocessParams::default();
        let reading = ocr_number(&roi(), &params, &mut Fixed("l5O"), NumberParse::ClampedPercent);
        assert_eq!(reading.value, None);
        let reading = ocr_number(&roi(), &params, &mut Fixed("4O%"), NumberParse::ClampedPercent);
        assert_eq!(reading.value, Some(40));
    }

    #[test]
    fn test_ocr_number_empty_text_is_none() {
        let params = PreprocessParams::default();
        let reading = ocr_number(&roi(), &params, &mut Fixed(""), NumberParse::FirstInteger);
        assert_eq!(reading.value, None);
    }
}
