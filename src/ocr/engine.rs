use anyhow::{Result, anyhow};
use image::GrayImage;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

/// Turns a preprocessed image into text.
///
/// Implementations never fail: any error is reported as empty text so the
/// caller can treat it as "no number".
pub trait TextRecognizer {
    fn recognize_text(&mut self, img: &GrayImage) -> String;
}

/// Tesseract in LSTM mode with dictionary correction disabled, so digit
/// strings are never "corrected" into words.
pub struct TesseractOcr {
    executable: PathBuf,
    tessdata: Option<PathBuf>,
}

impl TesseractOcr {
    pub fn new(executable: PathBuf, tessdata: Option<PathBuf>) -> Self {
        Self {
            executable,
            tessdata,
        }
    }

    fn command(&self, input: &std::path::Path) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg(input).arg("stdout");
        if let Some(dir) = &self.tessdata {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd.arg("-l")
            .arg("eng")
            .arg("--oem")
            .arg("1") // LSTM only
            .arg("--psm")
            .arg("7") // Single text line
            .arg("-c")
            .arg("load_system_dawg=0")
            .arg("-c")
            .arg("load_freq_dawg=0")
            .arg("tsv");
        cmd
    }

    fn try_recognize(&self, img: &GrayImage) -> Result<String> {
        // Save image to temporary file
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())?;

        let output = self.command(temp_input.path()).output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr.trim()));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        Ok(parse_tsv_words(&tsv).join(" "))
    }
}

impl TextRecognizer for TesseractOcr {
    fn recognize_text(&mut self, img: &GrayImage) -> String {
        if img.width() == 0 || img.height() == 0 {
            return String::new();
        }
        match self.try_recognize(img) {
            Ok(text) => text,
            Err(e) => {
                crate::log(&format!("[ocr] {}", e));
                String::new()
            }
        }
    }
}

/// Extracts recognized words from Tesseract TSV output, in output order.
fn parse_tsv_words(tsv: &str) -> Vec<String> {
    let mut words = Vec::new();

    for line in tsv.lines().skip(1) {
        // Skip header
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        // TSV fields: level, page_num, block_num, par_num, line_num, word_num,
        //             left, top, width, height, conf, text
        let level: i32 = fields[0].parse().unwrap_or(-1);
        let conf: f32 = fields[10].parse().unwrap_or(-1.0);
        let text = fields[11].trim();

        // Level 5 = word
        if level != 5 || conf < 0.0 || text.is_empty() {
            continue;
        }
        words.push(text.to_string());
    }

    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::describe;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn test_parse_tsv_words_keeps_order() {
        let tsv = format!(
            "{}\n1\t1\t0\t0\t0\t0\t0\t0\t100\t20\t-1\t\n\
             5\t1\t1\t1\t1\t1\t2\t2\t30\t18\t91.5\t12\n\
             5\t1\t1\t1\t1\t2\t34\t2\t10\t18\t88.0\t/\n\
             5\t1\t1\t1\t1\t3\t46\t2\t30\t18\t90.2\t45\n",
            HEADER
        );
        assert_eq!(parse_tsv_words(&tsv), vec!["12", "/", "45"]);
    }

    #[test]
    fn test_parse_tsv_words_skips_blank_and_short_rows() {
        let tsv = format!(
            "{}\n5\t1\t1\t1\t1\t1\t2\t2\t30\t18\t95\t \ngarbage\n",
            HEADER
        );
        assert!(parse_tsv_words(&tsv).is_empty());
    }

    #[test]
    fn test_command_disables_dictionaries() {
        let ocr = TesseractOcr::new(PathBuf::from("tesseract"), None);
        let line = describe(&ocr.command(std::path::Path::new("/tmp/in.png")));
        assert_eq!(
            line,
            "tesseract /tmp/in.png stdout -l eng --oem 1 --psm 7 \
             -c load_system_dawg=0 -c load_freq_dawg=0 tsv"
        );
    }

    #[test]
    fn test_missing_executable_yields_empty_text() {
        let mut ocr = TesseractOcr::new(PathBuf::from("autofight-no-such-tesseract"), None);
        let img = GrayImage::from_pixel(4, 4, image::Luma([255]));
        assert_eq!(ocr.recognize_text(&img), "");
    }
}
