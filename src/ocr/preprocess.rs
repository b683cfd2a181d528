use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbaImage};
use serde::Deserialize;

use crate::geometry::Rect;

/// Smoothing kernel used as the "blurred" baseline for sharpening, row-major.
const SMOOTH_KERNEL: [u32; 9] = [1, 1, 1, 1, 5, 1, 1, 1, 1];
const SMOOTH_KERNEL_SUM: u32 = 13;

/// Image normalization applied before OCR.
///
/// Defaults are tuned for small numeric UI text.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PreprocessParams {
    /// Integer upscaling factor
    #[serde(default = "default_scale")]
    pub scale: u32,
    /// Contrast factor (1.0 = unchanged)
    #[serde(default = "default_contrast")]
    pub contrast: f32,
    /// Sharpness factor (1.0 = unchanged)
    #[serde(default = "default_sharpness")]
    pub sharpness: f32,
    /// Invert after enhancement (for light text on dark backgrounds)
    #[serde(default)]
    pub invert: bool,
}

fn default_scale() -> u32 {
    10
}

fn default_contrast() -> f32 {
    1.2
}

fn default_sharpness() -> f32 {
    1.6
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            scale: default_scale(),
            contrast: default_contrast(),
            sharpness: default_sharpness(),
            invert: false,
        }
    }
}

/// Grayscale, upscale, enhance contrast and sharpness, optionally invert.
///
/// Deterministic for a given input.
pub fn preprocess_for_ocr(img: &RgbaImage, params: &PreprocessParams) -> GrayImage {
    let gray = imageops::grayscale(img);
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray;
    }
    let scale = params.scale.max(1);
    let upscaled = imageops::resize(&gray, w * scale, h * scale, FilterType::Lanczos3);
    let contrasted = enhance_contrast(&upscaled, params.contrast);
    let mut sharpened = enhance_sharpness(&contrasted, params.sharpness);
    if params.invert {
        imageops::invert(&mut sharpened);
    }
    sharpened
}

/// Blends every pixel toward (factor < 1) or away from (factor > 1) the mean gray.
pub fn enhance_contrast(img: &GrayImage, factor: f32) -> GrayImage {
    let mean = mean_luma(img).round();
    let mut output = img.clone();
    for pixel in output.pixels_mut() {
        pixel[0] = blend(mean, pixel[0] as f32, factor);
    }
    output
}

/// Blends every pixel toward or away from a smoothed copy of the image.
pub fn enhance_sharpness(img: &GrayImage, factor: f32) -> GrayImage {
    let smooth = smooth3x3(img);
    let mut output = img.clone();
    for (x, y, pixel) in output.enumerate_pixels_mut() {
        let base = smooth.get_pixel(x, y)[0] as f32;
        *pixel = Luma([blend(base, pixel[0] as f32, factor)]);
    }
    output
}

/// Weighted 3x3 average of interior pixels. Border pixels are copied unchanged.
fn smooth3x3(img: &GrayImage) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut output = img.clone();
    if w < 3 || h < 3 {
        return output;
    }
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut acc = 0u32;
            for (i, weight) in SMOOTH_KERNEL.iter().enumerate() {
                let sx = x + i as u32 % 3 - 1;
                let sy = y + i as u32 / 3 - 1;
                acc += weight * img.get_pixel(sx, sy)[0] as u32;
            }
            let value = (acc + SMOOTH_KERNEL_SUM / 2) / SMOOTH_KERNEL_SUM;
            output.put_pixel(x, y, Luma([value as u8]));
        }
    }
    output
}

fn blend(base: f32, value: f32, factor: f32) -> u8 {
    (base + factor * (value - base)).round().clamp(0.0, 255.0) as u8
}

fn mean_luma(img: &GrayImage) -> f32 {
    let count = img.width() as u64 * img.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let total: u64 = img.pixels().map(|p| p[0] as u64).sum();
    (total as f64 / count as f64) as f32
}

/// Crops a pixel rectangle out of `img`, clamped to the image bounds.
///
/// A rectangle entirely outside the image yields an empty image.
pub fn crop_region(img: &RgbaImage, rect: Rect) -> RgbaImage {
    let (w, h) = img.dimensions();
    let clamp_x = |v: i32| (v.max(0) as u32).min(w);
    let clamp_y = |v: i32| (v.max(0) as u32).min(h);

    let x0 = clamp_x(rect.left);
    let y0 = clamp_y(rect.top);
    let x1 = clamp_x(rect.right);
    let y1 = clamp_y(rect.bottom);

    imageops::crop_imm(img, x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0)).to_image()
}
