// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Frame preprocessing for pose inference.
//!
//! Frames are letterboxed (aspect-preserving resize, centered, gray padding) to the
//! model input size and converted to a normalized NCHW `f32` tensor.

use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;

use crate::error::{PipelineError, Result};

/// Default letterbox padding color (gray).
pub const LETTERBOX_COLOR: [u8; 3] = [114, 114, 114];

/// Reciprocal of 255 for normalization.
const INV_255: f32 = 1.0 / 255.0;

/// Result of preprocessing a frame, containing the tensor and transform info.
#[derive(Debug, Clone)]
pub struct PreprocessResult {
    /// Preprocessed tensor in NCHW format, normalized to [0, 1].
    pub tensor: Array4<f32>,
    /// Original frame dimensions (height, width).
    pub orig_shape: (u32, u32),
    /// Scale factors applied (`scale_y`, `scale_x`).
    pub scale: (f32, f32),
    /// Padding applied (`pad_top`, `pad_left`).
    pub padding: (f32, f32),
}

/// Letterbox a frame into a `target_size` (height, width) tensor.
///
/// The frame is resized with its aspect ratio kept, centered, and padded
/// with gray.
///
/// # Arguments
///
/// * `image` - Decoded video frame.
/// * `target_size` - Model input size as (height, width).
///
/// # Returns
///
/// The NCHW tensor plus the scale and padding needed to map keypoints back.
///
/// # Errors
///
/// Returns an error if the frame is empty or the resize fails.
pub fn preprocess_image(image: &DynamicImage, target_size: (usize, usize)) -> Result<PreprocessResult> {
    let (orig_width, orig_height) = image.dimensions();
    if orig_width == 0 || orig_height == 0 {
        return Err(PipelineError::ImageError("Empty frame".to_string()));
    }

    let (new_width, new_height, pad_left, pad_top, scale) =
        calculate_letterbox_params(orig_width, orig_height, target_size);

    let resized = resize_rgb(image, new_width, new_height)?;
    let tensor = letterbox_tensor(&resized, new_width, new_height, pad_left, pad_top, target_size);

    Ok(PreprocessResult {
        tensor,
        orig_shape: (orig_height, orig_width),
        scale,
        #[allow(clippy::cast_precision_loss)]
        padding: (pad_top as f32, pad_left as f32),
    })
}

/// Resize the RGB pixels of `image` to `width` x `height`.
fn resize_rgb(image: &DynamicImage, width: u32, height: u32) -> Result<Vec<u8>> {
    let rgb = image.to_rgb8();
    let (src_w, src_h) = rgb.dimensions();
    if (src_w, src_h) == (width, height) {
        return Ok(rgb.into_raw());
    }

    let src = Image::from_vec_u8(src_w, src_h, rgb.into_raw(), PixelType::U8x3)
        .map_err(|e| PipelineError::ImageError(format!("Invalid frame buffer: {e}")))?;
    let mut dst = Image::new(width, height, PixelType::U8x3);

    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
    Resizer::new()
        .resize(&src, &mut dst, &options)
        .map_err(|e| PipelineError::ImageError(format!("Failed to resize frame: {e}")))?;

    Ok(dst.into_vec())
}

/// Place resized RGB pixels on a padded canvas and normalize into NCHW.
fn letterbox_tensor(
    pixels: &[u8],
    width: u32,
    height: u32,
    pad_left: u32,
    pad_top: u32,
    target_size: (usize, usize),
) -> Array4<f32> {
    let (target_h, target_w) = target_size;
    let mut tensor = Array4::zeros((1, 3, target_h, target_w));

    for (c, &pad) in LETTERBOX_COLOR.iter().enumerate() {
        tensor
            .slice_mut(ndarray::s![0, c, .., ..])
            .fill(f32::from(pad) * INV_255);
    }

    let (w, h) = (width as usize, height as usize);
    let (left, top) = (pad_left as usize, pad_top as usize);
    for (i, chunk) in pixels.chunks_exact(3).enumerate() {
        let (y, x) = (i / w + top, i % w + left);
        if i / w >= h || y >= target_h || x >= target_w {
            continue;
        }
        for (c, &value) in chunk.iter().enumerate() {
            tensor[[0, c, y, x]] = f32::from(value) * INV_255;
        }
    }

    tensor
}

/// Calculate letterbox parameters for resizing.
///
/// # Arguments
///
/// * `orig_width` - Frame width.
/// * `orig_height` - Frame height.
/// * `target_size` - Model input size as (height, width).
///
/// # Returns
///
/// `(new_width, new_height, pad_left, pad_top, (scale_y, scale_x))`.
fn calculate_letterbox_params(
    orig_width: u32,
    orig_height: u32,
    target_size: (usize, usize),
) -> (u32, u32, u32, u32, (f32, f32)) {
    #[allow(clippy::cast_precision_loss)]
    let (target_h, target_w) = (target_size.0 as f32, target_size.1 as f32);
    #[allow(clippy::cast_precision_loss)]
    let (orig_h, orig_w) = (orig_height as f32, orig_width as f32);

    let scale = (target_h / orig_h).min(target_w / orig_w);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let new_w = ((orig_w * scale).round() as u32).max(1);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let new_h = ((orig_h * scale).round() as u32).max(1);

    #[allow(clippy::cast_possible_truncation)]
    let pad_w = (target_size.1 as u32).saturating_sub(new_w);
    #[allow(clippy::cast_possible_truncation)]
    let pad_h = (target_size.0 as u32).saturating_sub(new_h);

    #[allow(clippy::cast_precision_loss)]
    let scale_x = new_w as f32 / orig_w;
    #[allow(clippy::cast_precision_loss)]
    let scale_y = new_h as f32 / orig_h;

    (new_w, new_h, pad_w / 2, pad_h / 2, (scale_y, scale_x))
}

/// Map a point from letterboxed model space back to original pixels.
///
/// # Arguments
///
/// * `x`, `y` - Point in model input coordinates.
/// * `scale` - Scale factors as (`scale_y`, `scale_x`).
/// * `padding` - Padding as (`pad_top`, `pad_left`).
///
/// # Returns
///
/// The point in frame pixel coordinates, not clamped.
#[must_use]
pub fn scale_point(x: f32, y: f32, scale: (f32, f32), padding: (f32, f32)) -> (f32, f32) {
    let (scale_y, scale_x) = scale;
    let (pad_top, pad_left) = padding;
    ((x - pad_left) / scale_x, (y - pad_top) / scale_y)
}

/// Scale box coordinates from model output space back to original image space.
#[must_use]
pub fn scale_coords(coords: &[f32; 4], scale: (f32, f32), padding: (f32, f32)) -> [f32; 4] {
    let (x1, y1) = scale_point(coords[0], coords[1], scale, padding);
    let (x2, y2) = scale_point(coords[2], coords[3], scale, padding);
    [x1, y1, x2, y2]
}

/// Clip box coordinates to image bounds given as (height, width).
#[must_use]
pub const fn clip_coords(coords: &[f32; 4], shape: (u32, u32)) -> [f32; 4] {
    #[allow(clippy::cast_precision_loss)]
    let (h, w) = (shape.0 as f32, shape.1 as f32);
    [
        coords[0].clamp(0.0, w),
        coords[1].clamp(0.0, h),
        coords[2].clamp(0.0, w),
        coords[3].clamp(0.0, h),
    ]
}

#[allow(clippy::similar_names)]
#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_letterbox_params_square() {
        let (new_w, new_h, pad_left, pad_top, _scale) =
            calculate_letterbox_params(640, 640, (640, 640));

        assert_eq!((new_w, new_h), (640, 640));
        assert_eq!((pad_left, pad_top), (0, 0));
    }

    #[test]
    fn test_letterbox_params_wide() {
        let (new_w, new_h, pad_left, pad_top, (scale_y, scale_x)) =
            calculate_letterbox_params(1280, 720, (640, 640));

        assert_eq!((new_w, new_h), (640, 360));
        assert_eq!((pad_left, pad_top), (0, 140));
        assert!((scale_x - 0.5).abs() < 1e-6);
        assert!((scale_y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_pads_with_gray() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 32, image::Rgb([255, 0, 0])));
        let result = preprocess_image(&img, (64, 64)).unwrap();

        assert_eq!(result.tensor.shape(), &[1, 3, 64, 64]);
        assert_eq!(result.orig_shape, (32, 64));
        assert_eq!(result.padding, (16.0, 0.0));

        // Padding row
        assert!((result.tensor[[0, 0, 0, 0]] - 114.0 / 255.0).abs() < 1e-6);
        // Image row: pure red
        assert!((result.tensor[[0, 0, 32, 10]] - 1.0).abs() < 1e-6);
        assert!(result.tensor[[0, 1, 32, 10]].abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_rejects_empty_frame() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        assert!(preprocess_image(&img, (64, 64)).is_err());
    }

    #[test]
    fn test_scale_coords() {
        let scaled = scale_coords(&[100.0, 100.0, 200.0, 200.0], (1.0, 1.0), (10.0, 10.0));

        assert!((scaled[0] - 90.0).abs() < 1e-6);
        assert!((scaled[1] - 90.0).abs() < 1e-6);
        assert!((scaled[2] - 190.0).abs() < 1e-6);
        assert!((scaled[3] - 190.0).abs() < 1e-6);
    }

    #[test]
    fn test_scale_point_undoes_letterbox() {
        // 1280x720 into 640x640: scale 0.5, 140px top padding
        let (x, y) = scale_point(320.0, 320.0, (0.5, 0.5), (140.0, 0.0));
        assert!((x - 640.0).abs() < 1e-4);
        assert!((y - 360.0).abs() < 1e-4);
    }

    #[test]
    fn test_clip_coords() {
        let clipped = clip_coords(&[-10.0, -20.0, 700.0, 500.0], (480, 640));
        assert_eq!(clipped, [0.0, 0.0, 640.0, 480.0]);
    }
}
