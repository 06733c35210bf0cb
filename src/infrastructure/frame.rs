// Frame decoding and snapshot preprocessing (crop / rotate)
use crate::domain::error::InputError;
use crate::domain::geometry::split_ints;
use image::{imageops, RgbImage};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("failed to decode camera image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("crop box {crop:?} does not fit a {width}x{height} frame")]
    CropOutOfBounds { crop: CropBox, width: u32, height: u32 },
}

/// Crop rectangle in source-frame pixels, right/bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl FromStr for CropBox {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InputError::InvalidCrop(s.to_string());
        let parts = split_ints(s).ok_or_else(invalid)?;
        let [left, top, right, bottom] = parts.as_slice() else {
            return Err(invalid());
        };
        let edge = |v: i64| u32::try_from(v).map_err(|_| invalid());
        let crop = Self {
            left: edge(*left)?,
            top: edge(*top)?,
            right: edge(*right)?,
            bottom: edge(*bottom)?,
        };
        if crop.right <= crop.left || crop.bottom <= crop.top {
            return Err(invalid());
        }
        Ok(crop)
    }
}

/// Clockwise rotation applied after cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl TryFrom<i32> for Rotation {
    type Error = InputError;

    fn try_from(degrees: i32) -> Result<Self, Self::Error> {
        match degrees.rem_euclid(360) {
            0 => Ok(Rotation::None),
            90 => Ok(Rotation::Cw90),
            180 => Ok(Rotation::Cw180),
            270 => Ok(Rotation::Cw270),
            _ => Err(InputError::InvalidRotation(degrees)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameOptions {
    pub crop: Option<CropBox>,
    pub rotation: Rotation,
}

/// Decode JPEG/PNG bytes into an RGB grid.
pub fn decode_frame(bytes: &[u8]) -> Result<RgbImage, FrameError> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

/// Apply the configured crop and rotation. Line endpoints are expressed in
/// the coordinates of the resulting frame.
pub fn prepare_frame(frame: RgbImage, options: &FrameOptions) -> Result<RgbImage, FrameError> {
    let frame = match options.crop {
        Some(crop) => {
            let (width, height) = frame.dimensions();
            if crop.right > width || crop.bottom > height {
                return Err(FrameError::CropOutOfBounds { crop, width, height });
            }
            imageops::crop_imm(
                &frame,
                crop.left,
                crop.top,
                crop.right - crop.left,
                crop.bottom - crop.top,
            )
            .to_image()
        }
        None => frame,
    };

    Ok(match options.rotation {
        Rotation::None => frame,
        Rotation::Cw90 => imageops::rotate90(&frame),
        Rotation::Cw180 => imageops::rotate180(&frame),
        Rotation::Cw270 => imageops::rotate270(&frame),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn coordinate_frame(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| image::Rgb([x as u8, y as u8, 7]))
    }

    #[test]
    fn test_parse_crop() {
        assert_eq!(
            "1, 2, 30, 40".parse::<CropBox>().unwrap(),
            CropBox { left: 1, top: 2, right: 30, bottom: 40 }
        );
        assert!("10,10,5,20".parse::<CropBox>().is_err());
        assert!("0,0,10".parse::<CropBox>().is_err());
        assert!("-1,0,10,10".parse::<CropBox>().is_err());
    }

    #[test]
    fn test_rotation_from_degrees() {
        assert_eq!(Rotation::try_from(0).unwrap(), Rotation::None);
        assert_eq!(Rotation::try_from(-90).unwrap(), Rotation::Cw270);
        assert_eq!(Rotation::try_from(450).unwrap(), Rotation::Cw90);
        assert_eq!(Rotation::try_from(45), Err(InputError::InvalidRotation(45)));
    }

    #[test]
    fn test_crop_then_rotate() {
        let options = FrameOptions {
            crop: Some(CropBox { left: 2, top: 1, right: 6, bottom: 3 }),
            rotation: Rotation::Cw90,
        };
        let frame = prepare_frame(coordinate_frame(8, 8), &options).unwrap();

        // 4x2 crop becomes 2x4 after a quarter turn.
        assert_eq!(frame.dimensions(), (2, 4));
        // Top-left of the rotated frame is the crop's bottom-left.
        assert_eq!(frame.get_pixel(0, 0).0, [2, 2, 7]);
        assert_eq!(frame.get_pixel(1, 0).0, [2, 1, 7]);
    }

    #[test]
    fn test_crop_outside_frame_is_rejected() {
        let options = FrameOptions {
            crop: Some(CropBox { left: 0, top: 0, right: 20, bottom: 5 }),
            rotation: Rotation::None,
        };

        let err = prepare_frame(coordinate_frame(8, 8), &options).unwrap_err();
        assert!(matches!(err, FrameError::CropOutOfBounds { width: 8, height: 8, .. }));
    }

    #[test]
    fn test_decode_png_round_trip() {
        let source = coordinate_frame(5, 3);
        let mut bytes = Vec::new();
        source
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let decoded = decode_frame(&bytes).unwrap();
        assert_eq!(decoded, source);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(decode_frame(b"not an image"), Err(FrameError::Decode(_))));
    }
}
