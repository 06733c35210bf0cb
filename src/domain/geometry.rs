// Pixel coordinates and color range domain models
use super::error::InputError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Integer pixel coordinate. Not required to lie inside any particular image;
/// the sampler clamps it at use time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl FromStr for Point {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = split_ints(s).ok_or_else(|| InputError::InvalidCoordinates(s.to_string()))?;
        match parts.as_slice() {
            [x, y] => Ok(Self::new(*x, *y)),
            _ => Err(InputError::InvalidCoordinates(s.to_string())),
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const BLACK: Rgb = Rgb([0, 0, 0]);
    pub const WHITE: Rgb = Rgb([255, 255, 255]);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }
}

impl FromStr for Rgb {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InputError::InvalidColor(s.to_string());
        let parts = split_ints(s).ok_or_else(invalid)?;
        let [r, g, b] = parts.as_slice() else {
            return Err(invalid());
        };
        let channel = |v: i64| u8::try_from(v).map_err(|_| invalid());
        Ok(Self([channel(*r)?, channel(*g)?, channel(*b)?]))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "{},{},{}", r, g, b)
    }
}

impl From<image::Rgb<u8>> for Rgb {
    fn from(pixel: image::Rgb<u8>) -> Self {
        Self(pixel.0)
    }
}

/// Inclusive per-channel color bounds. A channel whose min exceeds its max
/// never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRange {
    pub min: Rgb,
    pub max: Rgb,
}

impl ColorRange {
    pub const fn new(min: Rgb, max: Rgb) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, color: Rgb) -> bool {
        (0..3).all(|c| self.min.0[c] <= color.0[c] && color.0[c] <= self.max.0[c])
    }
}

impl Default for ColorRange {
    fn default() -> Self {
        Self::new(Rgb::BLACK, Rgb::WHITE)
    }
}

/// Parse a comma separated list of integers, tolerating surrounding spaces.
pub(crate) fn split_ints(s: &str) -> Option<Vec<i64>> {
    s.split(',').map(|p| p.trim().parse::<i64>().ok()).collect()
}
