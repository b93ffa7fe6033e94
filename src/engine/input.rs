//! Turning what the client sends into something an engine can consume.
//!
//! The client posts its canvas as an image data URL.  Decoding real pixels
//! out of it is deliberately not done here: the only preparer shipped is
//! [`SyntheticDigit`], which checks that the payload looks like an image and
//! then stands in a centred blob for the digit, with noise seeded from the
//! payload so the same drawing always gives the same input.  A decoder for real drawings
//! plugs in behind [`InputPreparer`] without touching the engine.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::error::EngineError;

/// Side length of the square grayscale input the network expects.
pub const INPUT_SIDE: usize = 28;

/// A grayscale image, row-major, values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InputImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<f64>,
}

impl InputImage {
    pub fn pixel(&self, row: usize, col: usize) -> f64 {
        self.pixels[row * self.width + col]
    }
}

/// Converts a client payload into an [`InputImage`].
pub trait InputPreparer: Send + Sync {
    fn prepare(&self, image_data_url: &str) -> Result<InputImage, EngineError>;
}

/// Placeholder preparer: validates the data URL, ignores its pixels and
/// returns a radial 28×28 pattern with a little noise derived from the
/// payload bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticDigit;

impl InputPreparer for SyntheticDigit {
    fn prepare(&self, image_data_url: &str) -> Result<InputImage, EngineError> {
        check_data_url(image_data_url)?;

        let mut hasher = DefaultHasher::new();
        image_data_url.hash(&mut hasher);
        let mut rng = StdRng::seed_from_u64(hasher.finish());
        let centre = INPUT_SIDE as f64 / 2.0;
        let mut pixels = Vec::with_capacity(INPUT_SIDE * INPUT_SIDE);
        for row in 0..INPUT_SIDE {
            for col in 0..INPUT_SIDE {
                let dist = ((row as f64 - centre).powi(2) + (col as f64 - centre).powi(2)).sqrt();
                let value = (1.0 - dist / 10.0).max(0.0) + rng.gen::<f64>() * 0.1;
                pixels.push(value.min(1.0));
            }
        }
        Ok(InputImage { width: INPUT_SIDE, height: INPUT_SIDE, pixels })
    }
}

/// Accepts `data:image/<subtype>[;params],<payload>` with a non-empty payload.
pub fn check_data_url(url: &str) -> Result<(), EngineError> {
    let rest = url
        .strip_prefix("data:image/")
        .ok_or_else(|| EngineError::InvalidInput("expected an image data URL".into()))?;
    let comma = rest
        .find(',')
        .ok_or_else(|| EngineError::InvalidInput("data URL has no payload separator".into()))?;
    if rest[comma + 1..].trim().is_empty() {
        return Err(EngineError::InvalidInput("data URL payload is empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TINY_PNG: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[test]
    fn synthetic_digit_is_bright_in_the_middle() {
        let img = SyntheticDigit.prepare(TINY_PNG).unwrap();
        assert_eq!(img.pixels.len(), INPUT_SIDE * INPUT_SIDE);
        assert!(img.pixels.iter().all(|p| (0.0..=1.0).contains(p)));
        assert!(img.pixel(14, 14) > img.pixel(0, 0));
    }

    #[test]
    fn same_payload_gives_same_image() {
        let a = SyntheticDigit.prepare(TINY_PNG).unwrap();
        let b = SyntheticDigit.prepare(TINY_PNG).unwrap();
        let c = SyntheticDigit.prepare("data:image/png;base64,AAAAAAAA").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn rejects_non_image_payloads() {
        assert!(SyntheticDigit.prepare("").is_err());
        assert!(SyntheticDigit.prepare("data:text/plain,hello").is_err());
        assert!(SyntheticDigit.prepare("data:image/png;base64,").is_err());
        assert!(SyntheticDigit.prepare("data:image/png;base64").is_err());
    }
}
