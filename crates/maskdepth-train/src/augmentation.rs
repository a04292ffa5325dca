//! Paired augmentation of fgbg/mask/depth triplets.
//!
//! Every geometric transform is applied to the three images together so the
//! targets stay aligned with the input.

use std::sync::atomic::{AtomicU64, Ordering};

use burn::config::Config;
use image::{imageops::FilterType, DynamicImage};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Augmentation parameters of the training split.
#[derive(Config, Debug)]
pub struct AugmentationConfig {
    /// Probability of a horizontal flip. Default: 0.5
    #[config(default = 0.5)]
    pub flip_probability: f64,

    /// Seed of the augmentation random stream. Default: 42
    #[config(default = 42)]
    pub seed: u64,
}

/// Applies resizing and random flips to triplets.
#[derive(Debug)]
pub struct PairAugmentor {
    flip_probability: f64,
    seed: u64,
    draws: AtomicU64,
}

impl PairAugmentor {
    pub fn new(config: &AugmentationConfig) -> Self {
        Self {
            flip_probability: config.flip_probability.clamp(0.0, 1.0),
            seed: config.seed,
            draws: AtomicU64::new(0),
        }
    }

    /// One RNG per draw so concurrent loader workers never share state.
    fn next_rng(&self) -> StdRng {
        let draw = self.draws.fetch_add(1, Ordering::Relaxed);
        StdRng::seed_from_u64(self.seed.wrapping_add(draw))
    }

    /// Flip all three images horizontally with the configured probability.
    pub fn augment(
        &self,
        fgbg: DynamicImage,
        mask: DynamicImage,
        depth: DynamicImage,
    ) -> (DynamicImage, DynamicImage, DynamicImage) {
        let mut rng = self.next_rng();
        if rng.random_bool(self.flip_probability) {
            (fgbg.fliph(), mask.fliph(), depth.fliph())
        } else {
            (fgbg, mask, depth)
        }
    }
}

/// Resize a triplet to `size` (width, height).
///
/// The input uses a triangle filter; targets use nearest neighbour so mask
/// labels are not blended.
pub fn resize_triplet(
    fgbg: DynamicImage,
    mask: DynamicImage,
    depth: DynamicImage,
    size: (u32, u32),
) -> (DynamicImage, DynamicImage, DynamicImage) {
    let (width, height) = size;
    (
        fgbg.resize_exact(width, height, FilterType::Triangle),
        mask.resize_exact(width, height, FilterType::Nearest),
        depth.resize_exact(width, height, FilterType::Nearest),
    )
}
