use burn::prelude::*;

use crate::error::{ModelError, ModelResult};

/// Configuration of the default [`DualHeadNet`](crate::DualHeadNet).
///
/// The encoder doubles the channel count at every level, starting from
/// `base_channels`, and halves the spatial resolution `levels` times.
#[derive(Config, Debug)]
pub struct DualHeadNetConfig {
    /// Channels of the composite input image.
    #[config(default = 3)]
    pub in_channels: usize,
    /// Channels produced by the first encoder block.
    #[config(default = 16)]
    pub base_channels: usize,
    /// Number of downsampling steps.
    #[config(default = 3)]
    pub levels: usize,
    /// Training batch size. BatchNorm is only used when this is greater than one.
    #[config(default = 4)]
    pub batch_size: usize,
}

impl DualHeadNetConfig {
    /// Channel count at each encoder level, from full resolution to the bottleneck.
    pub fn channels(&self) -> Vec<usize> {
        (0..=self.levels).map(|i| self.base_channels << i).collect()
    }

    /// Input height and width must be a multiple of this value.
    pub const fn size_multiple(&self) -> usize {
        1 << self.levels
    }

    pub(crate) fn validate(&self) -> ModelResult<()> {
        if self.in_channels == 0 {
            return Err(ModelError::InvalidConfiguration {
                reason: "in_channels must be greater than 0".to_owned(),
            });
        }
        if self.base_channels == 0 {
            return Err(ModelError::InvalidConfiguration {
                reason: "base_channels must be greater than 0".to_owned(),
            });
        }
        if self.levels == 0 || self.levels > 6 {
            return Err(ModelError::InvalidConfiguration {
                reason: format!("levels must be within 1..=6, got {}", self.levels),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_double_per_level() {
        let config = DualHeadNetConfig::new().with_base_channels(8).with_levels(3);
        assert_eq!(config.channels(), vec![8, 16, 32, 64]);
        assert_eq!(config.size_multiple(), 8);
    }

    #[test]
    fn zero_levels_is_rejected() {
        let config = DualHeadNetConfig::new().with_levels(0);
        assert!(matches!(
            config.validate(),
            Err(ModelError::InvalidConfiguration { .. })
        ));
    }
}
