use crate::light_probe::fusion::types::FusionConfig;

/// Confidence of an 8-bit sample for radiance estimation.
///
/// A Gaussian centered on mid-gray, scaled so that the center weighs exactly 1.
/// Near-black samples are noisy and near-white ones are clipped, so both get
/// little say in the fused value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadianceWeighting {
    sigma: f32,
    mu: f32,
}

impl Default for RadianceWeighting {
    fn default() -> Self {
        Self::from_config(&FusionConfig::default())
    }
}

impl RadianceWeighting {
    pub fn from_config(config: &FusionConfig) -> Self {
        Self {
            sigma: config.sigma,
            mu: config.mu,
        }
    }

    pub fn weight(&self, sample: u8) -> f32 {
        let d = f32::from(sample) - self.mu;
        (-(d * d) / (2.0 * self.sigma * self.sigma)).exp()
    }

    /// All 256 weights, indexed by sample value.
    pub fn table(&self) -> [f32; 256] {
        let mut table = [0.0f32; 256];
        for (sample, w) in table.iter_mut().enumerate() {
            *w = self.weight(sample as u8);
        }
        table
    }
}
