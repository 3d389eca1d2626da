#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use crate::light_probe::common::error::ProbeError;
    use crate::light_probe::fusion::{ExposureFusionEngine, FusionConfig, RadianceWeighting};

    fn uniform(width: u32, height: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([value, value, value]))
    }

    fn assert_close(actual: f32, expected: f32, tolerance: f32) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_weight_is_one_at_mid_gray() {
        let weighting = RadianceWeighting::default();
        assert_eq!(weighting.weight(127), 1.0);
    }

    #[test]
    fn test_weight_is_symmetric() {
        let weighting = RadianceWeighting::default();
        for d in 0..=127u8 {
            assert_eq!(weighting.weight(127 - d), weighting.weight(127 + d));
        }
    }

    #[test]
    fn test_weight_decreases_away_from_mid_gray() {
        let weighting = RadianceWeighting::default();
        let mut previous = weighting.weight(127);
        for sample in 128..=255u8 {
            let w = weighting.weight(sample);
            assert!(w <= previous);
            assert!(w >= 0.0);
            previous = w;
        }
        let mut previous = weighting.weight(127);
        for sample in (0..127u8).rev() {
            let w = weighting.weight(sample);
            assert!(w <= previous);
            previous = w;
        }
    }

    #[test]
    fn test_config_builder_rejects_non_positive_sigma() {
        let result = FusionConfig::builder().sigma(0.0).build();
        assert!(matches!(result, Err(ProbeError::InvalidConfig(_))));

        let config = FusionConfig::builder().sigma(20.0).build().unwrap();
        assert_eq!(config.sigma, 20.0);
        assert_eq!(config.mu, 127.0);
    }

    #[test]
    fn test_mismatched_width_is_rejected_without_mutation() {
        let mut engine = ExposureFusionEngine::default();
        engine.add_exposure(uniform(8, 6, 100), 0.0).unwrap();

        let result = engine.add_exposure(uniform(9, 6, 100), 1.0);
        assert!(matches!(
            result,
            Err(ProbeError::InputMismatch { expected: (8, 6), found: (9, 6) })
        ));
        assert_eq!(engine.len(), 1);
        assert_eq!(engine.dimensions(), Some((8, 6)));
    }

    #[test]
    fn test_mismatched_height_is_rejected() {
        let mut engine = ExposureFusionEngine::default();
        engine.add_exposure(uniform(8, 6, 100), 0.0).unwrap();
        assert!(engine.add_exposure(uniform(8, 7, 100), 0.0).is_err());
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_empty_first_image_is_rejected() {
        let mut engine = ExposureFusionEngine::default();
        let result = engine.add_exposure(RgbImage::new(0, 4), 0.0);
        assert!(matches!(result, Err(ProbeError::InvalidDimensions(0, 4))));
        assert!(engine.is_empty());
    }

    #[test]
    fn test_empty_batch_fails() {
        let mut engine = ExposureFusionEngine::default();
        assert!(matches!(engine.compute_radiance(), Err(ProbeError::EmptyBatch)));
    }

    #[test]
    fn test_single_mid_gray_exposure_is_unit_radiance() {
        let mut engine = ExposureFusionEngine::default();
        engine.add_exposure(uniform(5, 4, 127), 0.0).unwrap();

        let radiance = engine.compute_radiance().unwrap();
        assert_eq!(radiance.dimensions(), (5, 4));
        assert_eq!(radiance.unreliable_samples(), 0);
        for y in 0..4 {
            for x in 0..5 {
                for channel in radiance.pixel(x, y) {
                    assert_close(channel, 1.0, 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_batch_is_consumed_after_compute() {
        let mut engine = ExposureFusionEngine::default();
        engine.add_exposure(uniform(4, 4, 90), 0.0).unwrap();
        engine.compute_radiance().unwrap();

        assert!(engine.is_empty());
        // A new batch may use different dimensions
        engine.add_exposure(uniform(2, 3, 90), 0.0).unwrap();
        assert_eq!(engine.dimensions(), Some((2, 3)));
    }

    #[test]
    fn test_failed_compute_keeps_engine_usable() {
        let mut engine = ExposureFusionEngine::default();
        assert!(engine.compute_radiance().is_err());
        engine.add_exposure(uniform(2, 2, 127), 0.0).unwrap();
        assert!(engine.compute_radiance().is_ok());
    }

    #[test]
    fn test_channels_are_fused_independently() {
        let mut engine = ExposureFusionEngine::default();
        engine
            .add_exposure(RgbImage::from_pixel(2, 2, Rgb([127, 254, 0])), 1.0)
            .unwrap();

        let radiance = engine.compute_radiance().unwrap();
        let [r, g, b] = radiance.pixel(1, 1);
        assert_close(r, 2.0, 1e-5);
        assert_close(g, 4.0, 1e-5);
        assert_close(b, 0.0, 1e-6);
    }

    #[test]
    fn test_well_exposed_sample_dominates() {
        // Same scene point: saturated in the long exposure, mid-gray in the short one
        let mut engine = ExposureFusionEngine::default();
        engine.add_exposure(uniform(1, 1, 255), -1.0).unwrap();
        engine.add_exposure(uniform(1, 1, 127), 1.0).unwrap();

        let radiance = engine.compute_radiance().unwrap();
        let value = radiance.pixel(0, 0)[0];
        let weighting = RadianceWeighting::default();
        let w_sat = weighting.weight(255);
        let expected = (w_sat * 255.0 / 127.0 * 0.5 + 2.0) / (w_sat + 1.0);
        assert_close(value, expected, 1e-5);
        assert!(value > 1.9);
    }

    #[test]
    fn test_zero_weight_samples_are_flagged() {
        let config = FusionConfig::builder().sigma(0.5).build().unwrap();
        let mut engine = ExposureFusionEngine::new(config);
        engine.add_exposure(uniform(3, 2, 0), 0.0).unwrap();
        engine.add_exposure(uniform(3, 2, 255), 1.0).unwrap();

        let radiance = engine.compute_radiance().unwrap();
        assert_eq!(radiance.unreliable_samples(), 3 * 2 * 3);
        assert_eq!(radiance.pixel(2, 1), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_consistent_exposures_cancel() {
        let mut engine = ExposureFusionEngine::default();
        for ev in [-1.0, 0.0, 1.0] {
            engine.add_exposure(uniform(3, 3, 64), ev).unwrap();
        }
        let radiance = engine.compute_radiance().unwrap();
        let w = RadianceWeighting::default().weight(64);
        let expected = w * (64.0 / 127.0) * (0.5 + 1.0 + 2.0) / (3.0 * w);
        assert_close(radiance.pixel(0, 0)[1], expected, 1e-5);
    }
}
