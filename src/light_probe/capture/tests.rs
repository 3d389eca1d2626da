#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use image::{Rgb, RgbImage};

    use crate::light_probe::capture::{
        BracketConfig, BracketedCapture, ExposureSettings, FrameSource, ProbeTracker, SharedFrame,
        StillFrameSource, StopFlag,
    };
    use crate::light_probe::common::error::{ProbeError, Result};
    use crate::light_probe::fusion::ExposureFusionEngine;
    use crate::light_probe::projection::{ProbeStatus, ProjectorConfig, SphereProjector};

    fn unit_settings() -> ExposureSettings {
        ExposureSettings {
            aperture: 1.0,
            shutter_speed: 1.0,
            iso: 100.0,
            gain_db: 0.0,
        }
    }

    /// Gray frames whose level halves with every doubling of the shutter speed.
    struct MockCamera {
        base_level: f32,
        fail_after: Option<usize>,
        shared: Option<SharedFrame>,
        captured: Arc<Mutex<Vec<(ExposureSettings, bool)>>>,
    }

    impl MockCamera {
        fn new(captured: Arc<Mutex<Vec<(ExposureSettings, bool)>>>) -> Self {
            Self {
                base_level: 128.0,
                fail_after: None,
                shared: None,
                captured,
            }
        }
    }

    impl FrameSource for MockCamera {
        fn capture(&mut self, settings: &ExposureSettings) -> Result<RgbImage> {
            let mut captured = self.captured.lock().unwrap();
            if self.fail_after.is_some_and(|n| captured.len() >= n) {
                return Err(ProbeError::CaptureError("Mock capture error".to_string()));
            }
            let hdr_flag = self.shared.as_ref().is_some_and(|s| s.hdr_in_progress());
            captured.push((*settings, hdr_flag));
            let level = (self.base_level / settings.shutter_speed).round() as u8;
            Ok(RgbImage::from_pixel(8, 6, Rgb([level; 3])))
        }
    }

    fn disk_frame(cx: f32, cy: f32, radius: f32) -> RgbImage {
        RgbImage::from_fn(200, 150, |x, y| {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            if dx.hypot(dy) <= radius {
                Rgb([210, 200, 190])
            } else {
                Rgb([25, 30, 35])
            }
        })
    }

    fn tracker() -> ProbeTracker {
        let projector = SphereProjector::new(ProjectorConfig::default()).unwrap();
        ProbeTracker::new(projector, 50.0).with_poll_interval(Duration::from_millis(10))
    }

    #[test]
    fn test_exposure_value() {
        let unit = unit_settings();
        assert!(unit.ev().abs() < 1e-6);
        assert!((ExposureSettings { aperture: 2.0, ..unit }.ev() - 2.0).abs() < 1e-5);
        assert!((ExposureSettings { iso: 200.0, ..unit }.ev() + 1.0).abs() < 1e-5);
        assert!((ExposureSettings { gain_db: 6.0, ..unit }.ev() + 1.0).abs() < 1e-5);
        assert!((unit.with_shutter_speed(60.0).ev() - 60f32.log2()).abs() < 1e-5);
    }

    #[test]
    fn test_stopped_adds_stops() {
        let base = ExposureSettings::default();
        let darker = base.stopped(2.0);
        assert_eq!(darker.shutter_speed, base.shutter_speed * 4.0);
        assert!((darker.ev() - base.ev() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_bracket_config_validation() {
        assert!(matches!(
            BracketConfig::builder().exposure_count(0).build(),
            Err(ProbeError::InvalidConfig(_))
        ));
        let bad_base = ExposureSettings { iso: 0.0, ..ExposureSettings::default() };
        assert!(BracketConfig::builder().base(bad_base).build().is_err());
        assert!(BracketConfig::builder().stop_step(f32::NAN).build().is_err());

        let config = BracketConfig::default();
        assert_eq!(config.flush_frames, 5);
        assert_eq!(config.settings_at(2).shutter_speed, config.base.shutter_speed * 4.0);
    }

    #[test]
    fn test_bracket_fuses_consistent_exposures() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let shared = SharedFrame::new();
        let mut camera = MockCamera::new(captured.clone());
        camera.shared = Some(shared.clone());

        let config = BracketConfig::builder()
            .exposure_count(3)
            .stop_step(1.0)
            .base(unit_settings())
            .flush_frames(2)
            .build()
            .unwrap();
        let mut engine = ExposureFusionEngine::default();

        let radiance = BracketedCapture::new(config).run(&mut camera, &mut engine, &shared).unwrap();

        // 128, 64 and 32 at EV 0, 1 and 2 all describe the same radiance
        let [r, g, b] = radiance.pixel(4, 3);
        for v in [r, g, b] {
            assert!((v - 128.0 / 127.0).abs() < 1e-4, "radiance = {v}");
        }

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 9);
        assert!(captured.iter().all(|(_, hdr)| *hdr));
        let speeds: Vec<f32> = captured.iter().map(|(s, _)| s.shutter_speed).collect();
        assert_eq!(speeds, vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 4.0, 4.0, 4.0]);

        assert_eq!(shared.sequence(), 3);
        assert!((shared.exposure_value() - 2.0).abs() < 1e-5);
        assert!(!shared.hdr_in_progress());
        assert!(engine.is_empty());
    }

    #[test]
    fn test_bracket_failure_clears_flag_and_batch() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let mut camera = MockCamera::new(captured.clone());
        camera.fail_after = Some(4);
        let shared = SharedFrame::new();
        let mut engine = ExposureFusionEngine::default();

        let config = BracketConfig::builder().flush_frames(1).build().unwrap();
        let result = BracketedCapture::new(config).run(&mut camera, &mut engine, &shared);

        assert!(matches!(result, Err(ProbeError::CaptureError(_))));
        assert!(!shared.hdr_in_progress());
        assert!(engine.is_empty());
        assert_eq!(shared.sequence(), 2);
    }

    #[test]
    fn test_still_source_ignores_settings() {
        let frame = RgbImage::from_pixel(3, 2, Rgb([9, 8, 7]));
        let mut source = StillFrameSource::new(frame.clone());
        let a = source.capture(&ExposureSettings::default()).unwrap();
        let b = source.capture(&ExposureSettings::default().stopped(3.0)).unwrap();
        assert_eq!(a, frame);
        assert_eq!(b, frame);
    }

    #[test]
    fn test_still_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            StillFrameSource::open(dir.path().join("missing.png")),
            Err(ProbeError::CaptureError(_))
        ));
    }

    #[test]
    fn test_shared_frame_snapshots_are_copies() {
        let shared = SharedFrame::new();
        assert!(shared.snapshot().is_none());
        assert!(shared.snapshot_after(0, Duration::ZERO).is_none());

        shared.set_fix_sphere(true);
        shared.set_exposure_value(1.5);
        let sequence = shared.publish(RgbImage::from_pixel(2, 2, Rgb([1, 1, 1])));
        assert_eq!(sequence, 1);

        let mut snapshot = shared.snapshot_after(0, Duration::ZERO).unwrap();
        assert_eq!(snapshot.sequence, 1);
        assert!(snapshot.fix_sphere);
        assert!(!snapshot.hdr_in_progress);
        assert_eq!(snapshot.exposure_value, 1.5);

        snapshot.frame.put_pixel(0, 0, Rgb([99, 99, 99]));
        assert_eq!(shared.snapshot().unwrap().frame.get_pixel(0, 0).0, [1, 1, 1]);

        assert!(shared.snapshot_after(1, Duration::from_millis(5)).is_none());
    }

    #[test]
    fn test_snapshot_waits_for_publisher() {
        let shared = SharedFrame::new();
        let writer = shared.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            writer.publish(RgbImage::new(4, 4));
        });

        let snapshot = shared.snapshot_after(0, Duration::from_secs(5));
        handle.join().unwrap();
        assert_eq!(snapshot.map(|s| s.sequence), Some(1));
    }

    #[test]
    fn test_stop_flag_is_shared() {
        let stop = StopFlag::new();
        let other = stop.clone();
        assert!(!other.is_stopped());
        stop.stop();
        assert!(other.is_stopped());
    }

    #[test]
    fn test_tracker_delivers_panorama() {
        let shared = SharedFrame::new();
        shared.publish(disk_frame(100.0, 75.0, 40.0));
        let stop = StopFlag::new();
        let mut panoramas = Vec::new();

        let mut tracker = tracker();
        let delivered = tracker.run(&shared, &stop, |panorama| {
            panoramas.push(panorama);
            stop.stop();
        });

        assert_eq!(delivered, 1);
        assert_eq!(panoramas[0].dimensions(), (512, 256));
        assert_eq!(tracker.projector().status(), ProbeStatus::Ready);
    }

    #[test]
    fn test_fixed_sphere_skips_detection() {
        let shared = SharedFrame::new();
        let mut tracker = tracker();

        shared.publish(disk_frame(100.0, 75.0, 40.0));
        tracker.process(&shared.snapshot().unwrap()).unwrap();
        let sphere = tracker.projector().sphere();

        // Nothing to detect in a flat frame, but the sphere is held
        shared.set_fix_sphere(true);
        shared.publish(RgbImage::from_pixel(200, 150, Rgb([60, 60, 60])));
        tracker.process(&shared.snapshot().unwrap()).unwrap();
        assert_eq!(tracker.projector().status(), ProbeStatus::Ready);
        assert_eq!(tracker.projector().sphere(), sphere);

    }

    #[test]
    fn test_fixed_sphere_without_probe_detects() {
        let shared = SharedFrame::new();
        let mut tracker = tracker();

        shared.set_fix_sphere(true);
        shared.publish(RgbImage::from_pixel(200, 150, Rgb([60, 60, 60])));
        let panorama = tracker.process(&shared.snapshot().unwrap()).unwrap();
        assert_eq!(tracker.projector().status(), ProbeStatus::NoSphere);
        assert!(panorama.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_tracker_skips_failing_frames() {
        let shared = SharedFrame::new();
        shared.publish(disk_frame(100.0, 75.0, 40.0));
        let stop = StopFlag::new();

        let projector = SphereProjector::new(ProjectorConfig::default()).unwrap();
        let mut tracker = ProbeTracker::new(projector, 0.0).with_poll_interval(Duration::from_millis(5));

        let stopper = stop.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            stopper.stop();
        });

        let delivered = tracker.run(&shared, &stop, |_| panic!("no panorama expected"));
        handle.join().unwrap();
        assert_eq!(delivered, 0);
    }
}
