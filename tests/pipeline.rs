use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use image::{ImageFormat, Rgb, RgbImage};
use lightprobe_rs::light_probe::{
    BracketConfig, BracketedCapture, ExposureFusionEngine, HdrRadianceWriter, ProbeStatus, ProbeTracker,
    ProjectorConfig, SharedFrame, SphereProjector, StillFrameSource, StopFlag, TiffPanoramaWriter, save_panorama,
    save_radiance,
};

fn sphere_frame(color: [u8; 3]) -> RgbImage {
    RgbImage::from_fn(320, 240, |x, y| {
        let dx = x as f32 + 0.5 - 160.0;
        let dy = y as f32 + 0.5 - 120.0;
        if dx.hypot(dy) <= 70.0 { Rgb(color) } else { Rgb([10, 10, 10]) }
    })
}

#[test]
fn test_consistent_bracket_fuses_to_single_radiance() {
    let mut engine = ExposureFusionEngine::default();
    engine.add_exposure(RgbImage::from_pixel(16, 8, Rgb([32; 3])), 1.0).unwrap();
    engine.add_exposure(RgbImage::from_pixel(16, 8, Rgb([64; 3])), 0.0).unwrap();
    engine.add_exposure(RgbImage::from_pixel(16, 8, Rgb([128; 3])), -1.0).unwrap();

    let radiance = engine.compute_radiance().unwrap();
    assert_eq!(radiance.dimensions(), (16, 8));
    assert_eq!(radiance.unreliable_samples(), 0);
    for v in radiance.pixel(7, 3) {
        assert!((v - 64.0 / 127.0).abs() < 1e-4, "radiance = {v}");
    }
    assert!(engine.is_empty());
}

#[test]
fn test_detected_probe_written_as_tiff() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("panorama.tiff");

    let mut projector = SphereProjector::new(ProjectorConfig::default()).unwrap();
    let status = projector.set_probe(&sphere_frame([90, 140, 200]), 50.0, None).unwrap();
    assert_eq!(status, ProbeStatus::Ready);

    let panorama = projector.converted_probe();
    save_panorama(&TiffPanoramaWriter::default(), &panorama, &path).unwrap();

    let mut decoder = tiff::decoder::Decoder::new(std::fs::File::open(&path).unwrap()).unwrap();
    assert_eq!(decoder.dimensions().unwrap(), (512, 256));

    let Rgb(center) = *panorama.get_pixel(256, 128);
    for (got, want) in center.iter().zip([90u8, 140, 200]) {
        assert!(got.abs_diff(want) <= 3, "center = {center:?}");
    }
}

#[test]
fn test_bracket_written_as_hdr() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hdri.hdr");

    let mut source = StillFrameSource::new(RgbImage::from_pixel(12, 9, Rgb([127, 127, 127])));
    let config = BracketConfig::builder().exposure_count(2).flush_frames(0).build().unwrap();
    let mut engine = ExposureFusionEngine::default();
    let shared = SharedFrame::new();

    let radiance = BracketedCapture::new(config).run(&mut source, &mut engine, &shared).unwrap();
    save_radiance(&HdrRadianceWriter, &radiance, &path).unwrap();

    let decoded = image::load(
        std::io::BufReader::new(std::fs::File::open(&path).unwrap()),
        ImageFormat::Hdr,
    )
    .unwrap();
    assert_eq!((decoded.width(), decoded.height()), (12, 9));
    assert_eq!(shared.sequence(), 2);
}

#[test]
fn test_tracker_runs_beside_publisher() {
    let shared = SharedFrame::new();
    let stop = StopFlag::new();
    let received = Arc::new(Mutex::new(Vec::new()));

    let tracker_handle = {
        let shared = shared.clone();
        let stop = stop.clone();
        let received = received.clone();
        thread::spawn(move || {
            let projector = SphereProjector::new(ProjectorConfig::default()).unwrap();
            let mut tracker = ProbeTracker::new(projector, 50.0).with_poll_interval(Duration::from_millis(10));
            tracker.run(&shared, &stop, |panorama| received.lock().unwrap().push(panorama))
        })
    };

    shared.publish(sphere_frame([200, 200, 200]));

    let deadline = Instant::now() + Duration::from_secs(30);
    while received.lock().unwrap().is_empty() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    stop.stop();
    let delivered = tracker_handle.join().unwrap();

    assert_eq!(delivered, 1);
    let received = received.lock().unwrap();
    assert_eq!(received[0].dimensions(), (512, 256));
}
