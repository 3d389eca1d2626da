use std::path::Path;

use anyhow::{Context, Result};
use lightprobe_rs::light_probe::{
    BracketConfig, ExposureFusionEngine, ExposureSettings, FrameSource, FusionConfig, HdrRadianceWriter,
    ProbeStatus, ProjectorConfig, SphereObservation, SphereProjector, StillFrameSource, TiffPanoramaWriter,
    save_panorama, save_radiance,
};
use lightprobe_rs::logger;

use tracing::{info, warn};

const CAPTURE_PATH: &str = "capture.png";
const PANORAMA_PATH: &str = "panorama.tiff";
const HDRI_PATH: &str = "hdri.hdr";

/// Lens field of view of the probe rig, in degrees
const PROBE_FOV: f32 = 52.8;

fn convert_probe() -> Result<()> {
    let mut source = StillFrameSource::open(CAPTURE_PATH)?;
    let frame = source.capture(&ExposureSettings::default().with_shutter_speed(15.0))?;

    let config = ProjectorConfig::builder().sphere_diameter_mm(50.8).build()?;
    let mut projector = SphereProjector::new(config)?;

    // Sphere position on the probe rig
    let sphere = SphereObservation::new(634.0, 444.0, 260.0);
    if projector.set_probe(&frame, PROBE_FOV, Some(sphere))? == ProbeStatus::NoSphere {
        warn!("No sphere in {}, writing a placeholder", CAPTURE_PATH);
    }

    let panorama = projector.converted_probe();
    save_panorama(&TiffPanoramaWriter::default(), &panorama, PANORAMA_PATH)?;
    Ok(())
}

fn fuse_brackets() -> Result<()> {
    let bracket = BracketConfig::default();
    let mut engine = ExposureFusionEngine::new(FusionConfig::default());

    for index in 0.. {
        let path = format!("ldr_{index}.png");
        if !Path::new(&path).exists() {
            break;
        }
        let image = image::open(&path).with_context(|| format!("reading {path}"))?.to_rgb8();
        let ev = bracket.settings_at(index).ev();
        engine.add_exposure(image, ev).with_context(|| format!("adding {path}"))?;
        info!("Added {} at EV {:.2}", path, ev);
    }

    if engine.is_empty() {
        info!("No ldr_<i>.png exposures found, skipping HDR");
        return Ok(());
    }

    let radiance = engine.compute_radiance()?;
    if radiance.unreliable_samples() > 0 {
        warn!("{} samples had no usable exposure", radiance.unreliable_samples());
    }
    save_radiance(&HdrRadianceWriter, &radiance, HDRI_PATH)?;
    Ok(())
}

fn main() -> Result<()> {
    logger::init();

    info!("Starting lightprobe...");

    if Path::new(CAPTURE_PATH).exists() {
        convert_probe().context("light probe conversion failed")?;
    } else {
        info!("{} not found, skipping panorama", CAPTURE_PATH);
    }

    fuse_brackets().context("exposure fusion failed")?;

    Ok(())
}
