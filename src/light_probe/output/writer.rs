use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::RgbImage;
use tracing::info;

use crate::light_probe::common::error::{ProbeError, Result};
use crate::light_probe::fusion::RadianceImage;

pub trait PanoramaWriter {
    fn write_panorama(&self, panorama: &RgbImage, output: &mut dyn Write) -> Result<()>;
}

pub trait RadianceWriter {
    fn write_radiance(&self, radiance: &RadianceImage, output: &mut dyn Write) -> Result<()>;
}

fn write_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let output_error = |e: std::io::Error| ProbeError::OutputWriteError(format!("{}: {e}", path.display()));

    let file = File::create(path).map_err(output_error)?;
    let mut out = BufWriter::new(file);
    write(&mut out).map_err(|e| match e {
        ProbeError::IoError(e) => output_error(e),
        other => other,
    })?;
    out.flush().map_err(output_error)?;
    Ok(())
}

/// Writes `panorama` to the file at `path`, replacing it.
pub fn save_panorama<W, P>(writer: &W, panorama: &RgbImage, path: P) -> Result<()>
where
    W: PanoramaWriter + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    write_file(path, |out| writer.write_panorama(panorama, out))?;
    info!("Panorama written to {}", path.display());
    Ok(())
}

/// Writes `radiance` to the file at `path`, replacing it.
pub fn save_radiance<W, P>(writer: &W, radiance: &RadianceImage, path: P) -> Result<()>
where
    W: RadianceWriter + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    write_file(path, |out| writer.write_radiance(radiance, out))?;
    info!("Radiance image written to {}", path.display());
    Ok(())
}
