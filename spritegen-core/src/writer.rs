use std::io::{BufWriter, Write};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use image::{DynamicImage, ImageFormat};
use tracing::debug;

use crate::{Result, SpriteError};

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Writes the finished sprite, inferring the raster format from the path.
#[derive(Debug, Clone)]
pub struct ImageWriter {
    path: PathBuf,
    format: ImageFormat,
}

impl ImageWriter {
    /// Fails for extensions `image` cannot encode and for missing parent
    /// directories, so a bad path is reported before the model is loaded.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = ImageFormat::from_path(&path).map_err(|e| SpriteError::output(&path, e))?;
        if !format.writing_enabled() {
            return Err(SpriteError::output(
                &path,
                anyhow!("writing {format:?} images is not supported"),
            ));
        }
        let dir = parent_dir(&path);
        if !dir.is_dir() {
            return Err(SpriteError::output(
                &path,
                anyhow!("directory {} does not exist", dir.display()),
            ));
        }
        Ok(Self { path, format })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Encodes into a temporary file next to the target and renames it into
    /// place, so the output path never holds a partial image.
    pub fn write(&self, image: &DynamicImage) -> Result<()> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(".spritegen-").suffix(".tmp");
        // tempfile defaults to 0600; ask for 0666 so the umask applies as it
        // would for a plain create.
        #[cfg(unix)]
        {
            builder.permissions(std::fs::Permissions::from_mode(0o666));
        }
        let mut tmp = builder
            .tempfile_in(parent_dir(&self.path))
            .map_err(|e| SpriteError::output(&self.path, e))?;

        {
            let mut out = BufWriter::new(tmp.as_file_mut());
            image
                .write_to(&mut out, self.format)
                .map_err(|e| SpriteError::output(&self.path, e))?;
            out.flush().map_err(|e| SpriteError::output(&self.path, e))?;
        }

        // Replacing a file keeps its mode.
        if let Ok(existing) = std::fs::metadata(&self.path) {
            tmp.as_file()
                .set_permissions(existing.permissions())
                .map_err(|e| SpriteError::output(&self.path, e))?;
        }

        debug!("Encoded {:?} image at {}", self.format, tmp.path().display());
        tmp.persist(&self.path)
            .map_err(|e| SpriteError::output(&self.path, e.error))?;
        Ok(())
    }
}
