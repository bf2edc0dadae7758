//! Writes a figure so that the target path either holds a complete PNG or
//! is left untouched.

use crate::draw::Area;
use chla_obs::{ChlaError, Result};
use log::{debug, info};
use plotters::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Pixel size of a figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub const SINGLE: Canvas = Canvas {
        width: 1800,
        height: 1200,
    };

    /// Room for `rows x cols` panels.
    pub fn grid(rows: u32, cols: u32) -> Canvas {
        Canvas {
            width: 900 * cols.max(1),
            height: 700 * rows.max(1),
        }
    }
}

/// Removes the partially written file unless it was committed.
struct PendingFile {
    path: PathBuf,
    committed: bool,
}

impl PendingFile {
    /// A hidden sibling of `target`; `partial_name` maps the target's file
    /// stem and name to the temporary file name.
    fn beside(target: &Path, partial_name: impl Fn(&str, &str) -> String) -> Result<PendingFile> {
        let dir = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| write_failure(target, e))?;
        let (Some(stem), Some(name)) = (
            target.file_stem().and_then(|s| s.to_str()),
            target.file_name().and_then(|s| s.to_str()),
        ) else {
            return Err(write_failure(target, "output path has no file name"));
        };
        Ok(PendingFile {
            path: dir.join(partial_name(stem, name)),
            committed: false,
        })
    }

    fn commit(mut self, target: &Path) -> Result<PathBuf> {
        fs::rename(&self.path, target).map_err(|e| write_failure(target, e))?;
        self.committed = true;
        info!("wrote {}", target.display());
        Ok(target.to_path_buf())
    }
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        if !self.committed && self.path.exists() {
            debug!("removing partial output {}", self.path.display());
            let _ = fs::remove_file(&self.path);
        }
    }
}

fn write_failure(target: &Path, reason: impl ToString) -> ChlaError {
    ChlaError::OutputWriteFailure {
        path: target.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Renders `draw` onto a white canvas and moves the PNG to `target`.
///
/// The image is rendered next to the target and renamed into place, so a
/// failure while drawing or encoding never leaves a truncated file at
/// `target`.
pub fn write_png<F>(target: &Path, canvas: Canvas, draw: F) -> Result<PathBuf>
where
    F: FnOnce(&Area<'_>) -> anyhow::Result<()>,
{
    // the bitmap encoder picks the format from the extension
    let pending = PendingFile::beside(target, |stem, _| format!(".{stem}.partial.png"))?;
    render(&pending.path, canvas, draw).map_err(|e| write_failure(target, format!("{e:#}")))?;
    pending.commit(target)
}

/// Replaces `target` with `bytes` through the same temporary-file rename.
pub fn write_bytes(target: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let pending = PendingFile::beside(target, |_, name| format!(".{name}.partial"))?;
    fs::write(&pending.path, bytes).map_err(|e| write_failure(target, e))?;
    pending.commit(target)
}

fn render<F>(path: &Path, canvas: Canvas, draw: F) -> anyhow::Result<()>
where
    F: FnOnce(&Area<'_>) -> anyhow::Result<()>,
{
    let root = BitMapBackend::new(path, (canvas.width, canvas.height)).into_drawing_area();
    root.fill(&WHITE)?;
    draw(&root)?;
    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::{line, Frame};
    use crate::palette::CHLA_RED;

    fn small() -> Canvas {
        Canvas {
            width: 120,
            height: 80,
        }
    }

    #[test]
    fn test_write_png_success() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("figures").join("ok.png");
        let written = write_png(&target, small(), |area| {
            let mut chart = Frame::new(0.0..10.0, 0.0..5.0).build(area)?;
            line(&mut chart, &[(0.0, 0.0), (10.0, 5.0)], &CHLA_RED, 2)
        })
        .unwrap();
        assert_eq!(written, target);
        let bytes = fs::read(&target).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
        let leftovers: Vec<_> = fs::read_dir(target.parent().unwrap()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_write_png_failure_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("broken.png");
        let err = write_png(&target, small(), |_| Err(anyhow::anyhow!("no data to draw"))).unwrap_err();
        assert_eq!(err.kind(), "OutputWriteFailure");
        assert!(err.to_string().contains("no data to draw"));
        assert!(!target.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_write_bytes_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("tables").join("t.csv");
        write_bytes(&target, b"a,b\n1,2\n").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "a,b\n1,2\n");
        assert_eq!(fs::read_dir(target.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_png_failure_keeps_previous_figure() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("kept.png");
        fs::write(&target, b"previous").unwrap();
        assert!(write_png(&target, small(), |_| Err(anyhow::anyhow!("boom"))).is_err());
        assert_eq!(fs::read(&target).unwrap(), b"previous");
    }
}
