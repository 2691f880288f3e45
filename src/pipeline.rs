use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info};

use crate::adjust::Adjustment;
use crate::codec::{ImageCodec, RasterCodec};
use crate::config::Config;
use crate::engine::{BoundedParallelMap, PassReport};
use crate::error::{Error, Result};
use crate::grid::PixelGrid;
use crate::probe::resolve_budget;

/// Applies the adjustment to `grid` in place with one bounded parallel pass.
/// The budget is resolved from the configured probe on every call.
pub fn adjust_grid(
    grid: &mut PixelGrid,
    adjustment: Adjustment,
    config: &Config,
) -> Result<PassReport> {
    let transform = adjustment.brightness()?;

    let now = Instant::now();
    let probe = config.probe();
    let budget = resolve_budget(probe.as_ref(), config.probe_policy())?;
    let engine = BoundedParallelMap::with_options(budget, config.engine_options())?;
    info!("budget execution time: {:.2?}", now.elapsed());
    debug!(
        "concurrency budget {} from {} probe, {} workers",
        budget.get(),
        probe.name(),
        engine.workers()
    );

    let report = engine.apply(grid, &transform);
    info!(
        "brightness x{} execution time: {:.2?} ({} pixels, peak {} in flight)",
        transform.factor(),
        report.elapsed,
        report.pixels,
        report.peak_in_flight
    );
    Ok(report)
}

pub fn decode_file(codec: &dyn ImageCodec, path: &Path) -> Result<PixelGrid> {
    let now = Instant::now();
    let bytes = fs::read(path).map_err(|source| Error::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;
    let grid = codec.decode(&bytes).map_err(Error::Decode)?;
    let (width, height) = grid.dimensions();
    info!("decode file: {:.2?} ({}x{})", now.elapsed(), width, height);
    Ok(grid)
}

/// Writes through a temporary sibling so a failed write never leaves a
/// partial file at `path`.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !dir.is_dir() {
        return Err(Error::OutputDirMissing(dir));
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".partial");
    let tmp = PathBuf::from(tmp);
    let write_error = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Err(err) = fs::write(&tmp, bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(write_error(err));
    }
    fs::rename(&tmp, path).map_err(|err| {
        let _ = fs::remove_file(&tmp);
        write_error(err)
    })
}

/// Full run: read `input`, adjust, encode and write to the configured output.
/// Returns the path that was written.
pub fn run_adjustment(input: &Path, adjustment: Adjustment, config: &Config) -> Result<PathBuf> {
    let total = Instant::now();
    info!("adjustment type = {}", adjustment.kind);
    info!("adjustment amount = {}%", adjustment.percent);
    info!("image = {}", input.display());

    // reject unsupported adjustments before doing any I/O
    adjustment.brightness()?;

    let output_path = config.output_path();
    if let Some(dir) = output_path.parent() {
        if !dir.as_os_str().is_empty() && !dir.is_dir() {
            return Err(Error::OutputDirMissing(dir.to_path_buf()));
        }
    }

    let codec = RasterCodec::new(config.output.format);
    let mut grid = decode_file(&codec, input)?;
    adjust_grid(&mut grid, adjustment, config)?;

    let now = Instant::now();
    let bytes = codec.encode(&grid).map_err(Error::Encode)?;
    write_output(&output_path, &bytes)?;
    info!("{} save: {:.2?}", output_path.display(), now.elapsed());
    info!("total time: {:.2?}", total.elapsed());
    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjust::AdjustKind;

    fn fixed_budget(limit: usize) -> Config {
        let mut config = Config::default();
        config.budget.limit = Some(limit);
        config
    }

    #[test]
    fn two_pixel_brightness_pass() {
        let mut grid =
            PixelGrid::from_rows(vec![vec![[200, 200, 200, 255], [10, 10, 10, 255]]]).unwrap();
        let report = adjust_grid(
            &mut grid,
            Adjustment::new(AdjustKind::Brightness, 25),
            &fixed_budget(4),
        )
        .unwrap();
        assert_eq!(report.pixels, 2);
        assert_eq!(
            grid,
            PixelGrid::from_rows(vec![vec![[250, 250, 250, 255], [12, 12, 12, 255]]]).unwrap()
        );
    }

    #[test]
    fn zero_budget_fails_before_the_pass() {
        let mut grid = PixelGrid::from_rows(vec![vec![[1, 2, 3, 4]]]).unwrap();
        let result = adjust_grid(
            &mut grid,
            Adjustment::new(AdjustKind::Brightness, 25),
            &fixed_budget(0),
        );
        assert!(matches!(result, Err(Error::InvalidBudget(_))));
        assert_eq!(grid.get(0, 0).unwrap(), [1, 2, 3, 4]);
    }

    #[test]
    fn contrast_is_rejected_before_reading_input() {
        let result = run_adjustment(
            Path::new("/nonexistent/input.png"),
            Adjustment::new(AdjustKind::Contrast, 25),
            &fixed_budget(4),
        );
        assert!(matches!(result, Err(Error::Unimplemented(_))));
    }

    #[test]
    fn write_output_needs_existing_dir() {
        let result = write_output(Path::new("/nonexistent/dir/out.png"), b"bytes");
        assert!(matches!(result, Err(Error::OutputDirMissing(_))));
    }
}
