//! Visual regression testing with screenshot comparison

use std::path::{Path, PathBuf};

use image::{GenericImageView, Pixel, RgbaImage};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};

/// Per-channel difference below this is treated as equal; it absorbs
/// anti-aliasing and encoder wobble between runs.
const CHANNEL_TOLERANCE: i32 = 5;

/// Result of a visual comparison
#[derive(Debug, Clone)]
pub struct VisualDiff {
    /// Whether the images match (within threshold)
    pub matches: bool,

    /// Percentage of pixels that differ
    pub diff_percent: f64,

    /// Number of differing pixels
    pub diff_pixels: u64,

    /// Total pixels compared
    pub total_pixels: u64,

    /// Path to the diff image (if one was written)
    pub diff_image_path: Option<PathBuf>,

    /// Hash of the actual screenshot
    pub actual_hash: String,

    /// Hash of the baseline screenshot
    pub baseline_hash: String,
}

/// Compares screenshots against stored baselines
pub struct VisualTester {
    baseline_dir: PathBuf,
    actual_dir: PathBuf,
    diff_dir: PathBuf,
    threshold: f64,
    auto_update: bool,
}

impl VisualTester {
    pub fn new(config: VisualConfig) -> E2eResult<Self> {
        std::fs::create_dir_all(&config.baseline_dir)?;
        std::fs::create_dir_all(&config.actual_dir)?;
        std::fs::create_dir_all(&config.diff_dir)?;

        Ok(Self {
            baseline_dir: config.baseline_dir,
            actual_dir: config.actual_dir,
            diff_dir: config.diff_dir,
            threshold: config.threshold,
            auto_update: config.auto_update,
        })
    }

    /// Compare a screenshot against its baseline
    pub fn compare(&self, name: &str, threshold: Option<f64>) -> E2eResult<VisualDiff> {
        let threshold = threshold.unwrap_or(self.threshold);

        let actual_path = self.actual_dir.join(format!("{}.png", name));
        let baseline_path = self.baseline_dir.join(format!("{}.png", name));

        if !actual_path.exists() {
            return Err(E2eError::VisualRegression(format!(
                "Actual screenshot not found: {}",
                actual_path.display()
            )));
        }

        if !baseline_path.exists() {
            if self.auto_update {
                info!("Creating baseline for '{}' (auto-update enabled)", name);
                std::fs::copy(&actual_path, &baseline_path)?;

                let hash = hash_file(&actual_path)?;
                return Ok(VisualDiff {
                    matches: true,
                    diff_percent: 0.0,
                    diff_pixels: 0,
                    total_pixels: 0,
                    diff_image_path: None,
                    actual_hash: hash.clone(),
                    baseline_hash: hash,
                });
            }
            return Err(E2eError::BaselineNotFound(
                baseline_path.to_string_lossy().to_string(),
            ));
        }

        let actual_hash = hash_file(&actual_path)?;
        let baseline_hash = hash_file(&baseline_path)?;

        // Identical files need no pixel walk
        if actual_hash == baseline_hash {
            debug!("Screenshots for '{}' match exactly", name);
            let img = image::open(&actual_path)?;
            let (w, h) = img.dimensions();
            return Ok(VisualDiff {
                matches: true,
                diff_percent: 0.0,
                diff_pixels: 0,
                total_pixels: u64::from(w) * u64::from(h),
                diff_image_path: None,
                actual_hash,
                baseline_hash,
            });
        }

        let actual = image::open(&actual_path)?.to_rgba8();
        let baseline = image::open(&baseline_path)?.to_rgba8();

        let outcome = diff_images(&actual, &baseline);

        let diff_image_path = if outcome.diff_pixels > 0 {
            let path = self.diff_dir.join(format!("{}-diff.png", name));
            outcome.diff_image.save(&path)?;
            Some(path)
        } else {
            None
        };

        let matches = outcome.diff_percent() <= threshold;
        if !matches {
            warn!(
                "Visual regression in '{}': {:.2}% pixels differ (threshold: {:.2}%)",
                name,
                outcome.diff_percent(),
                threshold
            );
        }

        Ok(VisualDiff {
            matches,
            diff_percent: outcome.diff_percent(),
            diff_pixels: outcome.diff_pixels,
            total_pixels: outcome.total_pixels,
            diff_image_path,
            actual_hash,
            baseline_hash,
        })
    }

    /// Promote the actual screenshot to be the new baseline
    pub fn update_baseline(&self, name: &str) -> E2eResult<()> {
        let actual_path = self.actual_dir.join(format!("{}.png", name));
        let baseline_path = self.baseline_dir.join(format!("{}.png", name));

        if !actual_path.exists() {
            return Err(E2eError::VisualRegression(format!(
                "Cannot update baseline: actual screenshot not found: {}",
                actual_path.display()
            )));
        }

        std::fs::copy(&actual_path, &baseline_path)?;
        info!("Updated baseline for '{}'", name);

        Ok(())
    }

    /// List all stored baseline names
    pub fn list_baselines(&self) -> E2eResult<Vec<String>> {
        let mut baselines = Vec::new();

        for entry in std::fs::read_dir(&self.baseline_dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "png").unwrap_or(false) {
                if let Some(name) = path.file_stem() {
                    baselines.push(name.to_string_lossy().to_string());
                }
            }
        }

        baselines.sort();
        Ok(baselines)
    }

    /// Remove stale diff images from previous runs
    pub fn clean_diffs(&self) -> E2eResult<()> {
        for entry in std::fs::read_dir(&self.diff_dir)? {
            std::fs::remove_file(entry?.path())?;
        }
        Ok(())
    }
}

struct DiffOutcome {
    diff_pixels: u64,
    total_pixels: u64,
    diff_image: RgbaImage,
}

impl DiffOutcome {
    fn diff_percent(&self) -> f64 {
        if self.total_pixels == 0 {
            return 0.0;
        }
        (self.diff_pixels as f64 / self.total_pixels as f64) * 100.0
    }
}

/// Pixel-by-pixel comparison over the union of both images. Differing
/// pixels are painted red into the diff image, matching pixels are kept
/// dimmed, and area outside the overlap counts as different.
fn diff_images(actual: &RgbaImage, baseline: &RgbaImage) -> DiffOutcome {
    let width = actual.width().max(baseline.width());
    let height = actual.height().max(baseline.height());

    let mut diff_image = RgbaImage::new(width, height);
    let mut diff_pixels = 0u64;
    let total_pixels = u64::from(width) * u64::from(height);

    for y in 0..height {
        for x in 0..width {
            let a = actual.get_pixel_checked(x, y);
            let b = baseline.get_pixel_checked(x, y);

            match (a, b) {
                (Some(a), Some(b)) if !pixels_differ(a, b) => {
                    let c = a.channels();
                    diff_image.put_pixel(
                        x,
                        y,
                        image::Rgba([c[0] / 2, c[1] / 2, c[2] / 2, 128]),
                    );
                }
                _ => {
                    diff_pixels += 1;
                    diff_image.put_pixel(x, y, image::Rgba([255, 0, 0, 255]));
                }
            }
        }
    }

    DiffOutcome {
        diff_pixels,
        total_pixels,
        diff_image,
    }
}

fn pixels_differ(a: &image::Rgba<u8>, b: &image::Rgba<u8>) -> bool {
    a.channels()
        .iter()
        .zip(b.channels())
        .any(|(&x, &y)| (i32::from(x) - i32::from(y)).abs() > CHANNEL_TOLERANCE)
}

fn hash_file(path: &Path) -> E2eResult<String> {
    let data = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

/// Configuration for visual testing
#[derive(Debug, Clone)]
pub struct VisualConfig {
    pub baseline_dir: PathBuf,
    pub actual_dir: PathBuf,
    pub diff_dir: PathBuf,
    pub threshold: f64,
    pub auto_update: bool,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            baseline_dir: PathBuf::from("test-results/baselines"),
            actual_dir: PathBuf::from("test-results/screenshots"),
            diff_dir: PathBuf::from("test-results/diffs"),
            threshold: 0.5,
            auto_update: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tester(root: &Path, auto_update: bool) -> VisualTester {
        VisualTester::new(VisualConfig {
            baseline_dir: root.join("baselines"),
            actual_dir: root.join("screenshots"),
            diff_dir: root.join("diffs"),
            threshold: 0.5,
            auto_update,
        })
        .unwrap()
    }

    fn write_png(path: &Path, img: &RgbaImage) {
        img.save(path).unwrap();
    }

    fn solid(w: u32, h: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, image::Rgba(rgba))
    }

    #[test]
    fn identical_screenshots_match() {
        let dir = tempfile::tempdir().unwrap();
        let t = tester(dir.path(), false);

        let img = solid(10, 10, [10, 20, 30, 255]);
        write_png(&t.actual_dir.join("shot.png"), &img);
        write_png(&t.baseline_dir.join("shot.png"), &img);

        let diff = t.compare("shot", None).unwrap();
        assert!(diff.matches);
        assert_eq!(diff.diff_pixels, 0);
        assert_eq!(diff.total_pixels, 100);
        assert_eq!(diff.actual_hash, diff.baseline_hash);
    }

    #[test]
    fn changed_region_fails_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let t = tester(dir.path(), false);

        let baseline = solid(10, 10, [0, 0, 0, 255]);
        let mut actual = baseline.clone();
        // 4 of 100 pixels changed well past the tolerance
        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            actual.put_pixel(x, y, image::Rgba([255, 255, 255, 255]));
        }
        write_png(&t.baseline_dir.join("shot.png"), &baseline);
        write_png(&t.actual_dir.join("shot.png"), &actual);

        let diff = t.compare("shot", None).unwrap();
        assert!(!diff.matches);
        assert_eq!(diff.diff_pixels, 4);
        assert!((diff.diff_percent - 4.0).abs() < 1e-9);
        assert!(diff.diff_image_path.as_ref().unwrap().exists());
    }

    #[test]
    fn small_color_shift_is_within_tolerance() {
        let dir = tempfile::tempdir().unwrap();
        let t = tester(dir.path(), false);

        write_png(&t.baseline_dir.join("shot.png"), &solid(8, 8, [100, 100, 100, 255]));
        write_png(&t.actual_dir.join("shot.png"), &solid(8, 8, [103, 99, 102, 255]));

        let diff = t.compare("shot", None).unwrap();
        assert!(diff.matches);
        assert_eq!(diff.diff_pixels, 0);
    }

    #[test]
    fn dimension_mismatch_counts_missing_area() {
        let dir = tempfile::tempdir().unwrap();
        let t = tester(dir.path(), false);

        write_png(&t.baseline_dir.join("shot.png"), &solid(10, 10, [5, 5, 5, 255]));
        write_png(&t.actual_dir.join("shot.png"), &solid(10, 12, [5, 5, 5, 255]));

        let diff = t.compare("shot", None).unwrap();
        assert!(!diff.matches);
        assert_eq!(diff.diff_pixels, 20);
        assert_eq!(diff.total_pixels, 120);
    }

    #[test]
    fn missing_baseline_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let t = tester(dir.path(), false);

        write_png(&t.actual_dir.join("shot.png"), &solid(4, 4, [0, 0, 0, 255]));

        let err = t.compare("shot", None).unwrap_err();
        assert!(matches!(err, E2eError::BaselineNotFound(_)));
    }

    #[test]
    fn auto_update_creates_the_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let t = tester(dir.path(), true);

        write_png(&t.actual_dir.join("shot.png"), &solid(4, 4, [9, 9, 9, 255]));

        let diff = t.compare("shot", None).unwrap();
        assert!(diff.matches);
        assert!(t.baseline_dir.join("shot.png").exists());
        assert_eq!(t.list_baselines().unwrap(), vec!["shot".to_string()]);
    }
}
