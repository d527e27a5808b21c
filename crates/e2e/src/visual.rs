//! Visual regression testing with masked screenshot comparison

use std::path::{Path, PathBuf};

use image::{GenericImageView, Pixel, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::driver::{BoundingBox, Browser};
use crate::error::{E2eError, E2eResult};
use crate::query::Query;
use crate::session::Session;
use crate::shortcuts::Platform;

/// Paint used over masked regions
pub const MASK_COLOR: Rgba<u8> = Rgba([255, 0, 255, 255]);

/// How much difference a comparison tolerates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tolerance {
    /// Absolute number of differing pixels
    MaxDiffPixels(u64),
    /// Differing pixels over total pixels (0.0 - 1.0)
    MaxDiffRatio(f64),
}

impl Tolerance {
    fn allows(&self, diff_pixels: u64, total_pixels: u64) -> bool {
        match *self {
            Tolerance::MaxDiffPixels(max) => diff_pixels <= max,
            Tolerance::MaxDiffRatio(max) => ratio(diff_pixels, total_pixels) <= max,
        }
    }
}

fn ratio(diff_pixels: u64, total_pixels: u64) -> f64 {
    if total_pixels == 0 {
        0.0
    } else {
        diff_pixels as f64 / total_pixels as f64
    }
}

/// A region painted over before comparison
#[derive(Debug, Clone)]
pub enum Mask {
    /// Every element the query matches at capture time
    Region(Query),
    /// A fixed rectangle in page coordinates
    Rect(BoundingBox),
}

/// Result of a visual comparison
#[derive(Debug, Clone)]
pub struct VisualDiff {
    /// Whether the images match (within tolerance)
    pub matches: bool,

    /// Number of different pixels
    pub diff_pixels: u64,

    /// Total pixels compared
    pub total_pixels: u64,

    /// Path to the diff image (if generated)
    pub diff_image_path: Option<PathBuf>,

    /// Hash of the masked actual pixels
    pub actual_hash: String,

    /// Hash of the baseline pixels
    pub baseline_hash: String,
}

impl VisualDiff {
    pub fn diff_ratio(&self) -> f64 {
        ratio(self.diff_pixels, self.total_pixels)
    }
}

/// Configuration for visual testing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualConfig {
    pub baseline_dir: PathBuf,
    pub actual_dir: PathBuf,
    pub diff_dir: PathBuf,
    pub tolerance: Tolerance,
    /// Per-channel difference below which two pixels count as equal
    pub channel_threshold: u8,
    /// Write captures as new baselines instead of comparing
    pub update_baselines: bool,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            baseline_dir: PathBuf::from("baselines"),
            actual_dir: PathBuf::from("test-results/screenshots"),
            diff_dir: PathBuf::from("test-results/diffs"),
            tolerance: Tolerance::MaxDiffRatio(0.001),
            channel_threshold: 5,
            update_baselines: false,
        }
    }
}

/// Baselines are kept apart per engine and platform
pub fn baseline_group(browser: Browser, platform: Platform) -> String {
    format!("{}-{}", browser.as_str(), platform.as_str())
}

/// Paint `rects` over `img`, clipped to its bounds
pub fn apply_masks(img: &mut RgbaImage, rects: &[BoundingBox]) {
    let (width, height) = img.dimensions();
    for rect in rects {
        let x0 = rect.x.floor().max(0.0) as u32;
        let y0 = rect.y.floor().max(0.0) as u32;
        let x1 = ((rect.x + rect.width).ceil().max(0.0) as u32).min(width);
        let y1 = ((rect.y + rect.height).ceil().max(0.0) as u32).min(height);
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, MASK_COLOR);
            }
        }
    }
}

/// SHA-256 over dimensions and raw pixels
pub fn hash_pixels(img: &RgbaImage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(img.width().to_le_bytes());
    hasher.update(img.height().to_le_bytes());
    hasher.update(img.as_raw());
    hex::encode(hasher.finalize())
}

/// Check if two pixels differ by more than `threshold` on any channel
fn pixels_differ(a: &Rgba<u8>, b: &Rgba<u8>, threshold: u8) -> bool {
    a.channels()
        .iter()
        .zip(b.channels())
        .any(|(x, y)| (*x as i32 - *y as i32).unsigned_abs() > threshold as u32)
}

/// Pixel-by-pixel comparison.
///
/// Pixels outside the overlap of differently sized images count as
/// differing, so a size change never passes silently.
pub fn compare_images(
    actual: &RgbaImage,
    expected: &RgbaImage,
    tolerance: Tolerance,
    channel_threshold: u8,
) -> (VisualDiff, RgbaImage) {
    let actual_hash = hash_pixels(actual);
    let baseline_hash = hash_pixels(expected);

    let width = actual.width().max(expected.width());
    let height = actual.height().max(expected.height());
    let total_pixels = width as u64 * height as u64;
    let mut diff_img = RgbaImage::new(width, height);

    if actual_hash == baseline_hash {
        debug!("Screenshots match exactly (same hash)");
        return (
            VisualDiff {
                matches: true,
                diff_pixels: 0,
                total_pixels,
                diff_image_path: None,
                actual_hash,
                baseline_hash,
            },
            diff_img,
        );
    }

    let mut diff_pixels = 0u64;
    for y in 0..height {
        for x in 0..width {
            let differs = if actual.in_bounds(x, y) && expected.in_bounds(x, y) {
                pixels_differ(actual.get_pixel(x, y), expected.get_pixel(x, y), channel_threshold)
            } else {
                true
            };

            if differs {
                diff_pixels += 1;
                // Mark diff pixels in red
                diff_img.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            } else {
                // Keep original but dim it
                let channels = actual.get_pixel(x, y).channels();
                diff_img.put_pixel(
                    x,
                    y,
                    Rgba([channels[0] / 2, channels[1] / 2, channels[2] / 2, 128]),
                );
            }
        }
    }

    (
        VisualDiff {
            matches: tolerance.allows(diff_pixels, total_pixels),
            diff_pixels,
            total_pixels,
            diff_image_path: None,
            actual_hash,
            baseline_hash,
        },
        diff_img,
    )
}

/// Captures, masks and compares screenshots for one (engine, platform) pair
pub struct VisualTester {
    config: VisualConfig,
    group: String,
}

impl VisualTester {
    /// Create a new visual tester
    pub fn new(config: VisualConfig, browser: Browser, platform: Platform) -> E2eResult<Self> {
        let group = baseline_group(browser, platform);
        std::fs::create_dir_all(config.baseline_dir.join(&group))?;
        std::fs::create_dir_all(config.actual_dir.join(&group))?;
        std::fs::create_dir_all(config.diff_dir.join(&group))?;

        Ok(Self { config, group })
    }

    pub fn for_session(session: &Session) -> E2eResult<Self> {
        Self::new(
            session.config().visual.clone(),
            session.browser(),
            session.platform(),
        )
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn baseline_path(&self, name: &str) -> PathBuf {
        self.config
            .baseline_dir
            .join(&self.group)
            .join(format!("{name}.png"))
    }

    pub fn actual_path(&self, name: &str) -> PathBuf {
        self.config
            .actual_dir
            .join(&self.group)
            .join(format!("{name}.png"))
    }

    fn diff_path(&self, name: &str, suffix: &str) -> PathBuf {
        self.config
            .diff_dir
            .join(&self.group)
            .join(format!("{name}-{suffix}.png"))
    }

    /// Screenshot `target` (or the viewport) with `masks` painted over
    pub async fn capture(
        &self,
        session: &Session,
        target: Option<&Query>,
        masks: &[Mask],
    ) -> E2eResult<RgbaImage> {
        let origin = match target {
            Some(query) => {
                let bbox = query.bounding_box().await?;
                (bbox.x, bbox.y)
            }
            None => (0.0, 0.0),
        };

        let png = session
            .driver()
            .screenshot(target.map(|q| q.chain()))
            .await?;
        let mut img = image::load_from_memory(&png)?.to_rgba8();

        let mut rects = Vec::new();
        for mask in masks {
            match mask {
                Mask::Rect(rect) => rects.push(*rect),
                Mask::Region(query) => {
                    let count = query.count().await?;
                    for index in 0..count {
                        let element = if count == 1 {
                            query.clone()
                        } else {
                            query.nth(index as i32)
                        };
                        if element.is_visible().await? {
                            rects.push(element.bounding_box().await?);
                        }
                    }
                }
            }
        }
        let local: Vec<BoundingBox> = rects
            .into_iter()
            .map(|r| BoundingBox {
                x: r.x - origin.0,
                y: r.y - origin.1,
                ..r
            })
            .collect();
        apply_masks(&mut img, &local);
        Ok(img)
    }

    /// Capture and compare against the stored baseline.
    ///
    /// With `update_baselines` set the capture becomes the baseline instead.
    pub async fn assert_matches(
        &self,
        session: &Session,
        name: &str,
        target: Option<&Query>,
        masks: &[Mask],
        tolerance: Option<Tolerance>,
    ) -> E2eResult<VisualDiff> {
        let actual = self.capture(session, target, masks).await?;
        let actual_path = self.actual_path(name);
        actual.save(&actual_path)?;

        if self.config.update_baselines {
            return self.write_baseline(name, &actual);
        }
        self.compare(name, &actual, tolerance)
    }

    /// Compare an already captured image against its baseline
    pub fn compare(
        &self,
        name: &str,
        actual: &RgbaImage,
        tolerance: Option<Tolerance>,
    ) -> E2eResult<VisualDiff> {
        let tolerance = tolerance.unwrap_or(self.config.tolerance);
        let baseline_path = self.baseline_path(name);
        if !baseline_path.exists() {
            return Err(E2eError::BaselineNotFound(
                baseline_path.to_string_lossy().to_string(),
            ));
        }

        let expected = image::open(&baseline_path)?.to_rgba8();
        if actual.dimensions() != expected.dimensions() {
            warn!(
                "Screenshot dimensions differ: actual {:?} vs baseline {:?}",
                actual.dimensions(),
                expected.dimensions()
            );
        }

        let (mut diff, diff_img) =
            compare_images(actual, &expected, tolerance, self.config.channel_threshold);
        if diff.matches {
            return Ok(diff);
        }

        let actual_path = self.actual_path(name);
        if !actual_path.exists() {
            actual.save(&actual_path)?;
        }
        let expected_copy = self.diff_path(name, "expected");
        expected.save(&expected_copy)?;
        let diff_path = self.diff_path(name, "diff");
        diff_img.save(&diff_path)?;
        diff.diff_image_path = Some(diff_path.clone());

        warn!(
            "Visual regression detected in '{}': {} pixels differ ({:.4})",
            name,
            diff.diff_pixels,
            diff.diff_ratio()
        );
        Err(E2eError::VisualMismatch {
            name: name.to_string(),
            diff_pixels: diff.diff_pixels,
            diff_ratio: diff.diff_ratio(),
            actual: actual_path,
            expected: expected_copy,
            diff: diff_path,
        })
    }

    fn write_baseline(&self, name: &str, img: &RgbaImage) -> E2eResult<VisualDiff> {
        let path = self.baseline_path(name);
        img.save(&path)?;
        info!("Wrote baseline {}", path.display());
        let hash = hash_pixels(img);
        Ok(VisualDiff {
            matches: true,
            diff_pixels: 0,
            total_pixels: img.width() as u64 * img.height() as u64,
            diff_image_path: None,
            actual_hash: hash.clone(),
            baseline_hash: hash,
        })
    }

    /// Update the baseline with the last actual screenshot
    pub fn update_baseline(&self, name: &str) -> E2eResult<()> {
        let actual_path = self.actual_path(name);
        if !actual_path.exists() {
            return Err(E2eError::BaselineNotFound(format!(
                "cannot update baseline, no capture at {}",
                actual_path.display()
            )));
        }

        std::fs::copy(&actual_path, self.baseline_path(name))?;
        info!("Updated baseline for '{}' ({})", name, self.group);
        Ok(())
    }

    /// Promote every capture of this group to a baseline
    pub fn update_all(&self) -> E2eResult<usize> {
        let mut updated = 0;
        for name in png_stems(&self.config.actual_dir.join(&self.group))? {
            self.update_baseline(&name)?;
            updated += 1;
        }
        Ok(updated)
    }

    /// List all baselines of this group
    pub fn list_baselines(&self) -> E2eResult<Vec<String>> {
        png_stems(&self.config.baseline_dir.join(&self.group))
    }

    /// Clean up old diff images
    pub fn clean_diffs(&self) -> E2eResult<()> {
        for entry in std::fs::read_dir(self.config.diff_dir.join(&self.group))? {
            let entry = entry?;
            std::fs::remove_file(entry.path())?;
        }
        Ok(())
    }
}

/// Every baseline across all groups, as `group/name`
pub fn list_all_baselines(baseline_dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = walkdir::WalkDir::new(baseline_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|ext| ext == "png").unwrap_or(false))
        .filter_map(|e| {
            e.path()
                .strip_prefix(baseline_dir)
                .ok()
                .map(|p| p.with_extension("").to_string_lossy().replace('\\', "/"))
        })
        .collect();
    names.sort();
    names
}

fn png_stems(dir: &Path) -> E2eResult<Vec<String>> {
    let mut names = Vec::new();
    if !dir.exists() {
        return Ok(names);
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map(|e| e == "png").unwrap_or(false) {
            if let Some(name) = path.file_stem() {
                names.push(name.to_string_lossy().to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}
