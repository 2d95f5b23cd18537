//! Print-size suitability thresholds.
//!
//! Each size maps to the minimum pixel dimensions needed for an acceptable
//! print at 300 DPI. Comparison is against raw stored width and height, so
//! a landscape capture can fail a portrait-oriented size even when it has
//! the pixels to print rotated; the gallery UI offers rotation separately.

use serde::Serialize;

/// Minimum pixel dimensions for one supported print size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrintSizeThreshold {
    /// Size label as used by the order flow, e.g. "8x10"
    pub size: &'static str,
    pub min_width: i32,
    pub min_height: i32,
}

/// Supported sizes, smallest first. 300 DPI times the physical inches.
pub const PRINT_SIZES: &[PrintSizeThreshold] = &[
    PrintSizeThreshold { size: "4x6", min_width: 1200, min_height: 1800 },
    PrintSizeThreshold { size: "5x7", min_width: 1500, min_height: 2100 },
    PrintSizeThreshold { size: "8x10", min_width: 2400, min_height: 3000 },
    PrintSizeThreshold { size: "11x14", min_width: 3300, min_height: 4200 },
    PrintSizeThreshold { size: "16x20", min_width: 4800, min_height: 6000 },
];

/// Smallest supported size; the fallback for unrecognized labels
pub const FALLBACK_SIZE: &str = "4x6";

/// Resolve a size label to its threshold. Unrecognized labels resolve to
/// the 4x6 threshold rather than an error, matching the order flow's
/// lenient handling of legacy size names.
pub fn resolve(size: &str) -> PrintSizeThreshold {
    PRINT_SIZES
        .iter()
        .find(|t| t.size == size)
        .copied()
        .unwrap_or_else(|| resolve(FALLBACK_SIZE))
}

/// Whether a photo's raw dimensions meet the threshold for `size`
pub fn meets(size: &str, width: i32, height: i32) -> bool {
    let threshold = resolve(size);
    width >= threshold.min_width && height >= threshold.min_height
}
