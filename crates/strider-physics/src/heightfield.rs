//! Heightfield sample data
//!
//! Height samples are loaded once per source and shared between every
//! collision shape built from them.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult};

/// Where heightfield samples come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum HeightfieldSource {
    /// Greyscale image; luminance maps linearly onto the height range
    #[serde(rename_all = "camelCase")]
    Image {
        path: PathBuf,
        min_height: f32,
        max_height: f32,
    },
    /// Headerless 8-bit or 16-bit little-endian samples, row-major
    #[serde(rename_all = "camelCase")]
    Raw {
        path: PathBuf,
        width: usize,
        height: usize,
        min_height: f32,
        max_height: f32,
    },
}

impl HeightfieldSource {
    fn cache_key(&self) -> SourceKey {
        match self {
            Self::Image { path, min_height, max_height } => {
                SourceKey(path.clone(), 0, 0, min_height.to_bits(), max_height.to_bits())
            }
            Self::Raw { path, width, height, min_height, max_height } => {
                SourceKey(path.clone(), *width, *height, min_height.to_bits(), max_height.to_bits())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SourceKey(PathBuf, usize, usize, u32, u32);

/// Grid of height samples in world units, row-major (rows run along Z)
#[derive(Debug, Clone, PartialEq)]
pub struct HeightfieldData {
    rows: usize,
    cols: usize,
    heights: Vec<f32>,
}

impl HeightfieldData {
    /// Build from already-scaled samples
    pub fn from_samples(rows: usize, cols: usize, heights: Vec<f32>) -> PhysicsResult<Self> {
        if rows < 2 || cols < 2 {
            return Err(PhysicsError::Heightfield(format!(
                "heightfield needs at least 2x2 samples, got {rows}x{cols}"
            )));
        }
        let expected = rows
            .checked_mul(cols)
            .ok_or_else(|| PhysicsError::Heightfield(format!("heightfield of {rows}x{cols} samples is too large")))?;
        if heights.len() != expected {
            return Err(PhysicsError::Heightfield(format!(
                "expected {expected} samples for {rows}x{cols}, got {}",
                heights.len()
            )));
        }
        Ok(Self { rows, cols, heights })
    }

    /// Load from a greyscale image
    pub fn from_image(path: &Path, min_height: f32, max_height: f32) -> PhysicsResult<Self> {
        let image = image::open(path)?.to_luma16();
        let (width, height) = image.dimensions();
        let heights = image
            .pixels()
            .map(|pixel| map_sample(pixel.0[0] as f32 / u16::MAX as f32, min_height, max_height))
            .collect();
        Self::from_samples(height as usize, width as usize, heights)
    }

    /// Load from a raw sample file. Bit depth is inferred from the file size.
    pub fn from_raw(path: &Path, width: usize, height: usize, min_height: f32, max_height: f32) -> PhysicsResult<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_raw_bytes(&bytes, width, height, min_height, max_height)
    }

    /// Decode raw samples already in memory
    pub fn from_raw_bytes(bytes: &[u8], width: usize, height: usize, min_height: f32, max_height: f32) -> PhysicsResult<Self> {
        let count = width
            .checked_mul(height)
            .filter(|count| count.checked_mul(2).is_some())
            .ok_or_else(|| PhysicsError::Heightfield(format!("raw heightfield of {width}x{height} samples is too large")))?;
        let heights = if bytes.len() == count {
            bytes
                .iter()
                .map(|&b| map_sample(b as f32 / u8::MAX as f32, min_height, max_height))
                .collect()
        } else if bytes.len() == count * 2 {
            bytes
                .chunks_exact(2)
                .map(|c| {
                    let v = u16::from_le_bytes([c[0], c[1]]);
                    map_sample(v as f32 / u16::MAX as f32, min_height, max_height)
                })
                .collect()
        } else {
            return Err(PhysicsError::Heightfield(format!(
                "raw data of {} bytes is neither 8-bit nor 16-bit {width}x{height}",
                bytes.len()
            )));
        };
        Self::from_samples(height, width, heights)
    }

    /// Number of rows (Z axis)
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (X axis)
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Sample at a grid coordinate
    pub fn height_at(&self, row: usize, col: usize) -> Option<f32> {
        if row < self.rows && col < self.cols {
            Some(self.heights[row * self.cols + col])
        } else {
            None
        }
    }

    pub(crate) fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Lowest and highest sample
    pub fn height_range(&self) -> (f32, f32) {
        self.heights
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| (lo.min(h), hi.max(h)))
    }
}

fn map_sample(normalized: f32, min_height: f32, max_height: f32) -> f32 {
    min_height + normalized * (max_height - min_height)
}

/// Shares loaded heightfield data by source. Entries die with their last user.
#[derive(Debug, Default)]
pub struct HeightfieldCache {
    entries: AHashMap<SourceKey, Weak<HeightfieldData>>,
}

impl HeightfieldCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch shared data for a source, loading it if nobody holds it
    pub fn load(&mut self, source: &HeightfieldSource) -> PhysicsResult<Arc<HeightfieldData>> {
        let key = source.cache_key();
        if let Some(data) = self.entries.get(&key).and_then(Weak::upgrade) {
            return Ok(data);
        }

        let data = Arc::new(match source {
            HeightfieldSource::Image { path, min_height, max_height } => {
                HeightfieldData::from_image(path, *min_height, *max_height)?
            }
            HeightfieldSource::Raw { path, width, height, min_height, max_height } => {
                HeightfieldData::from_raw(path, *width, *height, *min_height, *max_height)?
            }
        });
        log::debug!("Loaded {}x{} heightfield from {:?}", data.rows, data.cols, key.0);

        self.entries.retain(|_, weak| weak.strong_count() > 0);
        self.entries.insert(key, Arc::downgrade(&data));
        Ok(data)
    }

    /// Number of sources still alive
    pub fn live_count(&self) -> usize {
        self.entries.values().filter(|weak| weak.strong_count() > 0).count()
    }
}
