//! Per-tag track with a bounded position trail

use crate::core::{Point3, DEFAULT_TRAIL_LENGTH};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Golden ratio conjugate, spreads successive hues evenly around the wheel
const HUE_STEP: f64 = 0.618_033_988_749_895;
const COLOR_SATURATION: f64 = 0.8;
const COLOR_VALUE: f64 = 0.8;

/// Display color in linear RGB, each channel in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl TrackColor {
    /// Color for the n-th tag seen in a session
    pub fn for_index(index: usize) -> Self {
        let hue = (index as f64 * HUE_STEP).fract();
        Self::from_hsv(hue, COLOR_SATURATION, COLOR_VALUE)
    }

    /// HSV to RGB with hue in [0, 1)
    pub fn from_hsv(hue: f64, saturation: f64, value: f64) -> Self {
        if saturation <= 0.0 {
            return Self { r: value, g: value, b: value };
        }

        let h = (hue.rem_euclid(1.0)) * 6.0;
        let sector = h.floor();
        let f = h - sector;
        let p = value * (1.0 - saturation);
        let q = value * (1.0 - saturation * f);
        let t = value * (1.0 - saturation * (1.0 - f));

        let (r, g, b) = match sector as u8 % 6 {
            0 => (value, t, p),
            1 => (q, value, p),
            2 => (p, value, t),
            3 => (p, q, value),
            4 => (t, p, value),
            _ => (value, p, q),
        };
        Self { r, g, b }
    }
}

/// Read-only view of a track handed to renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub tag_id: String,
    pub color: TrackColor,
    pub latest_position: Option<Point3>,
    /// Oldest first
    pub trail: Vec<Point3>,
}

/// Mutable per-tag state, owned by the track manager
#[derive(Debug, Clone)]
pub struct Track {
    color: TrackColor,
    trail: VecDeque<Point3>,
    max_len: usize,
}

impl Track {
    pub fn new(color: TrackColor, max_len: usize) -> Self {
        Self {
            color,
            trail: VecDeque::with_capacity(max_len.min(DEFAULT_TRAIL_LENGTH).saturating_add(1)),
            max_len,
        }
    }

    /// Append a position, evicting the oldest beyond the trail bound
    pub fn push(&mut self, position: Point3) {
        self.trail.push_back(position);
        while self.trail.len() > self.max_len {
            self.trail.pop_front();
        }
    }

    pub fn color(&self) -> TrackColor {
        self.color
    }

    pub fn latest(&self) -> Option<Point3> {
        self.trail.back().copied()
    }

    pub fn len(&self) -> usize {
        self.trail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trail.is_empty()
    }

    pub fn trail(&self) -> impl Iterator<Item = &Point3> {
        self.trail.iter()
    }

    pub fn snapshot(&self, tag_id: &str) -> TrackSnapshot {
        TrackSnapshot {
            tag_id: tag_id.to_string(),
            color: self.color,
            latest_position: self.latest(),
            trail: self.trail.iter().copied().collect(),
        }
    }
}
