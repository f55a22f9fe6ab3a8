//! Note density curve drawn along the theater scrub bar
//!
//! The bar is a 100×24 box. Each note raises the curve around its timestamp;
//! longer notes spread wider. Played regions under a note are highlighted.

use crate::types::VideoNote;

pub const SEGMENTS: usize = 30;
pub const BAR_HEIGHT: f64 = 24.0;
const BASE_HEIGHT: f64 = 4.0;
const PEAK_HEIGHT: f64 = 16.0;
const BASE_RADIUS: f64 = 8.0;
const MAX_LENGTH_BONUS: f64 = 15.0;

/// Influence radius in seconds for a note
pub fn note_radius(note: &VideoNote) -> f64 {
    let length_bonus = (note.content.chars().count() as f64 / 20.0).min(MAX_LENGTH_BONUS);
    BASE_RADIUS + length_bonus
}

/// Sampled curve heights, `SEGMENTS + 1` points across the bar
#[derive(Debug, Clone, PartialEq)]
pub struct NoteDensity {
    heights: Vec<f64>,
}

impl NoteDensity {
    /// Flat baseline when the duration is unknown
    pub fn compute(notes: &[VideoNote], duration: f64) -> Self {
        let heights = (0..=SEGMENTS)
            .map(|i| {
                if duration <= 0.0 {
                    return BASE_HEIGHT;
                }
                let time = i as f64 / SEGMENTS as f64 * duration;
                let influence = notes.iter().fold(0.0_f64, |acc, note| {
                    let dist = (time - note.timestamp).abs();
                    let radius = note_radius(note);
                    if dist < radius {
                        acc.max(1.0 - (dist / radius).powi(2))
                    } else {
                        acc
                    }
                });
                BASE_HEIGHT + influence * PEAK_HEIGHT
            })
            .collect();
        Self { heights }
    }

    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    /// Linear interpolation at a bar percentage
    pub fn height_at(&self, pct: f64) -> f64 {
        let idx = pct.clamp(0.0, 100.0) / 100.0 * SEGMENTS as f64;
        let lo = idx.floor() as usize;
        let hi = (lo + 1).min(SEGMENTS);
        let t = idx - lo as f64;
        self.heights[lo] * (1.0 - t) + self.heights[hi] * t
    }

    /// Closed SVG path of the curve between two bar percentages
    pub fn path(&self, start_x: f64, end_x: f64) -> String {
        if start_x >= end_x {
            return String::new();
        }
        let y_at = |x: f64| BAR_HEIGHT - self.height_at(x);
        let seg_x = |i: usize| i as f64 / SEGMENTS as f64 * 100.0;
        let start_y = y_at(start_x);
        let end_y = y_at(end_x);

        let mut points = vec![format!("M {} {} L {} {}", start_x, BAR_HEIGHT, start_x, start_y)];
        let start_idx = (start_x / 100.0 * SEGMENTS as f64).ceil() as usize;
        let end_idx = (end_x / 100.0 * SEGMENTS as f64).floor() as usize;

        let (mut prev_x, mut prev_y) = (start_x, start_y);
        for i in start_idx..=end_idx.min(SEGMENTS) {
            let x = seg_x(i);
            let y = BAR_HEIGHT - self.heights[i];
            let cp = (prev_x + x) / 2.0;
            points.push(format!("C {} {}, {} {}, {} {}", cp, prev_y, cp, y, x, y));
            (prev_x, prev_y) = (x, y);
        }
        let cp = (prev_x + end_x) / 2.0;
        points.push(format!("C {} {}, {} {}, {} {}", cp, prev_y, cp, end_y, end_x, end_y));
        points.push(format!("L {} {} Z", end_x, BAR_HEIGHT));
        points.join(" ")
    }
}

/// Played parts of note ranges, as `(start, end)` bar percentages
pub fn highlight_zones(notes: &[VideoNote], duration: f64, progress_pct: f64) -> Vec<(f64, f64)> {
    if duration <= 0.0 {
        return Vec::new();
    }
    notes
        .iter()
        .filter_map(|note| {
            let center = note.timestamp / duration * 100.0;
            let radius = note_radius(note) / duration * 100.0;
            let start = (center - radius).max(0.0);
            let end = (center + radius).min(100.0).min(progress_pct);
            (start < end).then_some((start, end))
        })
        .collect()
}
