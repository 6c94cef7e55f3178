//! Bounded, time-windowed queues of composite states.
//!
//! [`HistoryQueue`] feeds velocity estimation, [`SmoothingQueue`] feeds the
//! moving average applied to reported scale, rotation and expansion.

use kurbo::Point;
use std::collections::VecDeque;
use std::f64::consts::TAU;

use crate::events::ManipulationVelocities;
use crate::geometry::TICKS_PER_MS;

pub const HISTORY_MAX_COUNT: usize = 5;
pub const HISTORY_MAX_SPAN_TICKS: i64 = 200 * TICKS_PER_MS as i64;
/// Consecutive stop marks tolerated before the history is dropped.
pub const HISTORY_STOP_MARK_LIMIT: usize = 5;

pub const SMOOTHING_MAX_COUNT: usize = 9;
pub const SMOOTHING_MAX_SPAN_TICKS: i64 = 200 * TICKS_PER_MS as i64;
pub const SMOOTHING_PREFILL_INTERVAL_TICKS: i64 = 15 * TICKS_PER_MS as i64;

/// Aggregate pose at one instant.
///
/// `position` is the cumulative translation since the sequence started, so
/// contacts joining or leaving never show up as motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManipulationState {
    pub position: Point,
    pub scale: f64,
    pub expansion: f64,
    pub orientation: f64,
    pub timestamp: i64,
}

impl ManipulationState {
    pub fn identity(timestamp: i64) -> Self {
        Self {
            position: Point::ORIGIN,
            scale: 1.0,
            expansion: 0.0,
            orientation: 0.0,
            timestamp,
        }
    }

    pub fn at(self, timestamp: i64) -> Self {
        Self { timestamp, ..self }
    }
}

fn age(newest: i64, entry: i64) -> i64 {
    newest.wrapping_sub(entry)
}

#[derive(Debug, Default)]
pub struct HistoryQueue {
    entries: VecDeque<ManipulationState>,
    stop_marks: usize,
}

impl HistoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.stop_marks = 0;
    }

    /// Pushes `state` and evicts by count and age.
    ///
    /// A stop mark records that nothing moved. Once more than
    /// [`HISTORY_STOP_MARK_LIMIT`] of them arrive in a row the queue is
    /// cleared so velocities drop to exactly zero.
    pub fn enqueue(&mut self, state: ManipulationState, stop_mark: bool) {
        if stop_mark {
            self.stop_marks += 1;
            if self.stop_marks > HISTORY_STOP_MARK_LIMIT {
                self.clear();
                return;
            }
        } else {
            self.stop_marks = 0;
        }

        self.entries.push_back(state);
        while self.entries.len() > HISTORY_MAX_COUNT {
            self.entries.pop_front();
        }
        self.trim(state.timestamp);
    }

    /// Drops entries older than the history span relative to `now`.
    pub fn trim(&mut self, now: i64) {
        while let Some(front) = self.entries.front() {
            if age(now, front.timestamp) <= HISTORY_MAX_SPAN_TICKS {
                break;
            }
            self.entries.pop_front();
        }
    }

    /// Weighted moving average of per-millisecond rates.
    ///
    /// The oldest sample only seeds the first delta; later deltas are weighted
    /// 1, 2, .., N so the newest motion dominates.
    pub fn velocities(&self) -> ManipulationVelocities {
        if self.entries.len() < 2 {
            return ManipulationVelocities::ZERO;
        }
        let first_orientation = self.entries[0].orientation;
        let linear_x = self.weighted_rate(|s| s.position.x);
        let linear_y = self.weighted_rate(|s| s.position.y);
        let angular =
            self.weighted_rate(|s| unwrap_orientation(s.orientation, first_orientation));
        let expansion = self.weighted_rate(|s| s.expansion);
        ManipulationVelocities {
            linear_x,
            linear_y,
            angular,
            expansion_x: expansion,
            expansion_y: expansion,
        }
    }

    fn weighted_rate<F>(&self, value: F) -> f64
    where
        F: Fn(&ManipulationState) -> f64,
    {
        let mut sum = 0.0;
        let mut weights = 0.0;
        let pairs = self.entries.iter().zip(self.entries.iter().skip(1));
        for (i, (prev, cur)) in pairs.enumerate() {
            let dt = age(cur.timestamp, prev.timestamp);
            if dt <= 0 {
                continue;
            }
            let weight = (i + 1) as f64;
            let rate = (value(cur) - value(prev)) / dt as f64 * TICKS_PER_MS;
            if !rate.is_finite() {
                continue;
            }
            sum += weight * rate;
            weights += weight;
        }
        if weights == 0.0 { 0.0 } else { sum / weights }
    }
}

/// Shifts `orientation` by whole turns to the value closest to `reference`.
fn unwrap_orientation(orientation: f64, reference: f64) -> f64 {
    let diff = orientation - reference;
    if !diff.is_finite() {
        return orientation;
    }
    orientation - (diff / TAU).round() * TAU
}

/// Moving averages over the current smoothing window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedValues {
    pub scale: f64,
    pub rotation: f64,
    pub expansion: f64,
}

#[derive(Debug, Default)]
pub struct SmoothingQueue {
    entries: VecDeque<ManipulationState>,
}

impl SmoothingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// True when the queue is empty or its newest entry is too old to average
    /// against a sample taken at `now`.
    pub fn needs_prefill(&self, now: i64) -> bool {
        match self.entries.back() {
            None => true,
            Some(newest) => age(now, newest.timestamp) > SMOOTHING_MAX_SPAN_TICKS,
        }
    }

    /// Seeds the queue with copies of `last` at evenly spaced past timestamps,
    /// so the average starts from the last known pose instead of from nothing.
    pub fn prefill(&mut self, last: ManipulationState, now: i64) {
        self.entries.clear();
        for k in (1..SMOOTHING_MAX_COUNT as i64).rev() {
            let ts = now.wrapping_sub(k * SMOOTHING_PREFILL_INTERVAL_TICKS);
            self.entries.push_back(last.at(ts));
        }
    }

    pub fn enqueue(&mut self, state: ManipulationState) {
        self.entries.push_back(state);
        while self.entries.len() > SMOOTHING_MAX_COUNT {
            self.entries.pop_front();
        }
        while let Some(front) = self.entries.front() {
            if age(state.timestamp, front.timestamp) <= SMOOTHING_MAX_SPAN_TICKS {
                break;
            }
            self.entries.pop_front();
        }
    }

    /// Window length in entries for a smoothing level in `[0, 1]`.
    pub fn window_count(level: f64) -> usize {
        (level.clamp(0.0, 1.0) * SMOOTHING_MAX_COUNT as f64).round() as usize
    }

    /// Window span in ticks for a smoothing level in `[0, 1]`.
    pub fn window_span(level: f64) -> i64 {
        (level.clamp(0.0, 1.0) * SMOOTHING_MAX_SPAN_TICKS as f64) as i64
    }

    /// Averages the newest entries inside the window for `level`.
    ///
    /// Returns `None` when fewer than two entries fall inside the window,
    /// meaning no smoothing applies.
    pub fn average(&self, level: f64) -> Option<SmoothedValues> {
        let newest = self.entries.back()?.timestamp;
        let count = Self::window_count(level);
        let span = Self::window_span(level);

        let window: Vec<&ManipulationState> = self
            .entries
            .iter()
            .rev()
            .take(count)
            .take_while(|s| age(newest, s.timestamp) <= span)
            .collect();
        if window.len() < 2 {
            return None;
        }

        let n = window.len() as f64;
        let mean = |f: fn(&ManipulationState) -> f64| window.iter().map(|s| f(s)).sum::<f64>() / n;
        Some(SmoothedValues {
            scale: mean(|s| s.scale),
            rotation: mean(|s| s.orientation),
            expansion: mean(|s| s.expansion),
        })
    }
}
