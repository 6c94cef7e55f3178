//! Aggregates contact batches into one composite manipulation.
//!
//! A sequence runs from the first contact going down to the last one being
//! lifted. Each batch is diffed against the tracked contacts, the composite
//! origin, rotation, scale and expansion are recomputed, and at most one
//! [`ManipulationEvent`] is returned.

use kurbo::{Point, Vec2};
use log::{debug, trace, warn};

use crate::contacts::{Contact, ContactTracker};
use crate::error::{Result, check_timestamp};
use crate::events::{ManipulationDelta, ManipulationEvent, ManipulationVelocities};
use crate::geometry::{angle_between, centroid, force_finite, wrap_angle};
use crate::queues::{HistoryQueue, ManipulationState, SmoothingQueue};
use crate::settings::{ManipulationSettings, SupportedManipulations};

/// Exponent of the single-contact pivot dampening curve.
const SINGLE_CONTACT_TORQUE_FACTOR: f64 = 4.0;

/// Radius, as a multiple of the minimum scale/rotate radius, beyond which no
/// smoothing is applied.
const SMOOTHING_RADIUS_MULTIPLIER: f64 = 10.0;

/// Floor for the cumulative scale.
const MINIMUM_SCALE: f64 = f64::EPSILON;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    Waiting,
    Manipulating,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Totals {
    translation: Vec2,
    scale: f64,
    rotation: f64,
    expansion: f64,
}

impl Totals {
    const IDENTITY: Self = Self {
        translation: Vec2::ZERO,
        scale: 1.0,
        rotation: 0.0,
        expansion: 0.0,
    };

    fn as_delta(&self) -> ManipulationDelta {
        ManipulationDelta::new(
            self.translation.x,
            self.translation.y,
            self.rotation,
            self.scale,
            self.expansion,
        )
    }

    /// Increment from `prev` to `self`.
    fn since(&self, prev: &Totals) -> ManipulationDelta {
        ManipulationDelta::new(
            force_finite(self.translation.x - prev.translation.x),
            force_finite(self.translation.y - prev.translation.y),
            force_finite(self.rotation - prev.rotation),
            force_finite(self.scale / prev.scale),
            force_finite(self.expansion - prev.expansion),
        )
    }
}

/// Raw increments computed from one batch of moved contacts.
#[derive(Debug, Clone, Copy)]
struct Increment {
    translation: Vec2,
    rotation: f64,
    scale: f64,
    expansion: f64,
    average_radius: f64,
}

#[derive(Debug)]
pub struct ManipulationSequence {
    state: SequenceState,
    contacts: ContactTracker,
    origin: Point,
    cumulative: Totals,
    smoothed: Totals,
    reported: Totals,
    current: ManipulationState,
    history: HistoryQueue,
    smoothing: SmoothingQueue,
    average_radius: f64,
    last_timestamp: Option<i64>,
}

impl Default for ManipulationSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl ManipulationSequence {
    pub fn new() -> Self {
        Self {
            state: SequenceState::Waiting,
            contacts: ContactTracker::new(),
            origin: Point::ORIGIN,
            cumulative: Totals::IDENTITY,
            smoothed: Totals::IDENTITY,
            reported: Totals::IDENTITY,
            current: ManipulationState::identity(0),
            history: HistoryQueue::new(),
            smoothing: SmoothingQueue::new(),
            average_radius: 0.0,
            last_timestamp: None,
        }
    }

    pub fn state(&self) -> SequenceState {
        self.state
    }

    pub fn is_manipulating(&self) -> bool {
        self.state == SequenceState::Manipulating
    }

    pub fn contacts(&self) -> &ContactTracker {
        &self.contacts
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    /// Raw cumulative transform since the sequence started.
    pub fn cumulative(&self) -> ManipulationDelta {
        self.cumulative.as_delta()
    }

    /// Cumulative transform with smoothing applied, as reported in events.
    pub fn smoothed(&self) -> ManipulationDelta {
        self.smoothed.as_delta()
    }

    pub fn cumulative_scale(&self) -> f64 {
        self.cumulative.scale
    }

    pub fn average_radius(&self) -> f64 {
        self.average_radius
    }

    pub fn velocities(&self) -> ManipulationVelocities {
        self.history.velocities()
    }

    /// Feeds one batch of contacts observed at `timestamp` (100ns ticks).
    ///
    /// An empty batch releases every contact. Returns the event raised by
    /// this batch, if any. On error nothing is changed.
    pub fn process_manipulators(
        &mut self,
        timestamp: i64,
        contacts: &[Contact],
        settings: &ManipulationSettings,
    ) -> Result<Option<ManipulationEvent>> {
        if let Some(previous) = self.last_timestamp {
            check_timestamp(timestamp, previous)?;
        }
        let diff = self.contacts.diff(contacts)?;
        self.last_timestamp = Some(timestamp);

        if diff.is_empty() {
            if self.is_manipulating() && !self.contacts.is_empty() && !self.history.is_empty() {
                return Ok(Some(self.hold(timestamp, settings)));
            }
            return Ok(None);
        }

        if !self.is_manipulating() {
            self.contacts.add(&diff.added);
            return Ok(Some(self.begin(timestamp)));
        }

        if !diff.removed.is_empty() {
            self.contacts.remove(&diff.removed);
            // survivors are measured against their own centroid from here on
            if let Some(origin) = centroid(self.contacts.positions()) {
                self.origin = origin;
                self.contacts.rebase_all(origin);
            }
        }

        if !diff.updated.is_empty() {
            self.contacts.update(&diff.updated);
            self.recalculate(timestamp, settings);
        }

        if !diff.added.is_empty() {
            self.contacts.add(&diff.added);
        }

        if self.contacts.is_empty() {
            return Ok(Some(self.finish(timestamp)));
        }

        if !diff.added.is_empty() || !diff.removed.is_empty() {
            if let Some(origin) = centroid(self.contacts.positions()) {
                self.origin = origin;
            }
            self.contacts.rebase_all(self.origin);
        }

        Ok(Some(self.delta_event(timestamp)))
    }

    /// Forces the running sequence to complete at `timestamp`.
    pub fn complete_manipulation(&mut self, timestamp: i64) -> Result<Option<ManipulationEvent>> {
        if let Some(previous) = self.last_timestamp {
            check_timestamp(timestamp, previous)?;
        }
        self.last_timestamp = Some(timestamp);
        if !self.is_manipulating() {
            return Ok(None);
        }
        Ok(Some(self.finish(timestamp)))
    }

    fn begin(&mut self, timestamp: i64) -> ManipulationEvent {
        self.cumulative = Totals::IDENTITY;
        self.smoothed = Totals::IDENTITY;
        self.reported = Totals::IDENTITY;
        self.average_radius = 0.0;
        self.history.clear();
        self.smoothing.clear();

        self.origin = centroid(self.contacts.positions()).unwrap_or(Point::ORIGIN);
        self.contacts.rebase_all(self.origin);

        self.current = ManipulationState::identity(timestamp);
        self.history.enqueue(self.current, false);
        self.state = SequenceState::Manipulating;

        debug!(
            "manipulation started at ({:.2}, {:.2}) with {} contact(s)",
            self.origin.x,
            self.origin.y,
            self.contacts.len()
        );
        ManipulationEvent::Started {
            origin_x: self.origin.x,
            origin_y: self.origin.y,
        }
    }

    /// Nothing moved: feed a stop mark so the velocity fades out.
    fn hold(&mut self, timestamp: i64, settings: &ManipulationSettings) -> ManipulationEvent {
        let state = self.current.at(timestamp);
        self.history.enqueue(state, true);
        self.update_smoothing(state, settings);
        self.current = state;
        self.delta_event(timestamp)
    }

    fn recalculate(&mut self, timestamp: i64, settings: &ManipulationSettings) {
        let new_origin = centroid(self.contacts.positions()).unwrap_or(self.origin);
        let inc = self.increment(new_origin, settings);

        let c = &mut self.cumulative;
        c.translation = Vec2::new(
            clamp_finite("translation x", c.translation.x + inc.translation.x),
            clamp_finite("translation y", c.translation.y + inc.translation.y),
        );
        c.rotation = clamp_finite("rotation", c.rotation + inc.rotation);
        c.expansion = clamp_finite("expansion", c.expansion + inc.expansion);
        let scale = force_finite(c.scale * inc.scale);
        c.scale = if scale > 0.0 {
            scale
        } else {
            warn!("cumulative scale collapsed to {scale}; clamping to {MINIMUM_SCALE:e}");
            MINIMUM_SCALE
        };
        debug_assert!(c.scale.is_finite() && c.scale > 0.0);

        self.average_radius = inc.average_radius;
        self.origin = new_origin;
        self.contacts.rebase_all(new_origin);

        let state = ManipulationState {
            position: self.cumulative.translation.to_point(),
            scale: self.cumulative.scale,
            expansion: self.cumulative.expansion,
            orientation: self.cumulative.rotation,
            timestamp,
        };
        self.update_smoothing(state, settings);
        self.history.enqueue(state, false);
        self.current = state;
    }

    fn increment(&self, new_origin: Point, settings: &ManipulationSettings) -> Increment {
        let supported = settings.supported();
        let min_radius = settings.minimum_scale_rotate_radius();
        let pinned = settings.is_pinned();
        let pivot = settings.pivot().copied();
        let pivot_pos = pivot.and_then(|p| p.position());

        let mut translation = new_origin - self.origin;
        if !supported.contains(SupportedManipulations::TRANSLATE_X) {
            translation.x = 0.0;
        }
        if !supported.contains(SupportedManipulations::TRANSLATE_Y) {
            translation.y = 0.0;
        }

        let mut inc = Increment {
            translation,
            rotation: 0.0,
            scale: 1.0,
            expansion: 0.0,
            average_radius: 0.0,
        };

        let rotates = supported.contains(SupportedManipulations::ROTATE);
        let scales = supported.contains(SupportedManipulations::SCALE);

        if self.contacts.len() >= 2 && (rotates || scales) {
            let mut angle_sum = 0.0;
            let mut old_length = 0.0;
            let mut new_length = 0.0;
            let mut count = 0usize;

            for s in self.contacts.iter() {
                let old_vec = s.vector_from_origin();
                let new_vec = s.current.position() - new_origin;
                if old_vec.hypot() <= min_radius || new_vec.hypot() <= min_radius {
                    continue;
                }
                let (old_rot, new_rot) = match pivot_pos {
                    Some(p) if pinned => {
                        let old_p = s.anchor() - p;
                        let new_p = s.current.position() - p;
                        if old_p.hypot() <= min_radius || new_p.hypot() <= min_radius {
                            continue;
                        }
                        (old_p, new_p)
                    }
                    _ => (old_vec, new_vec),
                };
                angle_sum += wrap_angle(angle_between(old_rot, new_rot));
                old_length += old_vec.hypot();
                new_length += new_vec.hypot();
                count += 1;
            }

            if count > 0 {
                let n = count as f64;
                if rotates {
                    inc.rotation = angle_sum / n;
                }
                if scales && old_length > 0.0 {
                    inc.scale = new_length / old_length;
                    inc.expansion = (new_length - old_length) / n;
                }
                inc.average_radius = new_length / n;
            }
        } else if self.contacts.len() == 1 && rotates {
            if let (Some(p), Some(s)) = (pivot_pos, self.contacts.iter().next()) {
                let old_vec = s.anchor() - p;
                let new_vec = s.current.position() - p;
                let mut angle = wrap_angle(angle_between(old_vec, new_vec));
                if !pinned {
                    if let Some(radius) = pivot.and_then(|p| p.radius()) {
                        let damping = (old_vec.hypot() / radius)
                            .powf(SINGLE_CONTACT_TORQUE_FACTOR)
                            .min(1.0);
                        angle *= damping;
                    }
                }
                inc.rotation = angle;
            }
        }

        inc
    }

    fn update_smoothing(&mut self, state: ManipulationState, settings: &ManipulationSettings) {
        let level = smoothing_level(
            self.contacts.len(),
            self.average_radius,
            settings.minimum_scale_rotate_radius(),
        );
        if self.smoothing.needs_prefill(state.timestamp) {
            self.smoothing.prefill(self.current, state.timestamp);
        }
        self.smoothing.enqueue(state);

        let avg = self.smoothing.average(level);
        let c = self.cumulative;
        self.smoothed = Totals {
            translation: c.translation,
            scale: avg
                .map(|a| a.scale)
                .filter(|s| s.is_finite() && *s > 0.0)
                .unwrap_or(c.scale),
            rotation: avg
                .map(|a| a.rotation)
                .filter(|r| r.is_finite())
                .unwrap_or(c.rotation),
            expansion: avg
                .map(|a| a.expansion)
                .filter(|e| e.is_finite())
                .unwrap_or(c.expansion),
        };
    }

    fn delta_event(&mut self, timestamp: i64) -> ManipulationEvent {
        self.history.trim(timestamp);
        let velocities = self.history.velocities();
        let delta = self.smoothed.since(&self.reported);
        self.reported = self.smoothed;
        trace!(
            "manipulation delta: t=({:.3}, {:.3}) r={:.4} s={:.4} e={:.3}",
            delta.translation_x, delta.translation_y, delta.rotation, delta.scale_x, delta.expansion_x
        );
        ManipulationEvent::Delta {
            origin_x: self.origin.x,
            origin_y: self.origin.y,
            velocities,
            delta,
            cumulative: self.smoothed.as_delta(),
        }
    }

    fn finish(&mut self, timestamp: i64) -> ManipulationEvent {
        self.history.trim(timestamp);
        let velocities = self.history.velocities();
        let total = self.smoothed.as_delta();

        self.state = SequenceState::Waiting;
        self.contacts.clear();
        self.history.clear();
        self.smoothing.clear();

        debug!(
            "manipulation completed at ({:.2}, {:.2}): translation=({:.2}, {:.2}) rotation={:.4} scale={:.4}",
            self.origin.x, self.origin.y, total.translation_x, total.translation_y, total.rotation, total.scale_x
        );
        ManipulationEvent::Completed {
            origin_x: self.origin.x,
            origin_y: self.origin.y,
            velocities,
            total,
        }
    }
}

/// Smoothing strength in `[0, 1]` for the given contact geometry.
///
/// Small spreads are noisy and get the most smoothing; spreads at or past
/// ten times the minimum radius get none.
pub fn smoothing_level(contact_count: usize, average_radius: f64, min_radius: f64) -> f64 {
    if contact_count < 2 {
        return 0.0;
    }
    let max_radius = min_radius * SMOOTHING_RADIUS_MULTIPLIER;
    if max_radius <= min_radius || average_radius < min_radius || average_radius > max_radius {
        return 0.0;
    }
    1.0 - (average_radius - min_radius) / (max_radius - min_radius)
}

fn clamp_finite(what: &str, value: f64) -> f64 {
    if value.is_infinite() {
        warn!("cumulative {what} overflowed to {value}; clamping to the largest finite value");
    }
    force_finite(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::TICKS_PER_MS;
    use crate::settings::ManipulationPivot;
    use std::f64::consts::PI;

    const MS: i64 = TICKS_PER_MS as i64;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn settings(supported: SupportedManipulations, min_radius: f64) -> ManipulationSettings {
        let mut s = ManipulationSettings::new(supported);
        s.set_minimum_scale_rotate_radius(min_radius).unwrap();
        s
    }

    fn delta_of(e: Option<ManipulationEvent>) -> (ManipulationDelta, ManipulationDelta) {
        match e {
            Some(ManipulationEvent::Delta {
                delta, cumulative, ..
            }) => (delta, cumulative),
            other => panic!("expected delta, got {other:?}"),
        }
    }

    #[test]
    fn first_batch_starts_at_centroid() {
        let mut seq = ManipulationSequence::new();
        let s = ManipulationSettings::default();
        let e = seq
            .process_manipulators(
                0,
                &[Contact::new(1, 0.0, 0.0), Contact::new(2, 10.0, 4.0)],
                &s,
            )
            .unwrap();
        assert_eq!(
            e,
            Some(ManipulationEvent::Started {
                origin_x: 5.0,
                origin_y: 2.0
            })
        );
        assert!(seq.is_manipulating());
    }

    #[test]
    fn empty_batch_while_waiting_is_silent() {
        let mut seq = ManipulationSequence::new();
        let s = ManipulationSettings::default();
        assert_eq!(seq.process_manipulators(0, &[], &s).unwrap(), None);
        assert_eq!(seq.state(), SequenceState::Waiting);
    }

    #[test]
    fn single_contact_translates() {
        let mut seq = ManipulationSequence::new();
        let s = ManipulationSettings::default();
        seq.process_manipulators(0, &[Contact::new(1, 0.0, 0.0)], &s)
            .unwrap();
        let (delta, cumulative) = delta_of(
            seq.process_manipulators(10 * MS, &[Contact::new(1, 5.0, -3.0)], &s)
                .unwrap(),
        );
        assert_eq!(delta.translation_x, 5.0);
        assert_eq!(delta.translation_y, -3.0);
        assert_eq!(delta.rotation, 0.0);
        assert_eq!(delta.scale_x, 1.0);
        assert_eq!(cumulative.translation_x, 5.0);
        assert_eq!(seq.origin(), Point::new(5.0, -3.0));
    }

    #[test]
    fn unsupported_translation_axis_is_zeroed() {
        let mut seq = ManipulationSequence::new();
        let s = settings(SupportedManipulations::TRANSLATE_X, 20.0);
        seq.process_manipulators(0, &[Contact::new(1, 0.0, 0.0)], &s)
            .unwrap();
        let (delta, _) = delta_of(
            seq.process_manipulators(10 * MS, &[Contact::new(1, 5.0, 5.0)], &s)
                .unwrap(),
        );
        assert_eq!(delta.translation_x, 5.0);
        assert_eq!(delta.translation_y, 0.0);
    }

    #[test]
    fn two_contacts_spreading_scale_up() {
        let mut seq = ManipulationSequence::new();
        let s = settings(SupportedManipulations::SCALE, 5.0);
        seq.process_manipulators(
            0,
            &[Contact::new(1, -10.0, 0.0), Contact::new(2, 10.0, 0.0)],
            &s,
        )
        .unwrap();
        seq.process_manipulators(
            10 * MS,
            &[Contact::new(1, -20.0, 0.0), Contact::new(2, 20.0, 0.0)],
            &s,
        )
        .unwrap();
        assert!(close(seq.cumulative_scale(), 2.0));
        let raw = seq.cumulative();
        assert_eq!(raw.rotation, 0.0);
        assert!(close(raw.expansion_x, 10.0));
        assert_eq!(raw.translation_x, 0.0);
    }

    #[test]
    fn two_contacts_rotating_quarter_turn() {
        let mut seq = ManipulationSequence::new();
        let s = settings(SupportedManipulations::ROTATE, 5.0);
        seq.process_manipulators(
            0,
            &[Contact::new(1, -100.0, 0.0), Contact::new(2, 100.0, 0.0)],
            &s,
        )
        .unwrap();
        seq.process_manipulators(
            10 * MS,
            &[Contact::new(1, 0.0, -100.0), Contact::new(2, 0.0, 100.0)],
            &s,
        )
        .unwrap();
        let raw = seq.cumulative();
        assert!(close(raw.rotation, PI / 2.0));
        assert!(close(raw.scale_x, 1.0));
    }

    #[test]
    fn pivot_set_mid_sequence_pins_rotation_to_it() {
        let mut seq = ManipulationSequence::new();
        let mut s = settings(SupportedManipulations::ROTATE, 5.0);
        seq.process_manipulators(
            0,
            &[Contact::new(1, -100.0, 0.0), Contact::new(2, 100.0, 0.0)],
            &s,
        )
        .unwrap();
        s.set_pivot(Some(ManipulationPivot::new(0.0, 0.0, 10.0).unwrap()));
        seq.process_manipulators(
            10 * MS,
            &[Contact::new(1, 0.0, -100.0), Contact::new(2, 0.0, 100.0)],
            &s,
        )
        .unwrap();
        assert!(close(seq.cumulative().rotation, PI / 2.0));
    }

    #[test]
    fn moved_pivot_measures_rotation_from_new_position() {
        let mut seq = ManipulationSequence::new();
        let mut s = settings(SupportedManipulations::ROTATE, 5.0);
        s.set_pivot(Some(ManipulationPivot::new(0.0, 0.0, 10.0).unwrap()));
        seq.process_manipulators(
            0,
            &[Contact::new(1, -100.0, 0.0), Contact::new(2, 100.0, 0.0)],
            &s,
        )
        .unwrap();
        s.set_pivot(Some(ManipulationPivot::new(300.0, 0.0, 10.0).unwrap()));
        seq.process_manipulators(
            10 * MS,
            &[Contact::new(1, -100.0, 1e-4), Contact::new(2, 100.0, 1e-4)],
            &s,
        )
        .unwrap();
        assert!(seq.cumulative().rotation.abs() < 1e-6);
    }

    #[test]
    fn translation_overflow_clamps_to_largest_finite() {
        let mut seq = ManipulationSequence::new();
        let s = ManipulationSettings::default();
        seq.process_manipulators(0, &[Contact::new(1, -1.5e308, 0.0)], &s)
            .unwrap();
        let (_, cumulative) = delta_of(
            seq.process_manipulators(10 * MS, &[Contact::new(1, 1.5e308, 0.0)], &s)
                .unwrap(),
        );
        assert_eq!(cumulative.translation_x, f64::MAX);
        assert_eq!(seq.cumulative().translation_x, f64::MAX);
    }

    #[test]
    fn holds_pull_smoothed_scale_toward_raw() {
        let mut seq = ManipulationSequence::new();
        let s = settings(SupportedManipulations::SCALE, 5.0);
        let spread = [Contact::new(1, -20.0, 0.0), Contact::new(2, 20.0, 0.0)];
        seq.process_manipulators(
            0,
            &[Contact::new(1, -10.0, 0.0), Contact::new(2, 10.0, 0.0)],
            &s,
        )
        .unwrap();
        let (_, first) = delta_of(seq.process_manipulators(10 * MS, &spread, &s).unwrap());
        // six-entry window: five prefilled identities and one raw 2.0
        assert!(close(first.scale_x, 7.0 / 6.0));

        let mut last = first.scale_x;
        for (i, expected) in [8.0, 9.0, 10.0, 11.0, 12.0].into_iter().enumerate() {
            let t = (20 + 10 * i as i64) * MS;
            let (_, cumulative) = delta_of(seq.process_manipulators(t, &spread, &s).unwrap());
            assert!(close(cumulative.scale_x, expected / 6.0));
            assert!(cumulative.scale_x > last);
            last = cumulative.scale_x;
        }
        assert!(close(last, seq.cumulative_scale()));
    }

    #[test]
    fn contacts_inside_minimum_radius_do_not_scale() {
        let mut seq = ManipulationSequence::new();
        let s = settings(SupportedManipulations::ALL, 20.0);
        seq.process_manipulators(
            0,
            &[Contact::new(1, -5.0, 0.0), Contact::new(2, 5.0, 0.0)],
            &s,
        )
        .unwrap();
        seq.process_manipulators(
            10 * MS,
            &[Contact::new(1, -8.0, 0.0), Contact::new(2, 8.0, 0.0)],
            &s,
        )
        .unwrap();
        assert_eq!(seq.cumulative_scale(), 1.0);
        assert_eq!(seq.average_radius(), 0.0);
    }

    #[test]
    fn pinned_single_contact_rotates_around_pivot_undampened() {
        let mut seq = ManipulationSequence::new();
        let mut s = settings(SupportedManipulations::ROTATE, 20.0);
        s.set_pivot(Some(ManipulationPivot::new(0.0, 0.0, 10.0).unwrap()));
        seq.process_manipulators(0, &[Contact::new(1, 20.0, 0.0)], &s)
            .unwrap();
        let (delta, _) = delta_of(
            seq.process_manipulators(100_000, &[Contact::new(1, 20.0, 10.0)], &s)
                .unwrap(),
        );
        let expected = angle_between(Vec2::new(20.0, 0.0), Vec2::new(20.0, 10.0));
        assert!(close(delta.rotation, expected));
        assert_eq!(delta.translation_x, 0.0);
        assert_eq!(delta.translation_y, 0.0);
    }

    #[test]
    fn unpinned_single_contact_rotation_is_dampened_near_pivot() {
        let mut seq = ManipulationSequence::new();
        let mut s = settings(SupportedManipulations::ALL, 20.0);
        s.set_pivot(Some(ManipulationPivot::new(0.0, 0.0, 10.0).unwrap()));
        seq.process_manipulators(0, &[Contact::new(1, 5.0, 0.0)], &s)
            .unwrap();
        let (delta, _) = delta_of(
            seq.process_manipulators(10 * MS, &[Contact::new(1, 5.0, 5.0)], &s)
                .unwrap(),
        );
        // (5 / 10)^4 of a 45 degree turn
        assert!(close(delta.rotation, PI / 4.0 / 16.0));
        assert_eq!(delta.translation_y, 5.0);
    }

    #[test]
    fn single_contact_without_pivot_never_rotates_or_scales() {
        let mut seq = ManipulationSequence::new();
        let s = ManipulationSettings::default();
        seq.process_manipulators(0, &[Contact::new(1, 100.0, 0.0)], &s)
            .unwrap();
        let (delta, _) = delta_of(
            seq.process_manipulators(10 * MS, &[Contact::new(1, 0.0, 100.0)], &s)
                .unwrap(),
        );
        assert_eq!(delta.rotation, 0.0);
        assert_eq!(delta.scale_x, 1.0);
        assert_eq!(delta.expansion_x, 0.0);
    }

    #[test]
    fn releasing_all_contacts_completes_once() {
        let mut seq = ManipulationSequence::new();
        let s = ManipulationSettings::default();
        seq.process_manipulators(0, &[Contact::new(1, 0.0, 0.0)], &s)
            .unwrap();
        seq.process_manipulators(10 * MS, &[Contact::new(1, 4.0, 0.0)], &s)
            .unwrap();
        let e = seq.process_manipulators(20 * MS, &[], &s).unwrap();
        match e {
            Some(ManipulationEvent::Completed { total, .. }) => {
                assert_eq!(total.translation_x, 4.0)
            }
            other => panic!("expected completed, got {other:?}"),
        }
        assert_eq!(seq.state(), SequenceState::Waiting);
        assert_eq!(seq.process_manipulators(30 * MS, &[], &s).unwrap(), None);
    }

    #[test]
    fn new_sequence_resets_totals() {
        let mut seq = ManipulationSequence::new();
        let s = ManipulationSettings::default();
        seq.process_manipulators(0, &[Contact::new(1, 0.0, 0.0)], &s)
            .unwrap();
        seq.process_manipulators(10 * MS, &[Contact::new(1, 4.0, 0.0)], &s)
            .unwrap();
        seq.process_manipulators(20 * MS, &[], &s).unwrap();

        let e = seq
            .process_manipulators(30 * MS, &[Contact::new(5, 50.0, 50.0)], &s)
            .unwrap();
        assert!(matches!(e, Some(ManipulationEvent::Started { .. })));
        assert!(seq.cumulative().is_identity());
        assert!(seq.smoothed().is_identity());
    }

    #[test]
    fn adding_a_contact_does_not_translate() {
        let mut seq = ManipulationSequence::new();
        let s = ManipulationSettings::default();
        seq.process_manipulators(0, &[Contact::new(1, 0.0, 0.0)], &s)
            .unwrap();
        let (delta, _) = delta_of(
            seq.process_manipulators(
                10 * MS,
                &[Contact::new(1, 0.0, 0.0), Contact::new(2, 100.0, 0.0)],
                &s,
            )
            .unwrap(),
        );
        assert!(delta.is_identity());
        assert_eq!(seq.origin(), Point::new(50.0, 0.0));
    }

    #[test]
    fn lifting_one_of_two_contacts_keeps_sequence() {
        let mut seq = ManipulationSequence::new();
        let s = ManipulationSettings::default();
        seq.process_manipulators(
            0,
            &[Contact::new(1, 0.0, 0.0), Contact::new(2, 100.0, 0.0)],
            &s,
        )
        .unwrap();
        let (delta, _) = delta_of(
            seq.process_manipulators(10 * MS, &[Contact::new(2, 110.0, 0.0)], &s)
                .unwrap(),
        );
        assert_eq!(delta.translation_x, 10.0);
        assert_eq!(seq.origin(), Point::new(110.0, 0.0));
        assert!(seq.is_manipulating());
    }

    #[test]
    fn still_contacts_emit_zero_deltas_until_history_drops() {
        let mut seq = ManipulationSequence::new();
        let s = ManipulationSettings::default();
        seq.process_manipulators(0, &[Contact::new(1, 0.0, 0.0)], &s)
            .unwrap();
        seq.process_manipulators(10 * MS, &[Contact::new(1, 10.0, 0.0)], &s)
            .unwrap();

        let mut events = 0;
        let mut t = 20 * MS;
        while let Some(e) = seq
            .process_manipulators(t, &[Contact::new(1, 10.0, 0.0)], &s)
            .unwrap()
        {
            let ManipulationEvent::Delta { delta, .. } = e else {
                panic!("expected delta, got {e:?}");
            };
            assert!(delta.is_identity());
            events += 1;
            t += MS;
            assert!(events < 100);
        }
        // the batch that drops the history still reports
        assert_eq!(events, crate::queues::HISTORY_STOP_MARK_LIMIT + 1);
        assert_eq!(seq.velocities(), ManipulationVelocities::ZERO);
    }

    #[test]
    fn backwards_timestamp_is_rejected_without_side_effects() {
        let mut seq = ManipulationSequence::new();
        let s = ManipulationSettings::default();
        seq.process_manipulators(10 * MS, &[Contact::new(1, 0.0, 0.0)], &s)
            .unwrap();
        let err = seq.process_manipulators(5 * MS, &[Contact::new(1, 9.0, 0.0)], &s);
        assert!(err.is_err());
        assert_eq!(seq.contacts().get(1).unwrap().current.x, 0.0);
        assert!(
            seq.process_manipulators(20 * MS, &[Contact::new(1, 9.0, 0.0)], &s)
                .is_ok()
        );
    }

    #[test]
    fn complete_manipulation_forces_completion() {
        let mut seq = ManipulationSequence::new();
        let s = ManipulationSettings::default();
        assert_eq!(seq.complete_manipulation(0).unwrap(), None);
        seq.process_manipulators(MS, &[Contact::new(1, 0.0, 0.0)], &s)
            .unwrap();
        let e = seq.complete_manipulation(2 * MS).unwrap();
        assert!(e.is_some_and(|e| e.is_completed()));
        assert!(!seq.is_manipulating());
    }

    #[test]
    fn release_velocity_reflects_recent_motion() {
        let mut seq = ManipulationSequence::new();
        let s = ManipulationSettings::default();
        seq.process_manipulators(0, &[Contact::new(1, 0.0, 0.0)], &s)
            .unwrap();
        for i in 1..=4 {
            seq.process_manipulators(i * 10 * MS, &[Contact::new(1, i as f64 * 20.0, 0.0)], &s)
                .unwrap();
        }
        let e = seq.process_manipulators(45 * MS, &[], &s).unwrap();
        let Some(ManipulationEvent::Completed { velocities, .. }) = e else {
            panic!("expected completed, got {e:?}");
        };
        assert!(close(velocities.linear_x, 2.0));
        assert_eq!(velocities.linear_y, 0.0);
    }

    #[test]
    fn cumulative_scale_stays_positive() {
        let mut seq = ManipulationSequence::new();
        let s = settings(SupportedManipulations::SCALE, 0.0);
        seq.process_manipulators(
            0,
            &[Contact::new(1, -1e300, 0.0), Contact::new(2, 1e300, 0.0)],
            &s,
        )
        .unwrap();
        seq.process_manipulators(
            MS,
            &[Contact::new(1, -1e-300, 0.0), Contact::new(2, 1e-300, 0.0)],
            &s,
        )
        .unwrap();
        let scale = seq.cumulative_scale();
        assert!(scale > 0.0 && scale.is_finite());
    }

    #[test]
    fn smoothing_level_interpolates_inside_band() {
        assert_eq!(smoothing_level(1, 10.0, 5.0), 0.0);
        assert_eq!(smoothing_level(2, 4.0, 5.0), 0.0);
        assert_eq!(smoothing_level(2, 51.0, 5.0), 0.0);
        assert_eq!(smoothing_level(2, 5.0, 5.0), 1.0);
        assert!(close(smoothing_level(2, 27.5, 5.0), 0.5));
        assert_eq!(smoothing_level(3, 0.0, 0.0), 0.0);
    }
}
