//! Per-contact tracking and batch diffing.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ManipulationError, Result};
use crate::geometry::is_finite_point;

/// One touch or pointer sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i32,
    pub x: f64,
    pub y: f64,
}

impl Contact {
    pub fn new(id: i32, x: f64, y: f64) -> Self {
        Self { id, x, y }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone)]
pub struct ContactState {
    pub id: i32,
    pub initial: Contact,
    pub current: Contact,
    /// Position at the last composite recalculation.
    pub(crate) anchor: Point,
    pub(crate) vector_from_origin: Vec2,
}

impl ContactState {
    fn new(contact: Contact) -> Self {
        Self {
            id: contact.id,
            initial: contact,
            current: contact,
            anchor: contact.position(),
            vector_from_origin: Vec2::ZERO,
        }
    }

    pub fn vector_from_origin(&self) -> Vec2 {
        self.vector_from_origin
    }

    /// Position at the last composite recalculation.
    pub fn anchor(&self) -> Point {
        self.anchor
    }

    /// Re-anchors this contact against a new origin.
    pub(crate) fn rebase(&mut self, origin: Point) {
        self.anchor = self.current.position();
        self.vector_from_origin = self.anchor - origin;
    }
}

/// Classification of one batch against the tracked contacts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchDiff {
    pub added: Vec<Contact>,
    pub removed: Vec<i32>,
    pub updated: Vec<Contact>,
}

impl BatchDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ContactTracker {
    states: BTreeMap<i32, ContactState>,
}

impl ContactTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn get(&self, id: i32) -> Option<&ContactState> {
        self.states.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContactState> {
        self.states.values()
    }

    pub fn positions(&self) -> impl Iterator<Item = Point> + '_ {
        self.states.values().map(|s| s.current.position())
    }

    /// Classifies `contacts` without touching tracked state.
    ///
    /// Positions are compared exactly. A contact id may appear only once per
    /// batch and coordinates must be finite.
    pub fn diff(&self, contacts: &[Contact]) -> Result<BatchDiff> {
        let mut seen = BTreeSet::new();
        let mut out = BatchDiff::default();

        for c in contacts {
            if !is_finite_point(c.position()) {
                return Err(ManipulationError::invalid_argument(
                    "contacts",
                    format!("contact {} has a non-finite position ({}, {})", c.id, c.x, c.y),
                ));
            }
            if !seen.insert(c.id) {
                return Err(ManipulationError::invalid_argument(
                    "contacts",
                    format!("contact {} appears more than once in the batch", c.id),
                ));
            }
            match self.states.get(&c.id) {
                None => out.added.push(*c),
                Some(s) if s.current.x != c.x || s.current.y != c.y => out.updated.push(*c),
                Some(_) => {}
            }
        }

        out.removed = self
            .states
            .keys()
            .filter(|id| !seen.contains(id))
            .copied()
            .collect();

        Ok(out)
    }

    /// Records a diff. Added contacts start with identical initial and current
    /// snapshots; updates only overwrite the current snapshot.
    #[cfg(test)]
    pub fn apply(&mut self, diff: &BatchDiff) {
        self.remove(&diff.removed);
        self.update(&diff.updated);
        self.add(&diff.added);
    }

    pub(crate) fn remove(&mut self, ids: &[i32]) {
        for id in ids {
            self.states.remove(id);
        }
    }

    pub(crate) fn update(&mut self, contacts: &[Contact]) {
        for c in contacts {
            if let Some(s) = self.states.get_mut(&c.id) {
                s.current = *c;
            }
        }
    }

    pub(crate) fn add(&mut self, contacts: &[Contact]) {
        for c in contacts {
            self.states.insert(c.id, ContactState::new(*c));
        }
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }

    pub(crate) fn rebase_all(&mut self, origin: Point) {
        for s in self.states.values_mut() {
            s.rebase(origin);
        }
    }
}
