//! Replays a recorded contact trace through the manipulation processor and
//! the inertia that follows each release.
//!
//! Input is JSON lines, one batch per line:
//! `{"t": 0, "contacts": [{"id": 1, "x": 10.0, "y": 20.0}]}`.
//! Every event comes out as one JSON line tagged with its source.

use anyhow::{Result, anyhow};
use kurbo::Point;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

use crate::contacts::Contact;
use crate::events::ManipulationEvent;
use crate::geometry::TICKS_PER_MS;
use crate::inertia::{InertiaDefaults, InertiaProcessor};
use crate::processor::ManipulationProcessor;
use crate::settings::ManipulationSettings;

/// Inertia is cut short after this many ticks.
pub const MAX_INERTIA_STEPS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TraceFrame {
    pub t: i64,
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Manipulation,
    Inertia,
}

#[derive(Debug, Serialize)]
struct Record<'a> {
    source: Source,
    t: i64,
    #[serde(flatten)]
    event: &'a ManipulationEvent,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InertiaOptions {
    pub defaults: InertiaDefaults,
    pub tick_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    pub settings: ManipulationSettings,
    /// `None` disables inertia after release.
    pub inertia: Option<InertiaOptions>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub frames: usize,
    pub manipulation_events: usize,
    pub inertia_events: usize,
}

struct Replayer<W: Write> {
    out: W,
    processor: ManipulationProcessor,
    inertia: Option<InertiaOptions>,
    summary: ReplaySummary,
}

impl<W: Write> Replayer<W> {
    fn emit(&mut self, source: Source, t: i64, event: &ManipulationEvent) -> Result<()> {
        serde_json::to_writer(&mut self.out, &Record { source, t, event })?;
        self.out.write_all(b"\n")?;
        match source {
            Source::Manipulation => self.summary.manipulation_events += 1,
            Source::Inertia => self.summary.inertia_events += 1,
        }
        Ok(())
    }

    fn on_manipulation(&mut self, t: i64, event: Option<ManipulationEvent>) -> Result<()> {
        let Some(event) = event else {
            return Ok(());
        };
        self.emit(Source::Manipulation, t, &event)?;
        if let ManipulationEvent::Completed {
            origin_x,
            origin_y,
            velocities,
            ..
        } = event
        {
            if let Some(opts) = self.inertia {
                let radius = self.processor.sequence().average_radius();
                let inertia = InertiaProcessor::from_release(
                    Point::new(origin_x, origin_y),
                    &velocities,
                    &opts.defaults,
                    radius,
                )?;
                self.run_inertia(inertia, t, opts.tick_ms)?;
            }
        }
        Ok(())
    }

    fn run_inertia(&mut self, mut inertia: InertiaProcessor, start: i64, tick_ms: u64) -> Result<()> {
        let step = (tick_ms as f64 * TICKS_PER_MS) as i64;
        let mut t = start;
        for _ in 0..MAX_INERTIA_STEPS {
            match inertia.process(t)? {
                Some(e) => {
                    self.emit(Source::Inertia, t, &e)?;
                    if e.is_completed() {
                        return Ok(());
                    }
                }
                None => return Ok(()),
            }
            t = t.wrapping_add(step);
        }
        warn!("inertia still running after {MAX_INERTIA_STEPS} steps; completing");
        if let Some(e) = inertia.complete(t)? {
            self.emit(Source::Inertia, t, &e)?;
        }
        Ok(())
    }
}

pub fn replay<R: BufRead, W: Write>(input: R, out: W, opts: &ReplayOptions) -> Result<ReplaySummary> {
    let mut r = Replayer {
        out,
        processor: ManipulationProcessor::with_settings(opts.settings),
        inertia: opts.inertia,
        summary: ReplaySummary::default(),
    };
    let mut last_t = None;

    for (idx, line) in input.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let frame: TraceFrame = serde_json::from_str(trimmed)
            .map_err(|e| anyhow!("line {}: invalid frame: {e}", idx + 1))?;
        let event = r
            .processor
            .process_manipulators(frame.t, &frame.contacts)
            .map_err(|e| anyhow!("line {}: {e}", idx + 1))?;
        r.summary.frames += 1;
        last_t = Some(frame.t);
        r.on_manipulation(frame.t, event)?;
    }

    if let Some(t) = last_t {
        if r.processor.is_active() {
            debug!("trace ended with contacts down; completing at t={t}");
            let event = r.processor.complete_manipulation(t)?;
            r.on_manipulation(t, event)?;
        }
    }

    r.out.flush()?;
    info!(
        "replayed {} frame(s): {} manipulation event(s), {} inertia event(s)",
        r.summary.frames, r.summary.manipulation_events, r.summary.inertia_events
    );
    Ok(r.summary)
}
