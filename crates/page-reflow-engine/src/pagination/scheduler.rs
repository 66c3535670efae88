//! Debounced recalculation controller.
//!
//! [`Paginator`] owns the scheduler state for one surface. Hosts forward
//! change notices with [`Paginator::notify`] and call [`Paginator::tick`] once
//! per frame; a pass is spread over three ticks so the surface gets a frame to
//! lay out after each mutation:
//!
//! ```text
//! Idle ──notice──▶ Scheduled ──deadline──▶ Measuring(clean layout)
//!   ▲                  ▲ │ notice resets       │ next frame: measure, calculate,
//!   │                  └─┘ the deadline        ▼ map, synthesize, apply
//!   └──────────── report ◀──── next frame ── Measuring(settle)
//! ```
//!
//! Notices from transactions the paginator issued itself are recognised by
//! their [`Origin`] and dropped, including the size change its decorations
//! cause. Untagged size notices are also dropped while a pass is in flight and
//! for a short settle guard after it, for hosts whose layout reports reflow
//! with no transaction attached.

use std::time::Instant;

use log::{debug, trace};

use crate::pagination::breaks::{BreakPlan, PageBreakPoint, compute_breaks_with_first_page};
use crate::pagination::config::{PaginationConfig, SchedulerConfig};
use crate::pagination::decorations::{DecorationSet, synthesize};
use crate::pagination::error::{PaginationError, SkipReason};
use crate::pagination::mapper::{DroppedBreak, MappedBreaks, ResolvedBreak, resolve_breaks};
use crate::pagination::page_map::PageMap;
use crate::pagination::sampler::{clear_decorations, measure};
use crate::surface::{ChangeKind, ChangeNotice, Origin, PassId, Surface, Transaction};

/// Which frame of a pass is pending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurePhase {
    /// Decorations cleared, waiting for a clean layout to measure
    AwaitingCleanLayout,
    /// Decorations applied, waiting for layout to settle
    AwaitingSettle,
}

/// Observable scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Scheduled { deadline: Instant },
    Measuring { pass: PassId, phase: MeasurePhase },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PassOutcome {
    /// Decorations for every resolved break were applied
    Applied,
    /// Nothing to paginate; the surface was left without decorations
    Skipped(SkipReason),
}

/// Summary of one completed pass
#[derive(Debug, Clone, PartialEq)]
pub struct PassReport {
    pub pass: PassId,
    pub outcome: PassOutcome,
    /// Every break the calculator produced
    pub breaks: Vec<PageBreakPoint>,
    /// Breaks whose anchor could not be resolved
    pub dropped: Vec<DroppedBreak>,
    pub page_map: PageMap,
}

impl PassReport {
    fn skipped(pass: PassId, reason: SkipReason) -> Self {
        Self {
            pass,
            outcome: PassOutcome::Skipped(reason),
            breaks: Vec::new(),
            dropped: Vec::new(),
            page_map: PageMap::default(),
        }
    }

    /// Breaks that made it onto the surface
    pub fn applied_count(&self) -> usize {
        self.breaks.len() - self.dropped.len()
    }
}

/// Intermediate results carried from the measuring frame to the settle frame
#[derive(Debug)]
struct InFlight {
    pass: PassId,
    plan: BreakPlan,
    resolved: Vec<ResolvedBreak>,
    dropped: Vec<DroppedBreak>,
}

#[derive(Debug)]
enum Phase {
    Idle,
    Scheduled { deadline: Instant },
    Clearing(PassId),
    Settling(InFlight),
}

/// Pagination controller for one surface
#[derive(Debug)]
pub struct Paginator {
    config: PaginationConfig,
    timings: SchedulerConfig,
    phase: Phase,
    last_pass: PassId,
    /// A foreign change arrived while a pass was in flight
    rerun_requested: bool,
    /// Size notices before this instant are the last pass's own reflow
    guard_until: Option<Instant>,
    last_report: Option<PassReport>,
}

impl Paginator {
    pub fn new(config: PaginationConfig, timings: SchedulerConfig) -> Self {
        Self {
            config,
            timings,
            phase: Phase::Idle,
            last_pass: PassId::default(),
            rerun_requested: false,
            guard_until: None,
            last_report: None,
        }
    }

    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    pub fn timings(&self) -> &SchedulerConfig {
        &self.timings
    }

    pub fn state(&self) -> SchedulerState {
        match &self.phase {
            Phase::Idle => SchedulerState::Idle,
            Phase::Scheduled { deadline } => SchedulerState::Scheduled {
                deadline: *deadline,
            },
            Phase::Clearing(pass) => SchedulerState::Measuring {
                pass: *pass,
                phase: MeasurePhase::AwaitingCleanLayout,
            },
            Phase::Settling(in_flight) => SchedulerState::Measuring {
                pass: in_flight.pass,
                phase: MeasurePhase::AwaitingSettle,
            },
        }
    }

    /// When the pending debounce expires; `None` unless scheduled
    pub fn next_deadline(&self) -> Option<Instant> {
        match &self.phase {
            Phase::Scheduled { deadline } => Some(*deadline),
            _ => None,
        }
    }

    /// True while a pass is waiting for its next frame
    pub fn is_measuring(&self) -> bool {
        matches!(self.phase, Phase::Clearing(_) | Phase::Settling(_))
    }

    pub fn last_report(&self) -> Option<&PassReport> {
        self.last_report.as_ref()
    }

    /// Feed a change notice from the surface.
    ///
    /// Returns true if the notice scheduled (or rescheduled) work.
    pub fn notify(&mut self, notice: ChangeNotice, now: Instant) -> bool {
        if let Origin::Pagination(pass) = notice.origin {
            trace!("ignoring notice from pagination pass {}", pass.0);
            return false;
        }
        if !self.config.enabled {
            return false;
        }

        if notice.kind == ChangeKind::Size {
            if self.is_measuring() {
                trace!("ignoring size notice during pass");
                return false;
            }
            if self.guard_until.is_some_and(|until| now < until) {
                trace!("ignoring size notice inside settle guard");
                return false;
            }
        }

        if self.is_measuring() {
            debug!("change arrived mid-pass, rerun queued");
            self.rerun_requested = true;
            return true;
        }

        let debounce = match notice.kind {
            ChangeKind::Structural => self.timings.structural_debounce,
            ChangeKind::Size => self.timings.size_debounce,
        };
        self.phase = Phase::Scheduled {
            deadline: now + debounce,
        };
        true
    }

    /// Schedule a pass for the next tick, skipping the debounce
    pub fn force_recalculate(&mut self, now: Instant) {
        if !self.config.enabled {
            return;
        }
        if self.is_measuring() {
            self.rerun_requested = true;
        } else {
            self.phase = Phase::Scheduled { deadline: now };
        }
    }

    /// Replace the pagination settings.
    ///
    /// Disabling strips all decorations straight away; any other change
    /// schedules a fresh pass.
    pub fn configure<S: Surface>(
        &mut self,
        config: PaginationConfig,
        surface: &mut S,
        now: Instant,
    ) -> Result<(), PaginationError> {
        config.validate()?;
        let was_enabled = self.config.enabled;
        let changed = self.config != config;
        self.config = config;

        if !self.config.enabled {
            self.phase = Phase::Idle;
            self.rerun_requested = false;
            if was_enabled && surface.is_mounted() {
                let pass = self.next_pass_id();
                debug!("pagination disabled, clearing decorations (pass {})", pass.0);
                clear_decorations(surface, pass);
                self.last_report = Some(PassReport::skipped(pass, SkipReason::Disabled));
            }
            return Ok(());
        }

        if changed {
            self.force_recalculate(now);
        }
        Ok(())
    }

    /// Advance by at most one frame step.
    ///
    /// Returns the report when a pass completes on this tick.
    pub fn tick<S: Surface>(&mut self, surface: &mut S, now: Instant) -> Option<PassReport> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => None,
            Phase::Scheduled { deadline } if now < deadline => {
                self.phase = Phase::Scheduled { deadline };
                None
            }
            Phase::Scheduled { .. } => {
                let pass = self.next_pass_id();
                match self.begin(surface, pass) {
                    Ok(()) => {
                        self.phase = Phase::Clearing(pass);
                        None
                    }
                    Err(reason) => Some(self.finish(PassReport::skipped(pass, reason), now)),
                }
            }
            Phase::Clearing(pass) => match self.lay_out(surface, pass) {
                Ok(in_flight) => {
                    self.phase = Phase::Settling(in_flight);
                    None
                }
                Err(reason) => Some(self.finish(PassReport::skipped(pass, reason), now)),
            },
            Phase::Settling(in_flight) => {
                let report = self.settle(surface, in_flight);
                Some(self.finish(report, now))
            }
        }
    }

    /// Run a complete pass right now, superseding anything pending
    pub fn run_pass<S: Surface>(&mut self, surface: &mut S, now: Instant) -> PassReport {
        self.phase = Phase::Idle;
        self.rerun_requested = false;

        let pass = self.next_pass_id();
        let laid_out = match self.begin(surface, pass) {
            Ok(()) => self.lay_out(surface, pass),
            Err(reason) => Err(reason),
        };
        let report = match laid_out {
            Ok(in_flight) => self.settle(surface, in_flight),
            Err(reason) => PassReport::skipped(pass, reason),
        };
        self.finish(report, now)
    }

    fn next_pass_id(&mut self) -> PassId {
        self.last_pass = self.last_pass.next();
        self.last_pass
    }

    /// Clear old decorations so the next frame measures clean geometry
    fn begin<S: Surface>(&self, surface: &mut S, pass: PassId) -> Result<(), SkipReason> {
        if !self.config.enabled {
            return Err(SkipReason::Disabled);
        }
        if !surface.is_mounted() {
            debug!("pass {} skipped: surface not mounted", pass.0);
            return Err(SkipReason::NotMounted);
        }
        debug!("pass {} started", pass.0);
        clear_decorations(surface, pass);
        Ok(())
    }

    /// Measure, calculate, map and apply in one go
    fn lay_out<S: Surface>(&self, surface: &mut S, pass: PassId) -> Result<InFlight, SkipReason> {
        if !surface.is_mounted() {
            return Err(SkipReason::NotMounted);
        }
        let snapshot = measure(surface);
        if snapshot.is_empty() {
            debug!("pass {} skipped: no blocks", pass.0);
            return Err(SkipReason::NoBlocks);
        }

        let plan = compute_breaks_with_first_page(
            &snapshot.extents(),
            self.config.page_height,
            self.config.gap_height,
            self.config.first_page_number,
        );
        let MappedBreaks { resolved, dropped } = resolve_breaks(surface, &snapshot, &plan.breaks);
        drop(snapshot);

        let set: DecorationSet = synthesize(&resolved, &self.config, pass);
        debug!(
            "pass {}: {} breaks, {} dropped, {} decorations",
            pass.0,
            plan.breaks.len(),
            dropped.len(),
            set.len()
        );
        surface.apply_decorations(set, Transaction::pagination(pass));
        surface.flush_layout();

        Ok(InFlight {
            pass,
            plan,
            resolved,
            dropped,
        })
    }

    /// Read settled geometry and build the report
    fn settle<S: Surface>(&self, surface: &S, in_flight: InFlight) -> PassReport {
        let settled = measure(surface).extents();
        let page_map = PageMap::build(&in_flight.plan, &settled, &in_flight.resolved);

        PassReport {
            pass: in_flight.pass,
            outcome: PassOutcome::Applied,
            breaks: in_flight.plan.breaks,
            dropped: in_flight.dropped,
            page_map,
        }
    }

    fn finish(&mut self, report: PassReport, now: Instant) -> PassReport {
        self.guard_until = Some(now + self.timings.settle_guard);
        self.phase = if std::mem::take(&mut self.rerun_requested) {
            Phase::Scheduled {
                deadline: now + self.timings.structural_debounce,
            }
        } else {
            Phase::Idle
        };
        debug!("pass {} finished: {:?}", report.pass.0, report.outcome);
        self.last_report = Some(report.clone());
        report
    }
}
