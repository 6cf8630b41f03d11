//! Display orchestrator
//!
//! Decides once per tick what the panel should show. Inputs arrive as
//! mutations on [`DisplayState`] from the button, commands and the render
//! tick itself; [`DisplayState::decide`] turns the current state into at most
//! one render.
//!
//! # Priority
//!
//! ```text
//! pending override ─▶ render override, start its hold
//!        │ none
//! override holding ─▶ leave the screen alone
//!        │ expired
//! pushed ──────────▶ render active art once per press
//!        │ not pushed
//! idle ────────────▶ render idle art once per time bucket
//! ```
//!
//! Deadlines are uptime seconds. A deadline in the past is cleared on the
//! next tick.

pub mod idle;

use alloc::string::String;

use crate::calendar::Now;
use crate::config::{Settings, IDLE_PERIOD_S};

pub use idle::{active_name, idle_name, Presence};

/// Content injected by an override
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideContent {
    /// Lines separated by `/`
    Message(String),
    /// Asset name, with optional prefixes
    Asset(String),
}

/// A pending override
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRequest {
    pub content: OverrideContent,
    /// Seconds to hold, `None` for the configured hold time
    pub hold: Option<u32>,
}

/// What the panel currently shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rendered {
    /// Cleared at boot, nothing drawn yet
    Startup,
    Override,
    Pushed,
    /// Idle art for this time bucket
    Idle(u32),
    /// Must be redrawn whatever the state
    Stale,
    /// Must be redrawn, a partial refresh will do
    Redraw,
}

/// What to draw
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Override(OverrideContent),
    /// Active art
    Pushed { name: String },
    /// Idle art for bucket `slot`
    Idle { name: String, slot: u32 },
}

/// One render pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Render {
    pub target: Target,
    /// Run a full refresh cycle
    pub full: bool,
}

/// Outcome of one tick
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tick {
    pub render: Option<Render>,
    /// First tick of a press: fire the push side effects
    pub announce: bool,
    /// Pushed period ended or was cancelled: release the relay
    pub push_ended: bool,
}

/// Orchestrator session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    active_name: String,
    presence: Presence,
    /// At most one override waits at a time
    pending: Option<OverrideRequest>,
    override_until: Option<u32>,
    pushed_until: Option<u32>,
    rendered: Rendered,
    last_rendered_slot: Option<u32>,
    last_full_refresh_slot: Option<i64>,
    /// Side effects of the current press have fired
    announced: bool,
    /// Hold and screen before this tick's override, restored if it is
    /// abandoned
    superseded: Option<(Option<u32>, Rendered)>,
}

impl DisplayState {
    pub fn new(active_name: &str) -> Self {
        Self {
            active_name: active_name.into(),
            presence: Presence::default(),
            pending: None,
            override_until: None,
            pushed_until: None,
            rendered: Rendered::Startup,
            last_rendered_slot: None,
            last_full_refresh_slot: None,
            announced: false,
            superseded: None,
        }
    }

    pub fn active_name(&self) -> &str {
        &self.active_name
    }

    pub fn presence(&self) -> Presence {
        self.presence
    }

    /// Redraws when the presence changes
    pub fn set_presence(&mut self, presence: Presence) {
        if self.presence != presence {
            self.presence = presence;
            self.redraw();
        }
    }

    pub fn rendered(&self) -> Rendered {
        self.rendered
    }

    pub fn override_until(&self) -> Option<u32> {
        self.override_until
    }

    pub fn pushed_until(&self) -> Option<u32> {
        self.pushed_until
    }

    /// Idle bucket last drawn
    pub fn last_rendered_slot(&self) -> Option<u32> {
        self.last_rendered_slot
    }

    pub fn has_pending_override(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether a press is holding the active art on screen
    pub fn is_pushed(&self, now: u32) -> bool {
        self.pushed_until.is_some_and(|t| t > now)
    }

    /// Queue an override, replacing any not yet shown
    pub fn request_override(&mut self, content: OverrideContent, hold: Option<u32>) {
        self.pending = Some(OverrideRequest { content, hold });
    }

    /// Start or extend the pushed period
    ///
    /// Never shortens a running period.
    pub fn press(&mut self, now: u32, hold: u32) {
        let until = now.saturating_add(hold);
        self.pushed_until = Some(self.pushed_until.map_or(until, |t| t.max(until)));
    }

    /// Change the active art
    ///
    /// A new name redraws unless an override is on screen, and extends a
    /// running pushed period without firing the push side effects again.
    /// The same name again changes nothing.
    pub fn set_active(&mut self, name: &str, now: u32, hold: u32) {
        if self.active_name == name {
            return;
        }
        self.active_name = name.into();
        if self.is_pushed(now) {
            self.press(now, hold);
        }
        self.redraw();
    }

    /// Drop both deadlines
    pub fn cancel(&mut self) {
        self.override_until = None;
        self.pushed_until = None;
        self.superseded = None;
        self.rendered = Rendered::Stale;
    }

    /// Redraw what is on screen on the next tick
    pub fn invalidate(&mut self) {
        self.redraw();
    }

    /// Forget an override whose content could not be shown
    ///
    /// Nothing was drawn, so the hold and screen from before it come back.
    pub fn abandon_override(&mut self) {
        if let Some((until, rendered)) = self.superseded.take() {
            self.override_until = until;
            self.rendered = rendered;
        }
    }

    /// Mark drawn art for a partial redraw
    ///
    /// An override on screen is left alone; the art it covers is marked
    /// instead.
    fn redraw(&mut self) {
        let rendered = match self.superseded.as_mut() {
            Some((_, previous)) if self.rendered == Rendered::Override => previous,
            _ => &mut self.rendered,
        };
        if matches!(rendered, Rendered::Idle(_) | Rendered::Pushed) {
            *rendered = Rendered::Redraw;
        }
    }

    /// Evaluate one tick
    pub fn decide(&mut self, now: Now, settings: &Settings) -> Tick {
        let up = now.uptime;
        let mut tick = Tick::default();

        // Press bookkeeping runs even under an override so the bell and
        // relay follow the button, not the screen
        if self.pushed_until.is_some_and(|t| t <= up) {
            self.pushed_until = None;
        }
        match (self.pushed_until.is_some(), self.announced) {
            (true, false) => {
                self.announced = true;
                tick.announce = true;
            }
            (false, true) => {
                self.announced = false;
                tick.push_ended = true;
            }
            _ => {}
        }

        self.superseded = None;
        if let Some(request) = self.pending.take() {
            let hold = request.hold.unwrap_or(settings.hold_time);
            self.superseded = Some((self.override_until, self.rendered));
            if !self.override_until.is_some_and(|t| t > up) {
                self.override_until = Some(up.saturating_add(hold));
            }
            self.rendered = Rendered::Override;
            tick.render = Some(Render {
                target: Target::Override(request.content),
                full: true,
            });
            return tick;
        }

        if let Some(until) = self.override_until {
            if until > up {
                return tick;
            }
            self.override_until = None;
        }

        if self.pushed_until.is_some() {
            if self.rendered != Rendered::Pushed {
                let full = self.rendered != Rendered::Redraw;
                self.rendered = Rendered::Pushed;
                tick.render = Some(Render {
                    target: Target::Pushed {
                        name: self.active_name.clone(),
                    },
                    full,
                });
            }
            return tick;
        }

        // Before the clock is set, buckets follow uptime
        let clock = now.wall.unwrap_or(i64::from(up));
        let slot = clock.div_euclid(IDLE_PERIOD_S) as u32;
        if self.rendered == Rendered::Idle(slot) {
            return tick;
        }

        let refresh_slot = (settings.refresh > 0).then(|| clock.div_euclid(i64::from(settings.refresh)));
        let full = !matches!(self.rendered, Rendered::Idle(_) | Rendered::Redraw)
            || refresh_slot != self.last_full_refresh_slot;
        self.last_full_refresh_slot = refresh_slot;
        self.rendered = Rendered::Idle(slot);
        self.last_rendered_slot = Some(slot);

        let name = idle_name(
            settings,
            self.presence,
            now.wall,
            now.local(settings.utc_offset_minutes),
        );
        tick.render = Some(Render {
            target: Target::Idle {
                name: name.into(),
                slot,
            },
            full,
        });
        tick
    }
}
