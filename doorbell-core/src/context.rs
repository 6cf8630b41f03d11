//! Shared context
//!
//! Everything the workers share lives in [`Shared`], behind the single lock in
//! [`Context`]. The lock is a blocking mutex that is only ever taken inside a
//! closure, so it cannot be held across an `.await`.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use doorbell_protocol::LampPattern;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::cache::{CachePolicy, ContentCache};
use crate::calendar::Now;
use crate::command::{self, Command, CommandError};
use crate::config::Settings;
use crate::events::{Event, EventLog};
use crate::led::{IndicatorFrame, IndicatorState};
use crate::orchestrator::DisplayState;

/// State guarded by the context lock
#[derive(Debug)]
pub struct Shared {
    pub display: DisplayState,
    pub indicator: IndicatorState,
    pub cache: ContentCache,
    /// Bus client reconnected, subscriptions must be renewed
    pub connect_pending: bool,
    /// Status banner requested
    pub status_requested: bool,
    pub events: EventLog,
}

impl Shared {
    pub fn new(settings: &Settings) -> Self {
        Self {
            display: DisplayState::new(&settings.image_wait),
            indicator: IndicatorState::new(),
            cache: ContentCache::new(CachePolicy::from_settings(settings)),
            connect_pending: false,
            status_requested: false,
            events: EventLog::new(),
        }
    }
}

/// Settings, shared state and the stop signal
pub struct Context {
    settings: Settings,
    shared: Mutex<CriticalSectionRawMutex, RefCell<Shared>>,
    stop: AtomicBool,
}

impl Context {
    pub fn new(settings: Settings) -> Self {
        let shared = Shared::new(&settings);
        Self {
            settings,
            shared: Mutex::new(RefCell::new(shared)),
            stop: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run `f` with the shared state locked
    ///
    /// Calls must not nest.
    pub fn lock<R>(&self, f: impl FnOnce(&mut Shared) -> R) -> R {
        self.shared.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Ask every worker loop to exit
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Apply a decoded command
    pub fn apply(&self, command: Command, now: Now) {
        let kind = command.kind();
        self.lock(|shared| {
            command::apply(shared, &self.settings, command, now);
            shared.events.push(Event::Command(kind));
        });
    }

    /// Record a command that failed to decode
    pub fn reject(&self, error: CommandError) {
        self.record(Event::CommandRejected(error));
    }

    /// Doorbell button pressed
    pub fn press(&self, now: Now) {
        self.lock(|shared| shared.display.press(now.uptime, self.settings.hold_time));
    }

    /// Show a new panel lamp pattern on the strip
    pub fn mirror(&self, pattern: LampPattern) {
        let cycles = self.settings.mirror_cycles();
        self.lock(|shared| {
            shared.indicator.arm_mirror(pattern, cycles);
            shared.events.push(Event::MirrorArmed {
                steady: pattern.steady,
                blinking: pattern.blinking,
            });
        });
    }

    /// This cycle's LED frame
    pub fn indicator_frame(&self) -> IndicatorFrame {
        self.lock(|shared| shared.indicator.next_frame())
    }

    pub fn record(&self, event: Event) {
        self.lock(|shared| shared.events.push(event));
    }

    /// Oldest unlogged event
    pub fn next_event(&self) -> Option<Event> {
        self.lock(|shared| shared.events.pop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::Rendered;

    fn context() -> Context {
        Context::new(Settings::default())
    }

    #[test]
    fn test_apply_records_command() {
        let ctx = context();
        ctx.apply(Command::Connect, Now::new(5, None));
        assert!(ctx.lock(|s| s.connect_pending));
        // Nothing drawn yet, the first tick is full anyway
        assert_eq!(ctx.lock(|s| s.display.rendered()), Rendered::Startup);
        assert_eq!(
            ctx.next_event(),
            Some(Event::Command(command::CommandKind::Connect))
        );
        assert_eq!(ctx.next_event(), None);
    }

    #[test]
    fn test_press_extends_never_shortens() {
        let ctx = context();
        ctx.press(Now::new(100, None));
        ctx.press(Now::new(90, None));
        assert_eq!(ctx.lock(|s| s.display.pushed_until()), Some(130));
        ctx.press(Now::new(110, None));
        assert_eq!(ctx.lock(|s| s.display.pushed_until()), Some(140));
    }

    #[test]
    fn test_mirror_arms_indicator() {
        let ctx = context();
        let pattern = LampPattern {
            count: 3,
            steady: 0b001,
            blinking: 0b100,
        };
        ctx.mirror(pattern);
        assert_eq!(
            ctx.indicator_frame(),
            IndicatorFrame::Mirror {
                pattern,
                remaining: ctx.settings().mirror_cycles()
            }
        );
        assert_eq!(
            ctx.next_event(),
            Some(Event::MirrorArmed {
                steady: 0b001,
                blinking: 0b100
            })
        );
    }

    #[test]
    fn test_stop_signal() {
        let ctx = context();
        assert!(!ctx.is_stopped());
        ctx.stop();
        assert!(ctx.is_stopped());
    }
}
