//! Render tick
//!
//! [`Doorbell`] owns the I/O collaborators and runs one scheduling tick at a
//! time: bus housekeeping, the orchestrator decision, push side effects, cache
//! resolution and the panel render.
//!
//! Network and storage I/O happen with no lock held. The cached content is
//! cloned out under the shared lock, then composed and flushed under the
//! display lock alone.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal::digital::OutputPin;

use crate::asset::{self, AssetName};
use crate::cache::{record_persist, Content, FetchOutcome, LoadJob, Plan};
use crate::calendar::{self, DateTime, Now};
use crate::config::{STATUS_HOLD_S, VERSION};
use crate::context::Context;
use crate::events::{label, Event};
use crate::orchestrator::{OverrideContent, Render, Target};
use crate::traits::{Body, Bus, DisplayDriver, DisplayError, Scene, Storage, Transport};

/// Topic for social posts
pub const TOOT_TOPIC: &str = "toot";

/// What one render draws
struct Layout<'r> {
    /// Asset to resolve
    asset: Option<&'r str>,
    /// Text shown when the asset has no content
    placeholder: &'r str,
    clock: Option<(u8, u8)>,
    /// LED colour when neither the name nor the content carries a tag,
    /// `None` to leave the strip alone
    led: Option<char>,
}

/// Scheduling loop state
pub struct Doorbell<'a, T, S, B, P> {
    ctx: &'a Context,
    transport: T,
    storage: S,
    bus: B,
    relay: P,
}

impl<'a, T, S, B, P> Doorbell<'a, T, S, B, P>
where
    T: Transport,
    S: Storage,
    B: Bus,
    P: OutputPin,
{
    pub fn new(ctx: &'a Context, transport: T, storage: S, bus: B, relay: P) -> Self {
        Self {
            ctx,
            transport,
            storage,
            bus,
            relay,
        }
    }

    pub fn context(&self) -> &'a Context {
        self.ctx
    }

    /// Blank the panel at boot
    pub async fn clear<M: RawMutex, D: DisplayDriver>(&mut self, display: &Mutex<M, D>) {
        let mut driver = display.lock().await;
        let scene = Scene {
            body: Body::Message(""),
            clock: None,
            stamp: None,
        };
        let result = match driver.compose(&scene) {
            Ok(()) => driver.flush(true).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            self.ctx.record(Event::DisplayFailed(e));
        }
    }

    /// Run one scheduling tick
    pub async fn tick<M: RawMutex, D: DisplayDriver>(&mut self, display: &Mutex<M, D>, now: Now) {
        let ctx = self.ctx;
        let (connect, status) = ctx.lock(|s| {
            (
                core::mem::take(&mut s.connect_pending),
                core::mem::take(&mut s.status_requested),
            )
        });
        if connect {
            self.subscribe();
        }
        if status {
            let banner = self.status_banner();
            ctx.lock(|s| {
                s.display
                    .request_override(OverrideContent::Message(banner), Some(STATUS_HOLD_S))
            });
        }

        let tick = ctx.lock(|s| s.display.decide(now, ctx.settings()));
        if tick.push_ended {
            if self.relay.set_low().is_err() {
                ctx.record(Event::RelayFailed);
            }
            ctx.record(Event::PushEnded);
        }
        if tick.announce {
            self.announce(now);
        }
        if let Some(render) = tick.render {
            self.render(display, render, now).await;
        }
    }

    /// Watch the remote presence lamps and poll their state
    fn subscribe(&mut self) {
        let ctx = self.ctx;
        let settings = ctx.settings();
        for device in [&settings.tas_away, &settings.tas_busy] {
            if device.is_empty() {
                continue;
            }
            let result = self
                .bus
                .subscribe(&format!("stat/{}/RESULT", device))
                .and_then(|()| self.bus.publish(&format!("cmnd/{}/POWER", device), ""));
            if let Err(e) = result {
                ctx.record(Event::NotifyFailed(e));
            }
        }
    }

    fn status_banner(&self) -> String {
        let settings = self.ctx.settings();
        let link = self.transport.link_info();
        let mut lines = vec![
            settings.app_name.clone(),
            settings.hostname.clone(),
            format!("v{}", VERSION),
            link.ssid,
            format!("ch {} {}dBm", link.channel, link.rssi),
            link.ipv4,
        ];
        lines.extend(link.ipv6);
        lines.retain(|line| !line.is_empty());
        lines.join("/")
    }

    /// Side effects of a new press
    fn announce(&mut self, now: Now) {
        let ctx = self.ctx;
        let settings = ctx.settings();
        let active = ctx.lock(|s| s.display.active_name().to_string());

        if !settings.tas_bell.is_empty() {
            let topic = format!("cmnd/{}/POWER", settings.tas_bell);
            if let Err(e) = self.bus.publish(&topic, "ON") {
                ctx.record(Event::NotifyFailed(e));
            }
        }
        if !settings.toot.is_empty() {
            let when = now
                .local(settings.utc_offset_minutes)
                .map(calendar::timestamp)
                .unwrap_or_default();
            let post = format!("@{}\nDing dong\n{}\n{}", settings.toot, active, when);
            if let Err(e) = self.bus.publish(TOOT_TOPIC, &post) {
                ctx.record(Event::NotifyFailed(e));
            }
        }
        if self.relay.set_high().is_err() {
            ctx.record(Event::RelayFailed);
        }
        ctx.record(Event::Pushed);
    }

    async fn render<M: RawMutex, D: DisplayDriver>(
        &mut self,
        display: &Mutex<M, D>,
        render: Render,
        now: Now,
    ) {
        let ctx = self.ctx;
        let settings = ctx.settings();
        let local = now.local(settings.utc_offset_minutes);
        let stamp = match local {
            Some(local) if !settings.postcode.is_empty() => {
                Some(format!("{} {}", calendar::stamp(local), settings.postcode))
            }
            _ => None,
        };

        let layout = match &render.target {
            Target::Override(OverrideContent::Message(text)) => Layout {
                asset: None,
                placeholder: text,
                clock: None,
                led: None,
            },
            Target::Override(OverrideContent::Asset(name)) => Layout {
                asset: Some(name.as_str()),
                placeholder: "",
                clock: None,
                led: Some('B'),
            },
            Target::Pushed { name } => Layout {
                asset: Some(name.as_str()),
                placeholder: &settings.wait_text,
                clock: None,
                led: Some('B'),
            },
            Target::Idle { name, .. } => Layout {
                asset: Some(name.as_str()),
                placeholder: &settings.idle_text,
                clock: local.map(|l| {
                    let dt = DateTime::from_unix(l);
                    (dt.hour, dt.minute)
                }),
                led: Some('K'),
            },
        };

        let found = match layout.asset {
            Some(name) => self.fetch(name, now).await,
            None => false,
        };
        if let Target::Override(OverrideContent::Asset(name)) = &render.target {
            if !found {
                ctx.lock(|s| {
                    s.display.abandon_override();
                    s.events.push(Event::OverrideUnavailable { key: label(name) });
                });
                return;
            }
        }

        // Copied out so nothing is drawn inside the critical section
        let content = ctx.lock(|s| {
            let content = layout.asset.and_then(|name| s.cache.get(name)).cloned();
            if let Some(fallback) = layout.led {
                let colours = layout
                    .asset
                    .and_then(|name| AssetName::parse(name).colours())
                    .or_else(|| {
                        content
                            .as_ref()
                            .and_then(Content::colour_tag)
                            .and_then(asset::colours)
                    })
                    .unwrap_or_else(|| asset::solid(fallback));
                s.indicator.set_target(colours);
            }
            content
        });

        let result = {
            let mut driver = display.lock().await;
            let body = match &content {
                Some(content) => Body::Content(content),
                None => Body::Message(layout.placeholder),
            };
            match driver.compose(&Scene {
                body,
                clock: layout.clock,
                stamp: stamp.as_deref(),
            }) {
                Ok(()) => driver.flush(render.full).await,
                Err(e) => Err::<(), DisplayError>(e),
            }
        };

        match result {
            Ok(()) if matches!(render.target, Target::Override(_)) => {
                ctx.record(Event::OverrideShown)
            }
            Ok(()) => {}
            Err(e) => ctx.record(Event::DisplayFailed(e)),
        }

        // Have the active art ready for the next press
        if let Target::Idle { .. } = render.target {
            let active = ctx.lock(|s| s.display.active_name().to_string());
            self.fetch(&active, now).await;
        }
    }

    /// Bring the cache entry for `name` up to date
    ///
    /// Returns whether the entry has content afterwards.
    async fn fetch(&mut self, name: &str, now: Now) -> bool {
        let ctx = self.ctx;
        let online = self.transport.is_online();
        match ctx.lock(|s| s.cache.plan(name, now, online)) {
            Plan::Ready => {}
            Plan::Fetch(job) => {
                let result = self.transport.get(&job.url, job.since.as_deref()).await;
                let outcome = ctx.lock(|s| s.cache.complete_fetch(&job, result, now, &mut s.events));
                match outcome {
                    FetchOutcome::Done => {}
                    FetchOutcome::Persist(persist) => {
                        let result = self.storage.write(&persist.path, &persist.bytes).await;
                        ctx.lock(|s| record_persist(&persist, result, &mut s.events));
                    }
                    FetchOutcome::Load(load) => self.load(load).await,
                }
            }
            Plan::Load(load) => self.load(load).await,
        }
        ctx.lock(|s| s.cache.get(name).is_some())
    }

    async fn load(&mut self, job: LoadJob) {
        let result = self.storage.read(&job.path).await;
        self.ctx
            .lock(|s| s.cache.complete_load(&job, result, &mut s.events));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::probe::tests::png;
    use crate::cache::tests::{FakeStorage, FakeTransport};
    use crate::command::Command;
    use crate::config::Settings;
    use crate::orchestrator::Rendered;
    use crate::traits::NotifyError;
    use core::convert::Infallible;
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    /// What a scene body held, owned
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Drawn {
        Content(Vec<u8>),
        Message(String),
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Frame {
        body: Drawn,
        clock: Option<(u8, u8)>,
        stamp: Option<String>,
        full: bool,
    }

    #[derive(Default)]
    struct FakeDisplay {
        composed: Option<(Drawn, Option<(u8, u8)>, Option<String>)>,
        frames: Vec<Frame>,
    }

    impl DisplayDriver for FakeDisplay {
        fn compose(&mut self, scene: &Scene<'_>) -> Result<(), DisplayError> {
            let body = match scene.body {
                Body::Content(content) => Drawn::Content(content.bytes().to_vec()),
                Body::Message(text) => Drawn::Message(text.into()),
            };
            self.composed = Some((body, scene.clock, scene.stamp.map(Into::into)));
            Ok(())
        }

        async fn flush(&mut self, full: bool) -> Result<(), DisplayError> {
            let (body, clock, stamp) = self.composed.take().ok_or(DisplayError::Bus)?;
            self.frames.push(Frame {
                body,
                clock,
                stamp,
                full,
            });
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeBus {
        published: Vec<(String, String)>,
        subscribed: Vec<String>,
        offline: bool,
    }

    impl Bus for FakeBus {
        fn publish(&mut self, topic: &str, payload: &str) -> Result<(), NotifyError> {
            if self.offline {
                return Err(NotifyError::Disconnected);
            }
            self.published.push((topic.into(), payload.into()));
            Ok(())
        }

        fn subscribe(&mut self, topic: &str) -> Result<(), NotifyError> {
            if self.offline {
                return Err(NotifyError::Disconnected);
            }
            self.subscribed.push(topic.into());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeRelay {
        high: bool,
        changes: u32,
    }

    impl embedded_hal::digital::ErrorType for FakeRelay {
        type Error = Infallible;
    }

    impl OutputPin for FakeRelay {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            self.changes += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            self.changes += 1;
            Ok(())
        }
    }

    type Bell<'a> = Doorbell<'a, FakeTransport, FakeStorage, FakeBus, FakeRelay>;
    type Panel = Mutex<NoopRawMutex, FakeDisplay>;

    const BASE: &str = "http://art.example";
    /// Clock not yet set
    const WALL: Option<i64> = None;

    fn settings() -> Settings {
        Settings {
            image_url: BASE.into(),
            tas_bell: "bell".into(),
            tas_away: "study".into(),
            tas_busy: "desk".into(),
            toot: "porch".into(),
            ..Settings::default()
        }
    }

    fn bell(ctx: &Context, online: bool) -> Bell<'_> {
        let transport = FakeTransport {
            online,
            ..Default::default()
        };
        Doorbell::new(
            ctx,
            transport,
            FakeStorage::default(),
            FakeBus::default(),
            FakeRelay::default(),
        )
    }

    fn panel() -> Panel {
        Mutex::new(FakeDisplay::default())
    }

    fn at(uptime: u32) -> Now {
        Now::new(uptime, WALL)
    }

    fn frames(panel: &mut Panel) -> &[Frame] {
        &panel.get_mut().frames
    }

    fn message(text: &str) -> Drawn {
        Drawn::Message(text.into())
    }

    /// Events currently queued, oldest first
    fn pending_events(ctx: &Context) -> Vec<Event> {
        ctx.lock(|s| s.events.iter().cloned().collect())
    }

    fn published_to<'b>(bell: &'b Bell<'_>, topic: &str) -> Vec<&'b str> {
        bell.bus
            .published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.as_str())
            .collect()
    }

    #[test]
    fn test_idle_offline_without_art_shows_placeholder() {
        let ctx = Context::new(settings());
        let mut bell = bell(&ctx, false);
        let mut panel = panel();

        block_on(bell.tick(&panel, at(6_000)));

        let drawn = frames(&mut panel);
        assert_eq!(drawn.len(), 1);
        assert_eq!(drawn[0].body, message(&ctx.settings().idle_text));
        assert!(drawn[0].full);
        assert_eq!(ctx.lock(|s| s.display.last_rendered_slot()), Some(100));
        assert_eq!(ctx.lock(|s| s.indicator.target().clone()), asset::solid('K'));

        // Local store tried once for the idle and the active art
        assert_eq!(
            bell.storage.reads,
            vec!["/assets/Example.png".to_string(), "/assets/Wait.png".to_string()]
        );
        let events = pending_events(&ctx);
        assert!(events
            .iter()
            .all(|e| !matches!(e, Event::AssetChanged { .. })));

        // Same bucket: nothing to do
        block_on(bell.tick(&panel, at(6_030)));
        assert_eq!(frames(&mut panel).len(), 1);
    }

    #[test]
    fn test_idle_without_configured_art_still_advances() {
        let ctx = Context::new(Settings {
            image_idle: String::new(),
            ..settings()
        });
        let mut bell = bell(&ctx, true);
        let mut panel = panel();

        block_on(bell.tick(&panel, at(6_000)));
        block_on(bell.tick(&panel, at(6_060)));

        assert_eq!(frames(&mut panel).len(), 2);
        assert_eq!(ctx.lock(|s| s.display.last_rendered_slot()), Some(101));
    }

    #[test]
    fn test_idle_fetches_and_prefetches_active() {
        let ctx = Context::new(settings());
        let mut bell = bell(&ctx, true);
        let art = png(240, 400);
        bell.transport
            .serve("http://art.example/Example.png", &art);
        let mut panel = panel();

        let now = Now::new(60, Some(1_750_000_000));
        block_on(bell.tick(&panel, now));

        let drawn = frames(&mut panel);
        assert_eq!(drawn[0].body, Drawn::Content(art));
        assert!(drawn[0].clock.is_some());
        assert_eq!(drawn[0].stamp, None);
        assert_eq!(bell.storage.writes, vec!["/assets/Example.png".to_string()]);

        let requested: Vec<_> = bell.transport.requests.iter().map(|(u, _)| u.as_str()).collect();
        assert_eq!(
            requested,
            vec!["http://art.example/Example.png", "http://art.example/Wait.png"]
        );
    }

    #[test]
    fn test_press_fires_side_effects_once() {
        let ctx = Context::new(settings());
        let mut bell = bell(&ctx, false);
        let mut panel = panel();

        block_on(bell.tick(&panel, at(1_000)));
        ctx.press(at(1_001));
        block_on(bell.tick(&panel, at(1_001)));

        assert_eq!(ctx.lock(|s| s.display.pushed_until()), Some(1_031));
        assert_eq!(published_to(&bell, "cmnd/bell/POWER"), vec!["ON"]);
        assert_eq!(published_to(&bell, TOOT_TOPIC), vec!["@porch\nDing dong\nG:Wait\n"]);
        assert!(bell.relay.high);
        assert_eq!(frames(&mut panel)[1].body, message(&ctx.settings().wait_text));
        assert_eq!(ctx.lock(|s| s.indicator.target().clone()), asset::solid('G'));

        // Pressing again extends without repeating the side effects
        ctx.press(at(1_010));
        for up in 1_002..1_020 {
            block_on(bell.tick(&panel, at(up)));
        }
        assert_eq!(ctx.lock(|s| s.display.pushed_until()), Some(1_040));
        assert_eq!(published_to(&bell, "cmnd/bell/POWER").len(), 1);
        assert_eq!(bell.relay.changes, 1);
        assert_eq!(frames(&mut panel).len(), 2);

        // Expiry releases the relay and returns to idle with a full refresh
        block_on(bell.tick(&panel, at(1_040)));
        assert!(!bell.relay.high);
        assert!(pending_events(&ctx).contains(&Event::PushEnded));
        let last = frames(&mut panel).last().cloned().unwrap();
        assert_eq!(last.body, message(&ctx.settings().idle_text));
        assert!(last.full);
    }

    #[test]
    fn test_override_during_press_then_resume() {
        let ctx = Context::new(settings());
        let mut bell = bell(&ctx, false);
        let mut panel = panel();

        ctx.press(at(100));
        block_on(bell.tick(&panel, at(100)));
        ctx.lock(|s| {
            s.display
                .request_override(OverrideContent::Message("BACK/SOON".into()), Some(5))
        });
        block_on(bell.tick(&panel, at(101)));

        assert_eq!(frames(&mut panel)[1].body, message("BACK/SOON"));
        assert!(pending_events(&ctx).contains(&Event::OverrideShown));
        // Message override leaves the strip on the pushed colour
        assert_eq!(ctx.lock(|s| s.indicator.target().clone()), asset::solid('G'));

        block_on(bell.tick(&panel, at(104)));
        assert_eq!(frames(&mut panel).len(), 2);

        // Override expired, press still running
        block_on(bell.tick(&panel, at(106)));
        assert_eq!(frames(&mut panel)[2].body, message(&ctx.settings().wait_text));
        assert_eq!(ctx.lock(|s| s.display.rendered()), Rendered::Pushed);
        assert_eq!(published_to(&bell, "cmnd/bell/POWER").len(), 1);
    }

    #[test]
    fn test_override_asset_tag_sets_leds() {
        let ctx = Context::new(settings());
        let mut bell = bell(&ctx, true);
        let art = png(240, 400);
        bell.transport.serve("http://art.example/Parcel.png", &art);
        let mut panel = panel();

        ctx.apply(Command::Push(Some("Y:Parcel".into())), at(10));
        block_on(bell.tick(&panel, at(10)));

        assert_eq!(frames(&mut panel)[0].body, Drawn::Content(art));
        assert_eq!(ctx.lock(|s| s.indicator.target().clone()), asset::solid('Y'));
        assert_eq!(ctx.lock(|s| s.display.override_until()), Some(40));
    }

    #[test]
    fn test_unavailable_override_asset_is_abandoned() {
        let ctx = Context::new(settings());
        let mut bell = bell(&ctx, false);
        let mut panel = panel();

        ctx.apply(Command::Push(Some("Ghost".into())), at(10));
        block_on(bell.tick(&panel, at(10)));
        assert!(frames(&mut panel).is_empty());
        assert!(pending_events(&ctx)
            .iter()
            .any(|e| matches!(e, Event::OverrideUnavailable { .. })));

        block_on(bell.tick(&panel, at(11)));
        assert_eq!(frames(&mut panel)[0].body, message(&ctx.settings().idle_text));
    }

    #[test]
    fn test_unavailable_override_asset_keeps_running_hold() {
        let ctx = Context::new(settings());
        let mut bell = bell(&ctx, false);
        let mut panel = panel();

        ctx.apply(Command::Message("BACK/AT/TWO".into()), at(10));
        block_on(bell.tick(&panel, at(10)));
        assert_eq!(ctx.lock(|s| s.display.override_until()), Some(40));

        ctx.apply(Command::Push(Some("Ghost".into())), at(12));
        block_on(bell.tick(&panel, at(12)));
        assert_eq!(ctx.lock(|s| s.display.override_until()), Some(40));
        assert_eq!(ctx.lock(|s| s.display.rendered()), Rendered::Override);

        block_on(bell.tick(&panel, at(13)));
        let drawn = frames(&mut panel);
        assert_eq!(drawn.len(), 1);
        assert_eq!(drawn[0].body, message("BACK/AT/TWO"));
    }

    /// Panel that presses the button while composing
    struct PressingDisplay<'c> {
        ctx: &'c Context,
        inner: FakeDisplay,
    }

    impl DisplayDriver for PressingDisplay<'_> {
        fn compose(&mut self, scene: &Scene<'_>) -> Result<(), DisplayError> {
            self.ctx.press(at(7));
            self.inner.compose(scene)
        }

        async fn flush(&mut self, full: bool) -> Result<(), DisplayError> {
            self.inner.flush(full).await
        }
    }

    #[test]
    fn test_compose_runs_outside_shared_lock() {
        let ctx = Context::new(settings());
        let mut bell = bell(&ctx, false);
        let mut panel: Mutex<NoopRawMutex, _> = Mutex::new(PressingDisplay {
            ctx: &ctx,
            inner: FakeDisplay::default(),
        });

        block_on(bell.tick(&panel, at(7)));

        assert_eq!(ctx.lock(|s| s.display.pushed_until()), Some(37));
        assert_eq!(panel.get_mut().inner.frames.len(), 1);
    }

    #[test]
    fn test_status_banner() {
        let ctx = Context::new(Settings {
            hostname: "porch".into(),
            ..settings()
        });
        let mut bell = bell(&ctx, true);
        let mut panel = panel();

        ctx.apply(Command::Status, at(50));
        block_on(bell.tick(&panel, at(50)));

        let Drawn::Message(text) = frames(&mut panel)[0].body.clone() else {
            panic!("banner is a message");
        };
        let lines: Vec<&str> = text.split('/').collect();
        assert_eq!(lines[0], "Doorbell");
        assert_eq!(lines[1], "porch");
        assert_eq!(lines[2], format!("v{}", VERSION));
        assert!(lines.contains(&"porch-ap"));
        assert!(lines.contains(&"ch 6 -61dBm"));
        assert!(lines.contains(&"192.0.2.7"));
        assert!(lines.contains(&"2001:DB8::7"));
        assert_eq!(ctx.lock(|s| s.display.override_until()), Some(50 + STATUS_HOLD_S));
    }

    #[test]
    fn test_connect_subscribes_and_polls() {
        let ctx = Context::new(settings());
        let mut bell = bell(&ctx, false);
        let panel = panel();

        ctx.apply(Command::Connect, at(1));
        block_on(bell.tick(&panel, at(1)));

        assert_eq!(
            bell.bus.subscribed,
            vec!["stat/study/RESULT".to_string(), "stat/desk/RESULT".to_string()]
        );
        assert_eq!(published_to(&bell, "cmnd/study/POWER"), vec![""]);
        assert_eq!(published_to(&bell, "cmnd/desk/POWER"), vec![""]);
        assert!(!ctx.lock(|s| s.connect_pending));
    }

    #[test]
    fn test_bus_failures_are_events() {
        let ctx = Context::new(settings());
        let mut bell = bell(&ctx, false);
        bell.bus.offline = true;
        let panel = panel();

        ctx.press(at(5));
        block_on(bell.tick(&panel, at(5)));

        let failures = pending_events(&ctx)
            .into_iter()
            .filter(|e| *e == Event::NotifyFailed(NotifyError::Disconnected))
            .count();
        assert_eq!(failures, 2);
        assert!(bell.relay.high);
    }

    #[test]
    fn test_clear_flushes_blank_frame() {
        let ctx = Context::new(settings());
        let mut bell = bell(&ctx, false);
        let mut panel = panel();

        block_on(bell.clear(&panel));
        assert_eq!(frames(&mut panel)[0].body, message(""));
        assert!(frames(&mut panel)[0].full);
    }
}
