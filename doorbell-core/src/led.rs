//! LED animator
//!
//! The strip shows the orchestrator's target colour, faded in over about a
//! second, unless a panel lamp pattern has been mirrored onto it recently.
//!
//! [`IndicatorState`] lives in the shared context and is written by the render
//! tick and the panel reader. [`LedAnimator`] is owned by the LED worker; each
//! cycle it takes an [`IndicatorFrame`] from the shared state and computes the
//! pixels to transmit.

use alloc::vec;
use alloc::vec::Vec;
use core::ops::Range;

use doorbell_protocol::{Lamp, LampPattern};
use smart_leds::{gamma, RGB8};

use crate::asset::{self, ColourSequence};
use crate::config::Settings;

/// Animator cycle period
pub const CYCLE_MS: u64 = 50;

/// Animator cycles per second
pub const CYCLES_PER_SECOND: u32 = (1000 / CYCLE_MS) as u32;

/// Fade progress added per cycle, out of 255
pub const FADE_STEP: u8 = 0x0F;

/// Cycles each symbol of a multi-colour sequence is held
pub const SEQUENCE_CYCLES: u32 = 10;

/// Cycles per half period of a blinking mirrored lamp
pub const BLINK_CYCLES: u16 = 10;

/// Level of the idle sub-range when the target is off
pub const IDLE_GREY: u8 = 0x55;

/// Target colour and mirror override
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorState {
    target: ColourSequence,
    mirror: Option<(LampPattern, u16)>,
}

impl Default for IndicatorState {
    /// Magenta until the first idle render
    fn default() -> Self {
        Self {
            target: asset::solid('M'),
            mirror: None,
        }
    }
}

/// What the animator should show this cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorFrame {
    Colour(ColourSequence),
    Mirror { pattern: LampPattern, remaining: u16 },
}

impl IndicatorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(&self) -> &ColourSequence {
        &self.target
    }

    /// Set the colour the strip converges to
    pub fn set_target(&mut self, target: ColourSequence) {
        self.target = target;
    }

    /// Show `pattern` for `cycles` animator cycles, replacing any current one
    pub fn arm_mirror(&mut self, pattern: LampPattern, cycles: u16) {
        self.mirror = (cycles > 0).then_some((pattern, cycles));
    }

    pub fn mirror_active(&self) -> bool {
        self.mirror.is_some()
    }

    /// Take this cycle's frame, counting down the mirror
    pub fn next_frame(&mut self) -> IndicatorFrame {
        match self.mirror.as_mut() {
            Some((pattern, remaining)) => {
                let frame = IndicatorFrame::Mirror {
                    pattern: *pattern,
                    remaining: *remaining,
                };
                *remaining -= 1;
                if *remaining == 0 {
                    self.mirror = None;
                }
                frame
            }
            None => IndicatorFrame::Colour(self.target.clone()),
        }
    }
}

/// Pixel generator for the strip
#[derive(Debug, Clone)]
pub struct LedAnimator {
    idle: Range<usize>,
    mirror_colours: ColourSequence,
    /// Colour the current fade started from
    origin: RGB8,
    /// Colour last shown, before gamma
    current: RGB8,
    target: Option<ColourSequence>,
    progress: u8,
    /// Cycles since the target changed
    cycle: u32,
    pixels: Vec<RGB8>,
    written: Option<Vec<RGB8>>,
}

impl LedAnimator {
    pub fn new(leds: usize, idle: Range<usize>, mirror_colours: ColourSequence) -> Self {
        let idle = idle.start.min(leds)..idle.end.min(leds);
        Self {
            idle,
            mirror_colours,
            origin: RGB8::default(),
            current: RGB8::default(),
            target: None,
            progress: u8::MAX,
            cycle: 0,
            pixels: vec![RGB8::default(); leds],
            written: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let mirror = asset::colours(&settings.mirror_colours).unwrap_or_else(|| asset::solid('R'));
        Self::new(settings.leds as usize, settings.idle_range(), mirror)
    }

    /// Colour last shown, before gamma
    pub fn current(&self) -> RGB8 {
        self.current
    }

    /// Advance one cycle
    ///
    /// Returns the pixels to transmit, or `None` if the strip already shows
    /// them.
    pub fn step(&mut self, frame: IndicatorFrame) -> Option<&[RGB8]> {
        match frame {
            IndicatorFrame::Colour(target) => self.step_colour(target),
            IndicatorFrame::Mirror { pattern, remaining } => self.step_mirror(&pattern, remaining),
        }

        if self.written.as_deref() == Some(self.pixels.as_slice()) {
            return None;
        }
        self.written = Some(self.pixels.clone());
        Some(&self.pixels)
    }

    fn step_colour(&mut self, target: ColourSequence) {
        if self.target.as_ref() != Some(&target) {
            self.origin = self.current;
            self.progress = 0;
            self.cycle = 0;
            self.target = Some(target.clone());
        }

        if target.len() > 1 {
            let index = (self.cycle / SEQUENCE_CYCLES) as usize % target.len();
            self.current = target[index];
            self.progress = u8::MAX;
            let colour = corrected(self.current);
            self.pixels.fill(colour);
        } else {
            let goal = target.first().copied().unwrap_or_default();
            self.progress = self.progress.saturating_add(FADE_STEP);
            self.current = lerp(self.origin, goal, self.progress);
            let colour = corrected(self.current);
            let idle = if goal == RGB8::default() {
                corrected(lerp(self.origin, RGB8::new(IDLE_GREY, IDLE_GREY, IDLE_GREY), self.progress))
            } else {
                colour
            };
            for (i, pixel) in self.pixels.iter_mut().enumerate() {
                *pixel = if self.idle.contains(&i) { idle } else { colour };
            }
        }

        self.cycle = self.cycle.wrapping_add(1);
    }

    fn step_mirror(&mut self, pattern: &LampPattern, remaining: u16) {
        let lit = (remaining / BLINK_CYCLES) % 2 == 0;
        let colours = &self.mirror_colours;
        for (i, pixel) in self.pixels.iter_mut().enumerate() {
            let index = u8::try_from(i).unwrap_or(u8::MAX);
            let on = match pattern.lamp(index) {
                Lamp::Steady => true,
                Lamp::Blinking => lit,
                Lamp::Off => false,
            };
            *pixel = if on && !colours.is_empty() {
                corrected(colours[i % colours.len()])
            } else {
                RGB8::default()
            };
        }
        // Resume from the baseline once the mirror ends
        self.written = None;
    }
}

/// Linear blend from `from` to `to`, `t` out of 255
pub fn lerp(from: RGB8, to: RGB8, t: u8) -> RGB8 {
    let mix = |a: u8, b: u8| -> u8 {
        let t = u32::from(t);
        ((t * u32::from(b) + (255 - t) * u32::from(a)) / 255) as u8
    };
    RGB8::new(mix(from.r, to.r), mix(from.g, to.g), mix(from.b, to.b))
}

/// Gamma corrected colour
fn corrected(colour: RGB8) -> RGB8 {
    gamma(core::iter::once(colour)).next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(letters: &str) -> ColourSequence {
        asset::colours(letters).unwrap()
    }

    fn run(animator: &mut LedAnimator, frame: IndicatorFrame, cycles: usize) -> Vec<RGB8> {
        let mut last = Vec::new();
        for _ in 0..cycles {
            if let Some(pixels) = animator.step(frame.clone()) {
                last = pixels.to_vec();
            }
        }
        last
    }

    #[test]
    fn test_lerp_endpoints() {
        let a = RGB8::new(10, 20, 30);
        let b = RGB8::new(250, 0, 128);
        assert_eq!(lerp(a, b, 0), a);
        assert_eq!(lerp(a, b, 255), b);
    }

    #[test]
    fn test_fade_reaches_target_in_bounded_steps() {
        let mut animator = LedAnimator::new(4, 0..0, seq("R"));
        let frame = IndicatorFrame::Colour(seq("B"));

        let first = animator.step(frame.clone()).unwrap().to_vec();
        assert_ne!(first[0], corrected(RGB8::new(0, 0, 255)));

        // 255 / 15 = 17 steps
        let pixels = run(&mut animator, frame.clone(), 16);
        assert_eq!(pixels[0], corrected(RGB8::new(0, 0, 255)));
        assert_eq!(animator.current(), RGB8::new(0, 0, 255));

        // Settled: nothing more to write
        assert!(animator.step(frame).is_none());
    }

    #[test]
    fn test_fade_starts_from_current_colour() {
        let mut animator = LedAnimator::new(1, 0..0, seq("R"));
        run(&mut animator, IndicatorFrame::Colour(seq("R")), 20);
        animator.step(IndicatorFrame::Colour(seq("G")));
        let current = animator.current();
        assert!(current.r > 200 && current.g > 0);
    }

    #[test]
    fn test_idle_range_fades_to_grey() {
        let mut animator = LedAnimator::new(4, 2..4, seq("R"));
        let pixels = run(&mut animator, IndicatorFrame::Colour(seq("K")), 20);
        let grey = corrected(RGB8::new(IDLE_GREY, IDLE_GREY, IDLE_GREY));
        assert_eq!(pixels, vec![RGB8::default(), RGB8::default(), grey, grey]);
    }

    #[test]
    fn test_idle_range_follows_target_when_lit() {
        let mut animator = LedAnimator::new(2, 1..2, seq("R"));
        let pixels = run(&mut animator, IndicatorFrame::Colour(seq("G")), 20);
        assert_eq!(pixels[0], pixels[1]);
    }

    #[test]
    fn test_sequence_cycles_without_fade() {
        let mut animator = LedAnimator::new(1, 0..0, seq("R"));
        let frame = IndicatorFrame::Colour(seq("RB"));
        let first = animator.step(frame.clone()).unwrap()[0];
        assert_eq!(first, corrected(RGB8::new(255, 0, 0)));
        for _ in 1..SEQUENCE_CYCLES {
            animator.step(frame.clone());
        }
        let next = animator.step(frame).unwrap()[0];
        assert_eq!(next, corrected(RGB8::new(0, 0, 255)));
    }

    #[test]
    fn test_mirror_counts_down_and_resumes() {
        let mut state = IndicatorState::new();
        state.set_target(seq("G"));
        let pattern = LampPattern {
            count: 2,
            steady: 0b01,
            blinking: 0b10,
        };
        state.arm_mirror(pattern, 3);

        let mut animator = LedAnimator::new(3, 0..0, seq("W"));
        for remaining in (1..=3).rev() {
            let frame = state.next_frame();
            assert_eq!(frame, IndicatorFrame::Mirror { pattern, remaining });
            let pixels = animator.step(frame).unwrap().to_vec();
            assert_eq!(pixels[0], corrected(RGB8::new(255, 255, 255)));
            assert_eq!(pixels[2], RGB8::default());
        }
        assert!(!state.mirror_active());
        assert_eq!(state.next_frame(), IndicatorFrame::Colour(seq("G")));
        assert!(animator.step(state.next_frame()).is_some());
    }

    #[test]
    fn test_mirror_blink_phase() {
        let mut animator = LedAnimator::new(1, 0..0, seq("R"));
        let pattern = LampPattern {
            count: 1,
            steady: 0,
            blinking: 1,
        };
        let on = animator
            .step(IndicatorFrame::Mirror { pattern, remaining: 40 })
            .unwrap()[0];
        let off = animator
            .step(IndicatorFrame::Mirror { pattern, remaining: 30 })
            .unwrap()[0];
        assert_eq!(on, corrected(RGB8::new(255, 0, 0)));
        assert_eq!(off, RGB8::default());
    }

    #[test]
    fn test_startup_target_is_magenta() {
        assert_eq!(IndicatorState::new().target(), &seq("M"));
    }
}
