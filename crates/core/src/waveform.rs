//! Decorative two-channel waveform.
//!
//! The waveform knows nothing about real audio. Each channel is driven by a single
//! `is_active` flag: while active, every sample point oscillates inside a fixed envelope with
//! the channel's own personality; while inactive, the points settle geometrically to zero.

use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

mod animation;

pub use animation::{AnimationHandle, spawn_animation};

/// Sample points per frame.
pub const SAMPLE_POINTS: usize = 100;
/// Per-frame amplitude ratio while a channel is inactive.
pub const DECAY_RATIO: f32 = 0.95;
/// Amplitudes never leave `[-ENVELOPE, ENVELOPE]`.
pub const ENVELOPE: f32 = 1.0;
/// Volume bars drawn next to the synthetic channel.
pub const INDICATOR_COUNT: usize = 20;

const EDGE_PADDING: f32 = 10.0;
const POINT_PHASE_STEP: f64 = 0.1;
const INITIAL_NOISE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// The agent's synthetic voice.
    Synthetic,
    /// The human on the other end.
    Counterpart,
}

impl Channel {
    pub fn personality(self) -> Personality {
        match self {
            Channel::Synthetic => Personality {
                base_amplitude: 0.6,
                variance: 0.3,
                frequency: 0.02,
            },
            Channel::Counterpart => Personality {
                base_amplitude: 0.4,
                variance: 0.5,
                frequency: 0.015,
            },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::Synthetic => "AI",
            Channel::Counterpart => "Human",
        }
    }
}

/// Shape parameters of an active channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Personality {
    pub base_amplitude: f64,
    pub variance: f64,
    /// Radians per millisecond.
    pub frequency: f64,
}

/// Pause and per-channel mute toggles of the monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelControls {
    pub paused: bool,
    pub synthetic_muted: bool,
    pub counterpart_muted: bool,
}

impl ChannelControls {
    pub fn is_muted(&self, channel: Channel) -> bool {
        match channel {
            Channel::Synthetic => self.synthetic_muted,
            Channel::Counterpart => self.counterpart_muted,
        }
    }

    pub fn is_active(&self, channel: Channel, call_active: bool) -> bool {
        call_active && !self.paused && !self.is_muted(channel)
    }

    /// Returns the new paused flag.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    /// Returns the new muted flag of `channel`.
    pub fn toggle_mute(&mut self, channel: Channel) -> bool {
        let muted = match channel {
            Channel::Synthetic => &mut self.synthetic_muted,
            Channel::Counterpart => &mut self.counterpart_muted,
        };
        *muted = !*muted;
        *muted
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_drawable(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Something a frame can be drawn on. The size is read again before every frame.
pub trait Surface {
    fn size(&self) -> SurfaceSize;

    fn draw(&mut self, frame: &Frame);
}

impl<S: Surface + ?Sized> Surface for Arc<Mutex<S>> {
    fn size(&self) -> SurfaceSize {
        self.lock().unwrap_or_else(PoisonError::into_inner).size()
    }

    fn draw(&mut self, frame: &Frame) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .draw(frame)
    }
}

/// One rendered frame, projected onto the surface size it was drawn for.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub channel: Channel,
    pub active: bool,
    pub size: SurfaceSize,
    pub amplitudes: Vec<f32>,
    /// Polyline through the sample points, in surface coordinates.
    pub points: Vec<(f32, f32)>,
    /// Volume bar intensities in `[0, 1]`; empty for the counterpart channel.
    pub indicators: Vec<f32>,
}

impl Frame {
    pub fn level_label(&self) -> &'static str {
        match (self.active, self.channel) {
            (false, _) => "Muted",
            (true, Channel::Synthetic) => "AI: 85%",
            (true, Channel::Counterpart) => "Human: 72%",
        }
    }

    pub fn rate_label(&self) -> &'static str {
        if self.active { "44.1kHz" } else { "0kHz" }
    }
}

/// Amplitude state of one channel. Each call to [`Waveform::advance`] moves it one frame on;
/// the sequence is never reset.
pub struct Waveform<R: Rng = StdRng> {
    channel: Channel,
    amplitudes: Vec<f32>,
    rng: R,
}

impl Waveform<StdRng> {
    pub fn new(channel: Channel) -> Self {
        Self::with_rng(channel, StdRng::from_entropy())
    }
}

impl<R: Rng> Waveform<R> {
    pub fn with_rng(channel: Channel, mut rng: R) -> Self {
        let amplitudes = (0..SAMPLE_POINTS)
            .map(|_| rng.gen_range(0.0..INITIAL_NOISE))
            .collect();
        Self {
            channel,
            amplitudes,
            rng,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn amplitudes(&self) -> &[f32] {
        &self.amplitudes
    }

    /// Computes the next frame's amplitudes. `timestamp_ms` is the frame clock.
    pub fn advance(&mut self, timestamp_ms: f64, is_active: bool) {
        if !is_active {
            for amplitude in &mut self.amplitudes {
                *amplitude *= DECAY_RATIO;
            }
            return;
        }

        let personality = self.channel.personality();
        for (index, amplitude) in self.amplitudes.iter_mut().enumerate() {
            let jitter: f64 = self.rng.gen_range(0.0..1.0);
            let wave = (timestamp_ms * personality.frequency + index as f64 * POINT_PHASE_STEP).sin();
            let value = personality.base_amplitude + wave * personality.variance * jitter;
            *amplitude = (value as f32).clamp(-ENVELOPE, ENVELOPE);
        }
    }

    /// Projects the current amplitudes onto a surface of `size`.
    pub fn project(&mut self, size: SurfaceSize, is_active: bool) -> Frame {
        let width = size.width as f32;
        let height = size.height as f32;
        let center = height / 2.0;
        let reach = (center - EDGE_PADDING.min(height * 0.1)).max(0.0);
        let step = width / SAMPLE_POINTS as f32;

        let points = self
            .amplitudes
            .iter()
            .enumerate()
            .map(|(index, amplitude)| {
                let side = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                (index as f32 * step, center + amplitude * reach * side)
            })
            .collect();

        let indicators = match self.channel {
            Channel::Synthetic => (0..INDICATOR_COUNT)
                .map(|_| {
                    if is_active {
                        self.rng.gen_range(0.2f32..1.0)
                    } else {
                        self.rng.gen_range(0.0f32..0.1)
                    }
                })
                .collect(),
            Channel::Counterpart => Vec::new(),
        };

        Frame {
            channel: self.channel,
            active: is_active,
            size,
            amplitudes: self.amplitudes.clone(),
            points,
            indicators,
        }
    }

    /// Advances one frame and draws it.
    ///
    /// An unusable surface (zero width or height) skips the draw and returns `false`; the
    /// amplitude sequence still moves on so nothing restarts when the surface comes back.
    pub fn render<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        timestamp_ms: f64,
        is_active: bool,
    ) -> bool {
        self.advance(timestamp_ms, is_active);
        let size = surface.size();
        if !size.is_drawable() {
            tracing::trace!("skipping {} frame on a {:?} surface", self.channel.name(), size);
            return false;
        }
        let frame = self.project(size, is_active);
        surface.draw(&frame);
        true
    }
}
