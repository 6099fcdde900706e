use switchboard_core::waveform::{Frame, Surface, SurfaceSize};

const LEVELS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// A one-line text surface. Each column shows the magnitude of the nearest sample as a
/// block character; `height` is the number of distinct levels used.
#[derive(Debug, Clone)]
pub struct TextSurface {
    size: SurfaceSize,
    line: String,
}

impl TextSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: SurfaceSize::new(width, height),
            line: String::new(),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = SurfaceSize::new(width, height);
    }

    /// The last frame drawn, with its labels. Empty until the first frame.
    pub fn line(&self) -> &str {
        &self.line
    }
}

impl Surface for TextSurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn draw(&mut self, frame: &Frame) {
        let levels = (frame.size.height as usize).clamp(1, LEVELS.len() - 1);
        let columns = frame.size.width as usize;
        let samples = frame.amplitudes.len();

        let trace: String = (0..columns)
            .map(|column| {
                if samples == 0 {
                    return LEVELS[0];
                }
                let amplitude = frame.amplitudes[column * samples / columns].abs().min(1.0);
                let level = (amplitude * levels as f32).round() as usize;
                LEVELS[level * (LEVELS.len() - 1) / levels]
            })
            .collect();

        self.line = format!(
            "{:<10} {:>7} {}",
            frame.level_label(),
            frame.rate_label(),
            trace
        );
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use switchboard_core::waveform::{Channel, Waveform};

    use super::*;

    fn frame(channel: Channel, active: bool, amplitudes: Vec<f32>, width: u32) -> Frame {
        Frame {
            channel,
            active,
            size: SurfaceSize::new(width, 8),
            amplitudes,
            points: Vec::new(),
            indicators: Vec::new(),
        }
    }

    #[test]
    fn draws_one_column_per_character() {
        let mut surface = TextSurface::new(4, 8);
        surface.draw(&frame(Channel::Synthetic, true, vec![0.0, 0.5, -1.0, 1.0], 4));

        assert!(surface.line().starts_with("AI: 85%"));
        assert!(surface.line().contains("44.1kHz"));
        assert!(surface.line().ends_with(" ▄██"));
    }

    #[test]
    fn inactive_frames_are_labelled_muted() {
        let mut surface = TextSurface::new(3, 8);
        surface.draw(&frame(Channel::Counterpart, false, vec![0.0; 100], 3));

        assert!(surface.line().starts_with("Muted"));
        assert!(surface.line().contains("0kHz"));
    }

    #[test]
    fn renders_a_live_waveform() {
        let mut surface = TextSurface::new(20, 8);
        let mut waveform = Waveform::with_rng(Channel::Counterpart, StdRng::seed_from_u64(3));

        assert!(waveform.render(&mut surface, 16.0, true));
        assert!(surface.line().starts_with("Human: 72%"));
        assert_eq!(surface.line().chars().count(), 10 + 1 + 7 + 1 + 20);

        surface.resize(0, 8);
        assert!(!waveform.render(&mut surface, 32.0, true));
    }
}
