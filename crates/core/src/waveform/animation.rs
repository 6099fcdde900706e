use std::time::Duration;

use rand::Rng;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{Surface, Waveform};

const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);

/// Owner's side of a running animation. Cancelling is idempotent; dropping cancels.
pub struct AnimationHandle {
    token: CancellationToken,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl AnimationHandle {
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancel(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for AnimationHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Renders `waveform` onto `surface` once per `frame_interval` until cancelled.
///
/// `is_active` is sampled at every tick, so activity can flip on any frame boundary.
/// Late ticks are skipped rather than replayed.
pub fn spawn_animation<R, S, F>(
    mut waveform: Waveform<R>,
    mut surface: S,
    is_active: F,
    frame_interval: Duration,
) -> AnimationHandle
where
    R: Rng + Send + 'static,
    S: Surface + Send + 'static,
    F: Fn() -> bool + Send + 'static,
{
    let token = CancellationToken::new();
    let cancelled = token.clone();
    let channel = waveform.channel();

    let handle = tokio::spawn(async move {
        let started = Instant::now();
        let mut ticker = tokio::time::interval(frame_interval.max(MIN_FRAME_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancelled.cancelled() => break,
                _ = ticker.tick() => {
                    let timestamp_ms = started.elapsed().as_secs_f64() * 1000.0;
                    waveform.render(&mut surface, timestamp_ms, is_active());
                }
            }
        }
        tracing::debug!("{} waveform animation stopped", channel.name());
    });

    AnimationHandle {
        token,
        handle: Some(handle),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::waveform::{Channel, Frame, SurfaceSize};

    #[derive(Default)]
    struct Recording {
        size: SurfaceSize,
        frames: Vec<Frame>,
    }

    impl Surface for Recording {
        fn size(&self) -> SurfaceSize {
            self.size
        }

        fn draw(&mut self, frame: &Frame) {
            self.frames.push(frame.clone());
        }
    }

    fn shared(width: u32, height: u32) -> Arc<Mutex<Recording>> {
        Arc::new(Mutex::new(Recording {
            size: SurfaceSize::new(width, height),
            frames: Vec::new(),
        }))
    }

    fn waveform(channel: Channel) -> Waveform<StdRng> {
        Waveform::with_rng(channel, StdRng::seed_from_u64(7))
    }

    #[tokio::test(start_paused = true)]
    async fn draws_every_tick_until_cancelled() {
        let surface = shared(120, 40);
        let mut handle = spawn_animation(
            waveform(Channel::Synthetic),
            surface.clone(),
            || true,
            Duration::from_millis(16),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        let drawn = surface.lock().unwrap().frames.len();
        assert!(drawn >= 5, "only {} frames drawn", drawn);

        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(surface.lock().unwrap().frames.len(), drawn);
    }

    #[tokio::test(start_paused = true)]
    async fn activity_is_sampled_each_frame() {
        let surface = shared(120, 40);
        let active = Arc::new(AtomicBool::new(true));
        let flag = active.clone();
        let _handle = spawn_animation(
            waveform(Channel::Counterpart),
            surface.clone(),
            move || flag.load(Ordering::SeqCst),
            Duration::from_millis(16),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        active.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let recording = surface.lock().unwrap();
        assert!(recording.frames.first().unwrap().active);
        assert!(!recording.frames.last().unwrap().active);
    }

    #[tokio::test(start_paused = true)]
    async fn survives_an_unusable_surface() {
        let surface = shared(0, 0);
        let _handle = spawn_animation(
            waveform(Channel::Synthetic),
            surface.clone(),
            || true,
            Duration::from_millis(16),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(surface.lock().unwrap().frames.is_empty());

        surface.lock().unwrap().size = SurfaceSize::new(64, 32);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let recording = surface.lock().unwrap();
        assert!(!recording.frames.is_empty());
        assert_eq!(recording.frames[0].size, SurfaceSize::new(64, 32));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_the_loop() {
        let surface = shared(50, 20);
        let handle = spawn_animation(
            waveform(Channel::Synthetic),
            surface.clone(),
            || false,
            Duration::from_millis(10),
        );
        let token = handle.cancellation_token();

        tokio::time::sleep(Duration::from_millis(30)).await;
        drop(handle);
        assert!(token.is_cancelled());

        let drawn = surface.lock().unwrap().frames.len();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(surface.lock().unwrap().frames.len(), drawn);
    }
}
