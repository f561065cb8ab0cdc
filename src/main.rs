//! gamecap probe -- drives one capture source against a live game.
//!
//! Usage: `gamecap [config.toml]` (default `gamecap.toml`, missing file means
//! defaults). Runs at 60 ticks per second until killed, logging state changes
//! and the frame placement on a 1920x1080 canvas. Set `RUST_LOG=debug` for the
//! handshake details.

use std::path::Path;
use std::process;

use gamecap::CaptureConfig;

const DEFAULT_CONFIG: &str = "gamecap.toml";

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    log::info!("gamecap v{}", env!("CARGO_PKG_VERSION"));

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = match load_config(Path::new(&path)) {
        Ok(config) => config,
        Err(e) => {
            log::error!("config: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = probe::run(config) {
        log::error!("{e}");
        process::exit(1);
    }
}

fn load_config(path: &Path) -> Result<CaptureConfig, gamecap::ConfigError> {
    if path.exists() {
        log::info!("config: loading {}", path.display());
        CaptureConfig::load(path)
    } else {
        log::info!("config: {} not found, using defaults", path.display());
        Ok(CaptureConfig::default())
    }
}

#[cfg(target_os = "windows")]
mod probe {
    use std::thread;
    use std::time::{Duration, Instant};

    use gamecap::platform::windows::WindowsPlatform;
    use gamecap::platform::PlatformError;
    use gamecap::{
        AdvisoryId, CaptureBackend, CaptureConfig, CaptureMode, CaptureState, GameCaptureSource,
        Host, ProbeBackend, Vec2,
    };
    use windows_sys::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;

    const FPS: u32 = 60;
    const CANVAS: Vec2 = Vec2::new(1920.0, 1080.0);

    /// Host that logs advisories and hands out probe backends.
    #[derive(Default)]
    struct ProbeHost {
        next_advisory: u64,
    }

    impl Host for ProbeHost {
        fn max_fps(&self) -> u32 {
            FPS
        }

        fn base_size(&self) -> Vec2 {
            CANVAS
        }

        fn add_advisory(&mut self, message: &str) -> AdvisoryId {
            self.next_advisory += 1;
            log::warn!("advisory: {message}");
            AdvisoryId(self.next_advisory)
        }

        fn remove_advisory(&mut self, id: AdvisoryId) {
            log::info!("advisory {} cleared", id.0);
        }

        fn create_backend(&mut self, mode: CaptureMode) -> Box<dyn CaptureBackend> {
            log::info!("capture: creating probe backend for {mode:?}");
            Box::new(ProbeBackend::new())
        }
    }

    fn key_down(vk: u16) -> bool {
        // High bit set means the key is currently held.
        unsafe { GetAsyncKeyState(i32::from(vk)) < 0 }
    }

    pub fn run(config: CaptureConfig) -> Result<(), PlatformError> {
        let hotkey = config.use_hotkey.then(|| config.hotkey_vk()).flatten();
        let mut source =
            GameCaptureSource::new(WindowsPlatform::new(), ProbeHost::default(), config);
        source.begin();

        let frame = Duration::from_secs(1) / FPS;
        let mut last_state = None;
        let mut last_size = None;
        let mut was_down = false;
        let mut last = Instant::now();

        loop {
            if let Some(vk) = hotkey {
                let down = key_down(vk);
                if down != was_down {
                    source.on_hotkey(down);
                    was_down = down;
                }
            }

            let now = Instant::now();
            source.tick(now.duration_since(last).as_secs_f32());
            last = now;

            let state = source.state();
            if last_state != Some(state) {
                log::info!(
                    "state: {state:?} (pid {:?}, mode {:?})",
                    source.target_process(),
                    source.capture_mode()
                );
                last_state = Some(state);
            }

            if state == CaptureState::Capturing {
                source.render(Vec2::new(0.0, 0.0), CANVAS, |texture, placement| {
                    let size = (texture.width, texture.height);
                    if last_size != Some(size) {
                        let (top_left, bottom_right) = placement.corners();
                        log::info!(
                            "frame {}x{} placed at ({}, {})-({}, {})",
                            size.0,
                            size.1,
                            top_left.x,
                            top_left.y,
                            bottom_right.x,
                            bottom_right.y
                        );
                        last_size = Some(size);
                    }
                });
            } else {
                last_size = None;
            }

            thread::sleep(frame.saturating_sub(last.elapsed()));
        }
    }
}

#[cfg(not(target_os = "windows"))]
mod probe {
    use gamecap::platform::PlatformError;
    use gamecap::CaptureConfig;

    pub fn run(_config: CaptureConfig) -> Result<(), PlatformError> {
        Err(PlatformError::Unavailable(format!(
            "game capture requires Windows, this is {}",
            std::env::consts::OS
        )))
    }
}
