//! Game capture source: the per-tick supervision state machine.
//!
//! `GameCaptureSource` owns one `CaptureSession` at a time and drives it from
//! the host's tick:
//!
//! 1. AppExit from the agent tears the session down.
//! 2. An outstanding safe-hook helper is polled for its exit code.
//! 3. CaptureReady is polled; when set, the descriptor is read and a backend
//!    is built for it.
//! 4. While waiting for CaptureReady, a stall watchdog drops back to idle.
//! 5. Idle sources re-acquire their target on the poll interval (class-name
//!    mode) or when a hotkey selected one (hotkey mode). Active sources check
//!    that the captured window still exists and that the hotkey has not picked
//!    another window.
//!
//! Every wait is a zero-timeout poll. The only blocking call is the direct-hook
//! helper wait inside injection.

use std::path::PathBuf;

use crate::backend::{ActiveBackend, TextureRef};
use crate::config::CaptureConfig;
use crate::descriptor::{CaptureDescriptor, CaptureMode, DescriptorError};
use crate::host::Host;
use crate::inject::{HookMode, InjectOutcome, Injector};
use crate::platform::{HelperProcess, Platform, WindowHandle};
use crate::render::{place, Fit, Placement, Vec2};
use crate::session::{CaptureSession, CaptureState};

/// Advisory shown while the configured window class cannot be found.
pub const WINDOW_NOT_FOUND: &str = "Game capture: target window not found";

pub struct GameCaptureSource<P, H>
where
    P: Platform,
    H: Host,
{
    platform: P,
    host: H,
    config: CaptureConfig,
    plugin_dir: PathBuf,
    /// Cleared by `end()`; an inactive source never acquires.
    active: bool,
    session: CaptureSession<P::Event>,
    /// Safe-hook helper still to be judged. Outlives session teardown so a
    /// running helper is never followed by a second injection.
    helper: Option<P::Helper>,
    /// Window picked by the last hotkey press, not yet acted on.
    next_target: Option<WindowHandle>,
    /// Image path of the last process we tried to hook.
    last_image: String,
}

impl<P, H> GameCaptureSource<P, H>
where
    P: Platform,
    H: Host,
{
    pub fn new(platform: P, host: H, config: CaptureConfig) -> Self {
        let plugin_dir = config.plugin_dir();
        Self {
            platform,
            host,
            config,
            plugin_dir,
            active: false,
            session: CaptureSession::default(),
            helper: None,
            next_target: None,
            last_image: String::new(),
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn state(&self) -> CaptureState {
        if self.session.error {
            CaptureState::Error
        } else if self.session.backend.is_some() {
            CaptureState::Capturing
        } else if self.session.capturing && self.helper.is_some() {
            CaptureState::Injecting
        } else if self.session.capturing {
            CaptureState::AwaitingReady
        } else {
            CaptureState::Idle
        }
    }

    /// Mode of the live backend, if any.
    pub fn capture_mode(&self) -> Option<CaptureMode> {
        self.session.backend.as_ref().map(ActiveBackend::mode)
    }

    /// Process currently targeted, if any.
    pub fn target_process(&self) -> Option<u32> {
        (self.session.process_id != 0).then_some(self.session.process_id)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Activates the source and tries to capture right away.
    pub fn begin(&mut self) {
        self.active = true;
        if self.session.capturing || !self.can_acquire() {
            return;
        }
        if self.config.safe_hook {
            log::info!("capture: using anti-cheat hooking for game capture");
        }
        self.attempt_capture();
    }

    /// Deactivates the source, stopping any capture in progress.
    pub fn end(&mut self) {
        self.active = false;
        self.end_capture();
    }

    /// Restarts the source with a new configuration.
    pub fn update_settings(&mut self, config: CaptureConfig) {
        self.end();
        self.plugin_dir = config.plugin_dir();
        self.config = config;
        self.begin();
    }

    /// Host hotkey callback. A key-down picks the foreground window as the
    /// next target.
    pub fn on_hotkey(&mut self, pressed: bool) {
        if pressed {
            self.next_target = self.platform.foreground_window();
        }
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    pub fn tick(&mut self, delta_secs: f32) {
        if self.session.events.poll_exit() {
            log::info!("capture: exit signal received, terminating capture");
            self.end_capture();
        }

        if self.session.capturing
            && !self.session.events.has_ready()
            && self.session.process_id != 0
        {
            if let Err(e) = self
                .session
                .events
                .ensure_ready(&self.platform, self.session.process_id)
            {
                log::warn!("sync: could not create ready event: {e}");
                self.session.error = true;
                self.session.capturing = false;
            }
        }

        self.poll_helper();

        if self.session.events.poll_ready() {
            self.new_capture();
        }

        if self.session.capturing && self.session.backend.is_none() && self.stalled(delta_secs) {
            log::info!(
                "capture: no ready signal from process {}, returning to idle",
                self.session.process_id
            );
            self.session.capturing = false;
        }

        if !self.session.capturing && !self.session.error {
            if !self.active || !self.can_acquire() {
                return;
            }
            self.session.check_interval += delta_secs;
            let due = if self.config.use_hotkey {
                self.next_target.is_some()
            } else {
                self.session.check_interval >= self.config.poll_interval_secs
            };
            if due {
                self.attempt_capture();
                self.session.check_interval = 0.0;
            }
        } else if !self
            .session
            .capture_window
            .is_some_and(|w| self.platform.is_window(w))
        {
            log::info!(
                "capture: window {:?} invalid or changing, terminating capture",
                self.session.capture_window
            );
            self.end_capture();
        } else if self.config.use_hotkey
            && self.next_target.is_some()
            && self.next_target != self.session.target
        {
            log::info!("capture: hotkey selected a new window, terminating capture");
            self.end_capture();
        } else {
            self.next_target = None;
        }
    }

    /// Advances the CaptureReady watchdog; true once the budget is spent.
    fn stalled(&mut self, delta_secs: f32) -> bool {
        self.session.stall_ticks += 1;
        self.session.stall_secs += delta_secs;
        match self.config.stall_timeout_secs {
            Some(limit) => self.session.stall_secs >= limit,
            None => self.session.stall_ticks >= self.host.max_fps(),
        }
    }

    fn can_acquire(&self) -> bool {
        self.config.use_hotkey || !self.config.window_class.is_empty()
    }

    // -----------------------------------------------------------------------
    // Acquisition and injection
    // -----------------------------------------------------------------------

    fn attempt_capture(&mut self) {
        let target = if self.config.use_hotkey {
            self.next_target.take()
        } else {
            self.platform.find_window(&self.config.window_class)
        };

        let Some(window) = target else {
            if !self.config.use_hotkey && self.session.advisory.is_none() {
                self.session.advisory = Some(self.host.add_advisory(WINDOW_NOT_FOUND));
            }
            self.session.capturing = false;
            return;
        };

        let owner = match self.platform.window_owner(window) {
            Ok(owner) if owner.process_id != 0 && owner.thread_id != 0 => owner,
            Ok(_) => {
                log::warn!("acquire: window {window:?} has no owning process");
                self.session.error = true;
                return;
            }
            Err(e) => {
                log::warn!("acquire: window {window:?}: {e}");
                self.session.error = true;
                return;
            }
        };
        // Events are named after the process; a new process needs new ones.
        if self.session.process_id != owner.process_id {
            self.session.events.close();
        }
        self.session.target = Some(window);
        self.session.process_id = owner.process_id;
        self.session.thread_id = owner.thread_id;

        if self.helper.is_some() {
            log::debug!("inject: helper still running, not injecting again");
            return;
        }

        if let Some(id) = self.session.advisory.take() {
            self.host.remove_advisory(id);
        }

        let injector = Injector::new(
            &self.platform,
            &self.plugin_dir,
            HookMode::from_safe_hook(self.config.safe_hook),
        );
        match injector.ensure_agent_running(&mut self.session, &mut self.last_image) {
            Ok(InjectOutcome::AlreadyHooked | InjectOutcome::Injected) => {}
            Ok(InjectOutcome::Pending(helper)) => self.helper = Some(helper),
            Err(e) => {
                log::warn!("inject: {e}");
                self.session.error = true;
            }
        }
    }

    /// Judges a finished safe-hook helper.
    fn poll_helper(&mut self) {
        let Some(helper) = self.helper.as_mut() else {
            return;
        };
        let code = match helper.try_exit_code() {
            Ok(None) => return,
            Ok(Some(code)) => code,
            Err(e) => {
                log::warn!("inject: lost track of safe inject helper: {e}");
                -1
            }
        };
        self.helper = None;

        if code == 0 {
            log::debug!("inject: safe inject helper finished");
        } else {
            log::warn!("inject: safe inject helper failed, error code = {code}");
            self.session.error = true;
            self.session.capturing = false;
        }
    }

    // -----------------------------------------------------------------------
    // Capture start and teardown
    // -----------------------------------------------------------------------

    /// Handles CaptureReady: reads the descriptor and replaces the backend.
    fn new_capture(&mut self) {
        if let Some(mut old) = self.session.backend.take() {
            log::info!("capture: eliminating old capture");
            old.destroy();
        }

        let process_id = self.session.process_id;
        if let Err(e) = self.session.events.ensure_all(&self.platform, process_id) {
            log::warn!("sync: could not create capture events: {e}");
            self.session.error = true;
            self.session.capturing = false;
            return;
        }

        let descriptor = match CaptureDescriptor::read(&self.platform, process_id) {
            Ok(descriptor) => descriptor,
            Err(e @ DescriptorError::Unavailable(_)) => {
                log::warn!("capture: {e}");
                return;
            }
            Err(e) => {
                log::warn!("capture: bad data from the target process: {e}");
                self.end_capture();
                return;
            }
        };

        self.session.flip = descriptor.flip;
        self.session.capture_window = Some(descriptor.window);

        let inner = self.host.create_backend(descriptor.mode);
        match ActiveBackend::start(descriptor.mode, inner, &descriptor) {
            Ok(backend) => {
                log::info!(
                    "capture: {:?} capture started, {}x{}",
                    descriptor.mode,
                    descriptor.width,
                    descriptor.height
                );
                self.session.backend = Some(backend);
                self.session.mark_capturing();
                self.session.error = false;
            }
            Err(e) => log::warn!("capture: {e}"),
        }
    }

    /// Tears the session down: tells the agent to stop, destroys the backend,
    /// closes every event and resets all session state.
    ///
    /// Safe to call at any point, any number of times.
    pub fn end_capture(&mut self) {
        if let Err(e) = self.session.events.signal_end() {
            log::debug!("sync: could not signal end of capture: {e}");
        }
        if let Some(mut backend) = self.session.backend.take() {
            backend.destroy();
        }
        if let Some(id) = self.session.advisory.take() {
            self.host.remove_advisory(id);
        }
        self.session = CaptureSession::default();
    }

    // -----------------------------------------------------------------------
    // Render
    // -----------------------------------------------------------------------

    /// Locks the current frame, hands it to `draw` with its placement inside
    /// the `pos`/`size` rectangle, and unlocks it.
    ///
    /// Returns false when there is no backend or no frame to draw.
    pub fn render<F>(&mut self, pos: Vec2, size: Vec2, draw: F) -> bool
    where
        F: FnOnce(&TextureRef, &Placement),
    {
        let Some(backend) = self.session.backend.as_mut() else {
            return false;
        };
        let Some(texture) = backend.lock_texture() else {
            return false;
        };

        let fit = Fit {
            stretch: self.config.stretch,
            ignore_aspect: self.config.ignore_aspect,
        };
        let texture_size = Vec2::new(texture.width as f32, texture.height as f32);
        if let Some(placement) = place(
            texture_size,
            self.host.base_size(),
            pos,
            size,
            fit,
            self.session.flip,
        ) {
            draw(&texture, &placement);
        }

        backend.unlock_texture();
        true
    }
}

impl<P, H> Drop for GameCaptureSource<P, H>
where
    P: Platform,
    H: Host,
{
    fn drop(&mut self) {
        self.end_capture();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
