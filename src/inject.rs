//! Gets a capture agent running inside the target process.
//!
//! If the agent is already resident (its restart event exists) it is simply
//! told to restart. Otherwise a helper executable matching the target's
//! bitness is launched to inject it:
//!
//! - direct hook: the helper receives the process id and the engine blocks
//!   until it exits, judging the exit code immediately;
//! - safe hook: the helper receives the thread id and runs asynchronously;
//!   the caller keeps the child and judges its exit code on later ticks.
//!
//! The host liveness event is created before injection and released again on
//! every failure path. The target process handle is dropped (closed) before
//! `ensure_agent_running` returns, whatever the outcome.

use std::path::{Path, PathBuf};

use crate::platform::{Bitness, HelperProcess, Platform, PlatformError, TargetProcess};
use crate::session::CaptureSession;

/// Helper for 32-bit targets.
pub const HELPER_X86: &str = "injectHelper.exe";
/// Helper for 64-bit targets.
pub const HELPER_X64: &str = "injectHelper64.exe";

/// Injection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookMode {
    /// Hook by process id and wait for the helper.
    Direct,
    /// Hook by thread id without waiting; tolerated by anti-cheat monitors.
    Safe,
}

impl HookMode {
    pub fn from_safe_hook(safe_hook: bool) -> Self {
        if safe_hook {
            HookMode::Safe
        } else {
            HookMode::Direct
        }
    }

    fn flag(self) -> &'static str {
        match self {
            HookMode::Direct => "0",
            HookMode::Safe => "1",
        }
    }
}

/// Whether the launch call waits for the helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    Synchronous,
    Asynchronous,
}

/// One helper launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionRequest {
    pub helper: PathBuf,
    pub args: [String; 2],
    pub working_dir: PathBuf,
    pub wait: WaitPolicy,
}

impl InjectionRequest {
    pub fn new(
        plugin_dir: &Path,
        bitness: Bitness,
        mode: HookMode,
        process_id: u32,
        thread_id: u32,
    ) -> Self {
        let helper = match bitness {
            Bitness::X86 => HELPER_X86,
            Bitness::X64 => HELPER_X64,
        };
        let (id, wait) = match mode {
            HookMode::Direct => (process_id, WaitPolicy::Synchronous),
            HookMode::Safe => (thread_id, WaitPolicy::Asynchronous),
        };
        Self {
            helper: plugin_dir.join(helper),
            args: [id.to_string(), mode.flag().to_string()],
            working_dir: plugin_dir.to_path_buf(),
            wait,
        }
    }

    /// The command line as the helper sees it, for logging.
    pub fn command_line(&self) -> String {
        format!(
            "\"{}\" {} {}",
            self.helper.display(),
            self.args[0],
            self.args[1]
        )
    }
}

/// Errors that set the sticky error flag.
#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    #[error("could not open process {process_id}: {source}")]
    OpenProcess {
        process_id: u32,
        source: PlatformError,
    },

    #[error("could not create {what} event: {source}")]
    Event {
        what: &'static str,
        source: PlatformError,
    },

    #[error("could not query target bitness: {0}")]
    Bitness(PlatformError),

    #[error("could not create inject helper {helper}: {source}")]
    Launch {
        helper: PathBuf,
        source: PlatformError,
    },

    #[error("failed waiting for inject helper: {0}")]
    Wait(PlatformError),

    #[error("failed to inject library, error code = {0}")]
    ExitCode(i32),
}

/// Successful outcomes.
#[derive(Debug)]
pub enum InjectOutcome<C> {
    /// The agent was resident and has been told to restart.
    AlreadyHooked,
    /// A direct-hook helper ran to completion with exit code 0.
    Injected,
    /// A safe-hook helper is running; its exit code is still to be judged.
    Pending(C),
}

/// Launches or re-arms the agent for one target process.
pub(crate) struct Injector<'a, P> {
    platform: &'a P,
    plugin_dir: &'a Path,
    mode: HookMode,
}

impl<'a, P: Platform> Injector<'a, P> {
    pub(crate) fn new(platform: &'a P, plugin_dir: &'a Path, mode: HookMode) -> Self {
        Self {
            platform,
            plugin_dir,
            mode,
        }
    }

    /// Ensures an agent is running for `session.process_id`.
    ///
    /// On success the session is marked capturing. On failure the caller sets
    /// the sticky error flag; the host liveness event has been released.
    /// `last_image` is the image path of the previously targeted process and is
    /// updated when a different process is targeted.
    pub(crate) fn ensure_agent_running(
        &self,
        session: &mut CaptureSession<P::Event>,
        last_image: &mut String,
    ) -> Result<InjectOutcome<P::Helper>, InjectError> {
        let process_id = session.process_id;
        let process = self
            .platform
            .open_process(process_id)
            .map_err(|source| InjectError::OpenProcess { process_id, source })?;

        if let Some(path) = process.image_path() {
            if !path.is_empty() && !path.eq_ignore_ascii_case(last_image) {
                let file = path.rsplit(|c| c == '\\' || c == '/').next().unwrap_or(&path);
                log::info!("inject: trying to hook process {file}");
                *last_image = path;
            }
        }

        session
            .events
            .create_host_alive(self.platform, process_id)
            .map_err(|source| InjectError::Event {
                what: "host alive",
                source,
            })?;

        session.capture_window = session.target;

        let outcome = self.arm_or_launch(&process, session);
        match &outcome {
            Ok(_) => session.mark_capturing(),
            Err(_) => session.events.release_host_alive(),
        }
        outcome
    }

    fn arm_or_launch(
        &self,
        process: &P::Process,
        session: &mut CaptureSession<P::Event>,
    ) -> Result<InjectOutcome<P::Helper>, InjectError> {
        let process_id = session.process_id;

        let resident = session
            .events
            .open_restart(self.platform, process_id)
            .map_err(|source| InjectError::Event {
                what: "restart",
                source,
            })?;
        if resident {
            log::info!("inject: process {process_id} already hooked, signaling restart");
            session
                .events
                .signal_restart()
                .map_err(|source| InjectError::Event {
                    what: "restart",
                    source,
                })?;
            return Ok(InjectOutcome::AlreadyHooked);
        }

        let bitness = process.bitness().map_err(InjectError::Bitness)?;
        let request = InjectionRequest::new(
            self.plugin_dir,
            bitness,
            self.mode,
            process_id,
            session.thread_id,
        );
        log::debug!("inject: launching {}", request.command_line());

        let mut helper =
            self.platform
                .spawn_helper(&request)
                .map_err(|source| InjectError::Launch {
                    helper: request.helper.clone(),
                    source,
                })?;

        match request.wait {
            WaitPolicy::Asynchronous => Ok(InjectOutcome::Pending(helper)),
            WaitPolicy::Synchronous => match helper.wait_exit_code().map_err(InjectError::Wait)? {
                0 => Ok(InjectOutcome::Injected),
                code => Err(InjectError::ExitCode(code)),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::{FakePlatform, HelperScript};
    use crate::platform::{WindowHandle, WindowOwner};

    const PLUGINS: &str = "C:/obs/plugins/GraphicsCapture";

    fn session_for(
        platform: &FakePlatform,
        pid: u32,
        tid: u32,
    ) -> CaptureSession<<FakePlatform as Platform>::Event> {
        let window = platform.add_window(
            "Game",
            WindowOwner {
                process_id: pid,
                thread_id: tid,
            },
        );
        let mut session = CaptureSession::default();
        session.target = Some(window);
        session.process_id = pid;
        session.thread_id = tid;
        session
    }

    #[test]
    fn direct_request_carries_process_id() {
        let req =
            InjectionRequest::new(Path::new(PLUGINS), Bitness::X64, HookMode::Direct, 4242, 17);
        assert_eq!(req.helper, Path::new(PLUGINS).join("injectHelper64.exe"));
        assert_eq!(req.args, ["4242".to_string(), "0".to_string()]);
        assert_eq!(req.working_dir, Path::new(PLUGINS));
        assert_eq!(req.wait, WaitPolicy::Synchronous);
    }

    #[test]
    fn safe_request_carries_thread_id() {
        let req =
            InjectionRequest::new(Path::new(PLUGINS), Bitness::X86, HookMode::Safe, 4242, 17);
        assert!(req.helper.ends_with("injectHelper.exe"));
        assert_eq!(req.args, ["17".to_string(), "1".to_string()]);
        assert_eq!(req.wait, WaitPolicy::Asynchronous);
        assert!(req.command_line().ends_with("injectHelper.exe\" 17 1"));
    }

    #[test]
    fn resident_agent_is_rearmed_without_launch() {
        let platform = FakePlatform::new();
        platform.add_process(4242, Bitness::X64, "C:\\Games\\game.exe");
        platform.agent_creates_event("OBS_RestartCapture4242");
        let mut session = session_for(&platform, 4242, 17);
        let mut last = String::new();

        let outcome = Injector::new(&platform, Path::new(PLUGINS), HookMode::Direct)
            .ensure_agent_running(&mut session, &mut last)
            .unwrap();

        assert!(matches!(outcome, InjectOutcome::AlreadyHooked));
        assert!(platform.launches().is_empty());
        assert_eq!(platform.signal_count("OBS_RestartCapture4242"), 1);
        assert!(session.capturing);
        assert_eq!(last, "C:\\Games\\game.exe");
        assert_eq!(platform.open_handles("OBS_KeepAlive4242"), 1);
        assert_eq!(platform.open_process_handles(), 0);
    }

    #[test]
    fn direct_launch_judges_exit_code_synchronously() {
        let platform = FakePlatform::new();
        platform.add_process(4242, Bitness::X64, "game.exe");
        platform.script_helper(HelperScript::exits(0));
        let mut session = session_for(&platform, 4242, 17);

        let outcome = Injector::new(&platform, Path::new(PLUGINS), HookMode::Direct)
            .ensure_agent_running(&mut session, &mut String::new())
            .unwrap();

        assert!(matches!(outcome, InjectOutcome::Injected));
        let launches = platform.launches();
        assert_eq!(launches.len(), 1);
        assert_eq!(launches[0].args, ["4242".to_string(), "0".to_string()]);
        assert!(session.capturing);
        assert_eq!(session.capture_window, session.target);
    }

    #[test]
    fn nonzero_exit_releases_host_alive() {
        let platform = FakePlatform::new();
        platform.add_process(4242, Bitness::X86, "game.exe");
        platform.script_helper(HelperScript::exits(3));
        let mut session = session_for(&platform, 4242, 17);

        let err = Injector::new(&platform, Path::new(PLUGINS), HookMode::Direct)
            .ensure_agent_running(&mut session, &mut String::new())
            .unwrap_err();

        assert!(matches!(err, InjectError::ExitCode(3)));
        assert!(!session.capturing);
        assert_eq!(platform.open_handles("OBS_KeepAlive4242"), 0);
        assert_eq!(platform.open_process_handles(), 0);
        assert!(platform.launches()[0].helper.ends_with("injectHelper.exe"));
    }

    #[test]
    fn safe_launch_returns_pending_helper() {
        let platform = FakePlatform::new();
        platform.add_process(4242, Bitness::X64, "game.exe");
        platform.script_helper(HelperScript::exits_after(0, 2));
        let mut session = session_for(&platform, 4242, 17);

        let outcome = Injector::new(&platform, Path::new(PLUGINS), HookMode::Safe)
            .ensure_agent_running(&mut session, &mut String::new())
            .unwrap();

        let InjectOutcome::Pending(mut helper) = outcome else {
            panic!("expected pending helper");
        };
        assert!(session.capturing);
        assert_eq!(platform.launches()[0].args[1], "1");
        assert_eq!(helper.try_exit_code().unwrap(), None);
        assert_eq!(helper.try_exit_code().unwrap(), None);
        assert_eq!(helper.try_exit_code().unwrap(), Some(0));
    }

    #[test]
    fn open_process_failure_is_reported() {
        let platform = FakePlatform::new();
        let mut session = session_for(&platform, 99, 1);
        let err = Injector::new(&platform, Path::new(PLUGINS), HookMode::Direct)
            .ensure_agent_running(&mut session, &mut String::new())
            .unwrap_err();
        assert!(matches!(err, InjectError::OpenProcess { process_id: 99, .. }));
        assert!(session.events.is_empty());
        assert_eq!(session.capture_window, None::<WindowHandle>);
    }

    #[test]
    fn launch_failure_is_reported() {
        let platform = FakePlatform::new();
        platform.add_process(4242, Bitness::X64, "game.exe");
        let mut session = session_for(&platform, 4242, 17);
        let err = Injector::new(&platform, Path::new(PLUGINS), HookMode::Direct)
            .ensure_agent_running(&mut session, &mut String::new())
            .unwrap_err();
        assert!(matches!(err, InjectError::Launch { .. }));
        assert_eq!(platform.open_handles("OBS_KeepAlive4242"), 0);
    }

    #[test]
    fn same_image_is_not_relogged() {
        let platform = FakePlatform::new();
        platform.add_process(4242, Bitness::X64, "C:\\Games\\Game.exe");
        platform.agent_creates_event("OBS_RestartCapture4242");
        let mut session = session_for(&platform, 4242, 17);
        let mut last = "c:\\games\\game.exe".to_string();
        Injector::new(&platform, Path::new(PLUGINS), HookMode::Direct)
            .ensure_agent_running(&mut session, &mut last)
            .unwrap();
        assert_eq!(last, "c:\\games\\game.exe");
    }
}
