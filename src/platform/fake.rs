//! Scripted in-memory platform for unit tests.
//!
//! Simulates windows, processes, named events, shared memory and inject
//! helpers. Clones share one world, so a test keeps a clone to play the agent's
//! side (signal events, publish the descriptor, close windows) while the engine
//! owns another.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use super::{
    Bitness, HelperProcess, Platform, PlatformError, SyncEvent, TargetProcess, WindowHandle,
    WindowOwner,
};
use crate::inject::InjectionRequest;

const ERROR_FILE_NOT_FOUND: u32 = 2;
const ERROR_ACCESS_DENIED: u32 = 5;
const ERROR_INVALID_PARAMETER: u32 = 87;
const ERROR_INVALID_WINDOW_HANDLE: u32 = 1400;

#[derive(Default)]
struct EventState {
    signaled: bool,
    signals: u32,
    host_handles: u32,
    agent_owned: bool,
}

struct FakeWindow {
    class: String,
    owner: Option<WindowOwner>,
}

#[derive(Default)]
struct World {
    next_window: isize,
    windows: HashMap<WindowHandle, FakeWindow>,
    foreground: Option<WindowHandle>,
    processes: HashMap<u32, (Bitness, String)>,
    open_processes: usize,
    events: HashMap<String, EventState>,
    memory: HashMap<String, Vec<u8>>,
    helpers: VecDeque<HelperScript>,
    launches: Vec<InjectionRequest>,
    /// Tags whose events `create_event` refuses to create.
    denied_tags: Vec<String>,
}

/// How a scripted helper process behaves.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HelperScript {
    exit_code: i32,
    polls_before_exit: u32,
}

impl HelperScript {
    /// Exits with `code` as soon as anyone looks.
    pub(crate) fn exits(code: i32) -> Self {
        Self::exits_after(code, 0)
    }

    /// Reports "still running" for `polls` non-blocking checks, then exits.
    pub(crate) fn exits_after(code: i32, polls: u32) -> Self {
        Self {
            exit_code: code,
            polls_before_exit: polls,
        }
    }
}

#[derive(Clone, Default)]
pub(crate) struct FakePlatform {
    world: Rc<RefCell<World>>,
}

impl FakePlatform {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // -- world setup -------------------------------------------------------

    pub(crate) fn add_window(&self, class: &str, owner: WindowOwner) -> WindowHandle {
        self.insert_window(class, Some(owner))
    }

    /// A window whose owning process cannot be resolved.
    pub(crate) fn add_orphan_window(&self, class: &str) -> WindowHandle {
        self.insert_window(class, None)
    }

    fn insert_window(&self, class: &str, owner: Option<WindowOwner>) -> WindowHandle {
        let mut world = self.world.borrow_mut();
        world.next_window += 0x10;
        let handle = WindowHandle(0x1000 + world.next_window);
        world.windows.insert(
            handle,
            FakeWindow {
                class: class.to_string(),
                owner,
            },
        );
        handle
    }

    pub(crate) fn close_window(&self, window: WindowHandle) {
        self.world.borrow_mut().windows.remove(&window);
    }

    pub(crate) fn set_foreground(&self, window: Option<WindowHandle>) {
        self.world.borrow_mut().foreground = window;
    }

    pub(crate) fn add_process(&self, process_id: u32, bitness: Bitness, image: &str) {
        self.world
            .borrow_mut()
            .processes
            .insert(process_id, (bitness, image.to_string()));
    }

    /// Makes `create_event` fail for every name starting with `tag`.
    pub(crate) fn deny_event_creation(&self, tag: &str) {
        self.world.borrow_mut().denied_tags.push(tag.to_string());
    }

    pub(crate) fn script_helper(&self, script: HelperScript) {
        self.world.borrow_mut().helpers.push_back(script);
    }

    // -- agent side ----------------------------------------------------------

    pub(crate) fn agent_creates_event(&self, name: &str) {
        self.world
            .borrow_mut()
            .events
            .entry(name.to_string())
            .or_default()
            .agent_owned = true;
    }

    pub(crate) fn agent_signals(&self, name: &str) {
        let mut world = self.world.borrow_mut();
        let event = world.events.entry(name.to_string()).or_default();
        event.agent_owned = true;
        event.signaled = true;
    }

    pub(crate) fn agent_writes_memory(&self, name: &str, bytes: Vec<u8>) {
        self.world
            .borrow_mut()
            .memory
            .insert(name.to_string(), bytes);
    }

    // -- observations --------------------------------------------------------

    pub(crate) fn launches(&self) -> Vec<InjectionRequest> {
        self.world.borrow().launches.clone()
    }

    /// How many times the host has set `name`.
    pub(crate) fn signal_count(&self, name: &str) -> u32 {
        self.world
            .borrow()
            .events
            .get(name)
            .map_or(0, |e| e.signals)
    }

    /// Host handles currently open on `name`.
    pub(crate) fn open_handles(&self, name: &str) -> u32 {
        self.world
            .borrow()
            .events
            .get(name)
            .map_or(0, |e| e.host_handles)
    }

    pub(crate) fn total_open_handles(&self) -> u32 {
        self.world
            .borrow()
            .events
            .values()
            .map(|e| e.host_handles)
            .sum()
    }

    pub(crate) fn open_process_handles(&self) -> usize {
        self.world.borrow().open_processes
    }

    fn event_handle(&self, name: &str) -> FakeEvent {
        self.world
            .borrow_mut()
            .events
            .entry(name.to_string())
            .or_default()
            .host_handles += 1;
        FakeEvent {
            world: self.world.clone(),
            name: name.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

pub(crate) struct FakeEvent {
    world: Rc<RefCell<World>>,
    name: String,
}

impl SyncEvent for FakeEvent {
    fn signal(&self) -> Result<(), PlatformError> {
        let mut world = self.world.borrow_mut();
        let event = world.events.entry(self.name.clone()).or_default();
        event.signaled = true;
        event.signals += 1;
        Ok(())
    }

    fn poll(&self) -> Result<bool, PlatformError> {
        let mut world = self.world.borrow_mut();
        let event = world.events.entry(self.name.clone()).or_default();
        Ok(std::mem::take(&mut event.signaled))
    }
}

impl Drop for FakeEvent {
    fn drop(&mut self) {
        if let Some(event) = self.world.borrow_mut().events.get_mut(&self.name) {
            event.host_handles -= 1;
        }
    }
}

pub(crate) struct FakeProcess {
    world: Rc<RefCell<World>>,
    bitness: Bitness,
    image: String,
}

impl TargetProcess for FakeProcess {
    fn bitness(&self) -> Result<Bitness, PlatformError> {
        Ok(self.bitness)
    }

    fn image_path(&self) -> Option<String> {
        Some(self.image.clone())
    }
}

impl Drop for FakeProcess {
    fn drop(&mut self) {
        self.world.borrow_mut().open_processes -= 1;
    }
}

#[derive(Debug)]
pub(crate) struct FakeHelper {
    script: HelperScript,
    polls: u32,
}

impl HelperProcess for FakeHelper {
    fn try_exit_code(&mut self) -> Result<Option<i32>, PlatformError> {
        if self.polls >= self.script.polls_before_exit {
            return Ok(Some(self.script.exit_code));
        }
        self.polls += 1;
        Ok(None)
    }

    fn wait_exit_code(&mut self) -> Result<i32, PlatformError> {
        Ok(self.script.exit_code)
    }
}

// ---------------------------------------------------------------------------
// Platform impl
// ---------------------------------------------------------------------------

impl Platform for FakePlatform {
    type Event = FakeEvent;
    type Process = FakeProcess;
    type Helper = FakeHelper;

    fn find_window(&self, class_name: &str) -> Option<WindowHandle> {
        self.world
            .borrow()
            .windows
            .iter()
            .filter(|(_, w)| w.class == class_name)
            .map(|(h, _)| *h)
            .min_by_key(|h| h.0)
    }

    fn foreground_window(&self) -> Option<WindowHandle> {
        self.world.borrow().foreground
    }

    fn window_owner(&self, window: WindowHandle) -> Result<WindowOwner, PlatformError> {
        self.world
            .borrow()
            .windows
            .get(&window)
            .and_then(|w| w.owner)
            .ok_or(PlatformError::Os {
                call: "GetWindowThreadProcessId",
                code: ERROR_INVALID_WINDOW_HANDLE,
            })
    }

    fn is_window(&self, window: WindowHandle) -> bool {
        self.world.borrow().windows.contains_key(&window)
    }

    fn open_process(&self, process_id: u32) -> Result<FakeProcess, PlatformError> {
        let mut world = self.world.borrow_mut();
        let (bitness, image) =
            world
                .processes
                .get(&process_id)
                .cloned()
                .ok_or(PlatformError::Os {
                    call: "OpenProcess",
                    code: ERROR_INVALID_PARAMETER,
                })?;
        world.open_processes += 1;
        Ok(FakeProcess {
            world: self.world.clone(),
            bitness,
            image,
        })
    }

    fn open_event(&self, name: &str) -> Result<Option<FakeEvent>, PlatformError> {
        let exists = self
            .world
            .borrow()
            .events
            .get(name)
            .is_some_and(|e| e.agent_owned || e.host_handles > 0);
        Ok(exists.then(|| self.event_handle(name)))
    }

    fn create_event(&self, name: &str) -> Result<FakeEvent, PlatformError> {
        let denied = self
            .world
            .borrow()
            .denied_tags
            .iter()
            .any(|tag| name.starts_with(tag.as_str()));
        if denied {
            return Err(PlatformError::Os {
                call: "CreateEventW",
                code: ERROR_ACCESS_DENIED,
            });
        }
        Ok(self.event_handle(name))
    }

    fn read_shared_memory(&self, name: &str, len: usize) -> Result<Vec<u8>, PlatformError> {
        let world = self.world.borrow();
        let bytes = world.memory.get(name).ok_or(PlatformError::Os {
            call: "OpenFileMappingW",
            code: ERROR_FILE_NOT_FOUND,
        })?;
        Ok(bytes[..len.min(bytes.len())].to_vec())
    }

    fn spawn_helper(&self, request: &InjectionRequest) -> Result<FakeHelper, PlatformError> {
        let mut world = self.world.borrow_mut();
        let script = world.helpers.pop_front().ok_or(PlatformError::Os {
            call: "CreateProcessW",
            code: ERROR_FILE_NOT_FOUND,
        })?;
        world.launches.push(request.clone());
        Ok(FakeHelper { script, polls: 0 })
    }
}
