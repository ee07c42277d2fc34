//! Display power and shutdown through the kiosk's shell scripts.

use std::{
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

const DISPLAY_STATE_SCRIPT: &str = "displaystate.sh";
const HIBERNATE_SCRIPT: &str = "hibernate.sh";
const WAKEUP_SCRIPT: &str = "wakeup.sh";
const SHUTDOWN_SCRIPT: &str = "shutdown.sh";

/// Exit code of the state script while the display is on.
const DISPLAY_ON_EXIT_CODE: i32 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    On,
    Off,
    QueryFailed,
}

pub trait PowerActions {
    fn query_display(&self) -> DisplayState;
    fn hibernate(&self);
    fn wake(&self);
    /// Fire and forget.
    fn shutdown(&self);
}

pub struct ShellPowerActions {
    scripts_dir: PathBuf,
}

impl ShellPowerActions {
    pub fn new(scripts_dir: impl AsRef<Path>) -> Self {
        Self {
            scripts_dir: scripts_dir.as_ref().to_path_buf(),
        }
    }

    fn command(&self, script: &str) -> Command {
        let mut command = Command::new("bash");
        command.arg(self.scripts_dir.join(script));
        command
    }

    /// Runs `script` to completion, blocking the event thread.
    fn run(&self, script: &str) -> std::io::Result<ExitStatus> {
        log_info!("Running {script}");
        self.command(script).status()
    }

    fn run_logged(&self, script: &str) {
        match self.run(script) {
            Ok(status) if status.success() => {}
            Ok(status) => log_warn!("{script} exited with {status}"),
            Err(err) => log_warn!("Failed to run {script}: {err}"),
        }
    }
}

impl PowerActions for ShellPowerActions {
    fn query_display(&self) -> DisplayState {
        match self.run(DISPLAY_STATE_SCRIPT) {
            Ok(status) => display_state_from_exit(status.code()),
            Err(err) => {
                log_warn!("Display state query failed: {err}");
                DisplayState::QueryFailed
            }
        }
    }

    fn hibernate(&self) {
        self.run_logged(HIBERNATE_SCRIPT);
    }

    fn wake(&self) {
        self.run_logged(WAKEUP_SCRIPT);
    }

    fn shutdown(&self) {
        log_info!("Shutdown requested by user, initiating shutdown...");
        if let Err(err) = self.command(SHUTDOWN_SCRIPT).spawn() {
            log_error!("Failed to start {SHUTDOWN_SCRIPT}: {err}");
        }
    }
}

/// A missing exit code means the script was killed by a signal.
fn display_state_from_exit(code: Option<i32>) -> DisplayState {
    match code {
        Some(DISPLAY_ON_EXIT_CODE) => DisplayState::On,
        Some(_) => DisplayState::Off,
        None => DisplayState::QueryFailed,
    }
}

#[cfg(test)]
#[derive(Debug)]
pub(crate) struct FakePower {
    pub(crate) state: std::cell::Cell<DisplayState>,
    pub(crate) calls: std::cell::RefCell<Vec<&'static str>>,
}

#[cfg(test)]
impl FakePower {
    pub(crate) fn new(state: DisplayState) -> Self {
        Self {
            state: std::cell::Cell::new(state),
            calls: std::cell::RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn count(&self, call: &str) -> usize {
        self.calls.borrow().iter().filter(|c| **c == call).count()
    }
}

#[cfg(test)]
impl PowerActions for FakePower {
    fn query_display(&self) -> DisplayState {
        self.calls.borrow_mut().push("query");
        self.state.get()
    }

    fn hibernate(&self) {
        self.calls.borrow_mut().push("hibernate");
        self.state.set(DisplayState::Off);
    }

    fn wake(&self) {
        self.calls.borrow_mut().push("wake");
        self.state.set(DisplayState::On);
    }

    fn shutdown(&self) {
        self.calls.borrow_mut().push("shutdown");
    }
}

#[cfg(test)]
impl PowerActions for std::rc::Rc<FakePower> {
    fn query_display(&self) -> DisplayState {
        self.as_ref().query_display()
    }

    fn hibernate(&self) {
        self.as_ref().hibernate()
    }

    fn wake(&self) {
        self.as_ref().wake()
    }

    fn shutdown(&self) {
        self.as_ref().shutdown()
    }
}
