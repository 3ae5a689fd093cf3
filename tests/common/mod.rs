//! Shared test doubles: a recording process launcher and a scripted virtual clock.

#![allow(dead_code)]

use nvda_portable_builder::pipeline::{
    Clock, CommandOutput, CommandSpec, Error, PipelineState, ProcessLauncher, Result, Settings,
    SettingsBuilder,
};
use std::{
    future::Future,
    path::Path,
    sync::Mutex,
    time::Duration,
};

/// A call received by [`FakeLauncher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Run(CommandSpec),
    Spawn(CommandSpec),
    Terminate(String),
    Privileged(CommandSpec),
}

/// Records every call and never starts a real process.
#[derive(Debug, Default)]
pub struct FakeLauncher {
    calls: Mutex<Vec<Call>>,
    run_output: Mutex<CommandOutput>,
    fail_spawn: bool,
    fail_terminate: bool,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            run_output: Mutex::new(CommandOutput {
                code: Some(0),
                success: true,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Makes `run` report the given exit code and stderr.
    pub fn with_run_failure(self, code: i32, stderr: &str) -> Self {
        *self.run_output.lock().unwrap() = CommandOutput {
            code: Some(code),
            success: false,
            stdout: String::new(),
            stderr: stderr.to_string(),
        };
        self
    }

    /// Makes `spawn` and `run_privileged` fail as if the program could not be started.
    pub fn failing_spawn(mut self) -> Self {
        self.fail_spawn = true;
        self
    }

    /// Makes `terminate` fail as if the process killer could not be run.
    pub fn failing_terminate(mut self) -> Self {
        self.fail_terminate = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn launch(&self, call: Call, spec: &CommandSpec) -> Result<()> {
        self.record(call);
        if self.fail_spawn {
            return Err(Error::CommandFailed {
                command: spec.display(),
                error: std::io::Error::new(std::io::ErrorKind::NotFound, "no such program"),
            });
        }
        Ok(())
    }
}

impl ProcessLauncher for FakeLauncher {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.record(Call::Run(spec.clone()));
        Ok(self.run_output.lock().unwrap().clone())
    }

    async fn spawn(&self, spec: &CommandSpec) -> Result<()> {
        self.launch(Call::Spawn(spec.clone()), spec)
    }

    async fn terminate(&self, image_name: &str) -> Result<()> {
        self.record(Call::Terminate(image_name.to_string()));
        if self.fail_terminate {
            return Err(Error::CommandFailed {
                command: format!("taskkill /F /IM {}", image_name),
                error: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied"),
            });
        }
        Ok(())
    }

    async fn run_privileged(&self, spec: &CommandSpec) -> Result<()> {
        self.launch(Call::Privileged(spec.clone()), spec)
    }
}

type Event = Box<dyn FnOnce() + Send>;

/// Virtual clock that fires scheduled events as sleeps move time past them.
#[derive(Default)]
pub struct ScriptedClock {
    elapsed: Mutex<Duration>,
    events: Mutex<Vec<(Duration, Event)>>,
}

impl ScriptedClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `event` once virtual time reaches `when`.
    pub fn at(self, when: Duration, event: impl FnOnce() + Send + 'static) -> Self {
        self.events.lock().unwrap().push((when, Box::new(event)));
        self
    }
}

impl Clock for ScriptedClock {
    fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        let now = {
            let mut elapsed = self.elapsed.lock().unwrap();
            *elapsed += duration;
            *elapsed
        };

        let due: Vec<Event> = {
            let mut events = self.events.lock().unwrap();
            let (due, pending): (Vec<_>, Vec<_>) =
                events.drain(..).partition(|(when, _)| *when <= now);
            *events = pending;
            due.into_iter().map(|(_, event)| event).collect()
        };
        for event in due {
            event();
        }

        std::future::ready(())
    }
}

/// Settings rooted in `root` with no settle times.
pub fn settings_builder(root: &Path) -> SettingsBuilder {
    SettingsBuilder::new()
        .work_dir(root.join("work"))
        .user_config_dir(root.join("appdata").join("nvda"))
        .install_candidates(vec![root.join("Program Files").join("NVDA").join("nvda.exe")])
        .install_settle(Duration::ZERO)
        .terminate_settle(Duration::ZERO)
        .verify_settle(Duration::ZERO)
        .connect_timeout(Duration::from_secs(2))
}

pub fn settings(root: &Path) -> Settings {
    settings_builder(root).build().unwrap()
}

pub async fn state(root: &Path) -> PipelineState {
    PipelineState::load(root.join("state.json"), None).await.unwrap()
}

/// Writes a small non-empty file, creating parent directories.
pub fn touch(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}
