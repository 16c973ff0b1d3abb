//! Process launching for the inference engine.
//!
//! The invoker talks to the engine only through [`ProcessLauncher`] and
//! [`EngineProcess`], so tests can substitute an in-memory engine.

use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tracing::debug;

/// Everything a finished engine process left behind.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub success: bool,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    /// Output of a process that exited with `code`.
    pub fn exited(code: i32, stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            code: Some(code),
            success: code == 0,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

impl From<std::process::Output> for ProcessOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            code: output.status.code(),
            success: output.status.success(),
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

/// Starts one fresh engine process per call.
pub trait ProcessLauncher: Send + Sync {
    /// Program name, for error messages.
    fn program(&self) -> &str;

    /// Spawn the engine. Must fail before any stream I/O if the engine
    /// cannot be started.
    fn spawn(&self) -> io::Result<Box<dyn EngineProcess>>;
}

/// A running engine process.
#[async_trait]
pub trait EngineProcess: Send {
    /// Write `input` to the process, close its input stream, then drain
    /// both output streams until the process exits.
    async fn communicate(self: Box<Self>, input: Vec<u8>) -> io::Result<ProcessOutput>;
}

/// Launches the engine as an OS subprocess.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandLauncher {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
        }
    }

    /// Run the engine from `dir` instead of the service's working directory.
    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }
}

impl From<&crate::config::EngineConfig> for CommandLauncher {
    fn from(config: &crate::config::EngineConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
            .with_working_dir(config.working_dir.clone())
    }
}

impl ProcessLauncher for CommandLauncher {
    fn program(&self) -> &str {
        &self.program
    }

    fn spawn(&self) -> io::Result<Box<dyn EngineProcess>> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A dropped request must not leave the engine running.
            .kill_on_drop(true);

        if let Some(ref dir) = self.working_dir {
            command.current_dir(dir);
        }

        let child = command.spawn()?;
        debug!(pid = ?child.id(), program = %self.program, "Spawned inference engine");
        Ok(Box::new(ChildProcess { child }))
    }
}

struct ChildProcess {
    child: Child,
}

#[async_trait]
impl EngineProcess for ChildProcess {
    async fn communicate(mut self: Box<Self>, input: Vec<u8>) -> io::Result<ProcessOutput> {
        let stdin = self.child.stdin.take();
        let writer = write_and_close(stdin, input);

        // Drain stdout/stderr while writing so neither side can block the other.
        let (written, output) = tokio::join!(writer, self.child.wait_with_output());
        let output = output?;
        written?;

        Ok(output.into())
    }
}

async fn write_and_close(stdin: Option<ChildStdin>, input: Vec<u8>) -> io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };

    let result = async {
        stdin.write_all(&input).await?;
        stdin.shutdown().await
    }
    .await;
    drop(stdin);

    match result {
        // The engine may exit without reading its input; its exit status decides.
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            debug!("Engine closed its input early");
            Ok(())
        }
        other => other,
    }
}
