use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// A fully described external command. Kept as plain data so tests can compare the exact
/// argument vectors we would have run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: PathBuf,
    /// Added on top of the inherited environment
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, current_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: current_dir.into(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Human readable form for log lines. Environment values are left out since they can
    /// carry paths or secrets.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How a process finished. `code` is `None` when it was killed by a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessExit {
    pub code: Option<i32>,
}

impl ProcessExit {
    pub const SUCCESS: ProcessExit = ProcessExit { code: Some(0) };

    pub fn with_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn describe(&self) -> String {
        match self.code {
            Some(code) => format!("code {code}"),
            None => "a signal".to_string(),
        }
    }
}

/// Runs external tools to completion.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Errors only when the process couldn't be started or waited on, a non-zero exit is
    /// reported through [`ProcessExit`].
    async fn run(&self, invocation: &Invocation) -> anyhow::Result<ProcessExit>;

    /// Whether `program` can be found on `PATH`.
    async fn is_available(&self, program: &str) -> bool;
}

/// Spawns real processes, streaming their output to our stdout/stderr prefixed with the
/// program name.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemProcessRunner;

#[async_trait]
impl ProcessRunner for SystemProcessRunner {
    async fn run(&self, invocation: &Invocation) -> anyhow::Result<ProcessExit> {
        let name = invocation.program.clone();

        let mut child = Command::new(&invocation.program)
            .kill_on_drop(true)
            .args(&invocation.args)
            .current_dir(&invocation.current_dir)
            .envs(invocation.env.iter().map(|(k, v)| (k, v)))
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()?;

        let child_id = child
            .id()
            .ok_or_else(|| anyhow::anyhow!("Failed to get child process id"))?;

        tracing::debug!("{name} started. {name} process id: {child_id:?}");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("Failed to capture {name} stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow::anyhow!("Failed to capture {name} stderr"))?;

        let mut stdout_reader = BufReader::new(stdout).lines();
        let mut stderr_reader = BufReader::new(stderr).lines();

        let stdout_task = tokio::spawn({
            let name = name.clone();
            async move {
                while let Some(line) = stdout_reader.next_line().await.unwrap_or(None) {
                    println!("{name} | {line}");
                }
            }
        });

        let stderr_task = tokio::spawn({
            let name = name.clone();
            async move {
                while let Some(line) = stderr_reader.next_line().await.unwrap_or(None) {
                    eprintln!("{name} | {line}");
                }
            }
        });

        let status = child.wait().await?;

        // Drain whatever output is left before reporting back so logs stay in order
        let _ = tokio::join!(stdout_task, stderr_task);

        Ok(ProcessExit {
            code: status.code(),
        })
    }

    async fn is_available(&self, program: &str) -> bool {
        Command::new("which")
            .arg(program)
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }
}
