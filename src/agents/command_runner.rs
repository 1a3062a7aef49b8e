use crate::error::{DepbumpError, Result};
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// How a command is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// A program with discrete arguments, spawned without a shell.
    Program { program: String, args: Vec<String> },
    /// A user supplied command line, run through `sh -c`.
    Shell(String),
}

/// A command together with the directory it runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub line: CommandLine,
    pub working_dir: PathBuf,
}

impl CommandSpec {
    pub fn program<P: AsRef<Path>>(working_dir: P, program: &str, args: &[&str]) -> Self {
        Self {
            line: CommandLine::Program {
                program: program.to_string(),
                args: args.iter().map(|arg| arg.to_string()).collect(),
            },
            working_dir: working_dir.as_ref().to_path_buf(),
        }
    }

    pub fn shell<P: AsRef<Path>>(working_dir: P, command: &str) -> Self {
        Self {
            line: CommandLine::Shell(command.to_string()),
            working_dir: working_dir.as_ref().to_path_buf(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.line {
            CommandLine::Program { program, args } if args.is_empty() => f.write_str(program),
            CommandLine::Program { program, args } => write!(f, "{} {}", program, args.join(" ")),
            CommandLine::Shell(command) => f.write_str(command),
        }
    }
}

/// Result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `-1` when the process was killed by a signal.
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Runs external tools on behalf of the agents.
pub trait CommandRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Run a command and treat a non-zero exit as an error.
    fn run_checked(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let output = self.run(spec)?;
        if output.success() {
            return Ok(output);
        }

        Err(DepbumpError::CommandFailed {
            command: spec.to_string(),
            status: output.status,
            stderr: output.stderr.trim().to_string(),
        })
    }
}

/// CommandRunner backed by real processes, streaming stdout as it arrives.
#[derive(Debug, Default)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        log::info!("Executing: {}", spec);

        let mut command = match &spec.line {
            CommandLine::Program { program, args } => {
                let mut command = Command::new(program);
                command.args(args);
                command
            }
            CommandLine::Shell(line) => {
                let mut command = Command::new("sh");
                command.arg("-c").arg(line);
                command
            }
        };

        command
            .current_dir(&spec.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let spawn_error = |source| DepbumpError::CommandSpawn {
            command: spec.to_string(),
            source,
        };

        let mut child = command.spawn().map_err(spawn_error)?;

        // stderr is drained on its own thread so a chatty installer cannot
        // block on a full pipe while we read stdout.
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut buffer = Vec::new();
                if let Err(e) = stderr.read_to_end(&mut buffer) {
                    log::warn!("Failed to read command stderr: {}", e);
                }
                buffer
            })
        });

        // Tools may print bytes that are not UTF-8; decode lossily instead of
        // failing a command that exited cleanly.
        let mut stdout = Vec::new();
        if let Some(out) = child.stdout.take() {
            let mut reader = BufReader::new(out);
            let mut line = Vec::new();
            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        print!("{}", String::from_utf8_lossy(&line));
                        stdout.extend_from_slice(&line);
                    }
                    Err(e) => {
                        log::warn!("Failed to read output of '{}': {}", spec, e);
                        break;
                    }
                }
            }
        }

        let status = child.wait().map_err(spawn_error)?;
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();

        if !stderr.is_empty() {
            eprint!("{}", stderr);
        }

        Ok(CommandOutput {
            status: status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr,
        })
    }
}
