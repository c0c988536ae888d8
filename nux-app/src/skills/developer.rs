//! `developer` skill: read-only git and docker queries plus opening VS Code.

use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use nux_core::{CommandResult, NuxError, Skill, SkillContext, SkillMetadata};
use tracing::{debug, warn};

/// Output of a finished tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub stdout: String,
}

/// Runs external tools. Swapped out in tests.
pub trait ToolRunner: Send + Sync {
    /// Run to completion and capture stdout.
    fn run(&self, program: &str, args: &[&str], cwd: &std::path::Path) -> io::Result<ToolOutput>;

    /// Start without waiting.
    fn launch(&self, program: &str, args: &[&str], cwd: &std::path::Path) -> io::Result<()>;
}

pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], cwd: &std::path::Path) -> io::Result<ToolOutput> {
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .output()?;
        Ok(ToolOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }

    fn launch(&self, program: &str, args: &[&str], cwd: &std::path::Path) -> io::Result<()> {
        let mut child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        std::thread::spawn(move || {
            if let Err(e) = child.wait() {
                warn!("failed to reap child process: {e}");
            }
        });
        Ok(())
    }
}

pub struct DeveloperSkill {
    workspace: PathBuf,
    runner: Box<dyn ToolRunner>,
}

impl DeveloperSkill {
    pub fn new(workspace: PathBuf) -> Self {
        Self::with_runner(workspace, Box::new(SystemRunner))
    }

    pub fn with_runner(workspace: PathBuf, runner: Box<dyn ToolRunner>) -> Self {
        Self { workspace, runner }
    }

    fn run(&self, program: &str, args: &[&str]) -> nux_core::Result<ToolOutput> {
        debug!(program, ?args, "developer tool");
        self.runner
            .run(program, args, &self.workspace)
            .map_err(|e| tool_error(program, e))
    }

    fn git_status(&self) -> nux_core::Result<CommandResult> {
        let out = self.run("git", &["status", "--short"])?;
        if !out.success {
            return Err(NuxError::handler("Not a git repository"));
        }
        let status = out.stdout.trim();
        if status.is_empty() {
            return Ok(CommandResult::ok("Working tree clean").with_speak("Your working tree is clean"));
        }
        let changed = status.lines().count();
        Ok(CommandResult::ok(status.to_string())
            .with_speak(format!("You have {changed} files with changes")))
    }

    fn docker_list(&self) -> nux_core::Result<CommandResult> {
        let out = self.run("docker", &["ps", "--format", "{{.Names}}"])?;
        if !out.success {
            return Err(NuxError::handler("Docker is not available"));
        }
        let containers: Vec<&str> = out.stdout.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        if containers.is_empty() {
            return Ok(CommandResult::ok("No running containers").with_speak("No containers are running"));
        }
        Ok(CommandResult::ok(containers.join("\n"))
            .with_speak(format!("You have {} running containers", containers.len())))
    }

    fn open_vscode(&self, command: &str) -> nux_core::Result<CommandResult> {
        let target = extract_path(command).unwrap_or(".");
        self.runner
            .launch("code", &[target], &self.workspace)
            .map_err(|e| tool_error("code", e))?;
        Ok(CommandResult::ok(format!("Opening VS Code: {target}")).with_speak("Opening VS Code"))
    }
}

impl Skill for DeveloperSkill {
    fn describe(&self) -> SkillMetadata {
        SkillMetadata::new(
            "developer",
            "1.0.0",
            "NuxAI Team",
            "Developer tools: git, docker, IDE commands",
            &["git", "docker", "vs code", "open code"],
        )
    }

    fn execute(&self, command: &str, _ctx: &SkillContext) -> nux_core::Result<CommandResult> {
        let lower = command.to_lowercase();
        if lower.contains("git") && lower.contains("status") {
            self.git_status()
        } else if lower.contains("docker") && (lower.contains("list") || lower.contains("ps")) {
            self.docker_list()
        } else if lower.contains("vs code") || lower.contains("open code") {
            self.open_vscode(command)
        } else {
            Err(NuxError::handler("Unknown developer command"))
        }
    }
}

/// First word that looks like a path.
fn extract_path(command: &str) -> Option<&str> {
    command
        .split_whitespace()
        .find(|w| w.contains('/') || (w.contains('.') && w.len() > 1))
}

fn tool_error(program: &str, e: io::Error) -> NuxError {
    match e.kind() {
        io::ErrorKind::NotFound => NuxError::handler(format!("{program} is not installed")),
        _ => NuxError::handler(format!("{program} failed: {e}")),
    }
}
