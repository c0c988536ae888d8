//! `DesktopPlatform`: `PlatformActions` backed by desktop command-line tools.
//!
//! Every action spawns its tool and returns as soon as the process is
//! running. A reaper thread waits on the child so nothing is left as a
//! zombie. A missing tool surfaces as a handler error naming the program.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use chrono::Local;
use nux_core::builtins::{PlatformActions, SystemAction, VolumeAction};
use nux_core::{NuxError, Result};
use tracing::{debug, info, warn};

const SEARCH_URL: &str = "https://duckduckgo.com/?q=";
const VOLUME_STEP: &str = "10%";

pub struct DesktopPlatform {
    /// Directory for spoken file create/delete commands.
    files_dir: PathBuf,
    screenshot_dir: PathBuf,
}

impl DesktopPlatform {
    pub fn new(files_dir: PathBuf, screenshot_dir: PathBuf) -> Self {
        Self {
            files_dir,
            screenshot_dir,
        }
    }

    /// Files in `$HOME`, screenshots in `$HOME/Pictures/Screenshots`.
    pub fn from_home() -> Self {
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let screenshots = home.join("Pictures").join("Screenshots");
        Self::new(home, screenshots)
    }

    fn user_file(&self, name: &str) -> Result<PathBuf> {
        let name = name.trim();
        let plain = Path::new(name)
            .file_name()
            .is_some_and(|f| f == std::ffi::OsStr::new(name));
        if name.is_empty() || !plain {
            return Err(NuxError::InvalidParameter {
                name: "filename".into(),
                reason: format!("`{name}` is not a plain file name"),
            });
        }
        Ok(self.files_dir.join(name))
    }
}

impl PlatformActions for DesktopPlatform {
    fn open_application(&self, name: &str) -> Result<String> {
        let program = resolve_application(name);
        spawn_detached(&program, &[]).map_err(|e| launch_error(&program, e))?;
        Ok(program)
    }

    fn open_first_available(&self, candidates: &[&str]) -> Result<Option<String>> {
        for program in candidates {
            match spawn_detached(program, &[]) {
                Ok(()) => return Ok(Some(program.to_string())),
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(launch_error(program, e)),
            }
        }
        Ok(None)
    }

    fn take_screenshot(&self) -> Result<Option<PathBuf>> {
        fs::create_dir_all(&self.screenshot_dir)?;
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = self.screenshot_dir.join(format!("nux_screenshot_{stamp}.png"));
        let target = path.to_string_lossy().into_owned();
        let target = target.as_str();

        let tools: [(&str, Vec<&str>); 3] = [
            ("gnome-screenshot", vec!["-f", target]),
            ("scrot", vec![target]),
            ("import", vec!["-window", "root", target]),
        ];
        for (program, args) in &tools {
            match spawn_detached(program, args) {
                Ok(()) => {
                    info!(tool = program, path = %path.display(), "screenshot started");
                    return Ok(Some(path));
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(launch_error(program, e)),
            }
        }
        Ok(None)
    }

    fn set_volume(&self, level: u8) -> Result<()> {
        let level = format!("{level}%");
        pactl(&["set-sink-volume", "@DEFAULT_SINK@", level.as_str()])
    }

    fn adjust_volume(&self, action: VolumeAction) -> Result<()> {
        let up = format!("+{VOLUME_STEP}");
        let down = format!("-{VOLUME_STEP}");
        let args: [&str; 3] = match action {
            VolumeAction::Increase => ["set-sink-volume", "@DEFAULT_SINK@", up.as_str()],
            VolumeAction::Decrease => ["set-sink-volume", "@DEFAULT_SINK@", down.as_str()],
            VolumeAction::Mute => ["set-sink-mute", "@DEFAULT_SINK@", "1"],
            VolumeAction::Unmute => ["set-sink-mute", "@DEFAULT_SINK@", "0"],
        };
        pactl(&args)
    }

    fn system_control(&self, action: SystemAction) -> Result<()> {
        let verb = match action {
            SystemAction::Shutdown => "poweroff",
            SystemAction::Restart => "reboot",
            SystemAction::Sleep => "suspend",
        };
        warn!(verb, "system power action requested");
        spawn_detached("systemctl", &[verb]).map_err(|e| launch_error("systemctl", e))
    }

    fn web_search(&self, query: &str) -> Result<()> {
        let url = search_url(query);
        spawn_detached("xdg-open", &[url.as_str()]).map_err(|e| launch_error("xdg-open", e))
    }

    fn create_file(&self, name: &str) -> Result<PathBuf> {
        let path = self.user_file(name)?;
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => {
                    NuxError::handler(format!("{} already exists", path.display()))
                }
                _ => NuxError::Io(e),
            })?;
        info!(path = %path.display(), "file created");
        Ok(path)
    }

    fn delete_file(&self, name: &str) -> Result<PathBuf> {
        let path = self.user_file(name)?;
        fs::remove_file(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                NuxError::handler(format!("{} does not exist", path.display()))
            }
            _ => NuxError::Io(e),
        })?;
        info!(path = %path.display(), "file deleted");
        Ok(path)
    }
}

/// Spoken application names mapped to executables; anything else is used as-is.
fn resolve_application(spoken: &str) -> String {
    let spoken = spoken.trim().to_lowercase();
    let program = match spoken.as_str() {
        "browser" | "the browser" | "web browser" => "firefox",
        "chrome" => "google-chrome",
        "terminal" => "gnome-terminal",
        "files" | "file manager" => "nautilus",
        "calculator" => "gnome-calculator",
        other => return other.replace(' ', "-"),
    };
    program.to_string()
}

fn spawn_detached(program: &str, args: &[&str]) -> io::Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    debug!(program, pid = child.id(), "spawned");
    std::thread::spawn(move || {
        if let Err(e) = child.wait() {
            warn!("failed to reap child process: {e}");
        }
    });
    Ok(())
}

fn pactl(args: &[&str]) -> Result<()> {
    spawn_detached("pactl", args).map_err(|e| launch_error("pactl", e))
}

fn launch_error(program: &str, e: io::Error) -> NuxError {
    match e.kind() {
        io::ErrorKind::NotFound => NuxError::handler(format!("{program} is not installed")),
        _ => NuxError::handler(format!("failed to launch {program}: {e}")),
    }
}

/// Search URL for `query`, percent-encoded.
fn search_url(query: &str) -> String {
    format!("{SEARCH_URL}{}", urlencoding::encode(query.trim()))
}
