//! Locating and running rustc.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Poll interval while waiting on a rustc child.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Handle on the rustc used for validation.
#[derive(Debug, Clone)]
pub struct ToolchainManager {
    /// Path to rustc
    rustc_path: PathBuf,

    /// `rustc --version` output, empty when not queried
    version: String,
}

/// Output of one finished rustc run.
#[derive(Debug)]
pub struct ToolchainOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Outcome of a bounded rustc run.
#[derive(Debug)]
pub enum RunOutcome {
    Finished(ToolchainOutput),
    TimedOut,
}

impl ToolchainManager {
    /// Detect rustc on PATH and record its version.
    pub fn new() -> Result<Self> {
        let rustc_path = Self::find_rustc()?;
        let version = Self::get_rustc_version(&rustc_path)?;
        tracing::debug!("Using {} ({})", rustc_path.display(), version);

        Ok(Self {
            rustc_path,
            version,
        })
    }

    /// Use an explicit compiler path without running it.
    pub fn from_path(rustc_path: impl Into<PathBuf>) -> Self {
        Self {
            rustc_path: rustc_path.into(),
            version: String::new(),
        }
    }

    /// Resolve the toolchain from an optional configured path.
    pub fn resolve(configured: Option<&Path>) -> Result<Self> {
        match configured {
            Some(path) => Ok(Self::from_path(path)),
            None => Self::new(),
        }
    }

    /// Get the rustc path.
    pub fn rustc_path(&self) -> &Path {
        &self.rustc_path
    }

    /// Get the toolchain version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Run rustc with `args` in `cwd`, killing it after `timeout`.
    ///
    /// Stdout and stderr are drained on helper threads so a chatty
    /// compiler cannot block on a full pipe.
    pub fn run(&self, args: &[String], cwd: &Path, timeout: Duration) -> Result<RunOutcome> {
        tracing::debug!("{} {}", self.rustc_path.display(), args.join(" "));

        let mut child = Command::new(&self.rustc_path)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::Toolchain(format!(
                    "Failed to run {}: {}",
                    self.rustc_path.display(),
                    e
                ))
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let Some(status) = wait_timeout(&mut child, timeout)? else {
            return Ok(RunOutcome::TimedOut);
        };

        Ok(RunOutcome::Finished(ToolchainOutput {
            status,
            stdout: join_reader(stdout),
            stderr: join_reader(stderr),
        }))
    }

    fn find_rustc() -> Result<PathBuf> {
        which::which("rustc").map_err(|_| Error::Toolchain("rustc not found in PATH".to_string()))
    }

    fn get_rustc_version(rustc: &Path) -> Result<String> {
        let output = Command::new(rustc)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::Toolchain(format!("Failed to run rustc: {}", e)))?;

        if !output.status.success() {
            return Err(Error::Toolchain("Failed to get rustc version".to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Wait for `child`, returning `None` if it was killed on timeout.
fn wait_timeout(child: &mut Child, timeout: Duration) -> Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            if let Err(e) = child.kill() {
                tracing::warn!("Failed to kill timed out rustc: {}", e);
            }
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn drain<R>(pipe: Option<R>) -> Option<thread::JoinHandle<String>>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            if let Err(e) = pipe.read_to_end(&mut buf) {
                tracing::debug!("Failed to read rustc output: {}", e);
            }
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join_reader(handle: Option<thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toolchain_detection() {
        if which::which("rustc").is_err() {
            return;
        }
        let manager = ToolchainManager::new().unwrap();
        assert!(manager.version().starts_with("rustc"));
    }

    #[test]
    fn test_missing_compiler() {
        let manager = ToolchainManager::from_path("/nonexistent/typeforge-rustc");
        let temp = tempfile::TempDir::new().unwrap();
        let err = manager
            .run(&[], temp.path(), Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, Error::Toolchain(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::TempDir::new().unwrap();
        let script = temp.path().join("slow-rustc");
        std::fs::write(&script, "#!/bin/sh\nexec sleep 5\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let manager = ToolchainManager::from_path(&script);
        let start = Instant::now();
        let outcome = manager
            .run(&[], temp.path(), Duration::from_millis(200))
            .unwrap();
        assert!(matches!(outcome, RunOutcome::TimedOut));
        assert!(start.elapsed() < Duration::from_secs(4));
    }
}
