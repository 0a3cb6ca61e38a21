//! Handoff to the real command.

use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::path::Path;
use std::process::Command;

use anyhow::anyhow;

/// Name the binary is installed under; invoking it directly names no host.
pub const BIN_NAME: &str = "kexec";

/// Host identity from the invocation name, i.e. the symlink's base name.
pub fn host_from_invocation(argv0: &OsStr) -> Option<String> {
    let name = Path::new(argv0).file_name()?.to_str()?;
    if name == BIN_NAME {
        None
    } else {
        Some(name.to_string())
    }
}

/// Replace the current process with `command`.
///
/// Only returns on failure, with the error to report.
#[cfg(unix)]
pub fn handoff(command: &[OsString]) -> anyhow::Error {
    use std::os::unix::process::CommandExt;

    let Some((program, args)) = command.split_first() else {
        return anyhow!("no command to run");
    };

    // exec skips our buffered output, so push verbose lines out first
    let _ = std::io::stdout().flush();

    let err = Command::new(program).args(args).exec();
    anyhow::Error::new(err).context(format!("exec {}", program.to_string_lossy()))
}

/// Run `command` as a child and exit with its status.
#[cfg(not(unix))]
pub fn handoff(command: &[OsString]) -> anyhow::Error {
    let Some((program, args)) = command.split_first() else {
        return anyhow!("no command to run");
    };

    let _ = std::io::stdout().flush();

    match Command::new(program).args(args).status() {
        Ok(status) => std::process::exit(status.code().unwrap_or(1)),
        Err(err) => anyhow::Error::new(err).context(format!("exec {}", program.to_string_lossy())),
    }
}
