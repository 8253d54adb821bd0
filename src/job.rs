//! Synchronous subprocess execution.
//!
//! A job is an argv list (`argv[0]` is the executable) handed straight to
//! the OS: no shell, no globbing. Every outcome is folded into an integer
//! status so failures never cross this boundary as errors.

use std::process::{Command, ExitStatus};

/// Status reported when the executable could not be started.
pub const SPAWN_FAILURE: i32 = 127;

/// Base added to the signal number when a child was killed by a signal.
pub const SIGNAL_BASE: i32 = 128;

/// Runs one command and returns its exit status.
///
/// Implementations must be callable from several threads at once.
pub trait JobRunner: Sync {
    fn run(&self, argv: &[String]) -> i32;
}

/// Spawns real child processes, inheriting stdio.
#[derive(Debug, Default, Clone, Copy)]
pub struct Subprocess;

impl JobRunner for Subprocess {
    fn run(&self, argv: &[String]) -> i32 {
        let Some((program, args)) = argv.split_first() else {
            return SPAWN_FAILURE;
        };

        match Command::new(program).args(args).status() {
            Ok(status) => decode_status(status),
            Err(_) => SPAWN_FAILURE,
        }
    }
}

/// Turns an [`ExitStatus`] into a plain integer.
///
/// Normal exits keep their code; signal terminations map to
/// `SIGNAL_BASE + signal`; anything else becomes `1`.
pub fn decode_status(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return SIGNAL_BASE + signal;
        }
    }

    1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_argv_is_a_spawn_failure() {
        assert_eq!(Subprocess.run(&[]), SPAWN_FAILURE);
    }

    #[test]
    fn test_missing_executable_is_nonzero() {
        let status = Subprocess.run(&argv(&["kiln-definitely-not-a-real-compiler"]));
        assert_eq!(status, SPAWN_FAILURE);
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_passes_through() {
        assert_eq!(Subprocess.run(&argv(&["sh", "-c", "exit 0"])), 0);
        assert_eq!(Subprocess.run(&argv(&["sh", "-c", "exit 7"])), 7);
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_termination_is_normalized() {
        let status = Subprocess.run(&argv(&["sh", "-c", "kill -9 $$"]));
        assert_eq!(status, SIGNAL_BASE + 9);
    }

    #[cfg(unix)]
    #[test]
    fn test_decode_status_from_raw() {
        use std::os::unix::process::ExitStatusExt;
        assert_eq!(decode_status(ExitStatus::from_raw(3 << 8)), 3);
        assert_eq!(decode_status(ExitStatus::from_raw(15)), SIGNAL_BASE + 15);
    }
}
