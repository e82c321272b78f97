//! Platform-specific helpers for locating executables.

use std::path::PathBuf;

/// Gets the platform-appropriate Git command name.
///
/// - **Windows**: `git.exe`
/// - **Unix-like**: `git`, resolved through `PATH`
#[must_use]
pub const fn get_git_command() -> &'static str {
    if cfg!(windows) {
        "git.exe"
    } else {
        "git"
    }
}

/// Resolves a program name to the executable that would run.
///
/// Paths containing a separator are returned unchanged so a command configured
/// as `./scripts/install.sh` is run from the working directory rather than
/// looked up on `PATH`.
pub fn resolve_program(program: &str) -> Option<PathBuf> {
    if program.contains('/') || program.contains('\\') {
        return Some(PathBuf::from(program));
    }
    which::which(program).ok()
}
