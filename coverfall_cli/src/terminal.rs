//! Terminal detection and capability utilities

use is_terminal::IsTerminal;
use std::env;
use std::io::{stderr, stdout};

/// Check if stdout is connected to an interactive terminal
pub fn is_interactive() -> bool {
    if !stdout().is_terminal() {
        return false;
    }

    // CI environments might have a TTY but shouldn't be interactive
    if is_ci_environment() {
        return false;
    }

    if env::var("DEBIAN_FRONTEND").unwrap_or_default() == "noninteractive" {
        return false;
    }

    true
}

/// Check if the terminal supports ANSI escape codes for colors and progress bars
pub fn supports_ansi() -> bool {
    if !is_interactive() {
        return false;
    }

    let term = env::var("TERM").unwrap_or_default();
    if term == "dumb" || term.is_empty() {
        return false;
    }

    #[cfg(windows)]
    {
        if env::var("WT_SESSION").is_ok() {
            return true;
        }
        if env::var("ConEmuANSI").unwrap_or_default() == "ON" {
            return true;
        }
        // Assume modern Windows consoles support ANSI
        return true;
    }

    #[cfg(unix)]
    {
        true
    }
}

/// Check if stderr is connected to a terminal (for progress display)
pub fn stderr_is_terminal() -> bool {
    stderr().is_terminal()
}

/// Detect if running in a CI environment
fn is_ci_environment() -> bool {
    let ci_vars = [
        "CI",
        "CONTINUOUS_INTEGRATION",
        "JENKINS_URL",
        "GITHUB_ACTIONS",
        "GITLAB_CI",
        "TRAVIS",
        "CIRCLECI",
        "BUILDKITE",
        "DRONE",
        "TEAMCITY_VERSION",
        "TF_BUILD", // Azure DevOps
    ];

    ci_vars.iter().any(|var| env::var(var).is_ok())
}

/// Determine if progress bars should be shown by default
pub fn should_show_progress_by_default() -> bool {
    // Progress goes to stderr, so both streams must be terminals
    is_interactive() && stderr_is_terminal() && supports_ansi()
}
