//! Host platform capability
//!
//! Shell selection and executable naming differ between Unix and Windows.
//! The platform is an explicit value threaded into the dispatcher and tool
//! manager so tests can exercise both behaviors on one host.

/// Process-facing platform family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Unix,
    Windows,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    /// Shell program and flag used to run a command line.
    pub fn shell(&self) -> (&'static str, &'static str) {
        match self {
            Platform::Unix => ("sh", "-c"),
            Platform::Windows => ("cmd", "/c"),
        }
    }

    /// Executable file name for a bare tool name.
    pub fn executable_name(&self, name: &str) -> String {
        match self {
            Platform::Unix => name.to_string(),
            Platform::Windows => format!("{name}.exe"),
        }
    }

    /// Default interpreter for a script path when the hook names none.
    pub fn default_runner(&self, script: &str) -> &'static str {
        if script.ends_with(".ps1") {
            "powershell"
        } else {
            "sh"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_per_platform() {
        assert_eq!(Platform::Unix.shell(), ("sh", "-c"));
        assert_eq!(Platform::Windows.shell(), ("cmd", "/c"));
    }

    #[test]
    fn executable_name_gets_exe_suffix_on_windows() {
        assert_eq!(Platform::Unix.executable_name("lint"), "lint");
        assert_eq!(Platform::Windows.executable_name("lint"), "lint.exe");
    }

    #[test]
    fn runner_defaults() {
        assert_eq!(Platform::Unix.default_runner("check.sh"), "sh");
        assert_eq!(Platform::Unix.default_runner("check.ps1"), "powershell");
        assert_eq!(Platform::Windows.default_runner("check.ps1"), "powershell");
    }
}
