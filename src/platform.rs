use crate::errors::ConfigError;

/// The host toolchain flavor. Only the platforms the C++ flag menus are
/// wired up for; anything else fails loudly at configuration time.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
}

impl Platform {
    pub fn host() -> Result<Self, ConfigError> {
        match std::env::consts::OS {
            "linux" => Ok(Platform::Linux),
            "macos" => Ok(Platform::MacOs),
            other => Err(ConfigError::UnsupportedPlatform(other.to_string())),
        }
    }

    /// Compiler argv prefix shared by the compile, dependency-scan, and
    /// link commands.
    pub fn compiler(&self) -> Vec<String> {
        let cc = match self {
            Platform::Linux => "g++",
            Platform::MacOs => "clang++",
        };
        [cc, "-std=c++2a", "-Wall", "-Werror", "-g"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn obj_suffix(&self) -> &'static str {
        ".o"
    }

    pub fn exe_suffix(&self) -> &'static str {
        ""
    }
}
