//! Target platforms for platform-dependent outputs.
//!
//! Platforms render as `<os>-<arch>` (`linux-amd64`, `darwin-aarch64`) and
//! drive the `<lib:…>`, `<extsuffix:…>` and `<exe:…>` path placeholders.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Operating system of a target platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Os {
    Linux,
    MacOs,
    Windows,
}

impl Os {
    /// Detect the host operating system.
    pub fn current() -> Option<Self> {
        match std::env::consts::OS {
            "linux" => Some(Os::Linux),
            "macos" => Some(Os::MacOs),
            "windows" => Some(Os::Windows),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::MacOs => "darwin",
            Os::Windows => "windows",
        }
    }
}

/// CPU architecture of a target platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Arch {
    Amd64,
    Aarch64,
}

impl Arch {
    /// Detect the host architecture.
    pub fn current() -> Option<Self> {
        match std::env::consts::ARCH {
            "x86_64" => Some(Arch::Amd64),
            "aarch64" => Some(Arch::Aarch64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Aarch64 => "aarch64",
        }
    }
}

/// An OS/architecture pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    pub fn new(os: Os, arch: Arch) -> Self {
        Platform { os, arch }
    }

    /// The host platform, if supported.
    pub fn current() -> Option<Self> {
        Some(Platform {
            os: Os::current()?,
            arch: Arch::current()?,
        })
    }

    /// File name of a shared library: `<lib:name>`.
    pub fn lib_file_name(&self, name: &str) -> String {
        match self.os {
            Os::Linux => format!("lib{}.so", name),
            Os::MacOs => format!("lib{}.dylib", name),
            Os::Windows => format!("{}.dll", name),
        }
    }

    /// File name of a loadable extension: `<extsuffix:name>`.
    pub fn ext_file_name(&self, name: &str) -> String {
        match self.os {
            Os::Linux => format!("{}.so", name),
            Os::MacOs => format!("{}.bundle", name),
            Os::Windows => format!("{}.dll", name),
        }
    }

    /// File name of an executable: `<exe:name>`.
    pub fn exe_file_name(&self, name: &str) -> String {
        match self.os {
            Os::Windows => format!("{}.exe", name),
            Os::Linux | Os::MacOs => name.to_string(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os.as_str(), self.arch.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (os, arch) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid platform `{}`: expected <os>-<arch>", s))?;

        let os = match os {
            "linux" => Os::Linux,
            "darwin" | "macos" => Os::MacOs,
            "windows" => Os::Windows,
            other => return Err(format!("unknown operating system `{}`", other)),
        };
        let arch = match arch {
            "amd64" | "x86_64" => Arch::Amd64,
            "aarch64" | "arm64" => Arch::Aarch64,
            other => return Err(format!("unknown architecture `{}`", other)),
        };

        Ok(Platform { os, arch })
    }
}

impl Serialize for Platform {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Platform {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
