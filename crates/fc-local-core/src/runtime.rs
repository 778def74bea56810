use std::str::FromStr;

use crate::error::LocalError;

/// A Function Compute runtime identifier that can be emulated locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Runtime {
    Nodejs6,
    Nodejs8,
    Nodejs10,
    Nodejs12,
    Nodejs14,
    Nodejs16,
    Python27,
    Python3,
    Python39,
    Python310,
    Java8,
    Java11,
    Php72,
    Dotnetcore21,
    Dotnetcore31,
    Custom,
    CustomDebian10,
    CustomContainer,
}

/// Language family a runtime belongs to. Profiles are selected per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeFamily {
    Nodejs,
    Python,
    Java,
    Php,
    Dotnet,
    Custom,
    CustomContainer,
}

impl Runtime {
    pub const ALL: [Runtime; 18] = [
        Runtime::Nodejs6,
        Runtime::Nodejs8,
        Runtime::Nodejs10,
        Runtime::Nodejs12,
        Runtime::Nodejs14,
        Runtime::Nodejs16,
        Runtime::Python27,
        Runtime::Python3,
        Runtime::Python39,
        Runtime::Python310,
        Runtime::Java8,
        Runtime::Java11,
        Runtime::Php72,
        Runtime::Dotnetcore21,
        Runtime::Dotnetcore31,
        Runtime::Custom,
        Runtime::CustomDebian10,
        Runtime::CustomContainer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Runtime::Nodejs6 => "nodejs6",
            Runtime::Nodejs8 => "nodejs8",
            Runtime::Nodejs10 => "nodejs10",
            Runtime::Nodejs12 => "nodejs12",
            Runtime::Nodejs14 => "nodejs14",
            Runtime::Nodejs16 => "nodejs16",
            Runtime::Python27 => "python2.7",
            Runtime::Python3 => "python3",
            Runtime::Python39 => "python3.9",
            Runtime::Python310 => "python3.10",
            Runtime::Java8 => "java8",
            Runtime::Java11 => "java11",
            Runtime::Php72 => "php7.2",
            Runtime::Dotnetcore21 => "dotnetcore2.1",
            Runtime::Dotnetcore31 => "dotnetcore3.1",
            Runtime::Custom => "custom",
            Runtime::CustomDebian10 => "custom.debian10",
            Runtime::CustomContainer => "custom-container",
        }
    }

    pub fn family(&self) -> RuntimeFamily {
        match self {
            Runtime::Nodejs6
            | Runtime::Nodejs8
            | Runtime::Nodejs10
            | Runtime::Nodejs12
            | Runtime::Nodejs14
            | Runtime::Nodejs16 => RuntimeFamily::Nodejs,
            Runtime::Python27 | Runtime::Python3 | Runtime::Python39 | Runtime::Python310 => {
                RuntimeFamily::Python
            }
            Runtime::Java8 | Runtime::Java11 => RuntimeFamily::Java,
            Runtime::Php72 => RuntimeFamily::Php,
            Runtime::Dotnetcore21 | Runtime::Dotnetcore31 => RuntimeFamily::Dotnet,
            Runtime::Custom | Runtime::CustomDebian10 => RuntimeFamily::Custom,
            Runtime::CustomContainer => RuntimeFamily::CustomContainer,
        }
    }

    /// `custom`, `custom.debian10` and `custom-container` all run an HTTP
    /// server inside the emulation image.
    pub fn is_custom_family(&self) -> bool {
        matches!(
            self.family(),
            RuntimeFamily::Custom | RuntimeFamily::CustomContainer
        )
    }

    /// Name used in the stock emulation image tag (`runtime-<name>`).
    pub fn image_name(&self) -> &'static str {
        match self {
            Runtime::Python3 => "python3.6",
            other => other.as_str(),
        }
    }
}

impl FromStr for Runtime {
    type Err = LocalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Runtime::ALL
            .iter()
            .find(|r| r.as_str() == s)
            .copied()
            .ok_or_else(|| LocalError::UnsupportedRuntime(s.to_string()))
    }
}

impl std::fmt::Display for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::fmt::Display for RuntimeFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeFamily::Nodejs => write!(f, "nodejs"),
            RuntimeFamily::Python => write!(f, "python"),
            RuntimeFamily::Java => write!(f, "java"),
            RuntimeFamily::Php => write!(f, "php"),
            RuntimeFamily::Dotnet => write!(f, "dotnet"),
            RuntimeFamily::Custom => write!(f, "custom"),
            RuntimeFamily::CustomContainer => write!(f, "custom-container"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_known_identifier() {
        for runtime in Runtime::ALL {
            assert_eq!(runtime.as_str().parse::<Runtime>().unwrap(), runtime);
        }
    }

    #[test]
    fn unknown_identifier_is_unsupported() {
        let err = "go1".parse::<Runtime>().unwrap_err();
        assert!(matches!(err, LocalError::UnsupportedRuntime(ref r) if r == "go1"));
    }

    #[test]
    fn python3_uses_python36_image() {
        assert_eq!(Runtime::Python3.image_name(), "python3.6");
        assert_eq!(Runtime::Python39.image_name(), "python3.9");
    }

    #[test]
    fn custom_family_covers_containers() {
        assert!(Runtime::Custom.is_custom_family());
        assert!(Runtime::CustomDebian10.is_custom_family());
        assert!(Runtime::CustomContainer.is_custom_family());
        assert!(!Runtime::Nodejs14.is_custom_family());
    }
}
