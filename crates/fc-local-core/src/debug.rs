use std::str::FromStr;

/// IDE a debug session targets (`-c/--config`).
///
/// Unknown names are kept as [`DebugIde::Other`] so the before-hook can report
/// them instead of failing at argument parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugIde {
    VsCode,
    IntelliJ,
    PyCharm,
    Other(String),
}

impl DebugIde {
    pub fn from_name(name: &str) -> Self {
        match name {
            "vscode" => DebugIde::VsCode,
            "intellij" => DebugIde::IntelliJ,
            "pycharm" => DebugIde::PyCharm,
            other => DebugIde::Other(other.to_string()),
        }
    }
}

impl FromStr for DebugIde {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(DebugIde::from_name(s))
    }
}

impl std::fmt::Display for DebugIde {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DebugIde::VsCode => write!(f, "vscode"),
            DebugIde::IntelliJ => write!(f, "intellij"),
            DebugIde::PyCharm => write!(f, "pycharm"),
            DebugIde::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Optional debugger attachment requested by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugSession {
    /// `None` covers both a missing flag and a value that is not a positive integer.
    pub port: Option<u16>,
    pub ide: Option<DebugIde>,
}

impl DebugSession {
    pub fn new(port: Option<u16>, ide: Option<DebugIde>) -> Self {
        Self { port, ide }
    }

    /// Build a session from raw `-d/--debug-port` and `-c/--config` values.
    pub fn from_flags(debug_port: Option<&str>, ide: Option<&str>) -> Self {
        Self {
            port: debug_port.and_then(parse_debug_port),
            ide: ide.map(DebugIde::from_name),
        }
    }

    /// The port to debug on, if debugging is active.
    pub fn active_port(&self) -> Option<u16> {
        self.port
    }

    pub fn is_active(&self) -> bool {
        self.port.is_some()
    }

    pub fn ide_is_vscode(&self) -> bool {
        self.ide == Some(DebugIde::VsCode)
    }
}

/// Parse a debug port the way a leading-integer parse would: leading whitespace
/// and trailing garbage are ignored, zero and out-of-range values are rejected.
pub fn parse_debug_port(raw: &str) -> Option<u16> {
    let digits: String = raw
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    match digits.parse::<u16>() {
        Ok(0) | Err(_) => None,
        Ok(port) => Some(port),
    }
}
