use std::fmt;
use std::str::FromStr;

use crate::TelemetryError;

/// Team that owns a class of failure, logged under [`fields::TEAM`](crate::fields::TEAM).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Team {
    /// Application developers: defects such as a response that cannot be
    /// serialized.
    Dev,
    /// Security.
    Sec,
    /// Operations: infrastructure failures such as a port that cannot be bound
    /// or a store that cannot be reached.
    Ops,
}

impl Team {
    /// Returns the value written to logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Sec => "sec",
            Self::Ops => "ops",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Team {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Self::Dev),
            "sec" => Ok(Self::Sec),
            "ops" => Ok(Self::Ops),
            other => Err(TelemetryError::InvalidConfig(format!("unknown team: {other}"))),
        }
    }
}
