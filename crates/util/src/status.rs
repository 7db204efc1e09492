use serde::Deserialize;
use serde::Serialize;

/// Lifecycle status of a session.
/// FINISHED and CANCELLED are terminal; nothing transitions out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Waiting,
    Lobby,
    ReadyCountdown,
    Active,
    Finished,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::Lobby => "LOBBY",
            Self::ReadyCountdown => "READY_COUNTDOWN",
            Self::Active => "ACTIVE",
            Self::Finished => "FINISHED",
            Self::Cancelled => "CANCELLED",
        }
    }
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }
    /// States in which a GROUP_PLAY room code is addressable.
    pub fn is_joinable_lobby(&self) -> bool {
        matches!(self, Self::Lobby | Self::ReadyCountdown)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WAITING" => Ok(Self::Waiting),
            "LOBBY" => Ok(Self::Lobby),
            "READY_COUNTDOWN" => Ok(Self::ReadyCountdown),
            "ACTIVE" => Ok(Self::Active),
            "FINISHED" => Ok(Self::Finished),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn terminal_states() {
        assert!(SessionStatus::Finished.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
        assert!(!SessionStatus::Active.is_terminal());
    }
    #[test]
    fn round_trips_wire_form() {
        for status in [
            SessionStatus::Waiting,
            SessionStatus::Lobby,
            SessionStatus::ReadyCountdown,
            SessionStatus::Active,
            SessionStatus::Finished,
            SessionStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<SessionStatus>().unwrap(), status);
        }
    }
}
