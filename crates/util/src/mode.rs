use serde::Deserialize;
use serde::Serialize;

/// Game mode of a session. Wire and storage form is SCREAMING_SNAKE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    QuickDuel,
    FastestFingerFirst,
    Practice,
    TimeAttack,
    GroupPlay,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuickDuel => "QUICK_DUEL",
            Self::FastestFingerFirst => "FASTEST_FINGER_FIRST",
            Self::Practice => "PRACTICE",
            Self::TimeAttack => "TIME_ATTACK",
            Self::GroupPlay => "GROUP_PLAY",
        }
    }
    /// Modes where each participant advances through the batch at their own pace.
    pub fn per_participant_progression(&self) -> bool {
        !matches!(self, Self::FastestFingerFirst)
    }
    /// Modes eligible for a symmetric 1v1 rating update.
    pub fn rated(&self) -> bool {
        matches!(self, Self::QuickDuel | Self::FastestFingerFirst)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUICK_DUEL" => Ok(Self::QuickDuel),
            "FASTEST_FINGER_FIRST" => Ok(Self::FastestFingerFirst),
            "PRACTICE" => Ok(Self::Practice),
            "TIME_ATTACK" => Ok(Self::TimeAttack),
            "GROUP_PLAY" => Ok(Self::GroupPlay),
            other => Err(format!("unknown mode: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn round_trips_wire_form() {
        for mode in [
            Mode::QuickDuel,
            Mode::FastestFingerFirst,
            Mode::Practice,
            Mode::TimeAttack,
            Mode::GroupPlay,
        ] {
            assert_eq!(mode.as_str().parse::<Mode>().unwrap(), mode);
        }
    }
    #[test]
    fn serde_matches_display() {
        let json = serde_json::to_string(&Mode::FastestFingerFirst).unwrap();
        assert_eq!(json, "\"FASTEST_FINGER_FIRST\"");
    }
}
