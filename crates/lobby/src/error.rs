use qz_store::PgErr;

/// Why a lobby operation was rejected.
/// Everything except `Store` maps to a 4xx at the HTTP surface; ongoing
/// games are never affected by a rejection.
#[derive(Debug)]
pub enum LobbyError {
    UnknownCode,
    /// The lobby stopped accepting this operation (countdown running,
    /// game started, or session gone).
    Closed,
    Full,
    /// The user is already seated in this lobby.
    Duplicate,
    NotHost,
    TooFewPlayers,
    /// Cancel with no countdown running.
    NoCountdown,
    /// Leave by a user who is not seated.
    NotSeated,
    InvalidDuration(u32),
    InvalidCapacity(usize),
    Store(PgErr),
    Jobs(qz_timers::JobErr),
}

impl std::fmt::Display for LobbyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCode => write!(f, "no lobby with that code"),
            Self::Closed => write!(f, "lobby is not open"),
            Self::Full => write!(f, "lobby is full"),
            Self::Duplicate => write!(f, "already in this lobby"),
            Self::NotHost => write!(f, "only the host may do that"),
            Self::TooFewPlayers => write!(f, "not enough players"),
            Self::NoCountdown => write!(f, "no countdown is running"),
            Self::NotSeated => write!(f, "not in this lobby"),
            Self::InvalidDuration(d) => write!(f, "invalid duration: {} minutes", d),
            Self::InvalidCapacity(n) => write!(f, "invalid max players: {}", n),
            Self::Store(e) => write!(f, "store failure: {}", e),
            Self::Jobs(e) => write!(f, "job queue failure: {}", e),
        }
    }
}

impl std::error::Error for LobbyError {}

impl From<PgErr> for LobbyError {
    fn from(e: PgErr) -> Self {
        if qz_store::is_unique_violation(&e) {
            Self::Duplicate
        } else {
            Self::Store(e)
        }
    }
}
