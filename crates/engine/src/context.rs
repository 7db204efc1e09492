use chrono::DateTime;
use chrono::Utc;
use qz_core::Config;
use qz_core::ID;
use qz_store::Enrolled;
use qz_store::Participant;
use qz_store::Session;
use qz_store::UserProfile;

/// Read-only surroundings of a rules decision: who is enrolled, which
/// session this is, the process tunables, and the decision time. Passing
/// `now` in keeps the rules clockless and the scenarios replayable.
pub struct Ctx {
    pub session: ID<Session>,
    pub roster: Vec<Enrolled>,
    pub cfg: Config,
    pub now: DateTime<Utc>,
}

impl Ctx {
    pub fn enrolled(&self, participant: ID<Participant>) -> Option<&Enrolled> {
        self.roster.iter().find(|e| e.participant == participant)
    }
    pub fn participants(&self) -> Vec<ID<Participant>> {
        self.roster.iter().map(|e| e.participant).collect()
    }
    pub fn humans(&self) -> Vec<&Enrolled> {
        self.roster.iter().filter(|e| !e.is_bot).collect()
    }
    pub fn bots(&self) -> Vec<&Enrolled> {
        self.roster.iter().filter(|e| e.is_bot).collect()
    }
    pub fn human_users(&self) -> Vec<ID<UserProfile>> {
        self.humans().iter().map(|e| e.user).collect()
    }
}
