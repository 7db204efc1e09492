use qz_content::Choice;
use qz_content::Question;
use qz_core::ID;
use qz_store::Participant;
use qz_store::UserProfile;
use serde_json::Value;
use std::time::Duration;

/// Where an emission goes. Room always means the owning session's room.
#[derive(Debug, Clone)]
pub enum EmitTarget {
    Users(Vec<ID<UserProfile>>),
    Participants(Vec<ID<Participant>>),
    Room,
}

/// One I/O intent produced by a rules decision.
/// Rules stay pure by returning these; the session actor interprets them
/// in order, so emissions follow the state mutations that produced them.
#[derive(Debug, Clone)]
pub enum Effect {
    Emit {
        target: EmitTarget,
        event: &'static str,
        payload: Value,
    },
    /// Schedule the cancellable per-question deadline (FFF), remembering
    /// its job id in the ephemeral timer slot.
    ScheduleQuestionTimeout {
        question: ID<Question>,
        index: usize,
        delay: Duration,
    },
    /// Cancel whatever per-question deadline is pending.
    CancelQuestionTimeout,
    /// Schedule the durable inter-question gap (FFF).
    ScheduleAdvance { index: usize, delay: Duration },
    /// Deliver a simulated answer after a humanlike delay, scoped to the
    /// session so termination aborts it.
    ScheduleBot {
        participant: ID<Participant>,
        question: ID<Question>,
        choice: ID<Choice>,
        delay: Duration,
    },
    /// Enter the end-of-game procedure once the current effects are done.
    Finish,
}

impl Effect {
    pub fn to_room(event: &'static str, payload: Value) -> Self {
        Self::Emit {
            target: EmitTarget::Room,
            event,
            payload,
        }
    }
    pub fn to_participant(participant: ID<Participant>, event: &'static str, payload: Value) -> Self {
        Self::Emit {
            target: EmitTarget::Participants(vec![participant]),
            event,
            payload,
        }
    }
    pub fn to_users(users: Vec<ID<UserProfile>>, event: &'static str, payload: Value) -> Self {
        Self::Emit {
            target: EmitTarget::Users(users),
            event,
            payload,
        }
    }
}
