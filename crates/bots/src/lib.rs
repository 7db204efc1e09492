//! Bot opponents.
//!
//! A bot is a pure decision function: given a question, the game mode,
//! and the bot's rating, it picks an option and a delay that reads like a
//! human of that strength. The engine schedules the resulting answer as a
//! session-scoped task; nothing here touches I/O.
use qz_content::Choice;
use qz_content::Question;
use qz_core::ID;
use qz_core::Mode;
use qz_core::Rating;
use rand::Rng;
use rand::seq::IndexedRandom;
use std::time::Duration;

/// Rating anchors for interpolation.
const RATING_FLOOR: f64 = 600.0;
const RATING_CEIL: f64 = 2800.0;
/// Correctness probability at the anchors.
const ACCURACY_FLOOR: f64 = 0.70;
const ACCURACY_CEIL: f64 = 0.99;

/// A bot's decision for one question.
#[derive(Debug, Clone, Copy)]
pub struct BotDecision {
    pub choice: ID<Choice>,
    pub delay: Duration,
}

/// Picks an option and a humanlike delay for the given question.
///
/// Correctness probability interpolates linearly in rating from 0.70 at
/// 600 to 0.99 at 2800. The delay starts from a mode band interpolated in
/// rating, then picks up independent stochastic factors: ±30% jitter, a
/// 10% thinking pause (×1.5–3.0) or else a 15% quick response (×0.4–0.8),
/// and a consistency factor in [0.7, 1.3] rising with rating. The result
/// is clamped to the mode's human band; under a time limit the bot never
/// races past the deadline.
pub fn choose_answer(
    question: &Question,
    mode: Mode,
    rating: Rating,
    time_limit: Option<Duration>,
) -> BotDecision {
    let ref mut rng = rand::rng();
    let choice = pick_option(question, rating, rng);
    let mut delay = base_delay(mode, rating);
    delay *= rng.random_range(0.7..=1.3);
    if rng.random_bool(0.10) {
        delay *= rng.random_range(1.5..=3.0);
    } else if rng.random_bool(0.15) {
        delay *= rng.random_range(0.4..=0.8);
    }
    delay *= 0.7 + 0.6 * strength(rating);
    let (floor, ceil) = human_band(mode);
    let mut delay = delay.clamp(floor, ceil);
    if let Some(limit) = time_limit {
        delay = delay.min(limit.as_millis() as f64 - 100.0).max(0.0);
    }
    BotDecision {
        choice,
        delay: Duration::from_millis(delay as u64),
    }
}

fn pick_option<R: Rng>(question: &Question, rating: Rating, rng: &mut R) -> ID<Choice> {
    if rng.random_bool(accuracy(rating)) {
        question.correct()
    } else {
        question
            .wrong_choices()
            .choose(rng)
            .copied()
            // single-option questions leave nothing wrong to pick
            .unwrap_or_else(|| question.correct())
    }
}

/// Normalized strength in [0, 1] across the rating anchors.
fn strength(rating: Rating) -> f64 {
    ((rating as f64 - RATING_FLOOR) / (RATING_CEIL - RATING_FLOOR)).clamp(0.0, 1.0)
}

fn accuracy(rating: Rating) -> f64 {
    ACCURACY_FLOOR + (ACCURACY_CEIL - ACCURACY_FLOOR) * strength(rating)
}

/// Base response time in ms: strong bots answer near the fast end of the
/// mode band, weak bots near the slow end.
fn base_delay(mode: Mode, rating: Rating) -> f64 {
    let (slow, fast) = match mode {
        Mode::FastestFingerFirst => (2500.0, 500.0),
        _ => (4000.0, 1000.0),
    };
    slow + (fast - slow) * strength(rating)
}

/// Plausible human reaction range per mode, in ms.
fn human_band(mode: Mode) -> (f64, f64) {
    match mode {
        Mode::FastestFingerFirst => (400.0, 6000.0),
        _ => (800.0, 12000.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn question(options: usize) -> Question {
        let choices = (0..options)
            .map(|i| Choice {
                id: ID::default(),
                text: format!("option {}", i),
            })
            .collect::<Vec<_>>();
        let correct = choices[0].id;
        Question::new(ID::default(), "prompt".into(), choices, correct, None, None)
    }
    #[test]
    fn accuracy_interpolates_and_clamps() {
        assert!((accuracy(600) - 0.70).abs() < 1e-9);
        assert!((accuracy(2800) - 0.99).abs() < 1e-9);
        assert!((accuracy(0) - 0.70).abs() < 1e-9);
        assert!((accuracy(4000) - 0.99).abs() < 1e-9);
        assert!(accuracy(1700) > 0.70 && accuracy(1700) < 0.99);
    }
    #[test]
    fn delay_stays_in_mode_band() {
        let q = question(4);
        for _ in 0..500 {
            let decision = choose_answer(&q, Mode::QuickDuel, 1200, None);
            assert!(decision.delay >= Duration::from_millis(800));
            assert!(decision.delay <= Duration::from_millis(12_000));
        }
    }
    #[test]
    fn fff_never_races_the_deadline() {
        let q = question(4);
        let limit = Duration::from_millis(1000);
        for _ in 0..500 {
            let decision = choose_answer(&q, Mode::FastestFingerFirst, 600, Some(limit));
            assert!(decision.delay <= Duration::from_millis(900));
        }
    }
    #[test]
    fn wrong_answers_come_from_wrong_options() {
        let q = question(4);
        let wrong = q.wrong_choices();
        let mut saw_wrong = false;
        for _ in 0..2000 {
            let decision = choose_answer(&q, Mode::QuickDuel, 600, None);
            if decision.choice != q.correct() {
                saw_wrong = true;
                assert!(wrong.contains(&decision.choice));
            }
        }
        assert!(saw_wrong, "a 70% accurate bot should miss sometimes");
    }
    #[test]
    fn strong_bots_answer_faster_on_average() {
        let q = question(4);
        let mean = |rating: Rating| -> f64 {
            (0..300)
                .map(|_| choose_answer(&q, Mode::QuickDuel, rating, None).delay.as_millis() as f64)
                .sum::<f64>()
                / 300.0
        };
        assert!(mean(2800) < mean(600));
    }
}
