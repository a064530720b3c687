//! QR code redemption, curated answers and minigame completion.
//!
//! Every function here mutates an [`EventRuntime`] draft in place; the caller
//! commits the draft to storage and decides what to broadcast.

use rand::{Rng, seq::IndexedRandom};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    dao::models::{
        AnswerLetter, MinigameTrack, PlayerAnswerEntity, PlayerScanEntity, QrColor,
        QuestionCategory, QuestionEntity, RevealMode,
    },
    state::event::{EventRuntime, GameRules},
};

/// Points granted for a correct curated answer, before the bonus multiplier.
pub const CORRECT_ANSWER_POINTS: i64 = 10;
/// Points taken for a wrong curated answer.
pub const WRONG_ANSWER_PENALTY: i64 = 5;
/// Points granted by a red code.
pub const RED_REWARD_POINTS: i64 = 50;
/// Points taken by a trap code.
pub const TRAP_PENALTY_POINTS: i64 = 25;
/// Points granted when a minigame track is completed, before the bonus multiplier.
pub const MINIGAME_COMPLETION_POINTS: i64 = 10;

/// Reasons a redemption request is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RedemptionError {
    /// The player id is unknown to the event, typically after a host deletion.
    #[error("player is not registered in this event")]
    StalePlayer,
    /// No code with this identifier exists in the event.
    #[error("QR code `{0}` does not exist")]
    UnknownCode(String),
    /// No curated question with this id exists in the event.
    #[error("question does not exist")]
    UnknownQuestion,
    /// Codes are only redeemable while a round is running or paused.
    #[error("game is not active")]
    GameNotActive,
    /// A one-shot code was already claimed by someone.
    #[error("code already used")]
    AlreadyClaimed,
    /// The player already answered this question.
    #[error("question already answered")]
    AlreadyAnswered,
    /// The host disabled the track.
    #[error("minigame {0:?} is disabled")]
    MinigameDisabled(MinigameTrack),
}

/// Why a green code did not lead to a minigame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinigameUnavailable {
    /// The host disabled every track.
    AllDisabled,
    /// The player reached the target on every track.
    AllCompleted,
    /// The remaining tracks are disabled.
    NothingLeft,
}

impl MinigameUnavailable {
    /// Text shown to the player.
    pub fn message(self) -> &'static str {
        match self {
            MinigameUnavailable::AllDisabled => "All minigames are currently disabled",
            MinigameUnavailable::AllCompleted => "You have completed every minigame",
            MinigameUnavailable::NothingLeft => "No minigame is available right now",
        }
    }
}

/// Question as shown to a player; the correct letter stays on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedQuestion {
    /// Question to answer with [`answer`].
    pub id: Uuid,
    /// Question text.
    pub text: String,
    /// Option `A`.
    pub option_a: String,
    /// Option `B`.
    pub option_b: String,
    /// Option `C`.
    pub option_c: String,
    /// Pool the question was drawn from.
    pub category: QuestionCategory,
}

impl From<&QuestionEntity> for ServedQuestion {
    fn from(value: &QuestionEntity) -> Self {
        Self {
            id: value.id,
            text: value.text.clone(),
            option_a: value.option_a.clone(),
            option_b: value.option_b.clone(),
            option_c: value.option_c.clone(),
            category: value.category,
        }
    }
}

/// Result of scanning a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Same color scanned again before the cooldown elapsed.
    Wait {
        /// Whole seconds left, at least one.
        remaining_seconds: u64,
    },
    /// A quiz code served an unanswered question.
    Question(ServedQuestion),
    /// Every question of the category was already answered by the player.
    CategoryExhausted(QuestionCategory),
    /// A green code picked an open track.
    Minigame {
        /// Track to play.
        track: MinigameTrack,
        /// Points already collected on the track.
        current_score: u32,
        /// Points needed to complete the track.
        target: u32,
    },
    /// A green code found no track to offer.
    MinigameUnavailable(MinigameUnavailable),
    /// A red code was claimed.
    Reward {
        /// Points granted.
        points: i64,
        /// Score after the reward.
        score: i64,
    },
    /// A trap code was claimed.
    Penalty {
        /// Points taken.
        points: i64,
        /// Score after the penalty, floored at zero.
        score: i64,
    },
    /// A pink code was claimed; the player should submit a photo.
    PhotoChallenge,
    /// Unknown one-shot color: the code is claimed without further effect.
    Claimed,
}

impl ScanOutcome {
    /// Whether the scan changed a player's score or a claim, so the leaderboard must be pushed.
    pub fn claimed_code(&self) -> bool {
        matches!(
            self,
            ScanOutcome::Reward { .. }
                | ScanOutcome::Penalty { .. }
                | ScanOutcome::PhotoChallenge
                | ScanOutcome::Claimed
        )
    }
}

/// Result of answering a curated question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    /// Whether the chosen option was right.
    pub correct: bool,
    /// The right option.
    pub correct_answer: AnswerLetter,
    /// Score after the answer.
    pub score: i64,
    /// Letter shown to the player on a correct answer.
    pub letter_to_reveal: Option<String>,
    /// Password index revealed for everyone (auto mode only).
    pub revealed_index: Option<usize>,
}

/// Result of reporting minigame points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinigameOutcome {
    /// Track the points were added to.
    pub track: MinigameTrack,
    /// Points collected on the track after this report.
    pub progress: u32,
    /// Points needed to complete the track.
    pub target: u32,
    /// The target was crossed by this report.
    pub completed: bool,
    /// Letter of the secret handed to the player on completion.
    pub revealed_letter: Option<char>,
    /// Score after the report.
    pub score: i64,
}

fn category_for(color: QrColor) -> Option<QuestionCategory> {
    match color {
        QrColor::White => Some(QuestionCategory::Company),
        QrColor::Yellow => Some(QuestionCategory::World),
        _ => None,
    }
}

/// Seconds still to wait before `player_id` may scan `color` again, if any.
pub fn cooldown_remaining(
    event: &EventRuntime,
    rules: &GameRules,
    player_id: Uuid,
    color: QrColor,
    now: OffsetDateTime,
) -> Option<u64> {
    let last = event.last_scan_at(player_id, color)?;
    let elapsed = (now - last).as_seconds_f64();
    let cooldown = rules.scan_cooldown_secs as f64;
    if elapsed >= cooldown {
        return None;
    }
    Some(((cooldown - elapsed).ceil() as u64).max(1))
}

/// Redeem `code` for `player_id`.
pub fn scan<R: Rng + ?Sized>(
    event: &mut EventRuntime,
    rules: &GameRules,
    player_id: Uuid,
    code: &str,
    now: OffsetDateTime,
    rng: &mut R,
) -> Result<ScanOutcome, RedemptionError> {
    if !event.players.contains_key(&player_id) {
        return Err(RedemptionError::StalePlayer);
    }
    let qr = event
        .qr_codes
        .get(code)
        .ok_or_else(|| RedemptionError::UnknownCode(code.to_owned()))?;
    if !event.game.phase().is_active() {
        return Err(RedemptionError::GameNotActive);
    }
    let color = qr.color;

    if let Some(category) = category_for(color) {
        return Ok(serve_question(event, rules, player_id, color, category, now, rng));
    }
    if color == QrColor::Green {
        return Ok(pick_minigame(event, rules, player_id, rng));
    }
    claim_one_shot(event, player_id, code, color)
}

fn serve_question<R: Rng + ?Sized>(
    event: &mut EventRuntime,
    rules: &GameRules,
    player_id: Uuid,
    color: QrColor,
    category: QuestionCategory,
    now: OffsetDateTime,
    rng: &mut R,
) -> ScanOutcome {
    if let Some(remaining_seconds) = cooldown_remaining(event, rules, player_id, color, now) {
        return ScanOutcome::Wait { remaining_seconds };
    }

    let answered: Vec<Uuid> = event
        .answers
        .iter()
        .filter(|answer| answer.player_id == player_id)
        .map(|answer| answer.question_id)
        .collect();
    let candidates: Vec<&QuestionEntity> = event
        .questions
        .values()
        .filter(|q| q.category == category && !answered.contains(&q.id))
        .collect();

    let Some(question) = candidates.choose(rng) else {
        return ScanOutcome::CategoryExhausted(category);
    };
    let served = ServedQuestion::from(*question);

    event.scans.push(PlayerScanEntity {
        player_id,
        color,
        scanned_at: now,
    });
    ScanOutcome::Question(served)
}

fn pick_minigame<R: Rng + ?Sized>(
    event: &EventRuntime,
    rules: &GameRules,
    player_id: Uuid,
    rng: &mut R,
) -> ScanOutcome {
    let Some(player) = event.players.get(&player_id) else {
        return ScanOutcome::MinigameUnavailable(MinigameUnavailable::NothingLeft);
    };
    let progress = &player.minigame_progress;
    let target = rules.minigame_target;

    let enabled: Vec<MinigameTrack> = MinigameTrack::ALL
        .into_iter()
        .filter(|track| event.game.minigame_enabled(*track))
        .collect();
    if enabled.is_empty() {
        return ScanOutcome::MinigameUnavailable(MinigameUnavailable::AllDisabled);
    }
    if MinigameTrack::ALL
        .iter()
        .all(|track| progress.get(*track) >= target)
    {
        return ScanOutcome::MinigameUnavailable(MinigameUnavailable::AllCompleted);
    }

    let open: Vec<MinigameTrack> = enabled
        .into_iter()
        .filter(|track| progress.get(*track) < target)
        .collect();
    match open.choose(rng) {
        Some(track) => ScanOutcome::Minigame {
            track: *track,
            current_score: progress.get(*track),
            target,
        },
        None => ScanOutcome::MinigameUnavailable(MinigameUnavailable::NothingLeft),
    }
}

fn claim_one_shot(
    event: &mut EventRuntime,
    player_id: Uuid,
    code: &str,
    color: QrColor,
) -> Result<ScanOutcome, RedemptionError> {
    let qr = event
        .qr_codes
        .get_mut(code)
        .ok_or_else(|| RedemptionError::UnknownCode(code.to_owned()))?;
    if qr.claimed_by.is_some() {
        return Err(RedemptionError::AlreadyClaimed);
    }
    qr.claimed_by = Some(player_id);

    let outcome = match color {
        QrColor::Red => {
            let score = event
                .apply_score_delta(player_id, RED_REWARD_POINTS)
                .ok_or(RedemptionError::StalePlayer)?;
            ScanOutcome::Reward {
                points: RED_REWARD_POINTS,
                score,
            }
        }
        QrColor::WhiteTrap => {
            let score = event
                .apply_score_delta(player_id, -TRAP_PENALTY_POINTS)
                .ok_or(RedemptionError::StalePlayer)?;
            ScanOutcome::Penalty {
                points: TRAP_PENALTY_POINTS,
                score,
            }
        }
        QrColor::Pink => ScanOutcome::PhotoChallenge,
        _ => ScanOutcome::Claimed,
    };
    Ok(outcome)
}

/// Record a curated answer and apply its score and reveal effects.
pub fn answer<R: Rng + ?Sized>(
    event: &mut EventRuntime,
    player_id: Uuid,
    question_id: Uuid,
    letter: AnswerLetter,
    now: OffsetDateTime,
    rng: &mut R,
) -> Result<AnswerOutcome, RedemptionError> {
    if !event.players.contains_key(&player_id) {
        return Err(RedemptionError::StalePlayer);
    }
    if event
        .answers
        .iter()
        .any(|a| a.player_id == player_id && a.question_id == question_id)
    {
        return Err(RedemptionError::AlreadyAnswered);
    }
    let bonus = i64::from(event.game.bonus_multiplier);
    let question = event
        .questions
        .get_mut(&question_id)
        .ok_or(RedemptionError::UnknownQuestion)?;

    let correct = question.correct == letter;
    question.times_shown += 1;
    if correct {
        question.times_correct += 1;
    }
    let correct_answer = question.correct;
    let letter_to_reveal = correct.then(|| question.letter_to_reveal.clone());

    event.answers.push(PlayerAnswerEntity {
        player_id,
        question_id,
        correct,
        answered_at: now,
    });

    let delta = if correct {
        CORRECT_ANSWER_POINTS * bonus
    } else {
        -WRONG_ANSWER_PENALTY
    };
    let score = event
        .apply_score_delta(player_id, delta)
        .ok_or(RedemptionError::StalePlayer)?;

    let revealed_index = if correct && event.game.password.mode == RevealMode::Auto {
        event.game.password.reveal_random(rng)
    } else {
        None
    };

    Ok(AnswerOutcome {
        correct,
        correct_answer,
        score,
        letter_to_reveal,
        revealed_index,
    })
}

/// Add minigame points to a player's track progress.
pub fn complete_minigame<R: Rng + ?Sized>(
    event: &mut EventRuntime,
    rules: &GameRules,
    player_id: Uuid,
    track: MinigameTrack,
    points: u32,
    rng: &mut R,
) -> Result<MinigameOutcome, RedemptionError> {
    if !event.game.minigame_enabled(track) {
        return Err(RedemptionError::MinigameDisabled(track));
    }
    let bonus = i64::from(event.game.bonus_multiplier);
    let secret: Vec<char> = event.game.password.secret().chars().collect();
    let target = rules.minigame_target;

    let player = event
        .players
        .get_mut(&player_id)
        .ok_or(RedemptionError::StalePlayer)?;
    let counter = player.minigame_progress.get_mut(track);
    let before = *counter;
    *counter = before.saturating_add(points);
    let progress = *counter;
    let completed = before < target && progress >= target;

    let mut revealed_letter = None;
    if completed {
        player.score = (player.score + MINIGAME_COMPLETION_POINTS * bonus).max(0);
        let candidates: Vec<char> = secret
            .iter()
            .copied()
            .filter(|ch| *ch != ' ' && !player.revealed_letters.contains(*ch))
            .collect();
        if let Some(letter) = candidates.choose(rng) {
            player.revealed_letters.push(*letter);
            revealed_letter = Some(*letter);
        }
    }

    Ok(MinigameOutcome {
        track,
        progress,
        target,
        completed,
        revealed_letter,
        score: player.score,
    })
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};
    use time::Duration;

    use super::*;
    use crate::state::event::tests::{NOW, add_code, add_player, add_question, runtime};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn running_event() -> EventRuntime {
        let mut event = runtime();
        event.game.clock.start(NOW, 30).unwrap();
        event
    }

    #[test]
    fn stale_player_is_checked_before_the_code() {
        let mut event = running_event();
        let err = scan(&mut event, &GameRules::default(), Uuid::new_v4(), "nope", NOW, &mut rng())
            .unwrap_err();
        assert_eq!(err, RedemptionError::StalePlayer);
    }

    #[test]
    fn scanning_requires_an_active_game() {
        let mut event = runtime();
        let player = add_player(&mut event, "p", 0);
        add_code(&mut event, "white", QrColor::White);
        let err = scan(&mut event, &GameRules::default(), player, "white", NOW, &mut rng())
            .unwrap_err();
        assert_eq!(err, RedemptionError::GameNotActive);

        let err = scan(&mut event, &GameRules::default(), player, "red9", NOW, &mut rng())
            .unwrap_err();
        assert_eq!(err, RedemptionError::UnknownCode("red9".into()));
    }

    #[test]
    fn cooldown_blocks_then_serves_after_five_minutes() {
        let rules = GameRules::default();
        let mut event = running_event();
        let player = add_player(&mut event, "p", 0);
        add_code(&mut event, "white", QrColor::White);
        add_question(&mut event, QuestionCategory::Company);
        add_question(&mut event, QuestionCategory::Company);

        let first = scan(&mut event, &rules, player, "white", NOW, &mut rng()).unwrap();
        assert!(matches!(first, ScanOutcome::Question(_)));

        let later = NOW + Duration::seconds(100);
        let second = scan(&mut event, &rules, player, "white", later, &mut rng()).unwrap();
        assert_eq!(second, ScanOutcome::Wait { remaining_seconds: 200 });

        let after = NOW + Duration::seconds(300);
        let third = scan(&mut event, &rules, player, "white", after, &mut rng()).unwrap();
        assert!(matches!(third, ScanOutcome::Question(_)));
    }

    #[test]
    fn cooldown_is_tracked_per_color() {
        let rules = GameRules::default();
        let mut event = running_event();
        let player = add_player(&mut event, "p", 0);
        add_code(&mut event, "white", QrColor::White);
        add_code(&mut event, "yellow", QrColor::Yellow);
        add_question(&mut event, QuestionCategory::Company);
        add_question(&mut event, QuestionCategory::World);

        scan(&mut event, &rules, player, "white", NOW, &mut rng()).unwrap();
        let yellow = scan(&mut event, &rules, player, "yellow", NOW, &mut rng()).unwrap();
        assert!(matches!(yellow, ScanOutcome::Question(q) if q.category == QuestionCategory::World));
    }

    #[test]
    fn questions_are_not_repeated_until_exhausted() {
        let rules = GameRules {
            scan_cooldown_secs: 0,
            ..GameRules::default()
        };
        let mut event = running_event();
        let player = add_player(&mut event, "p", 0);
        add_code(&mut event, "yellow", QrColor::Yellow);
        for _ in 0..3 {
            add_question(&mut event, QuestionCategory::World);
        }
        let mut rng = rng();
        let mut seen = Vec::new();
        for _ in 0..3 {
            let ScanOutcome::Question(question) =
                scan(&mut event, &rules, player, "yellow", NOW, &mut rng).unwrap()
            else {
                panic!("expected a question");
            };
            assert!(!seen.contains(&question.id));
            seen.push(question.id);
            answer(&mut event, player, question.id, AnswerLetter::A, NOW, &mut rng).unwrap();
        }
        let outcome = scan(&mut event, &rules, player, "yellow", NOW, &mut rng).unwrap();
        assert_eq!(outcome, ScanOutcome::CategoryExhausted(QuestionCategory::World));
        assert_eq!(event.scans.len(), 3);
    }

    #[test]
    fn one_shot_codes_are_claimed_once() {
        let rules = GameRules::default();
        let mut event = running_event();
        let first = add_player(&mut event, "first", 0);
        let second = add_player(&mut event, "second", 0);
        add_code(&mut event, "red1", QrColor::Red);

        let outcome = scan(&mut event, &rules, first, "red1", NOW, &mut rng()).unwrap();
        assert_eq!(outcome, ScanOutcome::Reward { points: 50, score: 50 });
        assert!(outcome.claimed_code());

        let err = scan(&mut event, &rules, second, "red1", NOW, &mut rng()).unwrap_err();
        assert_eq!(err, RedemptionError::AlreadyClaimed);
        assert_eq!(event.qr_codes["red1"].claimed_by, Some(first));
    }

    #[test]
    fn trap_floors_score_at_zero() {
        let rules = GameRules::default();
        let mut event = running_event();
        let player = add_player(&mut event, "p", 10);
        add_code(&mut event, "trap1", QrColor::WhiteTrap);
        add_code(&mut event, "pink1", QrColor::Pink);

        let outcome = scan(&mut event, &rules, player, "trap1", NOW, &mut rng()).unwrap();
        assert_eq!(outcome, ScanOutcome::Penalty { points: 25, score: 0 });

        let outcome = scan(&mut event, &rules, player, "pink1", NOW, &mut rng()).unwrap();
        assert_eq!(outcome, ScanOutcome::PhotoChallenge);
        assert_eq!(event.players[&player].score, 0);
    }

    #[test]
    fn correct_answer_scores_with_bonus_and_reveals_in_auto_mode() {
        let mut event = running_event();
        event.game.bonus_multiplier = 3;
        let player = add_player(&mut event, "p", 0);
        let question = add_question(&mut event, QuestionCategory::Company);

        let outcome = answer(&mut event, player, question, AnswerLetter::B, NOW, &mut rng()).unwrap();
        assert!(outcome.correct);
        assert_eq!(outcome.score, 30);
        assert_eq!(outcome.letter_to_reveal.as_deref(), Some("S"));
        assert!(outcome.revealed_index.is_some());
        assert_eq!(event.game.password.revealed().len(), 1);
        assert_eq!(event.questions[&question].times_shown, 1);
        assert_eq!(event.questions[&question].times_correct, 1);

        let err = answer(&mut event, player, question, AnswerLetter::B, NOW, &mut rng()).unwrap_err();
        assert_eq!(err, RedemptionError::AlreadyAnswered);
    }

    #[test]
    fn wrong_answer_costs_five_and_manual_mode_reveals_nothing() {
        let mut event = running_event();
        event.game.password.mode = RevealMode::Manual;
        let player = add_player(&mut event, "p", 3);
        let question = add_question(&mut event, QuestionCategory::World);

        let outcome = answer(&mut event, player, question, AnswerLetter::C, NOW, &mut rng()).unwrap();
        assert!(!outcome.correct);
        assert_eq!(outcome.correct_answer, AnswerLetter::B);
        assert_eq!(outcome.score, 0);
        assert_eq!(outcome.letter_to_reveal, None);
        assert!(event.game.password.revealed().is_empty());
    }

    #[test]
    fn green_code_skips_disabled_and_completed_tracks() {
        let rules = GameRules::default();
        let mut event = running_event();
        let player = add_player(&mut event, "p", 0);
        add_code(&mut event, "green1", QrColor::Green);
        event.game.disabled_minigames.insert(MinigameTrack::Tetris);
        event.players[&player].minigame_progress.snake = 20;

        let outcome = scan(&mut event, &rules, player, "green1", NOW, &mut rng()).unwrap();
        assert_eq!(
            outcome,
            ScanOutcome::Minigame {
                track: MinigameTrack::Arkanoid,
                current_score: 0,
                target: 20
            }
        );

        event.players[&player].minigame_progress.arkanoid = 20;
        let outcome = scan(&mut event, &rules, player, "green1", NOW, &mut rng()).unwrap();
        assert_eq!(
            outcome,
            ScanOutcome::MinigameUnavailable(MinigameUnavailable::NothingLeft)
        );

        event.game.disabled_minigames.extend(MinigameTrack::ALL);
        let outcome = scan(&mut event, &rules, player, "green1", NOW, &mut rng()).unwrap();
        assert_eq!(
            outcome,
            ScanOutcome::MinigameUnavailable(MinigameUnavailable::AllDisabled)
        );
    }

    #[test]
    fn minigame_rewards_only_the_first_crossing() {
        let rules = GameRules::default();
        let mut event = running_event();
        event.game.password.set_secret("AB").unwrap();
        let player = add_player(&mut event, "p", 0);
        let mut rng = rng();

        let outcome =
            complete_minigame(&mut event, &rules, player, MinigameTrack::Snake, 12, &mut rng).unwrap();
        assert!(!outcome.completed);
        assert_eq!(outcome.score, 0);

        let outcome =
            complete_minigame(&mut event, &rules, player, MinigameTrack::Snake, 12, &mut rng).unwrap();
        assert!(outcome.completed);
        assert_eq!(outcome.progress, 24);
        assert_eq!(outcome.score, 10);
        let letter = outcome.revealed_letter.unwrap();
        assert!("AB".contains(letter));

        let outcome =
            complete_minigame(&mut event, &rules, player, MinigameTrack::Snake, 5, &mut rng).unwrap();
        assert!(!outcome.completed);
        assert_eq!(outcome.score, 10);
        assert_eq!(event.players[&player].revealed_letters.len(), 1);
    }

    #[test]
    fn disabled_minigame_rejects_points() {
        let mut event = running_event();
        let player = add_player(&mut event, "p", 0);
        event.game.disabled_minigames.insert(MinigameTrack::Tetris);
        let err = complete_minigame(
            &mut event,
            &GameRules::default(),
            player,
            MinigameTrack::Tetris,
            5,
            &mut rng(),
        )
        .unwrap_err();
        assert_eq!(err, RedemptionError::MinigameDisabled(MinigameTrack::Tetris));
    }
}
