use chrono::{DateTime, Utc};

use exam_core::model::{
    Answer, ExamId, ExamSettings, Exercise, HotspotId, ItemKey, OptionId, Question, StepId,
    TestItem,
};
use exam_core::sequencer::{ActionOutcome, ExerciseProgress, TextTrigger};
use exam_core::time::Clock;

use super::answers::AnswerStore;
use super::progress::SessionProgress;
use super::selection::ItemSelectionEngine;
use super::submission::{
    SessionOutcome, SubmissionBundle, SubmissionState, SubmissionTicket, SubmitReason,
};
use super::timer::{SessionTimer, TickOutcome};
use crate::error::SessionError;

/// One learner's sitting of an exam.
///
/// Items are frozen at start. Submission is two-phase: the controller hands
/// out a `SubmissionTicket` once, the pipeline evaluates it without borrowing
/// the controller, and [`Self::complete`] finalizes the session.
pub struct SessionController {
    exam_id: ExamId,
    items: Vec<TestItem>,
    current: usize,
    answers: AnswerStore,
    timer: SessionTimer,
    clock: Clock,
    started_at: DateTime<Utc>,
    confirm_pending: bool,
    state: SubmissionState,
    outcome: Option<SessionOutcome>,
}

impl SessionController {
    /// Select items for `settings` and start the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Selection` if selection fails, or
    /// `SessionError::Empty` if every selected exercise failed to load.
    pub async fn start(
        exam_id: ExamId,
        settings: &ExamSettings,
        engine: &ItemSelectionEngine,
        clock: Clock,
    ) -> Result<Self, SessionError> {
        let items = engine.select_for(settings).await?;
        Self::from_items(exam_id, items, settings.duration_minutes(), clock)
    }

    /// Start a session over an already selected item list.
    ///
    /// A `duration_minutes` of zero runs the session untimed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if `items` is empty.
    pub fn from_items(
        exam_id: ExamId,
        items: Vec<TestItem>,
        duration_minutes: Option<u32>,
        clock: Clock,
    ) -> Result<Self, SessionError> {
        if items.is_empty() {
            return Err(SessionError::Empty);
        }
        let answers = AnswerStore::seed(&items);
        let started_at = clock.now();
        tracing::info!(
            exam_id = %exam_id,
            items = items.len(),
            duration_minutes = ?duration_minutes,
            "Exam session started"
        );
        Ok(Self {
            exam_id,
            items,
            current: 0,
            answers,
            timer: SessionTimer::new(duration_minutes),
            clock,
            started_at,
            confirm_pending: false,
            state: SubmissionState::Open,
            outcome: None,
        })
    }

    #[must_use]
    pub fn exam_id(&self) -> ExamId {
        self.exam_id
    }

    #[must_use]
    pub fn items(&self) -> &[TestItem] {
        &self.items
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_item(&self) -> Option<&TestItem> {
        self.items.get(self.current)
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerStore {
        &self.answers
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn state(&self) -> SubmissionState {
        self.state
    }

    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.state == SubmissionState::Finalized
    }

    #[must_use]
    pub fn is_confirm_pending(&self) -> bool {
        self.confirm_pending
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    /// Playback state of an exercise item.
    #[must_use]
    pub fn exercise_progress(&self, key: ItemKey) -> Option<&ExerciseProgress> {
        match key {
            ItemKey::Exercise(id) => self.answers.progress(id),
            ItemKey::Question(_) => None,
        }
    }

    /// Returns a summary of the current session progress.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.items.len(),
            answered: self.answers.answered_count(&self.items),
            current_index: self.current,
            remaining_seconds: self.timer.remaining_seconds(),
            is_finalized: self.is_finalized(),
        }
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────
    //

    /// Move to the next item. Returns false at the last item.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finalized` after submission.
    pub fn next_item(&mut self) -> Result<bool, SessionError> {
        self.ensure_open()?;
        if self.current + 1 < self.items.len() {
            self.current += 1;
            return Ok(true);
        }
        Ok(false)
    }

    /// Move to the previous item. Returns false at the first item.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finalized` after submission.
    pub fn previous_item(&mut self) -> Result<bool, SessionError> {
        self.ensure_open()?;
        if self.current > 0 {
            self.current -= 1;
            return Ok(true);
        }
        Ok(false)
    }

    /// # Errors
    ///
    /// Returns `SessionError::IndexOutOfRange` past the last item.
    pub fn go_to_item(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_open()?;
        if index >= self.items.len() {
            return Err(SessionError::IndexOutOfRange(index));
        }
        self.current = index;
        Ok(())
    }

    //
    // ─── QUESTIONS ─────────────────────────────────────────────────────────────
    //

    /// # Errors
    ///
    /// Returns `SessionError::NotAQuestion` for exercise keys and
    /// `SessionError::Answer` if the answer does not fit the question.
    pub fn answer_question(&mut self, key: ItemKey, answer: Answer) -> Result<(), SessionError> {
        self.ensure_open()?;
        let question = find_question(&self.items, key)?;
        self.answers.set_answer(question, answer)?;
        Ok(())
    }

    /// Replace the option order of an ordering question.
    ///
    /// # Errors
    ///
    /// Same as [`Self::answer_question`].
    pub fn reorder(&mut self, key: ItemKey, order: Vec<OptionId>) -> Result<(), SessionError> {
        self.ensure_open()?;
        let question = find_question(&self.items, key)?;
        self.answers.reorder(question, order)?;
        Ok(())
    }

    /// Move one option of an ordering question.
    ///
    /// # Errors
    ///
    /// Same as [`Self::answer_question`].
    pub fn move_option(
        &mut self,
        key: ItemKey,
        from: usize,
        to: usize,
    ) -> Result<(), SessionError> {
        self.ensure_open()?;
        let question = find_question(&self.items, key)?;
        self.answers.move_option(question, from, to)?;
        Ok(())
    }

    //
    // ─── EXERCISES ─────────────────────────────────────────────────────────────
    //

    /// Click a button hotspot on the exercise's current step.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotAnExercise` for question keys and
    /// `SessionError::Sequencer` if the action is not allowed.
    pub fn press_hotspot(
        &mut self,
        key: ItemKey,
        step_id: StepId,
        hotspot_id: HotspotId,
    ) -> Result<ActionOutcome, SessionError> {
        self.ensure_open()?;
        let (exercise, progress) = self.exercise_parts(key)?;
        Ok(progress.press(exercise, step_id, hotspot_id)?)
    }

    /// Submit a textbox value on the exercise's current step.
    ///
    /// # Errors
    ///
    /// Same as [`Self::press_hotspot`].
    pub fn enter_hotspot_text(
        &mut self,
        key: ItemKey,
        step_id: StepId,
        hotspot_id: HotspotId,
        value: &str,
        trigger: TextTrigger,
    ) -> Result<ActionOutcome, SessionError> {
        self.ensure_open()?;
        let (exercise, progress) = self.exercise_parts(key)?;
        let outcome = progress.enter_text(exercise, step_id, hotspot_id, value)?;
        tracing::debug!(
            item = %key,
            hotspot_id = %hotspot_id,
            trigger = ?trigger,
            answered = outcome != ActionOutcome::Inert,
            "Textbox value submitted"
        );
        Ok(outcome)
    }

    /// # Errors
    ///
    /// Returns `SessionError::NotAnExercise` for question keys.
    pub fn next_step(&mut self, key: ItemKey) -> Result<bool, SessionError> {
        self.ensure_open()?;
        let (exercise, progress) = self.exercise_parts(key)?;
        Ok(progress.next(exercise))
    }

    /// # Errors
    ///
    /// Returns `SessionError::NotAnExercise` for question keys.
    pub fn previous_step(&mut self, key: ItemKey) -> Result<bool, SessionError> {
        self.ensure_open()?;
        let (_, progress) = self.exercise_parts(key)?;
        Ok(progress.previous())
    }

    /// # Errors
    ///
    /// Returns `SessionError::Sequencer` for an out of range step index.
    pub fn go_to_step(&mut self, key: ItemKey, index: usize) -> Result<(), SessionError> {
        self.ensure_open()?;
        let (exercise, progress) = self.exercise_parts(key)?;
        progress.go_to(exercise, index)?;
        Ok(())
    }

    fn exercise_parts(
        &mut self,
        key: ItemKey,
    ) -> Result<(&Exercise, &mut ExerciseProgress), SessionError> {
        let exercise = self
            .items
            .iter()
            .find(|item| item.key() == key)
            .ok_or(SessionError::ItemNotFound(key))?
            .as_exercise()
            .ok_or(SessionError::NotAnExercise(key))?;
        let progress = self
            .answers
            .progress_mut(exercise.id())
            .ok_or(SessionError::ItemNotFound(key))?;
        Ok((exercise, progress))
    }

    //
    // ─── TIMER & SUBMISSION ────────────────────────────────────────────────────
    //

    /// Advance the countdown by one second.
    ///
    /// Returns the auto-submission ticket on the tick that runs out the time.
    pub fn tick(&mut self) -> Option<SubmissionTicket> {
        if self.state != SubmissionState::Open {
            return None;
        }
        match self.timer.tick() {
            TickOutcome::Expired => {
                tracing::info!(exam_id = %self.exam_id, "Exam time expired, submitting");
                Some(self.issue_ticket(SubmitReason::TimeExpired))
            }
            TickOutcome::Running { .. } | TickOutcome::Idle => None,
        }
    }

    /// Ask the learner to confirm submission.
    ///
    /// A no-op while a submission is already in flight.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finalized` after submission.
    pub fn request_submit(&mut self) -> Result<(), SessionError> {
        match self.state {
            SubmissionState::Finalized => Err(SessionError::Finalized),
            SubmissionState::InFlight => Ok(()),
            SubmissionState::Open => {
                self.confirm_pending = true;
                Ok(())
            }
        }
    }

    pub fn cancel_submit(&mut self) {
        self.confirm_pending = false;
    }

    /// Confirm a requested submission and take the ticket.
    ///
    /// Returns `None` if a submission is already in flight.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SubmitNotRequested` without a prior
    /// [`Self::request_submit`], or `SessionError::Finalized` after submission.
    pub fn confirm_submit(&mut self) -> Result<Option<SubmissionTicket>, SessionError> {
        match self.state {
            SubmissionState::Finalized => Err(SessionError::Finalized),
            SubmissionState::InFlight => Ok(None),
            SubmissionState::Open if !self.confirm_pending => Err(SessionError::SubmitNotRequested),
            SubmissionState::Open => Ok(Some(self.issue_ticket(SubmitReason::Manual))),
        }
    }

    /// Finalize with the pipeline's outcome for the issued ticket.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SubmitNotRequested` if no ticket was issued, or
    /// `SessionError::Finalized` if the session was already completed.
    pub fn complete(&mut self, outcome: SessionOutcome) -> Result<&SessionOutcome, SessionError> {
        match self.state {
            SubmissionState::Finalized => return Err(SessionError::Finalized),
            SubmissionState::Open => return Err(SessionError::SubmitNotRequested),
            SubmissionState::InFlight => {}
        }
        self.state = SubmissionState::Finalized;
        self.timer.stop();
        tracing::info!(
            exam_id = %self.exam_id,
            degraded = outcome.is_degraded(),
            elapsed_seconds = outcome.bundle.elapsed_seconds,
            "Exam session finalized"
        );
        Ok(&*self.outcome.insert(outcome))
    }

    fn issue_ticket(&mut self, reason: SubmitReason) -> SubmissionTicket {
        self.state = SubmissionState::InFlight;
        self.confirm_pending = false;
        self.timer.stop();
        let bundle = SubmissionBundle {
            answers: self.answers.export_answers(),
            exercise_responses: self.answers.export_exercise_responses(),
            elapsed_seconds: self.clock.elapsed_seconds(self.started_at),
            item_order: self.items.iter().map(TestItem::key).collect(),
        };
        SubmissionTicket {
            exam_id: self.exam_id,
            reason,
            bundle,
            items: self.items.clone(),
        }
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        match self.state {
            SubmissionState::Open => Ok(()),
            SubmissionState::InFlight => Err(SessionError::Submitting),
            SubmissionState::Finalized => Err(SessionError::Finalized),
        }
    }

    /// Advance a fixed clock, e.g. in tests replaying a timed sitting.
    pub fn advance_clock(&mut self, delta: chrono::Duration) {
        self.clock.advance(delta);
    }
}

fn find_question(items: &[TestItem], key: ItemKey) -> Result<&Question, SessionError> {
    items
        .iter()
        .find(|item| item.key() == key)
        .ok_or(SessionError::ItemNotFound(key))?
        .as_question()
        .ok_or(SessionError::NotAQuestion(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::geometry::Point;
    use exam_core::model::{
        ExerciseId, Hotspot, HotspotKind, ItemLabels, QuestionId, QuestionKind, QuestionOption,
        Step, StepImage, TopicId,
    };
    use exam_core::time::fixed_now;

    fn true_false(id: u64) -> TestItem {
        let question = Question::new(
            QuestionId::new(id),
            TopicId::new(1),
            format!("Statement {id}"),
            QuestionKind::TrueFalse,
        )
        .unwrap();
        TestItem::question(question, ItemLabels::default())
    }

    fn one_button_exercise() -> (TestItem, StepId, HotspotId) {
        let mut exercise = Exercise::new(ExerciseId::new(5), TopicId::new(1), "Save");
        let image = StepImage::new("https://cdn.example.com/a.png", 640, 480).unwrap();
        let step_id = StepId::new(50);
        let mut step = Step::new(step_id, exercise.id(), 1, image).unwrap();
        let hotspot = Hotspot::place(
            HotspotId::generate(),
            step_id,
            HotspotKind::Button,
            Point::new(50.0, 50.0),
        );
        let hotspot_id = hotspot.id();
        step.push_hotspot(hotspot).unwrap();
        exercise.push_step(step);
        (
            TestItem::exercise(exercise, ItemLabels::default()),
            step_id,
            hotspot_id,
        )
    }

    fn session(items: Vec<TestItem>, minutes: Option<u32>) -> SessionController {
        SessionController::from_items(ExamId::new(1), items, minutes, Clock::fixed(fixed_now()))
            .unwrap()
    }

    #[test]
    fn empty_session_is_rejected() {
        assert!(matches!(
            SessionController::from_items(ExamId::new(1), Vec::new(), None, Clock::default()),
            Err(SessionError::Empty)
        ));
    }

    #[test]
    fn navigation_stays_in_bounds() {
        let mut session = session(vec![true_false(1), true_false(2)], None);
        assert!(!session.previous_item().unwrap());
        assert!(session.next_item().unwrap());
        assert!(!session.next_item().unwrap());
        assert!(matches!(
            session.go_to_item(2),
            Err(SessionError::IndexOutOfRange(2))
        ));
    }

    #[test]
    fn progress_counts_answers_and_exercise_completion() {
        let (exercise, step_id, hotspot_id) = one_button_exercise();
        let exercise_key = exercise.key();
        let mut session = session(vec![true_false(1), exercise], Some(10));
        assert_eq!(session.progress().answered, 0);
        assert_eq!(session.progress().remaining_seconds, Some(600));

        session
            .answer_question(ItemKey::Question(QuestionId::new(1)), Answer::Boolean(true))
            .unwrap();
        let outcome = session
            .press_hotspot(exercise_key, step_id, hotspot_id)
            .unwrap();
        assert!(matches!(
            outcome,
            ActionOutcome::Answered {
                exercise_complete: true,
                ..
            }
        ));
        assert_eq!(session.progress().answered, 2);
    }

    #[test]
    fn wrong_item_kind_is_rejected() {
        let (exercise, step_id, hotspot_id) = one_button_exercise();
        let mut session = session(vec![true_false(1), exercise], None);
        let question_key = ItemKey::Question(QuestionId::new(1));
        assert!(matches!(
            session.press_hotspot(question_key, step_id, hotspot_id),
            Err(SessionError::NotAnExercise(_))
        ));
        assert!(matches!(
            session.answer_question(ItemKey::Exercise(ExerciseId::new(5)), Answer::Boolean(true)),
            Err(SessionError::NotAQuestion(_))
        ));
    }

    #[test]
    fn timer_expiry_issues_exactly_one_ticket() {
        let mut session = session(vec![true_false(1)], Some(1));
        let tickets: Vec<_> = (0..120).filter_map(|_| session.tick()).collect();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].reason, SubmitReason::TimeExpired);
        assert_eq!(session.confirm_submit().unwrap(), None);
    }

    #[test]
    fn manual_submission_requires_confirmation() {
        let mut session = session(vec![true_false(1)], None);
        assert!(matches!(
            session.confirm_submit(),
            Err(SessionError::SubmitNotRequested)
        ));
        session.request_submit().unwrap();
        session.advance_clock(chrono::Duration::seconds(95));
        let ticket = session.confirm_submit().unwrap().unwrap();
        assert_eq!(ticket.bundle.elapsed_seconds, 95);
        assert_eq!(
            ticket.bundle.item_order,
            vec![ItemKey::Question(QuestionId::new(1))]
        );
        assert!(matches!(
            session.answer_question(ItemKey::Question(QuestionId::new(1)), Answer::Boolean(true)),
            Err(SessionError::Submitting)
        ));
    }

    #[test]
    fn finalized_session_rejects_mutation() {
        let ordering = Question::new(
            QuestionId::new(3),
            TopicId::new(1),
            "Order",
            QuestionKind::Ordering {
                options: vec![
                    QuestionOption::new(OptionId::new(1), "A"),
                    QuestionOption::new(OptionId::new(2), "B"),
                ],
            },
        )
        .unwrap();
        let mut session = session(
            vec![TestItem::question(ordering, ItemLabels::default())],
            None,
        );
        session.request_submit().unwrap();
        let ticket = session.confirm_submit().unwrap().unwrap();
        let outcome = SessionOutcome {
            reason: ticket.reason,
            bundle: ticket.bundle,
            evaluation: None,
            evaluation_error: Some("offline".into()),
        };
        session.complete(outcome.clone()).unwrap();

        assert!(session.is_finalized());
        assert!(matches!(session.next_item(), Err(SessionError::Finalized)));
        assert!(matches!(
            session.move_option(ItemKey::Question(QuestionId::new(3)), 0, 1),
            Err(SessionError::Finalized)
        ));
        assert!(matches!(session.request_submit(), Err(SessionError::Finalized)));
        assert!(matches!(session.complete(outcome), Err(SessionError::Finalized)));
        assert_eq!(session.tick(), None);
    }

    #[test]
    fn completing_without_a_ticket_is_rejected() {
        let mut session = session(vec![true_false(1)], None);
        session.request_submit().unwrap();
        let outcome = SessionOutcome {
            reason: SubmitReason::Manual,
            bundle: SubmissionBundle {
                answers: Default::default(),
                exercise_responses: Default::default(),
                elapsed_seconds: 0,
                item_order: Vec::new(),
            },
            evaluation: None,
            evaluation_error: None,
        };

        assert!(matches!(
            session.complete(outcome),
            Err(SessionError::SubmitNotRequested)
        ));
        assert!(!session.is_finalized());
        assert!(session.confirm_submit().unwrap().is_some());
    }

    #[test]
    fn zero_minutes_runs_untimed() {
        let mut session = session(vec![true_false(1)], Some(0));
        assert_eq!(session.progress().remaining_seconds, None);
        assert!((0..120).all(|_| session.tick().is_none()));
        assert!(session.next_item().is_ok());
    }
}
