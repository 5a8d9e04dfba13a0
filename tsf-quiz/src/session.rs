//! Quiz session state machine
//!
//! ```text
//! AwaitingLevel1 -> Level1Filtered -> AnsweringLevel2 -> Level2Complete
//! ```
//!
//! A [`QuizSession`] is an ordinary value owned by the caller and passed by
//! `&mut` to every operation. Network calls live in [`crate::flow`]; the
//! session only changes once a call has succeeded.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use tsf_common::api::{FilterRequest, QuizQuestion};
use tsf_common::{Trait, TraitTotals};

use crate::error::{QuizError, QuizResult};

/// Number of user traits sent to the Level-2 filter
pub const TOP_TRAITS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuizPhase {
    AwaitingLevel1,
    Level1Filtered,
    AnsweringLevel2,
    Level2Complete,
}

impl fmt::Display for QuizPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QuizPhase::AwaitingLevel1 => "awaiting level 1",
            QuizPhase::Level1Filtered => "level 1 filtered",
            QuizPhase::AnsweringLevel2 => "answering level 2",
            QuizPhase::Level2Complete => "level 2 complete",
        };
        f.write_str(s)
    }
}

/// Level-1 categorical choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level1Choice {
    Undergraduate,
    Graduate,
    /// No preference: every programme stays a candidate
    Exploring,
}

impl Level1Choice {
    /// Catalog programme type filtered on, `None` for no filter
    pub fn programme_type(self) -> Option<&'static str> {
        match self {
            Level1Choice::Undergraduate => Some("grundständig"),
            Level1Choice::Graduate => Some("weiterführend"),
            Level1Choice::Exploring => None,
        }
    }
}

impl FromStr for Level1Choice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "undergraduate" | "bachelor" | "1" => Ok(Level1Choice::Undergraduate),
            "graduate" | "master" | "2" => Ok(Level1Choice::Graduate),
            "exploring" | "unsure" | "3" => Ok(Level1Choice::Exploring),
            other => Err(format!("unknown choice {:?}", other)),
        }
    }
}

/// Level-2 answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
    No,
    Skip,
}

impl Answer {
    /// Points added to the question's trait
    pub fn delta(self) -> i32 {
        match self {
            Answer::Yes => 1,
            Answer::No => -1,
            Answer::Skip => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: i64,
    pub riasec_type: Trait,
    pub answer: Answer,
}

/// One quiz attempt
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSession {
    phase: QuizPhase,
    level1_choice: Option<Level1Choice>,
    candidates: Vec<i64>,
    questions: Vec<QuizQuestion>,
    answers: Vec<AnswerRecord>,
    totals: TraitTotals,
    results: Option<Vec<i64>>,
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizSession {
    pub fn new() -> Self {
        Self {
            phase: QuizPhase::AwaitingLevel1,
            level1_choice: None,
            candidates: Vec::new(),
            questions: Vec::new(),
            answers: Vec::new(),
            totals: TraitTotals::default(),
            results: None,
        }
    }

    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    pub fn level1_choice(&self) -> Option<Level1Choice> {
        self.level1_choice
    }

    /// Level-1 candidate ids
    pub fn candidates(&self) -> &[i64] {
        &self.candidates
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    pub fn totals(&self) -> TraitTotals {
        self.totals
    }

    /// Index of the next question to answer
    pub fn current_index(&self) -> usize {
        self.answers.len()
    }

    /// Next question, `None` outside of Level 2 or after the last answer
    pub fn current_question(&self) -> Option<&QuizQuestion> {
        match self.phase {
            QuizPhase::AnsweringLevel2 => self.questions.get(self.answers.len()),
            _ => None,
        }
    }

    /// Final result ids once the Level-2 filter has answered
    pub fn results(&self) -> Option<&[i64]> {
        self.results.as_deref()
    }

    fn expect_phase(&self, action: &'static str, allowed: &[QuizPhase]) -> QuizResult<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(QuizError::InvalidTransition {
                action,
                phase: self.phase,
            })
        }
    }

    /// Filter request for a Level-1 choice
    pub fn level1_request(&self, choice: Level1Choice) -> QuizResult<FilterRequest> {
        self.expect_phase("submit level 1", &[QuizPhase::AwaitingLevel1])?;
        Ok(FilterRequest::level1(choice.programme_type()))
    }

    /// Record the Level-1 outcome
    pub fn apply_level1(&mut self, choice: Level1Choice, candidates: Vec<i64>) -> QuizResult<()> {
        self.expect_phase("apply level 1", &[QuizPhase::AwaitingLevel1])?;
        debug!(?choice, candidates = candidates.len(), "Level 1 filtered");
        self.level1_choice = Some(choice);
        self.candidates = candidates;
        self.phase = QuizPhase::Level1Filtered;
        Ok(())
    }

    /// Start Level 2 with a new question set.
    ///
    /// This is the only place the trait totals are reset. An empty question
    /// set completes Level 2 immediately.
    pub fn load_questions(&mut self, questions: Vec<QuizQuestion>) -> QuizResult<()> {
        self.expect_phase(
            "load questions",
            &[
                QuizPhase::Level1Filtered,
                QuizPhase::AnsweringLevel2,
                QuizPhase::Level2Complete,
            ],
        )?;

        self.totals = TraitTotals::default();
        self.answers.clear();
        self.results = None;
        self.phase = if questions.is_empty() {
            QuizPhase::Level2Complete
        } else {
            QuizPhase::AnsweringLevel2
        };
        self.questions = questions;
        Ok(())
    }

    /// Answer the current question
    pub fn answer(&mut self, answer: Answer) -> QuizResult<()> {
        self.expect_phase("answer", &[QuizPhase::AnsweringLevel2])?;

        let question = self
            .questions
            .get(self.answers.len())
            .ok_or(QuizError::InvalidTransition {
                action: "answer",
                phase: self.phase,
            })?;

        self.totals.add(question.riasec_type, answer.delta());
        self.answers.push(AnswerRecord {
            question_id: question.id,
            riasec_type: question.riasec_type,
            answer,
        });

        if self.answers.len() == self.questions.len() {
            self.phase = QuizPhase::Level2Complete;
            debug!(totals = ?self.totals.values(), "Level 2 complete");
        }
        Ok(())
    }

    /// Revert the most recent Level-2 answer
    pub fn undo(&mut self) -> QuizResult<()> {
        self.expect_phase(
            "undo",
            &[QuizPhase::AnsweringLevel2, QuizPhase::Level2Complete],
        )?;

        let last = self.answers.pop().ok_or(QuizError::InvalidTransition {
            action: "undo without answers",
            phase: self.phase,
        })?;

        self.totals.add(last.riasec_type, -last.answer.delta());
        self.results = None;
        self.phase = QuizPhase::AnsweringLevel2;
        Ok(())
    }

    /// The user's strongest traits with their totals
    pub fn top_three(&self) -> Vec<(Trait, i32)> {
        self.totals.top(TOP_TRAITS)
    }

    /// Filter request for the completed Level 2
    pub fn level2_request(&self) -> QuizResult<FilterRequest> {
        self.expect_phase("submit level 2", &[QuizPhase::Level2Complete])?;
        Ok(FilterRequest::level2(&self.top_three(), &self.candidates))
    }

    /// Record the Level-2 filter outcome
    pub fn apply_results(&mut self, ids: Vec<i64>) -> QuizResult<()> {
        self.expect_phase("apply results", &[QuizPhase::Level2Complete])?;
        self.results = Some(ids);
        Ok(())
    }

    /// Discard the attempt and start over
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Trait::*;

    fn question(id: i64, riasec_type: Trait) -> QuizQuestion {
        QuizQuestion {
            id,
            text: format!("Frage {}", id),
            riasec_type,
        }
    }

    fn session_with(questions: Vec<QuizQuestion>) -> QuizSession {
        let mut session = QuizSession::new();
        session
            .apply_level1(Level1Choice::Exploring, vec![1, 2, 3])
            .unwrap();
        session.load_questions(questions).unwrap();
        session
    }

    #[test]
    fn test_answer_deltas() {
        let mut session = session_with(vec![
            question(1, Realistic),
            question(2, Realistic),
            question(3, Social),
            question(4, Social),
            question(5, Conventional),
        ]);

        session.answer(Answer::Yes).unwrap();
        assert_eq!(session.totals().get(Realistic), 1);
        session.answer(Answer::Yes).unwrap();
        assert_eq!(session.totals().get(Realistic), 2);

        session.answer(Answer::No).unwrap();
        session.answer(Answer::No).unwrap();
        assert_eq!(session.totals().get(Social), -2);

        session.answer(Answer::Skip).unwrap();
        assert_eq!(session.totals().get(Conventional), 0);
        assert_eq!(session.phase(), QuizPhase::Level2Complete);
    }

    #[test]
    fn test_top_three_from_answers() {
        // R=1, I=2, A=3, S=4, E=5, C=1
        let plan = [
            (Realistic, 1),
            (Investigative, 2),
            (Artistic, 3),
            (Social, 4),
            (Enterprising, 5),
            (Conventional, 1),
        ];
        let mut questions = Vec::new();
        for (t, count) in plan {
            for _ in 0..count {
                questions.push(question(questions.len() as i64 + 1, t));
            }
        }
        let total = questions.len();
        let mut session = session_with(questions);
        for _ in 0..total {
            session.answer(Answer::Yes).unwrap();
        }

        assert_eq!(
            session.top_three(),
            vec![(Enterprising, 5), (Social, 4), (Artistic, 3)]
        );
    }

    #[test]
    fn test_undo_restores_totals_and_index() {
        let mut session = session_with(vec![question(1, Artistic), question(2, Enterprising)]);
        session.answer(Answer::Yes).unwrap();

        let totals = session.totals();
        let index = session.current_index();

        session.answer(Answer::No).unwrap();
        assert_eq!(session.phase(), QuizPhase::Level2Complete);

        session.undo().unwrap();
        assert_eq!(session.totals(), totals);
        assert_eq!(session.current_index(), index);
        assert_eq!(session.phase(), QuizPhase::AnsweringLevel2);
        assert_eq!(session.current_question().map(|q| q.id), Some(2));

        session.undo().unwrap();
        assert!(session.undo().is_err());
    }

    #[test]
    fn test_load_questions_resets_totals() {
        let mut session = session_with(vec![question(1, Social)]);
        session.answer(Answer::Yes).unwrap();
        session.apply_results(vec![2]).unwrap();

        session.load_questions(vec![question(7, Realistic)]).unwrap();

        assert_eq!(session.totals(), TraitTotals::default());
        assert!(session.answers().is_empty());
        assert!(session.results().is_none());
        assert_eq!(session.candidates(), &[1, 2, 3]);
        assert_eq!(session.phase(), QuizPhase::AnsweringLevel2);
    }

    #[test]
    fn test_invalid_transitions() {
        let mut session = QuizSession::new();
        assert!(matches!(
            session.answer(Answer::Yes),
            Err(QuizError::InvalidTransition { .. })
        ));
        assert!(session.level2_request().is_err());
        assert!(session.load_questions(vec![]).is_err());

        session.apply_level1(Level1Choice::Graduate, vec![]).unwrap();
        assert!(session.level1_request(Level1Choice::Graduate).is_err());
    }

    #[test]
    fn test_level1_mapping() {
        let session = QuizSession::new();
        let request = session.level1_request(Level1Choice::Undergraduate).unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["answers"][0]["studientyp"], "grundständig");

        let request = session.level1_request(Level1Choice::Exploring).unwrap();
        assert!(request.answers.is_empty());

        assert_eq!("master".parse::<Level1Choice>(), Ok(Level1Choice::Graduate));
    }

    #[test]
    fn test_empty_question_set_completes() {
        let session = session_with(vec![]);
        assert_eq!(session.phase(), QuizPhase::Level2Complete);
        assert!(session.level2_request().is_ok());
    }

    #[test]
    fn test_reset() {
        let mut session = session_with(vec![question(1, Social)]);
        session.answer(Answer::Yes).unwrap();
        session.reset();
        assert_eq!(session, QuizSession::new());
    }
}
