//! Per-member questionnaire state machine.
//!
//! A session walks `AwaitingAnswer(0) .. AwaitingAnswer(n-1)` and then waits
//! for a character pick. It never touches the pool or the gateway itself; the
//! coordinator drives it and performs the returned [`Step`]s.

use poise::serenity_prelude::UserId;
use std::collections::HashMap;
use std::fmt;

use crate::error::{BotError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the answer to the question at this index
    AwaitingAnswer(usize),
    AwaitingSelection,
    Done,
    Abandoned,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingAnswer(i) => write!(f, "awaiting answer {}", i + 1),
            Self::AwaitingSelection => write!(f, "awaiting selection"),
            Self::Done => write!(f, "done"),
            Self::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// What the coordinator should do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Send this question and wait for a reply
    Ask(String),
    /// All questions answered; run character selection
    Select,
}

#[derive(Debug, Clone)]
pub struct Session {
    member_id: UserId,
    questions: Vec<String>,
    answers: HashMap<String, String>,
    cursor: usize,
    state: SessionState,
}

impl Session {
    pub fn new(member_id: UserId, questions: Vec<String>) -> Self {
        Self {
            member_id,
            questions,
            answers: HashMap::new(),
            cursor: 0,
            state: SessionState::AwaitingAnswer(0),
        }
    }

    pub fn member_id(&self) -> UserId {
        self.member_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn answers(&self) -> &HashMap<String, String> {
        &self.answers
    }

    pub fn start(&mut self) -> Step {
        match self.questions.first() {
            Some(first) => {
                self.state = SessionState::AwaitingAnswer(0);
                Step::Ask(first.clone())
            }
            None => {
                self.state = SessionState::AwaitingSelection;
                Step::Select
            }
        }
    }

    pub fn submit_answer(&mut self, text: &str) -> Result<Step> {
        let SessionState::AwaitingAnswer(index) = self.state else {
            return Err(self.invalid("accept an answer"));
        };

        let question = self.questions[index].clone();
        self.answers.insert(question, text.trim().to_string());
        self.cursor = index + 1;

        match self.questions.get(self.cursor) {
            Some(next) => {
                self.state = SessionState::AwaitingAnswer(self.cursor);
                Ok(Step::Ask(next.clone()))
            }
            None => {
                self.state = SessionState::AwaitingSelection;
                Ok(Step::Select)
            }
        }
    }

    /// Selection resolved with an assignment
    pub fn complete(&mut self) -> Result<()> {
        if self.state != SessionState::AwaitingSelection {
            return Err(self.invalid("complete"));
        }
        self.state = SessionState::Done;
        Ok(())
    }

    pub fn abandon(&mut self) {
        if self.state != SessionState::Done {
            self.state = SessionState::Abandoned;
        }
    }

    fn invalid(&self, action: &str) -> BotError {
        BotError::InvalidState {
            action: action.to_string(),
            state: self.state.to_string(),
        }
    }
}
