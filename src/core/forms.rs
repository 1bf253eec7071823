//! Small forms that sit next to the project form: the biosafety
//! confirmation, renaming, and chat messages.

use serde::{Deserialize, Serialize};

use crate::core::issues::{FieldCode, ValidationErrors};

pub const NAME_MAX_CHARS: usize = 64;
pub const MESSAGE_MAX_CHARS: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
    No,
}

/// Three screening questions plus three consents. Unanswered questions are
/// `None` until the user picks one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmForm {
    pub question: Questions,
    pub consent: Consents,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Questions {
    pub toxin: Option<Answer>,
    pub pathogen: Option<Answer>,
    pub virus: Option<Answer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Consents {
    pub compliance: bool,
    pub disclaimer: bool,
    pub warranty: bool,
}

impl ConfirmForm {
    /// Every answer given and every consent checked. Either answer to a
    /// question is acceptable.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let questions = [
            ("toxin", self.question.toxin),
            ("pathogen", self.question.pathogen),
            ("virus", self.question.virus),
        ];
        for (name, answer) in questions {
            if answer.is_none() {
                errors.push(&["question", name], FieldCode::Required);
            }
        }

        let consents = [
            ("compliance", self.consent.compliance),
            ("disclaimer", self.consent.disclaimer),
            ("warranty", self.consent.warranty),
        ];
        for (name, given) in consents {
            if !given {
                errors.push(&["consent", name], FieldCode::Required);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn check_length(field: &str, value: &str, max: usize) -> Result<(), ValidationErrors> {
    let len = value.chars().count();
    let code = if len == 0 {
        FieldCode::TooShort
    } else if len > max {
        FieldCode::TooLong
    } else {
        return Ok(());
    };

    let mut errors = ValidationErrors::new();
    errors.push(&[field], code);
    Err(errors)
}

/// Project or room name, 1 to 64 characters.
pub fn validate_name(name: &str) -> Result<(), ValidationErrors> {
    check_length("name", name, NAME_MAX_CHARS)
}

/// Chat message body, 1 to 1024 characters.
pub fn validate_message(text: &str) -> Result<(), ValidationErrors> {
    check_length("text", text, MESSAGE_MAX_CHARS)
}
