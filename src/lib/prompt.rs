use dialoguer::{Confirm, Input};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Quit at the operator's request")]
    Quit,
    #[error("Failed to read from the terminal")]
    Terminal(#[from] dialoguer::Error),
}

/// Questions asked of the operator.
pub trait Prompt {
    /// Yes or no. Quitting surfaces as [`Error::Quit`].
    fn confirm(&mut self, question: &str) -> Result<bool, Error>;

    fn input(&mut self, question: &str) -> Result<String, Error>;
}

/// Interactive prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct Terminal;

impl Prompt for Terminal {
    fn confirm(&mut self, question: &str) -> Result<bool, Error> {
        // `interact_opt` yields `None` on Esc or `q`.
        Confirm::new()
            .with_prompt(question)
            .interact_opt()?
            .ok_or(Error::Quit)
    }

    fn input(&mut self, question: &str) -> Result<String, Error> {
        Ok(Input::<String>::new().with_prompt(question).interact_text()?)
    }
}

/// Replays canned answers and records every question asked.
#[derive(Debug, Default)]
pub struct Scripted {
    answers: std::collections::VecDeque<String>,
    pub asked: Vec<String>,
}

impl Scripted {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    fn next(&mut self, question: &str) -> Result<String, Error> {
        self.asked.push(question.to_owned());
        self.answers.pop_front().ok_or(Error::Quit)
    }
}

impl Prompt for Scripted {
    fn confirm(&mut self, question: &str) -> Result<bool, Error> {
        let answer = self.next(question)?;
        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => Ok(true),
            "n" | "no" => Ok(false),
            _ => Err(Error::Quit),
        }
    }

    fn input(&mut self, question: &str) -> Result<String, Error> {
        self.next(question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_answers_in_order() {
        let mut prompt = Scripted::new(["y", "No", "key"]);
        assert!(prompt.confirm("First?").unwrap());
        assert!(!prompt.confirm("Second?").unwrap());
        assert_eq!(prompt.input("Key").unwrap(), "key");
        assert!(matches!(prompt.confirm("Third?"), Err(Error::Quit)));
        assert_eq!(prompt.asked, ["First?", "Second?", "Key", "Third?"]);
    }
}
