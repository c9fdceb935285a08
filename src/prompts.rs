//! Prompt deck: where each round's prompt and machine answer come from

use rand::seq::IndexedRandom;
use std::path::Path;

use crate::types::Prompt;

#[derive(Debug, thiserror::Error)]
pub enum PromptDeckError {
    #[error("failed to read prompt file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse prompt file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("prompt deck is empty")]
    Empty,

    #[error("prompt {0} has no model response")]
    MissingLlmResponse(String),
}

#[derive(Debug, Clone)]
pub struct PromptDeck {
    prompts: Vec<Prompt>,
}

impl PromptDeck {
    pub fn new(prompts: Vec<Prompt>) -> Result<Self, PromptDeckError> {
        if prompts.is_empty() {
            return Err(PromptDeckError::Empty);
        }
        if let Some(bad) = prompts.iter().find(|p| p.llm_response.is_none()) {
            return Err(PromptDeckError::MissingLlmResponse(bad.id.clone()));
        }
        Ok(Self { prompts })
    }

    /// Load a JSON array of prompts
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PromptDeckError> {
        let raw = std::fs::read_to_string(path)?;
        let prompts: Vec<Prompt> = serde_json::from_str(&raw)?;
        Self::new(prompts)
    }

    pub fn builtin() -> Self {
        let prompts = vec![
            Prompt::new(
                "builtin-1",
                "What is the worst possible name for a cat?",
                "Sir Reginald Fluffington the Third, Destroyer of Curtains.",
                "gpt-4o-mini",
            ),
            Prompt::new(
                "builtin-2",
                "Describe your morning routine in one sentence.",
                "Coffee first, then I negotiate with my alarm about the meaning of 'five more minutes'.",
                "gpt-4o-mini",
            ),
            Prompt::new(
                "builtin-3",
                "What would you do with a free Tuesday?",
                "Sleep in, eat pancakes for lunch and finally fix that squeaky door.",
                "gpt-4o-mini",
            ),
            Prompt::new(
                "builtin-4",
                "What is the most overrated food?",
                "Avocado toast. It's just mushy green stuff on bread with a price tag.",
                "gpt-4o-mini",
            ),
        ];
        Self { prompts }
    }

    /// Load from `path` if given, otherwise the built-in deck
    pub fn load(path: Option<&str>) -> Result<Self, PromptDeckError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    /// Uniformly random prompt for the next round
    pub fn draw(&self) -> Option<Prompt> {
        self.prompts.choose(&mut rand::rng()).cloned()
    }
}
