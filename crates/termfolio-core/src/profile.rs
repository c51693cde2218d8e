//! Static portfolio content served by the shell.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const BUILTIN_PROFILE: &str = include_str!("../data/profile.json");

/// A portfolio project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Project name.
    pub name: String,
    /// One-paragraph description.
    pub description: String,
    /// Languages and tools used.
    #[serde(default)]
    pub stack: Vec<String>,
    /// Repository or demo link.
    pub link: String,
}

/// Read-only portfolio data, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Portfolio owner's name.
    pub owner: String,
    /// ASCII art shown on connect and by `ABOUT`.
    #[serde(default)]
    pub banner: String,
    /// Introduction text.
    pub about: String,
    /// Reply to `HELLO`.
    #[serde(default)]
    pub greeting: String,
    /// Skill list.
    #[serde(default)]
    pub skills: Vec<String>,
    /// Project list; `PROJECTS` indices are 1-based into this.
    #[serde(default)]
    pub projects: Vec<Project>,
    /// Resume link.
    #[serde(default)]
    pub resume_url: String,
    /// Instruction sent to the chat backend with every request.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

/// Profile loading error.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid profile: {0}")]
    Json(#[from] serde_json::Error),
}

impl Default for Profile {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Profile {
    /// The profile compiled into the binary.
    ///
    /// # Panics
    /// Panics if the embedded profile is malformed, which the test suite rules out.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn builtin() -> Self {
        serde_json::from_str(BUILTIN_PROFILE).expect("embedded profile is valid JSON")
    }

    /// Parse a profile from JSON text.
    ///
    /// # Errors
    /// Returns error if the JSON does not describe a profile.
    pub fn from_json(json: &str) -> Result<Self, ProfileError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a profile from a JSON file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Project at a 1-based index.
    #[must_use]
    pub fn project(&self, index: usize) -> Option<&Project> {
        index.checked_sub(1).and_then(|i| self.projects.get(i))
    }
}
