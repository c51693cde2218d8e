//! Static table of recognized shell commands.

use std::fmt::Write as _;

use crate::fuzzy;

/// A registered command and its help text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEntry {
    /// Canonical upper-case name.
    pub name: &'static str,
    /// Alternative names resolving to the same command.
    pub aliases: &'static [&'static str],
    /// One-line description shown in the help listing.
    pub description: &'static str,
    /// Detailed usage returned by `HELP <name>`.
    pub usage: Option<&'static str>,
}

impl CommandEntry {
    /// Whether `name` refers to this entry, ignoring case.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// Usage text, falling back to the short description.
    #[must_use]
    pub fn usage_text(&self) -> &'static str {
        self.usage.unwrap_or(self.description)
    }
}

const BUILTIN: &[CommandEntry] = &[
    CommandEntry {
        name: "ABOUT",
        aliases: &["WHOAMI"],
        description: "Who I am",
        usage: Some("ABOUT\n  Prints a short introduction. WHOAMI is an alias."),
    },
    CommandEntry {
        name: "HELLO",
        aliases: &[],
        description: "Say hello",
        usage: Some("HELLO\n  Prints a greeting."),
    },
    CommandEntry {
        name: "INFO",
        aliases: &[],
        description: "Server status",
        usage: Some("INFO\n  Shows server version, uptime and the number of connected clients."),
    },
    CommandEntry {
        name: "COMMAND",
        aliases: &[],
        description: "List command names",
        usage: Some("COMMAND\n  Prints every command name on one line."),
    },
    CommandEntry {
        name: "HELP",
        aliases: &[],
        description: "Show help",
        usage: Some(
            "HELP [command]\n  Without an argument lists every command.\n  With a command name prints its usage.",
        ),
    },
    CommandEntry {
        name: "PROJECTS",
        aliases: &[],
        description: "List my projects",
        usage: Some(
            "PROJECTS [index]\n  Without an argument lists all projects.\n  With a 1-based index prints that project's details.",
        ),
    },
    CommandEntry {
        name: "SKILLS",
        aliases: &[],
        description: "List my skills",
        usage: Some("SKILLS\n  Prints the skills I work with."),
    },
    CommandEntry {
        name: "RESUME",
        aliases: &[],
        description: "Link to my resume",
        usage: Some("RESUME\n  Prints a link to my resume."),
    },
    CommandEntry {
        name: "CHAT",
        aliases: &[],
        description: "Chat with my AI assistant",
        usage: Some(
            "CHAT <message>\n  Streams a reply from the assistant. Earlier messages in this\n  connection are remembered. Chats sent while a reply is streaming\n  are answered in order.",
        ),
    },
    CommandEntry {
        name: "EXIT",
        aliases: &[],
        description: "Close the connection",
        usage: Some("EXIT\n  Says goodbye and closes the connection."),
    },
];

/// Ordered, case-insensitive command registry.
///
/// Insertion order drives the help listing.
#[derive(Debug, Clone)]
pub struct Registry {
    entries: Vec<CommandEntry>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Registry {
    /// Create a registry from explicit entries.
    #[must_use]
    pub const fn new(entries: Vec<CommandEntry>) -> Self {
        Self { entries }
    }

    /// The standard shell commands.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(BUILTIN.to_vec())
    }

    /// Exact lookup by name or alias, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.entries.iter().find(|e| e.matches(name))
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &CommandEntry> {
        self.entries.iter()
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Up to `limit` registered names that look like `name`.
    #[must_use]
    pub fn suggest(&self, name: &str, limit: usize) -> Vec<&'static str> {
        let candidates: Vec<&'static str> = self
            .entries
            .iter()
            .flat_map(|e| std::iter::once(e.name).chain(e.aliases.iter().copied()))
            .collect();
        fuzzy::close_matches(name, &candidates, limit, fuzzy::DEFAULT_CUTOFF)
    }

    /// Help listing: every command with its short description.
    #[must_use]
    pub fn listing(&self) -> String {
        let width = self.entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
        let mut out = String::from("Available commands:");
        for entry in &self.entries {
            let _ = write!(out, "\n  {:<width$}  {}", entry.name, entry.description);
        }
        out
    }
}
