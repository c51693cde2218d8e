//! Resolves an input line to a command and produces its reply.

use std::{fmt::Write as _, sync::Arc, time::Duration};

use crate::{Profile, Registry, ServerStatus};

/// Maximum number of "did you mean" suggestions.
const MAX_SUGGESTIONS: usize = 3;

/// Result of dispatching one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The line was blank; the client only needs a fresh prompt.
    Ready,
    /// Send this text now.
    Reply(String),
    /// Stream a backend reply to this prompt; nothing is sent synchronously.
    Stream { prompt: String },
    /// Send this farewell and close the connection.
    Exit(String),
}

/// Command dispatcher over a registry and a profile.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    profile: Arc<Profile>,
}

impl Dispatcher {
    #[must_use]
    pub const fn new(registry: Arc<Registry>, profile: Arc<Profile>) -> Self {
        Self { registry, profile }
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Text sent when a client connects.
    #[must_use]
    pub fn banner(&self) -> String {
        let mut out = String::new();
        if !self.profile.banner.is_empty() {
            out.push_str(&self.profile.banner);
            out.push_str("\n\n");
        }
        let _ = write!(
            out,
            "Welcome to {}'s terminal portfolio.\nType HELP to see the available commands.",
            self.profile.owner
        );
        out
    }

    /// Dispatch one decoded input line.
    #[must_use]
    pub fn dispatch(&self, line: &str, status: &dyn ServerStatus) -> Outcome {
        let line = line.trim();
        let Some((command, rest)) = split_command(line) else {
            return Outcome::Ready;
        };
        let args: Vec<&str> = rest.split_whitespace().collect();

        let Some(entry) = self.registry.get(command) else {
            return Outcome::Reply(self.unknown(command));
        };

        tracing::debug!(command = entry.name, args = args.len(), "dispatching");

        match entry.name {
            "ABOUT" => Outcome::Reply(self.about()),
            "HELLO" => Outcome::Reply(self.hello()),
            "INFO" => Outcome::Reply(info(status)),
            "COMMAND" => Outcome::Reply(self.command_names()),
            "HELP" => Outcome::Reply(self.help(args.first().copied())),
            "PROJECTS" => Outcome::Reply(self.projects(args.first().copied())),
            "SKILLS" => Outcome::Reply(self.skills()),
            "RESUME" => Outcome::Reply(format!("Resume: {}", self.profile.resume_url)),
            "CHAT" => {
                if rest.is_empty() {
                    Outcome::Reply("Usage: CHAT <message>".to_string())
                } else {
                    Outcome::Stream {
                        prompt: rest.to_string(),
                    }
                }
            }
            "EXIT" => Outcome::Exit("Goodbye! Thanks for stopping by.".to_string()),
            other => {
                tracing::warn!(command = other, "registered command has no handler");
                Outcome::Reply(self.unknown(command))
            }
        }
    }

    fn unknown(&self, command: &str) -> String {
        let suggestions = self.registry.suggest(command, MAX_SUGGESTIONS);
        if suggestions.is_empty() {
            format!(
                "Invalid command: {command}\n\n{}",
                self.registry.listing()
            )
        } else {
            format!(
                "Unknown command: {command}. Did you mean: {}?",
                suggestions.join(", ")
            )
        }
    }

    fn about(&self) -> String {
        if self.profile.banner.is_empty() {
            self.profile.about.clone()
        } else {
            format!("{}\n{}", self.profile.banner, self.profile.about)
        }
    }

    fn hello(&self) -> String {
        if self.profile.greeting.is_empty() {
            format!("Hello! This is {}'s portfolio.", self.profile.owner)
        } else {
            self.profile.greeting.clone()
        }
    }

    fn command_names(&self) -> String {
        self.registry
            .iter()
            .map(|e| e.name)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn help(&self, topic: Option<&str>) -> String {
        match topic {
            None => self.registry.listing(),
            Some(name) => self.registry.get(name).map_or_else(
                || format!("Command not found: {name}"),
                |entry| entry.usage_text().to_string(),
            ),
        }
    }

    fn projects(&self, index: Option<&str>) -> String {
        let Some(raw) = index else {
            if self.profile.projects.is_empty() {
                return "No projects yet.".to_string();
            }
            let mut out = String::from("Projects:");
            for (i, project) in self.profile.projects.iter().enumerate() {
                let _ = write!(out, "\n  {}. {} - {}", i + 1, project.name, project.link);
            }
            out.push_str("\n\nType PROJECTS <index> for details.");
            return out;
        };

        let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return format!("Invalid project index: {raw}");
        }

        // Negative or too large to parse: out of range either way.
        let project = if raw.starts_with('-') {
            None
        } else {
            digits.parse::<usize>().ok().and_then(|i| self.profile.project(i))
        };

        match project {
            Some(project) => {
                let mut out = format!("{}\n\n{}", project.name, project.description);
                if !project.stack.is_empty() {
                    let _ = write!(out, "\n\nStack: {}", project.stack.join(", "));
                }
                let _ = write!(out, "\nLink: {}", project.link);
                out
            }
            None => format!("Project not found: {raw}"),
        }
    }

    fn skills(&self) -> String {
        if self.profile.skills.is_empty() {
            return "No skills listed.".to_string();
        }
        let mut out = String::from("Skills:");
        for skill in &self.profile.skills {
            let _ = write!(out, "\n  - {skill}");
        }
        out
    }
}

fn info(status: &dyn ServerStatus) -> String {
    format!(
        "termfolio v{}\nUptime: {}\nConnected clients: {}",
        env!("CARGO_PKG_VERSION"),
        format_uptime(status.uptime()),
        status.connected_clients()
    )
}

/// Split a trimmed line into its command token and the remaining text.
fn split_command(line: &str) -> Option<(&str, &str)> {
    if line.is_empty() {
        return None;
    }
    Some(
        line.split_once(char::is_whitespace)
            .map_or((line, ""), |(cmd, rest)| (cmd, rest.trim())),
    )
}

fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let (days, hours, mins, secs) = (secs / 86_400, secs / 3600 % 24, secs / 60 % 60, secs % 60);
    if days > 0 {
        format!("{days}d {hours}h {mins}m {secs}s")
    } else if hours > 0 {
        format!("{hours}h {mins}m {secs}s")
    } else if mins > 0 {
        format!("{mins}m {secs}s")
    } else {
        format!("{secs}s")
    }
}
