//! Interactive terminal loop.
//!
//! Lines starting with `/` are commands; anything else is sent as a chat
//! message in the current session.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};

use xpilot_chat::{animate, format_timestamp, parse_code_blocks, SendOptions, SessionManager};
use xpilot_core::types::Session;

pub const HELP: &str = "\
Commands:
  /new                  start a new chat
  /temp                 start a temporary chat (not saved, no memory)
  /list                 list chats
  /switch <n>           switch to chat n from /list
  /delete <n>           delete chat n from /list
  /clear                delete all chats
  /regen                regenerate the last answer
  /share                copy the current chat to the clipboard
  /code                 toggle code mode
  /deep                 toggle think-deeply mode
  /memory               show what has been learned about you
  /forget <cat> [value] forget a category or a single value
  /forget-all           forget everything learned
  /help                 show this help
  /quit                 exit";

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Message(String),
    New,
    Temp,
    List,
    Switch(usize),
    Delete(usize),
    Clear,
    Regen,
    Share,
    ToggleCode,
    ToggleDeep,
    Memory,
    Forget {
        category: String,
        value: Option<String>,
    },
    ForgetAll,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Message(line.to_string());
        };

        let mut words = rest.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        match (name, args.as_slice()) {
            ("new", []) => Command::New,
            ("temp", []) => Command::Temp,
            ("list", []) => Command::List,
            ("switch", [n]) => parse_index(n).map_or_else(Command::Invalid, Command::Switch),
            ("delete", [n]) => parse_index(n).map_or_else(Command::Invalid, Command::Delete),
            ("clear", []) => Command::Clear,
            ("regen", []) => Command::Regen,
            ("share", []) => Command::Share,
            ("code", []) => Command::ToggleCode,
            ("deep", []) => Command::ToggleDeep,
            ("memory", []) => Command::Memory,
            ("forget", [category]) => Command::Forget {
                category: category.to_string(),
                value: None,
            },
            ("forget", [category, value @ ..]) => Command::Forget {
                category: category.to_string(),
                value: Some(value.join(" ")),
            },
            ("forget-all", []) => Command::ForgetAll,
            ("help", []) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,
            // Paths like /etc/hosts are chat text, not commands.
            (name, _) if name.contains('/') => Command::Message(line.to_string()),
            _ => Command::Invalid(format!("Unknown command: /{}. Type /help.", rest)),
        }
    }
}

fn parse_index(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("Expected a chat number from /list, got '{}'", raw)),
    }
}

/// Terminal front end over a [`SessionManager`].
pub struct Repl {
    manager: Arc<SessionManager>,
    assistant_name: String,
    options: SendOptions,
    typing_speed: Option<Duration>,
}

impl Repl {
    pub fn new(
        manager: Arc<SessionManager>,
        assistant_name: String,
        typing_speed: Option<Duration>,
    ) -> Self {
        Self {
            manager,
            assistant_name,
            options: SendOptions::default(),
            typing_speed,
        }
    }

    pub async fn run(&mut self) -> std::io::Result<()> {
        println!("{} ready. Type /help for commands.", self.assistant_name);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            self.print_prompt()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            if !self.handle(Command::parse(&line)).await? {
                break;
            }
        }
        Ok(())
    }

    fn print_prompt(&self) -> std::io::Result<()> {
        let mut flags = Vec::new();
        if self.manager.is_temporary_mode() {
            flags.push("temp");
        }
        if self.options.generate_code {
            flags.push("code");
        }
        if self.options.think_deeply {
            flags.push("deep");
        }
        let mut out = std::io::stdout().lock();
        if flags.is_empty() {
            write!(out, "> ")?;
        } else {
            write!(out, "[{}] > ", flags.join(","))?;
        }
        out.flush()
    }

    /// Run one command. Returns `false` when the loop should stop.
    async fn handle(&mut self, command: Command) -> std::io::Result<bool> {
        match command {
            Command::Empty => {}
            Command::Quit => return Ok(false),
            Command::Help => println!("{}", HELP),
            Command::Invalid(message) => println!("{}", message),
            Command::Message(text) => {
                println!("{} is thinking...", self.assistant_name);
                match self.manager.send_user_message(&text, self.options).await {
                    Ok(()) => self.print_last_answer().await?,
                    Err(e) => println!("Error: {}", e),
                }
            }
            Command::Regen => match self.manager.regenerate_last_response().await {
                Ok(()) => self.print_last_answer().await?,
                Err(e) => println!("Error: {}", e),
            },
            Command::New => report(self.manager.create_session(false).map(|_| "New chat started.")),
            Command::Temp => report(
                self.manager
                    .create_session(true)
                    .map(|_| "Temporary chat started. Nothing here is saved or learned."),
            ),
            Command::List => self.print_sessions(),
            Command::Switch(n) => match self.session_at(n) {
                Some(session) => match self.manager.switch_session(session.id) {
                    Ok(_) => {
                        println!("Switched to \"{}\".", session.title);
                        for message in &session.messages {
                            self.print_message_line(message.is_user(), &message.text, message.timestamp);
                        }
                    }
                    Err(e) => println!("Error: {}", e),
                },
                None => println!("No chat number {}.", n),
            },
            Command::Delete(n) => match self.session_at(n) {
                Some(session) => report(
                    self.manager
                        .delete_session(session.id)
                        .map(|_| "Chat deleted."),
                ),
                None => println!("No chat number {}.", n),
            },
            Command::Clear => report(self.manager.clear_all_sessions().map(|_| "All chats deleted.")),
            Command::Share => {
                if let Some(session) = self.manager.current_session() {
                    println!("{}", self.manager.share_session(session.id).await);
                }
            }
            Command::ToggleCode => {
                self.options.generate_code = !self.options.generate_code;
                println!("Code mode {}.", on_off(self.options.generate_code));
            }
            Command::ToggleDeep => {
                self.options.think_deeply = !self.options.think_deeply;
                println!("Think-deeply mode {}.", on_off(self.options.think_deeply));
            }
            Command::Memory => self.print_memory(),
            Command::Forget { category, value } => {
                let result = match &value {
                    Some(value) => self.manager.forget_value(&category, value),
                    None => self.manager.forget_category(&category),
                };
                match result {
                    Ok(true) => println!("Forgotten."),
                    Ok(false) => println!("Nothing to forget."),
                    Err(e) => println!("Error: {}", e),
                }
            }
            Command::ForgetAll => report(
                self.manager
                    .clear_learned_facts()
                    .map(|_| "Cleared everything learned about you."),
            ),
        }
        Ok(true)
    }

    fn session_at(&self, n: usize) -> Option<Session> {
        self.manager.sessions().into_iter().nth(n - 1)
    }

    fn print_sessions(&self) {
        let current = self.manager.current_session().map(|s| s.id);
        for (i, session) in self.manager.sessions().iter().enumerate() {
            let marker = if Some(session.id) == current { "*" } else { " " };
            println!(
                "{} {:>2}. {} ({} messages, {})",
                marker,
                i + 1,
                session.title,
                session.messages.len(),
                format_timestamp(session.updated_at)
            );
        }
    }

    fn print_memory(&self) {
        let facts = self.manager.learned_facts();
        if facts.is_empty() {
            println!("Nothing learned yet.");
            return;
        }
        for (category, values) in facts.iter() {
            println!("  {}: {}", category, values.join(", "));
        }
    }

    fn print_message_line(&self, is_user: bool, text: &str, at: chrono::DateTime<chrono::Utc>) {
        let label = if is_user { "You" } else { self.assistant_name.as_str() };
        println!("[{}] {}: {}", format_timestamp(at), label, text);
    }

    async fn print_last_answer(&self) -> std::io::Result<()> {
        let Some(answer) = self
            .manager
            .current_session()
            .and_then(|s| s.messages.last().cloned())
            .filter(|m| !m.is_user())
        else {
            return Ok(());
        };

        println!("[{}] {}:", format_timestamp(answer.timestamp), self.assistant_name);
        for part in parse_code_blocks(&answer.text) {
            if part.is_code {
                println!("--- {} ---", part.language.as_deref().unwrap_or("code"));
                println!("{}", part.text);
                println!("---");
            } else {
                self.type_out(&part.text).await?;
            }
        }
        Ok(())
    }

    async fn type_out(&self, text: &str) -> std::io::Result<()> {
        let Some(speed) = self.typing_speed else {
            println!("{}", text);
            return Ok(());
        };
        let mut shown = 0;
        let mut result = Ok(());
        animate(text, speed, |frame| {
            let mut out = std::io::stdout().lock();
            let written = write!(out, "{}", &frame[shown..]).and_then(|_| out.flush());
            if result.is_ok() {
                result = written;
            }
            shown = frame.len();
        })
        .await;
        result?;
        println!();
        Ok(())
    }
}

fn report<E: std::fmt::Display>(result: Result<&str, E>) {
    match result {
        Ok(message) => println!("{}", message),
        Err(e) => println!("Error: {}", e),
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}
