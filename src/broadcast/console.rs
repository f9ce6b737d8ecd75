//! Subscriber console commands.

/// One line of subscriber console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Exit,
    Status,
    List,
    Subscriptions,
    SendAdmin,
    History,
    /// Index as typed; range checks happen against the history list
    Delete(i64),
    /// `delete` with a missing or non-numeric index
    InvalidDelete,
    Clear,
    Help,
    Unknown(String),
}

pub const HELP: &str = "\
Available commands:
- exit: Exit the subscriber.
- status: Show the current status of the subscriber.
- list: List all published messages.
- subscriptions: Show subscribed channels.
- send admin: Send a message to the admin.
- history: Show message history.
- delete <index>: Delete a message by index.
- clear: Clear the terminal screen.
- help: Show this help message.";

impl ConsoleCommand {
    /// Case-insensitive; surrounding whitespace is ignored.
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let lower = trimmed.to_lowercase();

        match lower.as_str() {
            "exit" => return ConsoleCommand::Exit,
            "status" => return ConsoleCommand::Status,
            "list" => return ConsoleCommand::List,
            "subscriptions" => return ConsoleCommand::Subscriptions,
            "send admin" => return ConsoleCommand::SendAdmin,
            "history" => return ConsoleCommand::History,
            "clear" => return ConsoleCommand::Clear,
            "help" => return ConsoleCommand::Help,
            _ => {}
        }

        let mut words = lower.split_whitespace();
        if words.next() == Some("delete") && lower.starts_with("delete ") {
            return match words.next().map(str::parse::<i64>) {
                Some(Ok(index)) => ConsoleCommand::Delete(index),
                _ => ConsoleCommand::InvalidDelete,
            };
        }

        ConsoleCommand::Unknown(trimmed.to_string())
    }
}

/// `"<idx>: <message>"` lines, as shown by the `history` command.
pub fn format_history(messages: &[String]) -> Vec<String> {
    messages
        .iter()
        .enumerate()
        .map(|(idx, msg)| format!("{idx}: {msg}"))
        .collect()
}
