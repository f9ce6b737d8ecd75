//! Tidepool CLI
//!
//! Adds and lists users in a document collection, and drives the Redis
//! publisher and subscriber console.

use std::io::{self, BufRead, Write};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tidepool::broadcast::console::{format_history, ConsoleCommand, HELP};
use tidepool::broadcast::{Broadcast, BroadcastError};
use tidepool::users::{add_user_to, list_users_in};
use tidepool::{DocumentStore, MemoryDocumentStore, PostgresDocumentStore, TidepoolConfig};

#[derive(Parser)]
#[command(name = "tidepool")]
#[command(about = "User collections and Redis broadcast for tidepool")]
#[command(version = "0.1.0")]
struct Cli {
    /// Database connection URL (overrides config and env)
    #[arg(long)]
    database_url: Option<String>,

    /// Use an in-memory store instead of PostgreSQL (nothing is persisted)
    #[arg(long)]
    memory: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long)]
    quiet: bool,

    /// Print Prometheus metrics to stderr when the command finishes
    #[arg(long)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the users collection if it does not exist
    Init,

    /// Insert one active user
    AddUser {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        age: u32,
        #[arg(long)]
        email: String,
    },

    /// Print every user as JSON
    ListUsers,

    /// Publish lines from stdin until `exit`
    Publish,

    /// Listen for messages and run the subscriber console
    Subscribe,
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let print_metrics = cli.print_metrics;
    let result = run(cli);
    if print_metrics {
        eprint!("{}", tidepool::metrics::METRICS.render());
    }
    if let Err(e) = result {
        eprintln!("{} {:#}", "❌ Error:".red(), e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = TidepoolConfig::load().context("loading configuration")?;

    match cli.command {
        Commands::Init => {
            let store = open_store(&cli.database_url, cli.memory, &config)?;
            store.ensure_collection(&config.database.users_collection)?;
            if !cli.quiet {
                println!(
                    "{} collection {} is ready",
                    "✅".green(),
                    config.database.users_collection
                );
            }
        }
        Commands::AddUser {
            first_name,
            last_name,
            age,
            email,
        } => {
            let store = open_store(&cli.database_url, cli.memory, &config)?;
            let ack = add_user_to(
                store.as_ref(),
                &config.database.users_collection,
                &first_name,
                &last_name,
                age,
                &email,
            )?;
            println!("{}", ack.inserted_id);
        }
        Commands::ListUsers => {
            let store = open_store(&cli.database_url, cli.memory, &config)?;
            for (id, user) in list_users_in(store.as_ref(), &config.database.users_collection)? {
                println!("{} {}", id.to_string().dimmed(), serde_json::to_string(&user)?);
            }
        }
        Commands::Publish => run_publisher(Broadcast::open(config.broadcast)?)?,
        Commands::Subscribe => run_subscriber(Broadcast::open(config.broadcast)?)?,
    }

    Ok(())
}

fn open_store(
    database_url: &Option<String>,
    memory: bool,
    config: &TidepoolConfig,
) -> Result<Box<dyn DocumentStore>> {
    if memory {
        return Ok(Box::new(MemoryDocumentStore::new()));
    }

    let url = database_url
        .clone()
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| config.database.url.clone());
    let store = PostgresDocumentStore::connect(&url)
        .with_context(|| format!("connecting to {}", redact(&url)))?;
    Ok(Box::new(store))
}

/// Hides the password in a URI connection string.
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            let creds = &url[scheme_end + 3..at];
            match creds.find(':') {
                Some(colon) => format!("{}{}:***{}", &url[..scheme_end + 3], &creds[..colon], &url[at..]),
                None => url.to_string(),
            }
        }
        _ => url.to_string(),
    }
}

fn prompt(stdin: &mut impl BufRead, text: &str) -> Result<Option<String>> {
    print!("{text}");
    io::stdout().flush()?;
    let mut line = String::new();
    if stdin.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn run_publisher(broadcast: Broadcast) -> Result<()> {
    let mut publisher = broadcast.publisher()?;
    publisher.start()?;
    println!("Publisher started. Status set to active.");

    let mut stdin = io::stdin().lock();
    while let Some(message) = prompt(&mut stdin, "Enter message to send (or 'exit' to exit): ")? {
        if message.eq_ignore_ascii_case("exit") {
            break;
        }
        publisher.publish(&message)?;
        println!("Published: {message}");
    }

    publisher.stop()?;
    println!("Publisher stopped. Status set to inactive.");
    Ok(())
}

fn run_subscriber(broadcast: Broadcast) -> Result<()> {
    let mut subscriber = broadcast.subscriber()?;
    let listener = subscriber.spawn_listener()?;
    let messages = listener.messages.clone();
    let printer = std::thread::spawn(move || {
        for msg in messages {
            println!("{} {}", "Received:".cyan(), msg);
        }
    });
    println!("Subscriber started. Waiting for messages...");
    println!("{HELP}");

    let mut stdin = io::stdin().lock();
    while let Some(line) = prompt(&mut stdin, "Enter command (or 'exit' to quit): ")? {
        log::debug!("received command: {}", line.trim());
        match ConsoleCommand::parse(&line) {
            ConsoleCommand::Exit => {
                println!("Exiting subscriber...");
                break;
            }
            ConsoleCommand::Status => {
                let status = subscriber.mark_active()?;
                println!("Subscriber status: {}", status.unwrap_or_default());
            }
            ConsoleCommand::List => {
                println!("Published messages:");
                for msg in subscriber.published_messages()? {
                    println!("{msg}");
                }
            }
            ConsoleCommand::Subscriptions => {
                println!("Subscribed channels:");
                for channel in subscriber.subscriptions() {
                    println!("{channel}");
                }
            }
            ConsoleCommand::SendAdmin => {
                if let Some(msg) = prompt(&mut stdin, "Enter message to send to admin: ")? {
                    subscriber.send_admin(&msg)?;
                    println!("Message sent to admin: {msg}");
                }
            }
            ConsoleCommand::History => {
                println!("Message history:");
                for line in format_history(&subscriber.published_messages()?) {
                    println!("{line}");
                }
            }
            ConsoleCommand::Delete(index) => match subscriber.delete_message(index) {
                Ok(msg) => println!("Message deleted: {msg}"),
                Err(BroadcastError::InvalidIndex { .. }) => {
                    println!("Invalid index. Please enter a valid message index.")
                }
                Err(e) => return Err(e.into()),
            },
            ConsoleCommand::InvalidDelete => {
                println!("Invalid command. Use 'delete <index>' to delete a message.")
            }
            ConsoleCommand::Clear => {
                print!("\x1B[2J\x1B[1;1H");
                io::stdout().flush()?;
            }
            ConsoleCommand::Help => println!("{HELP}"),
            ConsoleCommand::Unknown(_) => {
                println!("Unknown command. Type 'help' for a list of commands.")
            }
        }
    }

    listener.stop()?;
    if printer.join().is_err() {
        log::warn!("message printer panicked");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_hides_password() {
        assert_eq!(
            redact("postgres://app:secret@db:5432/app"),
            "postgres://app:***@db:5432/app"
        );
        assert_eq!(redact("postgres://app@db/app"), "postgres://app@db/app");
        assert_eq!(redact("host=db user=app"), "host=db user=app");
    }

    #[test]
    fn test_cli_parses_add_user() {
        let cli = Cli::try_parse_from([
            "tidepool",
            "--memory",
            "add-user",
            "--first-name",
            "Ada",
            "--last-name",
            "Lovelace",
            "--age",
            "36",
            "--email",
            "ada@example.com",
        ])
        .unwrap();
        assert!(cli.memory);
        match cli.command {
            Commands::AddUser { first_name, last_name, age, email } => {
                assert_eq!(first_name, "Ada");
                assert_eq!(last_name, "Lovelace");
                assert_eq!(age, 36);
                assert_eq!(email, "ada@example.com");
            }
            _ => panic!("expected add-user"),
        }
    }

    #[test]
    fn test_cli_parses_print_metrics() {
        let cli = Cli::try_parse_from(["tidepool", "--print-metrics", "list-users"]).unwrap();
        assert!(cli.print_metrics);
        assert!(matches!(cli.command, Commands::ListUsers));

        let cli = Cli::try_parse_from(["tidepool", "init"]).unwrap();
        assert!(!cli.print_metrics);
    }

    #[test]
    fn test_cli_rejects_negative_age() {
        assert!(Cli::try_parse_from([
            "tidepool", "add-user", "--first-name", "A", "--last-name", "B", "--age", "-1",
            "--email", "a@b.c",
        ])
        .is_err());
    }

    #[test]
    fn test_prompt_strips_newline_and_detects_eof() {
        let mut input = io::Cursor::new("hello\r\n");
        assert_eq!(prompt(&mut input, "").unwrap().as_deref(), Some("hello"));
        assert_eq!(prompt(&mut input, "").unwrap(), None);
    }
}
