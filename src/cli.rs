//! CLI interface for Townwatch.
//!
//! Every subcommand is non-interactive: arguments in, JSON out on stdout.
//! Diagnostics and one-line summaries go to stderr.
//!
//! Commands split into three groups:
//!
//! - One-shot queries and actions (`status`, `crew stop`, `mail send`...),
//!   each a single dashboard request.
//! - `townwatch watch <address>`: poll a mailbox and print new messages as
//!   JSON lines until interrupted.
//! - `townwatch serve`: read JSON requests from stdin, one per line, and
//!   answer each on stdout.

mod format;
mod serve;
mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::{Config, TOWN_ENV};
use crate::dashboard::{Dashboard, Request};
use crate::logging;
use crate::reconcile::Reconciler;

use format::{describe_response, format_error};

/// Townwatch: watch and steer a Gas Town from the command line.
#[derive(Debug, Parser)]
#[command(name = "townwatch", after_long_help = USAGE_HELP)]
pub struct Cli {
    /// Town root directory. Overrides `TOWNWATCH_TOWN` and the config file.
    #[arg(long, global = true)]
    town: Option<PathBuf>,

    /// Log debug output to stderr (overridden by `TOWNWATCH_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

const USAGE_HELP: &str = r#"Examples:
  townwatch status
  townwatch agents --rig gastown
  townwatch crew list --rig gastown
  townwatch crew remove joe --rig gastown --force
  townwatch mail send gastown/crew/joe -s "Status?" -m "How is the refactor going?"
  townwatch watch mayor/ --rig gastown --interval 10

Serve:
  echo '{"id":1,"action":"crewList","rig":"gastown"}' | townwatch serve"#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Full town snapshot: agents and rigs.
    Status,

    /// List agents, optionally only those in one rig.
    Agents {
        #[arg(long)]
        rig: Option<String>,
    },

    /// List rigs.
    Rigs,

    /// Start or stop a mayor, deacon or witness.
    Agent {
        #[command(subcommand)]
        command: AgentCommand,
    },

    /// Manage crew workspaces and sessions.
    Crew {
        #[command(subcommand)]
        command: CrewCommand,
    },

    /// Inspect polecats.
    Polecat {
        #[command(subcommand)]
        command: PolecatCommand,
    },

    /// Read and send mail.
    Mail {
        #[command(subcommand)]
        command: MailCommand,
    },

    /// List beads issues.
    Issues {
        /// Only issues with this tracker status (e.g. `open`, `in_progress`).
        #[arg(long)]
        status: Option<String>,
    },

    /// Poll a mailbox and print each new message as a JSON line.
    ///
    /// Runs until interrupted, or for `--count` polls.
    Watch {
        /// Mailbox address, e.g. `mayor/`.
        address: String,

        /// Only messages whose sender mentions this rig.
        #[arg(long)]
        rig: Option<String>,

        /// Only messages whose sender mentions this member.
        #[arg(long)]
        member: Option<String>,

        /// Seconds between polls.
        #[arg(long, default_value_t = 15)]
        interval: u64,

        /// Stop after this many polls.
        #[arg(long)]
        count: Option<u64>,
    },

    /// Answer JSON requests read from stdin, one per line.
    ///
    /// Each line is a request object tagged by `action`, with an optional
    /// `id` echoed in the reply. Requests are handled concurrently; replies
    /// arrive in completion order.
    Serve,
}

#[derive(Debug, Subcommand)]
pub enum AgentCommand {
    /// Start an agent session.
    Start {
        /// `mayor`, `deacon` or `witness`.
        role: String,

        /// Rig, required for a witness.
        #[arg(long)]
        rig: Option<String>,
    },

    /// Stop an agent session.
    Stop {
        role: String,

        #[arg(long)]
        rig: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum CrewCommand {
    /// List crew members with workspace and mailbox state.
    List {
        #[arg(long)]
        rig: String,
    },

    /// Create a crew workspace.
    Add {
        name: String,
        #[arg(long)]
        rig: String,
    },

    /// Remove a crew workspace.
    ///
    /// Refuses when the workspace has uncommitted or unpushed work unless
    /// `--force` is given.
    Remove {
        name: String,
        #[arg(long)]
        rig: String,
        #[arg(long)]
        force: bool,
    },

    /// Start a crew member's session.
    Start {
        name: String,
        #[arg(long)]
        rig: String,
    },

    /// Stop a crew member's session.
    Stop {
        name: String,
        #[arg(long)]
        rig: String,
    },

    /// Type a message into a running crew session.
    Nudge {
        name: String,
        message: String,
        #[arg(long)]
        rig: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum PolecatCommand {
    /// List polecats in a rig.
    List {
        #[arg(long)]
        rig: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum MailCommand {
    /// List a mailbox, latest first.
    Inbox { address: String },

    /// List a mailbox grouped into threads.
    Threads { address: String },

    /// Read one message.
    Read { id: String },

    /// Send a message.
    Send {
        /// Recipient address, e.g. `gastown/crew/joe`.
        to: String,

        #[arg(short, long)]
        subject: String,

        #[arg(short = 'm', long)]
        body: String,

        /// `urgent`, `high`, `normal`, `low`, or a level `0`-`4`.
        #[arg(long)]
        priority: Option<String>,

        /// Id of the message being answered.
        #[arg(long)]
        reply_to: Option<String>,
    },

    /// Print messages not seen by an earlier poll in this process.
    ///
    /// Mostly useful through `serve`; a one-shot CLI poll always sees
    /// everything as new.
    Poll {
        address: String,
        #[arg(long)]
        rig: Option<String>,
        #[arg(long)]
        member: Option<String>,
    },
}

impl Command {
    /// The dashboard request for a one-shot command. `None` for `watch` and
    /// `serve`, which drive the dashboard themselves.
    fn into_request(self) -> Option<Request> {
        let request = match self {
            Self::Status => Request::Status,
            Self::Agents { rig } => Request::Agents { rig },
            Self::Rigs => Request::Rigs,
            Self::Agent { command } => match command {
                AgentCommand::Start { role, rig } => Request::AgentStart { role, rig },
                AgentCommand::Stop { role, rig } => Request::AgentStop { role, rig },
            },
            Self::Crew { command } => match command {
                CrewCommand::List { rig } => Request::CrewList { rig },
                CrewCommand::Add { name, rig } => Request::CrewAdd { rig, name },
                CrewCommand::Remove { name, rig, force } => {
                    Request::CrewRemove { rig, name, force }
                }
                CrewCommand::Start { name, rig } => Request::CrewStart { rig, name },
                CrewCommand::Stop { name, rig } => Request::CrewStop { rig, name },
                CrewCommand::Nudge { name, message, rig } => {
                    Request::CrewNudge { rig, name, message }
                }
            },
            Self::Polecat {
                command: PolecatCommand::List { rig },
            } => Request::PolecatList { rig },
            Self::Mail { command } => match command {
                MailCommand::Inbox { address } => Request::MailInbox { address },
                MailCommand::Threads { address } => Request::MailThreads { address },
                MailCommand::Read { id } => Request::MailRead { id },
                MailCommand::Send {
                    to,
                    subject,
                    body,
                    priority,
                    reply_to,
                } => Request::MailSend {
                    to,
                    subject,
                    body,
                    priority,
                    reply_to,
                },
                MailCommand::Poll {
                    address,
                    rig,
                    member,
                } => Request::MailPoll {
                    address,
                    rig,
                    member,
                },
            },
            Self::Issues { status } => Request::Issues { status },
            Self::Watch { .. } | Self::Serve => return None,
        };
        Some(request)
    }
}

/// Run the CLI, returning an error message on failure.
pub async fn run() -> Result<(), String> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = Config::load().map_err(|e| e.to_string())?;
    let env_town = std::env::var_os(TOWN_ENV).map(PathBuf::from);
    config
        .resolve_town_root(cli.town, env_town)
        .map_err(|e| e.to_string())?;
    tracing::debug!(town = %config.town_root().display(), "resolved town root");

    let dashboard = Arc::new(Dashboard::new(config, Arc::new(Reconciler::new())));

    match cli.command {
        Command::Watch {
            address,
            rig,
            member,
            interval,
            count,
        } => {
            let options = watch::Options {
                address,
                rig,
                member,
                interval: std::time::Duration::from_secs(interval.max(1)),
                count,
            };
            watch::run(&dashboard, options).await
        }
        Command::Serve => serve::run(dashboard).await,
        command => {
            let Some(request) = command.into_request() else {
                return Ok(());
            };
            cmd_request(&dashboard, request).await
        }
    }
}

async fn cmd_request(dashboard: &Dashboard, request: Request) -> Result<(), String> {
    let response = dashboard
        .handle(request)
        .await
        .map_err(|e| format_error(&e.report()))?;

    let json = serde_json::to_string_pretty(&response)
        .map_err(|e| format!("failed to serialize response: {e}"))?;
    println!("{json}");

    if let Some(summary) = describe_response(&response) {
        eprintln!("{summary}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("townwatch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn crew_remove_maps_to_request() {
        let cli = parse(&["crew", "remove", "joe", "--rig", "gastown", "--force"]);
        assert_eq!(
            cli.command.into_request(),
            Some(Request::CrewRemove {
                rig: "gastown".into(),
                name: "joe".into(),
                force: true,
            })
        );
    }

    #[test]
    fn mail_send_flags() {
        let cli = parse(&[
            "mail", "send", "mayor/", "-s", "hi", "-m", "body", "--priority", "high",
        ]);
        assert_eq!(
            cli.command.into_request(),
            Some(Request::MailSend {
                to: "mayor/".into(),
                subject: "hi".into(),
                body: "body".into(),
                priority: Some("high".into()),
                reply_to: None,
            })
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["status", "--town", "/srv/town", "-v"]);
        assert_eq!(cli.town, Some(PathBuf::from("/srv/town")));
        assert!(cli.verbose);
    }

    #[test]
    fn watch_and_serve_have_no_request() {
        assert_eq!(parse(&["serve"]).command.into_request(), None);
        assert_eq!(
            parse(&["watch", "mayor/", "--count", "1"])
                .command
                .into_request(),
            None
        );
    }

    #[test]
    fn missing_required_rig_is_rejected() {
        assert!(Cli::try_parse_from(["townwatch", "crew", "list"]).is_err());
    }
}
