#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for listing IMAP folders and downloading messages and attachments

use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};
use mailgrab::{
    DateRange, DownloadContent, DownloadRequest, Event, ImapConfig, MessageSummary, Operation,
    Reporter,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mailgrab")]
#[command(about = "Download IMAP messages and attachments to a local directory")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output one JSON object per event
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List available IMAP folders
    Folders,

    /// List messages in a folder
    List {
        /// Folder to list from
        #[arg(long, default_value = "INBOX")]
        folder: String,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Download attachments (and optionally whole messages)
    Download {
        #[command(flatten)]
        target: TargetArgs,

        /// Also save each whole message as .eml
        #[arg(long)]
        with_message: bool,
    },

    /// Download whole messages as .eml
    DownloadMessages {
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(ClapArgs)]
struct RangeArgs {
    /// Only messages sent on or after this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    since: Option<NaiveDate>,

    /// Only messages sent on or before this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    until: Option<NaiveDate>,
}

#[derive(ClapArgs)]
struct TargetArgs {
    /// Folder to download from
    #[arg(long, default_value = "INBOX")]
    folder: String,

    /// Existing directory to write files into
    #[arg(long)]
    dir: PathBuf,

    /// Move processed messages to this folder afterwards
    #[arg(long)]
    archive: Option<String>,

    #[command(flatten)]
    range: RangeArgs,
}

impl RangeArgs {
    const fn date_range(&self) -> DateRange {
        DateRange::new(self.since, self.until)
    }
}

impl TargetArgs {
    fn request(self, content: DownloadContent) -> DownloadRequest {
        DownloadRequest {
            range: self.range.date_range(),
            folder: self.folder,
            target_dir: self.dir,
            archive: self.archive,
            content,
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("Invalid date '{s}': {e}"))
}

impl Command {
    fn into_operation(self) -> Operation {
        match self {
            Self::Folders => Operation::ListFolders,
            Self::List { folder, range } => Operation::ListMessages {
                folder,
                range: range.date_range(),
            },
            Self::Download {
                target,
                with_message,
            } => {
                let content = if with_message {
                    DownloadContent::AttachmentsAndMessage
                } else {
                    DownloadContent::Attachments
                };
                Operation::Download(target.request(content))
            }
            Self::DownloadMessages { target } => {
                Operation::Download(target.request(DownloadContent::Messages))
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ImapConfig::from_env()?;
    let operation = args.command.into_operation();

    let mut reporter = ConsoleReporter { json: args.json };
    mailgrab::run(&config, &operation, &mut reporter).await?;

    Ok(())
}

/// Prints events to stdout.
struct ConsoleReporter {
    json: bool,
}

impl Reporter for ConsoleReporter {
    fn report(&mut self, event: Event) {
        if self.json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("Failed to serialize event: {e}"),
            }
            return;
        }

        match event {
            Event::Folder(folder) => println!("{folder}"),
            Event::MessageSummary(summary) => print_summary(&summary),
            Event::MessageDownloaded { path, .. } => {
                println!("  saved message     {}", path.display());
            }
            Event::AttachmentDownloaded { path, .. } => {
                println!("  saved attachment  {}", path.display());
            }
            Event::ContainerUnpacked { files, .. } => {
                for file in files {
                    println!("    unpacked        {}", file.display());
                }
            }
            Event::NoAttachments { .. } => println!("  no attachments found"),
            Event::Archived { count, destination } => {
                println!("\n{count} message(s) moved to {destination}");
            }
            Event::ArchiveSkipped => println!("\nNo archive folder given, messages left in place"),
            Event::Warning { message } => eprintln!("warning: {message}"),
        }
    }
}

fn print_summary(summary: &MessageSummary) {
    let date = summary
        .sent
        .or(summary.received)
        .map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d %H:%M").to_string());
    println!(
        "{:<8} {:<16} {:<30} {}",
        summary.uid,
        date,
        truncate(&summary.from.join(", "), 28),
        truncate(summary.subject.as_deref().unwrap_or("(no subject)"), 60),
    );
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
