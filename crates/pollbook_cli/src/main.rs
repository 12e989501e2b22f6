//! Administrative command line over `pollbook_core`.
//!
//! `cast` prints `code<TAB>message` and exits with status 1 on any
//! non-zero result code.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::info;
use pollbook_core::model::registration::RegistrationId;
use pollbook_core::repo::ballot_repo::{BallotRepository, SqliteBallotRepository};
use pollbook_core::repo::poll_repo::{PollRepository, SqlitePollRepository};
use pollbook_core::{
    core_version, init_from_config, open_db, BallotService, CastRequest, CenterCheck,
    CenterResolver, FolkId, PollCode, PollbookConfig, SystemClock, VoteChoice,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "pollbook", version, about = "Voter registration and ballot casting")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file; overrides configuration.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create or migrate the database.
    Init,
    /// Cast one ballot.
    Cast {
        #[arg(long)]
        folk: FolkId,
        #[arg(long)]
        poll: PollCode,
        #[arg(long)]
        choice: VoteChoice,
        /// Voting center place id.
        #[arg(long)]
        center: i64,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Closest voting center operating on a date.
    Closest {
        #[arg(long)]
        folk: FolkId,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Check whether a registration chose the closest center.
    CheckRegistration {
        #[arg(long)]
        id: RegistrationId,
    },
    /// Ballot counts per choice.
    Tally {
        #[arg(long)]
        poll: PollCode,
    },
    Version,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    if let Command::Version = cli.command {
        println!("pollbook_core version={}", core_version());
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = match &cli.config {
        Some(path) => PollbookConfig::load(path)?,
        None => PollbookConfig::from_env()?,
    };
    if let Some(db) = cli.db {
        config.database.path = db;
    }
    init_from_config(&config.logging)?;

    let conn = open_db(&config.database.path).with_context(|| {
        format!("failed to open database `{}`", config.database.path.display())
    })?;

    match cli.command {
        Command::Version => {}
        Command::Init => {
            info!(
                "event=cli_init module=cli status=ok db={}",
                config.database.path.display()
            );
            println!("initialized {}", config.database.path.display());
        }
        Command::Cast {
            folk,
            poll,
            choice,
            center,
            date,
        } => {
            let outcome = BallotService::new(&conn, SystemClock).cast(&CastRequest {
                folk_id: folk,
                poll_code: poll,
                choice,
                center_id: center,
                voting_date: date,
            });
            println!("{outcome}");
            if let Some(receipt) = outcome.receipt() {
                println!("receipt\t{receipt}");
            }
            if !outcome.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Closest { folk, date } => {
            match CenterResolver::new(&conn).closest_center(&folk, date)? {
                Some(code) => println!("{code}"),
                None => println!("no voting center operates on {date}"),
            }
        }
        Command::CheckRegistration { id } => {
            match CenterResolver::new(&conn).check_registration(id)? {
                CenterCheck::Optimal { chosen } => println!("optimal\t{chosen}"),
                CenterCheck::Suboptimal { chosen, closest } => {
                    println!("suboptimal\t{chosen}\tclosest={closest}")
                }
                CenterCheck::NoEligibleCenter => println!("no_eligible_center"),
            }
        }
        Command::Tally { poll } => {
            if SqlitePollRepository::try_new(&conn)?.get_poll(&poll)?.is_none() {
                bail!("poll not found: {poll}");
            }
            let tally = SqliteBallotRepository::try_new(&conn)?.tally(&poll)?;
            for (choice, count) in tally.entries() {
                println!("{choice}\t{count}");
            }
            println!("TOTAL\t{}", tally.total());
        }
    }
    Ok(ExitCode::SUCCESS)
}
