//! A command-line front end to a poll snapshot file.
//! Commands go through the same ledger as the server, so a snapshot written
//! by one can be read by the other.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{Appender, Config as LogConfig, Root},
    encode::pattern::PatternEncoder,
};
use thiserror::Error;

use poll_ledger::{
    clock::{Clock, SystemClock},
    error::Error as LedgerError,
    model::{
        gate_voting, rank_candidates, resolve_status, Id, JsonFileStore, Ledger, Poll,
        StoreError,
    },
};

const PROGRAM_NAME: &str = "poll-cli";

const ABOUT_TEXT: &str = "Create polls, register candidates and voters, and vote.

EXIT CODES:
     0: Success.
     1: Error.";

const SNAPSHOT: &str = "SNAPSHOT";
const POLL_ID: &str = "POLL_ID";
const TITLE: &str = "TITLE";
const DESCRIPTION: &str = "DESCRIPTION";
const START: &str = "START";
const END: &str = "END";
const NAME: &str = "NAME";
const MANIFESTO: &str = "MANIFESTO";
const PHOTO: &str = "PHOTO";
const IDENTIFIER: &str = "IDENTIFIER";
const CANDIDATE_ID: &str = "CANDIDATE_ID";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    let poll_id = || {
        Arg::new(POLL_ID)
            .help("ID of the poll")
            .action(ArgAction::Set)
            .required(true)
    };
    let text = |id: &'static str, long: &'static str, help: &'static str| {
        Arg::new(id)
            .long(long)
            .help(help)
            .action(ArgAction::Set)
            .required(true)
    };

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .subcommand_required(true)
        .arg(
            Arg::new(SNAPSHOT)
                .long("snapshot")
                .help("Path of the poll snapshot file")
                .action(ArgAction::Set)
                .default_value("polls.json"),
        )
        .subcommand(
            Command::new("create")
                .about("Create a poll")
                .arg(text(TITLE, "title", "Poll title"))
                .arg(
                    Arg::new(DESCRIPTION)
                        .long("description")
                        .help("Free-text description")
                        .action(ArgAction::Set)
                        .default_value(""),
                )
                .arg(text(START, "start", "When voting opens (RFC 3339)"))
                .arg(text(END, "end", "When voting closes (RFC 3339)")),
        )
        .subcommand(
            Command::new("candidate")
                .about("Register a candidate")
                .arg(poll_id())
                .arg(text(NAME, "name", "Candidate name"))
                .arg(
                    Arg::new(MANIFESTO)
                        .long("manifesto")
                        .help("Candidate manifesto")
                        .action(ArgAction::Set)
                        .default_value(""),
                )
                .arg(
                    Arg::new(PHOTO)
                        .long("photo")
                        .help("Photo URL; a placeholder is used if omitted")
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("voter")
                .about("Register a voter")
                .arg(poll_id())
                .arg(text(NAME, "name", "Voter name"))
                .arg(text(IDENTIFIER, "identifier", "Voter identifier, unique within the poll")),
        )
        .subcommand(
            Command::new("vote")
                .about("Cast a vote")
                .arg(poll_id())
                .arg(text(CANDIDATE_ID, "candidate", "ID of the chosen candidate"))
                .arg(text(IDENTIFIER, "voter", "Identifier of the voting voter")),
        )
        .subcommand(
            Command::new("status")
                .about("Show whether a poll is open")
                .arg(poll_id()),
        )
        .subcommand(
            Command::new("results")
                .about("Show candidates ranked by votes")
                .arg(poll_id()),
        )
        .subcommand(Command::new("list").about("List all polls"))
}

/// Errors that this program may produce.
#[derive(Debug, Error)]
enum Error {
    #[error("Invalid {what} '{value}'")]
    Argument { what: &'static str, value: String },
    #[error("Snapshot not usable: {0}")]
    Snapshot(#[from] StoreError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Fetch an argument that clap guarantees is present.
fn required<'a>(args: &'a ArgMatches, id: &str) -> &'a str {
    args.get_one::<String>(id)
        .map(String::as_str)
        .unwrap_or_default()
}

fn parse_id(args: &ArgMatches, id: &str, what: &'static str) -> Result<Id, Error> {
    let value = required(args, id);
    value.parse().map_err(|_| Error::Argument {
        what,
        value: value.to_string(),
    })
}

fn parse_date(args: &ArgMatches, id: &str, what: &'static str) -> Result<DateTime<Utc>, Error> {
    let value = required(args, id);
    DateTime::parse_from_rfc3339(value)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|_| Error::Argument {
            what,
            value: value.to_string(),
        })
}

fn find_poll(ledger: &Ledger, poll_id: Id) -> Result<&Poll, Error> {
    Ok(ledger.poll(poll_id).ok_or(LedgerError::PollNotFound(poll_id))?)
}

/// Run one command against the snapshot and return what to print.
fn run(args: &ArgMatches, clock: &dyn Clock) -> Result<String, Error> {
    let snapshot: PathBuf = required(args, SNAPSHOT).into();
    let mut ledger = Ledger::load(JsonFileStore::new(snapshot))?;
    let now = clock.now();

    let output = match args.subcommand() {
        Some(("create", sub)) => {
            let start = parse_date(sub, START, "start date")?;
            let end = parse_date(sub, END, "end date")?;
            let poll = ledger.create_poll(
                required(sub, TITLE).to_string(),
                required(sub, DESCRIPTION).to_string(),
                start,
                end,
            );
            format!("Created poll {} ({})", poll.id, resolve_status(&poll, now))
        }
        Some(("candidate", sub)) => {
            let poll_id = parse_id(sub, POLL_ID, "poll ID")?;
            let photo = sub.get_one::<String>(PHOTO).cloned();
            match ledger.add_candidate(
                poll_id,
                required(sub, NAME).to_string(),
                required(sub, MANIFESTO).to_string(),
                photo,
            ) {
                Some(candidate) => format!("Registered candidate {}", candidate.id),
                None => format!("No poll {poll_id}; nothing registered"),
            }
        }
        Some(("voter", sub)) => {
            let poll_id = parse_id(sub, POLL_ID, "poll ID")?;
            match ledger.add_voter(
                poll_id,
                required(sub, NAME).to_string(),
                required(sub, IDENTIFIER).to_string(),
            )? {
                Some(voter) => format!("Registered voter {}", voter.id),
                None => format!("No poll {poll_id}; nothing registered"),
            }
        }
        Some(("vote", sub)) => {
            let poll_id = parse_id(sub, POLL_ID, "poll ID")?;
            let candidate_id = parse_id(sub, CANDIDATE_ID, "candidate ID")?;
            let poll = find_poll(&ledger, poll_id)?;
            gate_voting(resolve_status(poll, now))?;
            ledger.cast_vote(poll_id, candidate_id, required(sub, IDENTIFIER))?;
            "Vote recorded".to_string()
        }
        Some(("status", sub)) => {
            let poll = find_poll(&ledger, parse_id(sub, POLL_ID, "poll ID")?)?;
            let status = resolve_status(poll, now);
            let open = if status.permits_voting() { "open" } else { "closed" };
            format!("{status} (voting {open})")
        }
        Some(("results", sub)) => {
            let poll = find_poll(&ledger, parse_id(sub, POLL_ID, "poll ID")?)?;
            rank_candidates(poll)
                .into_iter()
                .enumerate()
                .map(|(i, candidate)| {
                    format!(
                        "{}. {}: {} vote{}",
                        i + 1,
                        candidate.name,
                        candidate.votes,
                        if candidate.votes != 1 { "s" } else { "" }
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        Some(("list", _)) => ledger
            .polls()
            .iter()
            .map(|poll| format!("{} {:<8} {}", poll.id, resolve_status(poll, now).to_string(), poll.title))
            .collect::<Vec<_>>()
            .join("\n"),
        // `subcommand_required` rules this out.
        _ => String::new(),
    };

    // The snapshot is the only place a change outlives this process.
    if let Some(err) = ledger.take_save_error() {
        return Err(Error::Snapshot(err));
    }
    Ok(output)
}

/// Send warnings and errors from the ledger to stderr.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{l}: {m}{n}")))
        .build();
    let config = LogConfig::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Warn))?;
    log4rs::init_config(config)?;
    Ok(())
}

fn main() {
    let args = cli().get_matches();
    if let Err(err) = init_logging() {
        eprintln!("Failed to initialise logging: {err}");
    }
    let exit_code = match run(&args, &SystemClock) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
            0
        }
        Err(err) => {
            eprintln!("{err}");
            1
        }
    };
    std::process::exit(exit_code)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use poll_ledger::clock::ManualClock;
    use rand::{distributions::Alphanumeric, Rng};

    use super::*;

    struct Snapshot(PathBuf);

    impl Snapshot {
        fn new() -> Self {
            let suffix: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(12)
                .map(char::from)
                .collect();
            Self(std::env::temp_dir().join(format!("poll-cli-test-{suffix}.json")))
        }

        fn run(&self, clock: &ManualClock, command: &[&str]) -> Result<String, Error> {
            let mut argv = vec![PROGRAM_NAME, "--snapshot", self.0.to_str().unwrap()];
            argv.extend_from_slice(command);
            run(&cli().get_matches_from(argv), clock)
        }
    }

    impl Drop for Snapshot {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    /// The word at `position` in output such as "Created poll <id> (Upcoming)".
    fn id_in(output: &str, position: usize) -> String {
        output.split_whitespace().nth(position).unwrap().to_string()
    }

    #[test]
    fn cli_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn full_session() {
        log4rs_test_utils::test_logging::init_logging_once_for(["poll_ledger"], None, None);
        let snapshot = Snapshot::new();
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let clock = ManualClock::new(start - Duration::hours(1));

        let created = snapshot
            .run(
                &clock,
                &[
                    "create",
                    "--title",
                    "Class rep",
                    "--start",
                    "2024-03-01T09:00:00Z",
                    "--end",
                    "2024-03-01T17:00:00Z",
                ],
            )
            .unwrap();
        assert!(created.ends_with("(Upcoming)"));
        let poll_id = id_in(&created, 2);

        let alice = snapshot
            .run(&clock, &["candidate", &poll_id, "--name", "Alice"])
            .unwrap();
        let alice = id_in(&alice, 2);
        let bob = snapshot
            .run(&clock, &["candidate", &poll_id, "--name", "Bob"])
            .unwrap();
        let bob = id_in(&bob, 2);
        snapshot
            .run(&clock, &["voter", &poll_id, "--name", "Jane", "--identifier", "u1"])
            .unwrap();
        snapshot
            .run(&clock, &["voter", &poll_id, "--name", "John", "--identifier", "u2"])
            .unwrap();

        // Not open yet.
        let vote: [&str; 6] = ["vote", &poll_id, "--candidate", &bob, "--voter", "u1"];
        let err = snapshot.run(&clock, &vote).unwrap_err();
        assert_eq!(err.to_string(), "Voting is closed. Poll is Upcoming");
        assert_eq!(
            snapshot.run(&clock, &["status", &poll_id]).unwrap(),
            "Upcoming (voting closed)"
        );

        clock.set(start);
        assert_eq!(
            snapshot.run(&clock, &["status", &poll_id]).unwrap(),
            "Ongoing (voting open)"
        );
        assert_eq!(snapshot.run(&clock, &vote).unwrap(), "Vote recorded");
        let err = snapshot.run(&clock, &vote).unwrap_err();
        assert_eq!(err.to_string(), "Voter 'u1' has already voted.");

        let err = snapshot
            .run(&clock, &["vote", &poll_id, "--candidate", &alice, "--voter", "u3"])
            .unwrap_err();
        assert_eq!(err.to_string(), "Voter ID 'u3' not found.");

        assert_eq!(
            snapshot.run(&clock, &["results", &poll_id]).unwrap(),
            "1. Bob: 1 vote\n2. Alice: 0 votes"
        );

        clock.set(start + Duration::days(1));
        let listed = snapshot.run(&clock, &["list"]).unwrap();
        assert!(listed.starts_with(&poll_id));
        assert!(listed.contains("Ended"));
        assert!(listed.ends_with("Class rep"));
    }

    #[test]
    fn duplicate_voter_and_missing_poll() {
        let snapshot = Snapshot::new();
        let clock = ManualClock::new(Utc::now());
        let created = snapshot
            .run(
                &clock,
                &[
                    "create",
                    "--title",
                    "Lunch",
                    "--start",
                    "2020-01-01T00:00:00Z",
                    "--end",
                    "2030-01-01T00:00:00Z",
                ],
            )
            .unwrap();
        let poll_id = id_in(&created, 2);

        let voter: [&str; 6] = ["voter", &poll_id, "--name", "Jane", "--identifier", "u1"];
        snapshot.run(&clock, &voter).unwrap();
        let err = snapshot.run(&clock, &voter).unwrap_err();
        assert!(matches!(err, Error::Ledger(LedgerError::DuplicateVoter(_))));

        // Registration against an unknown poll is ignored.
        let missing = Id::new().to_string();
        let output = snapshot
            .run(&clock, &["candidate", &missing, "--name", "Nobody"])
            .unwrap();
        assert_eq!(output, format!("No poll {missing}; nothing registered"));

        // Other lookups report it.
        let err = snapshot.run(&clock, &["status", &missing]).unwrap_err();
        assert!(matches!(err, Error::Ledger(LedgerError::PollNotFound(_))));
    }

    #[test]
    fn bad_arguments() {
        let snapshot = Snapshot::new();
        let clock = ManualClock::new(Utc::now());

        let err = snapshot.run(&clock, &["status", "not-a-uuid"]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid poll ID 'not-a-uuid'");

        let err = snapshot
            .run(
                &clock,
                &["create", "--title", "T", "--start", "yesterday", "--end", "2030-01-01T00:00:00Z"],
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid start date 'yesterday'");

        // An empty snapshot lists nothing.
        assert_eq!(snapshot.run(&clock, &["list"]).unwrap(), "");
    }

    #[test]
    fn unsaved_changes_are_errors() {
        log4rs_test_utils::test_logging::init_logging_once_for(["poll_ledger"], None, None);
        let missing_dir = std::env::temp_dir()
            .join("poll-cli-missing-dir")
            .join("polls.json");
        let clock = ManualClock::new(Utc::now());
        let argv = [
            PROGRAM_NAME,
            "--snapshot",
            missing_dir.to_str().unwrap(),
            "create",
            "--title",
            "Lost",
            "--start",
            "2020-01-01T00:00:00Z",
            "--end",
            "2030-01-01T00:00:00Z",
        ];
        let err = run(&cli().get_matches_from(argv), &clock).unwrap_err();
        assert!(matches!(err, Error::Snapshot(StoreError::Io(_))));

        // Nothing was kept.
        let argv = [PROGRAM_NAME, "--snapshot", missing_dir.to_str().unwrap(), "list"];
        assert_eq!(run(&cli().get_matches_from(argv), &clock).unwrap(), "");
    }
}
