use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};

use studyhabit::client::{HabitChecklist, HttpStudyApi, StudyApi};
use studyhabit::config::TimerConfig;
use studyhabit::timer::{
    Clock, FileTimerStore, Phase, StopOutcome, SystemClock, Timer, TimerSnapshot, TimerStore,
    TimerTicker,
};

/// Study timer that keeps running between invocations.
#[derive(Debug, Parser)]
#[command(name = "study-timer", version, about = "Track study sessions from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Backend base URL (defaults to API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Bearer token (defaults to API_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Timer state file (defaults to TIMER_STATE_PATH)
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List subjects.
    Subjects,
    /// Choose the subject for the next session.
    Select { subject_id: String },
    /// Start, or resume a paused session.
    Start {
        /// Select this subject first
        #[arg(long)]
        subject: Option<String>,
    },
    /// Pause the running session.
    Pause,
    /// Resume a paused session.
    Resume,
    /// Stop and save the session if it lasted a minute or more.
    Stop,
    /// Discard the session.
    Reset,
    /// Show the timer.
    Status,
    /// Show the timer every second until it stops.
    Watch,
    /// Today's habits.
    Habit {
        #[command(subcommand)]
        action: HabitCommand,
    },
}

#[derive(Debug, Subcommand)]
enum HabitCommand {
    /// List today's habits.
    List,
    /// Check or uncheck a habit for today.
    Toggle { habit_id: i64 },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("study-timer: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = TimerConfig::load();
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if cli.token.is_some() {
        config.api_token = cli.token;
    }
    if let Some(state_file) = cli.state_file {
        config.state_path = state_file;
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store: Arc<dyn TimerStore> = Arc::new(FileTimerStore::new(&config.state_path));
    let mut timer = Timer::restore(clock.clone(), store.clone())?;

    match cli.command {
        Command::Subjects => {
            let api = HttpStudyApi::from_config(&config)?;
            for subject in api.list_subjects().await? {
                println!("{:>4}  {}", subject.id, subject.name);
            }
        }
        Command::Select { subject_id } => {
            timer.select_subject(&subject_id)?;
            println!("Selected subject {}", timer.selected_subject());
        }
        Command::Start { subject } => {
            if let Some(subject) = subject {
                timer.select_subject(&subject)?;
            }
            timer.start()?;
            print_snapshot(&timer.snapshot());
        }
        Command::Pause => {
            timer.pause()?;
            print_snapshot(&timer.snapshot());
        }
        Command::Resume => {
            timer.resume()?;
            print_snapshot(&timer.snapshot());
        }
        Command::Stop => {
            let api = HttpStudyApi::from_config(&config)?;
            match timer.stop(&api).await? {
                StopOutcome::Discarded { elapsed_seconds } => println!(
                    "Stopped after {}, under a minute so nothing was saved",
                    format_elapsed(elapsed_seconds)
                ),
                StopOutcome::Saved(session) => println!(
                    "Saved {} minutes of {}",
                    session.duration_minutes,
                    session.subject_name.as_deref().unwrap_or("study")
                ),
                StopOutcome::SaveFailed(reason) => {
                    return Err(format!("Session could not be saved: {reason}").into());
                }
            }
        }
        Command::Reset => {
            timer.reset()?;
            println!("Timer reset");
        }
        Command::Status => print_snapshot(&timer.snapshot()),
        Command::Watch => {
            let ticker = TimerTicker::new(clock, store, Duration::from_secs(1));
            let (mut rx, handle) = ticker.spawn();
            print_snapshot(&rx.borrow_and_update());
            while rx.changed().await.is_ok() {
                print_snapshot(&rx.borrow_and_update());
            }
            handle.await?;
        }
        Command::Habit { action } => {
            let api = HttpStudyApi::from_config(&config)?;
            let mut checklist = HabitChecklist::load(&api, Utc::now().date_naive()).await?;
            if let HabitCommand::Toggle { habit_id } = action {
                checklist.toggle(&api, habit_id).await?;
            }
            for item in checklist.items() {
                let mark = if item.done { "x" } else { " " };
                println!("[{mark}] {:>4}  {}", item.habit.id, item.habit.name);
            }
            println!(
                "{}/{} done on {}",
                checklist.completed(),
                checklist.items().len(),
                checklist.today()
            );
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "studyhabit=debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .try_init();
}

fn format_elapsed(seconds: i64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

fn print_snapshot(snapshot: &TimerSnapshot) {
    let phase = match snapshot.phase {
        Phase::Ready => "ready",
        Phase::Running => "running",
        Phase::Paused => "paused",
    };
    match snapshot.subject_id {
        Some(subject) => println!(
            "{}  {}  (subject {})",
            format_elapsed(snapshot.elapsed_seconds),
            phase,
            subject
        ),
        None => println!("{}  {}", format_elapsed(snapshot.elapsed_seconds), phase),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn start_accepts_a_subject() {
        let cli = Cli::parse_from(["study-timer", "start", "--subject", "3"]);
        assert!(matches!(cli.command, Command::Start { subject: Some(ref s) } if s == "3"));
    }

    #[test]
    fn elapsed_is_clock_formatted() {
        assert_eq!(format_elapsed(3_725), "01:02:05");
        assert_eq!(format_elapsed(0), "00:00:00");
    }
}
