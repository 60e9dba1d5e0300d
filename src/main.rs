use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;
use remindr::conversation::{ConversationStore, Progress};
use remindr::daemon::Daemon;
use remindr::domain::{NewTask, User, resolve_timezone};
use remindr::render::render_task_summary;
use remindr::scheduler::{SystemClock, compute_schedule};
use remindr::sender::{ConsoleSender, ReminderSender, TelegramSender};
use remindr::service::{SettingsUpdate, TaskService, UserService};
use remindr::store::TaskStore;

fn setup_logging(level: &str) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("remindr")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("remindr.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

/// Store, services and the user the CLI acts for
struct App {
    store: Arc<TaskStore>,
    tasks: TaskService<TaskStore>,
    users: UserService<TaskStore>,
}

impl App {
    fn open(config: &Config) -> Result<Self> {
        let store = Arc::new(
            TaskStore::open(&config.storage.db_path)
                .context(format!("Failed to open database {}", config.storage.db_path.display()))?,
        );
        Ok(Self {
            tasks: TaskService::new(Arc::clone(&store)),
            users: UserService::new(Arc::clone(&store), config.defaults.clone()),
            store,
        })
    }

    fn current_user(&self, cli: &Cli, config: &Config, now: DateTime<Utc>) -> Result<User> {
        let chat_id = cli
            .chat_id
            .or(config.telegram.chat_id)
            .ok_or_else(|| eyre!("No chat id: pass --chat-id or set telegram.chat_id"))?;
        let username = std::env::var("USER").unwrap_or_default();
        Ok(self.users.get_or_create(chat_id, &username, now)?)
    }
}

fn local_today(user: &User, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&user.tz()).date_naive()
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Daemon { dry_run } => handle_daemon_command(*dry_run, config).await,
        Commands::Add {
            description,
            deadline,
            importance,
            frequency,
        } => {
            let app = App::open(config)?;
            match description {
                Some(description) => handle_add_command(&app, cli, config, description, deadline.as_deref(), *importance, frequency),
                None => handle_add_interactive(&app, cli, config).await,
            }
        }
        Commands::List => handle_list_command(&App::open(config)?, cli, config),
        Commands::Done { id } => handle_done_command(&App::open(config)?, *id),
        Commands::Delete { id } => handle_delete_command(&App::open(config)?, *id),
        Commands::Settings {
            timezone,
            work_start,
            work_end,
            hours_per_day,
        } => {
            let update = SettingsUpdate {
                timezone: timezone.clone(),
                work_start_hour: *work_start,
                work_end_hour: *work_end,
                work_hours_per_day: *hours_per_day,
            };
            handle_settings_command(&App::open(config)?, cli, config, &update)
        }
        Commands::Schedule {
            importance,
            work_start,
            work_end,
            timezone,
        } => handle_schedule_command(*importance, *work_start, *work_end, timezone),
    }
}

async fn handle_daemon_command(dry_run: bool, config: &Config) -> Result<()> {
    let app = App::open(config)?;
    let sender: Arc<dyn ReminderSender> = if dry_run {
        println!("{}", "Dry run: reminders are printed, not sent".yellow());
        Arc::new(ConsoleSender::new())
    } else {
        Arc::new(TelegramSender::new(config.telegram_config()?).context("Failed to build Telegram client")?)
    };

    let mut daemon = Daemon::new(Arc::clone(&app.store), sender, Arc::new(SystemClock), config.tick_config());
    daemon.start();
    println!(
        "{} checking every {}s (Ctrl-C to stop)",
        "Daemon running:".green(),
        config.tick_config().check_interval.as_secs()
    );

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
    println!("{}", "Stopping daemon...".cyan());
    daemon.stop().await;

    let stats = daemon.stats();
    println!(
        "{} {} checks, {} reminders sent, {} failed",
        "Stopped:".green(),
        stats.cycles,
        stats.total_sent,
        stats.total_failed
    );
    Ok(())
}

fn handle_add_command(
    app: &App,
    cli: &Cli,
    config: &Config,
    description: &str,
    deadline: Option<&str>,
    importance: u32,
    frequency: &str,
) -> Result<()> {
    let now = Utc::now();
    let user = app.current_user(cli, config, now)?;
    let today = local_today(&user, now);

    let deadline = match deadline {
        Some(raw) => remindr::conversation::parse_deadline(raw)?,
        None => today,
    };
    let frequency = remindr::conversation::parse_frequency(frequency)?;

    let task = app
        .tasks
        .create(NewTask::new(user.id, description, deadline, importance, frequency), today, now)?;
    info!("Created task {} for user {}", task.id, user.id);
    println!("{} {}", "Created:".green(), render_task_summary(&task, today));
    Ok(())
}

async fn handle_add_interactive(app: &App, cli: &Cli, config: &Config) -> Result<()> {
    let now = Utc::now();
    let user = app.current_user(cli, config, now)?;
    let today = local_today(&user, now);

    let conversations = ConversationStore::new();
    let mut step = conversations.start(user.id).await;
    println!("{}", "New task (type 'cancel' to abort)".cyan());

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{} ", step.prompt().bold());
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            conversations.cancel(user.id).await;
            println!();
            return Ok(());
        };
        let line = line?;
        if line.trim().eq_ignore_ascii_case("cancel") {
            conversations.cancel(user.id).await;
            println!("{}", "Cancelled.".yellow());
            return Ok(());
        }

        match conversations.advance(user.id, &line, today).await {
            Ok(Progress::Next(next)) => step = next,
            Ok(Progress::Ready(draft)) => {
                let task = app.tasks.create(draft.into_new_task(user.id)?, today, now)?;
                info!("Created task {} for user {}", task.id, user.id);
                println!("{} {}", "Created:".green(), render_task_summary(&task, today));
                return Ok(());
            }
            Err(e) => println!("{} {}", "Try again:".red(), e),
        }
    }
}

fn handle_list_command(app: &App, cli: &Cli, config: &Config) -> Result<()> {
    let now = Utc::now();
    let user = app.current_user(cli, config, now)?;
    let today = local_today(&user, now);

    let tasks = app.tasks.list_active(user.id)?;
    if tasks.is_empty() {
        println!("{}", "No open tasks".yellow());
        return Ok(());
    }
    for task in tasks {
        let line = render_task_summary(&task, today);
        if task.days_until_deadline(today) < 0 {
            println!("{}", line.red());
        } else {
            println!("{} [{}/{} today]", line, task.reminders_sent_today, task.importance);
        }
    }
    Ok(())
}

fn handle_done_command(app: &App, id: i64) -> Result<()> {
    let task = app.tasks.complete(id, Utc::now())?;
    info!("Completed task {}", id);
    println!("{} #{} {}", "Done:".green(), task.id, task.description);
    Ok(())
}

fn handle_delete_command(app: &App, id: i64) -> Result<()> {
    app.tasks.delete(id)?;
    info!("Deleted task {}", id);
    println!("{} #{}", "Deleted:".red(), id);
    Ok(())
}

fn handle_settings_command(app: &App, cli: &Cli, config: &Config, update: &SettingsUpdate) -> Result<()> {
    let now = Utc::now();
    let mut user = app.current_user(cli, config, now)?;
    if !update.is_empty() {
        user = app.users.update_settings(&user, update, now)?;
        println!("{}", "Settings updated".green());
    }

    println!("Timezone:       {}", user.timezone.cyan());
    println!("Working hours:  {:02}:00-{:02}:00", user.work_start_hour, user.work_end_hour);
    println!("Hours per day:  {}", user.work_hours_per_day);
    Ok(())
}

fn handle_schedule_command(importance: u32, work_start: u32, work_end: u32, timezone: &str) -> Result<()> {
    remindr::service::validate_importance(importance)?;
    remindr::service::validate_work_window(work_start, work_end)?;

    let now = Utc::now().with_timezone(&resolve_timezone(timezone));
    let schedule = compute_schedule(importance, work_start, work_end, &now);
    println!(
        "{} importance {} in {} ({:02}-{:02})",
        "Schedule:".green(),
        importance,
        now.timezone(),
        work_start,
        work_end
    );
    for (i, at) in schedule.iter().enumerate() {
        println!("  {}. {}", i + 1, at.format("%H:%M"));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Logging level comes from the config, so it is set up second
    setup_logging(config.log_level()).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
