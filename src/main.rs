//! healthdash CLI - a local-first personal health dashboard.

use clap::Parser;
use healthdash::cli::{
    Cli, Commands, ConfigCommands, ExportCommands, GoalCommands, ProfileCommands,
    RecordCommands, ReminderCommands, SystemCommands, TrendCommands,
};
use healthdash::commands::{self, Exported, Output};
use healthdash::config::{
    ConfigOverrides, DEFAULT_LOG_LEVEL, OutputFormat, ResolvedConfig, resolve_config,
    resolve_log_filter,
};
use healthdash::dashboard::Dashboard;
use healthdash::notify::ConsoleNotifier;
use healthdash::storage::Storage;
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

fn main() {
    let cli = Cli::parse();

    let mut overrides = ConfigOverrides::new();
    if cli.human_readable {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }
    if let Some(ref level) = cli.log_level {
        overrides = overrides.with_log_level(level.clone());
    }

    let storage = Storage::open(cli.data_dir.as_deref()).ok();
    let config = match resolve_config(storage.as_ref(), &overrides) {
        Ok(config) => config,
        Err(e) => exit_with_error(&e, cli.human_readable),
    };
    let human = config.output_format() == OutputFormat::Human;
    init_tracing(&config, human);

    if let Err(e) = run_command(cli.command, cli.data_dir.as_deref(), config, human) {
        exit_with_error(&e, human);
    }
}

fn exit_with_error(e: &healthdash::Error, human: bool) -> ! {
    if human {
        eprintln!("Error: {}", e);
    } else {
        eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
    }
    process::exit(1);
}

/// Install the stderr subscriber: JSON lines by default, compact text with -H.
fn init_tracing(config: &ResolvedConfig, human: bool) {
    let filter = resolve_log_filter(config);
    let env_filter = EnvFilter::try_new(&filter.value)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if human {
        registry
            .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().json().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
    if result.is_err() {
        eprintln!("warning: logging already initialized");
    }
}

fn open_dashboard(
    data_dir: Option<&Path>,
    config: ResolvedConfig,
    human: bool,
) -> Result<(Dashboard, std::path::PathBuf), healthdash::Error> {
    let storage = Storage::open(data_dir)?;
    let dashboard = Dashboard::open(&storage, config, Arc::new(ConsoleNotifier::new(human)))?;
    Ok((dashboard, storage.root))
}

fn run_command(
    command: Option<Commands>,
    data_dir: Option<&Path>,
    config: ResolvedConfig,
    human: bool,
) -> Result<(), healthdash::Error> {
    let Some(command) = command else {
        let (dash, root) = open_dashboard(data_dir, config, human)?;
        output(&commands::system_status(&dash, &root), human);
        return Ok(());
    };

    match command {
        Commands::System { command } => match command {
            SystemCommands::Init => {
                let result = commands::system_init(data_dir)?;
                output(&result, human);
            }
            SystemCommands::Status => {
                let (dash, root) = open_dashboard(data_dir, config, human)?;
                output(&commands::system_status(&dash, &root), human);
            }
            SystemCommands::Usage => {
                let (dash, _) = open_dashboard(data_dir, config, human)?;
                output(&commands::system_usage(&dash)?, human);
            }
        },

        Commands::Record { command } => {
            let (mut dash, _) = open_dashboard(data_dir, config, human)?;
            match command {
                RecordCommands::Add { fields } => {
                    output(&commands::record_add(&mut dash, &fields)?, human)
                }
                RecordCommands::Update { id, fields } => {
                    output(&commands::record_update(&mut dash, &id, &fields)?, human)
                }
                RecordCommands::Delete { id } => {
                    output(&commands::record_delete(&mut dash, &id)?, human)
                }
                RecordCommands::Show { id } => output(&commands::record_show(&dash, &id)?, human),
                RecordCommands::Today => output(&commands::record_today(&dash), human),
                RecordCommands::List { from, to, limit } => output(
                    &commands::record_list(&dash, from.as_deref(), to.as_deref(), limit)?,
                    human,
                ),
            }
        }

        Commands::Goal { command } => {
            let (mut dash, _) = open_dashboard(data_dir, config, human)?;
            match command {
                GoalCommands::Add {
                    goal_type,
                    target,
                    period,
                    name,
                } => output(
                    &commands::goal_add(&mut dash, &goal_type, target, &period, name)?,
                    human,
                ),
                GoalCommands::List { status } => {
                    output(&commands::goal_list(&dash, status.as_deref())?, human)
                }
                GoalCommands::Update {
                    id,
                    goal_type,
                    name,
                    period,
                    target,
                    status,
                } => output(
                    &commands::goal_update(
                        &mut dash,
                        &id,
                        goal_type.as_deref(),
                        name,
                        period.as_deref(),
                        target,
                        status.as_deref(),
                    )?,
                    human,
                ),
                GoalCommands::Progress { id, value } => {
                    output(&commands::goal_progress(&mut dash, &id, value)?, human)
                }
                GoalCommands::Pause { id } => output(&commands::goal_pause(&mut dash, &id)?, human),
                GoalCommands::Resume { id } => {
                    output(&commands::goal_resume(&mut dash, &id)?, human)
                }
                GoalCommands::Delete { id } => {
                    output(&commands::goal_delete(&mut dash, &id)?, human)
                }
                GoalCommands::Reset => output(&commands::goal_reset(&mut dash)?, human),
                GoalCommands::Today => output(&commands::goal_today(&dash), human),
            }
        }

        Commands::Stats { window } => {
            let (dash, _) = open_dashboard(data_dir, config, human)?;
            output(&commands::stats(&dash, &window)?, human);
        }

        Commands::Trend { command } => {
            let (dash, _) = open_dashboard(data_dir, config, human)?;
            match command {
                TrendCommands::Steps => output(&commands::trend_steps(&dash), human),
                TrendCommands::Sleep => output(&commands::trend_sleep(&dash), human),
            }
        }

        Commands::Profile { command } => {
            let (mut dash, _) = open_dashboard(data_dir, config, human)?;
            match command {
                ProfileCommands::Set {
                    nickname,
                    birth_date,
                    gender,
                    height,
                    weight,
                } => output(
                    &commands::profile_set(
                        &mut dash,
                        nickname,
                        birth_date.as_deref(),
                        gender,
                        height,
                        weight,
                    )?,
                    human,
                ),
                ProfileCommands::Show => output(&commands::profile_show(&dash), human),
                ProfileCommands::Clear => output(&commands::profile_clear(&mut dash)?, human),
            }
        }

        Commands::Reminder { command } => {
            let (mut dash, _) = open_dashboard(data_dir, config, human)?;
            match command {
                ReminderCommands::Add {
                    reminder_type,
                    message,
                    time,
                    interval,
                    repeat,
                } => output(
                    &commands::reminder_add(
                        &mut dash,
                        &reminder_type,
                        message,
                        time.as_deref(),
                        interval,
                        &repeat,
                    )?,
                    human,
                ),
                ReminderCommands::List {
                    reminder_type,
                    enabled,
                } => output(
                    &commands::reminder_list(&dash, reminder_type.as_deref(), enabled)?,
                    human,
                ),
                ReminderCommands::Update {
                    id,
                    message,
                    time,
                    interval,
                    repeat,
                    enabled,
                } => output(
                    &commands::reminder_update(
                        &mut dash,
                        &id,
                        message,
                        time.as_deref(),
                        interval,
                        repeat.as_deref(),
                        enabled,
                    )?,
                    human,
                ),
                ReminderCommands::Toggle { id } => {
                    output(&commands::reminder_toggle(&mut dash, &id)?, human)
                }
                ReminderCommands::Delete { id } => {
                    output(&commands::reminder_delete(&mut dash, &id)?, human)
                }
                ReminderCommands::Watch { duration } => watch_reminders(dash, duration, human)?,
            }
        }

        Commands::Export { command } => {
            let (dash, _) = open_dashboard(data_dir, config, human)?;
            match command {
                ExportCommands::Json { output: path } => {
                    print_export(commands::export_json(&dash, path.as_deref())?, human)
                }
                ExportCommands::Csv {
                    output: path,
                    from,
                    to,
                } => print_export(
                    commands::export_csv(&dash, path.as_deref(), from.as_deref(), to.as_deref())?,
                    human,
                ),
                ExportCommands::Report { output: path } => {
                    match commands::export_report(&dash, path.as_deref())? {
                        (_, Some(written)) => output(&written, human),
                        (report, None) => output(&report, human),
                    }
                }
            }
        }

        Commands::Import { input, format } => {
            let (mut dash, _) = open_dashboard(data_dir, config, human)?;
            output(&commands::import(&mut dash, &input, format.as_deref())?, human);
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => output(&commands::config_show(&config), human),
            ConfigCommands::Set { key, value } => {
                let storage = Storage::open(data_dir)?;
                output(&commands::config_set(&storage, &key, &value)?, human);
            }
        },
    }

    Ok(())
}

/// Run enabled reminders until Ctrl-C (or `duration` seconds).
fn watch_reminders(
    mut dash: Dashboard,
    duration: Option<u64>,
    human: bool,
) -> Result<(), healthdash::Error> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let started = commands::reminder_watch(&mut dash);
        output(&started, human);
        if started.started == 0 {
            return Ok(());
        }

        let deadline = async {
            match duration {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            signal = tokio::signal::ctrl_c() => signal?,
            () = deadline => {}
        }
        tracing::info!("stopping reminders");
        drop(dash);
        Ok(())
    })
}

fn print_export(exported: Exported, human: bool) {
    match exported {
        Exported::File(result) => output(&result, human),
        Exported::Stdout(content) => println!("{}", content),
    }
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

