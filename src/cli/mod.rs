//! CLI argument definitions for healthdash.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// healthdash - a local-first personal health dashboard.
///
/// Start with `hdash system init`, then log a day with `hdash record add`.
#[derive(Parser, Debug)]
#[command(name = "hdash")]
#[command(author, version, about = "Track daily health records, goals and reminders", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Data directory (defaults to the platform data dir)
    #[arg(short = 'D', long = "data-dir", global = true, env = "HDASH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log filter for this run (e.g. "debug"); HDASH_LOG takes precedence
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Data directory setup and status
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },

    /// Daily health records
    Record {
        #[command(subcommand)]
        command: RecordCommands,
    },

    /// Goals and progress
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },

    /// Totals and averages over a window of records
    Stats {
        /// Window: week (Monday to today), month, or all
        #[arg(long, default_value = "week", value_parser = ["week", "month", "all"])]
        window: String,
    },

    /// Seven-day trends
    Trend {
        #[command(subcommand)]
        command: TrendCommands,
    },

    /// The user profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Reminders and the reminder scheduler
    Reminder {
        #[command(subcommand)]
        command: ReminderCommands,
    },

    /// Export data as a JSON backup, CSV or a health report
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },

    /// Import records from a JSON backup, a JSON array or CSV
    Import {
        /// Input file ('-' for stdin)
        input: String,

        /// Input format (guessed from the file extension when omitted)
        #[arg(long, value_parser = ["json", "csv"])]
        format: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// System subcommands
#[derive(Subcommand, Debug)]
pub enum SystemCommands {
    /// Create the data directory
    Init,

    /// Show storage tier, counts and build information
    Status,

    /// Show key-value storage use against the quota
    Usage,
}

/// Measurements shared by `record add` and `record update`.
#[derive(Args, Debug, Default, Clone)]
pub struct RecordFields {
    /// Record date (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<String>,

    /// Step count
    #[arg(long)]
    pub steps: Option<u32>,

    /// Distance walked in km
    #[arg(long)]
    pub distance: Option<f64>,

    /// Calories burned
    #[arg(long)]
    pub calories: Option<f64>,

    /// Water intake in ml
    #[arg(long)]
    pub water: Option<u32>,

    /// Body weight in kg
    #[arg(long)]
    pub weight: Option<f64>,

    /// Resting heart rate (bpm)
    #[arg(long)]
    pub heart_resting: Option<u32>,

    /// Maximum heart rate (bpm)
    #[arg(long)]
    pub heart_max: Option<u32>,

    /// Average heart rate (bpm)
    #[arg(long)]
    pub heart_avg: Option<u32>,

    /// Hours slept
    #[arg(long)]
    pub sleep: Option<f64>,

    /// Hours of deep sleep
    #[arg(long)]
    pub sleep_deep: Option<f64>,

    /// Hours of light sleep
    #[arg(long)]
    pub sleep_light: Option<f64>,

    /// Sleep quality (e.g. good, fair, poor)
    #[arg(long)]
    pub sleep_quality: Option<String>,

    /// Systolic blood pressure (mmHg)
    #[arg(long)]
    pub systolic: Option<u32>,

    /// Diastolic blood pressure (mmHg)
    #[arg(long)]
    pub diastolic: Option<u32>,

    /// Breakfast
    #[arg(long)]
    pub breakfast: Option<String>,

    /// Lunch
    #[arg(long)]
    pub lunch: Option<String>,

    /// Dinner
    #[arg(long)]
    pub dinner: Option<String>,

    /// Calories eaten
    #[arg(long)]
    pub food_calories: Option<f64>,

    /// Mood (defaults to "normal" on new records)
    #[arg(long)]
    pub mood: Option<String>,

    /// Free-form notes
    #[arg(long)]
    pub notes: Option<String>,
}

/// Record subcommands
#[derive(Subcommand, Debug)]
pub enum RecordCommands {
    /// Add a record (defaults to today)
    Add {
        #[command(flatten)]
        fields: RecordFields,
    },

    /// Update fields of a record; unset fields keep their value
    Update {
        /// Record ID
        id: String,

        #[command(flatten)]
        fields: RecordFields,
    },

    /// Delete a record
    Delete {
        /// Record ID
        id: String,
    },

    /// Show a record by ID or date (YYYY-MM-DD)
    Show {
        /// Record ID or date
        id: String,
    },

    /// Show today's record
    Today,

    /// List records, newest first
    List {
        /// First date to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Last date to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Maximum number of records
        #[arg(long)]
        limit: Option<usize>,
    },
}

/// Goal subcommands
#[derive(Subcommand, Debug)]
pub enum GoalCommands {
    /// Create a goal
    Add {
        /// Goal type (steps, water, sleep, weight, calories_intake, exercise, heart_rate)
        goal_type: String,

        /// Target value in the type's unit
        target: f64,

        /// Period (daily, weekly, monthly)
        #[arg(long, default_value = "daily")]
        period: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,
    },

    /// List goals
    List {
        /// Filter by status (active, completed, paused)
        #[arg(long)]
        status: Option<String>,
    },

    /// Update a goal
    Update {
        /// Goal ID
        id: String,

        /// New goal type
        #[arg(long = "type")]
        goal_type: Option<String>,

        /// New display name
        #[arg(long)]
        name: Option<String>,

        /// New period
        #[arg(long)]
        period: Option<String>,

        /// New target value
        #[arg(long)]
        target: Option<f64>,

        /// New status (active, completed, paused)
        #[arg(long)]
        status: Option<String>,
    },

    /// Set a goal's current value
    Progress {
        /// Goal ID
        id: String,

        /// Current value
        value: f64,
    },

    /// Pause a goal
    Pause {
        /// Goal ID
        id: String,
    },

    /// Resume a paused goal
    Resume {
        /// Goal ID
        id: String,
    },

    /// Delete a goal
    Delete {
        /// Goal ID
        id: String,
    },

    /// Reset progress of daily goals
    Reset,

    /// Progress of active daily goals
    Today,
}

/// Trend subcommands
#[derive(Subcommand, Debug)]
pub enum TrendCommands {
    /// Steps for the last seven days
    Steps,

    /// Sleep for the last seven days
    Sleep,
}

/// Profile subcommands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Create or update the profile
    Set {
        /// Nickname
        #[arg(long)]
        nickname: Option<String>,

        /// Birth date (YYYY-MM-DD)
        #[arg(long)]
        birth_date: Option<String>,

        /// Gender
        #[arg(long)]
        gender: Option<String>,

        /// Height in cm
        #[arg(long)]
        height: Option<f64>,

        /// Weight in kg
        #[arg(long)]
        weight: Option<f64>,
    },

    /// Show the profile with age and BMI
    Show,

    /// Remove the profile
    Clear,
}

/// Reminder subcommands
#[derive(Subcommand, Debug)]
pub enum ReminderCommands {
    /// Create a reminder
    Add {
        /// Reminder type (water, exercise, sleep, medicine, custom)
        reminder_type: String,

        /// Message (required for custom reminders)
        #[arg(long)]
        message: Option<String>,

        /// Time of day (HH:MM)
        #[arg(long)]
        time: Option<String>,

        /// Interval in minutes
        #[arg(long)]
        interval: Option<u32>,

        /// Repeat for time-of-day reminders (once, daily)
        #[arg(long, default_value = "once")]
        repeat: String,
    },

    /// List reminders
    List {
        /// Filter by type
        #[arg(long = "type")]
        reminder_type: Option<String>,

        /// Only enabled reminders
        #[arg(long)]
        enabled: bool,
    },

    /// Update a reminder
    Update {
        /// Reminder ID
        id: String,

        /// New message
        #[arg(long)]
        message: Option<String>,

        /// New time of day (HH:MM)
        #[arg(long)]
        time: Option<String>,

        /// New interval in minutes
        #[arg(long)]
        interval: Option<u32>,

        /// New repeat (once, daily)
        #[arg(long)]
        repeat: Option<String>,

        /// Enable or disable
        #[arg(long)]
        enabled: Option<bool>,
    },

    /// Enable or disable a reminder
    Toggle {
        /// Reminder ID
        id: String,
    },

    /// Delete a reminder
    Delete {
        /// Reminder ID
        id: String,
    },

    /// Run enabled reminders in the foreground until interrupted
    Watch {
        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,
    },
}

/// Export subcommands
#[derive(Subcommand, Debug)]
pub enum ExportCommands {
    /// Full JSON backup (records, goals, profile, reminders)
    Json {
        /// Output file or directory (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Records as CSV
    Csv {
        /// Output file or directory (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// First date to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Last date to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Health report with profile, statistics and goal progress
    Report {
        /// Output file or directory (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration with value sources
    Show,

    /// Set a value in the data directory's config.kdl
    Set {
        /// Configuration key (output-format, log-level, storage-quota, auto-daily-reset)
        key: String,
        /// Configuration value
        value: String,
    },
}
