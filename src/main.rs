// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, error, info};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use tutorlink::app_config::{self, Config};
use tutorlink::database::schema;
use tutorlink::{AppError, Repository, default_language_names};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the database and its tables if they do not exist yet
    Init,

    /// Fill the languages table (defaults to every ISO 639-1 language)
    SeedLanguages {
        /// Language names or ISO codes (e.g., 'fr', 'ger', 'Korean')
        #[arg(value_name = "NAMES")]
        names: Vec<String>,
    },

    /// Show row counts for every table
    Stats,

    /// Print every row of a table as JSON
    Dump {
        /// Table name (e.g., 'teachers', 'students_teachers')
        #[arg(value_name = "TABLE")]
        table: String,

        /// Print one compact JSON object per line
        #[arg(long)]
        compact: bool,
    },

    /// Rebuild the database file to reclaim free space
    Vacuum,

    /// Generate shell completions for tutorlink
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// TutorLink - storage for a language-tutoring marketplace
///
/// Manages the SQLite database holding teachers, students, admin users,
/// languages, lessons and lesson categories.
#[derive(Parser, Debug)]
#[command(name = "tutorlink")]
#[command(version)]
#[command(about = "Language-tutoring marketplace database tool")]
#[command(long_about = "TutorLink maintains the SQLite database behind a language-tutoring marketplace.

EXAMPLES:
    tutorlink init                              # Create the database at the default location
    tutorlink -d ./dev.db seed-languages        # Seed every ISO 639-1 language
    tutorlink seed-languages fr de Korean       # Seed a chosen set of languages
    tutorlink stats                             # Row counts per table
    tutorlink dump teachers                     # Teachers as pretty JSON
    tutorlink completions bash > tutorlink.bash # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long = "config", global = true, default_value = "conf.json")]
    config_path: PathBuf,

    /// Database file (overrides database.path from the config)
    #[arg(short, long, global = true, env = "TUTORLINK_DATABASE")]
    database: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI colour for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "1;31"),
            Level::Warn => ("🚧 ", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍 ", "1;36"),
            Level::Trace => ("📋 ", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (emoji, colour) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                colour,
                now,
                emoji,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Accept everything here; the effective level is applied via set_max_level
    if let Err(e) = CustomLogger::init(LevelFilter::Trace) {
        eprintln!("Failed to initialize logger: {}", e);
    }
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: CommandLineOptions) -> Result<(), AppError> {
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "tutorlink", &mut std::io::stdout());
        return Ok(());
    }

    // If log level is set via command line, apply it before reading the config
    if let Some(cmd_log_level) = &cli.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config = load_config(&cli)?;
    log::set_max_level(config.log_level.to_level_filter());

    let repo = Repository::from_config(&config.database)?;
    debug!("Using database at {:?}", repo.connection().path());

    match cli.command {
        Commands::Init => {
            info!(
                "Database ready at {:?} (schema version {})",
                repo.connection().path(),
                schema::SCHEMA_VERSION
            );
        }
        Commands::SeedLanguages { names } => {
            let names = if !names.is_empty() {
                names
            } else if !config.seed.languages.is_empty() {
                config.seed.languages.clone()
            } else {
                default_language_names()
            };

            let inserted = repo.seed_languages(names).await?;
            info!("Inserted {} languages", inserted);
        }
        Commands::Stats => {
            let db = repo.connection().clone();
            let stats = tokio::task::spawn_blocking(move || db.stats())
                .await
                .context("Stats task panicked")??;
            println!("{}", stats);
        }
        Commands::Dump { table, compact } => {
            let rows = repo.dump_table(&table).await?;

            let mut stdout = std::io::stdout().lock();
            if compact {
                for row in rows {
                    writeln!(stdout, "{}", serde_json::Value::Object(row))?;
                }
            } else {
                let json = serde_json::to_string_pretty(&rows)
                    .context("Failed to serialize rows to JSON")?;
                writeln!(stdout, "{}", json)?;
            }
        }
        Commands::Vacuum => {
            let db = repo.connection().clone();
            tokio::task::spawn_blocking(move || db.vacuum())
                .await
                .context("Vacuum task panicked")??;
            info!("Vacuumed {:?}", repo.connection().path());
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Load or create the config file and apply command line overrides
fn load_config(cli: &CommandLineOptions) -> Result<Config, AppError> {
    let mut config = Config::load_or_create(&cli.config_path)
        .map_err(|e| AppError::Config(format!("{:#}", e)))?;

    if let Some(database) = &cli.database {
        config.database.path = Some(database.clone());
    }

    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }

    config
        .validate()
        .map_err(|e| AppError::Config(format!("{:#}", e)))?;

    Ok(config)
}
