//! Transaction Forecast CLI
//!
//! Trains an LSTM on historical bank transactions and forecasts future amounts.

use clap::{Parser, Subcommand};
use std::io::Write;
use txcast::predict::forecaster::Perturbation;
use txcast::{Config, Result};

#[derive(Parser)]
#[command(name = "txcast")]
#[command(about = "Bank transaction forecasting using deep learning", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train on a transaction history and forecast future amounts
    Forecast {
        /// Input CSV (overrides data.input_path)
        #[arg(long)]
        input: Option<String>,
        /// Override number of epochs
        #[arg(long)]
        epochs: Option<usize>,
        /// Override number of forecast steps
        #[arg(long)]
        horizon: Option<usize>,
        /// Override number of averaged generation passes
        #[arg(long)]
        repeats: Option<usize>,
        /// Override window length
        #[arg(long)]
        window: Option<usize>,
        /// Feed predictions back without noise
        #[arg(long)]
        no_perturbation: bool,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
        /// Username; the password is read from TXCAST_PASSWORD
        #[arg(long)]
        user: Option<String>,
    },
    /// Print the bcrypt hash to store as auth.password_bcrypt
    HashPassword {
        password: String,
        /// bcrypt work factor
        #[arg(long, default_value_t = bcrypt::DEFAULT_COST)]
        cost: u32,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Forecast {
            input,
            epochs,
            horizon,
            repeats,
            window,
            no_perturbation,
            format,
            user,
        } => {
            let overrides = commands::Overrides {
                input,
                epochs,
                horizon,
                repeats,
                window,
                no_perturbation,
            };
            commands::forecast(config, overrides, user, format)
        }
        Commands::HashPassword { password, cost } => commands::hash_password(&password, cost),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use serde::Serialize;
    use txcast::auth::{Authenticator, BcryptAuthenticator};
    use txcast::data::loader::load_transactions;
    use txcast::predict::pipeline::{ForecastPipeline, ForecastReport};
    use txcast::training::progress::{EpochProgress, ProgressObserver};
    use txcast::ForecastError;

    const PASSWORD_ENV: &str = "TXCAST_PASSWORD";

    /// Command-line values that replace config entries
    pub struct Overrides {
        pub input: Option<String>,
        pub epochs: Option<usize>,
        pub horizon: Option<usize>,
        pub repeats: Option<usize>,
        pub window: Option<usize>,
        pub no_perturbation: bool,
    }

    impl Overrides {
        fn apply(self, config: &mut Config) {
            if let Some(input) = self.input {
                config.data.input_path = input;
            }
            if let Some(epochs) = self.epochs {
                config.training.epochs = epochs;
            }
            if let Some(horizon) = self.horizon {
                config.forecast.horizon = horizon;
            }
            if let Some(repeats) = self.repeats {
                config.forecast.repeats = repeats;
            }
            if let Some(window) = self.window {
                config.model.window_size = window;
            }
            if self.no_perturbation {
                config.forecast.perturbation = Perturbation::None;
            }
        }
    }

    /// Progress bar on stderr, one redraw per epoch
    struct ConsoleProgress {
        width: usize,
    }

    impl ProgressObserver for ConsoleProgress {
        fn on_epoch_end(&mut self, progress: &EpochProgress) {
            let filled = (progress.fraction() * self.width as f64).round() as usize;
            let bar = format!("{}{}", "#".repeat(filled), "-".repeat(self.width - filled));
            let mut stderr = std::io::stderr();
            let _ = write!(stderr, "\r[{}] {:>3.0}% {}", bar, progress.fraction() * 100.0, progress);
            if progress.epoch == progress.total_epochs {
                let _ = writeln!(stderr);
            }
            let _ = stderr.flush();
        }

        fn on_early_stop(&mut self, epoch: usize, best_epoch: usize) {
            eprintln!(
                "\nEarly stopping triggered at epoch {} (restored epoch {})",
                epoch, best_epoch
            );
        }
    }

    fn authenticate(config: &Config, user: Option<String>) -> Result<()> {
        let Some(authenticator) = BcryptAuthenticator::from_config(&config.auth) else {
            log::warn!("No credentials configured, skipping authentication");
            return Ok(());
        };

        let user = user.ok_or_else(|| {
            ForecastError::Authentication("--user is required when credentials are configured".into())
        })?;
        let password = std::env::var(PASSWORD_ENV).map_err(|_| {
            ForecastError::Authentication(format!("{} is not set", PASSWORD_ENV))
        })?;

        authenticator.authenticate(&user, &password)
    }

    pub fn forecast(
        mut config: Config,
        overrides: Overrides,
        user: Option<String>,
        format: OutputFormat,
    ) -> Result<()> {
        use burn::backend::{Autodiff, NdArray};

        type MyBackend = Autodiff<NdArray<f32>>;

        authenticate(&config, user)?;

        overrides.apply(&mut config);
        config.validate()?;

        let records = load_transactions(&config.data.input_path)?;

        let device = Default::default();
        let pipeline = ForecastPipeline::<MyBackend>::new(config, device);
        let mut progress = ConsoleProgress { width: 30 };
        let report = pipeline.run(&records, &mut progress)?;

        match format {
            OutputFormat::Table => print_table(&report),
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&report)
                    .map_err(|e| ForecastError::Config(format!("Failed to serialize report: {}", e)))?;
                println!("{}", json);
            }
            OutputFormat::Csv => write_csv(&report)?,
        }

        Ok(())
    }

    #[derive(Serialize)]
    struct SeriesRow {
        index: usize,
        kind: &'static str,
        amount: f64,
    }

    fn series_rows(report: &ForecastReport) -> impl Iterator<Item = SeriesRow> + '_ {
        report.combined.iter().enumerate().map(|(index, &amount)| SeriesRow {
            index,
            kind: if index <= report.boundary_index { "past" } else { "forecast" },
            amount,
        })
    }

    fn write_csv(report: &ForecastReport) -> Result<()> {
        let mut writer = csv::Writer::from_writer(std::io::stdout());
        for row in series_rows(report) {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn print_table(report: &ForecastReport) {
        println!("\nForecast ({} steps, {} pass(es) averaged)", report.forecast.len(), report.passes);
        println!("{}", "=".repeat(32));
        println!("{:>6}  {:>14}", "Step", "Amount");
        println!("{}", "-".repeat(32));
        for (i, amount) in report.forecast.iter().enumerate() {
            println!("{:>6}  {:>14.2}", i + 1, amount);
        }
        println!("{}", "-".repeat(32));
        println!(
            "Prediction start after past index {} ({} past values)",
            report.boundary_index,
            report.past.len()
        );
        println!(
            "Training: {} epochs, best epoch {} (loss {:.6}){}",
            report.training.epochs_run,
            report.training.best_epoch,
            report.training.best_loss,
            report
                .training
                .stopped_early_at
                .map(|e| format!(", stopped early at {}", e))
                .unwrap_or_default()
        );
        println!(
            "\nThe trend of future transactions is: {} (slope {:.4}, r {:.3})",
            report.trend.trend, report.trend.slope, report.trend.r_value
        );
    }

    pub fn hash_password(password: &str, cost: u32) -> Result<()> {
        println!("{}", BcryptAuthenticator::hash(password, cost)?);
        Ok(())
    }

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'txcast hash-password <PASSWORD>' and set auth.password_bcrypt");
        println!("  3. Run 'txcast forecast --input transactions.csv' to forecast");

        Ok(())
    }
}
