use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cloudplan::config::Settings;
use cloudplan::plan::{self, DeploymentPlan, RuleTable, SchemaValidator, RULES_PATH, SCHEMA_PATH};
use cloudplan::tofu::{self, Tofu};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Overrides `--log-level` with per-target directives
const LOG_ENV: &str = "CLOUDPLAN_LOG";

/// Compile deployment configs into OpenTofu plans and apply them
#[derive(Parser, Debug)]
#[command(name = "cloudplan", version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Project root holding parser/ and opentofu/
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// OpenTofu binary to invoke
    #[arg(long, global = true)]
    tofu: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build and print the deployment plan
    Plan {
        config: PathBuf,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a deployment config
    Validate { config: PathBuf },
    /// List providers and service types with generator rules
    Rules,
    /// Build the plan, then init and apply every resource
    Deploy {
        config: PathBuf,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Destroy every resource of a deployment directory
    Destroy { deployment_dir: PathBuf },
    /// Show outputs of every resource of a deployment directory
    Output { deployment_dir: PathBuf },
    /// Check AWS, Azure and GCP credentials
    VerifyCreds,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

/// Directives from `env` when they parse, otherwise the plain level
fn log_filter(level: Level, env: Option<&str>) -> EnvFilter {
    env.and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level.as_str().to_lowercase()))
}

fn setup_logging(
    level: LogLevel,
    log_file: Option<&Path>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let (non_blocking, guard) = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let env = std::env::var(LOG_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(tracing_level, env.as_deref()))
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(log_file.is_some())
        .with_line_number(log_file.is_some())
        .init();

    tracing::info!("cloudplan started with log level: {:?}", level);

    Ok(Some(guard))
}

fn main() {
    let args = Args::parse();

    let _log_guard = match setup_logging(args.log_level, args.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(args) {
        eprintln!("❌ {err:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    // Credentials for the provider plugins may live in .env
    let _ = dotenv::dotenv();

    let settings = Settings::load();
    let root = settings.effective_root(args.root.as_deref());
    let tofu = Tofu::new(&settings.effective_tofu_bin(args.tofu.as_deref()));
    tracing::debug!("Using root {:?}, tofu binary {}", root, tofu.bin());

    match args.command {
        Command::Plan { config, json } => {
            let plan = build(&config, &root)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                print_plan(&plan);
            }
        }
        Command::Validate { config } => {
            let validator = SchemaValidator::load(&root.join(SCHEMA_PATH))?;
            let bytes = std::fs::read(&config)
                .with_context(|| format!("error loading configuration {}", config.display()))?;
            validator
                .validate(&bytes)
                .map_err(|msg| anyhow::anyhow!("validation failed: {}", msg))?;
            println!("✓ Configuration validated successfully");
        }
        Command::Rules => {
            let rules = RuleTable::load(&root.join(RULES_PATH))?;
            for provider in rules.providers() {
                println!("{}:", provider);
                for service_type in rules.service_types(provider) {
                    let count = rules
                        .lookup(provider, service_type)
                        .map_or(0, |r| r.len());
                    println!("  {} ({} attributes)", service_type, count);
                }
            }
        }
        Command::Deploy { config, yes } => {
            require_modules_dir(&root)?;
            let plan = build(&config, &root)?;
            if !yes {
                let confirmed = tofu::confirm_deploy(
                    &plan,
                    &mut std::io::stdin().lock(),
                    &mut std::io::stdout(),
                )?;
                if !confirmed {
                    println!("Deployment cancelled.");
                    return Ok(());
                }
            }
            tofu::deploy(&plan, &root, &tofu).context("Deployment failed")?;
        }
        Command::Destroy { deployment_dir } => {
            tofu::destroy(&deployment_dir, &tofu).context("Destruction failed")?;
        }
        Command::Output { deployment_dir } => {
            tofu::show_outputs(&deployment_dir, &tofu).context("Output retrieval failed")?;
        }
        Command::VerifyCreds => {
            tofu::verify_creds(&tofu);
        }
    }

    Ok(())
}

fn build(config: &Path, root: &Path) -> Result<DeploymentPlan> {
    let rules = RuleTable::load(&root.join(RULES_PATH))?;
    let plan = plan::generate_plan(config, root, &rules).context("error generating plan")?;
    Ok(plan)
}

fn require_modules_dir(root: &Path) -> Result<()> {
    if !root.join("opentofu").is_dir() {
        return Err(anyhow::anyhow!(
            "'opentofu' directory not found in {}. Run from the project root or pass --root",
            root.display()
        ));
    }
    Ok(())
}

fn print_plan(plan: &DeploymentPlan) {
    println!("Provider:   {}", plan.provider);
    println!("Region:     {}", plan.region);
    println!("Output dir: {}", plan.output_dir.display());
    println!("Resources:  {}", plan.resources.len());

    for res in &plan.resources {
        println!("\n# {} ({} -> {})", res.id, res.resource_type, res.module_dir);
        if res.tfvars.is_empty() {
            println!("(no variables)");
        } else {
            print!("{}", res.tfvars);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_defaults_to_level() {
        assert_eq!(log_filter(Level::WARN, None).to_string(), "warn");
        assert_eq!(log_filter(Level::DEBUG, None).to_string(), "debug");
    }

    #[test]
    fn test_log_filter_prefers_env_directives() {
        let filter = log_filter(Level::WARN, Some("cloudplan=debug"));
        assert_eq!(filter.to_string(), "cloudplan=debug");
    }

    #[test]
    fn test_deploy_yes_flag() {
        let args = Args::try_parse_from(["cloudplan", "deploy", "config.json", "-y"]).unwrap();
        assert!(matches!(args.command, Command::Deploy { yes: true, .. }));

        let args = Args::try_parse_from(["cloudplan", "deploy", "config.json"]).unwrap();
        assert!(matches!(args.command, Command::Deploy { yes: false, .. }));
    }
}
