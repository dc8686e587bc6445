use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tally_ci::client::{token_from_env, token_source, CiClient, RunFilter};
use tally_ci::models::{RepoSlug, RunMode};
use tally_core::{OutputFormat, TallyConfig, TallyError, CONFIG_FILE_NAME};

#[derive(Parser)]
#[command(
    name = "tally",
    version,
    about = "CI run inspection and quality-metric reports",
    long_about = "Tally answers the questions you ask right after a CI run.\n\n\
                   Inspect the latest (or latest failed) GitHub Actions run for a branch,\n\
                   summarize a coverage XML report, and read mutation-testing caches.\n\n\
                   Examples:\n  \
                     tally ci acme/app main                    Latest run on main\n  \
                     tally ci acme/app main --mode latest-failed  Latest failed run\n  \
                     tally coverage                           Summarize coverage.xml\n  \
                     tally mutation score                     Mutation score from .mutmut-cache\n  \
                     tally mutation survivors --limit 50      List surviving mutants\n  \
                     tally doctor                             Check setup and artifacts"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .tally.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text  Human-readable report (default)\n  \
                         json  Machine-readable JSON with camelCase keys"
    )]
    format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect the latest workflow run for a branch
    #[command(long_about = "Inspect the latest workflow run for a branch.\n\n\
        Lists GitHub Actions runs for the branch, picks the latest (or the latest\n\
        failed one among recent completed runs), and prints the run and its first\n\
        job with their URLs. Exits 1 when no matching run or job exists.\n\n\
        Set GITHUB_TOKEN (or GH_TOKEN) to raise the anonymous rate limit.\n\n\
        Examples:\n  tally ci acme/app main\n  TALLY_REPO=acme/app tally ci --mode latest-failed")]
    Ci {
        /// Repository slug (owner/name)
        #[arg(env = "TALLY_REPO")]
        repo: Option<String>,

        /// Branch to inspect
        #[arg(env = "TALLY_BRANCH")]
        branch: Option<String>,

        /// Which run to pick: latest or latest-failed
        #[arg(long, default_value = "latest")]
        mode: RunMode,

        /// Completed runs to scan for a failure (default: 5)
        #[arg(long)]
        window: Option<u32>,

        /// API base URL (default: https://api.github.com)
        #[arg(long)]
        api_base: Option<String>,
    },
    /// Summarize a coverage XML report
    #[command(long_about = "Summarize a Cobertura-style coverage XML report.\n\n\
        Prints line and branch coverage, line counts, and the packages with the\n\
        lowest line coverage. A missing report is not an error.\n\n\
        Examples:\n  tally coverage\n  tally coverage --path reports/coverage.xml --top 5")]
    Coverage {
        /// Coverage XML path (default: coverage.xml)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Number of lowest-covered packages to list (default: 10)
        #[arg(long)]
        top: Option<usize>,
    },
    /// Report on a mutation-testing cache
    Mutation {
        #[command(subcommand)]
        action: MutationCommand,
    },
    /// Create a default .tally.toml configuration file
    #[command(long_about = "Create a default .tally.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .tally.toml already exists.")]
    Init,
    /// Check configuration, token, and report artifacts
    Doctor,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum MutationCommand {
    /// Print total, killed, survived and the mutation score
    Score {
        /// Cache path (default: .mutmut-cache)
        #[arg(long)]
        cache: Option<PathBuf>,
    },
    /// List mutants that were not killed, by file and line
    Survivors {
        /// Cache path (default: .mutmut-cache)
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Maximum rows to print (default: 200)
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");
    let (bold, cyan, reset) = if use_color {
        ("\x1b[1m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    println!("{bold}tally{reset} v{version}: what happened in CI, and how good are the tests\n");
    println!("Commands:");
    println!("  {cyan}ci{reset}                   Latest (or latest failed) workflow run for a branch");
    println!("  {cyan}coverage{reset}             Coverage XML summary and lowest-covered packages");
    println!("  {cyan}mutation score{reset}       Mutation score from the mutation cache");
    println!("  {cyan}mutation survivors{reset}   Surviving mutants with source locations");
    println!("  {cyan}doctor{reset}               Check configuration and artifacts");
    println!("  {cyan}init{reset}                 Create default configuration\n");
    println!("Run 'tally <command> --help' for details.");
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

/// Guidance for an artifact that has not been produced yet.
fn report_missing(format: OutputFormat, what: &str, path: &Path, hint: &str) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "missing": what,
            "path": path.display().to_string(),
            "hint": hint,
        })),
        OutputFormat::Text => {
            println!("\u{26a0}\u{fe0f}  No {what} found at {}", path.display());
            println!("   {hint}");
            Ok(())
        }
    }
}

/// One-line report for an artifact that exists but cannot be read.
fn report_malformed(format: OutputFormat, what: &str, err: &TallyError) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "error": format!("failed to read {what}: {err}"),
        })),
        OutputFormat::Text => {
            println!("\u{274c} Error reading {what}: {err}");
            Ok(())
        }
    }
}

#[derive(serde::Serialize)]
struct CheckResult {
    name: &'static str,
    status: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl CheckResult {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "pass",
            detail: detail.into(),
            hint: None,
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            status: "fail",
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn info(name: &'static str, detail: impl Into<String>, hint: Option<&str>) -> Self {
        Self {
            name,
            status: "info",
            detail: detail.into(),
            hint: hint.map(str::to_string),
        }
    }

    fn symbol(&self, use_color: bool) -> &'static str {
        match (self.status, use_color) {
            ("pass", true) => "\x1b[32m\u{2713}\x1b[0m",
            ("pass", false) => "\u{2713}",
            ("fail", true) => "\x1b[31m\u{2717}\x1b[0m",
            ("fail", false) => "\u{2717}",
            (_, true) => "\x1b[33m~\x1b[0m",
            (_, false) => "~",
        }
    }
}

fn run_doctor(
    config: &TallyConfig,
    config_path: &Path,
    format: OutputFormat,
    use_color: bool,
) -> Result<()> {
    let mut checks: Vec<CheckResult> = Vec::new();

    // 1. Config file
    if config_path.exists() {
        checks.push(CheckResult::pass(
            "config_file",
            format!("{} found", config_path.display()),
        ));
    } else {
        checks.push(CheckResult::info(
            "config_file",
            format!("{} not found, using defaults", config_path.display()),
            Some("run 'tally init' to create one"),
        ));
    }

    // 2. CI repository
    let repo = std::env::var("TALLY_REPO")
        .ok()
        .or_else(|| config.ci.repo.clone());
    match repo.as_deref().map(RepoSlug::parse) {
        Some(Ok(slug)) => checks.push(CheckResult::pass("ci_repository", slug.to_string())),
        Some(Err(e)) => checks.push(CheckResult::fail(
            "ci_repository",
            e.to_string(),
            "use the owner/name form, e.g. acme/app",
        )),
        None => checks.push(CheckResult::info(
            "ci_repository",
            "not configured",
            Some("pass it to 'tally ci', set TALLY_REPO, or set [ci] repo"),
        )),
    }

    // 3. API token
    if let Some((var, _)) = token_source() {
        checks.push(CheckResult::pass("github_token", format!("{var} set")));
    } else {
        checks.push(CheckResult::info(
            "github_token",
            "not set, requests are anonymous",
            Some("export GITHUB_TOKEN=... to raise the API rate limit"),
        ));
    }

    // 4. Coverage report
    let coverage_path = &config.coverage.path;
    match tally_coverage::read_report(coverage_path) {
        Ok(report) => checks.push(CheckResult::pass(
            "coverage_report",
            format!(
                "{} ({:.2}% lines, {} packages)",
                coverage_path.display(),
                report.line_rate * 100.0,
                report.packages.len()
            ),
        )),
        Err(TallyError::FileNotFound(_)) => checks.push(CheckResult::info(
            "coverage_report",
            format!("{} not found", coverage_path.display()),
            Some("run your test suite with coverage XML output"),
        )),
        Err(e) => checks.push(CheckResult::fail(
            "coverage_report",
            e.to_string(),
            "regenerate the coverage XML",
        )),
    }

    // 5. Mutation cache
    let cache_path = &config.mutation.cache;
    match tally_mutation::MutationCache::open(cache_path).and_then(|c| {
        let score = c.score()?;
        Ok((c.shape(), score))
    }) {
        Ok((shape, score)) => checks.push(CheckResult::pass(
            "mutation_cache",
            format!(
                "{} ({shape} form, {} mutants)",
                cache_path.display(),
                score.total
            ),
        )),
        Err(TallyError::FileNotFound(_)) => checks.push(CheckResult::info(
            "mutation_cache",
            format!("{} not found", cache_path.display()),
            Some("run your mutation-testing tool first"),
        )),
        Err(e) => checks.push(CheckResult::fail(
            "mutation_cache",
            e.to_string(),
            "delete the cache and re-run mutation testing",
        )),
    }

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "checks": checks,
        }))?,
        OutputFormat::Text => {
            println!("tally v{} environment check\n", env!("CARGO_PKG_VERSION"));
            for check in &checks {
                let label = check.name.replace('_', " ");
                println!("  {} {label:<18} {}", check.symbol(use_color), check.detail);
                if let Some(hint) = &check.hint {
                    println!("    hint: {hint}");
                }
            }
            let passed = checks.iter().filter(|c| c.status == "pass").count();
            let failed = checks.iter().filter(|c| c.status == "fail").count();
            let info = checks.iter().filter(|c| c.status == "info").count();
            println!("\n{passed} checks passed, {failed} failed, {info} info");
        }
    }

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# tally configuration

[ci]
# repo = "owner/name"
# branch = "main"
# api_base = "https://api.github.com"
# failed_window = 5

[coverage]
# path = "coverage.xml"
# top = 10

[mutation]
# cache = ".mutmut-cache"
# limit = 200
"#;

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let config = if cli.config.is_some() || config_path.exists() {
        TallyConfig::from_file(&config_path)?
    } else {
        TallyConfig::default()
    };
    tracing::debug!(config = %config_path.display(), format = %cli.format, "starting");

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    match cli.command {
        None => print_welcome(use_color),
        Some(Command::Ci {
            ref repo,
            ref branch,
            mode,
            window,
            ref api_base,
        }) => {
            let Some(repo) = repo.clone().or_else(|| config.ci.repo.clone()) else {
                return Err(miette::miette!(
                    help = "Pass owner/name as the first argument, set TALLY_REPO, or set [ci] repo in .tally.toml",
                    "No repository given"
                ));
            };
            let Some(branch) = branch.clone().or_else(|| config.ci.branch.clone()) else {
                return Err(miette::miette!(
                    help = "Pass the branch as the second argument, set TALLY_BRANCH, or set [ci] branch in .tally.toml",
                    "No branch given"
                ));
            };
            let slug = RepoSlug::parse(&repo)?;
            let api_base = api_base.as_deref().unwrap_or(&config.ci.api_base);
            let client = CiClient::new(api_base, token_from_env())?;
            let filter = RunFilter {
                failed_window: window.unwrap_or(config.ci.failed_window),
                ..RunFilter::new(branch, mode)
            };

            let report = tally_ci::inspect::inspect(&client, &slug, &filter).await?;
            match cli.format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Text => print!("{report}"),
            }
            if report.exit_code() != 0 {
                std::process::exit(report.exit_code());
            }
        }
        Some(Command::Coverage { ref path, top }) => {
            let path = path.as_deref().unwrap_or(&config.coverage.path);
            let top = top.unwrap_or(config.coverage.top);
            match tally_coverage::read_report(path) {
                Ok(report) => {
                    let summary = tally_coverage::summarize(&report, top);
                    match cli.format {
                        OutputFormat::Json => print_json(&summary)?,
                        OutputFormat::Text => print!("{summary}"),
                    }
                }
                Err(TallyError::FileNotFound(p)) => report_missing(
                    cli.format,
                    "coverage report",
                    &p,
                    "Generate one first, e.g. pytest --cov --cov-report=xml",
                )?,
                Err(e) if e.is_malformed_input() => {
                    report_malformed(cli.format, "coverage report", &e)?
                }
                Err(e) => return Err(e.into()),
            }
        }
        Some(Command::Mutation { ref action }) => {
            let (cache, result) = match action {
                MutationCommand::Score { cache } => {
                    let cache = cache.as_deref().unwrap_or(&config.mutation.cache);
                    (
                        cache,
                        tally_mutation::score(cache).map(|s| match cli.format {
                            OutputFormat::Json => serde_json::to_string_pretty(&s),
                            OutputFormat::Text => Ok(s.to_string()),
                        }),
                    )
                }
                MutationCommand::Survivors { cache, limit } => {
                    let cache = cache.as_deref().unwrap_or(&config.mutation.cache);
                    let limit = limit.unwrap_or(config.mutation.limit);
                    (
                        cache,
                        tally_mutation::survivors(cache, limit).map(|l| match cli.format {
                            OutputFormat::Json => serde_json::to_string_pretty(&l),
                            OutputFormat::Text => Ok(l.to_string()),
                        }),
                    )
                }
            };
            match result {
                Ok(rendered) => print!("{}", ensure_newline(rendered.into_diagnostic()?)),
                Err(TallyError::FileNotFound(_)) => report_missing(
                    cli.format,
                    "mutation cache",
                    cache,
                    "Run mutation testing first, e.g. mutmut run",
                )?,
                Err(e) if e.is_malformed_input() => {
                    report_malformed(cli.format, "mutation cache", &e)?
                }
                Err(e) => return Err(e.into()),
            }
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE_NAME);
            if path.exists() {
                miette::bail!("{CONFIG_FILE_NAME} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE_NAME} with default configuration");
        }
        Some(Command::Doctor) => {
            run_doctor(&config, &config_path, cli.format, use_color)?;
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "tally", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn ensure_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
