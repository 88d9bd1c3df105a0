use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use gradus_core::{rubric, GradusConfig, OutputFormat};
use gradus_eval::{EvaluationPipeline, Graded, LlmClient};
use gradus_ingest::{ingest, source, RepoRef, SourceStrategy};
use indicatif::{ProgressBar, ProgressStyle};
use miette::{Context, IntoDiagnostic, Result};

#[derive(Parser)]
#[command(
    name = "gradus",
    version,
    about = "AI project grader",
    long_about = "Gradus grades a software project against a scoring rubric using an LLM.\n\n\
                   Point it at a public GitHub repository or a zip archive; it discovers the\n\
                   relevant files, normalizes notebooks/PDFs/Office documents to text,\n\
                   summarizes large projects in batches, and produces a per-criterion report\n\
                   with a deterministically recomputed grade.\n\n\
                   Examples:\n  \
                     gradus grade https://github.com/student/ml-project\n  \
                     gradus grade submission.zip --rubric rubric.md\n  \
                     gradus grade https://github.com/o/p/tree/dev --github-token $GITHUB_TOKEN\n  \
                     gradus init                   Create a .gradus.toml config file\n  \
                     gradus rubric                 Print the built-in rubric"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .gradus.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format: text, json, or markdown
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Grade a project from a repository URL or a zip archive
    #[command(long_about = "Grade a project from a repository URL or a zip archive.\n\n\
        Without a GitHub token the listing goes through the anonymous jsDelivr\n\
        mirror, probing common branch names when the URL names no ref. With a\n\
        token (or GITHUB_TOKEN set) the GitHub API is used directly.\n\n\
        Examples:\n  gradus grade https://github.com/student/ml-project\n  \
        gradus grade submission.zip --rubric rubric.md --format markdown")]
    Grade {
        /// Repository URL (https://github.com/owner/project[/tree/ref/path]) or .zip path
        source: String,

        /// Rubric file (markdown with '## ' criterion headings); built-in rubric if omitted
        #[arg(long)]
        rubric: Option<PathBuf>,

        /// GitHub personal access token (default: GITHUB_TOKEN env var)
        #[arg(long)]
        github_token: Option<String>,

        /// Write the report to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Create a default .gradus.toml configuration file
    Init,
    /// Print the built-in default rubric
    Rubric,
}

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Gradus configuration
# All values are optional; the defaults shown here are what apply when a key
# is omitted.

[llm]
# model = "gpt-4o"
# api_key falls back to the OPENAI_API_KEY environment variable
# api_key = "sk-..."
# base_url = "http://localhost:11434"
# timeout_secs = 120

[ingest]
# fetch_concurrency = 8
# timeout_secs = 30
# Extra glob patterns to exclude from the listing
# ignore_patterns = ["docs/**", "data/*.json"]

[pipeline]
# Character budget per summarization batch
# batch_char_budget = 100000
# File-count cap above which LLM triage runs
# max_files = 500
# summary_concurrency = 4

[grading]
# Piecewise-linear mapping: (0 -> min_grade), (pass_score -> pass_grade),
# (100 -> max_grade), rounded to one decimal.
# pass_score = 60.0
# min_grade = 1.0
# pass_grade = 4.0
# max_grade = 7.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Grade {
            source,
            rubric,
            github_token,
            output,
        } => run_grade(config, cli.format, &source, rubric, github_token, output).await,
        Command::Init => run_init(),
        Command::Rubric => {
            println!("{}", rubric::DEFAULT_RUBRIC);
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "gradus=debug" } else { "gradus=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<GradusConfig> {
    let mut config = match path {
        Some(path) => GradusConfig::from_file(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to load config from {}", path.display()))?,
        None => {
            let default_path = Path::new(".gradus.toml");
            if default_path.exists() {
                GradusConfig::from_file(default_path)
                    .into_diagnostic()
                    .wrap_err("failed to load .gradus.toml")?
            } else {
                GradusConfig::default()
            }
        }
    };

    if config.llm.api_key.is_none() {
        config.llm.api_key = std::env::var("OPENAI_API_KEY").ok();
    }
    Ok(config)
}

async fn run_grade(
    config: GradusConfig,
    format: OutputFormat,
    source_arg: &str,
    rubric_path: Option<PathBuf>,
    github_token: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let rubric_text = match &rubric_path {
        Some(path) => std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read rubric from {}", path.display()))?,
        None => rubric::DEFAULT_RUBRIC.to_string(),
    };
    rubric::validate(&rubric_text).into_diagnostic().wrap_err(
        "each rubric criterion must be a markdown H2 heading, e.g. '## 1. Correctness (25%)'",
    )?;

    let strategy = build_strategy(source_arg, github_token)?;

    let fetch_spinner = spinner("Listing and fetching project files...");
    let project = ingest(strategy, &config.ingest).await.into_diagnostic()?;
    fetch_spinner.finish_with_message(format!(
        "Fetched {} files from '{}'",
        project.files.len(),
        project.name
    ));

    let llm = LlmClient::new(&config.llm).into_diagnostic()?;
    let pipeline = EvaluationPipeline::new(llm, config);

    let spinner = spinner("Evaluating with the LLM (this can take a while)...");
    let graded = pipeline.run(project, &rubric_text).await.into_diagnostic()?;
    spinner.finish_with_message(format!(
        "Evaluated '{}': overall {:.1}, grade {:.1}",
        graded.project_name, graded.result.overall_score, graded.result.final_grade
    ));

    let rendered = render(&graded, format)?;
    match output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to write report to {}", path.display()))?;
            eprintln!("Report written to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

/// Decide the source strategy once, up front: a readable `.zip` path is an
/// archive; anything else must parse as a repository URL, authenticated
/// when a token is available.
fn build_strategy(source_arg: &str, github_token: Option<String>) -> Result<SourceStrategy> {
    let path = Path::new(source_arg);
    if source_arg.ends_with(".zip") && path.is_file() {
        let bytes = std::fs::read(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read archive {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source_arg.to_string());
        return Ok(SourceStrategy::Archive {
            name: source::archive_project_name(&file_name),
            bytes,
        });
    }

    let repo = RepoRef::parse(source_arg).into_diagnostic()?;
    let token = github_token.or_else(|| std::env::var("GITHUB_TOKEN").ok());
    Ok(match token {
        Some(token) => SourceStrategy::Authenticated { repo, token },
        None => SourceStrategy::Anonymous { repo },
    })
}

fn render(graded: &Graded, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => graded.to_string(),
        OutputFormat::Json => serde_json::to_string_pretty(graded).into_diagnostic()?,
        OutputFormat::Markdown => graded.to_markdown(),
    })
}

fn run_init() -> Result<()> {
    let path = Path::new(".gradus.toml");
    if path.exists() {
        miette::bail!(".gradus.toml already exists; delete it first to regenerate");
    }
    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)
        .into_diagnostic()
        .wrap_err("failed to write .gradus.toml")?;
    println!("Created .gradus.toml");
    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(std::time::Duration::from_millis(120));
    bar
}
