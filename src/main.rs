use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use codegen_client::api::CodegenService;
use codegen_client::commands::{render_artifact, render_statistics, render_status, run_repl};
use codegen_client::config::ClientConfig;
use codegen_client::logging::init_tracing;
use codegen_client::models::LanguageHint;
use codegen_client::workflows::Workflow;

#[derive(Parser, Debug)]
#[command(name = "codegen", version, about = "Generate code from a prompt, rate it, track statistics")]
struct Cli {
    /// Base URL of the generation service (overrides CODEGEN_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    /// Request timeout in seconds (overrides CODEGEN_TIMEOUT_SECS)
    #[arg(long, global = true, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive session (default)
    Repl,
    /// Generate once, print the code, optionally rate it
    Generate(GenerateArgs),
    /// Print usage statistics
    Stats,
    /// Check that the service is reachable
    Health,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// What the code should do
    #[arg(required = true, num_args = 1..)]
    prompt: Vec<String>,

    /// Target language tag, or "auto"
    #[arg(short, long, default_value = "auto")]
    language: LanguageHint,

    /// Rate the result (1-5) right after generating
    #[arg(long)]
    rating: Option<i64>,

    /// Comment sent with the rating
    #[arg(long, requires = "rating")]
    comments: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("failed to initialise logging: {}", e);
    }

    let mut config = match ClientConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            return ExitCode::from(2);
        }
    };
    if let Some(url) = cli.base_url {
        config.base_url = url;
    }
    if let Some(secs) = cli.timeout_secs {
        config.request_timeout = Duration::from_secs(secs.max(1));
    }
    if let Err(e) = config.validate() {
        eprintln!("configuration error: {}", e);
        return ExitCode::from(2);
    }
    tracing::debug!(base_url = %config.base_url, "using generation service");

    let workflow = match codegen_client::connect(config) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command.unwrap_or(Commands::Repl) {
        Commands::Repl => match run_repl(workflow).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("input error: {}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Generate(args) => generate_once(workflow, args).await,
        Commands::Stats => match workflow.settle_statistics().await {
            Some(snapshot) => {
                println!("{}", render_statistics(&snapshot));
                ExitCode::SUCCESS
            }
            None => {
                eprintln!("statistics unavailable");
                ExitCode::FAILURE
            }
        },
        Commands::Health => match workflow.service().health().await {
            Ok(h) => {
                println!("service status: {}", h.status);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("service unreachable: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn generate_once(workflow: Workflow, args: GenerateArgs) -> ExitCode {
    let prompt = args.prompt.join(" ");
    let result = workflow.generate(&prompt, args.language).await;
    report_status(&workflow);
    let Ok(result) = result else {
        return ExitCode::FAILURE;
    };
    println!("{}", render_artifact(&result));

    if let Some(rating) = args.rating {
        let outcome = workflow.rate(rating, args.comments.as_deref()).await;
        report_status(&workflow);
        if outcome.is_err() {
            return ExitCode::FAILURE;
        }
        if let Some(snapshot) = workflow.settle_statistics().await {
            eprintln!("{}", render_statistics(&snapshot));
        }
    }
    ExitCode::SUCCESS
}

fn report_status(workflow: &Workflow) {
    if let Some(line) = render_status(&workflow.status()) {
        eprintln!("{}", line);
    }
}
