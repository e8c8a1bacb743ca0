//! labgen CLI — batch generation and the refine pass.
//!
//! No business logic lives here: argument parsing, env/log setup, and the
//! per-lesson outcome table. Everything else is in the library crate.

use clap::{Parser, Subcommand, ValueEnum};
use labgen::generate::{self, GenerationConfig, JsPolicy, LessonStatus, Strategy};
use labgen::lesson;
use labgen::llm::{GeminiClient, GenerationParams};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "labgen",
    about = "Generate interactive HTML experiment pages from lesson metadata via Gemini"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate one page per lesson record.
    Generate {
        /// Lesson JSON file, or a directory of them.
        #[arg(long)]
        lessons: PathBuf,
        /// HTML template containing the {{...}} placeholder tokens.
        #[arg(long)]
        template: PathBuf,
        /// Prompt-constraints file (lines with '$' are filtered out).
        #[arg(long)]
        prompt: Option<PathBuf>,
        /// Output directory for the generated pages.
        #[arg(long, default_value = "generated_output")]
        output: PathBuf,
        /// Token budget per model call.
        #[arg(long, default_value_t = 8192)]
        max_tokens: u32,
        #[arg(long, value_enum, default_value_t = StrategyArg::Single)]
        strategy: StrategyArg,
        /// Write pages whose JS still fails validation after auto-repair.
        #[arg(long)]
        write_degraded: bool,
    },
    /// Send an already-generated page back to the model for improvement.
    Refine {
        #[arg(long)]
        input: PathBuf,
        /// Defaults to `<input>_refined.html`.
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = 8192)]
        max_tokens: u32,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// One call returning {"html","css","js"} JSON (default).
    Single,
    /// Historical multi-call flow: blueprint, HTML, CSS, JS logic, JS UI.
    Blueprint,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Single => Strategy::SingleCall,
            StrategyArg::Blueprint => Strategy::Blueprint,
        }
    }
}

fn load_env() {
    for env_file in [".env.local", ".env"] {
        let path = std::path::Path::new(env_file);
        if path.exists() {
            match dotenvy::from_path(path) {
                Ok(_) => log::debug!("[STARTUP] Loaded {}", path.display()),
                Err(e) => eprintln!("[STARTUP] Failed to load {}: {}", path.display(), e),
            }
            break;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    load_env();
    env_logger::init();
    let cli = Cli::parse();

    let client = match GeminiClient::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Generate {
            lessons,
            template,
            prompt,
            output,
            max_tokens,
            strategy,
            write_degraded,
        } => {
            let records = match lesson::load_lessons(&lessons) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("error: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            log::info!("[STARTUP] {} lessons loaded", records.len());

            let config = GenerationConfig {
                template_path: template,
                constraints_path: prompt,
                output_dir: output,
                params: GenerationParams::default().with_max_tokens(max_tokens),
                strategy: strategy.into(),
                js_policy: if write_degraded {
                    JsPolicy::WriteDegraded
                } else {
                    JsPolicy::Strict
                },
            };

            let outcomes = generate::run_batch(&client, &records, &config).await;
            print_outcomes(&outcomes);
            ExitCode::SUCCESS
        }
        Command::Refine {
            input,
            output,
            max_tokens,
        } => {
            let params = GenerationParams::default().with_max_tokens(max_tokens);
            match generate::refine::refine_file(&client, &input, output.as_deref(), &params).await
            {
                Ok(path) => {
                    println!("refined: {}", path.display());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn print_outcomes(outcomes: &[generate::LessonOutcome]) {
    let done = outcomes
        .iter()
        .filter(|o| matches!(o.status, LessonStatus::Done(_)))
        .count();
    let degraded = outcomes
        .iter()
        .filter(|o| matches!(o.status, LessonStatus::Degraded(_)))
        .count();
    let failed = outcomes.len() - done - degraded;

    println!();
    for outcome in outcomes {
        match &outcome.status {
            LessonStatus::Done(path) => {
                println!("  done      {} -> {}", outcome.lesson_title, path.display())
            }
            LessonStatus::Degraded(path) => {
                println!("  degraded  {} -> {}", outcome.lesson_title, path.display())
            }
            LessonStatus::Failed(reason) => {
                println!("  FAILED    {}: {}", outcome.lesson_title, reason)
            }
        }
    }
    println!(
        "\n{} done, {} degraded, {} failed ({} total)",
        done,
        degraded,
        failed,
        outcomes.len()
    );
}
