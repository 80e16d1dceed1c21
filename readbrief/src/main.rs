//! readbrief - select chapters of a split book and generate AI summaries

mod console;

use anyhow::{Context, Result};
use brief_api::{ChapterSource, GenerationMode, HttpBackend, Library};
use clap::{Parser, Subcommand};
use console::ConsoleObserver;
use readbrief::{
    ClickModifiers, GenerateController, GenerationOutcome, GenerationSession, ReadBriefConfig,
    ResumeOffer, SelectionModel, SystemClock,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "readbrief")]
#[command(about = "Select book chapters and generate AI summaries", long_about = None)]
#[command(version)]
struct Args {
    /// Enable debug output
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the books in the library
    Books,
    /// List the chapters of a book
    Chapters {
        /// Book id
        book: String,
    },
    /// Check that the book service is reachable
    Status,
    /// Select chapters and generate a summary
    Generate {
        /// Book id
        book: String,

        /// Click gesture on a chapter index: N, ctrl:N, shift:N or double:N
        #[arg(short, long = "select", value_name = "GESTURE", required = true)]
        select: Vec<String>,

        /// Generation mode (summarization, characters)
        #[arg(short, long)]
        mode: Option<String>,

        /// Ignore an interrupted generation instead of offering to resume it
        #[arg(long)]
        no_resume: bool,
    },
    /// Resume or discard an interrupted generation
    Recover {
        /// Resume without asking
        #[arg(long, conflicts_with = "no")]
        yes: bool,
        /// Discard without asking
        #[arg(long)]
        no: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set the book service base URL
    SetApiUrl {
        /// URL including the /api prefix
        url: String,
    },
    /// Set the checkpoint interval while generating
    SetTick {
        /// Milliseconds between checkpoints
        ms: u64,
    },
    /// Set the default generation mode
    SetMode {
        /// summarization or characters
        mode: String,
    },
}

/// A click as typed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gesture {
    Plain(usize),
    Ctrl(usize),
    Shift(usize),
    Double(usize),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match &args.command {
        Commands::Config { action } => handle_config_command(action),
        Commands::Books => list_books().await,
        Commands::Chapters { book } => list_chapters(book).await,
        Commands::Status => check_status().await,
        Commands::Generate {
            book,
            select,
            mode,
            no_resume,
        } => generate(book, select, mode.as_deref(), *no_resume).await,
        Commands::Recover { yes, no } => recover(*yes, *no).await,
    }
}

fn connect() -> Result<Arc<HttpBackend>> {
    let api_config = brief_api::Config::load().context("Failed to load API configuration")?;
    let backend = HttpBackend::new(&api_config).context("Failed to create API client")?;
    Ok(Arc::new(backend))
}

fn build_controller(config: &ReadBriefConfig) -> Result<GenerateController> {
    let backend = connect()?;
    let store = config.state_store()?;
    let clock = Arc::new(SystemClock);
    let session = GenerationSession::new(Box::new(store), Box::new(clock.clone()))
        .with_stale_after_ms(config.stale_after_ms());

    Ok(GenerateController::new(
        backend.clone(),
        backend,
        session,
        Arc::new(ConsoleObserver::new()),
        clock,
    )
    .with_selection(SelectionModel::with_double_click_window(
        config.double_click_window_ms(),
    ))
    .with_tick_interval(config.tick_interval()))
}

async fn list_books() -> Result<()> {
    let backend = connect()?;
    let books = backend.list_books().await?;
    if books.is_empty() {
        eprintln!("No books in the library");
    }
    for book in books {
        println!("{}\t{}", book.id, book.display_name);
    }
    Ok(())
}

async fn list_chapters(book: &str) -> Result<()> {
    let backend = connect()?;
    let chapters = backend.get_chapters(book).await?;
    if chapters.is_empty() {
        eprintln!("No chapters available");
    }
    for chapter in chapters {
        println!(
            "{:>3}  Cap {} - {}  [{}]",
            chapter.index, chapter.number, chapter.title, chapter.id
        );
    }
    Ok(())
}

async fn check_status() -> Result<()> {
    let backend = connect()?;
    let message = backend.health().await?;
    println!("Book service: {}", message);
    Ok(())
}

async fn generate(
    book: &str,
    gestures: &[String],
    mode: Option<&str>,
    no_resume: bool,
) -> Result<()> {
    let config = ReadBriefConfig::load().context("Failed to load configuration")?;
    let mode = match mode {
        Some(m) => GenerationMode::parse(m).with_context(|| format!("Unknown mode: {}", m))?,
        None => config.default_mode,
    };
    let gestures = gestures
        .iter()
        .map(|g| parse_gesture(g))
        .collect::<Result<Vec<_>>>()?;

    let mut controller = build_controller(&config)?;

    if !no_resume {
        if let Some(offer) = controller.recover_on_load() {
            if confirm("Resume it instead?")? {
                return run_resume(&mut controller, offer).await;
            }
            controller.dismiss(offer);
        }
    }

    let chapters = controller
        .select_book(book)
        .await
        .with_context(|| format!("Failed to load chapters for {}", book))?;
    if chapters.is_empty() {
        anyhow::bail!("No chapters found for {}", book);
    }

    // Spread gestures apart so only explicit double-clicks register as such
    let spacing = config.double_click_window_ms() + 1;
    let mut now = 0;
    for gesture in gestures {
        now += spacing;
        match gesture {
            Gesture::Plain(i) => controller.click_at(i, ClickModifiers::plain(), now)?,
            Gesture::Ctrl(i) => controller.click_at(i, ClickModifiers::ctrl(), now)?,
            Gesture::Shift(i) => controller.click_at(i, ClickModifiers::shift(), now)?,
            Gesture::Double(i) => {
                controller.click_at(i, ClickModifiers::plain(), now)?;
                controller.click_at(i, ClickModifiers::plain(), now)?
            }
        };
    }

    let selected = controller.selection().selected_ordered(controller.chapters());
    eprintln!(
        "Selected: {}",
        selected
            .iter()
            .map(|c| format!("Cap {}", c.number))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let cancel = cancel_on_ctrl_c();
    let outcome = controller.generate(mode, cancel).await?;
    finish(outcome)
}

async fn recover(yes: bool, no: bool) -> Result<()> {
    let config = ReadBriefConfig::load().context("Failed to load configuration")?;
    let mut controller = build_controller(&config)?;

    let Some(offer) = controller.recover_on_load() else {
        eprintln!("No interrupted generation to recover");
        return Ok(());
    };

    let accept = if yes {
        true
    } else if no {
        false
    } else {
        confirm("Retry the generation?")?
    };

    if accept {
        run_resume(&mut controller, offer).await
    } else {
        controller.dismiss(offer);
        eprintln!("Interrupted generation discarded");
        Ok(())
    }
}

async fn run_resume(controller: &mut GenerateController, offer: ResumeOffer) -> Result<()> {
    let cancel = cancel_on_ctrl_c();
    let outcome = controller.resume(offer, cancel).await?;
    finish(outcome)
}

fn finish(outcome: GenerationOutcome) -> Result<()> {
    match outcome {
        GenerationOutcome::Completed(_) | GenerationOutcome::Cancelled => Ok(()),
        GenerationOutcome::Failed(message) => anyhow::bail!("Generation failed: {}", message),
        GenerationOutcome::Discarded => anyhow::bail!("Generation result was discarded"),
    }
}

/// Cancel the returned token when the user presses Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            child.cancel();
        }
    });
    token
}

fn confirm(question: &str) -> Result<bool> {
    eprint!("{} [y/N] ", question);
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Parse `N`, `ctrl:N`, `shift:N` or `double:N`.
fn parse_gesture(s: &str) -> Result<Gesture> {
    let (kind, index) = match s.split_once(':') {
        Some((kind, index)) => (kind.trim().to_lowercase(), index),
        None => (String::new(), s),
    };
    let index: usize = index
        .trim()
        .parse()
        .with_context(|| format!("Invalid chapter index in '{}'", s))?;

    match kind.as_str() {
        "" | "click" => Ok(Gesture::Plain(index)),
        "ctrl" | "cmd" | "meta" => Ok(Gesture::Ctrl(index)),
        "shift" => Ok(Gesture::Shift(index)),
        "double" | "dbl" => Ok(Gesture::Double(index)),
        other => anyhow::bail!("Unknown gesture '{}'. Use N, ctrl:N, shift:N or double:N", other),
    }
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = ReadBriefConfig::load()?;
            let api_config = brief_api::Config::load()?;
            println!("Configuration file: {:?}", ReadBriefConfig::config_path()?);
            println!();
            println!("tick_interval_ms = {}", config.tick_interval_ms);
            println!("stale_after_secs = {}", config.stale_after_secs);
            println!("double_click_ms = {}", config.double_click_ms);
            println!("default_mode = {}", config.default_mode);
            match &config.state_dir {
                Some(dir) => println!("state_dir = \"{}\"", dir.display()),
                None => println!("state_dir = (platform data dir)"),
            }
            println!();
            println!("API configuration file: {:?}", brief_api::Config::config_path()?);
            println!("base_url = \"{}\"", api_config.effective_base_url());
            println!("timeout_secs = {}", api_config.timeout_secs);
        }
        ConfigAction::SetApiUrl { url } => {
            let mut api_config = brief_api::Config::load()?;
            api_config.base_url = url.trim_end_matches('/').to_string();
            api_config.save()?;
            println!("Book service URL set to: {}", api_config.base_url);
        }
        ConfigAction::SetTick { ms } => {
            let mut config = ReadBriefConfig::load()?;
            config.tick_interval_ms = (*ms).max(100);
            config.save()?;
            println!("Checkpoint interval set to: {}ms", config.tick_interval_ms);
        }
        ConfigAction::SetMode { mode } => {
            let mut config = ReadBriefConfig::load()?;
            config.default_mode = GenerationMode::parse(mode)
                .with_context(|| format!("Unknown mode: {}", mode))?;
            config.save()?;
            println!("Default mode set to: {}", config.default_mode);
        }
    }
    Ok(())
}
