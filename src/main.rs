//! Bible Chat - scripture chat client
#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use biblechat::app::{self, App, AsyncHandle};
use biblechat::models::{Message, Verse};
use biblechat::reference::{self, DEFAULT_CITATION_LENGTH};
use biblechat::{ApiClient, Config, Locale};

/// Width used when printing verse and answer text
const WRAP_WIDTH: usize = 72;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (RUST_LOG=debug for verbose output)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match parse_args()? {
        Command::Chat { question } => chat_cli(&question).await,
        Command::Verse { refresh } => verse_cli(refresh).await,
        Command::Passage { reference } => passage_cli(&reference).await,
        Command::Citations { text, locale } => {
            citations_cli(&text, locale);
            Ok(())
        }
        Command::Deeplink { reference, locale } => {
            println!("{}", reference::build_passage_deeplink(&reference, locale));
            Ok(())
        }
        Command::Status => status_cli(),
        Command::Verify => verify_cli().await,
        Command::Reset { all } => reset_cli(all),
        Command::Locale { locale } => locale_cli(locale),
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Version => {
            print_version();
            Ok(())
        }
    }
}

/// CLI commands
enum Command {
    Chat { question: String },
    Verse { refresh: bool },
    Passage { reference: String },
    Citations { text: String, locale: Locale },
    Deeplink { reference: String, locale: Locale },
    Status,
    Verify,
    Reset { all: bool },
    Locale { locale: Option<Locale> },
    Help,
    Version,
}

fn parse_locale_flag(args: &[String]) -> Result<Locale> {
    match args
        .iter()
        .position(|a| a == "--locale" || a == "-l")
        .and_then(|i| args.get(i + 1))
    {
        Some(code) => {
            Locale::from_str(code).ok_or_else(|| anyhow::anyhow!("Unknown locale: {code}"))
        }
        None => Ok(Locale::default()),
    }
}

/// Positional words after the command, without flags
fn positional(args: &[String]) -> String {
    let mut words = Vec::new();
    let mut i = 2;
    while i < args.len() {
        if args[i] == "--locale" || args[i] == "-l" {
            i += 2;
        } else {
            words.push(args[i].as_str());
            i += 1;
        }
    }
    words.join(" ")
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() == 1 {
        return Ok(Command::Help);
    }

    let required = |what: &str| -> Result<String> {
        let text = positional(&args);
        if text.trim().is_empty() {
            anyhow::bail!("Missing {what}");
        }
        Ok(text)
    };

    match args[1].as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help),
        "-v" | "--version" | "version" => Ok(Command::Version),

        "chat" | "ask" => Ok(Command::Chat {
            question: required("question")?,
        }),

        "verse" | "daily" => Ok(Command::Verse {
            refresh: args.iter().any(|a| a == "--refresh" || a == "-r"),
        }),

        "passage" | "read" => Ok(Command::Passage {
            reference: required("reference")?,
        }),

        "citations" => Ok(Command::Citations {
            text: required("text")?,
            locale: parse_locale_flag(&args)?,
        }),

        "deeplink" | "link" => Ok(Command::Deeplink {
            reference: required("reference")?,
            locale: parse_locale_flag(&args)?,
        }),

        "status" => Ok(Command::Status),
        "verify" => Ok(Command::Verify),
        "reset" => Ok(Command::Reset {
            all: args.iter().any(|a| a == "--all"),
        }),

        "locale" => {
            let locale = match args.get(2) {
                Some(code) => Some(
                    Locale::from_str(code)
                        .ok_or_else(|| anyhow::anyhow!("Unknown locale: {code}"))?,
                ),
                None => None,
            };
            Ok(Command::Locale { locale })
        }

        other => Err(anyhow::anyhow!(
            "Unknown command: {other}\nRun 'biblechat --help' for usage"
        )),
    }
}

fn print_help() {
    let config_path = Config::default_path()
        .map_or_else(|_| "Unknown".to_string(), |p| p.display().to_string());

    println!(
        r#"📖 Bible Chat - ask questions about scripture

USAGE:
    biblechat [COMMAND]

COMMANDS:
    chat <question>                    Ask the assistant
    verse [-r, --refresh]              Show today's verse (cached for 24h)
    passage <reference>                Show a passage, e.g. "John 3:16"
    citations <text> [-l <locale>]     List references found in text
    deeplink <reference> [-l <locale>] Print the passage deeplink
    status                             Show subscription status
    verify                             Check the subscription with the server
    reset [--all]                      Reset the subscription to free
                                       (--all wipes every saved setting)
    locale [en|ru]                     Show or change the content language

OPTIONS:
    -h, --help                         Show this help message
    -v, --version                      Show version information

ENVIRONMENT:
    RUST_LOG                           Log filter (default: warn)

CONFIG:
    {}
"#,
        config_path
    );
}

fn print_version() {
    println!("biblechat {}", biblechat::VERSION);
}

/// Open the app, start the worker and run the launch sync
async fn start() -> Result<(App, AsyncHandle)> {
    let config = Config::load()?;
    let client = ApiClient::from_config(&config)?;
    let mut app = app::open(config)?;
    let mut handle = app::spawn_worker(Arc::new(client));

    if let Some(cmd) = app.start_launch_sync() {
        app::run_command(&mut app, &mut handle, cmd).await?;
    }
    Ok((app, handle))
}

fn print_verse(verse: &Verse) {
    println!("{}", verse.reference);
    println!("{}", "─".repeat(WRAP_WIDTH.min(40)));
    println!("{}", textwrap::fill(&verse.text, WRAP_WIDTH));
}

fn print_answer(message: &Message) {
    println!("{}", textwrap::fill(&message.content, WRAP_WIDTH));
    if message.citations.is_empty() {
        return;
    }
    println!();
    for citation in &message.citations {
        println!(
            "  📖 {}",
            reference::truncate_citation(&citation.reference, DEFAULT_CITATION_LENGTH)
        );
    }
}

fn print_status(app: &App) {
    if let Some(message) = &app.status_message {
        eprintln!("{}", message);
    }
}

async fn chat_cli(question: &str) -> Result<()> {
    let (mut app, mut handle) = start().await?;

    let Some(cmd) = app.ask(question) else {
        handle.shutdown().await;
        print_status(&app);
        return Ok(());
    };
    app::run_command(&mut app, &mut handle, cmd).await?;
    handle.shutdown().await;

    if let Some(message) = app.chat.last().filter(|m| !m.is_user()) {
        print_answer(message);
    }
    print_status(&app);
    Ok(())
}

async fn verse_cli(refresh: bool) -> Result<()> {
    let (mut app, mut handle) = start().await?;

    let cmd = if refresh {
        Some(app.refresh_daily_verse())
    } else {
        app.load_daily_verse()
    };
    if let Some(cmd) = cmd {
        app::run_command(&mut app, &mut handle, cmd).await?;
    }
    handle.shutdown().await;

    match &app.daily_verse {
        Some(verse) => print_verse(verse),
        None => print_status(&app),
    }
    Ok(())
}

async fn passage_cli(reference: &str) -> Result<()> {
    let (mut app, mut handle) = start().await?;

    let normalized = reference::normalize_ref(reference, app.locale());
    let cmd = app.open_passage(&normalized);
    app::run_command(&mut app, &mut handle, cmd).await?;
    handle.shutdown().await;

    match &app.passage {
        Some(verse) => {
            print_verse(verse);
            println!("\n💬 {}", reference::ask_prompt(&verse.reference, app.locale()));
        }
        None => print_status(&app),
    }
    Ok(())
}

fn citations_cli(text: &str, locale: Locale) {
    let refs = reference::parse_citations(text, locale);
    if refs.is_empty() {
        println!("No references found.");
        return;
    }
    for found in refs {
        println!(
            "{:<26} {}",
            reference::truncate_citation(&found, DEFAULT_CITATION_LENGTH),
            reference::build_passage_deeplink(&found, locale)
        );
    }
}

fn status_cli() -> Result<()> {
    let app = app::open(Config::load()?)?;
    let state = app.store.state();
    let subscription = &state.subscription;

    println!("Subscription:   {}", subscription.status);
    println!("Needs check:    {}", subscription.needs_server_validation);
    if let Some(ends) = subscription.trial_ends_at {
        println!("Trial ends:     {}", ends.format("%Y-%m-%d %H:%M UTC"));
    }
    if let Some(tx) = &subscription.original_transaction_id {
        println!("Transaction:    {}", tx);
    }
    println!(
        "Language:       {} ({})",
        state.locale,
        state.locale.translation_name()
    );
    println!(
        "Free answers:   {}/{}",
        state.answers_count, app.config.free_answer_limit
    );
    Ok(())
}

async fn verify_cli() -> Result<()> {
    let (mut app, mut handle) = start().await?;

    // The launch sync in start() may already have checked
    if !app.store.launch_sync_started() {
        let Some(cmd) = app.verify() else {
            handle.shutdown().await;
            println!("No purchase to verify.");
            return Ok(());
        };
        app::run_command(&mut app, &mut handle, cmd).await?;
    }
    handle.shutdown().await;

    println!("Subscription: {}", app.store.subscription().status);
    Ok(())
}

fn reset_cli(all: bool) -> Result<()> {
    let mut app = app::open(Config::load()?)?;
    if all {
        app.store.clear();
        println!("All saved state removed");
        return Ok(());
    }
    app.store.reset_subscription();
    println!("Subscription reset to {}", app.store.subscription().status);
    Ok(())
}

fn locale_cli(locale: Option<Locale>) -> Result<()> {
    let mut app = app::open(Config::load()?)?;
    if let Some(locale) = locale {
        // The new translation's verse is fetched on the next `verse`
        let _ = app.set_locale(locale);
    }
    let current = app.locale();
    println!(
        "{} ({}, {})",
        current,
        app.store.translation(),
        current.translation_name()
    );
    Ok(())
}
