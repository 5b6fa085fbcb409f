// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use docuverse::api::{ApiClient, ApiError};
use docuverse::app::{App, AppError, NO_DOCUMENTS};
use docuverse::cli::{is_slash_command, parse_command, show_help, InteractiveInput, LineReader, SimpleInput};
use docuverse::config::{self, Config};
use docuverse::error::{format_error, format_simple_error, ErrorBuilder};
use docuverse::render::{escape_html, render, render_terminal, strip_terminal_controls};
use docuverse::storage::{FileStore, KeyValueStore};
use docuverse::types::{ChatMessage, DocumentRef, Role};
use docuverse::utils::truncate_line;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit codes following sysexits.h conventions
mod exit_codes {
    /// Success - operation completed successfully
    pub const SUCCESS: i32 = 0;
    /// General error - unspecified error
    pub const ERROR: i32 = 1;
    /// Usage error - rejected input
    pub const USAGE: i32 = 64;
    /// Service unavailable - the DocuVerse service could not be reached
    pub const SERVICE_UNAVAILABLE: i32 = 69;
    /// Permission denied - not logged in or session rejected
    pub const NO_PERMISSION: i32 = 77;
}

use exit_codes::*;

/// Spinner helpers for consistent progress indicators
mod spinner {
    use colored::Colorize;
    use indicatif::{ProgressBar, ProgressStyle};
    use std::time::Duration;

    /// Create a spinner; hidden in quiet mode.
    pub fn create(message: &str, quiet: bool) -> ProgressBar {
        if quiet {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .tick_chars("\u{28FB}\u{28F9}\u{28FC}\u{28F8}\u{28FE}\u{28F6}\u{28F7}\u{28E7}\u{28CF}\u{28DF} ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner
    }

    /// Finish spinner with success message
    pub fn finish_success(spinner: &ProgressBar, message: &str) {
        spinner.finish_and_clear();
        println!("{} {}", "[✓]".green(), message);
    }

    /// Clear spinner silently
    pub fn clear(spinner: &ProgressBar) {
        spinner.finish_and_clear();
    }
}

#[derive(Parser)]
#[command(name = "docuverse")]
#[command(version = VERSION)]
#[command(about = "Ask questions about your documents from the terminal.")]
#[command(long_about = "DocuVerse - document Q&A and summaries\n\n\
    Create an account:   docuverse signup <username>\n\
    Upload a document:   docuverse upload report.pdf\n\
    Ask a question:      docuverse ask \"What are the key findings?\"\n\
    Interactive chat:    docuverse chat\n\
    Summarize:           docuverse summarize --doc <id>")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Emit answers as HTML fragments instead of terminal text
    #[arg(long, global = true)]
    html: bool,

    /// Service base URL (overrides config and DOCUVERSE_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    /// Quiet mode: no spinners or banners
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Verbose mode: debug logging on stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and log in
    Signup {
        username: String,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Log in to an existing account
    Login {
        username: String,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the saved session and chat history
    Logout,

    /// Show who is logged in
    #[command(alias = "status")]
    Whoami,

    /// Upload a .pdf or .txt document
    ///
    /// Examples:
    ///   docuverse upload annual-report.pdf
    Upload { file: PathBuf },

    /// Ask a single question about your documents
    ///
    /// Examples:
    ///   docuverse ask "What is the refund policy?"
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Start an interactive chat session
    Chat,

    /// List uploaded documents
    Docs,

    /// Summarize a document (the first one when --doc is omitted)
    Summarize {
        #[arg(long, value_name = "ID")]
        doc: Option<String>,
    },

    /// Show the saved conversation
    History,

    /// Render markup from a file or stdin
    Render { file: Option<PathBuf> },

    /// View or change configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set the service base URL
    SetUrl { url: String },
    /// Set the request timeout in seconds (0 disables it)
    SetTimeout { seconds: u64 },
    /// Restore the default configuration
    Reset,
}

/// How results are printed.
#[derive(Debug, Clone, Copy)]
struct Output {
    html: bool,
    quiet: bool,
}

impl Output {
    fn markup(&self, text: &str) -> String {
        if self.html {
            render(text)
        } else {
            render_terminal(text)
        }
    }

    fn print_message(&self, message: &ChatMessage) {
        match message.role {
            Role::User => {
                let content = if self.html {
                    escape_html(&message.content)
                } else {
                    message.content.clone()
                };
                println!("{} {}", "you>".green().bold(), content);
            }
            Role::Bot | Role::System => {
                println!("{}", "docuverse>".cyan().bold());
                println!("{}", self.markup(&message.content));
            }
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        let default = if quiet { "error" } else { "warn" };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to install log subscriber: {e}");
    }
}

/// Load config from the home directory with env and flag overrides.
fn load_config(home: &Path, api_url: Option<&str>) -> Result<Config> {
    let mut config = Config::load_from(home)?.with_env_overrides();
    if let Some(url) = api_url {
        if !config::validate_api_url(url) {
            return Err(AppError::Validation(format!(
                "Invalid service URL '{}': expected http:// or https://",
                url
            ))
            .into());
        }
        config.api_base_url = url.trim().to_string();
    }
    Ok(config)
}

fn open_app(config: &Config, home: &Path) -> Result<App> {
    let data_dir = config.data_dir(home);
    let store: Arc<dyn KeyValueStore> = Arc::new(
        FileStore::open(&data_dir)
            .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?,
    );
    let api = ApiClient::new(config.api_base_url.clone(), config.request_timeout())?;
    Ok(App::new(store, api)?)
}

/// Print a user-facing error and pick the exit code for it.
fn report_error(err: &anyhow::Error) -> i32 {
    let Some(app_err) = err.downcast_ref::<AppError>() else {
        eprintln!("{}", format_simple_error(&format!("{:#}", err)));
        return ERROR;
    };

    let (text, code) = match app_err {
        AppError::NotAuthenticated => (
            format_error(
                "Not logged in",
                &["No session is saved on this machine", "You logged out earlier"],
                &["Log in: docuverse login <username>", "Create an account: docuverse signup <username>"],
            ),
            NO_PERMISSION,
        ),
        AppError::Validation(message) => (format_simple_error(message), USAGE),
        AppError::Remote { message, source } if source.is_unauthorized() => (
            ErrorBuilder::new(format!("Error: {}", message))
                .cause("The session expired or was revoked")
                .fix("Log in again: docuverse login <username>")
                .build(),
            NO_PERMISSION,
        ),
        AppError::Remote {
            message,
            source: ApiError::Network(_),
        } => (
            ErrorBuilder::new("Could not reach the DocuVerse service")
                .cause(message.clone())
                .cause("The service may still be starting up")
                .fix("Check the service URL: docuverse config show")
                .fix("Retry in a minute")
                .build(),
            SERVICE_UNAVAILABLE,
        ),
        AppError::Remote { message, .. } => (format_simple_error(&format!("Error: {}", message)), ERROR),
        AppError::Store(e) => (
            ErrorBuilder::new("Could not access local data")
                .cause(e.to_string())
                .fix("Check permissions on the docuverse home directory")
                .fix(format!("Point {} at a writable directory", config::HOME_ENV))
                .build(),
            ERROR,
        ),
    };

    eprintln!("{}", text);
    code
}

fn prompt_password(confirm: bool) -> Result<String> {
    let prompt = inquire::Password::new("Password:").with_display_toggle_enabled();
    let prompt = if confirm {
        prompt.with_custom_confirmation_message("Confirm password:")
    } else {
        prompt.without_confirmation()
    };
    prompt.prompt().context("Failed to read password")
}

fn print_documents(documents: &[DocumentRef]) {
    if documents.is_empty() {
        println!("{}", NO_DOCUMENTS.dimmed());
        return;
    }
    for doc in documents {
        println!(
            "  {:>6}  {}",
            strip_terminal_controls(&doc.id).cyan(),
            strip_terminal_controls(&doc.filename)
        );
    }
}

async fn handle_authenticate(
    app: &mut App,
    username: &str,
    password: Option<String>,
    signup: bool,
    output: Output,
) -> Result<i32> {
    let password = match password {
        Some(password) => password,
        None => prompt_password(signup)?,
    };

    let message = if signup { "Creating account..." } else { "Logging in..." };
    let spinner = spinner::create(message, output.quiet);
    let result = app.authenticate(username, &password, signup).await;
    spinner::clear(&spinner);

    let session = result?;
    println!(
        "{} Logged in as {}",
        "[✓]".green(),
        session.display_name().bold()
    );
    Ok(SUCCESS)
}

async fn handle_upload(app: &App, file: &Path, output: Output) -> Result<i32> {
    let spinner = spinner::create(&format!("Uploading {}...", file.display()), output.quiet);
    match app.upload(Some(file)).await {
        Ok((_, message)) => {
            spinner::finish_success(&spinner, &message);
            Ok(SUCCESS)
        }
        Err(e) => {
            spinner::clear(&spinner);
            Err(e.into())
        }
    }
}

/// Ask and print the reply. Returns false when the request failed.
async fn handle_ask(app: &mut App, question: &str, output: Output) -> Result<bool> {
    let spinner = spinner::create("Thinking...", output.quiet);
    let result = app.ask(question).await;
    spinner::clear(&spinner);

    match result? {
        Some(reply) => {
            output.print_message(reply.message);
            Ok(!reply.failed())
        }
        None => Ok(true),
    }
}

async fn handle_documents(app: &App, output: Output) -> Result<Vec<DocumentRef>> {
    let spinner = spinner::create("Loading documents...", output.quiet);
    let result = app.documents().await;
    spinner::clear(&spinner);

    let documents = result?;
    print_documents(&documents);
    Ok(documents)
}

async fn handle_summarize(app: &App, doc: Option<&str>, output: Output) -> Result<i32> {
    let spinner = spinner::create("Generating summary...", output.quiet);
    let result = app.summarize(doc).await;
    spinner::clear(&spinner);

    let summary = result?;
    if !output.quiet {
        println!("{}", format!("Summary of document {}", summary.document_id).bold());
    }
    println!("{}", output.markup(&summary.text));
    Ok(SUCCESS)
}

fn print_history(app: &App, output: Output) {
    for message in app.history().messages() {
        output.print_message(message);
    }
}

async fn interactive_chat(app: &mut App, input: &mut dyn LineReader, output: Output) -> Result<i32> {
    if !app.session().is_authenticated() {
        return Err(AppError::NotAuthenticated.into());
    }

    if !output.quiet {
        println!(
            "Chatting as {}. Type {} for commands.\n",
            app.session().display_name().bold(),
            "/help".cyan()
        );
    }
    if let Some(last) = app.history().last() {
        output.print_message(last);
    }

    // Completion for /summarize; a failed listing just leaves it empty.
    if let Ok(documents) = app.documents().await {
        input.set_documents(documents);
    }

    while let Some(line) = input.read_line("you> ")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let outcome = match parse_command(line) {
            Some(("/exit", _)) => break,
            Some(("/help", _)) => {
                show_help();
                Ok(())
            }
            Some(("/history", _)) => {
                print_history(app, output);
                Ok(())
            }
            Some(("/clear", _)) => app.clear_history().map_err(anyhow::Error::from).map(|_| {
                println!("{} Conversation cleared", "[✓]".green());
            }),
            Some(("/docs", _)) => handle_documents(app, output)
                .await
                .map(|documents| input.set_documents(documents)),
            Some(("/summarize", args)) => handle_summarize(app, args.first().copied(), output)
                .await
                .map(|_| ()),
            Some(("/upload", args)) => match args.first() {
                Some(path) => handle_upload(app, Path::new(path), output).await.map(|_| ()),
                None => Err(AppError::Validation(docuverse::app::SELECT_FILE.to_string()).into()),
            },
            Some(_) => Ok(()),
            None if is_slash_command(line) => {
                println!(
                    "{} Unknown command '{}'. Type /help for commands.",
                    "[!]".yellow(),
                    truncate_line(line, 40)
                );
                Ok(())
            }
            None => handle_ask(app, line, output).await.map(|_| ()),
        };

        if let Err(e) = outcome {
            report_error(&e);
        }
    }

    Ok(SUCCESS)
}

fn read_markup_source(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read from stdin")?;
            Ok(buffer)
        }
    }
}

fn handle_config(home: &Path, command: Option<ConfigCommands>) -> Result<i32> {
    let mut config = Config::load_from(home)?;

    match command {
        None | Some(ConfigCommands::Show) => {
            let effective = config.clone().with_env_overrides();
            println!();
            println!("{}", "=== DocuVerse Configuration ===".cyan().bold());
            println!();
            println!("  Service URL:    {}", effective.api_base_url);
            if effective.api_base_url != config.api_base_url {
                println!("                  {}", format!("(from {})", config::API_URL_ENV).dimmed());
            }
            let timeout = config
                .request_timeout_secs
                .map(|s| format!("{}s", s))
                .unwrap_or_else(|| "none".to_string());
            println!("  Timeout:        {}", timeout);
            println!("  Data directory: {}", config.data_dir(home).display());
            println!();
            println!("Config file: {}", home.join(config::CONFIG_FILE).display());
            println!();
        }
        Some(ConfigCommands::SetUrl { url }) => {
            if !config::validate_api_url(&url) {
                return Err(AppError::Validation(format!(
                    "Invalid service URL '{}': expected http:// or https://",
                    url
                ))
                .into());
            }
            config.api_base_url = url.trim().trim_end_matches('/').to_string();
            config.save_to(home)?;
            println!("{} Service URL set to: {}", "[✓]".green(), config.api_base_url);
        }
        Some(ConfigCommands::SetTimeout { seconds }) => {
            config.request_timeout_secs = (seconds > 0).then_some(seconds);
            config.save_to(home)?;
            match config.request_timeout_secs {
                Some(secs) => println!("{} Request timeout set to {}s", "[✓]".green(), secs),
                None => println!("{} Request timeout disabled", "[✓]".green()),
            }
        }
        Some(ConfigCommands::Reset) => {
            Config::default().save_to(home)?;
            println!("{} Configuration reset to defaults", "[✓]".green());
        }
    }

    Ok(SUCCESS)
}

/// Commands that talk to the service
enum AsyncCommand {
    Authenticate { username: String, password: Option<String>, signup: bool },
    Upload { file: PathBuf },
    Ask { question: String },
    Chat,
    Docs,
    Summarize { doc: Option<String> },
}

async fn run_async_command(command: AsyncCommand, app: &mut App, home: &Path, output: Output) -> Result<i32> {
    match command {
        AsyncCommand::Authenticate { username, password, signup } => {
            handle_authenticate(app, &username, password, signup, output).await
        }
        AsyncCommand::Upload { file } => handle_upload(app, &file, output).await,
        AsyncCommand::Ask { question } => {
            if question.trim().is_empty() {
                return Err(AppError::Validation("Question must not be empty".to_string()).into());
            }
            let answered = handle_ask(app, &question, output).await?;
            Ok(if answered { SUCCESS } else { ERROR })
        }
        AsyncCommand::Chat => {
            if io::stdin().is_terminal() {
                let mut input = InteractiveInput::new(Some(home.to_path_buf()))?;
                interactive_chat(app, &mut input, output).await
            } else {
                let mut input = SimpleInput::stdin();
                interactive_chat(app, &mut input, output).await
            }
        }
        AsyncCommand::Docs => handle_documents(app, output).await.map(|_| SUCCESS),
        AsyncCommand::Summarize { doc } => handle_summarize(app, doc.as_deref(), output).await,
    }
}

fn run(cli: Cli) -> Result<i32> {
    let output = Output {
        html: cli.html,
        quiet: cli.quiet,
    };
    let home = config::home_dir()?;

    // Commands that need no service access run without a runtime.
    let async_command = match cli.command {
        Commands::Render { file } => {
            let text = read_markup_source(file.as_deref())?;
            println!("{}", output.markup(&text));
            return Ok(SUCCESS);
        }
        Commands::Config { command } => return handle_config(&home, command),
        Commands::Signup { username, password } => AsyncCommand::Authenticate {
            username,
            password,
            signup: true,
        },
        Commands::Login { username, password } => AsyncCommand::Authenticate {
            username,
            password,
            signup: false,
        },
        Commands::Upload { file } => AsyncCommand::Upload { file },
        Commands::Ask { question } => AsyncCommand::Ask {
            question: question.join(" "),
        },
        Commands::Chat => AsyncCommand::Chat,
        Commands::Docs => AsyncCommand::Docs,
        Commands::Summarize { doc } => AsyncCommand::Summarize { doc },
        local @ (Commands::Logout | Commands::Whoami | Commands::History) => {
            let config = load_config(&home, cli.api_url.as_deref())?;
            let mut app = open_app(&config, &home)?;
            return match local {
                Commands::Logout => {
                    app.logout()?;
                    println!("{} Logged out", "[✓]".green());
                    Ok(SUCCESS)
                }
                Commands::History => {
                    print_history(&app, output);
                    Ok(SUCCESS)
                }
                _ => {
                    let session = app.session();
                    if !session.is_authenticated() {
                        println!("Not logged in");
                        return Ok(NO_PERMISSION);
                    }
                    println!(
                        "Logged in as {} (user id {})",
                        session.display_name().bold(),
                        session.user_id().unwrap_or("?")
                    );
                    println!("Service: {}", app.api().base_url());
                    Ok(SUCCESS)
                }
            };
        }
    };

    let config = load_config(&home, cli.api_url.as_deref())?;
    let mut app = open_app(&config, &home)?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    runtime.block_on(run_async_command(async_command, &mut app, &home, output))
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => report_error(&e),
    };
    std::process::exit(code);
}
