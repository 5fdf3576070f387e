use std::borrow::Cow::{self, Borrowed, Owned};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use folio_application::{
    ChatPortfolioHandle, ChatPortfolioUseCase, ChatView, PendingSubmission, RevealEngine,
    SubmitRejected, UniformDelay,
};
use folio_core::conversation::{Message, Sender};
use folio_core::transport::UploadFile;
use folio_infrastructure::{ConfigService, FilePreviewSurface, FolioPaths, load_attachment};
use folio_interaction::HttpPortfolioBackend;

const COMMANDS: &[&str] = &[
    "/attach", "/detach", "/send", "/cancel", "/refresh", "/history", "/quit",
];

/// CLI helper for rustyline that provides completion, highlighting, and hints.
struct CliHelper {
    commands: Vec<String>,
    files: FilenameCompleter,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|c| c.to_string()).collect(),
            files: FilenameCompleter::new(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        if line.starts_with("/attach ") {
            return self.files.complete(line, pos, ctx);
        }

        let line = &line[..pos];
        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

/// Sends logs to a daily file so the terminal stays free for the chat.
fn init_tracing() -> Result<WorkerGuard> {
    let logs_dir = FolioPaths::logs_dir()?;
    std::fs::create_dir_all(&logs_dir)?;

    let appender = tracing_appender::rolling::daily(&logs_dir, "folio.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

/// Entry point for the GitFolio REPL.
///
/// Free text is sent to the assistant, `/attach` selects a resume to generate
/// the portfolio from, and the generated page is kept up to date in a local
/// HTML file.
#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = init_tracing()?;

    // ===== Backend Initialization =====
    let config = ConfigService::new_default()?.get_config()?;
    let backend = Arc::new(HttpPortfolioBackend::new(&config.backend)?);
    let preview_path = match &config.preview.output_path {
        Some(path) => path.clone(),
        None => FolioPaths::default_preview_file()?,
    };
    let preview = Arc::new(FilePreviewSurface::new(preview_path.clone()));
    let reveal = RevealEngine::new(Box::new(UniformDelay::from_config(&config.reveal)));

    let chat = ChatPortfolioUseCase::new(backend, preview, reveal).spawn();
    tracing::info!(
        backend = %config.backend.base_url,
        preview = %preview_path.display(),
        "GitFolio REPL started"
    );

    // ===== REPL Setup =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== GitFolio ===".bright_magenta().bold());
    println!(
        "{}",
        "Describe your portfolio, or '/attach <resume>' then '/send' to generate one.".bright_black()
    );
    println!(
        "{}",
        format!("Preview: {}", preview_path.display()).bright_black()
    );
    println!("{}", "Press Ctrl-C while a reply is typing to stop it.".bright_black());
    println!();

    let mut attachment: Option<UploadFile> = None;

    // ===== Main REPL Loop =====
    loop {
        let prompt = match &attachment {
            Some(file) => format!("[{}] >> ", file.file_name),
            None => ">> ".to_string(),
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                let (command, argument) = match trimmed.split_once(char::is_whitespace) {
                    Some((command, rest)) => (command, rest.trim()),
                    None => (trimmed, ""),
                };

                match command {
                    "/quit" | "quit" | "exit" => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    "/attach" => attach(&mut attachment, argument).await,
                    "/detach" => {
                        if attachment.take().is_some() {
                            println!("{}", "Attachment removed.".bright_black());
                        } else {
                            println!("{}", "Nothing attached.".bright_black());
                        }
                    }
                    "/send" => submit(&chat, argument, &mut attachment, &preview_path).await?,
                    "/cancel" => {
                        if !chat.cancel().await? {
                            println!("{}", "Nothing to cancel.".bright_black());
                        }
                    }
                    "/refresh" => refresh(&chat, &preview_path).await?,
                    "/history" => print_history(&chat.view()),
                    other if other.starts_with('/') => {
                        println!(
                            "{}",
                            format!("Unknown command {}. Try: {}", other, COMMANDS.join(" "))
                                .bright_black()
                        );
                    }
                    _ => submit(&chat, trimmed, &mut attachment, &preview_path).await?,
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type '/quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    if let Err(e) = chat.shutdown().await {
        tracing::warn!(error = %e, "Chat did not shut down cleanly");
    }
    Ok(())
}

async fn attach(attachment: &mut Option<UploadFile>, argument: &str) {
    if argument.is_empty() {
        println!("{}", "Usage: /attach <path to .pdf, .txt or .docx>".yellow());
        return;
    }

    let path = expand_home(argument);
    match load_attachment(&path).await {
        Ok(file) => {
            println!(
                "{}",
                format!(
                    "Attached {} ({} bytes). It will be sent with your next message.",
                    file.file_name,
                    file.size()
                )
                .green()
            );
            *attachment = Some(file);
        }
        Err(e) => println!("{}", e.to_string().red()),
    }
}

fn expand_home(argument: &str) -> PathBuf {
    match (argument.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => Path::new(&home).join(rest),
        _ => PathBuf::from(argument),
    }
}

async fn submit(
    chat: &ChatPortfolioHandle,
    text: &str,
    attachment: &mut Option<UploadFile>,
    preview_path: &Path,
) -> Result<()> {
    let submission = match attachment.clone() {
        Some(file) => PendingSubmission::with_file(text, file),
        None => PendingSubmission::text(text),
    };

    let before = chat.view();
    if let Err(e) = chat.submit(submission).await {
        match e.downcast_ref::<SubmitRejected>() {
            Some(rejected) => println!("{}", rejected.to_string().yellow()),
            None => return Err(e),
        }
        return Ok(());
    }
    *attachment = None;

    if let Some(file) = last_attachment_name(&chat.view()) {
        println!("{}", format!("Uploading {}...", file).bright_black());
    }
    let after = follow_reply(chat).await?;
    report_document(&before, &after, preview_path);
    Ok(())
}

/// File name on the message just submitted, if it carried one.
fn last_attachment_name(view: &ChatView) -> Option<String> {
    view.messages
        .iter()
        .rev()
        .find(|m| m.is_user())
        .and_then(|m| m.attached_file_name.clone())
}

/// Prints the bot reply as it is typed out, until the chat is idle again.
///
/// Ctrl-C cancels the reply; the part already shown is kept.
async fn follow_reply(chat: &ChatPortfolioHandle) -> Result<ChatView> {
    let mut views = chat.subscribe();
    let mut printed = 0usize;
    let mut waiting_shown = false;

    loop {
        let view = views.borrow_and_update().clone();

        if view.phase.is_idle() {
            if let Some(last) = view.messages.last().filter(|m| m.sender == Sender::Bot) {
                let rest: String = last.text.chars().skip(printed).collect();
                print!("{}", rest.bright_blue());
                println!();
            }
            return Ok(view);
        }

        if let Some(typing) = view.typing() {
            let rest: String = typing.chars().skip(printed).collect();
            if !rest.is_empty() {
                printed += rest.chars().count();
                print!("{}", rest.bright_blue());
                std::io::stdout().flush()?;
            }
        } else if view.phase.is_awaiting_response() && !waiting_shown {
            println!("{}", "Thinking...".bright_black());
            waiting_shown = true;
        }

        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    return Ok(chat.view());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                chat.cancel().await?;
            }
        }
    }
}

async fn refresh(chat: &ChatPortfolioHandle, preview_path: &Path) -> Result<()> {
    let before = chat.view();
    if let Err(e) = chat.refresh_document().await {
        match e.downcast_ref::<SubmitRejected>() {
            Some(rejected) => println!("{}", rejected.to_string().yellow()),
            None => return Err(e),
        }
        return Ok(());
    }

    let mut views = chat.subscribe();
    let after = views.wait_for(|v| !v.fetching).await?.clone();
    report_document(&before, &after, preview_path);
    if after.document.last_error.is_none() {
        if !after.document.present {
            println!("{}", "No portfolio has been generated yet.".bright_black());
        } else if after.document == before.document {
            println!("{}", "Preview is up to date.".bright_black());
        }
    }
    Ok(())
}

fn report_document(before: &ChatView, after: &ChatView, preview_path: &Path) {
    if after.document.content != before.document.content && after.document.present {
        println!(
            "{}",
            format!("Preview updated: {}", preview_path.display()).green()
        );
    }
    if let Some(error) = &after.document.last_error {
        if before.document.last_error.as_ref() != Some(error) {
            println!("{}", format!("Preview not updated: {}", error).yellow());
        }
    }
}

fn print_history(view: &ChatView) {
    if view.messages.is_empty() {
        println!("{}", "No messages yet.".bright_black());
        return;
    }
    for message in view.messages.iter() {
        print_message(message);
    }
}

fn print_message(message: &Message) {
    match message.sender {
        Sender::User => {
            println!("{}", format!("> {}", message.text).green());
            if let Some(file) = &message.attached_file_name {
                println!("{}", format!("  Attached file: {}", file).bright_black());
            }
        }
        Sender::Bot => {
            for line in message.text.lines() {
                println!("{}", line.bright_blue());
            }
        }
    }
    println!();
}
