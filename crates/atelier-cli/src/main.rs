//! Atelier REPL front-end.
//!
//! A thin presentation layer over the chat session: browse the template
//! catalog, stage workflows, modules, and images in the composer, and send
//! prompts, rendering streamed fragments as they arrive.

use std::borrow::Cow::{self, Borrowed, Owned};
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::sync::broadcast;

use atelier_application::{ChatSession, SendOutcome, SessionEvent};
use atelier_core::composer::{ComposerMode, PendingImage, mime_type_for};
use atelier_core::message::MessageRole;
use atelier_core::template;
use atelier_interaction::{StudioConfig, build_client};

const COMMANDS: &[&str] = &[
    "/help",
    "/modules",
    "/workflows",
    "/use",
    "/module",
    "/drop",
    "/clear",
    "/attach",
    "/detach",
    "/show",
];

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|c| c.to_string()).collect(),
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
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
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

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match StudioConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", format!("Configuration problem: {err}").yellow());
            StudioConfig::default()
        }
    };
    let mock_mode = config.api_key.is_none();
    let client = build_client(&config)?;
    let session = Arc::new(ChatSession::new(client));

    let helper = CliHelper::new();
    let mut rl = Editor::new()?;
    rl.set_helper(Some(helper));

    println!("{}", "=== Atelier Studio ===".bright_magenta().bold());
    if mock_mode {
        println!(
            "{}",
            "No model credential configured; responses are mocked.".yellow()
        );
    }
    println!(
        "{}",
        "Type '/help' for commands, or just write a prompt. 'quit' to exit.".bright_black()
    );
    println!();

    loop {
        let readline = rl.readline(">> ");

        match readline {
            Ok(line) => {
                let trimmed = line.trim();

                if trimmed == "quit" || trimmed == "exit" {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(&line);

                if trimmed.starts_with('/') {
                    if let Err(err) = run_command(&session, trimmed).await {
                        println!("{}", err.to_string().red());
                    }
                } else if let Err(err) = send_and_render(&session, trimmed).await {
                    println!("{}", err.to_string().red());
                }
            }
            Err(_) => {
                println!("{}", "Goodbye!".bright_green());
                break;
            }
        }
    }

    Ok(())
}

async fn run_command(session: &Arc<ChatSession>, input: &str) -> Result<()> {
    let mut tokens = input.split_whitespace();
    let command = tokens.next().unwrap_or_default();
    let args: Vec<&str> = tokens.collect();

    match command {
        "/help" => print_help(),
        "/modules" => {
            for module in template::modules() {
                println!(
                    "  {}  {}",
                    module.id.bright_cyan(),
                    module.label.bright_black()
                );
            }
        }
        "/workflows" => {
            for workflow in template::workflows() {
                let slots: Vec<&str> = workflow
                    .image_slots
                    .iter()
                    .map(|s| s.label.as_str())
                    .collect();
                println!(
                    "  {}  {} [{}]",
                    workflow.id.bright_cyan(),
                    workflow.label.bright_black(),
                    slots.join(", ")
                );
            }
        }
        "/use" => {
            let id = args.first().copied().unwrap_or_default();
            if session.select_workflow(id).await {
                println!("{}", format!("Workflow '{id}' activated.").green());
            } else {
                println!("{}", format!("No workflow named '{id}'.").yellow());
            }
        }
        "/module" => {
            let id = args.first().copied().unwrap_or_default();
            if session.select_module(id).await {
                println!("{}", format!("Module '{id}' selected.").green());
            } else {
                println!("{}", format!("No module named '{id}'.").yellow());
            }
        }
        "/drop" => {
            let id = args.first().copied().unwrap_or_default();
            session.remove_module(id).await;
            println!("{}", format!("Module '{id}' removed.").green());
        }
        "/clear" => {
            session.remove_workflow().await;
            println!("{}", "Workflow cleared.".green());
        }
        "/attach" => {
            let Some(path) = args.first().copied() else {
                println!("{}", "Usage: /attach <path> [slot]".yellow());
                return Ok(());
            };
            let bytes = tokio::fs::read(path).await?;
            let image = PendingImage::new(mime_type_for(path), bytes, path);
            match session.add_images(vec![image], args.get(1).copied()).await {
                Ok(()) => println!("{}", format!("Attached {path}.").green()),
                Err(err) => println!("{}", err.to_string().yellow()),
            }
        }
        "/detach" => {
            let Some(target) = args.first() else {
                println!("{}", "Usage: /detach <image-id|slot>".yellow());
                return Ok(());
            };
            let slot = if session.composer().await.active_workflow().is_some() {
                Some(*target)
            } else {
                None
            };
            match session.remove_image(target, slot).await {
                Ok(()) => println!("{}", format!("Detached {target}.").green()),
                Err(err) => println!("{}", err.to_string().yellow()),
            }
        }
        "/show" => print_composer(session).await,
        _ => println!("{}", "Unknown command; try /help.".bright_black()),
    }
    Ok(())
}

fn print_help() {
    println!("  {}               list prompt modules", "/modules".bright_cyan());
    println!("  {}             list advanced workflows", "/workflows".bright_cyan());
    println!("  {}         activate a workflow", "/use <id>".bright_cyan());
    println!("  {}      select a prompt module", "/module <id>".bright_cyan());
    println!("  {}        deselect a prompt module", "/drop <id>".bright_cyan());
    println!("  {}                 deactivate the workflow", "/clear".bright_cyan());
    println!(
        "  {}  attach an image (slot required in a workflow)",
        "/attach <path> [slot]".bright_cyan()
    );
    println!(
        "  {}  remove an image or clear a slot",
        "/detach <id|slot>".bright_cyan()
    );
    println!("  {}                  show the composer state", "/show".bright_cyan());
}

async fn print_composer(session: &Arc<ChatSession>) {
    let composer = session.composer().await;

    match composer.active_workflow() {
        Some(workflow) => println!("Workflow: {}", workflow.label.bright_cyan()),
        None => println!("Workflow: {}", "none".bright_black()),
    }

    if composer.selected_modules().is_empty() {
        println!("Modules:  {}", "none".bright_black());
    } else {
        let labels: Vec<&str> = composer
            .selected_modules()
            .iter()
            .map(|m| m.label.as_str())
            .collect();
        println!("Modules:  {}", labels.join(", ").bright_cyan());
    }

    match composer.mode() {
        ComposerMode::Standard { images } => {
            if images.is_empty() {
                println!("Images:   {}", "none".bright_black());
            } else {
                for image in images {
                    println!("  {}  {}", image.id.bright_black(), image.preview);
                }
            }
        }
        ComposerMode::Workflow { slots, .. } => {
            for slot in slots {
                match &slot.image {
                    Some(image) => println!(
                        "  {} ({}): {}",
                        slot.slot.id.bright_cyan(),
                        slot.slot.label,
                        image.preview
                    ),
                    None => println!(
                        "  {} ({}): {}",
                        slot.slot.id.bright_cyan(),
                        slot.slot.label,
                        "empty".bright_black()
                    ),
                }
            }
        }
    }
}

async fn send_and_render(session: &Arc<ChatSession>, prompt: &str) -> Result<()> {
    let mut events = session.subscribe();
    let mut send = {
        let session = Arc::clone(session);
        let prompt = prompt.to_string();
        tokio::spawn(async move { session.send_message(&prompt).await })
    };

    let mut model_id: Option<String> = None;
    let mut printed = 0usize;
    let outcome;

    loop {
        tokio::select! {
            joined = &mut send => {
                outcome = joined?;
                break;
            }
            event = events.recv() => match event {
                Ok(event) => render_event(event, &mut model_id, &mut printed),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    outcome = send.await?;
                    break;
                }
            },
        }
    }

    // Render whatever arrived between the last poll and completion.
    while let Ok(event) = events.try_recv() {
        render_event(event, &mut model_id, &mut printed);
    }
    println!();

    if outcome == SendOutcome::Rejected {
        println!("{}", "A send is already in flight.".yellow());
        return Ok(());
    }

    if let Some(last) = session.messages().await.last() {
        if last.role == MessageRole::Model {
            for image in &last.images {
                println!("{}", format!("[image] {}", truncated(image, 72)).bright_magenta());
            }
        }
    }
    Ok(())
}

/// Prints the delta of the in-flight model message as updates arrive.
fn render_event(event: SessionEvent, model_id: &mut Option<String>, printed: &mut usize) {
    match event {
        SessionEvent::MessageAppended(message) if message.role == MessageRole::Model => {
            *model_id = Some(message.id);
        }
        SessionEvent::MessageUpdated(message)
            if model_id.as_deref() == Some(message.id.as_str()) =>
        {
            if message.text.len() >= *printed && message.text.is_char_boundary(*printed) {
                print!("{}", message.text[*printed..].bright_blue());
            } else {
                // The text was rewritten rather than extended.
                println!();
                print!("{}", message.text.bright_blue());
            }
            *printed = message.text.len();
            let _ = io::stdout().flush();
        }
        _ => {}
    }
}

fn truncated(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let cut = text
        .char_indices()
        .take_while(|(idx, _)| *idx < limit)
        .last()
        .map(|(idx, c)| idx + c.len_utf8())
        .unwrap_or(limit);
    format!("{}...", &text[..cut])
}
