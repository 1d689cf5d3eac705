//! Interactive chat application for conversing with DeepSeek.
//!
//! This binary provides a streaming REPL interface for chatting with
//! DeepSeek models.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with DEEPSEEK_API_KEY set in the environment
//! deepchat
//!
//! # Specify a model
//! deepchat --model deepseek-coder
//!
//! # Disable streaming output
//! deepchat --no-stream
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/clear` - Clear conversation history
//! - `/history` - Show the conversation so far
//! - `/config` - Show current configuration
//! - `/set <param> <value>` - Change a parameter
//! - `/version` - Show version information
//! - `/exit` - Exit the application

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use deepchat::chat::{
    ChatArgs, ChatCommand, ChatSession, PlainTextRenderer, Renderer, SessionConfig, help_text,
    parse_command,
};
use deepchat::types::Role;
use deepchat::{DeepSeek, default_history_path};

/// Main entry point for the deepchat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("deepchat [OPTIONS]");

    if args.version {
        println!("deepchat {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = SessionConfig::from(&args);
    let mut renderer = PlainTextRenderer::with_color(!args.no_color);

    let client = match DeepSeek::with_options(
        args.api_key.clone(),
        Some(config.base_url().to_string()),
        None,
    ) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("{err}");
            eprintln!("Provide a key with --api-key or set DEEPSEEK_API_KEY.");
            std::process::exit(1);
        }
    };

    let mut session = ChatSession::new(client, config, default_history_path());
    match session.load_history() {
        Ok(0) => {}
        Ok(count) => renderer.print_info(&format!("Loaded {count} messages from history.")),
        Err(err) => renderer.print_warning(&format!("{err}; starting with empty history")),
    }

    let mut rl = DefaultEditor::new()?;

    // Flag for interrupt handling during streaming
    let interrupted = Arc::new(AtomicBool::new(false));

    // Set up Ctrl+C handler
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    println!(
        "deepchat {} (model: {})",
        env!("CARGO_PKG_VERSION"),
        session.config().model()
    );
    println!("Type /help for commands, /exit to quit\n");

    loop {
        // An interrupt observed anywhere is a graceful exit.
        if interrupted.load(Ordering::Relaxed) {
            println!("\nGoodbye!");
            break;
        }

        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Exit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {line}");
                            }
                        }
                        ChatCommand::Clear => match session.clear() {
                            Ok(()) => renderer.print_info("Conversation cleared."),
                            Err(err) => renderer.print_warning(&format!(
                                "history cleared in memory, but {err}"
                            )),
                        },
                        ChatCommand::History => {
                            print_history(&session);
                        }
                        ChatCommand::ShowConfig => {
                            print_config(&session);
                        }
                        ChatCommand::Version => {
                            renderer.print_info(&format!("deepchat {}", env!("CARGO_PKG_VERSION")));
                        }
                        ChatCommand::Set { param, value } => {
                            match session.set_param(&param, &value) {
                                Ok(()) => renderer.print_info(&format!("{param} set to {value}")),
                                Err(err) => renderer.print_error(&err.to_string()),
                            }
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send to API
                println!("DeepSeek:");
                if let Err(e) = session.send(line, &mut renderer, interrupted.clone()).await {
                    if e.is_interrupted() {
                        // Partial reply discarded; exit like a graceful /exit.
                        renderer.print_interrupted();
                        break;
                    }
                    renderer.print_error(&e.to_string());
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at the prompt - exit, same as /exit
                println!("\nGoodbye!");
                break;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        }
    }

    Ok(())
}

fn print_history(session: &ChatSession) {
    let messages = session.transcript().messages();
    if messages.is_empty() {
        println!("    (no conversation history)");
        return;
    }
    println!("    Conversation history ({} messages):", messages.len());
    for (i, message) in messages.iter().enumerate() {
        let role = match message.role {
            Role::User => "you",
            Role::Assistant => "deepseek",
        };
        println!("    {:3}. {role}: {}", i + 1, truncate(&message.content, 100));
    }
}

fn print_config(session: &ChatSession) {
    let config = session.config();
    println!("    Current Configuration:");
    println!("      Model: {}", config.model());
    println!("      Temperature: {:.2}", config.temperature());
    println!("      Max tokens: {}", config.max_tokens());
    println!(
        "      Streaming: {}",
        if config.stream() { "on" } else { "off" }
    );
    println!("      Base URL: {}", config.base_url());
    println!("      History: {} messages", session.transcript().len());
    println!("      History file: {}", session.history_path().display());
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let head: String = text.chars().take(limit).collect();
        format!("{head}...")
    }
}
