//! Interactive chat application for conversing with an ERNIE model.
//!
//! This binary provides a REPL over [`ConversationStore`].
//!
//! # Usage
//!
//! ```bash
//! # Credentials come from the environment
//! export ERNIE_API_BASE_URL=https://aip.baidubce.com
//! export ERNIE_API_KEY=...
//! export ERNIE_SECRET_KEY=...
//!
//! # Batch replies
//! ernie-chat
//!
//! # Streamed replies, no colors
//! ernie-chat --stream --no-color
//! ```
//!
//! Set `RUST_LOG=ernie_chat=debug` to see request logging on stderr.

use std::sync::{Arc, Mutex};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use ernie_chat::chat::{
    ChatArgs, ChatCommand, ChatConfig, PlainTextRenderer, Renderer, help_text, parse_command,
};
use ernie_chat::{CancellationToken, ConversationStore, Ernie, Error, MessageRole};

/// Main entry point for the ernie-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("ernie-chat [OPTIONS]");
    let config = ChatConfig::from(args);
    let mut stream = config.stream;

    let client = Ernie::new(config.client)?;
    let store = ConversationStore::new(client);
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let mut rl = DefaultEditor::new()?;

    // Ctrl+C during a reply cancels whichever token is current
    let current = Arc::new(Mutex::new(CancellationToken::new()));
    let current_clone = current.clone();
    ctrlc::set_handler(move || {
        current_clone
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .cancel();
    })?;

    for message in &store.snapshot().messages {
        renderer.print_message(message);
    }
    println!("Type /help for commands, /quit to exit\n");

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => {
                            let state = store.clear();
                            renderer.print_info("Conversation cleared.\n");
                            for message in &state.messages {
                                renderer.print_message(message);
                            }
                        }
                        ChatCommand::Stream(on) => {
                            stream = on;
                            if on {
                                renderer.print_info("Streaming enabled.");
                            } else {
                                renderer.print_info("Streaming disabled.");
                            }
                        }
                        ChatCommand::Suggestions => {
                            for suggestion in store.suggestions() {
                                println!("    - {suggestion}");
                            }
                        }
                        ChatCommand::History => {
                            for message in &store.snapshot().messages {
                                renderer.print_message(message);
                            }
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {line}");
                            }
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                let cancel = CancellationToken::new();
                *current.lock().unwrap_or_else(|e| e.into_inner()) = cancel.clone();

                let sent = if stream {
                    println!("Assistant:");
                    let sent = store
                        .send_message_streaming(line, cancel.clone(), |fragment| {
                            renderer.print_text(fragment)
                        })
                        .await;
                    if cancel.is_cancelled() {
                        renderer.print_interrupted();
                    } else {
                        renderer.finish_response();
                    }
                    sent
                } else {
                    renderer.print_loading();
                    // Ctrl+C drops the send
                    let Some(sent) = tokio::select! (
                        sent = store.send_message(line) => Some(sent),
                        () = cancel.cancelled() => None,
                    ) else {
                        renderer.print_interrupted();
                        continue;
                    };
                    if let Ok(state) = &sent
                        && state.error.is_none()
                        && let Some(reply) = state.last_message()
                        && reply.role == MessageRole::Assistant
                    {
                        renderer.print_message(reply);
                    }
                    sent
                };

                match sent {
                    Ok(state) => {
                        if let Some(error) = &state.error {
                            renderer.print_error(error);
                            renderer.print_info("Send the message again to retry.");
                        }
                    }
                    Err(Error::Busy) => renderer.print_error("Still waiting for the last reply."),
                    Err(err) => renderer.print_error(&err.to_string()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
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
