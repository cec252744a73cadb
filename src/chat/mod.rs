//! Interactive terminal chat over an open engine

use crate::engine::Engine;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::time::Duration;

const RULE_WIDTH: usize = 70;

/// One parsed line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Quit,
    Clear,
    Help,
    Empty,
    Ask(String),
}

impl ChatCommand {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "" => ChatCommand::Empty,
            "quit" | "exit" | "q" => ChatCommand::Quit,
            "clear" => ChatCommand::Clear,
            "help" => ChatCommand::Help,
            _ => ChatCommand::Ask(trimmed.to_string()),
        }
    }
}

pub fn banner(chunk_count: usize) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    format!(
        "{rule}\n  paperlens - research paper assistant\n{rule}\n\
         Knowledge base: {chunk_count} chunks\n\
         Type a question, or 'help' for commands.\n"
    )
}

pub fn help_text() -> &'static str {
    "Commands:\n  \
     quit, exit, q   Leave the chat\n  \
     clear           Clear the screen\n  \
     help            Show this message\n\
     Anything else is answered from the knowledge base."
}

/// Run the loop until a quit command or end of input
pub fn run<R: BufRead, W: Write>(engine: &Engine, top_k: usize, input: R, mut out: W) -> io::Result<()> {
    writeln!(out, "{}", banner(engine.chunk_count()))?;

    let mut lines = input.lines();
    loop {
        write!(out, "You: ")?;
        out.flush()?;

        let Some(line) = lines.next() else {
            writeln!(out)?;
            break;
        };

        match ChatCommand::parse(&line?) {
            ChatCommand::Quit => break,
            ChatCommand::Empty => continue,
            ChatCommand::Clear => {
                // ANSI: clear screen, cursor home
                write!(out, "\x1b[2J\x1b[H")?;
                writeln!(out, "{}", banner(engine.chunk_count()))?;
            }
            ChatCommand::Help => writeln!(out, "{}", help_text())?,
            ChatCommand::Ask(question) => {
                let spinner = thinking_spinner();
                let response = engine.ask(&question, top_k);
                spinner.finish_and_clear();

                if response.retrieval.is_degraded() {
                    tracing::debug!(
                        "Degraded retrieval: semantic {}, keyword {}",
                        response.retrieval.dense,
                        response.retrieval.sparse
                    );
                }
                writeln!(out, "\nAssistant: {}", response.answer.text)?;
                writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
            }
        }
    }

    writeln!(out, "Goodbye!")?;
    Ok(())
}

fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Thinking...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}
