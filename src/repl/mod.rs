//! Interactive ask loop
//!
//! Rustyline-based prompt with persistent history. The exit sentinel is
//! checked before any remote call, and a failed turn prints a generic
//! apology (detail goes to the log) and keeps the loop alive.

use crate::config::Config;
use crate::pipeline::Pipeline;
use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const PROMPT: &str = "\nAsk something about your emails (like: Show my Amazon orders): ";

/// True when the input should terminate the loop, case-insensitive.
pub fn is_exit_command(input: &str) -> bool {
    matches!(
        input.trim().to_lowercase().as_str(),
        "exit" | "quit"
    )
}

/// Run the interactive question loop until an exit sentinel or EOF.
pub async fn run(pipeline: &Pipeline) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    let history_path = Config::app_dir().ok().map(|dir| dir.join("history"));
    if let Some(ref path) = history_path {
        let _ = editor.load_history(path);
    }

    println!(
        "\n{}",
        "Welcome to the email chatbot! Type 'exit' to quit.".bold()
    );

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit_command(question) {
            println!("{}", "Goodbye!".green());
            break;
        }

        let _ = editor.add_history_entry(question);
        tracing::info!(question, "received user question");

        match pipeline.ask(question).await {
            Ok(answer) => {
                println!("\n{}", "Answer:".green().bold());
                println!("{}", answer);
            }
            Err(e) => {
                tracing::error!(error = %e, "ask turn failed");
                println!(
                    "\n{}",
                    "Sorry, an error occurred while processing your request.".red()
                );
            }
        }
    }

    if let Some(ref path) = history_path {
        let _ = editor.save_history(path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_sentinels() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("Exit"));
        assert!(is_exit_command("QUIT"));
        assert!(is_exit_command("  quit  "));
    }

    #[test]
    fn test_questions_are_not_sentinels() {
        assert!(!is_exit_command("when do I exit the lease?"));
        assert!(!is_exit_command("show my invoices"));
        assert!(!is_exit_command(""));
    }
}
