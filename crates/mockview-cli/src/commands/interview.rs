//! The `mockview interview` command: an interactive console session.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use mockview_core::controller::{SessionSummary, TurnController};
use mockview_core::error::InterviewError;
use mockview_core::question::GeneratedQuestion;
use mockview_providers::config::{create_generator, create_retriever};
use mockview_store::SignedInUser;

use super::open_store;

const RETRY: &str = ":retry";
const QUIT: &str = ":quit";

struct Console {
    lines: Lines<BufReader<Stdin>>,
}

impl Console {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Print `prompt` and read one line. `None` at end of input.
    async fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        print!("{prompt}");
        std::io::stdout().flush()?;
        Ok(self.lines.next_line().await?.map(|l| l.trim().to_string()))
    }

    async fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let reply = self.ask(&format!("{prompt} [y/N] ")).await?;
        Ok(matches!(
            reply.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("y" | "yes")
        ))
    }
}

pub async fn execute(username: String, config_path: Option<PathBuf>) -> Result<()> {
    let (config, store) = open_store(config_path.as_deref())?;
    let store = Arc::new(store);
    let user = SignedInUser::sign_in(&store, &username)
        .await
        .with_context(|| format!("cannot start an interview for '{username}'"))?;

    let generator = create_generator(&config)?;
    let retriever = create_retriever(&config)?;
    tracing::info!(
        generator = generator.name(),
        retriever = retriever.name(),
        model = %config.default_model,
        "starting interview"
    );

    let mut controller = TurnController::new(
        retriever,
        generator,
        store,
        Arc::new(user),
        config.prompts.clone(),
        config.interview_config(),
    );
    let mut console = Console::new();

    println!("Mock interview for {username}. Type {QUIT} to leave, {RETRY} to re-run a failed evaluation.\n");

    let mut question = loop {
        match controller.start().await {
            Ok(q) => break q,
            Err(e) if e.is_rejection() => return Err(e.into()),
            Err(e) => {
                eprintln!("Could not get a question: {e}");
                if !console.confirm("Try again?").await? {
                    return Ok(());
                }
            }
        }
    };

    loop {
        show_question(&question);

        if !answer_until_feedback(&mut controller, &mut console).await? {
            print_abandoned(controller.state().exchanges().len());
            return Ok(());
        }

        if console.confirm("Continue with another question?").await? {
            match controller.continue_interview().await {
                Ok(q) => {
                    question = q;
                    continue;
                }
                Err(e) => {
                    eprintln!("Could not get another question: {e}");
                    println!("Saving the interview so far.");
                }
            }
        }
        break;
    }

    let summary = stop_with_retry(&mut controller, &mut console).await?;
    if let Some(summary) = summary {
        print_summary(&summary);
    }
    Ok(())
}

fn show_question(question: &GeneratedQuestion) {
    println!("\nInterviewer: {}", question.question);
    if question.repeated {
        println!("  (no new question after {} attempts; this one was asked before)", question.attempts);
    }
    if question.context_reused {
        println!("  (the reference material has been exhausted; reusing an earlier passage)");
    }
}

/// Read answers until one is evaluated. Returns `false` if the user quit.
async fn answer_until_feedback(
    controller: &mut TurnController,
    console: &mut Console,
) -> Result<bool> {
    let mut awaiting_retry = false;
    loop {
        let Some(line) = console.ask("You: ").await? else {
            return Ok(false);
        };
        if line == QUIT {
            return Ok(false);
        }

        let result = if line == RETRY {
            if !awaiting_retry {
                println!("Nothing to retry; type your answer.");
                continue;
            }
            controller.retry_evaluation().await
        } else if line.is_empty() {
            continue;
        } else if awaiting_retry {
            println!("Your answer is already recorded. Type {RETRY} to evaluate it or {QUIT} to leave.");
            continue;
        } else {
            controller.submit_answer(&line).await
        };

        match result {
            Ok(evaluation) => {
                if evaluation.displayed {
                    println!("\nInterviewer: {}\n", evaluation.feedback);
                } else {
                    println!("\n(same feedback as before)\n");
                }
                return Ok(true);
            }
            Err(e) if e.is_rejection() => return Err(e.into()),
            Err(e) => {
                eprintln!("Evaluation failed: {e}");
                println!("Type {RETRY} to try again.");
                awaiting_retry = true;
            }
        }
    }
}

async fn stop_with_retry(
    controller: &mut TurnController,
    console: &mut Console,
) -> Result<Option<SessionSummary>> {
    loop {
        match controller.stop().await {
            Ok(summary) => return Ok(Some(summary)),
            Err(e @ InterviewError::Persistence(_)) => {
                eprintln!("Could not save the interview: {e}");
                if !console.confirm("Try saving again?").await? {
                    return Ok(None);
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// A session can only be saved once its latest question has feedback.
fn print_abandoned(evaluated: usize) {
    if evaluated == 0 {
        println!("Interview abandoned; unanswered sessions are not saved.");
    } else {
        println!(
            "Interview abandoned with a question unanswered; {evaluated} evaluated answer(s) \
             from this session are discarded and not saved."
        );
    }
}

fn print_summary(summary: &SessionSummary) {
    println!(
        "Saved session {}: {} question(s), {} answer(s) evaluated, {} message(s).",
        summary.session_id, summary.questions, summary.exchanges, summary.turns
    );
    println!("Review it with: mockview history --user <name> --session {}", summary.session_id);
}
