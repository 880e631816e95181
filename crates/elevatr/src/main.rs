//! A terminal front end for chatting with Elevatr.

#[macro_use]
extern crate tracing;

mod input;
mod settings;
mod transcript;

use std::io::Write as _;
use std::pin::pin;
use std::time::Duration;

use chrono::Local;
use elevatr_api::{Message, Role};
use elevatr_core::{ChatController, ChatControllerBuilder, ChatOptions};
use elevatr_http_backend::HttpBackend;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::{AnsiColors, OwoColorize};
use tokio::io::{self, AsyncBufReadExt as _, BufReader, Lines, Stdin};
use tokio::select;
use tokio::time::sleep;

use input::{
    HELP, Input, SUGGESTIONS, is_near_limit, next_line, suggestion,
};
use settings::Settings;
use transcript::Transcript;

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = Settings::from_env();
    debug!("starting with {settings:?}");
    let backend = HttpBackend::new(settings.backend);
    let controller = ChatControllerBuilder::with_backend(backend)
        .with_config(settings.chat)
        .build();

    let mut app = App {
        controller,
        transcript: Transcript::default(),
        stdin: BufReader::new(io::stdin()).lines(),
        spinner_style: ProgressStyle::with_template("{spinner} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    };

    println!("{}", "Elevatr".bright_white().bold());
    println!("Ask me anything about Jorge Ferrari Ce! 🚀");
    println!("{}\n", "Type /help to see the commands.".dimmed());
    app.render();

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = app.read_line().await else {
            break;
        };
        let Some(input) = Input::parse(&line) else {
            continue;
        };
        if !app.handle(input).await {
            break;
        }
    }
}

struct App {
    controller: ChatController,
    transcript: Transcript,
    stdin: Lines<BufReader<Stdin>>,
    spinner_style: ProgressStyle,
}

impl App {
    /// Handles one input. Returns `false` when the user wants to leave.
    async fn handle(&mut self, input: Input) -> bool {
        match input {
            Input::Message(text) => self.send(text).await,
            Input::Pick(index) => {
                let picked = self
                    .shows_suggestions()
                    .then(|| suggestion(index))
                    .flatten();
                match picked {
                    Some(suggestion) => {
                        println!("{}", suggestion.bright_white());
                        self.send(suggestion.to_owned()).await;
                    }
                    None => self.send(index.to_string()).await,
                }
            }
            Input::Retry => {
                let retry = self.controller.retry_last_message();
                let outcome = self.with_spinner(retry).await;
                if let Ok(None) = outcome {
                    println!("{}", "Nothing to retry yet.".dimmed());
                }
                self.render();
            }
            Input::Clear => {
                self.controller.clear_conversation().await;
                self.transcript.reset();
                println!("{}\n", "Started a new conversation.".dimmed());
                self.render();
            }
            Input::Load(None) => {
                println!("{}", "Usage: /load <conversation id>".dimmed());
            }
            Input::Load(Some(id)) => {
                let load = self.controller.load_conversation(&id);
                if let Ok(Some(history)) = self.with_spinner(load).await {
                    println!(
                        "{}\n",
                        format!(
                            "Loaded conversation {id} ({} messages).",
                            history.messages.len()
                        )
                        .dimmed()
                    );
                }
                self.render();
            }
            Input::Delete(id) => {
                let deleted =
                    self.controller.delete_conversation(id.as_deref()).await;
                match deleted {
                    Ok(true) => {
                        println!("{}", "Conversation deleted.".dimmed());
                        let state = self.controller.snapshot();
                        if state.conversation_id().is_none() {
                            self.transcript.reset();
                        }
                    }
                    Ok(false) => {
                        println!("{}", "No conversation to delete.".dimmed());
                    }
                    Err(_) => {}
                }
                self.render();
            }
            Input::Stats => {
                let stats = self.controller.stats();
                let state = self.controller.snapshot();
                println!(
                    "{} messages ({} from you, {} from Elevatr)",
                    stats.total_messages,
                    stats.user_messages,
                    stats.assistant_messages
                );
                match state.conversation_id() {
                    Some(id) => println!("conversation: {id}"),
                    None => println!("conversation: not started"),
                }
            }
            Input::Help => println!("{HELP}"),
            Input::Quit => return false,
            Input::Unknown(name) => {
                let hint = format!("Unknown command /{name}, try /help.");
                println!("{}", hint.dimmed());
            }
        }
        true
    }

    async fn send(&mut self, text: String) {
        let len = text.chars().count();
        let max = self.controller.max_message_length();
        if is_near_limit(len, max) {
            let warning = format!("⚠️  {len}/{max} characters");
            println!("{}", warning.bright_yellow());
        }

        let send = self.controller.send_message(&text, ChatOptions::default());
        if let Err(err) = self.with_spinner(send).await {
            debug!("send failed: {err:?}");
        }
        self.render();
    }

    /// Drives `fut` while showing a spinner.
    async fn with_spinner<F: Future>(&self, fut: F) -> F::Output {
        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(self.spinner_style.clone());
        progress_bar.set_message("🤔 Elevatr is thinking...");

        let mut fut = pin!(fut);
        let output = loop {
            progress_bar.inc(1);
            select! {
                output = &mut fut => break output,
                _ = sleep(Duration::from_millis(100)) => {}
            }
        };

        // Finish the progress bar before printing anything else.
        progress_bar.finish_and_clear();
        output
    }

    #[inline]
    async fn read_line(&mut self) -> Option<String> {
        next_line(&mut self.stdin).await
    }

    fn shows_suggestions(&self) -> bool {
        let state = self.controller.snapshot();
        state.messages().len() <= 1 && !state.is_loading()
    }

    /// Prints what changed since the last render.
    fn render(&mut self) {
        let state = self.controller.snapshot();
        for message in self.transcript.update(state.messages()) {
            print_message(message);
        }

        if let Some(error) = state.error() {
            let bar = BAR_CHAR.bright_red();
            println!("{bar}⚠️  {}", error.bright_red());
            println!("{bar}{}\n", "Type /retry to try again.".dimmed());
        }

        if self.shows_suggestions() {
            println!("💡 Try asking:");
            for (i, suggestion) in SUGGESTIONS.iter().enumerate() {
                println!("  {} {suggestion}", format!("[{}]", i + 1).cyan());
            }
            println!();
        }
    }
}

fn print_message(message: &Message) {
    let time = message.timestamp.with_timezone(&Local).format("%H:%M");
    let (bar, icon) = match message.role {
        Role::User => (AnsiColors::BrightGreen, "🧑"),
        Role::Assistant => (AnsiColors::BrightCyan, "🤖"),
    };
    let bar = BAR_CHAR.color(bar);
    let mut lines = message.content.lines();
    let first = lines.next().unwrap_or_default();
    println!("{bar}{icon} {}", first.bright_white());
    for line in lines {
        println!("{bar}{}", line.bright_white());
    }
    println!("{bar}{}\n", time.dimmed());
}
