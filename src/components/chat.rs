use console::{style, Term};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

use crate::api::LibrarianApi;
use crate::components::history;
use crate::db::state_store::StateStore;
use crate::errors::AppError;
use crate::models::{Message, Sender, Transcript};
use crate::service::chat_service::ChatService;

/// One line typed at the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Send(String),
    ShowHistory,
    ShowChat,
    NewChat,
    Help,
    Quit,
}

impl Input {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "/history" => Input::ShowHistory,
            "/chat" => Input::ShowChat,
            "/new" => Input::NewChat,
            "/help" => Input::Help,
            "/quit" | "/exit" => Input::Quit,
            _ => Input::Send(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Chat,
    History,
}

impl Screen {
    /// Screen shown after `input` is handled on `self`.
    fn after(self, input: &Input) -> Screen {
        match input {
            Input::ShowHistory => Screen::History,
            Input::ShowChat | Input::NewChat => Screen::Chat,
            _ => self,
        }
    }

    /// History is read-only.
    fn accepts_messages(self) -> bool {
        self == Screen::Chat
    }
}

const HELP: &str = "Commands: /history  /chat  /new  /help  /quit";

/// Renders a single chat bubble.
pub fn bubble(message: &Message) -> String {
    let label = match message.sender {
        Sender::User => style("you").green().bold(),
        Sender::Bot => style("librarian").cyan().bold(),
    };
    let body = match (&message.text, &message.image) {
        (Some(text), _) => text.clone(),
        (None, Some(image)) => style(describe_image(image)).dim().to_string(),
        (None, None) => String::new(),
    };
    format!("{label}: {body}")
}

/// Short placeholder for an inline data URL, e.g. `[cover image: image/svg+xml, 812 bytes]`.
pub fn describe_image(data_url: &str) -> String {
    let Some(rest) = data_url.strip_prefix("data:") else {
        return "[cover image]".to_string();
    };
    let (header, payload) = rest.split_once(',').unwrap_or((rest, ""));
    let mut params = header.split(';');
    let media_type = params.next().filter(|m| !m.is_empty()).unwrap_or("image");
    let bytes = if params.any(|p| p == "base64") {
        base64_decoded_len(payload)
    } else {
        payload.len()
    };
    format!("[cover image: {media_type}, {bytes} bytes]")
}

/// Decoded size of a base64 payload, without decoding it.
fn base64_decoded_len(payload: &str) -> usize {
    let padding = payload.bytes().rev().take_while(|b| *b == b'=').count().min(2);
    (payload.len() * 3 / 4).saturating_sub(padding)
}

/// Prints transcript messages past `rendered` and returns the new count.
/// A shrunken transcript is redrawn from the start.
fn print_new(term: &Term, transcript: &Transcript, rendered: usize) -> Result<usize, AppError> {
    let from = if transcript.len() < rendered { 0 } else { rendered };
    for message in &transcript.messages()[from..] {
        term.write_line(&bubble(message))?;
    }
    Ok(transcript.len())
}

/// Interactive chat screen reading lines from stdin until `/quit` or EOF.
pub async fn run<A, S>(service: &ChatService<A, S>, term: &Term) -> Result<(), AppError>
where
    A: LibrarianApi,
    S: StateStore,
{
    service.load().await?;
    term.write_line(&style("Smart Librarian").bold().to_string())?;
    term.write_line(&style(HELP).dim().to_string())?;
    let mut rendered = print_new(term, &service.transcript(), 0)?;

    let mut screen = Screen::Chat;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let input = Input::parse(&line);
        let current = screen;
        screen = current.after(&input);
        match input {
            Input::Quit => break,
            Input::Help => term.write_line(HELP)?,
            Input::ShowHistory => {
                history::show(service.sessions().state(), term).await?;
            }
            Input::ShowChat => {
                term.write_line(&style("── chat ──").dim().to_string())?;
                rendered = print_new(term, &service.transcript(), 0)?;
            }
            Input::NewChat => match service.new_conversation().await {
                Ok(()) => {
                    rendered = 0;
                    term.write_line(&style("Started a new conversation.").dim().to_string())?;
                }
                Err(e) => {
                    error!("Failed to start a new conversation: {e}");
                    term.write_line(&format!("Could not start a new conversation: {e}"))?;
                }
            },
            Input::Send(_) if !current.accepts_messages() => {
                term.write_line("History is read-only; type /chat to send messages.")?;
            }
            Input::Send(text) => {
                let mut updates = service.subscribe();
                let send = service.send_message(&text);
                tokio::pin!(send);
                let outcome = loop {
                    tokio::select! {
                        outcome = &mut send => break outcome,
                        Ok(()) = updates.changed() => {
                            rendered = print_new(term, &updates.borrow_and_update(), rendered)?;
                        }
                    }
                };
                outcome?;
                rendered = print_new(term, &service.transcript(), rendered)?;
            }
        }
    }
    Ok(())
}
