use console::{style, Term};

use crate::components::chat::bubble;
use crate::db::local_state::LocalState;
use crate::db::state_store::StateStore;
use crate::errors::AppError;
use crate::models::Transcript;

const EMPTY_HINT: &str = "No saved conversation yet.";

/// Lines for the read-only history screen, oldest first.
pub fn render(transcript: &Transcript) -> Vec<String> {
    if transcript.is_empty() {
        return vec![style(EMPTY_HINT).dim().to_string()];
    }
    transcript.messages().iter().map(bubble).collect()
}

/// Loads the stored transcript and prints it. Never mutates state.
pub async fn show<S: StateStore>(state: &LocalState<S>, term: &Term) -> Result<(), AppError> {
    let transcript = state.load_transcript().await?;
    term.write_line(&style("── history ──").dim().to_string())?;
    for line in render(&transcript) {
        term.write_line(&line)?;
    }
    Ok(())
}
