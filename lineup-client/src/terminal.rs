//! Text rendering and line commands for the terminal front end.

use lineup_flow::{ExecutionResult, ExecutionStatus, FlowSnapshot, StageTag};
use std::path::Path;

/// One line typed while reviewing. Artist numbers are 1-based on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewCommand {
    SetEventName(String),
    UpdateArtist { index: usize, text: String },
    RemoveArtist { index: usize },
    Confirm,
    Cancel,
    Help,
}

impl ReviewCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb.to_ascii_lowercase().as_str() {
            "event" => Ok(ReviewCommand::SetEventName(rest.to_string())),
            "set" => {
                let (number, text) = rest
                    .split_once(char::is_whitespace)
                    .map(|(number, text)| (number, text.trim()))
                    .unwrap_or((rest, ""));
                Ok(ReviewCommand::UpdateArtist {
                    index: artist_index(number)?,
                    text: text.to_string(),
                })
            }
            "rm" | "remove" => Ok(ReviewCommand::RemoveArtist {
                index: artist_index(rest)?,
            }),
            "ok" | "confirm" => Ok(ReviewCommand::Confirm),
            "cancel" => Ok(ReviewCommand::Cancel),
            "help" | "?" => Ok(ReviewCommand::Help),
            "" => Err("empty command".to_string()),
            other => Err(format!("unknown command `{}`", other)),
        }
    }
}

fn artist_index(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(number) if number >= 1 => Ok(number - 1),
        _ => Err(format!("`{}` is not an artist number", raw.trim())),
    }
}

pub const REVIEW_HELP: &str = "\
Commands:
  event <name>      rename the event
  set <n> <name>    replace artist n
  rm <n>            remove artist n
  ok                create the playlist
  cancel            discard this lineup
  help              show this list";

/// Renders the parts of a snapshot the user should see right now.
pub fn render(snapshot: &FlowSnapshot) -> String {
    let mut out = String::new();

    if snapshot.loading {
        out.push_str("Loading...\n");
        return out;
    }
    if let Some(greeting) = snapshot.session.greeting() {
        out.push_str(&greeting);
        out.push('\n');
    }

    match snapshot.stage {
        StageTag::Uploading => out.push_str("Uploading image...\n"),
        StageTag::Extracting => out.push_str("Extracting artists...\n"),
        StageTag::CreatingPlaylist => out.push_str("Creating playlist...\n"),
        _ => {}
    }

    if let Some(review) = &snapshot.review {
        out.push_str(&format!("Event: {}\n", review.event_name));
        out.push_str(&format!("Artists ({}):\n", review.artists.len()));
        for (i, artist) in review.artists.iter().enumerate() {
            out.push_str(&format!("  {:>2}. {}\n", i + 1, artist));
        }
        if review.artists.is_empty() {
            out.push_str("  No artists remaining. Upload a new image to try again.\n");
        }
        if !snapshot.can_confirm {
            out.push_str("(confirmation disabled: needs an event name and at least one artist)\n");
        }
    }

    if let Some(playlist) = &snapshot.playlist {
        out.push_str(&format!("Playlist created: {}\n", playlist.playlist_name));
        out.push_str(&playlist.summary());
        out.push('\n');
        if !playlist.artists_found.is_empty() {
            out.push_str(&format!("Artists: {}\n", playlist.artists_found.join(", ")));
        }
        out.push_str(&format!("Open: {}\n", playlist.playlist_url));
    }

    if let Some(error) = &snapshot.error {
        out.push_str(&format!("Error: {}\n", error.message));
    }

    out
}

/// Turns a failed remote step into an error carrying the banner text, so the
/// process exits non-zero. A superseded attempt counts as failed too.
pub fn ensure_succeeded(result: &ExecutionResult) -> anyhow::Result<()> {
    match &result.status {
        ExecutionStatus::WaitingForInput | ExecutionStatus::Completed => Ok(()),
        ExecutionStatus::Failed(message) => anyhow::bail!("{}", message),
        ExecutionStatus::Superseded => {
            anyhow::bail!("attempt {} was superseded", result.attempt)
        }
    }
}

/// Mime hint from the file extension. Unknown extensions send no hint.
pub fn mime_hint_for(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "heic" => "image/heic",
        "pdf" => "application/pdf",
        _ => return None,
    };
    Some(mime.to_string())
}
