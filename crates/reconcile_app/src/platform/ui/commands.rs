//! Typed commands. One line of input becomes one [`Input`].
use std::path::PathBuf;

use reconcile_core::{EntityKind, FileRole, Msg};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Msg(Msg),
    /// Choose (or clear) a file; the shell stats it before building the handle.
    Choose {
        role: FileRole,
        path: Option<PathBuf>,
    },
    /// Select by 1-based position in the currently shown list.
    Pick { kind: EntityKind, index: usize },
    Help,
    Quit,
    Invalid(String),
}

pub const HELP: &str = "\
Commands:
  crystal <path>     choose the Crystal export (no path clears it)
  query <path>       choose the Query export (no path clears it)
  upload             process both files
  cancel             cancel the running upload
  prof <name|#n>     select a professional (no argument clears)
  user <name|#n>     select a user (no argument clears)
  search             show the selection, or the Query user validation if none
  back               return to the global report
  download           save the current entity's report file
  ok                 dismiss notices
  help               show this text
  quit               leave";

pub fn parse_command(line: &str) -> Input {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let argument = (!rest.is_empty()).then(|| rest.to_string());

    match verb.to_ascii_lowercase().as_str() {
        "" => Input::Msg(Msg::NoOp),
        "crystal" => Input::Choose {
            role: FileRole::Crystal,
            path: argument.map(|p| PathBuf::from(unquote(&p))),
        },
        "query" => Input::Choose {
            role: FileRole::Query,
            path: argument.map(|p| PathBuf::from(unquote(&p))),
        },
        "upload" | "process" => Input::Msg(Msg::UploadClicked),
        "cancel" => Input::Msg(Msg::CancelClicked),
        "prof" | "professional" => select(EntityKind::Professional, argument),
        "user" => select(EntityKind::User, argument),
        "search" => Input::Msg(Msg::SearchClicked),
        "back" => Input::Msg(Msg::BackClicked),
        "download" => Input::Msg(Msg::DownloadClicked),
        "ok" | "dismiss" => Input::Msg(Msg::NoticesAcknowledged),
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => Input::Invalid(format!("Unknown command {other:?}. Type `help`.")),
    }
}

fn select(kind: EntityKind, argument: Option<String>) -> Input {
    let Some(argument) = argument else {
        return Input::Msg(selection_msg(kind, None));
    };
    if let Some(position) = argument.strip_prefix('#') {
        return match position.parse::<usize>() {
            Ok(index) if index > 0 => Input::Pick { kind, index },
            _ => Input::Invalid(format!("{argument:?} is not a list position.")),
        };
    }
    Input::Msg(selection_msg(kind, Some(unquote(&argument).to_string())))
}

pub fn selection_msg(kind: EntityKind, name: Option<String>) -> Msg {
    match kind {
        EntityKind::Professional => Msg::ProfessionalSelected(name),
        EntityKind::User => Msg::UserSelected(name),
    }
}

fn unquote(raw: &str) -> &str {
    raw.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw)
}
