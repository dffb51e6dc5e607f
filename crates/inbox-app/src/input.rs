use inbox_session::Command;

/// One line typed at the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Anything that is not a slash command goes to the search box
    Search(String),
    Open(usize),
    Remark { user_name: String, remark: String },
    ShowRemark(String),
    Pause,
    Resume,
    Reload,
    DismissBanner,
    Print,
    Help,
    Quit,
}

pub const HELP: &str = "\
  <text>                search (empty line clears)
  /open <n>             open row n and mark it read
  /remark <user>=<text> set a display name for a sender
  /whois <user>         show the remark for a sender
  /pause, /resume       leave or re-enter the inbox
  /reload               reload from the store
  /dismiss              hide the new-message banner
  /list                 print the inbox
  /quit";

pub fn parse(line: &str) -> Result<Input, String> {
    let Some(rest) = line.trim_end_matches(['\r', '\n']).strip_prefix('/') else {
        return Ok(Input::Search(line.trim_end_matches(['\r', '\n']).to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest.trim(), ""),
    };

    match name {
        "open" => arg
            .parse()
            .map(Input::Open)
            .map_err(|_| format!("not a row number: '{}'", arg)),
        "remark" => {
            let (user, remark) = arg
                .split_once('=')
                .ok_or_else(|| "usage: /remark <user>=<text>".to_string())?;
            let user = user.trim();
            if user.is_empty() {
                return Err("usage: /remark <user>=<text>".into());
            }
            Ok(Input::Remark {
                user_name: user.to_string(),
                remark: remark.trim().to_string(),
            })
        }
        "whois" if !arg.is_empty() => Ok(Input::ShowRemark(arg.to_string())),
        "whois" => Err("usage: /whois <user>".into()),
        "pause" => Ok(Input::Pause),
        "resume" => Ok(Input::Resume),
        "reload" => Ok(Input::Reload),
        "dismiss" => Ok(Input::DismissBanner),
        "list" => Ok(Input::Print),
        "help" => Ok(Input::Help),
        "quit" | "exit" => Ok(Input::Quit),
        other => Err(format!("unknown command '/{}', try /help", other)),
    }
}

impl Input {
    /// Session command for inputs that are forwarded as-is.
    pub fn into_command(self) -> Option<Command> {
        Some(match self {
            Self::Search(text) => Command::SearchInput(text),
            Self::Open(index) => Command::OpenMessage(index),
            Self::Remark { user_name, remark } => Command::SaveRemark { user_name, remark },
            Self::Pause => Command::Deactivate,
            Self::Resume => Command::Activate,
            Self::Reload => Command::Reload,
            Self::DismissBanner => Command::DismissBanner,
            Self::Quit => Command::Shutdown,
            Self::ShowRemark(_) | Self::Print | Self::Help => return None,
        })
    }
}
