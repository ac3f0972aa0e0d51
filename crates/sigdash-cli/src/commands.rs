//! Line commands accepted by `sigdash watch`.

use std::fmt;

/// One command typed at the watch prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCommand {
    /// `search=btc`, `type=buy`, `start_date=2024-01-01`, ...
    SetField { name: String, value: String },
    /// `page 3`
    Page(u32),
    Next,
    Previous,
    /// Run the current filter now instead of waiting for the debounce.
    Apply,
    Reset,
    Refresh,
    /// `detail <id>`
    Detail(String),
    CloseDetail,
    Theme,
    Help,
    Quit,
}

/// Reason a line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCommandError(pub String);

impl fmt::Display for ParseCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseCommandError {}

pub const WATCH_HELP: &str = "\
commands:
  <field>=<value>   edit a filter (search, type, strategy, exchange, start_date, end_date)
  page <n>          jump to page n
  next | prev       step one page
  apply             run the filter now
  reset             clear all filters
  refresh           reload the list and dashboard
  detail <id>       show one signal
  close             hide the detail view
  theme             cycle auto/dark/light
  help | quit";

impl WatchCommand {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Result<Self, ParseCommandError>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if let Some((name, value)) = line.split_once('=') {
            let name = name.trim();
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Some(Err(ParseCommandError(format!("bad filter edit: {line}"))));
            }
            return Some(Ok(Self::SetField {
                name: name.to_string(),
                value: value.trim().to_string(),
            }));
        }

        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default().to_ascii_lowercase();
        let arg = words.next();

        let command = match (verb.as_str(), arg) {
            ("page" | "p", Some(n)) => match n.parse::<u32>() {
                Ok(n) => Self::Page(n),
                Err(_) => return Some(Err(ParseCommandError(format!("not a page number: {n}")))),
            },
            ("page" | "p", None) => {
                return Some(Err(ParseCommandError("page needs a number".to_string())))
            }
            ("next" | "n", _) => Self::Next,
            ("prev" | "previous", _) => Self::Previous,
            ("apply" | "search", None) => Self::Apply,
            ("reset", _) => Self::Reset,
            ("refresh" | "r", _) => Self::Refresh,
            ("detail" | "d", Some(id)) => Self::Detail(id.to_string()),
            ("detail" | "d", None) => {
                return Some(Err(ParseCommandError("detail needs a signal id".to_string())))
            }
            ("close", _) => Self::CloseDetail,
            ("theme", _) => Self::Theme,
            ("help" | "?", _) => Self::Help,
            ("quit" | "q" | "exit", _) => Self::Quit,
            _ => return Some(Err(ParseCommandError(format!("unknown command: {line}")))),
        };
        Some(Ok(command))
    }
}
