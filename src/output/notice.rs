use colored::Colorize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

/// A one-line status message shown after an action (save, delete, failed fetch).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }

    fn tag(&self) -> &'static str {
        match self.kind {
            NoticeKind::Success => "OK ",
            NoticeKind::Error => "ERR",
            NoticeKind::Info => "INF",
        }
    }

    pub fn render(&self, color: bool) -> String {
        if !color {
            return format!("[{}] {}", self.tag(), self.message);
        }
        let tag = match self.kind {
            NoticeKind::Success => self.tag().bold().green(),
            NoticeKind::Error => self.tag().bold().red(),
            NoticeKind::Info => self.tag().bold().cyan(),
        };
        format!(
            "{}{}{} {}",
            "[".bold().white(),
            tag,
            "]".bold().white(),
            self.message.bold().white()
        )
    }

    /// Errors go to stderr, everything else to stdout.
    pub fn print(&self, color: bool) {
        match self.kind {
            NoticeKind::Error => eprintln!("{}", self.render(color)),
            _ => println!("{}", self.render(color)),
        }
    }
}
