use std::time::Duration;

use colored::Colorize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use super::debounce::debounce;
use super::ListScreen;
use crate::api::ApiClient;
use crate::output::{render_pagination_bar, render_table, Notice};
use crate::pagination::parse_one_based_page;

const HELP: &str = "commands: n (next)  p (prev)  g N / N (go to page)  /TEXT (search, '/' clears)  r (reload)  q (quit)";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BrowseCommand {
    Next,
    Previous,
    GoTo(usize),
    Search(String),
    Refresh,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Option<BrowseCommand> {
    let line = line.trim();
    if let Some(search) = line.strip_prefix('/') {
        return Some(BrowseCommand::Search(search.trim().to_string()));
    }
    let mut parts = line.split_whitespace();
    let head = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts.next();
    if parts.next().is_some() {
        return None;
    }
    match (head.as_str(), arg) {
        ("n" | "next", None) => Some(BrowseCommand::Next),
        ("p" | "prev" | "previous", None) => Some(BrowseCommand::Previous),
        ("g" | "go" | "goto", Some(page)) => {
            parse_one_based_page(Some(page)).map(BrowseCommand::GoTo)
        }
        ("r" | "reload", None) => Some(BrowseCommand::Refresh),
        ("h" | "help" | "?", None) => Some(BrowseCommand::Help),
        ("q" | "quit" | "exit", None) => Some(BrowseCommand::Quit),
        (page, None) if !page.is_empty() => {
            parse_one_based_page(Some(page)).map(BrowseCommand::GoTo)
        }
        _ => None,
    }
}

/// Render the header, table and pagination bar for a list screen.
pub fn render_screen(screen: &ListScreen, color: bool) -> String {
    let state = screen.pagination();
    let mut header = format!(
        "{} | page {}/{}",
        screen.resource().title(),
        state.current_page(),
        state.total_pages()
    );
    if let Some(search) = screen.search() {
        header.push_str(&format!(" | search: \"{search}\""));
    }
    let header = if color {
        header.bold().to_string()
    } else {
        header
    };

    let mut out = String::new();
    out.push_str(&header);
    out.push_str("\n\n");
    out.push_str(&render_table(screen.resource(), screen.records()));
    out.push('\n');
    out.push_str(&render_pagination_bar(&state, color));
    out.push('\n');
    out
}

#[derive(Clone, Copy, Debug)]
pub struct BrowseOptions {
    pub color: bool,
    pub debounce: Duration,
}

async fn reload(client: &ApiClient, screen: &mut ListScreen, color: bool) {
    if let Err(err) = screen.refresh(client).await {
        Notice::error(format!("failed to load {}: {err}", screen.resource())).print(color);
    }
    print!("{}", render_screen(screen, color));
}

async fn prompt() {
    let mut stdout = tokio::io::stdout();
    let _ = stdout.write_all(b"> ").await;
    let _ = stdout.flush().await;
}

/// Interactive list browsing over stdin. Search input is debounced; every
/// other command acts immediately.
pub async fn run_browse(
    client: &ApiClient,
    mut screen: ListScreen,
    opts: BrowseOptions,
) -> Result<(), String> {
    let (search_tx, search_rx) = mpsc::channel::<String>(16);
    let mut searches = debounce(opts.debounce, search_rx);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    reload(client, &mut screen, opts.color).await;
    println!("{HELP}");

    loop {
        prompt().await;
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => return Err(format!("failed to read input: {e}")),
                };
                let command = match parse_command(&line) {
                    Some(command) => command,
                    None if line.trim().is_empty() => continue,
                    None => {
                        Notice::error(format!("unknown command '{}'", line.trim())).print(opts.color);
                        continue;
                    }
                };
                debug!(?command, "browse command");
                match command {
                    BrowseCommand::Quit => break,
                    BrowseCommand::Help => println!("{HELP}"),
                    BrowseCommand::Refresh => reload(client, &mut screen, opts.color).await,
                    BrowseCommand::Search(text) => {
                        if search_tx.send(text).await.is_err() {
                            return Err("search channel closed".to_string());
                        }
                    }
                    BrowseCommand::Next => {
                        if screen.next() {
                            reload(client, &mut screen, opts.color).await;
                        } else {
                            Notice::info("already on the last page").print(opts.color);
                        }
                    }
                    BrowseCommand::Previous => {
                        if screen.previous() {
                            reload(client, &mut screen, opts.color).await;
                        } else {
                            Notice::info("already on the first page").print(opts.color);
                        }
                    }
                    BrowseCommand::GoTo(page) => {
                        if screen.go_to(page) {
                            reload(client, &mut screen, opts.color).await;
                        } else {
                            let total = screen.pagination().total_pages();
                            Notice::info(format!("page {page} not available (1..={total})")).print(opts.color);
                        }
                    }
                }
            }
            Some(text) = searches.recv() => {
                if screen.set_search(&text) {
                    reload(client, &mut screen, opts.color).await;
                }
            }
        }
    }
    Ok(())
}
