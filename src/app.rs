use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api::{ApiClient, ApiContext, Resource};
use crate::cli::args::{CliArgs, Command};
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::model::parse_field_assignments;
use crate::output::{self, Notice, OutputFormat};
use crate::pagination::PaginationState;
use crate::screen::browse::{render_screen, run_browse, BrowseOptions};
use crate::screen::{ListScreen, DEFAULT_DEBOUNCE};

const DEFAULT_TIMEOUT_SECS: u64 = 15;

fn render_custom_help() -> String {
    let cmd = CliArgs::command();
    let mut out = String::new();

    out.push_str(cmd.get_name());
    if let Some(version) = cmd.get_version() {
        out.push(' ');
        out.push_str(version);
    }
    out.push('\n');

    if let Some(long_about) = cmd.get_long_about().or(cmd.get_about()) {
        out.push('\n');
        out.push_str(&long_about.to_string());
        out.push('\n');
    }

    out.push('\n');
    out.push_str("Usage: ");
    out.push_str(cmd.get_name());
    out.push_str(" [OPTIONS] <COMMAND>\n\n");

    out.push_str("Commands:\n");
    for sub in cmd.get_subcommands() {
        let about = sub.get_about().map(|a| a.to_string()).unwrap_or_default();
        out.push_str(&format!("  {:<12} {}\n", sub.get_name(), about));
    }
    out.push('\n');

    let mut sections: Vec<(String, Vec<&clap::Arg>)> = Vec::new();
    let mut section_idx: HashMap<String, usize> = HashMap::new();

    for arg in cmd.get_arguments() {
        if arg.is_hide_set() {
            continue;
        }
        let heading = arg.get_help_heading().unwrap_or("Options").to_string();
        let idx = match section_idx.get(&heading).copied() {
            Some(i) => i,
            None => {
                sections.push((heading.clone(), Vec::new()));
                let i = sections.len() - 1;
                section_idx.insert(heading, i);
                i
            }
        };
        sections[idx].1.push(arg);
    }

    for (heading, args) in sections {
        out.push_str(&heading);
        out.push_str(":\n");

        for arg in args {
            let mut parts: Vec<String> = Vec::new();
            if let Some(short) = arg.get_short() {
                parts.push(format!("-{short}"));
            }
            if let Some(long) = arg.get_long() {
                parts.push(format!("--{long}"));
            }
            if let Some(aliases) = arg.get_visible_aliases() {
                for alias in aliases {
                    let rendered = format!("--{alias}");
                    if !parts.iter().any(|p| p == &rendered) {
                        parts.push(rendered);
                    }
                }
            }

            let mut flags = parts.join(", ");
            if arg.get_action().takes_values() {
                let value_name = arg
                    .get_value_names()
                    .and_then(|names| names.first())
                    .map(|name| name.as_str())
                    .unwrap_or("VALUE");
                flags.push_str(&format!(" <{value_name}>"));
            }

            out.push_str("  ");
            out.push_str(&flags);
            out.push('\n');

            if let Some(help) = arg.get_help() {
                let help = help.to_string();
                if !help.trim().is_empty() {
                    out.push_str("          ");
                    out.push_str(help.trim());
                    out.push('\n');
                }
            }
            out.push('\n');
        }
    }

    out
}

/// Install the tracing subscriber. `RUST_LOG` wins over the `-v` count.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("stockdesk={level}")));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

#[derive(Clone, Debug)]
struct RunConfig {
    command: Command,
    base_url: Option<String>,
    token: Option<String>,
    timeout: Duration,
    no_color: bool,
    output_format: OutputFormat,
    export_dir: Option<PathBuf>,
    search_debounce: Duration,
    config_path: Option<PathBuf>,
}

impl RunConfig {
    fn color(&self) -> bool {
        !self.no_color
    }

    fn api_client(&self) -> Result<ApiClient, String> {
        let base_url = self.base_url.as_deref().ok_or_else(|| {
            "no API base URL, pass --base-url or set base_url in the config file".to_string()
        })?;
        let ctx = ApiContext::new(base_url, self.token.clone(), self.timeout)
            .map_err(|e| e.to_string())?;
        if ctx.token.is_none() {
            debug!("no bearer token configured, sending anonymous requests");
        }
        ApiClient::new(ctx).map_err(|e| e.to_string())
    }
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = if args.color {
        false
    } else {
        args.no_color || cfg.no_color.unwrap_or(false)
    };

    let output_format_raw = args
        .output_format
        .or(cfg.output_format)
        .unwrap_or_else(|| "text".to_string());
    let output_format = OutputFormat::parse(&output_format_raw)
        .ok_or_else(|| format!("invalid output format '{output_format_raw}'"))?;

    let timeout = args.timeout.or(cfg.timeout).unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout == 0 {
        return Err("invalid timeout, expected positive integer".to_string());
    }

    let base_url = args
        .base_url
        .or(cfg.base_url)
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    let token = args.token.or(cfg.token);
    let export_dir = cfg.export_dir.map(|p| config::expand_tilde(&p));

    let debounce_ms = match &args.command {
        Command::Browse(b) => b.debounce_ms,
        _ => None,
    };
    let search_debounce = debounce_ms
        .or(cfg.search_debounce_ms)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_DEBOUNCE);

    Ok(RunConfig {
        command: args.command,
        base_url,
        token,
        timeout: Duration::from_secs(timeout),
        no_color,
        output_format,
        export_dir,
        search_debounce,
        config_path: args.config.map(|p| config::expand_tilde(&p)),
    })
}

fn resource_arg(raw: &str) -> Result<Resource, String> {
    Resource::parse(raw).ok_or_else(|| format!("unknown resource '{raw}'"))
}

fn write_stdout(bytes: &[u8]) -> Result<(), String> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(bytes)
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
        .map_err(|e| format!("failed to write output: {e}"))
}

fn print_list(run: &RunConfig, screen: &ListScreen) -> Result<(), String> {
    match run.output_format {
        OutputFormat::Json => write_stdout(&output::render_list_json(
            screen.resource(),
            &screen.pagination(),
            screen.records(),
        )),
        OutputFormat::Text => {
            print!("{}", render_screen(screen, run.color()));
            Ok(())
        }
    }
}

/// Reload page 1 after a mutation so the change is visible. A failed reload
/// only produces a notice.
async fn refetch_after_change(run: &RunConfig, client: &ApiClient, resource: Resource) {
    if run.output_format == OutputFormat::Json {
        return;
    }
    let mut screen = ListScreen::new(resource);
    match screen.refresh(client).await {
        Ok(()) => print!("{}", render_screen(&screen, run.color())),
        Err(err) => {
            Notice::error(format!("failed to reload {resource}: {err}")).print(run.color())
        }
    }
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }
    let color = run.color();

    match run.command.clone() {
        Command::Pages(p) => {
            let state = PaginationState::new(p.current, p.total).map_err(|e| e.to_string())?;
            println!("{}", output::render_pagination_bar(&state, color));
        }
        Command::InitConfig => {
            let path = run
                .config_path
                .clone()
                .or_else(config::default_config_path)
                .ok_or_else(|| "cannot determine home directory for config".to_string())?;
            if config::ensure_default_config_file(&path)? {
                Notice::success(format!("wrote {}", path.display())).print(color);
            } else {
                Notice::info(format!("{} already exists", path.display())).print(color);
            }
        }
        Command::List(list) => {
            let resource = resource_arg(&list.resource)?;
            let client = run.api_client()?;
            let mut screen = ListScreen::new(resource)
                .with_page(list.page.unwrap_or(1))
                .with_search(list.search);
            screen
                .refresh(&client)
                .await
                .map_err(|e| format!("failed to load {resource}: {e}"))?;
            print_list(&run, &screen)?;
        }
        Command::Show(show) => {
            let resource = resource_arg(&show.resource)?;
            let client = run.api_client()?;
            let record = client
                .get(resource, show.id.trim())
                .await
                .map_err(|e| e.to_string())?;
            match run.output_format {
                OutputFormat::Json => write_stdout(&output::render_record_json(&record))?,
                OutputFormat::Text => print!("{}", output::render_record(resource, &record)),
            }
        }
        Command::Create(create) => {
            let resource = resource_arg(&create.resource)?;
            let body = parse_field_assignments(&create.fields).map_err(|e| e.to_string())?;
            let client = run.api_client()?;
            let record = client
                .create(resource, &body)
                .await
                .map_err(|e| format!("failed to create {resource}: {e}"))?;
            info!(%resource, id = ?record.id(), "record created");
            if run.output_format == OutputFormat::Json {
                write_stdout(&output::render_record_json(&record))?;
            } else {
                let label = record.id().map(|id| format!(" #{id}")).unwrap_or_default();
                Notice::success(format!("created {resource}{label}")).print(color);
            }
            refetch_after_change(&run, &client, resource).await;
        }
        Command::Update(update) => {
            let resource = resource_arg(&update.resource)?;
            let body = parse_field_assignments(&update.fields).map_err(|e| e.to_string())?;
            let client = run.api_client()?;
            let id = update.id.trim();
            let record = client
                .update(resource, id, &body)
                .await
                .map_err(|e| format!("failed to update {resource} #{id}: {e}"))?;
            if run.output_format == OutputFormat::Json {
                write_stdout(&output::render_record_json(&record))?;
            } else {
                Notice::success(format!("updated {resource} #{id}")).print(color);
            }
            refetch_after_change(&run, &client, resource).await;
        }
        Command::Delete(delete) => {
            let resource = resource_arg(&delete.resource)?;
            let id = delete.id.trim();
            if !delete.yes {
                return Err(format!("refusing to delete {resource} #{id} without --yes"));
            }
            let client = run.api_client()?;
            client
                .delete(resource, id)
                .await
                .map_err(|e| format!("failed to delete {resource} #{id}: {e}"))?;
            Notice::success(format!("deleted {resource} #{id}")).print(color);
            refetch_after_change(&run, &client, resource).await;
        }
        Command::Export(export) => {
            let resource = resource_arg(&export.resource)?;
            let client = run.api_client()?;
            let target = export
                .out
                .map(|p| config::expand_tilde(&p))
                .or_else(|| run.export_dir.clone());
            let path =
                crate::export::export_to_file(&client, resource, target.as_deref(), export.force)
                    .await
                    .map_err(|e| format!("export failed: {e}"))?;
            Notice::success(format!("saved {}", path.display())).print(color);
        }
        Command::Browse(browse) => {
            let resource = resource_arg(&browse.resource)?;
            let client = run.api_client()?;
            let screen = ListScreen::new(resource).with_search(browse.search);
            let opts = BrowseOptions {
                color,
                debounce: run.search_debounce,
            };
            run_browse(&client, screen, opts).await?;
        }
    }
    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => {
                print!("{}", render_custom_help());
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    init_logging(args.verbose);

    let explicit_config = args.config.clone().map(|p| config::expand_tilde(&p));
    let cfg = match explicit_config.as_ref() {
        Some(path) => config::load_config(path, false)?,
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, true)?,
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    fn parse(argv: &[&str]) -> CliArgs {
        CliArgs::parse_from(argv)
    }

    #[test]
    fn cli_values_override_config() {
        let cfg = ConfigFile {
            base_url: Some("http://from-config".to_string()),
            timeout: Some(30),
            output_format: Some("json".to_string()),
            ..Default::default()
        };
        let run = build_run_config(
            parse(&[
                "stockdesk",
                "--base-url",
                "http://from-cli",
                "-o",
                "text",
                "list",
                "arrivals",
            ]),
            cfg,
        )
        .unwrap();
        assert_eq!(run.base_url.as_deref(), Some("http://from-cli"));
        assert_eq!(run.output_format, OutputFormat::Text);
        assert_eq!(run.timeout, Duration::from_secs(30));
    }

    #[test]
    fn defaults_apply_without_config() {
        let run = build_run_config(parse(&["stockdesk", "pages", "1", "8"]), ConfigFile::default())
            .unwrap();
        assert_eq!(run.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(run.output_format, OutputFormat::Text);
        assert_eq!(run.search_debounce, DEFAULT_DEBOUNCE);
        assert!(run.base_url.is_none());
    }

    #[test]
    fn color_flag_beats_config_no_color() {
        let cfg = ConfigFile {
            no_color: Some(true),
            ..Default::default()
        };
        let run = build_run_config(parse(&["stockdesk", "-c", "pages", "1", "1"]), cfg.clone())
            .unwrap();
        assert!(!run.no_color);
        let run = build_run_config(parse(&["stockdesk", "pages", "1", "1"]), cfg).unwrap();
        assert!(run.no_color);
    }

    #[test]
    fn browse_debounce_flag_overrides_config() {
        let cfg = ConfigFile {
            search_debounce_ms: Some(800),
            ..Default::default()
        };
        let run = build_run_config(
            parse(&["stockdesk", "browse", "materials", "--debounce", "50"]),
            cfg.clone(),
        )
        .unwrap();
        assert_eq!(run.search_debounce, Duration::from_millis(50));
        let run = build_run_config(parse(&["stockdesk", "browse", "materials"]), cfg).unwrap();
        assert_eq!(run.search_debounce, Duration::from_millis(800));
    }

    #[test]
    fn missing_base_url_is_reported() {
        let run = build_run_config(parse(&["stockdesk", "list", "arrivals"]), ConfigFile::default())
            .unwrap();
        let err = run.api_client().unwrap_err();
        assert!(err.contains("base URL"));
    }

    #[test]
    fn help_lists_subcommands_and_headings() {
        let help = render_custom_help();
        assert!(help.contains("browse"));
        assert!(help.contains("API:"));
        assert!(help.contains("--base-url"));
    }
}
