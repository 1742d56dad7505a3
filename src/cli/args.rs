use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "stockdesk",
    version,
    about = "terminal admin client for warehouse inventory APIs",
    long_about = "stockdesk lists, edits and exports warehouse records (arrivals, kitchen stock, materials, suppliers, foremen, payments, expenses) through the inventory REST API.\n\nExamples:\n  stockdesk list arrivals --page 2\n  stockdesk create suppliers name=Acme phone=@5550100\n  stockdesk export payments --out ./reports/\n  stockdesk browse materials\n\nTip: Use init-config to write ~/.stockdesk/config.yml and keep invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv). RUST_LOG overrides."
    )]
    pub verbose: u8,

    #[arg(
        short = 'n',
        long = "no-color",
        global = true,
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'c',
        long = "color",
        global = true,
        help_heading = "Output",
        help = "Force colored output (overrides --no-color)."
    )]
    pub color: bool,

    #[arg(
        short = 'o',
        long = "output-format",
        visible_alias = "of",
        value_name = "FORMAT",
        global = true,
        help_heading = "Output",
        help = "Output format (text or json)."
    )]
    pub output_format: Option<String>,

    #[arg(
        short = 'u',
        long = "base-url",
        visible_alias = "url",
        value_name = "URL",
        global = true,
        help_heading = "API",
        help = "Base URL of the inventory API (e.g. https://warehouse.example.com/api)."
    )]
    pub base_url: Option<String>,

    #[arg(
        long = "token",
        value_name = "TOKEN",
        env = "STOCKDESK_TOKEN",
        hide_env_values = true,
        global = true,
        help_heading = "API",
        help = "Bearer token sent with every request."
    )]
    pub token: Option<String>,

    #[arg(
        short = 'T',
        long = "timeout",
        value_name = "SECONDS",
        global = true,
        help_heading = "API",
        help = "Per-request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'C',
        long = "config",
        visible_alias = "cfg",
        value_name = "FILE",
        global = true,
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.stockdesk/config.yml)."
    )]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List one page of a resource.
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// Show a single record.
    Show(RecordArgs),

    /// Create a record from FIELD=VALUE pairs.
    #[command(visible_alias = "add")]
    Create(CreateArgs),

    /// Update a record from FIELD=VALUE pairs.
    #[command(visible_alias = "edit")]
    Update(UpdateArgs),

    /// Delete a record.
    #[command(visible_alias = "rm")]
    Delete(DeleteArgs),

    /// Download the server-generated Excel export of a resource.
    Export(ExportArgs),

    /// Browse a resource interactively (n/p/g N//search/q).
    Browse(BrowseArgs),

    /// Print the pagination bar for a page position (offline).
    Pages(PagesArgs),

    /// Write a commented default config file if none exists.
    InitConfig,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[arg(value_name = "RESOURCE", help = "arrivals, kitchen, materials, suppliers, foremen, payments or expenses.")]
    pub resource: String,

    #[arg(short = 'p', long = "page", value_name = "N", help = "Page to fetch (1-based).")]
    pub page: Option<usize>,

    #[arg(short = 's', long = "search", value_name = "TEXT", help = "Server-side search text.")]
    pub search: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RecordArgs {
    #[arg(value_name = "RESOURCE")]
    pub resource: String,

    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    #[arg(value_name = "RESOURCE")]
    pub resource: String,

    #[arg(
        value_name = "FIELD=VALUE",
        required = true,
        num_args = 1..,
        help = "Fields for the request body; prefix a value with @ to keep it a string."
    )]
    pub fields: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    #[arg(value_name = "RESOURCE")]
    pub resource: String,

    #[arg(value_name = "ID")]
    pub id: String,

    #[arg(value_name = "FIELD=VALUE", required = true, num_args = 1..)]
    pub fields: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    #[arg(value_name = "RESOURCE")]
    pub resource: String,

    #[arg(value_name = "ID")]
    pub id: String,

    #[arg(short = 'y', long = "yes", help = "Confirm the deletion.")]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    #[arg(value_name = "RESOURCE")]
    pub resource: String,

    #[arg(
        long = "out",
        value_name = "PATH",
        help = "Output file or directory (defaults to export_dir or the current directory)."
    )]
    pub out: Option<String>,

    #[arg(short = 'f', long = "force", help = "Overwrite an existing file.")]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct BrowseArgs {
    #[arg(value_name = "RESOURCE")]
    pub resource: String,

    #[arg(short = 's', long = "search", value_name = "TEXT", help = "Initial search text.")]
    pub search: Option<String>,

    #[arg(
        long = "debounce",
        value_name = "MS",
        help = "Quiet period before a search is sent, in milliseconds."
    )]
    pub debounce_ms: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct PagesArgs {
    #[arg(value_name = "CURRENT")]
    pub current: usize,

    #[arg(value_name = "TOTAL")]
    pub total: usize,
}
