mod tui;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use nursejobs::config::{Config, StoreKind};
use nursejobs::db::Database;
use nursejobs::fetch::{records_from_json, BackendClient, RecordSource};
use nursejobs::filter::FilterState;
use nursejobs::models::{Record, View};
use nursejobs::paginate::PageItem;
use nursejobs::session::FilterSession;
use nursejobs::store::{CookieJar, FilterStore, StoreBackend};

#[derive(Parser)]
#[command(name = "nursejobs")]
#[command(about = "Filter and page nurse job board candidates and jobs")]
struct Cli {
    /// Log more detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the local database
    Init,

    /// Fetch a view's records from the backend
    Fetch {
        /// View to fetch
        view: View,
    },

    /// Load a view's records from a JSON file
    Import {
        /// View to load into
        view: View,

        /// JSON array (or backend response) file
        file: PathBuf,
    },

    /// List a page of filtered records
    List {
        /// View to list
        view: View,

        #[command(flatten)]
        filters: FilterArgs,

        /// Page to show
        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Save the filters for this view (the Search action)
        #[arg(long)]
        save: bool,
    },

    /// Browse a view interactively
    Browse {
        /// View to browse
        view: View,
    },

    /// Manage stored filters
    Filters {
        #[command(subcommand)]
        command: FilterCommands,
    },

    /// Show snapshot freshness for every view
    Status,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum FilterCommands {
    /// Show stored filters
    Show {
        /// View whose filters to show
        view: View,
    },

    /// Remove stored filters
    Clear {
        /// View whose filters to clear
        view: View,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the active configuration
    Show,

    /// Set the backend base URL
    SetBackend {
        /// Base URL, e.g. https://backend.example.com/api
        url: String,
    },
}

/// Filters given on the command line; each one replaces the stored value.
#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Keyword in name, title, qualification or job type
    #[arg(short, long)]
    search: Option<String>,

    /// Location substring
    #[arg(short, long)]
    location: Option<String>,

    /// Job type (repeatable), e.g. "Full Time"
    #[arg(long = "job-type")]
    job_types: Vec<String>,

    /// Shift (repeatable), e.g. "Night"
    #[arg(long = "shift")]
    shifts: Vec<String>,

    /// Role category (repeatable)
    #[arg(long = "role")]
    roles: Vec<String>,

    /// Experience bucket (repeatable), e.g. "Above 5 years"
    #[arg(long = "experience")]
    experience: Vec<String>,

    /// Visa or residency status (repeatable)
    #[arg(long = "visa")]
    visa: Vec<String>,

    /// Minimum pay rate
    #[arg(long)]
    pay_rate: Option<f64>,
}

impl FilterArgs {
    fn is_empty(&self) -> bool {
        self.search.is_none()
            && self.location.is_none()
            && self.job_types.is_empty()
            && self.shifts.is_empty()
            && self.roles.is_empty()
            && self.experience.is_empty()
            && self.visa.is_empty()
            && self.pay_rate.is_none()
    }

    fn apply_to(&self, state: &mut FilterState) {
        if let Some(search) = &self.search {
            state.search = search.clone();
        }
        if let Some(location) = &self.location {
            state.location = location.clone();
        }
        if !self.job_types.is_empty() {
            state.job_types = self.job_types.iter().cloned().collect();
        }
        if !self.shifts.is_empty() {
            state.shifts = self.shifts.iter().cloned().collect();
        }
        if !self.roles.is_empty() {
            state.role_categories = self.roles.iter().cloned().collect();
        }
        if !self.experience.is_empty() {
            state.experience_labels = self.experience.iter().cloned().collect();
        }
        if !self.visa.is_empty() {
            state.visa_statuses = self.visa.iter().cloned().collect();
        }
        if let Some(pay_rate) = self.pay_rate {
            state.pay_rate = pay_rate.max(0.0);
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "nursejobs=debug" } else { "nursejobs=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn open_store<'a>(config: &Config, db: &'a Database) -> Result<FilterStore<Box<dyn StoreBackend + 'a>>> {
    let backend: Box<dyn StoreBackend + 'a> = match config.store {
        StoreKind::Cookie => {
            let path = Config::cookie_jar_path();
            Box::new(
                CookieJar::open(&path)
                    .with_context(|| format!("Failed to open filter cookies: {}", path.display()))?,
            )
        }
        StoreKind::Sqlite => {
            let purged = db.purge_expired_prefs()?;
            if purged > 0 {
                debug!(purged, "Dropped expired filter preferences");
            }
            Box::new(db.prefs())
        }
    };
    Ok(FilterStore::with_expiry_days(backend, config.filter_expiry_days))
}

fn open_session<'a>(
    config: &Config,
    db: &'a Database,
    view: View,
) -> Result<FilterSession<Box<dyn StoreBackend + 'a>>> {
    let records = db.load_snapshot(view)?;
    let store = open_store(config, db)?;
    let session = FilterSession::open(view, records, store, config.items_per_page, config.debounce())?;
    Ok(session)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load().context("Failed to load configuration")?;
    let db = Database::open()?;

    match cli.command {
        Commands::Init => {
            db.init()?;
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Fetch { view } => {
            db.ensure_initialized()?;
            let token = config.token()?;
            let client = BackendClient::new(&config.backend_url, &token, config.request_timeout())?;

            println!("Fetching {} from {}...", view, client.url_for(view));
            let records = client
                .fetch_records(view)
                .with_context(|| format!("Failed to fetch {}", view))?;
            let count = db.replace_snapshot(view, &records)?;
            println!("Stored {} record(s) for {}", count, view);
        }

        Commands::Import { view, file } => {
            db.ensure_initialized()?;
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read records file: {}", file.display()))?;
            let records = records_from_json(view, &content)
                .with_context(|| format!("Failed to parse records file: {}", file.display()))?;
            let count = db.replace_snapshot(view, &records)?;
            println!("Imported {} record(s) into {}", count, view);
        }

        Commands::List {
            view,
            filters,
            page,
            save,
        } => {
            db.ensure_initialized()?;
            let mut session = open_session(&config, &db, view)?;
            if !filters.is_empty() {
                session.update(|state| filters.apply_to(state));
            }
            if save {
                session.search()?;
                println!("Saved filters for {}", view);
            }
            if session.records().is_empty() {
                println!("No records for {}. Run 'nursejobs fetch {}' first.", view, view);
                return Ok(());
            }
            if page != 1 && !session.go_to_page(page) {
                return Err(anyhow!(
                    "Page {} is out of range (1-{})",
                    page,
                    session.pager().total_pages().max(1)
                ));
            }

            for line in session.state().summary() {
                println!("  {}", line);
            }
            let first = (session.pager().current_page() - 1) * session.pager().items_per_page();
            print_page(view, session.page(), first);
            println!(
                "\n{} of {} record(s) match",
                session.filtered().len(),
                session.records().len()
            );
            let bar = page_bar(&session.visible_pages(), session.pager().current_page());
            if !bar.is_empty() {
                println!("Pages: {}", bar);
            }
            let pager = session.pager();
            if pager.has_next() {
                println!(
                    "Next: nursejobs list {} --page {}",
                    view,
                    pager.current_page() + 1
                );
            } else if pager.has_prev() {
                println!("Last page.");
            }
        }

        Commands::Browse { view } => {
            db.ensure_initialized()?;
            let session = open_session(&config, &db, view)?;
            tui::run_browse(session)?;
        }

        Commands::Filters { command } => {
            db.ensure_initialized()?;
            let mut store = open_store(&config, &db)?;
            match command {
                FilterCommands::Show { view } => {
                    let state = store.load(view)?;
                    let summary = state.summary();
                    if summary.is_empty() {
                        println!("No stored filters for {}.", view);
                    } else {
                        println!("Stored filters for {}:", view);
                        for line in summary {
                            println!("  {}", line);
                        }
                    }
                }

                FilterCommands::Clear { view } => {
                    store.clear(view)?;
                    println!("Cleared stored filters for {}.", view);
                }
            }
        }

        Commands::Status => {
            db.ensure_initialized()?;
            println!("{:<12} {:>8} {:<20}", "VIEW", "RECORDS", "FETCHED");
            println!("{}", "-".repeat(42));
            for view in View::ALL {
                match db.snapshot_info(view)? {
                    Some(info) => println!("{:<12} {:>8} {:<20}", view, info.records, info.fetched_at),
                    None => println!("{:<12} {:>8} {:<20}", view, 0, "never"),
                }
            }
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                println!("Config file: {}", Config::config_path().display());
                println!("{}", serde_json::to_string_pretty(&config)?);
            }

            ConfigCommands::SetBackend { url } => {
                let mut config = config;
                config.set_backend_url(&url)?;
                config.save()?;
                println!("Backend set to {}", config.backend_url);
            }
        },
    }

    Ok(())
}

/// `first` is the zero-based position of `records[0]` in the filtered list.
fn print_page(view: View, records: &[Record], first: usize) {
    if records.is_empty() {
        println!("No matching records.");
        return;
    }
    let fields = view.fields();
    println!(
        "{:<5} {:<10} {:<32} {:<22} {:<16} {:>8}",
        "#", "ID", "TITLE", "LOCATION", "EXPERIENCE", "PAY"
    );
    println!("{}", "-".repeat(98));
    for (i, record) in records.iter().enumerate() {
        let pay = record
            .number(fields.pay)
            .map(|p| format!("${}", p))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<5} {:<10} {:<32} {:<22} {:<16} {:>8}",
            first + i + 1,
            truncate(&record.id().unwrap_or_default(), 10),
            truncate(&fields.title(record), 30),
            truncate(&record.text(fields.location).unwrap_or_default(), 20),
            truncate(&record.text(fields.experience).unwrap_or_default(), 14),
            pay
        );
    }
}

fn page_bar(items: &[PageItem], current: usize) -> String {
    items
        .iter()
        .map(|item| match item {
            PageItem::Page(n) if *n == current => format!("[{}]", n),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
