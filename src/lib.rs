pub mod api;
pub mod calendar;
pub mod config;
pub mod filter;
pub mod format;
pub mod links;
pub mod models;
pub mod store;
mod utils;
pub mod view;

use std::{fs, path::PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use reqwest::Url;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use api::{ApiClient, EventSource};
use calendar::CalendarEntry;
use config::{AppConfig, ConfigStore};
use filter::{FilterCriteria, Price, DEFAULT_CATEGORIES};
use links::{Coordinates, Launcher, SystemLauncher};
use models::Event;
use store::{DetailState, EventStore, FetchStatus, Snapshot};

/// Everything a screen needs: configuration, the data source, the store and
/// a way to hand links to the OS.
pub struct App<S, L> {
    config: AppConfig,
    source: S,
    store: EventStore,
    launcher: L,
    export_dir: PathBuf,
}

impl<S: EventSource, L: Launcher> App<S, L> {
    pub fn new(config: AppConfig, source: S, launcher: L, export_dir: PathBuf) -> Self {
        Self {
            config,
            source,
            store: EventStore::new(),
            launcher,
            export_dir,
        }
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    /// Re-fetches the list regardless of current state.
    pub async fn refresh(&self) -> FetchStatus {
        self.store.load_all(&self.source).await
    }

    /// Loads the list the first time it is needed, like the list screen does
    /// on mount.
    async fn loaded(&self) -> Result<Snapshot> {
        if self.store.status() == FetchStatus::Idle {
            self.store.load_all(&self.source).await;
        }
        let snapshot = self.store.snapshot();
        if let Some(message) = snapshot.error() {
            if snapshot.events.is_empty() {
                bail!("{message}");
            }
            warn!(%message, "showing previously loaded events");
        }
        Ok(snapshot)
    }

    pub async fn list_events(&self, criteria: &FilterCriteria) -> Result<Vec<Event>> {
        Ok(self.loaded().await?.visible(criteria))
    }

    pub async fn list_categories(&self) -> Result<Vec<String>> {
        let snapshot = self.loaded().await?;
        let mut found = filter::categories(&snapshot.events);
        if found.is_empty() {
            found = DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect();
        }
        Ok(found)
    }

    pub async fn event(&self, id: i64) -> Result<Event> {
        self.loaded()
            .await?
            .find(id)
            .cloned()
            .ok_or_else(|| anyhow!("no event with id {id}"))
    }

    /// The base event plus whatever the detail endpoint returned. A failed
    /// detail fetch is reported in the state, never as an error.
    pub async fn event_detail(&self, id: i64) -> Result<(Event, DetailState)> {
        let event = self.event(id).await?;
        let detail = self.store.load_detail(&self.source, id).await;
        Ok((event, detail))
    }

    pub async fn open_event_page(&self, id: i64) -> Result<Url> {
        let event = self.event(id).await?;
        let url = links::event_page_url(&self.config.site_base_url, &event);
        Ok(links::open_validated(&self.launcher, "event page", url)?)
    }

    pub async fn buy_ticket(&self, id: i64) -> Result<Url> {
        let event = self.event(id).await?;
        Ok(links::open_validated(
            &self.launcher,
            "ticket page",
            links::ticket_url(&event),
        )?)
    }

    pub async fn open_map(&self, id: i64) -> Result<Coordinates> {
        let event = self.event(id).await?;
        let from_detail = match self.store.load_detail(&self.source, id).await {
            DetailState::Loaded(detail) => Coordinates::from_detail(&detail).ok(),
            _ => None,
        };
        let coords = match from_detail {
            Some(coords) => coords,
            None => Coordinates::from_event(&event).map_err(|err| {
                warn!(id, %err, "map unavailable");
                err
            })?,
        };
        links::open_validated(&self.launcher, "map", coords.map_url())?;
        Ok(coords)
    }

    /// Writes an `.ics` for the event and hands it to the calendar app.
    pub async fn add_to_calendar(&self, id: i64) -> Result<PathBuf> {
        let event = self.event(id).await?;
        let page = links::event_page_url(&self.config.site_base_url, &event)
            .ok()
            .map(String::from);
        let entry = match self.store.load_detail(&self.source, id).await {
            DetailState::Loaded(detail) => CalendarEntry::from_detail(&detail, page)?,
            _ => CalendarEntry::from_event(&event, page)?,
        };

        let path = self.export_dir.join(format!("etkinlik-{id}.ics"));
        utils::ensure_parent(&path);
        fs::write(&path, entry.to_ics())
            .with_context(|| format!("unable to write calendar file {}", path.display()))?;
        self.launcher.open_path(&path)?;
        Ok(path)
    }
}

#[derive(Debug, Parser)]
#[command(name = "culture-events", version, about = "Browse İzmir cultural events")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List events, optionally filtered
    List(ListArgs),
    /// Show the categories present in the current list
    Categories,
    /// Show one event with its formatted dates and extra info
    Show { id: i64 },
    /// Open the event's page in the browser
    Open { id: i64 },
    /// Open the ticket purchase page
    Tickets { id: i64 },
    /// Open the venue on a map
    Map { id: i64 },
    /// Export the event to the calendar
    Calendar { id: i64 },
    /// Update the saved configuration
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Case-insensitive text matched against event names
    #[arg(short, long, default_value = "")]
    search: String,
    /// Category to include; repeat for several
    #[arg(short, long = "category")]
    categories: Vec<String>,
    /// Only free events
    #[arg(long, conflicts_with = "paid")]
    free: bool,
    /// Only paid events
    #[arg(long)]
    paid: bool,
}

impl ListArgs {
    fn criteria(&self) -> FilterCriteria {
        let mut criteria = FilterCriteria {
            search_text: self.search.clone(),
            price: match (self.free, self.paid) {
                (true, _) => Some(Price::Free),
                (_, true) => Some(Price::Paid),
                _ => None,
            },
            ..Default::default()
        };
        for category in &self.categories {
            criteria.select_category(category);
        }
        criteria
    }
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    site_url: Option<String>,
    #[arg(long)]
    timeout_secs: Option<u64>,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config_store = ConfigStore::load();

    if let Command::Config(args) = &cli.command {
        let updated = config_store
            .update(|config| {
                if let Some(url) = &args.api_url {
                    config.api_base_url = url.trim().to_string();
                }
                if let Some(url) = &args.site_url {
                    config.site_base_url = url.trim().to_string();
                }
                if let Some(secs) = args.timeout_secs.filter(|s| *s > 0) {
                    config.timeout_secs = secs;
                }
            })
            .map_err(|err| anyhow!("config update failed: {err}"))?;
        println!("{}", serde_json::to_string_pretty(&updated)?);
        return Ok(());
    }

    let config = config_store.read();
    let client = ApiClient::from_config(&config).context("unable to build api client")?;
    let app = App::new(config, client, SystemLauncher, utils::calendar_dir());

    match cli.command {
        Command::List(args) => {
            let events = app.list_events(&args.criteria()).await?;
            println!("{}", view::render_list(&events));
        }
        Command::Categories => {
            for category in app.list_categories().await? {
                println!("{category}");
            }
        }
        Command::Show { id } => {
            let (event, detail) = app.event_detail(id).await?;
            println!("{}", view::render_detail(&event, &detail));
        }
        Command::Open { id } => {
            let url = app.open_event_page(id).await?;
            println!("{url}");
        }
        Command::Tickets { id } => {
            let url = app.buy_ticket(id).await?;
            println!("{url}");
        }
        Command::Map { id } => {
            let coords = app.open_map(id).await?;
            println!("{}", coords.geo_uri());
        }
        Command::Calendar { id } => {
            let path = app.add_to_calendar(id).await?;
            println!("{}", path.display());
        }
        Command::Config(_) => {}
    }

    if let Some(status) = view::render_status(&app.store().status()) {
        eprintln!("{status}");
    }
    Ok(())
}

pub fn run() {
    init_tracing();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(%err, "failed to start async runtime");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(dispatch(cli)) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
