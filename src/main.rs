use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use recordings_catalog::catalog_store::{
    seed_demo_catalog, Album, AlbumId, Catalog, NewAlbum, NewOrder, NewSong, OrderId, Price, Song,
};
use recordings_catalog::config::{
    AppConfig, CliConfig, FileConfig, DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_ORDER_TIMEOUT_SECS,
};
use recordings_catalog::{Deadline, SessionProvider, CATALOG_SCHEMA};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(name = "recordings")]
struct CliArgs {
    /// Path to the SQLite catalog database file. Created if missing.
    #[clap(value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Path to a TOML config file. Values in it override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Deadline in seconds for a single order transaction.
    #[clap(long, default_value_t = DEFAULT_ORDER_TIMEOUT_SECS)]
    pub order_timeout_secs: u64,

    /// How long to wait on a locked database, in milliseconds.
    #[clap(long, default_value_t = DEFAULT_BUSY_TIMEOUT_MS)]
    pub busy_timeout_ms: u64,

    /// Load the demo catalog if the database has no albums.
    #[clap(long)]
    pub seed: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show one album by id
    Album { id: AlbumId },

    /// List the albums of an artist
    ByArtist { artist: String },

    /// Read every album and every song in one round trip
    Combined,

    /// Add an album
    AddAlbum {
        #[arg(long)]
        title: String,
        #[arg(long)]
        artist: String,
        /// Unit price, e.g. 56.99
        #[arg(long)]
        price: Price,
        #[arg(long, default_value_t = 0)]
        quantity: i64,
    },

    /// Add a song to an existing album
    AddSong {
        #[arg(long)]
        name: String,
        #[arg(long)]
        album_id: AlbumId,
    },

    /// Order copies of an album by title
    Order {
        #[arg(long)]
        title: String,
        #[arg(long)]
        quantity: u32,
        #[arg(long)]
        customer: String,
    },

    /// Run the demo sequence against the catalog
    Demo,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_path: self.db_path.clone(),
            order_timeout_secs: self.order_timeout_secs,
            busy_timeout_ms: self.busy_timeout_ms,
            seed_demo_data: self.seed,
        }
    }
}

#[derive(Serialize)]
struct CombinedOutput<'a> {
    albums: &'a [Album],
    songs: &'a [Song],
}

#[derive(Serialize)]
struct OrderOutput {
    order_id: OrderId,
}

#[derive(Serialize)]
struct InsertOutput {
    id: i64,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Runs one order on the blocking pool. Cancelling `cancellation` interrupts
/// it; the transaction is rolled back either way.
async fn run_order(
    catalog: &Catalog,
    order_timeout: Duration,
    cancellation: &CancellationToken,
    title: String,
    quantity: u32,
    customer: String,
) -> Result<OrderId> {
    let deadline = Deadline::after(order_timeout).with_cancellation(cancellation.clone());

    let orders = catalog.orders.clone();
    let result = tokio::task::spawn_blocking(move || {
        orders.create_order(
            &deadline,
            &title,
            quantity,
            &NewOrder::for_customer(customer),
        )
    })
    .await
    .context("Order task panicked")?;

    Ok(result?)
}

async fn run_demo(
    catalog: &Catalog,
    order_timeout: Duration,
    cancellation: &CancellationToken,
) -> Result<()> {
    let coltrane = catalog.reader.get_by_artist("John Coltrane")?;
    print_json(&coltrane)?;

    match catalog.reader.get_by_id(4) {
        Ok(album) => print_json(&album)?,
        Err(err) if err.is_not_found() => warn!("{}", err),
        Err(err) => return Err(err.into()),
    }

    let demo_timeout = order_timeout.min(Duration::from_secs(DEFAULT_ORDER_TIMEOUT_SECS));
    match run_order(
        catalog,
        demo_timeout,
        cancellation,
        "Marshal Matters".to_string(),
        2,
        "demo".to_string(),
    )
    .await
    {
        Ok(order_id) => print_json(&OrderOutput { order_id })?,
        Err(err) => warn!("Demo order failed: {:#}", err),
    }
    if cancellation.is_cancelled() {
        bail!("Demo interrupted");
    }

    let (albums, songs) = catalog.reader.get_combined()?;
    print_json(&CombinedOutput {
        albums: &albums,
        songs: &songs,
    })
}

async fn run_command(
    command: Command,
    catalog: &Catalog,
    config: &AppConfig,
    cancellation: &CancellationToken,
) -> Result<()> {
    match command {
        Command::Album { id } => print_json(&catalog.reader.get_by_id(id)?),
        Command::ByArtist { artist } => print_json(&catalog.reader.get_by_artist(&artist)?),
        Command::Combined => {
            let (albums, songs) = catalog.reader.get_combined()?;
            print_json(&CombinedOutput {
                albums: &albums,
                songs: &songs,
            })
        }
        Command::AddAlbum {
            title,
            artist,
            price,
            quantity,
        } => {
            let id = catalog.writer.add_album(&NewAlbum {
                title,
                artist,
                price,
                quantity,
            })?;
            print_json(&InsertOutput { id })
        }
        Command::AddSong { name, album_id } => {
            let id = catalog.writer.add_song(&NewSong { name, album_id })?;
            print_json(&InsertOutput { id })
        }
        Command::Order {
            title,
            quantity,
            customer,
        } => {
            let order_id = run_order(
                catalog,
                config.order_timeout,
                cancellation,
                title,
                quantity,
                customer,
            )
            .await?;
            print_json(&OrderOutput { order_id })
        }
        Command::Demo => run_demo(catalog, config.order_timeout, cancellation).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Opening SQLite catalog database at {:?}...", config.db_path);
    let provider = SessionProvider::new(config.session_config());
    provider.initialize(&CATALOG_SCHEMA)?;
    let catalog = Catalog::new(Arc::new(provider.open()?));

    if config.seed_demo_data {
        seed_demo_catalog(&catalog.reader, &catalog.writer)?;
    }

    // The Ctrl-C listener stays installed for the whole command: the first
    // signal cancels the in-flight order and the command then winds down.
    let cancellation = CancellationToken::new();
    let command = run_command(cli_args.command, &catalog, &config, &cancellation);
    tokio::pin!(command);
    tokio::select! {
        result = &mut command => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling in-flight work");
            cancellation.cancel();
            command.await?;
            bail!("Interrupted")
        }
    }
}
