use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Parser, Subcommand};

use coop_games::frontend::{EventBus, ShellVariant};
use coop_games::scheduler::{self, SchedulerOptions, ScrapeScheduler};
use coop_games::scraper::{ReqwestFetcher, Scraper};
use coop_games::server::{self, AppState};
use coop_games::{config, storage, AsyncCatalog, Catalog, CatalogBuilder, Result};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = "Find cheap and good co-op PC games.\n\
                  Scrapes Co-Optimus and Steam into a DuckDB catalogue and serves \
                  scored, filtered queries over HTTP."
)]
struct Cli {
    /// DuckDB database file (defaults to the platform data directory)
    #[arg(long, env = "COOP_GAMES_DATABASE", global = true)]
    database: Option<PathBuf>,

    /// Countries to collect prices for, as a JSON array of {code, name, currency}
    #[arg(
        long,
        env = "COOP_GAMES_COUNTRIES",
        default_value = "data/countries.json",
        global = true
    )]
    countries: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API and front end, scraping in the background
    Serve(ServeArgs),
    /// Run one scrape and exit
    Scrape {
        /// Only fetch games released this year
        #[arg(long)]
        incremental: bool,

        /// Seconds to wait between Steam requests
        #[arg(long, default_value_t = config::DEFAULT_STEAM_DELAY.as_secs_f64())]
        steam_delay: f64,
    },
    /// Import a legacy games.json file
    Import { file: PathBuf },
    /// Export the catalogue as a legacy games.json file
    Export { file: PathBuf },
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "COOP_GAMES_BIND", default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    /// Built front end: index.html and assets/
    #[arg(long, env = "COOP_GAMES_FRONTEND", default_value = "frontend/dist")]
    frontend_dir: PathBuf,

    /// Logo served at /logo
    #[arg(long, default_value = "frontend/resources/logo.svg")]
    logo: PathBuf,

    /// Front-end bootstrap (plugins or template)
    #[arg(long, env = "COOP_GAMES_SHELL", default_value = "plugins", value_parser = parse_shell)]
    shell: ShellVariant,

    /// Hours between background scrapes
    #[arg(long, default_value_t = config::DEFAULT_SCRAPE_INTERVAL_HOURS)]
    scrape_interval_hours: f64,

    /// Seconds to wait between Steam requests
    #[arg(long, default_value_t = config::DEFAULT_STEAM_DELAY.as_secs_f64())]
    steam_delay: f64,

    /// Allow starting a scrape with POST /scrape/start
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    manual_scrape: bool,

    /// Do not scrape in the background
    #[arg(long)]
    no_background_scrape: bool,

    /// Origin allowed by CORS (repeatable; defaults to the public site)
    #[arg(long = "allowed-origin")]
    allowed_origins: Vec<String>,
}

fn parse_shell(value: &str) -> std::result::Result<ShellVariant, String> {
    value.parse().map_err(|e: coop_games::CoopGamesError| e.to_string())
}

fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut builder = Catalog::builder().countries_file(&cli.countries);
    if let Some(database) = &cli.database {
        builder = builder.database(database);
    }

    match cli.command {
        Command::Serve(args) => serve(builder, args),
        Command::Scrape {
            incremental,
            steam_delay,
        } => {
            let catalog = builder.build()?;
            let scraper = build_scraper(catalog.countries().codes(), steam_delay)?;
            let outcome = scheduler::scrape_into(&Mutex::new(catalog), &scraper, !incremental)?;
            log::info!(
                "Found {} new games. New total is {}",
                outcome.new_games,
                outcome.total_games
            );
            Ok(())
        }
        Command::Import { file } => {
            let catalog = builder.build()?;
            let new_games = storage::import_into(&catalog, &file)?;
            log::info!("Imported {} new games from {}", new_games, file.display());
            Ok(())
        }
        Command::Export { file } => {
            let catalog = builder.build()?;
            let count = storage::export_from(&catalog, &file)?;
            log::info!("Exported {} games to {}", count, file.display());
            Ok(())
        }
    }
}

fn build_scraper(country_codes: Vec<String>, steam_delay: f64) -> Result<Scraper> {
    let fetcher = ReqwestFetcher::new(config::DEFAULT_HTTP_TIMEOUT)?;
    let delay = Duration::try_from_secs_f64(steam_delay).unwrap_or(config::DEFAULT_STEAM_DELAY);
    Ok(Scraper::new(Box::new(fetcher), country_codes).steam_delay(delay))
}

fn serve(builder: CatalogBuilder, args: ServeArgs) -> Result<()> {
    let catalog = Arc::new(Mutex::new(builder.build()?));
    let country_codes = catalog
        .lock()
        .map(|c| c.countries().codes())
        .unwrap_or_default();

    // The blocking HTTP client must be created outside the async runtime
    let scraper = build_scraper(country_codes, args.steam_delay)?;
    let bus = EventBus::new();
    let scheduler = ScrapeScheduler::new(
        Arc::clone(&catalog),
        scraper,
        SchedulerOptions {
            interval_hours: args.scrape_interval_hours,
            ..SchedulerOptions::default()
        },
        bus.clone(),
    )?;

    let shell = server::load_shell(&args.frontend_dir.join("index.html"), args.shell, bus)?;
    log::info!("Front end mounted with the {} bootstrap", args.shell);

    if !args.no_background_scrape {
        scheduler.start_continuous()?;
    }

    let origins = if args.allowed_origins.is_empty() {
        config::DEFAULT_ALLOWED_ORIGINS
            .iter()
            .map(|o| o.to_string())
            .collect()
    } else {
        args.allowed_origins
    };

    let state = Arc::new(AppState {
        catalog: AsyncCatalog::from_shared(catalog),
        scheduler: scheduler.clone(),
        allow_manual_scrape: args.manual_scrape,
        shell,
        logo_file: args.logo,
    });
    let app = server::router(state, &args.frontend_dir.join("assets"), &origins);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(server::serve(args.bind, app));
    // Last scheduler handle (and its blocking client) is dropped outside the runtime
    drop(runtime);
    drop(scheduler);
    result
}
