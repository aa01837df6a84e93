use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand, error::ErrorKind};
use serde_json::json;
use tracing::info;

use crate::cache::{SystemClock, TtlCache};
use crate::capability::{Capabilities, StaticProbe};
use crate::config::AppConfig;
use crate::controller::{FilterMode, LoadStatus, PageController};
use crate::data::{Record, Status};
use crate::errors::{LeadsError, MapError};
use crate::filter::{Category, DateRange, FilterSpec, StatusFilter};
use crate::map::{HeadlessMap, MapState, MapSynchronizer};
use crate::store::{CachedStore, InMemoryStore, RecordStore};

type DynStore = Box<dyn RecordStore>;

#[derive(Debug, Parser)]
#[command(
    name = "construleads",
    disable_help_subcommand = true,
    about = "Browse construction license records",
    long_about = "Load construction license records from Supabase or a local JSON dump, filter them, and preview map markers.",
    after_help = "Without --input, SUPABASE_URL and SUPABASE_ANON_KEY must be set. RUST_LOG controls log output."
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Read records from a JSON dump of backend rows instead of Supabase"
    )]
    input: Option<PathBuf>,
    #[arg(
        long = "backend-filter",
        global = true,
        help = "Evaluate filters in the store instead of locally"
    )]
    backend_filter: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the records matching the filters.
    List {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, help = "Print records as JSON")]
        json: bool,
    },
    /// Print filter options and per-status counts.
    Facets {
        #[arg(long, help = "Print facets as JSON")]
        json: bool,
    },
    /// Render the matching records on a headless map and summarize the result.
    Map {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long = "no-graphics", help = "Pretend graphics context creation fails")]
        no_graphics: bool,
        #[arg(long, help = "Pretend to run on a mobile device")]
        mobile: bool,
        #[arg(
            long = "fail-loads",
            default_value_t = 0,
            value_name = "N",
            help = "Report N map load errors before the map loads"
        )]
        fail_loads: u32,
    },
}

#[derive(Debug, Default, Args)]
struct FilterArgs {
    #[arg(long, value_parser = parse_status_arg, help = "Aprovada, Consulta, or Análise")]
    status: Option<Status>,
    #[arg(
        long,
        value_parser = parse_category_arg,
        conflicts_with = "status",
        help = "Category id: all, aprovada, consulta, analise"
    )]
    category: Option<Category>,
    #[arg(long, value_name = "DATE", help = "Inclusive lower date bound")]
    from: Option<String>,
    #[arg(long, value_name = "DATE", help = "Inclusive upper date bound")]
    to: Option<String>,
    #[arg(long, help = "City, case-insensitive exact match")]
    city: Option<String>,
    #[arg(long = "license-type", help = "License type, case-insensitive exact match")]
    license_type: Option<String>,
    #[arg(long, help = "Substring of address, company name, or city")]
    search: Option<String>,
}

impl FilterArgs {
    fn filter_spec(&self) -> FilterSpec {
        FilterSpec {
            status: StatusFilter::from(self.status),
            date_range: DateRange {
                start: self.from.clone(),
                end: self.to.clone(),
            },
            city: self.city.clone(),
            license_type: self.license_type.clone(),
            search: None,
        }
    }
}

/// Run the CLI with `args` (program name excluded), writing results to `out`.
pub fn run<I, W>(args: I, out: &mut W) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
    W: Write,
{
    let Some(cli) = parse_cli::<Cli, _>(std::iter::once("construleads".to_string()).chain(args))?
    else {
        return Ok(());
    };
    let config = if cli.input.is_some() {
        AppConfig::from_env_offline()?
    } else {
        AppConfig::from_env()?
    };
    let store = open_store(cli.input.as_ref(), &config)?;
    let mode = if cli.backend_filter {
        FilterMode::Backend
    } else {
        FilterMode::Local
    };
    let mut controller = PageController::with_options(store, mode, config.debounce);

    match cli.command {
        Command::List { filters, json } => {
            load_filtered(&mut controller, &filters)?;
            if json {
                serde_json::to_writer_pretty(&mut *out, controller.displayed())?;
                writeln!(out)?;
            } else {
                for record in controller.displayed() {
                    writeln!(out, "{}", describe_record(record))?;
                }
                writeln!(
                    out,
                    "{} of {} records",
                    controller.displayed().len(),
                    controller.all_records().len()
                )?;
            }
        }
        Command::Facets { json } => {
            load_filtered(&mut controller, &FilterArgs::default())?;
            let facets = controller.facets();
            if json {
                serde_json::to_writer_pretty(&mut *out, &facets)?;
                writeln!(out)?;
            } else {
                writeln!(out, "records: {} ({} mapped)", facets.total(), facets.mapped)?;
                for (status, count) in &facets.status_counts {
                    writeln!(out, "status {status}: {count}")?;
                }
                writeln!(out, "cities: {}", facets.cities.join(", "))?;
                writeln!(out, "license types: {}", facets.license_types.join(", "))?;
            }
        }
        Command::Map {
            filters,
            no_graphics,
            mobile,
            fail_loads,
        } => {
            load_filtered(&mut controller, &filters)?;
            let probe = StaticProbe {
                graphics: !no_graphics,
                device: if mobile {
                    StaticProbe::mobile().device
                } else {
                    StaticProbe::desktop().device
                },
            };
            let capabilities = Capabilities::detect(&probe);
            let backend = HeadlessMap::new();
            let mut sync = MapSynchronizer::new(backend.clone(), config.map.clone());
            sync.set_records(controller.displayed());
            sync.mount("map", &capabilities);
            for attempt in 0..fail_loads {
                sync.on_error(MapError::Runtime(format!(
                    "simulated load failure {}",
                    attempt + 1
                )));
            }
            sync.on_load();

            let fitted = backend
                .live_maps()
                .first()
                .and_then(|view| view.fitted)
                .map(|(bounds, _)| bounds);
            let summary = json!({
                "state": sync.state().name(),
                "retries": sync.retries(),
                "displayed": controller.displayed().len(),
                "markers": sync.marker_count(),
                "fitted_bounds": fitted,
                "fallback_records": sync.fallback_view().map(<[Record]>::len),
                "notices": sync.take_notices(),
            });
            serde_json::to_writer_pretty(&mut *out, &summary)?;
            writeln!(out)?;
            if let MapState::Fallback { reason } = sync.state() {
                info!("[construleads:cli] map fell back: {reason:?}");
            }
            sync.unmount();
        }
    }
    Ok(())
}

fn open_store(input: Option<&PathBuf>, config: &AppConfig) -> Result<DynStore, LeadsError> {
    let cache = TtlCache::with_clock(config.cache_ttl, Arc::new(SystemClock));
    if let Some(path) = input {
        let store = InMemoryStore::from_json_file(path)?;
        return Ok(Box::new(CachedStore::with_cache(store, cache)));
    }
    open_remote_store(config, cache)
}

#[cfg(feature = "supabase")]
fn open_remote_store(
    config: &AppConfig,
    cache: TtlCache<Arc<Vec<Record>>>,
) -> Result<DynStore, LeadsError> {
    let supabase = config.supabase.clone().ok_or_else(|| {
        LeadsError::Configuration(
            "no --input given and SUPABASE_URL / SUPABASE_ANON_KEY are not set".into(),
        )
    })?;
    let store = crate::store::SupabaseStore::new(supabase)?;
    Ok(Box::new(CachedStore::with_cache(store, cache)))
}

#[cfg(not(feature = "supabase"))]
fn open_remote_store(
    _config: &AppConfig,
    _cache: TtlCache<Arc<Vec<Record>>>,
) -> Result<DynStore, LeadsError> {
    Err(LeadsError::Configuration(
        "built without the `supabase` feature; pass --input".into(),
    ))
}

/// Load the full set and apply `filters` immediately.
fn load_filtered(
    controller: &mut PageController<DynStore>,
    filters: &FilterArgs,
) -> Result<(), Box<dyn Error>> {
    controller.load();
    if let LoadStatus::Failed(message) = controller.load_status() {
        return Err(format!("loading records failed: {message}").into());
    }
    let now = Instant::now();
    controller.set_filter(filters.filter_spec(), now);
    if let Some(category) = filters.category {
        controller.select_category(category, now);
    }
    if let Some(search) = &filters.search {
        controller.set_search(search.clone(), now);
    }
    let due = controller.next_due().unwrap_or(now);
    controller.tick(due);
    if let Some(error) = controller.last_filter_error() {
        return Err(format!("filtering records failed: {error}").into());
    }
    Ok(())
}

fn describe_record(record: &Record) -> String {
    let coordinates = record
        .coordinates()
        .map(|point| format!("{:.5},{:.5}", point.latitude, point.longitude))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}",
        record.id,
        record.date,
        record.status,
        record.city,
        record.company_name,
        record.address,
        coordinates
    )
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

fn parse_status_arg(raw: &str) -> Result<Status, String> {
    Status::parse(raw).ok_or_else(|| {
        format!("unknown status '{raw}': expected Aprovada, Consulta, or Análise")
    })
}

fn parse_category_arg(raw: &str) -> Result<Category, String> {
    Category::from_id(raw).ok_or_else(|| {
        format!("unknown category '{raw}': expected all, aprovada, consulta, or analise")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_args_build_a_spec_without_search() {
        let cli = Cli::try_parse_from([
            "construleads",
            "list",
            "--status",
            "Analise",
            "--city",
            "Joinville",
            "--from",
            "2024/01/01",
            "--search",
            "rua",
        ])
        .unwrap();
        let Command::List { filters, json } = cli.command else {
            panic!("expected list command");
        };
        assert!(!json);
        let spec = filters.filter_spec();
        assert_eq!(spec.status, StatusFilter::Only(Status::Analise));
        assert_eq!(spec.city.as_deref(), Some("Joinville"));
        assert_eq!(spec.date_range.start.as_deref(), Some("2024/01/01"));
        assert_eq!(spec.search, None);
        assert_eq!(filters.search.as_deref(), Some("rua"));
    }

    #[test]
    fn status_and_category_conflict() {
        let err = Cli::try_parse_from([
            "construleads",
            "list",
            "--status",
            "Aprovada",
            "--category",
            "consulta",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(Cli::try_parse_from(["construleads", "list", "--status", "Pendente"]).is_err());
    }
}
