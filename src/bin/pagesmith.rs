//! pagesmith CLI - CRUD page generation from a YAML metadata catalog
//!
//! Generates list/form/delete templates, view handlers and routes for the
//! tables of a target application.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;

use pagesmith::codegen::project_config::DEFAULT_CONFIG_FILE;
use pagesmith::codegen::{CliOverrides, ConfigResolver, DependencyResolver, ProjectConfig};
use pagesmith::probe::{connection_candidates, OfflineProbe, TargetProbe};
use pagesmith::schema::{Application, Catalog};
use pagesmith::service::{reload_service, Systemctl};
use pagesmith::{
    BuiltinRenderer, CatalogStore, Error, GenerationRequest, Orchestrator, TableSelection,
    YamlCatalogStore,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pagesmith")]
#[command(version, about = "Generate CRUD pages for a web application from a metadata catalog", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Path to pagesmith.yaml
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Catalog file (overrides config and PAGESMITH_CATALOG)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Target database URL for probing (overrides config and environment)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Do not contact the target database
    #[arg(long, global = true)]
    no_probe: bool,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate pages for tables of an application
    Generate {
        /// Application name
        #[arg(long)]
        app: String,

        /// Comma-separated table names
        #[arg(long, value_delimiter = ',', conflicts_with = "all_assigned")]
        tables: Vec<String>,

        /// Every table assigned to the application
        #[arg(long)]
        all_assigned: bool,

        /// Replace or merge existing generated regions
        #[arg(long)]
        overwrite: bool,

        /// Generate the create/edit modal
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        with_modals: bool,

        /// Link generated pages into this menu
        #[arg(long)]
        menu: Option<String>,

        /// Generate and auto-assign missing dependencies first
        #[arg(long)]
        with_dependencies: bool,

        /// Reload the application service afterwards
        #[arg(long)]
        reload: bool,

        /// Service to try first when reloading (implies --reload)
        #[arg(long)]
        reload_service: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show generation order and dependency status of a table
    Deps {
        #[arg(long)]
        app: String,

        #[arg(long)]
        table: String,
    },

    /// Print the effective configuration of a page or table as JSON
    Config {
        /// Page slug
        #[arg(long, conflicts_with = "table", required_unless_present = "table")]
        page: Option<String>,

        /// Table name (falls back to a synthesized page)
        #[arg(long)]
        table: Option<String>,

        /// Application whose database is probed for FK options
        #[arg(long)]
        app: Option<String>,
    },

    /// Validate the catalog
    Validate,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    if let Err(e) = dotenv::dotenv() {
        if !e.not_found() {
            warn!(error = %e, "Could not load .env");
        }
    }

    let result = match cli.command {
        Commands::Generate {
            app,
            tables,
            all_assigned,
            overwrite,
            with_modals,
            menu,
            with_dependencies,
            reload,
            reload_service,
            json,
        } => {
            let selection = if all_assigned {
                TableSelection::AllAssigned
            } else {
                TableSelection::Named(tables)
            };
            let mut req = GenerationRequest::new(app, selection);
            req.overwrite = overwrite;
            req.with_modals = with_modals;
            req.menu = menu;
            req.include_dependencies = with_dependencies;
            generate(&cli.global, req, reload || reload_service.is_some(), reload_service, json)
        }
        Commands::Deps { app, table } => show_deps(&cli.global, &app, &table),
        Commands::Config { page, table, app } => show_config(&cli.global, page, table, app),
        Commands::Validate => validate(&cli.global),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "pagesmith=debug" } else { "pagesmith=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Configuration layered file < environment < flags
fn load_config(global: &GlobalArgs) -> Result<(ProjectConfig, PathBuf), Error> {
    let mut config = ProjectConfig::load_or_default(&global.config)?;
    config.apply_process_env();
    config.apply_cli(&CliOverrides {
        catalog: global.catalog.clone(),
        database_url: global.database_url.clone(),
        no_probe: global.no_probe,
    });
    config.validate()?;

    let config_dir = global
        .config
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let catalog_path = match &global.catalog {
        Some(path) => path.clone(),
        None => config.catalog_path(config_dir),
    };
    Ok((config, catalog_path))
}

fn build_probe(config: &ProjectConfig, app: Option<&Application>) -> Box<dyn TargetProbe> {
    if !config.probe.enabled {
        info!("Probing disabled; dependency status uses catalog bookkeeping");
        return Box::new(OfflineProbe);
    }
    let candidates = match app {
        Some(app) => connection_candidates(app, config.probe.database_url.as_deref()),
        None => config.probe.database_url.iter().cloned().collect(),
    };
    connect(config, &candidates)
}

#[cfg(feature = "postgres")]
fn connect(config: &ProjectConfig, candidates: &[String]) -> Box<dyn TargetProbe> {
    match pagesmith::probe::PgProbe::connect_first(candidates, config.connect_timeout()) {
        Some(probe) => Box::new(probe),
        None => {
            if !candidates.is_empty() {
                warn!(candidates = candidates.len(), "Target database unreachable; continuing offline");
            }
            Box::new(OfflineProbe)
        }
    }
}

#[cfg(not(feature = "postgres"))]
fn connect(_config: &ProjectConfig, candidates: &[String]) -> Box<dyn TargetProbe> {
    if !candidates.is_empty() {
        warn!("Built without the postgres feature; continuing offline");
    }
    Box::new(OfflineProbe)
}

fn generate(
    global: &GlobalArgs,
    req: GenerationRequest,
    reload: bool,
    reload_name: Option<String>,
    json: bool,
) -> Result<(), Error> {
    let (config, catalog_path) = load_config(global)?;
    let store = YamlCatalogStore::new(&catalog_path);
    let mut catalog = store.load()?;

    let app = catalog
        .application(&req.app)
        .cloned()
        .ok_or_else(|| Error::ApplicationNotFound(req.app.clone()))?;
    let probe = build_probe(&config, Some(&app));
    let renderer = BuiltinRenderer;

    let report = Orchestrator::new(&config, &renderer, probe.as_ref()).run(&mut catalog, &req)?;
    if report.bookkeeping_changed() {
        store.save(&catalog)?;
        info!(path = %store.path().display(), "Catalog bookkeeping saved");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in report.summary_lines() {
            println!("{}", line);
        }
        for change in report.created.iter() {
            println!("  created {}", change.path.display());
        }
        for change in report.updated.iter() {
            println!("  updated {}", change.path.display());
        }
    }
    if !report.is_clean() {
        warn!(
            failed = report.failed.len(),
            skipped = report.skipped_tables.len(),
            "Generation finished with warnings"
        );
    }

    if reload && report.files_written() > 0 {
        reload_service(&Systemctl, &app.name, reload_name.as_deref(), config.reload_timeout());
    }
    Ok(())
}

fn load_catalog(global: &GlobalArgs) -> Result<(ProjectConfig, Catalog), Error> {
    let (config, catalog_path) = load_config(global)?;
    let catalog = YamlCatalogStore::new(&catalog_path).load()?;
    Ok((config, catalog))
}

fn show_deps(global: &GlobalArgs, app_name: &str, table: &str) -> Result<(), Error> {
    let (config, catalog) = load_catalog(global)?;
    let app = catalog
        .application(app_name)
        .ok_or_else(|| Error::ApplicationNotFound(app_name.to_string()))?;
    if catalog.table(table).is_none() {
        return Err(Error::TableNotFound(table.to_string()));
    }
    let probe = build_probe(&config, Some(app));
    let resolver = DependencyResolver::new(&catalog, &config.identity_table);

    let order = resolver.order_for(table);
    println!("order: {}", order.order.join(" -> "));
    if !order.missing.is_empty() {
        println!("missing: {}", order.missing.join(", "));
    }
    let status = resolver.dependency_status(app, table, probe.as_ref());
    if status.is_ready() {
        println!("status: ready [{}]", status.ready.join(", "));
    } else {
        println!("status: {}", status.summary());
    }
    Ok(())
}

fn show_config(
    global: &GlobalArgs,
    page: Option<String>,
    table: Option<String>,
    app: Option<String>,
) -> Result<(), Error> {
    let (config, catalog) = load_catalog(global)?;
    let app = match app.as_deref() {
        Some(name) => Some(
            catalog
                .application(name)
                .ok_or_else(|| Error::ApplicationNotFound(name.to_string()))?,
        ),
        None => None,
    };
    let probe = build_probe(&config, app);
    let resolver = ConfigResolver::new(&catalog, probe.as_ref())
        .with_policy(config.form_policy())
        .with_options_limit(config.probe.options_limit);
    let effective = match (page, table) {
        (Some(slug), _) => resolver.resolve_page(&slug)?,
        (None, Some(table)) => resolver.resolve_table(&table)?,
        (None, None) => return Err(Error::NoTablesSelected),
    };
    println!("{}", serde_json::to_string_pretty(&effective)?);
    Ok(())
}

fn validate(global: &GlobalArgs) -> Result<(), Error> {
    let (_, catalog) = load_catalog(global)?;
    let issues = catalog.issues();
    if issues.is_empty() {
        println!(
            "✓ Catalog is valid: {} tables, {} columns, {} pages",
            catalog.tables.len(),
            catalog.columns.len(),
            catalog.pages.len()
        );
        return Ok(());
    }
    for issue in &issues {
        println!("  ✗ {}", issue);
    }
    Err(Error::Validation(format!("{} issue(s) found", issues.len())))
}
