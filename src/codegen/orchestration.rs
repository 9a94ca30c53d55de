//! High-level orchestration API for page generation.
//!
//! One run takes a set of tables of an application, orders them so
//! dependencies come first, and for each ready table resolves its effective
//! configuration, renders its artifacts and hands them to the emitter.
//!
//! Catalog bookkeeping (default pages, generation timestamps, menu links,
//! auto-assigned dependencies) is never mutated while rendering: each step
//! returns [`BookkeepingDelta`] values which [`apply_deltas`] applies in one
//! place. A failing table is logged and reported; the rest of the batch goes on.

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::codegen::artifacts::{plan_artifacts, ArtifactContext, ArtifactKind, TemplateRenderer};
use crate::codegen::dependency_graph::DependencyResolver;
use crate::codegen::effective_config::{default_page_for, ConfigResolver};
use crate::codegen::emitter::{EmitOutcome, Emitter, SkipReason};
use crate::codegen::project_config::ProjectConfig;
use crate::codegen::utils::to_label;
use crate::error::{Error, Result};
use crate::probe::TargetProbe;
use crate::schema::{Catalog, Menu, MenuPage, Modal, Page};

/// Which tables a run covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSelection {
    Named(Vec<String>),
    /// Every table currently assigned to the application
    AllAssigned,
}

/// Parameters of one generation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub app: String,
    pub tables: TableSelection,
    /// Replace or merge existing regions instead of skipping them
    pub overwrite: bool,
    pub with_modals: bool,
    /// Menu slug the generated pages get linked into
    pub menu: Option<String>,
    /// Pull in and auto-assign missing dependencies
    pub include_dependencies: bool,
}

impl GenerationRequest {
    pub fn new(app: impl Into<String>, tables: TableSelection) -> Self {
        GenerationRequest {
            app: app.into(),
            tables,
            overwrite: false,
            with_modals: true,
            menu: None,
            include_dependencies: false,
        }
    }
}

/// A catalog change produced by a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BookkeepingDelta {
    AssignTable { app: String, table: String },
    UpsertPage { page: Page },
    UpsertModal { modal: Modal },
    MarkGenerated { app: String, table: String, at: DateTime<Utc> },
    LinkMenu { app: String, menu: String, page: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub table: String,
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub table: String,
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// A table that was not generated because a dependency is not ready
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedTable {
    pub table: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableFailure {
    pub table: String,
    pub reason: String,
}

/// Partial-success summary of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationReport {
    pub run_id: Uuid,
    pub app: String,
    pub generated: Vec<String>,
    pub created: Vec<FileChange>,
    pub updated: Vec<FileChange>,
    pub skipped_files: Vec<SkippedFile>,
    pub skipped_tables: Vec<SkippedTable>,
    pub failed: Vec<TableFailure>,
    pub auto_assigned: Vec<String>,
    pub deltas: Vec<BookkeepingDelta>,
}

impl GenerationReport {
    fn new(run_id: Uuid, app: &str) -> Self {
        GenerationReport {
            run_id,
            app: app.to_string(),
            generated: Vec::new(),
            created: Vec::new(),
            updated: Vec::new(),
            skipped_files: Vec::new(),
            skipped_tables: Vec::new(),
            failed: Vec::new(),
            auto_assigned: Vec::new(),
            deltas: Vec::new(),
        }
    }

    /// True when the catalog was changed and should be saved
    pub fn bookkeeping_changed(&self) -> bool {
        !self.deltas.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.skipped_tables.is_empty()
    }

    /// Number of files written (created or updated)
    pub fn files_written(&self) -> usize {
        self.created.len() + self.updated.len()
    }

    /// Sort emission outcomes into the created/updated/skipped buckets. A file
    /// created earlier in the run stays under `created` only.
    fn record_changes(&mut self, changes: Vec<(FileChange, EmitOutcome)>) {
        for (change, outcome) in changes {
            match outcome {
                EmitOutcome::Created => self.created.push(change),
                EmitOutcome::Updated => {
                    if !self.created.iter().any(|c| c.path == change.path) {
                        self.updated.push(change);
                    }
                }
                EmitOutcome::Skipped(reason) => self.skipped_files.push(SkippedFile {
                    table: change.table,
                    path: change.path,
                    reason,
                }),
            }
        }
    }

    /// One line per fact, for the end-of-run summary
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{}: {} table(s) generated, {} file(s) created, {} updated, {} unchanged",
            self.app,
            self.generated.len(),
            self.created.len(),
            self.updated.len(),
            self.skipped_files.len()
        )];
        if !self.auto_assigned.is_empty() {
            lines.push(format!("auto-assigned: {}", self.auto_assigned.join(", ")));
        }
        for s in &self.skipped_tables {
            lines.push(format!("skipped {}: {}", s.table, s.reason));
        }
        for f in &self.failed {
            lines.push(format!("failed {}: {}", f.table, f.reason));
        }
        lines
    }
}

/// Outcome of one table before it is folded into the report. `changes`
/// holds every emission that ran, including those before a failure.
struct TableRun {
    changes: Vec<(FileChange, EmitOutcome)>,
    deltas: Vec<BookkeepingDelta>,
    failures: Vec<Error>,
}

/// Generation driver wired to its collaborators
pub struct Orchestrator<'a> {
    config: &'a ProjectConfig,
    renderer: &'a dyn TemplateRenderer,
    probe: &'a dyn TargetProbe,
    emitter: Emitter,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a ProjectConfig,
        renderer: &'a dyn TemplateRenderer,
        probe: &'a dyn TargetProbe,
    ) -> Self {
        Orchestrator {
            config,
            renderer,
            probe,
            emitter: Emitter::new(config.marker_tag.clone()),
        }
    }

    /// Run one generation request against `catalog`, applying bookkeeping
    /// deltas to it. Saving the catalog is left to the caller.
    pub fn run(&self, catalog: &mut Catalog, req: &GenerationRequest) -> Result<GenerationReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("generate", run_id = %run_id, app = %req.app);
        let _enter = span.enter();

        let app = catalog
            .application(&req.app)
            .ok_or_else(|| Error::ApplicationNotFound(req.app.clone()))?;
        let requested: Vec<String> = match &req.tables {
            TableSelection::Named(names) => names
                .iter()
                .map(|n| n.trim())
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect::<IndexSet<_>>()
                .into_iter()
                .collect(),
            TableSelection::AllAssigned => app.tables.iter().map(|a| a.table.clone()).collect(),
        };
        if requested.is_empty() {
            return Err(Error::NoTablesSelected);
        }

        let mut report = GenerationReport::new(run_id, &req.app);
        let mut tables = requested.clone();

        if req.include_dependencies {
            let (expanded, assign) = self.expand_dependencies(catalog, &req.app, &requested);
            tables = expanded;
            for delta in &assign {
                if let BookkeepingDelta::AssignTable { table, .. } = delta {
                    info!(table = %table, "Auto-assigning dependency");
                    report.auto_assigned.push(table.clone());
                }
            }
            apply_deltas(catalog, &assign)?;
            report.deltas.extend(assign);
        }

        let order = DependencyResolver::new(catalog, &self.config.identity_table).batch_order(&tables);
        info!(tables = ?order, "Generation order");

        let mut generated: HashSet<String> = HashSet::new();
        let mut fresh: HashSet<PathBuf> = HashSet::new();
        let mut pending: Vec<BookkeepingDelta> = Vec::new();

        for table in &order {
            let table_span = info_span!("table", table = %table);
            let _table_enter = table_span.enter();

            if catalog.table(table).is_none() {
                let reason = Error::TableNotFound(table.clone()).to_string();
                error!(%reason, "Table failed");
                report.failed.push(TableFailure {
                    table: table.clone(),
                    reason,
                });
                continue;
            }

            let status = {
                let resolver = DependencyResolver::new(catalog, &self.config.identity_table);
                let app = catalog
                    .application(&req.app)
                    .ok_or_else(|| Error::ApplicationNotFound(req.app.clone()))?;
                resolver
                    .dependency_status(app, table, self.probe)
                    .with_satisfied(&generated)
            };
            if !status.is_ready() {
                let reason = status.summary();
                warn!(%reason, "Dependencies not ready, skipping");
                report.skipped_tables.push(SkippedTable {
                    table: table.clone(),
                    reason,
                });
                continue;
            }

            match self.generate_table(catalog, req, table, &mut fresh) {
                Ok(run) => {
                    report.record_changes(run.changes);
                    if run.failures.is_empty() {
                        pending.extend(run.deltas);
                        generated.insert(table.clone());
                        report.generated.push(table.clone());
                        info!("Table generated");
                    } else {
                        let reason = run
                            .failures
                            .iter()
                            .map(|e| e.to_string())
                            .collect::<Vec<_>>()
                            .join("; ");
                        error!(%reason, "Table failed");
                        report.failed.push(TableFailure {
                            table: table.clone(),
                            reason,
                        });
                    }
                }
                Err(e) => {
                    error!(error = %e, "Table failed");
                    report.failed.push(TableFailure {
                        table: table.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        apply_deltas(catalog, &pending)?;
        report.deltas.extend(pending);

        for line in report.summary_lines() {
            info!("{}", line);
        }
        Ok(report)
    }

    /// Requested tables preceded by their dependency chains, plus the
    /// assignments needed for dependencies not yet attached to `app`
    fn expand_dependencies(
        &self,
        catalog: &Catalog,
        app_name: &str,
        requested: &[String],
    ) -> (Vec<String>, Vec<BookkeepingDelta>) {
        let resolver = DependencyResolver::new(catalog, &self.config.identity_table);
        let app = catalog.application(app_name);
        let mut expanded: IndexSet<String> = IndexSet::new();
        let mut assign = Vec::new();

        for table in requested {
            let order = resolver.order_for(table);
            if !order.missing.is_empty() {
                warn!(table = %table, missing = ?order.missing, "Dependencies missing from catalog");
            }
            for dep in order.order {
                let is_requested = requested.contains(&dep);
                let assigned = app.map_or(false, |a| a.is_assigned(&dep));
                if !is_requested && !assigned && catalog.table(&dep).is_some() {
                    let delta = BookkeepingDelta::AssignTable {
                        app: app_name.to_string(),
                        table: dep.clone(),
                    };
                    if !assign.contains(&delta) {
                        assign.push(delta);
                    }
                }
                expanded.insert(dep);
            }
        }
        (expanded.into_iter().collect(), assign)
    }

    /// Render and emit one table. Files in `fresh` were created earlier in
    /// this run and take further blocks regardless of `req.overwrite`.
    fn generate_table(
        &self,
        catalog: &Catalog,
        req: &GenerationRequest,
        table: &str,
        fresh: &mut HashSet<PathBuf>,
    ) -> Result<TableRun> {
        let app = catalog
            .application(&req.app)
            .ok_or_else(|| Error::ApplicationNotFound(req.app.clone()))?;
        let resolver = ConfigResolver::new(catalog, self.probe)
            .with_policy(self.config.form_policy())
            .with_options_limit(self.config.probe.options_limit);
        let effective = resolver.resolve_table(table)?;

        let ctx = ArtifactContext::build(
            &app.name,
            table,
            &effective,
            &self.config.layout,
            req.with_modals,
            &self.config.audit_user_column,
        );
        let app_dir = app_dir(&app.base_path, &app.name);
        let artifacts = plan_artifacts(&ctx, &app_dir, &self.config.layout, self.renderer, req.overwrite)?;

        let mut changes = Vec::with_capacity(artifacts.len());
        let mut failures = Vec::new();
        for artifact in artifacts {
            let mut emission = artifact.emission;
            if fresh.contains(&emission.path) {
                emission.overwrite = true;
            }
            // artifacts land in separate files or regions; one failing does
            // not stop the others
            let outcome = match self.emitter.emit(&emission) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(path = %emission.path.display(), error = %e, "Artifact not written");
                    failures.push(Error::from(e));
                    continue;
                }
            };
            if outcome == EmitOutcome::Created {
                fresh.insert(emission.path.clone());
            }
            changes.push((
                FileChange {
                    table: table.to_string(),
                    kind: artifact.kind,
                    path: emission.path,
                },
                outcome,
            ));
        }
        if !failures.is_empty() {
            return Ok(TableRun {
                changes,
                deltas: Vec::new(),
                failures,
            });
        }

        let wrote = changes
            .iter()
            .any(|(_, o)| matches!(o, EmitOutcome::Created | EmitOutcome::Updated));
        let previously = app.assignment(table).and_then(|a| a.generated_at);

        let mut deltas = Vec::new();
        if effective.fallback {
            if let Some(t) = catalog.table(table) {
                let (page, modal) = default_page_for(t);
                deltas.push(BookkeepingDelta::UpsertModal { modal });
                deltas.push(BookkeepingDelta::UpsertPage { page });
            }
        }
        // a rerun that wrote nothing keeps the earlier timestamp
        if wrote || previously.is_none() {
            deltas.push(BookkeepingDelta::MarkGenerated {
                app: app.name.clone(),
                table: table.to_string(),
                at: Utc::now(),
            });
        }
        if let Some(menu) = &req.menu {
            let slug = &effective.page.slug;
            let linked = app.menus.contains(menu)
                && catalog
                    .menu(menu)
                    .map_or(false, |m| m.pages.iter().any(|p| &p.page == slug));
            if !linked {
                deltas.push(BookkeepingDelta::LinkMenu {
                    app: app.name.clone(),
                    menu: menu.clone(),
                    page: slug.clone(),
                });
            }
        }
        Ok(TableRun {
            changes,
            deltas,
            failures,
        })
    }
}

/// Application package directory inside the target project
pub fn app_dir(base_path: &Path, app: &str) -> PathBuf {
    base_path.join(app)
}

/// Apply bookkeeping deltas to the catalog, in order
pub fn apply_deltas(catalog: &mut Catalog, deltas: &[BookkeepingDelta]) -> Result<()> {
    for delta in deltas {
        match delta {
            BookkeepingDelta::AssignTable { app, table } => {
                catalog.assign_table(app, table, "auto-assigned as dependency")?;
            }
            BookkeepingDelta::UpsertPage { page } => catalog.upsert_page(page.clone()),
            BookkeepingDelta::UpsertModal { modal } => catalog.upsert_modal(modal.clone()),
            BookkeepingDelta::MarkGenerated { app, table, at } => {
                catalog.assign_table(app, table, "")?;
                let application = catalog
                    .application_mut(app)
                    .ok_or_else(|| Error::ApplicationNotFound(app.clone()))?;
                if let Some(assignment) = application.tables.iter_mut().find(|a| &a.table == table) {
                    assignment.generated_at = Some(*at);
                }
            }
            BookkeepingDelta::LinkMenu { app, menu, page } => {
                let mut entry = catalog.menu(menu).cloned().unwrap_or_else(|| Menu {
                    name: menu.clone(),
                    title: to_label(menu),
                    icon: None,
                    active: true,
                    pages: Vec::new(),
                });
                if !entry.pages.iter().any(|p| &p.page == page) {
                    let order_index = entry.pages.len() as i32;
                    entry.pages.push(MenuPage {
                        page: page.clone(),
                        section: None,
                        order_index,
                    });
                }
                catalog.upsert_menu(entry);
                let application = catalog
                    .application_mut(app)
                    .ok_or_else(|| Error::ApplicationNotFound(app.clone()))?;
                if !application.menus.contains(menu) {
                    application.menus.push(menu.clone());
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::artifacts::BuiltinRenderer;
    use crate::probe::OfflineProbe;
    use crate::schema::{Application, Column, ColumnType, Table, TableColumn, TableKind, TargetDatabase};

    fn catalog(base: &Path) -> Catalog {
        let mut c = Catalog::default();
        c.create_table(Table::new("clientes", TableKind::Catalog)).unwrap();
        c.create_table(Table::new("facturas", TableKind::Transaction)).unwrap();
        c.assign_default_columns("clientes", "id_auth_user").unwrap();
        let mut fk = Column::new("id_clientes", ColumnType::Integer);
        fk.nullable = false;
        c.create_column(fk).unwrap();
        let mut monto = Column::new("monto", ColumnType::Numeric);
        monto.precision = Some(12);
        monto.scale = Some(2);
        c.create_column(monto).unwrap();
        c.link_column("facturas", TableColumn::new("id", 0)).ok();
        c.link_column("facturas", TableColumn::new("id_clientes", 0)).unwrap();
        c.link_column("facturas", TableColumn::new("monto", 0)).unwrap();
        c.applications.push(Application {
            name: "ventas".to_string(),
            title: "Ventas".to_string(),
            base_path: base.to_path_buf(),
            database: TargetDatabase::default(),
            tables: Vec::new(),
            menus: Vec::new(),
        });
        c.assign_table("ventas", "facturas", "").unwrap();
        c
    }

    fn request(tables: &[&str]) -> GenerationRequest {
        GenerationRequest::new(
            "ventas",
            TableSelection::Named(tables.iter().map(|t| t.to_string()).collect()),
        )
    }

    #[test]
    fn test_unknown_app_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = catalog(dir.path());
        let config = ProjectConfig::default();
        let orch = Orchestrator::new(&config, &BuiltinRenderer, &OfflineProbe);
        let mut req = request(&["facturas"]);
        req.app = "compras".to_string();
        assert!(matches!(orch.run(&mut c, &req), Err(Error::ApplicationNotFound(_))));
        assert!(matches!(
            orch.run(&mut c, &request(&[" ", ""])),
            Err(Error::NoTablesSelected)
        ));
    }

    #[test]
    fn test_unassigned_dependency_skips_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = catalog(dir.path());
        let config = ProjectConfig::default();
        let orch = Orchestrator::new(&config, &BuiltinRenderer, &OfflineProbe);
        let report = orch.run(&mut c, &request(&["facturas"])).unwrap();
        assert!(report.generated.is_empty());
        assert_eq!(report.skipped_tables.len(), 1);
        assert!(report.skipped_tables[0].reason.contains("not_assigned: [clientes]"));
        assert_eq!(report.files_written(), 0);
        assert!(!dir.path().join("ventas").exists());
    }

    #[test]
    fn test_with_dependencies_generates_chain() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = catalog(dir.path());
        let config = ProjectConfig::default();
        let orch = Orchestrator::new(&config, &BuiltinRenderer, &OfflineProbe);
        let mut req = request(&["facturas"]);
        req.include_dependencies = true;
        req.menu = Some("ventas_menu".to_string());
        let report = orch.run(&mut c, &req).unwrap();

        assert_eq!(report.auto_assigned, vec!["clientes".to_string()]);
        assert_eq!(report.generated, vec!["clientes".to_string(), "facturas".to_string()]);
        assert!(report.is_clean());

        let app = c.application("ventas").unwrap();
        assert!(app.assignment("clientes").unwrap().generated_at.is_some());
        assert!(app.assignment("facturas").unwrap().generated_at.is_some());
        assert!(c.page("facturas").is_some());
        assert!(c.modal("facturas_form").is_some());
        let menu = c.menu("ventas_menu").unwrap();
        assert_eq!(menu.title, "Ventas Menu");
        assert_eq!(menu.pages.len(), 2);
        assert_eq!(app.menus, vec!["ventas_menu".to_string()]);
    }

    #[test]
    fn test_apply_deltas_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = catalog(dir.path());
        let deltas = vec![
            BookkeepingDelta::LinkMenu {
                app: "ventas".to_string(),
                menu: "main".to_string(),
                page: "facturas".to_string(),
            },
            BookkeepingDelta::LinkMenu {
                app: "ventas".to_string(),
                menu: "main".to_string(),
                page: "facturas".to_string(),
            },
        ];
        apply_deltas(&mut c, &deltas).unwrap();
        assert_eq!(c.menu("main").unwrap().pages.len(), 1);
        assert_eq!(c.application("ventas").unwrap().menus.len(), 1);
    }
}
