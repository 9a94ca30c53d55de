//! End-to-end generation against the facturacion example catalog

use std::fs;
use std::path::Path;

use pagesmith::codegen::defaults::SelectOption;
use pagesmith::codegen::{EmitOutcome, SkipReason};
use pagesmith::probe::{OptionsQuery, ProbeError};
use pagesmith::{
    BuiltinRenderer, Catalog, DependencyResolver, GenerationRequest, Orchestrator, ProbeAnswer,
    ProjectConfig, TableSelection, TargetProbe,
};

const CATALOG: &str = "config/examples/facturacion/catalog.yaml";

/// Target database where only the listed tables exist
struct FakeProbe {
    existing: Vec<&'static str>,
}

impl TargetProbe for FakeProbe {
    fn table_exists(&self, table: &str) -> ProbeAnswer<bool> {
        ProbeAnswer::Known(self.existing.contains(&table))
    }

    fn row_count(&self, _table: &str) -> ProbeAnswer<u64> {
        ProbeAnswer::Known(1)
    }

    fn select_options(&self, query: &OptionsQuery) -> Result<Vec<SelectOption>, ProbeError> {
        if query.table == "clientes" && query.label_column == "nombre" {
            Ok(vec![SelectOption {
                value: "1".to_string(),
                label: "ACME".to_string(),
            }])
        } else {
            Err(ProbeError::Query(format!("no such table {}", query.table)))
        }
    }
}

fn load_catalog(base: &Path) -> Catalog {
    let contents = fs::read_to_string(CATALOG).expect("fixture catalog");
    let mut catalog = Catalog::from_yaml_str(&contents).expect("fixture parses");
    for app in catalog.applications.iter_mut() {
        app.base_path = base.to_path_buf();
    }
    catalog
}

fn request(tables: &[&str], overwrite: bool) -> GenerationRequest {
    let mut req = GenerationRequest::new(
        "ventas",
        TableSelection::Named(tables.iter().map(|t| t.to_string()).collect()),
    );
    req.overwrite = overwrite;
    req
}

fn probe() -> FakeProbe {
    FakeProbe {
        existing: vec!["clientes"],
    }
}

fn read(base: &Path, rel: &str) -> String {
    fs::read_to_string(base.join(rel)).unwrap_or_else(|e| panic!("{}: {}", rel, e))
}

#[test]
fn test_fixture_catalog_is_valid() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = load_catalog(dir.path());
    assert!(catalog.issues().is_empty(), "{:?}", catalog.issues());
}

#[test]
fn test_fk_naming_law_drives_dependencies() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = load_catalog(dir.path());
    let resolver = DependencyResolver::new(&catalog, "auth_user");

    // id_auth_user points at the identity table and is not a dependency
    assert_eq!(resolver.dependencies_of("facturas"), vec!["clientes".to_string()]);
    assert_eq!(
        resolver.order_for("pedidos").order,
        vec!["productos".to_string(), "pedidos".to_string()]
    );
    assert!(resolver.dependencies_of("clientes").is_empty());
}

#[test]
fn test_facturas_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path();
    let mut catalog = load_catalog(base);
    let config = ProjectConfig::default();
    let probe = probe();
    let orch = Orchestrator::new(&config, &BuiltinRenderer, &probe);

    let report = orch.run(&mut catalog, &request(&["facturas"], false)).unwrap();
    assert_eq!(report.generated, vec!["facturas".to_string()]);
    assert!(report.is_clean());
    assert_eq!(report.files_written(), 8);
    // views.py takes a second block in the same run and counts once
    assert!(report.updated.is_empty());

    let list = read(base, "ventas/templates/ventas/facturas_list.html");
    assert!(list.starts_with("<!-- [pagesmith:list:facturas start] -->"));
    assert!(list.contains("<th class=\"text-end\" style=\"width: 120px\">Total</th>"));
    assert!(list.contains("|currency"));
    assert!(!list.contains(">Notas</th>"));
    assert!(list.contains("{% include 'ventas/modals/facturas_form_modal.html' %}"));

    let modal = read(base, "ventas/templates/ventas/modals/facturas_form_modal.html");
    assert!(modal.contains("data-bs-backdrop=\"static\""));
    assert!(modal.contains("modal-dialog modal-lg"));
    assert!(modal.contains("<option value=\"1\">ACME</option>"));
    assert!(modal.contains("placeholder=\"F-0001\""));
    assert!(modal.contains("<textarea"));
    assert!(!modal.contains("name=\"created_at\""));

    let views = read(base, "ventas/views.py");
    assert!(views.contains("def facturas_list(request):"));
    assert!(views.contains("def facturas_export_csv(request):"));
    assert!(!views.contains("def facturas_export_pdf"));
    assert!(views.contains("qs = qs.order_by(\"-fecha\")"));
    assert!(views.contains(", 50).get_page("));
    assert!(views.contains("def ajax_fk_options(request, table):"));

    let urls = read(base, "ventas/urls.py");
    assert!(urls.starts_with("urlpatterns = []"));
    assert!(urls.contains("path('facturas/', views.facturas_list, name='facturas_list'),"));
    assert!(!urls.contains("facturas_export_pdf"));

    assert!(base.join("ventas/templatetags/__init__.py").exists());
    assert!(base.join("ventas/templatetags/page_filters.py").exists());

    let app = catalog.application("ventas").unwrap();
    assert!(app.assignment("facturas").unwrap().generated_at.is_some());
    // A page already existed, so nothing was synthesized
    assert_eq!(catalog.pages.len(), 1);
}

#[test]
fn test_rerun_without_overwrite_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path();
    let mut catalog = load_catalog(base);
    let config = ProjectConfig::default();
    let probe = probe();
    let orch = Orchestrator::new(&config, &BuiltinRenderer, &probe);

    orch.run(&mut catalog, &request(&["facturas"], false)).unwrap();
    let views_before = read(base, "ventas/views.py");
    let list_before = read(base, "ventas/templates/ventas/facturas_list.html");

    let report = orch.run(&mut catalog, &request(&["facturas"], false)).unwrap();
    assert_eq!(report.generated, vec!["facturas".to_string()]);
    assert_eq!(report.files_written(), 0);
    assert!(report
        .skipped_files
        .iter()
        .all(|s| s.reason == SkipReason::AlreadyPresent));
    assert_eq!(read(base, "ventas/views.py"), views_before);
    assert_eq!(read(base, "ventas/templates/ventas/facturas_list.html"), list_before);
}

#[test]
fn test_noop_rerun_leaves_catalog_alone() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path();
    let mut catalog = load_catalog(base);
    let config = ProjectConfig::default();
    let probe = probe();
    let orch = Orchestrator::new(&config, &BuiltinRenderer, &probe);

    let mut req = request(&["facturas"], false);
    req.menu = Some("ventas_menu".to_string());
    let first = orch.run(&mut catalog, &req).unwrap();
    assert!(first.bookkeeping_changed());
    let stamped = catalog
        .application("ventas")
        .unwrap()
        .assignment("facturas")
        .unwrap()
        .generated_at;
    assert!(stamped.is_some());

    let report = orch.run(&mut catalog, &req).unwrap();
    assert_eq!(report.generated, vec!["facturas".to_string()]);
    assert_eq!(report.files_written(), 0);
    assert!(report.deltas.is_empty(), "{:?}", report.deltas);
    assert!(!report.bookkeeping_changed());
    let app = catalog.application("ventas").unwrap();
    assert_eq!(app.assignment("facturas").unwrap().generated_at, stamped);
    assert_eq!(catalog.menu("ventas_menu").unwrap().pages.len(), 1);
}

#[test]
fn test_failed_artifact_keeps_written_files_in_report() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path();
    let mut catalog = load_catalog(base);
    let config = ProjectConfig::default();
    let probe = probe();
    let orch = Orchestrator::new(&config, &BuiltinRenderer, &probe);

    // views.py cannot be read or written
    fs::create_dir_all(base.join("ventas/views.py")).unwrap();

    let report = orch.run(&mut catalog, &request(&["clientes"], false)).unwrap();
    assert!(report.generated.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].table, "clientes");
    assert!(report.failed[0].reason.contains("views.py"), "{}", report.failed[0].reason);

    // templates and routes landed and are reported
    let list = base.join("ventas/templates/ventas/clientes_list.html");
    assert!(list.exists());
    assert!(report.created.iter().any(|c| c.path == list));
    assert!(report.created.iter().any(|c| c.path.ends_with("urls.py")));
    assert!(report.created.iter().all(|c| c.path.exists()));
    assert!(!report.created.iter().any(|c| c.path.ends_with("views.py")));

    // a failed table is not marked generated
    assert!(report.deltas.is_empty());
    assert!(catalog
        .application("ventas")
        .unwrap()
        .assignment("clientes")
        .unwrap()
        .generated_at
        .is_none());
}

#[test]
fn test_prefix_related_tables_keep_their_routes() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path();
    let mut catalog = load_catalog(base);
    // a second table whose name starts with "facturas_"
    let mut detalle = catalog.table("facturas").unwrap().clone();
    detalle.name = "facturas_det".to_string();
    catalog.tables.push(detalle);
    let config = ProjectConfig::default();
    let probe = probe();
    let orch = Orchestrator::new(&config, &BuiltinRenderer, &probe);

    orch.run(&mut catalog, &request(&["facturas_det"], false)).unwrap();
    let report = orch.run(&mut catalog, &request(&["facturas"], true)).unwrap();
    assert_eq!(report.generated, vec!["facturas".to_string()]);

    let urls = read(base, "ventas/urls.py");
    assert!(urls.contains("path('facturas_det/', views.facturas_det_list, name='facturas_det_list'),"));
    assert!(urls.contains("path('facturas/', views.facturas_list, name='facturas_list'),"));
    assert_eq!(urls.matches("views.facturas_det_list").count(), 1);
    assert_eq!(urls.matches("views.facturas_list").count(), 1);
}

#[test]
fn test_overwrite_rerun_is_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path();
    let mut catalog = load_catalog(base);
    let config = ProjectConfig::default();
    let probe = probe();
    let orch = Orchestrator::new(&config, &BuiltinRenderer, &probe);

    orch.run(&mut catalog, &request(&["facturas"], true)).unwrap();
    let report = orch.run(&mut catalog, &request(&["facturas"], true)).unwrap();
    assert_eq!(report.files_written(), 0);
    for skipped in &report.skipped_files {
        let name = skipped.path.file_name().unwrap().to_string_lossy();
        if name == "__init__.py" || name == "page_filters.py" {
            assert_eq!(skipped.reason, SkipReason::AlreadyPresent);
        } else {
            assert_eq!(skipped.reason, SkipReason::Unchanged, "{}", name);
        }
    }
}

#[test]
fn test_unassigned_dependency_skips_pedidos() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path();
    let mut catalog = load_catalog(base);
    let config = ProjectConfig::default();
    let probe = probe();
    let orch = Orchestrator::new(&config, &BuiltinRenderer, &probe);

    let report = orch
        .run(&mut catalog, &request(&["pedidos", "facturas"], false))
        .unwrap();
    assert_eq!(report.generated, vec!["facturas".to_string()]);
    assert_eq!(report.skipped_tables.len(), 1);
    assert_eq!(report.skipped_tables[0].table, "pedidos");
    assert!(report.skipped_tables[0]
        .reason
        .contains("not_assigned: [productos]"));
    assert!(!base.join("ventas/templates/ventas/pedidos_list.html").exists());
    assert!(!read(base, "ventas/views.py").contains("def pedidos_list"));
    assert!(catalog
        .application("ventas")
        .unwrap()
        .assignment("pedidos")
        .unwrap()
        .generated_at
        .is_none());
}

#[test]
fn test_with_dependencies_assigns_and_generates_productos() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path();
    let mut catalog = load_catalog(base);
    let config = ProjectConfig::default();
    let probe = probe();
    let orch = Orchestrator::new(&config, &BuiltinRenderer, &probe);

    let mut req = request(&["pedidos"], false);
    req.include_dependencies = true;
    let report = orch.run(&mut catalog, &req).unwrap();

    assert_eq!(report.auto_assigned, vec!["productos".to_string()]);
    assert_eq!(
        report.generated,
        vec!["productos".to_string(), "pedidos".to_string()]
    );
    // Neither table had a page; both got a synthesized one
    assert!(catalog.page("productos").is_some());
    assert!(catalog.page("pedidos").is_some());

    let urls = read(base, "ventas/urls.py");
    assert!(urls.contains("views.productos_list"));
    assert!(urls.contains("views.pedidos_list"));
}

#[test]
fn test_second_table_merges_into_routes() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path();
    let mut catalog = load_catalog(base);
    let config = ProjectConfig::default();
    let probe = probe();
    let orch = Orchestrator::new(&config, &BuiltinRenderer, &probe);

    orch.run(&mut catalog, &request(&["clientes"], false)).unwrap();
    let report = orch.run(&mut catalog, &request(&["facturas"], true)).unwrap();
    assert!(report
        .updated
        .iter()
        .any(|c| c.path.ends_with("urls.py")));

    let urls = read(base, "ventas/urls.py");
    assert!(urls.contains("views.clientes_list"));
    assert!(urls.contains("views.facturas_list"));
    assert_eq!(urls.matches("ajax/fk/").count(), 1);
    assert_eq!(urls.matches("[pagesmith:urls start]").count(), 1);
}

#[test]
fn test_hand_written_code_survives_regeneration() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path();
    let mut catalog = load_catalog(base);
    let config = ProjectConfig::default();
    let probe = probe();
    let orch = Orchestrator::new(&config, &BuiltinRenderer, &probe);

    orch.run(&mut catalog, &request(&["facturas"], false)).unwrap();
    let views_path = base.join("ventas/views.py");
    let generated = fs::read_to_string(&views_path).unwrap();
    let edited = format!(
        "# project header\nimport logging\n\n{}\n\ndef custom_report(request):\n    return None\n",
        generated
    );
    fs::write(&views_path, &edited).unwrap();

    // Change the page so the region must be rewritten
    for page in catalog.pages.iter_mut() {
        page.tables[0].page_size = 10;
    }
    let report = orch.run(&mut catalog, &request(&["facturas"], true)).unwrap();
    assert!(report.updated.iter().any(|c| c.path == views_path));

    let after = fs::read_to_string(&views_path).unwrap();
    assert!(after.starts_with("# project header\nimport logging\n\n"));
    assert!(after.ends_with("\n\ndef custom_report(request):\n    return None\n"));
    assert!(after.contains(", 10).get_page("));
    assert!(!after.contains(", 50).get_page("));
    assert_eq!(after.matches("[pagesmith:views:facturas start]").count(), 1);
}

#[test]
fn test_config_override_precedence() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = load_catalog(dir.path());
    let probe = probe();
    let resolver = pagesmith::ConfigResolver::new(&catalog, &probe);

    let effective = resolver.resolve_table("facturas").unwrap();
    assert!(!effective.fallback);
    let monto = effective.columns.iter().find(|c| c.name == "monto").unwrap();
    // Override beats the numeric default
    assert_eq!(monto.title, "Total");
    assert_eq!(monto.width_px, Some(120));
    assert_eq!(monto.format.map(|f| f.tag()).as_deref(), Some("currency"));
    let notas = effective.columns.iter().find(|c| c.name == "notas").unwrap();
    assert!(!notas.visible);

    let form = effective.primary_form().unwrap();
    let numero = form.fields.iter().find(|f| f.name == "numero").unwrap();
    assert_eq!(numero.placeholder, "F-0001");
    assert_eq!(numero.width.as_str(), "1-2");
    let cliente = form.fields.iter().find(|f| f.name == "id_clientes").unwrap();
    assert_eq!(cliente.options.len(), 1);

    // No page for productos: name-derived fallback
    let productos = resolver.resolve_table("productos").unwrap();
    assert!(productos.fallback);
    assert_eq!(productos.page.slug, "productos");
}

#[test]
fn test_emit_outcome_serializes_for_reports() {
    let json = serde_json::to_string(&EmitOutcome::Skipped(SkipReason::OverwriteDisabled)).unwrap();
    assert!(json.contains("overwrite_disabled"), "{}", json);
}
