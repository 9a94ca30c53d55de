/// Dependency graph for table generation order
///
/// A table depends on every table its `id_<name>` columns (or explicit link
/// references) point at. Dependencies must be generated before dependents.
/// Cycles are tolerated: traversal short-circuits on tables already on the
/// stack and still returns a finite order.

use indexmap::IndexSet;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

use crate::probe::{ProbeAnswer, TargetProbe};
use crate::schema::{fk_target_of, Application, Catalog};

/// Result of `order_for`: tables to generate, dependencies first, root last
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyOrder {
    pub order: Vec<String>,
    /// Referenced names with no table definition anywhere
    pub missing: Vec<String>,
}

/// Classification of a table's direct dependencies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyStatus {
    pub missing_catalog: Vec<String>,
    pub not_assigned: Vec<String>,
    pub not_generated: Vec<String>,
    pub ready: Vec<String>,
}

impl DependencyStatus {
    pub fn is_ready(&self) -> bool {
        self.missing_catalog.is_empty() && self.not_assigned.is_empty() && self.not_generated.is_empty()
    }

    /// The status once `satisfied` tables (generated earlier in the same
    /// batch) are counted as ready
    pub fn with_satisfied(&self, satisfied: &HashSet<String>) -> DependencyStatus {
        let mut status = self.clone();
        let mut now_ready = Vec::new();
        for bucket in [&mut status.not_assigned, &mut status.not_generated] {
            let (ready, still): (Vec<String>, Vec<String>) =
                bucket.drain(..).partition(|t| satisfied.contains(t));
            *bucket = still;
            now_ready.extend(ready);
        }
        status.ready.extend(now_ready);
        status
    }

    /// `missing_catalog: [..]; not_assigned: [..]` for warnings and reports
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        for (label, names) in [
            ("missing_catalog", &self.missing_catalog),
            ("not_assigned", &self.not_assigned),
            ("not_generated", &self.not_generated),
        ] {
            if !names.is_empty() {
                parts.push(format!("{}: [{}]", label, names.join(", ")));
            }
        }
        parts.join("; ")
    }
}

/// Resolves the "depends on" relation over the catalog
pub struct DependencyResolver<'a> {
    catalog: &'a Catalog,
    identity_table: &'a str,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(catalog: &'a Catalog, identity_table: &'a str) -> Self {
        DependencyResolver {
            catalog,
            identity_table,
        }
    }

    /// Distinct tables referenced by `table`, in column position order.
    ///
    /// The identity table and self-references are left out. Names are
    /// returned whether or not a table with that name exists.
    pub fn dependencies_of(&self, table: &str) -> Vec<String> {
        let Some(t) = self.catalog.table(table) else {
            return Vec::new();
        };
        let mut links: Vec<_> = t.columns.iter().collect();
        links.sort_by_key(|l| l.position);

        let mut deps: IndexSet<String> = IndexSet::new();
        for link in links {
            let target = link
                .references
                .as_deref()
                .or_else(|| fk_target_of(&link.column));
            if let Some(target) = target {
                if target != self.identity_table && target != table {
                    deps.insert(target.to_string());
                }
            }
        }
        deps.into_iter().collect()
    }

    /// Tables that must exist before `table`, dependencies first, `table` last
    pub fn order_for(&self, table: &str) -> DependencyOrder {
        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();
        let mut result = DependencyOrder::default();
        self.visit(table, &mut visited, &mut on_stack, &mut result);
        result
    }

    fn visit(
        &self,
        table: &str,
        visited: &mut HashSet<String>,
        on_stack: &mut HashSet<String>,
        result: &mut DependencyOrder,
    ) {
        if visited.contains(table) || on_stack.contains(table) {
            return;
        }
        if self.catalog.table(table).is_none() {
            if !result.missing.iter().any(|m| m == table) {
                result.missing.push(table.to_string());
            }
            return;
        }

        on_stack.insert(table.to_string());
        for dep in self.dependencies_of(table) {
            if on_stack.contains(&dep) {
                debug!(table, dependency = %dep, "Cyclic reference, skipping back edge");
                continue;
            }
            self.visit(&dep, visited, on_stack, result);
        }
        on_stack.remove(table);
        visited.insert(table.to_string());
        result.order.push(table.to_string());
    }

    /// Classify each direct dependency of `table` for `app`.
    ///
    /// "Generated" is answered by the probe when it knows; otherwise by the
    /// assignment's `generated_at` bookkeeping.
    pub fn dependency_status(
        &self,
        app: &Application,
        table: &str,
        probe: &dyn TargetProbe,
    ) -> DependencyStatus {
        let mut status = DependencyStatus::default();
        for dep in self.dependencies_of(table) {
            if self.catalog.table(&dep).is_none() {
                status.missing_catalog.push(dep);
                continue;
            }
            let Some(assignment) = app.assignment(&dep) else {
                status.not_assigned.push(dep);
                continue;
            };
            let generated = match probe.table_exists(&dep) {
                ProbeAnswer::Known(exists) => exists,
                ProbeAnswer::Unknown => assignment.generated_at.is_some(),
            };
            if generated {
                status.ready.push(dep);
            } else {
                status.not_generated.push(dep);
            }
        }
        status
    }

    /// Order a batch so every table follows its in-batch dependencies.
    ///
    /// Tables are processed level by level (Kahn); within a level they keep
    /// request order. Tables caught in a cycle are appended last in request
    /// order.
    pub fn batch_order(&self, tables: &[String]) -> Vec<String> {
        let requested: IndexSet<&str> = tables.iter().map(String::as_str).collect();

        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut reverse_deps: HashMap<String, Vec<&str>> = HashMap::new();
        for &table in &requested {
            let deps: Vec<String> = self
                .dependencies_of(table)
                .into_iter()
                .filter(|d| requested.contains(d.as_str()))
                .collect();
            in_degree.insert(table, deps.len());
            for dep in deps {
                reverse_deps.entry(dep).or_default().push(table);
            }
        }

        let mut queue: VecDeque<&str> = requested
            .iter()
            .copied()
            .filter(|t| in_degree.get(t) == Some(&0))
            .collect();
        let mut processed: IndexSet<&str> = IndexSet::new();

        while !queue.is_empty() {
            let mut next_level = Vec::new();
            for _ in 0..queue.len() {
                if let Some(table) = queue.pop_front() {
                    processed.insert(table);
                    if let Some(dependents) = reverse_deps.get(table) {
                        for &dependent in dependents {
                            if let Some(degree) = in_degree.get_mut(dependent) {
                                *degree -= 1;
                                if *degree == 0 {
                                    next_level.push(dependent);
                                }
                            }
                        }
                    }
                }
            }
            next_level.sort_by_key(|t| requested.get_index_of(t));
            queue.extend(next_level);
        }

        let mut order: Vec<String> = processed.iter().map(|t| t.to_string()).collect();
        for &table in &requested {
            if !processed.contains(table) {
                debug!(table, "Table is part of a dependency cycle");
                order.push(table.to_string());
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{OfflineProbe, OptionsQuery, ProbeError};
    use crate::codegen::defaults::SelectOption;
    use crate::schema::{
        Column, ColumnType, Table, TableAssignment, TableColumn, TableKind, TargetDatabase,
    };

    fn table(name: &str, columns: &[&str]) -> Table {
        let mut t = Table::new(name, TableKind::Catalog);
        for (i, c) in columns.iter().enumerate() {
            t.columns.push(TableColumn::new(*c, i as u32 + 1));
        }
        t
    }

    fn catalog(tables: Vec<Table>) -> Catalog {
        let mut names: Vec<&str> = tables
            .iter()
            .flat_map(|t| t.columns.iter().map(|l| l.column.as_str()))
            .collect();
        names.sort_unstable();
        names.dedup();
        let columns = names
            .into_iter()
            .map(|n| Column::new(n, ColumnType::Integer))
            .collect();
        Catalog {
            tables,
            columns,
            ..Catalog::default()
        }
    }

    fn app(assigned: &[(&str, bool)]) -> Application {
        Application {
            name: "ventas".to_string(),
            title: String::new(),
            base_path: "/tmp/ventas".into(),
            database: TargetDatabase::default(),
            tables: assigned
                .iter()
                .map(|(t, generated)| TableAssignment {
                    table: t.to_string(),
                    notes: String::new(),
                    assigned_at: None,
                    generated_at: generated.then(chrono::Utc::now),
                })
                .collect(),
            menus: Vec::new(),
        }
    }

    #[test]
    fn test_dependencies_of_excludes_identity_and_self() {
        let c = catalog(vec![
            table("clientes", &["id"]),
            table("empleados", &["id", "id_empleados"]),
            table("facturas", &["id", "id_clientes", "id_auth_user", "id_clientes_alt"]),
        ]);
        let r = DependencyResolver::new(&c, "auth_user");
        assert_eq!(r.dependencies_of("facturas"), vec!["clientes", "clientes_alt"]);
        assert!(r.dependencies_of("empleados").is_empty());
    }

    #[test]
    fn test_order_places_dependencies_first() {
        let c = catalog(vec![
            table("paises", &["id"]),
            table("clientes", &["id", "id_paises"]),
            table("productos", &["id"]),
            table("facturas", &["id", "id_clientes", "id_productos"]),
        ]);
        let r = DependencyResolver::new(&c, "auth_user");
        let order = r.order_for("facturas");
        assert_eq!(order.order, vec!["paises", "clientes", "productos", "facturas"]);
        assert!(order.missing.is_empty());
    }

    #[test]
    fn test_cycle_terminates_with_each_table_once() {
        let c = catalog(vec![
            table("a", &["id", "id_b"]),
            table("b", &["id", "id_a"]),
        ]);
        let r = DependencyResolver::new(&c, "auth_user");
        let order = r.order_for("a");
        assert_eq!(order.order, vec!["b", "a"]);

        let batch = r.batch_order(&["a".to_string(), "b".to_string()]);
        assert_eq!(batch.len(), 2);
        assert!(batch.contains(&"a".to_string()) && batch.contains(&"b".to_string()));
    }

    #[test]
    fn test_missing_targets_are_reported_not_ordered() {
        let c = catalog(vec![table("facturas", &["id", "id_widgets"])]);
        let r = DependencyResolver::new(&c, "auth_user");
        let order = r.order_for("facturas");
        assert_eq!(order.order, vec!["facturas"]);
        assert_eq!(order.missing, vec!["widgets"]);
    }

    #[test]
    fn test_dependency_status_buckets() {
        let c = catalog(vec![
            table("clientes", &["id"]),
            table("productos", &["id"]),
            table("vendedores", &["id"]),
            table("pedidos", &["id", "id_clientes", "id_productos", "id_vendedores", "id_zonas"]),
        ]);
        let r = DependencyResolver::new(&c, "auth_user");
        let a = app(&[("pedidos", false), ("productos", false), ("vendedores", true)]);
        let status = r.dependency_status(&a, "pedidos", &OfflineProbe);
        assert_eq!(status.missing_catalog, vec!["zonas"]);
        assert_eq!(status.not_assigned, vec!["clientes"]);
        assert_eq!(status.not_generated, vec!["productos"]);
        assert_eq!(status.ready, vec!["vendedores"]);
        assert!(!status.is_ready());
        assert_eq!(
            status.summary(),
            "missing_catalog: [zonas]; not_assigned: [clientes]; not_generated: [productos]"
        );

        let satisfied: HashSet<String> = ["productos".to_string()].into_iter().collect();
        let later = status.with_satisfied(&satisfied);
        assert!(later.not_generated.is_empty());
        assert!(later.ready.contains(&"productos".to_string()));
    }

    struct ExistsProbe;

    impl TargetProbe for ExistsProbe {
        fn table_exists(&self, table: &str) -> ProbeAnswer<bool> {
            ProbeAnswer::Known(table == "productos")
        }
        fn row_count(&self, _table: &str) -> ProbeAnswer<u64> {
            ProbeAnswer::Unknown
        }
        fn select_options(&self, _q: &OptionsQuery) -> Result<Vec<SelectOption>, ProbeError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_probe_answer_wins_over_bookkeeping() {
        let c = catalog(vec![
            table("productos", &["id"]),
            table("vendedores", &["id"]),
            table("pedidos", &["id", "id_productos", "id_vendedores"]),
        ]);
        let r = DependencyResolver::new(&c, "auth_user");
        let a = app(&[("productos", false), ("vendedores", true)]);
        let status = r.dependency_status(&a, "pedidos", &ExistsProbe);
        assert_eq!(status.ready, vec!["productos"]);
        assert_eq!(status.not_generated, vec!["vendedores"]);
    }

    #[test]
    fn test_batch_order_levels() {
        let c = catalog(vec![
            table("facturas", &["id", "id_clientes"]),
            table("detalle", &["id", "id_facturas"]),
            table("clientes", &["id"]),
        ]);
        let r = DependencyResolver::new(&c, "auth_user");
        let batch = r.batch_order(&[
            "detalle".to_string(),
            "facturas".to_string(),
            "clientes".to_string(),
        ]);
        assert_eq!(batch, vec!["clientes", "facturas", "detalle"]);
    }
}
