/// Route declarations. Every table contributes its lines to one shared
/// `urlpatterns += [...]` block; the FK options route is shared.

use std::fmt::{self, Write};

use super::ArtifactContext;

pub const OPEN_LINE: &str = "urlpatterns += [";
pub const CLOSE_LINE: &str = "]";
pub const SHARED_ROUTE_TOKEN: &str = "ajax/fk/";

pub fn render(ctx: &ArtifactContext) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let t = &ctx.table;

    writeln!(out, "from django.urls import path")?;
    writeln!(out)?;
    writeln!(out, "from . import views")?;
    writeln!(out)?;
    writeln!(out, "{}", OPEN_LINE)?;
    writeln!(out, "    path('{t}/', views.{t}_list, name='{t}_list'),", t = t)?;
    writeln!(out, "    path('{t}/create/', views.{t}_create, name='{t}_create'),", t = t)?;
    writeln!(out, "    path('{t}/<int:pk>/update/', views.{t}_update, name='{t}_update'),", t = t)?;
    writeln!(out, "    path('{t}/<int:pk>/delete/', views.{t}_delete, name='{t}_delete'),", t = t)?;
    writeln!(out, "    path('{t}/<int:pk>/json/', views.{t}_json, name='{t}_json'),", t = t)?;
    if let Some(list) = &ctx.list {
        for (enabled, format) in [
            (list.export_csv, "csv"),
            (list.export_xlsx, "xlsx"),
            (list.export_pdf, "pdf"),
        ] {
            if enabled {
                writeln!(
                    out,
                    "    path('{t}/export/{f}/', views.{t}_export_{f}, name='{t}_export_{f}'),",
                    t = t,
                    f = format
                )?;
            }
        }
    }
    writeln!(
        out,
        "    path('{}<str:table>/', views.ajax_fk_options, name='ajax_fk_options'),",
        SHARED_ROUTE_TOKEN
    )?;
    writeln!(out, "{}", CLOSE_LINE)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::artifacts::tests::facturas_context;

    #[test]
    fn test_routes_follow_export_flags() {
        let py = render(&facturas_context()).unwrap();
        assert!(py.contains("path('facturas/', views.facturas_list, name='facturas_list'),"));
        assert!(py.contains("views.facturas_export_xlsx"));
        assert!(!py.contains("views.facturas_export_pdf"));
        assert_eq!(py.matches("ajax/fk/").count(), 1);
        assert!(py.trim_end().ends_with(']'));
    }
}
