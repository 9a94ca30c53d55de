/// List page template: toolbar, data table, pager and the form modal include.

use std::fmt::{self, Write};

use super::ArtifactContext;
use crate::codegen::defaults::ColumnDescriptor;
use crate::codegen::utils::escape_html;
use crate::schema::{ColumnAction, ColumnFormat};

pub fn render(ctx: &ArtifactContext) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let t = &ctx.table;
    let title = escape_html(ctx.title());

    writeln!(out, "{{% extends 'base.html' %}}")?;
    writeln!(out, "{{% load static {} %}}", ctx.filters_library)?;
    writeln!(out, "{{% block content %}}")?;
    writeln!(out, "<div class=\"page page-{}\">", ctx.page.slug)?;
    writeln!(out, "  <h1 class=\"page-title\">{}</h1>", title)?;
    if !ctx.page.description.is_empty() {
        writeln!(out, "  <p class=\"page-description text-muted\">{}</p>", escape_html(&ctx.page.description))?;
    }

    if !ctx.shortcuts.is_empty() {
        writeln!(out, "  <nav class=\"page-shortcuts d-flex gap-2\">")?;
        for s in &ctx.shortcuts {
            let icon = s
                .icon
                .as_deref()
                .map(|i| format!("<i class=\"{}\"></i> ", escape_html(i)))
                .unwrap_or_default();
            writeln!(
                out,
                "    <a class=\"btn btn-sm btn-outline-secondary\" href=\"{}\">{}{}</a>",
                escape_html(&s.route_path),
                icon,
                escape_html(&s.label)
            )?;
        }
        writeln!(out, "  </nav>")?;
    }

    writeln!(out)?;
    writeln!(out, "  <div class=\"modal-cta text-center\">")?;
    match &ctx.modal {
        Some(modal) => {
            writeln!(
                out,
                "    <button type=\"button\" class=\"btn btn-primary modal-cta-btn\" data-bs-toggle=\"modal\" data-bs-target=\"#{}\">",
                modal.id
            )?;
            writeln!(out, "      <i class=\"fas fa-plus\"></i>")?;
            writeln!(out, "      <span class=\"d-none d-sm-inline\">Agregar</span>")?;
            writeln!(out, "    </button>")?;
        }
        None => {
            writeln!(out, "    <a class=\"btn btn-primary\" href=\"{{% url '{}_create' %}}\">", t)?;
            writeln!(out, "      <i class=\"fas fa-plus\"></i> Agregar")?;
            writeln!(out, "    </a>")?;
        }
    }
    writeln!(out, "  </div>")?;
    writeln!(out)?;

    writeln!(out, "  <section class=\"data-table-wrap\">")?;
    write_toolbar(&mut out, ctx)?;
    writeln!(out, "    <table class=\"table table-striped data-table\">")?;
    writeln!(out, "      <thead class=\"table-head\">")?;
    writeln!(out, "        <tr>")?;
    for col in &ctx.columns {
        let width = col
            .width_px
            .map(|w| format!(" style=\"width: {}px\"", w))
            .unwrap_or_default();
        writeln!(
            out,
            "          <th class=\"{}\"{}>{}</th>",
            col.alignment.css_class(),
            width,
            escape_html(&col.title)
        )?;
    }
    writeln!(out, "          <th class=\"text-end\">Acciones</th>")?;
    writeln!(out, "        </tr>")?;
    writeln!(out, "      </thead>")?;
    writeln!(out, "      <tbody class=\"table-body\">")?;
    writeln!(out, "        {{% for row in rows %}}")?;
    writeln!(out, "        <tr>")?;
    for col in &ctx.columns {
        writeln!(
            out,
            "          <td class=\"{}\">{}</td>",
            col.alignment.css_class(),
            cell(col, ctx)
        )?;
    }
    writeln!(out, "          <td class=\"row-actions text-end\">")?;
    writeln!(out, "            <div class=\"btn-group btn-group-sm\">")?;
    match &ctx.modal {
        Some(modal) => {
            writeln!(
                out,
                "              <button type=\"button\" class=\"btn btn-outline-primary btn-edit\" data-bs-toggle=\"modal\" data-bs-target=\"#{}\" data-id=\"{{{{ row.id }}}}\" data-source=\"{{% url '{}_json' row.id %}}\" title=\"Editar\">",
                modal.id, t
            )?;
            writeln!(out, "                <i class=\"fas fa-edit\"></i>")?;
            writeln!(out, "              </button>")?;
        }
        None => {
            writeln!(
                out,
                "              <a class=\"btn btn-outline-primary\" href=\"{{% url '{}_update' row.id %}}\" title=\"Editar\"><i class=\"fas fa-edit\"></i></a>",
                t
            )?;
        }
    }
    writeln!(
        out,
        "              <a class=\"btn btn-outline-danger\" href=\"{{% url '{}_delete' row.id %}}\" title=\"Eliminar\"><i class=\"fas fa-trash\"></i></a>",
        t
    )?;
    writeln!(out, "            </div>")?;
    writeln!(out, "          </td>")?;
    writeln!(out, "        </tr>")?;
    writeln!(out, "        {{% empty %}}")?;
    writeln!(out, "        <tr>")?;
    writeln!(
        out,
        "          <td class=\"text-center text-muted py-4\" colspan=\"{}\">Sin registros</td>",
        ctx.columns.len() + 1
    )?;
    writeln!(out, "        </tr>")?;
    writeln!(out, "        {{% endfor %}}")?;
    writeln!(out, "      </tbody>")?;
    writeln!(out, "    </table>")?;
    write_pager(&mut out)?;
    writeln!(out, "  </section>")?;

    if ctx.modal.is_some() {
        writeln!(out)?;
        writeln!(out, "  {{% include '{}' %}}", ctx.templates.form_modal)?;
    }
    writeln!(out, "</div>")?;
    writeln!(out, "{{% endblock %}}")?;
    Ok(out)
}

fn write_toolbar(out: &mut String, ctx: &ArtifactContext) -> fmt::Result {
    let Some(list) = &ctx.list else {
        return Ok(());
    };
    let t = &ctx.table;
    writeln!(out, "    <div class=\"table-toolbar d-flex justify-content-between align-items-center gap-2\">")?;
    if list.searchable {
        writeln!(out, "      <form class=\"table-search\" method=\"get\">")?;
        writeln!(
            out,
            "        <input type=\"search\" name=\"q\" value=\"{{{{ q }}}}\" class=\"form-control form-control-sm\" placeholder=\"Buscar\" />"
        )?;
        writeln!(out, "      </form>")?;
    }
    let exports = [
        (list.export_csv, "csv", "fa-file-csv", "Exportar CSV"),
        (list.export_xlsx, "xlsx", "fa-file-excel", "Exportar Excel"),
        (list.export_pdf, "pdf", "fa-file-pdf", "Exportar PDF"),
    ];
    if exports.iter().any(|(enabled, ..)| *enabled) {
        writeln!(out, "      <div class=\"table-exports d-flex align-items-center gap-1 ms-auto\">")?;
        for (_, format, icon, label) in exports.iter().filter(|(enabled, ..)| *enabled) {
            writeln!(
                out,
                "        <a class=\"btn btn-sm btn-outline-secondary export-{f}\" href=\"{{% url '{t}_export_{f}' %}}\" title=\"{label}\"><i class=\"fas {icon}\"></i></a>",
                f = format,
                t = t,
                label = label,
                icon = icon
            )?;
        }
        writeln!(out, "      </div>")?;
    }
    writeln!(out, "    </div>")?;
    writeln!(out)
}

fn write_pager(out: &mut String) -> fmt::Result {
    writeln!(out, "    {{% if page_obj.has_other_pages %}}")?;
    writeln!(out, "    <nav class=\"table-pager\">")?;
    writeln!(out, "      <ul class=\"pagination pagination-sm justify-content-end\">")?;
    writeln!(out, "        {{% if page_obj.has_previous %}}<li class=\"page-item\"><a class=\"page-link\" href=\"?page={{{{ page_obj.previous_page_number }}}}&q={{{{ q|urlencode }}}}\">&laquo;</a></li>{{% endif %}}")?;
    writeln!(out, "        <li class=\"page-item disabled\"><span class=\"page-link\">{{{{ page_obj.number }}}} / {{{{ page_obj.paginator.num_pages }}}}</span></li>")?;
    writeln!(out, "        {{% if page_obj.has_next %}}<li class=\"page-item\"><a class=\"page-link\" href=\"?page={{{{ page_obj.next_page_number }}}}&q={{{{ q|urlencode }}}}\">&raquo;</a></li>{{% endif %}}")?;
    writeln!(out, "      </ul>")?;
    writeln!(out, "    </nav>")?;
    writeln!(out, "    {{% endif %}}")
}

/// Template expression for one cell
fn cell(col: &ColumnDescriptor, ctx: &ArtifactContext) -> String {
    let value = format!("row.{}", col.name);
    if col.is_toggle {
        return format!(
            "{{% if {v} %}}<span class=\"badge bg-success\">Sí</span>{{% else %}}<span class=\"badge bg-secondary\">No</span>{{% endif %}}",
            v = value
        );
    }
    match col.format {
        Some(ColumnFormat::Number { decimals }) => format!("{{{{ {}|floatformat:{} }}}}", value, decimals),
        Some(ColumnFormat::Decimal) => format!("{{{{ {}|floatformat:2 }}}}", value),
        Some(ColumnFormat::Truncate { chars }) => format!("{{{{ {}|truncatechars:{} }}}}", value, chars),
        Some(ColumnFormat::Date) => format!("{{{{ {}|date:'Y-m-d' }}}}", value),
        Some(ColumnFormat::DateTime) => format!("{{{{ {}|date:'Y-m-d H:i' }}}}", value),
        Some(ColumnFormat::Currency) => format!("{{{{ {}|currency }}}}", value),
        Some(ColumnFormat::Percent) => format!("{{{{ {}|percent }}}}", value),
        Some(ColumnFormat::Badge) => {
            format!("<span class=\"badge bg-secondary\">{{{{ {} }}}}</span>", value)
        }
        Some(ColumnFormat::Link) => {
            let href = col
                .link_template
                .as_deref()
                .map(|tpl| tpl.replace("{id}", "{{ row.id }}"))
                .unwrap_or_else(|| format!("{{% url '{}_update' row.id %}}", ctx.table));
            format!("<a href=\"{}\">{{{{ {} }}}}</a>", href, value)
        }
        Some(ColumnFormat::Button) => {
            let (class, label) = match col.action {
                Some(ColumnAction::Delete) => ("btn-outline-danger", "Eliminar"),
                Some(ColumnAction::ToggleActive) => ("btn-outline-warning", "Cambiar estado"),
                Some(ColumnAction::Custom) => ("btn-outline-secondary", col.title.as_str()),
                Some(ColumnAction::Edit) | None => ("btn-outline-primary", "Editar"),
            };
            format!(
                "<button type=\"button\" class=\"btn btn-sm {}\" data-id=\"{{{{ row.id }}}}\" data-column=\"{}\">{}</button>",
                class,
                col.name,
                escape_html(label)
            )
        }
        Some(ColumnFormat::Text) | None => format!("{{{{ {}|default_if_none:'' }}}}", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::artifacts::tests::facturas_context;

    #[test]
    fn test_list_headers_and_cells() {
        let html = render(&facturas_context()).unwrap();
        assert!(html.contains("<th class=\"text-end\">Monto</th>"));
        assert!(html.contains("{{ row.monto|floatformat:2 }}"));
        assert!(html.contains("<th class=\"text-start\">id_clientes</th>"));
        assert!(html.contains("{% if row.activo %}"));
        assert!(html.contains("{% load static page_filters %}"));
    }

    #[test]
    fn test_list_toolbar_follows_flags() {
        let html = render(&facturas_context()).unwrap();
        assert!(html.contains("facturas_export_csv"));
        assert!(html.contains("facturas_export_xlsx"));
        assert!(!html.contains("facturas_export_pdf"));
        assert!(html.contains("name=\"q\""));
    }

    #[test]
    fn test_list_includes_modal() {
        let html = render(&facturas_context()).unwrap();
        assert!(html.contains("data-bs-target=\"#facturas_form\""));
        assert!(html.contains("{% include 'ventas/modals/facturas_form_modal.html' %}"));
        assert!(html.contains("colspan=\"5\""));
    }
}
