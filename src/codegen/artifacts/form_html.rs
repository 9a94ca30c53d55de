/// Standalone create/edit page, used when JavaScript or the modal is unavailable.

use std::fmt::{self, Write};

use super::ArtifactContext;
use crate::codegen::utils::escape_html;

pub fn render(ctx: &ArtifactContext) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let t = &ctx.table;
    let (submit, cancel) = ctx
        .modal
        .as_ref()
        .map(|m| (m.submit_label.as_str(), m.cancel_label.as_str()))
        .unwrap_or(("Guardar", "Cancelar"));

    writeln!(out, "{{% extends 'base.html' %}}")?;
    writeln!(out, "{{% block content %}}")?;
    writeln!(out, "<div class=\"page page-{}\">", ctx.page.slug)?;
    writeln!(
        out,
        "  <h1 class=\"page-title\">{{% if object %}}Editar{{% else %}}Nuevo{{% endif %}} {}</h1>",
        escape_html(ctx.title())
    )?;
    writeln!(out, "  <form method=\"post\" enctype=\"multipart/form-data\">")?;
    writeln!(out, "    {{% csrf_token %}}")?;
    writeln!(out, "    {{{{ form.non_field_errors }}}}")?;
    writeln!(out, "    <div class=\"form-grid cols-{}\">", ctx.columns_per_row.max(1))?;
    for field in &ctx.fields {
        let required = if field.required { " required" } else { "" };
        writeln!(out, "      <div class=\"field field-{}{}\">", field.width.as_str(), required)?;
        writeln!(
            out,
            "        <label class=\"form-label{}\" for=\"{{{{ form.{}.id_for_label }}}}\">{}</label>",
            required,
            field.name,
            escape_html(&field.label)
        )?;
        writeln!(out, "        {{{{ form.{} }}}}", field.name)?;
        writeln!(out, "        {{% if form.{n}.errors %}}<div class=\"text-danger\">{{{{ form.{n}.errors }}}}</div>{{% endif %}}", n = field.name)?;
        if let Some(help) = &field.help_text {
            writeln!(out, "        <div class=\"form-text\">{}</div>", escape_html(help))?;
        }
        writeln!(out, "      </div>")?;
    }
    writeln!(out, "    </div>")?;
    writeln!(out, "    <div class=\"text-end mt-3\">")?;
    writeln!(
        out,
        "      <a class=\"btn btn-secondary me-2\" href=\"{{% url '{}_list' %}}\">{}</a>",
        t,
        escape_html(cancel)
    )?;
    writeln!(out, "      <button class=\"btn btn-primary\" type=\"submit\">{}</button>", escape_html(submit))?;
    writeln!(out, "    </div>")?;
    writeln!(out, "  </form>")?;
    writeln!(out, "</div>")?;
    writeln!(out, "{{% endblock %}}")?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::artifacts::tests::facturas_context;

    #[test]
    fn test_form_lists_every_field() {
        let html = render(&facturas_context()).unwrap();
        for name in ["numero", "id_clientes", "monto", "activo"] {
            assert!(html.contains(&format!("{{{{ form.{} }}}}", name)), "missing {}", name);
        }
        assert!(html.contains("{% url 'facturas_list' %}"));
        assert!(html.contains("form-grid cols-2"));
    }
}
