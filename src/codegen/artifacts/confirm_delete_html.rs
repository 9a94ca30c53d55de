use std::fmt::{self, Write};

use super::ArtifactContext;
use crate::codegen::utils::escape_html;

pub fn render(ctx: &ArtifactContext) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let t = &ctx.table;

    writeln!(out, "{{% extends 'base.html' %}}")?;
    writeln!(out, "{{% block content %}}")?;
    writeln!(out, "<div class=\"page page-{}\">", ctx.page.slug)?;
    writeln!(out, "  <h1 class=\"page-title\">Confirmar eliminación</h1>")?;
    writeln!(out, "  <div class=\"alert alert-warning\">")?;
    writeln!(out, "    <h5><i class=\"fas fa-exclamation-triangle\"></i> ¿Está seguro?</h5>")?;
    writeln!(
        out,
        "    <p>Esta acción eliminará permanentemente el registro <strong>{{{{ object }}}}</strong> de {}.</p>",
        escape_html(ctx.title())
    )?;
    writeln!(out, "    <p><strong>Esta acción no se puede deshacer.</strong></p>")?;
    writeln!(out, "  </div>")?;
    writeln!(out, "  <form method=\"post\">")?;
    writeln!(out, "    {{% csrf_token %}}")?;
    writeln!(out, "    <div class=\"d-flex gap-2\">")?;
    writeln!(out, "      <a class=\"btn btn-secondary\" href=\"{{% url '{}_list' %}}\">Cancelar</a>", t)?;
    writeln!(out, "      <button class=\"btn btn-danger\" type=\"submit\"><i class=\"fas fa-trash\"></i> Confirmar eliminación</button>")?;
    writeln!(out, "    </div>")?;
    writeln!(out, "  </form>")?;
    writeln!(out, "</div>")?;
    writeln!(out, "{{% endblock %}}")?;
    Ok(out)
}
