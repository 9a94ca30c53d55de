/// Create/edit modal with the resolved form fields.

use std::fmt::{self, Write};

use super::ArtifactContext;
use crate::codegen::defaults::FieldDescriptor;
use crate::codegen::utils::escape_html;
use crate::schema::{FormMode, InputKind, Validation};

pub fn render(ctx: &ArtifactContext) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let Some(modal) = &ctx.modal else {
        return Ok(out);
    };
    let t = &ctx.table;

    let mut attrs = String::new();
    if !modal.close_on_backdrop {
        attrs.push_str(" data-bs-backdrop=\"static\"");
    }
    if !modal.close_on_escape {
        attrs.push_str(" data-bs-keyboard=\"false\"");
    }
    let size = modal.size.css_class();
    let dialog_class = if size.is_empty() {
        "modal-dialog".to_string()
    } else {
        format!("modal-dialog {}", size)
    };

    writeln!(out, "{{% load {} %}}", ctx.filters_library)?;
    writeln!(
        out,
        "<div class=\"modal fade\" id=\"{}\" tabindex=\"-1\" aria-hidden=\"true\"{}>",
        modal.id, attrs
    )?;
    writeln!(out, "  <div class=\"{}\">", dialog_class)?;
    writeln!(out, "    <div class=\"modal-content\">")?;
    writeln!(out, "      <div class=\"modal-header\">")?;
    let icon = modal
        .icon
        .as_deref()
        .map(|i| format!("<i class=\"{}\"></i> ", escape_html(i)))
        .unwrap_or_default();
    writeln!(out, "        <h5 class=\"modal-title\">{}{}</h5>", icon, escape_html(&modal.title))?;
    writeln!(out, "        <button type=\"button\" class=\"btn-close\" data-bs-dismiss=\"modal\" aria-label=\"Cerrar\"></button>")?;
    writeln!(out, "      </div>")?;
    writeln!(out, "      <div class=\"modal-body\">")?;

    let form_id = format!("form-{}", t);
    match modal.form_mode {
        FormMode::External => {
            if let Some(tpl) = &modal.external_template {
                writeln!(out, "        {{% include '{}' %}}", tpl)?;
            }
        }
        FormMode::None => {}
        FormMode::Auto => {
            let mut form_attrs = String::new();
            if modal.prevent_close_on_enter {
                form_attrs.push_str(" data-prevent-enter=\"true\"");
            }
            if modal.prevent_close_on_space {
                form_attrs.push_str(" data-prevent-space=\"true\"");
            }
            writeln!(
                out,
                "        <form id=\"{}\" class=\"modal-form\" method=\"post\" action=\"{{% url '{}_create' %}}\" data-update-url=\"{{% url '{}_update' 0 %}}\" enctype=\"multipart/form-data\"{}>",
                form_id, t, t, form_attrs
            )?;
            writeln!(out, "          {{% csrf_token %}}")?;
            writeln!(out, "          <input type=\"hidden\" name=\"id\" id=\"field-id\" />")?;
            writeln!(out, "          <div class=\"form-grid cols-{}\">", ctx.columns_per_row.max(1))?;
            for field in &ctx.fields {
                write_field(&mut out, field, "            ")?;
            }
            writeln!(out, "          </div>")?;
            writeln!(out, "        </form>")?;
        }
    }

    writeln!(out, "      </div>")?;
    writeln!(out, "      <div class=\"modal-footer\">")?;
    writeln!(
        out,
        "        <button type=\"button\" class=\"btn btn-secondary\" data-bs-dismiss=\"modal\">{}</button>",
        escape_html(&modal.cancel_label)
    )?;
    if modal.form_mode == FormMode::Auto {
        writeln!(
            out,
            "        <button type=\"submit\" class=\"btn btn-primary\" form=\"{}\">{}</button>",
            form_id,
            escape_html(&modal.submit_label)
        )?;
    }
    writeln!(out, "      </div>")?;
    writeln!(out, "    </div>")?;
    writeln!(out, "  </div>")?;
    writeln!(out, "</div>")?;
    Ok(out)
}

/// One field wrapper with label, input and help text
pub(super) fn write_field(out: &mut String, field: &FieldDescriptor, indent: &str) -> fmt::Result {
    let required_class = if field.required { " required" } else { "" };
    writeln!(
        out,
        "{}<div class=\"field field-{}{}\">",
        indent,
        field.width.as_str(),
        required_class
    )?;
    if field.input != InputKind::Checkbox && field.input != InputKind::Hidden {
        writeln!(
            out,
            "{}  <label class=\"form-label{}\" for=\"field-{}\">{}</label>",
            indent,
            required_class,
            field.name,
            escape_html(&field.label)
        )?;
    }
    for line in input_html(field).lines() {
        writeln!(out, "{}  {}", indent, line)?;
    }
    if let Some(help) = &field.help_text {
        writeln!(out, "{}  <div class=\"form-text\">{}</div>", indent, escape_html(help))?;
    }
    writeln!(out, "{}</div>", indent)
}

fn default_text(field: &FieldDescriptor) -> Option<String> {
    match field.default_value.as_ref()? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn constraint_attrs(field: &FieldDescriptor) -> String {
    let mut attrs = String::new();
    if field.required {
        attrs.push_str(" required");
    }
    for rule in &field.validations {
        let attr = match rule {
            Validation::MaxLength(n) => format!(" maxlength=\"{}\"", n),
            Validation::MinLength(n) => format!(" minlength=\"{}\"", n),
            Validation::Pattern(p) => format!(" pattern=\"{}\"", escape_html(p)),
            Validation::MinValue(v) => format!(" min=\"{}\"", escape_html(v)),
            Validation::MaxValue(v) => format!(" max=\"{}\"", escape_html(v)),
        };
        attrs.push_str(&attr);
    }
    if let Some(step) = &field.step {
        attrs.push_str(&format!(" step=\"{}\"", step));
    }
    attrs
}

fn input_html(field: &FieldDescriptor) -> String {
    let name = &field.name;
    let placeholder = escape_html(&field.placeholder);
    let attrs = constraint_attrs(field);
    let default = default_text(field);

    match field.input {
        InputKind::Textarea => format!(
            "<textarea name=\"{n}\" id=\"field-{n}\" class=\"form-control\" rows=\"3\" placeholder=\"{p}\"{a}>{d}</textarea>",
            n = name,
            p = placeholder,
            a = attrs,
            d = default.as_deref().map(escape_html).unwrap_or_default()
        ),
        InputKind::Select => {
            let mut html = String::new();
            let source = field
                .fk_table
                .as_deref()
                .map(|t| format!(" data-fk-source=\"{{% url 'ajax_fk_options' '{}' %}}\"", t))
                .unwrap_or_default();
            html.push_str(&format!(
                "<select name=\"{n}\" id=\"field-{n}\" class=\"form-select\"{s}{a}>\n",
                n = name,
                s = source,
                a = attrs
            ));
            html.push_str(&format!("  <option value=\"\">{}</option>\n", placeholder));
            for opt in &field.options {
                let selected = if default.as_deref() == Some(opt.value.as_str()) {
                    " selected"
                } else {
                    ""
                };
                html.push_str(&format!(
                    "  <option value=\"{}\"{}>{}</option>\n",
                    escape_html(&opt.value),
                    selected,
                    escape_html(&opt.label)
                ));
            }
            html.push_str("</select>");
            html
        }
        InputKind::Checkbox => {
            let checked = match field.default_value {
                Some(serde_json::Value::Bool(true)) => " checked",
                _ => "",
            };
            format!(
                "<div class=\"form-check\">\n  <input type=\"checkbox\" name=\"{n}\" id=\"field-{n}\" class=\"form-check-input\" value=\"1\"{c} />\n  <label class=\"form-check-label\" for=\"field-{n}\">{l}</label>\n</div>",
                n = name,
                c = checked,
                l = escape_html(&field.label)
            )
        }
        InputKind::File => {
            let accept = field
                .accept
                .as_deref()
                .map(|a| format!(" accept=\"{}\"", escape_html(a)))
                .unwrap_or_default();
            let mut html = format!(
                "<input type=\"file\" name=\"{n}\" id=\"field-{n}\" class=\"form-control\"{acc}{a} />",
                n = name,
                acc = accept,
                a = attrs
            );
            if field.preview {
                html.push_str(&format!(
                    "\n<img id=\"preview-{}\" class=\"file-preview img-thumbnail d-none\" alt=\"\" />",
                    name
                ));
            }
            html
        }
        kind => {
            let value = default
                .as_deref()
                .map(|d| format!(" value=\"{}\"", escape_html(d)))
                .unwrap_or_default();
            format!(
                "<input type=\"{ty}\" name=\"{n}\" id=\"field-{n}\" class=\"form-control\" placeholder=\"{p}\"{v}{a} />",
                ty = kind.html_type(),
                n = name,
                p = placeholder,
                v = value,
                a = attrs
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::artifacts::tests::{facturas_context, field};

    #[test]
    fn test_modal_flags_and_size() {
        let html = render(&facturas_context()).unwrap();
        assert!(html.contains("id=\"facturas_form\""));
        assert!(html.contains("data-bs-backdrop=\"static\""));
        assert!(!html.contains("data-bs-keyboard"));
        assert!(html.contains("modal-dialog modal-lg"));
        assert!(html.contains("data-prevent-enter=\"true\""));
        assert!(html.contains(">Guardar</button>"));
    }

    #[test]
    fn test_fk_select_carries_options() {
        let html = render(&facturas_context()).unwrap();
        assert!(html.contains("<select name=\"id_clientes\""));
        assert!(html.contains("<option value=\"1\">ACME</option>"));
        assert!(html.contains("{% url 'ajax_fk_options' 'clientes' %}"));
    }

    #[test]
    fn test_checkbox_is_not_required() {
        let html = render(&facturas_context()).unwrap();
        assert!(html.contains("<div class=\"field field-1-2\">\n"));
        assert!(html.contains("type=\"checkbox\" name=\"activo\""));
        assert!(html.contains("maxlength=\"20\""));
        assert!(html.contains("step=\"0.01\""));
    }

    #[test]
    fn test_default_value_fills_input() {
        let mut f = field("pais", InputKind::Text);
        f.default_value = Some(serde_json::json!("Chile"));
        let mut out = String::new();
        write_field(&mut out, &f, "").unwrap();
        assert!(out.contains("value=\"Chile\""));
    }

    #[test]
    fn test_no_modal_renders_nothing() {
        let mut ctx = facturas_context();
        ctx.modal = None;
        assert_eq!(render(&ctx).unwrap(), "");
    }
}
