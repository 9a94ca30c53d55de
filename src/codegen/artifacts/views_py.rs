/// Django view functions: one block per table plus one shared block.

use std::fmt::{self, Write};

use super::ArtifactContext;
use crate::codegen::defaults::{FK_LABEL_COLUMN, TOGGLE_COLUMN};
use crate::codegen::utils::escape_python_string;
use crate::schema::{InputKind, SortDirection};

fn py_list(items: &[&str]) -> String {
    let quoted: Vec<String> = items
        .iter()
        .map(|s| format!("\"{}\"", escape_python_string(s)))
        .collect();
    format!("[{}]", quoted.join(", "))
}

fn write_imports(out: &mut String) -> fmt::Result {
    writeln!(out, "from django.apps import apps")?;
    writeln!(out, "from django.contrib.auth.decorators import login_required")?;
    writeln!(out, "from django.core.paginator import Paginator")?;
    writeln!(out, "from django.db.models import Q")?;
    writeln!(out, "from django.forms import modelform_factory")?;
    writeln!(out, "from django.http import HttpResponse, JsonResponse")?;
    writeln!(out, "from django.shortcuts import get_object_or_404, redirect, render")?;
    writeln!(out)
}

pub fn render(ctx: &ArtifactContext) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let t = &ctx.table;
    let upper = t.to_uppercase();
    let columns = ctx.column_names();
    let fields = ctx.field_names();
    let titles: Vec<&str> = ctx.columns.iter().map(|c| c.title.as_str()).collect();
    let searchable: Vec<&str> = ctx
        .fields
        .iter()
        .filter(|f| matches!(f.input, InputKind::Text | InputKind::Textarea | InputKind::Email))
        .map(|f| f.name.as_str())
        .collect();
    let has_toggle = columns.contains(&TOGGLE_COLUMN) || fields.contains(&TOGGLE_COLUMN);
    let model = format!("apps.get_model(\"{}\", \"{}\")", ctx.app, ctx.model_class);

    write_imports(&mut out)?;
    writeln!(out, "{}_COLUMNS = {}", upper, py_list(&columns))?;
    writeln!(out, "{}_TITLES = {}", upper, py_list(&titles))?;
    writeln!(out, "{}_FIELDS = {}", upper, py_list(&fields))?;
    writeln!(out)?;
    writeln!(out)?;

    // list
    writeln!(out, "@login_required")?;
    writeln!(out, "def {}_list(request):", t)?;
    writeln!(out, "    Model = {}", model)?;
    writeln!(out, "    qs = Model.objects.all()")?;
    if let Some(list) = &ctx.list {
        if has_toggle && !list.show_inactive {
            writeln!(out, "    qs = qs.filter({}=True)", TOGGLE_COLUMN)?;
        }
        let order = match list.default_sort.dir {
            SortDirection::Desc => format!("-{}", list.default_sort.by),
            SortDirection::Asc => list.default_sort.by.clone(),
        };
        writeln!(out, "    qs = qs.order_by(\"{}\")", escape_python_string(&order))?;
    }
    writeln!(out, "    q = request.GET.get(\"q\", \"\").strip()")?;
    if !searchable.is_empty() {
        writeln!(out, "    if q:")?;
        writeln!(out, "        cond = Q()")?;
        writeln!(out, "        for name in {}:", py_list(&searchable))?;
        writeln!(out, "            cond |= Q(**{{name + \"__icontains\": q}})")?;
        writeln!(out, "        qs = qs.filter(cond)")?;
    }
    let page_size = ctx.list.as_ref().map(|l| l.page_size).unwrap_or(25);
    writeln!(out, "    page_obj = Paginator(qs.values(\"id\", *{}_COLUMNS), {}).get_page(request.GET.get(\"page\"))", upper, page_size)?;
    writeln!(out, "    return render(request, \"{}\", {{", ctx.templates.list)?;
    writeln!(out, "        \"rows\": page_obj.object_list,")?;
    writeln!(out, "        \"page_obj\": page_obj,")?;
    writeln!(out, "        \"q\": q,")?;
    writeln!(out, "        \"page_title\": \"{}\",", escape_python_string(ctx.title()))?;
    writeln!(out, "    }})")?;
    writeln!(out)?;
    writeln!(out)?;

    // create / update share the save path
    writeln!(out, "def _{}_save(request, instance=None):", t)?;
    writeln!(out, "    Model = {}", model)?;
    writeln!(out, "    Form = modelform_factory(Model, fields={}_FIELDS)", upper)?;
    writeln!(out, "    ajax = request.headers.get(\"X-Requested-With\") == \"XMLHttpRequest\"")?;
    writeln!(out, "    if request.method == \"POST\":")?;
    writeln!(out, "        form = Form(request.POST, request.FILES, instance=instance)")?;
    writeln!(out, "        if form.is_valid():")?;
    writeln!(out, "            obj = form.save(commit=False)")?;
    writeln!(out, "            if hasattr(obj, \"{}_id\"):", ctx.audit_user_column)?;
    writeln!(out, "                obj.{}_id = request.user.pk", ctx.audit_user_column)?;
    writeln!(out, "            obj.save()")?;
    writeln!(out, "            if ajax:")?;
    writeln!(out, "                return JsonResponse({{\"success\": True, \"id\": obj.pk}})")?;
    writeln!(out, "            return redirect(\"{}_list\")", t)?;
    writeln!(out, "        if ajax:")?;
    writeln!(out, "            return JsonResponse({{\"success\": False, \"errors\": form.errors}}, status=400)")?;
    writeln!(out, "    else:")?;
    writeln!(out, "        form = Form(instance=instance)")?;
    writeln!(out, "    return render(request, \"{}\", {{\"form\": form, \"object\": instance}})", ctx.templates.form)?;
    writeln!(out)?;
    writeln!(out)?;
    writeln!(out, "@login_required")?;
    writeln!(out, "def {}_create(request):", t)?;
    writeln!(out, "    return _{}_save(request)", t)?;
    writeln!(out)?;
    writeln!(out)?;
    writeln!(out, "@login_required")?;
    writeln!(out, "def {}_update(request, pk):", t)?;
    writeln!(out, "    obj = get_object_or_404({}, pk=pk)", model)?;
    writeln!(out, "    return _{}_save(request, obj)", t)?;
    writeln!(out)?;
    writeln!(out)?;

    writeln!(out, "@login_required")?;
    writeln!(out, "def {}_delete(request, pk):", t)?;
    writeln!(out, "    obj = get_object_or_404({}, pk=pk)", model)?;
    writeln!(out, "    if request.method == \"POST\":")?;
    writeln!(out, "        obj.delete()")?;
    writeln!(out, "        if request.headers.get(\"X-Requested-With\") == \"XMLHttpRequest\":")?;
    writeln!(out, "            return JsonResponse({{\"success\": True}})")?;
    writeln!(out, "        return redirect(\"{}_list\")", t)?;
    writeln!(out, "    return render(request, \"{}\", {{\"object\": obj}})", ctx.templates.confirm_delete)?;
    writeln!(out)?;
    writeln!(out)?;

    writeln!(out, "@login_required")?;
    writeln!(out, "def {}_json(request, pk):", t)?;
    writeln!(out, "    obj = get_object_or_404({}, pk=pk)", model)?;
    writeln!(out, "    data = {{\"id\": obj.pk}}")?;
    writeln!(out, "    for name in {}_FIELDS:", upper)?;
    writeln!(out, "        value = getattr(obj, name + \"_id\", getattr(obj, name, None))")?;
    writeln!(out, "        if hasattr(value, \"isoformat\"):")?;
    writeln!(out, "            value = value.isoformat()")?;
    writeln!(out, "        data[name] = \"\" if value is None else value if isinstance(value, (bool, int)) else str(value)")?;
    writeln!(out, "    return JsonResponse(data)")?;

    if let Some(list) = &ctx.list {
        if list.export_csv {
            write_export_csv(&mut out, ctx, &model)?;
        }
        if list.export_xlsx {
            write_export_xlsx(&mut out, ctx, &model)?;
        }
        if list.export_pdf {
            write_export_pdf(&mut out, ctx, &model)?;
        }
    }
    Ok(out)
}

fn write_export_csv(out: &mut String, ctx: &ArtifactContext, model: &str) -> fmt::Result {
    let t = &ctx.table;
    let upper = t.to_uppercase();
    writeln!(out)?;
    writeln!(out)?;
    writeln!(out, "@login_required")?;
    writeln!(out, "def {}_export_csv(request):", t)?;
    writeln!(out, "    import csv")?;
    writeln!(out, "    response = HttpResponse(content_type=\"text/csv\")")?;
    writeln!(out, "    response[\"Content-Disposition\"] = \"attachment; filename={}.csv\"", t)?;
    writeln!(out, "    writer = csv.writer(response)")?;
    writeln!(out, "    writer.writerow({}_TITLES)", upper)?;
    writeln!(out, "    for row in {}.objects.values_list(*{}_COLUMNS):", model, upper)?;
    writeln!(out, "        writer.writerow(row)")?;
    writeln!(out, "    return response")
}

fn write_export_xlsx(out: &mut String, ctx: &ArtifactContext, model: &str) -> fmt::Result {
    let t = &ctx.table;
    let upper = t.to_uppercase();
    writeln!(out)?;
    writeln!(out)?;
    writeln!(out, "@login_required")?;
    writeln!(out, "def {}_export_xlsx(request):", t)?;
    writeln!(out, "    import io")?;
    writeln!(out, "    from openpyxl import Workbook")?;
    writeln!(out, "    wb = Workbook()")?;
    writeln!(out, "    ws = wb.active")?;
    writeln!(out, "    ws.append({}_TITLES)", upper)?;
    writeln!(out, "    for row in {}.objects.values_list(*{}_COLUMNS):", model, upper)?;
    writeln!(out, "        ws.append([str(v) if v is not None else \"\" for v in row])")?;
    writeln!(out, "    buffer = io.BytesIO()")?;
    writeln!(out, "    wb.save(buffer)")?;
    writeln!(
        out,
        "    response = HttpResponse(buffer.getvalue(), content_type=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet\")"
    )?;
    writeln!(out, "    response[\"Content-Disposition\"] = \"attachment; filename={}.xlsx\"", t)?;
    writeln!(out, "    return response")
}

fn write_export_pdf(out: &mut String, ctx: &ArtifactContext, model: &str) -> fmt::Result {
    let t = &ctx.table;
    let upper = t.to_uppercase();
    writeln!(out)?;
    writeln!(out)?;
    writeln!(out, "@login_required")?;
    writeln!(out, "def {}_export_pdf(request):", t)?;
    writeln!(out, "    import io")?;
    writeln!(out, "    from reportlab.lib.pagesizes import letter")?;
    writeln!(out, "    from reportlab.pdfgen import canvas")?;
    writeln!(out, "    buffer = io.BytesIO()")?;
    writeln!(out, "    pdf = canvas.Canvas(buffer, pagesize=letter)")?;
    writeln!(out, "    text = pdf.beginText(40, 770)")?;
    writeln!(out, "    text.textLine(\", \".join({}_TITLES))", upper)?;
    writeln!(out, "    for row in {}.objects.values_list(*{}_COLUMNS)[:1000]:", model, upper)?;
    writeln!(out, "        text.textLine(\", \".join(str(v) for v in row))")?;
    writeln!(out, "        if text.getY() < 40:")?;
    writeln!(out, "            pdf.drawText(text)")?;
    writeln!(out, "            pdf.showPage()")?;
    writeln!(out, "            text = pdf.beginText(40, 770)")?;
    writeln!(out, "    pdf.drawText(text)")?;
    writeln!(out, "    pdf.save()")?;
    writeln!(out, "    response = HttpResponse(buffer.getvalue(), content_type=\"application/pdf\")")?;
    writeln!(out, "    response[\"Content-Disposition\"] = \"attachment; filename={}.pdf\"", t)?;
    writeln!(out, "    return response")
}

/// FK options endpoint shared by every generated form
pub fn render_shared(ctx: &ArtifactContext) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write_imports(&mut out)?;
    writeln!(out, "@login_required")?;
    writeln!(out, "def ajax_fk_options(request, table):")?;
    writeln!(out, "    try:")?;
    writeln!(out, "        Model = apps.get_model(\"{}\", table)", ctx.app)?;
    writeln!(out, "    except LookupError:")?;
    writeln!(out, "        return JsonResponse({{\"results\": []}})")?;
    writeln!(out, "    label = request.GET.get(\"label\", \"{}\")", FK_LABEL_COLUMN)?;
    writeln!(out, "    qs = Model.objects.all()")?;
    writeln!(out, "    if hasattr(Model, \"{}\"):", TOGGLE_COLUMN)?;
    writeln!(out, "        qs = qs.filter({}=True)", TOGGLE_COLUMN)?;
    writeln!(out, "    q = request.GET.get(\"q\", \"\").strip()")?;
    writeln!(out, "    if q:")?;
    writeln!(out, "        qs = qs.filter(**{{label + \"__icontains\": q}})")?;
    writeln!(out, "    results = [")?;
    writeln!(out, "        {{\"id\": obj.pk, \"label\": str(getattr(obj, label, obj))}}")?;
    writeln!(out, "        for obj in qs[:20]")?;
    writeln!(out, "    ]")?;
    writeln!(out, "    return JsonResponse({{\"results\": results}})")?;
    Ok(out)
}
