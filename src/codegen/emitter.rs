//! Idempotent artifact emitter.
//!
//! Generated text lands in files inside machine-owned regions delimited by a
//! start and an end marker line:
//!
//! ```text
//! <!-- [pagesmith:list start] -->      (templates)
//! # [pagesmith:views:facturas start]   (Python)
//! // [pagesmith:routes start]          (JS/TS/Rust)
//! ```
//!
//! Everything outside a region is left byte-for-byte untouched. Regions are
//! located by whole lines, never by mid-line substrings. A start marker with
//! no end marker after it (or the reverse) counts as no region at all.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::codegen::fs_utils;
use crate::error::FsFailure;

/// Comment syntax used for marker lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `<!-- ... -->`
    Markup,
    /// `# ...`
    Hash,
    /// `// ...`
    Slash,
}

/// How a file without markers is treated on overwrite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Layout-bearing file: replaced whole
    Template,
    /// Code file: a new region is inserted
    Code,
}

impl FileKind {
    /// Classify by extension; unknown extensions are code with `#` comments
    pub fn for_path(path: &Path) -> (FileKind, CommentStyle) {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "html" | "htm" | "xml" | "jinja" | "j2" | "svg" => (FileKind::Template, CommentStyle::Markup),
            "rs" | "js" | "ts" | "jsx" | "tsx" | "go" | "java" | "c" | "h" | "cpp" => {
                (FileKind::Code, CommentStyle::Slash)
            }
            _ => (FileKind::Code, CommentStyle::Hash),
        }
    }
}

/// Marker line builder for one tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    tag: String,
}

impl Markers {
    pub fn new(tag: impl Into<String>) -> Self {
        Markers { tag: tag.into() }
    }

    pub fn start_token(&self, key: &str) -> String {
        format!("[{}:{} start]", self.tag, key)
    }

    pub fn end_token(&self, key: &str) -> String {
        format!("[{}:{} end]", self.tag, key)
    }

    fn line(style: CommentStyle, token: &str) -> String {
        match style {
            CommentStyle::Markup => format!("<!-- {} -->", token),
            CommentStyle::Hash => format!("# {}", token),
            CommentStyle::Slash => format!("// {}", token),
        }
    }

    pub fn start_line(&self, style: CommentStyle, key: &str) -> String {
        Self::line(style, &self.start_token(key))
    }

    pub fn end_line(&self, style: CommentStyle, key: &str) -> String {
        Self::line(style, &self.end_token(key))
    }

    /// `content` wrapped in start/end marker lines, newline-terminated
    pub fn wrap(&self, style: CommentStyle, key: &str, content: &str) -> String {
        let mut out = self.start_line(style, key);
        out.push('\n');
        out.push_str(content);
        if !content.is_empty() && !content.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&self.end_line(style, key));
        out.push('\n');
        out
    }
}

/// Where a located region sits, as line indices (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Absent,
    /// Unpaired markers; treated like `Absent`
    Malformed,
    Present { start: usize, end: usize },
}

/// Locate the first well-formed region. The first end marker that has a
/// start marker above it closes the region; the nearest such start opens it,
/// so an earlier orphan start never swallows the lines in between.
pub fn find_region(lines: &[&str], start_token: &str, end_token: &str) -> Region {
    let mut open: Option<usize> = None;
    let mut seen = false;
    for (i, line) in lines.iter().enumerate() {
        if line.contains(start_token) {
            open = Some(i);
            seen = true;
        } else if line.contains(end_token) {
            if let Some(start) = open {
                return Region::Present { start, end: i };
            }
            seen = true;
        }
    }
    if seen {
        Region::Malformed
    } else {
        Region::Absent
    }
}

fn split_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

/// Line-level merge for shared list declarations (one route file, many tables)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMerge {
    /// A list entry containing any of these belongs to the table being emitted
    pub owner_tokens: Vec<String>,
    /// Entries containing these are shared by every table and kept once
    pub shared_tokens: Vec<String>,
    /// Line opening the list inside the block (`urlpatterns += [`)
    pub open_line: String,
    /// Line closing the list (`]`)
    pub close_line: String,
}

impl LineMerge {
    /// Split a block body into (head, entries, tail) around the list lines
    fn split<'t>(&self, body: &'t str) -> (Vec<&'t str>, Vec<&'t str>, Vec<&'t str>) {
        let lines: Vec<&str> = body.lines().collect();
        let open = lines.iter().position(|l| l.trim() == self.open_line.trim());
        let close = open.and_then(|o| {
            lines[o + 1..]
                .iter()
                .position(|l| l.trim() == self.close_line.trim())
                .map(|c| o + 1 + c)
        });
        match (open, close) {
            (Some(o), Some(c)) => (
                lines[..o].to_vec(),
                lines[o + 1..c].to_vec(),
                lines[c + 1..].to_vec(),
            ),
            _ => (Vec::new(), lines, Vec::new()),
        }
    }

    /// Merge `new_body` into `old_body`: entries owned by the emitting table
    /// are replaced, other tables' entries kept verbatim, shared entries kept
    /// once at the end. Head and tail come from the new body.
    pub fn merge(&self, old_body: &str, new_body: &str) -> String {
        let (_, old_entries, _) = self.split(old_body);
        let (head, new_entries, tail) = self.split(new_body);

        let is_shared = |l: &str| self.shared_tokens.iter().any(|t| l.contains(t.as_str()));
        let is_owned = |l: &str| self.owner_tokens.iter().any(|t| l.contains(t.as_str()));

        let mut merged: Vec<&str> = Vec::new();
        let mut shared: Option<&str> = None;
        let candidates = old_entries
            .iter()
            .filter(|l| !is_owned(**l))
            .chain(new_entries.iter());
        for &line in candidates {
            if line.trim().is_empty() || merged.contains(&line) {
                continue;
            }
            if is_shared(line) {
                shared = Some(line);
                continue;
            }
            merged.push(line);
        }
        // shared entries close the list
        merged.extend(shared);

        let mut out = String::new();
        for line in head {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&self.open_line);
        out.push('\n');
        for line in merged {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&self.close_line);
        out.push('\n');
        for line in tail {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// How an existing region is refreshed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Swap the whole region for the new content
    #[default]
    Replace,
    /// Merge list entries line by line
    LineMerge(LineMerge),
}

/// Where a new region goes in an existing code file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Insertion {
    #[default]
    EndOfFile,
    /// Right after the list literal assigned to `name` (`urlpatterns = [...]`);
    /// when there is none, `name = []` is appended first
    AfterListLiteral { name: String },
}

/// Write-policy of the target file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    /// Follow the marker decision table
    #[default]
    Managed,
    /// Write only when the file does not exist yet
    CreateOnly,
}

/// One request to land a block of content in a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    pub path: PathBuf,
    pub key: String,
    pub content: String,
    pub overwrite: bool,
    pub strategy: Strategy,
    pub insertion: Insertion,
    pub policy: Policy,
}

impl Emission {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>, content: impl Into<String>) -> Self {
        Emission {
            path: path.into(),
            key: key.into(),
            content: content.into(),
            overwrite: false,
            strategy: Strategy::Replace,
            insertion: Insertion::EndOfFile,
            policy: Policy::Managed,
        }
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn insertion(mut self, insertion: Insertion) -> Self {
        self.insertion = insertion;
        self
    }

    pub fn policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Region exists and overwrite is off
    AlreadyPresent,
    /// File exists without a region and overwrite is off
    OverwriteDisabled,
    /// Rewriting would not change a byte
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmitOutcome {
    Created,
    Updated,
    Skipped(SkipReason),
}

/// Pure decision: new file text (and outcome) or a skip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Write { text: String, outcome: EmitOutcome },
    Skip(SkipReason),
}

/// Lands emissions on disk according to the marker decision table
#[derive(Debug, Clone)]
pub struct Emitter {
    markers: Markers,
}

impl Emitter {
    pub fn new(tag: impl Into<String>) -> Self {
        Emitter {
            markers: Markers::new(tag),
        }
    }

    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    /// Decide what `req` does to a file whose current text is `existing`
    pub fn plan(&self, existing: Option<&str>, req: &Emission) -> Plan {
        let (kind, style) = FileKind::for_path(&req.path);
        let block = self.markers.wrap(style, &req.key, &req.content);

        let Some(existing) = existing else {
            let text = match req.insertion {
                Insertion::AfterListLiteral { ref name } => format!("{} = []\n\n{}", name, block),
                Insertion::EndOfFile => block,
            };
            return Plan::Write {
                text,
                outcome: EmitOutcome::Created,
            };
        };

        if req.policy == Policy::CreateOnly {
            return Plan::Skip(SkipReason::AlreadyPresent);
        }

        let lines = split_lines(existing);
        let region = find_region(
            &lines,
            &self.markers.start_token(&req.key),
            &self.markers.end_token(&req.key),
        );

        let text = match region {
            Region::Present { .. } if !req.overwrite => return Plan::Skip(SkipReason::AlreadyPresent),
            Region::Present { start, end } => {
                let block = match req.strategy {
                    Strategy::Replace => block,
                    Strategy::LineMerge(ref merge) => {
                        let old_body: String = lines[start + 1..end].concat();
                        let body = merge.merge(&old_body, &req.content);
                        self.markers.wrap(style, &req.key, &body)
                    }
                };
                replace_lines(&lines, start, end, &block)
            }
            Region::Absent | Region::Malformed if !req.overwrite => {
                return Plan::Skip(SkipReason::OverwriteDisabled)
            }
            Region::Absent | Region::Malformed => {
                if region == Region::Malformed {
                    debug!(path = %req.path.display(), key = %req.key, "Unpaired markers, treating region as absent");
                }
                match kind {
                    FileKind::Template => block,
                    FileKind::Code => insert_block(existing, &lines, &req.insertion, &block),
                }
            }
        };

        if text == existing {
            Plan::Skip(SkipReason::Unchanged)
        } else {
            Plan::Write {
                text,
                outcome: EmitOutcome::Updated,
            }
        }
    }

    /// Apply `req` to the file system
    pub fn emit(&self, req: &Emission) -> Result<EmitOutcome, FsFailure> {
        let existing = fs_utils::read_text(&req.path)?;
        match self.plan(existing.as_deref(), req) {
            Plan::Skip(reason) => {
                debug!(path = %req.path.display(), key = %req.key, ?reason, "Skipped");
                Ok(EmitOutcome::Skipped(reason))
            }
            Plan::Write { text, outcome } => {
                fs_utils::write_text(&req.path, &text)?;
                debug!(path = %req.path.display(), key = %req.key, ?outcome, "Written");
                Ok(outcome)
            }
        }
    }
}

/// Replace lines `start..=end` with `block`, keeping everything else as is
fn replace_lines(lines: &[&str], start: usize, end: usize, block: &str) -> String {
    let mut out: String = lines[..start].concat();
    if lines[end].ends_with('\n') {
        out.push_str(block);
    } else {
        out.push_str(block.strip_suffix('\n').unwrap_or(block));
    }
    out.push_str(&lines[end + 1..].concat());
    out
}

fn insert_block(existing: &str, lines: &[&str], insertion: &Insertion, block: &str) -> String {
    match insertion {
        Insertion::EndOfFile => append_block(existing, block),
        Insertion::AfterListLiteral { name } => match find_list_literal(lines, name) {
            Some(close) => {
                let mut out: String = lines[..=close].concat();
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(block);
                out.push_str(&lines[close + 1..].concat());
                out
            }
            None => append_block(existing, &format!("{} = []\n\n{}", name, block)),
        },
    }
}

fn append_block(existing: &str, block: &str) -> String {
    if existing.trim().is_empty() {
        return format!("{}{}", existing, block);
    }
    let mut out = existing.to_string();
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out.push('\n');
    out.push_str(block);
    out
}

/// Index of the line closing the list literal assigned to `name`
fn find_list_literal(lines: &[&str], name: &str) -> Option<usize> {
    let open = lines.iter().position(|l| {
        let t = l.trim_start();
        t.strip_prefix(name)
            .map(|rest| rest.trim_start().starts_with('=') && l.contains('['))
            .unwrap_or(false)
            && !l.starts_with(char::is_whitespace)
    })?;
    let mut depth: i32 = 0;
    for (i, line) in lines.iter().enumerate().skip(open) {
        for ch in line.chars() {
            match ch {
                '[' => depth += 1,
                ']' => depth -= 1,
                _ => {}
            }
        }
        if depth <= 0 {
            return Some(i);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emitter() -> Emitter {
        Emitter::new("pagesmith")
    }

    fn write(plan: Plan) -> String {
        match plan {
            Plan::Write { text, .. } => text,
            Plan::Skip(r) => panic!("unexpected skip: {:?}", r),
        }
    }

    fn routes_merge(table: &str) -> LineMerge {
        LineMerge {
            owner_tokens: vec![format!("path('{}/", table)],
            shared_tokens: vec!["ajax/fk/".to_string()],
            open_line: "urlpatterns += [".to_string(),
            close_line: "]".to_string(),
        }
    }

    fn routes(table: &str) -> String {
        format!(
            "urlpatterns += [\n    path('{t}/', views.{t}_list, name='{t}_list'),\n    path('ajax/fk/<str:table>/', views.ajax_fk_options, name='ajax_fk_options'),\n]\n",
            t = table
        )
    }

    #[test]
    fn test_marker_lines_by_file_kind() {
        let m = Markers::new("pagesmith");
        assert_eq!(m.start_line(CommentStyle::Markup, "list"), "<!-- [pagesmith:list start] -->");
        assert_eq!(m.end_line(CommentStyle::Hash, "urls"), "# [pagesmith:urls end]");
        assert_eq!(FileKind::for_path(Path::new("a/b.html")).0, FileKind::Template);
        assert_eq!(FileKind::for_path(Path::new("views.py")).1, CommentStyle::Hash);
        assert_eq!(FileKind::for_path(Path::new("app.ts")).1, CommentStyle::Slash);
    }

    #[test]
    fn test_create_when_missing() {
        let req = Emission::new("t/list.html", "list", "<p>hola</p>\n");
        match emitter().plan(None, &req) {
            Plan::Write { text, outcome } => {
                assert_eq!(outcome, EmitOutcome::Created);
                assert_eq!(
                    text,
                    "<!-- [pagesmith:list start] -->\n<p>hola</p>\n<!-- [pagesmith:list end] -->\n"
                );
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn test_replace_preserves_outside_bytes() {
        let existing = "header line\n# [pagesmith:views:facturas start]\nold\n# [pagesmith:views:facturas end]\nfooter\n";
        let req = Emission::new("app/views.py", "views:facturas", "new body\n").overwrite(true);
        let text = write(emitter().plan(Some(existing), &req));
        assert_eq!(
            text,
            "header line\n# [pagesmith:views:facturas start]\nnew body\n# [pagesmith:views:facturas end]\nfooter\n"
        );
    }

    #[test]
    fn test_overwrite_false_skips() {
        let with_region = "# [pagesmith:k start]\nx\n# [pagesmith:k end]\n";
        let req = Emission::new("f.py", "k", "y\n");
        assert_eq!(
            emitter().plan(Some(with_region), &req),
            Plan::Skip(SkipReason::AlreadyPresent)
        );
        assert_eq!(
            emitter().plan(Some("plain\n"), &req),
            Plan::Skip(SkipReason::OverwriteDisabled)
        );
    }

    #[test]
    fn test_identical_content_is_unchanged() {
        let req = Emission::new("f.py", "k", "y\n").overwrite(true);
        let first = write(emitter().plan(None, &req));
        assert_eq!(
            emitter().plan(Some(&first), &req),
            Plan::Skip(SkipReason::Unchanged)
        );
    }

    #[test]
    fn test_template_without_markers_is_replaced_whole() {
        let req = Emission::new("x.html", "form", "<form></form>\n").overwrite(true);
        let text = write(emitter().plan(Some("<div>hand made</div>\n"), &req));
        assert!(!text.contains("hand made"));
        assert!(text.starts_with("<!-- [pagesmith:form start] -->"));
    }

    #[test]
    fn test_code_without_markers_appends() {
        let req = Emission::new("views.py", "views:facturas", "def facturas_list():\n    pass\n").overwrite(true);
        let existing = "from django.shortcuts import render\n";
        let text = write(emitter().plan(Some(existing), &req));
        assert!(text.starts_with(existing));
        assert!(text.ends_with("# [pagesmith:views:facturas end]\n"));
    }

    #[test]
    fn test_malformed_markers_are_treated_as_absent() {
        let existing = "keep\n# [pagesmith:k start]\nhalf written\n";
        let req = Emission::new("f.py", "k", "fresh\n").overwrite(true);
        let text = write(emitter().plan(Some(existing), &req));
        assert!(text.starts_with(existing));
        assert!(text.ends_with("# [pagesmith:k start]\nfresh\n# [pagesmith:k end]\n"));

        let lines = split_lines("# [pagesmith:k end]\n# [pagesmith:k start]\n");
        assert_eq!(
            find_region(&lines, "[pagesmith:k start]", "[pagesmith:k end]"),
            Region::Malformed
        );
    }

    #[test]
    fn test_orphan_start_survives_second_pass() {
        let e = emitter();
        let existing = "keep\n# [pagesmith:k start]\nhalf written\nuser code\n";
        let first = Emission::new("f.py", "k", "one\n").overwrite(true);
        let text = write(e.plan(Some(existing), &first));
        assert!(text.starts_with(existing));

        let second = Emission::new("f.py", "k", "two\n").overwrite(true);
        let text = write(e.plan(Some(&text), &second));
        assert!(text.starts_with(existing));
        assert!(text.contains("user code\n"));
        assert!(text.ends_with("# [pagesmith:k start]\ntwo\n# [pagesmith:k end]\n"));
        assert!(!text.contains("one\n"));

        let lines = split_lines(&text);
        assert_eq!(
            find_region(&lines, "[pagesmith:k start]", "[pagesmith:k end]"),
            Region::Present { start: 5, end: 7 }
        );
    }

    #[test]
    fn test_line_merge_prefix_related_tables() {
        let e = emitter();
        let first = Emission::new("app/urls.py", "urls", routes("facturas_det"))
            .overwrite(true)
            .strategy(Strategy::LineMerge(routes_merge("facturas_det")));
        let text = write(e.plan(None, &first));

        let second = Emission::new("app/urls.py", "urls", routes("facturas"))
            .overwrite(true)
            .strategy(Strategy::LineMerge(routes_merge("facturas")));
        let text = write(e.plan(Some(&text), &second));
        assert!(text.contains("path('facturas_det/', views.facturas_det_list"));
        assert!(text.contains("path('facturas/', views.facturas_list"));

        // regenerating the shorter name leaves the longer one alone
        let changed = routes("facturas").replace("facturas_list'", "facturas_index'");
        let third = Emission::new("app/urls.py", "urls", changed)
            .overwrite(true)
            .strategy(Strategy::LineMerge(routes_merge("facturas")));
        let text = write(e.plan(Some(&text), &third));
        assert_eq!(text.matches("views.facturas_det_list").count(), 1);
        assert!(text.contains("name='facturas_index'"));
        assert!(!text.contains("name='facturas_list'"));
    }

    #[test]
    fn test_marker_key_prefix_does_not_match() {
        let existing = "# [pagesmith:views:facturas_det start]\nx\n# [pagesmith:views:facturas_det end]\n";
        let lines = split_lines(existing);
        assert_eq!(
            find_region(&lines, "[pagesmith:views:facturas start]", "[pagesmith:views:facturas end]"),
            Region::Absent
        );
    }

    #[test]
    fn test_insert_after_list_literal() {
        let existing = "from django.urls import path\n\nurlpatterns = [\n    path('', home),\n]\n\n# hand written\n";
        let req = Emission::new("app/urls.py", "urls", routes("facturas"))
            .overwrite(true)
            .insertion(Insertion::AfterListLiteral {
                name: "urlpatterns".to_string(),
            });
        let text = write(emitter().plan(Some(existing), &req));
        assert!(text.starts_with("from django.urls import path\n\nurlpatterns = [\n    path('', home),\n]\n# [pagesmith:urls start]\n"));
        assert!(text.ends_with("\n# hand written\n"));
    }

    #[test]
    fn test_create_declares_list() {
        let req = Emission::new("app/urls.py", "urls", routes("facturas")).insertion(
            Insertion::AfterListLiteral {
                name: "urlpatterns".to_string(),
            },
        );
        let text = write(emitter().plan(None, &req));
        assert!(text.starts_with("urlpatterns = []\n\n# [pagesmith:urls start]\n"));
    }

    #[test]
    fn test_line_merge_keeps_other_tables_and_dedups_shared() {
        let e = emitter();
        let first = Emission::new("app/urls.py", "urls", routes("clientes"))
            .overwrite(true)
            .strategy(Strategy::LineMerge(routes_merge("clientes")));
        let text = write(e.plan(None, &first));

        let second = Emission::new("app/urls.py", "urls", routes("facturas"))
            .overwrite(true)
            .strategy(Strategy::LineMerge(routes_merge("facturas")));
        let text = write(e.plan(Some(&text), &second));
        assert!(text.contains("views.clientes_list"));
        assert!(text.contains("views.facturas_list"));
        assert_eq!(text.matches("ajax/fk/").count(), 1);

        // regenerate clientes with a changed route: old line replaced, facturas kept
        let changed = routes("clientes").replace("clientes_list'", "clientes_index'");
        let third = Emission::new("app/urls.py", "urls", changed)
            .overwrite(true)
            .strategy(Strategy::LineMerge(routes_merge("clientes")));
        let text = write(e.plan(Some(&text), &third));
        assert_eq!(text.matches("views.clientes_list").count(), 1);
        assert!(text.contains("name='clientes_index'"));
        assert!(text.contains("views.facturas_list"));
        assert_eq!(text.matches("ajax/fk/").count(), 1);
        assert_eq!(text.matches("urlpatterns += [").count(), 1);

        // same content again is a no-op
        assert_eq!(e.plan(Some(&text), &third), Plan::Skip(SkipReason::Unchanged));
    }

    #[test]
    fn test_create_only_policy() {
        let req = Emission::new("templatetags/filters.py", "filters", "x\n")
            .overwrite(true)
            .policy(Policy::CreateOnly);
        assert!(matches!(emitter().plan(None, &req), Plan::Write { .. }));
        assert_eq!(
            emitter().plan(Some("custom\n"), &req),
            Plan::Skip(SkipReason::AlreadyPresent)
        );
    }

    #[test]
    fn test_emit_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates/app/facturas_list.html");
        let e = emitter();
        let req = Emission::new(&path, "list", "<table></table>\n").overwrite(true);
        assert_eq!(e.emit(&req).unwrap(), EmitOutcome::Created);
        let first = std::fs::read_to_string(&path).unwrap();
        assert_eq!(e.emit(&req).unwrap(), EmitOutcome::Skipped(SkipReason::Unchanged));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), first);
    }
}
