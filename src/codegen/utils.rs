//! Naming and escaping helpers for code generation.

use convert_case::{Case, Casing};

/// Convert a string to PascalCase
pub fn to_pascal_case(s: &str) -> String {
    s.to_case(Case::Pascal)
}

/// Human label for a technical name: `fecha_emision` -> `Fecha Emision`
pub fn to_label(s: &str) -> String {
    s.to_case(Case::Title)
}

/// Escape text for an HTML attribute or text node
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Escape a string for use inside a double-quoted Python literal
pub fn escape_python_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}
