//! Derived UI defaults.
//!
//! Pure functions from a column's type and name to its default list-column
//! descriptor and form-field descriptor. Type mapping comes first, then the
//! naming conventions (`id_<table>` foreign keys, `activo` toggles, `email`,
//! passwords, file uploads) override it.

use serde::Serialize;

use crate::codegen::utils::to_label;
use crate::schema::{Alignment, ColumnFacts, ColumnFormat, ColumnType, InputKind, Validation, WidthFraction};

/// Column rendered as an on/off toggle in lists and a checkbox in forms
pub const TOGGLE_COLUMN: &str = "activo";

/// Label column read from FK targets when building select options
pub const FK_LABEL_COLUMN: &str = "nombre";

/// One entry of a select field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// How one column renders in a list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub title: String,
    pub alignment: Alignment,
    pub format: Option<ColumnFormat>,
    pub visible: bool,
    pub is_toggle: bool,
    pub order_index: i32,
    pub width_px: Option<u32>,
    pub action: Option<crate::schema::ColumnAction>,
    pub link_template: Option<String>,
    pub fk_table: Option<String>,
}

/// How one column renders as a form field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub label: String,
    pub placeholder: String,
    pub input: InputKind,
    pub required: bool,
    pub width: WidthFraction,
    pub step: Option<String>,
    pub validations: Vec<Validation>,
    /// `accept` attribute of file inputs
    pub accept: Option<String>,
    pub preview: bool,
    pub help_text: Option<String>,
    pub default_value: Option<serde_json::Value>,
    pub visible: bool,
    pub order_index: i32,
    pub fk_table: Option<String>,
    pub options: Vec<SelectOption>,
}

/// Columns that never get a form field. The default is derived from the
/// default project configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPolicy {
    pub excluded_columns: Vec<String>,
}

impl FormPolicy {
    pub fn excludes(&self, column: &str) -> bool {
        self.excluded_columns.iter().any(|c| c == column)
    }
}

/// Step attribute of a numeric input: `1`, `0.1`, `0.01`, ...
fn numeric_step(scale: u32) -> String {
    if scale == 0 {
        "1".to_string()
    } else {
        format!("0.{}1", "0".repeat(scale as usize - 1))
    }
}

/// Default list descriptor of a column
pub fn derive_column(facts: &ColumnFacts) -> ColumnDescriptor {
    let (alignment, format) = match facts.data_type {
        ColumnType::Integer
        | ColumnType::Bigint
        | ColumnType::Smallint
        | ColumnType::Serial
        | ColumnType::Bigserial => (Alignment::Right, None),
        ColumnType::Numeric => {
            let scale = facts.scale.unwrap_or(0);
            let format = (scale > 0).then_some(ColumnFormat::Number { decimals: scale });
            (Alignment::Right, format)
        }
        ColumnType::Varchar => (Alignment::Left, None),
        ColumnType::Text => (Alignment::Left, Some(ColumnFormat::Truncate { chars: 80 })),
        ColumnType::Boolean => (Alignment::Center, None),
        ColumnType::Date => (Alignment::Center, Some(ColumnFormat::Date)),
        ColumnType::Timestamp => (Alignment::Center, Some(ColumnFormat::DateTime)),
    };

    let fk_table = facts.fk_target().map(str::to_string);
    let is_toggle = facts.name == TOGGLE_COLUMN;
    // FK columns keep their technical name as title
    let title = if fk_table.is_some() {
        facts.name.clone()
    } else {
        to_label(&facts.name)
    };

    ColumnDescriptor {
        name: facts.name.clone(),
        title,
        alignment: if is_toggle { Alignment::Center } else { alignment },
        format,
        visible: true,
        is_toggle,
        order_index: facts.position as i32,
        width_px: None,
        action: None,
        link_template: None,
        fk_table,
    }
}

/// Default form field of a column, or `None` when the column gets no field
/// (generated primary keys and audit columns).
pub fn derive_field(
    facts: &ColumnFacts,
    policy: &FormPolicy,
    page_title: Option<&str>,
) -> Option<FieldDescriptor> {
    if facts.is_generated_key() || policy.excludes(&facts.name) {
        return None;
    }

    let name = facts.name.as_str();
    let mut label = match page_title {
        Some(title) if name == FK_LABEL_COLUMN => title.to_string(),
        _ => to_label(name),
    };
    let mut placeholder = format!("Ingrese {}", label.to_lowercase());
    let mut width = WidthFraction::Full;
    let mut step = None;
    let mut validations = Vec::new();

    let mut input = match facts.data_type {
        ColumnType::Integer
        | ColumnType::Bigint
        | ColumnType::Smallint
        | ColumnType::Serial
        | ColumnType::Bigserial => {
            step = Some(numeric_step(0));
            InputKind::Number
        }
        ColumnType::Numeric => {
            step = Some(numeric_step(facts.scale.unwrap_or(0)));
            InputKind::Number
        }
        ColumnType::Varchar => {
            width = match facts.length {
                Some(l) if l <= 50 => WidthFraction::Quarter,
                Some(l) if l <= 100 => WidthFraction::Half,
                _ => WidthFraction::TwoThirds,
            };
            if let Some(l) = facts.length {
                validations.push(Validation::MaxLength(l));
            }
            InputKind::Text
        }
        ColumnType::Text => InputKind::Textarea,
        ColumnType::Boolean => {
            width = WidthFraction::Quarter;
            placeholder.clear();
            InputKind::Checkbox
        }
        ColumnType::Date => {
            width = WidthFraction::Quarter;
            placeholder.clear();
            InputKind::Date
        }
        ColumnType::Timestamp => {
            width = WidthFraction::Half;
            placeholder.clear();
            InputKind::Datetime
        }
    };

    let fk_table = facts.fk_target().map(str::to_string);
    if let Some(ref target) = fk_table {
        let target_label = to_label(target);
        input = InputKind::Select;
        label = format!("Seleccionar {}", target_label);
        placeholder = format!("Seleccione {}", target_label.to_lowercase());
        width = WidthFraction::Half;
        step = None;
    }

    let mut accept = None;
    let mut preview = false;
    if name == TOGGLE_COLUMN {
        input = InputKind::Checkbox;
        width = WidthFraction::Quarter;
        placeholder.clear();
        step = None;
    } else if name == "email" {
        input = InputKind::Email;
        width = WidthFraction::Half;
    } else if name.contains("password") || name.contains("contrasena") {
        input = InputKind::Password;
        width = WidthFraction::Half;
        validations.retain(|v| !matches!(v, Validation::MinLength(_)));
        validations.push(Validation::MinLength(8));
    } else if name == "archivo" || name == "imagen" {
        input = InputKind::File;
        width = WidthFraction::Half;
        placeholder = format!("Seleccione {}", label.to_lowercase());
        step = None;
        if name == "imagen" {
            accept = Some("image/*".to_string());
            preview = true;
        }
    }

    // checkboxes are never required
    let required = !facts.nullable && input != InputKind::Checkbox;

    Some(FieldDescriptor {
        name: facts.name.clone(),
        label,
        placeholder,
        input,
        required,
        width,
        step,
        validations,
        accept,
        preview,
        help_text: None,
        default_value: facts
            .default_value
            .clone()
            .map(serde_json::Value::String),
        visible: true,
        order_index: facts.position as i32,
        fk_table,
        options: Vec::new(),
    })
}
