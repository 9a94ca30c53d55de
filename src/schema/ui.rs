//! UI vocabulary shared by the derived defaults, the override records and the
//! effective configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Horizontal alignment of a list column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }

    /// Bootstrap text utility class for the alignment
    pub fn css_class(&self) -> &'static str {
        match self {
            Alignment::Left => "text-start",
            Alignment::Center => "text-center",
            Alignment::Right => "text-end",
        }
    }
}

/// Display format tag of a list column.
///
/// Serialized as a short tag string (`number:2`, `truncate:80`, `currency`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnFormat {
    Text,
    Number { decimals: u32 },
    Truncate { chars: u32 },
    Date,
    DateTime,
    Currency,
    Decimal,
    Percent,
    Button,
    Badge,
    Link,
}

impl ColumnFormat {
    pub fn tag(&self) -> String {
        match self {
            ColumnFormat::Text => "text".to_string(),
            ColumnFormat::Number { decimals } => format!("number:{}", decimals),
            ColumnFormat::Truncate { chars } => format!("truncate:{}", chars),
            ColumnFormat::Date => "date".to_string(),
            ColumnFormat::DateTime => "datetime".to_string(),
            ColumnFormat::Currency => "currency".to_string(),
            ColumnFormat::Decimal => "decimal".to_string(),
            ColumnFormat::Percent => "percent".to_string(),
            ColumnFormat::Button => "button".to_string(),
            ColumnFormat::Badge => "badge".to_string(),
            ColumnFormat::Link => "link".to_string(),
        }
    }
}

impl fmt::Display for ColumnFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

impl FromStr for ColumnFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (head, arg) = match s.split_once(':') {
            Some((head, arg)) => (head, Some(arg)),
            None => (s, None),
        };
        let parse_arg = |default: u32| -> Result<u32, String> {
            match arg {
                Some(a) => a
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| format!("Invalid format argument in '{}'", s)),
                None => Ok(default),
            }
        };
        match head.trim() {
            "text" => Ok(ColumnFormat::Text),
            "number" => Ok(ColumnFormat::Number { decimals: parse_arg(0)? }),
            "truncate" => Ok(ColumnFormat::Truncate { chars: parse_arg(80)? }),
            "date" => Ok(ColumnFormat::Date),
            "datetime" => Ok(ColumnFormat::DateTime),
            "currency" => Ok(ColumnFormat::Currency),
            "decimal" => Ok(ColumnFormat::Decimal),
            "percent" => Ok(ColumnFormat::Percent),
            "button" => Ok(ColumnFormat::Button),
            "badge" => Ok(ColumnFormat::Badge),
            "link" => Ok(ColumnFormat::Link),
            other => Err(format!("Unknown column format '{}'", other)),
        }
    }
}

impl TryFrom<String> for ColumnFormat {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColumnFormat> for String {
    fn from(value: ColumnFormat) -> Self {
        value.tag()
    }
}

/// Input widget of a form field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Text,
    Textarea,
    Number,
    Checkbox,
    Radio,
    Select,
    Date,
    #[serde(rename = "datetime-local", alias = "datetime")]
    Datetime,
    Email,
    Password,
    File,
    Hidden,
}

impl InputKind {
    /// Value of the HTML `type` attribute (or element name for textarea/select)
    pub fn html_type(&self) -> &'static str {
        match self {
            InputKind::Text => "text",
            InputKind::Textarea => "textarea",
            InputKind::Number => "number",
            InputKind::Checkbox => "checkbox",
            InputKind::Radio => "radio",
            InputKind::Select => "select",
            InputKind::Date => "date",
            InputKind::Datetime => "datetime-local",
            InputKind::Email => "email",
            InputKind::Password => "password",
            InputKind::File => "file",
            InputKind::Hidden => "hidden",
        }
    }
}

/// Width of a form field as a fraction of the form row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WidthFraction {
    #[default]
    #[serde(rename = "1-1")]
    Full,
    #[serde(rename = "1-2")]
    Half,
    #[serde(rename = "1-3")]
    Third,
    #[serde(rename = "2-3")]
    TwoThirds,
    #[serde(rename = "1-4")]
    Quarter,
    #[serde(rename = "3-4")]
    ThreeQuarters,
    #[serde(rename = "1-6")]
    Sixth,
    #[serde(rename = "5-6")]
    FiveSixths,
}

impl WidthFraction {
    /// Numerator and denominator
    pub fn ratio(&self) -> (u8, u8) {
        match self {
            WidthFraction::Full => (1, 1),
            WidthFraction::Half => (1, 2),
            WidthFraction::Third => (1, 3),
            WidthFraction::TwoThirds => (2, 3),
            WidthFraction::Quarter => (1, 4),
            WidthFraction::ThreeQuarters => (3, 4),
            WidthFraction::Sixth => (1, 6),
            WidthFraction::FiveSixths => (5, 6),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WidthFraction::Full => "1-1",
            WidthFraction::Half => "1-2",
            WidthFraction::Third => "1-3",
            WidthFraction::TwoThirds => "2-3",
            WidthFraction::Quarter => "1-4",
            WidthFraction::ThreeQuarters => "3-4",
            WidthFraction::Sixth => "1-6",
            WidthFraction::FiveSixths => "5-6",
        }
    }
}

/// Action rendered by a list column configured as a button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnAction {
    Edit,
    Delete,
    ToggleActive,
    Custom,
}

/// Client-side validation rule attached to a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", content = "value", rename_all = "snake_case")]
pub enum Validation {
    MaxLength(u32),
    MinLength(u32),
    Pattern(String),
    MinValue(String),
    MaxValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_format_tags() {
        assert_eq!(ColumnFormat::Number { decimals: 2 }.tag(), "number:2");
        assert_eq!("truncate:80".parse::<ColumnFormat>().unwrap(), ColumnFormat::Truncate { chars: 80 });
        assert_eq!("currency".parse::<ColumnFormat>().unwrap(), ColumnFormat::Currency);
        assert!("sparkline".parse::<ColumnFormat>().is_err());
        assert!("number:x".parse::<ColumnFormat>().is_err());
    }

    #[test]
    fn test_width_fraction_yaml() {
        let w: WidthFraction = serde_yaml::from_str("\"1-4\"").unwrap();
        assert_eq!(w, WidthFraction::Quarter);
        assert_eq!(w.ratio(), (1, 4));
    }

    #[test]
    fn test_input_kind_datetime_alias() {
        let k: InputKind = serde_yaml::from_str("datetime").unwrap();
        assert_eq!(k, InputKind::Datetime);
        assert_eq!(k.html_type(), "datetime-local");
    }
}
