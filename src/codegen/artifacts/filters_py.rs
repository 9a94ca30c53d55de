/// Template filter library used by the list pages. Written once; later runs
/// leave a customized copy alone.

use std::fmt::{self, Write};

use super::ArtifactContext;

pub fn render(_ctx: &ArtifactContext) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "from decimal import Decimal, InvalidOperation")?;
    writeln!(out)?;
    writeln!(out, "from django import template")?;
    writeln!(out)?;
    writeln!(out, "register = template.Library()")?;
    writeln!(out)?;
    writeln!(out)?;
    writeln!(out, "def _decimal(value):")?;
    writeln!(out, "    try:")?;
    writeln!(out, "        return Decimal(str(value))")?;
    writeln!(out, "    except (InvalidOperation, TypeError, ValueError):")?;
    writeln!(out, "        return None")?;
    writeln!(out)?;
    writeln!(out)?;
    writeln!(out, "@register.filter")?;
    writeln!(out, "def currency(value, symbol=\"$\"):")?;
    writeln!(out, "    number = _decimal(value)")?;
    writeln!(out, "    if number is None:")?;
    writeln!(out, "        return \"\" if value is None else value")?;
    writeln!(out, "    return f\"{{symbol}}{{number:,.2f}}\"")?;
    writeln!(out)?;
    writeln!(out)?;
    writeln!(out, "@register.filter")?;
    writeln!(out, "def percent(value, decimals=1):")?;
    writeln!(out, "    number = _decimal(value)")?;
    writeln!(out, "    if number is None:")?;
    writeln!(out, "        return \"\" if value is None else value")?;
    writeln!(out, "    return f\"{{number:.{{int(decimals)}}f}}%\"")?;
    writeln!(out)?;
    writeln!(out)?;
    writeln!(out, "@register.filter")?;
    writeln!(out, "def attr(row, name):")?;
    writeln!(out, "    if isinstance(row, dict):")?;
    writeln!(out, "        return row.get(name, \"\")")?;
    writeln!(out, "    return getattr(row, name, \"\")")?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::artifacts::tests::facturas_context;

    #[test]
    fn test_filters_used_by_list_are_registered() {
        let py = render(&facturas_context()).unwrap();
        assert!(py.contains("def currency(value"));
        assert!(py.contains("def percent(value"));
        assert!(py.contains("return f\"{symbol}{number:,.2f}\""));
    }
}
