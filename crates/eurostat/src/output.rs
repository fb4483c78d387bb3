use std::fmt::Display;
use std::io::Write;

use eurostat_error::Result;

/// Write a single tab separated row.
///
/// Tabs and newlines inside values are replaced with spaces so every row stays
/// on one line.
pub fn write_row<W, I>(out: &mut W, values: I) -> Result<()>
where
    W: Write,
    I: IntoIterator,
    I::Item: Display,
{
    for (idx, value) in values.into_iter().enumerate() {
        if idx > 0 {
            out.write_all(b"\t")?;
        }
        let value = value.to_string();
        if value.contains(['\t', '\n', '\r']) {
            out.write_all(value.replace(['\t', '\n', '\r'], " ").as_bytes())?;
        } else {
            out.write_all(value.as_bytes())?;
        }
    }
    out.write_all(b"\n")?;
    Ok(())
}

/// Format an optional value, writing nothing for `None`.
pub fn or_empty<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
