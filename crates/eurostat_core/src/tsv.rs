//! Tokenizing of the TSV data format.
//!
//! ```text
//! freq,unit,geo\TIME_PERIOD\t2000\t2001
//! A,NR,AL\t1526762 \t1535822 p
//! ```

use eurostat_error::{EurostatError, Result};

/// Separates dimension names from time periods in the header line.
pub const TIME_PERIOD_MARKER: &str = "\\TIME_PERIOD";

/// Token marking a missing observation.
const MISSING_VALUE: &str = ":";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsvHeader {
    /// Lower-cased dimension names.
    pub dimensions: Vec<String>,
    /// Time period labels, in column order.
    pub time_periods: Vec<String>,
}

impl TsvHeader {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some(pos) = line.find(TIME_PERIOD_MARKER) else {
            return Err(
                EurostatError::format("Missing time period marker in header")
                    .with_field("header", truncate(line, 120)),
            );
        };

        let dims = &line[..pos];
        if dims.is_empty() {
            return Err(EurostatError::format("Header declares no dimensions"));
        }
        let dimensions = dims.split(',').map(|d| d.trim().to_lowercase()).collect();

        let time_periods = line[pos + TIME_PERIOD_MARKER.len()..]
            .split('\t')
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(|p| p.to_string())
            .collect();

        Ok(TsvHeader {
            dimensions,
            time_periods,
        })
    }
}

/// A tokenized data line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLine<'a> {
    /// Comma joined dimension values as they appear in the line.
    pub raw_dimensions: &'a str,
    /// Observation fields aligned to the header's time periods. May be
    /// shorter than the list of periods, missing trailing fields are
    /// missing observations.
    pub fields: Vec<&'a str>,
}

impl<'a> DataLine<'a> {
    pub fn parse(line: &'a str, header: &TsvHeader) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut parts = line.split('\t');
        let raw_dimensions = parts.next().unwrap_or("");

        let num_dims = raw_dimensions.split(',').count();
        if num_dims != header.dimensions.len() {
            return Err(EurostatError::format(
                "Data line has an unexpected number of dimension values",
            )
            .with_field("expected", header.dimensions.len())
            .with_field("got", num_dims)
            .with_field("line", truncate(line, 120)));
        }

        let mut fields: Vec<_> = parts.collect();
        // Blank trailing fields mirror a trailing tab in the header, whose
        // empty labels aren't periods.
        while fields.len() > header.time_periods.len()
            && fields.last().is_some_and(|f| f.trim().is_empty())
        {
            fields.pop();
        }
        if fields.len() > header.time_periods.len() {
            return Err(
                EurostatError::format("Data line has more fields than time periods")
                    .with_field("expected", header.time_periods.len())
                    .with_field("got", fields.len())
                    .with_field("line", truncate(line, 120)),
            );
        }

        Ok(DataLine {
            raw_dimensions,
            fields,
        })
    }

    pub fn dimension_values(&self) -> impl Iterator<Item = &'a str> {
        self.raw_dimensions.split(',').map(|v| v.trim())
    }

    /// Get the field for a time period by index, empty if the line ends
    /// before it.
    pub fn field(&self, idx: usize) -> &'a str {
        self.fields.get(idx).copied().unwrap_or("")
    }
}

/// Parse an observation field.
///
/// Fields may carry status flags after the value (`"2.5 p"`, `": c"`). Only
/// the leading number is used. Returns `None` for missing or unparsable
/// values.
pub fn parse_observation(field: &str) -> Option<f64> {
    let value = field.split_whitespace().next()?;
    if value == MISSING_VALUE {
        return None;
    }
    value.parse::<f64>().ok()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use eurostat_error::ErrorKind;

    use super::*;

    #[test]
    fn parse_header() {
        let header = TsvHeader::parse("freq,unit,sex,age,geo\\TIME_PERIOD\t2000\t2001").unwrap();
        assert_eq!(vec!["freq", "unit", "sex", "age", "geo"], header.dimensions);
        assert_eq!(vec!["2000", "2001"], header.time_periods);
    }

    #[test]
    fn parse_header_case_and_padding() {
        let header = TsvHeader::parse("FREQ,GEO\\TIME_PERIOD\t2000-Q1 \t2000-Q2 \r\n").unwrap();
        assert_eq!(vec!["freq", "geo"], header.dimensions);
        assert_eq!(vec!["2000-Q1", "2000-Q2"], header.time_periods);
    }

    #[test]
    fn header_without_marker() {
        let err = TsvHeader::parse("freq,geo\t2000\t2001").unwrap_err();
        assert_eq!(ErrorKind::Format, err.kind());

        let err = TsvHeader::parse("\\TIME_PERIOD\t2000").unwrap_err();
        assert_eq!(ErrorKind::Format, err.kind());
    }

    #[test]
    fn parse_data_line() {
        let header = TsvHeader::parse("freq,unit,sex,age,geo\\TIME_PERIOD\t2000\t2001").unwrap();
        let line = DataLine::parse("A,NR,F,TOTAL,AL\t1526762 \t1535822 p", &header).unwrap();

        assert_eq!("A,NR,F,TOTAL,AL", line.raw_dimensions);
        assert_eq!(
            vec!["A", "NR", "F", "TOTAL", "AL"],
            line.dimension_values().collect::<Vec<_>>()
        );
        assert_eq!(Some(1526762.0), parse_observation(line.field(0)));
        assert_eq!(Some(1535822.0), parse_observation(line.field(1)));
        assert_eq!("", line.field(2));
    }

    #[test]
    fn data_line_dimension_mismatch() {
        let header = TsvHeader::parse("freq,geo\\TIME_PERIOD\t2000").unwrap();
        let err = DataLine::parse("A,NR,AL\t1.0", &header).unwrap_err();
        assert_eq!(ErrorKind::Format, err.kind());
    }

    #[test]
    fn data_line_too_many_fields() {
        let header = TsvHeader::parse("freq,geo\\TIME_PERIOD\t2000").unwrap();
        let err = DataLine::parse("A,AL\t1.0\t2.0", &header).unwrap_err();
        assert_eq!(ErrorKind::Format, err.kind());
    }

    #[test]
    fn trailing_blank_fields_ignored() {
        let header = TsvHeader::parse("freq,geo\\TIME_PERIOD\t2000\t").unwrap();
        assert_eq!(vec!["2000"], header.time_periods);

        let line = DataLine::parse("A,AL\t1.0\t\t ", &header).unwrap();
        assert_eq!(vec!["1.0"], line.fields);

        let err = DataLine::parse("A,AL\t1.0\t\t2.0", &header).unwrap_err();
        assert_eq!(ErrorKind::Format, err.kind());
    }

    #[test]
    fn data_line_short() {
        let header = TsvHeader::parse("freq,geo\\TIME_PERIOD\t2000\t2001").unwrap();
        let line = DataLine::parse("A,AL\t1.0", &header).unwrap();
        assert_eq!(1, line.fields.len());
        assert_eq!(None, parse_observation(line.field(1)));
    }

    #[test]
    fn observations() {
        assert_eq!(Some(2.5), parse_observation("2.5"));
        assert_eq!(Some(2.5), parse_observation("2.5 p"));
        assert_eq!(Some(-1.0), parse_observation(" -1 e"));
        assert_eq!(None, parse_observation(""));
        assert_eq!(None, parse_observation("  "));
        assert_eq!(None, parse_observation(":"));
        assert_eq!(None, parse_observation(": c"));
        assert_eq!(None, parse_observation("n/a"));
    }
}
