//! Classification of geographic codes.
//!
//! See <https://ec.europa.eu/eurostat/statistics-explained/index.php?title=Glossary:Country_codes>

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Country codes known to the classifier, along with their names.
pub const COUNTRY_CODES: &[(&str, &str)] = &[
    // European Union (EU)
    ("BE", "Belgium"),
    ("BG", "Bulgaria"),
    ("CZ", "Czechia"),
    ("DK", "Denmark"),
    ("DE", "Germany"),
    ("EE", "Estonia"),
    ("IE", "Ireland"),
    ("EL", "Greece"),
    ("ES", "Spain"),
    ("FR", "France"),
    ("HR", "Croatia"),
    ("IT", "Italy"),
    ("CY", "Cyprus"),
    ("LV", "Latvia"),
    ("LT", "Lithuania"),
    ("LU", "Luxembourg"),
    ("HU", "Hungary"),
    ("MT", "Malta"),
    ("NL", "Netherlands"),
    ("AT", "Austria"),
    ("PL", "Poland"),
    ("PT", "Portugal"),
    ("RO", "Romania"),
    ("SI", "Slovenia"),
    ("SK", "Slovakia"),
    ("FI", "Finland"),
    ("SE", "Sweden"),
    // European Free Trade Association (EFTA)
    ("IS", "Iceland"),
    ("LI", "Liechtenstein"),
    ("NO", "Norway"),
    ("CH", "Switzerland"),
    // Candidate countries
    ("BA", "Bosnia and Herzegovina"),
    ("ME", "Montenegro"),
    ("MD", "Moldova"),
    ("MK", "North Macedonia"),
    ("GE", "Georgia"),
    ("AL", "Albania"),
    ("RS", "Serbia"),
    ("TR", "Türkiye"),
    ("UA", "Ukraine"),
    // Potential candidates
    ("XK", "Kosovo"),
    // European Neighbourhood Policy, east
    ("AM", "Armenia"),
    ("BY", "Belarus"),
    ("AZ", "Azerbaijan"),
    // European Neighbourhood Policy, south
    ("DZ", "Algeria"),
    ("EG", "Egypt"),
    ("IL", "Israel"),
    ("JO", "Jordan"),
    ("LB", "Lebanon"),
    ("LY", "Libya"),
    ("MA", "Morocco"),
    ("PS", "Palestine"),
    ("SY", "Syria"),
    ("TN", "Tunisia"),
    // Others
    ("AR", "Argentina"),
    ("AU", "Australia"),
    ("BR", "Brazil"),
    ("CA", "Canada"),
    ("CN_X_HK", "China (except Hong Kong)"),
    ("HK", "Hong Kong"),
    ("IN", "India"),
    ("JP", "Japan"),
    ("MX", "Mexico"),
    ("NG", "Nigeria"),
    ("NZ", "New Zealand"),
    ("RU", "Russia"),
    ("SG", "Singapore"),
    ("ZA", "South Africa"),
    ("KR", "South Korea"),
    ("TW", "Taiwan"),
    ("UK", "United Kingdom"),
    ("US", "United States"),
];

static COUNTRY_LOOKUP: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| COUNTRY_CODES.iter().copied().collect());

/// Prefixes of codes that denote groupings of countries.
const AGGREGATE_PREFIXES: &[&str] = &["EU", "EA", "EFTA"];

/// Get the name of a country from its code.
pub fn country_name(code: &str) -> Option<&'static str> {
    COUNTRY_LOOKUP.get(code).copied()
}

/// Level of a geographic code in the NUTS classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeoLevel {
    Aggregate,
    Country,
    Nuts1,
    Nuts2,
    Nuts3,
    City,
    Unknown,
}

impl GeoLevel {
    /// All levels a code can be classified as, excluding `Unknown`.
    pub const ALL: [GeoLevel; 6] = [
        GeoLevel::Aggregate,
        GeoLevel::Country,
        GeoLevel::Nuts1,
        GeoLevel::Nuts2,
        GeoLevel::Nuts3,
        GeoLevel::City,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Aggregate => "aggregate",
            Self::Country => "country",
            Self::Nuts1 => "nuts1",
            Self::Nuts2 => "nuts2",
            Self::Nuts3 => "nuts3",
            Self::City => "city",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for GeoLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify a geographic code.
pub fn classify_geo_code(code: &str) -> GeoLevel {
    if AGGREGATE_PREFIXES.iter().any(|p| code.starts_with(p)) {
        return GeoLevel::Aggregate;
    }

    let known_prefix = || {
        code.get(0..2)
            .map(|prefix| COUNTRY_LOOKUP.contains_key(prefix))
            .unwrap_or(false)
    };

    let level = match code.len() {
        2 => GeoLevel::Country,
        3 => GeoLevel::Nuts1,
        4 => GeoLevel::Nuts2,
        5 => GeoLevel::Nuts3,
        7 if code.as_bytes()[2] == b'_' => GeoLevel::City,
        _ => return GeoLevel::Unknown,
    };

    if known_prefix() {
        level
    } else {
        GeoLevel::Unknown
    }
}
