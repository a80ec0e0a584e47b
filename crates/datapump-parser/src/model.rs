use std::fmt;

/// Column order every candle file is expected to follow.
pub const EXPECTED_HEADER: [&str; 6] = ["Timestamp", "Open", "Close", "High", "Low", "Volume"];

/// Number of numeric fields in one data row.
pub const FIELD_COUNT: usize = EXPECTED_HEADER.len();

/// One time-bucketed price/volume observation for a trading pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    pub pair: String,
}

/// Outcome of looking at the first line of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderCheck {
    /// The sniffer did not consider line 1 a header; it was parsed as data.
    Absent,
    /// A header was consumed and matches [`EXPECTED_HEADER`].
    Canonical,
    /// A header was consumed but differs from [`EXPECTED_HEADER`].
    Mismatch(Vec<String>),
}

impl HeaderCheck {
    pub fn from_fields(fields: Vec<String>) -> Self {
        let matches = fields.len() == EXPECTED_HEADER.len()
            && fields
                .iter()
                .zip(EXPECTED_HEADER)
                .all(|(given, expected)| given.trim() == expected);

        if matches {
            HeaderCheck::Canonical
        } else {
            HeaderCheck::Mismatch(fields)
        }
    }

    pub fn is_present(&self) -> bool {
        !matches!(self, HeaderCheck::Absent)
    }
}

impl fmt::Display for HeaderCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderCheck::Absent => write!(f, "no header given"),
            HeaderCheck::Canonical => write!(f, "{}", EXPECTED_HEADER.join(",")),
            HeaderCheck::Mismatch(fields) => write!(f, "{}", fields.join(",")),
        }
    }
}

/// Every data row of one file, normalized, plus what was found on line 1.
#[derive(Debug, Clone)]
pub struct ParsedCandles {
    pub pair: String,
    pub header: HeaderCheck,
    pub candles: Vec<Candle>,
}
