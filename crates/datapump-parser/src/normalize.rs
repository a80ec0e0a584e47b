use csv::{Reader, ReaderBuilder, StringRecord};

use crate::errors::ParserError;
use crate::header::has_header;
use crate::model::{Candle, HeaderCheck, ParsedCandles, FIELD_COUNT};

/// Comma separated, `|` quoted, no implicit header, ragged rows allowed so the
/// field count can be reported per line.
pub(crate) fn candle_reader(bytes: &[u8]) -> Reader<&[u8]> {
    ReaderBuilder::new()
        .delimiter(b',')
        .quote(b'|')
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes)
}

/// Removes leading blanks of every line in the field and any blanks that sit
/// directly in front of a `:`. Other whitespace is left alone.
pub fn strip_field(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blanks = String::new();
    let mut line_start = true;

    for c in raw.chars() {
        if c == ' ' || c == '\t' {
            if !line_start {
                blanks.push(c);
            }
            continue;
        }
        if c != ':' {
            out.push_str(&blanks);
        }
        blanks.clear();
        line_start = c == '\n';
        out.push(c);
    }
    out.push_str(&blanks);
    out
}

fn parse_number(pair: &str, line: u64, raw: &str) -> Result<f64, ParserError> {
    let cleaned = strip_field(raw);
    cleaned
        .trim()
        .parse::<f64>()
        .map_err(|err| ParserError::MalformedRow {
            pair: pair.to_string(),
            line,
            field: raw.to_string(),
            message: format!("failed to parse as float: {err}"),
        })
}

fn parse_timestamp(pair: &str, line: u64, raw: &str) -> Result<i64, ParserError> {
    let value = parse_number(pair, line, raw)?;
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(ParserError::MalformedRow {
            pair: pair.to_string(),
            line,
            field: raw.to_string(),
            message: "timestamp must be a whole number of milliseconds".to_string(),
        });
    }
    // 2^63 is exact in f64; anything at or past it would saturate on the cast.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if !(-LIMIT..LIMIT).contains(&value) {
        return Err(ParserError::MalformedRow {
            pair: pair.to_string(),
            line,
            field: raw.to_string(),
            message: "timestamp out of range".to_string(),
        });
    }
    Ok(value as i64)
}

/// Turns one raw data row into a [`Candle`] labelled with `pair`.
pub fn normalize_row(pair: &str, line: u64, record: &StringRecord) -> Result<Candle, ParserError> {
    if record.len() != FIELD_COUNT {
        return Err(ParserError::FieldCount {
            pair: pair.to_string(),
            line,
            found: record.len(),
            expected: FIELD_COUNT,
        });
    }

    let number = |idx: usize| parse_number(pair, line, &record[idx]);

    Ok(Candle {
        timestamp: parse_timestamp(pair, line, &record[0])?,
        open: number(1)?,
        close: number(2)?,
        high: number(3)?,
        low: number(4)?,
        volume: number(5)?,
        pair: pair.to_string(),
    })
}

/// Parses the full contents of one candle file.
///
/// When the sniffer decides line 1 is a header it is consumed and returned
/// in [`ParsedCandles::header`] without being normalized; every remaining row
/// must normalize or the whole file fails.
pub fn parse_candles(pair: &str, content: &str) -> Result<ParsedCandles, ParserError> {
    let mut reader = candle_reader(content.as_bytes());
    let mut records = reader.records();
    let csv_error = |source| ParserError::Csv {
        pair: pair.to_string(),
        source,
    };

    let header = if has_header(content) {
        match records.next().transpose().map_err(csv_error)? {
            Some(record) => HeaderCheck::from_fields(record.iter().map(str::to_string).collect()),
            None => HeaderCheck::Absent,
        }
    } else {
        HeaderCheck::Absent
    };

    let mut candles = Vec::new();
    for result in records {
        let record = result.map_err(csv_error)?;
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();
        candles.push(normalize_row(pair, line, &record)?);
    }

    Ok(ParsedCandles {
        pair: pair.to_string(),
        header,
        candles,
    })
}
