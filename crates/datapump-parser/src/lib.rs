pub mod errors;
pub mod header;
pub mod model;
mod normalize;

pub use errors::ParserError;
pub use header::has_header;
pub use model::{Candle, HeaderCheck, ParsedCandles, EXPECTED_HEADER, FIELD_COUNT};
pub use normalize::{normalize_row, parse_candles, strip_field};
