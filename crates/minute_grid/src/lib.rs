pub mod error;
pub mod export;
pub mod grid;
pub mod pipeline;
pub mod resolve;

pub use error::{GridError, ProviderError};
pub use grid::{MINUTES_PER_DAY, NormalizedGrid, minute_slots, normalize};
pub use pipeline::{BarProvider, Download, Outcome, Request, run, run_resolved};
pub use resolve::{
    DEFAULT_SYMBOL, DEFAULT_TIMEZONE, ResolvedInput, XLSX_MIME, parse_timezone, resolve_input,
};
