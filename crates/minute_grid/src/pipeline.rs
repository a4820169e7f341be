use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::{info, warn};
use minute_model::RawBar;

use crate::error::{ProviderError, Result};
use crate::export::export_xlsx;
use crate::grid::{NormalizedGrid, normalize};
use crate::resolve::{ResolvedInput, resolve_input};

/// Source of one-minute bars for a symbol over `[start, end)`.
#[allow(async_fn_in_trait)]
pub trait BarProvider {
    async fn fetch_minute_bars(
        &self,
        symbol: &str,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> std::result::Result<Vec<RawBar>, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct Request {
    pub symbol: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub grid: NormalizedGrid,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The provider had nothing for this symbol and date; no file is produced.
    NoData(ResolvedInput),
    Ready(Download),
}

/// One full run: resolve inputs, fetch once, normalize onto the minute grid, export.
pub async fn run<P: BarProvider>(
    provider: &P,
    tz: Tz,
    request: &Request,
    now: DateTime<Utc>,
) -> Result<Outcome> {
    let input = resolve_input(&request.symbol, &request.date, tz, now)?;
    run_resolved(provider, tz, input).await
}

/// Everything after input resolution, for callers that report the resolved
/// symbol and date before the fetch starts.
pub async fn run_resolved<P: BarProvider>(
    provider: &P,
    tz: Tz,
    input: ResolvedInput,
) -> Result<Outcome> {
    info!("{}", input.fetching_message());

    let (start, end) = input.fetch_window(tz);
    let bars = provider.fetch_minute_bars(&input.symbol, start, end).await?;

    if bars.is_empty() {
        warn!("No data found for {} on {}", input.symbol, input.date);
        return Ok(Outcome::NoData(input));
    }

    let grid = normalize(input.date, tz, &bars);
    let bytes = export_xlsx(&grid)?;
    let filename = input.filename();
    info!(
        "Data ready | file: {} | minutes with data: {} | bytes: {}",
        filename,
        grid.matched,
        bytes.len()
    );

    Ok(Outcome::Ready(Download {
        filename,
        bytes,
        grid,
    }))
}
