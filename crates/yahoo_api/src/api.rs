use chrono::{DateTime, FixedOffset, Offset, Utc};
use chrono_tz::Tz;
use itertools::izip;
use log::{debug, warn};
use minute_grid::{BarProvider, ProviderError};
use minute_model::{BarTimestamp, RawBar};
use serde::Deserialize;
use std::time::Duration;

pub const YAHOO_BASE_API_URL: &str = "https://query2.finance.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    gmtoffset: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

pub struct YahooAPI {
    base_url: String,
    client: reqwest::Client,
}

impl YahooAPI {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(YahooAPI {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn chart_url(
        &self,
        symbol: &str,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> Result<reqwest::Url, ProviderError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ProviderError::Network(format!("bad base url {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::Network(format!("bad base url {}", self.base_url)))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        url.query_pairs_mut()
            .append_pair("period1", &start.timestamp().to_string())
            .append_pair("period2", &end.timestamp().to_string())
            .append_pair("interval", "1m")
            .append_pair("includePrePost", "false");
        Ok(url)
    }

    pub async fn get_minute_bars(
        &self,
        symbol: &str,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> Result<Vec<RawBar>, ProviderError> {
        let url = self.chart_url(symbol, start, end)?;

        debug!("get_minute_bars | url: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if status == reqwest::StatusCode::NOT_FOUND
            || status == reqwest::StatusCode::UNPROCESSABLE_ENTITY
        {
            warn!("get_minute_bars | no data | symbol: {} | status: {}", symbol, status);
            return Ok(vec![]);
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                symbol: symbol.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let chart: ChartResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))?;

        let bars = parse_chart(symbol, chart);
        debug!("get_minute_bars | symbol: {} | bars: {}", symbol, bars.len());
        Ok(bars)
    }
}

impl BarProvider for YahooAPI {
    async fn fetch_minute_bars(
        &self,
        symbol: &str,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> Result<Vec<RawBar>, ProviderError> {
        self.get_minute_bars(symbol, start, end).await
    }
}

fn padded<T>(values: Vec<Option<T>>, len: usize) -> impl Iterator<Item = Option<T>> {
    values.into_iter().chain(std::iter::repeat_with(|| None)).take(len)
}

fn parse_chart(symbol: &str, chart: ChartResponse) -> Vec<RawBar> {
    let Some(data) = chart.chart.result.and_then(|r| r.into_iter().next()) else {
        if let Some(err) = chart.chart.error {
            warn!(
                "parse_chart | provider error | symbol: {} | {}: {}",
                symbol,
                err.code,
                err.description.unwrap_or_default()
            );
        }
        return vec![];
    };

    // no timestamps means no trades in the requested window
    let Some(timestamps) = data.timestamp else {
        return vec![];
    };

    let offset = data
        .meta
        .and_then(|meta| meta.gmtoffset)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix());

    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
    let len = timestamps.len();
    if quote.open.len() != len || quote.close.len() != len || quote.volume.len() != len {
        warn!(
            "parse_chart | ragged quote arrays | symbol: {} | timestamps: {} | open: {} | close: {} | volume: {}",
            symbol,
            len,
            quote.open.len(),
            quote.close.len(),
            quote.volume.len()
        );
    }

    // short arrays read as missing values so later timestamps keep their slot
    let opens = padded(quote.open, len);
    let closes = padded(quote.close, len);
    let volumes = padded(quote.volume, len);

    izip!(&timestamps, opens, closes, volumes)
        .filter_map(|(t, open, close, volume)| {
            let timestamp = DateTime::from_timestamp(*t, 0)?.with_timezone(&offset);
            Some(RawBar {
                timestamp: BarTimestamp::Aware(timestamp),
                open: open?,
                close: close?,
                volume: volume.unwrap_or_default(),
            })
        })
        .collect()
}
