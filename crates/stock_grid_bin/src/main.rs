use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use dotenvy::dotenv;
use log::{error, info};
use minute_grid::{
    BarProvider, DEFAULT_SYMBOL, DEFAULT_TIMEZONE, GridError, Outcome, Request, parse_timezone,
    resolve_input, run_resolved,
};
use serde::{Deserialize, Serialize};
use std::{env, process::exit, time::Duration};
use yahoo_api::api::{YAHOO_BASE_API_URL, YahooAPI};

use actix_web::{
    App, HttpResponse, HttpServer, Responder, get,
    http::{StatusCode, header::ContentType},
    middleware::Logger,
    web,
};

use page::{DownloadLink, Notice};

mod page;
mod utils;

#[derive(Serialize)]
struct HealthcheckResponse {
    status: String,
}

#[derive(Deserialize)]
struct DownloadQuery {
    symbol: Option<String>,
    date: Option<String>,
}

struct GridSettings {
    timezone: Tz,
}

fn html(status: StatusCode, body: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type(ContentType::html())
        .body(body)
}

#[get("/")]
async fn index() -> impl Responder {
    html(StatusCode::OK, page::render(DEFAULT_SYMBOL, "", &[], None))
}

/// Resolves, fetches and exports, then renders the page for whatever happened.
/// Bad input is rejected before the info notice; later failures keep it.
async fn download_page<P: BarProvider>(
    provider: &P,
    tz: Tz,
    request: &Request,
    now: DateTime<Utc>,
) -> (StatusCode, String) {
    let input = match resolve_input(&request.symbol, &request.date, tz, now) {
        Ok(input) => input,
        Err(e) => {
            error!("download | symbol: {} | {}", request.symbol, e);
            let notices = [Notice::Error(e.to_string())];
            let body = page::render(&request.symbol, &request.date, &notices, None);
            return (StatusCode::BAD_REQUEST, body);
        }
    };

    let mut notices = vec![Notice::Info(input.fetching_message())];
    match run_resolved(provider, tz, input).await {
        Ok(Outcome::Ready(file)) => {
            notices.push(Notice::Success(
                "Data ready! Click below to download.".to_string(),
            ));
            let link = DownloadLink {
                filename: &file.filename,
                bytes: &file.bytes,
            };
            let body = page::render(&request.symbol, &request.date, &notices, Some(&link));
            (StatusCode::OK, body)
        }
        Ok(Outcome::NoData(input)) => {
            notices.push(Notice::Warning(format!(
                "No data found for {} on {} (the provider may have limits).",
                input.symbol, input.date
            )));
            let body = page::render(&request.symbol, &request.date, &notices, None);
            (StatusCode::OK, body)
        }
        Err(e) => {
            let status = match &e {
                GridError::Parse { .. } => StatusCode::BAD_REQUEST,
                GridError::Provider(_) => StatusCode::BAD_GATEWAY,
                GridError::Export(_) | GridError::Timezone(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error!("download | symbol: {} | {}", request.symbol, e);
            notices.push(Notice::Error(e.to_string()));
            let body = page::render(&request.symbol, &request.date, &notices, None);
            (status, body)
        }
    }
}

#[get("/download")]
async fn download(
    query: web::Query<DownloadQuery>,
    api: web::Data<YahooAPI>,
    settings: web::Data<GridSettings>,
) -> HttpResponse {
    let query = query.into_inner();
    let request = Request {
        symbol: query.symbol.unwrap_or_else(|| DEFAULT_SYMBOL.to_string()),
        date: query.date.unwrap_or_default(),
    };

    let (status, body) =
        download_page(api.get_ref(), settings.timezone, &request, Utc::now()).await;
    html(status, body)
}

#[get("/healthcheck")]
async fn healthcheck() -> impl Responder {
    web::Json(HealthcheckResponse {
        status: "ok".to_string(),
    })
}

async fn not_found() -> impl Responder {
    HttpResponse::NotFound().json(HealthcheckResponse {
        status: "not found".to_string(),
    })
}

struct Config {
    workers: usize,
    bind: String,
    timezone: Tz,
    provider_url: String,
    fetch_timeout: Duration,
}

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

impl Config {
    fn new() -> Result<Config, Box<dyn std::error::Error>> {
        dotenv().ok();

        let mut workers: usize = env_or("STOCK_GRID_WORKERS", "1").parse()?;
        let bind = env_or("STOCK_GRID_BIND", "0.0.0.0:8080");
        let timezone = parse_timezone(&env_or("STOCK_GRID_TIMEZONE", DEFAULT_TIMEZONE))?;
        let provider_url = env_or("STOCK_GRID_PROVIDER_URL", YAHOO_BASE_API_URL);
        let timeout_secs: u64 = env_or("STOCK_GRID_FETCH_TIMEOUT_SECS", "30").parse()?;

        if workers == 0 {
            workers = 1;
        }

        let config = Config {
            workers,
            bind,
            timezone,
            provider_url,
            fetch_timeout: Duration::from_secs(timeout_secs),
        };
        Ok(config)
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let config = match Config::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Could not create config: {}", e);
            exit(1);
        }
    };

    let yahoo_api = match YahooAPI::new(&config.provider_url, config.fetch_timeout) {
        Ok(api) => web::Data::new(api),
        Err(e) => {
            error!("Could not create provider client: {}", e);
            exit(1);
        }
    };
    let settings = web::Data::new(GridSettings {
        timezone: config.timezone,
    });
    info!(
        "Serving on {} | timezone: {} | provider: {}",
        config.bind, config.timezone, config.provider_url
    );

    HttpServer::new(move || {
        App::new()
            .app_data(yahoo_api.clone())
            .app_data(settings.clone())
            .service(index)
            .service(download)
            .service(healthcheck)
            .default_service(web::to(not_found))
            .wrap(Logger::default())
    })
    .bind(config.bind.as_str())?
    .workers(config.workers)
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;
    use chrono::{NaiveDate, TimeZone};
    use minute_grid::ProviderError;
    use minute_model::{BarTimestamp, RawBar};

    struct FixedBars(Vec<RawBar>);

    impl BarProvider for FixedBars {
        async fn fetch_minute_bars(
            &self,
            _symbol: &str,
            _start: DateTime<Tz>,
            _end: DateTime<Tz>,
        ) -> Result<Vec<RawBar>, ProviderError> {
            Ok(self.0.clone())
        }
    }

    fn request(date: &str) -> Request {
        Request {
            symbol: "RELIANCE.NS".to_string(),
            date: date.to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 16, 6, 0, 0).unwrap()
    }

    fn unreachable_api() -> web::Data<YahooAPI> {
        web::Data::new(YahooAPI::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap())
    }

    fn kolkata() -> web::Data<GridSettings> {
        web::Data::new(GridSettings {
            timezone: chrono_tz::Asia::Kolkata,
        })
    }

    #[actix_web::test]
    async fn index_pass_renders_form() {
        let app = test::init_service(App::new().service(index)).await;
        let req = test::TestRequest::get().uri("/").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("RELIANCE.NS"));
        assert!(body.contains(r#"action="/download""#));
    }

    #[actix_web::test]
    async fn healthcheck_pass_ok() {
        let app = test::init_service(App::new().service(healthcheck)).await;
        let req = test::TestRequest::get().uri("/healthcheck").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
    }

    #[actix_web::test]
    async fn not_found_pass_json() {
        let app = test::init_service(App::new().default_service(web::to(not_found))).await;
        let req = test::TestRequest::get().uri("/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn download_fail_bad_date() {
        let app = test::init_service(
            App::new()
                .app_data(unreachable_api())
                .app_data(kolkata())
                .service(download),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/download?symbol=RELIANCE.NS&date=15-03-2024")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("15-03-2024"));
    }

    #[actix_web::test]
    async fn download_fail_provider_unreachable() {
        let app = test::init_service(
            App::new()
                .app_data(unreachable_api())
                .app_data(kolkata())
                .service(download),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/download?symbol=RELIANCE.NS&date=2024-03-15")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("Fetching RELIANCE.NS 1-minute data for 2024-03-15"));
        assert!(body.contains("notice error"));
    }

    #[actix_web::test]
    async fn download_page_pass_info_then_success_with_link() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(3, 45, 0)
            .unwrap();
        let provider = FixedBars(vec![RawBar {
            timestamp: BarTimestamp::Naive(ts),
            open: 2850.0,
            close: 2852.5,
            volume: 4000,
        }]);
        let (status, body) =
            download_page(&provider, chrono_tz::Asia::Kolkata, &request(""), now()).await;
        assert_eq!(status, StatusCode::OK);

        let info = body
            .find("Fetching RELIANCE.NS 1-minute data for 2024-03-15")
            .unwrap();
        let success = body.find("Data ready! Click below to download.").unwrap();
        assert!(info < success);
        assert!(body.contains(r#"download="RELIANCE_NS_2024-03-15.xlsx""#));
        // base64 of the zip magic "PK\x03\x04"
        assert!(body.contains(";base64,UEsDB"));
    }

    #[actix_web::test]
    async fn download_page_pass_no_data_warns_after_info() {
        let provider = FixedBars(vec![]);
        let (status, body) =
            download_page(&provider, chrono_tz::Asia::Kolkata, &request("2024-03-15"), now())
                .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("notice info"));
        assert!(body.contains("No data found for RELIANCE.NS on 2024-03-15"));
        assert!(!body.contains("notice success"));
        assert!(!body.contains("data:"));
    }

    #[actix_web::test]
    async fn download_page_fail_bad_date_skips_info() {
        let provider = FixedBars(vec![]);
        let (status, body) =
            download_page(&provider, chrono_tz::Asia::Kolkata, &request("2024/03/15"), now())
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("notice error"));
        assert!(!body.contains("notice info"));
    }
}
