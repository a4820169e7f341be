use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use thiserror::Error;

const DEFAULT_HEALTHCHECK_URL: &str = "http://localhost:8080/healthcheck";

#[derive(Debug, Error)]
enum HealthcheckError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status code {0}")]
    Status(u16),
    #[error("service reported status '{0}'")]
    NotOk(String),
}

#[derive(Debug, Deserialize)]
struct StatusJSON {
    status: String,
}

fn healthcheck_url() -> String {
    dotenv().ok();
    env::var("STOCK_GRID_HEALTHCHECK_URL").unwrap_or_else(|_| DEFAULT_HEALTHCHECK_URL.to_string())
}

fn check(status: &StatusJSON) -> Result<(), HealthcheckError> {
    if status.status != "ok" {
        return Err(HealthcheckError::NotOk(status.status.clone()));
    }
    Ok(())
}

fn main() -> Result<(), HealthcheckError> {
    let res = reqwest::blocking::get(healthcheck_url())?;
    if res.status() != 200 {
        return Err(HealthcheckError::Status(res.status().as_u16()));
    }
    let status: StatusJSON = res.json::<StatusJSON>()?;
    check(&status)
}
