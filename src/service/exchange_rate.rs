use crate::error::{ReportError, Result};
use futures::future::{self, BoxFuture, FutureExt};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// 汇率来源, 失败时返回固定的兜底汇率, 不向上报错
pub trait ExchangeRateProvider: Send + Sync {
    fn rate<'a>(&'a self, base: &'a str, quote: &'a str) -> BoxFuture<'a, f64>;
}

/// 固定汇率 (测试或离线运行)
#[derive(Debug, Clone, Copy)]
pub struct FixedRate(pub f64);

impl ExchangeRateProvider for FixedRate {
    fn rate<'a>(&'a self, _base: &'a str, _quote: &'a str) -> BoxFuture<'a, f64> {
        future::ready(self.0).boxed()
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    rates: HashMap<String, f64>,
}

/// `GET <endpoint>/<base>` -> `{ "rates": { "<quote>": n } }`
#[derive(Clone)]
pub struct HttpExchangeRate {
    http: reqwest::Client,
    endpoint: String,
    fallback: f64,
}

impl HttpExchangeRate {
    pub fn new(endpoint: impl Into<String>, fallback: f64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            fallback,
        })
    }

    async fn fetch(&self, base: &str, quote: &str) -> Result<f64> {
        let url = format!("{}/{}", self.endpoint, base);
        let response = self.http.get(&url).send().await?.error_for_status()?;
        let body: RatesResponse = response.json().await?;
        match body.rates.get(quote) {
            Some(rate) if *rate > 0.0 => Ok(*rate),
            _ => Err(ReportError::Source(format!(
                "Invalid exchange rate received for {}/{}",
                base, quote
            ))),
        }
    }

    async fn rate_or_fallback(&self, base: &str, quote: &str) -> f64 {
        match self.fetch(base, quote).await {
            Ok(rate) => {
                tracing::info!("Current {} to {} exchange rate: {}", base, quote, rate);
                rate
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to fetch exchange rate, using fallback value {}: {}",
                    self.fallback,
                    e
                );
                self.fallback
            }
        }
    }
}

impl ExchangeRateProvider for HttpExchangeRate {
    fn rate<'a>(&'a self, base: &'a str, quote: &'a str) -> BoxFuture<'a, f64> {
        self.rate_or_fallback(base, quote).boxed()
    }
}
