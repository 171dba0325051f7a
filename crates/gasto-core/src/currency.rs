//! Currency conversion via the ExchangeRate API
//!
//! Rates come from the free `latest/{base}` endpoint and are cached in
//! memory per (from, to, date) triple. Conversion never fails the expense
//! pipeline: any lookup problem degrades to a rate of 1.0 with a warning.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Local, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::Result;

const DEFAULT_API_BASE: &str = "https://api.exchangerate-api.com/v4";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Exchange rate lookup and amount conversion
///
/// Cheap to clone; clones share the rate cache.
#[derive(Clone)]
pub struct CurrencyConverter {
    http_client: Client,
    base_url: String,
    base_currency: String,
    api_key: Option<String>,
    cache: Arc<Mutex<HashMap<(String, String, NaiveDate), f64>>>,
}

impl CurrencyConverter {
    /// Create a converter targeting the given base currency
    pub fn new(base_currency: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: DEFAULT_API_BASE.to_string(),
            base_currency: base_currency.to_uppercase(),
            api_key: None,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a new instance pointed at a different API base URL
    pub fn with_base_url(&self, base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..self.clone()
        }
    }

    /// Create a new instance carrying an API key
    pub fn with_api_key(&self, api_key: &str) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            ..self.clone()
        }
    }

    /// Create from environment variables
    ///
    /// Optional: `BASE_CURRENCY` (default: EUR), `EXCHANGE_RATE_API_URL`,
    /// `EXCHANGE_RATE_API_KEY`
    pub fn from_env() -> Self {
        let base_currency = std::env::var("BASE_CURRENCY").unwrap_or_else(|_| "EUR".to_string());
        let mut converter = Self::new(&base_currency);

        if let Ok(url) = std::env::var("EXCHANGE_RATE_API_URL") {
            if !url.trim().is_empty() {
                converter = converter.with_base_url(&url);
            }
        }
        if let Ok(key) = std::env::var("EXCHANGE_RATE_API_KEY") {
            if !key.trim().is_empty() {
                converter = converter.with_api_key(&key);
            }
        }

        converter
    }

    /// The currency stored amounts are normalized to
    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    /// Convert an amount between currencies
    ///
    /// `to_currency` defaults to the base currency and `expense_date` to
    /// today. Same-currency conversions return the amount unchanged without
    /// touching the network.
    pub async fn convert(
        &self,
        amount: f64,
        from_currency: &str,
        to_currency: Option<&str>,
        expense_date: Option<NaiveDate>,
    ) -> f64 {
        let to_currency = to_currency.unwrap_or(&self.base_currency);

        if from_currency.eq_ignore_ascii_case(to_currency) {
            return amount;
        }

        let rate_date = expense_date.unwrap_or_else(|| Local::now().date_naive());
        let rate = self
            .get_exchange_rate(from_currency, to_currency, rate_date)
            .await;

        amount * rate
    }

    /// Look up the exchange rate between two currencies
    ///
    /// The free API tier only serves latest rates, but the cache is still
    /// keyed by date so month-old expenses re-resolve at most once per day.
    /// Falls back to 1.0 when the API is unreachable; the fallback is never
    /// cached, so a later lookup can recover.
    pub async fn get_exchange_rate(
        &self,
        from_currency: &str,
        to_currency: &str,
        rate_date: NaiveDate,
    ) -> f64 {
        let key = (
            from_currency.to_uppercase(),
            to_currency.to_uppercase(),
            rate_date,
        );

        {
            let cache = self.cache.lock().unwrap();
            if let Some(rate) = cache.get(&key) {
                debug!(from = %key.0, to = %key.1, rate, "Exchange rate cache hit");
                return *rate;
            }
        }

        match self.fetch_rates(&key.0).await {
            Ok(Some(rates)) => {
                let rate = rates.get(&key.1).copied().unwrap_or(1.0);
                self.cache.lock().unwrap().insert(key, rate);
                rate
            }
            // Body had no rates table; try going through USD
            Ok(None) => self.bridge_via_usd(&key.0, &key.1).await,
            Err(e) => {
                warn!(error = %e, "Error fetching exchange rate, using 1.0");
                1.0
            }
        }
    }

    /// Derive a cross rate via USD when no direct table is available
    async fn bridge_via_usd(&self, from_currency: &str, to_currency: &str) -> f64 {
        let from_rate = if from_currency != "USD" {
            match self.fetch_rate("USD", from_currency).await {
                Ok(rate) => rate,
                Err(_) => return 1.0,
            }
        } else {
            1.0
        };

        let to_rate = if to_currency != "USD" {
            match self.fetch_rate("USD", to_currency).await {
                Ok(rate) => rate,
                Err(_) => return 1.0,
            }
        } else {
            1.0
        };

        if from_rate == 0.0 {
            1.0
        } else {
            to_rate / from_rate
        }
    }

    async fn fetch_rates(&self, base: &str) -> Result<Option<HashMap<String, f64>>> {
        let url = format!("{}/latest/{}", self.base_url, base);
        let mut request = self.http_client.get(&url).timeout(REQUEST_TIMEOUT);
        if let Some(key) = &self.api_key {
            request = request.query(&[("api_key", key)]);
        }

        let response = request.send().await?.error_for_status()?;
        let body: RatesResponse = response.json().await?;

        Ok(body.rates)
    }

    async fn fetch_rate(&self, base: &str, target: &str) -> Result<f64> {
        let rates = self.fetch_rates(base).await?.unwrap_or_default();
        Ok(rates.get(target).copied().unwrap_or(1.0))
    }
}

/// Rate table response from the ExchangeRate API
#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    rates: Option<HashMap<String, f64>>,
}
