// Data access for the transit-data REST service
use crate::tb_config::Settings;
use crate::tb_models::{Alert, FetchError, Line, Route, Station};
use futures::future::BoxFuture;
use log::debug;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Everything the board needs from the remote service. Owners of a polling
/// loop receive an implementation explicitly so tests can substitute a fake.
pub trait TransitSource: Send + Sync {
    fn fetch_routes_for_station<'a>(&'a self, station_code: &'a str) -> BoxFuture<'a, FetchResult<Vec<Route>>>;

    fn fetch_lines(&self) -> BoxFuture<'_, FetchResult<Vec<Line>>>;

    fn fetch_stations(&self) -> BoxFuture<'_, FetchResult<Vec<Station>>>;

    fn fetch_alerts(&self) -> BoxFuture<'_, FetchResult<Vec<Alert>>>;
}

pub struct HttpTransitSource {
    client: reqwest::Client,
    base_url: String,
    app_id: String,
    app_key: String,
}

impl HttpTransitSource {
    pub fn new(settings: &Settings) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| FetchError::Unknown(anyhow::Error::new(e).context("failed to create HTTP client")))?;

        Ok(HttpTransitSource {
            client,
            base_url: settings.api_base.trim_end_matches('/').to_string(),
            app_id: settings.app_id.clone(),
            app_key: settings.app_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> FetchResult<T> {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("app_id", self.app_id.as_str()), ("app_key", self.app_key.as_str())])
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<T>().await?)
    }
}

impl TransitSource for HttpTransitSource {
    fn fetch_routes_for_station<'a>(&'a self, station_code: &'a str) -> BoxFuture<'a, FetchResult<Vec<Route>>> {
        Box::pin(async move { self.get_json(&format!("stations/{}/routes", station_code)).await })
    }

    fn fetch_lines(&self) -> BoxFuture<'_, FetchResult<Vec<Line>>> {
        Box::pin(self.get_json("lines"))
    }

    fn fetch_stations(&self) -> BoxFuture<'_, FetchResult<Vec<Station>>> {
        Box::pin(self.get_json("stations"))
    }

    fn fetch_alerts(&self) -> BoxFuture<'_, FetchResult<Vec<Alert>>> {
        Box::pin(self.get_json("alerts"))
    }
}
