//! Client for the widget configuration endpoint.

use std::time::Duration;

use reqwest::header::ORIGIN;
use url::Url;
use vox_types::WidgetConfig;

use crate::error::FetchError;

/// `{base}/api/widgets/{id}/config`, or `{base}/api/demo/{id}/config` for
/// ids starting with `demo_prefix`.
pub fn config_url(base: &Url, widget_id: &str, demo_prefix: &str) -> Result<Url, FetchError> {
    let scope = if !demo_prefix.is_empty() && widget_id.starts_with(demo_prefix) {
        "demo"
    } else {
        "widgets"
    };
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| FetchError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .extend(["api", scope, widget_id, "config"]);
    Ok(url)
}

#[derive(Debug, Clone)]
pub struct ConfigFetcher {
    client: reqwest::Client,
    base_url: Url,
    demo_prefix: String,
    origin: Option<String>,
}

impl ConfigFetcher {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            demo_prefix: "demo-".to_string(),
            origin: None,
        })
    }

    pub fn with_demo_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.demo_prefix = prefix.into();
        self
    }

    /// Sends `origin` as the `Origin` header, as a browser would for the
    /// embedding page.
    pub fn with_origin(mut self, origin: Option<String>) -> Self {
        self.origin = origin;
        self
    }

    /// Fetches and normalises the configuration for `widget_id`.
    ///
    /// Any non-2xx answer is [`FetchError::Status`]; the body is ignored.
    pub async fn fetch(&self, widget_id: &str) -> Result<WidgetConfig, FetchError> {
        let url = config_url(&self.base_url, widget_id, &self.demo_prefix)?;
        let mut request = self.client.get(url.clone());
        if let Some(origin) = &self.origin {
            request = request.header(ORIGIN, origin);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(widget_id, status = status.as_u16(), "configuration refused");
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let config = WidgetConfig::from_json(&body)?;
        tracing::debug!(widget_id, url = %url, widget_type = %config.widget_type, "configuration loaded");
        Ok(config)
    }
}
