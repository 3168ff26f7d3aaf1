use super::RemoteSource;
use super::envelope::{PageEnvelope, UpstreamPayload};
use crate::config::ConsoleConfig;
use crate::core::{AdminError, Record, Result};
use crate::reconcile::QueryFilters;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{Instrument, Level, event, info_span};

/// Read-only client for the upstream collections.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(config: &ConsoleConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.base_url, collection)
    }

    /// `page`, `limit`, then every non-empty filter in order.
    pub fn listing_query(page: u64, page_size: u64, filters: &QueryFilters) -> Vec<(String, String)> {
        let mut params = vec![
            ("page".to_string(), page.to_string()),
            ("limit".to_string(), page_size.to_string()),
        ];
        params.extend(
            filters
                .active()
                .map(|(name, value)| (name.to_string(), value.to_string())),
        );
        params
    }

    async fn get_json<P>(&self, url: &str, query: &[(String, String)]) -> Result<P>
    where
        P: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|err| AdminError::Fetch(format!("Unexpected response from '{}': {}", url, err)))
    }
}

#[async_trait]
impl<T: Record> RemoteSource<T> for HttpGateway {
    async fn fetch_page(
        &self,
        page: u64,
        page_size: u64,
        filters: &QueryFilters,
    ) -> Result<PageEnvelope<T>> {
        let span = info_span!(
            "gateway.fetch_page",
            collection = T::COLLECTION,
            page = page,
            limit = page_size
        );

        async move {
            let url = self.collection_url(T::COLLECTION);
            let query = Self::listing_query(page, page_size, filters);
            match self.get_json::<UpstreamPayload<T>>(&url, &query).await {
                Ok(payload) => {
                    let envelope = payload.into_envelope(page_size);
                    event!(
                        Level::DEBUG,
                        items = envelope.items.len(),
                        total_pages = envelope.meta.total_pages,
                        "page fetched"
                    );
                    Ok(envelope)
                }
                Err(err) => {
                    event!(Level::ERROR, error = %err, "page fetch failed");
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn fetch_by_id(&self, id: u64) -> Result<T> {
        let span = info_span!("gateway.fetch_by_id", collection = T::COLLECTION, id = id);

        async move {
            let url = format!("{}/{}", self.collection_url(T::COLLECTION), id);
            let response = self.client.get(&url).send().await?;
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(AdminError::NotFound(id));
            }
            let body = response.error_for_status()?.bytes().await?;
            serde_json::from_slice(&body).map_err(|err| {
                event!(Level::ERROR, error = %err, "record decode failed");
                AdminError::Fetch(format!("Unexpected response from '{}': {}", url, err))
            })
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_query_keeps_paging_first() {
        let filters = QueryFilters::new()
            .with("name", "")
            .with("race", "Saiyan")
            .with("isDestroyed", false);

        let query = HttpGateway::listing_query(2, 12, &filters);
        assert_eq!(
            query,
            vec![
                ("page".to_string(), "2".to_string()),
                ("limit".to_string(), "12".to_string()),
                ("race".to_string(), "Saiyan".to_string()),
                ("isDestroyed".to_string(), "false".to_string()),
            ]
        );
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let config = ConsoleConfig::default().api_base_url("http://localhost:9000/api/");
        let gateway = HttpGateway::new(&config).unwrap();
        assert_eq!(gateway.base_url(), "http://localhost:9000/api");
        assert_eq!(
            gateway.collection_url("planets"),
            "http://localhost:9000/api/planets"
        );
    }
}
