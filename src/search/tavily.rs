use super::{SearchProvider, SearchRequest, SearchResponse};

pub struct TavilyClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl TavilyClient {
    pub fn new(client: reqwest::Client, api_key: &str, base_url: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait::async_trait]
impl SearchProvider for TavilyClient {
    async fn search(&self, req: &SearchRequest) -> anyhow::Result<SearchResponse> {
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Tavily API error ({}): {}",
                status,
                error_body
            ));
        }

        Ok(response.json().await?)
    }

    fn name(&self) -> &str {
        "tavily"
    }
}
