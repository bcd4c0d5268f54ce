use crate::config::toml_config::ApiConfig;
use crate::core::catalog::BoxOfficeQuery;
use crate::core::recommend::GenreGroups;
use crate::domain::model::{BoxOfficeItem, Facility, Performance, PerformanceDetail};
use crate::domain::ports::RelatedListings;
use crate::utils::error::{Result, ScoutError};
use async_trait::async_trait;
use chrono::{Days, Months, NaiveDate};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const KOPIS_DATE_FORMAT: &str = "%Y%m%d";

pub fn kopis_date(date: NaiveDate) -> String {
    date.format(KOPIS_DATE_FORMAT).to_string()
}

/// 依設定建立共用的 reqwest Client（timeout + User-Agent）
pub fn build_http_client(api: &ApiConfig) -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(api.timeout_seconds))
        .user_agent(api.user_agent.clone())
        .build()?;
    Ok(client)
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Map a non-2xx response to `HttpStatusError` so callers see which call failed.
pub(crate) fn ensure_success(response: Response, endpoint: &str) -> Result<Response> {
    let status = response.status();
    tracing::debug!("API response status: {} ({})", status, endpoint);
    if status.is_success() {
        Ok(response)
    } else {
        Err(ScoutError::HttpStatusError {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        })
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Serialize)]
struct UserPicksPayload<'a> {
    performance_ids: &'a [String],
}

/// Client for the performance API (`/performances`, `/performance-facilities`, ...).
#[derive(Debug, Clone)]
pub struct KopisClient {
    client: Client,
    base_url: String,
}

impl KopisClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn from_config(api: &ApiConfig) -> Result<Self> {
        Ok(Self::with_client(build_http_client(api)?, api.base_url.clone()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, path: &str) -> Result<T> {
        tracing::debug!("Making API request to: {}", path);
        let response = request.send().await?;
        let response = ensure_success(response, path)?;
        Ok(response.json::<T>().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let request = self.client.get(self.endpoint(path)).query(query);
        self.send_json(request, path).await
    }

    async fn get_json_authorized<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T> {
        let request = self.client.get(self.endpoint(path)).bearer_auth(token);
        self.send_json(request, path).await
    }

    /// `GET /performance-facilities`, the whole facility list in one page.
    pub async fn facilities(&self, rows: usize) -> Result<Vec<Facility>> {
        let query = [
            ("signgucode", String::new()),
            ("signgucodesub", String::new()),
            ("cpage", "1".to_string()),
            ("rows", rows.to_string()),
        ];
        let facilities: Vec<Facility> = self.get_json("/performance-facilities", &query).await?;
        tracing::debug!("Fetched {} facilities", facilities.len());
        Ok(facilities)
    }

    /// Performances running at `facility_name` on `date`.
    pub async fn performances_at_facility(
        &self,
        facility_name: &str,
        date: NaiveDate,
        rows: usize,
    ) -> Result<Vec<Performance>> {
        let day = kopis_date(date);
        let query = [
            ("stdate", day.clone()),
            ("eddate", day),
            ("shprfnmfct", facility_name.to_string()),
            ("cpage", "1".to_string()),
            ("rows", rows.to_string()),
        ];
        self.get_json("/performances", &query).await
    }

    /// Title search over the next year. An empty query does not hit the API.
    pub async fn search_performances(&self, title: &str, today: NaiveDate) -> Result<Vec<Performance>> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(Vec::new());
        }
        let until = today.checked_add_months(Months::new(12)).unwrap_or(today);
        let query = [
            ("stdate", kopis_date(today)),
            ("eddate", kopis_date(until)),
            ("shprfnm", title.to_string()),
            ("cpage", "1".to_string()),
            ("rows", "100".to_string()),
        ];
        self.get_json("/performances", &query).await
    }

    /// Performances of one genre over the next 30 days.
    pub async fn performances_by_genre(
        &self,
        genre: &str,
        today: NaiveDate,
        rows: usize,
    ) -> Result<Vec<Performance>> {
        let until = today.checked_add_days(Days::new(30)).unwrap_or(today);
        let query = [
            ("stdate", kopis_date(today)),
            ("eddate", kopis_date(until)),
            ("shcate", genre.to_string()),
            ("cpage", "1".to_string()),
            ("rows", rows.to_string()),
        ];
        self.get_json("/performances", &query).await
    }

    pub async fn performance_detail(&self, mt20id: &str) -> Result<PerformanceDetail> {
        let path = format!("/performance/{}", mt20id);
        self.get_json(&path, &[]).await
    }

    pub async fn box_office(&self, query: &BoxOfficeQuery) -> Result<Vec<BoxOfficeItem>> {
        self.get_json("/boxoffice", &query.to_query()).await
    }

    pub async fn upcoming_performances(&self) -> Result<Vec<Performance>> {
        self.get_json("/upcoming-performances", &[]).await
    }

    /// `POST /token`: issue an anonymous personalization token.
    pub async fn issue_token(&self) -> Result<String> {
        let request = self.client.post(self.endpoint("/token"));
        let response: TokenResponse = self.send_json(request, "/token").await?;
        Ok(response.token)
    }

    pub async fn popular_by_genre(&self) -> Result<Vec<Performance>> {
        self.get_json("/popular-by-genre", &[]).await
    }

    pub async fn recommended_shows(&self, token: &str) -> Result<GenreGroups> {
        self.get_json_authorized("/recommended-shows", token).await
    }

    pub async fn user_picks(&self, token: &str) -> Result<Vec<Performance>> {
        self.get_json_authorized("/user-picks", token).await
    }

    pub async fn save_user_picks(&self, token: &str, picks: &[String]) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint("/user-picks"))
            .bearer_auth(token)
            .json(&UserPicksPayload {
                performance_ids: picks,
            })
            .send()
            .await?;
        ensure_success(response, "/user-picks")?;
        Ok(())
    }
}

#[async_trait]
impl RelatedListings for KopisClient {
    async fn related_performances(
        &self,
        facility_name: &str,
        date: NaiveDate,
        rows: usize,
    ) -> Result<Vec<Performance>> {
        self.performances_at_facility(facility_name, date, rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_normalizes_slashes() {
        assert_eq!(join_url("https://a.org/", "/token"), "https://a.org/token");
        assert_eq!(join_url("https://a.org", "token"), "https://a.org/token");
    }

    #[test]
    fn test_kopis_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(kopis_date(date), "20240309");
    }

    #[tokio::test]
    async fn test_search_with_blank_title_skips_request() {
        // 不存在的 host；若真的送出請求會失敗
        let client = KopisClient::new("http://127.0.0.1:9");
        let today = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let result = client.search_performances("   ", today).await.unwrap();
        assert!(result.is_empty());
    }
}
