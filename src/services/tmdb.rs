// TMDB metadata provider service
// API Documentation: https://developer.themoviedb.org/reference/intro/getting-started

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

pub const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";

/// Placeholder used when no API key is configured. Requests made with it
/// are rejected by TMDB, so the failure shows up on the first call.
pub const MISSING_API_KEY: &str = "NOKEY";

#[derive(Debug, Error)]
pub enum TmdbError {
    /// Transport or body error. The URL is stripped before wrapping since it
    /// can carry the v3 key.
    #[error("TMDB request failed: {0}")]
    Http(reqwest::Error),

    #[error("TMDB rejected the API key: {0}")]
    Unauthorized(String),

    #[error("TMDB resource not found: {0}")]
    NotFound(String),

    #[error("TMDB returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to parse TMDB response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for TmdbError {
    fn from(e: reqwest::Error) -> Self {
        TmdbError::Http(e.without_url())
    }
}

pub type Result<T> = std::result::Result<T, TmdbError>;

/// Upstream operations the SkyHook mapper relies on
#[async_trait]
pub trait TmdbApi: Send + Sync {
    /// Text search over TV shows
    async fn search_tv(&self, params: &SearchTvParams) -> Result<PagedResults<TvSearchResult>>;

    /// Filtered discovery query over TV shows
    async fn discover_tv(&self, params: &DiscoverTvParams)
        -> Result<PagedResults<TvSearchResult>>;

    async fn tv_details(&self, tv_id: i64) -> Result<TvDetails>;

    async fn tv_images(&self, tv_id: i64) -> Result<TvImages>;

    async fn tv_alternative_titles(&self, tv_id: i64) -> Result<AlternativeTitles>;

    /// Season details including the episode list
    async fn season_details(&self, tv_id: i64, season_number: i32) -> Result<SeasonDetails>;
}

#[derive(Debug, Clone, Default)]
pub struct SearchTvParams {
    pub query: String,
    pub include_adult: bool,
}

impl SearchTvParams {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("query", self.query.clone()),
            ("include_adult", self.include_adult.to_string()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoverTvParams {
    pub include_adult: bool,
    pub with_keywords: Option<String>,
    pub first_air_date_gte: Option<NaiveDate>,
    pub first_air_date_lte: Option<NaiveDate>,
    pub include_null_first_air_dates: bool,
    pub sort_by: Option<String>,
    pub with_original_language: Option<String>,
    pub page: u32,
}

impl DiscoverTvParams {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("include_adult", self.include_adult.to_string())];
        if let Some(ref keywords) = self.with_keywords {
            pairs.push(("with_keywords", keywords.clone()));
        }
        if let Some(date) = self.first_air_date_gte {
            pairs.push(("first_air_date.gte", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(date) = self.first_air_date_lte {
            pairs.push(("first_air_date.lte", date.format("%Y-%m-%d").to_string()));
        }
        pairs.push((
            "include_null_first_air_dates",
            self.include_null_first_air_dates.to_string(),
        ));
        if let Some(ref sort_by) = self.sort_by {
            pairs.push(("sort_by", sort_by.clone()));
        }
        if let Some(ref language) = self.with_original_language {
            pairs.push(("with_original_language", language.clone()));
        }
        pairs.push(("page", self.page.to_string()));
        pairs
    }
}

/// Paginated result wrapper used by search and discover
#[derive(Debug, Deserialize)]
pub struct PagedResults<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TvSearchResult {
    pub id: i64,
    #[serde(default)]
    pub adult: bool,
}

/// Detailed TV show info
#[derive(Debug, Clone, Deserialize)]
pub struct TvDetails {
    pub id: i64,
    pub name: String,
    pub overview: Option<String>,
    pub first_air_date: Option<String>,
    pub last_air_date: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub status: Option<String>,
    pub original_language: Option<String>,
    #[serde(default)]
    pub origin_country: Vec<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub production_companies: Vec<ProductionCompany>,
    #[serde(default)]
    pub seasons: Vec<SeasonSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Genre {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductionCompany {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeasonSummary {
    pub season_number: i32,
}

/// Image collections for a TV show
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TvImages {
    #[serde(default)]
    pub posters: Vec<ImageInfo>,
    #[serde(default)]
    pub backdrops: Vec<ImageInfo>,
    #[serde(default)]
    pub logos: Vec<ImageInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageInfo {
    pub file_path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlternativeTitles {
    #[serde(default)]
    pub results: Vec<AlternativeTitle>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlternativeTitle {
    pub title: String,
}

/// Season details
#[derive(Debug, Clone, Deserialize)]
pub struct SeasonDetails {
    #[serde(default)]
    pub episodes: Vec<EpisodeInfo>,
}

/// Episode info from season details
#[derive(Debug, Clone, Deserialize)]
pub struct EpisodeInfo {
    pub id: i64,
    pub episode_number: i32,
    pub season_number: i32,
    pub air_date: Option<String>,
    pub runtime: Option<i32>,
    pub show_id: Option<i64>,
}

/// Error payload TMDB sends with non-success statuses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    status_message: Option<String>,
}

/// TMDB API client
pub struct TmdbClient {
    client: Client,
    api_key: String,
    api_base: String,
}

impl TmdbClient {
    /// Create a new TMDB client
    pub fn new(api_key: String, api_base: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// v4 read access tokens are JWTs and go in the Authorization header,
    /// v3 keys go in the query string
    fn uses_bearer_token(&self) -> bool {
        self.api_key.starts_with("eyJ")
    }

    fn request_url(&self, path: &str, params: &[(&str, String)]) -> String {
        let mut query: Vec<String> = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect();

        if !self.uses_bearer_token() {
            query.insert(0, format!("api_key={}", urlencoding::encode(&self.api_key)));
        }

        if query.is_empty() {
            format!("{}{}", self.api_base, path)
        } else {
            format!("{}{}?{}", self.api_base, path, query.join("&"))
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        tracing::debug!("TMDB GET {} {:?}", path, params);

        let mut request = self.client.get(self.request_url(path, params));
        if self.uses_bearer_token() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.status_message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

            tracing::debug!("TMDB {} failed with {}: {}", path, status, message);

            return Err(match status {
                StatusCode::UNAUTHORIZED => TmdbError::Unauthorized(message),
                StatusCode::NOT_FOUND => TmdbError::NotFound(format!("{} ({})", path, message)),
                _ => TmdbError::Status {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn search_tv(&self, params: &SearchTvParams) -> Result<PagedResults<TvSearchResult>> {
        self.get("/search/tv", &params.query_pairs()).await
    }

    async fn discover_tv(
        &self,
        params: &DiscoverTvParams,
    ) -> Result<PagedResults<TvSearchResult>> {
        self.get("/discover/tv", &params.query_pairs()).await
    }

    async fn tv_details(&self, tv_id: i64) -> Result<TvDetails> {
        self.get(&format!("/tv/{}", tv_id), &[]).await
    }

    async fn tv_images(&self, tv_id: i64) -> Result<TvImages> {
        self.get(&format!("/tv/{}/images", tv_id), &[]).await
    }

    async fn tv_alternative_titles(&self, tv_id: i64) -> Result<AlternativeTitles> {
        self.get(&format!("/tv/{}/alternative_titles", tv_id), &[])
            .await
    }

    async fn season_details(&self, tv_id: i64, season_number: i32) -> Result<SeasonDetails> {
        self.get(&format!("/tv/{}/season/{}", tv_id, season_number), &[])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url_with_v3_key() {
        let client = TmdbClient::new("abc123".to_string(), TMDB_API_BASE.to_string());
        let url = client.request_url(
            "/search/tv",
            &[("query", "Kimi no Na wa".to_string())],
        );
        assert_eq!(
            url,
            "https://api.themoviedb.org/3/search/tv?api_key=abc123&query=Kimi%20no%20Na%20wa"
        );
    }

    #[test]
    fn test_request_url_with_bearer_token() {
        let client = TmdbClient::new("eyJhbGciOi.token".to_string(), "http://localhost/3/".to_string());
        assert!(client.uses_bearer_token());
        assert_eq!(client.request_url("/tv/1", &[]), "http://localhost/3/tv/1");
    }

    #[test]
    fn test_discover_query_pairs() {
        let params = DiscoverTvParams {
            include_adult: true,
            with_keywords: Some("198385".to_string()),
            first_air_date_gte: NaiveDate::from_ymd_opt(2025, 10, 16),
            first_air_date_lte: NaiveDate::from_ymd_opt(2026, 10, 16),
            include_null_first_air_dates: true,
            sort_by: Some("first_air_date.desc".to_string()),
            with_original_language: Some("ja".to_string()),
            page: 2,
        };
        let pairs = params.query_pairs();
        assert!(pairs.contains(&("first_air_date.gte", "2025-10-16".to_string())));
        assert!(pairs.contains(&("first_air_date.lte", "2026-10-16".to_string())));
        assert!(pairs.contains(&("with_keywords", "198385".to_string())));
        assert!(pairs.contains(&("include_null_first_air_dates", "true".to_string())));
        assert_eq!(pairs.last(), Some(&("page", "2".to_string())));
    }

    #[test]
    fn test_parse_tv_details() {
        let json = r#"{
            "id": 12345,
            "name": "Test Show",
            "overview": "",
            "first_air_date": "2023-04-01",
            "last_air_date": "",
            "poster_path": null,
            "status": "Returning Series",
            "origin_country": ["JP"],
            "original_language": "ja",
            "genres": [{"id": 16, "name": "Animation"}],
            "production_companies": [],
            "seasons": [{"id": 1, "season_number": 1, "episode_count": 12}]
        }"#;
        let details: TvDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.id, 12345);
        assert_eq!(details.seasons[0].season_number, 1);
        assert!(details.backdrop_path.is_none());
        assert_eq!(details.last_air_date.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_transport_error_hides_api_key() {
        // Nothing listens on port 1, so the request fails before any response
        let client = TmdbClient::new(
            "SUPERSECRETKEY".to_string(),
            "http://127.0.0.1:1/3".to_string(),
        );

        let err = client.tv_details(1).await.unwrap_err();
        assert!(matches!(err, TmdbError::Http(_)));
        assert!(!err.to_string().contains("SUPERSECRETKEY"));
        assert!(!format!("{:?}", err).contains("SUPERSECRETKEY"));
    }

    #[test]
    fn test_parse_search_results_without_adult_flag() {
        let json = r#"{"page": 1, "results": [{"id": 1, "name": "A"}], "total_results": 1}"#;
        let results: PagedResults<TvSearchResult> = serde_json::from_str(json).unwrap();
        assert_eq!(results.results.len(), 1);
        assert!(!results.results[0].adult);
    }

    #[test]
    fn test_parse_paged_results_without_results_field() {
        let results: PagedResults<TvSearchResult> =
            serde_json::from_str(r#"{"page": 3, "total_pages": 2}"#).unwrap();
        assert!(results.results.is_empty());
    }
}
