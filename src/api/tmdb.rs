// TMDB routes - SkyHook formatted search, show and latest-release lookups

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::SkyHookShow,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/search/:language", get(search))
        .route("/search/:language/", get(search))
        .route("/shows/:language/:id", get(get_show))
        .route("/latest/:language", get(get_latest_first_page))
        .route("/latest/:language/", get(get_latest_first_page))
        .route("/latest/:language/:page_number", get(get_latest))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub term: Option<String>,
}

/// GET /tmdb/search/:language?term=
async fn search(
    State(state): State<Arc<AppState>>,
    Path(language): Path<String>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<SkyHookShow>>> {
    log_ignored_language(&language);

    let result = async {
        let term = query
            .term
            .ok_or_else(|| AppError::bad_request("Missing query parameter 'term'"))?;
        Ok::<_, AppError>(state.mapper.search_by_term(&term).await?)
    }
    .await;

    finish(&state, result).await
}

/// GET /tmdb/shows/:language/:id - always includes episodes
async fn get_show(
    State(state): State<Arc<AppState>>,
    Path((language, id)): Path<(String, String)>,
) -> AppResult<Json<SkyHookShow>> {
    log_ignored_language(&language);

    let result = async {
        let id = parse_show_id(&id)?;
        Ok::<_, AppError>(state.mapper.search_by_id(id, true).await?)
    }
    .await;

    finish(&state, result).await
}

/// GET /tmdb/latest/:language
async fn get_latest_first_page(
    State(state): State<Arc<AppState>>,
    Path(language): Path<String>,
) -> AppResult<Json<Vec<SkyHookShow>>> {
    log_ignored_language(&language);
    let result = state.mapper.get_latest_news(1).await.map_err(AppError::from);
    finish(&state, result).await
}

/// GET /tmdb/latest/:language/:page_number
async fn get_latest(
    State(state): State<Arc<AppState>>,
    Path((language, page_number)): Path<(String, String)>,
) -> AppResult<Json<Vec<SkyHookShow>>> {
    log_ignored_language(&language);

    let result = async {
        let page = parse_page_number(&page_number)?;
        Ok::<_, AppError>(state.mapper.get_latest_news(page).await?)
    }
    .await;

    finish(&state, result).await
}

// The language segment is part of the client's URL scheme but does not
// change the upstream queries.
fn log_ignored_language(language: &str) {
    tracing::debug!("Ignoring language segment '{}'", language);
}

fn parse_show_id(raw: &str) -> AppResult<i64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::bad_request(format!("Invalid show id '{}'", raw)))
}

/// Empty means the first page
fn parse_page_number(raw: &str) -> AppResult<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(1);
    }

    raw.parse::<u32>()
        .ok()
        .filter(|page| *page > 0)
        .ok_or_else(|| AppError::bad_request(format!("Invalid page number '{}'", raw)))
}

/// Turn a handler result into a response. With `hang_on_error` the error is
/// logged and the request is left pending forever.
async fn finish<T>(state: &AppState, result: AppResult<T>) -> AppResult<Json<T>> {
    match result {
        Ok(value) => Ok(Json(value)),
        Err(e) if state.config.hang_on_error => {
            tracing::error!("Request failed, leaving it unanswered: {}", e);
            std::future::pending::<()>().await;
            Err(e)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::services::skyhook::tests::{details, season, StubTmdb};
    use crate::services::skyhook::{MapperSettings, SkyHookMapper};
    use crate::services::tmdb::TvImages;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(stub: impl Into<Arc<StubTmdb>>, config: AppConfig) -> Router {
        let stub: Arc<StubTmdb> = stub.into();
        let state = Arc::new(AppState {
            mapper: SkyHookMapper::new(stub, MapperSettings::default()),
            config,
        });
        crate::api::router(state)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn minimal_show_stub() -> StubTmdb {
        let mut stub = StubTmdb::default().with_show(details(12345, "Test Show", &[]));
        let images: TvImages =
            serde_json::from_value(serde_json::json!({"posters": [{"file_path": "/poster.jpg"}]}))
                .unwrap();
        stub.images.insert(12345, images);
        stub
    }

    #[test]
    fn test_parse_page_number() {
        assert_eq!(parse_page_number("").unwrap(), 1);
        assert_eq!(parse_page_number("4").unwrap(), 4);
        assert!(parse_page_number("abc").is_err());
        assert!(parse_page_number("0").is_err());
    }

    #[test]
    fn test_parse_show_id() {
        assert_eq!(parse_show_id("12345").unwrap(), 12345);
        assert!(parse_show_id("NaN").is_err());
        assert!(parse_show_id("-3").is_err());
    }

    #[tokio::test]
    async fn test_show_end_to_end() {
        let (status, body) = get(
            app(minimal_show_stub(), AppConfig::default()),
            "/tmdb/shows/en/12345",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "continuing");
        assert_eq!(body["slug"], "test-show");
        assert_eq!(body["tvdbId"], 12345);
        let images = body["images"].as_array().unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0]["coverType"], "Poster");
        assert_eq!(
            images[0]["url"],
            "https://image.tmdb.org/t/p/original/poster.jpg"
        );
        assert_eq!(body["episodes"], serde_json::json!([]));
        assert_eq!(body["actors"], serde_json::json!([]));
        assert!(body["tvMazeId"].is_null());
    }

    #[tokio::test]
    async fn test_show_invalid_id() {
        let (status, body) = get(
            app(minimal_show_stub(), AppConfig::default()),
            "/tmdb/shows/en/abc",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid show id 'abc'");
    }

    #[tokio::test]
    async fn test_show_not_found() {
        let (status, _) = get(app(StubTmdb::default(), AppConfig::default()), "/tmdb/shows/en/1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let mut stub = minimal_show_stub();
        stub.fail_images = true;
        let (status, body) = get(app(stub, AppConfig::default()), "/tmdb/shows/en/12345").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["details"].as_str().unwrap().contains("Internal error"));
    }

    #[tokio::test]
    async fn test_search_requires_term() {
        let (status, _) = get(
            app(StubTmdb::default(), AppConfig::default()),
            "/tmdb/search/en/",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_search_returns_adult_results() {
        let mut stub = StubTmdb::default()
            .with_show(details(1, "Kept", &[]))
            .with_show(details(2, "Dropped", &[]));
        stub.search_results = serde_json::from_value(serde_json::json!([
            {"id": 1, "name": "Kept", "adult": true},
            {"id": 2, "name": "Dropped", "adult": false}
        ]))
        .unwrap();

        let (status, body) = get(app(stub, AppConfig::default()), "/tmdb/search/en?term=kept").await;
        assert_eq!(status, StatusCode::OK);
        let shows = body.as_array().unwrap();
        assert_eq!(shows.len(), 1);
        assert_eq!(shows[0]["title"], "Kept");
    }

    #[tokio::test]
    async fn test_latest_defaults_to_first_page() {
        let stub = Arc::new(StubTmdb::default());
        let router = app(stub.clone(), AppConfig::default());
        let requested_page = || stub.discover_params.lock().unwrap().as_ref().map(|p| p.page);

        let (status, body) = get(router.clone(), "/tmdb/latest/en").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
        assert_eq!(requested_page(), Some(1));

        let (status, _) = get(router.clone(), "/tmdb/latest/en/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(requested_page(), Some(1));

        let (status, _) = get(router.clone(), "/tmdb/latest/en/2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(requested_page(), Some(2));

        *stub.discover_params.lock().unwrap() = None;
        let (status, _) = get(router, "/tmdb/latest/en/two").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(requested_page(), None);
    }

    #[tokio::test]
    async fn test_show_route_includes_episodes() {
        let mut stub = StubTmdb::default().with_show(details(12345, "Test Show", &[1]));
        stub.seasons.insert((12345, 1), season(12345, 1, &[Some(24), None]));
        let stub = Arc::new(stub);

        let (status, body) = get(
            app(stub.clone(), AppConfig::default()),
            "/tmdb/shows/en/12345",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stub.season_calls.load(Ordering::SeqCst), 1);

        let episodes = body["episodes"].as_array().unwrap();
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0]["seasonNumber"], 1);
        assert_eq!(episodes[0]["episodeNumber"], 1);
        assert_eq!(episodes[0]["runtime"], 24);
        assert_eq!(episodes[1]["runtime"], 10);
        assert_eq!(body["seasons"], serde_json::json!([{"seasonNumber": 1}]));
    }

    #[tokio::test]
    async fn test_hang_on_error_never_responds() {
        let config = AppConfig {
            hang_on_error: true,
            ..AppConfig::default()
        };
        let app = app(StubTmdb::default(), config);

        let request = Request::builder()
            .uri("/tmdb/shows/en/1")
            .body(Body::empty())
            .unwrap();
        let outcome = tokio::time::timeout(Duration::from_millis(200), app.oneshot(request)).await;
        assert!(outcome.is_err());
    }
}
