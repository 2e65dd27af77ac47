use serde::Serialize;

/// Show record in the SkyHook format expected by the downstream client
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkyHookShow {
    pub tvdb_id: i64,
    pub title: String,
    pub overview: String,
    pub slug: String,
    pub original_country: String,
    pub original_language: Option<String>,
    pub language: String,
    pub first_aired: Option<String>,
    pub last_aired: Option<String>,
    pub tv_maze_id: Option<i64>,
    pub tmdb_id: i64,
    pub imdb_id: Option<String>,
    pub last_updated: Option<String>,
    pub status: ShowStatus,
    pub runtime: Option<i32>,
    pub time_of_day: Option<serde_json::Value>,
    pub original_network: String,
    pub network: String,
    pub genres: Vec<String>,
    pub content_rating: String,
    pub alternative_titles: Vec<String>,
    /// Cast is not fetched, always empty
    pub actors: Vec<serde_json::Value>,
    pub images: Vec<SkyHookImage>,
    pub seasons: Vec<SkyHookSeason>,
    pub episodes: Vec<SkyHookEpisode>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkyHookEpisode {
    pub tvdb_show_id: i64,
    pub tvdb_id: i64,
    pub season_number: i32,
    pub episode_number: i32,
    pub air_date: Option<String>,
    pub air_date_utc: Option<String>,
    pub runtime: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkyHookImage {
    pub cover_type: CoverType,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoverType {
    Poster,
    Banner,
    Fanart,
    Clearlogo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkyHookSeason {
    pub season_number: i32,
}

/// Lifecycle status. "Ended" keeps the provider's capitalisation, the
/// client accepts it alongside the lowercase values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShowStatus {
    #[serde(rename = "continuing")]
    Continuing,
    #[serde(rename = "upcoming")]
    Upcoming,
    #[serde(rename = "Ended")]
    Ended,
}
