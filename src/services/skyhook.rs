// SkyHook mapper - reshapes TMDB TV payloads into the SkyHook schema

use chrono::{Months, NaiveDate, Utc};
use futures::future::try_join_all;
use std::sync::Arc;

use super::tmdb::{
    DiscoverTvParams, Result, SearchTvParams, TmdbApi, TvDetails, TvImages, TvSearchResult,
};
use crate::models::{
    CoverType, ShowStatus, SkyHookEpisode, SkyHookImage, SkyHookSeason, SkyHookShow,
};

pub const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/original";

/// TMDB keyword used by the latest-releases discovery query
pub const DEFAULT_DISCOVER_KEYWORD_ID: &str = "198385";
pub const DEFAULT_DISCOVER_LANGUAGE: &str = "ja";

/// Runtime in minutes reported for episodes TMDB has no runtime for
pub const FALLBACK_EPISODE_RUNTIME: i32 = 10;

const DISPLAY_LANGUAGE: &str = "eng";
const DEFAULT_COUNTRY: &str = "jp";
const CONTENT_RATING: &str = "TV-18";
const UNKNOWN_NETWORK: &str = "-";

/// Settings the mapper needs beyond the upstream client
#[derive(Debug, Clone)]
pub struct MapperSettings {
    pub image_base: String,
    pub discover_keyword_id: String,
    pub discover_original_language: String,
}

impl Default for MapperSettings {
    fn default() -> Self {
        Self {
            image_base: TMDB_IMAGE_BASE.to_string(),
            discover_keyword_id: DEFAULT_DISCOVER_KEYWORD_ID.to_string(),
            discover_original_language: DEFAULT_DISCOVER_LANGUAGE.to_string(),
        }
    }
}

pub struct SkyHookMapper {
    tmdb: Arc<dyn TmdbApi>,
    settings: MapperSettings,
}

impl SkyHookMapper {
    pub fn new(tmdb: Arc<dyn TmdbApi>, settings: MapperSettings) -> Self {
        Self { tmdb, settings }
    }

    /// Search shows by free-text term.
    ///
    /// Only results TMDB flags as adult are kept, see [`keep_adult_results`].
    pub async fn search_by_term(&self, term: &str) -> Result<Vec<SkyHookShow>> {
        let params = SearchTvParams {
            query: term.to_string(),
            include_adult: true,
        };
        let response = self.tmdb.search_tv(&params).await?;
        let total = response.results.len();

        let survivors = keep_adult_results(response.results);
        tracing::debug!(
            "Search '{}': {} of {} results kept by the adult filter",
            term,
            survivors.len(),
            total
        );

        let shows = try_join_all(survivors.iter().map(|show| self.get_show(show.id, false))).await?;
        Ok(shows)
    }

    pub async fn search_by_id(
        &self,
        tmdb_id: i64,
        include_episodes: bool,
    ) -> Result<SkyHookShow> {
        self.get_show(tmdb_id, include_episodes).await
    }

    /// Shows from the discovery keyword first aired within the last year,
    /// newest first
    pub async fn get_latest_news(&self, page: u32) -> Result<Vec<SkyHookShow>> {
        let params = self.latest_news_params(page, Utc::now().date_naive());
        let response = self.tmdb.discover_tv(&params).await?;

        tracing::debug!(
            "Latest page {}: {} results to map",
            page,
            response.results.len()
        );

        let mut shows = Vec::with_capacity(response.results.len());
        for item in &response.results {
            shows.push(self.get_show(item.id, false).await?);
        }
        Ok(shows)
    }

    pub fn latest_news_params(&self, page: u32, today: NaiveDate) -> DiscoverTvParams {
        let year_ago = today.checked_sub_months(Months::new(12)).unwrap_or(today);

        DiscoverTvParams {
            include_adult: true,
            with_keywords: Some(self.settings.discover_keyword_id.clone()),
            first_air_date_gte: Some(year_ago),
            first_air_date_lte: Some(today),
            include_null_first_air_dates: true,
            sort_by: Some("first_air_date.desc".to_string()),
            with_original_language: Some(self.settings.discover_original_language.clone()),
            page,
        }
    }

    /// Build the full SkyHook record for a show. Any failed upstream call
    /// fails the whole record.
    pub async fn get_show(
        &self,
        tmdb_id: i64,
        include_episodes: bool,
    ) -> Result<SkyHookShow> {
        let (details, images, alternative_titles) = tokio::try_join!(
            self.tmdb.tv_details(tmdb_id),
            self.tmdb.tv_images(tmdb_id),
            self.tmdb.tv_alternative_titles(tmdb_id),
        )?;

        let mut episodes = Vec::new();
        if include_episodes {
            for season in &details.seasons {
                episodes.extend(self.get_episodes(details.id, season.season_number).await?);
            }
        }

        let images = self.map_images(&images, &details);
        let network = details
            .production_companies
            .first()
            .map(|c| c.name.clone())
            .unwrap_or_else(|| UNKNOWN_NETWORK.to_string());
        let first_aired = non_empty(details.first_air_date);
        let last_aired = non_empty(details.last_air_date);

        Ok(SkyHookShow {
            tvdb_id: details.id,
            slug: slugify(&details.name),
            title: details.name,
            overview: details.overview.unwrap_or_default(),
            original_country: details
                .origin_country
                .first()
                .cloned()
                .unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
            original_language: map_original_language(details.original_language.as_deref()),
            language: DISPLAY_LANGUAGE.to_string(),
            last_updated: last_aired.as_deref().and_then(utc_midnight),
            first_aired,
            last_aired,
            tv_maze_id: None,
            tmdb_id: details.id,
            imdb_id: Some(details.id.to_string()),
            status: map_status(details.status.as_deref()),
            runtime: None,
            time_of_day: None,
            original_network: network.clone(),
            network,
            genres: details.genres.into_iter().map(|g| g.name).collect(),
            content_rating: CONTENT_RATING.to_string(),
            alternative_titles: alternative_titles
                .results
                .into_iter()
                .map(|t| t.title)
                .collect(),
            actors: Vec::new(),
            images,
            seasons: details
                .seasons
                .iter()
                .map(|s| SkyHookSeason {
                    season_number: s.season_number,
                })
                .collect(),
            episodes,
        })
    }

    pub async fn get_episodes(
        &self,
        show_id: i64,
        season_number: i32,
    ) -> Result<Vec<SkyHookEpisode>> {
        let season = self.tmdb.season_details(show_id, season_number).await?;

        Ok(season
            .episodes
            .into_iter()
            .map(|episode| SkyHookEpisode {
                tvdb_show_id: episode.show_id.unwrap_or(show_id),
                tvdb_id: episode.id,
                season_number: episode.season_number,
                episode_number: episode.episode_number,
                air_date_utc: episode.air_date.as_deref().and_then(utc_midnight),
                air_date: episode.air_date,
                runtime: episode.runtime.unwrap_or(FALLBACK_EPISODE_RUNTIME),
            })
            .collect())
    }

    /// Poster, Banner, Fanart, Clearlogo in that order. Poster and backdrop
    /// fall back to the paths on the show details; Banner and Fanart share
    /// the backdrop.
    pub fn map_images(&self, images: &TvImages, details: &TvDetails) -> Vec<SkyHookImage> {
        let mut result = Vec::with_capacity(4);

        let poster = images
            .posters
            .first()
            .map(|i| i.file_path.as_str())
            .or(details.poster_path.as_deref())
            .filter(|p| !p.is_empty());
        if let Some(path) = poster {
            result.push(self.image(CoverType::Poster, path));
        }

        let backdrop = images
            .backdrops
            .first()
            .map(|i| i.file_path.as_str())
            .or(details.backdrop_path.as_deref())
            .filter(|p| !p.is_empty());
        if let Some(path) = backdrop {
            result.push(self.image(CoverType::Banner, path));
            result.push(self.image(CoverType::Fanart, path));
        }

        if let Some(logo) = images.logos.first().filter(|l| !l.file_path.is_empty()) {
            result.push(self.image(CoverType::Clearlogo, &logo.file_path));
        }

        result
    }

    fn image(&self, cover_type: CoverType, path: &str) -> SkyHookImage {
        SkyHookImage {
            cover_type,
            url: format!("{}{}", self.settings.image_base, path),
        }
    }
}

/// Adult-only search filter.
///
/// This deployment serves an adult catalogue, so term search deliberately
/// drops every result TMDB does not flag as adult. Removing it changes what
/// the search endpoint returns.
pub fn keep_adult_results(results: Vec<TvSearchResult>) -> Vec<TvSearchResult> {
    results.into_iter().filter(|show| show.adult).collect()
}

pub fn map_status(status: Option<&str>) -> ShowStatus {
    match status {
        Some("Ended") => ShowStatus::Ended,
        Some("Returning Series") => ShowStatus::Continuing,
        Some("Planned") | Some("In Production") => ShowStatus::Upcoming,
        _ => ShowStatus::Continuing,
    }
}

/// Only Japanese is translated to its three-letter code
fn map_original_language(language: Option<&str>) -> Option<String> {
    match language {
        Some("ja") => Some("jpn".to_string()),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// `YYYY-MM-DD` to `YYYY-MM-DDT00:00:00Z`; anything unparseable becomes None
fn utc_midnight(date: &str) -> Option<String> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

/// Lowercase, hyphen-separated slug containing only `[a-z0-9-]`.
///
/// A few symbols plus Latin, Greek and Cyrillic letters are transliterated
/// first (`&` becomes `and`, `ł` becomes `l`, `ж` becomes `zh`); any other
/// character that is not an ASCII letter, digit or whitespace is dropped.
pub fn slugify(title: &str) -> String {
    let mut cleaned = String::with_capacity(title.len());
    for c in title.chars() {
        if let Some(replacement) = transliterate(c) {
            cleaned.push_str(replacement);
        } else if c.is_ascii_alphanumeric() || c.is_whitespace() {
            cleaned.push(c);
        }
    }

    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_ascii_lowercase()
}

fn transliterate(c: char) -> Option<&'static str> {
    let symbol = match c {
        '&' => "and",
        '$' => "dollar",
        '%' => "percent",
        '<' => "less",
        '>' => "greater",
        '|' => "or",
        '♥' => "love",
        '∞' => "infinity",
        // lowercases to a dotted i made of two chars
        'İ' => "i",
        _ => "",
    };
    if !symbol.is_empty() {
        return Some(symbol);
    }
    if c.is_ascii() {
        return None;
    }

    // The slug is lowercased at the end, so only lowercase forms are listed
    let s = match c.to_lowercase().next().unwrap_or(c) {
        // Latin-1 Supplement
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'æ' => "ae",
        'ç' => "c",
        'è' | 'é' | 'ê' | 'ë' => "e",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'ð' => "d",
        'ñ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => "o",
        'ù' | 'ú' | 'û' | 'ü' => "u",
        'ý' | 'ÿ' => "y",
        'þ' => "th",
        'ß' => "ss",
        // Latin Extended-A
        'ā' | 'ă' | 'ą' => "a",
        'ć' | 'ĉ' | 'ċ' | 'č' => "c",
        'ď' => "d",
        'đ' => "dj",
        'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => "e",
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => "g",
        'ĥ' | 'ħ' => "h",
        'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => "i",
        'ĳ' => "ij",
        'ĵ' => "j",
        'ķ' => "k",
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => "l",
        'ń' | 'ņ' | 'ň' | 'ŋ' => "n",
        'ō' | 'ŏ' | 'ő' => "o",
        'œ' => "oe",
        'ŕ' | 'ŗ' | 'ř' => "r",
        'ś' | 'ŝ' | 'ş' | 'š' | 'ſ' => "s",
        'ţ' | 'ť' | 'ŧ' => "t",
        'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => "u",
        'ŵ' => "w",
        'ŷ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        // Greek
        'α' | 'ά' => "a",
        'β' => "b",
        'γ' => "g",
        'δ' => "d",
        'ε' | 'έ' => "e",
        'ζ' => "z",
        'η' | 'ή' => "h",
        'θ' => "8",
        'ι' | 'ί' | 'ϊ' | 'ΐ' => "i",
        'κ' => "k",
        'λ' => "l",
        'μ' => "m",
        'ν' => "n",
        'ξ' => "3",
        'ο' | 'ό' => "o",
        'π' => "p",
        'ρ' => "r",
        'σ' | 'ς' => "s",
        'τ' => "t",
        'υ' | 'ύ' | 'ϋ' | 'ΰ' => "y",
        'φ' => "f",
        'χ' => "x",
        'ψ' => "ps",
        'ω' | 'ώ' => "w",
        // Cyrillic
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "yo",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "j",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "c",
        'ч' => "ch",
        'ш' | 'щ' => "sh",
        'ъ' => "u",
        'ы' => "y",
        'ь' => "",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        'є' => "ye",
        'і' => "i",
        'ї' => "yi",
        'ґ' => "g",
        _ => return None,
    };
    Some(s)
}
