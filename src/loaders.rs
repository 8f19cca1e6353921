//! Per-view fetches against the data store

use crate::api::{fetch, fetch_one, ApiError, DataStore, Direction, Query};
use crate::models::{Episode, Movie, Series, Variant, VariantOwner};
use crate::playback::sort_variants;
use std::thread;

/// Row sizes for the home page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HomeLimits {
    pub featured_movies: usize,
    pub featured_series: usize,
    pub latest_movies: usize,
}

impl Default for HomeLimits {
    fn default() -> Self {
        Self {
            featured_movies: 1,
            featured_series: 3,
            latest_movies: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HomeContent {
    /// Hero banner; `None` when nothing is featured
    pub featured_movie: Option<Movie>,
    pub featured_series: Vec<Series>,
    pub latest_movies: Vec<Movie>,
}

fn newest_first(table: &str) -> Query {
    Query::table(table).order("created_at", Direction::Descending)
}

/// The three home rows are independent and fetched in parallel
pub fn load_home(store: &dyn DataStore, limits: HomeLimits) -> Result<HomeContent, ApiError> {
    let featured_movies = newest_first("movies").eq("featured", true).limit(limits.featured_movies);
    let featured_series = newest_first("series").eq("featured", true).limit(limits.featured_series);
    let latest_movies = newest_first("movies").limit(limits.latest_movies);

    let (hero, series, latest) = thread::scope(|s| {
        let hero = s.spawn(|| fetch::<Movie>(store, &featured_movies));
        let series = s.spawn(|| fetch::<Series>(store, &featured_series));
        let latest = s.spawn(|| fetch::<Movie>(store, &latest_movies));
        (join(hero), join(series), join(latest))
    });

    Ok(HomeContent {
        featured_movie: hero?.into_iter().next(),
        featured_series: series?,
        latest_movies: latest?,
    })
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}

pub fn load_movies(store: &dyn DataStore) -> Result<Vec<Movie>, ApiError> {
    fetch(store, &newest_first("movies"))
}

pub fn load_series_list(store: &dyn DataStore) -> Result<Vec<Series>, ApiError> {
    fetch(store, &newest_first("series"))
}

/// Variants for a movie or episode, best quality first
pub fn load_variants(store: &dyn DataStore, owner: &VariantOwner) -> Result<Vec<Variant>, ApiError> {
    let query = Query::table(owner.table()).eq(owner.column(), owner.id());
    let mut variants: Vec<Variant> = fetch(store, &query)?;
    sort_variants(&mut variants);
    Ok(variants)
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoviePage {
    pub movie: Movie,
    pub variants: Vec<Variant>,
}

/// `Ok(None)` when no movie has this slug
pub fn load_movie_page(store: &dyn DataStore, slug: &str) -> Result<Option<MoviePage>, ApiError> {
    let Some(movie) = fetch_one::<Movie>(store, &Query::table("movies").eq("slug", slug))? else {
        log::info!("No movie with slug '{}'", slug);
        return Ok(None);
    };
    let variants = load_variants(store, &VariantOwner::Movie(movie.id.clone()))?;
    log::debug!("Loaded '{}' with {} variant(s)", movie.title, variants.len());
    Ok(Some(MoviePage { movie, variants }))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPage {
    pub series: Series,
    /// Ordered by season, then episode
    pub episodes: Vec<Episode>,
}

pub fn load_series_page(store: &dyn DataStore, slug: &str) -> Result<Option<SeriesPage>, ApiError> {
    let Some(series) = fetch_one::<Series>(store, &Query::table("series").eq("slug", slug))? else {
        log::info!("No series with slug '{}'", slug);
        return Ok(None);
    };
    let query = Query::table("episodes")
        .eq("series_id", &series.id)
        .order("season_number", Direction::Ascending)
        .order("episode_number", Direction::Ascending);
    let episodes = fetch(store, &query)?;
    Ok(Some(SeriesPage { series, episodes }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use serde_json::json;

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.seed(
            "movies",
            vec![
                json!({"id": "m1", "title": "Dune", "slug": "dune", "featured": true, "created_at": "2024-01-01T00:00:00Z"}),
                json!({"id": "m2", "title": "Up", "slug": "up", "featured": false, "created_at": "2024-02-01T00:00:00Z"}),
                json!({"id": "m3", "title": "Heat", "slug": "heat", "featured": true, "created_at": "2024-03-01T00:00:00Z"}),
            ],
        );
        store.seed(
            "series",
            vec![
                json!({"id": "s1", "title": "Dark", "slug": "dark", "featured": true, "created_at": "2024-01-01T00:00:00Z"}),
                json!({"id": "s2", "title": "Bluey", "slug": "bluey", "featured": false}),
            ],
        );
        store.seed(
            "movie_videos",
            vec![
                json!({"id": "v1", "movie_id": "m1", "quality": "720p", "video_url": "https://cdn/720.mp4"}),
                json!({"id": "v2", "movie_id": "m1", "quality": "1080p", "video_url": "https://cdn/1080.mp4", "file_size": "2.1 GB"}),
                json!({"id": "v3", "movie_id": "m2", "quality": "4K", "video_url": "https://cdn/up.mp4"}),
            ],
        );
        store.seed(
            "episodes",
            vec![
                json!({"id": "e3", "series_id": "s1", "season_number": 2, "episode_number": 1, "title": "C"}),
                json!({"id": "e2", "series_id": "s1", "season_number": 1, "episode_number": 2, "title": "B"}),
                json!({"id": "e1", "series_id": "s1", "season_number": 1, "episode_number": 1, "title": "A"}),
                json!({"id": "x1", "series_id": "s2", "season_number": 1, "episode_number": 1, "title": "X"}),
            ],
        );
        store
    }

    #[test]
    fn test_home_rows() {
        let store = store();
        let home = load_home(&store, HomeLimits::default()).unwrap();

        assert_eq!(home.featured_movie.map(|m| m.id), Some("m3".to_string()));
        assert_eq!(home.featured_series.len(), 1);
        let latest: Vec<&str> = home.latest_movies.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(latest, vec!["m3", "m2", "m1"]);
    }

    #[test]
    fn test_home_respects_limits() {
        let store = store();
        let limits = HomeLimits {
            latest_movies: 2,
            ..Default::default()
        };
        let home = load_home(&store, limits).unwrap();
        assert_eq!(home.latest_movies.len(), 2);
    }

    #[test]
    fn test_home_without_featured() {
        let store = MemoryStore::new();
        let home = load_home(&store, HomeLimits::default()).unwrap();
        assert_eq!(home, HomeContent::default());
    }

    #[test]
    fn test_home_failure() {
        let store = store();
        store.set_failing(true);
        assert!(load_home(&store, HomeLimits::default()).is_err());
    }

    #[test]
    fn test_movie_page_orders_variants() {
        let store = store();
        let page = load_movie_page(&store, "dune").unwrap().unwrap();
        assert_eq!(page.movie.title, "Dune");
        let qualities: Vec<&str> = page.variants.iter().map(|v| v.quality.as_str()).collect();
        assert_eq!(qualities, vec!["1080p", "720p"]);
        assert_eq!(page.variants[0].file_size.as_deref(), Some("2.1 GB"));
    }

    #[test]
    fn test_unknown_slug_is_not_an_error() {
        let store = store();
        assert_eq!(load_movie_page(&store, "nope").unwrap(), None);
        assert_eq!(load_series_page(&store, "nope").unwrap(), None);
    }

    #[test]
    fn test_movie_without_variants() {
        let store = store();
        let page = load_movie_page(&store, "heat").unwrap().unwrap();
        assert!(page.variants.is_empty());
    }

    #[test]
    fn test_series_page_episode_order() {
        let store = store();
        let page = load_series_page(&store, "dark").unwrap().unwrap();
        let ids: Vec<&str> = page.episodes.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e1", "e2", "e3"]);
    }

    #[test]
    fn test_lists_newest_first() {
        let store = store();
        let movies = load_movies(&store).unwrap();
        assert_eq!(movies.first().map(|m| m.id.as_str()), Some("m3"));
        assert_eq!(load_series_list(&store).unwrap().len(), 2);
    }

    #[test]
    fn test_episode_variants() {
        let store = store();
        store.seed(
            "episode_videos",
            vec![json!({"id": "ev1", "episode_id": "e1", "quality": "SD", "video_url": "https://cdn/e1.mp4"})],
        );
        let variants = load_variants(&store, &VariantOwner::Episode("e1".into())).unwrap();
        assert_eq!(variants.len(), 1);
        assert!(load_variants(&store, &VariantOwner::Episode("e2".into())).unwrap().is_empty());
    }
}
