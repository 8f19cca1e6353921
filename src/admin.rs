//! Admin dashboard logic: drafts, validation and the CRUD calls

use crate::api::{fetch, ApiError, DataStore, Direction, Query};
use crate::models::{Movie, Notification, Series, SeriesStatus};
use serde_json::{json, Value};
use thiserror::Error;

/// Earliest year a motion picture could have been released
pub const FIRST_RELEASE_YEAR: i32 = 1888;
pub const MAX_RATING: f64 = 10.0;

const MOVIES: &str = "movies";
const SERIES: &str = "series";
const NOTIFICATIONS: &str = "notifications";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("release year must be between {min} and {max}")]
    ReleaseYear { min: i32, max: i32 },
    #[error("rating must be between 0 and 10")]
    Rating,
    #[error("duration cannot be negative")]
    Duration,
}

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Split a comma-separated editor line: trimmed, empty entries dropped
pub fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_list(items: &[String]) -> String {
    items.join(", ")
}

/// Lowercase, ASCII alphanumerics joined by single dashes
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn optional(text: &str) -> Value {
    let text = text.trim();
    if text.is_empty() {
        Value::Null
    } else {
        Value::String(text.to_string())
    }
}

fn validate_common(title: &str, slug: &str, year: i32, rating: f64, current_year: i32) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::Required("Title"));
    }
    if slug.trim().is_empty() {
        return Err(ValidationError::Required("Slug"));
    }
    let max = current_year + 10;
    if !(FIRST_RELEASE_YEAR..=max).contains(&year) {
        return Err(ValidationError::ReleaseYear {
            min: FIRST_RELEASE_YEAR,
            max,
        });
    }
    if !(0.0..=MAX_RATING).contains(&rating) {
        return Err(ValidationError::Rating);
    }
    Ok(())
}

/// What an edit form needs from the record it edits
pub trait Draft: Clone {
    fn genre(&self) -> &[String];
    fn keywords(&self) -> &[String];
    fn set_lists(&mut self, genre: Vec<String>, keywords: Vec<String>);
    fn validate(&self, current_year: i32) -> Result<(), ValidationError>;
    /// Column values to send on insert or update
    fn to_record(&self) -> Value;
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MovieDraft {
    pub title: String,
    pub description: String,
    pub poster_url: String,
    pub trailer_url: String,
    pub release_year: i32,
    pub duration: i32,
    pub genre: Vec<String>,
    pub rating: f64,
    pub slug: String,
    pub meta_title: String,
    pub meta_description: String,
    pub meta_keywords: Vec<String>,
    pub featured: bool,
}

impl MovieDraft {
    pub fn new(current_year: i32) -> Self {
        Self {
            release_year: current_year,
            ..Default::default()
        }
    }

    pub fn from_movie(movie: &Movie) -> Self {
        Self {
            title: movie.title.clone(),
            description: movie.description.clone().unwrap_or_default(),
            poster_url: movie.poster_url.clone().unwrap_or_default(),
            trailer_url: movie.trailer_url.clone().unwrap_or_default(),
            release_year: movie.release_year,
            duration: movie.duration,
            genre: movie.genre.clone(),
            rating: movie.rating,
            slug: movie.slug.clone(),
            meta_title: movie.meta_title.clone().unwrap_or_default(),
            meta_description: movie.meta_description.clone().unwrap_or_default(),
            meta_keywords: movie.meta_keywords.clone(),
            featured: movie.featured,
        }
    }
}

impl Draft for MovieDraft {
    fn genre(&self) -> &[String] {
        &self.genre
    }

    fn keywords(&self) -> &[String] {
        &self.meta_keywords
    }

    fn set_lists(&mut self, genre: Vec<String>, keywords: Vec<String>) {
        self.genre = genre;
        self.meta_keywords = keywords;
    }

    fn validate(&self, current_year: i32) -> Result<(), ValidationError> {
        validate_common(&self.title, &self.slug, self.release_year, self.rating, current_year)?;
        if self.duration < 0 {
            return Err(ValidationError::Duration);
        }
        Ok(())
    }

    fn to_record(&self) -> Value {
        json!({
            "title": self.title.trim(),
            "description": optional(&self.description),
            "poster_url": optional(&self.poster_url),
            "trailer_url": optional(&self.trailer_url),
            "release_year": self.release_year,
            "duration": self.duration,
            "genre": self.genre,
            "rating": self.rating,
            "slug": self.slug.trim(),
            "meta_title": optional(&self.meta_title),
            "meta_description": optional(&self.meta_description),
            "meta_keywords": self.meta_keywords,
            "featured": self.featured,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeriesDraft {
    pub title: String,
    pub description: String,
    pub poster_url: String,
    pub release_year: i32,
    pub genre: Vec<String>,
    pub rating: f64,
    pub slug: String,
    pub meta_title: String,
    pub meta_description: String,
    pub meta_keywords: Vec<String>,
    pub featured: bool,
    pub status: SeriesStatus,
}

impl SeriesDraft {
    pub fn new(current_year: i32) -> Self {
        Self {
            release_year: current_year,
            ..Default::default()
        }
    }

    pub fn from_series(series: &Series) -> Self {
        Self {
            title: series.title.clone(),
            description: series.description.clone().unwrap_or_default(),
            poster_url: series.poster_url.clone().unwrap_or_default(),
            release_year: series.release_year,
            genre: series.genre.clone(),
            rating: series.rating,
            slug: series.slug.clone(),
            meta_title: series.meta_title.clone().unwrap_or_default(),
            meta_description: series.meta_description.clone().unwrap_or_default(),
            meta_keywords: series.meta_keywords.clone(),
            featured: series.featured,
            status: series.status.clone(),
        }
    }
}

impl Draft for SeriesDraft {
    fn genre(&self) -> &[String] {
        &self.genre
    }

    fn keywords(&self) -> &[String] {
        &self.meta_keywords
    }

    fn set_lists(&mut self, genre: Vec<String>, keywords: Vec<String>) {
        self.genre = genre;
        self.meta_keywords = keywords;
    }

    fn validate(&self, current_year: i32) -> Result<(), ValidationError> {
        validate_common(&self.title, &self.slug, self.release_year, self.rating, current_year)
    }

    fn to_record(&self) -> Value {
        json!({
            "title": self.title.trim(),
            "description": optional(&self.description),
            "poster_url": optional(&self.poster_url),
            "release_year": self.release_year,
            "genre": self.genre,
            "rating": self.rating,
            "slug": self.slug.trim(),
            "meta_title": optional(&self.meta_title),
            "meta_description": optional(&self.meta_description),
            "meta_keywords": self.meta_keywords,
            "featured": self.featured,
            "status": self.status.as_str(),
        })
    }
}

/// An open add/edit dialog. `editing_id` is `None` when adding.
#[derive(Debug, Clone, PartialEq)]
pub struct EditForm<D: Draft> {
    pub editing_id: Option<String>,
    pub draft: D,
    pub genre_text: String,
    pub keywords_text: String,
    pub error: Option<String>,
}

impl<D: Draft> EditForm<D> {
    pub fn new(editing_id: Option<String>, draft: D) -> Self {
        Self {
            genre_text: join_list(draft.genre()),
            keywords_text: join_list(draft.keywords()),
            editing_id,
            draft,
            error: None,
        }
    }

    pub fn is_edit(&self) -> bool {
        self.editing_id.is_some()
    }

    /// Fold the comma-separated editor lines back into the draft
    pub fn sync_lists(&mut self) {
        self.draft
            .set_lists(split_list(&self.genre_text), split_list(&self.keywords_text));
    }
}

pub type MovieForm = EditForm<MovieDraft>;
pub type SeriesForm = EditForm<SeriesDraft>;

impl MovieForm {
    pub fn add(current_year: i32) -> Self {
        Self::new(None, MovieDraft::new(current_year))
    }

    pub fn edit(movie: &Movie) -> Self {
        Self::new(Some(movie.id.clone()), MovieDraft::from_movie(movie))
    }
}

impl SeriesForm {
    pub fn add(current_year: i32) -> Self {
        Self::new(None, SeriesDraft::new(current_year))
    }

    pub fn edit(series: &Series) -> Self {
        Self::new(Some(series.id.clone()), SeriesDraft::from_series(series))
    }
}

/// Admin operations. Every mutation returns the freshly reloaded list.
pub struct AdminService<'a> {
    store: &'a dyn DataStore,
}

impl<'a> AdminService<'a> {
    pub fn new(store: &'a dyn DataStore) -> Self {
        Self { store }
    }

    fn newest_first(table: &str) -> Query {
        Query::table(table).order("created_at", Direction::Descending)
    }

    pub fn list_movies(&self) -> Result<Vec<Movie>, ApiError> {
        fetch(self.store, &Self::newest_first(MOVIES))
    }

    pub fn list_series(&self) -> Result<Vec<Series>, ApiError> {
        fetch(self.store, &Self::newest_first(SERIES))
    }

    pub fn list_notifications(&self) -> Result<Vec<Notification>, ApiError> {
        fetch(self.store, &Self::newest_first(NOTIFICATIONS))
    }

    fn save<D: Draft>(&self, table: &str, id: Option<&str>, draft: &D, current_year: i32) -> Result<(), AdminError> {
        draft.validate(current_year)?;
        let record = draft.to_record();
        match id {
            Some(id) => {
                self.store.update(table, id, &record)?;
                log::info!("Updated {} {}", table, id);
            }
            None => {
                let stored = self.store.insert(table, &record)?;
                log::info!(
                    "Created {} {}",
                    table,
                    stored.get("id").and_then(Value::as_str).unwrap_or("?")
                );
            }
        }
        Ok(())
    }

    pub fn save_movie(&self, id: Option<&str>, draft: &MovieDraft, current_year: i32) -> Result<Vec<Movie>, AdminError> {
        self.save(MOVIES, id, draft, current_year)?;
        Ok(self.list_movies()?)
    }

    pub fn save_series(&self, id: Option<&str>, draft: &SeriesDraft, current_year: i32) -> Result<Vec<Series>, AdminError> {
        self.save(SERIES, id, draft, current_year)?;
        Ok(self.list_series()?)
    }

    pub fn delete_movie(&self, id: &str) -> Result<Vec<Movie>, ApiError> {
        self.store.delete(MOVIES, id)?;
        log::info!("Deleted movie {}", id);
        self.list_movies()
    }

    pub fn delete_series(&self, id: &str) -> Result<Vec<Series>, ApiError> {
        self.store.delete(SERIES, id)?;
        log::info!("Deleted series {}", id);
        self.list_series()
    }

    pub fn mark_notification_read(&self, id: &str) -> Result<Vec<Notification>, ApiError> {
        self.store.update(NOTIFICATIONS, id, &json!({ "is_read": true }))?;
        self.list_notifications()
    }
}

pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.is_read).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    const YEAR: i32 = 2026;

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.seed(
            MOVIES,
            vec![
                json!({"id": "m1", "title": "Dune", "slug": "dune", "created_at": "2024-01-01T00:00:00Z", "genre": ["Sci-Fi"]}),
                json!({"id": "m2", "title": "Up", "slug": "up", "created_at": "2024-02-01T00:00:00Z", "genre": ["Animation"]}),
                json!({"id": "m3", "title": "Heat", "slug": "heat", "created_at": "2024-03-01T00:00:00Z", "genre": ["Crime"]}),
            ],
        );
        store
    }

    fn valid_movie() -> MovieDraft {
        MovieDraft {
            title: "Arrival".into(),
            slug: "arrival".into(),
            release_year: 2016,
            duration: 116,
            rating: 7.9,
            ..MovieDraft::new(YEAR)
        }
    }

    #[test]
    fn test_split_and_join() {
        assert_eq!(split_list(" Action, ,Sci-Fi ,,"), vec!["Action", "Sci-Fi"]);
        assert!(split_list("").is_empty());
        assert_eq!(join_list(&["A".into(), "B".into()]), "A, B");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("The Lord of the Rings: Part 2"), "the-lord-of-the-rings-part-2");
        assert_eq!(slugify("  Amélie!  "), "am-lie");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_new_draft_defaults() {
        let draft = SeriesDraft::new(YEAR);
        assert_eq!(draft.release_year, YEAR);
        assert_eq!(draft.status, SeriesStatus::Ongoing);
        assert!(!draft.featured);
    }

    #[test]
    fn test_validation_rules() {
        let mut draft = valid_movie();
        assert_eq!(draft.validate(YEAR), Ok(()));

        draft.title = "  ".into();
        assert_eq!(draft.validate(YEAR), Err(ValidationError::Required("Title")));

        let mut draft = valid_movie();
        draft.slug.clear();
        assert_eq!(draft.validate(YEAR), Err(ValidationError::Required("Slug")));

        let mut draft = valid_movie();
        draft.release_year = YEAR + 11;
        assert!(matches!(draft.validate(YEAR), Err(ValidationError::ReleaseYear { .. })));
        draft.release_year = 1887;
        assert!(draft.validate(YEAR).is_err());

        let mut draft = valid_movie();
        draft.rating = 10.5;
        assert_eq!(draft.validate(YEAR), Err(ValidationError::Rating));

        let mut draft = valid_movie();
        draft.duration = -1;
        assert_eq!(draft.validate(YEAR), Err(ValidationError::Duration));
    }

    #[test]
    fn test_form_round_trips_lists() {
        let movie = Movie {
            id: "m9".into(),
            title: "Alien".into(),
            genre: vec!["Horror".into(), "Sci-Fi".into()],
            meta_keywords: vec!["xenomorph".into()],
            ..Default::default()
        };
        let mut form = MovieForm::edit(&movie);
        assert!(form.is_edit());
        assert_eq!(form.genre_text, "Horror, Sci-Fi");

        form.genre_text = "Horror,  Thriller, ".into();
        form.sync_lists();
        assert_eq!(form.draft.genre, vec!["Horror", "Thriller"]);
        assert_eq!(form.draft.meta_keywords, vec!["xenomorph"]);
    }

    #[test]
    fn test_editing_record_without_year_is_not_silently_fixed() {
        let movie = Movie {
            id: "m7".into(),
            title: "Nosferatu".into(),
            slug: "nosferatu".into(),
            ..Default::default()
        };
        let form = MovieForm::edit(&movie);
        assert_eq!(form.draft.release_year, 0);
        assert!(matches!(form.draft.validate(YEAR), Err(ValidationError::ReleaseYear { .. })));

        let series = Series {
            id: "s7".into(),
            title: "Twin Peaks".into(),
            slug: "twin-peaks".into(),
            ..Default::default()
        };
        let form = SeriesForm::edit(&series);
        assert!(matches!(form.draft.validate(YEAR), Err(ValidationError::ReleaseYear { .. })));
    }

    #[test]
    fn test_record_blanks_become_null() {
        let record = valid_movie().to_record();
        assert_eq!(record["description"], Value::Null);
        assert_eq!(record["title"], "Arrival");
        assert_eq!(record["genre"], json!([]));
    }

    #[test]
    fn test_list_newest_first() {
        let store = seeded();
        let movies = AdminService::new(&store).list_movies().unwrap();
        let ids: Vec<&str> = movies.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m3", "m2", "m1"]);
    }

    #[test]
    fn test_delete_reloads_list() {
        let store = seeded();
        let admin = AdminService::new(&store);
        let before = admin.list_movies().unwrap();

        let after = admin.delete_movie("m2").unwrap();
        assert!(after.iter().all(|m| m.id != "m2"));

        let expected: Vec<Movie> = before.into_iter().filter(|m| m.id != "m2").collect();
        assert_eq!(after, expected);
    }

    #[test]
    fn test_create_then_edit() {
        let store = seeded();
        let admin = AdminService::new(&store);

        let movies = admin.save_movie(None, &valid_movie(), YEAR).unwrap();
        assert_eq!(movies.len(), 4);
        let created = movies.iter().find(|m| m.slug == "arrival").unwrap().clone();

        let mut draft = MovieDraft::from_movie(&created);
        draft.rating = 8.5;
        let movies = admin.save_movie(Some(created.id.as_str()), &draft, YEAR).unwrap();
        assert_eq!(movies.len(), 4);
        let updated = movies.iter().find(|m| m.id == created.id).unwrap();
        assert_eq!(updated.rating, 8.5);
    }

    #[test]
    fn test_invalid_draft_makes_no_remote_call() {
        let store = seeded();
        let admin = AdminService::new(&store);
        let mut draft = valid_movie();
        draft.title.clear();

        let err = admin.save_movie(None, &draft, YEAR).unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.select_count(), 0);
    }

    #[test]
    fn test_store_failure_surfaces() {
        let store = seeded();
        store.set_failing(true);
        let err = AdminService::new(&store).save_movie(None, &valid_movie(), YEAR).unwrap_err();
        assert!(matches!(err, AdminError::Api(ApiError::Status { status: 503, .. })));
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn test_series_save_keeps_status() {
        let store = MemoryStore::new();
        let admin = AdminService::new(&store);
        let draft = SeriesDraft {
            title: "Dark".into(),
            slug: "dark".into(),
            status: SeriesStatus::Completed,
            ..SeriesDraft::new(YEAR)
        };
        let series = admin.save_series(None, &draft, YEAR).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].status, SeriesStatus::Completed);

        let series = admin.delete_series(&series[0].id).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_notifications() {
        let store = MemoryStore::new();
        store.seed(
            NOTIFICATIONS,
            vec![
                json!({"id": "n1", "type": "new_movie", "title": "Old", "message": "", "is_read": false, "created_at": "2024-01-01T00:00:00Z"}),
                json!({"id": "n2", "type": "new_series", "title": "New", "message": "", "is_read": false, "created_at": "2024-05-01T00:00:00Z"}),
            ],
        );
        let admin = AdminService::new(&store);

        let list = admin.list_notifications().unwrap();
        assert_eq!(list[0].id, "n2");
        assert_eq!(unread_count(&list), 2);

        let list = admin.mark_notification_read("n1").unwrap();
        assert_eq!(unread_count(&list), 1);
        assert!(list.iter().find(|n| n.id == "n1").unwrap().is_read);
    }
}
