//! Catalog filtering: search text + genre chips over a loaded list

use crate::models::{Movie, Series};
use std::collections::BTreeSet;
use std::fmt;

/// Anything the catalog lists can filter
pub trait CatalogItem {
    fn title(&self) -> &str;
    fn description(&self) -> Option<&str>;
    fn genres(&self) -> &[String];
    fn slug(&self) -> &str;
}

impl CatalogItem for Movie {
    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn genres(&self) -> &[String] {
        &self.genre
    }

    fn slug(&self) -> &str {
        &self.slug
    }
}

impl CatalogItem for Series {
    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn genres(&self) -> &[String] {
        &self.genre
    }

    fn slug(&self) -> &str {
        &self.slug
    }
}

/// State of a view's data: still fetching, fetched, or failed with a reason
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Loadable<T> {
    #[default]
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> Loadable<T> {
    pub fn from_result<E: fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Loadable::Loaded(value),
            Err(e) => Loadable::Failed(e.to_string()),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Loadable::Loading)
    }

    pub fn as_loaded(&self) -> Option<&T> {
        match self {
            Loadable::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_loaded_mut(&mut self) -> Option<&mut T> {
        match self {
            Loadable::Loaded(value) => Some(value),
            _ => None,
        }
    }
}

/// Selected genre chip
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GenreFilter {
    #[default]
    All,
    Genre(String),
}

impl GenreFilter {
    pub fn matches(&self, genres: &[String]) -> bool {
        match self {
            GenreFilter::All => true,
            GenreFilter::Genre(wanted) => genres.iter().any(|g| g == wanted),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            GenreFilter::All => "All",
            GenreFilter::Genre(g) => g,
        }
    }
}

/// Case-insensitive substring check. ASCII input is compared without allocating.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }

    if haystack.is_ascii() && needle.is_ascii() {
        if needle.len() > haystack.len() {
            return false;
        }
        return haystack
            .as_bytes()
            .windows(needle.len())
            .any(|window| window.eq_ignore_ascii_case(needle.as_bytes()));
    }

    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Search text plus genre, applied with AND
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogFilter {
    pub query: String,
    pub genre: GenreFilter,
}

impl CatalogFilter {
    pub fn new(query: &str, genre: GenreFilter) -> Self {
        Self {
            query: query.to_string(),
            genre,
        }
    }

    pub fn matches<T: CatalogItem>(&self, item: &T) -> bool {
        let text_ok = self.query.is_empty()
            || contains_ignore_case(item.title(), &self.query)
            || item
                .description()
                .is_some_and(|d| contains_ignore_case(d, &self.query));

        text_ok && self.genre.matches(item.genres())
    }

    /// Matching items in source order
    pub fn apply<'a, T: CatalogItem>(&self, items: &'a [T]) -> Vec<&'a T> {
        items.iter().filter(|item| self.matches(*item)).collect()
    }

    /// Filter a view's data. Does not run until the list has loaded.
    pub fn apply_loaded<'a, T: CatalogItem>(&self, source: &'a Loadable<Vec<T>>) -> Loadable<Vec<&'a T>> {
        match source {
            Loadable::Loading => Loadable::Loading,
            Loadable::Failed(reason) => Loadable::Failed(reason.clone()),
            Loadable::Loaded(items) => Loadable::Loaded(self.apply(items)),
        }
    }
}

/// Owned variant of [`CatalogFilter::apply`]
#[cfg(test)]
pub fn filter_catalog<T: CatalogItem + Clone>(items: &[T], query: &str, genre: &GenreFilter) -> Vec<T> {
    CatalogFilter::new(query, genre.clone())
        .apply(items)
        .into_iter()
        .cloned()
        .collect()
}

/// Distinct genres across the list, sorted, for the chip row
pub fn collect_genres<T: CatalogItem>(items: &[T]) -> Vec<String> {
    items
        .iter()
        .flat_map(|item| item.genres().iter().cloned())
        .filter(|g| !g.trim().is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
