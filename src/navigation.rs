//! In-memory view routing (current view + slug + pending search)

use crate::auth::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Home,
    Movies,
    Series,
    WatchMovie,
    WatchSeries,
    Login,
    Admin,
}

const HOME_TITLE: &str = "R1 Movies - Watch Movies & TV Series Online";

impl View {
    /// Window title shown for this view
    pub fn window_title(&self) -> &'static str {
        match self {
            View::Home => HOME_TITLE,
            View::Movies => "Movies - R1 Movies",
            View::Series => "TV Series - R1 Movies",
            View::Login => "Admin Login - R1 Movies",
            View::Admin => "Admin Dashboard - R1 Movies",
            View::WatchMovie | View::WatchSeries => HOME_TITLE,
        }
    }

    pub fn requires_session(&self) -> bool {
        matches!(self, View::Admin)
    }

    /// Whether the header and footer are drawn around this view
    pub fn shows_chrome(&self) -> bool {
        !matches!(self, View::Login)
    }
}

#[derive(Debug, Clone)]
pub struct Navigator {
    current: View,
    slug: Option<String>,
    query: String,
    scroll_reset: bool,
    generation: u64,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    pub fn new() -> Self {
        Self {
            current: View::Home,
            slug: None,
            query: String::new(),
            scroll_reset: false,
            generation: 0,
        }
    }

    pub fn current(&self) -> View {
        self.current
    }

    /// Last slug that was set. Navigating without a slug keeps the old one.
    pub fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Bumped on every transition; loads tagged with an older value are stale
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a load started at `generation` still belongs to the current view
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    pub fn navigate(&mut self, view: View, slug: Option<&str>) {
        log::debug!("navigate {:?} -> {:?} (slug: {:?})", self.current, view, slug);
        self.current = view;
        if let Some(slug) = slug {
            self.slug = Some(slug.to_string());
        }
        self.generation += 1;
        self.scroll_reset = true;
    }

    /// Submit a search. From home this also moves to the movie list.
    pub fn search(&mut self, query: &str) {
        self.query = query.to_string();
        if self.current == View::Home {
            self.navigate(View::Movies, None);
        }
    }

    /// Returns true once after each transition; the view resets its scroll
    pub fn take_scroll_reset(&mut self) -> bool {
        std::mem::take(&mut self.scroll_reset)
    }

    /// Apply session gating and return the view to render.
    /// Admin needs a principal; login with a principal goes to admin.
    /// Nothing redirects while the session is still loading.
    pub fn resolve(&mut self, session: &SessionState) -> View {
        match (self.current, session) {
            (_, SessionState::Loading) => {}
            (View::Admin, SessionState::SignedOut) => {
                log::info!("Admin requires sign-in, redirecting to login");
                self.navigate(View::Login, None);
            }
            (View::Login, SessionState::SignedIn(_)) => {
                self.navigate(View::Admin, None);
            }
            _ => {}
        }
        self.current
    }
}
