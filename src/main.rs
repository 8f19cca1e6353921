//! R1 Movies - desktop catalog client
//! Browse and play movies and TV series hosted on Supabase, with an admin dashboard

// Hide console window on Windows release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

// Use mimalloc for faster memory allocation (Linux, macOS)
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use chrono::Datelike;
use eframe::egui;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

mod admin;
mod api;
mod auth;
mod catalog;
mod config;
mod loaders;
mod logger;
mod models;
mod navigation;
mod playback;
#[cfg(test)]
mod testing;

use admin::{unread_count, AdminService, MovieForm, SeriesForm};
use api::SupabaseClient;
use auth::{validate_credentials, AuthSession, GoTrueAuth, ListenerId, SessionState};
use catalog::{collect_genres, CatalogFilter, CatalogItem, GenreFilter, Loadable};
use config::{AppConfig, SessionFile};
use loaders::{HomeContent, HomeLimits, MoviePage, SeriesPage};
use logger::ConsoleBuffer;
use models::*;
use navigation::{Navigator, View};
use playback::{EpisodeBrowser, PlaybackSelection, PlayerEvent, PlayerLauncher};

const APP_NAME: &str = "R1 Movies";
const ACCENT: egui::Color32 = egui::Color32::from_rgb(220, 38, 38);
const CARD_WIDTH: f32 = 170.0;
const CARD_HEIGHT: f32 = 150.0;
/// How often the session expiry is checked
const EXPIRY_CHECK_SECS: i64 = 30;

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}

/// Window icon: red rounded square with a white play triangle
fn load_icon() -> egui::IconData {
    let size: usize = 64;
    let mut rgba = vec![0u8; size * size * 4];
    let radius = 10.0_f32;

    for y in 0..size {
        for x in 0..size {
            let idx = (y * size + x) * 4;
            let (fx, fy) = (x as f32 + 0.5, y as f32 + 0.5);

            let cx = fx.clamp(radius, size as f32 - radius);
            let cy = fy.clamp(radius, size as f32 - radius);
            if (fx - cx).powi(2) + (fy - cy).powi(2) > radius * radius {
                continue;
            }

            // Triangle pointing right, centred
            let (px, py) = (fx / size as f32 - 0.36, fy / size as f32 - 0.5);
            let in_play = px >= 0.0 && px <= 0.36 && py.abs() <= (0.36 - px) * 0.62;

            let (r, g, b) = if in_play { (255, 255, 255) } else { (220, 38, 38) };
            rgba[idx] = r;
            rgba[idx + 1] = g;
            rgba[idx + 2] = b;
            rgba[idx + 3] = 255;
        }
    }

    egui::IconData {
        rgba,
        width: size as u32,
        height: size as u32,
    }
}

fn main() -> Result<(), eframe::Error> {
    let console = logger::init(logger::level_from_env());
    log::info!("{} {} starting", APP_NAME, env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::load();
    config.apply_env_overrides();
    if !config.backend_configured() {
        log::warn!("No Supabase URL/anon key configured; open Settings to add them");
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(View::Home.window_title())
            .with_inner_size([1200.0, 760.0])
            .with_min_inner_size([900.0, 560.0])
            .with_icon(load_icon()),
        vsync: true,
        hardware_acceleration: eframe::HardwareAcceleration::Preferred,
        ..Default::default()
    };

    eframe::run_native(
        APP_NAME,
        options,
        Box::new(move |cc| {
            let ctx = cc.egui_ctx.clone();
            Ok(Box::new(CatalogApp::new(config, console, ctx)))
        }),
    )
}

/// Results posted back from worker threads
enum TaskResult {
    SessionChanged(SessionState),
    /// Sign-in/sign-up finished; Ok carries an optional notice for the form
    AuthFinished(Result<Option<String>, String>),
    HomeLoaded {
        generation: u64,
        content: Loadable<HomeContent>,
    },
    MoviesLoaded {
        generation: u64,
        movies: Loadable<Vec<Movie>>,
    },
    SeriesLoaded {
        generation: u64,
        series: Loadable<Vec<Series>>,
    },
    MoviePageLoaded {
        generation: u64,
        page: Loadable<Option<MoviePage>>,
    },
    SeriesPageLoaded {
        generation: u64,
        page: Loadable<Option<SeriesPage>>,
    },
    EpisodeVariantsLoaded {
        generation: u64,
        episode_id: String,
        selection: Loadable<PlaybackSelection>,
    },
    /// A list reload, delete or mark-as-read finished
    AdminLoaded(Result<AdminList, String>),
    /// A form save finished; Ok closes the form
    AdminSaved(Result<AdminList, String>),
    Player(PlayerEvent),
}

enum AdminList {
    Movies(Vec<Movie>),
    Series(Vec<Series>),
    Notifications(Vec<Notification>),
}

/// Everything a worker thread needs to talk to the backend and report back
struct FetchContext {
    url: String,
    anon_key: String,
    access_token: Option<String>,
    connect_timeout: u64,
    request_timeout: u64,
    generation: u64,
    sender: Sender<TaskResult>,
    ctx: egui::Context,
}

impl FetchContext {
    fn client(&self) -> SupabaseClient {
        SupabaseClient::new(&self.url, &self.anon_key)
            .with_timeouts(self.connect_timeout, self.request_timeout)
            .with_access_token(self.access_token.as_deref())
    }

    fn send(&self, result: TaskResult) {
        let _ = self.sender.send(result);
        self.ctx.request_repaint();
    }
}

fn loadable<T, E: std::fmt::Display>(what: &str, result: Result<T, E>) -> Loadable<T> {
    if let Err(e) = &result {
        log::error!("Failed to load {}: {}", what, e);
    }
    Loadable::from_result(result)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdminTab {
    Movies,
    Series,
    Notifications,
}

#[derive(Debug, Clone, PartialEq)]
enum PendingDelete {
    Movie { id: String, title: String },
    Series { id: String, title: String },
}

/// Deferred UI actions, collected while widgets borrow `self`
enum Action {
    Navigate(View, Option<String>),
    Play { title: String, url: String },
    SelectQuality(String),
    SelectSeason(i32),
    SelectEpisode(String),
}

struct CatalogApp {
    config: AppConfig,
    ctx: egui::Context,

    // Session
    session: AuthSession,
    session_state: SessionState,
    session_listener: ListenerId,
    last_expiry_check: i64,

    // Background task channel
    task_receiver: Receiver<TaskResult>,
    task_sender: Sender<TaskResult>,

    navigator: Navigator,
    loaded_generation: Option<u64>,
    window_title: &'static str,
    search_input: String,
    status_message: String,

    // Catalog views
    home: Loadable<HomeContent>,
    movies: Loadable<Vec<Movie>>,
    movie_genre: GenreFilter,
    series: Loadable<Vec<Series>>,
    series_genre: GenreFilter,

    // Watch pages
    movie_page: Loadable<Option<MoviePage>>,
    movie_playback: PlaybackSelection,
    series_page: Loadable<Option<SeriesPage>>,
    episodes: EpisodeBrowser,
    episode_playback: Loadable<PlaybackSelection>,
    launcher: PlayerLauncher,

    // Login form
    login_email: String,
    login_password: String,
    login_signup: bool,
    login_error: Option<String>,
    login_notice: Option<String>,
    auth_pending: bool,

    // Admin dashboard
    admin_tab: AdminTab,
    admin_movies: Loadable<Vec<Movie>>,
    admin_series: Loadable<Vec<Series>>,
    admin_notifications: Loadable<Vec<Notification>>,
    movie_form: Option<MovieForm>,
    series_form: Option<SeriesForm>,
    admin_saving: bool,
    pending_delete: Option<PendingDelete>,

    // Dialogs
    show_settings: bool,
    settings_draft: AppConfig,
    show_console: bool,
    console: Arc<ConsoleBuffer>,
}

impl CatalogApp {
    fn new(config: AppConfig, console: Arc<ConsoleBuffer>, ctx: egui::Context) -> Self {
        let (task_sender, task_receiver) = channel();
        let (session, session_listener) = Self::start_session(&config, &task_sender, &ctx);
        let launcher = PlayerLauncher::new(&config.external_player, config.single_window_mode);

        let app = Self {
            settings_draft: config.clone(),
            config,
            ctx,
            session_state: session.state(),
            session,
            session_listener,
            last_expiry_check: now_secs(),
            task_receiver,
            task_sender,
            navigator: Navigator::new(),
            loaded_generation: None,
            window_title: View::Home.window_title(),
            search_input: String::new(),
            status_message: "Ready".to_string(),
            home: Loadable::Loading,
            movies: Loadable::Loading,
            movie_genre: GenreFilter::All,
            series: Loadable::Loading,
            series_genre: GenreFilter::All,
            movie_page: Loadable::Loading,
            movie_playback: PlaybackSelection::default(),
            series_page: Loadable::Loading,
            episodes: EpisodeBrowser::default(),
            episode_playback: Loadable::Loading,
            launcher,
            login_email: String::new(),
            login_password: String::new(),
            login_signup: false,
            login_error: None,
            login_notice: None,
            auth_pending: false,
            admin_tab: AdminTab::Movies,
            admin_movies: Loadable::Loading,
            admin_series: Loadable::Loading,
            admin_notifications: Loadable::Loading,
            movie_form: None,
            series_form: None,
            admin_saving: false,
            pending_delete: None,
            show_settings: false,
            show_console: false,
            console,
        };
        app.apply_style();
        app
    }

    /// Build the session holder for the configured backend, forward its
    /// changes to the UI thread and resolve the stored session in the background
    fn start_session(config: &AppConfig, sender: &Sender<TaskResult>, ctx: &egui::Context) -> (AuthSession, ListenerId) {
        let backend = GoTrueAuth::new(&config.supabase_url, &config.supabase_anon_key)
            .with_timeouts(config.connect_timeout_secs, config.request_timeout_secs);
        let session = AuthSession::new(Arc::new(backend), Some(SessionFile::default_location()));

        let sender = sender.clone();
        let repaint = ctx.clone();
        let listener = session.subscribe(Arc::new(move |state: &SessionState| {
            let _ = sender.send(TaskResult::SessionChanged(state.clone()));
            repaint.request_repaint();
        }));

        let restoring = session.clone();
        thread::spawn(move || {
            restoring.restore();
        });

        (session, listener)
    }

    fn apply_style(&self) {
        let size = self.config.font_size.clamp(10, 24) as f32;
        self.ctx.style_mut(|style| {
            use egui::{FontId, TextStyle};
            style.text_styles.insert(TextStyle::Body, FontId::proportional(size));
            style.text_styles.insert(TextStyle::Button, FontId::proportional(size));
            style.text_styles.insert(TextStyle::Heading, FontId::proportional(size * 1.6));
            style.text_styles.insert(TextStyle::Small, FontId::proportional(size * 0.8));
            style.text_styles.insert(TextStyle::Monospace, FontId::monospace(size - 1.0));
        });
    }

    fn fetch_context(&self) -> FetchContext {
        FetchContext {
            url: self.config.supabase_url.clone(),
            anon_key: self.config.supabase_anon_key.clone(),
            access_token: self.session_state.principal().map(|p| p.access_token.clone()),
            connect_timeout: self.config.connect_timeout_secs,
            request_timeout: self.config.request_timeout_secs,
            generation: self.navigator.generation(),
            sender: self.task_sender.clone(),
            ctx: self.ctx.clone(),
        }
    }

    fn home_limits(&self) -> HomeLimits {
        HomeLimits {
            featured_movies: self.config.featured_movie_limit,
            featured_series: self.config.featured_series_limit,
            latest_movies: self.config.latest_movie_limit,
        }
    }

    fn navigate(&mut self, view: View, slug: Option<&str>) {
        self.navigator.navigate(view, slug);
    }

    // === Loading ===

    /// Start the fetches for the view that just became current
    fn load_view(&mut self, view: View) {
        match view {
            View::Home => self.load_home(),
            View::Movies => self.load_movies(),
            View::Series => self.load_series(),
            View::WatchMovie => self.load_movie_page(),
            View::WatchSeries => self.load_series_page(),
            View::Login => {
                self.login_error = None;
                self.login_notice = None;
            }
            View::Admin => {
                self.load_admin_tab();
                if self.admin_tab != AdminTab::Notifications {
                    self.load_admin_list(AdminTab::Notifications);
                }
            }
        }
    }

    fn load_home(&mut self) {
        self.home = Loadable::Loading;
        let fetch = self.fetch_context();
        let limits = self.home_limits();
        thread::spawn(move || {
            let content = loadable("home page", loaders::load_home(&fetch.client(), limits));
            fetch.send(TaskResult::HomeLoaded {
                generation: fetch.generation,
                content,
            });
        });
    }

    fn load_movies(&mut self) {
        self.movies = Loadable::Loading;
        let fetch = self.fetch_context();
        thread::spawn(move || {
            let movies = loadable("movies", loaders::load_movies(&fetch.client()));
            fetch.send(TaskResult::MoviesLoaded {
                generation: fetch.generation,
                movies,
            });
        });
    }

    fn load_series(&mut self) {
        self.series = Loadable::Loading;
        let fetch = self.fetch_context();
        thread::spawn(move || {
            let series = loadable("series", loaders::load_series_list(&fetch.client()));
            fetch.send(TaskResult::SeriesLoaded {
                generation: fetch.generation,
                series,
            });
        });
    }

    fn load_movie_page(&mut self) {
        self.movie_playback = PlaybackSelection::default();
        let Some(slug) = self.navigator.slug().map(str::to_string) else {
            self.movie_page = Loadable::Loaded(None);
            return;
        };
        self.movie_page = Loadable::Loading;
        let fetch = self.fetch_context();
        thread::spawn(move || {
            let page = loadable("movie", loaders::load_movie_page(&fetch.client(), &slug));
            fetch.send(TaskResult::MoviePageLoaded {
                generation: fetch.generation,
                page,
            });
        });
    }

    fn load_series_page(&mut self) {
        self.episodes = EpisodeBrowser::default();
        self.episode_playback = Loadable::Loading;
        let Some(slug) = self.navigator.slug().map(str::to_string) else {
            self.series_page = Loadable::Loaded(None);
            return;
        };
        self.series_page = Loadable::Loading;
        let fetch = self.fetch_context();
        thread::spawn(move || {
            let page = loadable("series", loaders::load_series_page(&fetch.client(), &slug));
            fetch.send(TaskResult::SeriesPageLoaded {
                generation: fetch.generation,
                page,
            });
        });
    }

    fn load_episode_variants(&mut self, episode_id: String) {
        self.episode_playback = Loadable::Loading;
        let fetch = self.fetch_context();
        thread::spawn(move || {
            let owner = VariantOwner::Episode(episode_id.clone());
            let result = loaders::load_variants(&fetch.client(), &owner).map(PlaybackSelection::new);
            fetch.send(TaskResult::EpisodeVariantsLoaded {
                generation: fetch.generation,
                episode_id,
                selection: loadable("episode videos", result),
            });
        });
    }

    fn load_admin_tab(&mut self) {
        self.load_admin_list(self.admin_tab);
    }

    fn load_admin_list(&mut self, tab: AdminTab) {
        match tab {
            AdminTab::Movies => self.admin_movies = Loadable::Loading,
            AdminTab::Series => self.admin_series = Loadable::Loading,
            AdminTab::Notifications => self.admin_notifications = Loadable::Loading,
        }
        self.spawn_admin(false, move |admin| match tab {
            AdminTab::Movies => admin.list_movies().map(AdminList::Movies).map_err(|e| e.to_string()),
            AdminTab::Series => admin.list_series().map(AdminList::Series).map_err(|e| e.to_string()),
            AdminTab::Notifications => admin
                .list_notifications()
                .map(AdminList::Notifications)
                .map_err(|e| e.to_string()),
        });
    }

    /// Run an admin operation on a worker thread
    fn spawn_admin<F>(&mut self, save: bool, op: F)
    where
        F: FnOnce(&AdminService<'_>) -> Result<AdminList, String> + Send + 'static,
    {
        if save {
            self.admin_saving = true;
        }
        let fetch = self.fetch_context();
        thread::spawn(move || {
            let client = fetch.client();
            let result = op(&AdminService::new(&client));
            if let Err(e) = &result {
                log::error!("Admin operation failed: {}", e);
            }
            fetch.send(if save {
                TaskResult::AdminSaved(result)
            } else {
                TaskResult::AdminLoaded(result)
            });
        });
    }

    // === Results ===

    fn is_current(&self, generation: u64, what: &str) -> bool {
        let current = self.navigator.is_current(generation);
        if !current {
            log::debug!("Dropping stale {} result", what);
        }
        current
    }

    fn process_results(&mut self) {
        while let Ok(result) = self.task_receiver.try_recv() {
            match result {
                TaskResult::SessionChanged(state) => {
                    if state.is_signed_in() {
                        self.login_password.clear();
                    }
                    self.session_state = state;
                }
                TaskResult::AuthFinished(result) => {
                    self.auth_pending = false;
                    match result {
                        Ok(notice) => {
                            if notice.is_some() {
                                self.login_signup = false;
                            }
                            self.login_notice = notice;
                        }
                        Err(e) => self.login_error = Some(e),
                    }
                }
                TaskResult::HomeLoaded { generation, content } => {
                    if self.is_current(generation, "home") {
                        self.home = content;
                    }
                }
                TaskResult::MoviesLoaded { generation, movies } => {
                    if self.is_current(generation, "movies") {
                        self.movies = movies;
                    }
                }
                TaskResult::SeriesLoaded { generation, series } => {
                    if self.is_current(generation, "series") {
                        self.series = series;
                    }
                }
                TaskResult::MoviePageLoaded { generation, page } => {
                    if self.is_current(generation, "movie page") {
                        if let Loadable::Loaded(Some(page)) = &page {
                            self.movie_playback = PlaybackSelection::new(page.variants.clone());
                        }
                        self.movie_page = page;
                    }
                }
                TaskResult::SeriesPageLoaded { generation, page } => {
                    if self.is_current(generation, "series page") {
                        if let Loadable::Loaded(Some(page)) = &page {
                            self.episodes = EpisodeBrowser::new(page.episodes.clone());
                        }
                        self.series_page = page;
                        if let Some(id) = self.episodes.selected_episode().map(|e| e.id.clone()) {
                            self.load_episode_variants(id);
                        }
                    }
                }
                TaskResult::EpisodeVariantsLoaded { generation, episode_id, selection } => {
                    if self.is_current(generation, "episode videos") && self.episodes.is_playing(&episode_id) {
                        self.episode_playback = selection;
                    }
                }
                TaskResult::AdminLoaded(result) => match result {
                    Ok(list) => self.apply_admin_list(list),
                    Err(e) => {
                        self.status_message = format!("Admin: {}", e);
                        self.fail_admin_loading(e);
                    }
                },
                TaskResult::AdminSaved(result) => {
                    self.admin_saving = false;
                    match result {
                        Ok(list) => {
                            self.movie_form = None;
                            self.series_form = None;
                            self.status_message = "Saved".to_string();
                            self.apply_admin_list(list);
                        }
                        Err(e) => {
                            if let Some(form) = self.movie_form.as_mut() {
                                form.error = Some(e.clone());
                            }
                            if let Some(form) = self.series_form.as_mut() {
                                form.error = Some(e.clone());
                            }
                            self.status_message = format!("Save failed: {}", e);
                        }
                    }
                }
                TaskResult::Player(event) => match event {
                    PlayerEvent::Output(line) => log::debug!("[player] {}", line),
                    PlayerEvent::Exited { title, code } => {
                        let message = match code {
                            Some(c) => format!("Player exited with code {} for '{}'", c, title),
                            None => format!("Player terminated for '{}'", title),
                        };
                        log::warn!("{}", message);
                        self.status_message = message;
                    }
                },
            }
        }
    }

    fn apply_admin_list(&mut self, list: AdminList) {
        match list {
            AdminList::Movies(movies) => self.admin_movies = Loadable::Loaded(movies),
            AdminList::Series(series) => self.admin_series = Loadable::Loaded(series),
            AdminList::Notifications(n) => self.admin_notifications = Loadable::Loaded(n),
        }
    }

    /// A failed reload leaves any list that was still loading in the failed state
    fn fail_admin_loading(&mut self, reason: String) {
        fail_if_loading(&mut self.admin_movies, &reason);
        fail_if_loading(&mut self.admin_series, &reason);
        fail_if_loading(&mut self.admin_notifications, &reason);
    }

    fn check_session_expiry(&mut self) {
        let now = now_secs();
        if now - self.last_expiry_check < EXPIRY_CHECK_SECS {
            return;
        }
        self.last_expiry_check = now;

        if self.session.needs_refresh(now) {
            let session = self.session.clone();
            thread::spawn(move || {
                session.check_expiry(now);
            });
        }
    }

    // === Actions ===

    fn play(&mut self, title: &str, url: &str) {
        let sender = self.task_sender.clone();
        let ctx = self.ctx.clone();
        let notify = move |event: PlayerEvent| {
            let _ = sender.send(TaskResult::Player(event));
            ctx.request_repaint();
        };

        match self.launcher.launch(title, url, notify) {
            Ok(_) => self.status_message = format!("Playing {}", title),
            Err(e) => {
                log::error!("{}", e);
                self.status_message = e.to_string();
            }
        }
    }

    /// Replay the selected source if a player from this window is still open
    fn replay_if_running(&mut self, title: String, variant: Option<Variant>) {
        if let Some(variant) = variant.filter(|_| self.launcher.is_running()) {
            self.play(&format!("{} ({})", title, variant.quality), &variant.video_url);
        }
    }

    fn run_actions(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Navigate(view, slug) => self.navigate(view, slug.as_deref()),
                Action::Play { title, url } => self.play(&title, &url),
                Action::SelectQuality(quality) => match self.navigator.current() {
                    View::WatchMovie => {
                        if self.movie_playback.select_quality(&quality) {
                            let title = match &self.movie_page {
                                Loadable::Loaded(Some(page)) => page.movie.title.clone(),
                                _ => String::new(),
                            };
                            let variant = self.movie_playback.current().cloned();
                            self.replay_if_running(title, variant);
                        }
                    }
                    _ => {
                        let variant = self.episode_playback.as_loaded_mut().and_then(|selection| {
                            if selection.select_quality(&quality) {
                                selection.current().cloned()
                            } else {
                                None
                            }
                        });
                        let title = self.episodes.selected_episode().map(Episode::label).unwrap_or_default();
                        self.replay_if_running(title, variant);
                    }
                },
                Action::SelectSeason(season) => self.episodes.select_season(season),
                Action::SelectEpisode(id) => {
                    if self.episodes.select_episode(&id) {
                        self.load_episode_variants(id);
                    }
                }
            }
        }
    }

    fn submit_login(&mut self) {
        self.login_error = None;
        self.login_notice = None;
        if let Err(e) = validate_credentials(&self.login_email, &self.login_password) {
            self.login_error = Some(e.to_string());
            return;
        }

        self.auth_pending = true;
        let session = self.session.clone();
        let email = self.login_email.trim().to_string();
        let password = self.login_password.clone();
        let signup = self.login_signup;
        let fetch = self.fetch_context();

        thread::spawn(move || {
            let result = if signup {
                session.sign_up(&email, &password).map(|signed_in| {
                    (!signed_in).then(|| "Account created. Confirm your email, then sign in.".to_string())
                })
            } else {
                session.sign_in(&email, &password).map(|_| None)
            };
            fetch.send(TaskResult::AuthFinished(result.map_err(|e| e.to_string())));
        });
    }

    fn sign_out(&mut self) {
        let session = self.session.clone();
        thread::spawn(move || session.sign_out());
        self.navigate(View::Home, None);
        self.status_message = "Signed out".to_string();
    }

    fn save_settings(&mut self) {
        let backend_changed = self.settings_draft.supabase_url != self.config.supabase_url
            || self.settings_draft.supabase_anon_key != self.config.supabase_anon_key;

        self.config = self.settings_draft.clone();
        self.config.save();
        self.launcher
            .configure(&self.config.external_player, self.config.single_window_mode);
        self.apply_style();

        if backend_changed {
            log::info!("Backend changed, restarting session");
            self.session.unsubscribe(self.session_listener);
            let (session, listener) = Self::start_session(&self.config, &self.task_sender, &self.ctx);
            self.session_state = session.state();
            self.session = session;
            self.session_listener = listener;
            self.loaded_generation = None;
        }
        self.status_message = "Settings saved".to_string();
    }

    fn busy(&self) -> bool {
        self.auth_pending
            || self.admin_saving
            || match self.navigator.current() {
                View::Home => self.home.is_loading(),
                View::Movies => self.movies.is_loading(),
                View::Series => self.series.is_loading(),
                View::WatchMovie => self.movie_page.is_loading(),
                View::WatchSeries => self.series_page.is_loading(),
                View::Login => false,
                View::Admin => match self.admin_tab {
                    AdminTab::Movies => self.admin_movies.is_loading(),
                    AdminTab::Series => self.admin_series.is_loading(),
                    AdminTab::Notifications => self.admin_notifications.is_loading(),
                },
            }
    }
}

fn fail_if_loading<T>(list: &mut Loadable<T>, reason: &str) {
    if list.is_loading() {
        *list = Loadable::Failed(reason.to_string());
    }
}

// === Widgets ===

fn movie_subtitle(movie: &Movie) -> String {
    format!("{} • {} min • ★ {:.1}", movie.release_year, movie.duration, movie.rating)
}

fn series_subtitle(series: &Series) -> String {
    format!("{} • {} • ★ {:.1}", series.release_year, series.status, series.rating)
}

/// Poster-less card for grids. Returns true when clicked.
fn title_card(ui: &mut egui::Ui, title: &str, subtitle: &str, genres: &[String]) -> bool {
    let initial = title.chars().next().map(|c| c.to_uppercase().to_string()).unwrap_or_default();
    let response = egui::Frame::group(ui.style())
        .inner_margin(egui::Margin::same(10))
        .show(ui, |ui| {
            ui.set_width(CARD_WIDTH);
            ui.set_min_height(CARD_HEIGHT);
            ui.vertical(|ui| {
                ui.label(egui::RichText::new(initial).size(40.0).strong().color(ACCENT));
                ui.add(egui::Label::new(egui::RichText::new(title).strong()).wrap());
                ui.label(egui::RichText::new(subtitle).small().weak());
                if !genres.is_empty() {
                    ui.label(egui::RichText::new(genres.join(", ")).small().weak());
                }
            });
        })
        .response
        .interact(egui::Sense::click());
    response.on_hover_cursor(egui::CursorIcon::PointingHand).clicked()
}

/// "All" followed by one chip per genre
fn genre_chips(ui: &mut egui::Ui, genres: &[String], selected: &mut GenreFilter) {
    ui.horizontal_wrapped(|ui| {
        ui.selectable_value(selected, GenreFilter::All, GenreFilter::All.label());
        for genre in genres {
            ui.selectable_value(selected, GenreFilter::Genre(genre.clone()), genre.as_str());
        }
    });
}

/// Spinner or error for anything not yet loaded. Returns the value once loaded.
fn loaded_or_status<'a, T>(ui: &mut egui::Ui, state: &'a Loadable<T>, what: &str) -> Option<&'a T> {
    match state {
        Loadable::Loading => {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(format!("Loading {}...", what));
            });
            None
        }
        Loadable::Failed(reason) => {
            ui.colored_label(ACCENT, format!("Could not load {}: {}", what, reason));
            None
        }
        Loadable::Loaded(value) => Some(value),
    }
}

fn grid<T, F>(ui: &mut egui::Ui, items: &[&T], mut card: F) -> Option<usize>
where
    F: FnMut(&mut egui::Ui, &T) -> bool,
{
    let mut clicked = None;
    ui.horizontal_wrapped(|ui| {
        ui.spacing_mut().item_spacing = egui::vec2(12.0, 12.0);
        for (i, &item) in items.iter().enumerate() {
            if card(ui, item) {
                clicked = Some(i);
            }
        }
    });
    clicked
}

/// Quality buttons plus play button for one selection
fn player_controls(ui: &mut egui::Ui, selection: &PlaybackSelection, title: &str, actions: &mut Vec<Action>) {
    if selection.is_empty() {
        placeholder(ui, "No video available");
        return;
    }
    let Some(current) = selection.current() else {
        return;
    };

    egui::Frame::group(ui.style())
        .inner_margin(egui::Margin::same(16))
        .show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.horizontal(|ui| {
                let play = egui::Button::new(
                    egui::RichText::new(format!("▶ Play {}", current.quality)).strong().color(egui::Color32::WHITE),
                )
                .fill(ACCENT);
                if ui.add(play).clicked() {
                    actions.push(Action::Play {
                        title: format!("{} ({})", title, current.quality),
                        url: current.video_url.clone(),
                    });
                }
                if let Some(size) = &current.file_size {
                    ui.label(egui::RichText::new(size).weak());
                }
            });

            if selection.variants().len() > 1 {
                ui.add_space(8.0);
                ui.label("Quality:");
                ui.horizontal_wrapped(|ui| {
                    for variant in selection.variants() {
                        let text = match &variant.file_size {
                            Some(size) => format!("{} ({})", variant.quality, size),
                            None => variant.quality.clone(),
                        };
                        let selected = selection.selected_quality() == Some(variant.quality.as_str());
                        if ui.selectable_label(selected, text).clicked() && !selected {
                            actions.push(Action::SelectQuality(variant.quality.clone()));
                        }
                    }
                });
            }
        });
}

fn placeholder(ui: &mut egui::Ui, text: &str) {
    egui::Frame::group(ui.style())
        .inner_margin(egui::Margin::same(40))
        .show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.vertical_centered(|ui| {
                ui.label(egui::RichText::new(text).weak().size(18.0));
            });
        });
}

fn not_found(ui: &mut egui::Ui, text: &str, back: View, actions: &mut Vec<Action>) {
    ui.vertical_centered(|ui| {
        ui.add_space(80.0);
        ui.heading(text);
        ui.add_space(12.0);
        if ui.button("← Go back").clicked() {
            actions.push(Action::Navigate(back, None));
        }
    });
}

fn genres_line(ui: &mut egui::Ui, genres: &[String]) {
    ui.horizontal_wrapped(|ui| {
        for genre in genres {
            egui::Frame::new()
                .fill(ui.visuals().faint_bg_color)
                .corner_radius(10)
                .inner_margin(egui::Margin::symmetric(8, 2))
                .show(ui, |ui| {
                    ui.label(egui::RichText::new(genre).small());
                });
        }
    });
}

// === Views ===

impl CatalogApp {
    fn show_header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                let logo = egui::RichText::new(format!("🎬 {}", APP_NAME)).strong().size(20.0).color(ACCENT);
                if ui.add(egui::Label::new(logo).sense(egui::Sense::click())).clicked() {
                    self.navigate(View::Home, None);
                }
                ui.separator();

                let signed_in = self.session_state.is_signed_in();
                let current = self.navigator.current();
                for (view, label) in [
                    (View::Home, "Home"),
                    (View::Movies, "Movies"),
                    (View::Series, "TV Series"),
                    (View::Admin, "Admin"),
                ] {
                    if view.requires_session() && !signed_in {
                        continue;
                    }
                    if ui.selectable_label(current == view, label).clicked() {
                        self.navigate(view, None);
                    }
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("⚙").on_hover_text("Settings").clicked() {
                        self.settings_draft = self.config.clone();
                        self.show_settings = true;
                    }

                    match &self.session_state {
                        SessionState::SignedIn(principal) => {
                            let email = principal.email.clone();
                            if ui.button("🚪 Logout").on_hover_text(email).clicked() {
                                self.sign_out();
                            }
                        }
                        SessionState::SignedOut => {
                            if ui.button("🔑 Login").clicked() {
                                self.navigate(View::Login, None);
                            }
                        }
                        SessionState::Loading => {
                            ui.spinner();
                        }
                    }

                    if ui.button("🔍").clicked() {
                        self.navigator.search(&self.search_input);
                    }
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut self.search_input)
                            .hint_text("Search movies & series...")
                            .desired_width(220.0),
                    );
                    if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        self.navigator.search(&self.search_input);
                    }
                });
            });
            ui.add_space(6.0);
        });
    }

    fn show_footer(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("footer").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.busy() {
                    ui.spinner();
                }
                ui.label(&self.status_message);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("🖥 Console").clicked() {
                        self.show_console = !self.show_console;
                    }
                    ui.label(
                        egui::RichText::new(format!("© {} {}. All rights reserved.", current_year(), APP_NAME))
                            .small()
                            .weak(),
                    );
                });
            });
        });
    }

    fn show_view(&mut self, ui: &mut egui::Ui, view: View) {
        let mut actions = Vec::new();
        match view {
            View::Home => self.show_home(ui, &mut actions),
            View::Movies => self.show_movies(ui, &mut actions),
            View::Series => self.show_series(ui, &mut actions),
            View::WatchMovie => self.show_watch_movie(ui, &mut actions),
            View::WatchSeries => self.show_watch_series(ui, &mut actions),
            View::Login => self.show_login(ui, &mut actions),
            View::Admin => self.show_admin(ui),
        }
        self.run_actions(actions);
    }

    fn show_home(&mut self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        let Some(home) = loaded_or_status(ui, &self.home, "home page") else {
            return;
        };

        if let Some(movie) = &home.featured_movie {
            egui::Frame::new()
                .fill(egui::Color32::from_rgb(40, 10, 10))
                .corner_radius(8)
                .inner_margin(egui::Margin::same(24))
                .show(ui, |ui| {
                    ui.set_min_width(ui.available_width());
                    ui.label(egui::RichText::new("FEATURED").small().strong().color(ACCENT));
                    ui.label(egui::RichText::new(&movie.title).size(32.0).strong().color(egui::Color32::WHITE));
                    ui.label(egui::RichText::new(movie_subtitle(movie)).color(egui::Color32::LIGHT_GRAY));
                    if let Some(description) = &movie.description {
                        ui.add_space(6.0);
                        ui.add(egui::Label::new(egui::RichText::new(description).color(egui::Color32::LIGHT_GRAY)).wrap());
                    }
                    ui.add_space(12.0);
                    let watch = egui::Button::new(egui::RichText::new("▶ Watch Now").strong().color(egui::Color32::WHITE)).fill(ACCENT);
                    if ui.add(watch).clicked() {
                        actions.push(Action::Navigate(View::WatchMovie, Some(movie.slug.clone())));
                    }
                });
            ui.add_space(16.0);
        }

        ui.horizontal(|ui| {
            ui.heading("Latest Movies");
            if ui.link("View all →").clicked() {
                actions.push(Action::Navigate(View::Movies, None));
            }
        });
        if home.latest_movies.is_empty() {
            ui.label(egui::RichText::new("No movies yet").weak());
        }
        let latest: Vec<&Movie> = home.latest_movies.iter().collect();
        if let Some(i) = grid(ui, &latest, |ui, m| title_card(ui, &m.title, &movie_subtitle(m), &m.genre)) {
            actions.push(Action::Navigate(View::WatchMovie, Some(latest[i].slug.clone())));
        }

        ui.add_space(16.0);
        ui.horizontal(|ui| {
            ui.heading("Featured Series");
            if ui.link("View all →").clicked() {
                actions.push(Action::Navigate(View::Series, None));
            }
        });
        if home.featured_series.is_empty() {
            ui.label(egui::RichText::new("No featured series").weak());
        }
        let featured: Vec<&Series> = home.featured_series.iter().collect();
        if let Some(i) = grid(ui, &featured, |ui, s| title_card(ui, &s.title, &series_subtitle(s), &s.genre)) {
            actions.push(Action::Navigate(View::WatchSeries, Some(featured[i].slug.clone())));
        }
    }

    /// Shared body of the movie and series list views.
    /// Returns whether the search was cleared and the clicked item's slug.
    fn show_catalog<T: CatalogItem>(
        ui: &mut egui::Ui,
        heading: &str,
        source: &Loadable<Vec<T>>,
        query: &str,
        genre: &mut GenreFilter,
        mut card: impl FnMut(&mut egui::Ui, &T) -> bool,
    ) -> (bool, Option<String>) {
        ui.heading(heading);
        if let Loadable::Loaded(items) = source {
            genre_chips(ui, &collect_genres(items), genre);
        }
        let mut cleared = false;
        if !query.is_empty() {
            ui.horizontal(|ui| {
                ui.label(format!("Results for \"{}\"", query));
                cleared = ui.small_button("✖ Clear").clicked();
            });
        }
        ui.add_space(8.0);

        let filtered = CatalogFilter::new(query, genre.clone()).apply_loaded(source);
        let Some(items) = loaded_or_status(ui, &filtered, heading) else {
            return (cleared, None);
        };
        if items.is_empty() {
            ui.label(egui::RichText::new("No results found").weak());
            return (cleared, None);
        }
        let clicked = grid(ui, items, |ui, item| card(ui, item));
        (cleared, clicked.map(|i| items[i].slug().to_string()))
    }

    fn show_movies(&mut self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        let query = self.navigator.query().to_string();
        let (cleared, clicked) = Self::show_catalog(ui, "Movies", &self.movies, &query, &mut self.movie_genre, |ui, m: &Movie| {
            title_card(ui, &m.title, &movie_subtitle(m), &m.genre)
        });
        if cleared {
            self.clear_search();
        }
        if let Some(slug) = clicked {
            actions.push(Action::Navigate(View::WatchMovie, Some(slug)));
        }
    }

    fn show_series(&mut self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        let query = self.navigator.query().to_string();
        let (cleared, clicked) = Self::show_catalog(ui, "TV Series", &self.series, &query, &mut self.series_genre, |ui, s: &Series| {
            title_card(ui, &s.title, &series_subtitle(s), &s.genre)
        });
        if cleared {
            self.clear_search();
        }
        if let Some(slug) = clicked {
            actions.push(Action::Navigate(View::WatchSeries, Some(slug)));
        }
    }

    fn clear_search(&mut self) {
        self.search_input.clear();
        self.navigator.search("");
    }

    fn show_watch_movie(&mut self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        let Some(page) = loaded_or_status(ui, &self.movie_page, "movie") else {
            return;
        };
        let Some(page) = page else {
            not_found(ui, "Movie not found", View::Movies, actions);
            return;
        };
        let movie = &page.movie;

        if ui.link("← Back to movies").clicked() {
            actions.push(Action::Navigate(View::Movies, None));
        }
        ui.add_space(8.0);
        player_controls(ui, &self.movie_playback, &movie.title, actions);

        ui.add_space(16.0);
        ui.heading(&movie.title);
        ui.label(egui::RichText::new(movie_subtitle(movie)).weak());
        genres_line(ui, &movie.genre);
        if let Some(description) = &movie.description {
            ui.add_space(8.0);
            ui.add(egui::Label::new(description.as_str()).wrap());
        }

        if let Some(trailer) = movie.trailer_url.as_deref().filter(|t| !t.trim().is_empty()) {
            ui.add_space(16.0);
            ui.label(egui::RichText::new("Trailer").strong());
            if ui.button("▶ Play trailer").clicked() {
                actions.push(Action::Play {
                    title: format!("{} (Trailer)", movie.title),
                    url: trailer.to_string(),
                });
            }
        }
    }

    fn show_watch_series(&mut self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        let Some(page) = loaded_or_status(ui, &self.series_page, "series") else {
            return;
        };
        let Some(page) = page else {
            not_found(ui, "Series not found", View::Series, actions);
            return;
        };
        let series = &page.series;

        if ui.link("← Back to series").clicked() {
            actions.push(Action::Navigate(View::Series, None));
        }
        ui.add_space(8.0);

        match self.episodes.selected_episode() {
            None => placeholder(ui, "Select an episode to watch"),
            Some(episode) => {
                ui.label(egui::RichText::new(episode.label()).strong());
                if let Some(selection) = loaded_or_status(ui, &self.episode_playback, "episode videos") {
                    player_controls(ui, selection, &format!("{} {}", series.title, episode.label()), actions);
                }
            }
        }

        ui.add_space(16.0);
        ui.heading(&series.title);
        ui.label(egui::RichText::new(series_subtitle(series)).weak());
        genres_line(ui, &series.genre);
        if let Some(description) = &series.description {
            ui.add_space(8.0);
            ui.add(egui::Label::new(description.as_str()).wrap());
        }

        ui.add_space(16.0);
        if self.episodes.is_empty() {
            ui.label(egui::RichText::new("No episodes yet").weak());
            return;
        }

        ui.horizontal_wrapped(|ui| {
            ui.label("Season:");
            for season in self.episodes.seasons() {
                let selected = self.episodes.selected_season() == Some(season);
                if ui.selectable_label(selected, format!("Season {}", season)).clicked() {
                    actions.push(Action::SelectSeason(season));
                }
            }
        });
        ui.separator();

        let playing = self.episodes.selected_episode().map(|e| e.id.clone());
        for episode in self.episodes.season_episodes() {
            let selected = playing.as_deref() == Some(episode.id.as_str());
            let mut text = format!("{}. {}", episode.episode_number, episode.title);
            if let Some(minutes) = episode.duration {
                text.push_str(&format!("  ({} min)", minutes));
            }
            if ui.selectable_label(selected, text).clicked() {
                actions.push(Action::SelectEpisode(episode.id.clone()));
            }
        }
    }

    fn show_login(&mut self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        ui.vertical_centered(|ui| {
            ui.add_space(80.0);
            ui.label(egui::RichText::new(format!("🎬 {}", APP_NAME)).size(28.0).strong().color(ACCENT));
            ui.add_space(8.0);
            ui.heading(if self.login_signup { "Create Account" } else { "Admin Login" });
            ui.add_space(20.0);

            egui::Frame::group(ui.style())
                .inner_margin(egui::Margin::same(20))
                .show(ui, |ui| {
                    ui.set_width(320.0);
                    ui.label("Email");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.login_email)
                            .hint_text("admin@example.com")
                            .desired_width(f32::INFINITY),
                    );
                    ui.add_space(6.0);
                    ui.label("Password");
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut self.login_password)
                            .password(true)
                            .desired_width(f32::INFINITY),
                    );
                    let enter = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

                    if let Some(error) = &self.login_error {
                        ui.add_space(6.0);
                        ui.colored_label(ACCENT, error);
                    }
                    if let Some(notice) = &self.login_notice {
                        ui.add_space(6.0);
                        ui.colored_label(egui::Color32::LIGHT_GREEN, notice);
                    }

                    ui.add_space(10.0);
                    let label = match (self.auth_pending, self.login_signup) {
                        (true, _) => "Please wait...",
                        (false, true) => "Sign Up",
                        (false, false) => "Sign In",
                    };
                    let submit = ui.add_enabled(
                        !self.auth_pending,
                        egui::Button::new(egui::RichText::new(label).strong()).min_size(egui::vec2(ui.available_width(), 28.0)),
                    );
                    if (submit.clicked() || enter) && !self.auth_pending {
                        self.submit_login();
                    }

                    ui.add_space(6.0);
                    let toggle = if self.login_signup {
                        "Already have an account? Sign in"
                    } else {
                        "Don't have an account? Sign up"
                    };
                    if ui.link(toggle).clicked() {
                        self.login_signup = !self.login_signup;
                        self.login_error = None;
                        self.login_notice = None;
                    }
                });

            ui.add_space(12.0);
            if ui.link("← Back to home").clicked() {
                actions.push(Action::Navigate(View::Home, None));
            }
        });
    }

    fn show_admin(&mut self, ui: &mut egui::Ui) {
        ui.heading("Admin Dashboard");
        ui.label(egui::RichText::new("Manage your content").weak());
        ui.add_space(8.0);

        let unread = self.admin_notifications.as_loaded().map(|n| unread_count(n)).unwrap_or(0);
        let notifications_label = if unread > 0 {
            format!("🔔 Notifications ({})", unread)
        } else {
            "🔔 Notifications".to_string()
        };

        let previous = self.admin_tab;
        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.admin_tab, AdminTab::Movies, "🎬 Movies");
            ui.selectable_value(&mut self.admin_tab, AdminTab::Series, "📺 Series");
            ui.selectable_value(&mut self.admin_tab, AdminTab::Notifications, notifications_label);
        });
        if self.admin_tab != previous {
            self.load_admin_tab();
        }
        ui.separator();

        match self.admin_tab {
            AdminTab::Movies => self.show_admin_movies(ui),
            AdminTab::Series => self.show_admin_series(ui),
            AdminTab::Notifications => self.show_admin_notifications(ui),
        }
    }

    fn show_admin_movies(&mut self, ui: &mut egui::Ui) {
        if ui.button("➕ Add Movie").clicked() {
            self.movie_form = Some(MovieForm::add(current_year()));
        }
        ui.add_space(8.0);

        let Some(movies) = loaded_or_status(ui, &self.admin_movies, "movies") else {
            return;
        };
        if movies.is_empty() {
            ui.label(egui::RichText::new("No movies yet").weak());
        }

        let mut edit = None;
        let mut delete = None;
        for movie in movies {
            egui::Frame::group(ui.style()).show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ui.horizontal(|ui| {
                    ui.vertical(|ui| {
                        ui.horizontal(|ui| {
                            ui.label(egui::RichText::new(&movie.title).strong());
                            if movie.featured {
                                ui.label(egui::RichText::new("★ Featured").small().color(ACCENT));
                            }
                        });
                        ui.label(egui::RichText::new(format!("{} • {}", movie_subtitle(movie), movie.genre.join(", "))).small().weak());
                    });
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("🗑 Delete").clicked() {
                            delete = Some(PendingDelete::Movie {
                                id: movie.id.clone(),
                                title: movie.title.clone(),
                            });
                        }
                        if ui.button("✏ Edit").clicked() {
                            edit = Some(MovieForm::edit(movie));
                        }
                    });
                });
            });
        }

        if edit.is_some() {
            self.movie_form = edit;
        }
        if delete.is_some() {
            self.pending_delete = delete;
        }
    }

    fn show_admin_series(&mut self, ui: &mut egui::Ui) {
        if ui.button("➕ Add Series").clicked() {
            self.series_form = Some(SeriesForm::add(current_year()));
        }
        ui.add_space(8.0);

        let Some(series_list) = loaded_or_status(ui, &self.admin_series, "series") else {
            return;
        };
        if series_list.is_empty() {
            ui.label(egui::RichText::new("No series yet").weak());
        }

        let mut edit = None;
        let mut delete = None;
        for series in series_list {
            egui::Frame::group(ui.style()).show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ui.horizontal(|ui| {
                    ui.vertical(|ui| {
                        ui.label(egui::RichText::new(&series.title).strong());
                        ui.label(
                            egui::RichText::new(format!("{} • {} • {}", series.release_year, series.status, series.genre.join(", ")))
                                .small()
                                .weak(),
                        );
                    });
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("🗑 Delete").clicked() {
                            delete = Some(PendingDelete::Series {
                                id: series.id.clone(),
                                title: series.title.clone(),
                            });
                        }
                        if ui.button("✏ Edit").clicked() {
                            edit = Some(SeriesForm::edit(series));
                        }
                    });
                });
            });
        }

        if edit.is_some() {
            self.series_form = edit;
        }
        if delete.is_some() {
            self.pending_delete = delete;
        }
    }

    fn show_admin_notifications(&mut self, ui: &mut egui::Ui) {
        let Some(notifications) = loaded_or_status(ui, &self.admin_notifications, "notifications") else {
            return;
        };
        if notifications.is_empty() {
            ui.label(egui::RichText::new("No notifications").weak());
        }

        let mut mark_read = None;
        for n in notifications {
            egui::Frame::group(ui.style()).show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ui.horizontal(|ui| {
                    ui.vertical(|ui| {
                        let title = egui::RichText::new(&n.title).strong();
                        ui.label(if n.is_read { title.weak() } else { title });
                        if !n.message.is_empty() {
                            ui.label(&n.message);
                        }
                        if let Some(created) = n.created_at {
                            let local = created.with_timezone(&chrono::Local);
                            ui.label(egui::RichText::new(local.format("%Y-%m-%d %H:%M").to_string()).small().weak());
                        }
                    });
                    if !n.is_read {
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("✔ Mark as read").clicked() {
                                mark_read = Some(n.id.clone());
                            }
                        });
                    }
                });
            });
        }

        if let Some(id) = mark_read {
            self.spawn_admin(false, move |admin| {
                admin
                    .mark_notification_read(&id)
                    .map(AdminList::Notifications)
                    .map_err(|e| e.to_string())
            });
        }
    }

    // === Dialogs ===

    fn show_movie_form(&mut self, ctx: &egui::Context) {
        let Some(mut form) = self.movie_form.take() else {
            return;
        };
        let year = current_year();
        let mut close = false;
        let mut save = false;

        egui::Window::new(if form.is_edit() { "Edit Movie" } else { "Add New Movie" })
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                egui::Grid::new("movie_form").num_columns(2).spacing([12.0, 6.0]).show(ui, |ui| {
                    let draft = &mut form.draft;
                    ui.label("Title *");
                    ui.text_edit_singleline(&mut draft.title);
                    ui.end_row();

                    ui.label("Slug *");
                    ui.horizontal(|ui| {
                        ui.text_edit_singleline(&mut draft.slug);
                        if ui.small_button("Generate").clicked() {
                            draft.slug = admin::slugify(&draft.title);
                        }
                    });
                    ui.end_row();

                    ui.label("Description");
                    ui.text_edit_multiline(&mut draft.description);
                    ui.end_row();

                    ui.label("Poster URL");
                    ui.text_edit_singleline(&mut draft.poster_url);
                    ui.end_row();

                    ui.label("Trailer URL");
                    ui.text_edit_singleline(&mut draft.trailer_url);
                    ui.end_row();

                    ui.label("Release year");
                    ui.add(egui::DragValue::new(&mut draft.release_year).range(admin::FIRST_RELEASE_YEAR..=year + 10).clamp_existing_to_range(false));
                    ui.end_row();

                    ui.label("Duration (min)");
                    ui.add(egui::DragValue::new(&mut draft.duration).range(0..=1000).clamp_existing_to_range(false));
                    ui.end_row();

                    ui.label("Rating");
                    ui.add(egui::DragValue::new(&mut draft.rating).speed(0.1).range(0.0..=admin::MAX_RATING).clamp_existing_to_range(false));
                    ui.end_row();

                    ui.label("Genres");
                    ui.add(egui::TextEdit::singleline(&mut form.genre_text).hint_text("Action, Drama"));
                    ui.end_row();

                    let draft = &mut form.draft;
                    ui.label("Meta title");
                    ui.text_edit_singleline(&mut draft.meta_title);
                    ui.end_row();

                    ui.label("Meta description");
                    ui.text_edit_multiline(&mut draft.meta_description);
                    ui.end_row();

                    ui.label("Meta keywords");
                    ui.add(egui::TextEdit::singleline(&mut form.keywords_text).hint_text("comma, separated"));
                    ui.end_row();

                    ui.label("");
                    ui.checkbox(&mut form.draft.featured, "Featured");
                    ui.end_row();
                });

                if let Some(error) = &form.error {
                    ui.colored_label(ACCENT, error);
                }
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Cancel").clicked() {
                        close = true;
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.add_enabled(!self.admin_saving, egui::Button::new("💾 Save")).clicked() {
                            save = true;
                        }
                    });
                });
            });

        if save {
            form.sync_lists();
            match admin::Draft::validate(&form.draft, year) {
                Err(e) => form.error = Some(e.to_string()),
                Ok(()) => {
                    form.error = None;
                    let id = form.editing_id.clone();
                    let draft = form.draft.clone();
                    self.spawn_admin(true, move |admin| {
                        admin
                            .save_movie(id.as_deref(), &draft, year)
                            .map(AdminList::Movies)
                            .map_err(|e| e.to_string())
                    });
                }
            }
        }
        if !close {
            self.movie_form = Some(form);
        }
    }

    fn show_series_form(&mut self, ctx: &egui::Context) {
        let Some(mut form) = self.series_form.take() else {
            return;
        };
        let year = current_year();
        let mut close = false;
        let mut save = false;

        egui::Window::new(if form.is_edit() { "Edit Series" } else { "Add New Series" })
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                egui::Grid::new("series_form").num_columns(2).spacing([12.0, 6.0]).show(ui, |ui| {
                    let draft = &mut form.draft;
                    ui.label("Title *");
                    ui.text_edit_singleline(&mut draft.title);
                    ui.end_row();

                    ui.label("Slug *");
                    ui.horizontal(|ui| {
                        ui.text_edit_singleline(&mut draft.slug);
                        if ui.small_button("Generate").clicked() {
                            draft.slug = admin::slugify(&draft.title);
                        }
                    });
                    ui.end_row();

                    ui.label("Description");
                    ui.text_edit_multiline(&mut draft.description);
                    ui.end_row();

                    ui.label("Poster URL");
                    ui.text_edit_singleline(&mut draft.poster_url);
                    ui.end_row();

                    ui.label("Release year");
                    ui.add(egui::DragValue::new(&mut draft.release_year).range(admin::FIRST_RELEASE_YEAR..=year + 10).clamp_existing_to_range(false));
                    ui.end_row();

                    ui.label("Rating");
                    ui.add(egui::DragValue::new(&mut draft.rating).speed(0.1).range(0.0..=admin::MAX_RATING).clamp_existing_to_range(false));
                    ui.end_row();

                    ui.label("Status");
                    egui::ComboBox::from_id_salt("series_status")
                        .selected_text(draft.status.to_string())
                        .show_ui(ui, |ui| {
                            for status in SeriesStatus::ALL {
                                let label = status.to_string();
                                ui.selectable_value(&mut draft.status, status, label);
                            }
                        });
                    ui.end_row();

                    ui.label("Genres");
                    ui.add(egui::TextEdit::singleline(&mut form.genre_text).hint_text("Drama, Mystery"));
                    ui.end_row();

                    let draft = &mut form.draft;
                    ui.label("Meta title");
                    ui.text_edit_singleline(&mut draft.meta_title);
                    ui.end_row();

                    ui.label("Meta description");
                    ui.text_edit_multiline(&mut draft.meta_description);
                    ui.end_row();

                    ui.label("Meta keywords");
                    ui.add(egui::TextEdit::singleline(&mut form.keywords_text).hint_text("comma, separated"));
                    ui.end_row();

                    ui.label("");
                    ui.checkbox(&mut form.draft.featured, "Featured");
                    ui.end_row();
                });

                if let Some(error) = &form.error {
                    ui.colored_label(ACCENT, error);
                }
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Cancel").clicked() {
                        close = true;
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.add_enabled(!self.admin_saving, egui::Button::new("💾 Save")).clicked() {
                            save = true;
                        }
                    });
                });
            });

        if save {
            form.sync_lists();
            match admin::Draft::validate(&form.draft, year) {
                Err(e) => form.error = Some(e.to_string()),
                Ok(()) => {
                    form.error = None;
                    let id = form.editing_id.clone();
                    let draft = form.draft.clone();
                    self.spawn_admin(true, move |admin| {
                        admin
                            .save_series(id.as_deref(), &draft, year)
                            .map(AdminList::Series)
                            .map_err(|e| e.to_string())
                    });
                }
            }
        }
        if !close {
            self.series_form = Some(form);
        }
    }

    fn show_delete_confirm(&mut self, ctx: &egui::Context) {
        let Some(pending) = self.pending_delete.clone() else {
            return;
        };
        let (kind, title) = match &pending {
            PendingDelete::Movie { title, .. } => ("movie", title.as_str()),
            PendingDelete::Series { title, .. } => ("series", title.as_str()),
        };

        let mut confirmed = false;
        let mut cancelled = false;
        egui::Window::new("⚠ Confirm Delete")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.add_space(6.0);
                ui.label(egui::RichText::new(format!("Are you sure you want to delete this {}?", kind)).strong());
                ui.label(title);
                ui.add_space(10.0);
                ui.horizontal(|ui| {
                    cancelled = ui.button("Cancel").clicked();
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        confirmed = ui.button(egui::RichText::new("Delete").color(ACCENT)).clicked();
                    });
                });
            });

        if confirmed {
            self.pending_delete = None;
            match pending {
                PendingDelete::Movie { id, .. } => self.spawn_admin(false, move |admin| {
                    admin.delete_movie(&id).map(AdminList::Movies).map_err(|e| e.to_string())
                }),
                PendingDelete::Series { id, .. } => self.spawn_admin(false, move |admin| {
                    admin.delete_series(&id).map(AdminList::Series).map_err(|e| e.to_string())
                }),
            }
        } else if cancelled {
            self.pending_delete = None;
        }
    }

    fn show_settings_dialog(&mut self, ctx: &egui::Context) {
        if !self.show_settings {
            return;
        }
        let mut close = false;
        let mut save = false;

        egui::Window::new("⚙ Settings")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                let draft = &mut self.settings_draft;
                egui::Grid::new("settings").num_columns(2).spacing([12.0, 6.0]).show(ui, |ui| {
                    ui.label("Supabase URL");
                    ui.add(egui::TextEdit::singleline(&mut draft.supabase_url).hint_text("https://xyz.supabase.co").desired_width(300.0));
                    ui.end_row();

                    ui.label("Anon key");
                    ui.add(egui::TextEdit::singleline(&mut draft.supabase_anon_key).password(true).desired_width(300.0));
                    ui.end_row();

                    ui.label("🎬 Player");
                    ui.horizontal(|ui| {
                        ui.add(egui::TextEdit::singleline(&mut draft.external_player).hint_text("mpv, vlc, ffplay...").desired_width(260.0))
                            .on_hover_text("Media player command or path.\nLeave empty for ffplay (default)");
                        if ui.button("📁").on_hover_text("Browse for player executable").clicked() {
                            if let Some(path) = rfd::FileDialog::new().set_title("Select Media Player").pick_file() {
                                draft.external_player = path.display().to_string();
                            }
                        }
                    });
                    ui.end_row();

                    ui.label("");
                    ui.checkbox(&mut draft.single_window_mode, "Single Window")
                        .on_hover_text("Close previous player when opening a new video");
                    ui.end_row();

                    ui.label("");
                    ui.checkbox(&mut draft.dark_mode, "🌙 Dark mode");
                    ui.end_row();

                    ui.label("Font size");
                    ui.add(egui::Slider::new(&mut draft.font_size, 10..=24));
                    ui.end_row();
                });

                ui.add_space(10.0);
                ui.horizontal(|ui| {
                    close = ui.button("Cancel").clicked();
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        save = ui.button("💾 Save").clicked();
                    });
                });
            });

        if save {
            self.save_settings();
            self.show_settings = false;
        } else if close {
            self.show_settings = false;
        }
    }

    fn show_console_window(&mut self, ctx: &egui::Context) {
        if !self.show_console {
            return;
        }
        let mut open = true;
        egui::Window::new("🖥 Console")
            .open(&mut open)
            .default_size([720.0, 360.0])
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(format!("{} lines", self.console.len()));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("🗑 Clear").clicked() {
                            self.console.clear();
                        }
                    });
                });
                ui.separator();

                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for line in self.console.snapshot() {
                            let color = if line.contains("[ERROR]") {
                                egui::Color32::RED
                            } else if line.contains("[WARN]") {
                                egui::Color32::YELLOW
                            } else if line.contains("[INFO]") {
                                egui::Color32::LIGHT_BLUE
                            } else {
                                egui::Color32::GRAY
                            };
                            ui.label(egui::RichText::new(line).monospace().color(color));
                        }
                    });
            });
        self.show_console = open;
    }
}

impl eframe::App for CatalogApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_results();
        self.check_session_expiry();

        let view = self.navigator.resolve(&self.session_state);
        if self.loaded_generation != Some(self.navigator.generation()) {
            self.loaded_generation = Some(self.navigator.generation());
            self.load_view(view);
        }

        if self.window_title != view.window_title() {
            self.window_title = view.window_title();
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(self.window_title.to_string()));
        }

        if self.config.dark_mode {
            ctx.set_visuals(egui::Visuals::dark());
        } else {
            ctx.set_visuals(egui::Visuals::light());
        }

        if view.shows_chrome() {
            self.show_header(ctx);
            self.show_footer(ctx);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            let mut scroll = egui::ScrollArea::vertical()
                .id_salt("content")
                .auto_shrink([false, false]);
            if self.navigator.take_scroll_reset() {
                scroll = scroll.vertical_scroll_offset(0.0);
            }
            scroll.show(ui, |ui| {
                ui.add_space(8.0);
                self.show_view(ui, view);
                ui.add_space(16.0);
            });
        });

        self.show_movie_form(ctx);
        self.show_series_form(ctx);
        self.show_delete_confirm(ctx);
        self.show_settings_dialog(ctx);
        self.show_console_window(ctx);

        // Keep ticking so session expiry is noticed while idle
        ctx.request_repaint_after(Duration::from_secs(EXPIRY_CHECK_SECS as u64));
    }
}
