//! Variant ordering, quality/episode selection and the external player

use crate::models::{Episode, Variant};
use std::cmp::Ordering;
use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::thread;
use thiserror::Error;

/// Smallest bare number read as a resolution; anything lower is a codec
/// or channel count ("H.264", "5.1")
const MIN_BARE_RESOLUTION: u32 = 144;

/// Vertical resolution for a single label token ("1080P", "1080P60", "4K", "UHD").
/// The flag is false for bare numbers, which lose to explicit tokens.
fn token_rank(token: &str) -> Option<(bool, u32)> {
    let digits: String = token.chars().take_while(|c| c.is_ascii_digit()).collect();
    if !digits.is_empty() {
        let n: u32 = digits.parse().ok()?;
        let suffix = &token[digits.len()..];
        if suffix.is_empty() {
            return (n >= MIN_BARE_RESOLUTION).then_some((false, n));
        }

        // A frame-rate tail may follow: 1080P60, 720P50, 4K30
        let (unit, tail) = suffix.split_at(1);
        if !tail.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        return match (unit, n) {
            ("P" | "I", _) => Some((true, n)),
            ("K", 8) => Some((true, 4320)),
            ("K", 4) => Some((true, 2160)),
            ("K", 2) => Some((true, 1440)),
            _ => None,
        };
    }

    let rank = match token {
        "UHD" => 2160,
        "QHD" => 1440,
        "FHD" | "FULLHD" => 1080,
        "HD" => 720,
        "SD" => 480,
        _ => return None,
    };
    Some((true, rank))
}

/// Parse a free-text quality label into a vertical resolution, if it names one.
/// Takes the highest explicit token, falling back to the highest bare number.
pub fn quality_rank(label: &str) -> Option<u32> {
    let upper = label.trim().to_ascii_uppercase().replace("FULL HD", "FULLHD");
    let ranks: Vec<(bool, u32)> = upper
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .filter_map(token_rank)
        .collect();

    ranks
        .iter()
        .filter(|(explicit, _)| *explicit)
        .map(|&(_, rank)| rank)
        .max()
        .or_else(|| ranks.iter().map(|&(_, rank)| rank).max())
}

/// Best-first ordering: ranked labels by resolution, then unranked ones.
/// Ties fall back to descending lexical order.
pub fn compare_quality(a: &str, b: &str) -> Ordering {
    match (quality_rank(a), quality_rank(b)) {
        (Some(x), Some(y)) => y.cmp(&x).then_with(|| b.cmp(a)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.cmp(a),
    }
}

pub fn sort_variants(variants: &mut [Variant]) {
    variants.sort_by(|a, b| compare_quality(&a.quality, &b.quality));
}

/// Variants for one title or episode plus the one being played
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackSelection {
    variants: Vec<Variant>,
    selected: usize,
}

impl PlaybackSelection {
    pub fn new(mut variants: Vec<Variant>) -> Self {
        sort_variants(&mut variants);
        Self { variants, selected: 0 }
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn current(&self) -> Option<&Variant> {
        self.variants.get(self.selected)
    }

    pub fn selected_quality(&self) -> Option<&str> {
        self.current().map(|v| v.quality.as_str())
    }

    /// Switch source. Returns false if no variant carries that label.
    pub fn select_quality(&mut self, quality: &str) -> bool {
        match self.variants.iter().position(|v| v.quality == quality) {
            Some(index) => {
                self.selected = index;
                true
            }
            None => false,
        }
    }
}

/// Season and episode pickers for a series page
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EpisodeBrowser {
    episodes: Vec<Episode>,
    season: Option<i32>,
    episode_id: Option<String>,
}

impl EpisodeBrowser {
    pub fn new(mut episodes: Vec<Episode>) -> Self {
        episodes.sort_by_key(|e| (e.season_number, e.episode_number));
        let season = episodes.first().map(|e| e.season_number);
        let episode_id = episodes.first().map(|e| e.id.clone());
        Self { episodes, season, episode_id }
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    /// Distinct season numbers, ascending
    pub fn seasons(&self) -> Vec<i32> {
        let mut seasons: Vec<i32> = self.episodes.iter().map(|e| e.season_number).collect();
        seasons.dedup();
        seasons
    }

    pub fn selected_season(&self) -> Option<i32> {
        self.season
    }

    /// Only changes which episodes are listed; the playing episode stays
    pub fn select_season(&mut self, season: i32) {
        if self.episodes.iter().any(|e| e.season_number == season) {
            self.season = Some(season);
        }
    }

    pub fn season_episodes(&self) -> Vec<&Episode> {
        self.episodes
            .iter()
            .filter(|e| Some(e.season_number) == self.season)
            .collect()
    }

    /// Returns true when the selection changed and variants need loading
    pub fn select_episode(&mut self, id: &str) -> bool {
        if self.episode_id.as_deref() == Some(id) || !self.episodes.iter().any(|e| e.id == id) {
            return false;
        }
        self.episode_id = Some(id.to_string());
        true
    }

    /// Whether `id` is the episode currently selected for playback
    pub fn is_playing(&self, id: &str) -> bool {
        self.episode_id.as_deref() == Some(id)
    }

    pub fn selected_episode(&self) -> Option<&Episode> {
        let id = self.episode_id.as_deref()?;
        self.episodes.iter().find(|e| e.id == id)
    }
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("nothing to play")]
    NoSource,
    #[error("failed to launch player '{player}': {source}")]
    Launch {
        player: String,
        #[source]
        source: std::io::Error,
    },
}

/// What a running player reports back to the UI thread
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Output(String),
    Exited { title: String, code: Option<i32> },
}

const DEFAULT_PLAYER: &str = "ffplay";

/// Resolve well-known player names to their usual install paths on Windows
#[cfg(target_os = "windows")]
fn resolve_player(player: &str) -> String {
    let candidates: &[&str] = match player.to_lowercase().trim_end_matches(".exe") {
        "vlc" => &[
            r"C:\Program Files\VideoLAN\VLC\vlc.exe",
            r"C:\Program Files (x86)\VideoLAN\VLC\vlc.exe",
        ],
        "mpv" => &[r"C:\Program Files\mpv\mpv.exe", r"C:\mpv\mpv.exe"],
        "ffplay" => &[r"C:\ffmpeg\bin\ffplay.exe", r"C:\Program Files\ffmpeg\bin\ffplay.exe"],
        _ => &[],
    };
    candidates
        .iter()
        .find(|path| std::path::Path::new(path).exists())
        .map(|s| s.to_string())
        .unwrap_or_else(|| player.to_string())
}

#[cfg(not(target_os = "windows"))]
fn resolve_player(player: &str) -> String {
    player.to_string()
}

/// Command-line arguments for the player, keyed on its executable name
pub fn player_args(player: &str, title: &str, url: &str) -> Vec<String> {
    let lower = player.to_lowercase();
    let name = lower
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(&lower)
        .trim_end_matches(".exe");

    let mut args = Vec::new();
    match name {
        "mpv" => {
            args.push(format!("--force-media-title={}", title));
            args.push("--force-window=immediate".to_string());
        }
        "vlc" | "cvlc" => {
            args.push(format!("--meta-title={}", title));
            args.push("--play-and-exit".to_string());
        }
        "ffplay" => {
            args.push("-window_title".to_string());
            args.push(title.to_string());
            args.push("-autoexit".to_string());
        }
        _ => {}
    }
    args.push(url.to_string());
    args
}

/// Launches variant URLs in an external media player
pub struct PlayerLauncher {
    player: String,
    single_window: bool,
    current: Option<Child>,
}

impl PlayerLauncher {
    pub fn new(player: &str, single_window: bool) -> Self {
        Self {
            player: player.trim().to_string(),
            single_window,
            current: None,
        }
    }

    pub fn configure(&mut self, player: &str, single_window: bool) {
        self.player = player.trim().to_string();
        self.single_window = single_window;
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    fn executable(&self) -> String {
        if self.player.is_empty() {
            DEFAULT_PLAYER.to_string()
        } else {
            resolve_player(&self.player)
        }
    }

    /// Start the player on `url`. In single-window mode the previous
    /// player is killed first. Player stderr and a non-zero exit are
    /// reported through `notify` from background threads.
    pub fn launch<F>(&mut self, title: &str, url: &str, notify: F) -> Result<u32, PlaybackError>
    where
        F: Fn(PlayerEvent) + Send + Clone + 'static,
    {
        if url.trim().is_empty() {
            return Err(PlaybackError::NoSource);
        }
        if self.single_window {
            self.stop();
        }

        let player = self.executable();
        log::info!("Playing '{}' with {}", title, player);
        log::debug!("Source: {}", url);

        let mut cmd = Command::new(&player);
        cmd.args(player_args(&player, title, url));

        #[cfg(target_os = "windows")]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x08000000;
            if player.to_lowercase().contains("ffplay") {
                cmd.creation_flags(CREATE_NO_WINDOW);
            }
        }

        cmd.stderr(Stdio::piped());
        cmd.stdout(Stdio::null());

        let mut child = cmd.spawn().map_err(|source| PlaybackError::Launch {
            player: player.clone(),
            source,
        })?;
        let pid = child.id();
        log::info!("Player started (PID: {})", pid);

        if let Some(stderr) = child.stderr.take() {
            let notify = notify.clone();
            thread::spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    if !line.trim().is_empty() {
                        notify(PlayerEvent::Output(line));
                    }
                }
            });
        }

        if self.single_window {
            self.current = Some(child);
        } else {
            let title = title.to_string();
            thread::spawn(move || match child.wait() {
                Ok(status) if !status.success() => notify(PlayerEvent::Exited {
                    title,
                    code: status.code(),
                }),
                Ok(_) => {}
                Err(e) => log::error!("Failed to wait for player: {}", e),
            });
        }

        Ok(pid)
    }

    /// Kill the tracked player, if any
    pub fn stop(&mut self) {
        if let Some(mut child) = self.current.take() {
            log::info!("Closing previous player");
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for PlayerLauncher {
    fn drop(&mut self) {
        self.stop();
    }
}
