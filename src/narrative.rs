//! Narrative panel state machine.
//!
//! The panel moves between [`PanelState`]s and hands every state it enters to
//! a [`PanelView`]. Loads are tagged with a generation number; a response that
//! arrives after a newer load (or a clear) is dropped instead of rendered.

use chrono::{DateTime, NaiveDate};
use log::{debug, error, info};
use std::cell::{Cell, RefCell};
#[cfg(test)]
use std::cell::Ref;

use crate::api::{ArticleSource, NarrativeRequest};
use crate::data::{Article, NO_COUNTRY};

pub const EXCERPT_MAX_CHARS: usize = 250;
pub const ELLIPSIS: &str = "...";

const DATE_FORMAT: &str = "%b %-d, %Y";

#[derive(Debug, Clone, PartialEq)]
pub enum PanelState {
    Empty,
    Loading,
    Populated(Vec<Article>),
    Error { message: String, retryable: bool },
}

pub trait PanelView {
    fn render(&self, state: &PanelState);
}

/// Render model for one article.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrativeCard {
    pub title: String,
    pub source: String,
    pub date: String,
    pub excerpt: String,
    pub url: String,
}

impl NarrativeCard {
    pub fn from_article(article: &Article) -> Self {
        let title = if article.title().trim().is_empty() {
            "Untitled article".to_string()
        } else {
            article.title().trim().to_string()
        };
        let source = if article.source().trim().is_empty() {
            "Unknown source".to_string()
        } else {
            article.source().trim().to_string()
        };

        Self {
            title,
            source,
            date: format_date(article.published()),
            excerpt: truncate_excerpt(article.text()),
            url: article.url().to_string(),
        }
    }
}

pub fn truncate_excerpt(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= EXCERPT_MAX_CHARS {
        return text.to_string();
    }
    let mut excerpt: String = text.chars().take(EXCERPT_MAX_CHARS).collect();
    excerpt.push_str(ELLIPSIS);
    excerpt
}

pub fn format_date(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format(DATE_FORMAT).to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format(DATE_FORMAT).to_string();
    }
    raw.to_string()
}

pub fn no_articles_message(country_code: &str) -> String {
    format!("No articles found for {}", country_code)
}

pub fn load_failed_message(country_code: &str) -> String {
    format!(
        "Failed to load articles for {}. Please try again later.",
        country_code
    )
}

/// A load whose generation was claimed when it was started. Finishing it
/// after a newer load or a clear does nothing.
#[derive(Debug)]
pub struct PendingLoad {
    generation: u64,
    country_code: String,
}

pub struct NarrativePanel<S, V> {
    source: S,
    view: V,
    limit: u32,
    state: RefCell<PanelState>,
    generation: Cell<u64>,
}

impl<S: ArticleSource, V: PanelView> NarrativePanel<S, V> {
    pub fn new(source: S, view: V, limit: u32) -> Self {
        Self {
            source,
            view,
            limit,
            state: RefCell::new(PanelState::Empty),
            generation: Cell::new(0),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> Ref<'_, PanelState> {
        self.state.borrow()
    }

    #[cfg(test)]
    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn clear(&self) {
        self.next_generation();
        self.transition(PanelState::Empty);
    }

    pub async fn load(&self, country_code: &str) {
        if let Some(pending) = self.begin(country_code) {
            self.finish(pending).await;
        }
    }

    /// Claims a generation and shows the loading state right away.
    pub fn begin(&self, country_code: &str) -> Option<PendingLoad> {
        if country_code.is_empty() || country_code == NO_COUNTRY {
            debug!("Ignoring narrative load for {:?}", country_code);
            return None;
        }

        let generation = self.next_generation();
        self.transition(PanelState::Loading);
        Some(PendingLoad {
            generation,
            country_code: country_code.to_string(),
        })
    }

    pub async fn finish(&self, pending: PendingLoad) {
        let PendingLoad {
            generation,
            country_code,
        } = pending;

        if generation != self.generation.get() {
            debug!("Load for {} superseded before it started", country_code);
            return;
        }

        let request = NarrativeRequest {
            country_code,
            limit: self.limit,
        };
        let result = self.source.fetch_articles(&request).await;
        let country_code = request.country_code;

        if generation != self.generation.get() {
            info!("Discarding stale articles for {}", country_code);
            return;
        }

        let next = match result {
            Ok(articles) if articles.is_empty() => PanelState::Error {
                message: no_articles_message(&country_code),
                retryable: false,
            },
            Ok(articles) => {
                info!("Showing {} articles for {}", articles.len(), country_code);
                PanelState::Populated(articles)
            }
            Err(e) => {
                error!("Error fetching articles for {}: {}", country_code, e);
                PanelState::Error {
                    message: load_failed_message(&country_code),
                    retryable: true,
                }
            }
        };
        self.transition(next);
    }

    /// Asks the backend to rebuild its cache for `country_code`, then reloads
    /// it, unless the panel was reloaded or cleared in the meantime.
    pub async fn refresh(&self, country_code: &str) {
        let generation = self.generation.get();

        let countries = [country_code.to_string()];
        if let Err(e) = self.source.refresh_countries(&countries).await {
            error!("Cache refresh failed for {}: {}", country_code, e);
        }

        if generation != self.generation.get() {
            info!("Panel moved on from {}, not reloading", country_code);
            return;
        }
        self.load(country_code).await;
    }

    fn next_generation(&self) -> u64 {
        let generation = self.generation.get().wrapping_add(1);
        self.generation.set(generation);
        generation
    }

    fn transition(&self, next: PanelState) {
        self.state.replace(next);
        let state = self.state.borrow();
        self.view.render(&state);
    }
}
