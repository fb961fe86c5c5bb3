//! Application keys and typed helpers on top of the storage manager.

use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};

use super::{DEFAULT_VERSION, SetOptions, StorageArea, StorageManager};

/// Every key the application writes starts with this.
pub const STORAGE_PREFIX: &str = "beekon_";

const TOPICS_TTL: Duration = Duration::from_secs(10 * 60);
const LLM_PROVIDERS_TTL: Duration = Duration::from_secs(30 * 60);
const WEBSITE_METADATA_TTL: Duration = Duration::from_secs(15 * 60);

/// Logical storage keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    UserPreferences,
    DashboardFilters,
    AnalysisFilters,
    CompetitorsFilters,
    NavigationState,
    TopicsCache,
    LlmProvidersCache,
    WebsiteMetadataCache,
}

impl StorageKey {
    pub const ALL: [StorageKey; 8] = [
        StorageKey::UserPreferences,
        StorageKey::DashboardFilters,
        StorageKey::AnalysisFilters,
        StorageKey::CompetitorsFilters,
        StorageKey::NavigationState,
        StorageKey::TopicsCache,
        StorageKey::LlmProvidersCache,
        StorageKey::WebsiteMetadataCache,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StorageKey::UserPreferences => "beekon_user_preferences",
            StorageKey::DashboardFilters => "beekon_dashboard_filters",
            StorageKey::AnalysisFilters => "beekon_analysis_filters",
            StorageKey::CompetitorsFilters => "beekon_competitors_filters",
            StorageKey::NavigationState => "beekon_navigation_state",
            StorageKey::TopicsCache => "beekon_topics_cache",
            StorageKey::LlmProvidersCache => "beekon_llm_providers_cache",
            StorageKey::WebsiteMetadataCache => "beekon_website_metadata_cache",
        }
    }

    /// Key scoped to a single website, e.g. `beekon_topics_cache_<id>`.
    pub fn scoped(self, website_id: &str) -> String {
        format!("{}_{website_id}", self.as_str())
    }
}

/// Pages that persist their own filter presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPage {
    Dashboard,
    Analysis,
    Competitors,
}

impl FilterPage {
    pub fn key(self) -> StorageKey {
        match self {
            FilterPage::Dashboard => StorageKey::DashboardFilters,
            FilterPage::Analysis => StorageKey::AnalysisFilters,
            FilterPage::Competitors => StorageKey::CompetitorsFilters,
        }
    }
}

/// Typed accessors used by the application.
///
/// Preferences and filters are durable. Navigation state and data caches
/// are session-scoped; data caches expire on their own.
#[derive(Debug, Clone, Copy)]
pub struct AppStorage<'a> {
    storage: &'a StorageManager,
}

impl<'a> AppStorage<'a> {
    pub fn new(storage: &'a StorageManager) -> Self {
        Self { storage }
    }

    pub fn save_preferences<T: Serialize>(&self, preferences: &T) -> bool {
        self.storage.set(
            StorageArea::Durable,
            StorageKey::UserPreferences.as_str(),
            preferences,
            SetOptions::default(),
        )
    }

    pub fn load_preferences<T: DeserializeOwned>(&self) -> Option<T> {
        self.storage
            .get(StorageArea::Durable, StorageKey::UserPreferences.as_str(), DEFAULT_VERSION)
    }

    pub fn save_filters<T: Serialize>(&self, page: FilterPage, filters: &T) -> bool {
        self.storage
            .set(StorageArea::Durable, page.key().as_str(), filters, SetOptions::default())
    }

    pub fn load_filters<T: DeserializeOwned>(&self, page: FilterPage) -> Option<T> {
        self.storage
            .get(StorageArea::Durable, page.key().as_str(), DEFAULT_VERSION)
    }

    pub fn save_navigation_state<T: Serialize>(&self, state: &T) -> bool {
        self.storage.set(
            StorageArea::Session,
            StorageKey::NavigationState.as_str(),
            state,
            SetOptions::default(),
        )
    }

    pub fn load_navigation_state<T: DeserializeOwned>(&self) -> Option<T> {
        self.storage
            .get(StorageArea::Session, StorageKey::NavigationState.as_str(), DEFAULT_VERSION)
    }

    pub fn cache_topics<T: Serialize>(&self, website_id: &str, topics: &T) -> bool {
        self.put_cached(StorageKey::TopicsCache, website_id, topics, TOPICS_TTL)
    }

    pub fn cached_topics<T: DeserializeOwned>(&self, website_id: &str) -> Option<T> {
        self.get_cached(StorageKey::TopicsCache, website_id)
    }

    pub fn cache_llm_providers<T: Serialize>(&self, website_id: &str, providers: &T) -> bool {
        self.put_cached(StorageKey::LlmProvidersCache, website_id, providers, LLM_PROVIDERS_TTL)
    }

    pub fn cached_llm_providers<T: DeserializeOwned>(&self, website_id: &str) -> Option<T> {
        self.get_cached(StorageKey::LlmProvidersCache, website_id)
    }

    pub fn cache_website_metadata<T: Serialize>(&self, website_id: &str, metadata: &T) -> bool {
        self.put_cached(StorageKey::WebsiteMetadataCache, website_id, metadata, WEBSITE_METADATA_TTL)
    }

    pub fn cached_website_metadata<T: DeserializeOwned>(&self, website_id: &str) -> Option<T> {
        self.get_cached(StorageKey::WebsiteMetadataCache, website_id)
    }

    /// Drop every application key from both areas.
    pub fn clear_on_logout(&self) -> bool {
        let durable = self.storage.clear(StorageArea::Durable, Some(STORAGE_PREFIX));
        let session = self.storage.clear(StorageArea::Session, Some(STORAGE_PREFIX));
        durable && session
    }

    fn put_cached<T: Serialize>(&self, key: StorageKey, website_id: &str, value: &T, ttl: Duration) -> bool {
        self.storage.set(
            StorageArea::Session,
            &key.scoped(website_id),
            value,
            SetOptions::default().expires_in(ttl),
        )
    }

    fn get_cached<T: DeserializeOwned>(&self, key: StorageKey, website_id: &str) -> Option<T> {
        self.storage
            .get(StorageArea::Session, &key.scoped(website_id), DEFAULT_VERSION)
    }
}
