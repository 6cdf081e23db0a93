use serde::{Deserialize, Deserializer, Serialize};

pub const APP_ID: &str = "com.narrativemap.NarrativeMap";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TILE_URL: &str = "https://a.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}.png";
pub const DEFAULT_ARTICLE_LIMIT: u32 = 10;

/// Label shown while no country is selected.
pub const NO_COUNTRY: &str = "No Country";

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleMetadata {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub article_title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub site_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub date_published: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleContent {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub article_text: String,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Article {
    #[serde(default)]
    pub metadata: ArticleMetadata,
    #[serde(default)]
    pub content: ArticleContent,
}

impl Article {
    pub fn title(&self) -> &str {
        &self.metadata.article_title
    }

    pub fn source(&self) -> &str {
        &self.metadata.site_name
    }

    pub fn published(&self) -> &str {
        &self.metadata.date_published
    }

    pub fn text(&self) -> &str {
        &self.content.article_text
    }

    pub fn url(&self) -> &str {
        &self.metadata.url
    }
}

#[derive(Debug, Deserialize)]
pub struct ArticlesResponse {
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub articles: Vec<Article>,
}

#[derive(Debug, Serialize)]
pub struct RefreshCacheRequest<'a> {
    pub countries: &'a [String],
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
