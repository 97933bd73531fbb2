//! Azure Translator client

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{Translation, Translator};
use crate::{Error, Result};

const TRANSLATOR_URL: &str = "https://api.cognitive.microsofttranslator.com";
const API_VERSION: &str = "3.0";

#[derive(Serialize)]
struct TextItem<'a> {
    #[serde(rename = "Text")]
    text: &'a str,
}

#[derive(Deserialize)]
struct TranslateItem {
    #[serde(rename = "detectedLanguage")]
    detected_language: Option<DetectedLanguage>,
    #[serde(default)]
    translations: Vec<TranslatedText>,
}

#[derive(Deserialize)]
struct DetectedLanguage {
    language: String,
}

#[derive(Deserialize)]
struct TranslatedText {
    text: String,
    to: String,
}

#[derive(Deserialize)]
struct DetectItem {
    language: String,
}

/// Translator v3 REST client
pub struct AzureTranslator {
    client: reqwest::Client,
    key: SecretString,
    region: String,
    base_url: String,
}

impl AzureTranslator {
    /// Create a translator for a Cognitive Services resource
    #[must_use]
    pub fn new(key: SecretString, region: String) -> Self {
        Self::with_base_url(key, region, TRANSLATOR_URL.to_string())
    }

    /// Create a translator against a custom endpoint
    #[must_use]
    pub fn with_base_url(key: SecretString, region: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            key,
            region,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn translate_url(&self, targets: &[String]) -> String {
        let mut url = format!("{}/translate?api-version={API_VERSION}", self.base_url);
        for target in targets {
            url.push_str("&to=");
            url.push_str(&urlencoding::encode(target));
        }
        url
    }

    async fn post<T: for<'de> Deserialize<'de>>(&self, url: &str, text: &str) -> Result<T> {
        let response = self
            .client
            .post(url)
            .header("Ocp-Apim-Subscription-Key", self.key.expose_secret())
            .header("Ocp-Apim-Subscription-Region", &self.region)
            .json(&[TextItem { text }])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "translator API error");
            return Err(Error::Translation(format!("translator error {status}: {body}")));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl Translator for AzureTranslator {
    async fn translate(&self, text: &str, targets: &[String]) -> Result<Translation> {
        if targets.is_empty() {
            let url = format!("{}/detect?api-version={API_VERSION}", self.base_url);
            let items: Vec<DetectItem> = self.post(&url, text).await?;
            return Ok(Translation {
                detected_language: items.into_iter().next().map(|d| d.language),
                translations: indexmap::IndexMap::new(),
            });
        }

        let items: Vec<TranslateItem> = self.post(&self.translate_url(targets), text).await?;
        let item = items
            .into_iter()
            .next()
            .ok_or_else(|| Error::Translation("empty translator response".to_string()))?;

        let translation = Translation {
            detected_language: item.detected_language.map(|d| d.language),
            translations: item
                .translations
                .into_iter()
                .map(|t| (t.to, t.text))
                .collect(),
        };

        tracing::debug!(
            detected = ?translation.detected_language,
            targets = translation.translations.len(),
            "translation complete"
        );
        Ok(translation)
    }
}
