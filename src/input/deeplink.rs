use crate::{constants::MARKER_LINK_PARAM, layers::marker::StableKey, MapError, Result};
use reqwest::Url;

/// Page address carrying the `marker` query parameter.
///
/// Read once at startup to find the marker to focus, then rewritten whenever
/// the focused marker changes so the address can be shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLink {
    url: Url,
}

impl DeepLink {
    pub fn parse(url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| MapError::InvalidConfig(format!("bad page address {}: {}", url, e)))?;
        Ok(Self { url })
    }

    /// Marker named by the link, if any
    pub fn marker(&self) -> Option<StableKey> {
        self.url
            .query_pairs()
            .find(|(name, value)| name == MARKER_LINK_PARAM && !value.is_empty())
            .map(|(_, value)| StableKey::new(value.into_owned()))
    }

    /// Sets or clears the marker parameter, leaving other parameters intact
    pub fn set_marker(&mut self, marker: Option<&StableKey>) {
        let kept: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(name, _)| name != MARKER_LINK_PARAM)
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();

        if kept.is_empty() && marker.is_none() {
            self.url.set_query(None);
            return;
        }

        let mut query = self.url.query_pairs_mut();
        query.clear();
        for (name, value) in &kept {
            query.append_pair(name, value);
        }
        if let Some(marker) = marker {
            query.append_pair(MARKER_LINK_PARAM, marker.as_str());
        }
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl std::fmt::Display for DeepLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.url.as_str())
    }
}
