//! Collection enumerator: reads the purchased items from the authenticated collection view.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::{BrowserSession, scripts, selectors};
use crate::config::BrowserConfig;
use crate::error::{BrowserError, ScrapeError};
use crate::types::ItemDescriptor;

/// Result of reading the collection
///
/// `items` is in DOM order. Malformed nodes are reported in `malformed` and
/// left out of `items` without stopping enumeration.
#[derive(Debug, Default)]
pub struct Enumeration {
    /// Well-formed items in DOM order
    pub items: Vec<ItemDescriptor>,
    /// One error per skipped node
    pub malformed: Vec<ScrapeError>,
}

/// Raw node shape returned by [`scripts::COLLECTION_ITEMS`]
#[derive(Debug, Default, Deserialize)]
struct RawItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    artist: Option<String>,
    #[serde(default)]
    link: Option<String>,
}

/// Extract every item of the collection
///
/// Waits up to `page_timeout` for the collection container; if it never
/// appears the whole run cannot proceed and [`ScrapeError::PageNotReady`]
/// is returned.
pub async fn enumerate(
    session: &mut dyn BrowserSession,
    config: &BrowserConfig,
) -> Result<Enumeration, ScrapeError> {
    session
        .wait_for_selector(selectors::COLLECTION, config.page_timeout)
        .await
        .map_err(|e| match e {
            BrowserError::Timeout { selector, waited } => {
                ScrapeError::PageNotReady { selector, waited }
            }
            other => ScrapeError::Browser(other),
        })?;

    let payload = session.evaluate(scripts::COLLECTION_ITEMS).await?;
    let enumeration = parse_items(payload)?;

    info!(
        items = enumeration.items.len(),
        malformed = enumeration.malformed.len(),
        "Enumerated collection"
    );
    Ok(enumeration)
}

/// Turn the in-page payload into descriptors, collecting malformed nodes
pub(crate) fn parse_items(payload: Value) -> Result<Enumeration, ScrapeError> {
    let Value::Array(nodes) = payload else {
        return Err(ScrapeError::InvalidPayload(format!(
            "expected an array, got {payload}"
        )));
    };

    let mut enumeration = Enumeration::default();
    for (index, node) in nodes.into_iter().enumerate() {
        match parse_item(index, node) {
            Ok(item) => {
                debug!(index, title = %item.title, creator = %item.creator, "Found item");
                enumeration.items.push(item);
            }
            Err(e) => {
                warn!(index, error = %e, "Skipping malformed collection item");
                enumeration.malformed.push(e);
            }
        }
    }
    Ok(enumeration)
}

fn parse_item(index: usize, node: Value) -> Result<ItemDescriptor, ScrapeError> {
    let raw: RawItem = serde_json::from_value(node).map_err(|_| ScrapeError::MalformedItem {
        index,
        missing: "item fields",
    })?;

    let title = non_empty(raw.title).ok_or(ScrapeError::MalformedItem {
        index,
        missing: "title",
    })?;
    let creator = non_empty(raw.artist)
        .map(|a| normalize_creator(&a))
        .filter(|a| !a.is_empty())
        .ok_or(ScrapeError::MalformedItem {
            index,
            missing: "creator",
        })?;
    let detail_url = non_empty(raw.link)
        .and_then(|l| Url::parse(&l).ok())
        .ok_or(ScrapeError::MalformedItem {
            index,
            missing: "link",
        })?;

    Ok(ItemDescriptor {
        title,
        creator,
        detail_url,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Strip the listing's leading "by " from an artist line
fn normalize_creator(artist: &str) -> String {
    artist
        .trim()
        .strip_prefix("by ")
        .unwrap_or(artist.trim())
        .trim()
        .to_string()
}
