//! Zotero web API connector
//!
//! Read-only client for the Zotero web API v3: attachment listing, parent
//! metadata lookup, collection listing and attachment file downloads.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
use bytes::Bytes;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, ZoteroError};
use crate::types::{ZoteroCollection, ZoteroItem};

/// Zotero web API base URL
const ZOTERO_API_BASE: &str = "https://api.zotero.org";

/// API version pinned via the `Zotero-API-Version` header
const ZOTERO_API_VERSION: &str = "3";

/// Page size for collection listing (Zotero API maximum)
const COLLECTIONS_PAGE_SIZE: u32 = 100;

/// Request timeout for metadata calls
const API_TIMEOUT: Duration = Duration::from_secs(30);

/// Request timeout for binary downloads
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Zotero web API connector
///
/// Every request carries the user's API key; the connector refuses to
/// construct without credentials so callers can surface a configuration
/// prompt instead of a failed request.
///
/// # Example
///
/// ```ignore
/// use provider_zotero::ZoteroConnector;
///
/// let connector = ZoteroConnector::new(http_client, user_id, api_key)?;
/// let attachments = connector.list_attachments(None, None, 100).await?;
/// ```
pub struct ZoteroConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// Numeric Zotero user ID (not the username)
    user_id: String,

    /// Zotero API key with library read access
    api_key: String,
}

impl ZoteroConnector {
    /// Create a new Zotero connector
    ///
    /// # Errors
    ///
    /// Returns [`ZoteroError::EmptyCredentials`] when the user ID or API key
    /// is empty after trimming.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        user_id: String,
        api_key: String,
    ) -> Result<Self> {
        let user_id = user_id.trim().to_string();
        let api_key = api_key.trim().to_string();

        if user_id.is_empty() || api_key.is_empty() {
            return Err(ZoteroError::EmptyCredentials);
        }

        Ok(Self {
            http_client,
            user_id,
            api_key,
        })
    }

    /// Build an authenticated GET request against the API
    fn build_request(&self, url: String, timeout: Duration) -> HttpRequest {
        HttpRequest::get(url)
            .header("Zotero-API-Version", ZOTERO_API_VERSION)
            .header("Zotero-API-Key", &self.api_key)
            .timeout(timeout)
    }

    /// Execute a request and classify non-success statuses
    async fn execute_checked(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
        resource: &str,
    ) -> Result<HttpResponse> {
        let response = self.http_client.execute_with_retry(request, policy).await?;

        if !response.is_success() {
            warn!(
                "Zotero API request failed: status={} resource={}",
                response.status, resource
            );
        }

        match response.status {
            200..=299 => Ok(response),
            401 => Err(ZoteroError::Unauthorized),
            403 => Err(ZoteroError::Forbidden),
            404 => Err(ZoteroError::NotFound {
                resource: resource.to_string(),
            }),
            status => Err(ZoteroError::Api {
                status,
                message: String::from_utf8_lossy(&response.body).to_string(),
            }),
        }
    }

    /// Split a `;`-delimited tag filter into individual tags
    ///
    /// Multiple tags combine as AND on the Zotero side; matching is
    /// case-sensitive.
    fn split_tags(tag_filter: Option<&str>) -> Vec<&str> {
        tag_filter
            .map(|raw| {
                raw.split(';')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// List attachment items, optionally scoped to a collection and filtered
    /// by tags
    ///
    /// `tag_filter` is the raw `;`-delimited string from user preferences;
    /// each tag becomes a separate `tag=` query parameter.
    #[instrument(skip(self), fields(collection = ?collection_key, tags = ?tag_filter))]
    pub async fn list_attachments(
        &self,
        collection_key: Option<&str>,
        tag_filter: Option<&str>,
        limit: u32,
    ) -> Result<Vec<ZoteroItem>> {
        info!("Listing attachments from Zotero");

        let scope = match collection_key {
            Some(key) => format!(
                "{}/users/{}/collections/{}/items",
                ZOTERO_API_BASE, self.user_id, key
            ),
            None => format!("{}/users/{}/items", ZOTERO_API_BASE, self.user_id),
        };

        let mut url = format!("{}?itemType=attachment&limit={}", scope, limit);
        for tag in Self::split_tags(tag_filter) {
            url.push_str(&format!("&tag={}", urlencoding::encode(tag)));
        }

        let request = self.build_request(url, API_TIMEOUT);
        let response = self
            .execute_checked(request, RetryPolicy::default(), "items")
            .await?;

        let items: Vec<ZoteroItem> = serde_json::from_slice(&response.body)
            .map_err(|e| ZoteroError::Decode(format!("Failed to parse item list: {}", e)))?;

        info!("Listed {} attachments from Zotero", items.len());

        Ok(items)
    }

    /// Fetch a single item by key (used for parent metadata lookups)
    #[instrument(skip(self), fields(item_key = %key))]
    pub async fn get_item(&self, key: &str) -> Result<ZoteroItem> {
        debug!("Fetching item metadata");

        let url = format!("{}/users/{}/items/{}", ZOTERO_API_BASE, self.user_id, key);
        let resource = format!("items/{}", key);

        let request = self.build_request(url, API_TIMEOUT);
        let response = self
            .execute_checked(request, RetryPolicy::default(), &resource)
            .await?;

        serde_json::from_slice(&response.body)
            .map_err(|e| ZoteroError::Decode(format!("Failed to parse item {}: {}", key, e)))
    }

    /// List every collection in the library
    ///
    /// The collections endpoint is paginated; pages are requested until one
    /// comes back shorter than the page size.
    #[instrument(skip(self))]
    pub async fn list_collections(&self) -> Result<Vec<ZoteroCollection>> {
        self.list_collections_paged(COLLECTIONS_PAGE_SIZE).await
    }

    async fn list_collections_paged(&self, page_size: u32) -> Result<Vec<ZoteroCollection>> {
        info!("Listing collections from Zotero");

        let mut collections = Vec::new();
        let mut start = 0u32;

        loop {
            let url = format!(
                "{}/users/{}/collections?start={}&limit={}",
                ZOTERO_API_BASE, self.user_id, start, page_size
            );

            let request = self.build_request(url, API_TIMEOUT);
            let response = self
                .execute_checked(request, RetryPolicy::default(), "collections")
                .await?;

            let page: Vec<ZoteroCollection> = serde_json::from_slice(&response.body)
                .map_err(|e| {
                    ZoteroError::Decode(format!("Failed to parse collection list: {}", e))
                })?;

            let received = page.len() as u32;
            collections.extend(page);

            // A full page means more may follow; anything shorter is the end.
            if received < page_size {
                break;
            }
            start += received;
        }

        info!("Listed {} collections from Zotero", collections.len());

        Ok(collections)
    }

    /// Download an attachment binary
    ///
    /// Single attempt, no retry: a failed download degrades one shelf item
    /// and the next refresh tries again.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn download(&self, url: &str) -> Result<Bytes> {
        info!("Downloading attachment file");

        let request = HttpRequest::get(url)
            .header("Zotero-API-Version", ZOTERO_API_VERSION)
            .header("Zotero-API-Key", &self.api_key)
            .timeout(DOWNLOAD_TIMEOUT);

        let response = self
            .execute_checked(request, RetryPolicy::none(), "file")
            .await?;

        info!("Downloaded {} bytes", response.body.len());

        Ok(response.body)
    }

    /// Download URL for an attachment: the API's enclosure link when present,
    /// otherwise the generic file endpoint
    pub fn download_url(&self, item: &ZoteroItem) -> String {
        match item.enclosure_href() {
            Some(href) => href.to_string(),
            None => format!(
                "{}/users/{}/items/{}/file",
                ZOTERO_API_BASE, self.user_id, item.key
            ),
        }
    }

    /// Public web permalink for an item on zotero.org
    ///
    /// Built from the username (not the numeric user ID).
    pub fn item_web_url(username: &str, item_key: &str) -> String {
        format!("https://www.zotero.org/{}/items/{}", username, item_key)
    }
}
