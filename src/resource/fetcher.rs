//! Resource Fetcher
//!
//! Pages through the catalog-service resource collection.

use serde_json::Value;

use crate::vra::{Result, VraClient};

/// Page size used when the caller has no preference
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Result of one page fetch
pub struct PaginatedResult {
    pub items: Vec<Value>,
    pub total_pages: Option<u64>,
}

/// Fetch all resources (auto-paginate)
pub async fn fetch_all_resources(client: &VraClient, page_size: u32) -> Result<Vec<Value>> {
    let mut all_items = Vec::new();
    let mut page: u64 = 1;

    loop {
        let result = fetch_resources_page(client, page, page_size).await?;
        let empty = result.items.is_empty();
        all_items.extend(result.items);

        // Without metadata there is no way to know more pages exist
        let Some(total_pages) = result.total_pages else {
            break;
        };
        if empty || page >= total_pages {
            break;
        }
        page += 1;
    }

    tracing::debug!("Fetched {} resources", all_items.len());
    Ok(all_items)
}

/// Fetch one page of resources (pages are 1-based)
pub async fn fetch_resources_page(
    client: &VraClient,
    page: u64,
    page_size: u32,
) -> Result<PaginatedResult> {
    let path = format!(
        "{}?limit={}&page={}",
        client.resources_path(),
        page_size.max(1),
        page
    );
    let response = client.get(&path).await?;

    let items = response
        .get("content")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let total_pages = response
        .pointer("/metadata/totalPages")
        .and_then(|v| v.as_u64());

    Ok(PaginatedResult { items, total_pages })
}

/// Case-insensitive literal substring match used by name lookup
pub fn name_matches(name: &str, query: &str) -> bool {
    name.to_lowercase().contains(&query.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_matches_substring_case_insensitively() {
        assert!(name_matches("webserver01", "web"));
        assert!(name_matches("WebServer01", "SERVER"));
        assert!(!name_matches("db01", "web"));
    }

    #[test]
    fn test_name_matches_treats_query_literally() {
        assert!(!name_matches("webserver01", "web.*01"));
        assert!(name_matches("app(1)", "(1)"));
    }
}
