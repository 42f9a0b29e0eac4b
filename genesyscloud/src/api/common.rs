//! Common types and helpers shared by the per-entity API modules

use serde::Deserialize;
use std::future::Future;

use super::error::{ApiError, NameLookupError};

/// Paged listing envelope returned by the collection endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityListing<T> {
    pub entities: Option<Vec<T>>,
    pub page_size: Option<i32>,
    pub page_number: Option<i32>,
    pub total: Option<i64>,
    pub page_count: Option<i32>,
}

/// Reference to another addressable object ({id, name, selfUri})
#[derive(Debug, Clone, Default, serde::Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressableEntityRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_uri: Option<String>,
}

/// Drains a paged collection endpoint into a single Vec.
///
/// TODO: thread a pageNumber parameter through `fetch` once the listing
/// endpoints' paging params are wired into the client; today every iteration
/// re-issues the identical unpaged request and stops early on an empty page.
pub async fn get_all_pages<T, F, Fut>(fetch: F) -> Result<Vec<T>, ApiError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<EntityListing<T>, ApiError>>,
{
    let listing = fetch().await?;
    let mut entities = match listing.entities {
        Some(first) if !first.is_empty() => first,
        _ => return Ok(Vec::new()),
    };

    let page_count = listing.page_count.unwrap_or(1);
    for _page in 2..=page_count {
        let listing = fetch().await?;
        match listing.entities {
            Some(page) if !page.is_empty() => entities.extend(page),
            _ => break,
        }
    }

    Ok(entities)
}

/// Scans a listing for the first entity whose name matches exactly.
///
/// Case-sensitive, first match wins. Distinguishes "listing empty" from
/// "listing has no such name" so pollers can keep waiting on either.
pub fn find_id_by_name<T>(
    entities: &[T],
    name: &str,
    id_of: impl Fn(&T) -> Option<&str>,
    name_of: impl Fn(&T) -> Option<&str>,
) -> Result<String, NameLookupError> {
    if entities.is_empty() {
        return Err(NameLookupError::NotYetVisible {
            name: name.to_string(),
        });
    }

    for entity in entities {
        if name_of(entity) == Some(name) {
            if let Some(id) = id_of(entity) {
                tracing::debug!("resolved name {} to id {}", name, id);
                return Ok(id.to_string());
            }
        }
    }

    Err(NameLookupError::NotFound {
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Deserialize)]
    struct Item {
        id: String,
        name: String,
    }

    fn listing(entities: Option<Vec<Item>>, page_count: Option<i32>) -> EntityListing<Item> {
        EntityListing {
            entities,
            page_size: None,
            page_number: None,
            total: None,
            page_count,
        }
    }

    fn item(id: &str, name: &str) -> Item {
        Item {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn get_all_pages_returns_empty_for_empty_listing() {
        let result = get_all_pages(|| async { Ok(listing(Some(vec![]), Some(5))) })
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn get_all_pages_repeats_request_per_declared_page() {
        let calls = AtomicUsize::new(0);
        let result = get_all_pages(|| {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                match call {
                    0 => Ok(listing(Some(vec![item("1", "one")]), Some(3))),
                    1 => Ok(listing(Some(vec![item("2", "two")]), Some(3))),
                    _ => Ok(listing(Some(vec![item("3", "three")]), Some(3))),
                }
            }
        })
        .await
        .unwrap();

        // pages 2..=3 re-issue the same request, so three calls total
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.len(), 3);
    }

    #[tokio::test]
    async fn get_all_pages_stops_on_empty_follow_up_page() {
        let calls = AtomicUsize::new(0);
        let result = get_all_pages(|| {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                match call {
                    0 => Ok(listing(Some(vec![item("1", "one")]), Some(10))),
                    _ => Ok(listing(None, Some(10))),
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn find_id_by_name_first_exact_match_wins() {
        let items = vec![
            item("1", "alpha"),
            item("2", "target"),
            item("3", "target"),
        ];

        let id = find_id_by_name(
            &items,
            "target",
            |i| Some(i.id.as_str()),
            |i| Some(i.name.as_str()),
        )
        .unwrap();
        assert_eq!(id, "2");
    }

    #[test]
    fn find_id_by_name_is_case_sensitive() {
        let items = vec![item("1", "Alpha")];

        let err = find_id_by_name(
            &items,
            "alpha",
            |i| Some(i.id.as_str()),
            |i| Some(i.name.as_str()),
        )
        .unwrap_err();
        assert!(matches!(err, NameLookupError::NotFound { .. }));
    }

    #[test]
    fn find_id_by_name_empty_listing_is_not_yet_visible() {
        let items: Vec<Item> = vec![];

        let err = find_id_by_name(
            &items,
            "anything",
            |i| Some(i.id.as_str()),
            |i| Some(i.name.as_str()),
        )
        .unwrap_err();
        assert!(matches!(err, NameLookupError::NotYetVisible { .. }));
        assert!(err.is_retryable());
    }
}
