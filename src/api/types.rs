//! Search result types and the GraphQL wire format they are decoded from

use crate::api::error::ApiError;
use serde::Deserialize;

/// One repository as returned by a search page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRecord {
    /// Stable numeric identity (`databaseId`)
    pub id: i64,

    /// "owner/name"
    pub name_with_owner: String,

    /// Star count at fetch time
    pub stars: i64,

    /// Primary language, when GitHub knows it
    pub language: Option<String>,
}

/// Result of one search call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPage {
    pub repos: Vec<RepoRecord>,

    /// Opaque cursor for the next page
    pub end_cursor: Option<String>,

    pub has_next_page: bool,

    /// Points this request consumed
    pub cost: u32,

    /// Points left in GitHub's own hourly window
    pub remaining: u32,
}

/// Token status reported by the session preflight
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub login: Option<String>,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: Option<String>,
}

// ===== GraphQL wire format =====

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchData {
    pub search: SearchConnection,
    pub rate_limit: Option<RateLimitNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchConnection {
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Vec<Option<RepoNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageInfo {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

/// Search nodes for non-repository results decode as empty objects, so every
/// field is optional.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RepoNode {
    pub database_id: Option<i64>,
    pub name_with_owner: Option<String>,
    pub stargazer_count: Option<i64>,
    pub primary_language: Option<LanguageNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LanguageNode {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RateLimitNode {
    #[serde(default)]
    pub cost: u32,
    pub remaining: u32,
    #[serde(default)]
    pub limit: u32,
    pub reset_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ViewerData {
    pub viewer: Option<Viewer>,
    pub rate_limit: RateLimitNode,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Viewer {
    pub login: String,
}

impl<T> GraphQlResponse<T> {
    /// Unwraps the `data` member, turning GraphQL-level errors into `ApiError`s
    ///
    /// A `RATE_LIMITED` error maps to `PlatformAbuse` with no server delay.
    /// Other errors are fatal only when no data came back with them.
    pub fn into_data(self) -> Result<T, ApiError> {
        if self
            .errors
            .iter()
            .any(|e| e.kind.as_deref() == Some("RATE_LIMITED"))
        {
            return Err(ApiError::PlatformAbuse { retry_after: None });
        }

        let messages = || {
            self.errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ")
        };

        match self.data {
            Some(data) => {
                if !self.errors.is_empty() {
                    tracing::warn!("GraphQL returned partial data: {}", messages());
                }
                Ok(data)
            }
            None if !self.errors.is_empty() => Err(ApiError::GraphQl(messages())),
            None => Err(ApiError::Decode("response has no data".to_string())),
        }
    }
}

impl TryFrom<SearchData> for SearchPage {
    type Error = ApiError;

    fn try_from(data: SearchData) -> Result<Self, Self::Error> {
        let rate_limit = data
            .rate_limit
            .ok_or_else(|| ApiError::Decode("response has no rateLimit".to_string()))?;

        let repos = data
            .search
            .nodes
            .into_iter()
            .flatten()
            .filter_map(|node| {
                Some(RepoRecord {
                    id: node.database_id?,
                    name_with_owner: node.name_with_owner?,
                    stars: node.stargazer_count.unwrap_or(0),
                    language: node.primary_language.map(|l| l.name),
                })
            })
            .collect();

        Ok(SearchPage {
            repos,
            end_cursor: data.search.page_info.end_cursor,
            has_next_page: data.search.page_info.has_next_page,
            cost: rate_limit.cost,
            remaining: rate_limit.remaining,
        })
    }
}

impl From<ViewerData> for RateLimitStatus {
    fn from(data: ViewerData) -> Self {
        Self {
            login: data.viewer.map(|v| v.login),
            limit: data.rate_limit.limit,
            remaining: data.rate_limit.remaining,
            reset_at: data.rate_limit.reset_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_page(json: &str) -> Result<SearchPage, ApiError> {
        let response: GraphQlResponse<SearchData> = serde_json::from_str(json).unwrap();
        SearchPage::try_from(response.into_data()?)
    }

    #[test]
    fn test_decode_search_page() {
        let page = decode_page(
            r#"{
                "data": {
                    "search": {
                        "pageInfo": { "endCursor": "Y3Vyc29yOjI=", "hasNextPage": true },
                        "nodes": [
                            { "databaseId": 1, "nameWithOwner": "octocat/hello", "stargazerCount": 42,
                              "primaryLanguage": { "name": "Rust" } },
                            { "databaseId": 2, "nameWithOwner": "octocat/world", "stargazerCount": 7,
                              "primaryLanguage": null }
                        ]
                    },
                    "rateLimit": { "cost": 1, "remaining": 4999 }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(page.repos.len(), 2);
        assert_eq!(page.repos[0].name_with_owner, "octocat/hello");
        assert_eq!(page.repos[0].language.as_deref(), Some("Rust"));
        assert_eq!(page.repos[1].stars, 7);
        assert_eq!(page.end_cursor.as_deref(), Some("Y3Vyc29yOjI="));
        assert!(page.has_next_page);
        assert_eq!(page.cost, 1);
        assert_eq!(page.remaining, 4999);
    }

    #[test]
    fn test_non_repository_nodes_are_skipped() {
        let page = decode_page(
            r#"{
                "data": {
                    "search": {
                        "pageInfo": { "endCursor": null, "hasNextPage": false },
                        "nodes": [ {}, null, { "databaseId": 3, "nameWithOwner": "a/b", "stargazerCount": 1 } ]
                    },
                    "rateLimit": { "cost": 1, "remaining": 10 }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(page.repos.len(), 1);
        assert_eq!(page.repos[0].id, 3);
        assert!(page.end_cursor.is_none());
    }

    #[test]
    fn test_rate_limited_error_is_abuse() {
        let result = decode_page(
            r#"{ "data": null, "errors": [ { "type": "RATE_LIMITED", "message": "API rate limit exceeded" } ] }"#,
        );
        assert!(matches!(
            result,
            Err(ApiError::PlatformAbuse { retry_after: None })
        ));
    }

    #[test]
    fn test_other_graphql_errors() {
        let result = decode_page(
            r#"{ "errors": [ { "message": "Parse error on \"}\"" } ] }"#,
        );
        assert!(matches!(result, Err(ApiError::GraphQl(msg)) if msg.contains("Parse error")));
    }

    #[test]
    fn test_missing_rate_limit_is_decode_error() {
        let result = decode_page(
            r#"{ "data": { "search": { "pageInfo": { "endCursor": null, "hasNextPage": false }, "nodes": [] } } }"#,
        );
        assert!(matches!(result, Err(ApiError::Decode(_))));
    }
}
