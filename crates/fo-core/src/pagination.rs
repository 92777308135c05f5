//! Pagination types for API responses and repository queries
//!
//! Collections are offset based: `?offset=40&pageSize=20`.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 500;

/// Pagination parameters (from query string)
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    #[serde(default)]
    pub offset: i64,

    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            offset: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PaginationParams {
    pub fn new(offset: i64, page_size: i64) -> Self {
        Self { offset, page_size }.normalized()
    }

    /// Clamp user supplied values into the accepted range
    pub fn normalized(self) -> Self {
        Self {
            offset: self.offset.max(0),
            page_size: self.page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn pagination(&self) -> Pagination {
        let p = self.normalized();
        Pagination::new(p.page_size, p.offset)
    }
}

/// Pagination for repository queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    /// Apply this window to an in-memory, already ordered list
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = self.offset.max(0) as usize;
        let limit = usize::try_from(self.limit.max(0)).unwrap_or(usize::MAX);
        items.into_iter().skip(offset).take(limit).collect()
    }
}

/// Query result with pagination metadata
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl<T> PaginatedResult<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        Self {
            items,
            total,
            limit: pagination.limit,
            offset: pagination.offset,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PaginatedResult<U> {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// Paginated collection response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    #[serde(rename = "_type")]
    pub hal_type: String,

    /// Total count of items
    pub total: i64,

    /// Number of items in this page
    pub count: i64,

    pub page_size: i64,

    pub offset: i64,

    #[serde(rename = "_links")]
    pub links: PaginationLinks,

    #[serde(rename = "_embedded")]
    pub embedded: PaginatedEmbedded<T>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginationLinks {
    #[serde(rename = "self")]
    pub self_link: LinkObject,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "jumpTo")]
    pub jump_to: Option<LinkObject>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "changeSize")]
    pub change_size: Option<LinkObject>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "previousByOffset")]
    pub previous: Option<LinkObject>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "nextByOffset")]
    pub next: Option<LinkObject>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkObject {
    pub href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl LinkObject {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            title: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginatedEmbedded<T> {
    pub elements: Vec<T>,
}

impl<T> PaginatedResponse<T> {
    pub fn new(result: PaginatedResult<T>, base_url: &str) -> Self {
        let offset = result.offset;
        let page_size = result.limit;
        let count = result.items.len() as i64;
        let total = result.total;

        let href = |offset: i64| format!("{}?offset={}&pageSize={}", base_url, offset, page_size);

        let previous = if offset > 0 {
            Some(LinkObject::new(href((offset - page_size).max(0))))
        } else {
            None
        };

        let next = if offset + count < total {
            Some(LinkObject::new(href(offset + page_size)))
        } else {
            None
        };

        Self {
            hal_type: "Collection".to_string(),
            total,
            count,
            page_size,
            offset,
            links: PaginationLinks {
                self_link: LinkObject::new(href(offset)),
                jump_to: Some(LinkObject::new(format!(
                    "{}?offset={{offset}}&pageSize={}",
                    base_url, page_size
                ))),
                change_size: Some(LinkObject::new(format!(
                    "{}?offset={}&pageSize={{size}}",
                    base_url, offset
                ))),
                previous,
                next,
            },
            embedded: PaginatedEmbedded {
                elements: result.items,
            },
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Sort parameter, e.g. `dueDate:desc`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortParam {
    pub field: String,
    pub direction: SortDirection,
}

impl SortParam {
    pub fn parse(sort_string: &str) -> Vec<Self> {
        sort_string
            .split(',')
            .filter_map(|part| {
                let part = part.trim();
                if part.is_empty() {
                    return None;
                }

                let (field, direction) = if let Some(field) = part.strip_suffix(":desc") {
                    (field.to_string(), SortDirection::Desc)
                } else if let Some(field) = part.strip_suffix(":asc") {
                    (field.to_string(), SortDirection::Asc)
                } else {
                    (part.to_string(), SortDirection::Asc)
                };

                Some(SortParam { field, direction })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_are_clamped() {
        let params = PaginationParams::new(-5, 10_000);
        assert_eq!(params.offset, 0);
        assert_eq!(params.page_size, MAX_PAGE_SIZE);

        let params = PaginationParams::new(10, 0);
        assert_eq!(params.page_size, 1);
    }

    #[test]
    fn test_pagination_apply() {
        let items: Vec<i32> = (1..=10).collect();
        assert_eq!(Pagination::new(3, 2).apply(items.clone()), vec![3, 4, 5]);
        assert_eq!(Pagination::new(5, 8).apply(items), vec![9, 10]);
    }

    #[test]
    fn test_paginated_response_links() {
        let result = PaginatedResult::new(vec![1, 2], 5, Pagination::new(2, 2));
        let response = PaginatedResponse::new(result, "/api/v1/clients");

        assert_eq!(response.count, 2);
        assert_eq!(response.total, 5);
        assert_eq!(
            response.links.self_link.href,
            "/api/v1/clients?offset=2&pageSize=2"
        );
        assert_eq!(
            response.links.previous.as_ref().map(|l| l.href.as_str()),
            Some("/api/v1/clients?offset=0&pageSize=2")
        );
        assert_eq!(
            response.links.next.as_ref().map(|l| l.href.as_str()),
            Some("/api/v1/clients?offset=4&pageSize=2")
        );

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["_type"], "Collection");
        assert_eq!(json["pageSize"], 2);
        assert_eq!(json["_embedded"]["elements"][1], 2);
    }

    #[test]
    fn test_last_page_has_no_next() {
        let result = PaginatedResult::new(vec![5], 5, Pagination::new(2, 4));
        let response = PaginatedResponse::new(result, "/x");
        assert!(response.links.next.is_none());
    }

    #[test]
    fn test_sort_param_parse() {
        let sorts = SortParam::parse("dueDate:desc, number ,title:asc,");
        assert_eq!(sorts.len(), 3);
        assert_eq!(sorts[0].field, "dueDate");
        assert_eq!(sorts[0].direction, SortDirection::Desc);
        assert_eq!(sorts[1].field, "number");
        assert_eq!(sorts[1].direction, SortDirection::Asc);
        assert_eq!(sorts[2].direction, SortDirection::Asc);
    }
}
