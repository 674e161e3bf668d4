//! Caller-facing request validation.
//!
//! The repository core assumes well-formed input; transports run raw values
//! through these helpers first and surface `InvalidArgument` to their
//! clients.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RepositoryError, Result};
use crate::types::{ItemId, SelectionAction};

/// Largest page size any caller may request.
pub const MAX_PAGE_SIZE: usize = 100;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// A validated pagination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    page_size: usize,
}

impl PageRequest {
    /// Validates `page >= 1` and `1 <= page_size <= MAX_PAGE_SIZE`.
    pub fn new(page: usize, page_size: usize) -> Result<Self> {
        Self::with_limit(page, page_size, MAX_PAGE_SIZE)
    }

    /// Like `new`, with a caller-chosen upper bound (itself capped at
    /// `MAX_PAGE_SIZE`).
    pub fn with_limit(page: usize, page_size: usize, max_page_size: usize) -> Result<Self> {
        if page < 1 {
            return Err(RepositoryError::InvalidArgument(
                "page must be a positive integer".to_string(),
            ));
        }
        let max_page_size = max_page_size.min(MAX_PAGE_SIZE);
        if page_size < 1 || page_size > max_page_size {
            return Err(RepositoryError::InvalidArgument(format!(
                "page size must be between 1 and {max_page_size}"
            )));
        }
        Ok(Self { page, page_size })
    }

    /// Parses optional raw query parameters, falling back to page 1 and
    /// `default_page_size` when a value is absent.
    pub fn parse(
        page: Option<&str>,
        page_size: Option<&str>,
        default_page_size: usize,
        max_page_size: usize,
    ) -> Result<Self> {
        let page = parse_count("page", page)?.unwrap_or(1);
        let page_size = parse_count("page size", page_size)?.unwrap_or(default_page_size);
        Self::with_limit(page, page_size, max_page_size)
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of matching items that precede this page.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

fn parse_count(name: &str, raw: Option<&str>) -> Result<Option<usize>> {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<usize>()
        .map(Some)
        .map_err(|_| RepositoryError::InvalidArgument(format!("{name} must be a valid number")))
}

/// Parses a raw identifier and checks it lies in `[1, item_count]`.
pub fn parse_item_id(raw: &str, item_count: u32) -> Result<ItemId> {
    let value = raw.trim().parse::<u64>().map_err(|_| {
        RepositoryError::InvalidArgument(format!("item id must be a valid number: {raw:?}"))
    })?;
    check_item_id(value, item_count)
}

/// Checks a numeric identifier lies in `[1, item_count]`.
pub fn check_item_id(value: u64, item_count: u32) -> Result<ItemId> {
    u32::try_from(value)
        .ok()
        .filter(|value| *value <= item_count)
        .and_then(ItemId::new)
        .ok_or_else(|| {
            RepositoryError::InvalidArgument(format!(
                "item id must be between 1 and {item_count}, got {value}"
            ))
        })
}

impl FromStr for SelectionAction {
    type Err = RepositoryError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw {
            "select" => Ok(Self::Select),
            "deselect" => Ok(Self::Deselect),
            other => Err(RepositoryError::InvalidArgument(format!(
                "action must be \"select\" or \"deselect\", got {other:?}"
            ))),
        }
    }
}

/// Who made a call. Forwarded untouched to observers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Transport verb, e.g. `GET`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Requested path or URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl CallContext {
    pub fn new(client_addr: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            client_addr: Some(client_addr.into()),
            user_agent: Some(user_agent.into()),
            ..Self::default()
        }
    }

    /// Adds the transport method and target of the call.
    pub fn with_request(mut self, method: impl Into<String>, target: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self.target = Some(target.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_context_carries_request_line() {
        let ctx = CallContext::new("10.1.2.3", "Mozilla/5.0")
            .with_request("PUT", "/api/items/4/relocate");
        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(value["clientAddr"], "10.1.2.3");
        assert_eq!(value["userAgent"], "Mozilla/5.0");
        assert_eq!(value["method"], "PUT");
        assert_eq!(value["target"], "/api/items/4/relocate");

        let bare = serde_json::to_value(CallContext::default()).unwrap();
        assert_eq!(bare, serde_json::json!({}));

        let parsed: CallContext =
            serde_json::from_str(r#"{"clientAddr":"::1","method":"GET"}"#).unwrap();
        assert_eq!(parsed.method.as_deref(), Some("GET"));
        assert!(parsed.target.is_none());
    }

    #[test]
    fn page_request_bounds() {
        assert!(PageRequest::new(1, 1).is_ok());
        assert!(PageRequest::new(3, 100).is_ok());
        assert!(matches!(
            PageRequest::new(0, 20),
            Err(RepositoryError::InvalidArgument(_))
        ));
        assert!(PageRequest::new(1, 0).is_err());
        assert!(PageRequest::new(1, 101).is_err());
    }

    #[test]
    fn page_request_limit_is_capped() {
        assert!(PageRequest::with_limit(1, 50, 40).is_err());
        assert!(PageRequest::with_limit(1, 100, 500).is_ok());
        assert!(PageRequest::with_limit(1, 101, 500).is_err());
    }

    #[test]
    fn page_request_offset() {
        let request = PageRequest::new(3, 25).unwrap();
        assert_eq!(request.offset(), 50);
        assert_eq!(PageRequest::default().offset(), 0);
    }

    #[test]
    fn page_request_parse_defaults() {
        let request = PageRequest::parse(None, Some(" "), 20, 100).unwrap();
        assert_eq!(request.page(), 1);
        assert_eq!(request.page_size(), 20);

        let request = PageRequest::parse(Some("4"), Some("10"), 20, 100).unwrap();
        assert_eq!((request.page(), request.page_size()), (4, 10));

        assert!(PageRequest::parse(Some("abc"), None, 20, 100).is_err());
        assert!(PageRequest::parse(Some("-1"), None, 20, 100).is_err());
    }

    #[test]
    fn item_id_parsing() {
        assert_eq!(parse_item_id("17", 100).unwrap().get(), 17);
        assert_eq!(parse_item_id(" 100 ", 100).unwrap().get(), 100);
        assert!(parse_item_id("0", 100).is_err());
        assert!(parse_item_id("101", 100).is_err());
        assert!(parse_item_id("12abc", 100).is_err());
        assert!(check_item_id(u64::MAX, 100).is_err());
    }

    #[test]
    fn selection_action_from_str() {
        assert_eq!(
            "select".parse::<SelectionAction>().unwrap(),
            SelectionAction::Select
        );
        assert_eq!(
            "deselect".parse::<SelectionAction>().unwrap(),
            SelectionAction::Deselect
        );
        assert!("toggle".parse::<SelectionAction>().is_err());
    }
}
