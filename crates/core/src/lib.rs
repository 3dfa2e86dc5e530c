//! Core library for confluence-mcp
//!
//! This crate implements the **Functional Core** of the confluence-mcp server,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! - **`confluence_mcp_core`** (this crate): decision logic with zero I/O
//! - **`confluence-mcp`**: HTTP transport, CLI and MCP server (the Imperative Shell)
//!
//! Everything here is deterministic and testable with fixture data. The only
//! side effect is log emission through the `log` facade.
//!
//! # Module Organization
//!
//! - [`config`]: Immutable configuration snapshot built by the shell
//! - [`credentials`]: Credential resolution from that snapshot
//! - [`request`]: URL, header and auth assembly plus redacted curl rendering
//! - [`error`]: Error taxonomy and HTTP failure classification
//! - [`pagination`]: Offset, cursor and page-number schemes unified behind one cursor
//! - [`cql`]: Free-text to CQL query normalization
//! - [`atlassian`]: Confluence response models and transformations
//!
//! # Example Usage
//!
//! ```rust
//! use confluence_mcp_core::cql::normalize_query;
//! use confluence_mcp_core::pagination::{extract_pagination, PaginationScheme};
//!
//! let cql = normalize_query("deployment runbook");
//! assert_eq!(cql, r#"text~"deployment" AND text~"runbook""#);
//!
//! let raw = serde_json::json!({"startAt": 0, "maxResults": 25, "total": 100});
//! let page = extract_pagination(PaginationScheme::Offset, &raw);
//! assert_eq!(page.next_cursor(), Some("25"));
//! ```

pub mod atlassian;
pub mod config;
pub mod cql;
pub mod credentials;
pub mod error;
pub mod pagination;
pub mod request;
