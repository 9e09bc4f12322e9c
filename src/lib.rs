//! SmartConvert Lead Dashboard API Library
//!
//! Serves the lead-scoring dashboard: a searchable, sortable, paginated leads
//! table, campaign analytics and per-lead explainability, all computed from a
//! snapshot of scored leads fetched from the scoring backend.
//!
//! # Modules
//!
//! - `api`: API-layer namespace (handlers).
//! - `core`: Domain-layer namespace (engines, models, errors).
//! - `integrations`: External service namespace (backend client, snapshot cache).
//! - `analytics`: KPI counts, histograms and breakdowns for the analytics page.
//! - `query`: Search, filter, sort and pagination for the leads table.
//! - `models`: Lead records, statuses and explainability payloads.
//! - `backend_client`: Scoring backend client (snapshot, detail, status updates).
//! - `snapshot`: Cached snapshot shared between requests.
//! - `circuit_breaker`: Circuit breaker for backend calls.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.

pub mod api;
pub mod core;
pub mod integrations;

pub mod analytics;
pub mod backend_client;
pub mod circuit_breaker;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod query;
pub mod snapshot;
