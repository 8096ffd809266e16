//! natours - tours catalog REST API over an embedded document store
//!
//! Layers, bottom-up: `store` (collections and snapshots), `query` (query
//! string to composed query), `aggregate` (report pipelines), `model` (tour
//! schema and validation), `tours` (service), `rest_api` (HTTP), `cli`.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod model;
pub mod observability;
pub mod query;
pub mod rest_api;
pub mod store;
pub mod tours;
