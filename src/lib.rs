//! AmFi Matching API Library
//!
//! Matches capital originadores (credit sellers) to investidores (investors)
//! on compatible asset type, volume and rate thresholds, exposed through a
//! CRUD web API with authentication, audit logging, file attachments and
//! report export.
//!
//! # Modules
//!
//! - `auth`: password hashing, JWT issuance/verification, auth endpoints.
//! - `config`: configuration management.
//! - `db`: database connection and pool management.
//! - `errors`: error handling types.
//! - `export`: CSV report formatting over a match list.
//! - `handlers`: HTTP request handlers for CRUD and audit.
//! - `match_handler`: match listing, statistics and export handlers.
//! - `matching`: the matching engine, filter layer and aggregation layer.
//! - `models`: core data models.
//! - `storage`: Postgres CRUD storage and the snapshot source abstraction.
//! - `upload`: eligibility-document storage.

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod match_handler;
pub mod matching;
pub mod models;
pub mod storage;
pub mod upload;
