//! Core library for spotify-tidal-import
pub mod api;
pub mod config;
pub mod error;
pub mod importer;
pub mod matcher;
pub mod models;
pub mod reader;
pub mod report;
pub mod runner;
pub mod util;
