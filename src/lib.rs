//! Blogicum - a server-rendered blogging platform
//!
//! Posts, categories, locations, comments and user profiles, with a
//! staff-only back office.

pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod templates;
pub mod web;
