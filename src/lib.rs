//! Library exports for the camera rental storefront
//!
//! The server side (routes, handlers, persistence, notifications) and the
//! storefront side (cart, checkout wizard, API client, admin session) live
//! in one crate so both share the same models and validation rules.

pub mod auth;
pub mod booking;
pub mod cart;
pub mod checkout;
pub mod client;
pub mod config;
pub mod database;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod model;
pub mod notice;
pub mod notify;
pub mod pricing;
pub mod route;
pub mod session;
pub mod storage;
pub mod validation;
