//! Contactgate - Contact Form Backend
//!
//! This crate implements the backend for a marketing site's contact form: a
//! single submission endpoint that validates the form, delivers it by email,
//! and guards itself with an in-memory rate limiter that applies incremental
//! backoff per client.

pub mod config;
pub mod contact;
pub mod error;
pub mod http;
pub mod ratelimit;
