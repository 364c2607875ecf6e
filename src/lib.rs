//! The library code for the `lectern` site server. `lectern` renders a blog
//! and marketing site from content held in a headless CMS that speaks
//! JSON:API (Drupal's `jsonapi` module). The architecture can be broken down
//! into three layers:
//!
//! 1. Fetching records from the CMS ([`crate::client`], which flattens
//!    JSON:API documents via [`crate::jsonapi`])
//! 2. Converting records into template values ([`crate::article`],
//!    [`crate::blocks`], [`crate::menu`])
//! 3. Assembling and rendering pages ([`crate::site`], [`crate::render`])
//!
//! The pages are then either served live ([`crate::server`]) or written to
//! disk once ([`crate::build`]).
//!
//! The blogs page is filterable by title, author, and creation date. The
//! translation from request parameters to the CMS query lives in
//! [`crate::filter`].

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod article;
pub mod blocks;
pub mod build;
pub mod client;
pub mod config;
pub mod feed;
pub mod fields;
pub mod filter;
pub mod jsonapi;
pub mod menu;
pub mod params;
pub mod render;
pub mod server;
pub mod site;
pub mod value;
