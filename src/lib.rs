//! release-train: stage and publish releases across active release trains
//!
//! A project develops on up to three release trains at once: `next` on the
//! primary branch, `latest` on the most recent `{major}.{minor}.x` patch
//! branch, and optionally a feature-freeze or release-candidate train on its
//! own version branch. Long-term support branches are found through registry
//! dist-tags.
//!
//! The crate resolves those trains from branch state, offers the release
//! actions that apply to them, and drives the staged release protocol
//! through git, the forge and the package registry.

pub mod actions;
pub mod builder;
pub mod config;
pub mod error;
pub mod executor;
pub mod git;
pub mod lts;
pub mod platform;
pub mod progress;
pub mod project;
pub mod prompt;
pub mod registry;
pub mod tool;
pub mod trains;
pub mod types;
pub mod version;
