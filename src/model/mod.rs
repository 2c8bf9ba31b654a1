//! Data models for the track CLI.
//!
//! This module contains the domain models:
//! - Track (the sole entity)
//! - Status (the closed lifecycle enum)
//! - creation / patch parameter structs

pub mod track;

pub use track::{NewTrack, Status, Track, TrackPatch};
