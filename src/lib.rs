//! Core of a terminal video-learning app: a client for a remote video
//! catalog, search orchestration (debounce, sort mapping, windowing), a
//! network reachability probe, and per-video note storage.

pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod notes;
pub mod reachability;
pub mod search;
