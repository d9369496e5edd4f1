//! barkeep: a plugin-driven status line generator for i3bar-compatible
//! bars.
//!
//! Plugins are loaded as native libraries (or from a small built-in
//! registry), each runs on its own thread, and their output is
//! multiplexed through single-slot rendezvous channels and a
//! deduplicating update queue into one JSON stream on stdout. Click
//! events arriving on stdin are routed back to the owning plugin.

pub mod bar;
pub mod config;
pub mod plugin;
pub mod sync;
pub mod theme;
