//! File I/O for XML sources.
//!
//! This module provides functionality to load XML documents from strings,
//! files (optionally gzipped) or stdin.

pub mod loader;
