//! Common test utilities for isobar.
//!
//! This module provides shared fixtures and checks for the integration tests.

pub mod assertions;
pub mod image_utils;
pub mod test_data;
