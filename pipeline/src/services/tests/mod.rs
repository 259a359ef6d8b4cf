//! Tests for the remote service clients
//!
//! These run the real HTTP client against a local wiremock server to pin
//! down request shape, response handling, and failure classification.
