//! Integration tests for the zonekit CLI
//!
//! These tests spawn the actual binary. None of them reach a control host:
//! they cover argument parsing, the state file and config validation.
