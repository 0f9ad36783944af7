//! End-to-end tests for Switchyard live under `tests/`
