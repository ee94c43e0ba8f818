//! Scenario and property test suite for Tally.
//!
//! Integration tests live in `tests/` and drive the engine end to end with
//! the built-in rate book. Shared builders are in [`helpers`].

pub mod helpers;
