//! End-to-end tests of the commander against scripted server links.
//!
//! Covers:
//! - mission rotation driven by the countdown
//! - resume of the running mission after an unexpected console drop
//! - failure handling of console requests
//! - catalog edits while a mission is live
//! - connect/disconnect ordering

pub mod test_utils;


#[cfg(test)]
mod reconnect_tests;

#[cfg(test)]
mod failure_tests;

#[cfg(test)]
mod catalog_edit_tests;
