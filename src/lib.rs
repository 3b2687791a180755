//! Loan due-date engine for library circulation
//!
//! This crate computes due dates for borrowed items against service point
//! opening hours, and the overdue minutes that feed fine calculation. Opening
//! hours are read through the async [`calendar::CalendarRepository`] port;
//! everything after the fetch is pure computation.

#![warn(missing_docs)]

pub mod calculation;
pub mod calendar;
pub mod config;
pub mod error;
pub mod models;
