//! Calculation logic for the loan due-date engine.
//!
//! This module contains the library timetable built from opening days, the
//! closed-library strategies that move due dates out of closed time, the
//! service that orchestrates them with the due-date limit, and the overdue
//! minutes calculator used for fines.

mod overdue;
mod strategy;
mod strategy_service;
mod timetable;

pub use overdue::{
    OverduePeriodCalculator, adjust_for_grace_period, open_minutes_between, raw_minutes_between,
};
pub use strategy::{
    ClosedLibraryStrategy, determine_closed_library_strategy,
    determine_strategy_for_moving_backward,
};
pub use strategy_service::ClosedLibraryStrategyService;
pub use timetable::{IntervalRef, LibraryInterval, LibraryTimetable};
