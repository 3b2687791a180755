//! Calendar data access.
//!
//! The engine reads opening hours through the [`CalendarRepository`] port.
//! [`InMemoryCalendar`] is a complete implementation for embedding and tests.

mod in_memory;
mod repository;

pub use in_memory::InMemoryCalendar;
pub use repository::CalendarRepository;
