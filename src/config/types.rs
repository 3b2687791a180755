//! Configuration types for the engine.
//!
//! This module contains the strongly-typed settings deserialized from
//! `engine.yaml`.

use chrono_tz::Tz;
use serde::Deserialize;

/// The tenant the engine calculates for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TenantSettings {
    /// Tenant identifier.
    pub id: String,
    /// IANA zone in which local dates, end of day and opening hours are
    /// resolved.
    pub timezone: Tz,
}

/// Top-level structure of `engine.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineSettings {
    /// Tenant settings.
    pub tenant: TenantSettings,
}
