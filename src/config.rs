use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::AppError;
use crate::models::DayOfWeek;
use crate::services::grid::GridConfig;
use crate::services::scheduler::{ReminderMatch, ReminderPolicy};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub reminder_interval_secs: u64,
    pub reminder_policy: ReminderPolicy,
    pub document_service_url: Option<String>,
    pub document_service_token: Option<String>,
    pub grid: GridConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL")
            .unwrap_or_else(|| "sqlite://academia.db?mode=rwc".to_string());
        let bind_addr = parse_var(&lookup, "BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?;

        let reminder_interval_secs = parse_var(&lookup, "REMINDER_INTERVAL_SECS", 60u64)?;
        if reminder_interval_secs == 0 {
            return Err(AppError::Config("REMINDER_INTERVAL_SECS must be positive".to_string()));
        }
        let lead_minutes = parse_var(&lookup, "REMINDER_LEAD_MINUTES", 15i64)?;
        if lead_minutes <= 0 {
            return Err(AppError::Config("REMINDER_LEAD_MINUTES must be positive".to_string()));
        }
        let matching = parse_var(&lookup, "REMINDER_MATCH", ReminderMatch::Window)?;

        let document_service_url = lookup("DOCUMENT_SERVICE_URL").filter(|v| !v.trim().is_empty());
        let document_service_token =
            lookup("DOCUMENT_SERVICE_TOKEN").filter(|v| !v.trim().is_empty());

        let include_sunday = parse_var(&lookup, "GRID_INCLUDE_SUNDAY", false)?;
        let day_columns = if include_sunday {
            DayOfWeek::ALL.to_vec()
        } else {
            DayOfWeek::ALL[..6].to_vec()
        };
        let grid = GridConfig::new(
            day_columns,
            parse_var(&lookup, "GRID_START_HOUR", 8u32)?,
            parse_var(&lookup, "GRID_END_HOUR", 22u32)?,
            parse_var(&lookup, "GRID_PIXELS_PER_HOUR", 80.0f64)?,
        )
        .map_err(|e| AppError::Config(e.to_string()))?;

        Ok(Self {
            database_url,
            bind_addr,
            reminder_interval_secs,
            reminder_policy: ReminderPolicy {
                lead_minutes,
                matching,
            },
            document_service_url,
            document_service_token,
            grid,
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{} is invalid: {}", key, e))),
        None => Ok(default),
    }
}
