//! Field validation rules shared by every backend

use crate::{Error, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 100;
pub const USER_NAME_MIN_LEN: usize = 3;
pub const USER_NAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 4;

static DEADLINE: OnceLock<Regex> = OnceLock::new();

fn deadline_pattern() -> &'static Regex {
    DEADLINE.get_or_init(|| {
        Regex::new(r"^(\d{2})[-/](\d{2})[-/](\d{4})$").expect("deadline pattern is valid")
    })
}

fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{} must not be empty", field)));
    }
    let len = trimmed.chars().count();
    if len < min {
        return Err(Error::Validation(format!(
            "{} must be at least {} characters",
            field, min
        )));
    }
    if len > max {
        return Err(Error::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

/// Names of projects, stages and participants
pub fn validate_name(field: &str, value: &str) -> Result<()> {
    check_length(field, value, NAME_MIN_LEN, NAME_MAX_LEN)
}

pub fn validate_user_name(value: &str) -> Result<()> {
    check_length("user name", value, USER_NAME_MIN_LEN, USER_NAME_MAX_LEN)
}

/// Accepts an empty deadline, or `DD-MM-YYYY` / `DD/MM/YYYY` naming a real date.
pub fn validate_deadline(value: &str) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }

    let invalid = || Error::Validation(format!("invalid deadline '{}', expected DD-MM-YYYY", value));
    let caps = deadline_pattern().captures(value).ok_or_else(invalid)?;

    let day: u32 = caps[1].parse().map_err(|_| invalid())?;
    let month: u32 = caps[2].parse().map_err(|_| invalid())?;
    let year: i32 = caps[3].parse().map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month, day)
        .map(|_| ())
        .ok_or_else(invalid)
}

pub fn validate_budget(value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::Validation(format!(
            "budget must be a non-negative amount, got {}",
            value
        )));
    }
    Ok(())
}

pub fn validate_password(value: &str) -> Result<()> {
    if value.chars().count() < PASSWORD_MIN_LEN {
        return Err(Error::Validation(format!(
            "password must be at least {} characters",
            PASSWORD_MIN_LEN
        )));
    }
    Ok(())
}
