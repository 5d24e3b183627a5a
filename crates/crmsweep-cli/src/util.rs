use crate::error::invalid_input;
use anyhow::Result;
use crmsweep_core::{time, GroupId};
use std::str::FromStr;

pub fn now_ms() -> i64 {
    time::now_ms()
}

pub fn format_instant(ms: i64) -> String {
    time::to_iso(ms)
}

pub fn parse_group_id(value: &str) -> Result<GroupId> {
    GroupId::from_str(value).map_err(|_| invalid_input(format!("invalid group id: {value}")))
}
