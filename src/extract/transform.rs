//! Record reshaping between the API and the warehouse
//!
//! The API speaks camelCase and nests some collections; warehouse tables are
//! snake_case and flat where the primary key needs it.

use crate::api::Record;
use crate::endpoints::{EndpointConfig, Transform};
use crate::extract::slices::ExtractionSlice;
use serde_json::Value;

/// `homeTeam` -> `home_team`, `HTTPStatus` -> `http_status`, `week 1` -> `week_1`.
pub fn to_snake_case(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' || c == '-' || c == '.' {
            if !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
            if boundary && !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Renames keys to snake_case, descending into nested objects and arrays.
pub fn normalize_keys(record: Record) -> Record {
    record
        .into_iter()
        .map(|(key, value)| (to_snake_case(&key), normalize_value(value)))
        .collect()
}

fn normalize_value(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(normalize_keys(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_value).collect()),
        other => other,
    }
}

/// One row per game and provider. Games without lines produce nothing.
pub fn flatten_lines(game: &Record) -> Vec<Record> {
    let Some(Value::Array(lines)) = game.get("lines") else {
        return Vec::new();
    };

    let field = |key: &str| game.get(key).cloned().unwrap_or(Value::Null);

    lines
        .iter()
        .filter_map(Value::as_object)
        .map(|line| {
            let line_field = |key: &str| line.get(key).cloned().unwrap_or(Value::Null);
            let mut row = Record::new();
            row.insert("game_id".into(), field("id"));
            row.insert("season".into(), field("season"));
            row.insert("week".into(), field("week"));
            row.insert("home_team".into(), field("homeTeam"));
            row.insert("away_team".into(), field("awayTeam"));
            row.insert("home_score".into(), field("homeScore"));
            row.insert("away_score".into(), field("awayScore"));
            row.insert("provider".into(), line_field("provider"));
            row.insert("spread".into(), line_field("spread"));
            row.insert("formatted_spread".into(), line_field("formattedSpread"));
            row.insert("over_under".into(), line_field("overUnder"));
            row.insert("home_moneyline".into(), line_field("homeMoneyline"));
            row.insert("away_moneyline".into(), line_field("awayMoneyline"));
            row
        })
        .collect()
}

/// One row per rank entry, tagged with its season, week and poll name.
/// Season and week fall back to the slice when the payload omits them.
pub fn flatten_rankings(week_data: &Record, slice: &ExtractionSlice) -> Vec<Record> {
    let season = week_data
        .get("season")
        .cloned()
        .or_else(|| slice.year.map(Value::from))
        .unwrap_or(Value::Null);
    let week = week_data
        .get("week")
        .cloned()
        .or_else(|| slice.week.map(Value::from))
        .unwrap_or(Value::Null);

    let Some(Value::Array(polls)) = week_data.get("polls") else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    for poll in polls.iter().filter_map(Value::as_object) {
        let poll_name = poll
            .get("poll")
            .cloned()
            .unwrap_or_else(|| Value::from("unknown"));
        let Some(Value::Array(ranks)) = poll.get("ranks") else {
            continue;
        };
        for entry in ranks.iter().filter_map(Value::as_object) {
            let mut row = entry.clone();
            row.insert("season".into(), season.clone());
            row.insert("week".into(), week.clone());
            row.insert("poll".into(), poll_name.clone());
            rows.push(row);
        }
    }
    rows
}

/// Applies the endpoint transform, normalizes keys, then tags rows from the slice:
/// the year into the stamp field, plus `category` and `team` when the slice has them.
pub fn shape_records(
    endpoint: &EndpointConfig,
    slice: &ExtractionSlice,
    records: Vec<Record>,
) -> Vec<Record> {
    let reshaped: Vec<Record> = match endpoint.transform {
        Transform::None => records,
        Transform::FlattenLines => records.iter().flat_map(flatten_lines).collect(),
        Transform::FlattenRankings => records
            .iter()
            .flat_map(|r| flatten_rankings(r, slice))
            .collect(),
    };

    reshaped
        .into_iter()
        .map(normalize_keys)
        .map(|mut row| {
            if let (Some(field), Some(year)) = (endpoint.stamp, slice.year) {
                row.insert(field.to_string(), Value::from(year));
            }
            if let Some(category) = slice.category {
                row.insert("category".into(), Value::from(category));
            }
            if let Some(team) = &slice.team {
                row.insert("team".into(), Value::from(team.as_str()));
            }
            row
        })
        .collect()
}
