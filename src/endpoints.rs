//! CFBD endpoint to warehouse table mapping
//!
//! Every logical source owns a fixed list of [`EndpointConfig`] records. Each
//! record says where the data comes from, which table it lands in, how rows
//! are keyed, and how the request space is sliced to stay under the upstream
//! per-request record cap.

use crate::error::AppError;
use crate::years::YearCategory;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// How a batch of records is applied to its destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteDisposition {
    /// Upsert by primary key
    #[default]
    Merge,
    /// Truncate, then insert
    Replace,
    /// Insert only
    Append,
}

impl WriteDisposition {
    pub fn as_str(self) -> &'static str {
        match self {
            WriteDisposition::Merge => "merge",
            WriteDisposition::Replace => "replace",
            WriteDisposition::Append => "append",
        }
    }
}

impl fmt::Display for WriteDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WriteDisposition {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(WriteDisposition::Merge),
            "replace" => Ok(WriteDisposition::Replace),
            "append" => Ok(WriteDisposition::Append),
            other => Err(AppError::config_error(format!(
                "Unknown write disposition '{other}' (expected merge, replace or append)"
            ))),
        }
    }
}

/// Player season stats are requested one category at a time.
pub const PLAYER_STAT_CATEGORIES: &[&str] = &[
    "passing",
    "rushing",
    "receiving",
    "fumbles",
    "defensive",
    "interceptions",
    "punting",
    "kicking",
    "kickReturns",
    "puntReturns",
];

/// Rough count of games returned by `/games` for one season, used for call estimates.
pub const ESTIMATED_GAMES_PER_SEASON: u64 = 900;

/// How the request space of an endpoint is decomposed into slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    /// One request without parameters
    Static,
    /// One request for the current season
    CurrentSeason,
    /// One request per year
    ByYear,
    /// Per year, regular season then postseason
    ByYearSeasonType,
    /// Per year, season type, then week
    ByWeek,
    /// Per year, list the games, then one request per game id
    ByGameId,
    /// Per year, one request per category
    ByYearCategory(&'static [&'static str]),
    /// Per team, then per year
    ByTeamYear,
}

impl Partition {
    pub fn needs_years(self) -> bool {
        !matches!(self, Partition::Static | Partition::CurrentSeason)
    }

    /// Upper-bound estimate of requests needed for `years` and `teams`.
    pub fn estimated_calls(self, years: usize, teams: usize) -> u64 {
        let years = years as u64;
        let weeks = u64::from(
            crate::constants::season::REGULAR_SEASON_WEEKS
                + crate::constants::season::POSTSEASON_WEEKS,
        );
        match self {
            Partition::Static | Partition::CurrentSeason => 1,
            Partition::ByYear => years,
            Partition::ByYearSeasonType => years * 2,
            Partition::ByWeek => years * weeks,
            Partition::ByGameId => years * (2 + ESTIMATED_GAMES_PER_SEASON),
            Partition::ByYearCategory(categories) => years * categories.len() as u64,
            Partition::ByTeamYear => years * teams as u64,
        }
    }
}

/// Reshaping applied to raw API records before they are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    None,
    /// `/lines` returns one object per game with a nested `lines` array; one row per provider.
    FlattenLines,
    /// `/rankings` returns weeks holding polls holding ranks; one row per rank entry.
    FlattenRankings,
}

/// Immutable description of one endpoint and its destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointConfig {
    pub path: &'static str,
    pub schema: &'static str,
    pub table: &'static str,
    pub primary_key: &'static [&'static str],
    pub disposition: WriteDisposition,
    pub partition: Partition,
    /// Field set to the slice year on every record (`season` or `year`).
    pub stamp: Option<&'static str>,
    pub transform: Transform,
}

impl EndpointConfig {
    const fn new(
        path: &'static str,
        schema: &'static str,
        table: &'static str,
        primary_key: &'static [&'static str],
        partition: Partition,
    ) -> Self {
        Self {
            path,
            schema,
            table,
            primary_key,
            disposition: WriteDisposition::Merge,
            partition,
            stamp: None,
            transform: Transform::None,
        }
    }

    const fn stamp(mut self, field: &'static str) -> Self {
        self.stamp = Some(field);
        self
    }

    const fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// `schema.table`
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

use Partition::*;

const REFERENCE: &[EndpointConfig] = &[
    EndpointConfig::new("/conferences", "ref", "conferences", &["id"], Static),
    EndpointConfig::new("/teams", "ref", "teams", &["id"], Static),
    EndpointConfig::new("/teams/fbs", "ref", "teams_fbs", &["id"], Static),
    EndpointConfig::new("/venues", "ref", "venues", &["id"], Static),
    EndpointConfig::new("/coaches", "ref", "coaches", &["first_name", "last_name"], Static),
    EndpointConfig::new("/plays/types", "ref", "play_types", &["id"], Static),
    EndpointConfig::new("/plays/stats/types", "ref", "play_stat_types", &["id"], Static),
    EndpointConfig::new("/draft/positions", "ref", "draft_positions", &["name"], Static),
    EndpointConfig::new("/draft/teams", "ref", "draft_teams", &["location", "nickname"], Static),
    EndpointConfig::new("/stats/categories", "ref", "stat_categories", &["name"], Static),
    EndpointConfig::new("/calendar", "ref", "calendar", &["season", "week"], CurrentSeason)
        .stamp("season"),
];

const GAMES: &[EndpointConfig] = &[
    EndpointConfig::new("/games", "core", "games", &["id"], ByYear).stamp("season"),
    EndpointConfig::new("/drives", "core", "drives", &["id"], ByYearSeasonType).stamp("season"),
    EndpointConfig::new("/games/media", "core", "game_media", &["id"], ByYear).stamp("season"),
    EndpointConfig::new("/games/weather", "core", "game_weather", &["id"], ByYear),
    EndpointConfig::new("/records", "core", "records", &["year", "team"], ByYear),
];

const GAME_STATS: &[EndpointConfig] = &[
    EndpointConfig::new("/games/teams", "core", "game_team_stats", &["id"], ByWeek),
    EndpointConfig::new("/games/players", "core", "game_player_stats", &["id"], ByWeek),
];

const PLAYS: &[EndpointConfig] =
    &[EndpointConfig::new("/plays", "core", "plays", &["id"], ByWeek).stamp("season")];

const PLAY_STATS: &[EndpointConfig] = &[EndpointConfig::new(
    "/plays/stats",
    "stats",
    "play_stats",
    &["game_id", "play_id", "athlete_id", "stat_type"],
    ByGameId,
)];

const STATS: &[EndpointConfig] = &[
    EndpointConfig::new(
        "/stats/season",
        "stats",
        "team_season_stats",
        &["season", "team", "stat_name"],
        ByYear,
    )
    .stamp("season"),
    EndpointConfig::new(
        "/stats/player/season",
        "stats",
        "player_season_stats",
        &["player_id", "season", "team", "category", "stat_type"],
        ByYearCategory(PLAYER_STAT_CATEGORIES),
    )
    .stamp("season"),
    EndpointConfig::new(
        "/stats/season/advanced",
        "stats",
        "advanced_team_stats",
        &["season", "team"],
        ByYear,
    )
    .stamp("season"),
    EndpointConfig::new(
        "/game/box/advanced",
        "stats",
        "advanced_game_stats",
        &["game_id", "team"],
        ByYear,
    ),
    EndpointConfig::new("/player/usage", "stats", "player_usage", &["season", "id"], ByYear),
    EndpointConfig::new(
        "/player/returning",
        "stats",
        "player_returning",
        &["season", "team"],
        ByYear,
    ),
];

const RATINGS: &[EndpointConfig] = &[
    EndpointConfig::new("/ratings/sp", "ratings", "sp_ratings", &["year", "team"], ByYear),
    EndpointConfig::new("/ratings/elo", "ratings", "elo_ratings", &["year", "team"], ByYear),
    EndpointConfig::new("/ratings/fpi", "ratings", "fpi_ratings", &["year", "team"], ByYear),
    EndpointConfig::new("/ratings/srs", "ratings", "srs_ratings", &["year", "team"], ByYear),
    EndpointConfig::new(
        "/ratings/sp/conferences",
        "ratings",
        "sp_conference_ratings",
        &["year", "conference"],
        ByYear,
    ),
];

const RANKINGS: &[EndpointConfig] = &[EndpointConfig::new(
    "/rankings",
    "core",
    "rankings",
    &["season", "week", "poll", "rank"],
    ByWeek,
)
.transform(Transform::FlattenRankings)];

const RECRUITING: &[EndpointConfig] = &[
    EndpointConfig::new("/recruiting/players", "recruiting", "recruits", &["id"], ByYear),
    EndpointConfig::new(
        "/recruiting/teams",
        "recruiting",
        "team_recruiting",
        &["year", "team"],
        ByYear,
    ),
    EndpointConfig::new(
        "/player/portal",
        "recruiting",
        "transfer_portal",
        &["first_name", "last_name", "origin", "season"],
        ByYear,
    ),
    EndpointConfig::new("/talent", "recruiting", "team_talent", &["year", "school"], ByYear),
    EndpointConfig::new(
        "/recruiting/groups",
        "recruiting",
        "recruiting_groups",
        &["year", "team", "position_group"],
        ByYear,
    ),
];

const BETTING: &[EndpointConfig] = &[EndpointConfig::new(
    "/lines",
    "betting",
    "lines",
    &["game_id", "provider"],
    ByYear,
)
.transform(Transform::FlattenLines)];

const DRAFT: &[EndpointConfig] = &[EndpointConfig::new(
    "/draft/picks",
    "draft",
    "draft_picks",
    &["year", "overall"],
    ByYear,
)];

const METRICS: &[EndpointConfig] = &[
    EndpointConfig::new("/ppa/teams", "metrics", "ppa_teams", &["season", "team"], ByYear),
    EndpointConfig::new(
        "/ppa/players/season",
        "metrics",
        "ppa_players_season",
        &["season", "id"],
        ByYear,
    ),
    EndpointConfig::new("/ppa/games", "metrics", "ppa_games", &["game_id", "team"], ByYear),
    EndpointConfig::new("/ppa/players/games", "metrics", "ppa_players_games", &["id"], ByYear),
    EndpointConfig::new(
        "/metrics/wp/pregame",
        "metrics",
        "pregame_win_probability",
        &["season", "game_id"],
        ByYear,
    ),
    EndpointConfig::new("/metrics/wp", "metrics", "win_probability", &["play_id"], ByYear),
    EndpointConfig::new(
        "/ppa/predicted",
        "metrics",
        "ppa_predicted",
        &["down", "distance"],
        Static,
    ),
];

const WEPA: &[EndpointConfig] = &[
    EndpointConfig::new(
        "/wepa/team/season",
        "metrics",
        "wepa_team_season",
        &["year", "team"],
        ByYear,
    )
    .stamp("year"),
    EndpointConfig::new(
        "/wepa/players/passing",
        "metrics",
        "wepa_players_passing",
        &["id", "year"],
        ByYear,
    )
    .stamp("year"),
    EndpointConfig::new(
        "/wepa/players/rushing",
        "metrics",
        "wepa_players_rushing",
        &["id", "year"],
        ByYear,
    )
    .stamp("year"),
    EndpointConfig::new(
        "/wepa/players/kicking",
        "metrics",
        "wepa_players_kicking",
        &["id", "year"],
        ByYear,
    )
    .stamp("year"),
];

const ROSTERS: &[EndpointConfig] = &[EndpointConfig::new(
    "/roster",
    "core",
    "rosters",
    &["id", "team", "year"],
    ByTeamYear,
)
.stamp("year")];

/// Logical data sources, each loading one group of tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    Reference,
    Games,
    GameStats,
    Plays,
    PlayStats,
    Stats,
    Ratings,
    Rankings,
    Recruiting,
    Betting,
    Draft,
    Metrics,
    Wepa,
    Rosters,
}

impl Source {
    /// Every source in load order: dependencies first.
    pub const ALL: [Source; 14] = [
        Source::Reference,
        Source::Games,
        Source::GameStats,
        Source::Plays,
        Source::PlayStats,
        Source::Stats,
        Source::Ratings,
        Source::Rankings,
        Source::Recruiting,
        Source::Betting,
        Source::Draft,
        Source::Metrics,
        Source::Wepa,
        Source::Rosters,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Source::Reference => "reference",
            Source::Games => "games",
            Source::GameStats => "game_stats",
            Source::Plays => "plays",
            Source::PlayStats => "play_stats",
            Source::Stats => "stats",
            Source::Ratings => "ratings",
            Source::Rankings => "rankings",
            Source::Recruiting => "recruiting",
            Source::Betting => "betting",
            Source::Draft => "draft",
            Source::Metrics => "metrics",
            Source::Wepa => "wepa",
            Source::Rosters => "rosters",
        }
    }

    pub fn endpoints(self) -> &'static [EndpointConfig] {
        match self {
            Source::Reference => REFERENCE,
            Source::Games => GAMES,
            Source::GameStats => GAME_STATS,
            Source::Plays => PLAYS,
            Source::PlayStats => PLAY_STATS,
            Source::Stats => STATS,
            Source::Ratings => RATINGS,
            Source::Rankings => RANKINGS,
            Source::Recruiting => RECRUITING,
            Source::Betting => BETTING,
            Source::Draft => DRAFT,
            Source::Metrics => METRICS,
            Source::Wepa => WEPA,
            Source::Rosters => ROSTERS,
        }
    }

    /// Availability window used for backfills. Reference data has no years.
    pub fn year_category(self) -> Option<YearCategory> {
        match self {
            Source::Reference => None,
            Source::Games | Source::GameStats | Source::Rankings => Some(YearCategory::GamesModern),
            Source::Plays | Source::PlayStats => Some(YearCategory::Plays),
            Source::Stats | Source::Rosters => Some(YearCategory::Stats),
            Source::Ratings => Some(YearCategory::Ratings),
            Source::Recruiting => Some(YearCategory::Recruiting),
            Source::Betting => Some(YearCategory::Betting),
            Source::Draft => Some(YearCategory::Draft),
            Source::Metrics | Source::Wepa => Some(YearCategory::Metrics),
        }
    }

    pub fn requires_teams(self) -> bool {
        self.endpoints()
            .iter()
            .any(|e| e.partition == Partition::ByTeamYear)
    }

    pub fn estimated_calls(self, years: usize, teams: usize) -> u64 {
        self.endpoints()
            .iter()
            .map(|e| e.partition.estimated_calls(years, teams))
            .sum()
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Source {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Source::ALL
            .into_iter()
            .find(|source| source.name() == wanted)
            .ok_or_else(|| {
                let valid: Vec<&str> = Source::ALL.iter().map(|s| s.name()).collect();
                AppError::config_error(format!(
                    "Unknown source '{s}'. Valid sources: {}",
                    valid.join(", ")
                ))
            })
    }
}

/// Every configured endpoint paired with its source.
pub fn all_endpoints() -> impl Iterator<Item = (Source, &'static EndpointConfig)> {
    Source::ALL
        .into_iter()
        .flat_map(|source| source.endpoints().iter().map(move |e| (source, e)))
}

/// Checks a single endpoint record.
pub fn validate_endpoint(endpoint: &EndpointConfig) -> Result<(), AppError> {
    let name = endpoint.qualified_table();

    if endpoint.path.is_empty() || !endpoint.path.starts_with('/') {
        return Err(AppError::config_error(format!(
            "{name}: path must be non-empty and start with '/'"
        )));
    }
    if endpoint.schema.trim().is_empty() {
        return Err(AppError::config_error(format!("{name}: missing schema")));
    }
    if endpoint.table.trim().is_empty() {
        return Err(AppError::config_error(format!(
            "endpoint {}: missing table name",
            endpoint.path
        )));
    }
    if endpoint.primary_key.is_empty() {
        return Err(AppError::config_error(format!("{name}: missing primary key")));
    }
    if endpoint.primary_key.iter().any(|column| column.trim().is_empty()) {
        return Err(AppError::config_error(format!(
            "{name}: primary key has a blank column"
        )));
    }
    let unique: HashSet<&str> = endpoint.primary_key.iter().copied().collect();
    if unique.len() != endpoint.primary_key.len() {
        return Err(AppError::config_error(format!(
            "{name}: primary key repeats a column"
        )));
    }
    if let Partition::ByYearCategory(categories) = endpoint.partition
        && categories.is_empty()
    {
        return Err(AppError::config_error(format!(
            "{name}: category partition without categories"
        )));
    }
    Ok(())
}

/// Validates a set of endpoints and checks no two of them write the same table.
pub fn validate_endpoints<'a>(
    endpoints: impl IntoIterator<Item = &'a EndpointConfig>,
) -> Result<(), AppError> {
    let mut tables = HashSet::new();
    for endpoint in endpoints {
        validate_endpoint(endpoint)?;
        if !tables.insert(endpoint.qualified_table()) {
            return Err(AppError::config_error(format!(
                "{} is written by more than one endpoint",
                endpoint.qualified_table()
            )));
        }
    }
    Ok(())
}

/// Validates the built-in endpoint table. Run once at startup.
pub fn validate_endpoint_table() -> Result<(), AppError> {
    validate_endpoints(all_endpoints().map(|(_, e)| e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(table: &str) -> &'static EndpointConfig {
        all_endpoints()
            .map(|(_, e)| e)
            .find(|e| e.table == table)
            .unwrap_or_else(|| panic!("no endpoint for table {table}"))
    }

    #[test]
    fn test_builtin_table_is_valid() {
        validate_endpoint_table().unwrap();
    }

    #[test]
    fn test_every_endpoint_has_path_and_key() {
        for (source, endpoint) in all_endpoints() {
            assert!(endpoint.path.starts_with('/'), "{source}: {}", endpoint.table);
            assert!(!endpoint.primary_key.is_empty(), "{source}: {}", endpoint.table);
        }
    }

    #[test]
    fn test_rejects_empty_path() {
        let bad = EndpointConfig::new("", "ref", "teams", &["id"], Static);
        assert!(validate_endpoint(&bad).is_err());
        let bad = EndpointConfig::new("teams", "ref", "teams", &["id"], Static);
        assert!(validate_endpoint(&bad).is_err());
    }

    #[test]
    fn test_rejects_empty_primary_key() {
        let bad = EndpointConfig::new("/teams", "ref", "teams", &[], Static);
        let err = validate_endpoint(&bad).unwrap_err();
        assert!(err.to_string().contains("missing primary key"));

        let blank = EndpointConfig::new("/teams", "ref", "teams", &["id", " "], Static);
        assert!(validate_endpoint(&blank).is_err());
    }

    #[test]
    fn test_rejects_duplicate_tables() {
        let a = EndpointConfig::new("/teams", "ref", "teams", &["id"], Static);
        let b = EndpointConfig::new("/teams/fbs", "ref", "teams", &["id"], Static);
        assert!(validate_endpoints([&a, &b]).is_err());
    }

    #[test]
    fn test_primary_keys() {
        assert_eq!(find("coaches").primary_key, &["first_name", "last_name"]);
        assert_eq!(
            find("player_season_stats").primary_key,
            &["player_id", "season", "team", "category", "stat_type"]
        );
        assert_eq!(
            find("transfer_portal").primary_key,
            &["first_name", "last_name", "origin", "season"]
        );
        assert_eq!(find("lines").primary_key, &["game_id", "provider"]);
        assert_eq!(find("draft_picks").primary_key, &["year", "overall"]);
        assert_eq!(
            find("play_stats").primary_key,
            &["game_id", "play_id", "athlete_id", "stat_type"]
        );
    }

    #[test]
    fn test_large_endpoints_are_sliced() {
        assert_eq!(find("plays").partition, ByWeek);
        assert_eq!(find("game_team_stats").partition, ByWeek);
        assert_eq!(find("game_player_stats").partition, ByWeek);
        assert_eq!(find("play_stats").partition, ByGameId);
    }

    #[test]
    fn test_write_disposition_parsing() {
        assert_eq!("merge".parse::<WriteDisposition>().unwrap(), WriteDisposition::Merge);
        assert_eq!(" Replace ".parse::<WriteDisposition>().unwrap(), WriteDisposition::Replace);
        assert_eq!("append".parse::<WriteDisposition>().unwrap(), WriteDisposition::Append);
        assert!("upsert".parse::<WriteDisposition>().is_err());
        assert_eq!(WriteDisposition::default(), WriteDisposition::Merge);
    }

    #[test]
    fn test_source_parsing() {
        assert_eq!("game_stats".parse::<Source>().unwrap(), Source::GameStats);
        assert_eq!("game-stats".parse::<Source>().unwrap(), Source::GameStats);
        assert_eq!("WEPA".parse::<Source>().unwrap(), Source::Wepa);
        let err = "marts".parse::<Source>().unwrap_err();
        assert!(err.to_string().contains("Unknown source 'marts'"));
    }

    #[test]
    fn test_source_names_round_trip() {
        for source in Source::ALL {
            assert_eq!(source.name().parse::<Source>().unwrap(), source);
        }
    }

    #[test]
    fn test_only_rosters_require_teams() {
        let needing: Vec<Source> = Source::ALL
            .into_iter()
            .filter(|s| s.requires_teams())
            .collect();
        assert_eq!(needing, vec![Source::Rosters]);
    }

    #[test]
    fn test_estimated_calls() {
        assert_eq!(Source::Plays.estimated_calls(1, 0), 20);
        assert_eq!(Source::Reference.estimated_calls(5, 0), 11);
        assert_eq!(Source::Rosters.estimated_calls(2, 3), 6);
        assert_eq!(Source::Games.estimated_calls(1, 0), 6);
        assert_eq!(
            Source::Stats.estimated_calls(1, 0),
            5 + PLAYER_STAT_CATEGORIES.len() as u64
        );
    }
}
