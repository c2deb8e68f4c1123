//! Extraction slices: bounded units of request work
//!
//! A slice narrows one request enough to stay under the upstream record cap.
//! Slices are generated in the order they are requested: years as given,
//! regular season before postseason, weeks ascending.

use crate::constants::season::{POSTSEASON_WEEKS, REGULAR_SEASON_WEEKS};
use crate::endpoints::{EndpointConfig, Partition};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeasonType {
    Regular,
    Postseason,
}

impl SeasonType {
    /// Regular season first.
    pub const ALL: [SeasonType; 2] = [SeasonType::Regular, SeasonType::Postseason];

    pub fn as_str(self) -> &'static str {
        match self {
            SeasonType::Regular => "regular",
            SeasonType::Postseason => "postseason",
        }
    }

    pub fn week_count(self) -> u32 {
        match self {
            SeasonType::Regular => REGULAR_SEASON_WEEKS,
            SeasonType::Postseason => POSTSEASON_WEEKS,
        }
    }

    pub fn weeks(self) -> impl Iterator<Item = u32> {
        1..=self.week_count()
    }
}

impl fmt::Display for SeasonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request's worth of parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractionSlice {
    pub year: Option<i32>,
    pub season_type: Option<SeasonType>,
    pub week: Option<u32>,
    pub game_id: Option<i64>,
    pub team: Option<String>,
    pub category: Option<&'static str>,
}

impl ExtractionSlice {
    /// No parameters at all.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn for_year(year: i32) -> Self {
        Self {
            year: Some(year),
            ..Self::default()
        }
    }

    pub fn for_season_type(year: i32, season_type: SeasonType) -> Self {
        Self {
            season_type: Some(season_type),
            ..Self::for_year(year)
        }
    }

    pub fn for_week(year: i32, season_type: SeasonType, week: u32) -> Self {
        Self {
            week: Some(week),
            ..Self::for_season_type(year, season_type)
        }
    }

    /// A single game. The year is kept for tagging records, not sent upstream.
    pub fn for_game(year: Option<i32>, game_id: i64) -> Self {
        Self {
            year,
            game_id: Some(game_id),
            ..Self::default()
        }
    }

    pub fn for_category(year: i32, category: &'static str) -> Self {
        Self {
            category: Some(category),
            ..Self::for_year(year)
        }
    }

    pub fn for_team(team: impl Into<String>, year: i32) -> Self {
        Self {
            team: Some(team.into()),
            ..Self::for_year(year)
        }
    }

    /// Query parameters in CFBD naming. Game slices send only `gameId`.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        if let Some(game_id) = self.game_id {
            return vec![("gameId", game_id.to_string())];
        }

        let mut params = Vec::new();
        if let Some(year) = self.year {
            params.push(("year", year.to_string()));
        }
        if let Some(season_type) = self.season_type {
            params.push(("seasonType", season_type.as_str().to_string()));
        }
        if let Some(week) = self.week {
            params.push(("week", week.to_string()));
        }
        if let Some(team) = &self.team {
            params.push(("team", team.clone()));
        }
        if let Some(category) = self.category {
            params.push(("category", category.to_string()));
        }
        params
    }
}

impl fmt::Display for ExtractionSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(game_id) = self.game_id {
            return write!(f, "game {game_id}");
        }
        let mut parts = Vec::new();
        if let Some(team) = &self.team {
            parts.push(team.clone());
        }
        if let Some(year) = self.year {
            parts.push(year.to_string());
        }
        if let Some(season_type) = self.season_type {
            parts.push(season_type.as_str().to_string());
        }
        if let Some(week) = self.week {
            parts.push(format!("week {week}"));
        }
        if let Some(category) = self.category {
            parts.push(category.to_string());
        }
        if parts.is_empty() {
            f.write_str("all")
        } else {
            f.write_str(&parts.join(" "))
        }
    }
}

/// Week slices for `years`: each year runs through `season_types` in order,
/// each season type through `weeks` (or its full week range when `None`).
pub fn week_slices(
    years: &[i32],
    season_types: &[SeasonType],
    weeks: Option<&[u32]>,
) -> Vec<ExtractionSlice> {
    let mut slices = Vec::new();
    for &year in years {
        for &season_type in season_types {
            match weeks {
                Some(weeks) => slices.extend(
                    weeks
                        .iter()
                        .map(|&week| ExtractionSlice::for_week(year, season_type, week)),
                ),
                None => slices.extend(
                    season_type
                        .weeks()
                        .map(|week| ExtractionSlice::for_week(year, season_type, week)),
                ),
            }
        }
    }
    slices
}

/// Slices for every partition except [`Partition::ByGameId`], whose slices
/// depend on the game list returned by the API.
pub fn plan_slices(
    endpoint: &EndpointConfig,
    years: &[i32],
    teams: &[String],
    current_season: i32,
) -> Vec<ExtractionSlice> {
    match endpoint.partition {
        Partition::Static => vec![ExtractionSlice::unbounded()],
        Partition::CurrentSeason => vec![ExtractionSlice::for_year(current_season)],
        Partition::ByYear => years.iter().map(|&y| ExtractionSlice::for_year(y)).collect(),
        Partition::ByYearSeasonType => years
            .iter()
            .flat_map(|&y| {
                SeasonType::ALL
                    .into_iter()
                    .map(move |st| ExtractionSlice::for_season_type(y, st))
            })
            .collect(),
        Partition::ByWeek => week_slices(years, &SeasonType::ALL, None),
        Partition::ByYearCategory(categories) => years
            .iter()
            .flat_map(|&y| {
                categories
                    .iter()
                    .map(move |&c| ExtractionSlice::for_category(y, c))
            })
            .collect(),
        Partition::ByTeamYear => teams
            .iter()
            .flat_map(|team| {
                years
                    .iter()
                    .map(move |&y| ExtractionSlice::for_team(team.as_str(), y))
            })
            .collect(),
        Partition::ByGameId => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::Source;

    fn endpoint(source: Source, table: &str) -> &'static EndpointConfig {
        source
            .endpoints()
            .iter()
            .find(|e| e.table == table)
            .unwrap()
    }

    #[test]
    fn test_week_slices_cover_regular_then_postseason() {
        let slices = week_slices(&[2024], &SeasonType::ALL, None);
        assert_eq!(slices.len(), 20);
        assert_eq!(slices[0], ExtractionSlice::for_week(2024, SeasonType::Regular, 1));
        assert_eq!(slices[14], ExtractionSlice::for_week(2024, SeasonType::Regular, 15));
        assert_eq!(slices[15], ExtractionSlice::for_week(2024, SeasonType::Postseason, 1));
        assert_eq!(slices[19], ExtractionSlice::for_week(2024, SeasonType::Postseason, 5));
    }

    #[test]
    fn test_week_slices_follow_year_order() {
        let slices = week_slices(&[2023, 2022], &[SeasonType::Postseason], Some(&[1]));
        let years: Vec<_> = slices.iter().map(|s| s.year).collect();
        assert_eq!(years, vec![Some(2023), Some(2022)]);
    }

    #[test]
    fn test_week_params() {
        let params = ExtractionSlice::for_week(2024, SeasonType::Postseason, 2).to_params();
        assert_eq!(
            params,
            vec![
                ("year", "2024".to_string()),
                ("seasonType", "postseason".to_string()),
                ("week", "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_game_params_only_send_game_id() {
        let params = ExtractionSlice::for_game(Some(2024), 401_520_281).to_params();
        assert_eq!(params, vec![("gameId", "401520281".to_string())]);
    }

    #[test]
    fn test_team_and_category_params() {
        let params = ExtractionSlice::for_team("Ohio State", 2024).to_params();
        assert_eq!(
            params,
            vec![("year", "2024".to_string()), ("team", "Ohio State".to_string())]
        );
        let params = ExtractionSlice::for_category(2024, "passing").to_params();
        assert!(params.contains(&("category", "passing".to_string())));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ExtractionSlice::for_week(2024, SeasonType::Regular, 3).to_string(),
            "2024 regular week 3"
        );
        assert_eq!(ExtractionSlice::for_game(None, 9).to_string(), "game 9");
        assert_eq!(ExtractionSlice::unbounded().to_string(), "all");
    }

    #[test]
    fn test_plan_slices_per_partition() {
        let years = [2024, 2023];
        let teams = vec!["Georgia".to_string()];

        assert_eq!(
            plan_slices(endpoint(Source::Reference, "teams"), &years, &teams, 2026),
            vec![ExtractionSlice::unbounded()]
        );
        assert_eq!(
            plan_slices(endpoint(Source::Reference, "calendar"), &years, &teams, 2026),
            vec![ExtractionSlice::for_year(2026)]
        );
        assert_eq!(
            plan_slices(endpoint(Source::Games, "drives"), &years, &teams, 2026).len(),
            4
        );
        assert_eq!(
            plan_slices(endpoint(Source::Plays, "plays"), &years, &teams, 2026).len(),
            40
        );
        assert_eq!(
            plan_slices(endpoint(Source::Rosters, "rosters"), &years, &teams, 2026),
            vec![
                ExtractionSlice::for_team("Georgia", 2024),
                ExtractionSlice::for_team("Georgia", 2023),
            ]
        );
        let stats = plan_slices(
            endpoint(Source::Stats, "player_season_stats"),
            &[2024],
            &teams,
            2026,
        );
        assert_eq!(stats.len(), crate::endpoints::PLAYER_STAT_CATEGORIES.len());
        assert_eq!(stats[0].category, Some("passing"));
    }
}
