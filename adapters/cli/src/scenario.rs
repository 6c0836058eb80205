//! Scenario files and defender placement scripts for headless runs.

use std::str::FromStr;

use lane_defence_core::{CellCoord, DefenderKind, SimulationConfig};
use serde::Deserialize;
use thiserror::Error;

/// Everything a headless run needs besides the tick count.
///
/// Every table is optional; a missing `[simulation]` table runs the default
/// configuration.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct Scenario {
    /// Simulation tuning.
    pub(crate) simulation: SimulationConfig,
    /// Starting gold, overriding the command-line default.
    pub(crate) gold: Option<u32>,
    /// Defenders placed before the first tick.
    pub(crate) defenders: Vec<Placement>,
}

impl Scenario {
    /// Parses a scenario from TOML text.
    pub(crate) fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Defender placement requested by a scenario or the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub(crate) struct Placement {
    /// Target column.
    pub(crate) column: u32,
    /// Target row.
    pub(crate) row: u32,
    /// Archetype to place.
    #[serde(default = "default_kind")]
    pub(crate) kind: DefenderKind,
}

impl Placement {
    /// Cell the defender should occupy.
    pub(crate) const fn cell(&self) -> CellCoord {
        CellCoord::new(self.column, self.row)
    }
}

fn default_kind() -> DefenderKind {
    DefenderKind::Sentry
}

/// Problems found while parsing a `COL,ROW[,KIND]` placement.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub(crate) enum PlacementParseError {
    /// Fewer than two or more than three fields.
    #[error("expected COL,ROW[,KIND], got `{0}`")]
    Shape(String),
    /// A coordinate is not a non-negative integer.
    #[error("invalid coordinate `{0}`")]
    Coordinate(String),
    /// The archetype name is unknown.
    #[error("unknown defender kind `{0}`, expected `sentry` or `mortar`")]
    Kind(String),
}

impl FromStr for Placement {
    type Err = PlacementParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = value.split(',').map(str::trim).collect();
        let (column, row, kind) = match fields.as_slice() {
            [column, row] => (*column, *row, None),
            [column, row, kind] => (*column, *row, Some(*kind)),
            _ => return Err(PlacementParseError::Shape(value.to_owned())),
        };

        let parse_coordinate = |field: &str| {
            field
                .parse::<u32>()
                .map_err(|_| PlacementParseError::Coordinate(field.to_owned()))
        };
        let kind = match kind.map(str::to_ascii_lowercase).as_deref() {
            None | Some("sentry") => DefenderKind::Sentry,
            Some("mortar") => DefenderKind::Mortar,
            Some(other) => return Err(PlacementParseError::Kind(other.to_owned())),
        };

        Ok(Self {
            column: parse_coordinate(column)?,
            row: parse_coordinate(row)?,
            kind,
        })
    }
}
