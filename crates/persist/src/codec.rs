use gridmerge_common::{GridCoord, LatLng, Token};
use gridmerge_kernel::{CellState, GameState, MovementMode, OverrideStore, PlayerState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Errors from encoding or decoding a save.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// The blob could not be parsed or violates the schema. Treat as "no save".
    #[error("corrupt save: {0}")]
    CorruptSave(String),
    #[error("save encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
}

/// Flat on-disk record.
///
/// Field names follow the browser save format; the `useGeo` / `savedCells`
/// aliases accept saves written before the fields were renamed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveRecord {
    player_lat: f64,
    player_lng: f64,
    held_token: Option<Token>,
    #[serde(alias = "useGeo", default = "default_use_geolocation")]
    use_geolocation: bool,
    #[serde(alias = "savedCells", default)]
    overrides: BTreeMap<String, CellState>,
}

fn default_use_geolocation() -> bool {
    true
}

/// Encode the player and the full override store.
pub fn serialize(state: &GameState) -> Result<String, PersistError> {
    let record = SaveRecord {
        player_lat: state.player.position.lat,
        player_lng: state.player.position.lng,
        held_token: state.player.held,
        use_geolocation: state.player.mode.uses_geolocation(),
        overrides: state
            .world
            .overrides()
            .iter()
            .map(|(coord, cell)| (coord.to_string(), *cell))
            .collect(),
    };
    Ok(serde_json::to_string(&record)?)
}

/// Decode a save blob. Any malformed input is [`PersistError::CorruptSave`].
pub fn deserialize(blob: &str) -> Result<(PlayerState, OverrideStore), PersistError> {
    let record: SaveRecord =
        serde_json::from_str(blob).map_err(|e| PersistError::CorruptSave(e.to_string()))?;

    let position = LatLng::new(record.player_lat, record.player_lng);
    if !position.is_finite() {
        return Err(PersistError::CorruptSave("player position is not finite".into()));
    }

    let overrides = record
        .overrides
        .into_iter()
        .map(|(key, cell)| {
            key.parse::<GridCoord>()
                .map(|coord| (coord, cell))
                .map_err(|e| PersistError::CorruptSave(e.to_string()))
        })
        .collect::<Result<OverrideStore, _>>()?;

    let player = PlayerState {
        position,
        held: record.held_token,
        mode: MovementMode::from_geolocation_flag(record.use_geolocation),
    };
    Ok((player, overrides))
}
