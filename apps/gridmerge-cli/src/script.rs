//! Line-oriented play scripts.

use anyhow::{Context, bail};
use gridmerge_common::{GridCoord, LatLng};
use gridmerge_input::Direction;
use gridmerge_kernel::MovementMode;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScriptCommand {
    /// Hold a direction for `steps` key-repeat ticks.
    Move { direction: Direction, steps: u32 },
    /// Feed an absolute position fix.
    Fix(LatLng),
    Interact(GridCoord),
    Here,
    View,
    Follow(bool),
    Mode(MovementMode),
    Save,
    Reset,
}

/// Parse one script line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> anyhow::Result<Option<ScriptCommand>> {
    let line = line.split('#').next().unwrap_or_default().trim();
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match (verb, args.as_slice()) {
        ("move", [key, rest @ ..]) if rest.len() <= 1 => {
            let direction = Direction::from_key(key)
                .with_context(|| format!("unknown direction {key:?}, expected w, a, s or d"))?;
            let steps = match rest {
                [n] => n.parse().with_context(|| format!("bad step count {n:?}"))?,
                _ => 1,
            };
            ScriptCommand::Move { direction, steps }
        }
        ("fix", [lat, lng]) => {
            let lat = lat.parse().with_context(|| format!("bad latitude {lat:?}"))?;
            let lng = lng.parse().with_context(|| format!("bad longitude {lng:?}"))?;
            ScriptCommand::Fix(LatLng::new(lat, lng))
        }
        ("interact", [i, j]) => {
            let i = i.parse().with_context(|| format!("bad row {i:?}"))?;
            let j = j.parse().with_context(|| format!("bad column {j:?}"))?;
            ScriptCommand::Interact(GridCoord::new(i, j))
        }
        ("here", []) => ScriptCommand::Here,
        ("view", []) => ScriptCommand::View,
        ("follow", ["on"]) => ScriptCommand::Follow(true),
        ("follow", ["off"]) => ScriptCommand::Follow(false),
        ("mode", ["geo"]) => ScriptCommand::Mode(MovementMode::Geolocation),
        ("mode", ["manual"]) => ScriptCommand::Mode(MovementMode::Manual),
        ("save", []) => ScriptCommand::Save,
        ("reset", []) => ScriptCommand::Reset,
        _ => bail!("unrecognised command {line:?}"),
    };
    Ok(Some(command))
}
