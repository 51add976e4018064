use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Integer address of one grid cell. `i` runs with latitude, `j` with longitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    pub i: i32,
    pub j: i32,
}

impl GridCoord {
    pub fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }

    /// `max(|Δi|, |Δj|)`. Interaction range and neighborhoods are squares under this metric.
    pub fn chebyshev(self, other: GridCoord) -> u32 {
        let di = (i64::from(self.i) - i64::from(other.i)).unsigned_abs();
        let dj = (i64::from(self.j) - i64::from(other.j)).unsigned_abs();
        di.max(dj).min(u64::from(u32::MAX)) as u32
    }

    /// Every coordinate within Chebyshev `radius` of `self`, row by row.
    pub fn square(self, radius: u32) -> impl Iterator<Item = GridCoord> {
        let r = radius.min(i32::MAX as u32) as i32;
        let (ci, cj) = (self.i, self.j);
        (ci.saturating_sub(r)..=ci.saturating_add(r)).flat_map(move |i| {
            (cj.saturating_sub(r)..=cj.saturating_add(r)).map(move |j| GridCoord::new(i, j))
        })
    }
}

impl std::fmt::Display for GridCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.i, self.j)
    }
}

/// Errors from parsing a `"<i>,<j>"` cell key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed cell key {0:?}")]
pub struct CoordParseError(pub String);

impl FromStr for GridCoord {
    type Err = CoordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || CoordParseError(s.to_string());
        let (i, j) = s.split_once(',').ok_or_else(err)?;
        let i = i.trim().parse().map_err(|_| err())?;
        let j = j.trim().parse().map_err(|_| err())?;
        Ok(Self { i, j })
    }
}

/// A point in the continuous coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Shift by a delta in degrees.
    pub fn offset(self, d_lat: f64, d_lng: f64) -> Self {
        Self::new(self.lat + d_lat, self.lng + d_lng)
    }
}

impl From<LatLng> for DVec2 {
    fn from(p: LatLng) -> Self {
        DVec2::new(p.lat, p.lng)
    }
}

impl From<DVec2> for LatLng {
    fn from(v: DVec2) -> Self {
        LatLng::new(v.x, v.y)
    }
}

/// Axis-aligned geographic rectangle. `x` is latitude, `y` is longitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    min: DVec2,
    max: DVec2,
}

impl GeoBounds {
    /// Build from any two opposite corners.
    pub fn new(a: LatLng, b: LatLng) -> Self {
        let (a, b) = (DVec2::from(a), DVec2::from(b));
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Rectangle reaching `half_lat` and `half_lng` degrees from `center` on each side.
    pub fn around(center: LatLng, half_lat: f64, half_lng: f64) -> Self {
        let c = DVec2::from(center);
        let h = DVec2::new(half_lat.abs(), half_lng.abs());
        Self {
            min: c - h,
            max: c + h,
        }
    }

    pub fn south_west(&self) -> LatLng {
        self.min.into()
    }

    pub fn north_east(&self) -> LatLng {
        self.max.into()
    }

    pub fn center(&self) -> LatLng {
        ((self.min + self.max) * 0.5).into()
    }

    pub fn contains(&self, p: LatLng) -> bool {
        let p = DVec2::from(p);
        self.min.cmple(p).all() && p.cmple(self.max).all()
    }
}

/// Maps the continuous space onto the cell grid: a fixed origin and a square tile size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub origin: LatLng,
    pub tile_size: f64,
}

impl GridSpec {
    pub fn new(origin: LatLng, tile_size: f64) -> Self {
        assert!(tile_size > 0.0, "tile_size must be positive");
        Self { origin, tile_size }
    }

    /// Cell containing a continuous position.
    pub fn to_cell(&self, p: LatLng) -> GridCoord {
        GridCoord {
            i: ((p.lat - self.origin.lat) / self.tile_size).floor() as i32,
            j: ((p.lng - self.origin.lng) / self.tile_size).floor() as i32,
        }
    }

    /// South-west and north-east corners of a cell.
    pub fn cell_bounds(&self, c: GridCoord) -> GeoBounds {
        let t = self.tile_size;
        let sw = LatLng::new(
            self.origin.lat + f64::from(c.i) * t,
            self.origin.lng + f64::from(c.j) * t,
        );
        let ne = LatLng::new(
            self.origin.lat + (f64::from(c.i) + 1.0) * t,
            self.origin.lng + (f64::from(c.j) + 1.0) * t,
        );
        GeoBounds::new(sw, ne)
    }

    /// Centre point of a cell.
    pub fn cell_center(&self, c: GridCoord) -> LatLng {
        self.cell_bounds(c).center()
    }

    /// Inclusive cell rectangle covering `bounds`, grown by `padding` cells on each side.
    pub fn covering(&self, bounds: &GeoBounds, padding: u32) -> (GridCoord, GridCoord) {
        let pad = padding.min(i32::MAX as u32) as i32;
        let lo = self.to_cell(bounds.south_west());
        let hi = self.to_cell(bounds.north_east());
        (
            GridCoord::new(lo.i.saturating_sub(pad), lo.j.saturating_sub(pad)),
            GridCoord::new(hi.i.saturating_add(pad), hi.j.saturating_add(pad)),
        )
    }
}
