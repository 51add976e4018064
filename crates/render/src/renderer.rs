use std::collections::{BTreeMap, HashMap};

use gridmerge_common::{GeoBounds, GridCoord, LatLng, RenderHandle, Token};

/// What the presenter gets to see of one live cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellView {
    pub coord: GridCoord,
    pub token: Option<Token>,
    pub bounds: GeoBounds,
}

/// Errors a presenter may report while managing a cell's visual.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no visual for handle {0:?}")]
    UnknownHandle(RenderHandle),
    #[error("presenter failure: {0}")]
    Backend(String),
}

/// Rendering collaborator. Owns visuals only, never world truth.
///
/// The cache calls `show` once per spawned cell, `update` after the cell's
/// token changes and `remove` when the cell leaves the active window.
pub trait CellPresenter {
    fn show(&mut self, handle: RenderHandle, view: &CellView) -> Result<(), RenderError>;

    fn update(&mut self, handle: RenderHandle, view: &CellView) -> Result<(), RenderError>;

    fn remove(&mut self, handle: RenderHandle) -> Result<(), RenderError>;
}

/// Presenter that draws nothing. For headless sessions.
#[derive(Debug, Default)]
pub struct NullPresenter;

impl CellPresenter for NullPresenter {
    fn show(&mut self, _: RenderHandle, _: &CellView) -> Result<(), RenderError> {
        Ok(())
    }

    fn update(&mut self, _: RenderHandle, _: &CellView) -> Result<(), RenderError> {
        Ok(())
    }

    fn remove(&mut self, _: RenderHandle) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Text presenter: keeps every shown cell and draws an ASCII map on demand.
#[derive(Debug, Default)]
pub struct TextPresenter {
    visuals: HashMap<RenderHandle, CellView>,
    by_coord: BTreeMap<GridCoord, RenderHandle>,
}

impl TextPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of visuals currently on screen.
    pub fn visible_count(&self) -> usize {
        self.visuals.len()
    }

    pub fn view_at(&self, coord: GridCoord) -> Option<&CellView> {
        self.by_coord.get(&coord).and_then(|h| self.visuals.get(h))
    }

    /// Draw `rows` x `cols` cells centred on `center`, north at the top.
    ///
    /// `@` marks the player, `.` an empty live cell, a number a token and a
    /// blank a cell with no visual.
    pub fn draw(&self, center: GridCoord, rows: u32, cols: u32, player: GridCoord) -> String {
        let half_r = i32::try_from(rows / 2).unwrap_or(i32::MAX);
        let half_c = i32::try_from(cols / 2).unwrap_or(i32::MAX);
        let mut out = String::new();
        // Windows at the edge of the grid are clipped, not wrapped.
        for i in (center.i.saturating_sub(half_r)..=center.i.saturating_add(half_r)).rev() {
            for j in center.j.saturating_sub(half_c)..=center.j.saturating_add(half_c) {
                let c = GridCoord::new(i, j);
                let glyph = if c == player {
                    "@".to_string()
                } else {
                    match self.view_at(c) {
                        Some(CellView { token: Some(t), .. }) => t.to_string(),
                        Some(_) => ".".to_string(),
                        None => " ".to_string(),
                    }
                };
                out.push_str(&format!("{glyph:>3}"));
            }
            out.push('\n');
        }
        out
    }
}

impl CellPresenter for TextPresenter {
    fn show(&mut self, handle: RenderHandle, view: &CellView) -> Result<(), RenderError> {
        self.visuals.insert(handle, *view);
        self.by_coord.insert(view.coord, handle);
        Ok(())
    }

    fn update(&mut self, handle: RenderHandle, view: &CellView) -> Result<(), RenderError> {
        let slot = self
            .visuals
            .get_mut(&handle)
            .ok_or(RenderError::UnknownHandle(handle))?;
        *slot = *view;
        Ok(())
    }

    fn remove(&mut self, handle: RenderHandle) -> Result<(), RenderError> {
        let view = self
            .visuals
            .remove(&handle)
            .ok_or(RenderError::UnknownHandle(handle))?;
        if self.by_coord.get(&view.coord) == Some(&handle) {
            self.by_coord.remove(&view.coord);
        }
        Ok(())
    }
}

/// HUD line: `Holding: <token|none> - Player: <lat>, <lng>`.
pub fn status_line(held: Option<Token>, position: LatLng) -> String {
    let held = held.map_or_else(|| "none".to_string(), |t| t.to_string());
    format!(
        "Holding: {held} - Player: {:.6}, {:.6}",
        position.lat, position.lng
    )
}
