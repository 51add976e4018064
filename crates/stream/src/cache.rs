use std::collections::BTreeMap;

use gridmerge_common::{GeoBounds, GridCoord, GridSpec, RenderHandle};
use gridmerge_kernel::{CellState, WorldStore};
use gridmerge_render::{CellPresenter, CellView};

/// A live, rendering-bound cell. Its state always traces back to the world store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveCell {
    pub coord: GridCoord,
    pub state: CellState,
    pub handle: RenderHandle,
}

/// Per-reconcile statistics for instrumentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub spawned: usize,
    pub pruned: usize,
    pub live: usize,
}

/// Keeps exactly one live [`ActiveCell`] per relevant coordinate.
///
/// A coordinate is relevant while it lies in the padded cell window of the
/// last settled viewport, or inside the last reconciled player neighborhood. Pruning only drops the live wrapper; re-spawning
/// re-derives the same state from the world store.
pub struct ActiveCellCache {
    grid: GridSpec,
    padding: u32,
    cells: BTreeMap<GridCoord, ActiveCell>,
    viewport: Option<GeoBounds>,
    neighborhood: Option<(GridCoord, u32)>,
    stats: CacheStats,
}

impl ActiveCellCache {
    pub fn new(grid: GridSpec, padding: u32) -> Self {
        Self {
            grid,
            padding,
            cells: BTreeMap::new(),
            viewport: None,
            neighborhood: None,
            stats: CacheStats::default(),
        }
    }

    /// Spawn every cell covering `view` (plus padding), then prune.
    pub fn reconcile_viewport<P: CellPresenter + ?Sized>(
        &mut self,
        view: GeoBounds,
        world: &WorldStore,
        presenter: &mut P,
    ) -> CacheStats {
        let _span = tracing::info_span!("reconcile_viewport").entered();
        self.viewport = Some(view);
        let (lo, hi) = self.grid.covering(&view, self.padding);
        let mut spawned = 0;
        for i in lo.i..=hi.i {
            for j in lo.j..=hi.j {
                if self.spawn(GridCoord::new(i, j), world, presenter) {
                    spawned += 1;
                }
            }
        }
        self.finish(spawned, presenter)
    }

    /// Spawn every cell within Chebyshev `radius` of `center`, then prune.
    pub fn reconcile_neighborhood<P: CellPresenter + ?Sized>(
        &mut self,
        center: GridCoord,
        radius: u32,
        world: &WorldStore,
        presenter: &mut P,
    ) -> CacheStats {
        let _span = tracing::info_span!("reconcile_neighborhood").entered();
        self.neighborhood = Some((center, radius));
        let mut spawned = 0;
        for coord in center.square(radius) {
            if self.spawn(coord, world, presenter) {
                spawned += 1;
            }
        }
        self.finish(spawned, presenter)
    }

    /// Re-read a live cell from the world after a commit. Returns false if it is not live.
    pub fn refresh<P: CellPresenter + ?Sized>(
        &mut self,
        coord: GridCoord,
        world: &WorldStore,
        presenter: &mut P,
    ) -> bool {
        let grid = self.grid;
        let Some(cell) = self.cells.get_mut(&coord) else {
            return false;
        };
        cell.state = world.resolve(coord);
        let view = cell_view(&grid, cell);
        if let Err(e) = presenter.update(cell.handle, &view) {
            tracing::warn!(%coord, error = %e, "presenter failed to update cell");
        }
        true
    }

    /// Tear down every live cell and forget the windows.
    pub fn clear<P: CellPresenter + ?Sized>(&mut self, presenter: &mut P) {
        for (coord, cell) in std::mem::take(&mut self.cells) {
            destroy(coord, cell.handle, presenter);
        }
        self.viewport = None;
        self.neighborhood = None;
        self.stats = CacheStats::default();
    }

    pub fn get(&self, coord: GridCoord) -> Option<&ActiveCell> {
        self.cells.get(&coord)
    }

    pub fn contains(&self, coord: GridCoord) -> bool {
        self.cells.contains_key(&coord)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Live cells in coordinate order.
    pub fn iter(&self) -> impl Iterator<Item = &ActiveCell> {
        self.cells.values()
    }

    pub fn viewport(&self) -> Option<GeoBounds> {
        self.viewport
    }

    /// Statistics from the last reconcile.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn spawn<P: CellPresenter + ?Sized>(
        &mut self,
        coord: GridCoord,
        world: &WorldStore,
        presenter: &mut P,
    ) -> bool {
        if self.cells.contains_key(&coord) {
            return false;
        }
        let cell = ActiveCell {
            coord,
            state: world.resolve(coord),
            handle: RenderHandle::new(),
        };
        if let Err(e) = presenter.show(cell.handle, &cell_view(&self.grid, &cell)) {
            tracing::warn!(%coord, error = %e, "presenter failed to show cell");
        }
        tracing::trace!(%coord, "spawned cell");
        self.cells.insert(coord, cell);
        true
    }

    fn prune<P: CellPresenter + ?Sized>(&mut self, presenter: &mut P) -> usize {
        let window = self.viewport.map(|v| self.grid.covering(&v, self.padding));
        let near = self.neighborhood;
        let stale: Vec<GridCoord> = self
            .cells
            .keys()
            .filter(|c| !is_relevant(**c, window, near))
            .copied()
            .collect();
        for coord in &stale {
            if let Some(cell) = self.cells.remove(coord) {
                destroy(*coord, cell.handle, presenter);
            }
        }
        stale.len()
    }

    fn finish<P: CellPresenter + ?Sized>(&mut self, spawned: usize, presenter: &mut P) -> CacheStats {
        let pruned = self.prune(presenter);
        self.stats = CacheStats {
            spawned,
            pruned,
            live: self.cells.len(),
        };
        tracing::debug!(spawned, pruned, live = self.cells.len(), "reconcile complete");
        self.stats
    }
}

/// Inside the padded viewport window or the player neighborhood.
fn is_relevant(
    coord: GridCoord,
    window: Option<(GridCoord, GridCoord)>,
    near: Option<(GridCoord, u32)>,
) -> bool {
    let in_view = window.is_some_and(|(lo, hi)| {
        (lo.i..=hi.i).contains(&coord.i) && (lo.j..=hi.j).contains(&coord.j)
    });
    in_view || near.is_some_and(|(center, radius)| coord.chebyshev(center) <= radius)
}

fn cell_view(grid: &GridSpec, cell: &ActiveCell) -> CellView {
    CellView {
        coord: cell.coord,
        token: cell.state.token_value,
        bounds: grid.cell_bounds(cell.coord),
    }
}

/// Remove a visual; a presenter failure is logged and never keeps the entry alive.
fn destroy<P: CellPresenter + ?Sized>(coord: GridCoord, handle: RenderHandle, presenter: &mut P) {
    if let Err(e) = presenter.remove(handle) {
        tracing::warn!(%coord, error = %e, "failed to remove cell visual");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridmerge_common::{LatLng, Token};
    use gridmerge_render::{RenderError, TextPresenter};

    fn grid() -> GridSpec {
        GridSpec::new(LatLng::new(0.0, 0.0), 1.0)
    }

    /// Bounds covering cells `(i0..=i1, j0..=j1)` without touching their neighbours.
    fn view(i0: i32, j0: i32, i1: i32, j1: i32) -> GeoBounds {
        GeoBounds::new(
            LatLng::new(i0 as f64 + 0.25, j0 as f64 + 0.25),
            LatLng::new(i1 as f64 + 0.75, j1 as f64 + 0.75),
        )
    }

    #[derive(Default)]
    struct FlakyPresenter {
        shown: usize,
        remove_calls: usize,
    }

    impl CellPresenter for FlakyPresenter {
        fn show(&mut self, _: RenderHandle, _: &CellView) -> Result<(), RenderError> {
            self.shown += 1;
            Ok(())
        }

        fn update(&mut self, _: RenderHandle, _: &CellView) -> Result<(), RenderError> {
            Ok(())
        }

        fn remove(&mut self, _: RenderHandle) -> Result<(), RenderError> {
            self.remove_calls += 1;
            Err(RenderError::Backend("layer already detached".into()))
        }
    }

    #[test]
    fn viewport_spawns_padded_rectangle() {
        let world = WorldStore::new(0.15);
        let mut presenter = TextPresenter::new();
        let mut cache = ActiveCellCache::new(grid(), 1);

        let stats = cache.reconcile_viewport(view(0, 0, 2, 3), &world, &mut presenter);
        // 3x4 visible, padded by one on each side.
        assert_eq!(stats.spawned, 30);
        assert_eq!(stats.pruned, 0);
        assert_eq!(cache.len(), 30);
        assert!(cache.contains(GridCoord::new(-1, -1)));
        assert!(cache.contains(GridCoord::new(3, 4)));
        assert_eq!(presenter.visible_count(), 30);

        let stats = cache.reconcile_viewport(view(0, 0, 2, 3), &world, &mut presenter);
        assert_eq!(stats.spawned + stats.pruned, 0);
    }

    #[test]
    fn reconcile_is_idempotent() {
        let world = WorldStore::new(0.15);
        let mut presenter = TextPresenter::new();
        let mut cache = ActiveCellCache::new(grid(), 0);

        cache.reconcile_viewport(view(0, 0, 4, 4), &world, &mut presenter);
        cache.reconcile_neighborhood(GridCoord::new(2, 2), 3, &world, &mut presenter);
        let handles: Vec<_> = cache.iter().map(|c| c.handle).collect();

        let again = cache.reconcile_viewport(view(0, 0, 4, 4), &world, &mut presenter);
        let again_n = cache.reconcile_neighborhood(GridCoord::new(2, 2), 3, &world, &mut presenter);
        assert_eq!(again.spawned + again.pruned, 0);
        assert_eq!(again_n.spawned + again_n.pruned, 0);
        assert_eq!(cache.iter().map(|c| c.handle).collect::<Vec<_>>(), handles);
        assert_eq!(presenter.visible_count(), cache.len());
    }

    #[test]
    fn overlapping_windows_share_cells() {
        let world = WorldStore::new(0.15);
        let mut presenter = TextPresenter::new();
        let mut cache = ActiveCellCache::new(grid(), 0);

        cache.reconcile_viewport(view(0, 0, 2, 2), &world, &mut presenter);
        let stats = cache.reconcile_neighborhood(GridCoord::new(1, 1), 2, &world, &mut presenter);
        // 5x5 neighborhood, 9 of which were already live.
        assert_eq!(stats.spawned, 16);
        assert_eq!(cache.len(), 25);
        assert_eq!(presenter.visible_count(), 25);
    }

    #[test]
    fn neighborhood_survives_viewport_moving_away() {
        let world = WorldStore::new(0.15);
        let mut presenter = TextPresenter::new();
        let mut cache = ActiveCellCache::new(grid(), 0);

        cache.reconcile_neighborhood(GridCoord::new(0, 0), 1, &world, &mut presenter);
        cache.reconcile_viewport(view(100, 100, 101, 101), &world, &mut presenter);

        assert!(cache.contains(GridCoord::new(0, 0)));
        assert!(cache.contains(GridCoord::new(100, 100)));
        assert_eq!(cache.len(), 9 + 4);
    }

    #[test]
    fn moving_neighborhood_prunes_old_cells() {
        let world = WorldStore::new(0.15);
        let mut presenter = TextPresenter::new();
        let mut cache = ActiveCellCache::new(grid(), 0);

        cache.reconcile_neighborhood(GridCoord::new(0, 0), 1, &world, &mut presenter);
        let stats = cache.reconcile_neighborhood(GridCoord::new(10, 0), 1, &world, &mut presenter);
        assert_eq!(stats.pruned, 9);
        assert!(!cache.contains(GridCoord::new(0, 0)));
        assert_eq!(presenter.visible_count(), 9);
    }

    #[test]
    fn prune_then_respawn_is_lossless() {
        let mut world = WorldStore::new(0.15);
        let mut presenter = TextPresenter::new();
        let mut cache = ActiveCellCache::new(grid(), 0);
        let target = GridCoord::new(0, 0);

        cache.reconcile_neighborhood(target, 0, &world, &mut presenter);
        world.commit(target, CellState::with_token(Token::new(4).unwrap()));
        assert!(cache.refresh(target, &world, &mut presenter));
        let before = cache.get(target).unwrap().state;

        cache.reconcile_neighborhood(GridCoord::new(50, 50), 0, &world, &mut presenter);
        assert!(!cache.contains(target));

        cache.reconcile_neighborhood(target, 0, &world, &mut presenter);
        assert_eq!(cache.get(target).unwrap().state, before);
        assert_eq!(world.override_count(), 1);
    }

    #[test]
    fn refresh_ignores_cells_that_are_not_live() {
        let world = WorldStore::new(0.15);
        let mut presenter = TextPresenter::new();
        let mut cache = ActiveCellCache::new(grid(), 0);
        assert!(!cache.refresh(GridCoord::new(3, 3), &world, &mut presenter));
    }

    #[test]
    fn teardown_failure_still_drops_bookkeeping() {
        let world = WorldStore::new(0.15);
        let mut presenter = FlakyPresenter::default();
        let mut cache = ActiveCellCache::new(grid(), 0);

        cache.reconcile_neighborhood(GridCoord::new(0, 0), 1, &world, &mut presenter);
        cache.reconcile_neighborhood(GridCoord::new(20, 20), 1, &world, &mut presenter);
        assert_eq!(presenter.remove_calls, 9);
        assert_eq!(cache.len(), 9);

        cache.clear(&mut presenter);
        assert!(cache.is_empty());
        assert_eq!(presenter.remove_calls, 18);
        assert_eq!(presenter.shown, 18);
    }
}
