use std::sync::mpsc::{self, Receiver};
use std::time::Instant;

use gridmerge_common::{ConfigError, GameConfig, GeoBounds, GridCoord, LatLng, Token};
use gridmerge_input::{
    FeedHandle, KeyHandle, KeyRepeatMovement, MoveEvent, MovementSource, PositionFeed,
};
use gridmerge_kernel::{GameState, MovementMode, Outcome, PlayerState, interaction};
use gridmerge_persist::{PersistError, SaveSlot};
use gridmerge_render::CellPresenter;
use gridmerge_stream::ActiveCellCache;

use crate::notification::Notification;

/// Builds the movement source for a mode.
pub type MovementFactory = Box<dyn FnMut(MovementMode, &GameConfig) -> Box<dyn MovementSource>>;

/// Factory wiring both modes to host-side handles: fixes pushed into `feed`
/// drive geolocation mode, keys held on `keys` drive manual mode.
pub fn handle_factory(feed: FeedHandle, keys: KeyHandle) -> MovementFactory {
    Box::new(move |mode: MovementMode, config: &GameConfig| -> Box<dyn MovementSource> {
        match mode {
            MovementMode::Geolocation => Box::new(PositionFeed::new(feed.clone())),
            MovementMode::Manual => Box::new(KeyRepeatMovement::new(
                keys.clone(),
                config.tile_size,
                config.key_repeat(),
            )),
        }
    })
}

/// One running game: the only owner of [`GameState`].
///
/// Everything runs on the caller's thread. Movement sources deliver into a
/// channel that is drained on [`pump`](Self::pump); installing a new source
/// replaces the channel, so events from a replaced source are lost.
pub struct GameSession<P: CellPresenter> {
    config: GameConfig,
    target: Token,
    state: GameState,
    cache: ActiveCellCache,
    presenter: P,
    slot: SaveSlot,
    factory: MovementFactory,
    movement: Option<Box<dyn MovementSource>>,
    inbox: Option<Receiver<MoveEvent>>,
    follow_player: bool,
    notifications: Vec<Notification>,
}

impl<P: CellPresenter> GameSession<P> {
    /// Validate `config`, restore from `slot` and spawn the initial view.
    ///
    /// A save that cannot be decoded is discarded with a notification; the
    /// session then starts fresh. No movement source runs until
    /// [`start_movement`](Self::start_movement).
    pub fn new(config: GameConfig, slot: SaveSlot, presenter: P) -> Result<Self, ConfigError> {
        config.validate()?;
        let target =
            Token::new(config.target_token).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let _span = tracing::info_span!("session_new", key = slot.key()).entered();

        let mut state = GameState::new(&config);
        let mut notifications = Vec::new();
        match slot.load() {
            Ok(Some((player, overrides))) => {
                tracing::info!(overrides = overrides.len(), "restored save");
                state.player = player;
                state.world.replace_overrides(overrides);
            }
            Ok(None) => tracing::info!("no save found, starting fresh"),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable save");
                notifications.push(Notification::SaveDiscarded(e.to_string()));
            }
        }

        let cache = ActiveCellCache::new(config.grid(), config.viewport_padding);
        let mut session = Self {
            config,
            target,
            state,
            cache,
            presenter,
            slot,
            factory: handle_factory(FeedHandle::unavailable(), KeyHandle::new()),
            movement: None,
            inbox: None,
            follow_player: false,
            notifications,
        };
        session.center_on_player();
        session.reconcile_neighborhood();
        Ok(session)
    }

    /// Replace the factory used by mode switches. Takes effect on the next switch.
    pub fn with_movement_factory(mut self, factory: MovementFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Build and start the source for the persisted mode.
    ///
    /// The old source is stopped before the factory runs, so two sources
    /// never hold the same device.
    pub fn start_movement(&mut self) {
        self.stop_movement();
        let source = (self.factory)(self.state.player.mode, &self.config);
        self.install_movement(source);
    }

    /// Stop the current source, then subscribe and start `source`.
    ///
    /// A source that fails to start stays installed but inert.
    pub fn install_movement(&mut self, mut source: Box<dyn MovementSource>) {
        self.stop_movement();

        let (tx, rx) = mpsc::channel();
        source.on_move(Box::new(move |event| {
            // The receiver is gone only once this source has been replaced.
            let _ = tx.send(event);
        }));
        if let Err(e) = source.start() {
            tracing::warn!(error = %e, "movement source failed to start");
            self.notifications
                .push(Notification::MovementUnavailable(e.to_string()));
        }
        self.movement = Some(source);
        self.inbox = Some(rx);
    }

    fn stop_movement(&mut self) {
        if let Some(mut source) = self.movement.take() {
            source.stop();
        }
        self.inbox = None;
    }

    /// Switch to `mode`, rebuild its source and persist the choice.
    pub fn set_movement_mode(&mut self, mode: MovementMode) {
        tracing::info!(?mode, "movement mode");
        self.state.player.mode = mode;
        self.start_movement();
        self.persist();
    }

    pub fn toggle_movement_mode(&mut self) -> MovementMode {
        let mode = self.state.player.mode.toggled();
        self.set_movement_mode(mode);
        mode
    }

    pub fn movement_running(&self) -> bool {
        self.movement.as_ref().is_some_and(|m| m.is_running())
    }

    /// Drive the movement source and apply whatever it delivered.
    pub fn pump(&mut self, now: Instant) {
        if let Some(source) = self.movement.as_mut() {
            source.pump(now, self.state.player.position);
        }
        let events: Vec<MoveEvent> = match &self.inbox {
            Some(rx) => rx.try_iter().collect(),
            None => Vec::new(),
        };
        for event in events {
            self.apply_move(event);
        }
    }

    /// Move the player. Authoritative fixes are saved immediately; relative
    /// steps wait for the next save.
    pub fn apply_move(&mut self, event: MoveEvent) {
        if !event.position.is_finite() {
            tracing::warn!(?event, "ignoring non-finite position");
            return;
        }
        self.state.player.position = event.position;
        if event.authoritative {
            self.persist();
        }
        self.reconcile_neighborhood();
        if self.follow_player {
            self.center_on_player();
        }
    }

    /// The viewport settled on `bounds`.
    pub fn view_settled(&mut self, bounds: GeoBounds) {
        self.cache
            .reconcile_viewport(bounds, &self.state.world, &mut self.presenter);
    }

    /// Settle the view on the player with the configured span.
    pub fn center_on_player(&mut self) {
        let bounds = self.view_around(self.state.player.position);
        self.view_settled(bounds);
    }

    pub fn set_follow_player(&mut self, follow: bool) {
        self.follow_player = follow;
        if follow {
            self.center_on_player();
        }
    }

    pub fn follow_player(&self) -> bool {
        self.follow_player
    }

    /// Interact with the cell at `coord`.
    ///
    /// Only live cells can be targeted. Legal transitions are committed,
    /// redrawn and saved before this returns.
    pub fn interact(&mut self, coord: GridCoord) -> Option<Outcome> {
        if !self.cache.contains(coord) {
            self.notifications.push(Notification::NotActive(coord));
            return None;
        }
        let outcome = match interaction::interact(
            &mut self.state,
            coord,
            self.config.interaction_radius,
            self.target,
        ) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::debug!(%coord, error = %e, "interaction refused");
                self.notifications.push(e.into());
                return None;
            }
        };

        self.cache
            .refresh(coord, &self.state.world, &mut self.presenter);
        if let Outcome::Merged {
            value,
            goal_reached: true,
        } = outcome
        {
            tracing::info!(%value, "goal reached");
            self.notifications.push(Notification::GoalReached { value });
        }
        self.persist();
        Some(outcome)
    }

    /// Forget all progress: drop the save, the overrides and every live cell,
    /// then respawn around the start position. The movement mode survives.
    pub fn reset(&mut self) {
        tracing::info!("reset");
        if let Err(e) = self.slot.clear() {
            tracing::warn!(error = %e, "failed to remove save");
        }
        self.cache.clear(&mut self.presenter);
        self.state.world.clear();
        let mode = self.state.player.mode;
        self.state.player = PlayerState {
            mode,
            ..PlayerState::new(self.config.origin)
        };
        self.center_on_player();
        self.reconcile_neighborhood();
    }

    /// Flush the current state to the save slot.
    pub fn save(&mut self) -> Result<(), PersistError> {
        self.slot.save(&self.state)
    }

    /// Stop movement and flush. The session stays usable.
    pub fn shutdown(&mut self) {
        self.stop_movement();
        self.persist();
    }

    /// Shut down and hand back the save slot.
    pub fn into_save_slot(mut self) -> SaveSlot {
        self.shutdown();
        self.slot
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn player(&self) -> &PlayerState {
        &self.state.player
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn cache(&self) -> &ActiveCellCache {
        &self.cache
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn save_slot(&self) -> &SaveSlot {
        &self.slot
    }

    fn view_around(&self, center: LatLng) -> GeoBounds {
        let (rows, cols) = self.config.view_span;
        let tile = self.config.tile_size;
        GeoBounds::around(center, f64::from(rows) * tile / 2.0, f64::from(cols) * tile / 2.0)
    }

    fn reconcile_neighborhood(&mut self) {
        self.cache.reconcile_neighborhood(
            self.state.player_cell(),
            self.config.neighborhood_radius,
            &self.state.world,
            &mut self.presenter,
        );
    }

    fn persist(&mut self) {
        if let Err(e) = self.slot.save(&self.state) {
            tracing::error!(error = %e, "save failed");
            self.notifications.push(Notification::SaveFailed(e.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridmerge_input::ScriptedMovement;
    use gridmerge_render::NullPresenter;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn small_config() -> GameConfig {
        GameConfig {
            origin: LatLng::new(0.0, 0.0),
            tile_size: 1.0,
            neighborhood_radius: 4,
            view_span: (4, 4),
            viewport_padding: 0,
            ..GameConfig::default()
        }
    }

    fn session() -> GameSession<NullPresenter> {
        GameSession::new(small_config(), SaveSlot::in_memory("test"), NullPresenter).unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let config = GameConfig {
            target_token: 30,
            ..small_config()
        };
        assert!(GameSession::new(config, SaveSlot::in_memory("k"), NullPresenter).is_err());
    }

    #[test]
    fn initial_spawn_covers_neighborhood() {
        let s = session();
        let here = s.state().player_cell();
        assert!(here.square(4).all(|c| s.cache().contains(c)));
    }

    #[test]
    fn interacting_off_map_is_not_active() {
        let mut s = session();
        let far = GridCoord::new(500, 500);
        assert_eq!(s.interact(far), None);
        assert_eq!(s.drain_notifications(), vec![Notification::NotActive(far)]);
        assert_eq!(s.state().world.override_count(), 0);
    }

    #[test]
    fn authoritative_moves_persist_and_nudges_wait() {
        let mut s = session();
        s.apply_move(MoveEvent::fix(LatLng::new(2.5, 2.5)));
        let (saved, _) = s.save_slot().load().unwrap().unwrap();
        assert_eq!(saved.position, LatLng::new(2.5, 2.5));

        s.apply_move(MoveEvent::nudge(LatLng::new(3.5, 2.5)));
        let (saved, _) = s.save_slot().load().unwrap().unwrap();
        assert_eq!(saved.position, LatLng::new(2.5, 2.5));

        s.save().unwrap();
        let (saved, _) = s.save_slot().load().unwrap().unwrap();
        assert_eq!(saved.position, LatLng::new(3.5, 2.5));
    }

    #[test]
    fn moving_reconciles_neighborhood() {
        let mut s = session();
        s.apply_move(MoveEvent::nudge(LatLng::new(20.5, 20.5)));
        assert!(s.cache().contains(GridCoord::new(20, 20)));
        assert!(s.cache().contains(GridCoord::new(24, 16)));
    }

    #[test]
    fn follow_mode_recenters_view() {
        let mut s = session();
        s.set_follow_player(true);
        s.apply_move(MoveEvent::nudge(LatLng::new(30.5, 30.5)));
        let view = s.cache().viewport().unwrap();
        assert!(view.contains(LatLng::new(30.5, 30.5)));
    }

    #[test]
    fn unavailable_source_notifies_and_stays_playable() {
        let mut s = session();
        s.install_movement(Box::new(ScriptedMovement::unavailable()));
        assert!(!s.movement_running());
        assert!(matches!(
            s.drain_notifications().as_slice(),
            [Notification::MovementUnavailable(_)]
        ));
        s.apply_move(MoveEvent::nudge(LatLng::new(1.5, 1.5)));
        assert_eq!(s.state().player_cell(), GridCoord::new(1, 1));
    }

    #[test]
    fn default_geolocation_is_unavailable() {
        let mut s = session();
        s.start_movement();
        assert!(!s.movement_running());
        assert!(matches!(
            s.drain_notifications().as_slice(),
            [Notification::MovementUnavailable(_)]
        ));
    }

    #[test]
    fn mode_switch_is_persisted() {
        let mut s = session();
        assert_eq!(s.toggle_movement_mode(), MovementMode::Manual);
        assert!(s.movement_running());
        let (saved, _) = s.save_slot().load().unwrap().unwrap();
        assert_eq!(saved.mode, MovementMode::Manual);
    }

    /// Logs lifecycle calls into a shared journal.
    struct Journaled {
        journal: Rc<RefCell<Vec<&'static str>>>,
        running: bool,
    }

    impl MovementSource for Journaled {
        fn start(&mut self) -> Result<(), gridmerge_input::MovementError> {
            self.journal.borrow_mut().push("start");
            self.running = true;
            Ok(())
        }

        fn stop(&mut self) {
            self.journal.borrow_mut().push("stop");
            self.running = false;
        }

        fn on_move(&mut self, _: gridmerge_input::MoveCallback) {}

        fn pump(&mut self, _: Instant, _: LatLng) {}

        fn is_running(&self) -> bool {
            self.running
        }
    }

    #[test]
    fn old_source_stops_before_factory_builds_new_one() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&journal);
        let mut s = session().with_movement_factory(Box::new(
            move |_: MovementMode, _: &GameConfig| -> Box<dyn MovementSource> {
                log.borrow_mut().push("build");
                Box::new(Journaled {
                    journal: Rc::clone(&log),
                    running: false,
                })
            },
        ));

        s.start_movement();
        s.set_movement_mode(MovementMode::Manual);
        assert_eq!(
            *journal.borrow(),
            vec!["build", "start", "stop", "build", "start"]
        );
        s.shutdown();
        assert_eq!(journal.borrow().last(), Some(&"stop"));
    }

    #[test]
    fn reset_keeps_mode_and_clears_progress() {
        let mut s = session();
        s.set_movement_mode(MovementMode::Manual);
        s.apply_move(MoveEvent::fix(LatLng::new(2.5, 2.5)));
        s.reset();
        assert_eq!(s.player().position, LatLng::new(0.0, 0.0));
        assert_eq!(s.player().mode, MovementMode::Manual);
        assert_eq!(s.player().held, None);
        assert!(s.save_slot().load().unwrap().is_none());
        assert!(s.cache().contains(GridCoord::new(0, 0)));
    }
}
