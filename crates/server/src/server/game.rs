//! Game state and main loop.

use crate::ai::BotManager;
use crate::config::Config;
use crate::movement::safe_normalize;
use crate::world::World;
use crate::{actions, collision, movement, snapshot};
use glam::Vec2;
use protocol::{ClientMessage, Rgb, ServerMessage, Snapshot};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{MissedTickBehavior, interval_at};
use tokio_tungstenite::tungstenite::Utf8Bytes;
use tracing::{debug, info, warn};

/// Distance ahead of the first cell at which an `input` direction places
/// the mouse target.
pub const MOUSE_TARGET_DISTANCE: f32 = 100.0;

/// Name given to players until they send `join`.
const DEFAULT_NAME: &str = "An unnamed cell";

/// Inbound event from the transport. Applied only between ticks.
#[derive(Debug, Clone)]
pub enum Command {
    Connect { id: u32 },
    Disconnect { id: u32 },
    Message { id: u32, message: ClientMessage },
}

/// Reasons a client message is dropped.
#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("unknown player {0}")]
    UnknownPlayer(u32),
    #[error("direction is not finite")]
    InvalidDirection,
    #[error("color component outside 0..1")]
    ColorOutOfRange,
}

/// Main game state.
pub struct GameState {
    pub config: Config,
    pub world: World,
    pub bots: BotManager,
    pub tick_count: u64,
    /// Commands received since the last tick.
    pending: Vec<Command>,
}

impl GameState {
    /// Create a populated world with the configured number of bots.
    pub fn new(config: Config) -> Self {
        let world = World::new(&config);
        Self::with_world(config, world)
    }

    /// Same as [`GameState::new`] with a fixed RNG seed.
    pub fn with_seed(config: Config, seed: u64) -> Self {
        let world = World::with_seed(&config, seed);
        Self::with_world(config, world)
    }

    fn with_world(config: Config, mut world: World) -> Self {
        world.populate();
        let mut bots = BotManager::new();
        bots.spawn(&mut world, config.server.bots);
        info!(
            "World initialized: {} food, {} viruses, {} bots",
            world.foods.len(),
            world.viruses.len(),
            bots.bots.len()
        );

        Self {
            config,
            world,
            bots,
            tick_count: 0,
            pending: Vec::new(),
        }
    }

    /// Queue a command for the start of the next tick.
    pub fn queue(&mut self, command: Command) {
        self.pending.push(command);
    }

    /// Apply a command immediately.
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::Connect { id } => {
                if self.world.players.contains_key(&id) {
                    warn!("Player {} connected twice", id);
                    return;
                }
                self.world.add_player(id, DEFAULT_NAME.to_string(), false);
                info!("Player {} joined ({} players)", id, self.world.players.len());
            }
            Command::Disconnect { id } => {
                if self.world.remove_player(id).is_some() {
                    info!("Player {} left ({} players)", id, self.world.players.len());
                }
            }
            Command::Message { id, message } => {
                if let Err(e) = self.apply_message(id, message) {
                    debug!("Dropped message from player {}: {}", id, e);
                }
            }
        }
    }

    /// Apply one decoded client message.
    pub fn apply_message(&mut self, id: u32, message: ClientMessage) -> Result<(), InputError> {
        if !self.world.players.contains_key(&id) {
            return Err(InputError::UnknownPlayer(id));
        }
        match message {
            ClientMessage::Join { name, skin, color } => self.join(id, name, skin, color)?,
            ClientMessage::Input { dir } => self.input(id, dir)?,
            ClientMessage::Split => {
                actions::split(&mut self.world, &self.config, id);
            }
            ClientMessage::Eject => {
                actions::eject(&mut self.world, &self.config, id);
            }
            ClientMessage::Unknown => debug!("Player {} sent an unknown message type", id),
        }
        Ok(())
    }

    fn join(&mut self, id: u32, name: Option<String>, skin: Option<u32>, color: Option<Rgb>) -> Result<(), InputError> {
        if let Some(color) = color {
            if !color.iter().all(|c| c.is_finite() && (0.0..=1.0).contains(c)) {
                return Err(InputError::ColorOutOfRange);
            }
        }
        let max_name_length = self.config.player.max_name_length;
        let player = self.world.players.get_mut(&id).ok_or(InputError::UnknownPlayer(id))?;
        if let Some(name) = name {
            player.name = name.chars().take(max_name_length).collect();
        }
        if let Some(skin) = skin {
            player.skin = skin;
        }
        if let Some(color) = color {
            player.color = color;
        }
        if self.world.respawn_player(id) {
            info!("Player {} respawned", id);
        }
        Ok(())
    }

    fn input(&mut self, id: u32, dir: [f32; 2]) -> Result<(), InputError> {
        if !dir.iter().all(|c| c.is_finite()) {
            return Err(InputError::InvalidDirection);
        }
        let player = self.world.players.get_mut(&id).ok_or(InputError::UnknownPlayer(id))?;
        let direction = Vec2::from(dir);
        player.direction = direction;
        player.mouse_target = match player.cells.first() {
            Some(cell) if direction != Vec2::ZERO => {
                Some(cell.position + safe_normalize(direction) * MOUSE_TARGET_DISTANCE)
            }
            _ => None,
        };
        Ok(())
    }

    fn drain_commands(&mut self) -> usize {
        let commands = std::mem::take(&mut self.pending);
        let count = commands.len();
        for command in commands {
            self.apply(command);
        }
        count
    }

    /// Clamp the measured step if `max_step_secs` is set.
    fn step(&self, dt: f32) -> f32 {
        let max = self.config.server.max_step_secs as f32;
        if max > 0.0 { dt.min(max) } else { dt }
    }

    /// Run a single game tick and return the resulting snapshot.
    pub fn tick(&mut self, dt: f32) -> Snapshot {
        let tick_start = Instant::now();
        self.tick_count += 1;
        let dt = self.step(dt);

        let commands = self.drain_commands();

        // Bots
        let ai_start = Instant::now();
        self.bots.respawn_eliminated(&mut self.world);
        for bot_id in self.bots.update(&mut self.world, &self.config) {
            actions::split(&mut self.world, &self.config, bot_id);
        }
        let ai_time = ai_start.elapsed();

        let movement_start = Instant::now();
        movement::update(&mut self.world, &self.config, dt);
        let movement_time = movement_start.elapsed();

        let collision_start = Instant::now();
        let food_eaten = collision::eat_food(&mut self.world, &self.config);
        let cells_eaten = collision::eat_cells(&mut self.world, &self.config);
        let pops = collision::pop_viruses(&mut self.world, &self.config);
        let merges = collision::merge_cells(&mut self.world);
        let collision_time = collision_start.elapsed();

        let snapshot_start = Instant::now();
        let snapshot = snapshot::build(&self.world);
        let snapshot_time = snapshot_start.elapsed();

        if self.tick_count % 400 == 0 {
            debug!(
                "Tick #{}: {:.2}ms total | ai={:.2}ms move={:.2}ms collision={:.2}ms snapshot={:.2}ms | {} commands, {} food eaten, {} cells eaten, {} pops, {} merges | {} players, {} cells",
                self.tick_count,
                tick_start.elapsed().as_secs_f64() * 1000.0,
                ai_time.as_secs_f64() * 1000.0,
                movement_time.as_secs_f64() * 1000.0,
                collision_time.as_secs_f64() * 1000.0,
                snapshot_time.as_secs_f64() * 1000.0,
                commands,
                food_eaten,
                cells_eaten,
                pops,
                merges,
                self.world.players.len(),
                self.world.cell_count()
            );
        }
        snapshot
    }
}

/// Drive `state` at the configured tick rate until the command channel closes.
///
/// Commands received between ticks are applied at the start of the next
/// one. Snapshots are serialized once and fanned out to every subscriber;
/// serialization is skipped while nobody is subscribed.
pub async fn run_game_loop(
    mut state: GameState,
    mut commands: mpsc::UnboundedReceiver<Command>,
    snapshots: broadcast::Sender<Utf8Bytes>,
) -> GameState {
    let period = state.config.tick_interval();
    let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_tick = Instant::now();

    loop {
        ticker.tick().await;

        loop {
            match commands.try_recv() {
                Ok(command) => state.queue(command),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!("Command channel closed, stopping game loop after {} ticks", state.tick_count);
                    return state;
                }
            }
        }

        let now = Instant::now();
        let dt = now.duration_since(last_tick).as_secs_f32();
        last_tick = now;

        let snapshot = state.tick(dt);
        if snapshots.receiver_count() > 0 {
            match ServerMessage::State(snapshot).encode() {
                Ok(json) => {
                    // Subscribers may drop between the check and the send.
                    let _ = snapshots.send(Utf8Bytes::from(json));
                }
                Err(e) => warn!("Failed to encode snapshot: {}", e),
            }
        }

        let tick_ms = now.elapsed().as_secs_f64() * 1000.0;
        let tick_budget = period.as_secs_f64() * 1000.0 * 0.9;
        if tick_ms > tick_budget {
            warn!(
                "Slow tick #{}: {:.3}ms (budget: {:.1}ms) - {} players, {} cells total",
                state.tick_count,
                tick_ms,
                tick_budget,
                state.world.players.len(),
                state.world.cell_count()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> Config {
        let mut config = Config::default();
        config.server.bots = 0;
        config.world.size = 2000.0;
        config.world.food_count = 20;
        config.world.virus_count = 0;
        config
    }

    fn state_with_player(id: u32) -> GameState {
        let mut state = GameState::with_seed(config(), 17);
        state.apply(Command::Connect { id });
        state
    }

    fn join(name: &str, color: Option<Rgb>) -> ClientMessage {
        ClientMessage::Join {
            name: Some(name.to_string()),
            skin: Some(4),
            color,
        }
    }

    #[test]
    fn test_commands_wait_for_the_next_tick() {
        let mut state = GameState::with_seed(config(), 1);
        state.queue(Command::Connect { id: 1 });
        assert!(state.world.players.is_empty());

        let snapshot = state.tick(0.05);
        assert_eq!(state.tick_count, 1);
        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.players[0].name, DEFAULT_NAME);

        state.queue(Command::Disconnect { id: 1 });
        assert!(state.tick(0.05).players.is_empty());
    }

    #[test]
    fn test_join_truncates_name_and_sets_cosmetics() {
        let mut state = state_with_player(1);
        let name = "abcdefghijklmnopqrstuvwxyz";
        assert_eq!(state.apply_message(1, join(name, Some([0.0, 0.5, 1.0]))), Ok(()));

        let player = &state.world.players[&1];
        assert_eq!(player.name, "abcdefghijklmnop");
        assert_eq!(player.skin, 4);
        assert_eq!(player.color, [0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_join_with_bad_color_is_dropped_whole() {
        let mut state = state_with_player(1);
        let before = state.world.players[&1].clone();

        for color in [[1.5, 0.0, 0.0], [f32::NAN, 0.0, 0.0], [0.0, -0.1, 0.0]] {
            assert_eq!(
                state.apply_message(1, join("renamed", Some(color))),
                Err(InputError::ColorOutOfRange)
            );
        }
        let player = &state.world.players[&1];
        assert_eq!(player.name, before.name);
        assert_eq!(player.color, before.color);
    }

    #[test]
    fn test_join_respawns_eliminated_player() {
        let mut state = state_with_player(1);
        state.world.players.get_mut(&1).unwrap().cells.clear();

        state.apply_message(1, join("back", None)).unwrap();

        let player = &state.world.players[&1];
        assert_eq!(player.cells.len(), 1);
        assert_eq!(player.cells[0].radius, state.config.player.start_radius);
    }

    #[test]
    fn test_input_sets_direction_and_mouse_target() {
        let mut state = state_with_player(1);
        let origin = state.world.players[&1].cells[0].position;

        state.apply_message(1, ClientMessage::Input { dir: [3.0, 4.0] }).unwrap();
        let player = &state.world.players[&1];
        assert_eq!(player.direction, Vec2::new(3.0, 4.0));
        let target = player.mouse_target.unwrap();
        assert!((target - (origin + Vec2::new(60.0, 80.0))).length() < 1e-3);

        state.apply_message(1, ClientMessage::Input { dir: [0.0, 0.0] }).unwrap();
        let player = &state.world.players[&1];
        assert_eq!(player.direction, Vec2::ZERO);
        assert!(player.mouse_target.is_none());
    }

    #[test]
    fn test_invalid_messages_are_rejected() {
        let mut state = state_with_player(1);
        assert_eq!(
            state.apply_message(1, ClientMessage::Input { dir: [f32::INFINITY, 0.0] }),
            Err(InputError::InvalidDirection)
        );
        assert_eq!(state.world.players[&1].direction, Vec2::ZERO);
        assert_eq!(state.apply_message(9, ClientMessage::Split), Err(InputError::UnknownPlayer(9)));
        assert_eq!(state.apply_message(1, ClientMessage::Unknown), Ok(()));
    }

    #[test]
    fn test_split_and_eject_messages_act_immediately() {
        let mut state = state_with_player(1);
        {
            let player = state.world.players.get_mut(&1).unwrap();
            player.cells[0].position = Vec2::ZERO;
            player.cells[0].radius = 80.0;
        }
        state.apply_message(1, ClientMessage::Input { dir: [1.0, 0.0] }).unwrap();
        let foods = state.world.foods.len();

        state.apply_message(1, ClientMessage::Eject).unwrap();
        assert_eq!(state.world.foods.len(), foods + 1);
        state.apply_message(1, ClientMessage::Split).unwrap();
        assert_eq!(state.world.players[&1].cells.len(), 2);
    }

    #[test]
    fn test_tick_keeps_food_topped_up_and_clamps_step() {
        let mut config = config();
        config.server.max_step_secs = 0.1;
        let mut state = GameState::with_seed(config, 2);
        assert_eq!(state.step(5.0), 0.1);
        assert_eq!(state.step(0.05), 0.05);

        state.apply(Command::Connect { id: 1 });
        for _ in 0..20 {
            let snapshot = state.tick(0.05);
            assert_eq!(snapshot.foods.len(), 20);
            assert!(snapshot.leaderboard.len() <= 10);
        }
    }

    #[test]
    fn test_border_cell_that_eats_stays_inside() {
        let mut state = state_with_player(1);
        let edge = -state.config.world.size / 2.0;
        let food_id = state.world.ids.next_id();
        state.world.foods.push(crate::entity::Food::new(food_id, Vec2::new(edge + 20.0, 0.0), 15.0, [1.0, 1.0, 1.0]));
        {
            let cell = &mut state.world.players.get_mut(&1).unwrap().cells[0];
            cell.position = Vec2::new(edge + 20.0, 0.0);
            cell.radius = 20.0;
        }

        let snapshot = state.tick(0.05);

        let cell = &snapshot.players[0].cells[0];
        assert!(cell.radius > 20.0);
        assert!(cell.x >= edge + cell.radius - 1e-3);
    }

    #[test]
    fn test_bots_rank_ahead_of_later_players_on_ties() {
        let mut config = config();
        config.server.bots = 2;
        let mut state = GameState::with_seed(config, 6);
        let id = state.world.player_ids.next_id();
        state.apply(Command::Connect { id });
        for player in state.world.players.values_mut() {
            player.cells[0].radius = 20.0;
        }

        let order: Vec<u32> = state.world.players.keys().copied().collect();
        let mut expected = state.bots.bots.clone();
        expected.push(id);
        assert_eq!(order, expected);

        let board = snapshot::leaderboard(&state.world);
        assert_eq!(board.len(), 3);
        assert!(board.iter().all(|e| e.score == board[0].score));
        assert_eq!(board[2].name, DEFAULT_NAME);
    }

    #[test]
    fn test_bots_respawn_at_the_next_tick() {
        let mut config = config();
        config.server.bots = 2;
        let mut state = GameState::with_seed(config, 3);
        assert_eq!(state.world.players.len(), 2);

        let bot_id = state.bots.bots[0];
        state.world.players.get_mut(&bot_id).unwrap().cells.clear();
        state.tick(0.05);
        assert!(!state.world.players[&bot_id].is_eliminated());
    }

    #[test]
    fn test_eaten_player_stays_registered_until_disconnect() {
        let mut state = GameState::with_seed(config(), 4);
        state.apply(Command::Connect { id: 1 });
        state.apply(Command::Connect { id: 2 });
        for (id, radius) in [(1, 60.0), (2, 20.0)] {
            let cell = &mut state.world.players.get_mut(&id).unwrap().cells[0];
            cell.position = Vec2::new(0.0, 0.0);
            cell.radius = radius;
        }

        let snapshot = state.tick(0.0);

        assert!(state.world.players[&2].is_eliminated());
        assert_eq!(snapshot.players.len(), 2);
        assert_eq!(snapshot.leaderboard.len(), 2);
        assert_eq!(snapshot.leaderboard[0].score, state.world.players[&1].score());
        assert_eq!(snapshot.leaderboard[1].score, 0);
    }

    #[tokio::test]
    async fn test_game_loop_broadcasts_snapshots() {
        let mut config = config();
        config.server.tick_rate = 100;
        let state = GameState::with_seed(config, 5);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, mut snapshot_rx) = broadcast::channel(16);
        let handle = tokio::spawn(run_game_loop(state, command_rx, snapshot_tx));

        command_tx.send(Command::Connect { id: 7 }).unwrap();
        let frame = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let frame = match snapshot_rx.recv().await {
                    Ok(frame) => frame,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(e) => panic!("snapshot channel failed: {e}"),
                };
                let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
                if value["players"].as_array().is_some_and(|p| !p.is_empty()) {
                    break value;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(frame["type"], "state");
        assert_eq!(frame["players"][0]["id"], 7);

        drop(command_tx);
        let state = tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
        assert!(state.tick_count > 0);
    }
}
