//! Game server implementation.
//!
//! The transport owns no game state. Each connection forwards decoded
//! messages to the game loop as [`Command`]s and relays the serialized
//! snapshots it broadcasts.

use crate::config::Config;
use crate::world::PlayerIds;
use futures_util::{SinkExt, StreamExt};
use protocol::{ClientMessage, ServerMessage, Welcome};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};
use tracing::{debug, error, info, warn};

pub mod game;

pub use game::{Command, GameState, InputError, run_game_loop};

/// Snapshots buffered per subscriber before it starts lagging.
const SNAPSHOT_BUFFER: usize = 8;

/// Connection tracking state (shared across connection handlers).
#[derive(Debug)]
struct ConnectionState {
    /// Player ids, shared with the game's bot manager.
    player_ids: PlayerIds,
    /// Total number of connections.
    total_connections: AtomicUsize,
}

impl ConnectionState {
    fn new(player_ids: PlayerIds) -> Self {
        Self {
            player_ids,
            total_connections: AtomicUsize::new(0),
        }
    }

    /// Try to add a connection, returns false if the limit is reached.
    fn try_add_connection(&self, max_total: usize) -> bool {
        self.total_connections
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max_total).then_some(n + 1))
            .is_ok()
    }

    /// Allocate a player id and queue its `Connect` under the same lock, so
    /// the game registers players in id order.
    fn register(&self, commands: &mpsc::UnboundedSender<Command>) -> anyhow::Result<u32> {
        self.player_ids
            .register(|id| commands.send(Command::Connect { id }).map(|()| id))
            .map_err(Into::into)
    }

    /// Remove a connection.
    fn remove_connection(&self) {
        self.total_connections.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Run the game server.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on ws://{}", addr);

    let (command_tx, command_rx) = mpsc::unbounded_channel::<Command>();
    let (snapshot_tx, _) = broadcast::channel::<Utf8Bytes>(SNAPSHOT_BUFFER);

    let max_connections = config.server.max_connections;
    let world_size = config.world.size;
    let state = GameState::new(config);
    let connections = Arc::new(ConnectionState::new(state.world.player_ids.clone()));
    tokio::spawn(run_game_loop(state, command_rx, snapshot_tx.clone()));

    loop {
        let (stream, addr) = listener.accept().await?;
        if !connections.try_add_connection(max_connections) {
            warn!("Connection rejected (limit reached): {}", addr);
            continue;
        }

        let connections = Arc::clone(&connections);
        let commands = command_tx.clone();
        let snapshots = snapshot_tx.subscribe();
        tokio::spawn(async move {
            let result = handle_connection(stream, addr, &connections, world_size, commands, snapshots).await;

            // Always remove from connection tracking when done
            connections.remove_connection();

            if let Err(e) = result {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    connections: &ConnectionState,
    world_size: f32,
    commands: mpsc::UnboundedSender<Command>,
    mut snapshots: broadcast::Receiver<Utf8Bytes>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    let id = connections.register(&commands)?;
    info!("New connection from {} as player {}", addr, id);

    let (mut write, mut read) = ws_stream.split();

    let welcome = ServerMessage::Welcome(Welcome { id, world_size }).encode()?;
    let result = match write.send(Message::text(welcome)).await {
        Ok(()) => relay(id, addr, &commands, &mut snapshots, &mut write, &mut read).await,
        Err(e) => Err(e.into()),
    };

    // Deferred to the next tick like every other command.
    let _ = commands.send(Command::Disconnect { id });
    result
}

/// Pump inbound messages and outbound snapshots until either side closes.
async fn relay<W, R>(
    id: u32,
    addr: SocketAddr,
    commands: &mpsc::UnboundedSender<Command>,
    snapshots: &mut broadcast::Receiver<Utf8Bytes>,
    write: &mut W,
    read: &mut R,
) -> anyhow::Result<()>
where
    W: futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    R: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match ClientMessage::parse(&text) {
                        Ok(message) => {
                            if commands.send(Command::Message { id, message }).is_err() {
                                // Game loop is gone.
                                return Ok(());
                            }
                        }
                        Err(e) => warn!("Bad message from {}: {}", addr, e),
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Client {} disconnected", addr);
                        return Ok(());
                    }
                    Some(Err(e)) => return Err(e.into()),
                    _ => {}
                }
            }
            snapshot = snapshots.recv() => {
                match snapshot {
                    Ok(frame) => write.send(Message::Text(frame)).await?,
                    Err(RecvError::Lagged(skipped)) => debug!("Client {} skipped {} snapshots", addr, skipped),
                    Err(RecvError::Closed) => return Ok(()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_limit() {
        let state = ConnectionState::new(PlayerIds::new());
        assert!(state.try_add_connection(2));
        assert!(state.try_add_connection(2));
        assert!(!state.try_add_connection(2));

        state.remove_connection();
        assert!(state.try_add_connection(2));
    }

    #[test]
    fn test_players_register_after_existing_bots() {
        let mut config = Config::default();
        config.server.bots = 2;
        config.world.food_count = 0;
        config.world.virus_count = 0;
        let game = GameState::with_seed(config, 1);
        let state = ConnectionState::new(game.world.player_ids.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert_eq!(state.register(&tx).unwrap(), 3);
        assert_eq!(state.register(&tx).unwrap(), 4);
        assert!(matches!(rx.try_recv(), Ok(Command::Connect { id: 3 })));
        assert!(matches!(rx.try_recv(), Ok(Command::Connect { id: 4 })));

        drop(rx);
        assert!(state.register(&tx).is_err());
    }
}
