//! `SkirmishServer` builder and accept loop.
//!
//! This is the entry point for running a Skirmish server. It ties the
//! layers together: transport → protocol → session → simulation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use skirmish_persist::Store;
use skirmish_protocol::write_map;
use skirmish_session::{PlayerIdAllocator, SessionRegistry};
use skirmish_sim::{CollisionGrid, SimEvent, TileGrid, World};
use skirmish_tick::TickScheduler;
use skirmish_transport::{TcpLineTransport, Transport};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::driver::Driver;
use crate::handler::handle_connection;
use crate::{ServerConfig, SkirmishError};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. Everything
/// here is either immutable after startup or behind its own lock.
pub(crate) struct ServerState {
    pub(crate) registry: Mutex<SessionRegistry>,
    pub(crate) allocator: PlayerIdAllocator,
    pub(crate) grid: Arc<TileGrid>,
    /// The `MAP` block, rendered once at startup.
    pub(crate) map_block: Arc<str>,
    pub(crate) seed: u64,
    pub(crate) tick_rate: u32,
    pub(crate) spawn_min_distance: f32,
    pub(crate) join_timeout: Duration,
    pub(crate) write_timeout: Duration,
    pub(crate) events: mpsc::UnboundedSender<SimEvent>,
}

/// Builder for configuring and starting a Skirmish server.
///
/// # Example
///
/// ```rust,ignore
/// use skirmish::prelude::*;
///
/// let server = SkirmishServer::builder()
///     .config(ServerConfig::load(Path::new("skirmish.toml"))?)
///     .build()
///     .await?;
/// server.run(shutdown_rx).await
/// ```
pub struct SkirmishServerBuilder {
    config: ServerConfig,
    listen_addr: Option<String>,
}

impl SkirmishServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            listen_addr: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the full `host:port` address to bind, overriding the config.
    pub fn bind(mut self, addr: &str) -> Self {
        self.listen_addr = Some(addr.to_string());
        self
    }

    /// Forces the world seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.server.seed = Some(seed);
        self
    }

    /// Sets where the world is saved.
    pub fn save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.server.save_path = path.into();
        self
    }

    /// Builds the world and binds the listener.
    ///
    /// Players saved for the same seed are restored and registered as
    /// ghosts, so their owners can resume them. A save that cannot be
    /// read is logged and ignored.
    pub async fn build(self) -> Result<SkirmishServer, SkirmishError> {
        let config = self.config;
        let seed = config.server.seed.unwrap_or_else(derive_seed);
        let tick_config = config.tick_config();
        let tick_rate = tick_config.tick_rate_hz;

        let grid = Arc::new(TileGrid::generate(seed, config.map.width, config.map.height));
        let mut map_block = String::new();
        write_map(
            grid.width(),
            grid.height(),
            |x, y| grid.is_wall_tile(x as i32, y as i32),
            &mut map_block,
        )?;

        let mut world = World::new(
            seed,
            tick_rate,
            Arc::clone(&grid) as Arc<dyn CollisionGrid>,
            config.sim.clone(),
        );
        world.set_persist_interval(config.server.persist_interval_secs);

        let mut registry = SessionRegistry::new();
        let allocator = PlayerIdAllocator::new();
        let store = Store::new(&config.server.save_path);
        match store.load(seed) {
            Ok(Some(saved)) => {
                for record in &saved.players {
                    registry.register_ghost(record.id, record.name.clone(), record.token);
                    allocator.advance_past(record.id);
                }
                world.restore(saved);
            }
            Ok(None) => debug!(path = %store.path().display(), "no save to restore"),
            Err(e) => warn!(error = %e, "could not load save, starting fresh"),
        }

        let addr = self.listen_addr.unwrap_or_else(|| config.listen_addr());
        let transport = TcpLineTransport::bind(&addr).await?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let state = Arc::new(ServerState {
            registry: Mutex::new(registry),
            allocator,
            grid,
            map_block: map_block.into(),
            seed,
            tick_rate,
            spawn_min_distance: config.sim.player.spawn_min_distance,
            join_timeout: config.server.join_timeout(),
            write_timeout: config.server.write_timeout(),
            events: events_tx,
        });

        let driver = Driver::new(
            world,
            TickScheduler::new(tick_config),
            events_rx,
            store,
            Arc::clone(&state),
        );

        Ok(SkirmishServer {
            transport,
            state,
            driver,
        })
    }
}

impl Default for SkirmishServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Skirmish server, ready to run.
///
/// Call [`run()`](Self::run) to start the simulation and accept
/// connections.
pub struct SkirmishServer {
    transport: TcpLineTransport,
    state: Arc<ServerState>,
    driver: Driver,
}

impl SkirmishServer {
    /// Creates a new builder.
    pub fn builder() -> SkirmishServerBuilder {
        SkirmishServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The world seed in use.
    pub fn seed(&self) -> u64 {
        self.state.seed
    }

    pub fn tick_rate(&self) -> u32 {
        self.state.tick_rate
    }

    /// Runs the simulation and the accept loop until `shutdown` turns
    /// `true` (or its sender is dropped).
    ///
    /// On shutdown the accept loop stops, every connection is closed and
    /// the world is saved one last time before this returns.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), SkirmishError> {
        let Self {
            mut transport,
            state,
            driver,
        } = self;

        info!(
            seed = state.seed as i64,
            tick_rate = state.tick_rate,
            "Skirmish server running"
        );
        let driver_task = tokio::spawn(driver.run(shutdown.clone()));

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                accepted = transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "accept failed");
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("accept loop stopped");
        transport.shutdown().await?;
        if let Err(e) = driver_task.await {
            error!(error = %e, "simulation driver failed");
        }
        Ok(())
    }
}

/// A fresh seed from the wall clock mixed with a random draw.
fn derive_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    nanos ^ rand::random::<u64>()
}
