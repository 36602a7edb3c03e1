//! The simulation loop.
//!
//! The driver owns the `World` and is the only code that mutates it.
//! Connection handlers talk to it through the event queue; it talks back
//! by queueing snapshot frames on the session outboxes.

use std::sync::Arc;

use skirmish_persist::Store;
use skirmish_protocol::encode_snapshot;
use skirmish_sim::{SimEvent, World};
use skirmish_tick::TickScheduler;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::server::ServerState;

pub(crate) struct Driver {
    world: World,
    scheduler: TickScheduler,
    events: mpsc::UnboundedReceiver<SimEvent>,
    store: Store,
    state: Arc<ServerState>,
    /// The background save in flight, if any.
    saving: Option<JoinHandle<()>>,
}

impl Driver {
    pub(crate) fn new(
        world: World,
        scheduler: TickScheduler,
        events: mpsc::UnboundedReceiver<SimEvent>,
        store: Store,
        state: Arc<ServerState>,
    ) -> Self {
        Self {
            world,
            scheduler,
            events,
            store,
            state,
            saving: None,
        }
    }

    /// Ticks until `shutdown` turns `true` or its sender goes away, then
    /// closes every connection and writes a final save.
    pub(crate) async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            tick = self.world.tick(),
            rate = self.scheduler.tick_rate_hz(),
            "simulation started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = self.scheduler.wait_for_tick() => self.tick().await,
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.finish().await;
    }

    async fn tick(&mut self) {
        let mut drained = 0usize;
        while let Ok(event) = self.events.try_recv() {
            self.world.apply(event);
            drained += 1;
        }

        let report = self.world.step();
        trace!(tick = report.tick, drained, "world stepped");

        if report.broadcast {
            let frame: Arc<str> = encode_snapshot(&self.world.snapshot()).into();
            let sent = self.state.registry.lock().await.broadcast(&frame);
            trace!(tick = report.tick, sent, "snapshot broadcast");
        }
        if report.persist {
            self.save_in_background();
        }

        self.scheduler.record_tick_end();
    }

    /// Writes a save off the simulation thread. Skipped while the previous
    /// save is still running; the next interval tries again.
    fn save_in_background(&mut self) {
        if self.saving.as_ref().is_some_and(|h| !h.is_finished()) {
            warn!(tick = self.world.tick(), "previous save still running, skipping");
            return;
        }

        let saved = self.world.to_saved();
        let store = self.store.clone();
        self.saving = Some(tokio::task::spawn_blocking(move || {
            match store.save(&saved) {
                Ok(()) => debug!(tick = saved.tick, players = saved.players.len(), "world saved"),
                Err(e) => warn!(error = %e, "save failed, will retry next interval"),
            }
        }));
    }

    async fn finish(mut self) {
        let closed = self.state.registry.lock().await.close_all();
        info!(closed, tick = self.world.tick(), "simulation stopping");

        if let Some(pending) = self.saving.take() {
            let _ = pending.await;
        }

        let saved = self.world.to_saved();
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || store.save(&saved)).await {
            Ok(Ok(())) => info!(path = %self.store.path().display(), "final save written"),
            Ok(Err(e)) => error!(error = %e, "final save failed"),
            Err(e) => error!(error = %e, "final save task failed"),
        }

        let metrics = self.scheduler.metrics();
        info!(
            ticks = metrics.total_ticks,
            overruns = metrics.total_overruns,
            max_tick_ms = metrics.max_tick_time.as_secs_f64() * 1000.0,
            "simulation stopped"
        );
    }
}
