use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use crate::clients::{ConversationClient, StoreClient};
use crate::config::{AppConfig, SessionBackend};
use crate::controller::Controller;
use crate::domain::{InboundEvent, Operation};
use crate::error::DispatchError;
use crate::flows::FlowContext;
use crate::messages::{RouterRequest, ServiceResponse};
use crate::notify::Transport;
use crate::session_store::{KvSessionStore, MemorySessionStore, SessionStore};
use crate::store::{KvStore, MemoryStore};

type Job = (InboundEvent, ServiceResponse<Operation, DispatchError>);

struct Worker {
    queue: mpsc::UnboundedSender<Job>,
    /// Held by the conversation's worker for its whole life, so a replacement
    /// worker starts only after the previous one has drained its queue.
    turn: Arc<Mutex<()>>,
}

/// Fans inbound events out to one serial worker per conversation, so a
/// conversation never sees two of its events handled at once while different
/// conversations proceed in parallel. A worker stops after `idle` without
/// events and is started again by the next event for its conversation.
pub struct ConversationRouter {
    receiver: mpsc::Receiver<RouterRequest>,
    controller: Arc<Controller>,
    idle: Duration,
    workers: HashMap<String, Worker>,
    running: JoinSet<String>,
}

impl ConversationRouter {
    pub fn new(
        buffer_size: usize,
        idle: Duration,
        controller: Arc<Controller>,
    ) -> (Self, ConversationClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let router = Self {
            receiver,
            controller,
            idle,
            workers: HashMap::new(),
            running: JoinSet::new(),
        };
        (router, ConversationClient::new(sender))
    }

    #[instrument(name = "conversation_router", skip(self))]
    pub async fn run(mut self) {
        info!("ConversationRouter starting");
        loop {
            tokio::select! {
                msg = self.receiver.recv() => match msg {
                    Some(RouterRequest::Dispatch { event, respond_to }) => {
                        self.route(event, respond_to);
                    }
                    #[cfg(test)]
                    Some(RouterRequest::ActiveWorkers { respond_to }) => {
                        let _ = respond_to.send(Ok(self.workers.len()));
                    }
                    Some(RouterRequest::Shutdown) | None => {
                        info!("ConversationRouter shutting down");
                        break;
                    }
                },
                Some(finished) = self.running.join_next(), if !self.running.is_empty() => {
                    self.reap(finished);
                }
            }
        }

        // Dropping the queues lets every worker finish what it already accepted.
        self.workers.clear();
        while let Some(finished) = self.running.join_next().await {
            if let Err(e) = finished {
                error!("Conversation worker failed: {:?}", e);
            }
        }
        info!("ConversationRouter stopped");
    }

    fn route(&mut self, event: InboundEvent, respond_to: ServiceResponse<Operation, DispatchError>) {
        let conversation = event.conversation_id.clone();
        let mut job = (event, respond_to);

        let turn = match self.workers.get(&conversation) {
            Some(worker) => match worker.queue.send(job) {
                Ok(()) => return,
                Err(mpsc::error::SendError(returned)) => {
                    debug!(conversation = %conversation, "Worker stopped, starting a new one");
                    job = returned;
                    worker.turn.clone()
                }
            },
            None => Arc::new(Mutex::new(())),
        };

        let queue = self.spawn_worker(conversation.clone(), turn.clone());
        if let Err(mpsc::error::SendError((_, respond_to))) = queue.send(job) {
            let _ = respond_to.send(Err(DispatchError::ActorCommunicationError(
                "Conversation worker unavailable".to_string(),
            )));
            return;
        }
        self.workers.insert(conversation, Worker { queue, turn });
    }

    fn spawn_worker(&mut self, conversation: String, turn: Arc<Mutex<()>>) -> mpsc::UnboundedSender<Job> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.running.spawn(conversation_worker(
            conversation,
            receiver,
            turn,
            self.controller.clone(),
            self.idle,
        ));
        sender
    }

    /// Forgets a stopped worker unless a replacement already took its place.
    fn reap(&mut self, finished: Result<String, JoinError>) {
        match finished {
            Ok(conversation) => {
                if self
                    .workers
                    .get(&conversation)
                    .is_some_and(|worker| worker.queue.is_closed())
                {
                    self.workers.remove(&conversation);
                }
            }
            Err(e) => {
                error!("Conversation worker failed: {:?}", e);
                self.workers.retain(|_, worker| !worker.queue.is_closed());
            }
        }
    }
}

#[instrument(skip(queue, turn, controller, idle))]
async fn conversation_worker(
    conversation: String,
    mut queue: mpsc::UnboundedReceiver<Job>,
    turn: Arc<Mutex<()>>,
    controller: Arc<Controller>,
    idle: Duration,
) -> String {
    let _turn = turn.lock_owned().await;
    debug!("Conversation worker started");
    loop {
        match timeout(idle, queue.recv()).await {
            Ok(Some(job)) => handle_job(&controller, job).await,
            Ok(None) => break,
            Err(_) => {
                // Refuse new jobs, then finish the ones that raced the timeout.
                queue.close();
                while let Some(job) = queue.recv().await {
                    handle_job(&controller, job).await;
                }
                debug!("Conversation worker idle");
                break;
            }
        }
    }
    debug!("Conversation worker stopped");
    conversation
}

async fn handle_job(controller: &Controller, (event, respond_to): Job) {
    let result = controller.handle(event).await.map_err(DispatchError::from);
    let _ = respond_to.send(result);
}

/// The main application system that orchestrates all actors.
///
/// Responsible for starting up actors, wiring them together, and handling shutdown.
pub struct ShopSystem {
    pub client: ConversationClient,
    pub store: StoreClient,
    router_handle: JoinHandle<()>,
    store_handle: JoinHandle<()>,
}

impl ShopSystem {
    pub fn new(config: AppConfig, transport: Arc<dyn Transport>) -> Self {
        // 1. Store actor
        let (store_actor, store) = MemoryStore::new(config.channel_buffer);
        let store_handle = tokio::spawn(store_actor.run());
        let kv: Arc<dyn KvStore> = Arc::new(store.clone());

        // 2. Sessions
        let sessions: Arc<dyn SessionStore> = match config.session_backend {
            SessionBackend::Memory => {
                warn!("Sessions are kept in memory; conversations in progress are lost on restart");
                Arc::new(MemorySessionStore::new())
            }
            SessionBackend::Store => Arc::new(KvSessionStore::new(kv.clone())),
        };
        if config.admin_ids.is_empty() {
            warn!("ADMIN_IDS is empty; admin features are unreachable");
        }

        // 3. Controller behind the conversation router
        let ctx = FlowContext::new(kv, transport, config.admin_ids.clone());
        let controller = Arc::new(Controller::new(sessions, ctx));
        let (router, client) = ConversationRouter::new(config.channel_buffer, config.worker_idle, controller);
        let router_handle = tokio::spawn(router.run());

        info!(admins = config.admin_ids.iter().count(), "Shop system started");
        Self {
            client,
            store,
            router_handle,
            store_handle,
        }
    }

    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down system...");

        // Router first so in-flight turns can still reach the store.
        self.client.shutdown().await.map_err(|e| e.to_string())?;
        if let Err(e) = self.router_handle.await {
            error!("Router task failed: {:?}", e);
            return Err(format!("Router task failed: {:?}", e));
        }

        self.store.shutdown().await.map_err(|e| e.to_string())?;
        if let Err(e) = self.store_handle.await {
            error!("Store task failed: {:?}", e);
            return Err(format!("Store task failed: {:?}", e));
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
