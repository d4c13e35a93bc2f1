use tokio::sync::mpsc;

use crate::domain::{InboundEvent, Operation};
use crate::error::DispatchError;
use crate::messages::RouterRequest;

/// Entry point for inbound events. Cheap to clone; every clone feeds the same router.
#[derive(Clone, Debug)]
pub struct ConversationClient {
    sender: mpsc::Sender<RouterRequest>,
}

impl ConversationClient {
    pub fn new(sender: mpsc::Sender<RouterRequest>) -> Self {
        Self { sender }
    }

    pub async fn shutdown(&self) -> Result<(), DispatchError> {
        self.sender
            .send(RouterRequest::Shutdown)
            .await
            .map_err(|_| DispatchError::ActorCommunicationError("Actor closed".to_string()))
    }

    /// Number of conversation workers currently alive.
    #[cfg(test)]
    pub async fn active_workers(&self) -> Result<usize, DispatchError> {
        let (respond_to, response) = tokio::sync::oneshot::channel();
        self.sender
            .send(RouterRequest::ActiveWorkers { respond_to })
            .await
            .map_err(|_| DispatchError::ActorCommunicationError("Actor closed".to_string()))?;
        response
            .await
            .map_err(|_| DispatchError::ActorCommunicationError("Actor dropped response".to_string()))?
    }
}

crate::client_method!(ConversationClient => fn dispatch(event: InboundEvent) -> Operation as RouterRequest::Dispatch, Error = DispatchError);
