use tokio::sync::oneshot;

use crate::domain::{InboundEvent, Operation};
use crate::error::{DispatchError, StoreError};
use crate::store::{Record, WriteOp};

/// Generic type aliases for service communication
pub type ServiceResult<T, E> = std::result::Result<T, E>;
pub type ServiceResponse<T, E> = oneshot::Sender<ServiceResult<T, E>>;

/// Requests understood by the store actor. Each variant carries a oneshot
/// channel for the response.
#[derive(Debug)]
pub enum StoreRequest {
    Get {
        key: String,
        respond_to: ServiceResponse<Option<String>, StoreError>,
    },
    Set {
        key: String,
        value: String,
        respond_to: ServiceResponse<(), StoreError>,
    },
    Delete {
        key: String,
        respond_to: ServiceResponse<bool, StoreError>,
    },
    GetRecord {
        key: String,
        respond_to: ServiceResponse<Option<Record>, StoreError>,
    },
    SetRecord {
        key: String,
        record: Record,
        respond_to: ServiceResponse<(), StoreError>,
    },
    UpdateRecord {
        key: String,
        fields: Record,
        respond_to: ServiceResponse<bool, StoreError>,
    },
    SetAdd {
        key: String,
        member: String,
        respond_to: ServiceResponse<bool, StoreError>,
    },
    SetRemove {
        key: String,
        member: String,
        respond_to: ServiceResponse<bool, StoreError>,
    },
    SetContains {
        key: String,
        member: String,
        respond_to: ServiceResponse<bool, StoreError>,
    },
    SetMembers {
        key: String,
        respond_to: ServiceResponse<Vec<String>, StoreError>,
    },
    SetRandom {
        key: String,
        respond_to: ServiceResponse<Option<String>, StoreError>,
    },
    WriteBatch {
        ops: Vec<WriteOp>,
        respond_to: ServiceResponse<(), StoreError>,
    },
    Shutdown,
    #[cfg(test)]
    KeyCount {
        respond_to: ServiceResponse<usize, StoreError>,
    },
}

#[derive(Debug)]
pub enum RouterRequest {
    Dispatch {
        event: InboundEvent,
        respond_to: ServiceResponse<Operation, DispatchError>,
    },
    Shutdown,
    #[cfg(test)]
    ActiveWorkers {
        respond_to: ServiceResponse<usize, DispatchError>,
    },
}
