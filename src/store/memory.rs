use std::collections::{BTreeSet, HashMap};

use rand::seq::IteratorRandom;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use super::{Record, WriteOp};
use crate::clients::StoreClient;
use crate::error::StoreError;
use crate::messages::StoreRequest;

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Text(String),
    Record(Record),
    Set(BTreeSet<String>),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Record(_) => "record",
            Value::Set(_) => "set",
        }
    }
}

fn wrong_type(key: &str, found: &Value) -> StoreError {
    StoreError::WrongType(format!("{key} holds a {}", found.type_name()))
}

/// In-process store actor. Requests are handled one at a time, so every
/// request (including a whole batch) is atomic with respect to the others.
pub struct MemoryStore {
    receiver: mpsc::Receiver<StoreRequest>,
    data: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new(buffer_size: usize) -> (Self, StoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let store = Self {
            receiver,
            data: HashMap::new(),
        };
        (store, StoreClient::new(sender))
    }

    #[instrument(name = "memory_store", skip(self))]
    pub async fn run(mut self) {
        info!("MemoryStore starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::Get { key, respond_to } => {
                    let _ = respond_to.send(self.get(&key));
                }
                StoreRequest::Set { key, value, respond_to } => {
                    self.data.insert(key, Value::Text(value));
                    let _ = respond_to.send(Ok(()));
                }
                StoreRequest::Delete { key, respond_to } => {
                    let _ = respond_to.send(Ok(self.data.remove(&key).is_some()));
                }
                StoreRequest::GetRecord { key, respond_to } => {
                    let _ = respond_to.send(self.get_record(&key));
                }
                StoreRequest::SetRecord { key, record, respond_to } => {
                    let _ = respond_to.send(self.set_record(key, record));
                }
                StoreRequest::UpdateRecord { key, fields, respond_to } => {
                    let _ = respond_to.send(self.update_record(&key, fields));
                }
                StoreRequest::SetAdd { key, member, respond_to } => {
                    let _ = respond_to.send(self.set_add(key, vec![member]).map(|added| added > 0));
                }
                StoreRequest::SetRemove { key, member, respond_to } => {
                    let _ = respond_to.send(self.set_remove(&key, &member));
                }
                StoreRequest::SetContains { key, member, respond_to } => {
                    let _ = respond_to.send(self.set(&key).map(|s| s.is_some_and(|s| s.contains(&member))));
                }
                StoreRequest::SetMembers { key, respond_to } => {
                    let members = self
                        .set(&key)
                        .map(|s| s.map(|s| s.iter().cloned().collect()).unwrap_or_default());
                    let _ = respond_to.send(members);
                }
                StoreRequest::SetRandom { key, respond_to } => {
                    let picked = self
                        .set(&key)
                        .map(|s| s.and_then(|s| s.iter().choose(&mut rand::thread_rng()).cloned()));
                    let _ = respond_to.send(picked);
                }
                StoreRequest::WriteBatch { ops, respond_to } => {
                    let _ = respond_to.send(self.handle_write_batch(ops));
                }
                StoreRequest::Shutdown => {
                    info!("MemoryStore shutting down");
                    break;
                }
                #[cfg(test)]
                StoreRequest::KeyCount { respond_to } => {
                    let _ = respond_to.send(Ok(self.data.len()));
                }
            }
        }
        info!("MemoryStore stopped");
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.data.get(key) {
            None => Ok(None),
            Some(Value::Text(text)) => Ok(Some(text.clone())),
            Some(other) => Err(wrong_type(key, other)),
        }
    }

    fn get_record(&self, key: &str) -> Result<Option<Record>, StoreError> {
        match self.data.get(key) {
            None => Ok(None),
            Some(Value::Record(record)) => Ok(Some(record.clone())),
            Some(other) => Err(wrong_type(key, other)),
        }
    }

    fn set(&self, key: &str) -> Result<Option<&BTreeSet<String>>, StoreError> {
        match self.data.get(key) {
            None => Ok(None),
            Some(Value::Set(set)) => Ok(Some(set)),
            Some(other) => Err(wrong_type(key, other)),
        }
    }

    fn set_record(&mut self, key: String, record: Record) -> Result<(), StoreError> {
        match self.data.get(&key) {
            None | Some(Value::Record(_)) => {
                self.data.insert(key, Value::Record(record));
                Ok(())
            }
            Some(other) => Err(wrong_type(&key, other)),
        }
    }

    fn update_record(&mut self, key: &str, fields: Record) -> Result<bool, StoreError> {
        match self.data.get_mut(key) {
            None => Ok(false),
            Some(Value::Record(record)) => {
                record.extend(fields);
                Ok(true)
            }
            Some(other) => Err(wrong_type(key, other)),
        }
    }

    fn set_add(&mut self, key: String, members: Vec<String>) -> Result<usize, StoreError> {
        let entry = self
            .data
            .entry(key.clone())
            .or_insert_with(|| Value::Set(BTreeSet::new()));
        match entry {
            Value::Set(set) => Ok(members.into_iter().filter(|m| set.insert(m.clone())).count()),
            other => Err(wrong_type(&key, other)),
        }
    }

    fn set_remove(&mut self, key: &str, member: &str) -> Result<bool, StoreError> {
        let removed = match self.data.get_mut(key) {
            None => return Ok(false),
            Some(Value::Set(set)) => set.remove(member),
            Some(other) => return Err(wrong_type(key, other)),
        };
        // Empty sets disappear, like any other deleted key.
        if matches!(self.data.get(key), Some(Value::Set(set)) if set.is_empty()) {
            self.data.remove(key);
        }
        Ok(removed)
    }

    /// Applies every op or none of them.
    #[instrument(skip(self, ops), fields(ops = ops.len()))]
    fn handle_write_batch(&mut self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut undo: HashMap<String, Option<Value>> = HashMap::new();
        for op in ops {
            if let Err(e) = self.apply(op, &mut undo) {
                warn!(error = %e, "Batch rejected, rolling back");
                for (key, original) in undo {
                    match original {
                        Some(value) => self.data.insert(key, value),
                        None => self.data.remove(&key),
                    };
                }
                return Err(e);
            }
        }
        debug!("Batch applied");
        Ok(())
    }

    fn apply(
        &mut self,
        op: WriteOp,
        undo: &mut HashMap<String, Option<Value>>,
    ) -> Result<(), StoreError> {
        let mut remember = |data: &HashMap<String, Value>, key: &str| {
            undo.entry(key.to_string())
                .or_insert_with(|| data.get(key).cloned());
        };

        match op {
            WriteOp::RequireAbsent { set, member } => {
                if self.set(&set)?.is_some_and(|s| s.contains(&member)) {
                    return Err(StoreError::Conflict(format!("{member} already in {set}")));
                }
            }
            WriteOp::RequirePresent { set, member } => {
                if !self.set(&set)?.is_some_and(|s| s.contains(&member)) {
                    return Err(StoreError::Conflict(format!("{member} missing from {set}")));
                }
            }
            WriteOp::Set { key, value } => {
                remember(&self.data, &key);
                self.data.insert(key, Value::Text(value));
            }
            WriteOp::Delete { key } => {
                remember(&self.data, &key);
                self.data.remove(&key);
            }
            WriteOp::SetRecord { key, record } => {
                remember(&self.data, &key);
                self.set_record(key, record)?;
            }
            WriteOp::SetAdd { key, members } => {
                remember(&self.data, &key);
                self.set_add(key, members)?;
            }
            WriteOp::SetRemove { key, member } => {
                remember(&self.data, &key);
                self.set_remove(&key, &member)?;
            }
        }
        Ok(())
    }
}
