// Copyright (c) 2024-2025 The dmk developers

//! In-memory session registry

use std::{collections::HashMap, sync::Arc, sync::Mutex};

use log::debug;

use crate::{
    device::DeviceId,
    error::SessionError,
    session::{DeviceSession, SessionId},
};

/// All live sessions of one SDK instance.
///
/// Single process, single map; created with the SDK and drained at
/// teardown. Removal closes the session, there is never a registered
/// session whose connection was left behind.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, Arc<DeviceSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly connected session
    pub fn add(&self, session: DeviceSession) -> Arc<DeviceSession> {
        let session = Arc::new(session);
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id().clone(), session.clone());
        session
    }

    /// Close a session and drop it from the registry
    pub fn remove(&self, id: &SessionId) -> Option<Arc<DeviceSession>> {
        let session = self.sessions.lock().unwrap().remove(id)?;

        debug!("session {} removed", id);
        session.close();

        Some(session)
    }

    pub fn get(&self, id: &SessionId) -> Result<Arc<DeviceSession>, SessionError> {
        self.sessions
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }

    pub fn get_by_device(&self, device: &DeviceId) -> Result<Arc<DeviceSession>, SessionError> {
        self.sessions
            .lock()
            .unwrap()
            .values()
            .find(|session| &session.device().id == device)
            .cloned()
            .ok_or_else(|| SessionError::DeviceNotFound(device.clone()))
    }

    pub fn list(&self) -> Vec<Arc<DeviceSession>> {
        self.sessions.lock().unwrap().values().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().unwrap().is_empty()
    }

    /// Close every session, used at SDK teardown
    pub fn close_all(&self) {
        let sessions: Vec<_> = self.sessions.lock().unwrap().drain().collect();

        for (id, session) in sessions {
            debug!("session {} closed at teardown", id);
            session.close();
        }
    }
}
