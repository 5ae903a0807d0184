//! Process group: bulk control and derived state over a set of processes

use crate::event::{GroupUpdate, Subscribers};
use crate::process::ManagedProcess;
use crate::state::ProcessState;
use async_channel::Receiver;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// A named, ordered collection of managed processes under bulk control
///
/// The group's state is derived from its members: `start`/`stop` set
/// `Started`/`Stopping` directly, and the only way back to `Stopped` is the
/// aggregation observer noticing that every member has stopped. Membership
/// is append-only; registration order carries no dependency meaning.
#[derive(Clone)]
pub struct ProcessGroup {
    shared: Arc<GroupShared>,
}

struct GroupShared {
    name: String,
    inner: Mutex<GroupInner>,
    updates: Subscribers<GroupUpdate>,
}

struct GroupInner {
    state: ProcessState,
    members: Vec<ManagedProcess>,
}

impl ProcessGroup {
    /// Create an empty group in the `Stopped` state
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(GroupShared {
                name: name.into(),
                inner: Mutex::new(GroupInner {
                    state: ProcessState::Stopped,
                    members: Vec::new(),
                }),
                updates: Subscribers::new(),
            }),
        }
    }

    /// The group name
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Current derived lifecycle state
    pub fn state(&self) -> ProcessState {
        self.shared.inner.lock().unwrap().state
    }

    /// Handles to the current members, in registration order
    pub fn members(&self) -> Vec<ManagedProcess> {
        self.shared.inner.lock().unwrap().members.clone()
    }

    /// Subscribe to this group's state-update notifications
    pub fn subscribe(&self) -> Receiver<GroupUpdate> {
        self.shared.updates.subscribe()
    }

    /// Register a member and watch its state-update notifications
    pub fn add_process(&self, process: ManagedProcess) {
        let member_updates = process.subscribe();
        let group = Arc::downgrade(&self.shared);
        smol::spawn(async move {
            // Runs until the member is dropped or the group itself is gone.
            while let Ok(update) = member_updates.recv().await {
                let Some(shared) = group.upgrade() else { break };
                GroupShared::member_changed(&shared, update.process);
            }
        })
        .detach();
        self.shared.inner.lock().unwrap().members.push(process);
    }

    /// Start every member in registration order
    ///
    /// No-op unless the group is `Stopped`. The group is `Started` as soon
    /// as every start has been issued; a member whose spawn failed is
    /// already `Stopped` again, and the aggregation observer catches up when
    /// its notification is processed.
    pub fn start(&self) {
        let mut inner = self.shared.inner.lock().unwrap();
        if inner.state != ProcessState::Stopped {
            warn!(
                group = %self.shared.name,
                state = %inner.state,
                "group start requested while not stopped; ignoring"
            );
            return;
        }
        info!(
            group = %self.shared.name,
            members = inner.members.len(),
            "starting all member processes"
        );
        for member in &inner.members {
            member.start();
        }
        inner.state = ProcessState::Started;
    }

    /// Request termination of every member in registration order
    ///
    /// No-op unless the group is `Started`. The group stays `Stopping` until
    /// every member has reported `Stopped`.
    pub fn stop(&self) {
        let mut inner = self.shared.inner.lock().unwrap();
        if inner.state != ProcessState::Started {
            warn!(
                group = %self.shared.name,
                state = %inner.state,
                "group stop requested while not started; ignoring"
            );
            return;
        }
        info!(group = %self.shared.name, "stopping all member processes");
        for member in &inner.members {
            member.stop();
        }
        inner.state = ProcessState::Stopping;
    }
}

impl GroupShared {
    /// Aggregation observer: re-derive the group state from the members and
    /// re-emit, whatever the outcome of the scan
    fn member_changed(shared: &Arc<Self>, member: ManagedProcess) {
        let mut inner = shared.inner.lock().unwrap();
        let all_stopped = inner.members.iter().all(|m| m.state().is_stopped());
        if all_stopped {
            if inner.state != ProcessState::Stopped {
                info!(group = %shared.name, "every member process is stopped");
            }
            inner.state = ProcessState::Stopped;
        }
        let group = ProcessGroup {
            shared: Arc::clone(shared),
        };
        shared.updates.send(GroupUpdate::new(group, member));
    }
}

impl fmt::Debug for ProcessGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessGroup")
            .field("name", &self.shared.name)
            .finish_non_exhaustive()
    }
}
