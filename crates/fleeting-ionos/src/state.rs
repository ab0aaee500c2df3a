//! Abstract instance lifecycle states and the mapping from IONOS VM states.
//!
//! The autoscaler only understands the small state vocabulary below. IONOS
//! reports a coarser `metadata.state` on every resource; `map_vm_state`
//! translates between the two.

/// VM state reported for a fully provisioned, running server.
pub(crate) const VM_STATE_AVAILABLE: &str = "AVAILABLE";

/// VM state reported while the provider is working on a server.
pub(crate) const VM_STATE_BUSY: &str = "BUSY";

/// VM state reported for a powered-off or destroyed server.
pub(crate) const VM_STATE_INACTIVE: &str = "INACTIVE";

/// Instance lifecycle state as understood by the autoscaler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// Instance creation has been requested but is not finished.
    Creating,
    /// Instance is up.
    Running,
    /// Instance deletion has been requested but is not finished.
    Deleting,
    /// Instance is gone.
    Deleted,
    /// Instance never became ready within the orchestrator's deadline.
    /// Reported by the orchestrator, never produced by the mapper.
    Timeout,
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Creating => write!(f, "creating"),
            Self::Running => write!(f, "running"),
            Self::Deleting => write!(f, "deleting"),
            Self::Deleted => write!(f, "deleted"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

/// Map an IONOS VM state onto the autoscaler's vocabulary.
///
/// IONOS reports `BUSY` both while a server is being created and while it is
/// being destroyed; `pending_delete` must be true for servers this controller
/// has issued a delete for, so the two cases can be told apart. States outside
/// the known set (e.g. states only emitted for other resource kinds) map to
/// `None` and the instance is skipped by the caller.
pub fn map_vm_state(state: &str, pending_delete: bool) -> Option<InstanceState> {
    match state {
        VM_STATE_AVAILABLE => Some(InstanceState::Running),
        VM_STATE_BUSY if pending_delete => Some(InstanceState::Deleting),
        VM_STATE_BUSY => Some(InstanceState::Creating),
        VM_STATE_INACTIVE => Some(InstanceState::Deleted),
        _ => None,
    }
}
