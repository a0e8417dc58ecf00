//! Lifecycle capability
//!
//! Built objects that need explicit startup and teardown implement
//! [`Lifecycle`]. The orchestrator calls `init` then `start` on each of them
//! in build order, and `stop` in reverse order before a rebuild.
//!
//! [`LifecycleState`] is a ready-made guard for implementors that want the
//! usual state checks (no double init, no start before init, stop is a no-op
//! when not started, flush only after stop).

use std::fmt;

use parking_lot::Mutex;

use crate::error::LifecycleError;

/// Uniform init/start/stop contract for built objects
///
/// Methods take `&self`: built objects are shared, so implementors keep
/// their mutable state behind interior mutability.
pub trait Lifecycle: Send + Sync {
    /// Prepare resources
    fn init(&self) -> Result<(), LifecycleError>;

    /// Begin operation
    fn start(&self) -> Result<(), LifecycleError>;

    /// Cease operation
    fn stop(&self) -> Result<(), LifecycleError>;

    /// Release what a stopped object still holds
    fn flush(&self) -> Result<(), LifecycleError> {
        Ok(())
    }

    /// Stop, flush, init and start again
    ///
    /// Implementors backed by [`LifecycleState`] should override this with
    /// [`LifecycleState::reload`] so the sequence runs under one lock.
    fn reload(&self) -> Result<(), LifecycleError> {
        self.stop()?;
        self.flush()?;
        self.init()?;
        self.start()
    }
}

/// The lifecycle call being made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Init,
    Start,
    Stop,
    Flush,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
            Self::Flush => write!(f, "flush"),
        }
    }
}

/// Observable status of a [`LifecycleState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStatus {
    /// Never initialized
    New,
    /// Initialized, not started
    Initialized,
    /// Running
    Started,
    /// Stopped; may be flushed or initialized again
    Stopped,
    /// Stopped and flushed; may be initialized again
    Flushed,
}

#[derive(Debug, Default)]
struct Flags {
    initialized: bool,
    started: bool,
    stopped: bool,
    flushed: bool,
}

impl Flags {
    fn init<F>(&mut self, action: F) -> Result<(), LifecycleError>
    where
        F: FnOnce() -> Result<(), LifecycleError>,
    {
        if self.initialized && !self.stopped {
            return Err(LifecycleError::AlreadyInitialized);
        }
        action()?;
        *self = Self {
            initialized: true,
            ..Self::default()
        };
        Ok(())
    }

    fn start<F>(&mut self, action: F) -> Result<(), LifecycleError>
    where
        F: FnOnce() -> Result<(), LifecycleError>,
    {
        if !self.initialized || self.stopped {
            return Err(LifecycleError::NotInitialized);
        }
        if self.started {
            return Err(LifecycleError::AlreadyStarted);
        }
        action()?;
        self.started = true;
        Ok(())
    }

    fn stop<F>(&mut self, action: F) -> Result<(), LifecycleError>
    where
        F: FnOnce() -> Result<(), LifecycleError>,
    {
        if !self.initialized {
            return Err(LifecycleError::NotInitialized);
        }
        if !self.started {
            tracing::debug!("Lifecycle not started, skipping stop");
            return Ok(());
        }
        action()?;
        self.started = false;
        self.stopped = true;
        Ok(())
    }

    fn flush<F>(&mut self, action: F) -> Result<(), LifecycleError>
    where
        F: FnOnce() -> Result<(), LifecycleError>,
    {
        if !self.stopped {
            return Err(LifecycleError::NotStopped);
        }
        action()?;
        self.flushed = true;
        Ok(())
    }
}

/// State guard for [`Lifecycle`] implementors
///
/// Each transition takes the guard's lock, validates the current state, runs
/// the supplied action and records the new state only if the action
/// succeeded.
#[derive(Debug, Default)]
pub struct LifecycleState {
    flags: Mutex<Flags>,
}

impl LifecycleState {
    /// Create a guard in the [`LifecycleStatus::New`] state
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` as the init transition
    ///
    /// Allowed from `New`, `Stopped` and `Flushed`.
    pub fn init<F>(&self, action: F) -> Result<(), LifecycleError>
    where
        F: FnOnce() -> Result<(), LifecycleError>,
    {
        self.flags.lock().init(action)
    }

    /// Run `action` as the start transition
    pub fn start<F>(&self, action: F) -> Result<(), LifecycleError>
    where
        F: FnOnce() -> Result<(), LifecycleError>,
    {
        self.flags.lock().start(action)
    }

    /// Run `action` as the stop transition
    ///
    /// Stopping something that is initialized but not started succeeds
    /// without running `action`.
    pub fn stop<F>(&self, action: F) -> Result<(), LifecycleError>
    where
        F: FnOnce() -> Result<(), LifecycleError>,
    {
        self.flags.lock().stop(action)
    }

    /// Run `action` as the flush transition; only allowed once stopped
    pub fn flush<F>(&self, action: F) -> Result<(), LifecycleError>
    where
        F: FnOnce() -> Result<(), LifecycleError>,
    {
        self.flags.lock().flush(action)
    }

    /// Stop, flush, init and start under one lock
    ///
    /// `action` is called with each phase in turn. Something that was
    /// initialized but never started is started by the reload. The first
    /// failing phase aborts the reload and the state reflects the phases
    /// that completed.
    pub fn reload<F>(&self, mut action: F) -> Result<(), LifecycleError>
    where
        F: FnMut(LifecyclePhase) -> Result<(), LifecycleError>,
    {
        let mut flags = self.flags.lock();
        if !flags.initialized {
            return Err(LifecycleError::NotInitialized);
        }
        if flags.started {
            flags.stop(|| action(LifecyclePhase::Stop))?;
        } else if !flags.stopped {
            // Initialized only: nothing to stop or flush
            flags.initialized = false;
        }
        if flags.stopped && !flags.flushed {
            flags.flush(|| action(LifecyclePhase::Flush))?;
        }
        flags.init(|| action(LifecyclePhase::Init))?;
        flags.start(|| action(LifecyclePhase::Start))
    }

    /// Current status
    pub fn status(&self) -> LifecycleStatus {
        let flags = self.flags.lock();
        if flags.flushed {
            LifecycleStatus::Flushed
        } else if flags.stopped {
            LifecycleStatus::Stopped
        } else if flags.started {
            LifecycleStatus::Started
        } else if flags.initialized {
            LifecycleStatus::Initialized
        } else {
            LifecycleStatus::New
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok() -> Result<(), LifecycleError> {
        Ok(())
    }

    #[test]
    fn test_normal_transitions() {
        let state = LifecycleState::new();
        assert_eq!(state.status(), LifecycleStatus::New);

        state.init(ok).unwrap();
        assert_eq!(state.status(), LifecycleStatus::Initialized);

        state.start(ok).unwrap();
        assert_eq!(state.status(), LifecycleStatus::Started);

        state.stop(ok).unwrap();
        assert_eq!(state.status(), LifecycleStatus::Stopped);
    }

    #[test]
    fn test_reinit_after_stop() {
        let state = LifecycleState::new();
        state.init(ok).unwrap();
        state.start(ok).unwrap();
        state.stop(ok).unwrap();

        state.init(ok).unwrap();
        state.start(ok).unwrap();
        assert_eq!(state.status(), LifecycleStatus::Started);
    }

    #[test]
    fn test_double_init_rejected() {
        let state = LifecycleState::new();
        state.init(ok).unwrap();
        assert!(matches!(
            state.init(ok),
            Err(LifecycleError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_start_requires_init() {
        let state = LifecycleState::new();
        assert!(matches!(state.start(ok), Err(LifecycleError::NotInitialized)));

        state.init(ok).unwrap();
        state.start(ok).unwrap();
        assert!(matches!(state.start(ok), Err(LifecycleError::AlreadyStarted)));
    }

    #[test]
    fn test_stop_when_not_started_is_noop() {
        let state = LifecycleState::new();
        state.init(ok).unwrap();

        let mut ran = false;
        state
            .stop(|| {
                ran = true;
                Ok(())
            })
            .unwrap();
        assert!(!ran);
        assert_eq!(state.status(), LifecycleStatus::Initialized);
    }

    #[test]
    fn test_failed_action_keeps_state() {
        let state = LifecycleState::new();
        let result = state.init(|| Err(LifecycleError::failed("boom")));
        assert!(result.is_err());
        assert_eq!(state.status(), LifecycleStatus::New);
    }

    #[test]
    fn test_flush_after_stop() {
        let state = LifecycleState::new();
        state.init(ok).unwrap();
        state.start(ok).unwrap();
        state.stop(ok).unwrap();

        state.flush(ok).unwrap();
        assert_eq!(state.status(), LifecycleStatus::Flushed);

        state.init(ok).unwrap();
        assert_eq!(state.status(), LifecycleStatus::Initialized);
    }

    #[test]
    fn test_flush_before_stop_rejected() {
        let state = LifecycleState::new();
        assert!(matches!(state.flush(ok), Err(LifecycleError::NotStopped)));

        state.init(ok).unwrap();
        state.start(ok).unwrap();
        let mut ran = false;
        let result = state.flush(|| {
            ran = true;
            Ok(())
        });
        assert!(matches!(result, Err(LifecycleError::NotStopped)));
        assert!(!ran);
        assert_eq!(state.status(), LifecycleStatus::Started);
    }

    #[test]
    fn test_reload_from_started() {
        let state = LifecycleState::new();
        state.init(ok).unwrap();
        state.start(ok).unwrap();

        let mut phases = Vec::new();
        state
            .reload(|phase| {
                phases.push(phase);
                Ok(())
            })
            .unwrap();

        assert_eq!(
            phases,
            vec![
                LifecyclePhase::Stop,
                LifecyclePhase::Flush,
                LifecyclePhase::Init,
                LifecyclePhase::Start
            ]
        );
        assert_eq!(state.status(), LifecycleStatus::Started);
    }

    #[test]
    fn test_reload_from_initialized_skips_stop_and_flush() {
        let state = LifecycleState::new();
        state.init(ok).unwrap();

        let mut phases = Vec::new();
        state
            .reload(|phase| {
                phases.push(phase);
                Ok(())
            })
            .unwrap();

        assert_eq!(phases, vec![LifecyclePhase::Init, LifecyclePhase::Start]);
        assert_eq!(state.status(), LifecycleStatus::Started);
    }

    #[test]
    fn test_reload_requires_init() {
        let state = LifecycleState::new();
        assert!(matches!(
            state.reload(|_| Ok(())),
            Err(LifecycleError::NotInitialized)
        ));
    }

    #[test]
    fn test_reload_stops_at_failing_phase() {
        let state = LifecycleState::new();
        state.init(ok).unwrap();
        state.start(ok).unwrap();

        let result = state.reload(|phase| match phase {
            LifecyclePhase::Flush => Err(LifecycleError::failed("disk full")),
            _ => Ok(()),
        });

        assert!(result.is_err());
        assert_eq!(state.status(), LifecycleStatus::Stopped);
    }
}
