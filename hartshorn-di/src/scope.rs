//! Every [Provider](crate::provider::Provider) carries a [Scope], which decides when to reuse and
//! when to create an instance:
//!
//! * [Scope::Singleton] - constructed lazily on first request, then shared by all callers for the
//! lifetime of the owning [ApplicationContext](crate::application_context::ApplicationContext)
//! * [Scope::Factory] - constructed anew on every request
//! * [Scope::Fixed] - an instance created outside the engine and returned as-is
//!
//! Note: scope resolution happens at instantiation time, which can lead to unexpected consequences
//! if scopes are mixed together, e.g. a singleton can depend on a factory-scoped component. In such
//! case a new instance of the dependency is created when constructing the singleton, but then that
//! single instance lives as long as the singleton lives.

use crate::instance_provider::{AnyInstancePtr, ErrorPtr};
use crate::key::Key;
use fxhash::FxHashMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::thread::{self, ThreadId};
use thiserror::Error;

/// Name of [Scope::Singleton].
pub const SINGLETON: &str = "singleton";

/// Name of [Scope::Factory].
pub const FACTORY: &str = "factory";

/// Name of [Scope::Fixed].
pub const FIXED: &str = "fixed";

/// Construction scope of a provider. See module documentation for details.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum Scope {
    #[default]
    Singleton,
    Factory,
    Fixed,
}

impl Scope {
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Scope::Singleton => SINGLETON,
            Scope::Factory => FACTORY,
            Scope::Fixed => FIXED,
        }
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Clone, Eq, PartialEq, Debug)]
#[error("Unrecognized scope: {0}")]
pub struct UnrecognizedScope(pub String);

impl FromStr for Scope {
    type Err = UnrecognizedScope;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            SINGLETON => Ok(Scope::Singleton),
            FACTORY | "prototype" => Ok(Scope::Factory),
            FIXED => Ok(Scope::Fixed),
            _ => Err(UnrecognizedScope(value.to_string())),
        }
    }
}

/// Storage for a single lazily constructed singleton instance. Concurrent initializers block until
/// the first one finishes; a failed initialization leaves the cell empty.
#[derive(Default, Debug)]
pub(crate) struct SingletonCell {
    instance: OnceCell<AnyInstancePtr>,
}

impl SingletonCell {
    #[inline]
    pub(crate) fn get(&self) -> Option<AnyInstancePtr> {
        self.instance.get().cloned()
    }

    #[inline]
    pub(crate) fn get_or_try_init<F: FnOnce() -> Result<AnyInstancePtr, ErrorPtr>>(
        &self,
        init: F,
    ) -> Result<AnyInstancePtr, ErrorPtr> {
        self.instance.get_or_try_init(init).cloned()
    }
}

#[derive(Default, Debug)]
struct InitializationState {
    // singleton key -> thread running its constructor
    owners: FxHashMap<Key, ThreadId>,
    // thread -> singleton key it is about to wait for
    waiting: FxHashMap<ThreadId, Key>,
}

/// Wait-for graph of singleton initializations across threads. A thread about to enter a
/// [SingletonCell] registers what it waits for; if following the owners of awaited singletons
/// leads back to the current thread, waiting would never finish and the wait is refused with the
/// keys forming the cycle.
#[derive(Default, Debug)]
pub(crate) struct InitializationTracker {
    state: Mutex<InitializationState>,
}

impl InitializationTracker {
    /// Registers the current thread as waiting for `key`. Returns the cycle, if waiting would
    /// deadlock.
    pub(crate) fn wait_for(&self, key: &Key) -> Result<WaitGuard<'_>, Vec<Key>> {
        let current = thread::current().id();
        let mut state = self.state.lock();

        let mut cycle = vec![key.clone()];
        let mut next = key;
        // every thread waits for at most one key, so the walk is bounded by the number of waiters
        for _ in 0..=state.waiting.len() {
            let Some(owner) = state.owners.get(next) else {
                break;
            };

            if *owner == current {
                return Err(cycle);
            }

            let Some(awaited) = state.waiting.get(owner) else {
                break;
            };

            cycle.push(awaited.clone());
            next = awaited;
        }

        state.waiting.insert(current, key.clone());
        Ok(WaitGuard { tracker: self })
    }

    /// Marks the current thread as the one constructing `key`.
    pub(crate) fn claim(&self, key: &Key) -> ClaimGuard<'_> {
        let current = thread::current().id();
        let mut state = self.state.lock();

        state.waiting.remove(&current);
        state.owners.insert(key.clone(), current);

        ClaimGuard {
            tracker: self,
            key: key.clone(),
        }
    }
}

pub(crate) struct WaitGuard<'a> {
    tracker: &'a InitializationTracker,
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.tracker
            .state
            .lock()
            .waiting
            .remove(&thread::current().id());
    }
}

pub(crate) struct ClaimGuard<'a> {
    tracker: &'a InitializationTracker,
    key: Key,
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        self.tracker.state.lock().owners.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CapturedPanic;
    use crate::instance_provider::{erase, error_ptr, AnyInstancePtr, InstancePtr};
    use crate::key::Key;
    use crate::scope::{InitializationTracker, Scope, SingletonCell, UnrecognizedScope};
    use std::sync::mpsc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn should_parse_scope_names() {
        assert_eq!("singleton".parse::<Scope>(), Ok(Scope::Singleton));
        assert_eq!("FACTORY".parse::<Scope>(), Ok(Scope::Factory));
        assert_eq!("prototype".parse::<Scope>(), Ok(Scope::Factory));
        assert_eq!(
            "session".parse::<Scope>(),
            Err(UnrecognizedScope("session".to_string()))
        );
        assert_eq!(Scope::Fixed.to_string(), "fixed");
    }

    #[test]
    fn should_retry_failed_initialization() {
        let cell = SingletonCell::default();

        assert!(cell
            .get_or_try_init(|| Err(error_ptr(CapturedPanic("x".to_string()))))
            .is_err());
        assert!(cell.get().is_none());

        cell.get_or_try_init(|| Ok(erase(InstancePtr::new(1))))
            .unwrap();
        assert!(cell.get().is_some());
    }

    #[test]
    fn should_initialize_once_under_contention() {
        let cell = Arc::new(SingletonCell::default());
        let constructions = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = cell.clone();
                let constructions = constructions.clone();
                let barrier = barrier.clone();

                thread::spawn(move || {
                    barrier.wait();
                    cell.get_or_try_init(|| {
                        constructions.fetch_add(1, Ordering::SeqCst);
                        Ok(erase(InstancePtr::new(0u8)))
                    })
                    .unwrap()
                })
            })
            .collect();

        let instances: Vec<AnyInstancePtr> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        assert_eq!(constructions.load(Ordering::SeqCst), 1);
        assert!(instances
            .windows(2)
            .all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }

    #[test]
    fn should_refuse_wait_closing_a_cycle() {
        let tracker = Arc::new(InitializationTracker::default());
        let first = Key::named::<u8>("first");
        let second = Key::named::<u8>("second");

        let _claim = tracker.claim(&first);

        let (claimed_sender, claimed_receiver) = mpsc::channel();
        let (done_sender, done_receiver) = mpsc::channel::<()>();
        let handle = {
            let tracker = tracker.clone();
            let first = first.clone();
            let second = second.clone();
            thread::spawn(move || {
                let _claim = tracker.claim(&second);
                let _wait = tracker.wait_for(&first).unwrap();
                claimed_sender.send(()).unwrap();
                done_receiver.recv().unwrap();
            })
        };

        claimed_receiver.recv().unwrap();
        assert_eq!(
            tracker.wait_for(&second).err(),
            Some(vec![second.clone(), first.clone()])
        );

        done_sender.send(()).unwrap();
        handle.join().unwrap();

        assert!(tracker.wait_for(&second).is_ok());
    }
}
