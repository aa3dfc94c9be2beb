use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

/// Idle OCR engines keyed by language string (`kor+eng`, `eng`, ...).
///
/// An engine is checked out for the duration of one recognition call and
/// returned afterwards, so the lock is never held while OCR runs. At most
/// `capacity` idle engines are kept; the least recently used is dropped.
pub struct EngineCache<E> {
    idle: Arc<Mutex<LruCache<String, E>>>,
}

impl<E> Clone for EngineCache<E> {
    fn clone(&self) -> Self {
        Self {
            idle: Arc::clone(&self.idle),
        }
    }
}

impl<E> EngineCache<E> {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            idle: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, E>> {
        // Entries are idle engines, so a poisoned map is still consistent
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Take the idle engine for `key`, or build one with `create`.
    pub fn checkout<F, Err>(&self, key: &str, create: F) -> Result<E, Err>
    where
        F: FnOnce() -> Result<E, Err>,
    {
        let cached = self.lock().pop(key);
        match cached {
            Some(engine) => Ok(engine),
            None => create(),
        }
    }

    /// Return an engine after use.
    pub fn checkin(&self, key: String, engine: E) {
        self.lock().put(key, engine);
    }

    /// Number of idle engines.
    pub fn len(&self) -> usize {
        self.lock().len()
    }
}
