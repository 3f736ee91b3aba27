//! Keyed-mutex hand-off of the overlay surface between its text producer and
//! the frame that draws it.

use crate::error::RenderError;
use crate::overlay::OverlayImage;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Key the producer waits on; the consumer releases with it.
pub const PRODUCER_KEY: u64 = 0;
/// Key the consumer waits on; the producer releases with it.
pub const CONSUMER_KEY: u64 = 1;

#[derive(Debug)]
struct Slot<T> {
    key: u64,
    value: Option<T>,
}

/// A mutex that can only be acquired with the key it was last released with.
///
/// The protected value moves into the guard while held, so a party that
/// never acquired cannot touch it.
#[derive(Debug)]
pub struct KeyedMutex<T> {
    slot: Mutex<Slot<T>>,
    released: Condvar,
}

impl<T> KeyedMutex<T> {
    /// A released mutex that the holder of `initial_key` may acquire.
    pub fn new(value: T, initial_key: u64) -> Self {
        Self {
            slot: Mutex::new(Slot {
                key: initial_key,
                value: Some(value),
            }),
            released: Condvar::new(),
        }
    }

    /// Wait up to `timeout` for the mutex to be released with `key`.
    pub fn acquire(&self, key: u64, timeout: Duration) -> Result<KeyedGuard<'_, T>, RenderError> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut slot, _) = self
            .released
            .wait_timeout_while(slot, timeout, |s| s.value.is_none() || s.key != key)
            .unwrap_or_else(PoisonError::into_inner);

        if slot.key != key {
            return Err(RenderError::SyncTimeout { key, timeout });
        }
        match slot.value.take() {
            Some(value) => Ok(KeyedGuard {
                owner: self,
                key,
                value: Some(value),
            }),
            None => Err(RenderError::SyncTimeout { key, timeout }),
        }
    }

    /// Key of the last release.
    pub fn current_key(&self) -> u64 {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).key
    }

    pub fn is_held(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .value
            .is_none()
    }

    fn put_back(&self, value: T, key: u64) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.key = key;
        slot.value = Some(value);
        drop(slot);
        self.released.notify_all();
    }
}

/// Exclusive access to a `KeyedMutex` value.
///
/// Dropping the guard without `release` gives the value back under the key
/// it was acquired with.
#[derive(Debug)]
pub struct KeyedGuard<'a, T> {
    owner: &'a KeyedMutex<T>,
    key: u64,
    value: Option<T>,
}

impl<T> KeyedGuard<'_, T> {
    /// Key this guard was acquired with.
    pub fn key(&self) -> u64 {
        self.key
    }

    /// Hand the value to whoever waits on `key`.
    pub fn release(mut self, key: u64) {
        if let Some(value) = self.value.take() {
            self.owner.put_back(value, key);
        }
    }
}

impl<T> Deref for KeyedGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.value {
            Some(value) => value,
            None => unreachable!("keyed guard emptied before drop"),
        }
    }
}

impl<T> DerefMut for KeyedGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.value {
            Some(value) => value,
            None => unreachable!("keyed guard emptied before drop"),
        }
    }
}

impl<T> Drop for KeyedGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            self.owner.put_back(value, self.key);
        }
    }
}

/// The overlay's two-phase rendezvous.
///
/// Producer: acquire `PRODUCER_KEY` → draw → release `CONSUMER_KEY`.
/// Consumer: acquire `CONSUMER_KEY` → draw → release `PRODUCER_KEY`.
/// Each acquire is bounded by the same timeout and reports it as
/// `RenderError::SyncTimeout`.
#[derive(Debug, Clone)]
pub struct OverlayHandoff {
    surface: Arc<KeyedMutex<OverlayImage>>,
    timeout: Duration,
}

impl OverlayHandoff {
    /// Start with the surface available to the producer.
    pub fn new(image: OverlayImage, timeout: Duration) -> Self {
        Self {
            surface: Arc::new(KeyedMutex::new(image, PRODUCER_KEY)),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn surface(&self) -> &Arc<KeyedMutex<OverlayImage>> {
        &self.surface
    }

    /// Producer phase.
    pub fn produce<R>(&self, draw: impl FnOnce(&mut OverlayImage) -> R) -> Result<R, RenderError> {
        let mut guard = self.surface.acquire(PRODUCER_KEY, self.timeout)?;
        let out = draw(&mut guard);
        guard.release(CONSUMER_KEY);
        Ok(out)
    }

    /// Consumer phase.
    pub fn consume<R>(&self, draw: impl FnOnce(&OverlayImage) -> R) -> Result<R, RenderError> {
        let guard = self.surface.acquire(CONSUMER_KEY, self.timeout)?;
        let out = draw(&guard);
        guard.release(PRODUCER_KEY);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const SHORT: Duration = Duration::from_millis(5);

    #[test]
    fn acquire_with_matching_key() {
        let m = KeyedMutex::new(7_u32, 0);
        let mut guard = m.acquire(0, SHORT).unwrap();
        *guard += 1;
        assert!(m.is_held());
        guard.release(1);
        assert!(!m.is_held());
        assert_eq!(m.current_key(), 1);
        assert_eq!(*m.acquire(1, SHORT).unwrap(), 8);
    }

    #[test]
    fn wrong_key_times_out() {
        let m = KeyedMutex::new((), 0);
        let err = m.acquire(1, SHORT).unwrap_err();
        assert!(matches!(err, RenderError::SyncTimeout { key: 1, .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn held_mutex_times_out_for_same_key() {
        let m = KeyedMutex::new((), 0);
        let _held = m.acquire(0, SHORT).unwrap();
        assert!(m.acquire(0, SHORT).is_err());
    }

    #[test]
    fn dropped_guard_restores_acquired_key() {
        let m = KeyedMutex::new(1_u8, 3);
        {
            let _guard = m.acquire(3, SHORT).unwrap();
        }
        assert!(!m.is_held());
        assert_eq!(m.current_key(), 3);
    }

    #[test]
    fn handoff_cycle_in_order() {
        let handoff = OverlayHandoff::new(OverlayImage::new(8, 8), SHORT);
        handoff
            .produce(|img| img.fill([255; 4]))
            .unwrap();
        assert_eq!(handoff.surface().current_key(), CONSUMER_KEY);
        let lit = handoff.consume(|img| img.pixel(2, 0)).unwrap();
        assert_eq!(lit, Some([255; 4]));
        assert_eq!(handoff.surface().current_key(), PRODUCER_KEY);
    }

    #[test]
    fn consume_before_produce_times_out() {
        let handoff = OverlayHandoff::new(OverlayImage::new(2, 2), SHORT);
        let err = handoff.consume(|_| ()).unwrap_err();
        assert!(matches!(err, RenderError::SyncTimeout { key: CONSUMER_KEY, .. }));
        // The failed acquire leaves the surface with the producer.
        assert!(handoff.produce(|_| ()).is_ok());
    }

    #[test]
    fn double_produce_times_out() {
        let handoff = OverlayHandoff::new(OverlayImage::new(2, 2), SHORT);
        handoff.produce(|_| ()).unwrap();
        assert!(handoff.produce(|_| ()).is_err());
    }

    #[test]
    fn consumer_waits_for_producer_thread() {
        let handoff = OverlayHandoff::new(OverlayImage::new(4, 4), Duration::from_secs(5));
        let producer = handoff.clone();
        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.produce(|img| img.fill([9; 4]))
        });
        let pixel = handoff.consume(|img| img.pixel(1, 0)).unwrap();
        assert!(worker.join().unwrap().is_ok());
        assert_eq!(pixel, Some([9; 4]));
    }
}
