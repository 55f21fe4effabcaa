//! One-shot "reveal when visible" triggers.
//!
//! A region is registered with a threshold, the fraction of it that has
//! to be on screen. The first time a reported fraction reaches the
//! threshold, the callback runs and the registration is removed.
//! Registrations that never fire are removed with [`VisibilityObserver::unobserve`]
//! or [`VisibilityObserver::clear`].

use std::collections::BTreeMap;

/// Identifies a registration so it can be torn down.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Registration(u64);

type Callback = Box<dyn FnOnce() + Send>;

struct Entry<R> {
    region: R,
    threshold: f32,
    callback: Callback,
}

pub struct VisibilityObserver<R> {
    next_id: u64,
    entries: BTreeMap<Registration, Entry<R>>,
}

impl<R> Default for VisibilityObserver<R> {
    fn default() -> Self {
        VisibilityObserver {
            next_id: 0,
            entries: BTreeMap::new(),
        }
    }
}

impl<R: PartialEq> VisibilityObserver<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `callback` once, the first time `region` is at least
    /// `threshold` visible. The threshold is clamped to `0.0..=1.0`.
    pub fn observe(
        &mut self,
        region: R,
        threshold: f32,
        callback: impl FnOnce() + Send + 'static,
    ) -> Registration {
        let registration = Registration(self.next_id);
        self.next_id += 1;

        let threshold = if threshold.is_nan() {
            1.0
        } else {
            threshold.max(0.0).min(1.0)
        };

        self.entries.insert(
            registration,
            Entry {
                region,
                threshold,
                callback: Box::new(callback),
            },
        );

        registration
    }

    /// Reports how much of `region` is visible and fires every pending
    /// registration it satisfies, in registration order. Returns how many
    /// fired.
    pub fn report(&mut self, region: &R, visible_fraction: f32) -> usize {
        let due: Vec<Registration> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.region == *region && visible_fraction >= entry.threshold)
            .map(|(registration, _)| *registration)
            .collect();

        for registration in &due {
            if let Some(entry) = self.entries.remove(registration) {
                (entry.callback)();
            }
        }

        due.len()
    }

    /// Removes a registration that has not fired yet. Returns whether
    /// anything was removed.
    pub fn unobserve(&mut self, registration: Registration) -> bool {
        self.entries.remove(&registration).is_some()
    }

    /// Removes every pending registration.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn pending(&self) -> usize {
        self.entries.len()
    }
}
