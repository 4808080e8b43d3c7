/// Per-thread construction and drop counters, so parallel tests don't see
/// each other's values.
pub mod drop_counts {
    use std::{
        collections::HashMap,
        sync::Mutex,
        thread::{self, ThreadId},
    };

    lazy_static::lazy_static! {
        /// Counts constructions of `Tracked` values for testing purposes.
        static ref NEW_COUNTS: Mutex<HashMap<ThreadId, usize>> = Default::default();
        static ref DROP_COUNTS: Mutex<HashMap<ThreadId, usize>> = Default::default();
    }

    pub fn reset_counts() {
        let tid = thread::current().id();
        NEW_COUNTS.lock().unwrap().insert(tid, 0);
        DROP_COUNTS.lock().unwrap().insert(tid, 0);
    }

    pub fn total_new_count() -> usize {
        let tid = thread::current().id();
        *NEW_COUNTS.lock().unwrap().entry(tid).or_default()
    }

    pub fn incr_total_new_count() {
        let tid = thread::current().id();
        *NEW_COUNTS.lock().unwrap().entry(tid).or_default() += 1;
    }

    pub fn total_drop_count() -> usize {
        let tid = thread::current().id();
        *DROP_COUNTS.lock().unwrap().entry(tid).or_default()
    }

    pub fn incr_total_drop_count() {
        let tid = thread::current().id();
        *DROP_COUNTS.lock().unwrap().entry(tid).or_default() += 1;
    }

    pub fn current_live_allocs() -> usize {
        total_new_count() - total_drop_count()
    }
}

/// A value that reports its constructions and drops to [`drop_counts`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Tracked(pub i32);

impl Tracked {
    pub fn new(value: i32) -> Self {
        drop_counts::incr_total_new_count();
        Self(value)
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        Self::new(self.0)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        drop_counts::incr_total_drop_count();
    }
}
