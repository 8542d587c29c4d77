//! Lock helper macros shared across the metadata model.
//!
//! Model objects guard their mutable collections with [`std::sync::RwLock`] and
//! [`std::sync::Mutex`]. A poisoned lock means another thread panicked while mutating the
//! model, which leaves it in an unknown state; these macros turn that into a panic at the
//! access site instead of threading a lock error through every accessor.

#![allow(unused_macros)]

/// Acquires a mutex guard, panicking if the mutex is poisoned.
macro_rules! lock {
    ($lock:expr) => {
        $lock.lock().expect("Failed to acquire lock")
    };
}

/// Acquires a read guard on an `RwLock`, panicking if the lock is poisoned.
macro_rules! read_lock {
    ($arc_rwlock:expr) => {
        $arc_rwlock.read().expect("Failed to acquire read lock")
    };
}

/// Acquires a write guard on an `RwLock`, panicking if the lock is poisoned.
macro_rules! write_lock {
    ($arc_rwlock:expr) => {
        $arc_rwlock.write().expect("Failed to acquire write lock")
    };
}
