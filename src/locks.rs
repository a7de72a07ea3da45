// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A table of async locks addressed by key.
//!
//! Work on disjoint keys runs concurrently; work touching a common key is serialized in the order the locks were
//! requested. Guards over several keys always acquire them in sorted order, so two callers locking the same pair of
//! keys can't deadlock against each other.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap<K> = Mutex<HashMap<K, Arc<AsyncMutex<()>>>>;

pub struct KeyedLocks<K> {
	locks: Arc<LockMap<K>>,
}

impl<K> Default for KeyedLocks<K> {
	fn default() -> Self {
		Self {
			locks: Arc::new(Mutex::new(HashMap::new())),
		}
	}
}

impl<K: Clone + Eq + Hash + Ord> KeyedLocks<K> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Waits until every one of the given keys is free, then holds them until the returned guard is dropped.
	pub async fn lock(&self, keys: &[K]) -> KeyedGuard<K> {
		let mut keys = keys.to_vec();
		keys.sort();
		keys.dedup();

		let mut guards = Vec::with_capacity(keys.len());
		for key in keys.iter() {
			let key_lock = {
				let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
				Arc::clone(locks.entry(key.clone()).or_default())
			};
			guards.push(key_lock.lock_owned().await);
		}

		KeyedGuard {
			keys,
			guards,
			locks: Arc::clone(&self.locks),
		}
	}

	/// The number of keys currently tracked by the table
	#[cfg(test)]
	fn tracked_keys(&self) -> usize {
		self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
	}
}

pub struct KeyedGuard<K: Eq + Hash> {
	keys: Vec<K>,
	guards: Vec<OwnedMutexGuard<()>>,
	locks: Arc<LockMap<K>>,
}

impl<K: Eq + Hash> Drop for KeyedGuard<K> {
	fn drop(&mut self) {
		self.guards.clear();
		let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
		for key in self.keys.iter() {
			// Only the table itself still refers to the lock, so nobody is holding or waiting on it.
			let unused = locks.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1);
			if unused {
				locks.remove(key);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::time::Duration;
	use tokio::time::{sleep, timeout};

	#[tokio::test]
	async fn shared_key_is_exclusive() {
		let locks = Arc::new(KeyedLocks::new());
		let inside = Arc::new(AtomicUsize::new(0));
		let max_inside = Arc::new(AtomicUsize::new(0));

		let mut tasks = Vec::new();
		for _ in 0..8 {
			let locks = Arc::clone(&locks);
			let inside = Arc::clone(&inside);
			let max_inside = Arc::clone(&max_inside);
			tasks.push(tokio::spawn(async move {
				let _guard = locks.lock(&[7u64]).await;
				let now_inside = inside.fetch_add(1, Ordering::SeqCst) + 1;
				max_inside.fetch_max(now_inside, Ordering::SeqCst);
				sleep(Duration::from_millis(2)).await;
				inside.fetch_sub(1, Ordering::SeqCst);
			}));
		}
		for task in tasks {
			task.await.unwrap();
		}

		assert_eq!(max_inside.load(Ordering::SeqCst), 1);
		assert_eq!(locks.tracked_keys(), 0);
	}

	#[tokio::test]
	async fn disjoint_keys_do_not_block() {
		let locks = KeyedLocks::new();
		let _first = locks.lock(&[1u64]).await;
		let second = timeout(Duration::from_millis(100), locks.lock(&[2u64])).await;
		assert!(second.is_ok());
	}

	#[tokio::test]
	async fn overlapping_key_sets_wait() {
		let locks = KeyedLocks::new();
		let first = locks.lock(&[1u64, 2]).await;
		let blocked = timeout(Duration::from_millis(50), locks.lock(&[2u64, 3])).await;
		assert!(blocked.is_err());
		drop(first);
		let unblocked = timeout(Duration::from_millis(100), locks.lock(&[3u64, 2])).await;
		assert!(unblocked.is_ok());
	}

	#[tokio::test]
	async fn duplicate_keys_lock_once() {
		let locks = KeyedLocks::new();
		let guard = timeout(Duration::from_millis(100), locks.lock(&[5u64, 5])).await;
		assert!(guard.is_ok());
		assert_eq!(locks.tracked_keys(), 1);
		drop(guard);
		assert_eq!(locks.tracked_keys(), 0);
	}
}
