// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Checkout/checkin pool for per-operation state and whole engines.

use crate::util::Spinlock;
use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};

const SEGMENTS: usize = 16;

static NEXT_THREAD_SLOT: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    /// Segment owned by the current thread, handed out round-robin.
    static THREAD_SEGMENT: Cell<usize> =
        Cell::new(NEXT_THREAD_SLOT.fetch_add(1, Ordering::Relaxed) % SEGMENTS);
}

#[inline(always)]
fn thread_segment() -> usize {
    THREAD_SEGMENT.with(|segment| segment.get())
}

/// Segmented pool of idle items.
///
/// A thread always checks items out of and back into its own segment, so
/// concurrent threads rarely contend on the same lock. An item is created by the
/// factory whenever the segment has none idle; `checkin` drops the item instead
/// of keeping it when the segment already holds `idle_cap` items.
pub struct Pool<T> {
    segments: [Spinlock<Vec<T>>; SEGMENTS],
    factory: Box<dyn Fn() -> T + Send + Sync>,
    idle_cap: Option<usize>,
}

impl<T> Pool<T> {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Pool {
            segments: std::array::from_fn(|_| Spinlock::new(Vec::new())),
            factory: Box::new(factory),
            idle_cap: None,
        }
    }

    /// A pool keeping at most `idle_cap` idle items per segment.
    pub fn with_capacity<F>(idle_cap: usize, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Pool {
            idle_cap: Some(idle_cap),
            ..Pool::new(factory)
        }
    }

    /// Takes an idle item, or builds a new one.
    #[inline(always)]
    pub fn checkout(&self) -> T {
        let idle = self.segments[thread_segment()].lock().pop();
        idle.unwrap_or_else(|| (self.factory)())
    }

    /// Returns an item; the caller resets it first.
    #[inline(always)]
    pub fn checkin(&self, item: T) {
        let mut segment = self.segments[thread_segment()].lock();
        if self.idle_cap.is_some_and(|cap| segment.len() >= cap) {
            return;
        }
        segment.push(item);
    }

    /// Checks an item out for the duration of `handler`.
    ///
    /// The item is not returned if `handler` panics.
    #[inline(always)]
    pub fn borrow_mut<R>(&self, handler: impl FnOnce(&mut T) -> R) -> R {
        let mut item = self.checkout();
        let result = handler(&mut item);
        self.checkin(item);
        result
    }

    /// Number of idle items across all segments.
    pub fn idle(&self) -> usize {
        self.segments.iter().map(|segment| segment.lock().len()).sum()
    }

    /// Drops every idle item.
    pub fn clear(&self) {
        for segment in &self.segments {
            segment.lock().clear();
        }
    }
}
