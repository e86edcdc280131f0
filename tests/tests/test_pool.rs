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

use knot_core::{Knot, KnotPool};
use knot_derive::KnotObject;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

#[derive(KnotObject, Debug, PartialEq, Eq, Hash, Clone)]
struct Item {
    id: i64,
    name: String,
}

fn registered_knot() -> Knot {
    let mut knot = Knot::new().registration_required(true);
    knot.register::<Item>().unwrap();
    knot
}

#[test]
fn test_shared_engine_across_threads() {
    let knot = Arc::new(registered_knot());
    let handles: Vec<_> = (0..8)
        .map(|id| {
            let knot = Arc::clone(&knot);
            thread::spawn(move || {
                let item = Item {
                    id,
                    name: format!("item-{id}"),
                };
                let bytes = knot.serialize(&item).unwrap();
                knot.deserialize::<Item>(&bytes).unwrap()
            })
        })
        .collect();
    let items: HashSet<Item> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(items.len(), 8);
    assert!(items.contains(&Item {
        id: 3,
        name: "item-3".to_string()
    }));
}

#[test]
fn test_engine_pool() {
    let _ = env_logger::builder().is_test(true).try_init();
    let pool = Arc::new(KnotPool::new(registered_knot));
    let handles: Vec<_> = (0..8)
        .map(|id| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                (0..50)
                    .map(|round| {
                        pool.with(|knot| {
                            let item = Item {
                                id: id * 100 + round,
                                name: "pooled".to_string(),
                            };
                            let copy = knot.copy(&item).unwrap();
                            let back: Item =
                                knot.deserialize(&knot.serialize(&item).unwrap()).unwrap();
                            assert_eq!(copy, back);
                            back.id
                        })
                    })
                    .sum::<i64>()
            })
        })
        .collect();
    let total: i64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    let expected: i64 = (0..8)
        .map(|id| (0..50).map(|round| id * 100 + round).sum::<i64>())
        .sum();
    assert_eq!(total, expected);
    assert!(pool.idle() >= 1);
}

#[test]
fn test_pool_idle_cap() {
    let pool = KnotPool::with_capacity(1, Knot::default);
    let first = pool.checkout();
    let second = pool.checkout();
    pool.checkin(first);
    pool.checkin(second);
    assert_eq!(pool.idle(), 1);
}

#[test]
fn test_engines_cross_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Knot>();
    assert_send_sync::<KnotPool>();
}
