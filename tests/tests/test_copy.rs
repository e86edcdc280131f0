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

use knot_core::Knot;
use knot_derive::KnotObject;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(KnotObject, Debug, PartialEq)]
struct Holder {
    name: String,
    first: Rc<String>,
    second: Rc<String>,
    scores: HashMap<String, i32>,
}

#[derive(KnotObject)]
struct Node {
    value: i32,
    next: Option<Rc<RefCell<Node>>>,
}

fn holder() -> Holder {
    let shared = Rc::new("shared".to_string());
    Holder {
        name: "holder".to_string(),
        first: shared.clone(),
        second: shared,
        scores: HashMap::from([("a".to_string(), 1), ("b".to_string(), 2)]),
    }
}

#[test]
fn test_deep_copy() {
    let knot = Knot::default();
    let original = holder();
    let copy = knot.copy(&original).unwrap();
    assert_eq!(copy, original);
    assert!(!Rc::ptr_eq(&copy.first, &original.first));
    assert!(Rc::ptr_eq(&copy.first, &copy.second));
}

#[test]
fn test_shallow_copy_aliases_nested_pointers() {
    let knot = Knot::default();
    let original = holder();
    let copy = knot.copy_shallow(&original).unwrap();
    assert_eq!(copy, original);
    assert!(Rc::ptr_eq(&copy.first, &original.first));
    assert!(Rc::ptr_eq(&copy.second, &original.second));
}

#[test]
fn test_shallow_copy_of_shared_root() {
    let knot = Knot::default();
    let inner = Rc::new(RefCell::new(Node {
        value: 2,
        next: None,
    }));
    let root = Rc::new(RefCell::new(Node {
        value: 1,
        next: Some(inner.clone()),
    }));
    let copy = knot.copy_shallow(&root).unwrap();
    assert!(!Rc::ptr_eq(&copy, &root));
    assert!(Rc::ptr_eq(copy.borrow().next.as_ref().unwrap(), &inner));
}

#[test]
fn test_deep_copy_keeps_cycles() {
    let knot = Knot::default();
    let node = Rc::new(RefCell::new(Node {
        value: 5,
        next: None,
    }));
    node.borrow_mut().next = Some(node.clone());

    let copy = knot.copy(&node).unwrap();
    assert!(!Rc::ptr_eq(&copy, &node));
    assert_eq!(copy.borrow().value, 5);
    assert!(Rc::ptr_eq(copy.borrow().next.as_ref().unwrap(), &copy));

    node.borrow_mut().next = None;
    copy.borrow_mut().next = None;
}

#[test]
fn test_copy_preserves_sharing_without_references() {
    let knot = Knot::new().references(false);
    let shared = Rc::new(3u64);
    let copy = knot.copy(&vec![shared.clone(), shared.clone()]).unwrap();
    assert!(Rc::ptr_eq(&copy[0], &copy[1]));
    assert!(!Rc::ptr_eq(&copy[0], &shared));
}
