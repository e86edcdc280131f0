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

use knot_core::error::Error;
use knot_core::Knot;
use knot_derive::KnotObject;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

#[derive(KnotObject)]
struct Node {
    value: i32,
    next: Option<Rc<RefCell<Node>>>,
}

#[derive(KnotObject)]
struct TreeNode {
    name: String,
    parent: Option<Rc<RefCell<TreeNode>>>,
    children: Vec<Rc<RefCell<TreeNode>>>,
}

#[derive(KnotObject, Debug, PartialEq)]
struct Account {
    owner: String,
    balance: i64,
}

#[derive(KnotObject)]
struct Diamond {
    left: Rc<String>,
    right: Rc<String>,
}

#[test]
fn test_shared_pointer_wire_format() {
    let knot = Knot::default();
    let shared = Rc::new(7i32);
    let bytes = knot.serialize(&vec![shared.clone(), shared]).unwrap();
    // header, length, new object 7, backreference to id 2
    assert_eq!(bytes, [0x11, 2, 1, 14, 2]);

    let back: Vec<Rc<i32>> = knot.deserialize(&bytes).unwrap();
    assert_eq!(*back[0], 7);
    assert!(Rc::ptr_eq(&back[0], &back[1]));
}

#[test]
fn test_references_disabled() {
    let knot = Knot::new().references(false);
    let shared = Rc::new(7i32);
    let bytes = knot.serialize(&vec![shared.clone(), shared]).unwrap();
    assert_eq!(bytes, [0x10, 2, 14, 14]);

    let back: Vec<Rc<i32>> = knot.deserialize(&bytes).unwrap();
    assert_eq!(back, vec![Rc::new(7), Rc::new(7)]);
    assert!(!Rc::ptr_eq(&back[0], &back[1]));
}

#[test]
fn test_distinct_equal_values_stay_distinct() {
    let knot = Knot::default();
    let list = vec![Rc::new("x".to_string()), Rc::new("x".to_string())];
    let back: Vec<Rc<String>> = knot.deserialize(&knot.serialize(&list).unwrap()).unwrap();
    assert!(!Rc::ptr_eq(&back[0], &back[1]));
}

#[test]
fn test_diamond_fields() {
    let knot = Knot::default();
    let shared = Rc::new("shared".to_string());
    let diamond = Diamond {
        left: shared.clone(),
        right: shared,
    };
    let back: Diamond = knot.deserialize(&knot.serialize(&diamond).unwrap()).unwrap();
    assert_eq!(*back.left, "shared");
    assert!(Rc::ptr_eq(&back.left, &back.right));
}

#[test]
fn test_self_cycle() {
    let knot = Knot::default();
    let node = Rc::new(RefCell::new(Node {
        value: 1,
        next: None,
    }));
    node.borrow_mut().next = Some(node.clone());

    let bytes = knot.serialize(&node).unwrap();
    assert_eq!(bytes, [0x11, 1, 2, 2]);
    let back: Rc<RefCell<Node>> = knot.deserialize(&bytes).unwrap();
    assert_eq!(back.borrow().value, 1);
    let next = back.borrow().next.clone().unwrap();
    assert!(Rc::ptr_eq(&next, &back));

    node.borrow_mut().next = None;
    back.borrow_mut().next = None;
}

#[test]
fn test_two_node_cycle() {
    let knot = Knot::default();
    let a = Rc::new(RefCell::new(Node {
        value: 1,
        next: None,
    }));
    let b = Rc::new(RefCell::new(Node {
        value: 2,
        next: Some(a.clone()),
    }));
    a.borrow_mut().next = Some(b.clone());

    let back: Rc<RefCell<Node>> = knot.deserialize(&knot.serialize(&a).unwrap()).unwrap();
    let back_b = back.borrow().next.clone().unwrap();
    assert_eq!(back_b.borrow().value, 2);
    let back_a = back_b.borrow().next.clone().unwrap();
    assert!(Rc::ptr_eq(&back_a, &back));

    a.borrow_mut().next = None;
    back.borrow_mut().next = None;
}

#[test]
fn test_tree_with_parent_links() {
    let knot = Knot::default();
    let root = Rc::new(RefCell::new(TreeNode {
        name: "root".to_string(),
        parent: None,
        children: vec![],
    }));
    for name in ["left", "right"] {
        let child = Rc::new(RefCell::new(TreeNode {
            name: name.to_string(),
            parent: Some(root.clone()),
            children: vec![],
        }));
        root.borrow_mut().children.push(child);
    }

    let back: Rc<RefCell<TreeNode>> = knot.deserialize(&knot.serialize(&root).unwrap()).unwrap();
    let names: Vec<String> = back
        .borrow()
        .children
        .iter()
        .map(|child| child.borrow().name.clone())
        .collect();
    assert_eq!(names, ["left", "right"]);
    for child in &back.borrow().children {
        assert!(Rc::ptr_eq(child.borrow().parent.as_ref().unwrap(), &back));
    }

    root.borrow_mut().children.clear();
    back.borrow_mut().children.clear();
}

#[test]
fn test_arc_mutex_identity() {
    let knot = Knot::default();
    let account = Arc::new(Mutex::new(Account {
        owner: "ann".to_string(),
        balance: -20,
    }));
    let accounts = vec![account.clone(), account];

    let back: Vec<Arc<Mutex<Account>>> =
        knot.deserialize(&knot.serialize(&accounts).unwrap()).unwrap();
    assert!(Arc::ptr_eq(&back[0], &back[1]));
    back[0].lock().unwrap().balance += 50;
    assert_eq!(back[1].lock().unwrap().balance, 30);
}

#[test]
fn test_unresolved_backreference() {
    let knot = Knot::default();
    let err = knot.deserialize::<Rc<i32>>(&[0x11, 5]).unwrap_err();
    assert!(matches!(err, Error::UnresolvedReference(_)));
}

#[test]
fn test_reference_mode_mismatch() {
    let bytes = Knot::default().serialize(&Rc::new(1i32)).unwrap();
    let err = Knot::new()
        .references(false)
        .deserialize::<Rc<i32>>(&bytes)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidData(_)));
}
