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

//! # Knot
//!
//! Knot writes object graphs to a compact binary form and reads them back,
//! keeping shared pointers shared and cycles intact. The same engine makes
//! deep and shallow in-memory copies of a graph.
//!
//! ## Key Features
//!
//! - **Reference tracking**: `Rc` and `Arc` values reachable more than once are
//!   written once and restored as one allocation
//! - **Cycles**: `Rc<RefCell<T>>` and `Arc<Mutex<T>>` graphs may point back at
//!   themselves
//! - **Compact integers**: 7-bit variable-length encodings, zig-zag for signed
//!   values
//! - **Runtime types**: `Box<dyn DynObject>` and `Rc<dyn DynObject>` carry a
//!   class tag resolved through the engine's registry
//! - **Incremental writes**: generated sequences are written step by step
//!   through a [`WriteSession`]
//!
//! ## Object graphs
//!
//! ```rust
//! use knot::{Error, Knot, KnotObject};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! #[derive(KnotObject)]
//! struct Node {
//!     label: String,
//!     next: Option<Rc<RefCell<Node>>>,
//! }
//!
//! # fn main() -> Result<(), Error> {
//! let a = Rc::new(RefCell::new(Node { label: "a".to_string(), next: None }));
//! let b = Rc::new(RefCell::new(Node { label: "b".to_string(), next: Some(a.clone()) }));
//! a.borrow_mut().next = Some(b.clone());
//!
//! let mut knot = Knot::default();
//! knot.register::<Node>()?;
//!
//! let bytes = knot.serialize(&a)?;
//! let back: Rc<RefCell<Node>> = knot.deserialize(&bytes)?;
//!
//! let next = back.borrow().next.clone().unwrap();
//! assert_eq!(next.borrow().label, "b");
//! assert!(Rc::ptr_eq(next.borrow().next.as_ref().unwrap(), &back));
//! # a.borrow_mut().next = None;
//! # back.borrow_mut().next = None;
//! # Ok(())
//! # }
//! ```
//!
//! ## Closed-world mode
//!
//! With [`Knot::registration_required`], every derived type must be registered
//! before it is written or read; registration ids are then the only class
//! information on the wire.
//!
//! ```rust
//! use knot::{Error, Knot, KnotObject};
//!
//! #[derive(KnotObject, Debug, PartialEq)]
//! struct Point(i32, i32);
//!
//! let knot = Knot::new().registration_required(true);
//! assert!(matches!(
//!     knot.serialize(&Point(1, 2)),
//!     Err(Error::UnregisteredClass(_))
//! ));
//! ```
//!
//! ## Getting started
//!
//! Derived code refers to `knot_core`, so depend on both crates:
//!
//! ```toml
//! [dependencies]
//! knot = "0.3"
//! knot-core = "0.3"
//! ```

pub use knot_core::{
    downcast_rc, error::Error, Config, CustomSerializer, DynObject, Generated, GraphContext,
    ImportPolicy, Knot, KnotDefault, KnotPool, Progress, Reader, Serializer, TypeResolver,
    WriteSession, Writer,
};
pub use knot_derive::KnotObject;
