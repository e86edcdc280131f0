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

//! # Knot Core
//!
//! Binary object-graph serialization: a [`Knot`] turns a possibly cyclic graph
//! of typed values into bytes and back, keeping shared pointers shared. The
//! same traversal also produces deep and shallow in-memory copies.
//!
//! ## Architecture
//!
//! - **`buffer`**: `Writer` / `Reader` with the variable-length encodings,
//!   marks, length backpatching and chunked framing
//! - **`codec`**: stateless zig-zag, size and fixed-point helpers
//! - **`resolver`**: the type registry, the reference tables, the
//!   per-operation contexts and the checkout/checkin pool
//! - **`serializer`**: the [`Serializer`] contract and the built-in serializers
//! - **`continuation`**: resumable write work for unbounded sequences
//! - **`knot`**: the engine and its incremental [`WriteSession`]
//!
//! ## Wire format
//!
//! A graph starts with a header byte holding the wire version and the
//! writer's reference and float modes, followed by the float precision factor
//! when fixed-point floats are on. Shared pointers (`Rc`, `Arc`) are
//! preceded by a reference tag: `0` null, `1` new object, `n >= 2`
//! backreference. Plain values carry no framing at all. Values of a type known
//! only at runtime are preceded by a class tag: `0` null, `1` name follows,
//! `n >= 2` registration id `n - 2`.
//!
//! ## Usage
//!
//! ```rust
//! use knot_core::Knot;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let knot = Knot::default();
//! let cell = Rc::new(RefCell::new(vec![1i32, 2, 3]));
//! let bytes = knot.serialize(&vec![cell.clone(), cell]).unwrap();
//! let back: Vec<Rc<RefCell<Vec<i32>>>> = knot.deserialize(&bytes).unwrap();
//! back[0].borrow_mut().push(4);
//! assert_eq!(*back[1].borrow(), vec![1, 2, 3, 4]);
//! ```

pub mod buffer;
pub mod codec;
pub mod config;
pub mod continuation;
pub mod error;
pub mod knot;
pub mod resolver;
pub mod serializer;
pub mod types;
pub mod util;

pub use buffer::{Mark, Reader, Writer};
pub use config::Config;
pub use continuation::{Continuation, Progress, SequenceContinuation};
pub use error::Error;
pub use knot::{Knot, KnotPool, WriteSession};
pub use resolver::context::{CopyContext, GraphContext, ReadContext, WriteContext};
pub use resolver::pool::Pool;
pub use resolver::type_resolver::{Harness, ImportPolicy, Registration, TypeResolver};
pub use serializer::{
    downcast_rc, CustomSerializer, DynObject, Generated, KnotDefault, Serializer,
};
