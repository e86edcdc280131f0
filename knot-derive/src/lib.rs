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

//! # Knot Derive Macros
//!
//! `#[derive(KnotObject)]` implements `knot_core::Serializer` and
//! `knot_core::KnotDefault` for structs and enums.
//!
//! - Struct fields are written in declaration order, each through the engine,
//!   so shared pointers in fields take part in reference tracking.
//! - Enums write the variant ordinal as a varint, then the variant's fields.
//! - Derived types require registration when the engine runs in closed-world
//!   mode.
//!
//! ```rust,ignore
//! use knot::KnotObject;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! #[derive(KnotObject)]
//! struct Node {
//!     value: i32,
//!     next: Option<Rc<RefCell<Node>>>,
//! }
//! ```
//!
//! ## Attributes
//!
//! - `#[knot(skip)]` on a field: not written; read and copied as its
//!   `KnotDefault` value.
//! - `#[knot(no_default)]` on the type: no `KnotDefault` impl is generated, for
//!   types that implement it by hand.
//! - `#[knot(default)]` on an enum variant: the variant used as the `KnotDefault`
//!   value instead of the first one.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod object;
mod util;

#[proc_macro_derive(KnotObject, attributes(knot))]
pub fn proc_macro_derive_knot_object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    object::derive_serializer(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
