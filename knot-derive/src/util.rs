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

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Attribute, Field, Fields, Ident, Member};

/// A field of a struct or enum variant, addressed the same way for named and
/// tuple layouts (`Self { 0: .. }` is valid for tuple structs).
pub struct SourceField<'a> {
    pub member: Member,
    pub name: String,
    pub field: &'a Field,
    pub skip: bool,
}

impl SourceField<'_> {
    /// Binding used when the field is matched out of an enum variant.
    pub fn binding(&self) -> Ident {
        match &self.member {
            Member::Named(ident) => ident.clone(),
            Member::Unnamed(index) => format_ident!("field_{}", index.index),
        }
    }

    pub fn init(&self, value: TokenStream) -> TokenStream {
        let member = &self.member;
        quote! { #member: #value }
    }
}

pub fn source_fields(fields: &Fields) -> syn::Result<Vec<SourceField<'_>>> {
    fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let (member, name) = match &field.ident {
                Some(ident) => (Member::Named(ident.clone()), ident.to_string()),
                None => (Member::Unnamed(index.into()), index.to_string()),
            };
            Ok(SourceField {
                member,
                name,
                field,
                skip: has_knot_flag(&field.attrs, "skip")?,
            })
        })
        .collect()
}

/// Whether `#[knot(flag)]` is present among `attrs`.
pub fn has_knot_flag(attrs: &[Attribute], flag: &str) -> syn::Result<bool> {
    let mut found = false;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("knot")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident(flag) {
                found = true;
                Ok(())
            } else if ["skip", "no_default", "default"]
                .iter()
                .any(|known| meta.path.is_ident(known))
            {
                Ok(())
            } else {
                Err(meta.error("unknown knot attribute"))
            }
        })?;
    }
    Ok(found)
}
