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

use crate::util::SourceField;
use proc_macro2::TokenStream;
use quote::quote;

fn placeholder() -> TokenStream {
    quote! { ::knot_core::serializer::KnotDefault::knot_default() }
}

/// Field initializers in declaration order; skipped fields get placeholders.
pub fn gen_read_fields(fields: &[SourceField], owner: &str) -> Vec<TokenStream> {
    fields
        .iter()
        .map(|field| {
            let name = &field.name;
            if field.skip {
                field.init(placeholder())
            } else {
                field.init(quote! { context.read_field(#name, #owner)? })
            }
        })
        .collect()
}

pub fn gen_read_data(fields: &[SourceField], owner: &str) -> TokenStream {
    let inits = gen_read_fields(fields, owner);
    quote! {
        Ok(Self { #(#inits),* })
    }
}

pub fn gen_default_fields(fields: &[SourceField]) -> Vec<TokenStream> {
    fields.iter().map(|field| field.init(placeholder())).collect()
}

pub fn gen_default(fields: &[SourceField]) -> TokenStream {
    let inits = gen_default_fields(fields);
    quote! {
        Self { #(#inits),* }
    }
}
