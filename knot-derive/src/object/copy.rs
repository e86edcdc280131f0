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

pub fn gen_copy_fields(
    fields: &[SourceField],
    owner: &str,
    source: impl Fn(&SourceField) -> TokenStream,
) -> Vec<TokenStream> {
    fields
        .iter()
        .map(|field| {
            if field.skip {
                return field.init(quote! { ::knot_core::serializer::KnotDefault::knot_default() });
            }
            let name = &field.name;
            let value = source(field);
            field.init(quote! { context.copy_field(#value, #name, #owner)? })
        })
        .collect()
}

pub fn gen_copy(fields: &[SourceField], owner: &str) -> TokenStream {
    let inits = gen_copy_fields(fields, owner, |field| {
        let member = &field.member;
        quote! { &self.#member }
    });
    quote! {
        Ok(Self { #(#inits),* })
    }
}
