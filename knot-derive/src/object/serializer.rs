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

use crate::object::{copy, derive_enum, read, write};
use crate::util::{has_knot_flag, source_fields};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{parse_quote, Data, DeriveInput, Generics};

/// Every type parameter must itself be serializable and have a placeholder.
fn add_trait_bounds(generics: &Generics) -> Generics {
    let mut generics = generics.clone();
    for param in generics.type_params_mut() {
        param
            .bounds
            .push(parse_quote!(::knot_core::serializer::Serializer));
        param
            .bounds
            .push(parse_quote!(::knot_core::serializer::KnotDefault));
    }
    generics
}

pub fn derive_serializer(ast: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &ast.ident;
    let owner = name.to_string();
    let generics = add_trait_bounds(&ast.generics);
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let (write_ts, read_ts, copy_ts, default_ts) = match &ast.data {
        Data::Struct(s) => {
            let fields = source_fields(&s.fields)?;
            (
                write::gen_write_data(&fields, &owner),
                read::gen_read_data(&fields, &owner),
                copy::gen_copy(&fields, &owner),
                read::gen_default(&fields),
            )
        }
        Data::Enum(e) => {
            if e.variants.is_empty() {
                return Err(syn::Error::new_spanned(
                    name,
                    "KnotObject cannot be derived for an enum without variants",
                ));
            }
            (
                derive_enum::gen_write_data(e, &owner)?,
                derive_enum::gen_read_data(e, &owner)?,
                derive_enum::gen_copy(e, &owner)?,
                derive_enum::gen_default(e)?,
            )
        }
        Data::Union(u) => {
            return Err(syn::Error::new_spanned(
                u.union_token,
                "KnotObject cannot be derived for unions",
            ))
        }
    };

    let default_impl = if has_knot_flag(&ast.attrs, "no_default")? {
        quote! {}
    } else {
        quote! {
            impl #impl_generics ::knot_core::serializer::KnotDefault for #name #ty_generics #where_clause {
                fn knot_default() -> Self {
                    #default_ts
                }
            }
        }
    };

    Ok(quote! {
        impl #impl_generics ::knot_core::serializer::Serializer for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn knot_write_data(
                &self,
                context: &mut ::knot_core::resolver::context::WriteContext,
            ) -> ::std::result::Result<(), ::knot_core::error::Error> {
                #write_ts
            }

            #[allow(unused_variables)]
            fn knot_read_data(
                context: &mut ::knot_core::resolver::context::ReadContext,
            ) -> ::std::result::Result<Self, ::knot_core::error::Error> {
                #read_ts
            }

            #[allow(unused_variables)]
            fn knot_copy(
                &self,
                context: &mut ::knot_core::resolver::context::CopyContext,
            ) -> ::std::result::Result<Self, ::knot_core::error::Error> {
                #copy_ts
            }

            #[inline(always)]
            fn knot_requires_registration() -> bool {
                true
            }
        }

        #default_impl
    })
}
