/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */
#![forbid(unsafe_code)]

//! Weft Macro Library
//!
//! Procedural macros for declaring Weft message kinds.
//!
//! ```ignore
//! // Kind named after the type: "WorkItem"
//! #[weft_message]
//! pub struct WorkItem {
//!     pub index: usize,
//! }
//!
//! // Explicit kind name, e.g. to keep trace records stable across renames
//! #[weft_message(kind = "Done")]
//! pub struct WorkDone {
//!     pub value: i64,
//! }
//! ```

use proc_macro::TokenStream;

use quote::quote;
use syn::{parse_macro_input, DeriveInput, LitStr};

fn has_derive(input: &DeriveInput, trait_name: &str) -> bool {
    input.attrs.iter().any(|attr| {
        if attr.path().is_ident("derive") {
            let mut found = false;
            let _ = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident(trait_name) {
                    found = true;
                }
                Ok(())
            });
            found
        } else {
            false
        }
    })
}

/// Options accepted by `#[weft_message(...)]`.
#[derive(Default)]
struct MessageOptions {
    /// Overrides the kind name used for dispatch and trace records.
    kind: Option<LitStr>,
}

impl MessageOptions {
    fn parse(attr: TokenStream) -> syn::Result<Self> {
        let mut options = Self::default();
        if attr.is_empty() {
            return Ok(options);
        }
        let parser = syn::meta::parser(|meta| {
            if meta.path.is_ident("kind") {
                options.kind = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("unsupported weft_message option, expected `kind = \"...\"`"))
            }
        });
        syn::parse::Parser::parse(parser, attr)?;
        Ok(options)
    }
}

/// Declares a type as a Weft message kind.
///
/// The attribute:
/// - derives `Clone` and `Debug` when they are not already derived,
/// - implements `weft::prelude::WeftMessage` and `weft::prelude::MessageKind`,
///   naming the kind after the type unless `kind = "..."` is given,
/// - asserts at compile time that the type is `Send + Sync + 'static`.
///
/// Generic message types are not supported: a kind is one fixed category name.
#[proc_macro_attribute]
pub fn weft_message(attr: TokenStream, item: TokenStream) -> TokenStream {
    let options = match MessageOptions::parse(attr) {
        Ok(options) => options,
        Err(err) => return err.to_compile_error().into(),
    };

    let input = parse_macro_input!(item as DeriveInput);
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(
            &input.generics,
            "weft_message types cannot be generic; a message kind is a single named category",
        )
        .to_compile_error()
        .into();
    }

    let kind_name = options
        .kind
        .map_or_else(|| name.to_string(), |lit| lit.value());

    let derives = {
        let mut traits = Vec::new();
        if !has_derive(&input, "Clone") {
            traits.push(quote!(Clone));
        }
        if !has_derive(&input, "Debug") {
            traits.push(quote!(Debug));
        }
        if traits.is_empty() {
            quote!()
        } else {
            quote!(#[derive(#(#traits),*)])
        }
    };

    let assert_ident = quote::format_ident!("_AssertWeftMessage_{}", name);

    let expanded = quote! {
        #derives
        #input

        impl ::weft::prelude::MessageKind for #name {
            const KIND: &'static str = #kind_name;
        }

        impl ::weft::prelude::WeftMessage for #name {
            fn definition(&self) -> ::weft::prelude::MessageDefinition {
                <Self as ::weft::prelude::MessageKind>::kind()
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn into_any(
                self: ::std::sync::Arc<Self>,
            ) -> ::std::sync::Arc<dyn ::std::any::Any + Send + Sync> {
                self
            }
        }

        #[doc(hidden)]
        #[allow(dead_code, non_camel_case_types, non_snake_case)]
        const _: () = {
            fn #assert_ident() {
                fn assert_bounds<T: Send + Sync + 'static>() {}
                assert_bounds::<#name>();
            }
        };
    };

    TokenStream::from(expanded)
}
