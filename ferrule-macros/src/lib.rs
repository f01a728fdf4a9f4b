use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;

use syn::spanned::Spanned as _;
use syn::{
    Attribute, Data, DeriveInput, Error, FnArg, GenericArgument, ImplItem, ItemImpl, LitStr,
    PathArguments, Type,
};

const INJECT_ATTR: &str = "inject";
const PROPERTY_ATTR: &str = "property";
const BEAN_ATTR: &str = "bean";

fn extract_generic(ty: &Type, outer: &str) -> Option<Type> {
    if let Type::Path(type_path) = ty
        && let Some(segment) = type_path.path.segments.last()
        && segment.ident == outer
        && let PathArguments::AngleBracketed(args) = &segment.arguments
        && let Some(GenericArgument::Type(inner)) = args.args.first()
    {
        return Some(inner.clone());
    }
    None
}

/// Maps a scalar field type onto its binding kind and the expression that
/// tests whether the current value is the zero value of that kind.
fn infer_kind(
    ty: &Type,
    field: &proc_macro2::TokenStream,
) -> Option<(proc_macro2::TokenStream, proc_macro2::TokenStream)> {
    let segment = match ty {
        Type::Path(type_path) => type_path.path.segments.last()?,
        _ => return None,
    };
    let ident = segment.ident.to_string();
    let (kind, zero) = match ident.as_str() {
        "String" => (quote! { String }, quote! { #field.is_empty() }),
        "i8" | "i16" | "i32" | "i64" | "isize" => (quote! { Int }, quote! { #field == 0 }),
        "u8" | "u16" | "u32" | "u64" | "usize" => (quote! { UInt }, quote! { #field == 0 }),
        "f32" | "f64" => (quote! { Float }, quote! { #field == 0.0 }),
        "bool" => (quote! { Bool }, quote! { !#field }),
        "Vec" => (quote! { StringList }, quote! { #field.is_empty() }),
        _ => return None,
    };
    Some((kind, zero))
}

struct InjectArgs {
    name: Option<String>,
    default: Option<String>,
}

fn parse_inject_args(attr: &Attribute) -> Result<InjectArgs, Error> {
    let mut args = InjectArgs {
        name: None,
        default: None,
    };
    if matches!(attr.meta, syn::Meta::Path(_)) {
        return Ok(args);
    }
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("name") {
            args.name = Some(meta.value()?.parse::<LitStr>()?.value());
            Ok(())
        } else if meta.path.is_ident("default") {
            if meta.input.peek(syn::Token![=]) {
                args.default = Some(meta.value()?.parse::<LitStr>()?.value());
            } else {
                args.default = Some(String::new());
            }
            Ok(())
        } else {
            Err(meta.error("unsupported inject argument"))
        }
    })?;
    Ok(args)
}

fn parse_property_tags(attr: &Attribute) -> Result<Vec<(String, String)>, Error> {
    let mut tags = Vec::new();
    attr.parse_nested_meta(|meta| {
        let key = meta
            .path
            .get_ident()
            .ok_or_else(|| meta.error("expected a tag key"))?
            .to_string();
        let value = meta.value()?.parse::<LitStr>()?.value();
        tags.push((key, value));
        Ok(())
    })?;
    Ok(tags)
}

fn lower_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '_' {
            upper_next = !out.is_empty();
            continue;
        }
        if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Derive macro for the Component trait
#[proc_macro_derive(Component, attributes(component, inject, property))]
pub fn derive_component(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    handle_derive_component(input)
}

fn handle_derive_component(input: DeriveInput) -> TokenStream {
    let name = &input.ident;
    let fields = match &input.data {
        Data::Struct(s) => &s.fields,
        _ => {
            return TokenStream::from(
                Error::new(name.span(), "Only structs are supported").to_compile_error(),
            );
        }
    };

    let mut explicit_name = None;
    for attr in &input.attrs {
        if attr.path().is_ident("component") {
            let result = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    explicit_name = Some(meta.value()?.parse::<LitStr>()?.value());
                    Ok(())
                } else {
                    Err(meta.error("unsupported component argument"))
                }
            });
            if let Err(err) = result {
                return TokenStream::from(err.to_compile_error());
            }
        }
    }

    let mut inject_stmts = Vec::new();
    let mut wire_stmts = Vec::new();

    match fields {
        syn::Fields::Named(fields) => {
            for field in &fields.named {
                let field_ident = field.ident.as_ref().unwrap();
                let field_ty = &field.ty;

                if let Some(attr) = field
                    .attrs
                    .iter()
                    .find(|attr| attr.path().is_ident(INJECT_ATTR))
                {
                    let args = match parse_inject_args(attr) {
                        Ok(args) => args,
                        Err(err) => return TokenStream::from(err.to_compile_error()),
                    };
                    let name_expr = match &args.name {
                        Some(name) => quote! { Some(#name) },
                        None => quote! { None },
                    };
                    if let Some(inner) = extract_generic(field_ty, "Late") {
                        wire_stmts.push(match &args.name {
                            Some(name) => quote! {
                                if let Some(value) = cx.peek_named::<#inner>(#name) {
                                    self.#field_ident.set(value);
                                }
                            },
                            None => quote! {
                                if let Some(value) = cx.peek::<#inner>() {
                                    self.#field_ident.set(value);
                                }
                            },
                        });
                    } else if let Some(arc) = extract_generic(field_ty, "Option")
                        && let Some(inner) = extract_generic(&arc, "Arc")
                    {
                        inject_stmts.push(match &args.default {
                            Some(seed) => quote! {
                                self.#field_ident =
                                    Some(cx.inject_or_default::<#inner>(#name_expr, #seed)?);
                            },
                            None => quote! {
                                self.#field_ident =
                                    Some(cx.inject_component::<#inner>(#name_expr)?);
                            },
                        });
                    } else {
                        return TokenStream::from(
                            Error::new(
                                field_ty.span(),
                                format!(
                                    "#[{INJECT_ATTR}] fields must be of type Option<Arc<T>> or Late<T>",
                                ),
                            )
                            .to_compile_error(),
                        );
                    }
                } else if let Some(attr) = field
                    .attrs
                    .iter()
                    .find(|attr| attr.path().is_ident(PROPERTY_ATTR))
                {
                    let tags = match parse_property_tags(attr) {
                        Ok(tags) => tags,
                        Err(err) => return TokenStream::from(err.to_compile_error()),
                    };
                    let field_access = quote! { self.#field_ident };
                    let (kind, zero) = match infer_kind(field_ty, &field_access) {
                        Some(v) => v,
                        None => {
                            return TokenStream::from(
                                Error::new(
                                    field_ty.span(),
                                    format!(
                                        "#[{PROPERTY_ATTR}] fields must be strings, numbers, bools or Vec<String>",
                                    ),
                                )
                                .to_compile_error(),
                            );
                        }
                    };
                    let field_name = field_ident.to_string();
                    let tag_keys = tags.iter().map(|(key, _)| key);
                    let tag_values = tags.iter().map(|(_, value)| value);
                    inject_stmts.push(quote! {
                        {
                            let view = ::ferrule::FieldView {
                                name: #field_name,
                                kind: ::ferrule::Kind::#kind,
                                zero: #zero,
                            };
                            const TAGS: &[(&str, &str)] = &[#((#tag_keys, #tag_values)),*];
                            if let Some(value) = cx.apply_field(&view, TAGS) {
                                self.#field_ident = value;
                            }
                        }
                    });
                }
            }
        }
        syn::Fields::Unnamed(_) => {
            return TokenStream::from(
                Error::new(name.span(), "Tuple structs are not supported").to_compile_error(),
            );
        }
        syn::Fields::Unit => {}
    }

    let explicit_name_fn = explicit_name.map(|name| {
        quote! {
            fn explicit_name() -> Option<&'static str> {
                Some(#name)
            }
        }
    });

    quote! {
        impl ::ferrule::Component for #name {
            #explicit_name_fn

            #[allow(unused_variables)]
            fn inject(
                &mut self,
                cx: &mut ::ferrule::Resolver<'_>,
            ) -> Result<(), ::ferrule::ContainerError> {
                #(#inject_stmts)*
                Ok(())
            }

            #[allow(unused_variables)]
            fn wire(&self, cx: &::ferrule::Wiring<'_>) {
                #(#wire_stmts)*
            }
        }
    }
    .into()
}

/// Derive macro for the Properties trait
#[proc_macro_derive(Properties, attributes(properties, property))]
pub fn derive_properties(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    handle_derive_properties(input)
}

fn handle_derive_properties(input: DeriveInput) -> TokenStream {
    let name = &input.ident;
    let fields = match &input.data {
        Data::Struct(syn::DataStruct {
            fields: syn::Fields::Named(fields),
            ..
        }) => fields,
        _ => {
            return TokenStream::from(
                Error::new(name.span(), "Only structs with named fields are supported")
                    .to_compile_error(),
            );
        }
    };

    let mut prefix = None;
    for attr in &input.attrs {
        if attr.path().is_ident("properties") {
            let result = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("prefix") {
                    prefix = Some(meta.value()?.parse::<LitStr>()?.value());
                    Ok(())
                } else {
                    Err(meta.error("unsupported properties argument"))
                }
            });
            if let Err(err) = result {
                return TokenStream::from(err.to_compile_error());
            }
        }
    }
    let prefix = match prefix {
        Some(prefix) => prefix,
        None => {
            return TokenStream::from(
                Error::new(name.span(), "Missing #[properties(prefix = \"...\")] attribute")
                    .to_compile_error(),
            );
        }
    };

    let mut field_tags = Vec::new();
    for field in &fields.named {
        let attr = match field
            .attrs
            .iter()
            .find(|attr| attr.path().is_ident(PROPERTY_ATTR))
        {
            Some(attr) => attr,
            None => continue,
        };
        let tags = match parse_property_tags(attr) {
            Ok(tags) => tags,
            Err(err) => return TokenStream::from(err.to_compile_error()),
        };
        let field_ident = field.ident.as_ref().unwrap();
        let field_name = field_ident.to_string();
        let placeholder = quote! { value };
        let (kind, _) = match infer_kind(&field.ty, &placeholder) {
            Some(v) => v,
            None => {
                return TokenStream::from(
                    Error::new(
                        field.ty.span(),
                        format!(
                            "#[{PROPERTY_ATTR}] fields must be strings, numbers, bools or Vec<String>",
                        ),
                    )
                    .to_compile_error(),
                );
            }
        };
        let tag_keys = tags.iter().map(|(key, _)| key);
        let tag_values = tags.iter().map(|(_, value)| value);
        field_tags.push(quote! {
            ::ferrule::FieldTag {
                name: #field_name,
                kind: ::ferrule::Kind::#kind,
                tags: &[#((#tag_keys, #tag_values)),*],
            }
        });
    }

    quote! {
        impl ::ferrule::Component for #name {}

        impl ::ferrule::Properties for #name {
            fn prefix() -> &'static str {
                #prefix
            }

            fn field_tags() -> &'static [::ferrule::FieldTag] {
                &[#(#field_tags),*]
            }
        }
    }
    .into()
}

/// Attribute macro for impl blocks with bean factory methods
#[proc_macro_attribute]
pub fn configuration(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut role = None;
    let mut profile = None;
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("role") {
            role = Some(meta.value()?.parse::<LitStr>()?);
            Ok(())
        } else if meta.path.is_ident("profile") {
            profile = Some(meta.value()?.parse::<LitStr>()?.value());
            Ok(())
        } else {
            Err(meta.error("unsupported configuration argument"))
        }
    });
    syn::parse_macro_input!(attr with parser);
    let role = match role.as_ref().map(|lit| (lit.value(), lit)) {
        None => quote! { Configuration },
        Some((value, _)) if value == "configuration" => quote! { Configuration },
        Some((value, _)) if value == "pre" => quote! { PreConfiguration },
        Some((value, _)) if value == "post" => quote! { PostConfiguration },
        Some((_, lit)) => {
            return TokenStream::from(
                Error::new(lit.span(), "Role must be one of: pre, configuration, post")
                    .to_compile_error(),
            );
        }
    };

    if let Ok(item_impl) = syn::parse::<ItemImpl>(item) {
        return handle_configuration_impl(item_impl, role, profile);
    }
    TokenStream::from(
        Error::new(
            Span::call_site(),
            "#[configuration] can only be applied to impl blocks",
        )
        .to_compile_error(),
    )
}

fn handle_configuration_impl(
    input: ItemImpl,
    role: proc_macro2::TokenStream,
    profile: Option<String>,
) -> TokenStream {
    if input.trait_.is_some() {
        return TokenStream::from(
            Error::new(input.span(), "Trait impls are not supported").to_compile_error(),
        );
    }

    let self_ty = &input.self_ty;
    let mut bean_stmts = Vec::new();

    for item in &input.items {
        let method = match item {
            ImplItem::Fn(method) => method,
            _ => continue,
        };
        let attr = match method
            .attrs
            .iter()
            .find(|attr| attr.path().is_ident(BEAN_ATTR))
        {
            Some(attr) => attr,
            None => continue,
        };

        let mut bean_name = None;
        if !matches!(attr.meta, syn::Meta::Path(_)) {
            let result = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    bean_name = Some(meta.value()?.parse::<LitStr>()?.value());
                    Ok(())
                } else {
                    Err(meta.error("unsupported bean argument"))
                }
            });
            if let Err(err) = result {
                return TokenStream::from(err.to_compile_error());
            }
        }

        let method_ident = &method.sig.ident;
        let bean_name = bean_name.unwrap_or_else(|| method_ident.to_string());
        let display_name = lower_camel(&bean_name);

        let mut inputs = method.sig.inputs.iter();
        match inputs.next() {
            Some(FnArg::Receiver(receiver)) if receiver.reference.is_some() => {}
            _ => {
                return TokenStream::from(
                    Error::new(method.sig.span(), "Bean methods must take &self")
                        .to_compile_error(),
                );
            }
        }

        let mut arg_inits = Vec::new();
        let mut arg_names = Vec::new();
        for (index, fn_arg) in inputs.enumerate() {
            let pat_type = match fn_arg {
                FnArg::Typed(pat_type) => pat_type,
                FnArg::Receiver(_) => continue,
            };
            let inner = match extract_generic(&pat_type.ty, "Arc") {
                Some(inner) => inner,
                None => {
                    return TokenStream::from(
                        Error::new(pat_type.ty.span(), "Bean arguments must be of type Arc<T>")
                            .to_compile_error(),
                    );
                }
            };
            let arg_name = quote::format_ident!("arg{index}");
            arg_inits.push(quote! {
                let #arg_name = _cx.resolve_arc::<#inner>()?;
            });
            arg_names.push(arg_name);
        }

        let returns_result = match &method.sig.output {
            syn::ReturnType::Type(_, ty) => {
                matches!(ty.as_ref(), Type::Path(path)
                    if path.path.segments.last().is_some_and(|s| s.ident == "Result"))
            }
            syn::ReturnType::Default => {
                return TokenStream::from(
                    Error::new(method.sig.span(), "Bean methods must have a return type")
                        .to_compile_error(),
                );
            }
        };

        let call = quote! { this.#method_ident(#(#arg_names),*) };
        let body = if returns_result {
            quote! {
                #(#arg_inits)*
                #call.map_err(|source| ::ferrule::ContainerError::Constructor {
                    name: #display_name.to_string(),
                    source: source.into(),
                })
            }
        } else {
            quote! {
                #(#arg_inits)*
                Ok(#call)
            }
        };

        bean_stmts.push(quote! {
            {
                let this = ::std::sync::Arc::clone(this);
                beans.push(::ferrule::BeanDefinition::new(
                    #bean_name,
                    move |_cx: &mut ::ferrule::Resolver<'_>| {
                        #body
                    },
                ));
            }
        });
    }

    // Re-emit the impl block with bean attributes stripped.
    let mut cleaned_input = input.clone();
    for item in &mut cleaned_input.items {
        if let ImplItem::Fn(method) = item {
            method.attrs.retain(|attr| !attr.path().is_ident(BEAN_ATTR));
        }
    }

    let profile_fn = profile.map(|profile| {
        quote! {
            fn profile() -> Option<&'static str> {
                Some(#profile)
            }
        }
    });

    quote! {
        #cleaned_input

        impl ::ferrule::ConfigurationSource for #self_ty {
            fn role() -> ::ferrule::Role {
                ::ferrule::Role::#role
            }

            #profile_fn

            fn beans(this: &::std::sync::Arc<Self>) -> Vec<::ferrule::BeanDefinition> {
                let mut beans = Vec::new();
                #(#bean_stmts)*
                beans
            }
        }
    }
    .into()
}
