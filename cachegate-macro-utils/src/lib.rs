//! Shared attribute-parsing and code-generation helpers for the cachegate
//! procedural macros (`#[cacheable]`, `#[cache_put]`, `#[cache_evict]`,
//! `#[rate_limit]`).

use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{Expr, FnArg, GenericArgument, Ident, ItemFn, Lit, Meta, MetaNameValue, Pat, Path, PathArguments, ReturnType, Token, Type};

/// Every attribute key any of the four macros accept, parsed once and read
/// selectively by each macro's expansion. Unset fields are simply left at
/// their default.
#[derive(Default)]
pub struct ParsedAttrs {
    pub cache_names: Vec<String>,
    pub storage_names: Vec<String>,
    pub ttl_secs: Option<u64>,
    pub limit: Option<u64>,
    pub window_secs: Option<u64>,
    pub all_entries: bool,
    pub before_invocation: bool,
    pub throw_on_exceeded: Option<bool>,
    pub key_generator: Option<Path>,
    pub condition: Option<Path>,
    pub unless: Option<Path>,
}

/// Parses `key = value, ...` attribute arguments into [`ParsedAttrs`].
/// Unknown keys produce a `compile_error!` token stream rather than
/// panicking, matching the teacher macros' diagnostic style.
pub fn parse_attrs(meta_list: &Punctuated<Meta, Token![,]>) -> Result<ParsedAttrs, TokenStream2> {
    let mut attrs = ParsedAttrs::default();

    for meta in meta_list {
        let nv = match meta {
            Meta::NameValue(nv) => nv,
            other => {
                return Err(compile_error_for(other, "expected `key = value`"));
            }
        };
        let key = nv.path.get_ident().map(|i| i.to_string()).unwrap_or_default();

        match key.as_str() {
            "cache_names" => attrs.cache_names = parse_string_list(nv)?,
            "storage_names" => attrs.storage_names = parse_string_list(nv)?,
            "ttl_secs" => attrs.ttl_secs = Some(parse_u64(nv)?),
            "limit" => attrs.limit = Some(parse_u64(nv)?),
            "window_secs" => attrs.window_secs = Some(parse_u64(nv)?),
            "all_entries" => attrs.all_entries = parse_bool(nv)?,
            "before_invocation" => attrs.before_invocation = parse_bool(nv)?,
            "throw_on_exceeded" => attrs.throw_on_exceeded = Some(parse_bool(nv)?),
            "key_generator" => attrs.key_generator = Some(parse_path(nv)?),
            "condition" => attrs.condition = Some(parse_path(nv)?),
            "unless" => attrs.unless = Some(parse_path(nv)?),
            _ => return Err(compile_error_for(nv, &format!("unrecognized cachegate attribute `{key}`"))),
        }
    }

    Ok(attrs)
}

fn parse_string_list(nv: &MetaNameValue) -> Result<Vec<String>, TokenStream2> {
    match &nv.value {
        Expr::Array(array) => {
            let mut values = Vec::with_capacity(array.elems.len());
            for elem in &array.elems {
                match elem {
                    Expr::Lit(expr_lit) => match &expr_lit.lit {
                        Lit::Str(s) => values.push(s.value()),
                        _ => return Err(compile_error_for(elem, "expected a string literal")),
                    },
                    _ => return Err(compile_error_for(elem, "expected a string literal")),
                }
            }
            Ok(values)
        }
        _ => Err(compile_error_for(nv, "expected `[\"name\", ...]`")),
    }
}

fn parse_u64(nv: &MetaNameValue) -> Result<u64, TokenStream2> {
    match &nv.value {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Int(lit_int) => lit_int
                .base10_parse::<u64>()
                .map_err(|_| compile_error_for(nv, "expected a non-negative integer")),
            _ => Err(compile_error_for(nv, "expected an integer literal")),
        },
        _ => Err(compile_error_for(nv, "expected an integer literal")),
    }
}

fn parse_bool(nv: &MetaNameValue) -> Result<bool, TokenStream2> {
    match &nv.value {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Bool(lit_bool) => Ok(lit_bool.value),
            _ => Err(compile_error_for(nv, "expected `true` or `false`")),
        },
        _ => Err(compile_error_for(nv, "expected `true` or `false`")),
    }
}

/// `condition`/`unless` name an unquoted path to a `fn(&dyn MethodInvocation)
/// -> bool` predicate, e.g. `condition = my_conditions::is_admin`.
/// `key_generator` instead names a zero-argument factory function returning
/// `Arc<dyn KeyGenerator>`, since a key generator usually carries its own
/// state.
fn parse_path(nv: &MetaNameValue) -> Result<Path, TokenStream2> {
    match &nv.value {
        Expr::Path(expr_path) => Ok(expr_path.path.clone()),
        _ => Err(compile_error_for(nv, "expected a path to a factory function, e.g. `my_mod::my_fn`")),
    }
}

fn compile_error_for(tokens: impl quote::ToTokens, message: &str) -> TokenStream2 {
    syn::Error::new_spanned(tokens, message).to_compile_error()
}

/// What every cachegate attribute macro needs to know about the function it
/// decorates: whether it takes `self`, its non-receiver argument
/// identifiers, and the `Ok`/`Err` halves of its declared `Result` return
/// type. All four macros require an `async fn` returning `Result<T, E>` so
/// the guarded call's own errors keep their own type through the
/// interceptor (see the `From<CacheError>`/`From<RateLimitError>` bound the
/// generated code imposes on `E`).
pub struct FnShape {
    pub has_self: bool,
    pub arg_idents: Vec<Ident>,
    pub ok_ty: Type,
    pub err_ty: Type,
}

pub fn analyze_fn(item: &ItemFn) -> Result<FnShape, TokenStream2> {
    if item.sig.asyncness.is_none() {
        return Err(compile_error_for(&item.sig, "cachegate attribute macros only support `async fn`"));
    }

    let has_self = item.sig.inputs.iter().any(|arg| matches!(arg, FnArg::Receiver(_)));
    let mut arg_idents = Vec::new();
    for arg in &item.sig.inputs {
        if let FnArg::Typed(pat_type) = arg {
            if let Pat::Ident(pat_ident) = pat_type.pat.as_ref() {
                arg_idents.push(pat_ident.ident.clone());
            }
        }
    }

    let (ok_ty, err_ty) = match &item.sig.output {
        ReturnType::Type(_, ty) => extract_result_generics(ty)
            .ok_or_else(|| compile_error_for(ty, "cachegate attribute macros require a `Result<T, E>` return type"))?,
        ReturnType::Default => {
            return Err(compile_error_for(&item.sig, "cachegate attribute macros require a `Result<T, E>` return type"));
        }
    };

    Ok(FnShape { has_self, arg_idents, ok_ty, err_ty })
}

fn extract_result_generics(ty: &Type) -> Option<(Type, Type)> {
    let Type::Path(type_path) = ty else { return None };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Result" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else { return None };
    let mut types = args.args.iter().filter_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty.clone()),
        _ => None,
    });
    let ok_ty = types.next()?;
    let err_ty = types.next()?;
    Some((ok_ty, err_ty))
}

/// Builds the `vec![format!("{:?}", ..), ...]` expression recording a
/// method's argument list for [`cachegate_core::MethodInvocation`], in the
/// same "debug-format every argument" spirit as the teacher's
/// `generate_key_expr`, generalized to build invocation arguments rather
/// than a final string key — key generation itself is the resolved
/// `KeyGenerator`'s job, not the macro's.
pub fn generate_arguments_expr(arg_idents: &[TokenStream2]) -> TokenStream2 {
    if arg_idents.is_empty() {
        quote! { Vec::<String>::new() }
    } else {
        quote! {
            vec![ #( format!("{:?}", #arg_idents) ),* ]
        }
    }
}
