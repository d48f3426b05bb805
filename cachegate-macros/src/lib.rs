//! Procedural attribute macros wrapping a method in the matching
//! `cachegate_cache`/`cachegate_ratelimit` interceptor (spec §6 "External
//! interfaces").
//!
//! Each macro requires an `async fn` returning `Result<T, E>`. `E` must
//! implement `From<cachegate_cache::CacheError>` (for `#[cacheable]`,
//! `#[cache_put]`, `#[cache_evict]`) or `From<cachegate_ratelimit::RateLimitError>`
//! (for `#[rate_limit]`) — the same `?`-operator-friendly convention
//! `thiserror`'s `#[from]` gives you, so a cache/rate-limit failure that
//! isn't already absorbed by the configured error handler converts into
//! your own error type rather than forcing you to name ours.
//!
//! A per-function `once_cell::sync::Lazy` static backs the resolver each
//! macro builds, auto-creating named in-memory storages on first use —
//! the declarative-macro analogue of `cachelito-macros`' per-function
//! thread-local/global cache statics, generalized from a single compile-time
//! policy to a composable, named, runtime resolver.
//!
//! The generated code names `cachegate_core`, `cachegate_cache`,
//! `cachegate_ratelimit`, and `once_cell` by their crate-root paths, so the
//! crate applying an attribute also needs each of those as a direct
//! dependency (not just `cachegate-macros`) — the same requirement most
//! attribute-macro crates whose expansions reach for third-party types
//! place on their callers. The root `cachegate` facade already depends on
//! all four, so `cachegate::cacheable` and friends work out of the box for
//! anything depending on `cachegate` itself.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, ItemFn, Meta, Token};

use cachegate_macro_utils::{analyze_fn, generate_arguments_expr, parse_attrs, FnShape, ParsedAttrs};

fn parse_attr(attr: TokenStream) -> Result<ParsedAttrs, TokenStream2> {
    let meta_list = Punctuated::<Meta, Token![,]>::parse_terminated
        .parse(attr)
        .map_err(|err| err.to_compile_error())?;
    parse_attrs(&meta_list)
}

fn invocation_expr(shape: &FnShape, fn_name: &str) -> TokenStream2 {
    let arg_idents: Vec<TokenStream2> = shape.arg_idents.iter().map(|ident| quote! { #ident }).collect();
    let arguments = generate_arguments_expr(&arg_idents);
    let target_type = if shape.has_self {
        quote! { std::any::type_name::<Self>() }
    } else {
        quote! { module_path!() }
    };
    quote! {
        std::sync::Arc::new(cachegate_core::SimpleMethodInvocation::new(#target_type, #fn_name, #arguments))
    }
}

fn condition_expr(path: &Option<syn::Path>) -> TokenStream2 {
    match path {
        Some(path) => quote! { Some(std::sync::Arc::new(cachegate_core::FnCondition::new(#path)) as std::sync::Arc<dyn cachegate_core::Condition<dyn cachegate_core::MethodInvocation>>) },
        None => quote! { None },
    }
}

fn key_generator_expr(path: &Option<syn::Path>) -> TokenStream2 {
    match path {
        Some(path) => quote! { Some(#path() as std::sync::Arc<dyn cachegate_core::KeyGenerator>) },
        None => quote! { None },
    }
}

/// `#[cacheable(cache_names = ["users"], ttl_secs = 60)]` (spec §2 item 8).
#[proc_macro_attribute]
pub fn cacheable(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attrs = match parse_attr(attr) {
        Ok(attrs) => attrs,
        Err(err) => return err.into(),
    };
    let input_fn = parse_macro_input!(item as ItemFn);
    let shape = match analyze_fn(&input_fn) {
        Ok(shape) => shape,
        Err(err) => return err.into(),
    };

    let static_ident = format_ident!("__CACHEGATE_CACHEABLE_{}", input_fn.sig.ident.to_string().to_uppercase());
    let ok_ty = &shape.ok_ty;
    let fn_name_lit = input_fn.sig.ident.to_string();
    let invocation = invocation_expr(&shape, &fn_name_lit);
    let condition = condition_expr(&attrs.condition);
    let unless = condition_expr(&attrs.unless);
    let key_generator = key_generator_expr(&attrs.key_generator);
    let cache_names = &attrs.cache_names;
    let ttl_expr = match attrs.ttl_secs {
        Some(secs) => quote! { descriptor = descriptor.with_ttl(std::time::Duration::from_secs(#secs)); },
        None => quote! {},
    };

    let mut wrapped = input_fn.clone();
    let block = &input_fn.block;
    wrapped.block = syn::parse_quote! {{
        static #static_ident: once_cell::sync::Lazy<std::sync::Arc<cachegate_cache::CompositeCacheResolver<#ok_ty>>> =
            once_cell::sync::Lazy::new(|| {
                let factory: cachegate_cache::CacheFactory<#ok_ty> = std::sync::Arc::new(|name: &str| {
                    let clock: std::sync::Arc<dyn cachegate_core::Clock> = std::sync::Arc::new(cachegate_core::SystemClock);
                    std::sync::Arc::new(cachegate_cache::InMemoryCacheStorage::new(
                        name,
                        clock,
                        std::sync::Arc::new(cachegate_core::NoopPublisher::default()),
                    )) as std::sync::Arc<dyn cachegate_cache::CacheStorage<#ok_ty>>
                });
                let manager = std::sync::Arc::new(cachegate_cache::SimpleCacheManager::new(factory));
                let mut resolver = cachegate_cache::CompositeCacheResolver::new(false);
                resolver.add_manager(cachegate_core::Priority::Highest(0), manager);
                std::sync::Arc::new(resolver)
            });

        let __invocation: std::sync::Arc<dyn cachegate_core::MethodInvocation> = #invocation;
        let __ctx = cachegate_cache::CacheOperationContext::new(
            __invocation,
            #static_ident.clone() as std::sync::Arc<dyn cachegate_cache::CacheResolver<#ok_ty>>,
            std::sync::Arc::new(cachegate_core::DefaultKeyGenerator),
            std::sync::Arc::new(cachegate_cache::SilentCacheErrorHandler),
        );

        let mut descriptor = cachegate_cache::Cacheable::new([ #(#cache_names),* ]);
        if let Some(condition) = #condition { descriptor = descriptor.with_condition(condition); }
        if let Some(unless) = #unless { descriptor = descriptor.with_unless(unless); }
        if let Some(key_generator) = #key_generator { descriptor = descriptor.with_key_generator(key_generator); }
        #ttl_expr

        let __interceptor = cachegate_cache::CacheInterceptor::new(cachegate_cache::CacheDescriptor::Cacheable(descriptor));
        match __interceptor.intercept(&__ctx, move || async move #block).await {
            Ok(value) => Ok(value),
            Err(cachegate_cache::CacheOutcome::Cache(err)) => Err(err.into()),
            Err(cachegate_cache::CacheOutcome::Inner(err)) => Err(err),
        }
    }};

    TokenStream::from(quote! { #wrapped })
}

/// `#[cache_put(cache_names = ["users"])]` (spec §2 item 9).
#[proc_macro_attribute]
pub fn cache_put(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attrs = match parse_attr(attr) {
        Ok(attrs) => attrs,
        Err(err) => return err.into(),
    };
    let input_fn = parse_macro_input!(item as ItemFn);
    let shape = match analyze_fn(&input_fn) {
        Ok(shape) => shape,
        Err(err) => return err.into(),
    };

    let static_ident = format_ident!("__CACHEGATE_CACHE_PUT_{}", input_fn.sig.ident.to_string().to_uppercase());
    let ok_ty = &shape.ok_ty;
    let fn_name_lit = input_fn.sig.ident.to_string();
    let invocation = invocation_expr(&shape, &fn_name_lit);
    let condition = condition_expr(&attrs.condition);
    let unless = condition_expr(&attrs.unless);
    let key_generator = key_generator_expr(&attrs.key_generator);
    let cache_names = &attrs.cache_names;
    let ttl_expr = match attrs.ttl_secs {
        Some(secs) => quote! { descriptor = descriptor.with_ttl(std::time::Duration::from_secs(#secs)); },
        None => quote! {},
    };

    let mut wrapped = input_fn.clone();
    let block = &input_fn.block;
    wrapped.block = syn::parse_quote! {{
        static #static_ident: once_cell::sync::Lazy<std::sync::Arc<cachegate_cache::CompositeCacheResolver<#ok_ty>>> =
            once_cell::sync::Lazy::new(|| {
                let factory: cachegate_cache::CacheFactory<#ok_ty> = std::sync::Arc::new(|name: &str| {
                    let clock: std::sync::Arc<dyn cachegate_core::Clock> = std::sync::Arc::new(cachegate_core::SystemClock);
                    std::sync::Arc::new(cachegate_cache::InMemoryCacheStorage::new(
                        name,
                        clock,
                        std::sync::Arc::new(cachegate_core::NoopPublisher::default()),
                    )) as std::sync::Arc<dyn cachegate_cache::CacheStorage<#ok_ty>>
                });
                let manager = std::sync::Arc::new(cachegate_cache::SimpleCacheManager::new(factory));
                let mut resolver = cachegate_cache::CompositeCacheResolver::new(false);
                resolver.add_manager(cachegate_core::Priority::Highest(0), manager);
                std::sync::Arc::new(resolver)
            });

        let __invocation: std::sync::Arc<dyn cachegate_core::MethodInvocation> = #invocation;
        let __ctx = cachegate_cache::CacheOperationContext::new(
            __invocation,
            #static_ident.clone() as std::sync::Arc<dyn cachegate_cache::CacheResolver<#ok_ty>>,
            std::sync::Arc::new(cachegate_core::DefaultKeyGenerator),
            std::sync::Arc::new(cachegate_cache::SilentCacheErrorHandler),
        );

        let mut descriptor = cachegate_cache::CachePut::new([ #(#cache_names),* ]);
        if let Some(condition) = #condition { descriptor = descriptor.with_condition(condition); }
        if let Some(unless) = #unless { descriptor = descriptor.with_unless(unless); }
        if let Some(key_generator) = #key_generator { descriptor = descriptor.with_key_generator(key_generator); }
        #ttl_expr

        let __interceptor = cachegate_cache::CacheInterceptor::new(cachegate_cache::CacheDescriptor::CachePut(descriptor));
        match __interceptor.intercept(&__ctx, move || async move #block).await {
            Ok(value) => Ok(value),
            Err(cachegate_cache::CacheOutcome::Cache(err)) => Err(err.into()),
            Err(cachegate_cache::CacheOutcome::Inner(err)) => Err(err),
        }
    }};

    TokenStream::from(quote! { #wrapped })
}

/// `#[cache_evict(cache_names = ["users"], all_entries = true, before_invocation = true)]`
/// (spec §2 item 10).
#[proc_macro_attribute]
pub fn cache_evict(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attrs = match parse_attr(attr) {
        Ok(attrs) => attrs,
        Err(err) => return err.into(),
    };
    let input_fn = parse_macro_input!(item as ItemFn);
    let shape = match analyze_fn(&input_fn) {
        Ok(shape) => shape,
        Err(err) => return err.into(),
    };

    let static_ident = format_ident!("__CACHEGATE_CACHE_EVICT_{}", input_fn.sig.ident.to_string().to_uppercase());
    let ok_ty = &shape.ok_ty;
    let fn_name_lit = input_fn.sig.ident.to_string();
    let invocation = invocation_expr(&shape, &fn_name_lit);
    let condition = condition_expr(&attrs.condition);
    let unless = condition_expr(&attrs.unless);
    let key_generator = key_generator_expr(&attrs.key_generator);
    let cache_names = &attrs.cache_names;
    let all_entries = attrs.all_entries;
    let before_invocation = attrs.before_invocation;

    let mut wrapped = input_fn.clone();
    let block = &input_fn.block;
    wrapped.block = syn::parse_quote! {{
        static #static_ident: once_cell::sync::Lazy<std::sync::Arc<cachegate_cache::CompositeCacheResolver<#ok_ty>>> =
            once_cell::sync::Lazy::new(|| {
                let factory: cachegate_cache::CacheFactory<#ok_ty> = std::sync::Arc::new(|name: &str| {
                    let clock: std::sync::Arc<dyn cachegate_core::Clock> = std::sync::Arc::new(cachegate_core::SystemClock);
                    std::sync::Arc::new(cachegate_cache::InMemoryCacheStorage::new(
                        name,
                        clock,
                        std::sync::Arc::new(cachegate_core::NoopPublisher::default()),
                    )) as std::sync::Arc<dyn cachegate_cache::CacheStorage<#ok_ty>>
                });
                let manager = std::sync::Arc::new(cachegate_cache::SimpleCacheManager::new(factory));
                let mut resolver = cachegate_cache::CompositeCacheResolver::new(false);
                resolver.add_manager(cachegate_core::Priority::Highest(0), manager);
                std::sync::Arc::new(resolver)
            });

        let __invocation: std::sync::Arc<dyn cachegate_core::MethodInvocation> = #invocation;
        let __ctx = cachegate_cache::CacheOperationContext::new(
            __invocation,
            #static_ident.clone() as std::sync::Arc<dyn cachegate_cache::CacheResolver<#ok_ty>>,
            std::sync::Arc::new(cachegate_core::DefaultKeyGenerator),
            std::sync::Arc::new(cachegate_cache::SilentCacheErrorHandler),
        );

        let mut descriptor = cachegate_cache::CacheEvict::new([ #(#cache_names),* ]);
        if let Some(condition) = #condition { descriptor = descriptor.with_condition(condition); }
        if let Some(unless) = #unless { descriptor = descriptor.with_unless(unless); }
        if let Some(key_generator) = #key_generator { descriptor = descriptor.with_key_generator(key_generator); }
        descriptor = descriptor.all_entries(#all_entries);
        descriptor = descriptor.before_invocation(#before_invocation);

        let __interceptor = cachegate_cache::CacheInterceptor::new(cachegate_cache::CacheDescriptor::CacheEvict(descriptor));
        match __interceptor.intercept(&__ctx, move || async move #block).await {
            Ok(value) => Ok(value),
            Err(cachegate_cache::CacheOutcome::Cache(err)) => Err(err.into()),
            Err(cachegate_cache::CacheOutcome::Inner(err)) => Err(err),
        }
    }};

    TokenStream::from(quote! { #wrapped })
}

/// `#[rate_limit(storage_names = ["api"], limit = 100, window_secs = 60)]`
/// (spec §4.9/§4.14).
#[proc_macro_attribute]
pub fn rate_limit(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attrs = match parse_attr(attr) {
        Ok(attrs) => attrs,
        Err(err) => return err.into(),
    };
    let input_fn = parse_macro_input!(item as ItemFn);
    let shape = match analyze_fn(&input_fn) {
        Ok(shape) => shape,
        Err(err) => return err.into(),
    };

    let Some(limit) = attrs.limit else {
        return syn::Error::new_spanned(&input_fn.sig, "#[rate_limit] requires `limit = <integer>`").to_compile_error().into();
    };
    let Some(window_secs) = attrs.window_secs else {
        return syn::Error::new_spanned(&input_fn.sig, "#[rate_limit] requires `window_secs = <integer>`")
            .to_compile_error()
            .into();
    };

    let static_ident = format_ident!("__CACHEGATE_RATE_LIMIT_{}", input_fn.sig.ident.to_string().to_uppercase());
    let fn_name_lit = input_fn.sig.ident.to_string();
    let invocation = invocation_expr(&shape, &fn_name_lit);
    let condition = condition_expr(&attrs.condition);
    let unless = condition_expr(&attrs.unless);
    let key_generator = key_generator_expr(&attrs.key_generator);
    let storage_names = &attrs.storage_names;
    let throw_on_exceeded = attrs.throw_on_exceeded.unwrap_or(true);

    let mut wrapped = input_fn.clone();
    let block = &input_fn.block;
    wrapped.block = syn::parse_quote! {{
        static #static_ident: once_cell::sync::Lazy<std::sync::Arc<cachegate_ratelimit::CompositeRateLimitResolver>> =
            once_cell::sync::Lazy::new(|| {
                let factory: cachegate_ratelimit::RateLimitFactory = std::sync::Arc::new(|name: &str| {
                    let clock: std::sync::Arc<dyn cachegate_core::Clock> = std::sync::Arc::new(cachegate_core::SystemClock);
                    std::sync::Arc::new(cachegate_ratelimit::InMemoryRateLimitStorage::new(
                        name,
                        clock,
                        std::sync::Arc::new(cachegate_core::NoopPublisher::default()),
                    )) as std::sync::Arc<dyn cachegate_ratelimit::RateLimitStorage>
                });
                let manager = std::sync::Arc::new(cachegate_ratelimit::SimpleRateLimitManager::new(factory));
                let mut resolver = cachegate_ratelimit::CompositeRateLimitResolver::new(false);
                resolver.add_manager(cachegate_core::Priority::Highest(0), manager);
                std::sync::Arc::new(resolver)
            });

        let __invocation: std::sync::Arc<dyn cachegate_core::MethodInvocation> = #invocation;
        let __ctx = cachegate_ratelimit::RateLimitOperationContext::new(
            __invocation,
            #static_ident.clone() as std::sync::Arc<dyn cachegate_ratelimit::RateLimitResolver>,
            std::sync::Arc::new(cachegate_core::DefaultKeyGenerator),
            std::sync::Arc::new(cachegate_ratelimit::SilentRateLimitErrorHandler),
        );

        let mut descriptor = cachegate_ratelimit::RateLimit::new([ #(#storage_names),* ], #limit, #window_secs);
        if let Some(condition) = #condition { descriptor = descriptor.with_condition(condition); }
        if let Some(unless) = #unless { descriptor = descriptor.with_unless(unless); }
        if let Some(key_generator) = #key_generator { descriptor = descriptor.with_key_generator(key_generator); }
        descriptor = descriptor.throw_on_exceeded(#throw_on_exceeded);

        let __interceptor = cachegate_ratelimit::RateLimitInterceptor::new(descriptor);
        match __interceptor.intercept(&__ctx, move || async move #block).await {
            Ok(value) => Ok(value),
            Err(cachegate_ratelimit::RateLimitOutcome::Exceeded(result))
            | Err(cachegate_ratelimit::RateLimitOutcome::Skipped(result)) => Err(cachegate_ratelimit::RateLimitError::LimitExceeded {
                storage: result.limit_name.clone(),
                limit: result.limit,
                count: result.current_count,
            }.into()),
            Err(cachegate_ratelimit::RateLimitOutcome::RateLimit(err)) => Err(err.into()),
            Err(cachegate_ratelimit::RateLimitOutcome::Inner(err)) => Err(err),
        }
    }};

    TokenStream::from(quote! { #wrapped })
}
