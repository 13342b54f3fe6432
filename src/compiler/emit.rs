//! Rust source generation for compiled units.
//!
//! Each [`FactoryUnit`] renders to:
//!
//! - `<Class>Factory`, a unit struct implementing [`CompiledFactory`](crate::CompiledFactory)
//! - one `<Class>Factory::call_<method>` wrapper per public instance method,
//!   running its aspects step by step
//! - `<Class>Proxy::inject` when the class has injectable properties
//! - `<Class>LazyProxy::create` when the class is marked lazy
//!
//! [`render_module`] adds a `register(&CompiledFactoryRegistry)` function.
//!
//! Generated code names classes by their path, so every class that builds
//! itself must be a Rust path reachable from where the module is included,
//! to a type implementing [`Construct`](crate::Construct). Self-managed
//! classes name their accessor as an associated function taking
//! `Vec<Value>` and returning `DiResult<Instance>`.

use std::collections::{BTreeMap, HashMap};

use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use tracing::debug;

use crate::descriptors::AspectKind;
use crate::error::{DiError, DiResult};
use crate::key::ClassName;
use crate::lifetime::Lifetime;
use crate::value::{Arguments, Value};

use super::plan::{
    BuildPlan, DependencyPlan, Instantiation, MethodPlan, ParamPlan, ParamSource, PropertySource, ProxyPlan,
    Route, Target, UnitBody,
};
use super::FactoryUnit;

/// Banner prepended to every rendered module.
pub const GENERATED_HEADER: &str = "// Generated by ferrous-wire. Do not edit.\n\n";

/// Identifiers generated for one unit.
#[derive(Debug, Clone)]
struct Names {
    factory: Ident,
    proxy: Ident,
    lazy: Ident,
}

impl Names {
    fn for_class(class: &ClassName) -> DiResult<Self> {
        let short = class.short_name();
        syn::parse_str::<Ident>(short).map_err(|e| emit_error(class, format!("`{short}` is not an identifier: {e}")))?;
        Ok(Self {
            factory: format_ident!("{}Factory", short),
            proxy: format_ident!("{}Proxy", short),
            lazy: format_ident!("{}LazyProxy", short),
        })
    }
}

/// What the module being rendered contains, for direct calls between units.
#[derive(Default)]
struct Module {
    factories: HashMap<ClassName, Names>,
    lazy: HashMap<ClassName, Names>,
}

/// Source for a single unit, without a `register` function.
pub fn render_unit(unit: &FactoryUnit) -> DiResult<String> {
    let module = Module::default();
    let tokens = unit_tokens(unit, &module)?;
    unparse(unit.class(), tokens)
}

/// Source for a set of units and a `register` function adding all of them
/// to a [`CompiledFactoryRegistry`](crate::CompiledFactoryRegistry).
pub fn render_module<U>(units: &[U]) -> DiResult<String>
where
    U: AsRef<FactoryUnit>,
{
    let mut module = Module::default();
    let mut seen: BTreeMap<String, ClassName> = BTreeMap::new();
    for unit in units {
        let unit = unit.as_ref();
        let names = Names::for_class(unit.class())?;
        if let Some(other) = seen.insert(names.factory.to_string(), unit.class().clone()) {
            return Err(emit_error(
                unit.class(),
                format!("generated name `{}` is already used by {other}", names.factory),
            ));
        }
        if unit.has_lazy_proxy() {
            module.lazy.insert(unit.class().clone(), names.clone());
        }
        module.factories.insert(unit.class().clone(), names);
    }

    let mut items = Vec::with_capacity(units.len());
    let mut registrations = Vec::with_capacity(units.len());
    for unit in units {
        let unit = unit.as_ref();
        items.push(unit_tokens(unit, &module)?);
        let factory = &module.factories[unit.class()].factory;
        registrations.push(quote! {
            registry.register(::std::sync::Arc::new(#factory));
        });
    }

    let tokens = quote! {
        #(#items)*

        /// Register every factory of this module.
        pub fn register(registry: &::ferrous_wire::CompiledFactoryRegistry) {
            #(#registrations)*
        }
    };
    debug!(units = units.len(), "module rendered");
    unparse(&ClassName::from("module"), tokens)
}

fn unparse(class: &ClassName, tokens: TokenStream) -> DiResult<String> {
    let file: syn::File = syn::parse2(tokens).map_err(|e| emit_error(class, format!("generated code does not parse: {e}")))?;
    Ok(format!("{GENERATED_HEADER}{}", prettyplease::unparse(&file)))
}

fn emit_error(class: &ClassName, detail: impl Into<String>) -> DiError {
    DiError::Emit {
        class: class.clone(),
        detail: detail.into(),
    }
}

fn unit_tokens(unit: &FactoryUnit, module: &Module) -> DiResult<TokenStream> {
    let class = unit.class();
    let names = Names::for_class(class)?;
    let Names { factory, proxy, lazy } = &names;
    let class_str = class.as_str();

    let body = match unit.body() {
        UnitBody::Alias { target, params } => {
            let target = target.as_str();
            let params = arguments(class, params)?;
            quote! {
                ctx.build_bound(&::ferrous_wire::ClassName::from(#target), &#params.merged(args))
            }
        }
        UnitBody::Provider { provider } => {
            let provider = provider.as_str();
            quote! {
                ctx.provide(&class, &::ferrous_wire::ClassName::from(#provider))
            }
        }
        UnitBody::Reflective => quote! {
            ctx.resolve_uncompiled(&class, args)
        },
        UnitBody::Build(plan) => build_tokens(unit, plan, &names, module)?,
    };

    let methods: Vec<&MethodPlan> = unit.methods().collect();
    let method_names: Vec<&str> = methods.iter().map(|m| m.name.as_str()).collect();
    let wrappers = methods
        .iter()
        .map(|m| method_tokens(class, m, module))
        .collect::<DiResult<Vec<_>>>()?;
    let dispatch = methods
        .iter()
        .map(|m| {
            let name = m.name.as_str();
            let wrapper = format_ident!("call_{}", m.name);
            quote! { #name => Self::#wrapper(ctx, instance, args), }
        })
        .collect::<Vec<_>>();
    let has_method = if method_names.is_empty() {
        quote! { false }
    } else {
        quote! { matches!(method, #(#method_names)|*) }
    };

    let proxy_item = match unit.proxy() {
        Some(plan) => proxy_tokens(class, plan, proxy, module)?,
        None => TokenStream::new(),
    };
    let lazy_item = if unit.has_lazy_proxy() {
        quote! {
            /// Lazy stand-in resolved on first use.
            pub struct #lazy;

            impl #lazy {
                pub fn create(
                    ctx: &::ferrous_wire::ResolverContext<'_>,
                    qualifier: ::std::option::Option<&str>,
                    inline: &::ferrous_wire::Arguments,
                ) -> ::ferrous_wire::Instance {
                    ctx.lazy(&::ferrous_wire::ClassName::from(#class_str), qualifier, inline)
                }
            }
        }
    } else {
        TokenStream::new()
    };

    let doc = format!("Compiled factory of `{class_str}`.");
    Ok(quote! {
        #[doc = #doc]
        pub struct #factory;

        impl ::ferrous_wire::CompiledFactory for #factory {
            fn class(&self) -> ::ferrous_wire::ClassName {
                ::ferrous_wire::ClassName::from(#class_str)
            }

            #[allow(unused_variables)]
            fn get_instance(
                &self,
                ctx: &::ferrous_wire::ResolverContext<'_>,
                args: &::ferrous_wire::Arguments,
            ) -> ::ferrous_wire::DiResult<::ferrous_wire::Instance> {
                let class = self.class();
                let _guard = ctx.enter(&class)?;
                if let Some(instance) = ctx.bound_instance(&class) {
                    return Ok(instance);
                }
                #body
            }

            #[allow(unused_variables)]
            fn has_method(&self, method: &str) -> bool {
                #has_method
            }

            #[allow(unused_variables)]
            fn call_method(
                &self,
                ctx: &::ferrous_wire::ResolverContext<'_>,
                instance: &::ferrous_wire::Instance,
                method: &str,
                args: &::ferrous_wire::Arguments,
            ) -> ::ferrous_wire::DiResult<::ferrous_wire::Value> {
                match method {
                    #(#dispatch)*
                    _ => Err(::ferrous_wire::DiError::UnknownMethod {
                        class: self.class(),
                        method: method.to_string(),
                    }),
                }
            }
        }

        impl #factory {
            #(#wrappers)*
        }

        #proxy_item
        #lazy_item
    })
}

fn build_tokens(unit: &FactoryUnit, plan: &BuildPlan, names: &Names, module: &Module) -> DiResult<TokenStream> {
    let class = unit.class();
    let params = arguments(class, &plan.params)?;
    let values = plan
        .constructor
        .iter()
        .map(|p| param_tokens(class, &plan.method, p, module))
        .collect::<DiResult<Vec<_>>>()?;

    let lookup = match plan.lifetime {
        Lifetime::Singleton => quote! {
            let key = ::ferrous_wire::SingletonKey::new(&class, &effective, ctx.container_id())?;
            if let Some(hit) = ctx.cached_singleton(&key) {
                return Ok(hit);
            }
        },
        Lifetime::Service => quote! {
            if let Some(hit) = ctx.cached_service(&class) {
                return Ok(hit);
            }
        },
        Lifetime::Transient => TokenStream::new(),
    };

    let path: syn::Path = syn::parse_str(class.as_str())
        .map_err(|e| emit_error(class, format!("not a Rust path: {e}")))?;
    let construct = match &plan.instantiation {
        Instantiation::Constructor(_) => quote! {
            let instance: ::ferrous_wire::Instance =
                ::std::sync::Arc::new(<#path as ::ferrous_wire::Construct>::construct(values)?);
        },
        Instantiation::Accessor { name, .. } => {
            let accessor: Ident =
                syn::parse_str(name).map_err(|e| emit_error(class, format!("accessor `{name}`: {e}")))?;
            quote! {
                let instance: ::ferrous_wire::Instance = #path::#accessor(values)?;
            }
        }
    };

    let inject = match unit.proxy() {
        Some(_) => {
            let proxy = &names.proxy;
            quote! { #proxy::inject(ctx, &instance)?; }
        }
        None => TokenStream::new(),
    };

    let store = match plan.lifetime {
        Lifetime::Singleton => quote! { Ok(ctx.store_singleton(key, instance)) },
        Lifetime::Service => quote! { Ok(ctx.store_service(&class, instance)) },
        Lifetime::Transient => quote! { Ok(instance) },
    };

    Ok(quote! {
        let effective = #params.merged(args);
        #lookup
        let values = vec![#(#values),*];
        #construct
        #inject
        #store
    })
}

/// Value of one parameter read from `effective`, falling back to its source.
fn param_tokens(class: &ClassName, method: &str, param: &ParamPlan, module: &Module) -> DiResult<TokenStream> {
    let name = param.name.as_str();
    let not_injectable = quote! {
        return Err(::ferrous_wire::DiError::NotInjectable {
            class: class.clone(),
            method: #method.to_string(),
            parameter: #name.to_string(),
        })
    };
    let fallback = match &param.source {
        ParamSource::Dependency(plan) => {
            let instance = dependency_tokens(class, plan, module)?;
            quote! { ::ferrous_wire::Value::Object(#instance?) }
        }
        ParamSource::Deferred {
            requested,
            qualifier,
            inline,
            default,
        } => {
            let requested = requested.as_str();
            let qualifier = match qualifier {
                Some(q) => quote! { Some(#q) },
                None => quote! { None },
            };
            let inline = arguments(class, inline)?;
            let missing = match default {
                Some(value) => value_tokens(class, value)?,
                None => not_injectable,
            };
            quote! {
                match ctx.dependency(&::ferrous_wire::ClassName::from(#requested), #qualifier, &#inline)? {
                    Some(instance) => ::ferrous_wire::Value::Object(instance),
                    None => #missing,
                }
            }
        }
        ParamSource::Literal(value) => value_tokens(class, value)?,
        ParamSource::Required => not_injectable,
    };
    Ok(quote! {
        match effective.get(#name) {
            Some(value) => value.clone(),
            None => #fallback,
        }
    })
}

/// Expression of type `DiResult<Instance>` for a dependency.
fn dependency_tokens(class: &ClassName, plan: &DependencyPlan, module: &Module) -> DiResult<TokenStream> {
    let requested = plan.requested.as_str();
    let inline = arguments(class, &plan.inline)?;
    Ok(match &plan.route {
        Route::Unit => match module.factories.get(&plan.requested) {
            Some(names) => {
                let factory = &names.factory;
                quote! { ::ferrous_wire::CompiledFactory::get_instance(&#factory, ctx, &#inline) }
            }
            None => quote! {
                ctx.resolve(&::ferrous_wire::ClassName::from(#requested), &#inline)
            },
        },
        Route::Lazy { qualifier } => {
            let qualifier = match qualifier {
                Some(q) => quote! { Some(#q) },
                None => quote! { None },
            };
            match module.lazy.get(&plan.requested) {
                Some(names) => {
                    let lazy = &names.lazy;
                    quote! { Ok::<_, ::ferrous_wire::DiError>(#lazy::create(ctx, #qualifier, &#inline)) }
                }
                None => quote! {
                    Ok::<_, ::ferrous_wire::DiError>(ctx.lazy(&::ferrous_wire::ClassName::from(#requested), #qualifier, &#inline))
                },
            }
        }
        Route::Named { target, params, .. } => {
            let target = match target {
                Target::Provider(c) => {
                    let c = c.as_str();
                    quote! { ::ferrous_wire::Target::Provider(::ferrous_wire::ClassName::from(#c)) }
                }
                Target::Class(c) => {
                    let c = c.as_str();
                    quote! { ::ferrous_wire::Target::Class(::ferrous_wire::ClassName::from(#c)) }
                }
            };
            let params = arguments(class, params)?;
            quote! {
                ::ferrous_wire::resolve_qualified(
                    ctx,
                    &::ferrous_wire::ClassName::from(#requested),
                    &#target,
                    &#params,
                    &#inline,
                )
            }
        }
    })
}

fn proxy_tokens(class: &ClassName, plan: &ProxyPlan, proxy: &Ident, module: &Module) -> DiResult<TokenStream> {
    let class_str = class.as_str();
    let mut steps = Vec::with_capacity(plan.properties.len());
    for property in &plan.properties {
        let name = property.name.as_str();
        steps.push(match &property.source {
            PropertySource::Dependency(dep) => {
                let instance = dependency_tokens(class, dep, module)?;
                quote! {
                    ::ferrous_wire::Object::inject_property(
                        &**instance,
                        #name,
                        ::ferrous_wire::Value::Object(#instance?),
                    )?;
                }
            }
            PropertySource::Deferred => quote! {
                ctx.inject_property_deferred(&class, instance, #name)?;
            },
            PropertySource::Private => quote! {
                Err::<(), _>(::ferrous_wire::DiError::PrivateProperty {
                    class: class.clone(),
                    property: #name.to_string(),
                })?;
            },
        });
    }
    Ok(quote! {
        /// Injects properties into a freshly built instance.
        pub struct #proxy;

        impl #proxy {
            #[allow(unused_variables)]
            pub fn inject(
                ctx: &::ferrous_wire::ResolverContext<'_>,
                instance: &::ferrous_wire::Instance,
            ) -> ::ferrous_wire::DiResult<()> {
                let class = ::ferrous_wire::ClassName::from(#class_str);
                #(#steps)*
                Ok(())
            }
        }
    })
}

fn method_tokens(class: &ClassName, method: &MethodPlan, module: &Module) -> DiResult<TokenStream> {
    let class_str = class.as_str();
    let name = method.name.as_str();
    let wrapper: Ident = syn::parse_str(&format!("call_{name}"))
        .map_err(|e| emit_error(class, format!("method `{name}`: {e}")))?;

    let inserts = method
        .params
        .iter()
        .map(|p| {
            let param = p.name.as_str();
            let value = param_tokens(class, name, p, module)?;
            Ok(quote! { params.insert(#param, #value); })
        })
        .collect::<DiResult<Vec<_>>>()?;
    let positional = method.params.iter().map(|p| {
        let param = p.name.as_str();
        quote! { params.get(#param).cloned().unwrap_or_default() }
    });

    let mut intercepts = Vec::new();
    let mut befores = Vec::new();
    let mut afters = Vec::new();
    for declaration in &method.aspects {
        let aspect = declaration.aspect.as_str();
        let aspect_args = arguments(class, &declaration.args)?;
        let setup = quote! {
            let aspect_args = #aspect_args;
            let aspect_class = ::ferrous_wire::ClassName::from(#aspect);
            let aspect = ctx.aspect(&aspect_class)?;
            let join = ::ferrous_wire::AspectContext {
                args: &aspect_args,
                class: &class,
                method: #name,
            };
        };
        match declaration.kind {
            AspectKind::Intercept => intercepts.push(quote! {
                {
                    #setup
                    let decision = ::ferrous_wire::with_aspect(&aspect, &aspect_class, |a| {
                        ::ferrous_wire::Aspect::intercept(a, &join, &params, &::ferrous_wire::Value::Null)
                    })?;
                    if let ::ferrous_wire::Interception::Return(value) = decision {
                        return Ok(value);
                    }
                }
            }),
            AspectKind::Before => befores.push(quote! {
                let params = {
                    #setup
                    ::ferrous_wire::with_aspect(&aspect, &aspect_class, |a| ::ferrous_wire::Aspect::before(a, &join, params))?
                };
            }),
            AspectKind::After => afters.push(quote! {
                let result = {
                    #setup
                    ::ferrous_wire::with_aspect(&aspect, &aspect_class, |a| ::ferrous_wire::Aspect::after(a, &join, result))?
                };
            }),
        }
    }

    Ok(quote! {
        #[allow(unused_variables, unused_mut)]
        pub fn #wrapper(
            ctx: &::ferrous_wire::ResolverContext<'_>,
            instance: &::ferrous_wire::Instance,
            args: &::ferrous_wire::Arguments,
        ) -> ::ferrous_wire::DiResult<::ferrous_wire::Value> {
            let class = ::ferrous_wire::ClassName::from(#class_str);
            let instance = ::ferrous_wire::resolve_lazy(instance)?;
            let effective = args;
            let mut params = ::ferrous_wire::Arguments::new();
            #(#inserts)*
            #(#intercepts)*
            #(#befores)*
            let result = ::ferrous_wire::Object::invoke(&*instance, #name, vec![#(#positional),*])?;
            #(#afters)*
            Ok(result)
        }
    })
}

fn arguments(class: &ClassName, args: &Arguments) -> DiResult<TokenStream> {
    let mut tokens = quote! { ::ferrous_wire::Arguments::new() };
    for (name, value) in args.iter() {
        let name = name.as_str();
        let value = value_tokens(class, value)?;
        tokens = quote! { #tokens.with(#name, #value) };
    }
    Ok(tokens)
}

fn value_tokens(class: &ClassName, value: &Value) -> DiResult<TokenStream> {
    Ok(match value {
        Value::Null => quote! { ::ferrous_wire::Value::Null },
        Value::Bool(b) => quote! { ::ferrous_wire::Value::Bool(#b) },
        Value::Int(i) if *i < 0 => {
            let magnitude = i.unsigned_abs();
            quote! { ::ferrous_wire::Value::Int((#magnitude as i64).wrapping_neg()) }
        }
        Value::Int(i) => quote! { ::ferrous_wire::Value::Int(#i) },
        Value::Float(f) => {
            let bits = f.to_bits();
            quote! { ::ferrous_wire::Value::Float(f64::from_bits(#bits)) }
        }
        Value::String(s) => {
            let s = s.as_str();
            quote! { ::ferrous_wire::Value::String(#s.to_string()) }
        }
        Value::List(items) => {
            let items = items
                .iter()
                .map(|v| value_tokens(class, v))
                .collect::<DiResult<Vec<_>>>()?;
            quote! { ::ferrous_wire::Value::List(vec![#(#items),*]) }
        }
        Value::Map(map) => {
            let entries = map
                .iter()
                .map(|(k, v)| {
                    let k = k.as_str();
                    let v = value_tokens(class, v)?;
                    Ok(quote! { (#k.to_string(), #v) })
                })
                .collect::<DiResult<Vec<_>>>()?;
            quote! { ::ferrous_wire::Value::Map([#(#entries),*].into_iter().collect()) }
        }
        Value::Object(instance) => {
            return Err(emit_error(
                class,
                format!("object of class {} cannot be written as a literal", instance.class_name()),
            ))
        }
    })
}
