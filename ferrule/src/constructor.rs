use std::any::{Any, TypeId, type_name};
use std::sync::Arc;

use crate::{Component, ContainerError, Resolver, StdError};

/// A type identity paired with its name, kept for diagnostics.
#[derive(Clone, Copy, Debug)]
pub struct TypeToken {
    pub id: TypeId,
    pub name: &'static str,
}

impl TypeToken {
    pub fn of<T: Any + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }
}

/// Marker for constructors returning a plain value.
pub struct Plain;

/// Marker for constructors returning `Result<T, E>`.
pub struct Fallible;

/// A component constructor: a function with zero or more `Arc<T>`
/// parameters returning either a component or `Result<component, error>`.
///
/// Parameter types are declared up front so the factory can resolve them
/// by type before invocation; this is the registration-time stand-in for
/// reflective constructor inspection. Implementations exist for functions
/// of up to eight parameters.
pub trait Constructor<Args>: Send + Sync + 'static {
    type Output: Component;

    /// Declared parameter types, in order.
    fn param_types() -> Vec<TypeToken>;

    /// Resolves the parameters through `cx` and invokes the function.
    fn invoke(&self, cx: &mut Resolver<'_>) -> Result<Self::Output, ContainerError>;
}

macro_rules! impl_constructor {
    ($($param:ident),*) => {
        impl<Func, Out, $($param,)*> Constructor<(Plain, Out, $($param,)*)> for Func
        where
            Func: Fn($(Arc<$param>),*) -> Out + Send + Sync + 'static,
            Out: Component,
            $($param: Send + Sync + 'static,)*
        {
            type Output = Out;

            fn param_types() -> Vec<TypeToken> {
                vec![$(TypeToken::of::<$param>()),*]
            }

            #[allow(unused_variables)]
            fn invoke(&self, cx: &mut Resolver<'_>) -> Result<Out, ContainerError> {
                Ok((self)($(cx.resolve_arc::<$param>()?),*))
            }
        }

        impl<Func, Out, Err, $($param,)*> Constructor<(Fallible, Out, Err, $($param,)*)> for Func
        where
            Func: Fn($(Arc<$param>),*) -> Result<Out, Err> + Send + Sync + 'static,
            Out: Component,
            Err: Into<StdError> + 'static,
            $($param: Send + Sync + 'static,)*
        {
            type Output = Out;

            fn param_types() -> Vec<TypeToken> {
                vec![$(TypeToken::of::<$param>()),*]
            }

            #[allow(unused_variables)]
            fn invoke(&self, cx: &mut Resolver<'_>) -> Result<Out, ContainerError> {
                (self)($(cx.resolve_arc::<$param>()?),*).map_err(|source| {
                    ContainerError::Constructor {
                        name: type_name::<Out>().to_owned(),
                        source: source.into(),
                    }
                })
            }
        }
    };
}

impl_constructor!();
impl_constructor!(P1);
impl_constructor!(P1, P2);
impl_constructor!(P1, P2, P3);
impl_constructor!(P1, P2, P3, P4);
impl_constructor!(P1, P2, P3, P4, P5);
impl_constructor!(P1, P2, P3, P4, P5, P6);
impl_constructor!(P1, P2, P3, P4, P5, P6, P7);
impl_constructor!(P1, P2, P3, P4, P5, P6, P7, P8);
