use std::sync::{Arc, OnceLock};

use crate::{ContainerError, Resolver, Wiring};

/// Base trait for objects managed by the container.
///
/// Most implementations come from `#[derive(Component)]`, which generates
/// [`Component::inject`] from `#[inject]` and `#[property]` field
/// attributes and [`Component::wire`] from [`Late`] fields. A manual
/// implementation only needs the empty defaults.
pub trait Component: Send + Sync + 'static {
    /// An explicit registration name, when one was declared. Without one
    /// the container derives the name from the type name.
    fn explicit_name() -> Option<&'static str>
    where
        Self: Sized,
    {
        None
    }

    /// Field injection pass, run on every newly constructed value before
    /// it is memoized.
    fn inject(&mut self, _cx: &mut Resolver<'_>) -> Result<(), ContainerError> {
        Ok(())
    }

    /// Back-reference wiring pass, run after the surrounding resolution
    /// completes. Implementations fill [`Late`] cells from instances that
    /// already exist; nothing is constructed here.
    fn wire(&self, _cx: &Wiring<'_>) {}
}

/// A late-bound reference to another component.
///
/// Mutually dependent components cannot resolve each other through
/// constructor parameters without forming a true cycle. A `Late<T>` field
/// stays empty during construction and is filled by the container's wire
/// pass once both sides exist.
pub struct Late<T> {
    cell: OnceLock<Arc<T>>,
}

impl<T> Late<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    pub fn get(&self) -> Option<&Arc<T>> {
        self.cell.get()
    }

    /// Fills the cell, returning `false` when it was already filled.
    pub fn set(&self, value: Arc<T>) -> bool {
        self.cell.set(value).is_ok()
    }
}

impl<T> Default for Late<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Late<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.cell.get() {
            Some(_) => write!(f, "Late(wired)"),
            None => write!(f, "Late(empty)"),
        }
    }
}

/// Derives a registration name from a type name: the last path segment,
/// with the first matching eliminator suffix stripped and the leading
/// character lowercased. An empty result means the type cannot be named.
pub(crate) fn derive_name(type_name: &str, eliminators: &[String]) -> String {
    let mut base = type_name.rsplit("::").next().unwrap_or(type_name);
    if let Some(generics) = base.find('<') {
        base = &base[..generics];
    }
    for eliminator in eliminators {
        if base.len() > eliminator.len() && base.ends_with(eliminator.as_str()) {
            base = &base[..base.len() - eliminator.len()];
            break;
        }
    }
    let mut chars = base.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Converts a snake_case identifier into lowerCamel, the convention bean
/// and component names follow.
pub(crate) fn lower_camel(name: &str) -> String {
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
