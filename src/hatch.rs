//! Escape hatches: user types that take over their own binding.
//!
//! A type opts in by implementing [`UnmarshalBind`] or [`Set`] and being
//! registered on a [`Binder`](crate::Binder) with
//! [`with_unmarshal_bind`](crate::Binder::with_unmarshal_bind) or
//! [`with_set`](crate::Binder::with_set). The engine looks registrations up
//! by destination shape before any structural dispatch.

use std::fmt;

use facet::Facet;
use facet_core::Shape;
use facet_reflect::{Partial, Peek};

use crate::{BindError, Value};

/// Takes over binding of a value entirely. Consulted before [`Set`].
pub trait UnmarshalBind {
    /// Replaces `self` with the interpretation of `src`.
    fn unmarshal_bind(&mut self, src: &Value) -> Result<(), BindError>;
}

/// Sets a value from a dynamic source.
pub trait Set {
    /// Sets `self` from `src`.
    fn set(&mut self, src: &Value) -> Result<(), BindError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hatch {
    Unmarshal,
    Set,
}

impl fmt::Display for Hatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hatch::Unmarshal => f.write_str("unmarshal_bind"),
            Hatch::Set => f.write_str("set"),
        }
    }
}

type RunFn = fn(Option<Peek<'_, 'static>>, &Value, &mut Partial<'static>) -> Result<(), BindError>;

type CopyFn = fn(Peek<'_, 'static>, &mut Partial<'static>) -> Result<(), BindError>;

/// A registered escape hatch for one destination type.
#[derive(Clone, Copy)]
pub(crate) struct Capability {
    pub(crate) shape: &'static Shape,
    pub(crate) hatch: Hatch,
    pub(crate) run: RunFn,
    pub(crate) copy: CopyFn,
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} for {}", self.hatch, self.shape)
    }
}

impl Capability {
    pub(crate) fn unmarshal<T>() -> Self
    where
        T: UnmarshalBind + Facet<'static> + Clone + Default,
    {
        Capability {
            shape: T::SHAPE,
            hatch: Hatch::Unmarshal,
            run: run_unmarshal::<T>,
            copy: copy_current::<T>,
        }
    }

    pub(crate) fn set<T>() -> Self
    where
        T: Set + Facet<'static> + Clone + Default,
    {
        Capability {
            shape: T::SHAPE,
            hatch: Hatch::Set,
            run: run_set::<T>,
            copy: copy_current::<T>,
        }
    }
}

/// The destination's current value, or `T::default()` for a fresh node.
fn current<T: Facet<'static> + Clone + Default>(
    old: Option<Peek<'_, 'static>>,
) -> Result<T, BindError> {
    match old {
        Some(peek) => Ok(peek.get::<T>()?.clone()),
        None => Ok(T::default()),
    }
}

fn run_unmarshal<T>(
    old: Option<Peek<'_, 'static>>,
    src: &Value,
    partial: &mut Partial<'static>,
) -> Result<(), BindError>
where
    T: UnmarshalBind + Facet<'static> + Clone + Default,
{
    let mut value = current::<T>(old)?;
    value.unmarshal_bind(src)?;
    partial.set(value)?;
    Ok(())
}

fn run_set<T>(
    old: Option<Peek<'_, 'static>>,
    src: &Value,
    partial: &mut Partial<'static>,
) -> Result<(), BindError>
where
    T: Set + Facet<'static> + Clone + Default,
{
    let mut value = current::<T>(old)?;
    value.set(src)?;
    partial.set(value)?;
    Ok(())
}

fn copy_current<T: Facet<'static> + Clone>(
    old: Peek<'_, 'static>,
    partial: &mut Partial<'static>,
) -> Result<(), BindError> {
    partial.set(old.get::<T>()?.clone())?;
    Ok(())
}
