use std::{any::Any, fmt};

use facet::Facet;
use facet_core::Shape;

use crate::{BindError, Binder, Value};

/// A typed polymorphic slot: holds any [`Facet`] value, or nothing.
///
/// Binding into a `Dyn` that already holds a value binds into that value,
/// keeping its concrete type. Binding into an empty `Dyn` stores the source
/// as-is: a [`Value`], or the concrete type of a native built with
/// [`Value::typed_native`].
#[derive(Default, Facet)]
pub struct Dyn {
    #[facet(opaque)]
    held: Option<Box<dyn Held>>,
}

impl Dyn {
    /// An empty slot.
    pub fn empty() -> Self {
        Dyn { held: None }
    }

    /// A slot holding `value`.
    pub fn new<T>(value: T) -> Self
    where
        T: Facet<'static> + Clone + fmt::Debug + Send + Sync + 'static,
    {
        Dyn {
            held: Some(Box::new(value)),
        }
    }

    /// Returns `true` if the slot holds nothing.
    pub fn is_empty(&self) -> bool {
        self.held.is_none()
    }

    /// Shape of the held value.
    pub fn held_shape(&self) -> Option<&'static Shape> {
        self.held.as_ref().map(|held| held.shape())
    }

    /// Returns `true` if the slot holds a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }

    /// Borrows the held value as a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.held.as_ref()?.as_any().downcast_ref::<T>()
    }

    /// Mutably borrows the held value as a `T`.
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.held.as_mut()?.as_any_mut().downcast_mut::<T>()
    }

    /// Empties the slot.
    pub fn clear(&mut self) {
        self.held = None;
    }

    /// Binds `src` into the held value, keeping its type.
    pub(crate) fn bind_held(&mut self, binder: &Binder, src: &Value) -> Result<(), BindError> {
        match &mut self.held {
            Some(held) => held.bind_held(binder, src),
            None => Ok(()),
        }
    }
}

impl Clone for Dyn {
    fn clone(&self) -> Self {
        Dyn {
            held: self.held.as_ref().map(|held| held.clone_held()),
        }
    }
}

impl fmt::Debug for Dyn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.held {
            Some(held) => f.debug_tuple("Dyn").field(&held.as_debug()).finish(),
            None => f.write_str("Dyn(<empty>)"),
        }
    }
}

/// A value a [`Dyn`] can hold.
trait Held: Any + Send + Sync {
    fn shape(&self) -> &'static Shape;

    fn bind_held(&mut self, binder: &Binder, src: &Value) -> Result<(), BindError>;

    fn clone_held(&self) -> Box<dyn Held>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn as_debug(&self) -> &dyn fmt::Debug;
}

impl<T> Held for T
where
    T: Facet<'static> + Clone + fmt::Debug + Send + Sync + 'static,
{
    fn shape(&self) -> &'static Shape {
        T::SHAPE
    }

    fn bind_held(&mut self, binder: &Binder, src: &Value) -> Result<(), BindError> {
        binder.bind(self, src)
    }

    fn clone_held(&self) -> Box<dyn Held> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_debug(&self) -> &dyn fmt::Debug {
        self
    }
}
