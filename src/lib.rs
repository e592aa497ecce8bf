#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

use std::sync::OnceLock;

use facet_core::Facet;

mod adapters;
mod binder;
pub mod cast;
mod error;
pub mod field;
mod hatch;
mod open;
pub mod shape;
mod value;

pub use adapters::{bind_header, bind_map, bind_query, bind_string_map, bind_with_tag};
pub use binder::{Binder, FieldNameFn, Hook, HookAction};
pub use cast::{CastError, CastErrorKind};
pub use error::{BindError, BindErrorKind, PathSegment};
pub use field::{Field, FieldName, Modifier};
pub use hatch::{Set, UnmarshalBind};
pub use open::Dyn;
pub use shape::Kind;
pub use value::{Map, Native, Value};

static DEFAULT_BINDER: OnceLock<Binder> = OnceLock::new();

/// The binder used by [`bind`] and [`from_value`].
///
/// Initialised with [`Binder::new`] on first use unless
/// [`set_default_binder`] ran before.
pub fn default_binder() -> &'static Binder {
    DEFAULT_BINDER.get_or_init(Binder::new)
}

/// Installs the process-wide default binder.
///
/// Only the first call before any use of [`default_binder`] succeeds; later
/// calls hand the rejected binder back.
pub fn set_default_binder(binder: Binder) -> Result<(), Binder> {
    DEFAULT_BINDER.set(binder)
}

/// Binds `src` onto `dst` with the [default binder](default_binder).
pub fn bind<T: Facet<'static>>(dst: &mut T, src: &Value) -> Result<(), BindError> {
    log::trace!("Entering `bind` function");
    default_binder().bind(dst, src)
}

/// Binds `src` onto a fresh `T::default()` with the
/// [default binder](default_binder).
pub fn from_value<T: Facet<'static> + Default>(src: &Value) -> Result<T, BindError> {
    log::trace!("Entering `from_value` function");
    let mut value = T::default();
    bind(&mut value, src)?;
    Ok(value)
}
