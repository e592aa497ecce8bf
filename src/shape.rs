//! Classification of reflected destination shapes.
//!
//! The engine dispatches on a [`Kind`], computed once per node from the
//! destination's [`Shape`].

use std::{fmt, time::Duration};

use facet_core::{Def, Facet, Field, Shape, Type, UserType};
use time::OffsetDateTime;

use crate::{Dyn, Map, Value};

/// Returns `true` if both shapes describe the same Rust type.
pub fn same_type(a: &Shape, b: &Shape) -> bool {
    a.id == b.id
}

/// Returns `true` if `shape` describes `T`.
pub fn is_type<T: Facet<'static>>(shape: &Shape) -> bool {
    same_type(shape, T::SHAPE)
}

/// Members of a struct shape, in declaration order.
pub fn struct_fields(shape: &'static Shape) -> Option<&'static [Field]> {
    match &shape.ty {
        Type::User(UserType::Struct(struct_def)) => Some(struct_def.fields),
        _ => None,
    }
}

/// Dispatch category of a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Kind {
    /// `bool`
    Bool,
    /// Signed integers.
    Int,
    /// Unsigned integers.
    Uint,
    /// `f32` and `f64`.
    Float,
    /// `String`
    String,
    /// `std::time::Duration`, coerced through duration rules.
    Duration,
    /// `OffsetDateTime`, coerced through timestamp rules.
    Timestamp,
    /// [`Value`], which stores any source verbatim.
    Any,
    /// [`Map`], which only accepts map sources.
    DynamicMap,
    /// [`Dyn`], the typed polymorphic slot.
    Open,
    /// `Option`
    Option,
    /// `Box`, `Arc`, `Rc` and other smart pointers.
    Pointer,
    /// Growable sequences.
    List,
    /// Fixed-size arrays.
    Array,
    /// Associative containers.
    Map,
    /// Transparent wrappers, bound as their inner type.
    Transparent,
    /// Structs.
    Record,
    /// Everything else, including `#[facet(opaque)]` types.
    Opaque,
}

macro_rules! kind_by_type {
    ($shape:expr, $($kind:ident => $($ty:ty),+;)*) => {
        $(
            if $(is_type::<$ty>($shape))||+ {
                return Kind::$kind;
            }
        )*
    };
}

impl Kind {
    /// Classifies `shape`.
    pub fn of(shape: &'static Shape) -> Kind {
        kind_by_type! { shape,
            Any => Value;
            DynamicMap => Map;
            Open => Dyn;
            Bool => bool;
            Int => i8, i16, i32, i64, isize;
            Uint => u8, u16, u32, u64, usize;
            Float => f32, f64;
            String => String;
            Duration => Duration;
            Timestamp => OffsetDateTime;
        }

        match shape.def {
            Def::Option(_) => return Kind::Option,
            Def::Pointer(_) => return Kind::Pointer,
            Def::List(_) => return Kind::List,
            Def::Array(_) => return Kind::Array,
            Def::Map(_) => return Kind::Map,
            _ => {}
        }

        if shape.inner.is_some() {
            return Kind::Transparent;
        }
        match shape.ty {
            Type::User(UserType::Struct(_)) => Kind::Record,
            _ => Kind::Opaque,
        }
    }

    /// Destinations a sequence source binds into as a whole.
    pub fn takes_sequences(self) -> bool {
        matches!(
            self,
            Kind::List | Kind::Array | Kind::Option | Kind::Pointer
        )
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Uint => "uint",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::Duration => "duration",
            Kind::Timestamp => "timestamp",
            Kind::Any => "any",
            Kind::DynamicMap => "dynamic map",
            Kind::Open => "open",
            Kind::Option => "option",
            Kind::Pointer => "pointer",
            Kind::List => "list",
            Kind::Array => "array",
            Kind::Map => "map",
            Kind::Transparent => "transparent",
            Kind::Record => "record",
            Kind::Opaque => "opaque",
        };
        f.write_str(name)
    }
}
