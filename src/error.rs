use std::{
    borrow::Cow,
    error::Error,
    fmt::{self, Display},
};

use facet_reflect::ReflectError;

use crate::cast::CastError;

/// Error type for binding.
#[derive(Debug)]
pub struct BindError {
    kind: BindErrorKind,
    path: Vec<PathSegment>,
}

impl BindError {
    /// Returns a reference to the error kind for detailed error inspection.
    pub fn kind(&self) -> &BindErrorKind {
        &self.kind
    }

    /// Consumes the error and returns its kind.
    pub fn into_kind(self) -> BindErrorKind {
        self.kind
    }

    /// Location of the failing node, outermost segment first. Empty when the
    /// failure happened at the top-level destination.
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// Wraps an arbitrary message. Intended for hooks and escape hatches.
    pub fn custom(msg: impl Into<String>) -> Self {
        let msg: Box<dyn Error + Send + Sync> = msg.into().into();
        BindErrorKind::Custom(msg).into()
    }

    /// Prefixes the path with `segment`; called while unwinding out of a
    /// nested node.
    pub(crate) fn with_path(mut self, segment: PathSegment) -> Self {
        self.path.insert(0, segment);
        self
    }
}

impl Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = &self.kind;
        if self.path.is_empty() {
            return write!(f, "{kind}");
        }
        write!(f, "at ")?;
        for segment in &self.path {
            write!(f, "{segment}")?;
        }
        write!(f, ": {kind}")
    }
}

impl Error for BindError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            BindErrorKind::Cast(err) => Some(err),
            BindErrorKind::Custom(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl<K: Into<BindErrorKind>> From<K> for BindError {
    fn from(value: K) -> Self {
        let kind = value.into();
        BindError {
            kind,
            path: Vec::new(),
        }
    }
}

/// Detailed classification of binding errors.
#[derive(Debug)]
#[non_exhaustive]
pub enum BindErrorKind {
    /// The destination opted out of structural binding and the source is not
    /// directly assignable to it.
    UnsupportedKind {
        /// Destination type.
        type_name: &'static str,
    },
    /// A sequence destination received something other than a sequence.
    NotSequence {
        /// Destination type.
        type_name: &'static str,
        /// Kind of the offending source.
        found: &'static str,
    },
    /// A map destination received something other than a map.
    NotMap {
        /// Destination type.
        type_name: &'static str,
        /// Kind of the offending source.
        found: &'static str,
    },
    /// A record destination received something other than a map.
    NotRecordSource {
        /// Destination type.
        type_name: &'static str,
        /// Kind of the offending source.
        found: &'static str,
    },
    /// Scalar coercion failed.
    Cast(CastError),
    /// An empty open slot cannot hold the source.
    Incompatible {
        /// Source type.
        src: &'static str,
        /// Destination type.
        dst: &'static str,
    },
    /// Failure reported by a hook or an escape hatch.
    Custom(Box<dyn Error + Send + Sync>),
    /// Error from the reflection system while building the destination.
    Reflect(ReflectError),
}

impl Display for BindErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindErrorKind::UnsupportedKind { type_name } => {
                write!(f, "unsupported destination type {type_name}")
            }
            BindErrorKind::NotSequence { type_name, found } => {
                write!(f, "cannot bind {found} into sequence {type_name}")
            }
            BindErrorKind::NotMap { type_name, found } => {
                write!(f, "cannot bind {found} into map {type_name}")
            }
            BindErrorKind::NotRecordSource { type_name, found } => {
                write!(f, "cannot bind {found} into record {type_name}, expected a map")
            }
            BindErrorKind::Cast(err) => write!(f, "{err}"),
            BindErrorKind::Incompatible { src, dst } => {
                write!(f, "cannot assign {src} to {dst}")
            }
            BindErrorKind::Custom(err) => write!(f, "{err}"),
            BindErrorKind::Reflect(err) => write!(f, "{err}"),
        }
    }
}

impl From<ReflectError> for BindErrorKind {
    fn from(value: ReflectError) -> Self {
        BindErrorKind::Reflect(value)
    }
}

impl From<CastError> for BindErrorKind {
    fn from(value: CastError) -> Self {
        BindErrorKind::Cast(value)
    }
}

/// One step from a parent destination to a nested one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A record member, by lookup key.
    Field(Cow<'static, str>),
    /// A sequence element.
    Index(usize),
    /// A map entry, by its source key.
    Key(String),
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, ".{name}"),
            PathSegment::Index(index) => write!(f, "[{index}]"),
            PathSegment::Key(key) => write!(f, "[{key}]"),
        }
    }
}
