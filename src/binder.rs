use std::{borrow::Cow, fmt, sync::Arc};

use facet::Facet;
use facet_core::{Def, Shape};
use facet_reflect::{Partial, Peek};
use time::OffsetDateTime;

use crate::{
    BindError, BindErrorKind, Dyn, Field, FieldName, Map, Modifier, PathSegment, Value,
    cast::{self, CastError, CastErrorKind},
    field::{default_field_name, has_marker, is_flattened, resolve_with_tag},
    hatch::{Capability, Hatch, Set, UnmarshalBind},
    shape::{Kind, is_type, same_type, struct_fields},
};

type Result<T> = std::result::Result<T, BindError>;

/// What a [`Hook`] wants the engine to do with a node.
#[derive(Debug, Clone, PartialEq)]
pub enum HookAction {
    /// Bind the node from the original source.
    Continue,
    /// Bind the node from this value instead.
    Replace(Value),
    /// Leave the node as it is.
    Skip,
}

/// Interception hook, called with the destination's shape for every node
/// that is about to be bound.
pub type Hook = Arc<dyn Fn(&'static Shape, &Value) -> Result<HookAction> + Send + Sync>;

/// Resolves a record member into a lookup key and a comma-separated argument
/// list. An empty key ignores the member; a `squash` argument flattens it.
pub type FieldNameFn = Arc<dyn Fn(&Field) -> (Cow<'static, str>, &'static str) + Send + Sync>;

/// Binds [`Value`]s onto [`Facet`] destinations.
///
/// A `Binder` is immutable once built and cheap to clone; it can be shared
/// between threads.
///
/// Binding is transactional: the destination is rebuilt from the source and
/// its current contents, and only replaced once every node has bound. On
/// error the destination is left untouched.
#[derive(Clone)]
pub struct Binder {
    collapse_sequences: bool,
    promote_scalars: bool,
    field_name: FieldNameFn,
    hook: Option<Hook>,
    capabilities: Vec<Capability>,
}

impl Default for Binder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("collapse_sequences", &self.collapse_sequences)
            .field("promote_scalars", &self.promote_scalars)
            .field("hook", &self.hook.is_some())
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

macro_rules! set_narrowed {
    ($partial:expr, $shape:expr, $src:expr, $wide:expr, $($ty:ty),*) => {
        $(
            if is_type::<$ty>($shape) {
                let value = <$ty>::try_from($wide).map_err(|_| overflow(stringify!($ty), $src))?;
                $partial.set(value)?;
                return Ok(());
            }
        )*
    };
}

macro_rules! copy_leaf {
    ($partial:expr, $shape:expr, $old:expr, $($ty:ty),*) => {
        $(
            if is_type::<$ty>($shape) {
                $partial.set($old.get::<$ty>()?.clone())?;
                return Ok(());
            }
        )*
    };
}

impl Binder {
    /// A binder resolving member names through the `json` tag, with both
    /// sequence policies enabled and no escape hatches.
    pub fn new() -> Self {
        Self {
            collapse_sequences: true,
            promote_scalars: true,
            field_name: Arc::new(default_field_name),
            hook: None,
            capabilities: Vec::new(),
        }
    }

    /// Like [`Binder::new`], but a sequence never binds into a scalar and a
    /// scalar never binds into a sequence.
    pub fn strict() -> Self {
        Self::new()
            .collapse_sequences(false)
            .promote_scalars(false)
    }

    /// Installs an interception hook.
    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&'static Shape, &Value) -> Result<HookAction> + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Replaces the member-name resolver.
    pub fn with_field_name<F>(mut self, field_name: F) -> Self
    where
        F: Fn(&Field) -> (Cow<'static, str>, &'static str) + Send + Sync + 'static,
    {
        self.field_name = Arc::new(field_name);
        self
    }

    /// Resolves member names through `tag` instead of `json`.
    pub fn with_tag(self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        self.with_field_name(move |field| resolve_with_tag(field, &tag))
    }

    /// Hands every `T` destination to [`UnmarshalBind::unmarshal_bind`].
    /// Takes precedence over [`Binder::with_set`] for the same type.
    pub fn with_unmarshal_bind<T>(mut self) -> Self
    where
        T: UnmarshalBind + Facet<'static> + Clone + Default,
    {
        self.capabilities.push(Capability::unmarshal::<T>());
        self
    }

    /// Hands every `T` destination to [`Set::set`].
    pub fn with_set<T>(mut self) -> Self
    where
        T: Set + Facet<'static> + Clone + Default,
    {
        self.capabilities.push(Capability::set::<T>());
        self
    }

    /// When enabled, a sequence bound into anything but an array, list,
    /// option or pointer binds its first element instead; an empty sequence
    /// binds nothing.
    pub fn collapse_sequences(mut self, enabled: bool) -> Self {
        self.collapse_sequences = enabled;
        self
    }

    /// When enabled, a scalar bound into an array or list binds as a
    /// one-element sequence.
    pub fn promote_scalars(mut self, enabled: bool) -> Self {
        self.promote_scalars = enabled;
        self
    }

    /// Resolves a record member with this binder's resolver.
    pub fn resolve_field(&self, field: &Field) -> FieldName {
        let (name, arg) = (self.field_name)(field);
        FieldName::from_parts(name, arg)
    }

    /// Binds `src` onto `dst`. On error `dst` is left as it was.
    pub fn bind<T: Facet<'static>>(&self, dst: &mut T, src: &Value) -> Result<()> {
        log::trace!("Entering `bind` method for {}", T::SHAPE);

        let mut typed_partial = Partial::alloc::<T>()?;
        {
            let partial = typed_partial.inner_mut();
            self.bind_node(partial, Some(Peek::new(&*dst)), src)?;
        }
        let boxed_value = typed_partial.build()?;
        log::trace!("Destination fully built");

        *dst = *boxed_value;
        Ok(())
    }

    /// Binds one node into the current frame of `partial`, which is
    /// uninitialized on entry and initialized on success. `old` is the
    /// destination's current value at this node, if there is one.
    fn bind_node(
        &self,
        partial: &mut Partial<'static>,
        old: Option<Peek<'_, 'static>>,
        src: &Value,
    ) -> Result<()> {
        let shape = partial.shape();
        let kind = Kind::of(shape);
        log::trace!(
            "Entering `bind_node` method for {shape} ({kind}) from {}",
            src.kind_name()
        );

        if src.is_null() {
            return self.keep(partial, old);
        }

        let mut src = Cow::Borrowed(src);
        if let Some(hook) = &self.hook {
            match hook(shape, &src)? {
                HookAction::Continue => {}
                HookAction::Replace(value) if value.is_null() => return self.keep(partial, old),
                HookAction::Replace(value) => {
                    log::trace!("Hook replaced source with {}", value.kind_name());
                    src = Cow::Owned(value);
                }
                HookAction::Skip => {
                    log::trace!("Hook skipped {shape}");
                    return self.keep(partial, old);
                }
            }
        }

        if self.collapse_sequences && !kind.takes_sequences() && !holds_value(kind, old) {
            let first = match &*src {
                Value::Seq(items) => Some(items.first().cloned()),
                _ => None,
            };
            match first {
                Some(None) => {
                    log::debug!("Empty sequence for {shape}: nothing to bind");
                    return self.keep(partial, old);
                }
                Some(Some(first)) => {
                    log::debug!("Collapsing sequence into {shape}");
                    src = Cow::Owned(first);
                }
                None => {}
            }
        }

        if let Some(capability) = self.capability(shape) {
            log::trace!("Delegating {shape} to `{}`", capability.hatch);
            return (capability.run)(old, &src, partial);
        }

        if let Value::Native(native) = &*src {
            if native.assign_to(partial)? {
                log::trace!("Assigned native {} directly", native.type_name());
                return Ok(());
            }
        }

        match kind {
            Kind::Bool => {
                partial.set(cast::to_bool(&src)?)?;
            }
            Kind::Int => self.bind_int(partial, shape, &src)?,
            Kind::Uint => self.bind_uint(partial, shape, &src)?,
            Kind::Float if is_type::<f32>(shape) => {
                partial.set(cast::to_f32(&src)?)?;
            }
            Kind::Float => {
                partial.set(cast::to_f64(&src)?)?;
            }
            Kind::String => {
                partial.set(cast::to_string(&src)?)?;
            }
            Kind::Duration => {
                partial.set(cast::to_duration(&src)?)?;
            }
            Kind::Timestamp => {
                partial.set(cast::to_timestamp(&src)?)?;
            }
            Kind::Any => {
                partial.set(src.into_owned())?;
            }
            Kind::DynamicMap => match src.into_owned() {
                Value::Map(map) => {
                    partial.set(map)?;
                }
                other => return Err(not_map(shape, &other)),
            },
            Kind::Open => self.bind_open(partial, old, &src)?,
            Kind::Option => {
                let inner = old
                    .and_then(|peek| peek.into_option().ok())
                    .and_then(|option| option.value());
                partial.begin_some()?;
                self.bind_node(partial, inner, &src)?;
                partial.end()?;
            }
            Kind::Pointer => {
                let inner = old
                    .and_then(|peek| peek.into_pointer().ok())
                    .and_then(|pointer| pointer.borrow_inner());
                partial.begin_smart_ptr()?;
                self.bind_node(partial, inner, &src)?;
                partial.end()?;
            }
            Kind::List => self.bind_list(partial, shape, &src)?,
            Kind::Array => self.bind_array(partial, shape, old, &src)?,
            Kind::Map => self.bind_map(partial, shape, &src)?,
            Kind::Transparent if struct_fields(shape).is_none() => {
                partial.begin_inner()?;
                self.bind_node(partial, None, &src)?;
                partial.end()?;
            }
            Kind::Transparent => {
                let inner = old
                    .and_then(|peek| peek.into_struct().ok())
                    .and_then(|record| record.field(0).ok());
                partial.begin_nth_field(0)?;
                self.bind_node(partial, inner, &src)?;
                partial.end()?;
            }
            Kind::Record => self.bind_record(partial, shape, old, &src)?,
            Kind::Opaque => {
                return Err(BindErrorKind::UnsupportedKind {
                    type_name: shape.type_identifier,
                }
                .into());
            }
        }
        Ok(())
    }

    /// The escape hatch registered for `shape`, self-unmarshaling first.
    fn capability(&self, shape: &'static Shape) -> Option<&Capability> {
        let registered = |hatch| {
            self.capabilities
                .iter()
                .find(|c| c.hatch == hatch && same_type(c.shape, shape))
        };
        registered(Hatch::Unmarshal).or_else(|| registered(Hatch::Set))
    }

    fn bind_int(&self, partial: &mut Partial<'static>, shape: &Shape, src: &Value) -> Result<()> {
        let wide = cast::to_i64(src)?;
        set_narrowed!(partial, shape, src, wide, i8, i16, i32, i64, isize);
        Err(unsupported(shape))
    }

    fn bind_uint(&self, partial: &mut Partial<'static>, shape: &Shape, src: &Value) -> Result<()> {
        let wide = cast::to_u64(src)?;
        set_narrowed!(partial, shape, src, wide, u8, u16, u32, u64, usize);
        Err(unsupported(shape))
    }

    fn bind_open(
        &self,
        partial: &mut Partial<'static>,
        old: Option<Peek<'_, 'static>>,
        src: &Value,
    ) -> Result<()> {
        log::trace!("Entering `bind_open` method");
        let mut slot = match old {
            Some(peek) => peek.get::<Dyn>()?.clone(),
            None => Dyn::empty(),
        };

        if slot.is_empty() {
            slot = match src {
                Value::Native(native) => {
                    native
                        .to_dyn()
                        .ok_or_else(|| BindErrorKind::Incompatible {
                            src: native.type_name(),
                            dst: Dyn::SHAPE.type_identifier,
                        })?
                }
                other => Dyn::new(other.clone()),
            };
        } else {
            slot.bind_held(self, src)?;
        }

        partial.set(slot)?;
        Ok(())
    }

    /// Binds every member of a struct from `src`.
    fn bind_record(
        &self,
        partial: &mut Partial<'static>,
        shape: &'static Shape,
        old: Option<Peek<'_, 'static>>,
        src: &Value,
    ) -> Result<()> {
        log::trace!("Entering `bind_record` method for {shape}");
        let fields = struct_fields(shape).unwrap_or_default();
        let old = old.and_then(|peek| peek.into_struct().ok());

        for (index, field) in fields.iter().enumerate() {
            let old_member = old.as_ref().and_then(|record| record.field(index).ok());
            partial.begin_nth_field(index)?;
            let member_shape = partial.shape();

            let FieldName { key, modifier } = self.resolve_field(field);
            if modifier == Modifier::Ignore {
                log::trace!("Member `{}` is ignored", field.name);
                self.keep(partial, old_member)?;
            } else if Kind::of(member_shape) == Kind::Record
                && (modifier == Modifier::Squash
                    || is_flattened(field)
                    || has_marker(field, "squash"))
            {
                log::trace!("Squashing member `{}`", field.name);
                self.bind_record(partial, member_shape, old_member, src)?;
            } else {
                let Value::Map(map) = src else {
                    return Err(BindErrorKind::NotRecordSource {
                        type_name: shape.type_identifier,
                        found: src.kind_name(),
                    }
                    .into());
                };
                match map.get(&key) {
                    Some(value) => self
                        .bind_node(partial, old_member, value)
                        .map_err(|err| err.with_path(PathSegment::Field(key)))?,
                    None => {
                        log::trace!("No entry for `{key}`");
                        self.keep(partial, old_member)?;
                    }
                }
            }

            partial.end()?;
        }
        Ok(())
    }

    /// Elements of a sequence source, promoting a scalar when allowed.
    fn sequence_items<'a>(&self, shape: &Shape, src: &'a Value) -> Result<&'a [Value]> {
        match src {
            Value::Seq(items) => Ok(items),
            Value::Map(_) => Err(not_sequence(shape, src)),
            other if self.promote_scalars => {
                log::debug!("Promoting {} to a sequence", other.kind_name());
                Ok(std::slice::from_ref(other))
            }
            other => Err(not_sequence(shape, other)),
        }
    }

    /// Rebuilds a growable sequence with one element per source item.
    fn bind_list(&self, partial: &mut Partial<'static>, shape: &Shape, src: &Value) -> Result<()> {
        log::trace!("Entering `bind_list` method for {shape}");
        let items = self.sequence_items(shape, src)?;

        partial.begin_list()?;
        for (index, item) in items.iter().enumerate() {
            partial.begin_list_item()?;
            self.bind_node(partial, None, item)
                .map_err(|err| err.with_path(PathSegment::Index(index)))?;
            partial.end()?;
        }
        Ok(())
    }

    /// Binds the first `min(len, N)` elements of a fixed-size array and
    /// keeps the rest.
    fn bind_array(
        &self,
        partial: &mut Partial<'static>,
        shape: &Shape,
        old: Option<Peek<'_, 'static>>,
        src: &Value,
    ) -> Result<()> {
        log::trace!("Entering `bind_array` method for {shape}");
        let Def::Array(array_def) = shape.def else {
            return Err(unsupported(shape));
        };
        let items = self.sequence_items(shape, src)?;
        let old = old.and_then(|peek| peek.into_list_like().ok());

        for index in 0..array_def.n {
            let old_item = old.as_ref().and_then(|list| list.get(index));
            partial.begin_nth_field(index)?;
            match items.get(index) {
                Some(item) => self
                    .bind_node(partial, old_item, item)
                    .map_err(|err| err.with_path(PathSegment::Index(index)))?,
                None => self.keep(partial, old_item)?,
            }
            partial.end()?;
        }
        Ok(())
    }

    /// Rebuilds an associative container from a map source. Keys bind from
    /// their string form.
    fn bind_map(&self, partial: &mut Partial<'static>, shape: &Shape, src: &Value) -> Result<()> {
        log::trace!("Entering `bind_map` method for {shape}");
        let Value::Map(map) = src else {
            return Err(not_map(shape, src));
        };

        partial.begin_map()?;
        for (key, value) in map {
            let at = || PathSegment::Key(key.clone());
            partial.begin_key()?;
            self.bind_node(partial, None, &Value::String(key.clone()))
                .map_err(|err| err.with_path(at()))?;
            partial.end()?;
            partial.begin_value()?;
            self.bind_node(partial, None, value)
                .map_err(|err| err.with_path(at()))?;
            partial.end()?;
        }
        Ok(())
    }

    /// Leaves the node as it was: a copy of `old`, or the type's default for
    /// a node that did not exist before.
    fn keep(&self, partial: &mut Partial<'static>, old: Option<Peek<'_, 'static>>) -> Result<()> {
        match old {
            Some(old) => self.restore(partial, old),
            None => self.fill_default(partial),
        }
    }

    fn fill_default(&self, partial: &mut Partial<'static>) -> Result<()> {
        let shape = partial.shape();
        match partial.set_default() {
            Ok(_) => Ok(()),
            Err(err) => match struct_fields(shape) {
                Some(fields) => {
                    log::trace!("{shape} has no default, filling members one by one");
                    for index in 0..fields.len() {
                        partial.begin_nth_field(index)?;
                        self.fill_default(partial)?;
                        partial.end()?;
                    }
                    Ok(())
                }
                None => Err(err.into()),
            },
        }
    }

    /// Writes a copy of `old` into the current frame.
    fn restore(&self, partial: &mut Partial<'static>, old: Peek<'_, 'static>) -> Result<()> {
        let shape = partial.shape();
        if let Some(capability) = self.capability(shape) {
            return (capability.copy)(old, partial);
        }

        copy_leaf!(
            partial, shape, old, bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32,
            f64, String, std::time::Duration, OffsetDateTime, Value, Map, Dyn
        );

        match Kind::of(shape) {
            Kind::Option => match old.into_option()?.value() {
                Some(inner) => {
                    partial.begin_some()?;
                    self.restore(partial, inner)?;
                    partial.end()?;
                }
                None => {
                    partial.set_default()?;
                }
            },
            Kind::Pointer => {
                let Some(inner) = old.into_pointer()?.borrow_inner() else {
                    return Err(unsupported(shape));
                };
                partial.begin_smart_ptr()?;
                self.restore(partial, inner)?;
                partial.end()?;
            }
            Kind::List => {
                partial.begin_list()?;
                for item in old.into_list_like()?.iter() {
                    partial.begin_list_item()?;
                    self.restore(partial, item)?;
                    partial.end()?;
                }
            }
            Kind::Array => {
                for (index, item) in old.into_list_like()?.iter().enumerate() {
                    partial.begin_nth_field(index)?;
                    self.restore(partial, item)?;
                    partial.end()?;
                }
            }
            Kind::Map => {
                partial.begin_map()?;
                for (key, value) in old.into_map()?.iter() {
                    partial.begin_key()?;
                    self.restore(partial, key)?;
                    partial.end()?;
                    partial.begin_value()?;
                    self.restore(partial, value)?;
                    partial.end()?;
                }
            }
            Kind::Transparent | Kind::Record if struct_fields(shape).is_some() => {
                let record = old.into_struct()?;
                for index in 0..record.field_count() {
                    let member = record.field(index).map_err(|_| unsupported(shape))?;
                    partial.begin_nth_field(index)?;
                    self.restore(partial, member)?;
                    partial.end()?;
                }
            }
            _ => return Err(unsupported(shape)),
        }
        Ok(())
    }
}

/// Whether an open slot already holds a value, which then decides for
/// itself how to take a sequence.
fn holds_value(kind: Kind, old: Option<Peek<'_, 'static>>) -> bool {
    kind == Kind::Open
        && old
            .as_ref()
            .and_then(|peek| peek.get::<Dyn>().ok())
            .is_some_and(|slot| !slot.is_empty())
}

fn overflow(target: &'static str, src: &Value) -> BindError {
    CastError::new(target, src, CastErrorKind::Overflow).into()
}

fn unsupported(shape: &Shape) -> BindError {
    BindErrorKind::UnsupportedKind {
        type_name: shape.type_identifier,
    }
    .into()
}

fn not_sequence(shape: &Shape, src: &Value) -> BindError {
    BindErrorKind::NotSequence {
        type_name: shape.type_identifier,
        found: src.kind_name(),
    }
    .into()
}

fn not_map(shape: &Shape, src: &Value) -> BindError {
    BindErrorKind::NotMap {
        type_name: shape.type_identifier,
        found: src.kind_name(),
    }
    .into()
}
