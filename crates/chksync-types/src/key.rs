use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Object-safe view of a hashable, value-comparable key.
trait DynKey: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn dyn_eq(&self, other: &dyn DynKey) -> bool;
    fn dyn_hash(&self, state: &mut dyn Hasher);
    fn type_name(&self) -> &'static str;
}

impl<T> DynKey for T
where
    T: Hash + Eq + fmt::Debug + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn DynKey) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }

    fn dyn_hash(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<T>().hash(&mut state);
        self.hash(&mut state);
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Domain key that scopes a sub-tree node or a cache slot.
///
/// Any `Hash + Eq` value can serve as a key, so each domain concept brings
/// its own identifier type (a project id, a document id, an options marker)
/// rather than relying on object identity. Keys of different concrete types
/// never compare equal, even when their values print the same.
#[derive(Clone)]
pub struct TreeKey(Arc<dyn DynKey>);

impl TreeKey {
    pub fn new<K>(key: K) -> Self
    where
        K: Hash + Eq + fmt::Debug + Send + Sync + 'static,
    {
        Self(Arc::new(key))
    }

    /// Borrow the key as its concrete type, if it is one.
    pub fn downcast_ref<K: 'static>(&self) -> Option<&K> {
        self.0.as_any().downcast_ref::<K>()
    }

    /// Name of the concrete key type.
    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }
}

impl PartialEq for TreeKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.dyn_eq(&*other.0)
    }
}

impl Eq for TreeKey {}

impl Hash for TreeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.dyn_hash(state);
    }
}

impl fmt::Debug for TreeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}
