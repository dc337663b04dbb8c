use std::fmt;
use std::rc::Rc;

#[derive(Debug)]
struct CapabilityInner {
    index: u64,
}

/// An unforgeable in-process capability.
///
/// A `Capability` is a shared handle to a heap object. Cloning it hands out
/// another reference to the same object; [`Capability::new`] always makes a
/// new object, even for an index that is already in use. The registry only
/// authenticates the exact object it created (or rebuilt on restart), so a
/// value built from a learned index never passes a check.
///
/// Equality is object identity. Two capabilities with the same index but
/// different objects compare unequal.
#[derive(Clone)]
pub struct Capability(Rc<CapabilityInner>);

impl Capability {
    /// Creates a fresh capability object for `index`.
    pub fn new(index: u64) -> Self {
        Capability(Rc::new(CapabilityInner { index }))
    }

    /// The globally unique index this capability was allocated under.
    pub fn index(&self) -> u64 {
        self.0.index
    }

    /// True iff `self` and `other` are the same object.
    pub fn same_as(&self, other: &Capability) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Capability {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Capability {}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("index", &self.0.index)
            .finish()
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capability{{{}}}", self.0.index)
    }
}
