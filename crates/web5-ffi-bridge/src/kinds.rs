//! Object kinds and kind-tagged raw addresses.
//!
//! Native objects arrive as bare addresses. To avoid reinterpreting one
//! kind of object as another, every address is paired with the kind of the
//! entry point that produced it, and [`Handle`](crate::Handle) checks the
//! tag before wrapping.

use std::ffi::c_void;
use std::fmt;

/// Marker trait for native object kinds.
pub trait ObjectKind: Send + Sync + 'static {
    /// Kind name used in tags, logs and faults.
    const NAME: &'static str;
}

macro_rules! define_object_kind {
    ($name:ident, $type_name:literal) => {
        #[doc = concat!("Marker type for native ", $type_name, " objects.")]
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl ObjectKind for $name {
            const NAME: &'static str = $type_name;
        }
    };
}

define_object_kind!(SignerKind, "Signer");
define_object_kind!(KeyManagerKind, "KeyManager");

/// A native object address plus the kind it was produced as.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawObject {
    address: *mut c_void,
    tag: &'static str,
}

impl RawObject {
    /// Tags an address returned by an entry point that produces `K`.
    pub fn new<K: ObjectKind>(address: *mut c_void) -> Self {
        RawObject {
            address,
            tag: K::NAME,
        }
    }

    pub fn address(&self) -> *mut c_void {
        self.address
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    pub fn is_null(&self) -> bool {
        self.address.is_null()
    }

    pub fn is<K: ObjectKind>(&self) -> bool {
        self.tag == K::NAME
    }
}

impl fmt::Debug for RawObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:p})", self.tag, self.address)
    }
}
