//! The slice of the host object model the bridge relies on
//!
//! A host runtime hands out two kinds of references: process-lifetime handles
//! (types, field and method ids) that are resolved once at load time, and
//! call-local object references that must be released before the native call
//! returns. The two are split so the handle table can live in process-wide
//! state while object references stay tied to the call that produced them.

use crate::error::HostError;

/// Process-lifetime handle types of a host runtime
pub trait Handles {
    /// A host type, retained for the process lifetime
    type Type: Clone;
    /// Id of an instance field
    type Field: Copy;
    /// Id of an instance method or constructor
    type Method: Copy;
}

/// Operations on the host's object model used during resolution and marshalling
pub trait HostRuntime {
    type Handles: Handles;
    /// Call-local reference to a host object
    type Object;

    fn find_type(&mut self, name: &str) -> Result<<Self::Handles as Handles>::Type, HostError>;

    fn field_id(
        &mut self,
        ty: &<Self::Handles as Handles>::Type,
        name: &str,
        signature: &str,
    ) -> Result<<Self::Handles as Handles>::Field, HostError>;

    fn method_id(
        &mut self,
        ty: &<Self::Handles as Handles>::Type,
        name: &str,
        signature: &str,
    ) -> Result<<Self::Handles as Handles>::Method, HostError>;

    /// Construct an instance of `ty` with a no-argument constructor
    fn new_object(
        &mut self,
        ty: &<Self::Handles as Handles>::Type,
        ctor: <Self::Handles as Handles>::Method,
    ) -> Result<Self::Object, HostError>;

    fn get_int(
        &mut self,
        obj: &Self::Object,
        field: <Self::Handles as Handles>::Field,
    ) -> Result<i32, HostError>;

    fn set_int(
        &mut self,
        obj: &Self::Object,
        field: <Self::Handles as Handles>::Field,
        value: i32,
    ) -> Result<(), HostError>;

    /// Invoke a one-argument boolean method such as `List.add`
    fn call_add(
        &mut self,
        list: &Self::Object,
        method: <Self::Handles as Handles>::Method,
        item: &Self::Object,
    ) -> Result<bool, HostError>;

    /// Drop the call-local reference; the object itself stays alive if reachable
    fn release(&mut self, obj: Self::Object) -> Result<(), HostError>;
}
