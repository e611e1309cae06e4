//! [`HostRuntime`] over a live JNI environment

use jni::errors::Error as JniError;
use jni::objects::{GlobalRef, JClass, JFieldID, JMethodID, JObject, JValue};
use jni::signature::{Primitive, ReturnType};
use jni::JNIEnv;
use lscan_bridge::{Handles, HostError, HostRuntime};
use tracing::debug;

/// Types are pinned with global references so they outlive the load call
pub struct JniHandles;

impl Handles for JniHandles {
    type Type = GlobalRef;
    type Field = JFieldID;
    type Method = JMethodID;
}

pub struct JniHost<'a, 'local> {
    env: &'a mut JNIEnv<'local>,
}

impl<'a, 'local> JniHost<'a, 'local> {
    pub fn new(env: &'a mut JNIEnv<'local>) -> Self {
        Self { env }
    }

    /// Map a JNI result, clearing any pending Java exception so that the
    /// following JNI calls of this native frame stay legal.
    fn check<T>(&mut self, result: jni::errors::Result<T>) -> Result<T, HostError> {
        let pending = self.env.exception_check().unwrap_or(false);
        if pending {
            let _ = self.env.exception_describe();
            let _ = self.env.exception_clear();
        }

        match result {
            Ok(_) if pending => Err(HostError::Exception("JNI error".into())),
            Ok(value) => Ok(value),
            Err(JniError::JavaException) => {
                Err(HostError::Exception("JNI error: java exception".into()))
            }
            Err(e) => Err(HostError::Exception(e.to_string())),
        }
    }
}

impl<'a, 'local> HostRuntime for JniHost<'a, 'local> {
    type Handles = JniHandles;
    type Object = JObject<'local>;

    fn find_type(&mut self, name: &str) -> Result<GlobalRef, HostError> {
        let found = self.env.find_class(name);
        let class = self
            .check(found)
            .map_err(|_| HostError::TypeNotFound(name.to_string()))?;

        let global = self.env.new_global_ref(&class);
        let _ = self.env.delete_local_ref(class);
        self.check(global)
    }

    fn field_id(
        &mut self,
        ty: &GlobalRef,
        name: &str,
        signature: &str,
    ) -> Result<JFieldID, HostError> {
        let class = <&JClass>::from(ty.as_obj());
        let id = self.env.get_field_id(class, name, signature);
        self.check(id).map_err(|e| {
            debug!("GetFieldID {} {}: {}", name, signature, e);
            lookup_error("field", name, signature, &e)
        })
    }

    fn method_id(
        &mut self,
        ty: &GlobalRef,
        name: &str,
        signature: &str,
    ) -> Result<JMethodID, HostError> {
        let class = <&JClass>::from(ty.as_obj());
        let id = self.env.get_method_id(class, name, signature);
        self.check(id).map_err(|e| {
            debug!("GetMethodID {} {}: {}", name, signature, e);
            lookup_error("method", name, signature, &e)
        })
    }

    fn new_object(
        &mut self,
        ty: &GlobalRef,
        ctor: JMethodID,
    ) -> Result<JObject<'local>, HostError> {
        let class = <&JClass>::from(ty.as_obj());
        // SAFETY: `ctor` was resolved as the `()V` constructor of `ty`
        let obj = unsafe { self.env.new_object_unchecked(class, ctor, &[]) };
        self.check(obj)
    }

    fn get_int(&mut self, obj: &JObject<'local>, field: JFieldID) -> Result<i32, HostError> {
        let value = self
            .env
            .get_field_unchecked(obj, field, ReturnType::Primitive(Primitive::Int));
        self.check(value.and_then(|v| v.i()))
    }

    fn set_int(
        &mut self,
        obj: &JObject<'local>,
        field: JFieldID,
        value: i32,
    ) -> Result<(), HostError> {
        let result = self.env.set_field_unchecked(obj, field, JValue::Int(value));
        self.check(result)
    }

    fn call_add(
        &mut self,
        list: &JObject<'local>,
        method: JMethodID,
        item: &JObject<'local>,
    ) -> Result<bool, HostError> {
        // SAFETY: `method` is `add(Ljava/lang/Object;)Z` and `item` is an object reference
        let added = unsafe {
            self.env.call_method_unchecked(
                list,
                method,
                ReturnType::Primitive(Primitive::Boolean),
                &[JValue::Object(item).as_jni()],
            )
        };
        self.check(added.and_then(|v| v.z()))
    }

    fn release(&mut self, obj: JObject<'local>) -> Result<(), HostError> {
        let result = self.env.delete_local_ref(obj);
        self.check(result)
    }
}

/// Lookups only see the type handle, so the error names the member alone
fn lookup_error(kind: &str, name: &str, signature: &str, cause: &HostError) -> HostError {
    HostError::Exception(format!("no {} {} {} ({})", kind, name, signature, cause))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_error_names_member_and_signature() {
        let cause = HostError::Exception("java exception".into());
        let err = lookup_error("field", "right", "I", &cause);
        assert_eq!(
            err.to_string(),
            "host exception: no field right I (host exception: java exception)"
        );
    }
}
