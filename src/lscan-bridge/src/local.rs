//! In-memory host object model
//!
//! Mirrors the part of the Android object model the bridge touches:
//! `android/graphics/Rect` and `java/util/ArrayList`. Objects live on a heap
//! that is never collected and are reached through local references, which
//! must be released the way JNI local references are. Every call can be made
//! to fail on demand, and reference traffic is counted, so tests can check
//! that the bridge releases exactly what it creates.

use crate::codec::HostRect;
use crate::error::HostError;
use crate::host::{Handles, HostRuntime};
use crate::registry::{LIST_TYPE, RECT_TYPE};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Host calls that can be counted and failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOp {
    NewObject,
    GetInt,
    SetInt,
    Add,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalType(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalField {
    class: usize,
    slot: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalMethod {
    class: usize,
    index: usize,
}

/// A local reference; deliberately not `Clone`
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct LocalObject(u64);

pub struct LocalHandles;

impl Handles for LocalHandles {
    type Type = LocalType;
    type Field = LocalField;
    type Method = LocalMethod;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassKind {
    Rect,
    List,
}

#[derive(Debug, Clone)]
struct ClassDef {
    name: String,
    kind: ClassKind,
    fields: Vec<(String, String)>,
    methods: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
enum HeapValue {
    Rect { class: usize, values: Vec<i32> },
    List(Vec<usize>),
}

/// A host object graph rendered as plain data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HostValue {
    Rect(HostRect),
    List(Vec<HostValue>),
}

impl HostValue {
    pub fn as_list(&self) -> Option<&[HostValue]> {
        match self {
            HostValue::List(items) => Some(items),
            HostValue::Rect(_) => None,
        }
    }
}

/// Reference traffic generated through [`HostRuntime::new_object`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefStats {
    pub created: usize,
    /// Release calls issued for created objects, successful or not
    pub released: usize,
    /// Created objects whose reference is still held
    pub live: usize,
    /// Releases of references that were never handed out or already released
    pub invalid_releases: usize,
}

#[derive(Debug, Clone, Default)]
pub struct LocalHost {
    classes: Vec<ClassDef>,
    heap: Vec<HeapValue>,
    refs: HashMap<u64, usize>,
    owned: HashSet<u64>,
    next_ref: u64,
    calls: HashMap<HostOp, usize>,
    failures: Vec<(HostOp, usize)>,
    stats: RefStats,
}

impl LocalHost {
    /// A host exposing `android/graphics/Rect` and `java/util/ArrayList`
    pub fn android() -> Self {
        let rect = ClassDef {
            name: RECT_TYPE.to_string(),
            kind: ClassKind::Rect,
            fields: ["top", "left", "right", "bottom"]
                .iter()
                .map(|f| (f.to_string(), "I".to_string()))
                .collect(),
            methods: vec![("<init>".into(), "()V".into())],
        };
        let list = ClassDef {
            name: LIST_TYPE.to_string(),
            kind: ClassKind::List,
            fields: Vec::new(),
            methods: vec![
                ("<init>".into(), "()V".into()),
                ("add".into(), "(Ljava/lang/Object;)Z".into()),
            ],
        };

        Self {
            classes: vec![rect, list],
            ..Self::default()
        }
    }

    pub fn without_type(mut self, name: &str) -> Self {
        self.classes.retain(|c| c.name != name);
        self
    }

    pub fn without_member(mut self, owner: &str, member: &str) -> Self {
        if let Some(class) = self.classes.iter_mut().find(|c| c.name == owner) {
            class.fields.retain(|(n, _)| n != member);
            class.methods.retain(|(n, _)| n != member);
        }
        self
    }

    /// Make the `nth` (zero-based) call of `op` fail once
    pub fn fail_on(&mut self, op: HostOp, nth: usize) {
        self.failures.push((op, nth));
    }

    pub fn calls(&self, op: HostOp) -> usize {
        self.calls.get(&op).copied().unwrap_or(0)
    }

    pub fn stats(&self) -> RefStats {
        RefStats {
            live: self.owned.len(),
            ..self.stats
        }
    }

    /// Allocate a rectangle the way the host application would, outside any
    /// bridge call. It does not count towards [`RefStats`].
    pub fn new_region(&mut self, raw: HostRect) -> LocalObject {
        let class = self
            .classes
            .iter()
            .position(|c| c.kind == ClassKind::Rect)
            .unwrap_or(0);
        let values = self.rect_values(class, raw);
        self.alloc(HeapValue::Rect { class, values })
    }

    /// A reference that was never handed out
    pub fn stale_reference(&self) -> LocalObject {
        LocalObject(u64::MAX)
    }

    pub fn rect(&self, obj: &LocalObject) -> Option<HostRect> {
        match self.snapshot(obj)? {
            HostValue::Rect(raw) => Some(raw),
            HostValue::List(_) => None,
        }
    }

    /// Render the object graph reachable from `obj`
    pub fn snapshot(&self, obj: &LocalObject) -> Option<HostValue> {
        let idx = *self.refs.get(&obj.0)?;
        Some(self.render(idx))
    }

    fn render(&self, idx: usize) -> HostValue {
        match &self.heap[idx] {
            HeapValue::Rect { class, values } => {
                let def = &self.classes[*class];
                let get = |name: &str| {
                    def.fields
                        .iter()
                        .position(|(n, _)| n == name)
                        .and_then(|slot| values.get(slot).copied())
                        .unwrap_or(0)
                };
                HostValue::Rect(HostRect {
                    top: get("top"),
                    left: get("left"),
                    right: get("right"),
                    bottom: get("bottom"),
                })
            }
            HeapValue::List(items) => {
                HostValue::List(items.iter().map(|i| self.render(*i)).collect())
            }
        }
    }

    fn rect_values(&self, class: usize, raw: HostRect) -> Vec<i32> {
        self.classes
            .get(class)
            .map(|def| {
                def.fields
                    .iter()
                    .map(|(name, _)| match name.as_str() {
                        "top" => raw.top,
                        "left" => raw.left,
                        "right" => raw.right,
                        "bottom" => raw.bottom,
                        _ => 0,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn alloc(&mut self, value: HeapValue) -> LocalObject {
        self.heap.push(value);
        let id = self.next_ref;
        self.next_ref += 1;
        self.refs.insert(id, self.heap.len() - 1);
        LocalObject(id)
    }

    fn tick(&mut self, op: HostOp) -> Result<(), HostError> {
        let count = self.calls.entry(op).or_insert(0);
        let nth = *count;
        *count += 1;

        if let Some(pos) = self.failures.iter().position(|f| *f == (op, nth)) {
            self.failures.remove(pos);
            return Err(HostError::Exception(format!("injected {:?} failure", op)));
        }
        Ok(())
    }

    fn deref(&self, obj: &LocalObject) -> Result<usize, HostError> {
        self.refs.get(&obj.0).copied().ok_or(HostError::InvalidObject)
    }

    fn class(&self, ty: LocalType) -> Result<&ClassDef, HostError> {
        self.classes.get(ty.0).ok_or(HostError::InvalidObject)
    }

    fn method_name(&self, method: LocalMethod) -> Option<&str> {
        self.classes
            .get(method.class)?
            .methods
            .get(method.index)
            .map(|(n, _)| n.as_str())
    }
}

impl HostRuntime for LocalHost {
    type Handles = LocalHandles;
    type Object = LocalObject;

    fn find_type(&mut self, name: &str) -> Result<LocalType, HostError> {
        self.classes
            .iter()
            .position(|c| c.name == name)
            .map(LocalType)
            .ok_or_else(|| HostError::TypeNotFound(name.to_string()))
    }

    fn field_id(
        &mut self,
        ty: &LocalType,
        name: &str,
        signature: &str,
    ) -> Result<LocalField, HostError> {
        let class = self.class(*ty)?;
        class
            .fields
            .iter()
            .position(|(n, s)| n == name && s == signature)
            .map(|slot| LocalField { class: ty.0, slot })
            .ok_or_else(|| HostError::MemberNotFound {
                owner: class.name.clone(),
                member: name.to_string(),
                signature: signature.to_string(),
            })
    }

    fn method_id(
        &mut self,
        ty: &LocalType,
        name: &str,
        signature: &str,
    ) -> Result<LocalMethod, HostError> {
        let class = self.class(*ty)?;
        class
            .methods
            .iter()
            .position(|(n, s)| n == name && s == signature)
            .map(|index| LocalMethod { class: ty.0, index })
            .ok_or_else(|| HostError::MemberNotFound {
                owner: class.name.clone(),
                member: name.to_string(),
                signature: signature.to_string(),
            })
    }

    fn new_object(&mut self, ty: &LocalType, ctor: LocalMethod) -> Result<LocalObject, HostError> {
        self.tick(HostOp::NewObject)?;
        if ctor.class != ty.0 || self.method_name(ctor) != Some("<init>") {
            return Err(HostError::Exception("constructor does not belong to type".into()));
        }

        let value = match self.class(*ty)?.kind {
            ClassKind::Rect => HeapValue::Rect {
                class: ty.0,
                values: self.rect_values(ty.0, HostRect::default()),
            },
            ClassKind::List => HeapValue::List(Vec::new()),
        };
        let obj = self.alloc(value);
        self.owned.insert(obj.0);
        self.stats.created += 1;
        Ok(obj)
    }

    fn get_int(&mut self, obj: &LocalObject, field: LocalField) -> Result<i32, HostError> {
        self.tick(HostOp::GetInt)?;
        let idx = self.deref(obj)?;
        match &self.heap[idx] {
            HeapValue::Rect { class, values } if *class == field.class => values
                .get(field.slot)
                .copied()
                .ok_or(HostError::InvalidObject),
            _ => Err(HostError::Exception("field does not belong to object".into())),
        }
    }

    fn set_int(
        &mut self,
        obj: &LocalObject,
        field: LocalField,
        value: i32,
    ) -> Result<(), HostError> {
        self.tick(HostOp::SetInt)?;
        let idx = self.deref(obj)?;
        match &mut self.heap[idx] {
            HeapValue::Rect { class, values } if *class == field.class => {
                let slot = values.get_mut(field.slot).ok_or(HostError::InvalidObject)?;
                *slot = value;
                Ok(())
            }
            _ => Err(HostError::Exception("field does not belong to object".into())),
        }
    }

    fn call_add(
        &mut self,
        list: &LocalObject,
        method: LocalMethod,
        item: &LocalObject,
    ) -> Result<bool, HostError> {
        self.tick(HostOp::Add)?;
        if self.method_name(method) != Some("add") {
            return Err(HostError::Exception("not a list add method".into()));
        }
        let item = self.deref(item)?;
        let idx = self.deref(list)?;
        match &mut self.heap[idx] {
            HeapValue::List(items) => {
                items.push(item);
                Ok(true)
            }
            HeapValue::Rect { .. } => Err(HostError::Exception("receiver is not a list".into())),
        }
    }

    fn release(&mut self, obj: LocalObject) -> Result<(), HostError> {
        if self.owned.remove(&obj.0) {
            self.stats.released += 1;
        } else if !self.refs.contains_key(&obj.0) {
            self.stats.invalid_releases += 1;
        }
        self.tick(HostOp::Release)?;
        self.refs.remove(&obj.0).map(|_| ()).ok_or(HostError::InvalidObject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_keeps_items_after_release() {
        let mut host = LocalHost::android();
        let list_ty = host.find_type(LIST_TYPE).unwrap();
        let rect_ty = host.find_type(RECT_TYPE).unwrap();
        let list_ctor = host.method_id(&list_ty, "<init>", "()V").unwrap();
        let rect_ctor = host.method_id(&rect_ty, "<init>", "()V").unwrap();
        let add = host.method_id(&list_ty, "add", "(Ljava/lang/Object;)Z").unwrap();
        let top = host.field_id(&rect_ty, "top", "I").unwrap();

        let list = host.new_object(&list_ty, list_ctor).unwrap();
        let rect = host.new_object(&rect_ty, rect_ctor).unwrap();
        host.set_int(&rect, top, 9).unwrap();
        assert!(host.call_add(&list, add, &rect).unwrap());
        host.release(rect).unwrap();

        assert_eq!(
            host.snapshot(&list),
            Some(HostValue::List(vec![HostValue::Rect(HostRect {
                top: 9,
                ..HostRect::default()
            })]))
        );
        assert_eq!(host.stats().live, 1);
        assert_eq!(host.stats().released, 1);
    }

    #[test]
    fn test_double_release_is_detected() {
        let mut host = LocalHost::android();
        let obj = host.new_region(HostRect::default());
        host.release(obj).unwrap();

        assert_eq!(host.release(host.stale_reference()), Err(HostError::InvalidObject));
        assert_eq!(host.stats().invalid_releases, 1);
    }

    #[test]
    fn test_injected_failure_fires_once() {
        let mut host = LocalHost::android();
        let ty = host.find_type(RECT_TYPE).unwrap();
        let ctor = host.method_id(&ty, "<init>", "()V").unwrap();
        host.fail_on(HostOp::NewObject, 0);

        assert!(host.new_object(&ty, ctor).is_err());
        assert!(host.new_object(&ty, ctor).is_ok());
        assert_eq!(host.stats().created, 1);
    }
}
