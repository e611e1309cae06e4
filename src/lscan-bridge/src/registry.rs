//! Load-time resolution of the host contract
//!
//! The bridge needs four rectangle fields and three callables from the host.
//! They are named by role in a [`DescriptorTable`] and resolved exactly once;
//! the resulting [`HandleRegistry`] is immutable for the rest of the process.

use crate::error::{HostError, MemberKind, ResolutionError, ResolutionFailure};
use crate::host::{Handles, HostRuntime};
use tracing::{debug, error, info};

pub const RECT_TYPE: &str = "android/graphics/Rect";
pub const LIST_TYPE: &str = "java/util/ArrayList";

/// Rectangle field roles as seen by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRole {
    Top,
    Left,
    Width,
    Height,
}

impl FieldRole {
    /// Resolution and write order
    pub const ALL: [FieldRole; 4] = [
        FieldRole::Top,
        FieldRole::Left,
        FieldRole::Width,
        FieldRole::Height,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldRole::Top => "top",
            FieldRole::Left => "left",
            FieldRole::Width => "width",
            FieldRole::Height => "height",
        }
    }
}

/// Callables the bridge invokes while assembling results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodRole {
    RectConstructor,
    ListConstructor,
    ListAdd,
}

impl MethodRole {
    pub const ALL: [MethodRole; 3] = [
        MethodRole::RectConstructor,
        MethodRole::ListConstructor,
        MethodRole::ListAdd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MethodRole::RectConstructor => "rect constructor",
            MethodRole::ListConstructor => "list constructor",
            MethodRole::ListAdd => "list add",
        }
    }
}

/// Where a role lives in the host: owning type, member name and JNI signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberDescriptor {
    pub owner: &'static str,
    pub member: &'static str,
    pub signature: &'static str,
}

impl MemberDescriptor {
    pub const fn new(owner: &'static str, member: &'static str, signature: &'static str) -> Self {
        Self {
            owner,
            member,
            signature,
        }
    }
}

/// The complete set of members the bridge depends on, one per role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorTable {
    top: MemberDescriptor,
    left: MemberDescriptor,
    width: MemberDescriptor,
    height: MemberDescriptor,
    rect_ctor: MemberDescriptor,
    list_ctor: MemberDescriptor,
    list_add: MemberDescriptor,
}

impl DescriptorTable {
    /// The table the Android binding has always used.
    ///
    /// Note the width and height roles are bound to the `right` and `bottom`
    /// fields: the host consumer reads extents out of those fields.
    pub const fn legacy() -> Self {
        Self {
            top: MemberDescriptor::new(RECT_TYPE, "top", "I"),
            left: MemberDescriptor::new(RECT_TYPE, "left", "I"),
            width: MemberDescriptor::new(RECT_TYPE, "right", "I"),
            height: MemberDescriptor::new(RECT_TYPE, "bottom", "I"),
            rect_ctor: MemberDescriptor::new(RECT_TYPE, "<init>", "()V"),
            list_ctor: MemberDescriptor::new(LIST_TYPE, "<init>", "()V"),
            list_add: MemberDescriptor::new(LIST_TYPE, "add", "(Ljava/lang/Object;)Z"),
        }
    }

    pub fn field(&self, role: FieldRole) -> &MemberDescriptor {
        match role {
            FieldRole::Top => &self.top,
            FieldRole::Left => &self.left,
            FieldRole::Width => &self.width,
            FieldRole::Height => &self.height,
        }
    }

    pub fn method(&self, role: MethodRole) -> &MemberDescriptor {
        match role {
            MethodRole::RectConstructor => &self.rect_ctor,
            MethodRole::ListConstructor => &self.list_ctor,
            MethodRole::ListAdd => &self.list_add,
        }
    }

    pub fn with_field(mut self, role: FieldRole, descriptor: MemberDescriptor) -> Self {
        match role {
            FieldRole::Top => self.top = descriptor,
            FieldRole::Left => self.left = descriptor,
            FieldRole::Width => self.width = descriptor,
            FieldRole::Height => self.height = descriptor,
        }
        self
    }

    pub fn with_method(mut self, role: MethodRole, descriptor: MemberDescriptor) -> Self {
        match role {
            MethodRole::RectConstructor => self.rect_ctor = descriptor,
            MethodRole::ListConstructor => self.list_ctor = descriptor,
            MethodRole::ListAdd => self.list_add = descriptor,
        }
        self
    }

    /// Distinct owning types, in first-mention order
    pub fn owners(&self) -> Vec<&'static str> {
        let mut owners: Vec<&'static str> = Vec::new();
        let all = FieldRole::ALL
            .iter()
            .map(|r| self.field(*r))
            .chain(MethodRole::ALL.iter().map(|r| self.method(*r)));
        for d in all {
            if !owners.contains(&d.owner) {
                owners.push(d.owner);
            }
        }
        owners
    }
}

impl Default for DescriptorTable {
    fn default() -> Self {
        Self::legacy()
    }
}

/// Resolved handles, immutable after load
pub struct HandleRegistry<K: Handles> {
    top: K::Field,
    left: K::Field,
    width: K::Field,
    height: K::Field,
    rect_ctor: K::Method,
    list_ctor: K::Method,
    list_add: K::Method,
    rect_type: K::Type,
    list_type: K::Type,
}

impl<K: Handles> HandleRegistry<K> {
    /// Resolve every entry of `table` against the host.
    ///
    /// Members of a missing type are not looked up. All failures are reported
    /// together; no registry exists unless every role resolved.
    pub fn resolve<H>(host: &mut H, table: &DescriptorTable) -> Result<Self, ResolutionError>
    where
        H: HostRuntime<Handles = K>,
    {
        let mut failures = Vec::new();
        let mut types: Vec<(&'static str, K::Type)> = Vec::new();

        for owner in table.owners() {
            match host.find_type(owner) {
                Ok(ty) => types.push((owner, ty)),
                Err(e) => {
                    error!("can't find {}: {}", owner, e);
                    failures.push(ResolutionFailure::TypeNotFound {
                        owner: owner.to_string(),
                    });
                }
            }
        }

        let lookup = |owner: &str| types.iter().find(|(o, _)| *o == owner).map(|(_, t)| t);

        let mut field = |role: FieldRole| -> Option<K::Field> {
            let d = table.field(role);
            let ty = lookup(d.owner)?;
            record(
                host.field_id(ty, d.member, d.signature),
                MemberKind::Field,
                d,
                &mut failures,
            )
        };
        let top = field(FieldRole::Top);
        let left = field(FieldRole::Left);
        let width = field(FieldRole::Width);
        let height = field(FieldRole::Height);

        let mut method = |role: MethodRole| -> Option<K::Method> {
            let d = table.method(role);
            let ty = lookup(d.owner)?;
            record(
                host.method_id(ty, d.member, d.signature),
                MemberKind::Method,
                d,
                &mut failures,
            )
        };
        let rect_ctor = method(MethodRole::RectConstructor);
        let list_ctor = method(MethodRole::ListConstructor);
        let list_add = method(MethodRole::ListAdd);

        let rect_type = lookup(table.method(MethodRole::RectConstructor).owner).cloned();
        let list_type = lookup(table.method(MethodRole::ListConstructor).owner).cloned();

        match (
            top, left, width, height, rect_ctor, list_ctor, list_add, rect_type, list_type,
        ) {
            (
                Some(top),
                Some(left),
                Some(width),
                Some(height),
                Some(rect_ctor),
                Some(list_ctor),
                Some(list_add),
                Some(rect_type),
                Some(list_type),
            ) if failures.is_empty() => {
                info!("resolved {} host handles", FieldRole::ALL.len() + MethodRole::ALL.len());
                Ok(Self {
                    top,
                    left,
                    width,
                    height,
                    rect_ctor,
                    list_ctor,
                    list_add,
                    rect_type,
                    list_type,
                })
            }
            _ => Err(ResolutionError { failures }),
        }
    }

    pub fn field(&self, role: FieldRole) -> K::Field {
        match role {
            FieldRole::Top => self.top,
            FieldRole::Left => self.left,
            FieldRole::Width => self.width,
            FieldRole::Height => self.height,
        }
    }

    pub fn method(&self, role: MethodRole) -> K::Method {
        match role {
            MethodRole::RectConstructor => self.rect_ctor,
            MethodRole::ListConstructor => self.list_ctor,
            MethodRole::ListAdd => self.list_add,
        }
    }

    pub fn rect_type(&self) -> &K::Type {
        &self.rect_type
    }

    pub fn list_type(&self) -> &K::Type {
        &self.list_type
    }
}

fn record<T>(
    result: Result<T, HostError>,
    kind: MemberKind,
    d: &MemberDescriptor,
    failures: &mut Vec<ResolutionFailure>,
) -> Option<T> {
    match result {
        Ok(id) => {
            debug!("resolved {} {}.{} {}", kind.as_str(), d.owner, d.member, d.signature);
            Some(id)
        }
        Err(e) => {
            error!("can't find {}.{}: {}", d.owner, d.member, e);
            failures.push(ResolutionFailure::MemberNotFound {
                kind,
                owner: d.owner.to_string(),
                member: d.member.to_string(),
                signature: d.signature.to_string(),
            });
            None
        }
    }
}
