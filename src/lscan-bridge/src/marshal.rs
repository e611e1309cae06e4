//! Materialise a [`ResultTree`] as nested host lists

use crate::codec::{self, RectLayout};
use crate::engine::Rect;
use crate::error::{ConversionError, Result};
use crate::host::HostRuntime;
use crate::registry::{HandleRegistry, MethodRole};
use crate::scope::{HandleScope, Scoped};
use crate::tree::ResultTree;

/// Build the root list inside `scope` and return its token.
///
/// Every intermediate object is released as soon as it has been appended to
/// its parent; on failure whatever was created stays owned by the scope.
pub fn marshal_tree<H: HostRuntime>(
    scope: &mut HandleScope<'_, H>,
    registry: &HandleRegistry<H::Handles>,
    layout: RectLayout,
    tree: &ResultTree,
) -> Result<Scoped> {
    let root = new_list(scope, registry)?;

    for group in tree.groups() {
        let list = new_list(scope, registry)?;
        for rect in group {
            let obj = new_rect(scope, registry, layout, *rect)?;
            append(scope, registry, list, obj)?;
            scope.release(obj);
        }
        append(scope, registry, root, list)?;
        scope.release(list);
    }

    Ok(root)
}

fn new_list<H: HostRuntime>(
    scope: &mut HandleScope<'_, H>,
    registry: &HandleRegistry<H::Handles>,
) -> Result<Scoped> {
    scope
        .new_object(registry.list_type(), registry.method(MethodRole::ListConstructor))
        .map_err(|source| ConversionError::Allocate {
            what: "list",
            source,
        })
}

fn new_rect<H: HostRuntime>(
    scope: &mut HandleScope<'_, H>,
    registry: &HandleRegistry<H::Handles>,
    layout: RectLayout,
    rect: Rect,
) -> Result<Scoped> {
    let obj = scope
        .new_object(registry.rect_type(), registry.method(MethodRole::RectConstructor))
        .map_err(|source| ConversionError::Allocate {
            what: "rectangle",
            source,
        })?;
    scope.with(obj, |host, o| codec::to_host(host, registry, layout, o, rect))??;
    Ok(obj)
}

fn append<H: HostRuntime>(
    scope: &mut HandleScope<'_, H>,
    registry: &HandleRegistry<H::Handles>,
    list: Scoped,
    item: Scoped,
) -> Result<()> {
    match scope.append(list, registry.method(MethodRole::ListAdd), item) {
        Ok(true) => Ok(()),
        Ok(false) => Err(ConversionError::AppendRejected),
        Err(e) => Err(ConversionError::Append(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::HostRect;
    use crate::engine::MatrixElement;
    use crate::local::{HostOp, HostValue, LocalHandles, LocalHost};
    use crate::registry::DescriptorTable;

    fn setup() -> (LocalHost, HandleRegistry<LocalHandles>) {
        let mut host = LocalHost::android();
        let registry = HandleRegistry::resolve(&mut host, &DescriptorTable::legacy()).unwrap();
        (host, registry)
    }

    fn raw(x: i32, y: i32, w: i32, h: i32) -> HostValue {
        HostValue::Rect(HostRect {
            top: y,
            left: x,
            right: w,
            bottom: h,
        })
    }

    #[test]
    fn test_marshal_nests_three_lists() {
        let (mut host, registry) = setup();
        let regions = [Rect::new(1, 2, 3, 4), Rect::new(5, 6, 7, 8)];
        let tree = ResultTree::build(
            Rect::new(0, 0, 100, 50),
            &[MatrixElement::new(1, 0)],
            &regions,
        )
        .unwrap();

        let root = {
            let mut scope = HandleScope::new(&mut host);
            let token = marshal_tree(&mut scope, &registry, RectLayout::Legacy, &tree).unwrap();
            assert_eq!(scope.live(), 1);
            let root = scope.escape(token).unwrap();
            root
        };

        assert_eq!(
            host.snapshot(&root),
            Some(HostValue::List(vec![
                HostValue::List(vec![raw(0, 0, 100, 50)]),
                HostValue::List(vec![raw(5, 6, 7, 8), raw(1, 2, 3, 4)]),
                HostValue::List(vec![raw(1, 2, 3, 4), raw(5, 6, 7, 8)]),
            ]))
        );

        let stats = host.stats();
        // root + 3 groups + 1 focus + 2 matched + 2 regions
        assert_eq!(stats.created, 9);
        assert_eq!(stats.released, 8);
        assert_eq!(stats.live, 1);
    }

    #[test]
    fn test_failure_mid_build_leaves_nothing_behind() {
        let tree = ResultTree::build(
            Rect::new(0, 0, 10, 10),
            &[MatrixElement::new(0, 0)],
            &[Rect::new(1, 1, 1, 1)],
        )
        .unwrap();

        for op in [HostOp::NewObject, HostOp::SetInt, HostOp::Add] {
            for nth in 0..6 {
                let (mut host, registry) = setup();
                host.fail_on(op, nth);

                {
                    let mut scope = HandleScope::new(&mut host);
                    let built = marshal_tree(&mut scope, &registry, RectLayout::Legacy, &tree);
                    assert!(built.is_err());
                }

                let stats = host.stats();
                assert_eq!(stats.released, stats.created, "{:?} #{}", op, nth);
                assert_eq!(stats.live, 0);
                assert_eq!(stats.invalid_releases, 0);
            }
        }
    }
}
