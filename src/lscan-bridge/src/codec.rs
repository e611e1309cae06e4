//! Conversion between host rectangles and engine rectangles

use crate::engine::Rect;
use crate::error::{ConversionError, Result};
use crate::host::HostRuntime;
use crate::registry::{FieldRole, HandleRegistry};
use serde::{Deserialize, Serialize};

/// The four raw integer fields of a host rectangle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRect {
    pub top: i32,
    pub left: i32,
    pub right: i32,
    pub bottom: i32,
}

/// How engine extents are stored in the host rectangle's fields.
///
/// `Legacy` stores width in `right` and height in `bottom`; the deployed host
/// consumer reads them that way. `Edges` stores real edge coordinates and is a
/// breaking change for that consumer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RectLayout {
    #[default]
    Legacy,
    Edges,
}

impl RectLayout {
    pub fn to_engine(&self, raw: HostRect) -> Rect {
        match self {
            RectLayout::Legacy => Rect::new(raw.left, raw.top, raw.right, raw.bottom),
            RectLayout::Edges => Rect::new(
                raw.left,
                raw.top,
                raw.right.saturating_sub(raw.left).max(0),
                raw.bottom.saturating_sub(raw.top).max(0),
            ),
        }
    }

    pub fn to_host(&self, rect: Rect) -> HostRect {
        match self {
            RectLayout::Legacy => HostRect {
                top: rect.y,
                left: rect.x,
                right: rect.width,
                bottom: rect.height,
            },
            RectLayout::Edges => HostRect {
                top: rect.y,
                left: rect.x,
                right: rect.x.saturating_add(rect.width),
                bottom: rect.y.saturating_add(rect.height),
            },
        }
    }
}

/// Read a host rectangle into an engine rectangle
pub fn to_engine<H: HostRuntime>(
    host: &mut H,
    registry: &HandleRegistry<H::Handles>,
    layout: RectLayout,
    obj: &H::Object,
) -> Result<Rect> {
    let mut read = |role: FieldRole| {
        host.get_int(obj, registry.field(role))
            .map_err(|source| ConversionError::Read {
                field: role.as_str(),
                source,
            })
    };

    let raw = HostRect {
        left: read(FieldRole::Left)?,
        top: read(FieldRole::Top)?,
        right: read(FieldRole::Width)?,
        bottom: read(FieldRole::Height)?,
    };
    Ok(layout.to_engine(raw))
}

/// Write `rect` into an existing host rectangle.
///
/// Fields are written top, left, width, height; the first failed write aborts.
pub fn to_host<H: HostRuntime>(
    host: &mut H,
    registry: &HandleRegistry<H::Handles>,
    layout: RectLayout,
    obj: &H::Object,
    rect: Rect,
) -> Result<()> {
    let raw = layout.to_host(rect);
    let writes = [
        (FieldRole::Top, raw.top),
        (FieldRole::Left, raw.left),
        (FieldRole::Width, raw.right),
        (FieldRole::Height, raw.bottom),
    ];

    for (role, value) in writes {
        host.set_int(obj, registry.field(role), value)
            .map_err(|source| ConversionError::Write {
                field: role.as_str(),
                source,
            })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HostError;
    use crate::local::{HostOp, LocalHost};
    use crate::registry::DescriptorTable;

    fn setup() -> (LocalHost, HandleRegistry<crate::local::LocalHandles>) {
        let mut host = LocalHost::android();
        let registry = HandleRegistry::resolve(&mut host, &DescriptorTable::legacy()).unwrap();
        (host, registry)
    }

    #[test]
    fn test_legacy_round_trip_keeps_raw_fields() {
        for (x, y, w, h) in [(0, 0, 0, 0), (12, 40, 300, 80), (5, 7, 1, 2000)] {
            let rect = Rect::new(x, y, w, h);
            let raw = RectLayout::Legacy.to_host(rect);
            assert_eq!(raw, HostRect { top: y, left: x, right: w, bottom: h });
            assert_eq!(RectLayout::Legacy.to_engine(raw), rect);
        }
    }

    #[test]
    fn test_edges_layout_is_geometric() {
        let rect = Rect::new(10, 20, 30, 40);
        let raw = RectLayout::Edges.to_host(rect);
        assert_eq!(raw, HostRect { top: 20, left: 10, right: 40, bottom: 60 });
        assert_eq!(RectLayout::Edges.to_engine(raw), rect);

        let inverted = HostRect { top: 50, left: 50, right: 10, bottom: 10 };
        assert_eq!(RectLayout::Edges.to_engine(inverted), Rect::new(50, 50, 0, 0));
    }

    #[test]
    fn test_host_round_trip() {
        let (mut host, registry) = setup();
        let obj = host.new_region(HostRect::default());
        let rect = Rect::new(3, 4, 120, 36);

        to_host(&mut host, &registry, RectLayout::Legacy, &obj, rect).unwrap();
        assert_eq!(
            host.rect(&obj),
            Some(HostRect { top: 4, left: 3, right: 120, bottom: 36 })
        );
        assert_eq!(to_engine(&mut host, &registry, RectLayout::Legacy, &obj).unwrap(), rect);
    }

    #[test]
    fn test_to_host_stops_at_first_failed_write() {
        let (mut host, registry) = setup();
        let obj = host.new_region(HostRect::default());
        host.fail_on(HostOp::SetInt, 1);

        let err = to_host(&mut host, &registry, RectLayout::Legacy, &obj, Rect::new(1, 2, 3, 4))
            .unwrap_err();
        assert!(matches!(err, ConversionError::Write { field: "left", .. }));
        // only `top` landed
        assert_eq!(host.rect(&obj), Some(HostRect { top: 2, left: 0, right: 0, bottom: 0 }));
        assert_eq!(host.calls(HostOp::SetInt), 2);
    }

    #[test]
    fn test_to_engine_surfaces_read_failure() {
        let (mut host, registry) = setup();
        let obj = host.new_region(HostRect::default());
        host.release(obj).unwrap();
        let stale = host.stale_reference();

        let err = to_engine(&mut host, &registry, RectLayout::Legacy, &stale).unwrap_err();
        assert_eq!(
            err,
            ConversionError::Read {
                field: "left",
                source: HostError::InvalidObject
            }
        );
    }
}
