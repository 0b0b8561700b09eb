//! # Handler stack inspection.
//!
//! Turns a [`HandlerStackReader`](crate::host::HandlerStackReader) snapshot into
//! a verdict about one recorded instance:
//!
//! ```text
//! top ─► [Unknown]          skipped
//!        [other.kind i7]    skipped (managed kinds never count as foreign)
//!        [own.kind  i2]     skipped (superseded, unwound on its next event)
//!        [UI]               foreign ─┐
//!        [own.kind  i4]     recorded │ ─► Buried { anchor of i4 }
//!        ...                         │
//! ```
//!
//! The walk stops at the recorded instance. A foreign handler seen before it
//! means the instance no longer gets events first.

use crate::host::{Anchor, HandlerEntry, HandlerTag, InstanceId};
use crate::tasks::TaskId;

/// What the snapshot says about a recorded instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StackVerdict {
    /// No foreign handler above the instance. `top` is set when the instance
    /// is the topmost entry.
    Anchored { anchor: Anchor, top: bool },
    /// A foreign handler sits above the instance (or above where it should be).
    Buried {
        anchor: Option<Anchor>,
        by: HandlerTag,
    },
    /// The instance appears more than once.
    Desync,
    /// The instance is not on the stack and nothing foreign is either.
    Missing,
}

/// Classifies `instance` of kind `own` within `snapshot` (topmost first).
pub(crate) fn inspect(
    snapshot: &[HandlerEntry],
    own: &TaskId,
    instance: InstanceId,
    is_managed: impl Fn(&TaskId) -> bool,
) -> StackVerdict {
    let copies = snapshot
        .iter()
        .filter(|e| e.instance == Some(instance))
        .count();
    if copies > 1 {
        return StackVerdict::Desync;
    }

    let mut foreign: Option<&HandlerTag> = None;
    for (pos, entry) in snapshot.iter().enumerate() {
        match &entry.tag {
            HandlerTag::Unknown => continue,
            HandlerTag::Task(id) if id == own => {
                if entry.instance != Some(instance) {
                    continue;
                }
                return match foreign {
                    Some(by) => StackVerdict::Buried {
                        anchor: Some(entry.anchor),
                        by: by.clone(),
                    },
                    None => StackVerdict::Anchored {
                        anchor: entry.anchor,
                        top: pos == 0,
                    },
                };
            }
            HandlerTag::Task(id) if is_managed(id) => continue,
            tag => {
                if foreign.is_none() {
                    foreign = Some(tag);
                }
            }
        }
    }

    match foreign {
        Some(by) => StackVerdict::Buried {
            anchor: None,
            by: by.clone(),
        },
        None => StackVerdict::Missing,
    }
}
