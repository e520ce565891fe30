//! Event categories and their wire ids.
//!
//! Category ids cross the native boundary as plain integers, so they are kept in
//! an append-only table instead of being derived from enum positions. A row is
//! never renumbered or removed; new categories are appended and
//! [`CATEGORY_TABLE_VERSION`] is bumped.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire id of an event category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub u32);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for CategoryId {
    fn from(id: u32) -> Self {
        CategoryId(id)
    }
}

/// Semantic class of an input event. Each category is enabled independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    Hover,
    Click,
    Move,
    ThumbStick,
    Trigger,
    ControllerStatus,
    CameraTransform,
}

/// Bumped whenever a row is appended to [`CATEGORY_TABLE`].
pub const CATEGORY_TABLE_VERSION: u32 = 2;

/// Append-only category table. Version 1 ended at `ControllerStatus`.
pub const CATEGORY_TABLE: &[(EventCategory, CategoryId)] = &[
    (EventCategory::Hover, CategoryId(1)),
    (EventCategory::Click, CategoryId(2)),
    (EventCategory::Move, CategoryId(3)),
    (EventCategory::ThumbStick, CategoryId(4)),
    (EventCategory::Trigger, CategoryId(5)),
    (EventCategory::ControllerStatus, CategoryId(6)),
    // version 2
    (EventCategory::CameraTransform, CategoryId(7)),
];

impl EventCategory {
    pub const fn id(self) -> CategoryId {
        match self {
            EventCategory::Hover => CategoryId(1),
            EventCategory::Click => CategoryId(2),
            EventCategory::Move => CategoryId(3),
            EventCategory::ThumbStick => CategoryId(4),
            EventCategory::Trigger => CategoryId(5),
            EventCategory::ControllerStatus => CategoryId(6),
            EventCategory::CameraTransform => CategoryId(7),
        }
    }

    /// Looks up a category by wire id. Unknown ids yield `None`.
    pub fn from_id(id: CategoryId) -> Option<Self> {
        CATEGORY_TABLE
            .iter()
            .find(|(_, row_id)| *row_id == id)
            .map(|(category, _)| *category)
    }

    /// All known categories in table order.
    pub fn all() -> impl Iterator<Item = EventCategory> {
        CATEGORY_TABLE.iter().map(|(category, _)| *category)
    }
}

impl From<EventCategory> for CategoryId {
    fn from(category: EventCategory) -> Self {
        category.id()
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.id())
    }
}

/// Enabled/disabled state for every category. Everything starts disabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryMask {
    bits: u64,
}

impl CategoryMask {
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    pub fn set(&mut self, category: EventCategory, enabled: bool) {
        let bit = 1u64 << category.id().0;
        if enabled {
            self.bits |= bit;
        } else {
            self.bits &= !bit;
        }
    }

    pub fn is_enabled(&self, category: EventCategory) -> bool {
        self.bits & (1u64 << category.id().0) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn enabled(&self) -> impl Iterator<Item = EventCategory> + '_ {
        EventCategory::all().filter(move |category| self.is_enabled(*category))
    }
}
