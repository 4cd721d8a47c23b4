//! Cursor over the weeks of a roster.

use chrono::NaiveDateTime;

use crate::device::{DeviceStorage, DeviceStorageError, load_cached_roster, save_cached_roster};
use crate::types::WeekSchedule;
use crate::week::ActiveWeekResolver;

/// Bounds-checked navigation over an ordered list of weekly rosters.
///
/// The cursor is either `None` (no week selected, e.g. no week covers
/// today) or a valid index into the list. The list itself is never mutated;
/// after a roster replacement call [`ScheduleNavigator::replace`], which
/// recomputes the cursor because old indices no longer mean anything.
#[derive(Debug, Clone)]
pub struct ScheduleNavigator {
    schedules: Vec<WeekSchedule>,
    cursor: Option<usize>,
    resolver: ActiveWeekResolver,
}

impl ScheduleNavigator {
    /// Create a navigator positioned on the week active at `now`.
    #[must_use]
    pub fn new(
        schedules: Vec<WeekSchedule>,
        resolver: ActiveWeekResolver,
        now: NaiveDateTime,
    ) -> Self {
        let cursor = resolver.resolve(now, &schedules);
        Self {
            schedules,
            cursor,
            resolver,
        }
    }

    /// Create a navigator positioned on a week resolved elsewhere, such as
    /// the index reported by the portal. An out-of-range index selects
    /// nothing.
    #[must_use]
    pub fn with_cursor(
        schedules: Vec<WeekSchedule>,
        resolver: ActiveWeekResolver,
        cursor: Option<usize>,
    ) -> Self {
        let cursor = cursor.filter(|&i| i < schedules.len());
        Self {
            schedules,
            cursor,
            resolver,
        }
    }

    /// Create a navigator from the roster cached on this device.
    #[must_use]
    pub fn restore(
        storage: &dyn DeviceStorage,
        resolver: ActiveWeekResolver,
        now: NaiveDateTime,
    ) -> Self {
        Self::new(load_cached_roster(storage), resolver, now)
    }

    /// Save the current roster to the device cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the device storage cannot be written.
    pub fn persist(&self, storage: &dyn DeviceStorage) -> Result<(), DeviceStorageError> {
        save_cached_roster(storage, &self.schedules)
    }

    /// Swap in a new roster and re-resolve the active week.
    pub fn replace(&mut self, schedules: Vec<WeekSchedule>, now: NaiveDateTime) {
        self.cursor = self.resolver.resolve(now, &schedules);
        self.schedules = schedules;
    }

    #[must_use]
    pub fn schedules(&self) -> &[WeekSchedule] {
        &self.schedules
    }

    #[must_use]
    pub const fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// The selected week, if any.
    #[must_use]
    pub fn current(&self) -> Option<&WeekSchedule> {
        self.cursor.and_then(|i| self.schedules.get(i))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }

    /// Select week `index`. Out-of-range indices are ignored.
    pub fn jump_to(&mut self, index: usize) {
        if index < self.schedules.len() {
            self.cursor = Some(index);
        }
    }

    /// Move to the following week; no-op on the last week.
    ///
    /// With no week selected this moves to the first week.
    pub fn next(&mut self) {
        let target = self.cursor.map_or(0, |i| i + 1);
        self.jump_to(target);
    }

    /// Move to the preceding week; no-op on the first week or with no selection.
    pub fn prev(&mut self) {
        if let Some(i) = self.cursor.and_then(|i| i.checked_sub(1)) {
            self.cursor = Some(i);
        }
    }

    /// Whether backward navigation is exhausted.
    ///
    /// True on the first week, and for an empty roster.
    #[must_use]
    pub fn is_first(&self) -> bool {
        self.schedules.is_empty() || self.cursor == Some(0)
    }

    /// Whether forward navigation is exhausted.
    ///
    /// True on the last week, and for an empty roster.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.schedules.is_empty() || self.cursor == Some(self.schedules.len() - 1)
    }
}
