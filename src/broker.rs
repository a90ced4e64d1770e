//! Cross-view coordination: the stream view's visible range and whether the bar chart follows it.

use serde::Serialize;

use crate::aggregate::YearRange;

pub const ALL_YEARS_LABEL: &str = "All Years";

/// Shared view state. Updates return a new value; the broker itself is never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoordinationBroker {
    visible: Option<YearRange>,
    linked: bool,
}

impl Default for CoordinationBroker {
    fn default() -> Self {
        Self {
            visible: None,
            linked: true,
        }
    }
}

impl CoordinationBroker {
    pub fn new(linked: bool) -> Self {
        Self {
            visible: None,
            linked,
        }
    }

    pub fn visible(&self) -> Option<YearRange> {
        self.visible
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// Record the viewport's latest range. Stored even while unlinked, so relinking picks up
    /// the current window immediately.
    #[must_use]
    pub fn with_range(self, range: Option<YearRange>) -> Self {
        Self {
            visible: range,
            ..self
        }
    }

    #[must_use]
    pub fn with_linked(self, linked: bool) -> Self {
        Self { linked, ..self }
    }

    /// The window aggregations should use: the visible range while linked, else everything.
    pub fn active_window(&self) -> Option<YearRange> {
        if self.linked {
            self.visible
        } else {
            None
        }
    }

    pub fn window_label(&self) -> String {
        self.active_window()
            .map(|r| r.label())
            .unwrap_or_else(|| ALL_YEARS_LABEL.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linked_follows_range() {
        let b = CoordinationBroker::default().with_range(Some(YearRange::from_years(1990, 2005)));
        assert_eq!(b.active_window(), Some(YearRange::from_years(1990, 2005)));
        assert_eq!(b.window_label(), "1990\u{2013}2005");
    }

    #[test]
    fn unlinked_uses_everything() {
        let b = CoordinationBroker::default()
            .with_range(Some(YearRange::from_years(1990, 2005)))
            .with_linked(false);
        assert_eq!(b.active_window(), None);
        assert_eq!(b.window_label(), ALL_YEARS_LABEL);
        let relinked = b.with_linked(true);
        assert_eq!(relinked.active_window(), Some(YearRange::from_years(1990, 2005)));
    }

    #[test]
    fn no_range_yet() {
        assert_eq!(CoordinationBroker::default().window_label(), ALL_YEARS_LABEL);
    }
}
