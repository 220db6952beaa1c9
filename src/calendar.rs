//! Date pickers for the booking flow: a Sunday-anchored weekly strip and a
//! 6x7 monthly grid.

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

pub const GRID_ROWS: usize = 6;

/// How far ahead a requested period may start.
pub const HORIZON_MONTHS: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarView {
    #[default]
    Weekly,
    Monthly,
}

impl CalendarView {
    pub fn as_str(self) -> &'static str {
        match self {
            CalendarView::Weekly => "weekly",
            CalendarView::Monthly => "monthly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "weekly" => Some(CalendarView::Weekly),
            "monthly" => Some(CalendarView::Monthly),
            _ => None,
        }
    }

    /// First day of the period of this view that contains `date`.
    pub fn anchor_for(self, date: NaiveDate) -> NaiveDate {
        match self {
            CalendarView::Weekly => week_start(date),
            CalendarView::Monthly => month_start(date),
        }
    }
}

/// The Sunday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date.checked_sub_signed(Duration::days(i64::from(date.weekday().num_days_from_sunday())))
        .unwrap_or(date)
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Keeps a requested anchor between today and the booking horizon.
pub fn clamp_anchor(anchor: NaiveDate, today: NaiveDate) -> NaiveDate {
    let horizon = today
        .checked_add_months(Months::new(HORIZON_MONTHS))
        .unwrap_or(today);
    anchor.clamp(today, horizon)
}

/// Days strictly before `today` can never be picked.
pub fn is_past(date: NaiveDate, today: NaiveDate) -> bool {
    date < today
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateCell {
    pub date: NaiveDate,
    pub iso: String,
    pub is_past: bool,
    /// Only computed for the weekly strip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_slots: Option<bool>,
}

impl DateCell {
    fn new(date: NaiveDate, today: NaiveDate, has_slots: Option<bool>) -> Self {
        Self {
            date,
            iso: date.format("%Y-%m-%d").to_string(),
            is_past: is_past(date, today),
            has_slots,
        }
    }

    pub fn selectable(&self) -> bool {
        !self.is_past
    }
}

/// The period currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarCursor {
    pub view: CalendarView,
    pub anchor: NaiveDate,
}

impl CalendarCursor {
    /// Anchored on the selected date, or on today when nothing is selected.
    pub fn new(view: CalendarView, selected: Option<NaiveDate>, today: NaiveDate) -> Self {
        Self {
            view,
            anchor: view.anchor_for(selected.unwrap_or(today)),
        }
    }

    pub fn at(view: CalendarView, anchor: NaiveDate) -> Self {
        Self {
            view,
            anchor: view.anchor_for(anchor),
        }
    }

    fn shifted_back(self) -> NaiveDate {
        match self.view {
            CalendarView::Weekly => self
                .anchor
                .checked_sub_signed(Duration::days(7))
                .unwrap_or(self.anchor),
            CalendarView::Monthly => self
                .anchor
                .checked_sub_months(Months::new(1))
                .unwrap_or(self.anchor),
        }
    }

    /// Going back is allowed until the anchor would leave the current
    /// week or month.
    pub fn can_go_previous(self, today: NaiveDate) -> bool {
        let previous = self.shifted_back();
        previous != self.anchor && previous >= self.view.anchor_for(today)
    }

    pub fn previous(self, today: NaiveDate) -> Self {
        if !self.can_go_previous(today) {
            return self;
        }
        Self {
            anchor: self.shifted_back(),
            ..self
        }
    }

    pub fn next(self) -> Self {
        let anchor = match self.view {
            CalendarView::Weekly => self
                .anchor
                .checked_add_signed(Duration::days(7))
                .unwrap_or(self.anchor),
            CalendarView::Monthly => self
                .anchor
                .checked_add_months(Months::new(1))
                .unwrap_or(self.anchor),
        };
        Self { anchor, ..self }
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        self.view.anchor_for(date) == self.anchor
    }

    /// Moves the anchor so the selected date is on screen.
    pub fn follow(self, selected: NaiveDate) -> Self {
        if self.contains(selected) {
            self
        } else {
            Self::at(self.view, selected)
        }
    }

    /// Seven days from the anchor Sunday, each tagged with whether any slot
    /// remains for the chosen service. Shorter only at the end of the calendar.
    pub fn weekly_strip(
        self,
        today: NaiveDate,
        has_slots: impl Fn(NaiveDate) -> bool,
    ) -> Vec<DateCell> {
        let start = week_start(self.anchor);
        (0..7)
            .filter_map(|offset| start.checked_add_signed(Duration::days(offset)))
            .map(|date| DateCell::new(date, today, Some(has_slots(date))))
            .collect()
    }

    /// Always six rows of seven; cells outside the month are `None`.
    pub fn month_grid(self, today: NaiveDate) -> Vec<Vec<Option<DateCell>>> {
        let first = month_start(self.anchor);
        let leading = first.weekday().num_days_from_sunday() as usize;
        let mut cells: Vec<Option<DateCell>> = vec![None; leading];
        let mut date = first;
        while date.month() == first.month() {
            cells.push(Some(DateCell::new(date, today, None)));
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }
        cells.resize(GRID_ROWS * 7, None);
        cells.chunks(7).map(<[_]>::to_vec).collect()
    }
}
