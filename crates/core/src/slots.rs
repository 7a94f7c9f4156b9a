//! Delivery time-slot generation.
//!
//! Slots are computed in the restaurant's local wall-clock time. The server
//! converts them to UTC with the configured offset before storing an order.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

/// Daily opening hours of a kitchen.
///
/// When `closes` is not after `opens` the kitchen closes on the following
/// day (e.g. 18:00-02:00). Equal times mean open around the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningHours {
    pub opens: NaiveTime,
    pub closes: NaiveTime,
}

impl OpeningHours {
    /// Opening and closing instants for the service day starting on `date`.
    #[must_use]
    pub fn window(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let open = date.and_time(self.opens);
        let close_day = if self.closes <= self.opens {
            date.succ_opt().unwrap_or(date)
        } else {
            date
        };
        (open, close_day.and_time(self.closes))
    }
}

/// Platform-wide slot rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotPolicy {
    /// Slot length; slots are aligned to opening time.
    pub interval_minutes: u32,
    /// Minimum time between ordering and the start of the slot.
    pub lead_time_minutes: u32,
    /// Maximum number of slots returned, if any.
    pub horizon_slots: Option<usize>,
}

impl Default for SlotPolicy {
    fn default() -> Self {
        Self {
            interval_minutes: 30,
            lead_time_minutes: 45,
            horizon_slots: None,
        }
    }
}

/// A delivery window offered at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeliverySlot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Generate the delivery slots still bookable on `date`.
///
/// A slot is offered when it ends no later than closing time and starts no
/// earlier than `now + lead_time`. Dates whose service window has already
/// passed therefore produce no slots.
#[must_use]
pub fn generate(
    date: NaiveDate,
    hours: &OpeningHours,
    policy: &SlotPolicy,
    now: NaiveDateTime,
) -> Vec<DeliverySlot> {
    if policy.interval_minutes == 0 {
        return Vec::new();
    }

    let step = TimeDelta::minutes(i64::from(policy.interval_minutes));
    let lead = TimeDelta::minutes(i64::from(policy.lead_time_minutes));
    let limit = policy.horizon_slots.unwrap_or(usize::MAX);
    let (open, close) = hours.window(date);
    // Beyond the calendar's end nothing can be early enough to drop.
    let earliest = now.checked_add_signed(lead);

    let mut slots = Vec::new();
    let mut start = open;
    // Stops at the end of the representable calendar as well as at closing.
    while let Some(end) = start.checked_add_signed(step) {
        if end > close || slots.len() >= limit {
            break;
        }
        if earliest.is_none_or(|earliest| start >= earliest) {
            slots.push(DeliverySlot { start, end });
        }
        start = end;
    }
    slots
}

/// Whether `start` is one of the slots currently offered for `date`.
#[must_use]
pub fn is_offered(
    start: NaiveDateTime,
    date: NaiveDate,
    hours: &OpeningHours,
    policy: &SlotPolicy,
    now: NaiveDateTime,
) -> Option<DeliverySlot> {
    generate(date, hours, policy, now)
        .into_iter()
        .find(|slot| slot.start == start)
}
