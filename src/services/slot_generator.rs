//! Hourly appointment slots for one date.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveTime};
use tracing::debug;

use crate::models::availability::{BookedInstant, TimeSlot, WeeklyAvailabilityRule};

pub const SLOT_MINUTES: i64 = 60;

/// Expands `rules` (already narrowed to one provider and to `target_date`'s
/// weekday) into hourly slots and marks the ones taken by `booked`.
///
/// Slots run from `start_time` up to but excluding `end_time`. A rule whose
/// start is not before its end contributes nothing. Rules are expanded in
/// the order given, so overlapping rules produce duplicate slots.
pub fn generate_slots(
    rules: &[WeeklyAvailabilityRule],
    booked: &[BookedInstant],
    target_date: NaiveDate,
) -> Vec<TimeSlot> {
    if rules.is_empty() {
        return Vec::new();
    }

    let occupied = booked
        .iter()
        .filter(|instant| instant.status.occupies_slot())
        .fold(HashMap::new(), |mut map, instant| {
            map.entry(instant.time)
                .or_insert_with(|| instant.booking_id.clone());
            map
        });

    let slots = rules
        .iter()
        .flat_map(|rule| slot_times(rule.start_time, rule.end_time))
        .map(|time| {
            let booking_id = occupied.get(&time).cloned();
            TimeSlot {
                time,
                available: booking_id.is_none(),
                booking_id,
            }
        })
        .collect::<Vec<_>>();

    debug!(
        target: "app::availability",
        %target_date,
        rules = rules.len(),
        slots = slots.len(),
        booked = occupied.len(),
        "slots generated"
    );

    slots
}

fn slot_times(start: NaiveTime, end: NaiveTime) -> Vec<NaiveTime> {
    let step = Duration::minutes(SLOT_MINUTES);
    let mut times = Vec::new();
    let mut current = start;

    while current < end {
        times.push(current);
        let (next, wrapped) = current.overflowing_add_signed(step);
        if wrapped != 0 {
            break;
        }
        current = next;
    }

    times
}
