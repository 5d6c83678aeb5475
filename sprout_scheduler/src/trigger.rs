use chrono::{DateTime, Days, LocalResult, NaiveDate, NaiveDateTime, TimeDelta, TimeZone};

use sprout_models::reminder::{RepeatInterval, TimeOfDay};

const MINUTES_PER_DAY: i64 = 24 * 60;

/// First trigger of a freshly armed reminder: today at `time_of_day` if that
/// is still ahead of `now`, tomorrow otherwise. Always strictly after `now`.
pub fn compute_initial_trigger<Tz: TimeZone>(
    time_of_day: &TimeOfDay,
    now: &DateTime<Tz>,
) -> Option<DateTime<Tz>> {
    let timezone = now.timezone();
    let today = now.date_naive();
    let candidate = at_local_time(&timezone, today, time_of_day);

    if candidate > *now {
        return Some(candidate);
    }

    let tomorrow = today.checked_add_days(Days::new(1))?;
    Some(at_local_time(&timezone, tomorrow, time_of_day))
}

/// Trigger that follows a fired one: `repeat_interval` calendar days after the
/// date of `now`, at `time_of_day`. No correction is applied if the result is
/// not ahead of `now`. `None` when the date leaves the supported calendar.
pub fn compute_next_trigger<Tz: TimeZone>(
    time_of_day: &TimeOfDay,
    repeat_interval: RepeatInterval,
    now: &DateTime<Tz>,
) -> Option<DateTime<Tz>> {
    let target_date = now
        .date_naive()
        .checked_add_days(Days::new(repeat_interval.days().into()))?;

    Some(at_local_time(&now.timezone(), target_date, time_of_day))
}

/// First trigger of the chain through `previous` that is strictly after `now`.
/// Occurrences between the two are skipped.
pub fn compute_catch_up_trigger<Tz: TimeZone>(
    time_of_day: &TimeOfDay,
    repeat_interval: RepeatInterval,
    previous: &DateTime<Tz>,
    now: &DateTime<Tz>,
) -> Option<DateTime<Tz>> {
    let mut trigger = compute_next_trigger(time_of_day, repeat_interval, previous)?;
    while trigger <= *now {
        trigger = compute_next_trigger(time_of_day, repeat_interval, &trigger)?;
    }

    Some(trigger)
}

/// Trigger of a chain restored from a persisted `anchor`. The anchor date is
/// kept when it is still ahead of `now`, otherwise the chain advances from it
/// in whole intervals. The time of day is resolved in the timezone of `now`.
pub fn compute_resumed_trigger<Tz: TimeZone>(
    time_of_day: &TimeOfDay,
    repeat_interval: RepeatInterval,
    anchor: &DateTime<Tz>,
    now: &DateTime<Tz>,
) -> Option<DateTime<Tz>> {
    let anchored = at_local_time(&now.timezone(), anchor.date_naive(), time_of_day);
    if anchored > *now {
        return Some(anchored);
    }

    compute_catch_up_trigger(time_of_day, repeat_interval, &anchored, now)
}

/// Resolves a local wall-clock time. Ambiguous times (clocks turned back)
/// take the earlier instant; times skipped by a forward shift move to the
/// end of the gap.
fn at_local_time<Tz: TimeZone>(
    timezone: &Tz,
    date: NaiveDate,
    time_of_day: &TimeOfDay,
) -> DateTime<Tz> {
    let local = date.and_time(*time_of_day.time());

    match timezone.from_local_datetime(&local) {
        LocalResult::Single(datetime) => datetime,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => first_after_gap(timezone, local),
    }
}

fn first_after_gap<Tz: TimeZone>(timezone: &Tz, local: NaiveDateTime) -> DateTime<Tz> {
    (1..=MINUTES_PER_DAY)
        .map(|minutes| local + TimeDelta::minutes(minutes))
        .find_map(|shifted| timezone.from_local_datetime(&shifted).earliest())
        .expect("Time zone transitions never skip a whole day")
}
