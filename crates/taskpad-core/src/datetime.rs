use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  TimeZone,
  TimeDelta,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

pub const DEFAULT_DATE_FORMAT: &str =
  "%b %d, %Y";

/// Source of "now" for the form
/// controllers.
pub trait Clock:
  Send + Sync + std::fmt::Debug
{
  fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now_millis(&self) -> i64 {
    Utc::now().timestamp_millis()
  }
}

/// Always answers the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
  fn now_millis(&self) -> i64 {
    self.0
  }
}

pub fn parse_timezone(
  raw: &str
) -> anyhow::Result<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Err(anyhow!(
      "timezone cannot be empty"
    ));
  }
  trimmed.parse::<Tz>().map_err(|err| {
    anyhow!(
      "unknown timezone {trimmed}: \
       {err}"
    )
  })
}

#[must_use]
pub fn format_due(
  millis: i64,
  tz: &Tz,
  format: &str
) -> String {
  match Utc
    .timestamp_millis_opt(millis)
    .single()
  {
    | Some(dt) => dt
      .with_timezone(tz)
      .format(format)
      .to_string(),
    | None => millis.to_string()
  }
}

/// Resolves a due-date expression to
/// epoch milliseconds.
#[tracing::instrument(skip(now, tz), fields(input = input))]
pub fn parse_due_expr(
  input: &str,
  now: DateTime<Utc>,
  tz: &Tz
) -> anyhow::Result<i64> {
  let token = input.trim();
  if token.is_empty() {
    return Err(anyhow!(
      "due date cannot be empty"
    ));
  }
  let lower =
    token.to_ascii_lowercase();

  let resolved = match lower.as_str() {
    | "now" => now,
    | "today" => start_of_day(
      now.with_timezone(tz).date_naive(),
      tz
    )?,
    | "tomorrow" => {
      start_of_day(
        now.with_timezone(tz).date_naive(),
        tz
      )? + Duration::days(1)
    }
    | "yesterday" => {
      start_of_day(
        now.with_timezone(tz).date_naive(),
        tz
      )? - Duration::days(1)
    }
    | _ => {
      return parse_non_keyword(
        token, &lower, now, tz
      );
    }
  };

  Ok(resolved.timestamp_millis())
}

fn parse_non_keyword(
  token: &str,
  lower: &str,
  now: DateTime<Utc>,
  tz: &Tz
) -> anyhow::Result<i64> {
  if let Some(weekday) =
    parse_weekday_name(lower)
  {
    let today =
      now.with_timezone(tz).date_naive();
    let target =
      next_weekday_date(today, weekday);
    return Ok(
      start_of_day(target, tz)?
        .timestamp_millis()
    );
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(
      start_of_day(date, tz)?
        .timestamp_millis()
    );
  }

  if let Ok(naive) =
    NaiveDateTime::parse_from_str(
      token,
      "%Y-%m-%dT%H:%M"
    )
  {
    return Ok(
      to_utc(naive, tz, "datetime")?
        .timestamp_millis()
    );
  }

  let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dwhm])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  if let Some(caps) =
    rel_re.captures(lower)
  {
    let negative = &caps["sign"] == "-";
    let num: i64 = caps["num"]
      .parse()
      .context(
        "invalid relative amount"
      )?;
    let num =
      if negative { -num } else { num };
    let delta = match &caps["unit"] {
      | "w" => TimeDelta::try_weeks(num),
      | "d" => TimeDelta::try_days(num),
      | "h" => TimeDelta::try_hours(num),
      | _ => TimeDelta::try_minutes(num)
    };
    let resolved = delta
      .and_then(|delta| {
        now.checked_add_signed(delta)
      })
      .ok_or_else(|| {
        anyhow!(
          "due date out of range: \
           {token}"
        )
      })?;
    return Ok(
      resolved.timestamp_millis()
    );
  }

  if token
    .chars()
    .all(|c| c.is_ascii_digit())
  {
    return token.parse::<i64>().with_context(
      || {
        format!(
          "invalid epoch millis: \
           {token}"
        )
      }
    );
  }

  Err(anyhow!(
    "unrecognized due date: {token}"
  ))
}

fn start_of_day(
  date: NaiveDate,
  tz: &Tz
) -> anyhow::Result<DateTime<Utc>> {
  let midnight = date
    .and_hms_opt(0, 0, 0)
    .ok_or_else(|| {
      anyhow!(
        "failed to construct \
         midnight for {date}"
      )
    })?;
  to_utc(midnight, tz, "midnight")
}

fn to_utc(
  local_naive: NaiveDateTime,
  tz: &Tz,
  context: &str
) -> anyhow::Result<DateTime<Utc>> {
  match tz
    .from_local_datetime(&local_naive)
  {
    | LocalResult::Single(local_dt) => {
      Ok(local_dt.with_timezone(&Utc))
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      tracing::warn!(
        context,
        first = %first,
        second = %second,
        "ambiguous local datetime; using earliest"
      );
      Ok(
        first
          .min(second)
          .with_timezone(&Utc)
      )
    }
    | LocalResult::None => {
      Err(anyhow!(
        "local datetime does not \
         exist in {tz}: {context}"
      ))
    }
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let current =
    from.weekday().num_days_from_monday()
      as i64;
  let wanted = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (wanted - current).rem_euclid(7);
  if delta == 0 {
    delta = 7;
  }
  from + Duration::days(delta)
}

fn parse_weekday_name(
  s: &str
) -> Option<Weekday> {
  match s {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    DateTime,
    TimeZone,
    Utc
  };
  use chrono_tz::Tz;

  use super::{
    format_due,
    parse_due_expr,
    parse_timezone
  };

  fn fixed_now() -> DateTime<Utc> {
    Utc
      .with_ymd_and_hms(
        2026, 2, 17, 12, 0, 0
      )
      .single()
      .expect("valid now")
  }

  fn day_of(millis: i64, tz: &Tz) -> String {
    format_due(millis, tz, "%Y-%m-%d")
  }

  #[test]
  fn parses_keywords() {
    let tz = chrono_tz::UTC;
    let now = fixed_now();
    assert_eq!(
      parse_due_expr("now", now, &tz)
        .expect("parse now"),
      now.timestamp_millis()
    );
    let tomorrow =
      parse_due_expr("Tomorrow", now, &tz)
        .expect("parse tomorrow");
    assert_eq!(
      day_of(tomorrow, &tz),
      "2026-02-18"
    );
  }

  #[test]
  fn parses_weekday_name_as_next_occurrence() {
    let tz = chrono_tz::UTC;
    // 2026-02-17 is a Tuesday.
    let parsed =
      parse_due_expr("tue", fixed_now(), &tz)
        .expect("parse weekday");
    assert_eq!(
      day_of(parsed, &tz),
      "2026-02-24"
    );
  }

  #[test]
  fn parses_calendar_date_in_configured_zone() {
    let tz = parse_timezone(
      "America/Mexico_City"
    )
    .expect("known zone");
    let parsed = parse_due_expr(
      "2026-03-01",
      fixed_now(),
      &tz
    )
    .expect("parse date");
    assert_eq!(
      day_of(parsed, &tz),
      "2026-03-01"
    );
    assert_eq!(
      format_due(
        parsed,
        &chrono_tz::UTC,
        "%H:%M"
      ),
      "06:00"
    );
  }

  #[test]
  fn parses_relative_offsets() {
    let tz = chrono_tz::UTC;
    let now = fixed_now();
    let in_two_weeks =
      parse_due_expr("+2w", now, &tz)
        .expect("parse +2w");
    assert_eq!(
      day_of(in_two_weeks, &tz),
      "2026-03-03"
    );
    let earlier =
      parse_due_expr("-3h", now, &tz)
        .expect("parse -3h");
    assert_eq!(
      now.timestamp_millis() - earlier,
      3 * 60 * 60 * 1000
    );
  }

  #[test]
  fn parses_today_and_yesterday_as_local_midnight() {
    let tz = chrono_tz::UTC;
    let now = fixed_now();
    let today =
      parse_due_expr("today", now, &tz)
        .expect("parse today");
    assert_eq!(
      format_due(
        today,
        &tz,
        "%Y-%m-%d %H:%M"
      ),
      "2026-02-17 00:00"
    );
    let yesterday = parse_due_expr(
      "yesterday",
      now,
      &tz
    )
    .expect("parse yesterday");
    assert_eq!(
      today - yesterday,
      24 * 60 * 60 * 1000
    );
  }

  #[test]
  fn parses_date_with_clock_time() {
    let tz = chrono_tz::UTC;
    let parsed = parse_due_expr(
      "2026-03-01T09:15",
      fixed_now(),
      &tz
    )
    .expect("parse datetime");
    assert_eq!(
      format_due(
        parsed,
        &tz,
        "%Y-%m-%d %H:%M"
      ),
      "2026-03-01 09:15"
    );
  }

  #[test]
  fn skipped_local_time_is_an_error() {
    let tz = parse_timezone(
      "America/New_York"
    )
    .expect("known zone");
    // Clocks jump from 02:00 to 03:00.
    let err = parse_due_expr(
      "2026-03-08T02:30",
      fixed_now(),
      &tz
    )
    .expect_err("nonexistent time");
    assert!(
      format!("{err:#}")
        .contains("does not exist")
    );
  }

  #[test]
  fn parses_negative_day_offset_and_epoch_millis() {
    let tz = chrono_tz::UTC;
    let now = fixed_now();
    let earlier =
      parse_due_expr("-2d", now, &tz)
        .expect("parse -2d");
    assert_eq!(
      format_due(
        earlier,
        &tz,
        "%Y-%m-%d %H:%M"
      ),
      "2026-02-15 12:00"
    );
    assert_eq!(
      parse_due_expr(
        "1700000000000",
        now,
        &tz
      )
      .expect("parse millis"),
      1_700_000_000_000
    );
  }

  #[test]
  fn huge_offsets_are_errors_not_panics() {
    let tz = chrono_tz::UTC;
    for input in [
      "+300000000d",
      "-300000000d",
      "+99999999999999w",
      "+9223372036854775807m"
    ] {
      let err =
        parse_due_expr(input, fixed_now(), &tz)
          .expect_err("out of range");
      assert!(
        format!("{err:#}")
          .contains("out of range")
      );
    }
  }

  #[test]
  fn rejects_garbage() {
    let tz = chrono_tz::UTC;
    assert!(
      parse_due_expr(
        "someday",
        fixed_now(),
        &tz
      )
      .is_err()
    );
    assert!(
      parse_due_expr("  ", fixed_now(), &tz)
        .is_err()
    );
    assert!(parse_timezone("Mars/Base").is_err());
  }

  #[test]
  fn formats_like_the_list_screen() {
    let millis = Utc
      .with_ymd_and_hms(
        2026, 10, 5, 9, 30, 0
      )
      .single()
      .expect("valid date")
      .timestamp_millis();
    assert_eq!(
      format_due(
        millis,
        &chrono_tz::UTC,
        super::DEFAULT_DATE_FORMAT
      ),
      "Oct 05, 2026"
    );
  }
}
