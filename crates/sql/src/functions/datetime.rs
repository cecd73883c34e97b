//! Date/time function type rules and literal normalization
//!
//! Shards disagree on which date literal spellings they accept, so literals
//! reaching a date/time constructor are normalized to the canonical quoted
//! forms `'YYYY-MM-DD'`, `'HH:MM:SS'` and `'YYYY-MM-DD HH:MM:SS[.f]'` before
//! rendering. Unparseable literals fail with `InvalidFormat`.

use super::{FunctionCatalog, FunctionId, Resolution};
use crate::error::{Error, Result};
use crate::expr::resolve::Args;
use crate::expr::Expression;
use crate::types::{TypeCode, TypeDescriptor};
use chrono::{NaiveDate, NaiveTime};

pub(super) fn register(catalog: &mut FunctionCatalog) {
    catalog.register(FunctionId::CurrentDate, current_date);
    catalog.register(FunctionId::CurrentTime, current_time);
    catalog.register(FunctionId::CurrentTimestamp, current_timestamp);
    catalog.register(FunctionId::Now, current_timestamp);
    catalog.register(FunctionId::Date, date_ctor);
    catalog.register(FunctionId::Time, time_ctor);
    catalog.register(FunctionId::Timestamp, timestamp_ctor);
    catalog.register(FunctionId::Day, part);
    catalog.register(FunctionId::Dayofmonth, part);
    catalog.register(FunctionId::Dayofweek, part);
    catalog.register(FunctionId::Dayofyear, part);
    catalog.register(FunctionId::Hour, part);
    catalog.register(FunctionId::Microsecond, part);
    catalog.register(FunctionId::Minute, part);
    catalog.register(FunctionId::Month, part);
    catalog.register(FunctionId::Quarter, part);
    catalog.register(FunctionId::Second, part);
    catalog.register(FunctionId::Year, part);
    catalog.register(FunctionId::Week, week);
    catalog.register(FunctionId::Dayname, part_name);
    catalog.register(FunctionId::Monthname, part_name);
    catalog.register(FunctionId::Extract, extract);
    catalog.register(FunctionId::Datediff, datediff);
    catalog.register(FunctionId::Timestampdiff, timestampdiff);
    catalog.register(FunctionId::Timestampadd, timestampadd);
    catalog.register(FunctionId::AddMonths, date_shift);
    catalog.register(FunctionId::Adddate, date_shift);
    catalog.register(FunctionId::Subdate, date_shift);
    catalog.register(FunctionId::LastDay, last_day);
    catalog.register(FunctionId::Makedate, makedate);
    catalog.register(FunctionId::Timediff, timediff);
}

fn unquote(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(trimmed)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::from_ymd_opt(
            raw[0..4].parse().ok()?,
            raw[4..6].parse().ok()?,
            raw[6..8].parse().ok()?,
        );
    }
    let parts: Vec<&str> = raw.split(['-', '/', '.']).collect();
    if parts.len() != 3 {
        return None;
    }
    NaiveDate::from_ymd_opt(
        parts[0].parse().ok()?,
        parts[1].parse().ok()?,
        parts[2].parse().ok()?,
    )
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    if raw.len() == 6 && raw.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveTime::from_hms_opt(
            raw[0..2].parse().ok()?,
            raw[2..4].parse().ok()?,
            raw[4..6].parse().ok()?,
        );
    }
    let parts: Vec<&str> = raw.split(':').collect();
    match parts.len() {
        2 => NaiveTime::from_hms_opt(parts[0].parse().ok()?, parts[1].parse().ok()?, 0),
        3 => NaiveTime::from_hms_opt(
            parts[0].parse().ok()?,
            parts[1].parse().ok()?,
            parts[2].parse().ok()?,
        ),
        _ => None,
    }
}

/// Normalize a date literal to `'YYYY-MM-DD'`. Accepts separated forms with
/// short components and the eight-digit compact form.
pub fn normalize_date(text: &str) -> Result<String> {
    let date =
        parse_date(unquote(text)).ok_or_else(|| Error::InvalidFormat(text.to_string()))?;
    Ok(format!("'{}'", date.format("%Y-%m-%d")))
}

/// Normalize a time literal to `'HH:MM:SS'`. Accepts separated forms, with
/// seconds defaulting to zero, and the six-digit compact form.
pub fn normalize_time(text: &str) -> Result<String> {
    let time =
        parse_time(unquote(text)).ok_or_else(|| Error::InvalidFormat(text.to_string()))?;
    Ok(format!("'{}'", time.format("%H:%M:%S")))
}

/// Normalize a timestamp literal to `'YYYY-MM-DD HH:MM:SS[.f]'`. A bare date
/// gets a midnight time part; the fourteen-digit compact form and fractional
/// seconds are accepted.
pub fn normalize_timestamp(text: &str) -> Result<String> {
    let invalid = || Error::InvalidFormat(text.to_string());
    let raw = unquote(text);

    if raw.len() == 14 && raw.bytes().all(|b| b.is_ascii_digit()) {
        let date = parse_date(&raw[0..8]).ok_or_else(invalid)?;
        let time = parse_time(&raw[8..14]).ok_or_else(invalid)?;
        return Ok(format!(
            "'{} {}'",
            date.format("%Y-%m-%d"),
            time.format("%H:%M:%S")
        ));
    }

    let (datetime, fraction) = match raw.split_once('.') {
        Some((head, fraction)) => {
            if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            (head, Some(fraction))
        }
        None => (raw, None),
    };

    let (date_part, time_part) = match datetime.split_once(char::is_whitespace) {
        Some((date, time)) => (date, Some(time.trim())),
        None => (datetime, None),
    };
    let date = parse_date(date_part).ok_or_else(invalid)?;
    let time = match time_part {
        Some(t) => parse_time(t).ok_or_else(invalid)?,
        None => NaiveTime::MIN,
    };

    let mut out = format!("'{} {}", date.format("%Y-%m-%d"), time.format("%H:%M:%S"));
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    out.push('\'');
    Ok(out)
}

fn current_date(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(0, Some(0))?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Date)))
}

fn current_time(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(0, Some(0))?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Time)))
}

fn current_timestamp(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(0, Some(0))?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Timestamp)))
}

/// Shared body of the DATE/TIME/TIMESTAMP constructors: a character literal
/// is normalized and rewritten as a typed constant, any other input must
/// already carry a date/time type.
fn ctor(
    args: &mut Args<'_, '_>,
    code: TypeCode,
    normalize: fn(&str) -> Result<String>,
) -> Result<Resolution> {
    args.require_arity(1, Some(1))?;
    let input = args.ty(0)?;
    let result = TypeDescriptor::new(code);
    if input.is_character() {
        let text = args
            .literal_text(0)
            .ok_or_else(|| args.illegal("expected a literal"))?;
        let normalized = normalize(text)?;
        let rewrite = Expression::typed_constant(normalized, result.clone());
        return Ok(Resolution::rewriting(result, vec![(0, rewrite)]));
    }
    if input.is_date_time() || input.is_null() {
        return Ok(Resolution::of(result));
    }
    Err(Error::mismatch("a date/time or literal input", input))
}

fn date_ctor(args: &mut Args<'_, '_>) -> Result<Resolution> {
    ctor(args, TypeCode::Date, normalize_date)
}

fn time_ctor(args: &mut Args<'_, '_>) -> Result<Resolution> {
    ctor(args, TypeCode::Time, normalize_time)
}

fn timestamp_ctor(args: &mut Args<'_, '_>) -> Result<Resolution> {
    ctor(args, TypeCode::Timestamp, normalize_timestamp)
}

fn part(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(1))?;
    args.require_date_time(0)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Int)))
}

fn week(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(2))?;
    args.require_date_time(0)?;
    if args.len() == 2 {
        args.require_numeric(1)?;
    }
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Int)))
}

fn part_name(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(1))?;
    args.require_date_time(0)?;
    Ok(Resolution::of(TypeDescriptor::with_length(
        TypeCode::VarChar,
        9,
    )))
}

/// EXTRACT(unit, source); the unit arrives as a literal keyword.
fn extract(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(2, Some(2))?;
    args.require_date_time(1)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Int)))
}

fn datediff(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(2, Some(2))?;
    args.require_date_time(0)?;
    args.require_date_time(1)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Int)))
}

fn timestampdiff(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(3, Some(3))?;
    args.require_date_time(1)?;
    args.require_date_time(2)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Int)))
}

fn timestampadd(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(3, Some(3))?;
    args.require_numeric(1)?;
    args.require_date_time(2)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Timestamp)))
}

fn date_shift(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(2, Some(2))?;
    args.require_date_time(0)?;
    args.require_numeric(1)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Date)))
}

fn last_day(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(1))?;
    args.require_date_time(0)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Date)))
}

fn makedate(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(2, Some(2))?;
    args.require_numeric(0)?;
    args.require_numeric(1)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Date)))
}

fn timediff(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(2, Some(2))?;
    args.require_date_time(0)?;
    args.require_date_time(1)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Time)))
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{of_code, resolve};
    use super::*;
    use crate::expr::ExprKind;

    #[test]
    fn date_literals_normalize_to_one_form() {
        assert_eq!(normalize_date("'2024-01-05'").unwrap(), "'2024-01-05'");
        assert_eq!(normalize_date("2024-1-5").unwrap(), "'2024-01-05'");
        assert_eq!(normalize_date("20240115").unwrap(), "'2024-01-15'");
        assert_eq!(normalize_date("2024/1/5").unwrap(), "'2024-01-05'");
    }

    #[test]
    fn invalid_dates_are_rejected() {
        assert!(matches!(
            normalize_date("2024-13-01"),
            Err(Error::InvalidFormat(_))
        ));
        assert!(matches!(
            normalize_date("not a date"),
            Err(Error::InvalidFormat(_))
        ));
        assert!(matches!(
            normalize_date("2024-02-30"),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn time_literals_normalize_with_default_seconds() {
        assert_eq!(normalize_time("9:5:3").unwrap(), "'09:05:03'");
        assert_eq!(normalize_time("10:30").unwrap(), "'10:30:00'");
        assert_eq!(normalize_time("093000").unwrap(), "'09:30:00'");
        assert!(matches!(
            normalize_time("25:00:00"),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn timestamp_literals_keep_fractions_and_default_midnight() {
        assert_eq!(
            normalize_timestamp("2024-1-5 9:30:00.123").unwrap(),
            "'2024-01-05 09:30:00.123'"
        );
        assert_eq!(
            normalize_timestamp("2024-01-05").unwrap(),
            "'2024-01-05 00:00:00'"
        );
        assert_eq!(
            normalize_timestamp("20240105093000").unwrap(),
            "'2024-01-05 09:30:00'"
        );
    }

    #[test]
    fn date_constructor_rewrites_its_literal() {
        let mut expr = Expression::function("DATE", vec![Expression::constant("2024-1-5")]);
        let ty = resolve(&mut expr).unwrap();
        assert_eq!(ty.code, TypeCode::Date);
        match &expr.kind {
            ExprKind::Function(call) => match &call.args[0].kind {
                ExprKind::Constant(c) => assert_eq!(c.text, "'2024-01-05'"),
                other => panic!("expected normalized constant, got {:?}", other),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn date_constructor_rejects_malformed_literals() {
        let mut expr = Expression::function("DATE", vec![Expression::constant("soon")]);
        assert!(matches!(resolve(&mut expr), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn part_extraction_is_int_and_names_are_varchar() {
        let mut month = Expression::function("MONTH", vec![of_code(TypeCode::Date)]);
        assert_eq!(resolve(&mut month).unwrap().code, TypeCode::Int);

        let mut name = Expression::function("DAYNAME", vec![of_code(TypeCode::Date)]);
        assert_eq!(resolve(&mut name).unwrap().code, TypeCode::VarChar);
    }
}
