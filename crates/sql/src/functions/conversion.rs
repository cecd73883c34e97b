//! Conversion and conditional function type rules
//!
//! Several of these resolve their parameters lazily: NULLIF's second
//! parameter and DECODE's search/result pairs beyond the defining one are
//! never resolved here, so a deferred parameter in those positions survives
//! for a later pass.

use super::{datetime, FunctionCatalog, FunctionId, Resolution, FALLBACK_STRING_LENGTH};
use crate::error::{Error, Result};
use crate::expr::resolve::Args;
use crate::expr::Expression;
use crate::types::{TypeCode, TypeDescriptor};

pub(super) fn register(catalog: &mut FunctionCatalog) {
    catalog.register(FunctionId::Coalesce, coalesce);
    catalog.register(FunctionId::Ifnull, coalesce);
    catalog.register(FunctionId::Nvl, coalesce);
    catalog.register(FunctionId::Nullif, nullif);
    catalog.register(FunctionId::Decode, decode);
    catalog.register(FunctionId::Greatest, extremum);
    catalog.register(FunctionId::Least, extremum);
    catalog.register(FunctionId::ToChar, to_char);
    catalog.register(FunctionId::ToDate, to_date);
    catalog.register(FunctionId::ToNumber, to_number);
    catalog.register(FunctionId::ToTimestamp, to_timestamp);
    catalog.register(FunctionId::Value, value);
}

/// COALESCE takes the type of its first non-NULL parameter; parameters after
/// that one are left unresolved.
fn coalesce(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, None)?;
    for i in 0..args.len() {
        let ty = args.ty(i)?;
        if !ty.is_null() {
            return Ok(Resolution::of(ty));
        }
    }
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Null)))
}

/// NULLIF carries its first parameter's type; the comparison value is never
/// resolved here.
fn nullif(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(2, Some(2))?;
    Ok(Resolution::of(args.ty(0)?))
}

/// DECODE(expr, search, result, ...[, default]) is typed by its first result
/// parameter alone.
fn decode(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(3, None)?;
    Ok(Resolution::of(args.ty(2)?))
}

/// GREATEST/LEAST agree like CASE branches: all numeric, merged wide, or the
/// first non-NULL type.
fn extremum(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, None)?;
    let mut result: Option<TypeDescriptor> = None;
    for i in 0..args.len() {
        let ty = args.ty(i)?;
        if ty.is_null() {
            continue;
        }
        result = Some(match result {
            None => ty,
            Some(prev) => {
                if prev.is_numeric() && ty.is_numeric() {
                    TypeDescriptor::merge_numeric(&prev, &ty)?
                } else if prev.is_numeric() != ty.is_numeric() {
                    return Err(Error::mismatch(prev.to_string(), ty));
                } else {
                    prev
                }
            }
        });
    }
    Ok(Resolution::of(
        result.unwrap_or_else(|| TypeDescriptor::new(TypeCode::Null)),
    ))
}

fn to_char(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(2))?;
    args.ty(0)?;
    if args.len() == 2 {
        args.require_character(1)?;
    }
    Ok(Resolution::of(TypeDescriptor::with_length(
        TypeCode::VarChar,
        FALLBACK_STRING_LENGTH,
    )))
}

/// TO_DATE without a format string normalizes a literal argument the same
/// way the DATE constructor does.
fn to_date(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(2))?;
    let result = TypeDescriptor::new(TypeCode::Date);
    if args.len() == 2 {
        args.require_character(0)?;
        args.require_character(1)?;
        return Ok(Resolution::of(result));
    }
    let input = args.ty(0)?;
    if input.is_character() {
        if let Some(text) = args.literal_text(0) {
            let normalized = datetime::normalize_date(text)?;
            let rewrite = Expression::typed_constant(normalized, result.clone());
            return Ok(Resolution::rewriting(result, vec![(0, rewrite)]));
        }
    }
    Ok(Resolution::of(result))
}

fn to_number(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(2))?;
    args.ty(0)?;
    if args.len() == 2 {
        args.require_character(1)?;
    }
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Numeric)))
}

fn to_timestamp(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(2))?;
    let result = TypeDescriptor::new(TypeCode::Timestamp);
    if args.len() == 2 {
        args.require_character(0)?;
        args.require_character(1)?;
        return Ok(Resolution::of(result));
    }
    let input = args.ty(0)?;
    if input.is_character() {
        if let Some(text) = args.literal_text(0) {
            let normalized = datetime::normalize_timestamp(text)?;
            let rewrite = Expression::typed_constant(normalized, result.clone());
            return Ok(Resolution::rewriting(result, vec![(0, rewrite)]));
        }
    }
    Ok(Resolution::of(result))
}

/// VALUE behaves like COALESCE except that a character result is always
/// reported at length 10, whatever the inputs. Kept for compatibility with
/// the clients that depend on it.
fn value(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, None)?;
    for i in 0..args.len() {
        let mut ty = args.ty(i)?;
        if !ty.is_null() {
            if ty.is_character() {
                ty.length = 10;
            }
            return Ok(Resolution::of(ty));
        }
    }
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Null)))
}
