//! String function type rules
//!
//! Result lengths are computed from the argument descriptors and literal
//! counts where possible; when a count is not a literal the result falls
//! back to `FALLBACK_STRING_LENGTH`. Several rules dispatch on arity with
//! the shorter forms validating a prefix of the longer ones.

use super::{FunctionCatalog, FunctionId, Resolution, FALLBACK_STRING_LENGTH};
use crate::error::Result;
use crate::expr::resolve::Args;
use crate::expr::Expression;
use crate::types::{TypeCode, TypeDescriptor};

pub(super) fn register(catalog: &mut FunctionCatalog) {
    catalog.register(FunctionId::Ascii, ascii);
    catalog.register(FunctionId::CharLength, char_length);
    catalog.register(FunctionId::Length, char_length);
    catalog.register(FunctionId::OctetLength, char_length);
    catalog.register(FunctionId::Chr, chr);
    catalog.register(FunctionId::Concat, concat);
    catalog.register(FunctionId::Index, index);
    catalog.register(FunctionId::Instr, index);
    catalog.register(FunctionId::Position, position);
    catalog.register(FunctionId::Initcap, source_shaped);
    catalog.register(FunctionId::Reverse, source_shaped);
    catalog.register(FunctionId::Translate, translate);
    catalog.register(FunctionId::Upper, case_fold);
    catalog.register(FunctionId::Lower, case_fold);
    catalog.register(FunctionId::Soundex, soundex);
    catalog.register(FunctionId::Left, side_take);
    catalog.register(FunctionId::Right, side_take);
    catalog.register(FunctionId::Lfill, lfill);
    catalog.register(FunctionId::Lpad, pad);
    catalog.register(FunctionId::Rpad, pad);
    catalog.register(FunctionId::Ltrim, trim);
    catalog.register(FunctionId::Rtrim, trim);
    catalog.register(FunctionId::Trim, trim);
    catalog.register(FunctionId::Mapchar, mapchar);
    catalog.register(FunctionId::Repeat, repeat);
    catalog.register(FunctionId::Replace, replace);
    catalog.register(FunctionId::Substr, substr);
}

fn varchar(length: u32) -> Resolution {
    Resolution::of(TypeDescriptor::with_length(TypeCode::VarChar, length))
}

/// Source length, with the fallback standing in for unknown lengths.
fn source_length(ty: &TypeDescriptor) -> u32 {
    if ty.length > 0 {
        ty.length
    } else {
        FALLBACK_STRING_LENGTH
    }
}

fn ascii(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(1))?;
    args.require_character(0)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Int)))
}

fn char_length(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(1))?;
    args.require_character(0)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Int)))
}

fn chr(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(1))?;
    args.require_numeric(0)?;
    Ok(varchar(1))
}

/// CONCAT's result length is the sum of its arguments' lengths; the result
/// is CHAR only when every argument is CHAR.
fn concat(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, None)?;
    let mut total = 0u32;
    let mut all_char = true;
    for i in 0..args.len() {
        let ty = args.require_character(i)?;
        total = total.saturating_add(source_length(&ty));
        if ty.code != TypeCode::Char {
            all_char = false;
        }
    }
    let code = if all_char {
        TypeCode::Char
    } else {
        TypeCode::VarChar
    };
    Ok(Resolution::of(TypeDescriptor::with_length(code, total)))
}

/// INDEX and INSTR share one rule: the two-argument form validates only the
/// strings, each extra argument adds a numeric position/occurrence check.
fn index(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(2, Some(4))?;
    args.require_character(0)?;
    args.require_character(1)?;
    if args.len() >= 3 {
        args.require_numeric(2)?;
    }
    if args.len() == 4 {
        args.require_numeric(3)?;
    }
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Int)))
}

fn position(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(2, Some(2))?;
    args.require_character(0)?;
    args.require_character(1)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Int)))
}

fn source_shaped(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(1))?;
    Ok(Resolution::of(args.require_character(0)?))
}

fn translate(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(3, Some(3))?;
    let source = args.require_character(0)?;
    args.require_character(1)?;
    args.require_character(2)?;
    Ok(Resolution::of(source))
}

/// UPPER and LOWER accept a numeric argument by rewriting it to an explicit
/// cast to VARCHAR, so the shards only ever see character input.
fn case_fold(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(1))?;
    let input = args.ty(0)?;
    if input.is_numeric() {
        let target = TypeDescriptor::with_length(TypeCode::VarChar, FALLBACK_STRING_LENGTH);
        let rewrite = Expression::cast(args.expr(0).clone(), target.clone());
        return Ok(Resolution::rewriting(target, vec![(0, rewrite)]));
    }
    Ok(Resolution::of(args.require_character(0)?))
}

fn soundex(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(1))?;
    args.require_character(0)?;
    Ok(varchar(4))
}

/// LEFT and RIGHT take at most their literal count, else the source length.
fn side_take(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(2, Some(2))?;
    let source = args.require_character(0)?;
    args.require_numeric(1)?;
    let length = args
        .literal_u32(1)
        .map(|n| n.min(source_length(&source)))
        .unwrap_or_else(|| source_length(&source));
    Ok(varchar(length))
}

/// LFILL(source, fill) keeps the source length; the three-argument form
/// fills up to a literal target width.
fn lfill(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(2, Some(3))?;
    let source = args.require_character(0)?;
    args.require_character(1)?;
    if args.len() == 3 {
        args.require_numeric(2)?;
        let length = args.literal_u32(2).unwrap_or(FALLBACK_STRING_LENGTH);
        return Ok(varchar(length));
    }
    Ok(varchar(source_length(&source)))
}

/// LPAD/RPAD result length is source + pad-unit * count; without a literal
/// count the fallback applies. The two-argument form pads with blanks.
fn pad(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(2, Some(3))?;
    let source = args.require_character(0)?;
    args.require_numeric(1)?;
    let pad_unit = if args.len() == 3 {
        source_length(&args.require_character(2)?)
    } else {
        1
    };
    let length = match args.literal_u32(1) {
        Some(count) => source_length(&source).saturating_add(pad_unit.saturating_mul(count)),
        None => FALLBACK_STRING_LENGTH,
    };
    Ok(varchar(length))
}

fn trim(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(2))?;
    let source = args.require_character(0)?;
    if args.len() == 2 {
        args.require_character(1)?;
    }
    Ok(varchar(source_length(&source)))
}

/// MAPCHAR's longer forms add a character count and a mapping id, neither of
/// which changes the result shape.
fn mapchar(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(3))?;
    let source = args.require_character(0)?;
    if args.len() >= 2 {
        args.require_numeric(1)?;
    }
    if args.len() == 3 {
        args.require_character(2)?;
    }
    Ok(varchar(source_length(&source)))
}

fn repeat(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(2, Some(2))?;
    let source = args.require_character(0)?;
    args.require_numeric(1)?;
    let length = match args.literal_u32(1) {
        Some(count) => source_length(&source).saturating_mul(count),
        None => FALLBACK_STRING_LENGTH,
    };
    Ok(varchar(length))
}

/// The two-argument form deletes every occurrence; with a replacement the
/// result is sized for the worst case of replacing every search hit.
fn replace(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(2, Some(3))?;
    let source = args.require_character(0)?;
    let search = args.require_character(1)?;
    let source_len = source_length(&source);
    if args.len() == 2 {
        return Ok(varchar(source_len));
    }
    let replacement = args.require_character(2)?;
    let unit = source_length(&search).max(1);
    let grown = source_len / unit * source_length(&replacement) + source_len % unit;
    Ok(varchar(source_len.max(grown)))
}

/// SUBSTR(source, start) runs to the end; the literal three-argument length
/// bounds the result.
fn substr(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(2, Some(3))?;
    let source = args.require_character(0)?;
    args.require_numeric(1)?;
    if args.len() == 3 {
        args.require_numeric(2)?;
        if let Some(length) = args.literal_u32(2) {
            return Ok(varchar(length.min(source_length(&source))));
        }
    }
    Ok(varchar(source_length(&source)))
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{chars, of, of_code, resolve};
    use crate::error::Error;
    use crate::expr::{ExprKind, Expression};
    use crate::types::{TypeCode, TypeDescriptor};

    #[test]
    fn concat_sums_argument_lengths() {
        let mut expr = Expression::function("CONCAT", vec![chars(5), chars(7)]);
        let ty = resolve(&mut expr).unwrap();
        assert_eq!(ty.code, TypeCode::VarChar);
        assert_eq!(ty.length, 12);

        let mut all_char = Expression::function(
            "CONCAT",
            vec![
                of(TypeDescriptor::with_length(TypeCode::Char, 5)),
                of(TypeDescriptor::with_length(TypeCode::Char, 7)),
            ],
        );
        assert_eq!(resolve(&mut all_char).unwrap().code, TypeCode::Char);
    }

    #[test]
    fn lpad_length_is_source_plus_pad_times_count() {
        let mut expr = Expression::function(
            "LPAD",
            vec![
                chars(5),
                Expression::constant("3"),
                of(TypeDescriptor::with_length(TypeCode::Char, 2)),
            ],
        );
        let ty = resolve(&mut expr).unwrap();
        assert_eq!(ty.length, 11);
    }

    #[test]
    fn lpad_without_literal_count_falls_back() {
        let mut expr = Expression::function("RPAD", vec![chars(5), of_code(TypeCode::Int)]);
        assert_eq!(resolve(&mut expr).unwrap().length, 256);
    }

    #[test]
    fn repeat_multiplies_source_length() {
        let mut expr =
            Expression::function("REPEAT", vec![chars(4), Expression::constant("3")]);
        assert_eq!(resolve(&mut expr).unwrap().length, 12);
    }

    #[test]
    fn oversized_literal_counts_saturate_instead_of_overflowing() {
        let mut repeated = Expression::function(
            "REPEAT",
            vec![chars(100), Expression::constant("4294967295")],
        );
        assert_eq!(resolve(&mut repeated).unwrap().length, u32::MAX);

        let mut padded = Expression::function(
            "LPAD",
            vec![chars(5), Expression::constant("4294967295"), chars(2)],
        );
        assert_eq!(resolve(&mut padded).unwrap().length, u32::MAX);
    }

    #[test]
    fn instr_arity_fallthrough() {
        for extra in 0..3 {
            let mut fn_args = vec![chars(10), chars(2)];
            for _ in 0..extra {
                fn_args.push(Expression::constant("1"));
            }
            let mut expr = Expression::function("INSTR", fn_args);
            assert_eq!(resolve(&mut expr).unwrap().code, TypeCode::Int);
        }

        let mut too_many = Expression::function(
            "INSTR",
            vec![
                chars(10),
                chars(2),
                Expression::constant("1"),
                Expression::constant("1"),
                Expression::constant("1"),
            ],
        );
        assert!(matches!(
            resolve(&mut too_many),
            Err(Error::IllegalParameter { .. })
        ));
    }

    #[test]
    fn substr_literal_length_bounds_the_result() {
        let mut expr = Expression::function(
            "SUBSTR",
            vec![chars(20), Expression::constant("2"), Expression::constant("5")],
        );
        assert_eq!(resolve(&mut expr).unwrap().length, 5);

        let mut open_ended =
            Expression::function("SUBSTR", vec![chars(20), Expression::constant("2")]);
        assert_eq!(resolve(&mut open_ended).unwrap().length, 20);
    }

    #[test]
    fn upper_of_numeric_is_rewritten_to_a_cast() {
        let mut expr = Expression::function("UPPER", vec![of_code(TypeCode::Int)]);
        let ty = resolve(&mut expr).unwrap();
        assert_eq!(ty.code, TypeCode::VarChar);
        match &expr.kind {
            ExprKind::Function(call) => match &call.args[0].kind {
                ExprKind::Function(inner) => {
                    assert_eq!(
                        inner.cast_target.as_ref().map(|t| t.code),
                        Some(TypeCode::VarChar)
                    );
                }
                other => panic!("expected cast rewrite, got {:?}", other),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn upper_of_character_keeps_its_shape() {
        let mut expr = Expression::function("LOWER", vec![chars(25)]);
        let ty = resolve(&mut expr).unwrap();
        assert_eq!(ty.code, TypeCode::VarChar);
        assert_eq!(ty.length, 25);
    }
}
