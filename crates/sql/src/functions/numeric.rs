//! Numeric function type rules

use super::{FunctionCatalog, FunctionId, Resolution};
use crate::error::Result;
use crate::expr::resolve::Args;
use crate::expr::Expression;
use crate::types::{TypeCode, TypeDescriptor};
use rust_decimal::Decimal;

pub(super) fn register(catalog: &mut FunctionCatalog) {
    catalog.register(FunctionId::Abs, shape_preserving);
    catalog.register(FunctionId::Ceil, shape_preserving);
    catalog.register(FunctionId::Floor, shape_preserving);
    catalog.register(FunctionId::Trunc, truncate);
    catalog.register(FunctionId::Round, round);
    catalog.register(FunctionId::Sign, sign);
    catalog.register(FunctionId::Mod, modulo);
    catalog.register(FunctionId::Pi, pi);
    catalog.register(FunctionId::Random, random);
    catalog.register(FunctionId::Acos, double_unary);
    catalog.register(FunctionId::Asin, double_unary);
    catalog.register(FunctionId::Atan, double_unary);
    catalog.register(FunctionId::Cos, double_unary);
    catalog.register(FunctionId::Cosh, double_unary);
    catalog.register(FunctionId::Cot, double_unary);
    catalog.register(FunctionId::Sin, double_unary);
    catalog.register(FunctionId::Sinh, double_unary);
    catalog.register(FunctionId::Tan, double_unary);
    catalog.register(FunctionId::Tanh, double_unary);
    catalog.register(FunctionId::Exp, double_unary);
    catalog.register(FunctionId::Ln, double_unary);
    catalog.register(FunctionId::Log10, double_unary);
    catalog.register(FunctionId::Sqrt, double_unary);
    catalog.register(FunctionId::Degrees, double_unary);
    catalog.register(FunctionId::Radians, double_unary);
    catalog.register(FunctionId::Log, double_binary);
    catalog.register(FunctionId::Atan2, double_binary);
    catalog.register(FunctionId::Power, double_binary);
}

/// ABS, CEIL and FLOOR keep their input's descriptor.
fn shape_preserving(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(1))?;
    Ok(Resolution::of(args.require_numeric(0)?))
}

fn truncate(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(2))?;
    let ty = args.require_numeric(0)?;
    if args.len() == 2 {
        args.require_numeric(1)?;
    }
    Ok(Resolution::of(ty))
}

/// ROUND over a numeric keeps its input; ROUND over a date yields DATE and
/// accepts a unit parameter that is passed through to the shard without
/// validation.
fn round(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(2))?;
    let input = args.ty(0)?;
    if input.is_date_time() {
        return Ok(Resolution::of(TypeDescriptor::new(TypeCode::Date)));
    }
    let ty = args.require_numeric(0)?;
    if args.len() == 2 {
        args.require_numeric(1)?;
    }
    Ok(Resolution::of(ty))
}

fn sign(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(1))?;
    args.require_numeric(0)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Int)))
}

/// MOD over exact numerics merges its inputs. An inexact operand is rewritten
/// to an explicit cast to NUMERIC so every shard performs exact division; the
/// rewrite is surfaced through the resolution. A literal zero divisor is
/// rejected outright.
fn modulo(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(2, Some(2))?;
    let mut left = args.require_numeric(0)?;
    let mut right = args.require_numeric(1)?;

    if let Some(text) = args.literal_text(1) {
        if let Ok(divisor) = text.parse::<Decimal>() {
            if divisor.is_zero() {
                return Err(args.illegal("modulus is zero"));
            }
        }
    }

    let mut rewrites = Vec::new();
    for (index, ty) in [(0, &mut left), (1, &mut right)] {
        if matches!(ty.code, TypeCode::Float | TypeCode::Double) {
            let target = TypeDescriptor::new(TypeCode::Numeric);
            rewrites.push((
                index,
                Expression::cast(args.expr(index).clone(), target.clone()),
            ));
            *ty = target;
        }
    }
    let merged = TypeDescriptor::merge_numeric(&left, &right)?;
    Ok(Resolution::rewriting(merged, rewrites))
}

fn pi(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(0, Some(0))?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Float)))
}

fn random(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(0, Some(0))?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Double)))
}

fn double_unary(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(1))?;
    args.require_numeric(0)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Double)))
}

fn double_binary(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(2, Some(2))?;
    args.require_numeric(0)?;
    args.require_numeric(1)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Double)))
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{of, of_code, resolve};
    use crate::error::Error;
    use crate::expr::{ExprKind, Expression};
    use crate::types::{TypeCode, TypeDescriptor};

    #[test]
    fn abs_preserves_numeric_shape() {
        let mut expr = Expression::function("ABS", vec![of(TypeDescriptor::numeric(10, 2))]);
        let ty = resolve(&mut expr).unwrap();
        assert_eq!(ty.code, TypeCode::Numeric);
        assert_eq!(ty.precision, 10);
        assert_eq!(ty.scale, 2);
    }

    #[test]
    fn trig_returns_double() {
        let mut expr = Expression::function("SIN", vec![of_code(TypeCode::Int)]);
        assert_eq!(resolve(&mut expr).unwrap().code, TypeCode::Double);
    }

    #[test]
    fn pi_is_float() {
        let mut expr = Expression::function("PI", vec![]);
        assert_eq!(resolve(&mut expr).unwrap().code, TypeCode::Float);
    }

    #[test]
    fn mod_of_exact_inputs_merges() {
        let mut expr = Expression::function(
            "MOD",
            vec![of_code(TypeCode::BigInt), of_code(TypeCode::Int)],
        );
        assert_eq!(resolve(&mut expr).unwrap().code, TypeCode::BigInt);
    }

    #[test]
    fn mod_rewrites_inexact_operand_to_numeric_cast() {
        let mut expr = Expression::function(
            "MOD",
            vec![of_code(TypeCode::Double), of_code(TypeCode::Int)],
        );
        assert_eq!(resolve(&mut expr).unwrap().code, TypeCode::Numeric);
        match &expr.kind {
            ExprKind::Function(call) => match &call.args[0].kind {
                ExprKind::Function(inner) => {
                    assert_eq!(
                        inner.cast_target.as_ref().map(|t| t.code),
                        Some(TypeCode::Numeric)
                    );
                }
                other => panic!("expected cast rewrite, got {:?}", other),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn mod_rejects_literal_zero_divisor() {
        let mut expr = Expression::function(
            "MOD",
            vec![of_code(TypeCode::Int), Expression::constant("0")],
        );
        assert!(matches!(
            resolve(&mut expr),
            Err(Error::IllegalParameter { .. })
        ));
    }

    #[test]
    fn round_over_a_date_is_date_and_ignores_the_unit() {
        let mut expr = Expression::function(
            "ROUND",
            vec![of_code(TypeCode::Date), Expression::constant("no_such_unit")],
        );
        assert_eq!(resolve(&mut expr).unwrap().code, TypeCode::Date);
    }

    #[test]
    fn round_over_numeric_validates_the_scale_parameter() {
        let mut expr = Expression::function(
            "ROUND",
            vec![of_code(TypeCode::Numeric), of_code(TypeCode::VarChar)],
        );
        assert!(matches!(
            resolve(&mut expr),
            Err(Error::TypeMismatch { .. })
        ));
    }
}
