//! Aggregate function type rules
//!
//! SUM and AVG widen their input so accumulation cannot overflow the input
//! type; BOOLEAN is accepted and promoted to INT even though it is not a
//! member of the numeric class.

use super::{FunctionCatalog, FunctionId, Resolution};
use crate::error::{Error, Result};
use crate::expr::resolve::Args;
use crate::types::{TypeCode, TypeDescriptor};

pub(super) fn register(catalog: &mut FunctionCatalog) {
    catalog.register(FunctionId::Count, count);
    catalog.register(FunctionId::Sum, sum);
    catalog.register(FunctionId::Avg, avg);
    catalog.register(FunctionId::Min, passthrough);
    catalog.register(FunctionId::Max, passthrough);
    catalog.register(FunctionId::Stddev, deviation);
    catalog.register(FunctionId::Variance, deviation);
}

fn count(args: &mut Args<'_, '_>) -> Result<Resolution> {
    // COUNT(*) arrives without arguments.
    args.require_arity(0, Some(1))?;
    if !args.is_empty() {
        args.ty(0)?;
    }
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::BigInt)))
}

fn sum(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(1))?;
    let input = args.ty(0)?;
    let code = match input.code {
        TypeCode::Boolean => TypeCode::Int,
        TypeCode::SmallInt | TypeCode::Int => TypeCode::BigInt,
        TypeCode::BigInt | TypeCode::Numeric => TypeCode::Numeric,
        TypeCode::Float => TypeCode::Float,
        TypeCode::Double => TypeCode::Double,
        TypeCode::Null => TypeCode::Null,
        _ => return Err(Error::mismatch("a summable type", input)),
    };
    let mut ty = TypeDescriptor::new(code);
    if input.code == TypeCode::Numeric {
        ty.precision = input.precision;
        ty.scale = input.scale;
    }
    Ok(Resolution::of(ty))
}

fn avg(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(1))?;
    let input = args.ty(0)?;
    let code = match input.code {
        TypeCode::Boolean => TypeCode::Int,
        TypeCode::SmallInt | TypeCode::Int | TypeCode::BigInt | TypeCode::Numeric => {
            TypeCode::Numeric
        }
        TypeCode::Float | TypeCode::Double => TypeCode::Double,
        TypeCode::Null => TypeCode::Null,
        _ => return Err(Error::mismatch("an averageable type", input)),
    };
    let mut ty = TypeDescriptor::new(code);
    if input.code == TypeCode::Numeric {
        ty.precision = input.precision;
        ty.scale = input.scale;
    }
    Ok(Resolution::of(ty))
}

/// MIN and MAX return whatever they are given.
fn passthrough(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(1))?;
    Ok(Resolution::of(args.ty(0)?))
}

fn deviation(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(1))?;
    let input = args.require_numeric(0)?;
    let code = if input.is_exact_numeric() {
        TypeCode::Numeric
    } else {
        TypeCode::Double
    };
    Ok(Resolution::of(TypeDescriptor::new(code)))
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{of_code, resolve};
    use crate::error::Error;
    use crate::expr::Expression;
    use crate::types::TypeCode;

    fn agg(name: &str, code: TypeCode) -> TypeCode {
        let mut expr = Expression::function(name, vec![of_code(code)]);
        resolve(&mut expr).unwrap().code
    }

    #[test]
    fn sum_widens_per_input() {
        assert_eq!(agg("SUM", TypeCode::SmallInt), TypeCode::BigInt);
        assert_eq!(agg("SUM", TypeCode::Int), TypeCode::BigInt);
        assert_eq!(agg("SUM", TypeCode::BigInt), TypeCode::Numeric);
        assert_eq!(agg("SUM", TypeCode::Numeric), TypeCode::Numeric);
        assert_eq!(agg("SUM", TypeCode::Float), TypeCode::Float);
        assert_eq!(agg("SUM", TypeCode::Double), TypeCode::Double);
    }

    #[test]
    fn boolean_promotes_to_int_under_sum_and_avg() {
        assert_eq!(agg("SUM", TypeCode::Boolean), TypeCode::Int);
        assert_eq!(agg("AVG", TypeCode::Boolean), TypeCode::Int);
    }

    #[test]
    fn avg_of_exact_input_is_numeric() {
        assert_eq!(agg("AVG", TypeCode::Int), TypeCode::Numeric);
        assert_eq!(agg("AVG", TypeCode::Double), TypeCode::Double);
    }

    #[test]
    fn min_max_pass_input_through() {
        assert_eq!(agg("MIN", TypeCode::Date), TypeCode::Date);
        assert_eq!(agg("MAX", TypeCode::VarChar), TypeCode::VarChar);
    }

    #[test]
    fn count_is_bigint_and_sum_rejects_dates() {
        let mut count = Expression::function("COUNT", vec![]);
        assert_eq!(resolve(&mut count).unwrap().code, TypeCode::BigInt);

        let mut bad = Expression::function("SUM", vec![of_code(TypeCode::Date)]);
        assert!(matches!(resolve(&mut bad), Err(Error::TypeMismatch { .. })));
    }
}
