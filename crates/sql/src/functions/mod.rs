//! SQL function catalog
//!
//! Maps every catalogued function id to a type rule. Rules validate
//! parameters (lazily, on demand), may rewrite a parameter in place with the
//! rewrite returned in `Resolution`, keeping the side effect visible in the
//! signature, and produce the call's result descriptor. Spatial functions
//! live in a second, structurally identical table. Ids with no built-in rule
//! fall back to configuration-driven user signatures.

mod aggregate;
mod conversion;
#[cfg(test)]
pub(crate) mod testutil;
mod custom;
pub(crate) mod datetime;
mod numeric;
mod spatial;
mod string;
mod system;

pub use datetime::{normalize_date, normalize_time, normalize_timestamp};

use crate::error::Result;
use crate::expr::resolve::Args;
use crate::expr::Expression;
use crate::types::TypeDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Fallback result length for string rules that cannot derive one from
/// their arguments.
pub(crate) const FALLBACK_STRING_LENGTH: u32 = 256;

/// The fixed vocabulary of catalogued function ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionId {
    // Aggregates
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Stddev,
    Variance,
    // Numeric
    Abs,
    Acos,
    Asin,
    Atan,
    Atan2,
    Ceil,
    Cos,
    Cosh,
    Cot,
    Degrees,
    Exp,
    Floor,
    Ln,
    Log,
    Log10,
    Mod,
    Pi,
    Power,
    Radians,
    Random,
    Round,
    Sign,
    Sin,
    Sinh,
    Sqrt,
    Tan,
    Tanh,
    Trunc,
    // String
    Ascii,
    CharLength,
    Chr,
    Concat,
    Index,
    Initcap,
    Instr,
    Left,
    Length,
    Lfill,
    Lower,
    Lpad,
    Ltrim,
    Mapchar,
    OctetLength,
    Position,
    Repeat,
    Replace,
    Reverse,
    Right,
    Rpad,
    Rtrim,
    Soundex,
    Substr,
    Translate,
    Trim,
    Upper,
    // Date/time
    AddMonths,
    Adddate,
    CurrentDate,
    CurrentTime,
    CurrentTimestamp,
    Date,
    Datediff,
    Day,
    Dayname,
    Dayofmonth,
    Dayofweek,
    Dayofyear,
    Extract,
    Hour,
    LastDay,
    Makedate,
    Microsecond,
    Minute,
    Month,
    Monthname,
    Now,
    Quarter,
    Second,
    Subdate,
    Time,
    Timediff,
    Timestamp,
    Timestampadd,
    Timestampdiff,
    Week,
    Year,
    // Conversion and conditionals
    Cast,
    Coalesce,
    Decode,
    Greatest,
    Ifnull,
    Least,
    Nullif,
    Nvl,
    ToChar,
    ToDate,
    ToNumber,
    ToTimestamp,
    Value,
    // System (coordinator-only)
    CurrentUser,
    User,
    SessionUser,
    Database,
    Version,
    // Spatial
    StArea,
    StAsText,
    StBoundary,
    StBuffer,
    StCentroid,
    StContains,
    StConvexHull,
    StCrosses,
    StDifference,
    StDimension,
    StDisjoint,
    StDistance,
    StEndPoint,
    StEnvelope,
    StEquals,
    StGeometryType,
    StGeomFromText,
    StIntersection,
    StIntersects,
    StIsClosed,
    StIsEmpty,
    StIsRing,
    StIsSimple,
    StIsValid,
    StLength,
    StMakeBox2d,
    StMakeBox3d,
    StNumGeometries,
    StNumPoints,
    StOverlaps,
    StPerimeter,
    StPointFromText,
    StPointN,
    StSrid,
    StStartPoint,
    StSymDifference,
    StTouches,
    StUnion,
    StWithin,
    StX,
    StY,
}

impl FunctionId {
    /// Look up an id by (case-insensitive) name, including the common
    /// synonyms the grammar folds together.
    pub fn from_name(name: &str) -> Option<FunctionId> {
        use FunctionId::*;
        let id = match name.to_uppercase().as_str() {
            "COUNT" => Count,
            "SUM" => Sum,
            "AVG" => Avg,
            "MIN" => Min,
            "MAX" => Max,
            "STDDEV" | "STDEV" => Stddev,
            "VARIANCE" => Variance,
            "ABS" => Abs,
            "ACOS" => Acos,
            "ASIN" => Asin,
            "ATAN" => Atan,
            "ATAN2" => Atan2,
            "CEIL" | "CEILING" => Ceil,
            "COS" => Cos,
            "COSH" => Cosh,
            "COT" => Cot,
            "DEGREES" => Degrees,
            "EXP" => Exp,
            "FLOOR" => Floor,
            "LN" => Ln,
            "LOG" => Log,
            "LOG10" => Log10,
            "MOD" => Mod,
            "PI" => Pi,
            "POWER" | "POW" => Power,
            "RADIANS" => Radians,
            "RANDOM" | "RAND" => Random,
            "ROUND" => Round,
            "SIGN" => Sign,
            "SIN" => Sin,
            "SINH" => Sinh,
            "SQRT" => Sqrt,
            "TAN" => Tan,
            "TANH" => Tanh,
            "TRUNC" | "TRUNCATE" => Trunc,
            "ASCII" => Ascii,
            "CHAR_LENGTH" | "CHARACTER_LENGTH" => CharLength,
            "CHR" => Chr,
            "CONCAT" => Concat,
            "INDEX" => Index,
            "INITCAP" => Initcap,
            "INSTR" => Instr,
            "LEFT" => Left,
            "LENGTH" => Length,
            "LFILL" => Lfill,
            "LOWER" => Lower,
            "LPAD" => Lpad,
            "LTRIM" => Ltrim,
            "MAPCHAR" => Mapchar,
            "OCTET_LENGTH" => OctetLength,
            "POSITION" => Position,
            "REPEAT" => Repeat,
            "REPLACE" => Replace,
            "REVERSE" => Reverse,
            "RIGHT" => Right,
            "RPAD" => Rpad,
            "RTRIM" => Rtrim,
            "SOUNDEX" => Soundex,
            "SUBSTR" | "SUBSTRING" => Substr,
            "TRANSLATE" => Translate,
            "TRIM" => Trim,
            "UPPER" | "UCASE" => Upper,
            "ADD_MONTHS" => AddMonths,
            "ADDDATE" => Adddate,
            "CURRENT_DATE" | "CURDATE" => CurrentDate,
            "CURRENT_TIME" | "CURTIME" => CurrentTime,
            "CURRENT_TIMESTAMP" => CurrentTimestamp,
            "DATE" => Date,
            "DATEDIFF" => Datediff,
            "DAY" => Day,
            "DAYNAME" => Dayname,
            "DAYOFMONTH" => Dayofmonth,
            "DAYOFWEEK" => Dayofweek,
            "DAYOFYEAR" => Dayofyear,
            "EXTRACT" => Extract,
            "HOUR" => Hour,
            "LAST_DAY" => LastDay,
            "MAKEDATE" => Makedate,
            "MICROSECOND" => Microsecond,
            "MINUTE" => Minute,
            "MONTH" => Month,
            "MONTHNAME" => Monthname,
            "NOW" => Now,
            "QUARTER" => Quarter,
            "SECOND" => Second,
            "SUBDATE" => Subdate,
            "TIME" => Time,
            "TIMEDIFF" => Timediff,
            "TIMESTAMP" => Timestamp,
            "TIMESTAMPADD" => Timestampadd,
            "TIMESTAMPDIFF" => Timestampdiff,
            "WEEK" => Week,
            "YEAR" => Year,
            "CAST" => Cast,
            "COALESCE" => Coalesce,
            "DECODE" => Decode,
            "GREATEST" => Greatest,
            "IFNULL" => Ifnull,
            "LEAST" => Least,
            "NULLIF" => Nullif,
            "NVL" => Nvl,
            "TO_CHAR" => ToChar,
            "TO_DATE" => ToDate,
            "TO_NUMBER" => ToNumber,
            "TO_TIMESTAMP" => ToTimestamp,
            "VALUE" => Value,
            "CURRENT_USER" => CurrentUser,
            "USER" => User,
            "SESSION_USER" => SessionUser,
            "DATABASE" => Database,
            "VERSION" => Version,
            "ST_AREA" => StArea,
            "ST_ASTEXT" => StAsText,
            "ST_BOUNDARY" => StBoundary,
            "ST_BUFFER" => StBuffer,
            "ST_CENTROID" => StCentroid,
            "ST_CONTAINS" => StContains,
            "ST_CONVEXHULL" => StConvexHull,
            "ST_CROSSES" => StCrosses,
            "ST_DIFFERENCE" => StDifference,
            "ST_DIMENSION" => StDimension,
            "ST_DISJOINT" => StDisjoint,
            "ST_DISTANCE" => StDistance,
            "ST_ENDPOINT" => StEndPoint,
            "ST_ENVELOPE" => StEnvelope,
            "ST_EQUALS" => StEquals,
            "ST_GEOMETRYTYPE" => StGeometryType,
            "ST_GEOMFROMTEXT" => StGeomFromText,
            "ST_INTERSECTION" => StIntersection,
            "ST_INTERSECTS" => StIntersects,
            "ST_ISCLOSED" => StIsClosed,
            "ST_ISEMPTY" => StIsEmpty,
            "ST_ISRING" => StIsRing,
            "ST_ISSIMPLE" => StIsSimple,
            "ST_ISVALID" => StIsValid,
            "ST_LENGTH" => StLength,
            "ST_MAKEBOX2D" => StMakeBox2d,
            "ST_MAKEBOX3D" => StMakeBox3d,
            "ST_NUMGEOMETRIES" => StNumGeometries,
            "ST_NUMPOINTS" => StNumPoints,
            "ST_OVERLAPS" => StOverlaps,
            "ST_PERIMETER" => StPerimeter,
            "ST_POINTFROMTEXT" => StPointFromText,
            "ST_POINTN" => StPointN,
            "ST_SRID" => StSrid,
            "ST_STARTPOINT" => StStartPoint,
            "ST_SYMDIFFERENCE" => StSymDifference,
            "ST_TOUCHES" => StTouches,
            "ST_UNION" => StUnion,
            "ST_WITHIN" => StWithin,
            "ST_X" => StX,
            "ST_Y" => StY,
            _ => return None,
        };
        Some(id)
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            FunctionId::Count
                | FunctionId::Sum
                | FunctionId::Avg
                | FunctionId::Min
                | FunctionId::Max
                | FunctionId::Stddev
                | FunctionId::Variance
        )
    }

    /// Functions whose value is fixed once on the coordinator and rendered
    /// as a literal, so every shard sees the same value.
    pub fn is_coordinator_only(&self) -> bool {
        matches!(
            self,
            FunctionId::CurrentDate
                | FunctionId::CurrentTime
                | FunctionId::CurrentTimestamp
                | FunctionId::Now
                | FunctionId::CurrentUser
                | FunctionId::User
                | FunctionId::SessionUser
                | FunctionId::Database
                | FunctionId::Version
        )
    }
}

/// Outcome of a type rule. `rewrites` lists parameters the rule replaced;
/// the catalog applies them to the call before the result type is attached,
/// and later stages assume the rewritten tree.
#[derive(Debug)]
pub struct Resolution {
    pub ty: TypeDescriptor,
    pub rewrites: Vec<(usize, Expression)>,
}

impl Resolution {
    pub fn of(ty: TypeDescriptor) -> Self {
        Self {
            ty,
            rewrites: Vec::new(),
        }
    }

    pub fn rewriting(ty: TypeDescriptor, rewrites: Vec<(usize, Expression)>) -> Self {
        Self { ty, rewrites }
    }
}

pub(crate) type RuleFn = fn(&mut Args<'_, '_>) -> Result<Resolution>;

/// Dispatch table from function id to type rule.
pub struct FunctionCatalog {
    rules: HashMap<FunctionId, RuleFn>,
}

impl FunctionCatalog {
    fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    pub(crate) fn register(&mut self, id: FunctionId, rule: RuleFn) {
        self.rules.insert(id, rule);
    }

    fn get(&self, id: FunctionId) -> Option<RuleFn> {
        self.rules.get(&id).copied()
    }
}

static SQL_RULES: LazyLock<FunctionCatalog> = LazyLock::new(|| {
    let mut catalog = FunctionCatalog::new();
    aggregate::register(&mut catalog);
    numeric::register(&mut catalog);
    string::register(&mut catalog);
    datetime::register(&mut catalog);
    conversion::register(&mut catalog);
    system::register(&mut catalog);
    catalog
});

static SPATIAL_RULES: LazyLock<FunctionCatalog> = LazyLock::new(|| {
    let mut catalog = FunctionCatalog::new();
    spatial::register(&mut catalog);
    catalog
});

/// Resolve one function call: built-in SQL rule, else spatial rule, else a
/// configuration-driven user signature.
pub(crate) fn resolve_call(args: &mut Args<'_, '_>) -> Result<Resolution> {
    if let Some(id) = args.id {
        if let Some(rule) = SQL_RULES.get(id) {
            return rule(args);
        }
        if let Some(rule) = SPATIAL_RULES.get(id) {
            return rule(args);
        }
    }
    custom::resolve(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_lookup_and_synonyms() {
        assert_eq!(FunctionId::from_name("sum"), Some(FunctionId::Sum));
        assert_eq!(FunctionId::from_name("CEILING"), Some(FunctionId::Ceil));
        assert_eq!(FunctionId::from_name("SUBSTRING"), Some(FunctionId::Substr));
        assert_eq!(FunctionId::from_name("no_such_fn"), None);
    }

    #[test]
    fn aggregate_and_coordinator_classification() {
        assert!(FunctionId::Count.is_aggregate());
        assert!(!FunctionId::Abs.is_aggregate());
        assert!(FunctionId::Now.is_coordinator_only());
        assert!(FunctionId::Version.is_coordinator_only());
        assert!(!FunctionId::Sum.is_coordinator_only());
    }
}
