//! Spatial function type rules
//!
//! A second dispatch table, consulted only after the SQL table misses.
//! Results fall into a small fixed set: GEOMETRY, BOX2D, BOX3D, FLOAT,
//! BOOLEAN, INT and VARCHAR.

use super::{FunctionCatalog, FunctionId, Resolution};
use crate::error::Result;
use crate::expr::resolve::Args;
use crate::types::{TypeCode, TypeDescriptor};

pub(super) fn register(catalog: &mut FunctionCatalog) {
    use FunctionId::*;
    for id in [StArea, StLength, StPerimeter, StX, StY] {
        catalog.register(id, measure);
    }
    catalog.register(StDistance, distance);
    for id in [StIsClosed, StIsEmpty, StIsRing, StIsSimple, StIsValid] {
        catalog.register(id, unary_predicate);
    }
    for id in [
        StContains, StCrosses, StDisjoint, StEquals, StIntersects, StOverlaps, StTouches,
        StWithin,
    ] {
        catalog.register(id, binary_predicate);
    }
    for id in [StDimension, StNumGeometries, StNumPoints, StSrid] {
        catalog.register(id, count);
    }
    for id in [StBoundary, StCentroid, StConvexHull, StEndPoint, StStartPoint] {
        catalog.register(id, geometry);
    }
    for id in [StDifference, StIntersection, StSymDifference, StUnion] {
        catalog.register(id, combine);
    }
    for id in [StBuffer, StPointN] {
        catalog.register(id, derive_at);
    }
    catalog.register(StEnvelope, envelope);
    catalog.register(StMakeBox2d, make_box2d);
    catalog.register(StMakeBox3d, make_box3d);
    catalog.register(StGeomFromText, from_text);
    catalog.register(StPointFromText, from_text);
    catalog.register(StAsText, as_text);
    catalog.register(StGeometryType, geometry_type);
}

/// Validate exactly `geoms` geometry operands.
fn spatial_args(args: &mut Args<'_, '_>, geoms: usize) -> Result<()> {
    args.require_arity(geoms, Some(geoms))?;
    for i in 0..geoms {
        args.require_spatial(i)?;
    }
    Ok(())
}

fn measure(args: &mut Args<'_, '_>) -> Result<Resolution> {
    spatial_args(args, 1)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Float)))
}

fn distance(args: &mut Args<'_, '_>) -> Result<Resolution> {
    spatial_args(args, 2)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Float)))
}

fn unary_predicate(args: &mut Args<'_, '_>) -> Result<Resolution> {
    spatial_args(args, 1)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Boolean)))
}

fn binary_predicate(args: &mut Args<'_, '_>) -> Result<Resolution> {
    spatial_args(args, 2)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Boolean)))
}

fn count(args: &mut Args<'_, '_>) -> Result<Resolution> {
    spatial_args(args, 1)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Int)))
}

fn geometry(args: &mut Args<'_, '_>) -> Result<Resolution> {
    spatial_args(args, 1)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Geometry)))
}

fn combine(args: &mut Args<'_, '_>) -> Result<Resolution> {
    spatial_args(args, 2)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Geometry)))
}

/// ST_BUFFER and ST_POINTN pair a geometry with a numeric radius/ordinal.
fn derive_at(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(2, Some(2))?;
    args.require_spatial(0)?;
    args.require_numeric(1)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Geometry)))
}

fn envelope(args: &mut Args<'_, '_>) -> Result<Resolution> {
    spatial_args(args, 1)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Box2d)))
}

fn make_box2d(args: &mut Args<'_, '_>) -> Result<Resolution> {
    spatial_args(args, 2)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Box2d)))
}

fn make_box3d(args: &mut Args<'_, '_>) -> Result<Resolution> {
    spatial_args(args, 2)?;
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Box3d)))
}

/// WKT constructors take the text and an optional SRID.
fn from_text(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(1, Some(2))?;
    args.require_character(0)?;
    if args.len() == 2 {
        args.require_numeric(1)?;
    }
    Ok(Resolution::of(TypeDescriptor::new(TypeCode::Geometry)))
}

fn as_text(args: &mut Args<'_, '_>) -> Result<Resolution> {
    spatial_args(args, 1)?;
    Ok(Resolution::of(TypeDescriptor::with_length(
        TypeCode::VarChar,
        256,
    )))
}

fn geometry_type(args: &mut Args<'_, '_>) -> Result<Resolution> {
    spatial_args(args, 1)?;
    Ok(Resolution::of(TypeDescriptor::with_length(
        TypeCode::VarChar,
        64,
    )))
}
