//! Configuration-registered user functions
//!
//! Functions outside both built-in tables resolve against the configuration:
//! overloads are registered under (name, index) with consecutive indices, and
//! the first overload whose arity and parameter classes match wins.

use super::Resolution;
use crate::error::Result;
use crate::expr::resolve::Args;

pub(super) fn resolve(args: &mut Args<'_, '_>) -> Result<Resolution> {
    let mut types = Vec::with_capacity(args.len());
    for i in 0..args.len() {
        types.push(args.ty(i)?);
    }

    let mut index = 0u32;
    loop {
        let signature = match args.config().custom_function(args.name(), index) {
            Some(signature) => signature.clone(),
            None => break,
        };
        let matches = signature.param_count() == types.len()
            && signature
                .param_classes
                .iter()
                .zip(&types)
                .all(|(class, ty)| ty.is_null() || class.matches(ty));
        if matches {
            return Ok(Resolution::of(signature.return_type));
        }
        index += 1;
    }

    if index > 0 {
        return Err(args.illegal(format!(
            "no overload of {} accepts these {} parameters",
            args.name(),
            types.len()
        )));
    }
    Err(args.illegal("unknown function"))
}
