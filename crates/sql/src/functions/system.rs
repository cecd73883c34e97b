//! Session/system function type rules
//!
//! All of these are coordinator-only: their values come from the session
//! context at render time, never from a shard.

use super::{FunctionCatalog, FunctionId, Resolution};
use crate::error::Result;
use crate::expr::resolve::Args;
use crate::types::{TypeCode, TypeDescriptor};

pub(super) fn register(catalog: &mut FunctionCatalog) {
    catalog.register(FunctionId::CurrentUser, session_string);
    catalog.register(FunctionId::User, session_string);
    catalog.register(FunctionId::SessionUser, session_string);
    catalog.register(FunctionId::Database, session_string);
    catalog.register(FunctionId::Version, session_string);
}

fn session_string(args: &mut Args<'_, '_>) -> Result<Resolution> {
    args.require_arity(0, Some(0))?;
    Ok(Resolution::of(TypeDescriptor::with_length(
        TypeCode::VarChar,
        128,
    )))
}

#[cfg(test)]
mod tests {
    use super::super::testutil::resolve;
    use crate::error::Error;
    use crate::expr::Expression;
    use crate::types::TypeCode;

    #[test]
    fn session_functions_are_varchar_and_nullary() {
        for name in ["CURRENT_USER", "USER", "SESSION_USER", "DATABASE", "VERSION"] {
            let mut expr = Expression::function(name, vec![]);
            assert_eq!(resolve(&mut expr).unwrap().code, TypeCode::VarChar);
        }

        let mut bad = Expression::function("DATABASE", vec![Expression::constant("1")]);
        assert!(matches!(
            resolve(&mut bad),
            Err(Error::IllegalParameter { .. })
        ));
    }
}
