//! Read-only access to PHP data files
//!
//! Nextcloud keeps its configuration (`config/config.php`) and version
//! descriptor (`version.php`) as PHP scripts assigning array literals to
//! global variables. This module locates such an assignment and parses the
//! literal without executing anything.
//!
//! - literal.rs: literal parser and `PhpValue`

pub mod literal;

pub use literal::{PhpKey, PhpLiteralError, PhpValue};

use literal::LiteralParser;

/// Find `$<variable> = <literal>;` in `source` and parse the literal.
///
/// Occurrences inside comments and string literals are ignored. Returns
/// `Ok(None)` when the variable is never assigned.
pub fn extract_assignment(
    source: &str,
    variable: &str,
) -> Result<Option<PhpValue>, PhpLiteralError> {
    let mut parser = LiteralParser::new(source, 0);
    if !parser.seek_assignment(variable)? {
        return Ok(None);
    }

    let value = parser.parse_value()?;
    parser.expect_statement_end()?;
    Ok(Some(value))
}
