/// Error code registry for patternflow
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 2000-2999: Constraint errors
/// - 3000-3999: Template and pattern errors
/// - 4000-4999: Execution errors
/// - 5000-5999: Pipeline definition errors
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_PARSE_ERROR: u16 = 1002;
    pub const CONFIG_TOOL_ROOT_UNSET: u16 = 1003;
    pub const CONFIG_TOOL_ROOT_MISSING: u16 = 1004;

    // Constraint errors (2000-2999)
    pub const CONSTRAINT_NOT_FOUND: u16 = 2001;
    pub const CONSTRAINT_EMPTY: u16 = 2002;
    pub const CONSTRAINT_EXTRA: u16 = 2003;
    pub const CONSTRAINT_EMPTY_OVERWRITE: u16 = 2004;
    pub const CONSTRAINT_INVALID_STRING: u16 = 2005;

    // Template and pattern errors (3000-3999)
    pub const TEMPLATE_INVALID: u16 = 3001;
    pub const PATTERN_MISMATCH: u16 = 3002;
    pub const PATTERN_NOT_FOUND: u16 = 3003;
    pub const PATTERN_BAD_COMBINATION: u16 = 3004;

    // Execution errors (4000-4999)
    pub const EXEC_BAD_RETURN: u16 = 4001;
    pub const EXEC_PROCESS: u16 = 4002;
    pub const EXEC_IO: u16 = 4003;

    // Pipeline definition errors (5000-5999)
    pub const PIPELINE_INVALID: u16 = 5001;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        1000 => "Generic configuration error",
        1001 => "Configuration file not found",
        1002 => "Failed to parse configuration",
        1003 => "External tool root path is not set",
        1004 => "External tool root path does not exist",

        2001 => "Referenced constraint does not exist",
        2002 => "Mandatory constraint resolved to no values",
        2003 => "Supplied constraint matches no template field",
        2004 => "Attempt to overwrite a constraint with no values",
        2005 => "Malformed constraint string",

        3001 => "Malformed path template",
        3002 => "Discovered path does not match its template",
        3003 => "Requested path layout does not exist",
        3004 => "Destination and layout cannot be combined",

        4001 => "Batch script exited with a non-zero status",
        4002 => "Failed to launch a subprocess",
        4003 => "IO failure while preparing or running a batch script",

        5001 => "Invalid pipeline definition",

        _ => "Unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_code_is_described() {
        let codes = [
            ErrorCode::CONFIG_GENERIC,
            ErrorCode::CONFIG_NOT_FOUND,
            ErrorCode::CONFIG_PARSE_ERROR,
            ErrorCode::CONFIG_TOOL_ROOT_UNSET,
            ErrorCode::CONFIG_TOOL_ROOT_MISSING,
            ErrorCode::CONSTRAINT_NOT_FOUND,
            ErrorCode::CONSTRAINT_EMPTY,
            ErrorCode::CONSTRAINT_EXTRA,
            ErrorCode::CONSTRAINT_EMPTY_OVERWRITE,
            ErrorCode::CONSTRAINT_INVALID_STRING,
            ErrorCode::TEMPLATE_INVALID,
            ErrorCode::PATTERN_MISMATCH,
            ErrorCode::PATTERN_NOT_FOUND,
            ErrorCode::PATTERN_BAD_COMBINATION,
            ErrorCode::EXEC_BAD_RETURN,
            ErrorCode::EXEC_PROCESS,
            ErrorCode::EXEC_IO,
            ErrorCode::PIPELINE_INVALID,
        ];

        for code in codes {
            assert_ne!(describe_error_code(code), "Unknown error", "code {code}");
        }
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(describe_error_code(42), "Unknown error");
    }
}
