use ulid::Ulid;

#[derive(Debug)]
pub enum EngineError {
    /// Missing or malformed request fields, enumerated by name.
    Validation(Vec<&'static str>),
    /// The requested slot is already held by the named booking.
    Conflict(Ulid),
    NotFound(Ulid),
    /// A blackout rule violating the recurring/one-off shape invariant.
    InvalidRule(&'static str),
    LimitExceeded(&'static str),
    WalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Validation(fields) => {
                write!(f, "missing or invalid fields: {}", fields.join(", "))
            }
            EngineError::Conflict(id) => write!(f, "slot already taken (booking {id})"),
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::InvalidRule(msg) => write!(f, "invalid blackout rule: {msg}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
