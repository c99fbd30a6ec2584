/// Failure taxonomy for the authentication core. The HTTP layer maps these
/// onto status codes; nothing here ever echoes a password or token value.
#[derive(Debug)]
pub enum AuthError {
    /// Unknown username or wrong password. Deliberately merged so callers
    /// cannot enumerate accounts.
    InvalidCredentials,
    /// Signup with a username that is already taken.
    DuplicateUser,
    /// changePassword with a non-matching current password.
    InvalidOldPassword,
    /// Bearer token with a bad signature or the wrong shape.
    TokenInvalid,
    /// Bearer token that is genuine but past its expiry.
    TokenExpired,
    /// Internal-only: a lookup that the caller expected to succeed missed.
    UserNotFound,
    /// Request failed an input constraint (blank field, short password, ...).
    Validation(String),
    Internal(String),
    Database(sqlx::Error),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid username or password"),
            AuthError::DuplicateUser => write!(f, "Username is already taken"),
            AuthError::InvalidOldPassword => write!(f, "Current password is incorrect"),
            AuthError::TokenInvalid => write!(f, "Invalid token"),
            AuthError::TokenExpired => write!(f, "Token expired"),
            AuthError::UserNotFound => write!(f, "User not found"),
            AuthError::Validation(msg) => write!(f, "Validation failed: {msg}"),
            AuthError::Internal(msg) => write!(f, "Internal error: {msg}"),
            AuthError::Database(err) => write!(f, "Database error: {err}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Database(err)
    }
}
