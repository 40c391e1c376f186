//! OpenStreetMap account credentials read from a password file.

use std::fmt;
use std::io::Read;

use camino::Utf8Path;

use super::CredentialsError;

/// Username and password used for HTTP basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Construct credentials from their parts.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Parse the first line of a password file, formatted `user:password`.
    ///
    /// The password may itself contain colons.
    ///
    /// # Examples
    /// ```
    /// use catfix_data::api::Credentials;
    ///
    /// let credentials = Credentials::parse("mapper:s3:cret\n").expect("valid line");
    /// assert_eq!(credentials.username(), "mapper");
    /// assert_eq!(credentials.password(), "s3:cret");
    /// assert!(Credentials::parse("nobody\n").is_none());
    /// ```
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let line = text.lines().next()?.trim_end_matches('\r');
        let (username, password) = line.split_once(':')?;
        if username.is_empty() || password.is_empty() {
            return None;
        }
        Some(Self::new(username, password))
    }

    /// Read and parse a password file.
    ///
    /// # Errors
    /// Returns [`CredentialsError`] when the file cannot be read or its first
    /// line is not `user:password`.
    pub fn from_file(path: &Utf8Path) -> Result<Self, CredentialsError> {
        let read_error = |source| CredentialsError::Read {
            source,
            path: path.to_path_buf(),
        };
        let mut text = String::new();
        catfix_fs::open_utf8_file(path)
            .and_then(|mut file| file.read_to_string(&mut text))
            .map_err(read_error)?;
        Self::parse(&text).ok_or_else(|| CredentialsError::Malformed {
            path: path.to_path_buf(),
        })
    }

    /// Account name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Account password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
