use crate::core::{AdminError, Result, Role, User};

/// bcrypt cost for the built-in accounts.
///
/// The directory is rebuilt on every start, so the cost stays moderate.
const HASH_COST: u32 = 8;

/// A known account
#[derive(Debug, Clone)]
struct Account {
    username: String,
    password_hash: String,
    role: Role,
}

impl Account {
    fn user(&self) -> User {
        User::new(self.username.clone(), self.role)
    }
}

/// Hardcoded credential list for the console gate
///
/// This is a convenience gate for a local tool, not a trust boundary.
#[derive(Debug, Clone)]
pub struct CredentialDirectory {
    accounts: Vec<Account>,
}

impl CredentialDirectory {
    /// The two stock accounts: `admin/admin123` and `user/user123`.
    pub fn builtin() -> Result<Self> {
        Self::with_accounts(&[
            ("admin", "admin123", Role::Admin),
            ("user", "user123", Role::User),
        ])
    }

    /// Creates a directory from `(username, password, role)` triples
    pub fn with_accounts(accounts: &[(&str, &str, Role)]) -> Result<Self> {
        let mut built = Vec::with_capacity(accounts.len());
        for (username, password, role) in accounts {
            Self::validate_username(username)?;
            if built.iter().any(|a: &Account| a.username == *username) {
                return Err(AdminError::Validation(format!(
                    "User '{}' already exists",
                    username
                )));
            }
            built.push(Account {
                username: username.to_string(),
                password_hash: Self::hash_password(password)?,
                role: *role,
            });
        }
        Ok(Self { accounts: built })
    }

    /// Hashes a password using bcrypt
    fn hash_password(password: &str) -> Result<String> {
        bcrypt::hash(password, HASH_COST)
            .map_err(|e| AdminError::Validation(format!("Failed to hash password: {}", e)))
    }

    /// Verifies password against bcrypt hash
    fn verify_password(password: &str, hash: &str) -> bool {
        bcrypt::verify(password, hash).unwrap_or(false)
    }

    /// Authenticates a user
    pub fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        let account = self
            .accounts
            .iter()
            .find(|a| a.username == username)
            .ok_or(AdminError::InvalidCredentials)?;

        if !Self::verify_password(password, &account.password_hash) {
            return Err(AdminError::InvalidCredentials);
        }

        Ok(account.user())
    }

    /// Returns a sorted list of all usernames
    pub fn list_users(&self) -> Vec<String> {
        let mut usernames: Vec<String> = self.accounts.iter().map(|a| a.username.clone()).collect();
        usernames.sort();
        usernames
    }

    fn validate_username(username: &str) -> Result<()> {
        if username.is_empty() {
            return Err(AdminError::Validation("Username cannot be empty".into()));
        }

        if username.len() > 50 {
            return Err(AdminError::Validation(
                "Username too long (max 50 characters)".into(),
            ));
        }

        Ok(())
    }
}
