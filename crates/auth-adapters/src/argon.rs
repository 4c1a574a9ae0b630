//! Argon2id implementation of `CredentialHasher`.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use domains::{CredentialHasher, HashError};

/// Memory cost for new digests, in KiB.
pub const ARGON2_M_COST_KIB: u32 = 19_456;
/// Iterations for new digests.
pub const ARGON2_T_COST: u32 = 2;
/// Lanes for new digests.
pub const ARGON2_P_COST: u32 = 1;

pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Hasher using the compiled-in cost.
    pub fn new() -> Result<Self, HashError> {
        Self::with_cost(ARGON2_M_COST_KIB, ARGON2_T_COST, ARGON2_P_COST)
    }

    /// Custom cost. Verification always honours the parameters embedded in the
    /// stored digest, so this only affects digests produced by `hash`.
    pub fn with_cost(m_cost_kib: u32, t_cost: u32, p_cost: u32) -> Result<Self, HashError> {
        let params = Params::new(m_cost_kib, t_cost, p_cost, None)
            .map_err(|e| HashError(format!("invalid argon2 parameters: {e}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| HashError(e.to_string()))
    }

    fn verify(&self, plain: &str, digest: &str) -> bool {
        let parsed_hash = match PasswordHash::new(digest) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "stored password digest is unreadable");
                return false;
            }
        };
        Argon2::default()
            .verify_password(plain.as_bytes(), &parsed_hash)
            .is_ok()
    }
}
