/// bcrypt-backed password hashing.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, plaintext: &str) -> Result<String, bcrypt::BcryptError> {
        bcrypt::hash(plaintext, self.cost)
    }

    /// `false` on mismatch and on a stored hash bcrypt cannot parse.
    pub fn verify(&self, plaintext: &str, hashed: &str) -> bool {
        match bcrypt::verify(plaintext, hashed) {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!("stored password hash is unreadable: {}", e);
                false
            }
        }
    }

    /// [`hash`](Self::hash) on the blocking pool.
    pub async fn hash_blocking(&self, plaintext: String) -> anyhow::Result<String> {
        let hasher = *self;
        let hashed = tokio::task::spawn_blocking(move || hasher.hash(&plaintext)).await??;
        Ok(hashed)
    }

    /// [`verify`](Self::verify) on the blocking pool.
    pub async fn verify_blocking(&self, plaintext: String, hashed: String) -> anyhow::Result<bool> {
        let hasher = *self;
        let ok = tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &hashed)).await?;
        Ok(ok)
    }
}
