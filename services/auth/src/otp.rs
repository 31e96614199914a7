//! One-time code issuance and verification
//!
//! Codes live in Redis under `otp:{phone}` with an explicit TTL, never in
//! process memory, so any instance can verify a code issued by another.
//! Re-requesting a code overwrites the previous one (last writer wins),
//! and a successful verification deletes the key so a code is single-use.

use anyhow::Result;
use rand::Rng;
use tracing::info;

use common::cache::RedisPool;

/// How long an issued code stays valid, in seconds.
const OTP_TTL_SECONDS: u64 = 300;

fn otp_key(phone: &str) -> String {
    format!("otp:{}", phone)
}

/// Generate a random six-digit code.
pub fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", n)
}

/// OTP service over the Redis store
#[derive(Clone)]
pub struct OtpService {
    redis_pool: RedisPool,
}

impl OtpService {
    /// Create a new OTP service
    pub fn new(redis_pool: RedisPool) -> Self {
        Self { redis_pool }
    }

    /// Issue a code for a phone number and return the TTL.
    ///
    /// Real SMS delivery is out of scope; the code is written to the log
    /// so local clients can complete the flow.
    pub async fn issue(&self, phone: &str) -> Result<u64> {
        let code = generate_code();
        self.redis_pool
            .set(&otp_key(phone), &code, Some(OTP_TTL_SECONDS))
            .await?;

        // Stand-in for the SMS gateway.
        info!("OTP for {}: {}", phone, code);

        Ok(OTP_TTL_SECONDS)
    }

    /// Verify a code. Deletes the stored code on success so it cannot be
    /// replayed.
    pub async fn verify(&self, phone: &str, code: &str) -> Result<bool> {
        let stored = self.redis_pool.get(&otp_key(phone)).await?;

        match stored {
            Some(expected) if expected == code => {
                self.redis_pool.delete(&otp_key(phone)).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_is_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_otp_key_scoped_by_phone() {
        assert_eq!(otp_key("+919876543210"), "otp:+919876543210");
        assert_ne!(otp_key("+919876543210"), otp_key("+919876543211"));
    }
}
