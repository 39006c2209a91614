//! Example: issuing and checking SMS verification codes
//!
//! Builds the cache from configuration (memory store unless
//! `VCODE__CACHE__CACHE_TYPE=redis`), then walks through the cooldown,
//! a wrong guess, a successful verification and a replay.
//!
//! Run with: cargo run --example verification_cache_demo -p vc_infra

use anyhow::Result;
use rand::Rng;
use tracing::info;
use vc_core::errors::CodeCacheError;
use vc_core::services::CodeCache;
use vc_shared::phone::mask_phone_number;

/// Generate a 6-digit verification code
fn generate_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(100000..1000000);
    code.to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cache = vc_infra::initialize(std::env::args().nth(1).as_deref()).await?;

    let biz = "login";
    let phone = "13800138000";
    let code = generate_code();

    cache.set(biz, phone, &code).await?;
    info!(phone = %mask_phone_number(phone), "Code issued");

    match cache.set(biz, phone, &generate_code()).await {
        Err(CodeCacheError::CodeSendTooMany) => info!("Second request rejected by cooldown"),
        other => info!(result = ?other, "Unexpected result for second request"),
    }

    let wrong = if code == "000000" { "111111" } else { "000000" };
    let accepted = cache.verify(biz, phone, wrong).await?;
    let remaining = cache.remaining_attempts(biz, phone).await?;
    info!(accepted, ?remaining, "Wrong code submitted");

    let accepted = cache.verify(biz, phone, &code).await?;
    info!(accepted, "Correct code submitted");

    match cache.verify(biz, phone, &code).await {
        Err(CodeCacheError::CodeVerifyTooManyTimes) => info!("Replay rejected"),
        other => info!(result = ?other, "Unexpected replay result"),
    }

    cache.clear(biz, phone).await?;
    Ok(())
}
