//! Avalanche Proof Demo
//!
//! Builds a proof, validates it against an in-memory ledger, and walks
//! through caching, supersession and the RPC surface.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use avaproof::{
    build_proof,
    rpc::RpcHandler,
    validation::{AmountWeight, Offer, PeerProofs, ProofValidator, ValidatorConfig},
    MemoryLedger, PrivateKey, StakeDescriptor, VERSION,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Avalanche Proof v{}", VERSION);

    let config = ValidatorConfig::from_env();
    info!(
        "Lookup timeout: {:?}, cache capacity: {}",
        config.lookup_timeout, config.cache_capacity
    );

    let ledger = Arc::new(MemoryLedger::new());
    let validator = ProofValidator::new(ledger.clone(), Arc::new(AmountWeight::default()), config);

    demo_proofs(&ledger, &validator).await?;
    demo_rpc(&ledger, validator).await?;

    Ok(())
}

fn stake(vout: i64, amount: i64) -> StakeDescriptor {
    StakeDescriptor {
        txid: [0x11; 32],
        vout,
        amount: Some(amount),
        height: 100,
        is_coinbase: false,
        private_key: "22".repeat(32),
    }
}

/// Build, validate, resubmit and supersede.
async fn demo_proofs(ledger: &MemoryLedger, validator: &ProofValidator) -> Result<()> {
    info!("=== Building Proofs ===");

    let master_hex = "33".repeat(32);
    let stakes = [stake(0, 50_000_000), stake(1, 25_000_000)];

    let first = build_proof(1, 0, PrivateKey::from_hex(&master_hex)?, &stakes)?;
    let second = build_proof(2, 0, PrivateKey::from_hex(&master_hex)?, &stakes)?;
    info!("Proof #1: {} ({} bytes)", first.id(), first.to_bytes().len());
    info!("Proof #2: {} ({} bytes)", second.id(), second.to_bytes().len());

    ledger.insert_matching(first.stakes().iter().map(|s| &s.stake)).await;

    info!("=== Validating ===");
    let now = chrono::Utc::now().timestamp();
    let accepted = validator.validate(&first.to_bytes(), now).await?;
    info!("Accepted {} with weight {}", accepted.id(), accepted.weight);

    validator.validate(&first.to_bytes(), now).await?;
    let stats = validator.stats();
    info!(
        "Resubmission: {} validation run(s), {} cache hit(s), {} signature check(s)",
        stats.validations, stats.cache_hits, stats.signature_checks
    );

    info!("=== Supersession ===");
    let mut peers = PeerProofs::new();
    peers.offer(accepted);
    let replacement = validator.validate_now(&second.to_bytes()).await?;
    match peers.offer(replacement) {
        Offer::Replaced { superseded } => info!("Sequence 2 superseded {}", superseded),
        other => warn!("Unexpected offer result: {:?}", other),
    }
    info!("Peers: {}, total weight: {}", peers.len(), peers.total_weight());

    Ok(())
}

/// Drive the JSON methods.
async fn demo_rpc(ledger: &MemoryLedger, validator: ProofValidator) -> Result<()> {
    info!("=== RPC ===");

    let handler = RpcHandler::new(validator);
    let now = chrono::Utc::now().timestamp();

    let master = PrivateKey::from_hex(&"44".repeat(32))?.public_key().to_hex();
    let request = json!({
        "method": "buildavalancheproof",
        "params": [0, 0, master, [{
            "txid": "55".repeat(32),
            "vout": 0,
            "amount": 10_000_000,
            "height": 10,
            "iscoinbase": true,
            "privatekey": "66".repeat(32),
        }], "44".repeat(32)],
    });
    let response = handler.handle_json(&request.to_string(), now).await;
    let proof_hex = response
        .result
        .as_ref()
        .and_then(|v| v.as_str())
        .context("buildavalancheproof returned no proof")?
        .to_owned();
    info!("buildavalancheproof -> {}...", &proof_hex[..32.min(proof_hex.len())]);

    let request = json!({"method": "decodeavalancheproof", "params": {"proof": proof_hex}});
    let response = handler.handle_json(&request.to_string(), now).await;
    info!("decodeavalancheproof -> {}", response.to_json()?);

    // Not in the ledger yet
    let request = json!({"method": "verifyavalancheproof", "params": {"proof": proof_hex}});
    let response = handler.handle_json(&request.to_string(), now).await;
    info!("verifyavalancheproof -> {}", response.to_json()?);

    let proof = avaproof::Proof::from_hex(&proof_hex)?;
    ledger.insert_matching(proof.stakes().iter().map(|s| &s.stake)).await;
    let response = handler.handle_json(&request.to_string(), now).await;
    info!("verifyavalancheproof -> {}", response.to_json()?);

    let bad = json!({
        "method": "buildavalancheproof",
        "params": [0, 0, master, [{
            "txid": "55".repeat(32),
            "vout": -1,
            "amount": 10_000_000,
            "height": 10,
            "privatekey": "66".repeat(32),
        }], "44".repeat(32)],
    });
    let response = handler.handle_json(&bad.to_string(), now).await;
    info!("buildavalancheproof (bad vout) -> {}", response.to_json()?);

    Ok(())
}
