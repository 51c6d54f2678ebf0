use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use avaproof::proof::verify_proof;
use avaproof::validation::AmountWeight;
use avaproof::{build_proof, MemoryLedger, PrivateKey, Proof, ProofValidator, StakeDescriptor, ValidatorConfig};

fn descriptors(count: usize) -> Vec<StakeDescriptor> {
    let rng = &mut StdRng::seed_from_u64(count as u64);
    (0..count)
        .map(|vout| {
            let mut txid = [0u8; 32];
            rng.fill_bytes(&mut txid);
            StakeDescriptor {
                txid,
                vout: vout as i64,
                amount: Some(1_000_000),
                height: 100,
                is_coinbase: false,
                private_key: "5a".repeat(32),
            }
        })
        .collect()
}

fn master() -> PrivateKey {
    PrivateKey::from_bytes(&[0x5b; 32]).expect("valid key")
}

fn sample(count: usize) -> Proof {
    build_proof(0, 0, master(), &descriptors(count)).expect("valid proof")
}

fn build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for count in [1, 10, 100] {
        let stakes = descriptors(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &stakes, |b, stakes| {
            b.iter(|| build_proof(0, 0, master(), stakes).expect("valid proof"))
        });
    }
    group.finish();
}

fn verify(c: &mut Criterion) {
    let mut group = c.benchmark_group("verify");
    for count in [1, 10, 100] {
        let proof = sample(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &proof, |b, proof| {
            b.iter(|| verify_proof(proof).expect("valid proof"))
        });
    }
    group.finish();
}

fn validate_cached(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let proof = sample(10);
    let bytes = proof.to_bytes();

    let validator = rt.block_on(async {
        let ledger = Arc::new(MemoryLedger::new());
        ledger.insert_matching(proof.stakes().iter().map(|s| &s.stake)).await;
        let validator = ProofValidator::new(
            ledger,
            Arc::new(AmountWeight::default()),
            ValidatorConfig::default(),
        );
        validator.validate(&bytes, 0).await.expect("valid proof");
        validator
    });

    c.bench_function("validate_cached_10", |b| {
        b.to_async(&rt)
            .iter(|| async { validator.validate(&bytes, 0).await.expect("valid proof") })
    });
}

criterion_group!(benches, build, verify, validate_cached);
criterion_main!(benches);
