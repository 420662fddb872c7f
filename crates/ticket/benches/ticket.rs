use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tls_ticket::{
    cipher, fixtures, CertificateRegistry, ObfuscatedClientSessionState, SessionState,
    TicketConfig, TrailingData,
};

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("ticket");

    let registry = CertificateRegistry::new();
    let state = fixtures::client_state_tls13(&registry);
    let keys = [fixtures::ticket_key(1), fixtures::ticket_key(2)];
    let ticket = cipher::encrypt(&state.encode().unwrap(), &keys[1..]).unwrap();

    group.bench_function("seal", |b| {
        b.iter(|| cipher::encrypt(&black_box(&state).encode().unwrap(), &keys).unwrap())
    });
    group.bench_function("open", |b| {
        b.iter(|| {
            let plaintext = cipher::decrypt(black_box(&ticket), &keys).unwrap();
            SessionState::decode(&plaintext, &registry, TrailingData::RequireZeros).unwrap()
        })
    });

    let config = TicketConfig::default();
    group.bench_function("forge", |b| {
        b.iter(|| ObfuscatedClientSessionState::new(black_box(&[42u8; 32]), &config).unwrap())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
