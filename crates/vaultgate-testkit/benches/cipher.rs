//! Content cipher and key wrapping throughput.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use vaultgate::perms::{ContentCipher, KeyPairIssuer, KeyWrapper};

const SIZES: &[usize] = &[1024, 64 * 1024, 1024 * 1024];

fn bench_encrypt(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_encrypt");
    let key = ContentCipher::generate_key();

    for &size in SIZES {
        let data = vec![0x5Au8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| black_box(ContentCipher::encrypt(data.clone(), &key)))
        });
    }
    group.finish();
}

fn bench_decrypt(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_decrypt");
    let key = ContentCipher::generate_key();

    for &size in SIZES {
        let sealed = match ContentCipher::encrypt(vec![0x5Au8; size], &key) {
            Ok(sealed) => sealed,
            Err(e) => panic!("encrypt failed: {e}"),
        };
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &sealed, |b, sealed| {
            b.iter(|| {
                black_box(ContentCipher::decrypt(
                    &sealed.ciphertext,
                    &key,
                    &sealed.iv,
                    &sealed.tag,
                ))
            })
        });
    }
    group.finish();
}

fn bench_wrap(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_wrap");
    let key = ContentCipher::generate_key();
    let recipient = KeyPairIssuer::generate_key_pair();

    group.bench_function("wrap", |b| {
        b.iter(|| black_box(KeyWrapper::wrap(&key, &recipient.public)))
    });

    let wrapped = match KeyWrapper::wrap(&key, &recipient.public) {
        Ok(wrapped) => wrapped,
        Err(e) => panic!("wrap failed: {e}"),
    };
    group.bench_function("unwrap", |b| {
        b.iter(|| black_box(KeyWrapper::unwrap(&wrapped, &recipient.secret)))
    });
    group.finish();
}

criterion_group!(benches, bench_encrypt, bench_decrypt, bench_wrap);
criterion_main!(benches);
