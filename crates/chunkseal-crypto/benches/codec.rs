use chunkseal_crypto::{decode, encode, Decoder, Encoder};

const KEY: [u8; 32] = [0xAB; 32];

fn make_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

#[divan::bench(args = [1024, 65536, 1048576, 8388608])]
fn bench_encode(bencher: divan::Bencher, size: usize) {
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| encode(divan::black_box(data.as_slice()), divan::black_box(&KEY)).unwrap());
}

#[divan::bench(args = [1024, 65536, 1048576, 8388608])]
fn bench_decode(bencher: divan::Bencher, size: usize) {
    let data = make_data(size);
    let encrypted = encode(data.as_slice(), &KEY).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| decode(divan::black_box(encrypted.as_slice()), divan::black_box(&KEY)).unwrap());
}

#[divan::bench(args = [1048576, 8388608])]
fn bench_encode_parallel(bencher: divan::Bencher, size: usize) {
    let encoder = Encoder::new(&KEY).unwrap();
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| encoder.encode_parallel(divan::black_box(data.as_slice()), 0).unwrap());
}

#[divan::bench(args = [1048576, 8388608])]
fn bench_decode_parallel(bencher: divan::Bencher, size: usize) {
    let decoder = Decoder::new(&KEY).unwrap();
    let encrypted = encode(make_data(size).as_slice(), &KEY).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| decoder.decode_parallel(divan::black_box(encrypted.as_slice()), 0).unwrap());
}

fn main() {
    divan::main();
}
