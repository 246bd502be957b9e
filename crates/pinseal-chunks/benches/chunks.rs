use pinseal_chunks::{build_tree, chunk_content_defined, chunk_fixed, hash_bytes, ChunkSizes};

fn make_data(size: usize) -> Vec<u8> {
    // Semi-realistic data: repeating pattern with some entropy
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

#[divan::bench(args = [1024, 65536, 1048576, 10485760])]
fn fastcdc_chunk(bencher: divan::Bencher, size: usize) {
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| chunk_content_defined(divan::black_box(&data), ChunkSizes::SMALL).unwrap());
}

#[divan::bench(args = [1024, 65536, 1048576, 10485760])]
fn blake3_hash(bencher: divan::Bencher, size: usize) {
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| hash_bytes(divan::black_box(&data)));
}

#[divan::bench(args = [16, 256, 4096])]
fn merkle_build(bencher: divan::Bencher, leaves: usize) {
    let data = make_data(leaves * 1024);
    let chunks: Vec<&[u8]> = data.chunks(1024).collect();
    bencher.bench(|| build_tree(divan::black_box(&chunks)));
}

#[divan::bench(args = [1048576, 10485760])]
fn full_pipeline(bencher: divan::Bencher, size: usize) {
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            let chunks = chunk_fixed(divan::black_box(&data), 64 * 1024).unwrap();
            let slices: Vec<&[u8]> = chunks.iter().map(|c| c.data(&data)).collect();
            build_tree(&slices).root()
        });
}

fn main() {
    divan::main();
}
