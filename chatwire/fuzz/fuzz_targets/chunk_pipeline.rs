#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First byte picks the chunk size so splits land everywhere.
    let Some((&size, body)) = data.split_first() else {
        return;
    };
    let size = usize::from(size).max(1);

    let mut pipeline = chatwire::ChunkPipeline::new(4096);
    for chunk in body.chunks(size) {
        if pipeline.ingest(chunk).is_err() {
            return;
        }
    }
    let _ = pipeline.finish();
});
