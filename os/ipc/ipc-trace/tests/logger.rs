use ipc_trace::{TRACE, TRACE_BUFFER_SIZE, TraceLogger};
use log::LevelFilter;

fn trace_text() -> String {
    let mut out = vec![0; TRACE_BUFFER_SIZE];
    let n = TRACE.snapshot(&mut out);
    out.truncate(n);
    String::from_utf8(out).unwrap()
}

#[test]
fn records_land_in_the_trace_buffer() {
    TraceLogger::new(LevelFilter::Debug).init().unwrap();
    assert!(TraceLogger::new(LevelFilter::Trace).init().is_err());

    log::info!(target: "vring", "vq{} placed at {:#x}", 0, 0x4_0000);
    log::trace!(target: "vring", "filtered out");
    ipc_trace::trace_write!("raw {}\n", 42);

    let text = trace_text();
    assert!(text.contains("[INFO] vring: vq0 placed at 0x40000\n"));
    assert!(!text.contains("filtered out"));
    assert!(text.ends_with("raw 42\n"));
}
