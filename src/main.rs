//! Circular - Demo & Throughput Driver
//!
//! Menjalankan N producer dan M consumer di atas satu `Circular` queue,
//! dengan packet yang di-recycle lewat `Pool`, lalu pipeline chunk
//! (ranged read) yang dialirkan lewat queue yang sama.
//!
//! Usage:
//!   cargo run --release -- [OPTIONS]

use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use circular::chunk::{Chunk, ChunkFetcher, FetchError, MemoryStore};
use circular::core::{Capacity, CapacityError, Circular};
use circular::pool::{Pool, Reset};
use circular::trace::init_tracing;
use tracing::{debug, info};

/// Demo configuration
#[derive(Debug, Clone)]
struct DemoConfig {
    capacity: Capacity,
    producers: usize,
    consumers: usize,
    items: u64,
    payload_size: usize,
    chunks: u64,
    chunk_size: u64,
    verbose: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            capacity: Capacity::new(1024),
            producers: 4,
            consumers: 4,
            items: 1_000_000,
            payload_size: 64,
            chunks: 256,
            chunk_size: 4096,
            verbose: false,
        }
    }
}

/// Packet yang dialirkan producer -> consumer
///
/// Queue memindahkan struct ini; buffer `payload` tidak pernah di-copy
/// dan dipakai ulang lewat pool.
#[derive(Debug, Default)]
struct Packet {
    producer: usize,
    sequence: u64,
    payload: Vec<u8>,
}

impl Reset for Packet {
    fn reset(&mut self) {
        self.producer = 0;
        self.sequence = 0;
        self.payload.clear();
    }
}

/// Statistik demo
struct DemoStats {
    pushed: AtomicU64,
    popped: AtomicU64,
    bytes: AtomicU64,
    out_of_order: AtomicU64,
}

impl DemoStats {
    fn new() -> Self {
        Self {
            pushed: AtomicU64::new(0),
            popped: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            out_of_order: AtomicU64::new(0),
        }
    }

    fn print_report(&self, config: &DemoConfig, duration: Duration) {
        let pushed = self.pushed.load(Ordering::Relaxed);
        let popped = self.popped.load(Ordering::Relaxed);
        let bytes = self.bytes.load(Ordering::Relaxed);
        let out_of_order = self.out_of_order.load(Ordering::Relaxed);

        let per_op_ns = duration.as_nanos() as f64 / popped.max(1) as f64;

        println!("  Capacity:      {}", config.capacity);
        println!(
            "  Threads:       {} producers / {} consumers",
            config.producers, config.consumers
        );
        println!("  Pushed:        {}", pushed);
        println!("  Popped:        {}", popped);
        println!("  Payload:       {} KB", bytes / 1024);
        println!("  Duration:      {:.2} ms", duration.as_secs_f64() * 1000.0);
        println!("  Latency:       {:.2} ns/op", per_op_ns);
        println!(
            "  Throughput:    {:.2} M ops/sec",
            popped as f64 / duration.as_secs_f64() / 1_000_000.0
        );

        if out_of_order > 0 {
            println!("  Out of order:  {} ⚠️", out_of_order);
        }
    }
}

fn run_queue_demo(config: &DemoConfig) -> Result<Arc<DemoStats>, CapacityError> {
    println!("📊 Circular Queue (MPMC, blocking)");
    println!("----------------------------------");

    let queue: Arc<Circular<Packet>> =
        Arc::new(Circular::try_with_capacity(config.capacity)?);
    let pool = Arc::new(Pool::new(Packet::default));
    let stats = Arc::new(DemoStats::new());

    let start = Instant::now();

    let producers: Vec<_> = (0..config.producers)
        .map(|id| {
            let queue = Arc::clone(&queue);
            let pool = Arc::clone(&pool);
            let stats = Arc::clone(&stats);
            // Sisa pembagian diberikan ke producer pertama
            let share = config.items / config.producers as u64
                + if id == 0 {
                    config.items % config.producers as u64
                } else {
                    0
                };
            let payload_size = config.payload_size;

            thread::spawn(move || {
                for sequence in 0..share {
                    let mut packet = pool.get();
                    packet.producer = id;
                    packet.sequence = sequence;
                    packet.payload.resize(payload_size, (sequence & 0xff) as u8);

                    if queue.push(packet).is_err() {
                        debug!(producer = id, "queue closed, producer stopping");
                        return;
                    }
                    stats.pushed.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..config.consumers)
        .map(|_| {
            let queue = Arc::clone(&queue);
            let pool = Arc::clone(&pool);
            let stats = Arc::clone(&stats);
            let producers = config.producers;

            thread::spawn(move || {
                // Per producer, sequence yang dilihat consumer ini harus naik
                let mut last_seen = vec![None::<u64>; producers];

                // Pop sampai queue closed DAN kosong
                while let Ok(packet) = queue.pop() {
                    if let Some(prev) = last_seen[packet.producer] {
                        if packet.sequence <= prev {
                            stats.out_of_order.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    last_seen[packet.producer] = Some(packet.sequence);

                    stats
                        .bytes
                        .fetch_add(packet.payload.len() as u64, Ordering::Relaxed);
                    stats.popped.fetch_add(1, Ordering::Relaxed);
                    pool.put(packet);
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().ok();
    }
    // Semua producer selesai - consumer drain sisa lalu berhenti
    queue.close();
    for consumer in consumers {
        consumer.join().ok();
    }

    let duration = start.elapsed();
    stats.print_report(config, duration);
    info!(pooled = pool.idle(), "queue demo finished");

    Ok(stats)
}

/// Chunk pipeline: producer memulai fetch, consumer menunggu hasil
fn run_chunk_demo(config: &DemoConfig) -> Result<u64, FetchError> {
    println!("\n📊 Chunk Pipeline (ranged read through queue)");
    println!("---------------------------------------------");

    let object_size = config.chunks * config.chunk_size;
    let object: Vec<u8> = (0..object_size).map(|i| (i % 251) as u8).collect();

    let store = MemoryStore::new();
    store.insert("demo", "object.bin", object);
    let fetcher = ChunkFetcher::new(store);

    // Kapasitas kecil membatasi jumlah read yang berjalan bersamaan
    let queue: Arc<Circular<Chunk>> = Arc::new(Circular::new(8));

    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let result = drain_chunks(&queue);
            // Consumer berhenti lebih awal: lepaskan producer yang block
            queue.close();
            result
        })
    };

    let start = Instant::now();
    for i in 0..config.chunks {
        let offset = i * config.chunk_size;
        let chunk = fetcher.fetch("demo", "object.bin", offset, config.chunk_size)?;
        if queue.push(chunk).is_err() {
            break;
        }
    }
    queue.close();

    let total = match consumer.join() {
        Ok(result) => result?,
        Err(_) => return Err(FetchError::WorkerPanicked),
    };
    let duration = start.elapsed();

    println!("  Chunks:        {}", config.chunks);
    println!("  Bytes:         {} KB", total / 1024);
    println!("  Duration:      {:.2} ms", duration.as_secs_f64() * 1000.0);
    println!("  Buffers idle:  {}", fetcher.buffer_pool().idle());

    Ok(total)
}

fn drain_chunks(queue: &Circular<Chunk>) -> Result<u64, FetchError> {
    let mut total = 0u64;
    while let Ok(chunk) = queue.pop() {
        let data = chunk.wait()?;
        let first = (chunk.range().offset() % 251) as u8;
        if data.first() != Some(&first) {
            eprintln!("⚠️ Corrupt chunk at {}", chunk.range());
        }
        total += data.len() as u64;
    }
    Ok(total)
}

fn parse_count(flag: &str, value: Option<&String>) -> Result<u64, String> {
    value
        .ok_or_else(|| format!("{} requires a value", flag))?
        .parse()
        .map_err(|_| format!("{} expects a non-negative integer", flag))
}

fn parse_args() -> Result<DemoConfig, String> {
    let args: Vec<String> = std::env::args().collect();
    let mut config = DemoConfig::default();

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match args[i].as_str() {
            "--capacity" | "-c" => {
                let raw = value.ok_or("--capacity requires a value")?;
                config.capacity = raw
                    .parse()
                    .map_err(|e: CapacityError| e.to_string())?;
                i += 1;
            }
            "--producers" | "-p" => {
                config.producers = parse_count(&args[i], value)? as usize;
                i += 1;
            }
            "--consumers" => {
                config.consumers = parse_count(&args[i], value)? as usize;
                i += 1;
            }
            "--items" | "-n" => {
                config.items = parse_count(&args[i], value)?;
                i += 1;
            }
            "--payload" => {
                config.payload_size = parse_count(&args[i], value)? as usize;
                i += 1;
            }
            "--chunks" => {
                config.chunks = parse_count(&args[i], value)?;
                i += 1;
            }
            "--chunk-size" => {
                config.chunk_size = parse_count(&args[i], value)?;
                i += 1;
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--help" | "-h" => {
                println!("Circular - Blocking Bounded Queue Demo\n");
                println!("Usage: circular [OPTIONS]\n");
                println!("Options:");
                println!("  -c, --capacity <N>     Queue capacity, 0 = unbounded (default: 1024)");
                println!("  -p, --producers <N>    Producer threads (default: 4)");
                println!("      --consumers <N>    Consumer threads (default: 4)");
                println!("  -n, --items <N>        Packets to push (default: 1000000)");
                println!("      --payload <BYTES>  Payload size per packet (default: 64)");
                println!("      --chunks <N>       Chunks in the ranged-read demo (default: 256)");
                println!("      --chunk-size <B>   Bytes per chunk (default: 4096)");
                println!("  -v, --verbose          Debug logging (RUST_LOG overrides)");
                println!("  -h, --help             Show this help");
                process::exit(0);
            }
            other => return Err(format!("unknown option {:?}", other)),
        }
        i += 1;
    }

    if config.producers == 0 || config.consumers == 0 {
        return Err("--producers and --consumers must be at least 1".to_string());
    }
    if config.chunk_size == 0 {
        return Err("--chunk-size must be at least 1".to_string());
    }

    Ok(config)
}

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            process::exit(2);
        }
    };

    init_tracing(config.verbose);
    debug!(?config, "starting");

    println!("🚀 Circular - Blocking Bounded Queue");
    println!("====================================\n");

    let stats = match run_queue_demo(&config) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("❌ {}", e);
            process::exit(2);
        }
    };
    let popped = stats.popped.load(Ordering::Relaxed);
    if popped != config.items {
        eprintln!("❌ Lost packets: pushed {}, popped {}", config.items, popped);
        process::exit(1);
    }

    if config.chunks > 0 {
        if let Err(e) = run_chunk_demo(&config) {
            eprintln!("❌ Chunk pipeline error: {}", e);
            process::exit(1);
        }
    }

    println!("\n✅ Done!");
}
