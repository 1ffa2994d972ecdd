//! rsuseragent 并发解析压测
//! Tokio + Semaphore 控制并发度，解析在阻塞线程池中执行
//!
//! 运行命令：
//! cargo run --release --example concurrent_demo

use std::sync::Arc;
use std::time::Instant;

use rsuseragent::{global_analyzer, init_global_analyzer, AnalyzerConfig};
use tokio::sync::Semaphore;

const CONCURRENT_LEVEL: usize = 64;
const BATCH_PER_WORKER: usize = 500;

const SAMPLES: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64; rv:89.0) Gecko/20100101 Firefox/89.0",
    "Mozilla/5.0 (Linux; Android 11; Pixel 5) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.120 Mobile Safari/537.36",
    "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // 缓存关闭，测的是分析本身
    let config = AnalyzerConfig::builder().disable_cache().build();
    init_global_analyzer(config)?;
    println!(
        "✅ 并发压测开始 | 并发度 = {}, 总请求数 = {}",
        CONCURRENT_LEVEL,
        CONCURRENT_LEVEL * BATCH_PER_WORKER
    );

    let semaphore = Arc::new(Semaphore::new(CONCURRENT_LEVEL));
    let start = Instant::now();
    let mut handles = Vec::with_capacity(CONCURRENT_LEVEL);
    for worker in 0..CONCURRENT_LEVEL {
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let analyzer = global_analyzer()?;
            let mut robots = 0usize;
            for i in 0..BATCH_PER_WORKER {
                let record = analyzer.parse(SAMPLES[(worker + i) % SAMPLES.len()]);
                if record.value("DeviceClass") == Some("Robot") {
                    robots += 1;
                }
            }
            Ok::<usize, rsuseragent::UserAgentError>(robots)
        }));
    }

    let mut robots = 0usize;
    for handle in handles {
        robots += handle.await??;
    }

    let elapsed = start.elapsed();
    let total = CONCURRENT_LEVEL * BATCH_PER_WORKER;
    println!(
        "✅ 完成 {} 次解析 | 耗时 {:.3} 秒 | QPS {:.0} | Robot {}",
        total,
        elapsed.as_secs_f64(),
        total as f64 / elapsed.as_secs_f64(),
        robots
    );
    Ok(())
}
