//! rsuseragent 内置规则解析演示
//! 1. 加载内置规则库并执行规则自带的测试用例
//! 2. 逐条解析示例 User-Agent，输出字段表 / JSON / 测试用例片段
//!
//! 运行命令：
//! cargo run --example analyze_demo --features="embedded-rules"

use std::error::Error;
use std::time::Instant;

use env_logger::{Builder, Env, Target};
use rsuseragent::{AnalyzerConfig, UserAgentAnalyzer};

const SAMPLES: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 14_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)",
    "'; DROP TABLE users; --",
];

fn main() -> Result<(), Box<dyn Error>> {
    // ========== 1. 日志系统初始化 ==========
    Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stdout)
        .init();

    // ========== 2. 初始化分析器 ==========
    let start = Instant::now();
    let analyzer = UserAgentAnalyzer::new(AnalyzerConfig::embedded())?;
    println!(
        "✅ 分析器初始化完成 | 耗时 {:.3} 毫秒 | 字段数 {}",
        start.elapsed().as_secs_f64() * 1000.0,
        analyzer.all_possible_field_names().len()
    );

    // ========== 3. 规则自检 ==========
    let report = analyzer.run_test_cases();
    print!("{}", report);

    // ========== 4. 逐条解析 ==========
    for ua in SAMPLES {
        let start = Instant::now();
        let record = analyzer.parse(ua);
        println!("\n==================== 解析结果 ({:.3} 毫秒) ====================", start.elapsed().as_secs_f64() * 1000.0);
        print!("{}", record);
        println!("📊 JSON:\n{}", record.to_json_pretty()?);
        println!("🧪 测试用例:\n{}", serde_json::to_string_pretty(&record.to_test_case())?);
    }

    // 第二轮全部命中缓存
    for ua in SAMPLES {
        analyzer.parse(ua);
    }
    println!("\n📦 缓存统计: {:?}", analyzer.cache_stats());

    Ok(())
}
