/// 日志工具模块
///
/// 提供日志初始化和批处理过程中的格式化输出
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化全局日志
///
/// 设置了 `RUST_LOG` 时以它为准，否则按 `verbose` 选择 `debug` 或 `info`。
/// 重复调用是安全的：已有全局 subscriber 时直接返回。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录批次开始信息
///
/// # 参数
/// - `total`: 发票总数
pub fn log_batch_start(total: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 开始批量处理发票");
    info!("📄 共 {} 张，逐张依次提取", total);
    info!("{}", "=".repeat(60));
}

/// 记录单张发票开始处理
pub fn log_item_start(position: usize, total: usize, file_name: &str) {
    info!("\n{}", "─".repeat(60));
    info!("📋 [{}/{}] 开始处理: {}", position, total, file_name);
}

/// 记录单张发票处理完成
///
/// # 参数
/// - `success`: 是否成功
/// - `detail`: 成功时为记录摘要，失败时为错误信息
pub fn log_item_complete(position: usize, total: usize, success: bool, detail: &str) {
    if success {
        info!("✓ [{}/{}] 完成: {}", position, total, detail);
    } else {
        info!("✗ [{}/{}] 失败: {}", position, total, detail);
    }
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功数量
/// - `failed`: 失败数量
/// - `total`: 总数
pub fn print_final_stats(success: usize, failed: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 批量处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_counts_chars() {
        assert_eq!(truncate_text("abc", 5), "abc");
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        assert_eq!(truncate_text("发票发票", 2), "发票...");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(false);
        init(true);
    }
}
