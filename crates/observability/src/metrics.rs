//! 输出端口指标收集模块
//!
//! 数据路径上的计数器，以及基于 `PortStatistics` 快照的内存聚合。

use std::collections::BTreeMap;

use contracts::PortStatistics;
use metrics::{counter, gauge, histogram};

/// 记录一次数据推送
pub fn record_packet_pushed(port: &str, stream_id: &str, elements: usize) {
    counter!(
        "outport_packets_pushed_total",
        "port" => port.to_string(),
        "stream_id" => stream_id.to_string()
    )
    .increment(1);
    histogram!("outport_packet_elements", "port" => port.to_string()).record(elements as f64);
}

/// 记录 SRI 下发到某个连接
pub fn record_sri_delivered(port: &str, connection_id: &str) {
    counter!(
        "outport_sri_delivered_total",
        "port" => port.to_string(),
        "connection_id" => connection_id.to_string()
    )
    .increment(1);
}

/// 记录传输故障（连接将被摘除）
pub fn record_transport_fault(port: &str, connection_id: &str) {
    counter!(
        "outport_transport_faults_total",
        "port" => port.to_string(),
        "connection_id" => connection_id.to_string()
    )
    .increment(1);
}

/// 记录因队列已满而丢弃的数据包
pub fn record_packet_dropped(port: &str, connection_id: &str) {
    counter!(
        "outport_packets_dropped_total",
        "port" => port.to_string(),
        "connection_id" => connection_id.to_string()
    )
    .increment(1);
}

/// 记录当前连接数
pub fn record_connection_count(port: &str, count: usize) {
    gauge!("outport_connections", "port" => port.to_string()).set(count as f64);
}

/// 将统计快照导出为 gauge
pub fn record_port_statistics(stats: &[PortStatistics]) {
    for link in stats {
        let labels = [
            ("port", link.port_name.clone()),
            ("connection_id", link.connection_id.clone()),
        ];
        gauge!("outport_link_bits_per_second", &labels).set(f64::from(link.bits_per_second));
        gauge!("outport_link_calls_per_second", &labels).set(f64::from(link.calls_per_second));
        gauge!("outport_link_queue_depth", &labels).set(f64::from(link.average_queue_depth));
    }
}

/// 连接统计聚合器
///
/// 周期性输入 `statistics()` 快照，汇总每个连接的速率与队列深度。
#[derive(Debug, Clone, Default)]
pub struct StatisticsAggregator {
    /// 已输入的快照数
    pub snapshots: u64,

    /// 各连接的统计
    pub links: BTreeMap<String, LinkAggregate>,
}

/// 单个连接的聚合值
#[derive(Debug, Clone, Default)]
pub struct LinkAggregate {
    pub bits_per_second: RunningStats,
    pub calls_per_second: RunningStats,
    pub queue_depth: RunningStats,
    /// 最新快照中的累计值
    pub dropped_packets: u64,
    pub failed_calls: u64,
}

impl StatisticsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, stats: &[PortStatistics]) {
        self.snapshots += 1;
        for link in stats {
            let entry = self.links.entry(link.connection_id.clone()).or_default();
            entry.bits_per_second.push(f64::from(link.bits_per_second));
            entry.calls_per_second.push(f64::from(link.calls_per_second));
            entry.queue_depth.push(f64::from(link.average_queue_depth));
            entry.dropped_packets = link.dropped_packets;
            entry.failed_calls = link.failed_calls;
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> StatisticsSummary {
        StatisticsSummary {
            snapshots: self.snapshots,
            total_dropped: self.links.values().map(|l| l.dropped_packets).sum(),
            total_failed: self.links.values().map(|l| l.failed_calls).sum(),
            links: self
                .links
                .iter()
                .map(|(id, link)| {
                    (
                        id.clone(),
                        LinkSummary {
                            bits_per_second: StatsSummary::from(&link.bits_per_second),
                            calls_per_second: StatsSummary::from(&link.calls_per_second),
                            queue_depth: StatsSummary::from(&link.queue_depth),
                        },
                    )
                })
                .collect(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct StatisticsSummary {
    pub snapshots: u64,
    pub total_dropped: u64,
    pub total_failed: u64,
    pub links: BTreeMap<String, LinkSummary>,
}

#[derive(Debug, Clone, Default)]
pub struct LinkSummary {
    pub bits_per_second: StatsSummary,
    pub calls_per_second: StatsSummary,
    pub queue_depth: StatsSummary,
}

impl std::fmt::Display for StatisticsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Port Statistics Summary ===")?;
        writeln!(f, "Snapshots: {}", self.snapshots)?;
        writeln!(f, "Dropped packets: {}", self.total_dropped)?;
        writeln!(f, "Failed calls: {}", self.total_failed)?;

        for (connection, link) in &self.links {
            writeln!(f, "Connection {connection}:")?;
            writeln!(f, "  bits/s: {}", link.bits_per_second)?;
            writeln!(f, "  calls/s: {}", link.calls_per_second)?;
            writeln!(f, "  queue depth: {}", link.queue_depth)?;
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
