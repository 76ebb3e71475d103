use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceSource {
    Spark,
    Fallback,
    Unknown,
}

/// Rolling tick statistics read from `spark tps`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TpsReading {
    pub tps: Option<f64>,
    pub tps_1m: Option<f64>,
    pub tps_5m: Option<f64>,
    pub tps_15m: Option<f64>,
    pub mspt: Option<f64>,
}

/// Heap and collector figures read from `spark gc`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryReading {
    pub memory_used: Option<u64>,
    pub memory_total: Option<u64>,
    pub memory_percent: Option<u64>,
    pub gc_collections: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    #[serde(flatten)]
    pub ticks: TpsReading,
    #[serde(flatten)]
    pub memory: MemoryReading,
    pub source: PerformanceSource,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PerformanceSnapshot {
    pub fn unknown(timestamp: String) -> Self {
        Self {
            ticks: TpsReading::default(),
            memory: MemoryReading::default(),
            source: PerformanceSource::Unknown,
            timestamp,
            raw_response: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapEntry {
    pub class_name: String,
    pub instances: u64,
    pub bytes: u64,
}

/// `heap_data` payload of `POST /spark/heap-summary`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapSummary {
    pub top_memory_usage: Vec<HeapEntry>,
    pub total_instances: u64,
    pub total_bytes: u64,
}

impl HeapSummary {
    /// Totals cover every parsed record; only the listing is cut to `top_n`.
    pub fn from_entries(mut entries: Vec<HeapEntry>, top_n: usize) -> Self {
        let total_instances = entries.iter().map(|e| e.instances).fold(0u64, u64::saturating_add);
        let total_bytes = entries.iter().map(|e| e.bytes).fold(0u64, u64::saturating_add);
        entries.truncate(top_n);
        Self { top_memory_usage: entries, total_instances, total_bytes }
    }
}
