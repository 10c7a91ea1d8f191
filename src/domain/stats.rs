use serde::{Deserialize, Serialize};

/// Seven-day series of minutes saved, oldest day first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    #[serde(default)]
    pub x: Vec<String>,
    #[serde(default)]
    pub y: Vec<f64>,
}

impl GraphData {
    pub fn points(&self) -> impl Iterator<Item = (&str, f64)> {
        self.x.iter().map(String::as_str).zip(self.y.iter().copied())
    }
}

/// Response of `GET /api/stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    #[serde(default)]
    pub total_time_saved_minutes: f64,
    #[serde(default)]
    pub total_emails_processed: i64,
    #[serde(default)]
    pub graph_data: GraphData,
    #[serde(default)]
    pub productivity_score: i64,
}

impl UsageStats {
    pub fn hours_saved(&self) -> f64 {
        self.total_time_saved_minutes / 60.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stats_payload() {
        let json = r#"{
            "total_time_saved_minutes": 90.0,
            "total_emails_processed": 45,
            "graph_data": {"x": ["2026-10-16", "2026-10-17"], "y": [0, 90.0]},
            "productivity_score": 135
        }"#;
        let s: UsageStats = serde_json::from_str(json).unwrap();
        assert_eq!(s.total_emails_processed, 45);
        assert_eq!(s.hours_saved(), 1.5);
        let pts: Vec<_> = s.graph_data.points().collect();
        assert_eq!(pts, vec![("2026-10-16", 0.0), ("2026-10-17", 90.0)]);
    }
}
