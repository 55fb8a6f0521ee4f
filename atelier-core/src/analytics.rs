//! Cost analytics reports.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Optional date range applied to every analytics endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DateRange {
    pub fn is_empty(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none()
    }

    pub fn is_valid(&self) -> bool {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        }
    }

    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(date) = self.start_date {
            pairs.push(("start_date".into(), date.format("%Y-%m-%d").to_string()));
        }
        if let Some(date) = self.end_date {
            pairs.push(("end_date".into(), date.format("%Y-%m-%d").to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CostSummary {
    #[serde(default)]
    pub total_cost: f64,
    #[serde(default)]
    pub total_video_cost: f64,
    #[serde(default)]
    pub total_image_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyConsumption {
    pub consumption_date: String,
    #[serde(default)]
    pub video_cost: f64,
    #[serde(default)]
    pub image_cost: f64,
    #[serde(default)]
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConsumption {
    pub user_email: String,
    #[serde(default)]
    pub video_cost: f64,
    #[serde(default)]
    pub image_cost: f64,
    #[serde(default)]
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConsumption {
    pub project_id: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub video_cost: f64,
    #[serde(default)]
    pub image_cost: f64,
    #[serde(default)]
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelUsage {
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(default)]
    pub with_audio: Option<bool>,
    #[serde(default)]
    pub generation_count: u64,
}

impl ModelUsage {
    pub fn label(&self) -> String {
        let model = self.model_used.as_deref().unwrap_or("unknown");
        match self.with_audio {
            Some(true) => format!("{} (audio)", model),
            _ => model.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelDistribution {
    #[serde(default)]
    pub video: Vec<ModelUsage>,
    #[serde(default)]
    pub image: Vec<ModelUsage>,
}

impl ModelDistribution {
    pub fn total_generations(&self) -> u64 {
        self.video
            .iter()
            .chain(self.image.iter())
            .map(|m| m.generation_count)
            .sum()
    }
}

/// Response of `GET /api/analytics/consumption`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConsumptionReport {
    #[serde(default)]
    pub summary: CostSummary,
    #[serde(default)]
    pub daily_consumption: Vec<DailyConsumption>,
    #[serde(default)]
    pub top_users: Vec<UserConsumption>,
    #[serde(default)]
    pub model_distribution: ModelDistribution,
}

impl ConsumptionReport {
    /// Highest daily total, used to scale bar charts.
    pub fn peak_daily_cost(&self) -> f64 {
        self.daily_consumption
            .iter()
            .map(|d| d.total_cost)
            .fold(0.0, f64::max)
    }
}

/// Response of `GET /api/analytics/consumption_by_project`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectConsumptionReport {
    #[serde(default)]
    pub project_consumption: Vec<ProjectConsumption>,
}
