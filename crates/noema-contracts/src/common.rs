// Common DTOs shared across resource types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response wrapper for list endpoints
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self { data }
    }
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(data: Vec<T>) -> Self {
        Self { data }
    }
}

/// Pagination parameters accepted by list/inbox endpoints
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct PageParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    50
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

/// Structured quality criteria attached to a domain
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QualityCriteria {
    pub min_length: u32,
    /// 0.0-10.0
    pub quality_threshold: f64,
    pub required_sections: Vec<String>,
    pub include_historical: bool,
    pub include_technical: bool,
    pub include_practical: bool,
}

impl Default for QualityCriteria {
    fn default() -> Self {
        Self {
            min_length: 500,
            quality_threshold: 7.0,
            required_sections: Vec::new(),
            include_historical: false,
            include_technical: true,
            include_practical: true,
        }
    }
}

/// Depth of AI research performed during domain bootstrap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResearchDepth {
    Basic,
    Standard,
    Comprehensive,
}

impl Default for ResearchDepth {
    fn default() -> Self {
        Self::Standard
    }
}
