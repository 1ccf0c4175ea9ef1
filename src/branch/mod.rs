//! Branch matching
//!
//! Radius filtering and ranking of service branches around a coordinate,
//! plus the inventory summary for whatever matched. Everything here is a
//! pure function of its inputs.

use crate::coord::distance::haversine_km;
use crate::coord::Coordinates;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Service tier of a branch
///
/// Stored by the directory as an integer code; unknown codes are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Classification {
    /// 전문블루핸즈
    Specialty,
    /// 종합블루핸즈
    Comprehensive,
    /// 하이테크센터
    HighTech,
    Other(i64),
}

impl Classification {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Specialty,
            2 => Self::Comprehensive,
            3 => Self::HighTech,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::Specialty => 1,
            Self::Comprehensive => 2,
            Self::HighTech => 3,
            Self::Other(code) => *code,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Specialty => "Specialty",
            Self::Comprehensive => "Comprehensive",
            Self::HighTech => "HighTech",
            Self::Other(_) => "Other",
        }
    }

    /// Label as shown to Korean guests
    pub fn korean_label(&self) -> &'static str {
        match self {
            Self::Specialty => "전문블루핸즈",
            Self::Comprehensive => "종합블루핸즈",
            Self::HighTech => "하이테크센터",
            Self::Other(_) => "기타",
        }
    }
}

impl From<i64> for Classification {
    fn from(code: i64) -> Self {
        Self::from_code(code)
    }
}

impl From<Classification> for i64 {
    fn from(classification: Classification) -> Self {
        classification.code()
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The known classifications, for listing
pub fn known_classifications() -> Vec<Classification> {
    vec![
        Classification::Specialty,
        Classification::Comprehensive,
        Classification::HighTech,
    ]
}

/// A physical service branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub code: String,
    pub name: String,
    #[serde(flatten)]
    pub coords: Coordinates,
    pub classification: Classification,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub address: String,
}

/// A branch selected for a guest
///
/// Radius matches carry their distance; region matches have none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchMatch {
    #[serde(flatten)]
    pub branch: Branch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

/// Named region a branch address must fall in
///
/// Every present term must appear in the branch address, so
/// `{city: "서울특별시", district: "강남구"}` matches
/// "서울특별시 강남구 역삼동 123" but not "부산광역시 강서구 ...".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
}

impl RegionFilter {
    /// `None` when neither a city nor a district is known
    pub fn new(city: Option<&str>, district: Option<&str>) -> Option<Self> {
        let term = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let filter = Self {
            city: term(city),
            district: term(district),
        };
        (filter.city.is_some() || filter.district.is_some()).then_some(filter)
    }

    pub fn matches(&self, address: &str) -> bool {
        let terms = [self.city.as_deref(), self.district.as_deref()];
        terms.iter().flatten().next().is_some()
            && terms.iter().flatten().all(|term| address.contains(term))
    }
}

impl std::fmt::Display for RegionFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.city, &self.district) {
            (Some(city), Some(district)) => write!(f, "{} {}", city, district),
            (Some(name), None) | (None, Some(name)) => f.write_str(name),
            (None, None) => Ok(()),
        }
    }
}

/// One inventory row held by a branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRow {
    #[serde(default)]
    pub id: String,
    pub branch_code: String,
    pub part_number: String,
    pub part_name: String,
    pub quantity: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Aggregate view over the matched branches' inventory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySummary {
    pub total_branches: usize,
    pub total_items: usize,
    pub total_quantity: u64,
}

/// Branches within `radius_km` of `center`, nearest first
///
/// Ties are broken by branch code so the order is deterministic.
pub fn find_nearby(center: Coordinates, branches: &[Branch], radius_km: f64) -> Vec<BranchMatch> {
    let mut within: Vec<(f64, &Branch)> = branches
        .iter()
        .map(|branch| (haversine_km(center, branch.coords), branch))
        .filter(|(distance_km, _)| *distance_km <= radius_km)
        .collect();

    within.sort_by(|(da, a), (db, b)| da.total_cmp(db).then_with(|| a.code.cmp(&b.code)));

    within
        .into_iter()
        .map(|(distance_km, branch)| BranchMatch {
            branch: branch.clone(),
            distance_km: Some(distance_km),
        })
        .collect()
}

/// Branches whose address falls in `region`, ordered by code
pub fn find_in_region(region: &RegionFilter, branches: &[Branch]) -> Vec<BranchMatch> {
    let mut matches: Vec<BranchMatch> = branches
        .iter()
        .filter(|branch| region.matches(&branch.address))
        .map(|branch| BranchMatch {
            branch: branch.clone(),
            distance_km: None,
        })
        .collect();

    matches.sort_by(|a, b| a.branch.code.cmp(&b.branch.code));
    matches
}

/// Summarize the inventory rows belonging to `matches`
///
/// Rows for branches outside the match set are ignored.
pub fn summarize(matches: &[BranchMatch], rows: &[InventoryRow]) -> InventorySummary {
    let codes: HashSet<&str> = matches.iter().map(|m| m.branch.code.as_str()).collect();

    let scoped: Vec<&InventoryRow> = rows
        .iter()
        .filter(|row| codes.contains(row.branch_code.as_str()))
        .collect();

    let items: HashSet<(&str, &str)> = scoped
        .iter()
        .map(|row| (row.branch_code.as_str(), row.part_number.as_str()))
        .collect();

    InventorySummary {
        total_branches: codes.len(),
        total_items: items.len(),
        total_quantity: scoped.iter().map(|row| row.quantity).sum(),
    }
}
