// src/ingest/config.rs
//! Search plan: which regions and keywords a run fans out over.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::types::Region;

pub const ENV_SEARCH_PLAN_PATH: &str = "LEADS_SEARCH_PLAN_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPlan {
    pub regions: Vec<Region>,
    pub keywords: Vec<String>,
}

impl SearchPlan {
    /// Every region x keyword pair, one extraction task each.
    pub fn partitions(&self) -> Vec<(Region, String)> {
        let mut out = Vec::with_capacity(self.regions.len() * self.keywords.len());
        for r in &self.regions {
            for k in &self.keywords {
                out.push((r.clone(), k.clone()));
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() || self.keywords.is_empty()
    }

    /// Built-in Florida sweep used when no plan file is configured.
    pub fn default_plan() -> Self {
        let regions = [
            ("Miami", "https://miami.craigslist.org"),
            ("Broward", "https://fortlauderdale.craigslist.org"),
            ("Palm Beach", "https://treasure.craigslist.org"),
            ("Space Coast", "https://spacecoast.craigslist.org"),
            ("Tampa", "https://tampa.craigslist.org"),
            ("Orlando", "https://orlando.craigslist.org"),
            ("Sarasota", "https://sarasota.craigslist.org"),
            ("Fort Myers", "https://fortmyers.craigslist.org"),
            ("Keys", "https://keys.craigslist.org"),
            ("Daytona", "https://daytona.craigslist.org"),
            ("St. Augustine", "https://staugustine.craigslist.org"),
            ("Lakeland", "https://lakeland.craigslist.org"),
            ("Ocala", "https://ocala.craigslist.org"),
            ("Gainesville", "https://gainesville.craigslist.org"),
        ]
        .into_iter()
        .map(|(name, base_url)| Region {
            name: name.to_string(),
            base_url: base_url.to_string(),
        })
        .collect();

        let keywords = [
            "victrola",
            "phonograph",
            "gramophone",
            "talking machine",
            "antique record player",
            "edison phonograph",
            "columbia grafonola",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        Self { regions, keywords }
    }
}

/// Load a plan from an explicit path. Supports TOML or JSON formats.
pub fn load_plan_from(path: &Path) -> Result<SearchPlan> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading search plan from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_plan(&content, ext.as_str())
}

/// Load the plan using env var + fallbacks:
/// 1) $LEADS_SEARCH_PLAN_PATH
/// 2) config/search_plan.toml
/// 3) config/search_plan.json
/// 4) built-in default plan
pub fn load_plan_default() -> Result<SearchPlan> {
    if let Ok(p) = std::env::var(ENV_SEARCH_PLAN_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_plan_from(&pb);
        } else {
            return Err(anyhow!("{ENV_SEARCH_PLAN_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/search_plan.toml");
    if toml_p.exists() {
        return load_plan_from(&toml_p);
    }
    let json_p = PathBuf::from("config/search_plan.json");
    if json_p.exists() {
        return load_plan_from(&json_p);
    }
    Ok(SearchPlan::default_plan())
}

fn parse_plan(s: &str, hint_ext: &str) -> Result<SearchPlan> {
    let parsed = if hint_ext == "json" {
        serde_json::from_str::<SearchPlan>(s).map_err(anyhow::Error::from)
    } else {
        toml::from_str::<SearchPlan>(s)
            .map_err(anyhow::Error::from)
            .or_else(|_| serde_json::from_str::<SearchPlan>(s).map_err(anyhow::Error::from))
    };
    let plan = clean_plan(parsed.context("unsupported search plan format")?);
    if plan.is_empty() {
        return Err(anyhow!("search plan has no regions or no keywords"));
    }
    Ok(plan)
}

fn clean_plan(plan: SearchPlan) -> SearchPlan {
    let mut seen_regions = BTreeSet::new();
    let regions = plan
        .regions
        .into_iter()
        .map(|r| Region {
            name: r.name.trim().to_string(),
            base_url: r.base_url.trim().trim_end_matches('/').to_string(),
        })
        .filter(|r| !r.name.is_empty() && !r.base_url.is_empty())
        .filter(|r| seen_regions.insert(r.name.to_ascii_lowercase()))
        .collect();

    let keywords: BTreeSet<String> = plan
        .keywords
        .into_iter()
        .map(|k| k.trim().to_ascii_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    SearchPlan {
        regions,
        keywords: keywords.into_iter().collect(),
    }
}
